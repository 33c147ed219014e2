use serde::{Deserialize, Serialize};
use std::fmt;

// Entity types the hosted backend exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Workspace,
    WorkspaceMember,
    Board,
    BoardRole,
    FeedbackItem,
    FeedbackVote,
    RoadmapItem,
    RoadmapUpdate,
    ChangelogEntry,
    PageView,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "Workspace",
            Self::WorkspaceMember => "WorkspaceMember",
            Self::Board => "Board",
            Self::BoardRole => "BoardRole",
            Self::FeedbackItem => "FeedbackItem",
            Self::FeedbackVote => "FeedbackVote",
            Self::RoadmapItem => "RoadmapItem",
            Self::RoadmapUpdate => "RoadmapUpdate",
            Self::ChangelogEntry => "ChangelogEntry",
            Self::PageView => "PageView",
        }
    }

    // Rows carrying a `boardId` are filtered by board visibility
    pub fn is_board_scoped(&self) -> bool {
        matches!(
            self,
            Self::FeedbackItem | Self::RoadmapItem | Self::RoadmapUpdate
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Authenticated user as resolved by the backend's auth endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    Owner,
    Admin,
    Staff,
    Member,
}

impl WorkspaceRole {
    // Roles allowed to publish roadmap updates and other staff writes
    pub const STAFF: &'static [WorkspaceRole] =
        &[WorkspaceRole::Owner, WorkspaceRole::Admin, WorkspaceRole::Staff];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub workspace_id: String,
    pub user_id: String,
    pub role: WorkspaceRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardRoleKind {
    Owner,
    Admin,
    Contributor,
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardRole {
    pub board_id: String,
    pub user_id: String,
    pub role: BoardRoleKind,
}

// Request bodies

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoadmapUpdateRequest {
    pub workspace_id: String,
    pub roadmap_item_id: String,
    pub content: String,
    #[serde(default)]
    pub board_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackRequest {
    pub workspace_id: String,
    pub board_id: String,
    pub title: String,
    pub session_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteFeedbackRequest {
    pub feedback_id: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackViewRequest {
    pub workspace_id: String,
    pub path: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceQuery {
    pub workspace_id: Option<String>,
}

// Records created by the edge functions

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoadmapUpdate {
    pub workspace_id: String,
    pub roadmap_item_id: String,
    pub board_id: Option<String>,
    pub content: String,
    pub status: Option<String>,
    pub author_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedbackItem {
    pub workspace_id: String,
    pub board_id: String,
    pub title: String,
    pub description: Option<String>,
    pub submitter_email: Option<String>,
    pub status: &'static str,
    pub vote_count: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedbackVote {
    pub feedback_id: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPageView {
    pub workspace_id: String,
    pub path: String,
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_defaults_to_private_and_active() {
        let board: Board = serde_json::from_value(
            serde_json::json!({"id": "b1", "workspaceId": "w1", "name": "Ideas"}),
        )
        .unwrap();
        assert_eq!(board.visibility, Visibility::Private);
        assert!(board.is_active);
    }

    #[test]
    fn roles_use_lowercase_wire_names() {
        let member: WorkspaceMember = serde_json::from_value(
            serde_json::json!({"workspaceId": "w1", "userId": "u1", "role": "staff"}),
        )
        .unwrap();
        assert_eq!(member.role, WorkspaceRole::Staff);
        assert!(WorkspaceRole::STAFF.contains(&member.role));
        assert!(!WorkspaceRole::STAFF.contains(&WorkspaceRole::Member));
    }
}
