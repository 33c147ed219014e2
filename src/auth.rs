//! Staff authorization for edge functions.

use axum::http::{HeaderMap, header};

use serde_json::Value;

use crate::board_access::{self, Caller};
use crate::error::{AppError, AppResult};
use crate::models::{Board, EntityKind, Identity, WorkspaceMember, WorkspaceRole};
use crate::store::{EntityStore, list_typed};

/// The resolved caller of a staff operation.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: Identity,
    pub workspace_id: String,
    pub role: WorkspaceRole,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the caller and checks their role in `workspace_id`.
///
/// No token, or a token the backend does not recognise, is
/// [`AppError::Unauthorized`]; a known user without one of `allowed` roles
/// in the workspace is [`AppError::Forbidden`].
pub async fn require_workspace_role(
    store: &dyn EntityStore,
    headers: &HeaderMap,
    workspace_id: &str,
    allowed: &[WorkspaceRole],
) -> AppResult<AuthContext> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    let identity = store
        .resolve_identity(token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    // membership rows are staff-visible only, so read them as the service
    let memberships: Vec<WorkspaceMember> = list_typed(
        store,
        EntityKind::WorkspaceMember,
        &[("workspaceId", workspace_id), ("userId", identity.id.as_str())],
        &Caller::Service,
    )
    .await?;

    let Some(role) = memberships
        .iter()
        .map(|m| m.role)
        .find(|role| allowed.contains(role))
    else {
        tracing::info!(user_id = %identity.id, workspace_id, "insufficient workspace role");
        return Err(AppError::Forbidden);
    };

    Ok(AuthContext {
        identity,
        workspace_id: workspace_id.to_string(),
        role,
    })
}

// Write targets. Creates go out with the service key, so the rows a write
// points at are checked here against the workspace the caller claims.

/// Looks up a roadmap item inside `workspace_id`. An item that does not
/// exist there is [`AppError::Forbidden`], whichever workspace owns it.
pub async fn require_roadmap_item(
    store: &dyn EntityStore,
    workspace_id: &str,
    roadmap_item_id: &str,
) -> AppResult<Value> {
    let mut items = store
        .list(
            EntityKind::RoadmapItem,
            &[("id", roadmap_item_id), ("workspaceId", workspace_id)],
            &Caller::Service,
        )
        .await?;

    if items.is_empty() {
        tracing::warn!(workspace_id, roadmap_item_id, "roadmap item outside workspace");
        return Err(AppError::Forbidden);
    }
    Ok(items.swap_remove(0))
}

/// Looks up a board inside `workspace_id` that anonymous visitors may read,
/// i.e. one that is public and active.
pub async fn require_public_board(
    store: &dyn EntityStore,
    workspace_id: &str,
    board_id: &str,
) -> AppResult<Board> {
    let boards: Vec<Board> = list_typed(
        store,
        EntityKind::Board,
        &[("id", board_id), ("workspaceId", workspace_id)],
        &Caller::Service,
    )
    .await?;

    match boards.into_iter().next() {
        Some(board) if board_access::can_read_board(&Caller::Anonymous, Some(&board), &[]) => {
            Ok(board)
        }
        _ => {
            tracing::warn!(workspace_id, board_id, "board not open to public feedback");
            Err(AppError::Forbidden)
        }
    }
}

/// Looks up a feedback item through anonymous visibility, so items on
/// private or inactive boards cannot be voted on.
pub async fn require_visible_feedback(
    store: &dyn EntityStore,
    feedback_id: &str,
) -> AppResult<Value> {
    let mut items = store
        .list(EntityKind::FeedbackItem, &[("id", feedback_id)], &Caller::Anonymous)
        .await?;

    if items.is_empty() {
        return Err(AppError::Forbidden);
    }
    Ok(items.swap_remove(0))
}
