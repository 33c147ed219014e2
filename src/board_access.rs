//! Board visibility predicates.
//!
//! The hosted database evaluates these as SQL functions (see
//! [`INSTALL_SQL`]) inside its row-level security policies. The Rust
//! versions below evaluate the same rules over rows already in memory, so
//! the in-process entity store exposes exactly what the database would.

use serde_json::Value;

use crate::models::{Board, BoardRole, BoardRoleKind, Visibility};

/// DDL that installs `has_board_role` / `can_read_board` and the policies
/// that call them.
pub const INSTALL_SQL: &str = include_str!("../sql/board_access.sql");

/// Who is asking. Service callers bypass row filtering, like the backend's
/// service key does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated { user_id: String },
    Service,
}

impl Caller {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Authenticated { user_id } => Some(user_id),
            _ => None,
        }
    }

    pub fn bypasses_rls(&self) -> bool {
        matches!(self, Self::Service)
    }
}

pub fn has_board_role(
    caller: &Caller,
    board_id: &str,
    roles: &[BoardRoleKind],
    memberships: &[BoardRole],
) -> bool {
    let Some(user_id) = caller.user_id() else {
        return false;
    };

    memberships
        .iter()
        .any(|m| m.board_id == board_id && m.user_id == user_id && roles.contains(&m.role))
}

pub fn can_read_board(caller: &Caller, board: Option<&Board>, memberships: &[BoardRole]) -> bool {
    let Some(board) = board else {
        return false;
    };

    if board.visibility == Visibility::Public && board.is_active {
        return true;
    }

    let Some(user_id) = caller.user_id() else {
        return false;
    };
    memberships
        .iter()
        .any(|m| m.board_id == board.id && m.user_id == user_id)
}

/// Keeps the board-scoped rows the caller may read. Rows without a
/// `boardId` are dropped, matching a policy over a null board.
pub fn filter_readable(
    caller: &Caller,
    rows: Vec<Value>,
    boards: &[Board],
    memberships: &[BoardRole],
) -> Vec<Value> {
    if caller.bypasses_rls() {
        return rows;
    }

    rows.into_iter()
        .filter(|row| {
            row.get("boardId")
                .and_then(Value::as_str)
                .map(|board_id| {
                    let board = boards.iter().find(|b| b.id == board_id);
                    can_read_board(caller, board, memberships)
                })
                .unwrap_or(false)
        })
        .collect()
}
