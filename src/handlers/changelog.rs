use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use crate::board_access::Caller;
use crate::cache::make_cache_key;
use crate::cache_headers::{CHANGELOG_TTL, add_cache_headers};
use crate::error::{AppError, AppResult};
use crate::models::{EntityKind, WorkspaceQuery};
use crate::rate_limit::{RateLimitPreset, apply_rate_limit};
use crate::state::AppState;

// GET /functions/publicChangelog?workspaceId=... - published entries, newest first
pub async fn public_changelog_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<WorkspaceQuery>,
) -> AppResult<Response> {
    if let Some(limited) = apply_rate_limit(
        &state.rate_limiter,
        &headers,
        &RateLimitPreset::PUBLIC_READ,
        None,
    ) {
        return Ok(limited);
    }

    let workspace_id = query
        .workspace_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::missing_fields(vec!["workspaceId".to_string()]))?;

    let cache_key = make_cache_key("publicChangelog", &[("workspaceId", workspace_id.as_str())]);
    let body = match state.cache.get(&cache_key) {
        Some(body) => body,
        None => {
            let mut entries = state
                .store
                .list(
                    EntityKind::ChangelogEntry,
                    &[("workspaceId", workspace_id.as_str()), ("published", "true")],
                    &Caller::Anonymous,
                )
                .await?;

            // RFC 3339 timestamps sort lexically
            entries.sort_by(|a, b| published_at(b).cmp(published_at(a)));

            let body = serde_json::json!({ "entries": entries });
            state.cache.insert(cache_key, body.clone());
            body
        }
    };

    Ok(add_cache_headers(Json(body).into_response(), CHANGELOG_TTL))
}

fn published_at(entry: &Value) -> &str {
    entry
        .get("publishedAt")
        .and_then(Value::as_str)
        .unwrap_or("")
}
