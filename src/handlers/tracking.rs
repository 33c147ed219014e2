use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::cache_headers::add_no_cache_headers;
use crate::error::AppResult;
use crate::handlers::parse_body;
use crate::models::{EntityKind, NewPageView, TrackViewRequest};
use crate::rate_limit::{RateLimitPreset, apply_rate_limit};
use crate::state::AppState;
use crate::store::create_typed;

// POST /functions/trackView - page view beacon
pub async fn track_view_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let payload: TrackViewRequest = parse_body(&body, &["workspaceId", "path"])?;

    if let Some(limited) =
        apply_rate_limit(&state.rate_limiter, &headers, &RateLimitPreset::TRACKING, None)
    {
        return Ok(limited);
    }

    let record = NewPageView {
        workspace_id: payload.workspace_id,
        path: payload.path,
        session_id: payload.session_id,
    };
    create_typed(state.store.as_ref(), EntityKind::PageView, &record).await?;

    Ok(add_no_cache_headers(
        Json(serde_json::json!({ "success": true })).into_response(),
    ))
}
