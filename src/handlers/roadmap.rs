use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use crate::auth::{require_roadmap_item, require_workspace_role};
use crate::board_access::Caller;
use crate::cache::make_cache_key;
use crate::cache_headers::{ROADMAP_TTL, add_cache_headers, add_no_cache_headers};
use crate::error::{AppError, AppResult};
use crate::handlers::parse_body;
use crate::models::{
    CreateRoadmapUpdateRequest, EntityKind, NewRoadmapUpdate, WorkspaceQuery, WorkspaceRole,
};
use crate::rate_limit::{RateLimitPreset, apply_rate_limit};
use crate::state::AppState;
use crate::store::create_typed;

const CREATE_UPDATE_FIELDS: &[&str] = &["workspaceId", "roadmapItemId", "content"];

// POST /functions/createRoadmapUpdate - staff only
pub async fn create_roadmap_update_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let payload: CreateRoadmapUpdateRequest = parse_body(&body, CREATE_UPDATE_FIELDS)?;

    let auth = require_workspace_role(
        state.store.as_ref(),
        &headers,
        &payload.workspace_id,
        WorkspaceRole::STAFF,
    )
    .await?;

    if let Some(limited) = apply_rate_limit(
        &state.rate_limiter,
        &headers,
        &RateLimitPreset::PUBLIC_WRITE,
        None,
    ) {
        return Ok(limited);
    }

    // the update lands on the item's own board, never one named by the client
    let item = require_roadmap_item(
        state.store.as_ref(),
        &payload.workspace_id,
        &payload.roadmap_item_id,
    )
    .await?;
    let board_id = item.get("boardId").and_then(Value::as_str).map(str::to_string);
    if payload.board_id.is_some() && payload.board_id != board_id {
        return Err(AppError::Forbidden);
    }

    let record = NewRoadmapUpdate {
        workspace_id: payload.workspace_id,
        roadmap_item_id: payload.roadmap_item_id,
        board_id,
        content: payload.content,
        status: payload.status,
        author_id: auth.identity.id.clone(),
    };
    let created = create_typed(state.store.as_ref(), EntityKind::RoadmapUpdate, &record).await?;

    tracing::info!(
        workspace_id = %auth.workspace_id,
        author = %auth.identity.id,
        "roadmap update created"
    );

    let response = Json(serde_json::json!({ "roadmapUpdate": created })).into_response();
    Ok(add_no_cache_headers(response))
}

// GET /functions/publicRoadmap?workspaceId=...
pub async fn public_roadmap_handler(
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

    let cache_key = make_cache_key("publicRoadmap", &[("workspaceId", workspace_id.as_str())]);
    let body = match state.cache.get(&cache_key) {
        Some(body) => body,
        None => {
            let items = state
                .store
                .list(
                    EntityKind::RoadmapItem,
                    &[("workspaceId", workspace_id.as_str())],
                    &Caller::Anonymous,
                )
                .await?;
            let body = serde_json::json!({ "items": items });
            state.cache.insert(cache_key, body.clone());
            body
        }
    };

    Ok(add_cache_headers(Json(body).into_response(), ROADMAP_TTL))
}
