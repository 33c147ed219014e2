use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::{require_public_board, require_visible_feedback};
use crate::cache_headers::add_no_cache_headers;
use crate::error::AppResult;
use crate::handlers::parse_body;
use crate::models::{
    EntityKind, NewFeedbackItem, NewFeedbackVote, SubmitFeedbackRequest, VoteFeedbackRequest,
};
use crate::rate_limit::{RateLimitPreset, SessionLimit, apply_rate_limit};
use crate::state::AppState;
use crate::store::create_typed;

const SUBMIT_FIELDS: &[&str] = &["workspaceId", "boardId", "title", "sessionId"];
const VOTE_FIELDS: &[&str] = &["feedbackId", "sessionId"];

// POST /functions/submitFeedback - anonymous, one per board per session
pub async fn submit_feedback_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let payload: SubmitFeedbackRequest = parse_body(&body, SUBMIT_FIELDS)?;

    let session = SessionLimit {
        session_id: &payload.session_id,
        identifier: &payload.board_id,
        preset: RateLimitPreset::FEEDBACK_SESSION,
    };
    if let Some(limited) = apply_rate_limit(
        &state.rate_limiter,
        &headers,
        &RateLimitPreset::PUBLIC_WRITE,
        Some(session),
    ) {
        return Ok(limited);
    }

    require_public_board(state.store.as_ref(), &payload.workspace_id, &payload.board_id).await?;

    let record = NewFeedbackItem {
        workspace_id: payload.workspace_id,
        board_id: payload.board_id,
        title: payload.title.trim().to_string(),
        description: payload.description,
        submitter_email: payload.email,
        status: "open",
        vote_count: 0,
    };
    let created = create_typed(state.store.as_ref(), EntityKind::FeedbackItem, &record).await?;

    tracing::info!(board_id = %record.board_id, "feedback submitted");

    let response = Json(serde_json::json!({ "feedback": created })).into_response();
    Ok(add_no_cache_headers(response))
}

// POST /functions/voteFeedback - anonymous, one vote per item per session
pub async fn vote_feedback_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let payload: VoteFeedbackRequest = parse_body(&body, VOTE_FIELDS)?;

    let session = SessionLimit {
        session_id: &payload.session_id,
        identifier: &payload.feedback_id,
        preset: RateLimitPreset::VOTE_SESSION,
    };
    if let Some(limited) = apply_rate_limit(
        &state.rate_limiter,
        &headers,
        &RateLimitPreset::PUBLIC_WRITE,
        Some(session),
    ) {
        return Ok(limited);
    }

    require_visible_feedback(state.store.as_ref(), &payload.feedback_id).await?;

    let record = NewFeedbackVote {
        feedback_id: payload.feedback_id,
        session_id: payload.session_id,
    };
    let created = create_typed(state.store.as_ref(), EntityKind::FeedbackVote, &record).await?;

    let response = Json(serde_json::json!({ "vote": created })).into_response();
    Ok(add_no_cache_headers(response))
}
