mod changelog;
mod feedback;
mod health;
mod metrics;
mod roadmap;
mod tracking;

pub use changelog::public_changelog_handler;
pub use feedback::{submit_feedback_handler, vote_feedback_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use roadmap::{create_roadmap_update_handler, public_roadmap_handler};
pub use tracking::track_view_handler;

use axum::{
    Router,
    body::Bytes,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, AppResult};
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let functions = Router::new()
        .route("/createRoadmapUpdate", post(create_roadmap_update_handler))
        .route("/submitFeedback", post(submit_feedback_handler))
        .route("/voteFeedback", post(vote_feedback_handler))
        .route("/trackView", post(track_view_handler))
        .route("/publicRoadmap", get(public_roadmap_handler))
        .route("/publicChangelog", get(public_changelog_handler))
        .layer(middleware::from_fn(track_metrics));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/functions", functions)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn track_metrics(req: Request, next: Next) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();
    let response = next.run(req).await;
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    response
}

// A field counts as missing when absent, null or a blank string
fn missing_fields(value: &Value, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|field| match value.get(**field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        })
        .map(|field| field.to_string())
        .collect()
}

/// Parses a JSON body, rejecting it with `INVALID_INPUT` when it is not
/// JSON, lacks a required field, or does not fit `T`.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes, required: &[&str]) -> AppResult<T> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| AppError::invalid("Request body must be valid JSON"))?;

    let missing = missing_fields(&value, required);
    if !missing.is_empty() {
        return Err(AppError::missing_fields(missing));
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubmitFeedbackRequest;
    use serde_json::json;

    const REQUIRED: &[&str] = &["workspaceId", "boardId", "title", "sessionId"];

    #[test]
    fn blank_and_null_fields_count_as_missing() {
        let body = json!({"workspaceId": "w1", "boardId": null, "title": "  "});
        assert_eq!(
            missing_fields(&body, REQUIRED),
            vec!["boardId", "title", "sessionId"]
        );
    }

    #[test]
    fn non_object_body_misses_everything() {
        assert_eq!(missing_fields(&json!([1, 2]), REQUIRED).len(), REQUIRED.len());
    }

    #[test]
    fn parse_body_accepts_complete_payload() {
        let body = Bytes::from(
            json!({"workspaceId": "w1", "boardId": "b1", "title": "Dark mode", "sessionId": "s1"})
                .to_string(),
        );
        let parsed: SubmitFeedbackRequest = parse_body(&body, REQUIRED).unwrap();
        assert_eq!(parsed.board_id, "b1");
        assert!(parsed.description.is_none());
    }

    #[test]
    fn parse_body_rejects_garbage_and_wrong_types() {
        let err = parse_body::<SubmitFeedbackRequest>(&Bytes::from_static(b"{not json"), REQUIRED);
        assert!(matches!(err, Err(AppError::InvalidInput { .. })));

        let body = Bytes::from(
            json!({"workspaceId": "w1", "boardId": 7, "title": "x", "sessionId": "s1"}).to_string(),
        );
        let err = parse_body::<SubmitFeedbackRequest>(&body, REQUIRED);
        assert!(matches!(err, Err(AppError::InvalidInput { .. })));
    }
}
