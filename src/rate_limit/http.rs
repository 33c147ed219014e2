use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use super::{RateLimitPreset, RateLimitResult, RateLimiter};
use crate::metrics::RATE_LIMITED_TOTAL;

/// Per-visitor limit applied after the IP check passes.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimit<'a> {
    pub session_id: &'a str,
    pub identifier: &'a str,
    pub preset: RateLimitPreset,
}

/// Caller IP by header precedence: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then `CF-Connecting-IP`. Anything unreadable lands in the
/// shared `"unknown"` bucket.
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("x-forwarded-for")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| header("x-real-ip"))
        .or_else(|| header("cf-connecting-ip"))
        .unwrap_or("unknown")
        .to_string()
}

/// Runs the IP check and, if given, the session check. Returns the 429
/// response to send back, or `None` when the request may proceed.
pub fn apply_rate_limit(
    limiter: &RateLimiter,
    headers: &HeaderMap,
    preset: &RateLimitPreset,
    session: Option<SessionLimit<'_>>,
) -> Option<Response> {
    let ip = client_ip(headers);

    let result = limiter.check_ip_limit(&ip, preset);
    if !result.allowed {
        let kind = if result.burst_exceeded { "burst" } else { "ip" };
        RATE_LIMITED_TOTAL.with_label_values(&[kind]).inc();
        tracing::warn!(
            %ip,
            retry_after = ?result.retry_after,
            burst = result.burst_exceeded,
            "rate limit exceeded"
        );
        return Some(ip_limited_response(&result));
    }

    let session = session?;
    let result =
        limiter.check_session_limit(session.session_id, session.identifier, &session.preset);
    if !result.allowed {
        RATE_LIMITED_TOTAL.with_label_values(&["session"]).inc();
        tracing::info!(
            session_id = session.session_id,
            identifier = session.identifier,
            "session limit exceeded"
        );
        return Some(session_limited_response(&result));
    }

    None
}

fn header_value(n: impl ToString) -> HeaderValue {
    // digits only, always a valid header value
    HeaderValue::from_str(&n.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

fn ip_limited_response(result: &RateLimitResult) -> Response {
    let retry_after = result.retry_after.unwrap_or(1);
    let reset_at = chrono::Utc::now().timestamp() + retry_after as i64;

    let body = serde_json::json!({
        "error": "Too many requests. Please try again later.",
        "code": "RATE_LIMIT_EXCEEDED",
        "retryAfter": retry_after,
        "burstExceeded": result.burst_exceeded,
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert("retry-after", header_value(retry_after));
    headers.insert("x-ratelimit-limit", header_value(result.limit));
    headers.insert("x-ratelimit-remaining", header_value(result.remaining));
    headers.insert("x-ratelimit-reset", header_value(reset_at));
    response
}

fn session_limited_response(result: &RateLimitResult) -> Response {
    let retry_after = result.retry_after.unwrap_or(1);

    let body = serde_json::json!({
        "error": "You have already done this recently. Please try again later.",
        "code": "SESSION_LIMIT_EXCEEDED",
        "retryAfter": retry_after,
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert("retry-after", header_value(retry_after));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderName;
    use std::time::Duration;

    fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
        pairs.iter().fold(HeaderMap::new(), |mut map, (name, value)| {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
            map
        })
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let headers = header_map(&[
            ("x-forwarded-for", " 198.51.100.4 , 10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]);
        assert_eq!(client_ip(&headers), "198.51.100.4");
    }

    #[test]
    fn falls_back_through_real_ip_and_cloudflare() {
        let headers = header_map(&[("x-real-ip", "10.0.0.2"), ("cf-connecting-ip", "10.0.0.3")]);
        assert_eq!(client_ip(&headers), "10.0.0.2");

        let headers = header_map(&[("cf-connecting-ip", "10.0.0.3")]);
        assert_eq!(client_ip(&headers), "10.0.0.3");
    }

    #[test]
    fn missing_or_blank_headers_share_unknown_bucket() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");

        let headers = header_map(&[("x-forwarded-for", " , 10.0.0.1")]);
        assert_eq!(client_ip(&headers), "unknown");
    }

    #[test]
    fn non_ascii_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_bytes(b"\xfa\xfb").unwrap(),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.9.9.9"));
        assert_eq!(client_ip(&headers), "10.9.9.9");
    }

    #[tokio::test]
    async fn ip_rejection_builds_full_429() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(Duration::from_secs(60), 60, 1);
        let headers = header_map(&[("x-forwarded-for", "198.51.100.9")]);

        assert!(apply_rate_limit(&limiter, &headers, &preset, None).is_none());
        let response = apply_rate_limit(&limiter, &headers, &preset, None).unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let h = response.headers();
        assert_eq!(h["retry-after"], "10");
        assert_eq!(h["x-ratelimit-limit"], "60");
        assert_eq!(h["x-ratelimit-remaining"], "0");
        assert!(h.contains_key("x-ratelimit-reset"));

        let body = json_body(response).await;
        assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
        assert_eq!(body["retryAfter"], 10);
        assert_eq!(body["burstExceeded"], true);
    }

    #[tokio::test]
    async fn session_rejection_after_ip_passes() {
        let limiter = RateLimiter::new();
        let headers = header_map(&[("x-real-ip", "198.51.100.10")]);
        let session = SessionLimit {
            session_id: "sess1",
            identifier: "board42",
            preset: RateLimitPreset::FEEDBACK_SESSION,
        };

        assert!(
            apply_rate_limit(&limiter, &headers, &RateLimitPreset::PUBLIC_WRITE, Some(session))
                .is_none()
        );
        let response =
            apply_rate_limit(&limiter, &headers, &RateLimitPreset::PUBLIC_WRITE, Some(session))
                .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        let body = json_body(response).await;
        assert_eq!(body["code"], "SESSION_LIMIT_EXCEEDED");
        assert!(body["retryAfter"].as_u64().unwrap() <= 300);
    }
}
