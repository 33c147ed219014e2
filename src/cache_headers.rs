//! Response transforms for CDN / browser caching.

use axum::http::{HeaderValue, header};
use axum::response::Response;
use chrono::{DateTime, TimeDelta, Utc};

// TTLs per endpoint class, in seconds
pub const ROADMAP_TTL: u64 = 300;
pub const CHANGELOG_TTL: u64 = 600;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

fn http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE).to_string()
}

/// Marks a response cacheable by browsers and shared caches for `ttl` seconds.
pub fn add_cache_headers(mut response: Response, ttl: u64) -> Response {
    // out-of-range TTLs get no Expires; Cache-Control still applies
    let expires = i64::try_from(ttl)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| Utc::now().checked_add_signed(delta));
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={ttl}, s-maxage={ttl}")) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Some(value) = expires.and_then(|at| HeaderValue::from_str(&http_date(at)).ok()) {
        headers.insert(header::EXPIRES, value);
    }
    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    response
}

/// Forbids any caching; used by writes and tracking beacons.
pub fn add_no_cache_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    response
}
