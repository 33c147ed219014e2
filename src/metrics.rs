use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, IntCounterVec, register_counter, register_gauge,
    register_histogram, register_int_counter_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("edge_requests_total", "Total number of edge function requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "edge_rate_limited_total",
        "Requests rejected by the rate limiter",
        &["kind"]
    )
    .unwrap();
    pub static ref RATE_LIMIT_BUCKETS: Gauge =
        register_gauge!("edge_rate_limit_buckets", "Rate limit buckets currently tracked").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("edge_cache_hits_total", "Total response cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("edge_cache_misses_total", "Total response cache misses").unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("edge_cache_size", "Current number of items in response cache").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "edge_request_latency_seconds",
        "Edge function latency in seconds"
    )
    .unwrap();
}
