//! Edge functions for a multi-tenant feedback, roadmap and changelog app.
//!
//! Public endpoints are anonymous and guarded by per-IP and per-session
//! sliding-window limits; staff endpoints resolve the caller's workspace role
//! through the hosted backend. Reads go through board visibility rules that
//! mirror the backend's row-level security.

pub mod auth;
pub mod board_access;
pub mod cache;
pub mod cache_headers;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod store;

pub use error::{AppError, AppResult};
pub use handlers::build_router;
pub use state::AppState;
