//! The hosted entity store, as seen from the edge functions.
//!
//! Persistence, consistency and auth live in the hosted backend. This module
//! only defines the calls the handlers make against it, plus an in-process
//! stand-in for development and tests.

mod http;
mod memory;

pub use http::HttpEntityStore;
pub use memory::MemoryEntityStore;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::board_access::Caller;
use crate::models::{EntityKind, Identity};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode backend payload: {0}")]
    Decode(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Equality filter on top-level record fields.
pub type Filter<'a> = &'a [(&'a str, &'a str)];

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Resolves a bearer token to a user. `Ok(None)` means the token is not
    /// valid; errors are reserved for the backend being unusable.
    async fn resolve_identity(&self, token: &str) -> StoreResult<Option<Identity>>;

    async fn create(&self, kind: EntityKind, record: Value) -> StoreResult<Value>;

    /// Lists records matching `filter`, restricted to what `caller` may see.
    async fn list(&self, kind: EntityKind, filter: Filter<'_>, caller: &Caller)
    -> StoreResult<Vec<Value>>;
}

// Typed helpers over the JSON surface

pub async fn create_typed<T: Serialize + Sync>(
    store: &dyn EntityStore,
    kind: EntityKind,
    record: &T,
) -> StoreResult<Value> {
    let value = serde_json::to_value(record).map_err(|e| StoreError::Decode(e.to_string()))?;
    store.create(kind, value).await
}

pub async fn list_typed<T: DeserializeOwned>(
    store: &dyn EntityStore,
    kind: EntityKind,
    filter: Filter<'_>,
    caller: &Caller,
) -> StoreResult<Vec<T>> {
    store
        .list(kind, filter, caller)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string())))
        .collect()
}
