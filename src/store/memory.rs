use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{EntityStore, Filter, StoreError, StoreResult};
use crate::board_access::{self, Caller};
use crate::models::{Board, BoardRole, EntityKind, Identity};

// In-process entity store; stands in for the hosted backend when no
// backend URL is configured and in tests.
#[derive(Default)]
pub struct MemoryEntityStore {
    tables: DashMap<EntityKind, Vec<Value>>,
    tokens: DashMap<String, Identity>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_token(&self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(token.into(), identity);
    }

    // Inserts a record as-is, bypassing id assignment
    pub fn seed(&self, kind: EntityKind, record: Value) {
        self.tables.entry(kind).or_default().push(record);
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.tables.get(&kind).map(|rows| rows.len()).unwrap_or(0)
    }

    fn rows(&self, kind: EntityKind) -> Vec<Value> {
        self.tables
            .get(&kind)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    // Rows that do not decode are skipped, not fatal
    fn decoded<T: serde::de::DeserializeOwned>(&self, kind: EntityKind) -> Vec<T> {
        self.rows(kind)
            .into_iter()
            .filter_map(|row| match serde_json::from_value(row) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    tracing::warn!(entity = %kind, error = %e, "skipping undecodable row");
                    None
                }
            })
            .collect()
    }
}

fn matches_filter(row: &Value, filter: Filter<'_>) -> bool {
    filter.iter().all(|(field, expected)| match row.get(*field) {
        Some(Value::String(s)) => s == *expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == *expected,
    })
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn resolve_identity(&self, token: &str) -> StoreResult<Option<Identity>> {
        Ok(self.tokens.get(token).map(|identity| identity.clone()))
    }

    async fn create(&self, kind: EntityKind, record: Value) -> StoreResult<Value> {
        let Value::Object(mut fields) = record else {
            return Err(StoreError::Decode(format!("{kind} record must be an object")));
        };

        fields
            .entry("id")
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
        fields.insert(
            "createdAt".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );

        let stored = Value::Object(fields);
        self.tables.entry(kind).or_default().push(stored.clone());
        Ok(stored)
    }

    async fn list(
        &self,
        kind: EntityKind,
        filter: Filter<'_>,
        caller: &Caller,
    ) -> StoreResult<Vec<Value>> {
        let rows: Vec<Value> = self
            .rows(kind)
            .into_iter()
            .filter(|row| matches_filter(row, filter))
            .collect();

        if caller.bypasses_rls() || !(kind.is_board_scoped() || kind == EntityKind::Board) {
            return Ok(rows);
        }

        let boards: Vec<Board> = self.decoded(EntityKind::Board);
        let memberships: Vec<BoardRole> = self.decoded(EntityKind::BoardRole);

        if kind == EntityKind::Board {
            return Ok(rows
                .into_iter()
                .filter(|row| {
                    let id = row.get("id").and_then(Value::as_str);
                    let board = boards.iter().find(|b| Some(b.id.as_str()) == id);
                    board_access::can_read_board(caller, board, &memberships)
                })
                .collect());
        }

        Ok(board_access::filter_readable(
            caller,
            rows,
            &boards,
            &memberships,
        ))
    }
}
