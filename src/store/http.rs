use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;

use super::{EntityStore, Filter, StoreError, StoreResult};
use crate::board_access::Caller;
use crate::models::{EntityKind, Identity};

// REST client for the hosted backend.
//
// Writes and service reads go out with the service key. Every other read
// uses the anon key, so the backend's row-level security policies decide
// what comes back.
pub struct HttpEntityStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    anon_key: String,
}

impl HttpEntityStore {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        service_key: String,
        anon_key: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            anon_key,
        }
    }

    fn entity_url(&self, kind: EntityKind) -> String {
        format!("{}/entities/{}", self.base_url, kind)
    }

    fn key_for(&self, caller: &Caller) -> &str {
        if caller.bypasses_rls() {
            &self.service_key
        } else {
            &self.anon_key
        }
    }
}

async fn read_json(res: reqwest::Response) -> StoreResult<Value> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    res.json::<Value>()
        .await
        .map_err(|e| StoreError::Decode(e.to_string()))
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

#[async_trait]
impl EntityStore for HttpEntityStore {
    async fn resolve_identity(&self, token: &str) -> StoreResult<Option<Identity>> {
        let res = self
            .client
            .get(format!("{}/auth/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }

        let body = read_json(res).await?;
        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn create(&self, kind: EntityKind, record: Value) -> StoreResult<Value> {
        tracing::debug!(entity = %kind, "creating record");
        let res = self
            .client
            .post(self.entity_url(kind))
            .bearer_auth(&self.service_key)
            .json(&record)
            .send()
            .await
            .map_err(transport)?;
        read_json(res).await
    }

    async fn list(
        &self,
        kind: EntityKind,
        filter: Filter<'_>,
        caller: &Caller,
    ) -> StoreResult<Vec<Value>> {
        let url = Url::parse_with_params(&self.entity_url(kind), filter.iter().copied())
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let res = self
            .client
            .get(url)
            .bearer_auth(self.key_for(caller))
            .send()
            .await
            .map_err(transport)?;

        match read_json(res).await? {
            Value::Array(rows) => Ok(rows),
            other => Err(StoreError::Decode(format!(
                "expected a list of {kind} records, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let store = HttpEntityStore::new(
            reqwest::Client::new(),
            "https://backend.example.com/api/",
            "service".into(),
            "anon".into(),
        );
        assert_eq!(
            store.entity_url(EntityKind::RoadmapUpdate),
            "https://backend.example.com/api/entities/RoadmapUpdate"
        );
    }

    #[test]
    fn only_service_callers_use_the_service_key() {
        let store = HttpEntityStore::new(
            reqwest::Client::new(),
            "https://backend.example.com",
            "service".into(),
            "anon".into(),
        );
        assert_eq!(store.key_for(&Caller::Service), "service");
        assert_eq!(store.key_for(&Caller::Anonymous), "anon");
        assert_eq!(
            store.key_for(&Caller::Authenticated {
                user_id: "u1".into()
            }),
            "anon"
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let store = HttpEntityStore::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            "service".into(),
            "anon".into(),
        );
        let err = store
            .list(EntityKind::Board, &[("workspaceId", "w1")], &Caller::Anonymous)
            .await;
        assert!(matches!(err, Err(StoreError::Transport(_))));
    }
}
