use crate::application::ports::{MutationOutcome, RemoteChanges, RemoteGateway};
use crate::domain::entities::PendingMutation;
use crate::shared::config::RemoteConfig;
use crate::shared::error::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct BatchRequest {
    mutations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    results: Vec<MutationOutcome>,
}

/// HTTP client for the remote batch endpoint.
pub struct HttpRemoteGateway {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemoteGateway {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// `{"type": ..., "data": {...}}` with the mutation's idempotency id
    /// injected into the data object.
    fn wire_envelope(mutation: &PendingMutation) -> Result<Value> {
        let mut envelope = serde_json::to_value(&mutation.payload)?;
        match envelope.get_mut("data").and_then(Value::as_object_mut) {
            Some(data) => {
                data.insert("id".to_string(), Value::String(mutation.id.to_string()));
            }
            None => {
                return Err(AppError::Serialization(
                    "mutation payload did not serialize to an object".to_string(),
                ));
            }
        }
        Ok(envelope)
    }
}

#[async_trait]
impl RemoteGateway for HttpRemoteGateway {
    async fn submit_batch(&self, mutations: &[PendingMutation]) -> Result<Vec<MutationOutcome>> {
        let envelopes = mutations
            .iter()
            .map(Self::wire_envelope)
            .collect::<Result<Vec<_>>>()?;

        debug!(count = envelopes.len(), "submitting mutation batch");

        let response = self
            .request(self.client.post(format!("{}/tech/sync/batch", self.base_url)))
            .json(&BatchRequest {
                mutations: envelopes,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AppError::Network(format!("batch endpoint returned {status}")));
        }
        if !status.is_success() {
            return Err(AppError::Remote(format!("batch endpoint returned {status}")));
        }

        let body: BatchResponse = response.json().await?;
        Ok(body.results)
    }

    async fn fetch_changes(&self, since: Option<&str>) -> Result<RemoteChanges> {
        let mut request = self
            .request(self.client.get(format!("{}/tech/sync", self.base_url)));
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }

        let response = request.send().await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AppError::Network(format!("sync endpoint returned {status}")));
        }
        if !status.is_success() {
            return Err(AppError::Remote(format!("sync endpoint returned {status}")));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Expense, MutationPayload};
    use crate::domain::value_objects::RecordId;
    use chrono::Utc;

    #[test]
    fn test_wire_envelope_injects_idempotency_id() {
        let mutation = PendingMutation::draft(
            RecordId::generate(),
            MutationPayload::Expense(Expense {
                work_order_id: RecordId::generate(),
                category: "meal".to_string(),
                amount_cents: 1800,
                note: Some("lunch".to_string()),
                incurred_at: Utc::now(),
            }),
        );

        let envelope = HttpRemoteGateway::wire_envelope(&mutation).unwrap();
        assert_eq!(envelope["type"], "expense");
        assert_eq!(envelope["data"]["id"], mutation.id.as_str().to_string());
        assert_eq!(envelope["data"]["category"], "meal");
    }
}
