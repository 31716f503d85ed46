//! Remote endpoint contract and its HTTP implementation.

use std::future::Future;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SyncSettings;
use crate::models::{OutboxEntry, TaskPayload};

/// Failure to get a batch accepted by the remote.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid sync client configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Sync HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sync endpoint rejected batch: {message}")]
    Rejected { status: u16, message: String },
}

impl TransportError {
    /// Whether the request ran past its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(error) if error.is_timeout())
    }
}

/// One task change as sent to the remote.
///
/// Only the payload fields captured at enqueue time are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTodo {
    pub client_id: String,
    #[serde(flatten)]
    pub payload: TaskPayload,
    pub updated_at: i64,
}

impl From<&OutboxEntry> for SyncTodo {
    fn from(entry: &OutboxEntry) -> Self {
        Self {
            client_id: entry.client_id.to_string(),
            payload: entry.payload.clone(),
            updated_at: entry.created_at,
        }
    }
}

/// Bulk sync request body: `{"todos": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub todos: Vec<SyncTodo>,
}

impl SyncRequest {
    /// Build a request preserving the order of `entries`.
    pub fn from_entries(entries: &[OutboxEntry]) -> Self {
        Self {
            todos: entries.iter().map(SyncTodo::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }
}

/// Destination for outbox batches.
pub trait RemoteEndpoint: Send + Sync {
    /// Deliver one batch. `Ok` means the remote accepted every entry in it.
    fn push(
        &self,
        request: &SyncRequest,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// `RemoteEndpoint` that POSTs JSON batches over HTTP.
#[derive(Clone)]
pub struct HttpRemote {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(settings: &SyncSettings) -> Result<Self, TransportError> {
        if settings.endpoint.trim().is_empty() {
            return Err(TransportError::InvalidConfiguration(
                "endpoint must not be empty".to_string(),
            ));
        }
        Ok(Self {
            endpoint: settings.endpoint.clone(),
            client: reqwest::Client::builder()
                .timeout(settings.request_timeout)
                .build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RemoteEndpoint for HttpRemote {
    async fn push(&self, request: &SyncRequest) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Rejected {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", compact_body(&message), status.as_u16());
        }
    }

    let trimmed = compact_body(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

/// Error bodies are cut down before they reach logs and outcomes.
fn compact_body(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Operation, TaskId};
    use pretty_assertions::assert_eq;

    fn entry(id: i64, client_id: TaskId, operation: Operation, payload: TaskPayload) -> OutboxEntry {
        OutboxEntry {
            id,
            client_id,
            operation,
            payload,
            created_at: 1_700_000_000_000 + id,
        }
    }

    #[test]
    fn request_keeps_only_queued_fields() {
        let a = TaskId::new();
        let b = TaskId::new();
        let entries = vec![
            entry(1, a, Operation::Create, TaskPayload::for_create("buy milk")),
            entry(2, a, Operation::Update, TaskPayload::for_completed(true)),
            entry(3, b, Operation::Delete, TaskPayload::for_delete()),
        ];

        let json = serde_json::to_value(SyncRequest::from_entries(&entries)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "todos": [
                    {
                        "clientId": a.to_string(),
                        "task": "buy milk",
                        "completed": false,
                        "deleted": false,
                        "updatedAt": 1_700_000_000_001_i64
                    },
                    {
                        "clientId": a.to_string(),
                        "completed": true,
                        "updatedAt": 1_700_000_000_002_i64
                    },
                    {
                        "clientId": b.to_string(),
                        "deleted": true,
                        "updatedAt": 1_700_000_000_003_i64
                    }
                ]
            })
        );
    }

    #[test]
    fn parse_api_error_prefers_message_field() {
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, r#"{"error":"bad batch"}"#),
            "bad batch (400)"
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "  "),
            "HTTP 502"
        );
        assert_eq!(
            parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            "boom (500)"
        );
    }

    #[test]
    fn parse_api_error_truncates_long_bodies() {
        let page = format!("  <html>{}</html>", "x".repeat(500));
        let message = parse_api_error(StatusCode::BAD_GATEWAY, &page);
        assert_eq!(message, format!("{} (502)", &page.trim()[..180]));
    }

    #[test]
    fn http_remote_keeps_endpoint() {
        let settings = SyncSettings::new("http://127.0.0.1:3012/api/todos/sync").unwrap();
        let remote = HttpRemote::new(&settings).unwrap();
        assert_eq!(remote.endpoint(), "http://127.0.0.1:3012/api/todos/sync");
    }
}
