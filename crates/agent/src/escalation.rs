//! Human handoff notifications.
//!
//! An escalation is one fire-and-forget webhook POST. Delivery problems come back as an
//! [`EscalationOutcome`] with `sent = false`; they never fail the turn.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EscalationPayload {
    pub session_id: String,
    pub user_text: String,
    pub context: Value,
    /// Unix seconds.
    pub ts: i64,
}

impl EscalationPayload {
    pub fn new(session_id: &str, user_text: &str, context: Value) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_text: user_text.to_string(),
            context,
            ts: Utc::now().timestamp(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EscalationOutcome {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EscalationOutcome {
    pub fn delivered(status: u16) -> Self {
        Self { sent: true, status: Some(status), reason: None, error: None }
    }

    pub fn not_configured() -> Self {
        Self {
            sent: false,
            status: None,
            reason: Some("no webhook configured".to_string()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { sent: false, status: None, reason: None, error: Some(error.into()) }
    }
}

#[async_trait]
pub trait Escalator: Send + Sync {
    async fn escalate(&self, payload: EscalationPayload) -> EscalationOutcome;
}

pub struct WebhookEscalator {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookEscalator {
    /// A `None` URL disables delivery without failing escalations.
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let webhook_url = webhook_url.filter(|url| !url.trim().is_empty());
        Ok(Self { client, webhook_url })
    }
}

#[async_trait]
impl Escalator for WebhookEscalator {
    async fn escalate(&self, payload: EscalationPayload) -> EscalationOutcome {
        let Some(url) = self.webhook_url.as_deref() else {
            info!(
                event_name = "handoff.skipped",
                session_id = %payload.session_id,
                "handoff webhook not configured"
            );
            return EscalationOutcome::not_configured();
        };

        let response = match self.client.post(url).json(&payload).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    event_name = "handoff.failed",
                    session_id = %payload.session_id,
                    timeout = error.is_timeout(),
                    error = %error,
                    "handoff webhook request failed"
                );
                return EscalationOutcome::failed(error.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(
                event_name = "handoff.failed",
                session_id = %payload.session_id,
                status = status.as_u16(),
                "handoff webhook rejected the notification"
            );
            return EscalationOutcome::failed(format!("webhook returned {status}"));
        }

        info!(
            event_name = "handoff.sent",
            session_id = %payload.session_id,
            status = status.as_u16(),
            "handoff webhook notified"
        );
        EscalationOutcome::delivered(status.as_u16())
    }
}
