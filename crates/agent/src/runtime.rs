use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use supportdesk_core::config::AppConfig;
use supportdesk_core::domain::document::RetrievalHit;
use supportdesk_core::domain::intent::Intent;
use supportdesk_core::domain::turn::Turn;
use supportdesk_core::errors::ApplicationError;
use supportdesk_core::metrics::{LatencyBucket, MetricsRegistry};
use supportdesk_db::{
    DbPool, DocumentStore, InMemoryOrderRepository, RepositoryError, SqlDocumentStore,
};

use crate::conversation::{Route, Router};
use crate::escalation::{EscalationPayload, Escalator, WebhookEscalator};
use crate::guardrails::{Guard, GuardOutcome};
use crate::retrieval::{top_confidence, Retriever};
use crate::tools::{AtomicTicketSequence, ToolDispatcher, ToolResult};

pub const REDIRECT_MESSAGE: &str =
    "I can help with orders, returns, refunds, shipping, and tickets. What would you like to do?";
pub const REFUSAL_MESSAGE: &str = "For your security, I can't help with passwords or sensitive financial details. Would you like to open a support ticket instead?";
pub const ORDER_ID_PROMPT: &str = "Could you share your order ID (e.g., A1234)?";
pub const ORDER_HANDOFF_MESSAGE: &str =
    "I couldn't find that order. I've escalated this to a human, expect a follow-up shortly.";
pub const FAQ_HANDOFF_MESSAGE: &str = "I'm not fully confident. I've escalated this to our human support team and they'll follow up shortly.";
const NO_ANSWER_MESSAGE: &str = "I'm not fully sure. Would you like me to escalate to a human?";
const TICKET_SUBJECT: &str = "Customer Support";

/// Intent label on a response: a routed intent, or one of the two terminal labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseIntent {
    OrderStatus,
    CreateTicket,
    Faq,
    OutOfScope,
    Refusal,
    Handoff,
}

impl ResponseIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderStatus => "order_status",
            Self::CreateTicket => "create_ticket",
            Self::Faq => "faq",
            Self::OutOfScope => "out_of_scope",
            Self::Refusal => "refusal",
            Self::Handoff => "handoff",
        }
    }
}

impl From<Intent> for ResponseIntent {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::OrderStatus => Self::OrderStatus,
            Intent::CreateTicket => Self::CreateTicket,
            Intent::Faq => Self::Faq,
            Intent::OutOfScope => Self::OutOfScope,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Source {
    pub id: usize,
    pub title: String,
    pub source: String,
    pub score: f64,
    pub snippet: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TurnMetrics {
    pub latency_ms: f64,
    pub redacted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnResponse {
    pub intent: ResponseIntent,
    pub text: String,
    pub tool_result: Option<ToolResult>,
    pub sources: Vec<Source>,
    pub metrics: TurnMetrics,
}

impl TurnResponse {
    fn reply(intent: ResponseIntent, text: impl Into<String>, guard: &GuardOutcome) -> Self {
        Self {
            intent,
            text: text.into(),
            tool_result: None,
            sources: Vec::new(),
            metrics: TurnMetrics { redacted: guard.redacted, ..TurnMetrics::default() },
        }
    }

    fn with_tool_result(mut self, tool_result: ToolResult) -> Self {
        self.tool_result = Some(tool_result);
        self
    }

    fn with_confidence(mut self, confidence: f64) -> Self {
        self.metrics.confidence = Some(confidence);
        self
    }
}

/// Infrastructure failures. Everything else a turn can run into is answered normally.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("knowledge base unavailable: {0}")]
    KnowledgeBase(#[source] RepositoryError),
    #[error("order store unavailable: {0}")]
    OrderStore(#[source] RepositoryError),
}

impl TurnError {
    pub fn into_application(self) -> ApplicationError {
        match &self {
            Self::KnowledgeBase(_) => ApplicationError::Persistence(self.to_string()),
            Self::OrderStore(_) => ApplicationError::Integration(self.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub confidence_threshold: f64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3, confidence_threshold: 0.60 }
    }
}

pub struct AgentRuntime {
    guard: Guard,
    router: Router,
    retriever: Retriever,
    tools: ToolDispatcher,
    escalator: Arc<dyn Escalator>,
    metrics: Arc<MetricsRegistry>,
    settings: RetrievalSettings,
}

impl AgentRuntime {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        tools: ToolDispatcher,
        escalator: Arc<dyn Escalator>,
        metrics: Arc<MetricsRegistry>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            guard: Guard::new(),
            router: Router::new(),
            retriever: Retriever::new(documents),
            tools,
            escalator,
            metrics,
            settings,
        }
    }

    /// Wires the production collaborators: SQL document store, fixture orders, an atomic ticket
    /// sequence, and the webhook escalator from `handoff` config.
    pub fn from_config(config: &AppConfig, pool: DbPool) -> Result<Self, reqwest::Error> {
        let escalator = WebhookEscalator::new(
            config.handoff.webhook_url().map(str::to_string),
            Duration::from_secs(config.handoff.timeout_secs),
        )?;
        let tools = ToolDispatcher::new(
            Arc::new(InMemoryOrderRepository::with_fixtures()),
            Arc::new(AtomicTicketSequence::default()),
        );

        Ok(Self::new(
            Arc::new(SqlDocumentStore::new(pool)),
            tools,
            Arc::new(escalator),
            Arc::new(MetricsRegistry::new()),
            RetrievalSettings {
                top_k: config.retrieval.top_k,
                confidence_threshold: config.retrieval.confidence_threshold,
            },
        ))
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Runs one turn end to end. The answer latency is recorded on every exit, failures included.
    pub async fn handle_turn(
        &self,
        turn: &Turn,
        correlation_id: &str,
    ) -> Result<TurnResponse, TurnError> {
        let timer = self.metrics.start_timer(LatencyBucket::Answer);
        let outcome = self.process(turn, correlation_id).await;
        let latency_ms = timer.finish();

        match outcome {
            Ok(mut response) => {
                response.metrics.latency_ms = (latency_ms * 100.0).round() / 100.0;
                info!(
                    event_name = "turn.responded",
                    correlation_id,
                    session_id = %turn.session_id,
                    intent = response.intent.as_str(),
                    latency_ms = response.metrics.latency_ms,
                    "turn answered"
                );
                Ok(response)
            }
            Err(error) => {
                warn!(
                    event_name = "turn.failed",
                    correlation_id,
                    session_id = %turn.session_id,
                    error = %error,
                    "turn could not be answered"
                );
                Err(error)
            }
        }
    }

    async fn process(&self, turn: &Turn, correlation_id: &str) -> Result<TurnResponse, TurnError> {
        self.metrics.record_call();

        let guard = self.guard.apply(&turn.message);
        if guard.redacted {
            self.metrics.record_redaction();
        }
        info!(
            event_name = "turn.guarded",
            correlation_id,
            session_id = %turn.session_id,
            text_len = guard.sanitized_text.len(),
            redacted = guard.redacted,
            in_domain = guard.in_domain,
            risky = guard.risky,
            "guard evaluated"
        );

        if guard.should_refuse() {
            self.metrics.record_refusal();
            let (intent, text) = if guard.in_domain {
                (ResponseIntent::Refusal, REFUSAL_MESSAGE)
            } else {
                (ResponseIntent::OutOfScope, REDIRECT_MESSAGE)
            };
            return Ok(TurnResponse::reply(intent, text, &guard));
        }

        let route = self.router.route(&guard.sanitized_text);
        self.metrics.record_intent(route.intent);
        info!(
            event_name = "turn.routed",
            correlation_id,
            session_id = %turn.session_id,
            intent = route.intent.as_str(),
            reason = %route.reason,
            "intent routed"
        );

        match route.intent {
            Intent::OrderStatus => self.order_status(turn, &guard, &route, correlation_id).await,
            Intent::CreateTicket => {
                let ticket = self.tools.create_ticket(TICKET_SUBJECT, &guard.sanitized_text);
                let text = format!(
                    "I've created ticket {}. Our team will follow up via email.",
                    ticket.ticket_id
                );
                Ok(TurnResponse::reply(ResponseIntent::CreateTicket, text, &guard)
                    .with_tool_result(ToolResult::Ticket(ticket)))
            }
            Intent::OutOfScope => {
                Ok(TurnResponse::reply(route.intent.into(), REDIRECT_MESSAGE, &guard))
            }
            Intent::Faq => self.faq(turn, &guard, correlation_id).await,
        }
    }

    async fn order_status(
        &self,
        turn: &Turn,
        guard: &GuardOutcome,
        route: &Route,
        correlation_id: &str,
    ) -> Result<TurnResponse, TurnError> {
        let Some(order_id) = route.order_id() else {
            return Ok(TurnResponse::reply(ResponseIntent::OrderStatus, ORDER_ID_PROMPT, guard));
        };

        let lookup = self.tools.get_order_status(&order_id).await.map_err(TurnError::OrderStore)?;
        self.metrics.record_tool_outcome(lookup.found);

        let found_text = lookup.order.as_ref().map(|order| {
            format!("Order {}: {}. ETA {} day(s).", order.id, order.status, order.eta_days)
        });
        match found_text {
            Some(text) => Ok(TurnResponse::reply(ResponseIntent::OrderStatus, text, guard)
                .with_tool_result(ToolResult::Order(lookup))),
            None => {
                let context = json!({"intent": "order_status", "order_id": order_id.as_str()});
                let outcome = self.escalate(turn, guard, context, correlation_id).await;
                Ok(TurnResponse::reply(ResponseIntent::Handoff, ORDER_HANDOFF_MESSAGE, guard)
                    .with_tool_result(outcome))
            }
        }
    }

    async fn faq(
        &self,
        turn: &Turn,
        guard: &GuardOutcome,
        correlation_id: &str,
    ) -> Result<TurnResponse, TurnError> {
        let rag_timer = self.metrics.start_timer(LatencyBucket::Retrieval);
        let retrieved = self.retriever.retrieve(&guard.sanitized_text, self.settings.top_k).await;
        rag_timer.finish();
        let hits = retrieved.map_err(TurnError::KnowledgeBase)?;

        let confidence = top_confidence(&hits);
        self.metrics.observe_confidence(confidence);
        info!(
            event_name = "turn.retrieved",
            correlation_id,
            session_id = %turn.session_id,
            hits = hits.len(),
            confidence,
            "knowledge base searched"
        );

        if confidence < self.settings.confidence_threshold {
            let context = json!({"intent": "faq", "hits": hits.len(), "conf": confidence});
            let outcome = self.escalate(turn, guard, context, correlation_id).await;
            return Ok(TurnResponse::reply(ResponseIntent::Handoff, FAQ_HANDOFF_MESSAGE, guard)
                .with_tool_result(outcome)
                .with_confidence(confidence));
        }

        let text = match hits.first() {
            Some(best) => format!("{} [1]", answer_line(best)),
            None => NO_ANSWER_MESSAGE.to_string(),
        };
        let mut response =
            TurnResponse::reply(ResponseIntent::Faq, text, guard).with_confidence(confidence);
        response.sources = hits
            .into_iter()
            .enumerate()
            .map(|(index, hit)| Source {
                id: index + 1,
                title: hit.document.title,
                source: hit.document.source,
                score: hit.score,
                snippet: hit.document.body,
            })
            .collect();
        Ok(response)
    }

    async fn escalate(
        &self,
        turn: &Turn,
        guard: &GuardOutcome,
        context: serde_json::Value,
        correlation_id: &str,
    ) -> ToolResult {
        self.metrics.record_handoff();
        let payload = EscalationPayload::new(&turn.session_id, &guard.sanitized_text, context);
        let outcome = self.escalator.escalate(payload).await;
        info!(
            event_name = "turn.escalated",
            correlation_id,
            session_id = %turn.session_id,
            sent = outcome.sent,
            "turn handed off"
        );
        ToolResult::Handoff(outcome)
    }
}

/// The first `A:` line of the best hit with the marker stripped, else its first non-blank line.
/// A blank body falls back to the title.
fn answer_line(hit: &RetrievalHit) -> String {
    let mut lines = hit.document.body.lines().map(str::trim).filter(|line| !line.is_empty());
    let first = lines.clone().next();

    lines
        .find(|line| line.get(..2).is_some_and(|marker| marker.eq_ignore_ascii_case("a:")))
        .map(|line| line[2..].trim())
        .or(first)
        .unwrap_or(hit.document.title.trim())
        .to_string()
}
