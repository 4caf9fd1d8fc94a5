//! Turn processing for the support desk.
//!
//! Every inbound message runs the same constrained pipeline:
//! 1. **Guard** (`guardrails`) - redact PII, then refuse out-of-domain or risky requests
//! 2. **Route** (`conversation`) - keyword intent scoring plus order-id slot extraction
//! 3. **Act** - order lookup or ticket creation (`tools`), or knowledge-base retrieval
//!    (`retrieval`) gated by confidence
//! 4. **Escalate** (`escalation`) - hand unresolved turns to a human channel
//!
//! `runtime::AgentRuntime` sequences the stages and records metrics on every exit path.
//!
//! Nothing here understands language. Intents come from fixed keyword tables and answers are lines
//! copied out of stored documents.

pub mod conversation;
pub mod escalation;
pub mod guardrails;
pub mod retrieval;
pub mod runtime;
pub mod tools;

pub use conversation::{Route, Router};
pub use escalation::{EscalationOutcome, EscalationPayload, Escalator, WebhookEscalator};
pub use guardrails::{Guard, GuardOutcome};
pub use retrieval::{top_confidence, Retriever};
pub use runtime::{AgentRuntime, ResponseIntent, RetrievalSettings, TurnError, TurnResponse};
pub use tools::{
    AtomicTicketSequence, OrderLookup, Ticket, TicketSequence, ToolDispatcher, ToolResult,
};
