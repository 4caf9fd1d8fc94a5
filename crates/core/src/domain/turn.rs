use serde::{Deserialize, Serialize};

/// One inbound user message. Callers supply the session id; nothing is remembered between turns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub session_id: String,
    pub message: String,
}

impl Turn {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), message: message.into() }
    }
}
