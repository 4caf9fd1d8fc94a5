use thiserror::Error;

/// Failures that stop a turn from being answered at all. Policy refusals, unknown orders, low
/// confidence, and escalation delivery problems are ordinary outcomes and never end up here.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    /// The knowledge base could not be read.
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// A collaborating system (the order store) could not be reached.
    #[error("integration failure: {0}")]
    Integration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    /// Both kinds are outages of something the turn depends on, so callers see them as
    /// "unavailable" and may retry.
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let message = match self {
            Self::Persistence(message) | Self::Integration(message) => message,
        };
        InterfaceError::ServiceUnavailable { message, correlation_id: correlation_id.into() }
    }
}
