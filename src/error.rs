use serde::{Deserialize, Serialize};

/// Message used when a failed response carries no `error` field.
pub const FALLBACK_MESSAGE: &str = "Request could not be completed";

/// Error payload the API sends alongside non-2xx statuses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConsoleError {
    /// Non-2xx response; `message` is the server's `error` field or the fallback.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("not signed in")]
    Unauthenticated,
    #[error("insufficient role")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("malformed data: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;

impl ConsoleError {
    /// Builds the error for a failed response from its status and raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        ConsoleError::Api { status, message }
    }

    pub(crate) fn api(status: u16, message: impl Into<String>) -> Self {
        ConsoleError::Api { status, message: message.into() }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ConsoleError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ConsoleError::Unauthenticated) || self.status() == Some(401)
    }
}
