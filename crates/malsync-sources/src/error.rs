use thiserror::Error;

/// Failure of an external collaborator (remote list API, mapping provider)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{context} returned HTTP {status}: {body}")]
    Status {
        context: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    pub fn new(message: String) -> Self {
        SourceError::Other(message)
    }

    pub fn decode(context: impl Into<String>, message: impl ToString) -> Self {
        SourceError::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// True when the failure means the operator has to re-authenticate
    pub fn is_auth(&self) -> bool {
        match self {
            SourceError::Auth(_) => true,
            SourceError::Status { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}
