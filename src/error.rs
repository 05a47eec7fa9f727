//! Error types for the mail sorter.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable(s): {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// OAuth token acquisition errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    RequestFailed(String),

    #[error("Token request rejected: {error}: {description}")]
    Rejected { error: String, description: String },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

/// Mail transport (Graph API) errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Graph API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode Graph response: {0}")]
    Decode(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}

/// Tabular log sink errors.
#[derive(Debug, thiserror::Error)]
pub enum LogSinkError {
    #[error("Log request failed: {0}")]
    RequestFailed(String),

    #[error("Log sink returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Draft/send errors.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Sorting and drafting pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Destination folder not found: {name}")]
    MissingFolder { name: String },

    #[error("No reply address for message {id}")]
    MissingRecipient { id: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),
}
