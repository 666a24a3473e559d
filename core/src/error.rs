//! Error taxonomy and run-level classification

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised while issuing a token or reconciling it into the store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("invalid private key: {message}")]
    KeyParse { message: String },

    #[error("failed to sign app JWT: {message}")]
    Signing { message: String },

    #[error("token request failed: {message}")]
    Transport { message: String },

    #[error("token authority rejected request ({status}): {message}")]
    Authority { status: u16, message: String },

    #[error("unexpected token response: {message}")]
    ResponseShape { message: String },

    #[error("failed to read secret: {message}")]
    Lookup { message: String },

    #[error("failed to write secret: {message}")]
    Write { message: String },

    #[error("run deadline exceeded {}", deadline_phase(.attempted))]
    DeadlineExceeded { attempted: bool },
}

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn key_parse(message: impl Into<String>) -> Self {
        Self::KeyParse {
            message: message.into(),
        }
    }

    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn authority(status: u16, message: impl Into<String>) -> Self {
        Self::Authority {
            status,
            message: message.into(),
        }
    }

    pub fn response_shape(message: impl Into<String>) -> Self {
        Self::ResponseShape {
            message: message.into(),
        }
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Stable identifier for this error class, used in the run summary
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config_error",
            Self::KeyParse { .. } => "key_parse_error",
            Self::Signing { .. } => "signing_error",
            Self::Transport { .. } => "transport_error",
            Self::Authority { .. } => "authority_error",
            Self::ResponseShape { .. } => "response_shape_error",
            Self::Lookup { .. } => "lookup_error",
            Self::Write { .. } => "write_error",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
        }
    }
}

fn deadline_phase(attempted: &bool) -> &'static str {
    if *attempted {
        "while in flight"
    } else {
        "before start"
    }
}
