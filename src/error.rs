//! Request-level error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Network failure or non-2xx from a primary upstream fetch.
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// Empty body, invalid JSON or an unexpected shape from upstream.
    #[error("{0}")]
    UpstreamMalformed(String),

    /// Bad query parameters or request body.
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Internal {
        message: String,
        details: Option<String>,
    },
}

impl FeedError {
    pub fn internal(message: impl Into<String>, details: impl std::fmt::Display) -> Self {
        Self::Internal {
            message: message.into(),
            details: Some(details.to_string()),
        }
    }

    /// HTTP status this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UpstreamUnavailable(_) | Self::UpstreamMalformed(_) => 502,
            Self::Validation(_) => 400,
            Self::Internal { .. } => 500,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Internal { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
