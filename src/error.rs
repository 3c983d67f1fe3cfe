use thiserror::Error;

use crate::strategy::Strategy;

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("seed pool for '{0}' is empty")]
    InvalidPool(Strategy),
    #[error("{message}")]
    BackendUnavailable { message: String },
}

impl CaptionError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Failure of a single live-context lookup. Never leaves the enricher.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("HTTP request to {provider} failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP status {status} from {provider}")]
    HttpStatus {
        provider: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("unable to parse response from {provider}: {message}")]
    ResponseParse {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} returned no results")]
    Empty { provider: &'static str },
}

impl ContextError {
    pub fn http(provider: &'static str, source: reqwest::Error) -> Self {
        Self::Http { provider, source }
    }

    pub fn status(provider: &'static str, status: reqwest::StatusCode) -> Self {
        Self::HttpStatus { provider, status }
    }

    pub fn response(provider: &'static str, message: impl Into<String>) -> Self {
        Self::ResponseParse {
            provider,
            message: message.into(),
        }
    }
}
