use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitHubQueryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limit exceeded: resets at {reset_at} (wait {}s)", .wait.as_secs())]
    RateLimit {
        reset_at: DateTime<Utc>,
        wait: Duration,
    },

    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error after {attempts} attempt(s): {source}")]
    TransientNetwork {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GitHubQueryError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubQueryError::Api { status, .. } => Some(*status),
            GitHubQueryError::TransientNetwork { source, .. } => {
                source.status().map(|s| s.as_u16())
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the transport core would retry a request that failed this way.
    pub fn is_retryable(&self) -> bool {
        match self {
            GitHubQueryError::TransientNetwork { .. } | GitHubQueryError::RateLimit { .. } => true,
            GitHubQueryError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubQueryError>;
