//! ReputationProvider trait definition and shared error types.

use crate::record::ReputationRecord;

/// Errors that can occur during a reputation lookup.
#[derive(Debug, thiserror::Error)]
pub enum ReputationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reputation API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ReputationError {
    /// Remote error payload when one was returned, otherwise the message.
    pub fn detail(&self) -> String {
        match self {
            ReputationError::Status { body, .. } if !body.trim().is_empty() => body.clone(),
            other => other.to_string(),
        }
    }
}

/// Threat-intelligence source queried once per extracted address.
#[async_trait::async_trait]
pub trait ReputationProvider: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<ReputationRecord, ReputationError>;

    /// Human-readable name for log lines (e.g. "abuseipdb").
    fn provider_name(&self) -> &str;
}
