//! TicketTracker trait definition and shared error types.

use serde::Deserialize;

/// Errors that can occur while talking to the ticketing API.
#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Jira returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Serialization failed: {0}")]
    Serialize(String),
}

impl JiraError {
    /// Remote error payload when one was returned, otherwise the message.
    pub fn detail(&self) -> String {
        match self {
            JiraError::Status { body, .. } if !body.trim().is_empty() => body.clone(),
            other => other.to_string(),
        }
    }
}

/// A ticket as returned by the search endpoint. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// Project-scoped key, e.g. `SEC-42`.
    pub id: String,
    pub title: String,
}

impl Ticket {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// `GET /rest/api/3/search` response; only the fields we read.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<SearchIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchIssue {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
}

impl From<SearchIssue> for Ticket {
    fn from(issue: SearchIssue) -> Self {
        Ticket {
            id: issue.key,
            title: issue.fields.summary.unwrap_or_default(),
        }
    }
}

/// Source of tickets and sink for enrichment comments.
#[async_trait::async_trait]
pub trait TicketTracker: Send + Sync {
    /// Fetch the first page of the project's tickets, newest first.
    async fn search_recent(&self) -> Result<Vec<Ticket>, JiraError>;

    /// Format `raw_text` (`Label: value` lines) and post it as a comment.
    async fn publish(&self, ticket_id: &str, raw_text: &str) -> Result<(), JiraError>;
}
