//! Jira Cloud REST v3 client.
//!
//! Searches a project's tickets (newest first, first page only) and posts
//! enrichment comments as ADF documents. Every request uses Basic auth
//! built from the account email and API token.

use std::time::Duration;

use async_trait::async_trait;
use ipenrich_core::JiraConfig;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;

use crate::document::{format_comment, Document};
use crate::traits::{JiraError, SearchResponse, Ticket, TicketTracker};

/// Comment creation payload: `{"body": <ADF document>}`.
#[derive(Debug, Serialize)]
struct CommentRequest<'a> {
    body: &'a Document,
}

/// Talks to a single Jira site on behalf of one project.
#[derive(Debug, Clone)]
pub struct JiraClient {
    config: JiraConfig,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl JiraClient {
    /// Build a client with the given per-request timeout.
    pub fn new(config: JiraConfig, timeout: Duration) -> Result<Self, JiraError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn search_url(&self) -> String {
        format!("{}/rest/api/3/search", self.config.base_url)
    }

    pub fn comment_url(&self, ticket_id: &str) -> String {
        format!("{}/rest/api/3/issue/{}/comment", self.config.base_url, ticket_id)
    }

    /// JQL selecting the project's tickets, newest first.
    pub fn search_jql(&self) -> String {
        format!("project={} ORDER BY created DESC", self.config.project_key)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(&self.config.email, Some(&self.config.api_token))
    }
}

/// Turn a non-2xx response into [`JiraError::Status`] carrying the body.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, JiraError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(JiraError::Status { status, body })
}

#[async_trait]
impl TicketTracker for JiraClient {
    async fn search_recent(&self) -> Result<Vec<Ticket>, JiraError> {
        let jql = self.search_jql();
        let response = self
            .authorized(self.client.get(self.search_url()))
            .header(ACCEPT, "application/json")
            .query(&[("jql", jql.as_str())])
            .send()
            .await?;
        let page: SearchResponse = ensure_success(response).await?.json().await?;

        tracing::debug!(
            project = %self.config.project_key,
            issues = page.issues.len(),
            "search page received"
        );

        Ok(page.issues.into_iter().map(Ticket::from).collect())
    }

    async fn publish(&self, ticket_id: &str, raw_text: &str) -> Result<(), JiraError> {
        let document = format_comment(raw_text);
        let body = serde_json::to_vec(&CommentRequest { body: &document })
            .map_err(|e| JiraError::Serialize(format!("failed to serialize comment: {e}")))?;

        let response = self
            .authorized(self.client.post(self.comment_url(ticket_id)))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        ensure_success(response).await?;

        tracing::debug!(
            ticket_id,
            paragraphs = document.content.len(),
            "comment posted"
        );
        Ok(())
    }
}
