//! Jira side of the enrichment service.
//!
//! This crate provides:
//! - `TicketTracker` trait for fetching recent tickets and publishing comments
//! - `JiraClient`, the REST v3 implementation of that trait
//! - Atlassian Document Format builder for `Label: value` comment text

pub mod client;
pub mod document;
pub mod traits;

pub use client::JiraClient;
pub use document::{format_comment, Block, Document, Mark, TextRun};
pub use traits::{JiraError, Ticket, TicketTracker};
