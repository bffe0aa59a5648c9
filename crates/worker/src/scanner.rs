//! Ticket scanning and the per-ticket enrichment pipeline.
//!
//! A cycle is: search → for each ticket in API order → extract address →
//! reputation lookup → publish comment. Tickets are handled one at a
//! time. A failed lookup or publish only drops that ticket's enrichment;
//! a failed search ends the cycle.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{error, info, warn};

use ipenrich_jira::{Ticket, TicketTracker};
use ipenrich_reputation::ReputationProvider;

// Syntactic dotted-quad only; octets are not range-checked.
static IPV4_RE: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"(?-u:\b)[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}(?-u:\b)") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern"),
    }
});

/// First dotted-quad substring of `title`, if any.
pub fn extract_ipv4(title: &str) -> Option<&str> {
    IPV4_RE.find(title).map(|m| m.as_str())
}

/// What happened to a single ticket during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketOutcome {
    /// Title has no dotted-quad; nothing was called.
    NoAddress,
    /// Reputation lookup failed; no comment was attempted.
    LookupFailed { ip: String },
    /// Lookup succeeded but posting the comment failed.
    PublishFailed { ip: String },
    Commented { ip: String },
}

/// Counters for one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The ticket search itself failed and no ticket was processed.
    pub fetch_failed: bool,
    pub fetched: usize,
    pub matched: usize,
    pub commented: usize,
    pub lookup_failures: usize,
    pub publish_failures: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: &TicketOutcome) {
        match outcome {
            TicketOutcome::NoAddress => {}
            TicketOutcome::LookupFailed { .. } => {
                self.matched += 1;
                self.lookup_failures += 1;
            }
            TicketOutcome::PublishFailed { .. } => {
                self.matched += 1;
                self.publish_failures += 1;
            }
            TicketOutcome::Commented { .. } => {
                self.matched += 1;
                self.commented += 1;
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        self.fetch_failed || self.lookup_failures > 0 || self.publish_failures > 0
    }

    pub fn log(&self) {
        if self.has_failures() {
            warn!(
                fetch_failed = self.fetch_failed,
                fetched = self.fetched,
                matched = self.matched,
                commented = self.commented,
                lookup_failures = self.lookup_failures,
                publish_failures = self.publish_failures,
                "poll cycle finished with failures"
            );
        } else {
            info!(
                fetched = self.fetched,
                matched = self.matched,
                commented = self.commented,
                "poll cycle finished"
            );
        }
    }
}

/// Fetches tickets and enriches the ones whose titles carry an address.
///
/// Holds no state between cycles, so `scan_and_enrich` may run
/// concurrently with itself.
pub struct TicketScanner {
    tracker: Arc<dyn TicketTracker>,
    reputation: Arc<dyn ReputationProvider>,
}

impl TicketScanner {
    pub fn new(tracker: Arc<dyn TicketTracker>, reputation: Arc<dyn ReputationProvider>) -> Self {
        Self {
            tracker,
            reputation,
        }
    }

    /// Run one poll cycle. Never fails; every error is logged where it
    /// happens and reflected in the returned counters.
    pub async fn scan_and_enrich(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let tickets = match self.tracker.search_recent().await {
            Ok(tickets) => tickets,
            Err(e) => {
                error!(error = %e.detail(), "Error fetching tickets");
                report.fetch_failed = true;
                return report;
            }
        };

        report.fetched = tickets.len();
        info!("Fetched {} tickets", tickets.len());

        for ticket in &tickets {
            let outcome = self.enrich_ticket(ticket).await;
            report.record(&outcome);
        }

        report
    }

    /// Extract → lookup → publish for a single ticket.
    pub async fn enrich_ticket(&self, ticket: &Ticket) -> TicketOutcome {
        let Some(ip) = extract_ipv4(&ticket.title) else {
            return TicketOutcome::NoAddress;
        };
        let ip = ip.to_string();
        info!(ticket_id = %ticket.id, ip = %ip, "Found IP in ticket");

        let record = match self.reputation.lookup(&ip).await {
            Ok(record) => record,
            Err(e) => {
                error!(
                    ip = %ip,
                    ticket_id = %ticket.id,
                    provider = self.reputation.provider_name(),
                    error = %e.detail(),
                    "Error fetching IP data"
                );
                return TicketOutcome::LookupFailed { ip };
            }
        };

        match self.tracker.publish(&ticket.id, &record.to_comment_text()).await {
            Ok(()) => {
                info!(ticket_id = %ticket.id, "Comment added");
                TicketOutcome::Commented { ip }
            }
            Err(e) => {
                error!(ticket_id = %ticket.id, error = %e.detail(), "Error adding comment");
                TicketOutcome::PublishFailed { ip }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use ipenrich_jira::JiraError;
    use ipenrich_reputation::{ReputationError, ReputationRecord};

    #[derive(Default)]
    struct FakeTracker {
        tickets: Vec<Ticket>,
        fail_search: bool,
        fail_publish_for: Vec<String>,
        published: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl TicketTracker for FakeTracker {
        async fn search_recent(&self) -> Result<Vec<Ticket>, JiraError> {
            if self.fail_search {
                return Err(JiraError::Serialize("search unavailable".into()));
            }
            Ok(self.tickets.clone())
        }

        async fn publish(&self, ticket_id: &str, raw_text: &str) -> Result<(), JiraError> {
            self.published
                .lock()
                .unwrap()
                .push((ticket_id.to_string(), raw_text.to_string()));
            if self.fail_publish_for.iter().any(|id| id == ticket_id) {
                return Err(JiraError::Serialize("comment rejected".into()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeReputation {
        fail_for: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ReputationProvider for FakeReputation {
        async fn lookup(&self, ip: &str) -> Result<ReputationRecord, ReputationError> {
            self.calls.lock().unwrap().push(ip.to_string());
            if self.fail_for.iter().any(|f| f == ip) {
                return Err(ReputationError::Malformed("lookup refused".into()));
            }
            Ok(ReputationRecord {
                ip: ip.to_string(),
                confidence_score: 87,
                isp: "ExampleNet".into(),
                domain: "example.net".into(),
                country_code: "US".into(),
                total_reports: 42,
            })
        }

        fn provider_name(&self) -> &str {
            "fake"
        }
    }

    fn scanner(
        tracker: FakeTracker,
        reputation: FakeReputation,
    ) -> (TicketScanner, Arc<FakeTracker>, Arc<FakeReputation>) {
        let tracker = Arc::new(tracker);
        let reputation = Arc::new(reputation);
        (
            TicketScanner::new(tracker.clone(), reputation.clone()),
            tracker,
            reputation,
        )
    }

    // -- extract_ipv4 ------------------------------------------------------

    #[test]
    fn extracts_address_from_title() {
        assert_eq!(
            extract_ipv4("Suspicious login from 203.0.113.7 detected"),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn only_first_address_is_taken() {
        assert_eq!(extract_ipv4("10.0.0.1 then 10.0.0.2"), Some("10.0.0.1"));
    }

    #[test]
    fn octets_are_not_range_checked() {
        assert_eq!(extract_ipv4("bogus 999.999.999.999"), Some("999.999.999.999"));
    }

    #[test]
    fn no_address_in_plain_title() {
        assert_eq!(extract_ipv4("Password reset request"), None);
        assert_eq!(extract_ipv4("version 1.2.3 released"), None);
        assert_eq!(extract_ipv4(""), None);
    }

    #[test]
    fn address_must_sit_on_word_boundaries() {
        assert_eq!(extract_ipv4("x1.2.3.4"), None);
        assert_eq!(extract_ipv4("1234.1.1.1"), None);
        assert_eq!(extract_ipv4("[192.168.0.1]:443"), Some("192.168.0.1"));
        assert_eq!(extract_ipv4("1.2.3.4.5"), Some("1.2.3.4"));
    }

    // -- scan_and_enrich ---------------------------------------------------

    #[tokio::test]
    async fn enriches_matching_tickets_in_order() {
        let (scanner, tracker, reputation) = scanner(
            FakeTracker {
                tickets: vec![
                    Ticket::new("SEC-3", "Suspicious login from 203.0.113.7 detected"),
                    Ticket::new("SEC-2", "Password reset request"),
                    Ticket::new("SEC-1", "Blocked 198.51.100.4 and 198.51.100.5"),
                ],
                ..Default::default()
            },
            FakeReputation::default(),
        );

        let report = scanner.scan_and_enrich().await;

        assert_eq!(
            report,
            CycleReport {
                fetch_failed: false,
                fetched: 3,
                matched: 2,
                commented: 2,
                lookup_failures: 0,
                publish_failures: 0,
            }
        );
        assert_eq!(
            *reputation.calls.lock().unwrap(),
            vec!["203.0.113.7".to_string(), "198.51.100.4".to_string()]
        );
        let published = tracker.published.lock().unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].0, "SEC-3");
        assert_eq!(published[1].0, "SEC-1");
        assert!(published[0].1.starts_with("IP Address: 203.0.113.7\n"));
    }

    #[tokio::test]
    async fn ticket_without_address_makes_no_calls() {
        let (scanner, tracker, reputation) = scanner(
            FakeTracker {
                tickets: vec![Ticket::new("SEC-9", "Password reset request")],
                ..Default::default()
            },
            FakeReputation::default(),
        );

        let outcome = scanner.enrich_ticket(&Ticket::new("SEC-9", "Password reset request")).await;
        assert_eq!(outcome, TicketOutcome::NoAddress);

        let report = scanner.scan_and_enrich().await;
        assert_eq!(report.fetched, 1);
        assert_eq!(report.matched, 0);
        assert!(reputation.calls.lock().unwrap().is_empty());
        assert!(tracker.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_skips_publish_and_continues() {
        let (scanner, tracker, _) = scanner(
            FakeTracker {
                tickets: vec![
                    Ticket::new("SEC-2", "Scan from 192.0.2.1"),
                    Ticket::new("SEC-1", "Scan from 192.0.2.2"),
                ],
                ..Default::default()
            },
            FakeReputation {
                fail_for: vec!["192.0.2.1".into()],
                ..Default::default()
            },
        );

        let report = scanner.scan_and_enrich().await;

        assert_eq!(report.lookup_failures, 1);
        assert_eq!(report.commented, 1);
        assert!(report.has_failures());
        let published = tracker.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "SEC-1");
    }

    #[tokio::test]
    async fn publish_failure_is_contained() {
        let (scanner, tracker, _) = scanner(
            FakeTracker {
                tickets: vec![
                    Ticket::new("SEC-2", "Scan from 192.0.2.1"),
                    Ticket::new("SEC-1", "Scan from 192.0.2.2"),
                ],
                fail_publish_for: vec!["SEC-2".into()],
                ..Default::default()
            },
            FakeReputation::default(),
        );

        let outcome = scanner.enrich_ticket(&Ticket::new("SEC-2", "Scan from 192.0.2.1")).await;
        assert_eq!(
            outcome,
            TicketOutcome::PublishFailed {
                ip: "192.0.2.1".into()
            }
        );

        let report = scanner.scan_and_enrich().await;
        assert_eq!(report.publish_failures, 1);
        assert_eq!(report.commented, 1);
        // One attempt from enrich_ticket, two from the cycle.
        assert_eq!(tracker.published.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn fetch_failure_ends_cycle_early() {
        let (scanner, tracker, reputation) = scanner(
            FakeTracker {
                tickets: vec![Ticket::new("SEC-1", "Scan from 192.0.2.1")],
                fail_search: true,
                ..Default::default()
            },
            FakeReputation::default(),
        );

        let report = scanner.scan_and_enrich().await;

        assert!(report.fetch_failed);
        assert_eq!(report.fetched, 0);
        assert!(reputation.calls.lock().unwrap().is_empty());
        assert!(tracker.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn each_successful_lookup_publishes_exactly_once() {
        let tickets: Vec<Ticket> = (0..5)
            .map(|i| Ticket::new(format!("SEC-{i}"), format!("hit from 10.0.0.{i}")))
            .collect();
        let (scanner, tracker, reputation) = scanner(
            FakeTracker {
                tickets,
                ..Default::default()
            },
            FakeReputation {
                fail_for: vec!["10.0.0.3".into()],
                ..Default::default()
            },
        );

        scanner.scan_and_enrich().await;

        let lookups = reputation.calls.lock().unwrap().len();
        let publishes = tracker.published.lock().unwrap().len();
        assert_eq!(lookups, 5);
        assert_eq!(publishes, lookups - 1);
    }
}
