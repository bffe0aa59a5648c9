//! IP reputation lookups.
//!
//! `ReputationProvider` is the seam the scanner calls through;
//! `AbuseIpDbClient` implements it against the AbuseIPDB v2 check API.

pub mod abuseipdb;
pub mod record;
pub mod traits;

pub use abuseipdb::AbuseIpDbClient;
pub use record::ReputationRecord;
pub use traits::{ReputationError, ReputationProvider};
