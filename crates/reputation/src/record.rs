use serde::{Deserialize, Serialize};

/// Rendered in place of an ISP, domain or country the API left empty.
pub const NOT_AVAILABLE: &str = "N/A";

/// Normalized reputation data for a single IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub ip: String,
    pub confidence_score: u32,
    pub isp: String,
    pub domain: String,
    pub country_code: String,
    pub total_reports: u64,
}

impl ReputationRecord {
    /// Comment text in the fixed label order, one `Label: value` per line.
    pub fn to_comment_text(&self) -> String {
        [
            ("IP Address", self.ip.clone()),
            ("Abuse Confidence Score", self.confidence_score.to_string()),
            ("ISP", self.isp.clone()),
            ("Domain", self.domain.clone()),
            ("Country", self.country_code.clone()),
            ("Total Reports", self.total_reports.to_string()),
        ]
        .iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
    }
}
