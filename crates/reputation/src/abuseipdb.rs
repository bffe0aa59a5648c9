//! AbuseIPDB v2 `check` client.
//!
//! One GET per address with a fixed lookback window; the API key travels
//! in the `Key` header. Only the nested `data` object is read.

use std::time::Duration;

use async_trait::async_trait;
use ipenrich_core::ReputationConfig;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::record::{ReputationRecord, NOT_AVAILABLE};
use crate::traits::{ReputationError, ReputationProvider};

#[derive(Debug, Deserialize)]
struct CheckResponse {
    data: Option<CheckData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckData {
    abuse_confidence_score: u32,
    #[serde(default)]
    isp: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    total_reports: u64,
}

fn or_not_available(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

impl CheckData {
    fn into_record(self, ip: &str) -> ReputationRecord {
        ReputationRecord {
            ip: ip.to_string(),
            confidence_score: self.abuse_confidence_score,
            isp: or_not_available(self.isp),
            domain: or_not_available(self.domain),
            country_code: or_not_available(self.country_code),
            total_reports: self.total_reports,
        }
    }
}

/// Parse a `check` response body into a record for `ip`.
fn parse_check_body(ip: &str, body: &str) -> Result<ReputationRecord, ReputationError> {
    let parsed: CheckResponse = serde_json::from_str(body)
        .map_err(|e| ReputationError::Malformed(format!("invalid check payload: {e}")))?;
    let data = parsed
        .data
        .ok_or_else(|| ReputationError::Malformed("response has no `data` object".to_string()))?;
    Ok(data.into_record(ip))
}

#[derive(Debug, Clone)]
pub struct AbuseIpDbClient {
    config: ReputationConfig,
    client: reqwest::Client,
}

impl AbuseIpDbClient {
    pub fn new(config: ReputationConfig, timeout: Duration) -> Result<Self, ReputationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ReputationProvider for AbuseIpDbClient {
    async fn lookup(&self, ip: &str) -> Result<ReputationRecord, ReputationError> {
        let max_age = self.config.max_age_in_days.to_string();
        let response = self
            .client
            .get(&self.config.endpoint)
            .header("Key", &self.config.api_key)
            .header(ACCEPT, "application/json")
            .query(&[("ipAddress", ip), ("maxAgeInDays", max_age.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ReputationError::Status { status, body });
        }

        let record = parse_check_body(ip, &body)?;
        tracing::debug!(
            ip,
            score = record.confidence_score,
            reports = record.total_reports,
            "reputation lookup complete"
        );
        Ok(record)
    }

    fn provider_name(&self) -> &str {
        "abuseipdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_data_object() {
        let body = r#"{
            "data": {
                "ipAddress": "203.0.113.7",
                "isPublic": true,
                "abuseConfidenceScore": 87,
                "countryCode": "US",
                "isp": "ExampleNet",
                "domain": "example.net",
                "totalReports": 42,
                "numDistinctUsers": 9
            }
        }"#;
        let record = parse_check_body("203.0.113.7", body).unwrap();
        assert_eq!(
            record,
            ReputationRecord {
                ip: "203.0.113.7".into(),
                confidence_score: 87,
                isp: "ExampleNet".into(),
                domain: "example.net".into(),
                country_code: "US".into(),
                total_reports: 42,
            }
        );
    }

    #[test]
    fn null_text_fields_render_not_available() {
        let body = r#"{"data":{"abuseConfidenceScore":0,"isp":null,"domain":"","totalReports":0}}"#;
        let record = parse_check_body("10.0.0.1", body).unwrap();
        assert_eq!(record.isp, NOT_AVAILABLE);
        assert_eq!(record.domain, NOT_AVAILABLE);
        assert_eq!(record.country_code, NOT_AVAILABLE);
    }

    #[test]
    fn missing_data_is_malformed() {
        let err = parse_check_body("1.2.3.4", r#"{"errors":[{"detail":"bad"}]}"#).unwrap_err();
        assert!(matches!(err, ReputationError::Malformed(_)));
    }

    #[test]
    fn missing_score_is_malformed() {
        let err = parse_check_body("1.2.3.4", r#"{"data":{"isp":"x","totalReports":1}}"#)
            .unwrap_err();
        assert!(matches!(err, ReputationError::Malformed(ref m) if m.contains("abuseConfidenceScore")));
    }

    #[test]
    fn status_detail_is_remote_body() {
        let err = ReputationError::Status {
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            body: r#"{"errors":[{"detail":"Daily rate limit exceeded"}]}"#.into(),
        };
        assert!(err.detail().contains("Daily rate limit exceeded"));
    }

    #[test]
    fn provider_is_named_abuseipdb() {
        let client = AbuseIpDbClient::new(
            ReputationConfig {
                endpoint: "http://localhost:1/check".into(),
                api_key: "k".into(),
                max_age_in_days: 90,
            },
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.provider_name(), "abuseipdb");
    }
}
