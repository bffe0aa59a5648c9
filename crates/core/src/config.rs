use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default AbuseIPDB check endpoint used when `ABUSE_API` is unset.
pub const DEFAULT_ABUSE_API: &str = "https://api.abuseipdb.com/api/v2/check";
/// Reputation lookback window sent with every lookup.
pub const MAX_AGE_IN_DAYS: u32 = 90;
/// Poll cadence used when `POLL_INTERVAL` is unset or unusable.
pub const DEFAULT_POLL_INTERVAL_MINUTES: u64 = 5;
/// Longest accepted poll interval (one year); larger values are clamped.
pub const MAX_POLL_INTERVAL_MINUTES: u64 = 365 * 24 * 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Key lookup used to build a [`Config`]. Empty values count as unset.
pub type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Read a profiled key: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_opt(lookup: &Lookup<'_>, profile: &str, key: &str) -> Option<String> {
    let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
    if !profile.is_empty() {
        if let Some(v) = non_empty(&format!("{}_{}", profile, key)) {
            return Some(v);
        }
    }
    non_empty(key)
}

fn profiled_or(lookup: &Lookup<'_>, profile: &str, key: &str, default: &str) -> String {
    profiled_opt(lookup, profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_u64(lookup: &Lookup<'_>, profile: &str, key: &str, default: u64) -> u64 {
    profiled_opt(lookup, profile, key)
        .and_then(|v| v.trim().parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn profiled_bool(lookup: &Lookup<'_>, profile: &str, key: &str) -> bool {
    profiled_opt(lookup, profile, key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

// ── Top-level config ──────────────────────────────────────────

/// Immutable service configuration, built once at start-up and handed to
/// each component explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub jira: JiraConfig,
    pub reputation: ReputationConfig,
    pub poll: PollConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// When `profile` is set (e.g. `PROD`), every key is first looked up as
    /// `{PROFILE}_{KEY}`, falling back to `{KEY}`. Empty string = default.
    pub fn for_profile(profile: &str) -> Self {
        Self::from_lookup(profile, &env_opt)
    }

    /// Build config from an arbitrary key source instead of the process
    /// environment.
    pub fn from_lookup(profile: &str, lookup: &Lookup<'_>) -> Self {
        let p = profile.trim().to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            jira: JiraConfig::from_lookup(lookup, p),
            reputation: ReputationConfig::from_lookup(lookup, p),
            poll: PollConfig::from_lookup(lookup, p),
            http: HttpConfig::from_lookup(lookup, p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Names of required keys that are unset.
    ///
    /// The service still starts when keys are missing; calls against the
    /// remote APIs will simply fail and be logged.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let required: [(&'static str, bool); 5] = [
            ("JIRA_BASE_URL", self.jira.base_url.is_empty()),
            ("JIRA_PROJECT_KEY", self.jira.project_key.is_empty()),
            ("JIRA_EMAIL", self.jira.email.is_empty()),
            ("JIRA_API_TOKEN", self.jira.api_token.is_empty()),
            ("ABUSEIPDB_API_KEY", self.reputation.api_key.is_empty()),
        ];
        required
            .into_iter()
            .filter(|(_, missing)| *missing)
            .map(|(key, _)| key)
            .collect()
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  jira:        base_url={}, project={}, email={}, token={}",
            self.jira.base_url,
            self.jira.project_key,
            self.jira.email,
            if self.jira.api_token.is_empty() { "(unset)" } else { "(set)" }
        );
        tracing::info!(
            "  reputation:  endpoint={}, key={}, max_age_days={}",
            self.reputation.endpoint,
            if self.reputation.api_key.is_empty() { "(unset)" } else { "(set)" },
            self.reputation.max_age_in_days
        );
        tracing::info!(
            "  poll:        interval={}m, cron={}, skip_if_running={}",
            self.poll.interval_minutes,
            self.poll.cron.as_deref().unwrap_or("(none)"),
            self.poll.skip_if_running
        );
        tracing::info!("  http:        timeout={}s", self.http.timeout_secs);
    }
}

// ── Jira ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Site root, e.g. `https://acme.atlassian.net` (no trailing slash).
    pub base_url: String,
    pub project_key: String,
    pub email: String,
    pub api_token: String,
}

impl JiraConfig {
    fn from_lookup(lookup: &Lookup<'_>, p: &str) -> Self {
        Self {
            base_url: profiled_or(lookup, p, "JIRA_BASE_URL", "")
                .trim()
                .trim_end_matches('/')
                .to_string(),
            project_key: profiled_or(lookup, p, "JIRA_PROJECT_KEY", ""),
            email: profiled_or(lookup, p, "JIRA_EMAIL", ""),
            api_token: profiled_or(lookup, p, "JIRA_API_TOKEN", ""),
        }
    }
}

// ── Reputation (AbuseIPDB) ────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationConfig {
    pub endpoint: String,
    pub api_key: String,
    pub max_age_in_days: u32,
}

impl ReputationConfig {
    fn from_lookup(lookup: &Lookup<'_>, p: &str) -> Self {
        Self {
            endpoint: profiled_or(lookup, p, "ABUSE_API", DEFAULT_ABUSE_API),
            api_key: profiled_or(lookup, p, "ABUSEIPDB_API_KEY", ""),
            max_age_in_days: MAX_AGE_IN_DAYS,
        }
    }
}

// ── Polling ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_minutes: u64,
    /// Optional cron expression; replaces the fixed interval when set.
    pub cron: Option<String>,
    /// Skip a tick while the previous cycle is still in flight.
    pub skip_if_running: bool,
}

impl PollConfig {
    fn from_lookup(lookup: &Lookup<'_>, p: &str) -> Self {
        Self {
            interval_minutes: profiled_u64(
                lookup,
                p,
                "POLL_INTERVAL",
                DEFAULT_POLL_INTERVAL_MINUTES,
            ),
            cron: profiled_opt(lookup, p, "POLL_CRON").map(|c| c.trim().to_string()),
            skip_if_running: profiled_bool(lookup, p, "POLL_SKIP_IF_RUNNING"),
        }
    }

    /// Poll period, clamped to [`MAX_POLL_INTERVAL_MINUTES`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.min(MAX_POLL_INTERVAL_MINUTES) * 60)
    }
}

// ── HTTP ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl HttpConfig {
    fn from_lookup(lookup: &Lookup<'_>, p: &str) -> Self {
        Self {
            timeout_secs: profiled_u64(lookup, p, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
