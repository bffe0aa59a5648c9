//! enrich-worker — polls Jira for new tickets and comments AbuseIPDB
//! reputation data onto every ticket whose title carries an IPv4 address.
//!
//! Configuration comes from the environment (and `.env`); see
//! `ipenrich_core::Config` for the keys.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use ipenrich_core::{load_dotenv, Config};
use ipenrich_jira::JiraClient;
use ipenrich_reputation::AbuseIpDbClient;
use ipenrich_worker::{shutdown_signal, PollSchedule, PollScheduler, TicketScanner};

// ── CLI ─────────────────────────────────────────────────────────────

/// Jira IP enrichment worker.
#[derive(Parser, Debug)]
#[command(name = "enrich-worker", version, about)]
struct Cli {
    /// Config profile; keys are looked up as `{PROFILE}_{KEY}` first.
    #[arg(long, env = "IPENRICH_PROFILE", default_value = "")]
    profile: String,

    /// Run a single poll cycle and exit.
    #[arg(long, env = "IPENRICH_ONCE")]
    once: bool,

    /// Override the poll interval (minutes); `POLL_INTERVAL` otherwise.
    #[arg(long, env = "IPENRICH_INTERVAL_MINUTES")]
    interval_minutes: Option<u64>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::for_profile(&cli.profile);
    if let Some(minutes) = cli.interval_minutes.filter(|m| *m > 0) {
        config.poll.interval_minutes = minutes;
    }

    let missing = config.missing_keys();
    if !missing.is_empty() {
        warn!(
            missing = %missing.join(", "),
            "required configuration is missing, API calls will fail"
        );
    }
    config.log_summary();

    let tracker = Arc::new(JiraClient::new(config.jira.clone(), config.http.timeout())?);
    let reputation = Arc::new(AbuseIpDbClient::new(
        config.reputation.clone(),
        config.http.timeout(),
    )?);
    let scanner = Arc::new(TicketScanner::new(tracker, reputation));

    if cli.once {
        info!("running a single poll cycle");
        let report = scanner.scan_and_enrich().await;
        report.log();
        return Ok(());
    }

    let schedule = PollSchedule::from_config(&config.poll)?;
    info!("JIRA enrichment service started, polling {}", schedule.describe());

    PollScheduler::new(scanner, schedule)
        .skip_if_running(config.poll.skip_if_running)
        .run_until(shutdown_signal())
        .await;

    info!("enrich-worker exited cleanly");
    Ok(())
}
