//! Poll scheduling.
//!
//! The first cycle runs as soon as the scheduler starts; later cycles
//! follow either a fixed interval or a cron expression. Every tick
//! spawns its cycle as a separate task, so a slow cycle can overlap the
//! next one unless `skip_if_running` is enabled.

use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use ipenrich_core::PollConfig;

use crate::scanner::{CycleReport, TicketScanner};

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

/// When poll cycles fire after the initial one.
#[derive(Debug, Clone)]
pub enum PollSchedule {
    Interval(Duration),
    Cron {
        expression: String,
        schedule: Box<Schedule>,
    },
}

impl PollSchedule {
    /// `POLL_CRON` wins over `POLL_INTERVAL` when both are set.
    pub fn from_config(poll: &PollConfig) -> Result<Self, ScheduleError> {
        match poll.cron.as_deref() {
            Some(expr) => Self::cron(expr),
            None => Self::interval(poll.interval()),
        }
    }

    pub fn interval(period: Duration) -> Result<Self, ScheduleError> {
        if period.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(PollSchedule::Interval(period))
    }

    /// Parse a 5- or 6-field cron expression (UTC).
    pub fn cron(expression: &str) -> Result<Self, ScheduleError> {
        let normalized = normalize_cron(expression);
        Schedule::from_str(&normalized)
            .map(|s| PollSchedule::Cron {
                expression: expression.trim().to_string(),
                schedule: Box::new(s),
            })
            .map_err(|e| ScheduleError::InvalidCron {
                expression: expression.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn describe(&self) -> String {
        match self {
            PollSchedule::Interval(period) if period.as_secs() % 60 == 0 => {
                format!("every {} minutes", period.as_secs() / 60)
            }
            PollSchedule::Interval(period) => format!("every {}s", period.as_secs()),
            PollSchedule::Cron { expression, .. } => format!("on cron '{}'", expression),
        }
    }

    /// Delay from `now` until the next cron instant. `None` for interval
    /// schedules or a cron with no upcoming instant.
    pub fn next_cron_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            PollSchedule::Interval(_) => None,
            PollSchedule::Cron { schedule, .. } => schedule
                .after(&now)
                .next()
                .map(|next| (next - now).to_std().unwrap_or(Duration::ZERO)),
        }
    }
}

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
pub(crate) fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Waits for the next tick of a [`PollSchedule`].
enum Ticker {
    Interval(tokio::time::Interval),
    Cron { schedule: PollSchedule, fired: bool },
}

impl Ticker {
    fn new(schedule: &PollSchedule) -> Self {
        match schedule {
            PollSchedule::Interval(period) => {
                // First tick completes immediately.
                let mut interval = tokio::time::interval(*period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Ticker::Interval(interval)
            }
            PollSchedule::Cron { .. } => Ticker::Cron {
                schedule: schedule.clone(),
                fired: false,
            },
        }
    }

    async fn wait(&mut self) {
        match self {
            Ticker::Interval(interval) => {
                interval.tick().await;
            }
            Ticker::Cron { schedule, fired } => {
                if !*fired {
                    *fired = true;
                    return;
                }
                match schedule.next_cron_delay(Utc::now()) {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => {
                        warn!("cron schedule has no upcoming instant, no further cycles");
                        std::future::pending::<()>().await;
                    }
                }
            }
        }
    }
}

/// Clears the in-flight flag when a guarded cycle ends, even on panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives [`TicketScanner::scan_and_enrich`] on a [`PollSchedule`].
pub struct PollScheduler {
    scanner: Arc<TicketScanner>,
    schedule: PollSchedule,
    skip_if_running: bool,
    in_flight: Arc<AtomicBool>,
}

impl PollScheduler {
    pub fn new(scanner: Arc<TicketScanner>, schedule: PollSchedule) -> Self {
        Self {
            scanner,
            schedule,
            skip_if_running: false,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Skip ticks that fire while the previous cycle is still running.
    ///
    /// Off by default: without it overlapping cycles are allowed.
    pub fn skip_if_running(mut self, enabled: bool) -> Self {
        self.skip_if_running = enabled;
        self
    }

    /// Start one cycle in the background. Returns `None` when the tick is
    /// skipped by the overlap guard.
    pub fn tick(&self) -> Option<JoinHandle<CycleReport>> {
        let guard = if self.skip_if_running {
            if self.in_flight.swap(true, Ordering::AcqRel) {
                warn!("previous poll cycle still running, skipping tick");
                return None;
            }
            Some(InFlightGuard(self.in_flight.clone()))
        } else {
            None
        };

        let scanner = self.scanner.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            info!("Checking tickets for IPs...");
            let report = scanner.scan_and_enrich().await;
            report.log();
            report
        }))
    }

    /// Tick until `shutdown` resolves, then wait for cycles still in
    /// flight to finish. Nothing is cancelled.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = Ticker::new(&self.schedule);
        let mut in_flight: Vec<JoinHandle<CycleReport>> = Vec::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("poll scheduler stopping");
                    break;
                }
                _ = ticker.wait() => {
                    in_flight.retain(|handle| !handle.is_finished());
                    match self.tick() {
                        Some(handle) => in_flight.push(handle),
                        None => debug!("tick skipped"),
                    }
                }
            }
        }

        in_flight.retain(|handle| !handle.is_finished());
        if !in_flight.is_empty() {
            info!(cycles = in_flight.len(), "waiting for in-flight poll cycles");
        }
        for handle in in_flight {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll cycle task failed");
            }
        }
    }
}
