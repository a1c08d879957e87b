//! Minute-aligned polling loop shared by every node daemon
//!
//! A daemon wakes once a minute at second 10, asks its [`PollSchedule`]
//! whether this minute is due, and if so runs its [`Collector`] up to
//! [`AttemptPolicy::max_tries`] times. A successful collection is not
//! repeated within the same minute, so a wake-up drifting into that minute
//! twice does not double-insert.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, Timelike};
use domain::value_objects::truncate_to_minute;
use tracing::{debug, error, info, warn};

use crate::error::ApplicationError;

/// Second of the minute the loop wakes at
pub const WAKE_SECOND: u32 = 10;

/// Fires when `minute % every_minutes == offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    every_minutes: u32,
    offset: u32,
}

impl PollSchedule {
    /// Every `minutes` minutes, on the hour boundary; zero is treated as one
    #[must_use]
    pub const fn every(minutes: u32) -> Self {
        Self {
            every_minutes: if minutes == 0 { 1 } else { minutes },
            offset: 0,
        }
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset % self.every_minutes;
        self
    }

    #[must_use]
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now.minute() % self.every_minutes == self.offset
    }
}

/// Start of the next minute, plus [`WAKE_SECOND`]
#[must_use]
pub fn next_wake(now: NaiveDateTime) -> NaiveDateTime {
    let this_minute = now
        .with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(now);
    this_minute + chrono::Duration::minutes(1) + chrono::Duration::seconds(i64::from(WAKE_SECOND))
}

/// How many times to try a collection and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPolicy {
    pub max_tries: u32,
    pub wait: Duration,
}

impl AttemptPolicy {
    #[must_use]
    pub const fn new(max_tries: u32, wait: Duration) -> Self {
        Self { max_tries, wait }
    }
}

/// One unit of scheduled work
#[async_trait]
pub trait Collector: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Hook run before attempt `attempt` (1-based)
    async fn before_attempt(&self, _attempt: u32) -> Result<(), ApplicationError> {
        Ok(())
    }

    async fn collect(&self, now: NaiveDateTime) -> Result<(), ApplicationError>;
}

/// What a single wake-up did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Schedule not due this minute
    Idle,
    /// Due, but already collected in this minute
    AlreadyCollected,
    Collected { attempts: u32 },
    Failed { attempts: u32 },
}

/// Drives a [`Collector`] on a [`PollSchedule`]
pub struct PollingDaemon<C> {
    collector: C,
    schedule: PollSchedule,
    policy: AttemptPolicy,
    /// Minute of the last successful collection
    last_collected: Option<NaiveDateTime>,
}

impl<C> std::fmt::Debug for PollingDaemon<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingDaemon")
            .field("schedule", &self.schedule)
            .field("policy", &self.policy)
            .field("last_collected", &self.last_collected)
            .finish_non_exhaustive()
    }
}

impl<C: Collector> PollingDaemon<C> {
    pub const fn new(collector: C, schedule: PollSchedule, policy: AttemptPolicy) -> Self {
        Self {
            collector,
            schedule,
            policy,
            last_collected: None,
        }
    }

    pub const fn collector(&self) -> &C {
        &self.collector
    }

    /// Handle one wake-up at `now`
    pub async fn run_cycle(&mut self, now: NaiveDateTime) -> CycleOutcome {
        if !self.schedule.is_due(now) {
            return CycleOutcome::Idle;
        }
        let minute = truncate_to_minute(now);
        if self.last_collected == Some(minute) {
            return CycleOutcome::AlreadyCollected;
        }

        let name = self.collector.name().to_string();
        let max_tries = self.policy.max_tries.max(1);
        for attempt in 1..=max_tries {
            let result = match self.collector.before_attempt(attempt).await {
                Ok(()) => self.collector.collect(now).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    self.last_collected = Some(minute);
                    info!(collector = %name, %now, attempt, "Data updated");
                    return CycleOutcome::Collected { attempts: attempt };
                },
                Err(e) if attempt < max_tries => {
                    warn!(collector = %name, attempt, error = %e, "Collection attempt failed");
                    tokio::time::sleep(self.policy.wait).await;
                },
                Err(e) => {
                    error!(collector = %name, %now, attempts = attempt, error = %e, "Could not collect data");
                },
            }
        }
        CycleOutcome::Failed {
            attempts: max_tries,
        }
    }

    /// Loop forever on the local clock; cancel by dropping the future
    pub async fn run(mut self) {
        info!(collector = %self.collector.name(), schedule = ?self.schedule, "Polling started");
        loop {
            let now = Local::now().naive_local();
            self.run_cycle(now).await;

            let now = Local::now().naive_local();
            let wake = next_wake(now);
            debug!(%wake, "Waiting for next minute");
            let pause = (wake - now).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    /// Fails the first `failures` calls, then succeeds
    struct Flaky {
        failures: u32,
        calls: Arc<AtomicU32>,
        hooks: Arc<AtomicU32>,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: Arc::new(AtomicU32::new(0)),
                hooks: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    #[async_trait]
    impl Collector for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn before_attempt(&self, _attempt: u32) -> Result<(), ApplicationError> {
            self.hooks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn collect(&self, _now: NaiveDateTime) -> Result<(), ApplicationError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ApplicationError::ExternalService("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    fn daemon(failures: u32, every: u32, max_tries: u32) -> PollingDaemon<Flaky> {
        PollingDaemon::new(
            Flaky::new(failures),
            PollSchedule::every(every),
            AttemptPolicy::new(max_tries, Duration::ZERO),
        )
    }

    #[test]
    fn schedule_matches_minutes() {
        let every_three = PollSchedule::every(3);
        assert!(every_three.is_due(at(10, 0, 10)));
        assert!(every_three.is_due(at(10, 57, 10)));
        assert!(!every_three.is_due(at(10, 58, 10)));

        let solar = PollSchedule::every(10).with_offset(1);
        assert!(solar.is_due(at(10, 31, 10)));
        assert!(!solar.is_due(at(10, 30, 10)));
    }

    #[test]
    fn zero_interval_runs_every_minute() {
        assert!(PollSchedule::every(0).is_due(at(1, 7, 0)));
    }

    #[test]
    fn next_wake_is_ten_past_next_minute() {
        assert_eq!(next_wake(at(10, 4, 59)), at(10, 5, 10));
        assert_eq!(next_wake(at(10, 4, 0)), at(10, 5, 10));
        assert_eq!(next_wake(at(23, 59, 30)), at(23, 59, 30) + chrono::Duration::seconds(40));
    }

    #[tokio::test]
    async fn idle_when_not_due() {
        let mut d = daemon(0, 5, 3);
        assert_eq!(d.run_cycle(at(9, 1, 10)).await, CycleOutcome::Idle);
        assert_eq!(d.collector().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let mut d = daemon(2, 5, 5);
        assert_eq!(
            d.run_cycle(at(9, 5, 10)).await,
            CycleOutcome::Collected { attempts: 3 }
        );
        assert_eq!(d.collector().hooks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_tries() {
        let mut d = daemon(10, 5, 2);
        assert_eq!(
            d.run_cycle(at(9, 5, 10)).await,
            CycleOutcome::Failed { attempts: 2 }
        );
        assert_eq!(d.collector().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_recollect_within_same_minute() {
        let mut d = daemon(0, 1, 1);
        assert!(matches!(d.run_cycle(at(9, 5, 10)).await, CycleOutcome::Collected { .. }));
        assert_eq!(d.run_cycle(at(9, 5, 40)).await, CycleOutcome::AlreadyCollected);
        assert!(matches!(d.run_cycle(at(9, 6, 10)).await, CycleOutcome::Collected { .. }));
        assert_eq!(d.collector().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn every_minute_schedule_collects_each_minute() {
        let mut d = daemon(0, 1, 1);
        for minute in 0..5 {
            assert_eq!(
                d.run_cycle(at(9, minute, 10)).await,
                CycleOutcome::Collected { attempts: 1 }
            );
        }
        assert_eq!(d.collector().calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn idle_minute_rearms_collection() {
        let mut d = daemon(0, 5, 1);
        d.run_cycle(at(9, 5, 10)).await;
        assert_eq!(d.run_cycle(at(9, 6, 10)).await, CycleOutcome::Idle);
        assert!(matches!(d.run_cycle(at(9, 10, 10)).await, CycleOutcome::Collected { .. }));
        assert_eq!(d.collector().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_window_retries_next_due_wake() {
        let mut d = daemon(1, 1, 1);
        assert!(matches!(d.run_cycle(at(9, 5, 10)).await, CycleOutcome::Failed { .. }));
        assert!(matches!(d.run_cycle(at(9, 6, 10)).await, CycleOutcome::Collected { .. }));
    }
}
