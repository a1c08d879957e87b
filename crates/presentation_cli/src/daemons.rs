//! The polling daemons: sensor, solar, quote, health and the write sweeper

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use application::ports::SecretStoreExt;
use application::{
    Collector, CycleOutcome, HealthService, PendingWriteSweeper, PollSchedule, PollingDaemon,
    QuoteService, SensorService, SolarService,
};
use chrono::Local;
use infrastructure::config::PollConfig;
use infrastructure::{IioEnvironmentSensor, QuotesAdapter, SolarEdgeAdapter, SysinfoStatsCollector};
use integration_solaredge::SolarEdgeCredentials;
use tracing::info;

use crate::node::{Node, Role};
use crate::signal::shutdown_signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Daemon {
    Sensor,
    Solar,
    Quote,
    Health,
    Sweep,
}

impl Daemon {
    pub fn poll_config(self, node: &Node) -> PollConfig {
        let daemons = &node.config.daemons;
        match self {
            Self::Sensor => daemons.sensor,
            Self::Solar => daemons.solar,
            Self::Quote => daemons.quote,
            Self::Health => daemons.health,
            Self::Sweep => daemons.sweep,
        }
    }
}

/// Build the collector for `daemon` and run it until shutdown, or once
pub async fn run(node: &Node, daemon: Daemon, once: bool) -> Result<()> {
    let poll = daemon.poll_config(node);
    match daemon {
        Daemon::Sensor => {
            let location = node
                .config
                .node
                .location
                .context("A sensor node needs a location (set LOCATION)")?;
            let sensor = IioEnvironmentSensor::from_config(&node.config.sensor);
            let service = SensorService::new(
                Arc::new(sensor),
                node.db(Role::Sensor).await?,
                node.notifier().await?,
                location,
            );
            drive(service, poll, once).await
        },
        Daemon::Solar => {
            let credentials: SolarEdgeCredentials = node
                .secrets()
                .get_typed(&Role::Solar.secret("solaredge"))
                .await
                .context("Could not read SolarEdge credentials")?;
            let solar = SolarEdgeAdapter::with_config(node.config.solaredge.clone(), credentials)?;
            let service = SolarService::new(
                Arc::new(solar),
                node.db(Role::Solar).await?,
                node.notifier().await?,
            );
            drive(service, poll, once).await
        },
        Daemon::Quote => {
            let quotes = QuotesAdapter::with_config(node.config.quotes.clone())?;
            let service = QuoteService::new(Arc::new(quotes), node.db(Role::Quote).await?);
            drive(service, poll, once).await
        },
        Daemon::Health => {
            let stats =
                SysinfoStatsCollector::new(&node.config.stats, node.name.clone(), node.config.node.location);
            let service = HealthService::new(
                Arc::new(stats),
                node.db(Role::Health).await?,
                node.notifier().await?,
            );
            drive(service, poll, once).await
        },
        Daemon::Sweep => {
            let sweeper = PendingWriteSweeper::new(node.pending(), node.stores());
            drive(sweeper, poll, once).await
        },
    }
}

/// `--once` collects immediately with the configured retries; otherwise the
/// collector runs on its schedule until SIGINT/SIGTERM
async fn drive<C: Collector>(collector: C, poll: PollConfig, once: bool) -> Result<()> {
    let name = collector.name().to_string();
    if once {
        let mut daemon = PollingDaemon::new(collector, PollSchedule::every(1), poll.policy());
        return match daemon.run_cycle(Local::now().naive_local()).await {
            CycleOutcome::Failed { attempts } => {
                bail!("{name}: collection failed after {attempts} attempt(s)")
            },
            outcome => {
                info!(collector = %name, ?outcome, "Single run finished");
                Ok(())
            },
        };
    }

    let daemon = PollingDaemon::new(collector, poll.schedule(), poll.policy());
    tokio::select! {
        () = daemon.run() => {},
        () = shutdown_signal() => info!(collector = %name, "Exit signal received, stopping"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use application::ApplicationError;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;

    struct Counting {
        calls: Arc<AtomicU32>,
        fail: bool,
    }

    #[async_trait]
    impl Collector for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn collect(&self, _now: NaiveDateTime) -> Result<(), ApplicationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ApplicationError::ExternalService("down".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn once_collects_regardless_of_schedule() {
        let calls = Arc::new(AtomicU32::new(0));
        // Hourly at :59; --once ignores the schedule
        let poll = PollConfig::new(60, 59, 3, 0);
        drive(
            Counting {
                calls: Arc::clone(&calls),
                fail: false,
            },
            poll,
            true,
        )
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn once_reports_exhausted_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let err = drive(
            Counting {
                calls: Arc::clone(&calls),
                fail: true,
            },
            PollConfig::new(1, 0, 3, 0),
            true,
        )
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(err.to_string().contains("3 attempt(s)"));
    }
}
