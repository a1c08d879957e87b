//! Host statistics port

use async_trait::async_trait;
use chrono::NaiveDateTime;
use domain::entities::SystemStats;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SystemStatsPort: Send + Sync {
    /// Sample CPU, memory, disk and uptime for this host
    async fn collect(&self, now: NaiveDateTime) -> Result<SystemStats, ApplicationError>;
}
