//! Push notification port

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Delivers a short message to the owner's phone
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PushPort: Send + Sync {
    /// Send `msg` attributed to `node`/`app`; `Ok(false)` when the service rejected it
    async fn push(&self, node: &str, app: &str, msg: &str) -> Result<bool, ApplicationError>;
}
