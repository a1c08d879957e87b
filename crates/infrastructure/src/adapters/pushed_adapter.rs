//! Pushed adapter - Implements PushPort using integration_pushed

use application::ApplicationError;
use application::ports::PushPort;
use async_trait::async_trait;
use integration_pushed::{PushedClient, PushedConfig, PushedCredentials, PushedError, PushedHttpClient};
use tracing::{instrument, warn};

/// Adapter for Pushed.co push notifications
pub struct PushedAdapter {
    client: Box<dyn PushedClient>,
}

impl std::fmt::Debug for PushedAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushedAdapter")
            .field("client", &"PushedClient")
            .finish()
    }
}

impl PushedAdapter {
    pub fn new(client: Box<dyn PushedClient>) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn with_config(
        config: &PushedConfig,
        credentials: PushedCredentials,
    ) -> Result<Self, ApplicationError> {
        let client = PushedHttpClient::new(config, credentials)
            .map_err(|e| ApplicationError::Internal(e.to_string()))?;
        Ok(Self::new(Box::new(client)))
    }
}

#[async_trait]
impl PushPort for PushedAdapter {
    #[instrument(skip(self, msg))]
    async fn push(&self, node: &str, app: &str, msg: &str) -> Result<bool, ApplicationError> {
        match self.client.push(node, app, msg).await {
            Ok(()) => Ok(true),
            Err(PushedError::Rejected { status, body }) => {
                warn!(status, %body, "Push rejected");
                Ok(false)
            },
            Err(PushedError::ConnectionFailed(e) | PushedError::RequestFailed(e)) => {
                Err(ApplicationError::ExternalService(e))
            },
        }
    }
}
