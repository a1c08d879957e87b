//! Boot-time vault unseal
//!
//! Waits for the vault port, reads the seal status and, when sealed,
//! submits `t` unseal keys taken from `VAULT_UNSEAL_KEY1..=t`. A vault that
//! is still sealed afterwards is an error.

use std::time::{Duration, Instant};

use application::ApplicationError;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, warn};

use crate::config::UnsealConfig;
use crate::telemetry::log_fields;

const PORT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Body of `GET /v1/sys/seal-status` and `PUT /v1/sys/unseal`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SealStatus {
    pub sealed: bool,
    /// Number of keys needed to unseal
    pub t: u32,
    #[serde(default)]
    pub n: u32,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub version: Option<String>,
}

impl SealStatus {
    fn log(&self) {
        log_fields(&[
            ("sealed", self.sealed.to_string()),
            ("t", self.t.to_string()),
            ("n", self.n.to_string()),
            ("progress", self.progress.to_string()),
            ("version", self.version.clone().unwrap_or_default()),
        ]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsealOutcome {
    AlreadyUnsealed,
    Unsealed { keys_used: u32 },
}

pub struct VaultUnsealer {
    client: Client,
    config: UnsealConfig,
}

impl std::fmt::Debug for VaultUnsealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultUnsealer")
            .field("address", &self.config.address)
            .field("port", &self.config.port)
            .finish_non_exhaustive()
    }
}

impl VaultUnsealer {
    pub fn new(config: UnsealConfig) -> Result<Self, ApplicationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApplicationError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/v1/sys/{endpoint}", self.config.address.trim_end_matches('/'))
    }

    /// Wait until the vault port on localhost accepts TCP connections
    #[instrument(skip(self), fields(port = self.config.port))]
    pub async fn wait_for_port(&self) -> Result<(), ApplicationError> {
        wait_for_port(
            "localhost",
            self.config.port,
            Duration::from_secs(self.config.port_timeout_secs),
        )
        .await
    }

    pub async fn seal_status(&self) -> Result<SealStatus, ApplicationError> {
        let response = self
            .client
            .get(self.url("seal-status"))
            .send()
            .await
            .map_err(|e| ApplicationError::ExternalService(format!("Seal status request failed: {e}")))?;
        response.json::<SealStatus>().await.map_err(|e| {
            ApplicationError::ExternalService(format!("Could not determine seal status of vault: {e}"))
        })
    }

    async fn submit_key(&self, key: &SecretString) -> Result<SealStatus, ApplicationError> {
        let response = self
            .client
            .put(self.url("unseal"))
            .json(&json!({ "key": key.expose_secret() }))
            .send()
            .await
            .map_err(|e| ApplicationError::ExternalService(format!("Unseal request failed: {e}")))?;
        response
            .json::<SealStatus>()
            .await
            .map_err(|e| ApplicationError::ExternalService(format!("Unexpected unseal response: {e}")))
    }

    /// Unseal with keys produced by `key_for(i)` for `i` in `1..=t`
    pub async fn unseal_with<F>(&self, key_for: F) -> Result<UnsealOutcome, ApplicationError>
    where
        F: Fn(u32) -> Option<SecretString>,
    {
        let status = self.seal_status().await?;
        info!(sealed = status.sealed, threshold = status.t, "Vault seal status");
        status.log();

        if !status.sealed {
            return Ok(UnsealOutcome::AlreadyUnsealed);
        }

        for i in 1..=status.t {
            let key = key_for(i).ok_or_else(|| {
                ApplicationError::Configuration(format!(
                    "Unseal key {}{i} is not set",
                    self.config.key_prefix
                ))
            })?;
            let progress = self.submit_key(&key).await?;
            info!(key = i, "Unseal response");
            progress.log();
        }

        let status = self.seal_status().await?;
        info!(sealed = status.sealed, "Vault seal status");
        status.log();
        if status.sealed {
            return Err(ApplicationError::ExternalService(
                "Failed to unseal vault".to_string(),
            ));
        }
        Ok(UnsealOutcome::Unsealed { keys_used: status.t })
    }

    /// Wait for the port, then unseal with keys from the environment
    pub async fn run(&self) -> Result<UnsealOutcome, ApplicationError> {
        self.wait_for_port().await?;
        let prefix = self.config.key_prefix.clone();
        self.unseal_with(|i| {
            std::env::var(format!("{prefix}{i}"))
                .ok()
                .map(SecretString::from)
        })
        .await
    }
}

/// Poll `host:port` until it accepts a connection or `timeout` passes
pub async fn wait_for_port(host: &str, port: u16, timeout: Duration) -> Result<(), ApplicationError> {
    let start = Instant::now();
    loop {
        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => {
                debug!(host, port, "Port is accepting connections");
                return Ok(());
            },
            Ok(Err(e)) if start.elapsed() < timeout => {
                debug!(host, port, error = %e, "Port not ready");
                tokio::time::sleep(PORT_POLL_INTERVAL).await;
            },
            _ => {
                warn!(host, port, "Gave up waiting for port");
                return Err(ApplicationError::ExternalService(format!(
                    "Waited too long for the port {port} on host {host} to start accepting connections"
                )));
            },
        }
    }
}
