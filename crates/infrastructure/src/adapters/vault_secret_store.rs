//! HashiCorp Vault secret store adapter
//!
//! Reads node secrets from a KV v1 mount after an AppRole login. When the
//! token expires the next read gets a 403; the store logs in again once and
//! repeats the request.

use std::sync::Arc;

use application::{ApplicationError, ports::Secret, ports::SecretStorePort};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use vaultrs::{
    client::{Client, VaultClient, VaultClientSettingsBuilder},
    error::ClientError,
    kv1,
};

use crate::config::VaultAppConfig;
use crate::retry::retry;

#[derive(Clone)]
struct AppRoleCredentials {
    role_id: String,
    secret_id: SecretString,
}

/// Secret store that reads from HashiCorp Vault
pub struct VaultSecretStore {
    client: Arc<RwLock<VaultClient>>,
    mount_path: String,
    address: String,
    credentials: Option<AppRoleCredentials>,
}

impl std::fmt::Debug for VaultSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretStore")
            .field("address", &self.address)
            .field("mount_path", &self.mount_path)
            .field("approle", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl VaultSecretStore {
    /// Create the client and log in with AppRole if credentials are configured
    ///
    /// # Errors
    /// `ExternalService` when the vault cannot be reached, `Configuration`
    /// when the settings or credentials are rejected
    pub async fn connect(config: &VaultAppConfig) -> Result<Self, ApplicationError> {
        let mut client = Self::create_client(config)?;

        let credentials = match (&config.role_id, &config.secret_id) {
            (Some(role_id), Some(secret_id)) => Some(AppRoleCredentials {
                role_id: role_id.clone(),
                secret_id: secret_id.clone(),
            }),
            _ => {
                warn!("No AppRole credentials configured, using unauthenticated client");
                None
            },
        };

        if let Some(credentials) = &credentials {
            Self::authenticate_approle(&mut client, credentials).await?;
        }

        info!(address = %config.address, mount = %config.mount_path, "Connected to Vault");

        Ok(Self {
            client: Arc::new(RwLock::new(client)),
            mount_path: config.mount_path.clone(),
            address: config.address.clone(),
            credentials,
        })
    }

    /// [`Self::connect`] with the configured backoff while the vault is
    /// unreachable; rejected credentials fail immediately
    pub async fn connect_with_retry(config: &VaultAppConfig) -> Result<Self, ApplicationError> {
        retry(&config.connect_retry, || Self::connect(config)).await
    }

    fn create_client(config: &VaultAppConfig) -> Result<VaultClient, ApplicationError> {
        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);

        let settings = settings_builder
            .build()
            .map_err(|e| ApplicationError::Configuration(format!("Invalid Vault config: {e}")))?;

        VaultClient::new(settings).map_err(|e| {
            ApplicationError::Configuration(format!("Failed to create Vault client: {e}"))
        })
    }

    async fn authenticate_approle(
        client: &mut VaultClient,
        credentials: &AppRoleCredentials,
    ) -> Result<(), ApplicationError> {
        let auth = vaultrs::auth::approle::login(
            &*client,
            "approle",
            &credentials.role_id,
            credentials.secret_id.expose_secret(),
        )
        .await
        .map_err(|e| {
            error!(error = %e, "AppRole authentication failed");
            map_client_error(e, "AppRole login")
        })?;

        client.set_token(&auth.client_token);
        debug!("Authenticated with Vault using AppRole");
        Ok(())
    }

    async fn relogin(&self) -> Result<(), ApplicationError> {
        let Some(credentials) = &self.credentials else {
            return Err(ApplicationError::Configuration(
                "Vault denied access and no AppRole credentials are configured".to_string(),
            ));
        };
        let mut client = self.client.write().await;
        Self::authenticate_approle(&mut client, credentials).await
    }

    async fn read(&self, path: &str) -> Result<Secret, ClientError> {
        let client = self.client.read().await;
        kv1::get(&*client, &self.mount_path, path).await
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, ClientError> {
        let client = self.client.read().await;
        kv1::list(&*client, &self.mount_path, path)
            .await
            .map(|response| response.data.keys)
    }
}

fn is_forbidden(e: &ClientError) -> bool {
    matches!(e, ClientError::APIError { code: 403, .. })
}

fn map_client_error(e: ClientError, what: &str) -> ApplicationError {
    match e {
        ClientError::APIError { code: 404, .. } => {
            ApplicationError::NotFound(format!("{what}: not found"))
        },
        ClientError::APIError {
            code: 400 | 403, ..
        } => ApplicationError::Configuration(format!("{what} rejected: {e}")),
        other => ApplicationError::ExternalService(format!("{what} failed: {other}")),
    }
}

#[async_trait]
impl SecretStorePort for VaultSecretStore {
    #[instrument(skip(self))]
    async fn get_secret(&self, path: &str) -> Result<Secret, ApplicationError> {
        debug!(mount = %self.mount_path, "Fetching secret from Vault");
        let result = match self.read(path).await {
            Err(e) if is_forbidden(&e) => {
                info!("Vault token rejected, logging in again");
                self.relogin().await?;
                self.read(path).await
            },
            other => other,
        };
        result.map_err(|e| map_client_error(e, &format!("Secret '{path}'")))
    }

    #[instrument(skip(self))]
    async fn list_secrets(&self, path: &str) -> Result<Vec<String>, ApplicationError> {
        let result = match self.list(path).await {
            Err(e) if is_forbidden(&e) => {
                info!("Vault token rejected, logging in again");
                self.relogin().await?;
                self.list(path).await
            },
            other => other,
        };
        result.map_err(|e| map_client_error(e, &format!("Listing '{path}'")))
    }

    async fn is_healthy(&self) -> bool {
        let client = self.client.read().await;
        match vaultrs::sys::health(&*client).await {
            Ok(health) => {
                if health.sealed {
                    warn!("Vault is sealed");
                    false
                } else {
                    true
                }
            },
            Err(e) => {
                error!(error = %e, "Vault health check failed");
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_by_status() {
        let not_found = ClientError::APIError {
            code: 404,
            errors: vec![],
        };
        assert!(matches!(
            map_client_error(not_found, "x"),
            ApplicationError::NotFound(_)
        ));

        let forbidden = ClientError::APIError {
            code: 403,
            errors: vec!["permission denied".into()],
        };
        assert!(is_forbidden(&forbidden));
        assert!(matches!(
            map_client_error(forbidden, "x"),
            ApplicationError::Configuration(_)
        ));

        let unavailable = ClientError::APIError {
            code: 503,
            errors: vec!["Vault is sealed".into()],
        };
        let mapped = map_client_error(unavailable, "x");
        assert!(mapped.is_retryable());
    }
}
