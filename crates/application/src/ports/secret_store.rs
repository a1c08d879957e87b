//! Port for secret storage and retrieval
//!
//! Secrets are small key/value documents stored under a path, e.g.
//! `sensor/database` holds the connection details for the sensor database.

use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::de::DeserializeOwned;

use crate::error::ApplicationError;

/// A secret document: field name to JSON value
pub type Secret = HashMap<String, serde_json::Value>;

/// Port for secret storage operations
///
/// This trait is object-safe to allow dynamic dispatch. For typed secret
/// retrieval, use the [`SecretStoreExt`] extension trait.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStorePort: Send + Sync {
    /// Read the secret document at `path`
    async fn get_secret(&self, path: &str) -> Result<Secret, ApplicationError>;

    /// List the keys stored below `path`
    async fn list_secrets(&self, path: &str) -> Result<Vec<String>, ApplicationError>;

    /// Check if the secret store is healthy and accessible
    async fn is_healthy(&self) -> bool;
}

/// Extension trait for typed secret retrieval
#[async_trait]
pub trait SecretStoreExt: SecretStorePort {
    /// Retrieve a secret and deserialize it into `T`
    async fn get_typed<T: DeserializeOwned + Send>(&self, path: &str) -> Result<T, ApplicationError> {
        let secret = self.get_secret(path).await?;
        let value = serde_json::Value::Object(secret.into_iter().collect());
        serde_json::from_value(value).map_err(|e| {
            ApplicationError::Configuration(format!("Failed to deserialize secret '{path}': {e}"))
        })
    }
}

// Blanket implementation for all types implementing SecretStorePort
impl<S: SecretStorePort + ?Sized> SecretStoreExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct PushCredentials {
        app_key: String,
        app_secret: String,
        url: String,
    }

    fn secret(value: &serde_json::Value) -> Secret {
        value
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn get_typed_deserializes_secret() {
        let mut store = MockSecretStorePort::new();
        store
            .expect_get_secret()
            .withf(|path| path == "report/pushed")
            .returning(|_| {
                Ok(secret(&json!({
                    "app_key": "k",
                    "app_secret": "s",
                    "url": "https://api.pushed.co/1/push"
                })))
            });

        let creds: PushCredentials = store.get_typed("report/pushed").await.unwrap();
        assert_eq!(creds.app_key, "k");
        assert_eq!(creds.app_secret, "s");
        assert!(creds.url.ends_with("/push"));
    }

    #[tokio::test]
    async fn get_typed_reports_missing_fields() {
        let mut store = MockSecretStorePort::new();
        store
            .expect_get_secret()
            .returning(|_| Ok(secret(&json!({"app_key": "k"}))));

        let result: Result<PushCredentials, _> = store.get_typed("report/pushed").await;
        assert!(matches!(result, Err(ApplicationError::Configuration(_))));
    }

    #[test]
    fn trait_is_object_safe() {
        fn _assert(_: &dyn SecretStorePort) {}
    }
}
