//! Vault connection and unseal configuration
//!
//! Nodes authenticate with AppRole. The role and secret ids are normally
//! provisioned as the plain `ROLE_ID` / `SECRET_ID` environment variables
//! next to `VAULT_URL`; [`VaultAppConfig::apply_env`] picks those up on top
//! of whatever the config file says.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;

/// Vault secret store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultAppConfig {
    /// Vault server address
    #[serde(default = "default_vault_address")]
    pub address: String,

    /// AppRole role ID
    #[serde(default)]
    pub role_id: Option<String>,

    /// AppRole secret ID
    #[serde(default, skip_serializing)]
    pub secret_id: Option<SecretString>,

    /// KV v1 mount holding the node secrets
    #[serde(default = "default_mount_path")]
    pub mount_path: String,

    /// Backoff used while the vault is unreachable at startup
    #[serde(default = "default_connect_retry")]
    pub connect_retry: RetryConfig,

    #[serde(default)]
    pub unseal: UnsealConfig,
}

fn default_vault_address() -> String {
    "http://127.0.0.1:8200".to_string()
}

fn default_mount_path() -> String {
    "kv".to_string()
}

/// Half a second before the first retry, ten seconds after that
const fn default_connect_retry() -> RetryConfig {
    RetryConfig::new(500, 10_000, 20.0, None)
}

impl Default for VaultAppConfig {
    fn default() -> Self {
        Self {
            address: default_vault_address(),
            role_id: None,
            secret_id: None,
            mount_path: default_mount_path(),
            connect_retry: default_connect_retry(),
            unseal: UnsealConfig::default(),
        }
    }
}

impl VaultAppConfig {
    /// Overlay `VAULT_URL`, `ROLE_ID` and `SECRET_ID` from the environment
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("VAULT_URL").filter(|v| !v.is_empty()) {
            self.address = url;
        }
        if let Some(role_id) = lookup("ROLE_ID").filter(|v| !v.is_empty()) {
            self.role_id = Some(role_id);
        }
        if let Some(secret_id) = lookup("SECRET_ID").filter(|v| !v.is_empty()) {
            self.secret_id = Some(SecretString::from(secret_id));
        }
        self.unseal.apply_vars(lookup);
    }
}

/// Boot-time unseal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsealConfig {
    /// Vault API address used for the seal endpoints (`VAULT_ADDR`)
    #[serde(default = "default_vault_address")]
    pub address: String,

    /// Local port to wait on before talking to the API (`VAULT_PORT`)
    #[serde(default = "default_port")]
    pub port: u16,

    /// How long to wait for the port to accept connections
    #[serde(default = "default_port_timeout_secs")]
    pub port_timeout_secs: u64,

    /// Unseal keys are read from `{key_prefix}1`, `{key_prefix}2`, ...
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

const fn default_port() -> u16 {
    8200
}

const fn default_port_timeout_secs() -> u64 {
    5
}

fn default_key_prefix() -> String {
    "VAULT_UNSEAL_KEY".to_string()
}

impl Default for UnsealConfig {
    fn default() -> Self {
        Self {
            address: default_vault_address(),
            port: default_port(),
            port_timeout_secs: default_port_timeout_secs(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl UnsealConfig {
    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("VAULT_ADDR").filter(|v| !v.is_empty()) {
            self.address = addr;
        }
        if let Some(port) = lookup("VAULT_PORT").and_then(|v| v.parse().ok()) {
            self.port = port;
        }
    }
}
