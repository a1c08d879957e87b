//! Database configuration
//!
//! Connection details for each node role live in the vault under
//! `{role}/database`; only pool tuning and the optional local SQLite
//! override come from the config file.

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use super::default_true;

/// Pool settings shared by every database a process opens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Maximum number of concurrent connections per database
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a free (or new) connection before giving up
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Use this SQLite database for every role instead of the vault-provided
    /// Postgres servers (e.g. `sqlite:pihome.db`)
    #[serde(default)]
    pub sqlite_url: Option<String>,

    /// Run the bundled migrations when opening a SQLite database
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_acquire_timeout() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlite_url: None,
            run_migrations: true,
        }
    }
}

/// Contents of a `{role}/database` vault secret
#[derive(Clone, Deserialize)]
pub struct DatabaseSecret {
    pub hostname: String,
    pub user: String,
    pub password: SecretString,
    #[serde(default = "default_port", deserialize_with = "port_from_any")]
    pub port: u16,
    pub dbname: String,
    #[serde(default)]
    pub schema: Option<String>,
}

const fn default_port() -> u16 {
    5432
}

impl fmt::Debug for DatabaseSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSecret")
            .field("hostname", &self.hostname)
            .field("user", &self.user)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Vault KV values are often strings even when they hold numbers
fn port_from_any<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port: {text}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn secret_accepts_string_port() {
        let secret: DatabaseSecret = serde_json::from_value(json!({
            "hostname": "db.lan",
            "user": "sensor",
            "password": "pw",
            "port": "5433",
            "dbname": "pihome",
            "schema": "sensor"
        }))
        .unwrap();
        assert_eq!(secret.port, 5433);
        assert_eq!(secret.password.expose_secret(), "pw");
        assert_eq!(secret.schema.as_deref(), Some("sensor"));
    }

    #[test]
    fn secret_port_defaults() {
        let secret: DatabaseSecret = serde_json::from_value(json!({
            "hostname": "db.lan",
            "user": "u",
            "password": "pw",
            "port": 5432,
            "dbname": "pihome"
        }))
        .unwrap();
        assert_eq!(secret.port, 5432);
        assert!(secret.schema.is_none());
    }

    #[test]
    fn bad_port_is_rejected() {
        let result: Result<DatabaseSecret, _> = serde_json::from_value(json!({
            "hostname": "db.lan",
            "user": "u",
            "password": "pw",
            "port": "fifty",
            "dbname": "pihome"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn debug_hides_password() {
        let secret: DatabaseSecret = serde_json::from_value(json!({
            "hostname": "h", "user": "u", "password": "hunter2", "dbname": "d"
        }))
        .unwrap();
        assert!(!format!("{secret:?}").contains("hunter2"));
    }

    #[test]
    fn pool_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 5);
        assert!(config.sqlite_url.is_none());
        assert!(config.run_migrations);
    }
}
