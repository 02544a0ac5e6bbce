//! Server configuration from the environment.

use std::path::PathBuf;
use thiserror::Error;

/// Address the server binds when `GKS_ADDRESS` is unset.
pub const DEFAULT_ADDRESS: &str = "localhost:6085";

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The relational store cannot start without a DSN.
    #[error("DATABASE_DSN must be set")]
    MissingDatabaseDsn,
}

/// Server settings.
///
/// TLS is considered enabled only when both the certificate and the
/// key path are present; with either missing the transport stays
/// plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (`GKS_ADDRESS`).
    pub address: String,
    /// Relational store connection string (`DATABASE_DSN`).
    pub database_dsn: String,
    /// TLS certificate path (`CERTIFICATE`).
    pub certificate: Option<PathBuf>,
    /// TLS private key path (`CRYPTO_KEY`).
    pub crypto_key: Option<PathBuf>,
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let address = lookup("GKS_ADDRESS")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        let database_dsn = lookup("DATABASE_DSN")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingDatabaseDsn)?;
        let certificate = lookup("CERTIFICATE")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let crypto_key = lookup("CRYPTO_KEY")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            address,
            database_dsn,
            certificate,
            crypto_key,
        })
    }

    /// Whether the transport should negotiate TLS.
    pub fn tls_enabled(&self) -> bool {
        self.certificate.is_some() && self.crypto_key.is_some()
    }
}
