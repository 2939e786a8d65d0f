// ABOUTME: Runtime configuration for the CTC projects server
// ABOUTME: Reads server, storage, and CSRF settings from environment variables

pub mod constants;

use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use constants::*;

pub use ctc_core::DEFAULT_CSRF_TOKEN_TTL_SECS;

/// Default header set by the fronting authentication layer
pub const DEFAULT_PRINCIPAL_HEADER: &str = "X-Authenticated-User";

/// Default upper bound on form bodies buffered while looking for a token
pub const DEFAULT_MAX_FORM_BYTES: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid number for {name}: {source}")]
    InvalidNumber {
        name: &'static str,
        #[source]
        source: ParseIntError,
    },
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    pub database_path: PathBuf,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsrfSettings {
    /// How long a minted token stays valid
    pub token_ttl: Duration,
    /// Header carrying the authenticated principal id
    pub principal_header: String,
    /// Largest urlencoded body the gate will buffer to find a token
    pub max_form_bytes: usize,
}

impl Default for CsrfSettings {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(DEFAULT_CSRF_TOKEN_TTL_SECS),
            principal_header: DEFAULT_PRINCIPAL_HEADER.to_string(),
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageSettings,
    pub csrf: CsrfSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(CTC_API_HOST).unwrap_or_else(|| "127.0.0.1".to_string());

        let port = match lookup(CTC_API_PORT).or_else(|| lookup(PORT)) {
            Some(raw) => parse_number::<u16>(CTC_API_PORT, &raw)?,
            None => 4001,
        };

        // Validate port is in valid range
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let database_path = lookup(CTC_DATABASE_PATH)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(ctc_core::database_file);

        let max_connections = match lookup(CTC_DB_MAX_CONNECTIONS) {
            Some(raw) => parse_number::<u32>(CTC_DB_MAX_CONNECTIONS, &raw)?,
            None => 5,
        };
        if max_connections == 0 {
            return Err(ConfigError::MustBePositive(CTC_DB_MAX_CONNECTIONS));
        }

        let token_ttl_secs = match lookup(CTC_CSRF_TOKEN_TTL_SECS) {
            Some(raw) => parse_number::<u64>(CTC_CSRF_TOKEN_TTL_SECS, &raw)?,
            None => DEFAULT_CSRF_TOKEN_TTL_SECS,
        };
        if token_ttl_secs == 0 {
            return Err(ConfigError::MustBePositive(CTC_CSRF_TOKEN_TTL_SECS));
        }

        let principal_header = match lookup(CTC_CSRF_PRINCIPAL_HEADER) {
            Some(header) if header.trim().is_empty() => {
                return Err(ConfigError::Empty(CTC_CSRF_PRINCIPAL_HEADER))
            }
            Some(header) => header.trim().to_string(),
            None => DEFAULT_PRINCIPAL_HEADER.to_string(),
        };

        let max_form_bytes = match lookup(CTC_CSRF_MAX_FORM_BYTES) {
            Some(raw) => parse_number::<usize>(CTC_CSRF_MAX_FORM_BYTES, &raw)?,
            None => DEFAULT_MAX_FORM_BYTES,
        };
        if max_form_bytes == 0 {
            return Err(ConfigError::MustBePositive(CTC_CSRF_MAX_FORM_BYTES));
        }

        debug!(
            host = %host,
            port,
            database = %database_path.display(),
            token_ttl_secs,
            "Loaded configuration"
        );

        Ok(Config {
            server: ServerConfig { host, port },
            storage: StorageSettings {
                database_path,
                max_connections,
            },
            csrf: CsrfSettings {
                token_ttl: Duration::from_secs(token_ttl_secs),
                principal_header,
                max_form_bytes,
            },
        })
    }
}

fn parse_number<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    raw.trim()
        .parse::<T>()
        .map_err(|source| ConfigError::InvalidNumber { name, source })
}
