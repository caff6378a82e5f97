//! # Node Configuration
//!
//! Unified configuration for the node's subsystems.
//!
//! ## Environment Overrides
//!
//! | Variable | Field | Notes |
//! |----------|-------|-------|
//! | `CR_REGISTRY_TIMEOUT_MS` | `registry.acquire_timeout` | `0` waits indefinitely |
//! | `CR_MAX_TX_BYTES` | `ledger.max_tx_bytes` | must be non-zero |
//! | `CR_BUS_CAPACITY` | `bus.channel_capacity` | must be non-zero |
//! | `CR_BOOTSTRAP_ADMIN` | `bootstrap.admin_passphrase` | first admin, registered at startup |
//! | `CR_CONSOLE` | `console.enabled` | `1`/`true` serves the line console on stdin |

use cr_02_form_pipeline::DEFAULT_MAX_TX_BYTES;
use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const ENV_REGISTRY_TIMEOUT_MS: &str = "CR_REGISTRY_TIMEOUT_MS";
pub const ENV_MAX_TX_BYTES: &str = "CR_MAX_TX_BYTES";
pub const ENV_BUS_CAPACITY: &str = "CR_BUS_CAPACITY";
pub const ENV_BOOTSTRAP_ADMIN: &str = "CR_BOOTSTRAP_ADMIN";
pub const ENV_CONSOLE: &str = "CR_CONSOLE";

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Identity registry configuration.
    pub registry: RegistryConfig,
    /// Ledger configuration.
    pub ledger: LedgerConfig,
    /// Event bus configuration.
    pub bus: BusConfig,
    /// Startup configuration.
    pub bootstrap: BootstrapConfig,
    /// Line console configuration.
    pub console: ConsoleConfig,
}

impl NodeConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `CR_*` overrides supplied by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_REGISTRY_TIMEOUT_MS) {
            let millis: u64 = parse(ENV_REGISTRY_TIMEOUT_MS, &raw)?;
            self.registry.acquire_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }
        if let Some(raw) = lookup(ENV_MAX_TX_BYTES) {
            self.ledger.max_tx_bytes = parse(ENV_MAX_TX_BYTES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BUS_CAPACITY) {
            self.bus.channel_capacity = parse(ENV_BUS_CAPACITY, &raw)?;
        }
        if let Some(passphrase) = lookup(ENV_BOOTSTRAP_ADMIN) {
            self.bootstrap.admin_passphrase = Some(passphrase);
        }
        if let Some(raw) = lookup(ENV_CONSOLE) {
            self.console.enabled = parse_flag(ENV_CONSOLE, &raw)?;
        }
        Ok(())
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.channel_capacity == 0 {
            return Err(ConfigError::ZeroBusCapacity);
        }
        if self.ledger.max_tx_bytes == 0 {
            return Err(ConfigError::ZeroMaxTxBytes);
        }
        if self
            .bootstrap
            .admin_passphrase
            .as_deref()
            .is_some_and(str::is_empty)
        {
            return Err(ConfigError::EmptyBootstrapPassphrase);
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
    })
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment override could not be parsed.
    #[error("{var} has invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Bus channel capacity must be greater than zero")]
    ZeroBusCapacity,

    #[error("Maximum transaction size must be greater than zero")]
    ZeroMaxTxBytes,

    #[error("{ENV_BOOTSTRAP_ADMIN} is set but empty")]
    EmptyBootstrapPassphrase,
}

/// Identity registry configuration.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Upper bound on waiting for the registry; `None` waits indefinitely.
    pub acquire_timeout: Option<Duration>,
}

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Largest transaction body accepted, in bytes.
    pub max_tx_bytes: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_tx_bytes: DEFAULT_MAX_TX_BYTES,
        }
    }
}

/// Event bus configuration.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Events buffered per subscriber before the slowest one lags.
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Startup configuration.
#[derive(Clone, Default)]
pub struct BootstrapConfig {
    /// Passphrase of the admin registered at startup.
    pub admin_passphrase: Option<String>,
}

impl fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field(
                "admin_passphrase",
                &self.admin_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Line console configuration.
#[derive(Debug, Clone, Default)]
pub struct ConsoleConfig {
    /// Serve JSON command lines on stdin/stdout.
    pub enabled: bool,
}
