//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every
//! section has defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::blockchain::types::Scheme;
use crate::resilience::backoff::PollStrategy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Node connection settings.
    pub node: NodeConfig,

    /// Defaults applied to every transaction built by the sender.
    pub transaction: TransactionDefaults,

    /// Receipt polling settings.
    pub confirmation: PollConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:1337".to_string(),
            rpc_timeout_secs: 10,
        }
    }
}

/// Transaction field defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionDefaults {
    /// Chain identifier copied into every transaction.
    pub chain_id: i32,

    /// Protocol version copied into every transaction.
    pub version: i32,

    /// Resource budget per transaction.
    pub quota: u64,

    /// Blocks added to the current height to form `valid_until_block`.
    pub valid_block_margin: u64,

    /// Signing scheme.
    pub scheme: Scheme,

    /// Value attached to transactions (decimal or 0x-hex).
    pub value: String,
}

impl Default for TransactionDefaults {
    fn default() -> Self {
        Self {
            chain_id: 1,
            version: 0,
            quota: 1_000_000,
            valid_block_margin: 88,
            scheme: Scheme::Ecdsa,
            value: "0".to_string(),
        }
    }
}

/// Receipt confirmation polling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollConfig {
    /// Maximum number of receipt polls before giving up.
    pub max_attempts: u32,

    /// Delay after an empty poll in milliseconds.
    pub interval_ms: u64,

    /// Upper bound on the delay for the exponential strategy.
    pub max_interval_ms: u64,

    /// Delay growth strategy.
    pub strategy: PollStrategy,

    /// Wait before the first poll in milliseconds.
    pub initial_delay_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            interval_ms: 3000,
            max_interval_ms: 30_000,
            strategy: PollStrategy::Fixed,
            initial_delay_ms: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
