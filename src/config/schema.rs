//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the minter.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MinterConfig {
    /// Chain connection settings.
    pub chain: ChainConfig,

    /// Token contract settings.
    pub token: TokenConfig,

    /// Signing key source.
    pub wallet: WalletConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Chain connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Chain ID (11155111 for Sepolia, 31337 for local Anvil).
    pub chain_id: u64,

    /// Timeout for a single RPC request in seconds.
    pub rpc_timeout_secs: u64,

    /// Interval between receipt polls in milliseconds.
    pub receipt_poll_interval_ms: u64,

    /// How long a submitted transaction may stay unknown to the node before
    /// it is reported as dropped, in milliseconds.
    pub tx_drop_grace_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc.sepolia.org".to_string(),
            chain_id: 11155111,
            rpc_timeout_secs: 10,
            receipt_poll_interval_ms: 2000,
            tx_drop_grace_ms: 60_000,
        }
    }
}

/// Token contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Deployed token contract address.
    pub address: String,

    /// Fractional digits shown when displaying balances.
    pub display_decimals: u8,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            address: "0x60a6AA5cA0F25cD5B6E387635c021D96e303904c".to_string(),
            display_decimals: 4,
        }
    }
}

/// Where the signing key comes from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Environment variable holding the hex private key.
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: "MINTER_PRIVATE_KEY".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
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
