//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, display precision)
//! - Check addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MinterConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::MinterConfig;
use crate::token::units::parse_recipient;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &MinterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.chain.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new("chain.rpc_url", format!("invalid URL: {}", e)));
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be greater than 0"));
    }
    if config.chain.receipt_poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "chain.receipt_poll_interval_ms",
            "must be greater than 0",
        ));
    }

    if config.chain.tx_drop_grace_ms < config.chain.receipt_poll_interval_ms {
        errors.push(ValidationError::new(
            "chain.tx_drop_grace_ms",
            "must be at least chain.receipt_poll_interval_ms",
        ));
    }

    if let Err(e) = parse_recipient(&config.token.address) {
        errors.push(ValidationError::new("token.address", e.to_string()));
    }
    if config.token.display_decimals > 18 {
        errors.push(ValidationError::new("token.display_decimals", "must be at most 18"));
    }

    if config.wallet.private_key_env.is_empty() {
        errors.push(ValidationError::new("wallet.private_key_env", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address such as 127.0.0.1:9090",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
