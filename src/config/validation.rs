//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, quota > 0, margins > 0)
//! - Check the default value parses as an amount
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use crate::blockchain::value::parse_value;
use crate::config::schema::AppConfig;
use crate::resilience::backoff::PollStrategy;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
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

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.node.rpc_url.parse::<url::Url>() {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "node.rpc_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("node.rpc_url", e.to_string())),
    }
    if config.node.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("node.rpc_timeout_secs", "must be greater than 0"));
    }

    let tx = &config.transaction;
    if tx.quota == 0 {
        errors.push(ValidationError::new("transaction.quota", "must be greater than 0"));
    }
    if tx.valid_block_margin == 0 {
        errors.push(ValidationError::new(
            "transaction.valid_block_margin",
            "must be greater than 0",
        ));
    }
    if let Err(e) = parse_value(&tx.value) {
        errors.push(ValidationError::new("transaction.value", e.to_string()));
    }

    let poll = &config.confirmation;
    if poll.max_attempts == 0 {
        errors.push(ValidationError::new(
            "confirmation.max_attempts",
            "must be greater than 0",
        ));
    }
    if poll.interval_ms == 0 {
        errors.push(ValidationError::new(
            "confirmation.interval_ms",
            "must be greater than 0",
        ));
    }
    if poll.strategy == PollStrategy::Exponential && poll.max_interval_ms < poll.interval_ms {
        errors.push(ValidationError::new(
            "confirmation.max_interval_ms",
            "must not be below interval_ms",
        ));
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", obs.log_level),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = AppConfig::default();
        config.node.rpc_url = "ws://127.0.0.1:1337".to_string();
        config.transaction.quota = 0;
        config.transaction.value = "0xnothex".to_string();
        config.confirmation.max_attempts = 0;
        config.observability.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "node.rpc_url",
                "transaction.quota",
                "transaction.value",
                "confirmation.max_attempts",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn test_exponential_bounds() {
        let mut config = AppConfig::default();
        config.confirmation.strategy = PollStrategy::Exponential;
        config.confirmation.max_interval_ms = 10;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "confirmation.max_interval_ms");
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "nowhere".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
