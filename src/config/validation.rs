//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees syntactically.
//! Validation is a pure function over the whole config and reports every
//! violation, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{FixedWindowConfig, GatewayConfig};

/// A single semantic violation, pointing at the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration before it is accepted into the system.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            "not a valid socket address",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    validate_window(
        &config.admission.global_window,
        "admission.global_window",
        &mut errors,
    );
    validate_window(
        &config.admission.per_client,
        "admission.per_client",
        &mut errors,
    );

    let bucket = &config.admission.token_bucket;
    if bucket.capacity == 0 {
        errors.push(ValidationError::new(
            "admission.token_bucket.capacity",
            "must be greater than zero",
        ));
    }
    if bucket.refill_amount == 0 {
        errors.push(ValidationError::new(
            "admission.token_bucket.refill_amount",
            "must be greater than zero",
        ));
    }
    if bucket.refill_period_secs == 0 {
        errors.push(ValidationError::new(
            "admission.token_bucket.refill_period_secs",
            "must be greater than zero",
        ));
    }

    let resilience = &config.resilience;
    if resilience.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "resilience.timeout_secs",
            "must be greater than zero",
        ));
    }
    if resilience.max_delay_ms < resilience.base_delay_ms {
        errors.push(ValidationError::new(
            "resilience.max_delay_ms",
            "must be at least base_delay_ms",
        ));
    }

    if config.broker.url.is_empty() {
        errors.push(ValidationError::new("broker.url", "must not be empty"));
    }
    if config.broker.queue.is_empty() {
        errors.push(ValidationError::new("broker.queue", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a valid socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_window(window: &FixedWindowConfig, field: &str, errors: &mut Vec<ValidationError>) {
    if window.permit_limit == 0 {
        errors.push(ValidationError::new(
            &format!("{field}.permit_limit"),
            "must be greater than zero",
        ));
    }
    if window.window_secs == 0 {
        errors.push(ValidationError::new(
            &format!("{field}.window_secs"),
            "must be greater than zero",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn reports_all_violations_at_once() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.admission.global_window.permit_limit = 0;
        config.broker.queue = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "listener.bind_address"));
        assert!(errors
            .iter()
            .any(|e| e.field == "admission.global_window.permit_limit"));
        assert!(errors.iter().any(|e| e.field == "broker.queue"));
    }

    #[test]
    fn rejects_max_delay_below_base_delay() {
        let mut config = GatewayConfig::default();
        config.resilience.base_delay_ms = 5000;
        config.resilience.max_delay_ms = 1000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "resilience.max_delay_ms");
    }
}
