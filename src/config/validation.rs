//! Configuration validation.
//!
//! Serde handles syntactic checks; this module covers the semantic ones:
//! addresses must parse, upstream URLs must use the right schemes, and the
//! credential and heartbeat settings must be usable. Validation is a pure
//! function over the config and returns every violation, not just the first.

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic violation found in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `upstream.ws_url`.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn error(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate a config, collecting all violations.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(error(
            "listener.bind_address",
            format!("not a valid socket address: {}", config.listener.bind_address),
        ));
    }

    check_url(
        &mut errors,
        "upstream.rpc_url",
        &config.upstream.rpc_url,
        &["http", "https"],
    );
    check_url(
        &mut errors,
        "upstream.ws_url",
        &config.upstream.ws_url,
        &["ws", "wss"],
    );

    if config.upstream.api_key.is_empty() {
        errors.push(error(
            "upstream.api_key",
            "must be set (config file or RELAY_API_KEY)",
        ));
    }

    if config.heartbeat.interval_secs == 0 {
        errors.push(error("heartbeat.interval_secs", "must be greater than zero"));
    }

    if serde_json::from_str::<serde_json::Value>(&config.heartbeat.payload).is_err() {
        errors.push(error("heartbeat.payload", "must be valid JSON"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(error(
            "observability.metrics_address",
            format!(
                "not a valid socket address: {}",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, raw: &str, schemes: &[&str]) {
    match Url::parse(raw) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(error(
            field,
            format!("scheme must be one of {:?}, got {}", schemes, url.scheme()),
        )),
        Err(e) => errors.push(error(field, format!("not a valid URL: {}", e))),
    }
}
