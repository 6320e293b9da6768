//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, min wait <= max wait)
//! - Check the endpoint override parses as a URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::ClientConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
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

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.api_key.trim().is_empty() {
        errors.push(ValidationError::new(
            "api_key",
            "HLB API key is required (set --api-key or HLB_API_KEY)",
        ));
    }
    if config.region.trim().is_empty() {
        errors.push(ValidationError::new(
            "region",
            "AWS region is required (set --region or AWS_REGION)",
        ));
    }

    if let Some(endpoint) = &config.endpoint {
        match url::Url::parse(endpoint) {
            Ok(url) if url.host_str().is_some() => {}
            Ok(_) => errors.push(ValidationError::new("endpoint", "URL has no host")),
            Err(e) => errors.push(ValidationError::new("endpoint", format!("invalid URL: {}", e))),
        }
    }
    if let Some(sts) = &config.identity.sts_endpoint {
        if let Err(e) = url::Url::parse(sts) {
            errors.push(ValidationError::new(
                "identity.sts_endpoint",
                format!("invalid URL: {}", e),
            ));
        }
    }

    if config.credentials.validity_secs == 0 {
        errors.push(ValidationError::new("credentials.validity_secs", "must be greater than 0"));
    }

    if config.retries.min_wait_ms > config.retries.max_wait_ms {
        errors.push(ValidationError::new(
            "retries.min_wait_ms",
            "must not exceed retries.max_wait_ms",
        ));
    }

    let reconcile = &config.reconcile;
    if reconcile.poll_min_ms == 0 {
        errors.push(ValidationError::new("reconcile.poll_min_ms", "must be greater than 0"));
    }
    if reconcile.poll_min_ms > reconcile.poll_max_ms {
        errors.push(ValidationError::new(
            "reconcile.poll_min_ms",
            "must not exceed reconcile.poll_max_ms",
        ));
    }
    for (field, value) in [
        ("reconcile.create_timeout_secs", reconcile.create_timeout_secs),
        ("reconcile.update_timeout_secs", reconcile.update_timeout_secs),
        ("reconcile.delete_timeout_secs", reconcile.delete_timeout_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
