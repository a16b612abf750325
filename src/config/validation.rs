//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the upstream URL is a usable plain HTTP base
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check configured edge header names are valid HTTP header names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;

use crate::config::schema::ProxyConfig;
use crate::http::request::UpstreamTarget;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `upstream.base_url` was not set.
    MissingUpstream,
    /// `upstream.base_url` could not be used as a forwarding target.
    InvalidUpstream { url: String, reason: String },
    /// An address field does not parse as `ip:port`.
    InvalidAddress { field: &'static str, value: String },
    /// A configured header name is not a valid HTTP header name.
    InvalidHeaderName { field: &'static str, value: String },
    /// A timeout was set to zero.
    ZeroTimeout(&'static str),
    /// The upstream deadline does not fit inside the request lifetime.
    UpstreamTimeoutTooLong { upstream_secs: u64, request_secs: u64 },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingUpstream => write!(f, "upstream.base_url is required"),
            ValidationError::InvalidUpstream { url, reason } => {
                write!(f, "upstream.base_url `{}` is invalid: {}", url, reason)
            }
            ValidationError::InvalidAddress { field, value } => {
                write!(f, "{} `{}` is not a valid socket address", field, value)
            }
            ValidationError::InvalidHeaderName { field, value } => {
                write!(f, "{} `{}` is not a valid header name", field, value)
            }
            ValidationError::ZeroTimeout(field) => write!(f, "{} must be greater than zero", field),
            ValidationError::UpstreamTimeoutTooLong { upstream_secs, request_secs } => write!(
                f,
                "timeouts.upstream_secs ({}) must be less than timeouts.request_secs ({})",
                upstream_secs, request_secs
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.upstream.base_url.trim().is_empty() {
        errors.push(ValidationError::MissingUpstream);
    } else if let Err(e) = UpstreamTarget::parse(&config.upstream.base_url) {
        errors.push(e);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let edge = &config.edge;
    let named = [
        ("edge.client_ip_header", edge.client_ip_header.as_deref()),
        ("edge.region_header", edge.region_header.as_deref()),
        ("edge.scheme_header", edge.scheme_header.as_deref()),
    ];
    for (field, value) in named {
        if let Some(value) = value {
            check_header_name(field, value, &mut errors);
        }
    }
    for value in &edge.strip_headers {
        check_header_name("edge.strip_headers", value, &mut errors);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.connect_secs"));
    }
    let timeouts = &config.timeouts;
    if timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.upstream_secs"));
    }
    if timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    } else if timeouts.upstream_secs >= timeouts.request_secs {
        errors.push(ValidationError::UpstreamTimeoutTooLong {
            upstream_secs: timeouts.upstream_secs,
            request_secs: timeouts.request_secs,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_header_name(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if HeaderName::from_bytes(value.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName {
            field,
            value: value.to_string(),
        });
    }
}
