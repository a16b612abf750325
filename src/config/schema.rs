//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the forwarder.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge forwarder.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream every request is forwarded to.
    pub upstream: UpstreamConfig,

    /// How the hosting runtime derives edge metadata from requests.
    pub edge: EdgeConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream (e.g., "http://origin.internal:8001").
    /// Required; an empty value fails validation.
    pub base_url: String,

    /// Follow 3xx responses from the upstream instead of returning them.
    pub follow_redirects: bool,

    /// Maximum number of redirects followed before giving up.
    pub max_redirects: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            follow_redirects: true,
            max_redirects: 20,
        }
    }
}

/// Edge hop metadata configuration.
///
/// The edge platform in front of the forwarder describes the client
/// connection through request headers. These settings name those headers
/// and list the ones that must not reach the upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Header carrying the original client IP. Falls back to the TCP peer.
    pub client_ip_header: Option<String>,

    /// Header carrying the edge region code.
    pub region_header: Option<String>,

    /// Static region code used when no region header is present.
    pub region: Option<String>,

    /// Header carrying the scheme the client used at the edge.
    pub scheme_header: Option<String>,

    /// Headers injected by the edge hop, removed before forwarding.
    pub strip_headers: Vec<String>,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            client_ip_header: Some("cf-connecting-ip".to_string()),
            region_header: None,
            region: None,
            scheme_header: Some("cf-visitor".to_string()),
            strip_headers: vec![
                "cf-connecting-ip".to_string(),
                "cf-ray".to_string(),
                "cf-visitor".to_string(),
            ],
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the upstream to answer, redirects included, in
    /// seconds. Must stay below `request_secs`.
    pub upstream_secs: u64,

    /// Request lifetime limit (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            upstream_secs: 90,
            request_secs: 100,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log every forwarded request and upstream response in detail.
    pub debug: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            base_url = "http://origin.internal:8001"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.base_url, "http://origin.internal:8001");
        assert!(config.upstream.follow_redirects);
        assert_eq!(config.upstream.max_redirects, 20);
        assert!(!config.observability.debug);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.edge.strip_headers.len(), 3);
        assert_eq!(config.timeouts.upstream_secs, 90);
    }

    #[test]
    fn test_full_config() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [upstream]
            base_url = "http://10.0.0.2:8001"
            follow_redirects = false

            [edge]
            client_ip_header = "x-real-ip"
            region = "fra"
            strip_headers = ["x-edge-id"]

            [observability]
            debug = true
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert!(!config.upstream.follow_redirects);
        assert_eq!(config.edge.client_ip_header.as_deref(), Some("x-real-ip"));
        assert_eq!(config.edge.region.as_deref(), Some("fra"));
        assert_eq!(config.edge.strip_headers, vec!["x-edge-id".to_string()]);
        // Unset fields in a present section keep their defaults
        assert_eq!(config.edge.scheme_header.as_deref(), Some("cf-visitor"));
        assert!(config.observability.debug);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
