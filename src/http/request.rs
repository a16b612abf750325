//! Request model and target rewriting.
//!
//! # Responsibilities
//! - Describe the inbound request as the hosting runtime hands it over
//! - Carry connection metadata (client IP, edge region) from the edge hop
//! - Parse the configured upstream into a forwarding target
//! - Rewrite the inbound target onto the upstream
//!
//! # Design Decisions
//! - Path and query are copied as raw bytes, never re-parsed or normalized
//! - The upstream base keeps its own path, which prefixes every request

use std::net::IpAddr;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Uri};
use url::Url;

use crate::config::validation::ValidationError;

/// Metadata the edge platform knows about the client connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionMeta {
    /// Original client address, if the platform reported one.
    pub client_ip: Option<IpAddr>,
    /// Edge region code that received the request.
    pub region: Option<String>,
}

/// An inbound request as observed by the forwarding handler.
///
/// `uri` is always in absolute form: the hosting runtime fills in the
/// scheme and authority the client used at the edge.
#[derive(Debug)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Body,
    pub meta: ConnectionMeta,
}

impl InboundRequest {
    /// Scheme the client used, without a trailing `:`.
    pub fn scheme(&self) -> &str {
        self.uri.scheme_str().unwrap_or("http")
    }

    /// Host (and port, when not the default) the client addressed.
    pub fn host(&self) -> &str {
        self.uri.authority().map(|a| a.as_str()).unwrap_or_default()
    }

    /// Raw path and query string.
    pub fn path_and_query(&self) -> &str {
        self.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
    }
}

/// The fixed upstream every request is forwarded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// Address as configured, used in operator-facing output.
    address: String,
    /// Scheme, authority and base path, with no trailing `/`.
    base: String,
    host: String,
    port: u16,
}

impl UpstreamTarget {
    /// Parse a configured upstream base URL.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        let invalid = |reason: &str| ValidationError::InvalidUpstream {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid("only plain http upstreams are supported"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?.to_string();
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("must not contain a query or fragment"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("must not contain credentials"));
        }

        Ok(Self {
            address: raw.to_string(),
            base: url.as_str().trim_end_matches('/').to_string(),
            port: url.port_or_known_default().unwrap_or(80),
            host,
        })
    }

    /// The upstream address as configured.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Upstream hostname, without port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Upstream port (explicit or scheme default).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Replace the scheme and authority of a request target with the
    /// upstream's, keeping `path_and_query` byte for byte.
    pub fn rewrite(&self, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        let target = format!("{}{}", self.base, path_and_query);
        Ok(Uri::try_from(target)?)
    }
}
