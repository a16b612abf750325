//! Header manipulation for forwarded requests.
//!
//! # Responsibilities
//! - Provide an ordered header multimap with add/set/delete/iterate
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host
//! - Force Host to the upstream hostname
//! - Strip hop-by-hop headers and headers injected by the edge hop
//!
//! # Design Decisions
//! - Every operation consumes the set and returns a new one; the inbound
//!   request's headers are only ever read
//! - X-Forwarded-* values overwrite anything the client sent

use axum::http::header::{self, AsHeaderName, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::config::validation::ValidationError;
use crate::http::request::InboundRequest;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Connection-scoped headers that never travel past one hop.
const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// An ordered header multimap, transformed by value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderSet {
    inner: HeaderMap,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping any existing values for `name`.
    pub fn add(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.inner.append(name, value);
        self
    }

    /// Replace all values for `name` with `value`.
    pub fn set(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.inner.insert(name, value);
        self
    }

    /// Remove all values for `name`.
    pub fn delete<K: AsHeaderName>(mut self, name: K) -> Self {
        self.inner.remove(name);
        self
    }

    /// Keep only the headers whose name satisfies `keep`.
    pub fn retain(self, mut keep: impl FnMut(&HeaderName) -> bool) -> Self {
        let mut out = HeaderMap::with_capacity(self.inner.len());
        for (name, value) in self.inner.iter() {
            if keep(name) {
                out.append(name.clone(), value.clone());
            }
        }
        Self { inner: out }
    }

    pub fn get<K: AsHeaderName>(&self, name: K) -> Option<&HeaderValue> {
        self.inner.get(name)
    }

    pub fn contains<K: AsHeaderName>(&self, name: K) -> bool {
        self.inner.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn into_header_map(self) -> HeaderMap {
        self.inner
    }

    /// Render as a JSON array of `[name, value]` pairs for logging.
    pub fn to_json(&self) -> Value {
        header_map_json(&self.inner)
    }
}

impl From<&HeaderMap> for HeaderSet {
    fn from(map: &HeaderMap) -> Self {
        Self { inner: map.clone() }
    }
}

impl From<HeaderMap> for HeaderSet {
    fn from(inner: HeaderMap) -> Self {
        Self { inner }
    }
}

/// Render a header map as a JSON array of `[name, value]` pairs.
pub fn header_map_json(map: &HeaderMap) -> Value {
    Value::Array(
        map.iter()
            .map(|(name, value)| {
                Value::Array(vec![
                    Value::from(name.as_str()),
                    Value::from(String::from_utf8_lossy(value.as_bytes()).into_owned()),
                ])
            })
            .collect(),
    )
}

/// Header rewriting applied to every forwarded request.
#[derive(Debug, Clone)]
pub struct ForwardingRules {
    upstream_host: HeaderValue,
    strip: Vec<HeaderName>,
}

impl ForwardingRules {
    /// Build rules for an upstream hostname and a list of edge-hop headers.
    pub fn new(upstream_host: &str, strip: &[String]) -> Result<Self, ValidationError> {
        let upstream_host = HeaderValue::from_str(upstream_host).map_err(|_| {
            ValidationError::InvalidUpstream {
                url: upstream_host.to_string(),
                reason: "hostname is not a valid Host header".to_string(),
            }
        })?;

        let strip = strip
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                    ValidationError::InvalidHeaderName {
                        field: "edge.strip_headers",
                        value: name.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { upstream_host, strip })
    }

    /// Produce the outbound header set for `request`.
    pub fn apply(&self, request: &InboundRequest) -> HeaderSet {
        let connection_scoped = connection_tokens(&request.headers);
        let client_ip = request
            .meta
            .client_ip
            .map(|ip| ip.to_string())
            .unwrap_or_default();

        let headers = HeaderSet::from(&request.headers).retain(|name| {
            !HOP_BY_HOP.contains(&name.as_str()) && !connection_scoped.contains(name)
        });

        // Edge headers go first so a strip entry can never remove a forced value
        self.strip
            .iter()
            .fold(headers, |headers, name| headers.delete(name))
            .set(header::HOST, self.upstream_host.clone())
            .set(X_FORWARDED_FOR, header_value(&client_ip))
            .set(X_FORWARDED_HOST, header_value(request.host()))
            .set(X_FORWARDED_PROTO, header_value(request.scheme()))
    }
}

/// Header names listed in `Connection`, which are scoped to this hop.
fn connection_tokens(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static(""))
}
