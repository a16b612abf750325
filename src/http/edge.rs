//! Edge hop metadata.
//!
//! # Responsibilities
//! - Turn a request accepted by the server into an `InboundRequest`
//! - Recover the client-facing scheme and host
//! - Recover the client IP and edge region reported by the edge hop
//!
//! # Design Decisions
//! - Edge headers are trusted only when configured by name
//! - Missing or unparseable metadata degrades to "unknown", never an error

use std::net::{IpAddr, SocketAddr};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request, Uri};

use crate::config::validation::ValidationError;
use crate::config::EdgeConfig;
use crate::http::request::{ConnectionMeta, InboundRequest};

/// How to read edge metadata off a request.
#[derive(Debug, Clone, Default)]
pub struct EdgeRules {
    client_ip_header: Option<HeaderName>,
    region_header: Option<HeaderName>,
    region: Option<String>,
    scheme_header: Option<HeaderName>,
}

impl EdgeRules {
    pub fn from_config(config: &EdgeConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            client_ip_header: header_name("edge.client_ip_header", &config.client_ip_header)?,
            region_header: header_name("edge.region_header", &config.region_header)?,
            region: config.region.clone(),
            scheme_header: header_name("edge.scheme_header", &config.scheme_header)?,
        })
    }

    /// Build the handler's view of `request`.
    ///
    /// `peer` is the TCP peer, `local` the listener address used when the
    /// request names no host at all.
    pub fn inbound(
        &self,
        request: Request<Body>,
        peer: SocketAddr,
        local: SocketAddr,
    ) -> Result<InboundRequest, axum::http::Error> {
        let (parts, body) = request.into_parts();

        let scheme = self.scheme(&parts.headers);
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| local.to_string());
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let uri = Uri::builder()
            .scheme(scheme)
            .authority(host.as_str())
            .path_and_query(path_and_query)
            .build()?;

        let meta = ConnectionMeta {
            client_ip: Some(self.client_ip(&parts.headers).unwrap_or(peer.ip())),
            region: self.region(&parts.headers),
        };

        Ok(InboundRequest {
            method: parts.method,
            uri,
            headers: parts.headers,
            body,
            meta,
        })
    }

    fn scheme(&self, headers: &HeaderMap) -> &'static str {
        let value = self
            .scheme_header
            .as_ref()
            .and_then(|name| headers.get(name))
            .and_then(|v| v.to_str().ok())
            .map(str::trim);

        match value.and_then(parse_scheme) {
            Some(scheme) => scheme,
            None => "http",
        }
    }

    fn client_ip(&self, headers: &HeaderMap) -> Option<IpAddr> {
        let name = self.client_ip_header.as_ref()?;
        let value = headers.get(name)?.to_str().ok()?;
        // A forwarded-for style list names the client first
        value.split(',').next()?.trim().parse().ok()
    }

    fn region(&self, headers: &HeaderMap) -> Option<String> {
        self.region_header
            .as_ref()
            .and_then(|name| headers.get(name))
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| self.region.clone())
    }
}

/// Accept a bare scheme or a visitor object such as `{"scheme":"https"}`.
fn parse_scheme(value: &str) -> Option<&'static str> {
    let scheme = if value.starts_with('{') {
        let visitor: serde_json::Value = serde_json::from_str(value).ok()?;
        visitor.get("scheme")?.as_str()?.to_ascii_lowercase()
    } else {
        value.to_ascii_lowercase()
    };

    match scheme.as_str() {
        "http" => Some("http"),
        "https" => Some("https"),
        _ => None,
    }
}

fn header_name(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<HeaderName>, ValidationError> {
    value
        .as_deref()
        .map(|v| {
            HeaderName::from_bytes(v.as_bytes()).map_err(|_| ValidationError::InvalidHeaderName {
                field,
                value: v.to_string(),
            })
        })
        .transpose()
}
