//! The forwarding handler.
//!
//! One call per inbound request: rewrite the target onto the upstream,
//! transform the headers, send, and pass the upstream response through.
//! A transport failure never escapes; it becomes a 502 diagnostic page.

use std::time::{Duration, Instant};

use axum::{
    http::Request,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::config::{ConfigError, ProxyConfig};
use crate::http::request::{InboundRequest, UpstreamTarget};
use crate::http::response::DiagnosticPage;
use crate::observability::metrics;
use crate::proxy::headers::{header_map_json, ForwardingRules};
use crate::proxy::redirect::RedirectPolicy;
use crate::proxy::transport::{HyperTransport, Transport, TransportError};

/// Forwards requests to a single fixed upstream.
pub struct ForwardingHandler<T = HyperTransport> {
    target: UpstreamTarget,
    rules: ForwardingRules,
    transport: T,
    upstream_timeout: Duration,
    debug: bool,
}

impl ForwardingHandler<HyperTransport> {
    /// Build a handler with the hyper transport described by `config`.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let transport = HyperTransport::new(
            Duration::from_secs(config.timeouts.connect_secs),
            RedirectPolicy::from(&config.upstream),
        );
        Self::new(config, transport)
    }
}

impl<T: Transport> ForwardingHandler<T> {
    pub fn new(config: &ProxyConfig, transport: T) -> Result<Self, ConfigError> {
        let target = UpstreamTarget::parse(&config.upstream.base_url)
            .map_err(|e| ConfigError::Validation(vec![e]))?;
        let rules = ForwardingRules::new(target.host(), &config.edge.strip_headers)
            .map_err(|e| ConfigError::Validation(vec![e]))?;

        Ok(Self {
            target,
            rules,
            transport,
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
            debug: config.observability.debug,
        })
    }

    pub fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    /// Handle one inbound request. Always yields a response.
    pub async fn handle(&self, request: InboundRequest) -> Response {
        let start_time = Instant::now();
        let method = request.method.clone();
        let meta = request.meta.clone();

        match self.forward(request).await {
            Ok(response) => {
                metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
                response
            }
            Err(e) => {
                let reason = e.detail();
                tracing::error!(
                    method = %method,
                    upstream = %self.target.address(),
                    error = %reason,
                    "Upstream request failed"
                );
                metrics::record_upstream_error();
                metrics::record_request(method.as_str(), 502, start_time);

                DiagnosticPage {
                    reason,
                    target: self.target.address().to_string(),
                    port: self.target.port(),
                    timestamp: Utc::now(),
                    region: meta.region,
                    client_ip: meta.client_ip,
                }
                .into_response()
            }
        }
    }

    async fn forward(&self, request: InboundRequest) -> Result<Response, TransportError> {
        let uri = self.target.rewrite(request.path_and_query())?;
        let headers = self.rules.apply(&request);

        if self.debug {
            tracing::info!(
                original_url = %request.uri,
                target_url = %uri,
                method = %request.method,
                headers = %headers.to_json(),
                "Forwarding request"
            );
        }

        let InboundRequest { method, body, .. } = request;
        let mut outbound = Request::new(body);
        *outbound.method_mut() = method;
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers.into_header_map();

        let response = tokio::time::timeout(self.upstream_timeout, self.transport.send(outbound))
            .await
            .map_err(|_| TransportError::Timeout(self.upstream_timeout))??;

        if self.debug {
            tracing::info!(
                status = response.status().as_u16(),
                headers = %header_map_json(response.headers()),
                "Upstream responded"
            );
        }

        Ok(response)
    }
}
