//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Send the rewritten request to the upstream
//! - Follow redirects according to the configured policy
//! - Classify every transport-level failure as a `TransportError`
//!
//! # Design Decisions
//! - `Transport` is the seam between the handler and the network, so the
//!   handler can be exercised without sockets
//! - Bodies are streamed in both directions, never buffered
//! - No retries; the connect timeout lives here, the response deadline is
//!   applied by the handler around the whole exchange

use std::error::Error as _;
use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::proxy::redirect::{self, RedirectPolicy};

/// The upstream could not be reached or did not produce a usable response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS, connect, timeout or protocol failure from the HTTP client.
    #[error(transparent)]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// The outbound request could not be assembled.
    #[error("invalid upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("redirect count exceeded the limit of {0}")]
    TooManyRedirects(usize),

    #[error("upstream sent an unusable redirect location `{0}`")]
    InvalidRedirect(String),
}

impl TransportError {
    /// The error message followed by every underlying cause.
    pub fn detail(&self) -> String {
        let mut detail = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        detail
    }
}

/// Sends one request to the upstream and yields its response.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, TransportError>> + Send;
}

/// Plain HTTP transport on hyper's client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    redirects: RedirectPolicy,
}

impl HyperTransport {
    pub fn new(connect_timeout: Duration, redirects: RedirectPolicy) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self { client, redirects }
    }

    async fn send_once(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let response = self.client.request(request).await?;
        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl Transport for HyperTransport {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        redirect::follow(request, self.redirects, |req| self.send_once(req)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_connection_refused_detail() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HyperTransport::new(Duration::from_secs(2), RedirectPolicy::default());
        let request = Request::builder()
            .uri(format!("http://{}/", addr))
            .body(Body::empty())
            .unwrap();

        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, TransportError::Upstream(_)));
        // The cause chain names the underlying connect failure
        assert!(err.detail().len() > err.to_string().len());
    }

    #[tokio::test]
    async fn test_streams_upstream_response() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new().fallback(|| async { (StatusCode::ACCEPTED, "queued") });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let transport = HyperTransport::new(Duration::from_secs(2), RedirectPolicy::default());
        let request = Request::builder()
            .uri(format!("http://{}/jobs", addr))
            .body(Body::empty())
            .unwrap();

        let response = transport.send(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"queued");
    }
}
