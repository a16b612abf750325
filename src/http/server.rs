//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all forwarding route
//! - Wire up middleware (tracing, request lifetime limit)
//! - Translate accepted requests into `InboundRequest`s
//! - Serve until the shutdown signal, draining in-flight requests

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ConfigError, ProxyConfig};
use crate::http::edge::EdgeRules;
use crate::proxy::ForwardingHandler;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<ForwardingHandler>,
    pub edge: Arc<EdgeRules>,
    pub local_addr: SocketAddr,
}

/// HTTP server hosting the forwarding handler.
pub struct HttpServer {
    config: ProxyConfig,
    handler: Arc<ForwardingHandler>,
    edge: Arc<EdgeRules>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let handler = Arc::new(ForwardingHandler::from_config(&config)?);
        let edge = Arc::new(
            EdgeRules::from_config(&config.edge).map_err(|e| ConfigError::Validation(vec![e]))?,
        );

        Ok(Self {
            config,
            handler,
            edge,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.handler.target().address(),
            debug = self.config.observability.debug,
            "HTTP server starting"
        );

        let state = AppState {
            handler: self.handler.clone(),
            edge: self.edge.clone(),
            local_addr: addr,
        };
        let app = Self::build_router(&self.config, state)
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Hand one accepted request to the forwarding handler.
async fn forward_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    match state.edge.inbound(request, peer, state.local_addr) {
        Ok(inbound) => state.handler.handle(inbound).await,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "Rejecting request with malformed target");
            (StatusCode::BAD_REQUEST, "Malformed request target").into_response()
        }
    }
}
