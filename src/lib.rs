//! Edge forwarder library.
//!
//! Forwards every inbound request to one fixed upstream, rewriting the
//! target and forwarding headers, and answers with a diagnostic page when
//! the upstream cannot be reached.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::ForwardingHandler;
