//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all route)
//!     → edge.rs (scheme, host, client IP, region → InboundRequest)
//!     → [proxy::ForwardingHandler]
//!         → request.rs (target rewrite onto the upstream)
//!         → response.rs (diagnostic page when the upstream is unreachable)
//!     → Send to client
//! ```

pub mod edge;
pub mod request;
pub mod response;
pub mod server;

pub use edge::EdgeRules;
pub use request::{ConnectionMeta, InboundRequest, UpstreamTarget};
pub use response::DiagnosticPage;
pub use server::HttpServer;
