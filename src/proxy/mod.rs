//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest (from the hosting runtime)
//!     → handler.rs (rewrite target onto the upstream)
//!     → headers.rs (Host, X-Forwarded-*, strip edge-hop headers)
//!     → transport.rs (send over hyper's client)
//!         → redirect.rs (follow 3xx like fetch does)
//!     → upstream response streamed back unchanged
//!     ↘ on transport failure: 502 diagnostic page
//! ```

pub mod handler;
pub mod headers;
pub mod redirect;
pub mod transport;

pub use handler::ForwardingHandler;
pub use headers::HeaderSet;
pub use redirect::RedirectPolicy;
pub use transport::{HyperTransport, Transport, TransportError};
