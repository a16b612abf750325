//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarding handler and hosting runtime produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request/response detail is logged only when `debug` is configured
//! - Upstream failures are always logged
//! - Metrics calls are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
