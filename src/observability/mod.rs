//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! client / receipt / sender produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout (plain or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap (atomic increments) and no-ops until a recorder is installed
//! - Keys and signatures never reach either sink

pub mod logging;
pub mod metrics;
