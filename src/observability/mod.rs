//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (action and refresh counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
