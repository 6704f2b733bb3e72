//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (requests, probe outcomes, failover, shutdown)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, text or JSON)
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted messages
//! - Request ID assigned at the edge and forwarded downstream

pub mod logging;
