//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → One concurrent probe per downstream server
//!     → Transport success: mark healthy, transport failure: mark unhealthy
//!
//! Passive health checks (load_balancer/dispatch.rs):
//!     Forwarding fails at the transport level
//!     → Mark the server unhealthy, fail over to the next one
//! ```
//!
//! # Design Decisions
//! - No thresholds: a single probe outcome flips the flag
//! - HTTP status codes are not a health signal, only reachability is
//! - Stopping is a handshake; no probe lands after it returns

pub mod active;

pub use active::HealthLoop;
