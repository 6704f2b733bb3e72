//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse CLI → Load config → Validate → Build balancer → Start listener
//!
//! Shutdown (shutdown.rs + http/server.rs):
//!     Signal received → Stop health loop → Stop accepting → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: an invalid configuration never starts the listener
//! - Shutdown has a deadline; a failed drain is logged, not escalated

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
