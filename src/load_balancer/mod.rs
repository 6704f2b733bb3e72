//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → dispatch.rs (buffer, forward, fail over)
//!     → balancer.rs (round-robin over healthy servers)
//!     → downstream.rs (per-server address + health flag)
//!     → Return downstream response or NoAvailableServer
//! ```
//!
//! # Design Decisions
//! - Registry is fixed at startup; no runtime add/remove
//! - Selection counter advances with a single atomic fetch-and-add
//! - Unhealthy servers are skipped, at most one full rotation per selection
//! - Health flags are atomics written by probes and failed dispatches

pub mod balancer;
pub mod dispatch;
pub mod downstream;
pub mod error;

pub use balancer::{BalancerSettings, LoadBalancer};
pub use downstream::DownstreamServer;
pub use error::{BalancerError, DispatchError};
