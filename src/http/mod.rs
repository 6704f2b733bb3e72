//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace layer)
//!     → [load balancer dispatches to a downstream]
//!     → client.rs (timed outbound call)
//!     → Send buffered response to client
//! ```

pub mod client;
pub mod server;

pub use client::{ClientError, TimedClient};
pub use server::{Server, ServerError};
