//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → args.rs (command-line overrides)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → consumed once at startup to build the balancer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the registry never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod args;
pub mod loader;
pub mod schema;
pub mod validation;

pub use args::Cli;
pub use loader::{load_config, ConfigError};
pub use schema::BalancerConfig;
pub use schema::DownstreamConfig;
pub use schema::HealthCheckConfig;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use validation::{validate_config, ValidationError};
