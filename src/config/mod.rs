//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → passed by reference into clients, senders and watchers
//! ```
//!
//! # Design Decisions
//! - No process-wide config; every component receives what it needs
//! - All fields have defaults to allow minimal configs
//! - Private keys never live in config files

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, NodeConfig, ObservabilityConfig, PollConfig, TransactionDefaults};
