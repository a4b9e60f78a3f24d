//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TransportConfig (validated, immutable)
//!     → TransportBuilder::from_config
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use self::loader::{load_config, parse_config, ConfigError};
pub use self::schema::{BackendConfig, ObservabilityConfig, TimeoutConfig, TransportConfig};
pub use self::validation::{validate_config, ValidationError};
