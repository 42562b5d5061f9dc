//! # symgroup Utilities
//!
//! Shared utilities for the symgroup workspace: logging built on `tracing`
//! and TOML/env configuration.

pub mod config;
pub mod logging;

pub use config::{ConfigError, DumpSettings, LoggingSettings, Settings, CONTAINER_ITEM_CAP};
// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging_for_extension, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard,
};
pub use tracing::{debug, error, info, trace, warn};
