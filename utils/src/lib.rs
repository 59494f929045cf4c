//! Shared utilities for the keystore.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingError};
