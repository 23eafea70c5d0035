//! Infrastructure layer
//!
//! Cross-cutting concerns consumed by the adapters and services layers:
//! - Configuration loading (figment, YAML + env)
//! - Logging and tracing setup, with secret scrubbing

pub mod config;
pub mod logging;
