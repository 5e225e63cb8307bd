//! HTTP server for fractal multi-agent consensus
//!
//! Wraps [`coordination::ensemble::OrchestrationService`] in an axum router
//! and loads its settings from the environment, a TOML file and CLI flags.

pub mod config;
pub mod http;

pub use config::{Args, ConfigError, ServerConfig};
pub use http::{router, serve, HealthResponse};
