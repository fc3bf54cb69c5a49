//! Shared utilities for stock-explorer
//!
//! This crate provides the ambient plumbing used across the workspace:
//! tracing setup, logging configuration and `.env` loading.

pub mod config;
pub mod logging;

pub use config::{LogFormat, LoggingConfig, load_env_file};
pub use logging::init_tracing;
