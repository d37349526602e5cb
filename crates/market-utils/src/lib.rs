//! Shared utilities for market-lens
//!
//! This crate provides ambient functionality used across the workspace:
//! tracing subscriber setup and small helpers for reading configuration
//! from the environment.

pub mod env;
pub mod logging;

pub use env::{env_list, env_var, mask_secret};
pub use logging::{init_json_tracing, init_tracing, init_tracing_with};
