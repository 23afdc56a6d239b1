//! Policy engine for dlpgate.
//!
//! This module provides the TOML-based configuration system ([`config`]) and
//! the URL deny-list evaluation ([`evaluator`]) applied to GET requests.

pub mod config;
pub mod evaluator;
