//! # dlpgate
//!
//! **Data-loss-prevention forward proxy for browser form submissions.**
//!
//! A browser requests `http://<proxy>/<target-url>`. GET requests are checked
//! against a URL deny list; POST requests with `multipart/form-data` bodies are
//! decoded and every field is scanned against an ordered set of regex rules.
//! Clean requests are fetched and relayed, violations are answered with a
//! `403` page highlighting the offending text.
//!
//! ## Architecture
//!
//! - **[`form`]** - multipart body decoding into named fields
//! - **[`dlp`]** - rule set, content scanner and per-request inspection
//! - **[`policy`]** - TOML configuration and deny-list evaluation
//! - **[`proxy`]** - TCP front end, upstream relay and response rendering
//! - **[`cli`]** - command-line interface (clap)
//! - **[`error`]** - unified error types using `thiserror`
//!
//! ## Quick Start
//!
//! ```bash
//! dlpgate init
//! dlpgate start
//! # then browse to http://127.0.0.1:8000/http://example.com
//! ```

pub mod cli;
pub mod dlp;
pub mod error;
pub mod form;
pub mod policy;
pub mod proxy;
