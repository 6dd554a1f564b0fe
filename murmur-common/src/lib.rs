//! Shared plumbing for the murmur crates.
//!
//! Only observability lives here for now: every binary and integration test
//! goes through [`observability::init_logging`] so the sinks, filters and file
//! layout stay identical across entrypoints.
//!
//! ```rust
//! use murmur_common::observability::{LogConfig, LogFormat};
//!
//! let cfg = LogConfig {
//!     format: "json".parse().unwrap(),
//!     ..LogConfig::default()
//! };
//! assert!(matches!(cfg.format, LogFormat::Json));
//! assert_eq!(cfg.app_name, murmur_common::APP_NAME);
//! ```

pub mod observability;

/// Logical name used for log files and default data directories.
pub const APP_NAME: &str = "murmur";
