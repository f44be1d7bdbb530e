//! Augur Config
//!
//! This crate contains the node-level configuration for augur. Configuration is
//! read from a TOML file (every key is optional and falls back to a default) and
//! can then be overridden by `AUGUR_*` environment variables.
//!
//! ```toml
//! dev = false
//! feature_offchain_reporting = true
//! database_url = "sqlite://augur.db?mode=rwc"
//! default_http_timeout_ms = 15000
//! ```
//!
//! The [`FeatureFlags`] trait is the narrow view of the configuration that the
//! job lifecycle needs for feature gating.

mod error;
mod flags;
mod node;

pub use error::ConfigError;
pub use flags::FeatureFlags;
pub use node::{ENV_PREFIX, NodeConfig};
