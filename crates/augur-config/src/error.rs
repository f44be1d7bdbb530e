use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading node configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The config file could not be read.
  #[error("failed to read config file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The config file is not valid TOML or has mistyped keys.
  #[error("invalid config: {0}")]
  Parse(#[from] toml::de::Error),

  /// An environment override could not be parsed.
  #[error("invalid value for {key}: '{value}'")]
  InvalidOverride { key: String, value: String },

  /// The configuration parsed but is not usable.
  #[error("invalid config: {message}")]
  Invalid { message: String },
}
