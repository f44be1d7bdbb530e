use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::flags::FeatureFlags;

/// Prefix for environment variable overrides, e.g. `AUGUR_DEV=true`.
pub const ENV_PREFIX: &str = "AUGUR_";

/// Node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
  /// Development mode. Enables every gated job kind.
  pub dev: bool,

  /// Allow flux monitor jobs outside of dev mode.
  pub feature_flux_monitor: bool,

  /// Allow offchain reporting jobs outside of dev mode.
  pub feature_offchain_reporting: bool,

  /// Database connection string for the job store.
  pub database_url: String,

  /// Address the web surface binds to.
  pub listen_addr: String,

  /// Upper bound for a single HTTP or bridge fetch, in milliseconds.
  pub default_http_timeout_ms: u64,

  /// Maximum accepted response body size, in bytes.
  pub default_http_limit: usize,

  /// Lets plain HTTP tasks reach loopback and private addresses.
  pub default_http_allow_unrestricted_network_access: bool,

  /// Default log level when neither the CLI nor `AUGUR_LOG` sets one.
  pub log_level: String,
}

impl Default for NodeConfig {
  fn default() -> Self {
    Self {
      dev: false,
      feature_flux_monitor: false,
      feature_offchain_reporting: false,
      database_url: "sqlite://augur.db?mode=rwc".to_string(),
      listen_addr: "127.0.0.1:6688".to_string(),
      default_http_timeout_ms: 15_000,
      default_http_limit: 32_768,
      default_http_allow_unrestricted_network_access: false,
      log_level: "info".to_string(),
    }
  }
}

impl NodeConfig {
  /// Read and validate a TOML config file. Missing keys take their defaults.
  pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&contents)
  }

  /// Parse and validate a TOML document.
  pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
    let config: NodeConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  /// Apply `AUGUR_*` overrides from the process environment.
  pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
    self.apply_overrides(std::env::vars())
  }

  /// Apply `AUGUR_*` overrides from an arbitrary set of key/value pairs.
  ///
  /// Unknown `AUGUR_*` keys are ignored so that unrelated variables such as
  /// `AUGUR_LOG` can share the prefix.
  pub fn apply_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
  where
    I: IntoIterator<Item = (String, String)>,
  {
    for (key, value) in vars {
      let Some(name) = key.strip_prefix(ENV_PREFIX) else {
        continue;
      };
      match name {
        "DEV" => self.dev = parse_bool(&key, &value)?,
        "FEATURE_FLUX_MONITOR" => self.feature_flux_monitor = parse_bool(&key, &value)?,
        "FEATURE_OFFCHAIN_REPORTING" => {
          self.feature_offchain_reporting = parse_bool(&key, &value)?
        }
        "DATABASE_URL" => self.database_url = value,
        "LISTEN_ADDR" => self.listen_addr = value,
        "DEFAULT_HTTP_TIMEOUT_MS" => self.default_http_timeout_ms = parse_number(&key, &value)?,
        "DEFAULT_HTTP_LIMIT" => self.default_http_limit = parse_number(&key, &value)?,
        "DEFAULT_HTTP_ALLOW_UNRESTRICTED_NETWORK_ACCESS" => {
          self.default_http_allow_unrestricted_network_access = parse_bool(&key, &value)?
        }
        "LOG_LEVEL" => self.log_level = value,
        _ => {}
      }
    }
    self.validate()
  }

  /// Check the values that have no sensible interpretation when zero.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.default_http_timeout_ms == 0 {
      return Err(ConfigError::Invalid {
        message: "default_http_timeout_ms must be greater than zero".to_string(),
      });
    }
    if self.default_http_limit == 0 {
      return Err(ConfigError::Invalid {
        message: "default_http_limit must be greater than zero".to_string(),
      });
    }
    Ok(())
  }

  /// Per-call timeout for network fetches.
  pub fn default_http_timeout(&self) -> Duration {
    Duration::from_millis(self.default_http_timeout_ms)
  }
}

impl FeatureFlags for NodeConfig {
  fn dev(&self) -> bool {
    self.dev
  }

  fn feature_flux_monitor(&self) -> bool {
    self.feature_flux_monitor
  }

  fn feature_offchain_reporting(&self) -> bool {
    self.feature_offchain_reporting
  }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value
    .trim()
    .parse()
    .map_err(|_| ConfigError::InvalidOverride {
      key: key.to_string(),
      value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
  match value.trim().to_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" | "" => Ok(false),
    _ => Err(ConfigError::InvalidOverride {
      key: key.to_string(),
      value: value.to_string(),
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn test_empty_document_uses_defaults() {
    let config = NodeConfig::from_toml_str("").unwrap();
    assert_eq!(config, NodeConfig::default());
    assert_eq!(config.default_http_timeout(), Duration::from_secs(15));
  }

  #[test]
  fn test_partial_document() {
    let config = NodeConfig::from_toml_str(
      r#"
      dev = true
      default_http_timeout_ms = 500
      "#,
    )
    .unwrap();
    assert!(config.dev);
    assert!(!config.feature_offchain_reporting);
    assert_eq!(config.default_http_timeout_ms, 500);
    assert_eq!(config.listen_addr, "127.0.0.1:6688");
  }

  #[test]
  fn test_mistyped_key_is_rejected() {
    let result = NodeConfig::from_toml_str("dev = \"maybe\"");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
  }

  #[test]
  fn test_zero_timeout_is_rejected() {
    let result = NodeConfig::from_toml_str("default_http_timeout_ms = 0");
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
  }

  #[test]
  fn test_load_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "feature_flux_monitor = true").unwrap();

    let config = NodeConfig::load_from_path(file.path()).unwrap();
    assert!(config.feature_flux_monitor());
    assert!(!config.dev());
  }

  #[test]
  fn test_load_missing_file() {
    let result = NodeConfig::load_from_path("/nonexistent/augur.toml");
    assert!(matches!(result, Err(ConfigError::Read { .. })));
  }

  #[test]
  fn test_overrides() {
    let mut config = NodeConfig::default();
    config
      .apply_overrides(vars(&[
        ("AUGUR_DEV", "true"),
        ("AUGUR_FEATURE_OFFCHAIN_REPORTING", "1"),
        ("AUGUR_DEFAULT_HTTP_TIMEOUT_MS", "250"),
        ("AUGUR_LOG", "debug"),
        ("HOME", "/root"),
      ]))
      .unwrap();

    assert!(config.dev);
    assert!(config.feature_offchain_reporting);
    assert_eq!(config.default_http_timeout_ms, 250);
    assert_eq!(config.log_level, "info");
  }

  #[test]
  fn test_invalid_override() {
    let mut config = NodeConfig::default();
    let result = config.apply_overrides(vars(&[("AUGUR_DEV", "sometimes")]));
    assert!(matches!(result, Err(ConfigError::InvalidOverride { .. })));
  }
}
