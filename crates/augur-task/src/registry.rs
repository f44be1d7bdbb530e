use std::collections::HashMap;

use async_trait::async_trait;
use url::Url;

use crate::error::RegistryError;

/// Resolves bridge names to external adapter URLs.
///
/// Bridge names are case-insensitive.
#[async_trait]
pub trait BridgeRegistry: Send + Sync {
  async fn find_bridge_url(&self, name: &str) -> Result<Url, RegistryError>;
}

/// In-memory bridge registry.
#[derive(Debug, Clone, Default)]
pub struct StaticBridges {
  bridges: HashMap<String, Url>,
}

impl StaticBridges {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, name: &str, url: Url) -> Self {
    self.insert(name, url);
    self
  }

  pub fn insert(&mut self, name: &str, url: Url) {
    self.bridges.insert(name.to_lowercase(), url);
  }
}

#[async_trait]
impl BridgeRegistry for StaticBridges {
  async fn find_bridge_url(&self, name: &str) -> Result<Url, RegistryError> {
    self
      .bridges
      .get(&name.to_lowercase())
      .cloned()
      .ok_or_else(|| RegistryError::NotFound {
        name: name.to_string(),
      })
  }
}
