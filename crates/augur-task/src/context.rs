use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use augur_config::NodeConfig;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::network::{AddressFilter, guarded_client, is_restricted};
use crate::registry::BridgeRegistry;

/// Limits applied to outbound HTTP fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
  pub timeout: Duration,
  pub max_response_bytes: usize,
  /// Node-wide override of the private network restriction.
  pub allow_unrestricted_network_access: bool,
}

impl Default for HttpSettings {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(15),
      max_response_bytes: 32_768,
      allow_unrestricted_network_access: false,
    }
  }
}

impl From<&NodeConfig> for HttpSettings {
  fn from(config: &NodeConfig) -> Self {
    Self {
      timeout: config.default_http_timeout(),
      max_response_bytes: config.default_http_limit,
      allow_unrestricted_network_access: config.default_http_allow_unrestricted_network_access,
    }
  }
}

/// Outbound HTTP clients plus the limits they run under.
///
/// Cloning is cheap; both clients share their connection pools.
#[derive(Debug, Clone)]
pub struct HttpClient {
  settings: HttpSettings,
  restricted: AddressFilter,
  unrestricted: Client,
  guarded: Client,
}

impl HttpClient {
  pub fn new(settings: HttpSettings) -> Result<Self, TaskError> {
    Self::with_address_filter(settings, is_restricted)
  }

  /// Clients that treat every address matched by `restricted` as private.
  pub fn with_address_filter(
    settings: HttpSettings,
    restricted: AddressFilter,
  ) -> Result<Self, TaskError> {
    Ok(Self {
      settings,
      restricted,
      unrestricted: Client::builder().build()?,
      guarded: guarded_client(restricted)?,
    })
  }

  pub fn settings(&self) -> &HttpSettings {
    &self.settings
  }

  pub fn address_filter(&self) -> AddressFilter {
    self.restricted
  }

  /// The client to use for a request. Restricted requests get the client
  /// that checks every resolved address and redirect hop.
  pub fn client(&self, unrestricted: bool) -> &Client {
    if unrestricted || self.settings.allow_unrestricted_network_access {
      &self.unrestricted
    } else {
      &self.guarded
    }
  }
}

/// Everything a task needs from its environment while running.
///
/// Tasks themselves stay immutable; the client, limits, bridge registry and
/// cancellation signal are all supplied here.
#[derive(Clone)]
pub struct TaskContext {
  http: HttpClient,
  bridges: Arc<dyn BridgeRegistry>,
  cancel: CancellationToken,
}

impl TaskContext {
  pub fn new(bridges: Arc<dyn BridgeRegistry>, http: HttpClient) -> Self {
    Self {
      http,
      bridges,
      cancel: CancellationToken::new(),
    }
  }

  pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  /// Context for a nested run that is cancelled together with this one.
  pub fn child(&self) -> Self {
    Self {
      cancel: self.cancel.child_token(),
      ..self.clone()
    }
  }

  pub fn http(&self) -> &HttpClient {
    &self.http
  }

  pub fn bridges(&self) -> &dyn BridgeRegistry {
    self.bridges.as_ref()
  }

  pub fn cancel_token(&self) -> &CancellationToken {
    &self.cancel
  }
}

impl fmt::Debug for TaskContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskContext")
      .field("http", self.http.settings())
      .field("cancelled", &self.cancel.is_cancelled())
      .finish_non_exhaustive()
  }
}
