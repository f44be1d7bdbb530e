use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of V2 job that owns a fetcher tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
  OffchainReporting,
  FluxMonitor,
  DirectRequest,
}

impl OwnerKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      OwnerKind::OffchainReporting => "offchainreporting",
      OwnerKind::FluxMonitor => "fluxmonitor",
      OwnerKind::DirectRequest => "directrequest",
    }
  }
}

/// The single job a fetcher belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobOwner {
  pub kind: OwnerKind,
  pub job_id: i32,
}

impl fmt::Display for JobOwner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind.as_str(), self.job_id)
  }
}
