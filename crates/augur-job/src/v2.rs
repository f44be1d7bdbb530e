//! V2 job specs: one TOML document with a fetcher tree as observation source.

use std::fmt;
use std::time::Duration;

use augur_pipeline::{Fetchers, OwnerKind};
use augur_task::BridgeRegistry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bridges::ensure_registered;
use crate::error::JobError;

/// Kind of V2 job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
  OffchainReporting,
  FluxMonitor,
  DirectRequest,
}

impl JobType {
  pub fn owner_kind(&self) -> OwnerKind {
    match self {
      JobType::OffchainReporting => OwnerKind::OffchainReporting,
      JobType::FluxMonitor => OwnerKind::FluxMonitor,
      JobType::DirectRequest => OwnerKind::DirectRequest,
    }
  }
}

impl fmt::Display for JobType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.owner_kind().as_str())
  }
}

/// A V2 job spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpecV2 {
  #[serde(rename = "type")]
  pub job_type: JobType,

  pub schema_version: u32,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contract_address: Option<String>,

  #[serde(default, rename = "p2pPeerID", skip_serializing_if = "Option::is_none")]
  pub p2p_peer_id: Option<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub p2p_bootstrap_peers: Vec<String>,

  #[serde(default)]
  pub is_bootstrap_peer: bool,

  #[serde(default, rename = "keyBundleID", skip_serializing_if = "Option::is_none")]
  pub key_bundle_id: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub transmitter_address: Option<String>,

  /// Duration text such as `10s` or `500ms`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub observation_timeout: Option<String>,

  #[serde(default)]
  pub observation_source: Fetchers,
}

impl JobSpecV2 {
  pub fn from_toml(document: &str) -> Result<Self, JobError> {
    toml::from_str(document).map_err(|e| JobError::Malformed(e.to_string()))
  }

  /// Parsed `observationTimeout`, if set.
  pub fn observation_timeout(&self) -> Result<Option<Duration>, JobError> {
    self.observation_timeout.as_deref().map(parse_duration).transpose()
  }

  fn needs_observation_source(&self) -> bool {
    !(self.job_type == JobType::OffchainReporting && self.is_bootstrap_peer)
  }
}

/// Check a V2 spec against every rule, including that its bridges exist.
pub async fn validate(spec: &JobSpecV2, registry: &dyn BridgeRegistry) -> Result<(), JobError> {
  if spec.schema_version != 1 {
    return Err(JobError::invalid(format!(
      "unsupported schemaVersion {}, expected 1",
      spec.schema_version
    )));
  }

  if spec.job_type == JobType::OffchainReporting
    && spec.contract_address.as_deref().is_none_or(str::is_empty)
  {
    return Err(JobError::invalid("offchainreporting jobs require a contractAddress"));
  }

  spec.observation_timeout()?;

  if spec.needs_observation_source() && spec.observation_source.len() != 1 {
    return Err(JobError::invalid(format!(
      "observationSource must have exactly one root fetcher, found {}",
      spec.observation_source.len()
    )));
  }

  ensure_registered(spec.observation_source.bridge_names(), registry).await?;

  debug!(job_type = %spec.job_type, "job spec valid");
  Ok(())
}

/// Parse `<number><unit>` with unit `ms`, `s`, `m` or `h`.
pub fn parse_duration(text: &str) -> Result<Duration, JobError> {
  let text = text.trim();
  let split = text
    .find(|c: char| !c.is_ascii_digit())
    .unwrap_or(text.len());
  let (number, unit) = text.split_at(split);
  let invalid = || JobError::invalid(format!("invalid duration '{}'", text));
  let value: u64 = number.parse().map_err(|_| invalid())?;
  let seconds = |per: u64| value.checked_mul(per).map(Duration::from_secs).ok_or_else(invalid);
  match unit {
    "ms" => Ok(Duration::from_millis(value)),
    "s" => Ok(Duration::from_secs(value)),
    "m" => seconds(60),
    "h" => seconds(3600),
    _ => Err(invalid()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use augur_pipeline::Fetcher;
  use augur_task::StaticBridges;
  use url::Url;

  const OCR: &str = r#"
    type = "offchainreporting"
    schemaVersion = 1
    contractAddress = "0x613a38AC1659769640aaE063C651F48E0250454C"
    p2pPeerID = "12D3KooWHfYFQ8hGttAYbMCevQVESEQhzJAqFZokMVtom8bNxwGq"
    p2pBootstrapPeers = ["/dns4/chain.link/tcp/1234/p2p/16Uiu2HAm58SP7UL8zsnpeuwHfytLocaqgnyaYKP8wu7qRdrixLju"]
    isBootstrapPeer = false
    keyBundleID = "7f993fb701b3410b1f6e8d4d93a7462754d24609b9b31a4fe64a0cb475a4d934"
    transmitterAddress = "0x2901c8E13a7dA4E2c0cC3bEB2D9A35b6a4F9D9A1"
    observationTimeout = "10s"

    [[observationSource]]
    type = "median"
    minAnswers = 1

    [[observationSource.fetchers]]
    type = "bridge"
    name = "voter_turnout"
    requestData = { data = { coin = "ETH" } }

    [[observationSource.fetchers.transformPipeline]]
    type = "multiply"
    times = 100

    [[observationSource.fetchers]]
    type = "http"
    url = "https://chain.link/voter_turnout/USA-2020"
  "#;

  fn registry() -> StaticBridges {
    StaticBridges::new().with("voter_turnout", Url::parse("http://adapter.example").unwrap())
  }

  #[test]
  fn test_decode_toml() {
    let spec = JobSpecV2::from_toml(OCR).unwrap();
    assert_eq!(spec.job_type, JobType::OffchainReporting);
    assert_eq!(spec.p2p_bootstrap_peers.len(), 1);
    assert_eq!(spec.observation_timeout().unwrap(), Some(Duration::from_secs(10)));

    let Some(Fetcher::Median(root)) = spec.observation_source.first() else {
      panic!("expected median root");
    };
    assert_eq!(root.fetchers.len(), 2);
    assert_eq!(root.fetchers.iter().next().unwrap().base().transformers.len(), 1);
  }

  #[tokio::test]
  async fn test_validate_ocr() {
    let spec = JobSpecV2::from_toml(OCR).unwrap();
    validate(&spec, &registry()).await.unwrap();

    let result = validate(&spec, &StaticBridges::new()).await;
    assert!(matches!(result, Err(JobError::Invalid(m)) if m.contains("voter_turnout")));
  }

  #[tokio::test]
  async fn test_schema_version_and_contract() {
    let mut spec = JobSpecV2::from_toml(OCR).unwrap();
    spec.schema_version = 2;
    assert!(matches!(validate(&spec, &registry()).await, Err(JobError::Invalid(_))));

    let mut spec = JobSpecV2::from_toml(OCR).unwrap();
    spec.contract_address = None;
    assert!(matches!(validate(&spec, &registry()).await, Err(JobError::Invalid(_))));
  }

  #[tokio::test]
  async fn test_observation_source_roots() {
    let spec = JobSpecV2::from_toml(
      r#"
      type = "directrequest"
      schemaVersion = 1
      "#,
    )
    .unwrap();
    assert!(matches!(validate(&spec, &registry()).await, Err(JobError::Invalid(_))));

    let bootstrap = JobSpecV2::from_toml(
      r#"
      type = "offchainreporting"
      schemaVersion = 1
      contractAddress = "0x01"
      isBootstrapPeer = true
      "#,
    )
    .unwrap();
    validate(&bootstrap, &registry()).await.unwrap();
  }

  #[test]
  fn test_malformed_toml() {
    assert!(matches!(JobSpecV2::from_toml("type = "), Err(JobError::Malformed(_))));
    assert!(matches!(
      JobSpecV2::from_toml("type = \"telepathy\"\nschemaVersion = 1"),
      Err(JobError::Malformed(_))
    ));
  }

  #[test]
  fn test_parse_duration() {
    assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
    assert!(parse_duration("soon").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("18446744073709551615h").is_err());
    assert!(parse_duration("99999999999999999999s").is_err());
  }

  #[tokio::test]
  async fn test_overflowing_timeout_is_invalid() {
    let mut spec = JobSpecV2::from_toml(OCR).unwrap();
    spec.observation_timeout = Some("99999999999999999h".into());
    assert!(matches!(validate(&spec, &registry()).await, Err(JobError::Invalid(_))));
  }

  #[test]
  fn test_json_round_trip() {
    let spec = JobSpecV2::from_toml(OCR).unwrap();
    let encoded = serde_json::to_string(&spec).unwrap();
    let decoded: JobSpecV2 = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, spec);
  }
}
