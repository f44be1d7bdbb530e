//! V1 job specs: JSON documents with initiators and a task list.

use std::fmt;
use std::str::FromStr;

use augur_pipeline::{Pipeline, PipelineError};
use augur_task::BridgeRegistry;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::bridges::ensure_registered;
use crate::error::JobError;

/// Identifier of a V1 job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(Uuid);

impl JobId {
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }

  pub fn as_uuid(&self) -> &Uuid {
    &self.0
  }
}

impl Default for JobId {
  fn default() -> Self {
    Self::new()
  }
}

impl From<Uuid> for JobId {
  fn from(uuid: Uuid) -> Self {
    Self(uuid)
  }
}

impl fmt::Display for JobId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.simple())
  }
}

impl FromStr for JobId {
  type Err = uuid::Error;

  /// Accepts both the hyphenated and the simple (32 hex digit) form.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Uuid::parse_str(s).map(JobId)
  }
}

impl Serialize for JobId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for JobId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
  }
}

/// How a V1 job run is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitiatorType {
  Web,
  Cron,
  RunLog,
  EthLog,
  RunAt,
  External,
  FluxMonitor,
  RandomnessLog,
}

impl fmt::Display for InitiatorType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      InitiatorType::Web => "web",
      InitiatorType::Cron => "cron",
      InitiatorType::RunLog => "runlog",
      InitiatorType::EthLog => "ethlog",
      InitiatorType::RunAt => "runat",
      InitiatorType::External => "external",
      InitiatorType::FluxMonitor => "fluxmonitor",
      InitiatorType::RandomnessLog => "randomnesslog",
    };
    f.write_str(name)
  }
}

/// Initiator parameters. Which fields matter depends on the initiator type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatorParams {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub schedule: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub time: Option<DateTime<Utc>>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub requesters: Vec<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub feeds: Vec<Value>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initiator {
  #[serde(rename = "type")]
  pub kind: InitiatorType,

  #[serde(default)]
  pub params: InitiatorParams,
}

/// Body of a V1 create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpecRequest {
  #[serde(default)]
  pub name: Option<String>,

  #[serde(default)]
  pub initiators: Vec<Initiator>,

  /// Task documents, decoded into a pipeline during validation.
  #[serde(default)]
  pub tasks: Vec<Value>,

  #[serde(default)]
  pub start_at: Option<DateTime<Utc>>,

  #[serde(default)]
  pub end_at: Option<DateTime<Utc>>,

  #[serde(default, with = "augur_task::decimal::serde_option")]
  pub min_payment: Option<BigDecimal>,
}

impl JobSpecRequest {
  pub fn from_slice(bytes: &[u8]) -> Result<Self, JobError> {
    serde_json::from_slice(bytes).map_err(|e| JobError::Malformed(e.to_string()))
  }
}

/// A V1 job spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
  pub id: JobId,
  pub name: String,
  pub initiators: Vec<Initiator>,
  pub tasks: Vec<Value>,
  pub start_at: Option<DateTime<Utc>>,
  pub end_at: Option<DateTime<Utc>>,
  #[serde(default, with = "augur_task::decimal::serde_option")]
  pub min_payment: Option<BigDecimal>,
  pub created_at: DateTime<Utc>,
  pub archived_at: Option<DateTime<Utc>>,
}

impl JobSpec {
  /// Build a new spec with a fresh id from a request.
  pub fn from_request(request: JobSpecRequest, now: DateTime<Utc>) -> Self {
    let id = JobId::new();
    Self {
      id,
      name: request.name.unwrap_or_else(|| format!("job-{}", id)),
      initiators: request.initiators,
      tasks: request.tasks,
      start_at: request.start_at,
      end_at: request.end_at,
      min_payment: request.min_payment,
      created_at: now,
      archived_at: None,
    }
  }

  pub fn initiators_for(&self, kind: InitiatorType) -> impl Iterator<Item = &Initiator> {
    self.initiators.iter().filter(move |i| i.kind == kind)
  }

  pub fn is_archived(&self) -> bool {
    self.archived_at.is_some()
  }

  /// Decode the task documents into a runnable pipeline.
  pub fn pipeline(&self) -> Result<Pipeline, PipelineError> {
    Pipeline::from_values(self.tasks.clone())
  }
}

/// Check a V1 spec against every rule, including that its bridges exist.
pub async fn validate(
  spec: &JobSpec,
  registry: &dyn BridgeRegistry,
  now: DateTime<Utc>,
) -> Result<(), JobError> {
  if spec.initiators.is_empty() || spec.tasks.is_empty() {
    return Err(JobError::invalid("must have at least one initiator and one task"));
  }

  if let (Some(start), Some(end)) = (spec.start_at, spec.end_at)
    && end <= start
  {
    return Err(JobError::invalid("endAt must be after startAt"));
  }
  if let Some(end) = spec.end_at
    && end < now
  {
    return Err(JobError::invalid("endAt must be in the future"));
  }
  if let Some(payment) = &spec.min_payment
    && *payment < BigDecimal::from(0)
  {
    return Err(JobError::invalid("minPayment must not be negative"));
  }

  for initiator in &spec.initiators {
    validate_initiator(initiator)?;
  }

  let pipeline = spec
    .pipeline()
    .map_err(|e| JobError::invalid(format!("invalid tasks: {}", e)))?;
  ensure_registered(pipeline.bridge_names(), registry).await?;

  debug!(job_id = %spec.id, tasks = pipeline.len(), "job spec valid");
  Ok(())
}

fn validate_initiator(initiator: &Initiator) -> Result<(), JobError> {
  let params = &initiator.params;
  match initiator.kind {
    InitiatorType::Cron => {
      let schedule = params
        .schedule
        .as_deref()
        .ok_or_else(|| JobError::invalid("cron initiator requires a schedule"))?;
      parse_cron(schedule)?;
    }
    InitiatorType::RunAt => {
      if params.time.is_none() {
        return Err(JobError::invalid("runat initiator requires a time"));
      }
    }
    InitiatorType::FluxMonitor => {
      if params.address.as_deref().is_none_or(str::is_empty) {
        return Err(JobError::invalid("fluxmonitor initiator requires an address"));
      }
      if params.feeds.is_empty() {
        return Err(JobError::invalid("fluxmonitor initiator requires at least one feed"));
      }
    }
    InitiatorType::External => {
      if params.name.as_deref().is_none_or(str::is_empty) {
        return Err(JobError::invalid("external initiator requires a name"));
      }
    }
    InitiatorType::Web
    | InitiatorType::RunLog
    | InitiatorType::EthLog
    | InitiatorType::RandomnessLog => {}
  }
  Ok(())
}

/// Parse a cron schedule. Accepts an optional `CRON_TZ=` prefix and the
/// five-field form without seconds.
fn parse_cron(schedule: &str) -> Result<cron::Schedule, JobError> {
  let expression = match schedule.trim().strip_prefix("CRON_TZ=") {
    Some(rest) => rest.split_once(' ').map(|(_, expr)| expr).unwrap_or_default(),
    None => schedule.trim(),
  };
  let normalized = match expression.split_whitespace().count() {
    5 => format!("0 {}", expression),
    _ => expression.to_string(),
  };
  cron::Schedule::from_str(&normalized)
    .map_err(|e| JobError::invalid(format!("invalid cron schedule '{}': {}", schedule, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use augur_task::StaticBridges;
  use chrono::Duration;
  use serde_json::json;
  use url::Url;

  fn spec(document: Value) -> JobSpec {
    let request: JobSpecRequest = serde_json::from_value(document).unwrap();
    JobSpec::from_request(request, Utc::now())
  }

  fn bridges() -> StaticBridges {
    StaticBridges::new().with("coingecko", Url::parse("http://adapter.example").unwrap())
  }

  async fn check(document: Value) -> Result<(), JobError> {
    validate(&spec(document), &bridges(), Utc::now()).await
  }

  fn web_job() -> Value {
    json!({
      "initiators": [{"type": "web"}],
      "tasks": [{"type": "bridge", "name": "coingecko"}, {"type": "multiply", "times": 100}]
    })
  }

  #[test]
  fn test_job_id_forms() {
    let id = JobId::new();
    let simple = id.to_string();
    assert_eq!(simple.len(), 32);
    assert_eq!(simple.parse::<JobId>().unwrap(), id);
    assert_eq!(id.as_uuid().hyphenated().to_string().parse::<JobId>().unwrap(), id);
    assert!("not-a-uuid".parse::<JobId>().is_err());
  }

  #[test]
  fn test_from_request() {
    let job = spec(json!({"initiators": [{"type": "cron", "params": {"schedule": "*/5 * * * *"}}], "minPayment": "1.5"}));
    assert!(job.name.starts_with("job-"));
    assert_eq!(job.initiators_for(InitiatorType::Cron).count(), 1);
    assert_eq!(job.min_payment, Some(BigDecimal::from_str("1.5").unwrap()));
    assert!(!job.is_archived());
  }

  #[test]
  fn test_malformed_request() {
    assert!(matches!(
      JobSpecRequest::from_slice(b"{\"initiators\": 5}"),
      Err(JobError::Malformed(_))
    ));
  }

  #[tokio::test]
  async fn test_valid_web_job() {
    check(web_job()).await.unwrap();
  }

  #[tokio::test]
  async fn test_requires_initiator_and_task() {
    let result = check(json!({"initiators": [{"type": "web"}], "tasks": []})).await;
    assert!(matches!(result, Err(JobError::Invalid(_))));
    let result = check(json!({"tasks": [{"type": "bridge", "name": "coingecko"}]})).await;
    assert!(matches!(result, Err(JobError::Invalid(_))));
  }

  #[tokio::test]
  async fn test_date_rules() {
    let now = Utc::now();
    let mut document = web_job();
    document["startAt"] = json!(now + Duration::hours(2));
    document["endAt"] = json!(now + Duration::hours(1));
    assert!(matches!(check(document).await, Err(JobError::Invalid(m)) if m.contains("after")));

    let mut document = web_job();
    document["endAt"] = json!(now - Duration::hours(1));
    assert!(matches!(check(document).await, Err(JobError::Invalid(m)) if m.contains("future")));
  }

  #[tokio::test]
  async fn test_initiator_rules() {
    let cases = [
      json!({"type": "cron", "params": {"schedule": "every tuesday"}}),
      json!({"type": "runat"}),
      json!({"type": "fluxmonitor", "params": {"address": "0x01"}}),
      json!({"type": "external"}),
    ];
    for initiator in cases {
      let mut document = web_job();
      document["initiators"] = json!([initiator.clone()]);
      assert!(
        matches!(check(document).await, Err(JobError::Invalid(_))),
        "{} should be rejected",
        initiator
      );
    }

    let mut document = web_job();
    document["initiators"] = json!([
      {"type": "cron", "params": {"schedule": "CRON_TZ=UTC */5 * * * *"}},
      {"type": "fluxmonitor", "params": {"address": "0x01", "feeds": [{"bridge": "coingecko"}]}},
      {"type": "external", "params": {"name": "ei"}}
    ]);
    check(document).await.unwrap();
  }

  #[tokio::test]
  async fn test_unknown_bridge() {
    let mut document = web_job();
    document["tasks"] = json!([{"type": "bridge", "name": "nobody"}]);
    assert!(matches!(check(document).await, Err(JobError::Invalid(m)) if m.contains("nobody")));
  }

  #[tokio::test]
  async fn test_undecodable_tasks() {
    let mut document = web_job();
    document["tasks"] = json!([{"type": "sorcery"}]);
    assert!(matches!(check(document).await, Err(JobError::Invalid(m)) if m.contains("sorcery")));
  }

  #[test]
  fn test_serde_round_trip() {
    let job = spec(web_job());
    let encoded = serde_json::to_string(&job).unwrap();
    let decoded: JobSpec = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, job);
  }
}
