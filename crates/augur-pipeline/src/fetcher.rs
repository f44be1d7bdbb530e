use std::sync::Arc;

use augur_task::decode::{decode_variant, peek_type, split_collection};
use augur_task::{
  BaseTask, BridgeTask, DecodeError, HttpTask, MedianTask, RequestData, TaskContext, TaskResult,
};
use futures::future::{BoxFuture, join_all};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::notify::{Notifiee, NotifieeRef, PipelineEvent};
use crate::owner::JobOwner;
use crate::transformer::Transformers;

/// Fields shared by every fetcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseFetcher {
  /// Store-assigned identifier.
  #[serde(skip)]
  pub id: Option<i64>,

  #[serde(
    default,
    rename = "transformPipeline",
    skip_serializing_if = "Transformers::is_empty"
  )]
  pub transformers: Transformers,

  #[serde(skip)]
  pub owner: Option<JobOwner>,

  #[serde(skip)]
  pub notifiee: NotifieeRef,
}

/// Answer from a named external adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeFetcher {
  #[serde(flatten)]
  pub base: BaseFetcher,

  pub name: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub request_data: Option<RequestData>,
}

/// Answer from a plain URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpFetcher {
  #[serde(flatten)]
  pub base: BaseFetcher,

  #[serde(default = "default_method")]
  pub method: String,

  pub url: Url,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub request_data: Option<RequestData>,

  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub allow_unrestricted_network_access: bool,
}

fn default_method() -> String {
  "GET".to_string()
}

/// Median of the answers of nested fetchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedianFetcher {
  #[serde(flatten)]
  pub base: BaseFetcher,

  #[serde(default = "default_min_answers")]
  pub min_answers: usize,

  pub fetchers: Fetchers,
}

fn default_min_answers() -> usize {
  1
}

/// A node of an observation source tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Fetcher {
  Bridge(BridgeFetcher),
  Http(HttpFetcher),
  Median(MedianFetcher),
}

impl Fetcher {
  /// Decode one fetcher document (and, for medians, its children).
  pub fn from_value(index: usize, document: Value) -> Result<Self, DecodeError> {
    let type_name = peek_type(index, &document)?;
    match type_name.as_str() {
      "bridge" => Ok(Fetcher::Bridge(decode_variant(index, &type_name, document)?)),
      "http" => Ok(Fetcher::Http(decode_variant(index, &type_name, document)?)),
      "median" => Ok(Fetcher::Median(decode_variant(index, &type_name, document)?)),
      _ => Err(DecodeError::UnknownType {
        index,
        kind: "fetcher",
        type_name,
        document: document.to_string(),
      }),
    }
  }

  pub fn base(&self) -> &BaseFetcher {
    match self {
      Fetcher::Bridge(f) => &f.base,
      Fetcher::Http(f) => &f.base,
      Fetcher::Median(f) => &f.base,
    }
  }

  pub fn base_mut(&mut self) -> &mut BaseFetcher {
    match self {
      Fetcher::Bridge(f) => &mut f.base,
      Fetcher::Http(f) => &mut f.base,
      Fetcher::Median(f) => &mut f.base,
    }
  }

  /// Short label used in events and logs.
  pub fn describe(&self) -> String {
    match self {
      Fetcher::Bridge(f) => format!("bridge({})", f.name),
      Fetcher::Http(f) => format!("http({})", f.url),
      Fetcher::Median(f) => format!("median({} fetchers)", f.fetchers.len()),
    }
  }

  /// Produce this fetcher's answer, then run its transformers.
  pub fn fetch<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
    Box::pin(async move {
      let base = self.base();
      let stage = self.describe();
      base.notifiee.notify(PipelineEvent::FetchStarted {
        stage: stage.clone(),
      });

      let answer = match self {
        Fetcher::Bridge(f) => {
          let task = BridgeTask {
            base: BaseTask::default(),
            name: f.name.clone(),
            request_data: f.request_data.clone(),
          };
          task.run(&[], ctx).await
        }
        Fetcher::Http(f) => {
          let task = HttpTask {
            base: BaseTask::default(),
            method: f.method.clone(),
            url: f.url.clone(),
            request_data: f.request_data.clone(),
            allow_unrestricted_network_access: f.allow_unrestricted_network_access,
          };
          task.run(&[], ctx).await
        }
        Fetcher::Median(f) => {
          let answers = join_all(f.fetchers.iter().map(|child| child.fetch(ctx))).await;
          let task = MedianTask {
            base: BaseTask::default(),
            min_answers: f.min_answers,
          };
          task.run(&answers)
        }
      };

      let result = base.transformers.apply(answer, &stage);
      match &result {
        TaskResult::Value(value) => {
          debug!(stage = %stage, answer = %value, "fetch completed");
          base.notifiee.notify(PipelineEvent::FetchCompleted {
            stage,
            answer: value.to_string(),
          });
        }
        TaskResult::Error(failure) => {
          debug!(stage = %stage, error = %failure, "fetch failed");
          base.notifiee.notify(PipelineEvent::FetchFailed {
            stage,
            error: failure.to_string(),
          });
        }
      }
      result
    })
  }

  /// Visit this fetcher and every nested fetcher, parents first.
  fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut Fetcher)) {
    visit(self);
    if let Fetcher::Median(median) = self {
      for child in &mut median.fetchers.0 {
        child.walk_mut(visit);
      }
    }
  }

  fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Fetcher)) {
    visit(self);
    if let Fetcher::Median(median) = self {
      for child in &median.fetchers.0 {
        child.walk(visit);
      }
    }
  }
}

impl<'de> Deserialize<'de> for Fetcher {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let document = Value::deserialize(deserializer)?;
    Fetcher::from_value(0, document).map_err(serde::de::Error::custom)
  }
}

/// Ordered collection of fetchers, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fetchers(Vec<Fetcher>);

impl Fetchers {
  pub fn new(fetchers: Vec<Fetcher>) -> Self {
    Self(fetchers)
  }

  /// Decode a JSON array of fetcher documents. Fails on the first bad one.
  pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
    Self::from_values(split_collection(bytes)?)
  }

  pub fn from_values(documents: Vec<Value>) -> Result<Self, DecodeError> {
    documents
      .into_iter()
      .enumerate()
      .map(|(index, document)| Fetcher::from_value(index, document))
      .collect::<Result<Vec<_>, _>>()
      .map(Fetchers)
  }

  /// Decode and attach `notifiee` in one step.
  pub fn decode_with_notifiee(
    bytes: &[u8],
    notifiee: Arc<dyn Notifiee>,
  ) -> Result<Self, DecodeError> {
    let mut fetchers = Self::decode(bytes)?;
    fetchers.attach_notifiee(notifiee);
    Ok(fetchers)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Fetcher> {
    self.0.iter()
  }

  pub fn first(&self) -> Option<&Fetcher> {
    self.0.first()
  }

  /// Attach `notifiee` to every fetcher and transformer in the tree.
  ///
  /// Returns the number of stages reached.
  pub fn attach_notifiee(&mut self, notifiee: Arc<dyn Notifiee>) -> usize {
    let mut reached = 0;
    for fetcher in &mut self.0 {
      fetcher.walk_mut(&mut |f| {
        let base = f.base_mut();
        base.notifiee = NotifieeRef::new(notifiee.clone());
        reached += 1 + base.transformers.attach_notifiee(&notifiee);
      });
    }
    reached
  }

  /// Record `owner` on every fetcher in the tree.
  pub fn assign_owner(&mut self, owner: JobOwner) {
    for fetcher in &mut self.0 {
      fetcher.walk_mut(&mut |f| f.base_mut().owner = Some(owner));
    }
  }

  /// Number every fetcher in the tree, parents first, starting at `first`.
  /// Returns the next unused id.
  pub fn assign_ids(&mut self, first: i64) -> i64 {
    let mut next = first;
    for fetcher in &mut self.0 {
      fetcher.walk_mut(&mut |f| {
        f.base_mut().id = Some(next);
        next += 1;
      });
    }
    next
  }

  /// Names of every bridge referenced anywhere in the tree.
  pub fn bridge_names(&self) -> Vec<&str> {
    let mut names = Vec::new();
    for fetcher in &self.0 {
      fetcher.walk(&mut |f| {
        if let Fetcher::Bridge(bridge) = f {
          names.push(bridge.name.as_str());
        }
      });
    }
    names
  }
}

impl Serialize for Fetchers {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.0.serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for Fetchers {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let documents = Vec::<Value>::deserialize(deserializer)?;
    Fetchers::from_values(documents).map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notify::testing::Recorder;
  use crate::owner::OwnerKind;
  use serde_json::json;

  const SOURCE: &[u8] = br#"[
    {
      "type": "median",
      "minAnswers": 2,
      "fetchers": [
        {"type": "bridge", "name": "coingecko", "transformPipeline": [{"type": "multiply", "times": 100}]},
        {"type": "http", "url": "https://prices.example/eth"},
        {
          "type": "median",
          "fetchers": [{"type": "bridge", "name": "kaiko"}],
          "transformPipeline": [
            {"type": "jsonparse", "path": ["result"]},
            {"type": "multiply", "times": "1.5"}
          ]
        }
      ]
    }
  ]"#;

  #[test]
  fn test_decode_nested_tree() {
    let fetchers = Fetchers::decode(SOURCE).unwrap();
    assert_eq!(fetchers.len(), 1);

    let Some(Fetcher::Median(root)) = fetchers.first() else {
      panic!("expected a median root");
    };
    assert_eq!(root.min_answers, 2);
    assert_eq!(root.fetchers.len(), 3);
    assert_eq!(fetchers.bridge_names(), ["coingecko", "kaiko"]);
  }

  #[test]
  fn test_unknown_fetcher_type_fails_whole_collection() {
    let result = Fetchers::decode(
      br#"[{"type": "http", "url": "https://a.example"}, {"type": "carrier-pigeon"}]"#,
    );
    match result {
      Err(DecodeError::UnknownType { index, kind, type_name, .. }) => {
        assert_eq!(index, 1);
        assert_eq!(kind, "fetcher");
        assert_eq!(type_name, "carrier-pigeon");
      }
      other => panic!("expected unknown type, got {:?}", other),
    }
  }

  #[test]
  fn test_discriminators_match_exactly() {
    let result = Fetchers::decode(br#"[{"type": "BRIDGE", "name": "price"}]"#);
    assert!(matches!(
      result,
      Err(DecodeError::UnknownType { ref type_name, .. }) if type_name == "BRIDGE"
    ));
  }

  #[test]
  fn test_notifiee_reaches_every_stage_once() {
    let recorder = Arc::new(Recorder::default());
    let sink: Arc<dyn Notifiee> = recorder.clone();
    let fetchers = Fetchers::decode_with_notifiee(SOURCE, sink.clone()).unwrap();

    let mut count = 0;
    for root in fetchers.iter() {
      root.walk(&mut |f| {
        assert!(f.base().notifiee.is(&sink));
        assert!(f.base().transformers.iter().all(|t| t.notifiee().is(&sink)));
        count += 1 + f.base().transformers.len();
      });
    }
    // Five fetchers and three transformers.
    assert_eq!(count, 8);

    let mut again = fetchers.clone();
    assert_eq!(again.attach_notifiee(sink), 8);
  }

  #[test]
  fn test_owner_and_ids() {
    let mut fetchers = Fetchers::decode(SOURCE).unwrap();
    let owner = JobOwner {
      kind: OwnerKind::FluxMonitor,
      job_id: 7,
    };
    fetchers.assign_owner(owner);
    assert_eq!(fetchers.assign_ids(1), 6);

    let mut seen = Vec::new();
    for root in fetchers.iter() {
      root.walk(&mut |f| {
        assert_eq!(f.base().owner, Some(owner));
        seen.push(f.base().id.unwrap());
      });
    }
    assert_eq!(seen, [1, 2, 3, 4, 5]);
  }

  #[test]
  fn test_serialize_round_trip_skips_runtime_fields() {
    let mut fetchers = Fetchers::decode(SOURCE).unwrap();
    fetchers.assign_ids(10);

    let encoded = serde_json::to_value(&fetchers).unwrap();
    assert!(encoded[0].get("id").is_none());
    assert_eq!(encoded[0]["type"], json!("median"));
    assert_eq!(encoded[0]["fetchers"][0]["transformPipeline"][0]["times"], json!(100));

    let decoded: Fetchers = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded, Fetchers::decode(SOURCE).unwrap());
  }
}
