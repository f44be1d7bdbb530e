use std::sync::Arc;

use augur_task::decode::{decode_variant, peek_type};
use augur_task::{
  DecodeError, JsonParseTask, MultiplyTask, TaskError, TaskFailure, TaskResult, TaskValue,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::notify::{Notifiee, NotifieeRef, PipelineEvent};

/// Multiply the current value by `times`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplyTransformer {
  #[serde(with = "augur_task::decimal::serde")]
  pub times: BigDecimal,

  #[serde(skip)]
  pub notifiee: NotifieeRef,
}

/// Parse the current value as JSON and walk `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonParseTransformer {
  pub path: Vec<String>,

  #[serde(skip)]
  pub notifiee: NotifieeRef,
}

/// A post-processing step applied to a fetcher's answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transformer {
  Multiply(MultiplyTransformer),
  JsonParse(JsonParseTransformer),
}

impl Transformer {
  pub fn multiply(times: BigDecimal) -> Self {
    Transformer::Multiply(MultiplyTransformer {
      times,
      notifiee: NotifieeRef::default(),
    })
  }

  pub fn json_parse(path: &[&str]) -> Self {
    Transformer::JsonParse(JsonParseTransformer {
      path: path.iter().map(|s| s.to_string()).collect(),
      notifiee: NotifieeRef::default(),
    })
  }

  /// Decode one transformer document.
  pub fn from_value(index: usize, document: Value) -> Result<Self, DecodeError> {
    let type_name = peek_type(index, &document)?;
    match type_name.as_str() {
      "multiply" => Ok(Transformer::Multiply(decode_variant(index, &type_name, document)?)),
      "jsonparse" => Ok(Transformer::JsonParse(decode_variant(index, &type_name, document)?)),
      _ => Err(DecodeError::UnknownType {
        index,
        kind: "transformer",
        type_name,
        document: document.to_string(),
      }),
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Transformer::Multiply(_) => "multiply",
      Transformer::JsonParse(_) => "jsonparse",
    }
  }

  pub fn notifiee(&self) -> &NotifieeRef {
    match self {
      Transformer::Multiply(t) => &t.notifiee,
      Transformer::JsonParse(t) => &t.notifiee,
    }
  }

  fn notifiee_mut(&mut self) -> &mut NotifieeRef {
    match self {
      Transformer::Multiply(t) => &mut t.notifiee,
      Transformer::JsonParse(t) => &mut t.notifiee,
    }
  }

  pub fn transform(&self, value: &TaskValue) -> Result<TaskValue, TaskError> {
    match self {
      Transformer::Multiply(t) => MultiplyTask::new(t.times.clone()).multiply(value),
      Transformer::JsonParse(t) => {
        let path: Vec<&str> = t.path.iter().map(String::as_str).collect();
        JsonParseTask::new(&path).extract(value)
      }
    }
  }
}

impl<'de> Deserialize<'de> for Transformer {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let document = Value::deserialize(deserializer)?;
    Transformer::from_value(0, document).map_err(serde::de::Error::custom)
  }
}

/// Ordered transformer chain. Each output is the next transformer's input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transformers(Vec<Transformer>);

impl Transformers {
  pub fn new(transformers: Vec<Transformer>) -> Self {
    Self(transformers)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Transformer> {
    self.0.iter()
  }

  /// Attach `notifiee` to every transformer, returning how many were reached.
  pub fn attach_notifiee(&mut self, notifiee: &Arc<dyn Notifiee>) -> usize {
    for transformer in &mut self.0 {
      *transformer.notifiee_mut() = NotifieeRef::new(notifiee.clone());
    }
    self.0.len()
  }

  /// Run the chain over `result`. A failed input or a failing transformer
  /// ends the chain with that failure.
  pub fn apply(&self, result: TaskResult, stage: &str) -> TaskResult {
    let mut current = match result {
      TaskResult::Value(value) => value,
      failed => return failed,
    };
    for transformer in &self.0 {
      match transformer.transform(&current) {
        Ok(next) => {
          transformer.notifiee().notify(PipelineEvent::TransformApplied {
            stage: stage.to_string(),
            transformer: transformer.name().to_string(),
          });
          current = next;
        }
        Err(e) => {
          let context = format!("{} transformer", transformer.name());
          return TaskResult::Error(TaskFailure::new(e).with_context(context));
        }
      }
    }
    TaskResult::Value(current)
  }
}

impl Serialize for Transformers {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.0.serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for Transformers {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let documents = Vec::<Value>::deserialize(deserializer)?;
    documents
      .into_iter()
      .enumerate()
      .map(|(index, document)| Transformer::from_value(index, document))
      .collect::<Result<Vec<_>, _>>()
      .map(Transformers)
      .map_err(serde::de::Error::custom)
  }
}
