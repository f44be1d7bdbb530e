use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::bridge::BridgeTask;
use crate::context::TaskContext;
use crate::decode::{decode_variant, peek_type, split_collection};
use crate::error::{DecodeError, TaskError};
use crate::http::HttpTask;
use crate::median::MedianTask;
use crate::result::TaskResult;
use crate::transform::{JsonParseTask, MultiplyTask};
use crate::types::TaskType;

/// Fields common to every task document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseTask {
  /// Unique name within the pipeline.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,

  /// Ids of the tasks whose results feed this one. Absent means "the
  /// previous task"; an empty list marks an entry task.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub inputs: Option<Vec<String>>,
}

/// A pipeline task, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Task {
  Http(HttpTask),
  Bridge(BridgeTask),
  Median(MedianTask),
  JsonParse(JsonParseTask),
  Multiply(MultiplyTask),
}

impl Task {
  /// Decode one stage document. `index` is its position in the collection.
  pub fn from_value(index: usize, document: Value) -> Result<Self, DecodeError> {
    let type_name = peek_type(index, &document)?;
    let Some(task_type) = TaskType::from_name(&type_name) else {
      return Err(DecodeError::UnknownType {
        index,
        kind: "task",
        type_name,
        document: document.to_string(),
      });
    };

    Ok(match task_type {
      TaskType::Http => Task::Http(decode_variant(index, &type_name, document)?),
      TaskType::Bridge => Task::Bridge(decode_variant(index, &type_name, document)?),
      TaskType::Median => Task::Median(decode_variant(index, &type_name, document)?),
      TaskType::JsonParse => Task::JsonParse(decode_variant(index, &type_name, document)?),
      TaskType::Multiply => Task::Multiply(decode_variant(index, &type_name, document)?),
    })
  }

  /// Decode a JSON array of stage documents, failing on the first bad element.
  pub fn decode_all(bytes: &[u8]) -> Result<Vec<Task>, DecodeError> {
    Self::decode_values(split_collection(bytes)?)
  }

  pub fn decode_values(documents: Vec<Value>) -> Result<Vec<Task>, DecodeError> {
    documents
      .into_iter()
      .enumerate()
      .map(|(index, document)| Task::from_value(index, document))
      .collect()
  }

  pub fn task_type(&self) -> TaskType {
    match self {
      Task::Http(_) => TaskType::Http,
      Task::Bridge(_) => TaskType::Bridge,
      Task::Median(_) => TaskType::Median,
      Task::JsonParse(_) => TaskType::JsonParse,
      Task::Multiply(_) => TaskType::Multiply,
    }
  }

  pub fn base(&self) -> &BaseTask {
    match self {
      Task::Http(t) => &t.base,
      Task::Bridge(t) => &t.base,
      Task::Median(t) => &t.base,
      Task::JsonParse(t) => &t.base,
      Task::Multiply(t) => &t.base,
    }
  }

  pub fn base_mut(&mut self) -> &mut BaseTask {
    match self {
      Task::Http(t) => &mut t.base,
      Task::Bridge(t) => &mut t.base,
      Task::Median(t) => &mut t.base,
      Task::JsonParse(t) => &mut t.base,
      Task::Multiply(t) => &mut t.base,
    }
  }

  /// Run the task against the results of its inputs.
  pub async fn run(&self, inputs: &[TaskResult], ctx: &TaskContext) -> TaskResult {
    match self {
      Task::Http(t) => t.run(inputs, ctx).await,
      Task::Bridge(t) => t.run(inputs, ctx).await,
      Task::Median(t) => t.run(inputs),
      Task::JsonParse(t) => t.run(inputs),
      Task::Multiply(t) => t.run(inputs),
    }
  }
}

impl<'de> Deserialize<'de> for Task {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let document = Value::deserialize(deserializer)?;
    Task::from_value(0, document).map_err(serde::de::Error::custom)
  }
}

/// Fail with `WrongInputCardinality` when `inputs` does not fit `task_type`.
pub(crate) fn check_cardinality(task_type: TaskType, inputs: &[TaskResult]) -> Result<(), TaskError> {
  let expected = task_type.cardinality();
  if expected.accepts(inputs.len()) {
    Ok(())
  } else {
    Err(TaskError::WrongInputCardinality {
      task: task_type,
      expected,
      actual: inputs.len(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_decode_collection() {
    let tasks = Task::decode_all(
      br#"[
        {"type": "bridge", "id": "a", "name": "coingecko", "requestData": {"coin": "ETH"}},
        {"type": "http", "id": "b", "url": "https://example.com", "inputs": []},
        {"type": "median", "inputs": ["a", "b"], "minAnswers": 2},
        {"type": "multiply", "times": "100"}
      ]"#,
    )
    .unwrap();

    assert_eq!(tasks.len(), 4);
    assert_eq!(tasks[0].task_type(), TaskType::Bridge);
    assert_eq!(tasks[1].base().inputs, Some(vec![]));
    assert_eq!(tasks[2].base().id, None);
    match &tasks[2] {
      Task::Median(m) => assert_eq!(m.min_answers, 2),
      other => panic!("expected median, got {:?}", other),
    }
  }

  #[test]
  fn test_unknown_type_is_reported() {
    let result = Task::decode_all(br#"[{"type": "http", "url": "https://a.example"}, {"type": "teleport"}]"#);
    match result {
      Err(DecodeError::UnknownType {
        index,
        type_name,
        document,
        ..
      }) => {
        assert_eq!(index, 1);
        assert_eq!(type_name, "teleport");
        assert!(document.contains("teleport"));
      }
      other => panic!("expected unknown type, got {:?}", other),
    }
  }

  #[test]
  fn test_unknown_fields_are_ignored() {
    let task = Task::from_value(0, json!({"type": "bridge", "name": "x", "confirmations": 3})).unwrap();
    assert_eq!(task.task_type(), TaskType::Bridge);
  }

  #[test]
  fn test_malformed_variant() {
    let result = Task::from_value(2, json!({"type": "http"}));
    assert!(matches!(result, Err(DecodeError::Malformed { index: 2, .. })));
  }

  #[test]
  fn test_round_trip() {
    let documents = [
      json!({
        "type": "http",
        "id": "fetch",
        "url": "https://prices.example/eth",
        "method": "POST",
        "requestData": {"coin": "ETH"}
      }),
      json!({
        "type": "bridge",
        "id": "fetch",
        "name": "coingecko",
        "requestData": {"coin": "ETH", "market": "USD"}
      }),
      json!({"type": "median", "minAnswers": 2, "inputs": ["a", "b"]}),
      json!({"type": "jsonparse", "path": ["data", "price"]}),
      json!({"type": "multiply", "times": "1000000000000000000"}),
    ];

    for document in documents {
      let type_name = document["type"].as_str().unwrap().to_string();
      let task = Task::from_value(0, document).unwrap();
      assert_eq!(task.task_type().as_str(), type_name);

      let encoded = serde_json::to_value(&task).unwrap();
      assert_eq!(encoded["type"], type_name.as_str(), "{} lost its tag", type_name);
      let decoded = Task::from_value(0, encoded.clone()).unwrap();
      assert_eq!(decoded, task, "{} did not survive re-decoding", type_name);

      let decoded: Task = serde_json::from_value(encoded).unwrap();
      assert_eq!(decoded, task);
    }
  }
}
