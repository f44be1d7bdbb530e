use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::TaskError;
use crate::result::{TaskResult, TaskValue};
use crate::task::{BaseTask, check_cardinality};
use crate::types::TaskType;

/// Parse the input as JSON and walk `path` into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonParseTask {
  #[serde(flatten)]
  pub base: BaseTask,

  /// Object keys or array indices. Accepts a list or a comma separated string.
  #[serde(deserialize_with = "deserialize_path")]
  pub path: Vec<String>,
}

impl JsonParseTask {
  pub fn new(path: &[&str]) -> Self {
    Self {
      base: BaseTask::default(),
      path: path.iter().map(|s| s.to_string()).collect(),
    }
  }

  pub fn run(&self, inputs: &[TaskResult]) -> TaskResult {
    single_input(TaskType::JsonParse, inputs, |value| self.extract(value))
  }

  pub fn extract(&self, value: &TaskValue) -> Result<TaskValue, TaskError> {
    let mut current = value.as_json()?;
    for (depth, segment) in self.path.iter().enumerate() {
      let next = match &mut current {
        Value::Object(map) => map.remove(segment),
        Value::Array(items) => segment
          .parse::<usize>()
          .ok()
          .filter(|i| *i < items.len())
          .map(|i| items.swap_remove(i)),
        _ => None,
      };
      current = next.ok_or_else(|| TaskError::PathNotFound {
        path: self.path[..=depth].join("."),
      })?;
    }
    Ok(TaskValue::Json(current))
  }
}

fn deserialize_path<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Path {
    List(Vec<String>),
    Joined(String),
  }

  Ok(match Path::deserialize(deserializer)? {
    Path::List(segments) => segments,
    Path::Joined(joined) if joined.is_empty() => Vec::new(),
    Path::Joined(joined) => joined.split(',').map(|s| s.trim().to_string()).collect(),
  })
}

/// Multiply the numeric input by `times`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplyTask {
  #[serde(flatten)]
  pub base: BaseTask,

  #[serde(with = "crate::decimal::serde")]
  pub times: BigDecimal,
}

impl MultiplyTask {
  pub fn new(times: BigDecimal) -> Self {
    Self {
      base: BaseTask::default(),
      times,
    }
  }

  pub fn run(&self, inputs: &[TaskResult]) -> TaskResult {
    single_input(TaskType::Multiply, inputs, |value| self.multiply(value))
  }

  pub fn multiply(&self, value: &TaskValue) -> Result<TaskValue, TaskError> {
    Ok(TaskValue::Decimal(value.as_decimal()? * &self.times))
  }
}

/// Shared body of the one-input tasks: check cardinality, pass upstream
/// failures through, apply `f` to the value.
fn single_input<F>(task_type: TaskType, inputs: &[TaskResult], f: F) -> TaskResult
where
  F: FnOnce(&TaskValue) -> Result<TaskValue, TaskError>,
{
  if let Err(e) = check_cardinality(task_type, inputs) {
    return TaskResult::error(e);
  }
  match &inputs[0] {
    TaskResult::Error(failure) => {
      TaskResult::Error(failure.clone().with_context(format!("{} task input", task_type)))
    }
    TaskResult::Value(value) => match f(value) {
      Ok(value) => TaskResult::Value(value),
      Err(e) => TaskResult::error(e),
    },
  }
}
