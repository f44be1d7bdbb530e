use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use serde_json::Value;

use crate::decimal::{decimal_from_json, decimal_to_json, decimal_to_string, parse_decimal};
use crate::error::TaskError;

/// Successful output of a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskValue {
  /// Raw response body.
  Bytes(Vec<u8>),
  /// Structured JSON.
  Json(Value),
  /// Exact decimal number.
  Decimal(BigDecimal),
}

impl TaskValue {
  /// Numeric view of the value.
  ///
  /// Bytes are read as JSON first and as plain decimal text second.
  pub fn as_decimal(&self) -> Result<BigDecimal, TaskError> {
    match self {
      TaskValue::Decimal(d) => Ok(d.clone()),
      TaskValue::Json(v) => decimal_from_json(v),
      TaskValue::Bytes(bytes) => match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => decimal_from_json(&value),
        Err(_) => {
          let text = std::str::from_utf8(bytes).map_err(|e| TaskError::InvalidValue {
            message: format!("value is not utf-8: {}", e),
          })?;
          parse_decimal(text)
        }
      },
    }
  }

  /// JSON view of the value, failing when bytes are not a JSON document.
  pub fn as_json(&self) -> Result<Value, TaskError> {
    match self {
      TaskValue::Json(v) => Ok(v.clone()),
      TaskValue::Decimal(d) => Ok(decimal_to_json(d)),
      TaskValue::Bytes(bytes) => {
        serde_json::from_slice(bytes).map_err(|e| TaskError::InvalidValue {
          message: format!("value is not valid JSON: {}", e),
        })
      }
    }
  }

  /// Lossy JSON view, falling back to a string for non-JSON bytes.
  pub fn to_json(&self) -> Value {
    match self {
      TaskValue::Bytes(bytes) => serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned())),
      other => other.as_json().unwrap_or(Value::Null),
    }
  }
}

impl fmt::Display for TaskValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TaskValue::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
      TaskValue::Json(v) => write!(f, "{}", v),
      TaskValue::Decimal(d) => f.write_str(&decimal_to_string(d)),
    }
  }
}

impl From<BigDecimal> for TaskValue {
  fn from(value: BigDecimal) -> Self {
    TaskValue::Decimal(value)
  }
}

impl From<Value> for TaskValue {
  fn from(value: Value) -> Self {
    TaskValue::Json(value)
  }
}

/// A task error together with where it was raised.
///
/// Cloning shares the underlying error, so a failure handed to several
/// downstream tasks keeps its original origin.
#[derive(Debug, Clone)]
pub struct TaskFailure {
  error: Arc<TaskError>,
  origin: &'static Location<'static>,
  context: Vec<String>,
}

impl TaskFailure {
  #[track_caller]
  pub fn new(error: TaskError) -> Self {
    Self {
      error: Arc::new(error),
      origin: Location::caller(),
      context: Vec::new(),
    }
  }

  pub fn error(&self) -> &TaskError {
    &self.error
  }

  /// Source location that raised the error.
  pub fn origin(&self) -> &'static Location<'static> {
    self.origin
  }

  /// Annotations added while the failure travelled, innermost first.
  pub fn context(&self) -> &[String] {
    &self.context
  }

  pub fn with_context(mut self, context: impl Into<String>) -> Self {
    self.context.push(context.into());
    self
  }
}

impl fmt::Display for TaskFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for context in self.context.iter().rev() {
      write!(f, "{}: ", context)?;
    }
    write!(f, "{}", self.error)
  }
}

impl std::error::Error for TaskFailure {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    Some(self.error.as_ref())
  }
}

/// Outcome of running one task: a value or a failure, never both.
#[derive(Debug, Clone)]
pub enum TaskResult {
  Value(TaskValue),
  Error(TaskFailure),
}

impl TaskResult {
  pub fn value(value: impl Into<TaskValue>) -> Self {
    TaskResult::Value(value.into())
  }

  #[track_caller]
  pub fn error(error: TaskError) -> Self {
    TaskResult::Error(TaskFailure::new(error))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, TaskResult::Error(_))
  }

  pub fn as_value(&self) -> Option<&TaskValue> {
    match self {
      TaskResult::Value(v) => Some(v),
      TaskResult::Error(_) => None,
    }
  }

  pub fn as_error(&self) -> Option<&TaskFailure> {
    match self {
      TaskResult::Value(_) => None,
      TaskResult::Error(e) => Some(e),
    }
  }

  pub fn into_result(self) -> Result<TaskValue, TaskFailure> {
    match self {
      TaskResult::Value(v) => Ok(v),
      TaskResult::Error(e) => Err(e),
    }
  }
}

impl From<Result<TaskValue, TaskFailure>> for TaskResult {
  fn from(result: Result<TaskValue, TaskFailure>) -> Self {
    match result {
      Ok(v) => TaskResult::Value(v),
      Err(e) => TaskResult::Error(e),
    }
  }
}
