use thiserror::Error;

use crate::types::{Cardinality, TaskType};

/// Errors produced while running a task.
#[derive(Debug, Error)]
pub enum TaskError {
  /// The task received a number of inputs it cannot work with.
  #[error("wrong number of task inputs: {task} task requires {expected}, got {actual}")]
  WrongInputCardinality {
    task: TaskType,
    expected: Cardinality,
    actual: usize,
  },

  /// Bridge name could not be resolved to an adapter URL.
  #[error("bridge lookup failed: {0}")]
  Bridge(#[from] RegistryError),

  /// The request URL could not be used.
  #[error("invalid url '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  /// Unsupported HTTP method.
  #[error("unsupported HTTP method: {0}")]
  InvalidMethod(String),

  /// Target host resolves to an address that plain HTTP tasks may not reach.
  #[error("access to '{host}' is restricted; enable unrestricted network access to reach it")]
  RestrictedNetworkAccess { host: String },

  /// Transport level HTTP failure.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// Remote answered with a non-2xx status.
  #[error("http request to {url} returned status {status}: {body}")]
  BadStatus {
    url: String,
    status: u16,
    body: String,
  },

  /// Response body exceeded the configured limit.
  #[error("http response exceeded the {limit} byte limit")]
  ResponseTooLarge { limit: usize },

  /// Network call exceeded its timeout.
  #[error("http request timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  /// The run was cancelled while the task was in flight.
  #[error("task run cancelled")]
  Cancelled,

  /// Not enough successful inputs to aggregate.
  #[error("insufficient answers: received {received} successful answers, {required} required")]
  InsufficientAnswers { received: usize, required: usize },

  /// A value could not be interpreted the way the task needs it.
  #[error("invalid value: {message}")]
  InvalidValue { message: String },

  /// A JSON path segment did not exist in the parsed document.
  #[error("json path '{path}' not found")]
  PathNotFound { path: String },
}

/// Errors returned by a bridge registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
  /// No bridge is registered under that name.
  #[error("bridge '{name}' not found")]
  NotFound { name: String },

  /// The backing store failed.
  #[error("bridge registry error: {message}")]
  Backend { message: String },
}

/// Errors produced while decoding stage documents.
#[derive(Debug, Error)]
pub enum DecodeError {
  /// The collection itself is not a JSON array.
  #[error("invalid stage collection: {0}")]
  Collection(#[source] serde_json::Error),

  /// The discriminator could not be read.
  #[error("stage {index}: unreadable type header in {document}: {source}")]
  InvalidHeader {
    index: usize,
    document: String,
    #[source]
    source: serde_json::Error,
  },

  /// The document has no `type` field.
  #[error("stage {index}: missing type in {document}")]
  MissingType { index: usize, document: String },

  /// The discriminator is not registered.
  #[error("stage {index}: unknown {kind} type '{type_name}' in {document}")]
  UnknownType {
    index: usize,
    kind: &'static str,
    type_name: String,
    document: String,
  },

  /// The document does not match the shape of its variant.
  #[error("stage {index}: invalid '{type_name}' document: {source}")]
  Malformed {
    index: usize,
    type_name: String,
    #[source]
    source: serde_json::Error,
  },
}
