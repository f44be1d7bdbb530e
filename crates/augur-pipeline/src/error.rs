use augur_task::DecodeError;
use thiserror::Error;

/// Errors raised while building or running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// A stage document could not be decoded.
  #[error(transparent)]
  Decode(#[from] DecodeError),

  /// The pipeline has no tasks.
  #[error("pipeline has no tasks")]
  Empty,

  /// Two tasks share an id.
  #[error("duplicate task id: {id}")]
  DuplicateTaskId { id: String },

  /// A task lists an input id that does not exist.
  #[error("task '{task}' references unknown input '{input}'")]
  UnknownInput { task: String, input: String },

  /// The task graph contains a cycle.
  #[error("cycle detected in task graph")]
  CycleDetected,

  /// The graph must end in exactly one task.
  #[error("pipeline must have exactly one terminal task, found {count}")]
  TerminalCount { count: usize },

  /// The run was cancelled.
  #[error("pipeline run cancelled")]
  Cancelled,

  /// A spawned task panicked or was aborted.
  #[error("task join error: {0}")]
  Join(String),
}
