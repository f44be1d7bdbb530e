//! Error types for the job engine.

use augur_job::JobError;
use augur_pipeline::PipelineError;
use thiserror::Error;

/// Errors returned by [`crate::JobEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
  /// Decoding, gating or validation rejected the spec.
  #[error(transparent)]
  Job(#[from] JobError),

  /// No live job with the given id.
  #[error("{0} not found")]
  NotFound(String),

  #[error("storage error: {0}")]
  Store(augur_store::Error),

  /// A stored job could not be turned into something runnable.
  #[error(transparent)]
  Pipeline(#[from] PipelineError),

  /// The V2 job has no observation source to run (bootstrap peers).
  #[error("job {0} has no observation source")]
  NoObservationSource(i32),

  /// An external initiator could not be told about a new job.
  #[error("notifying external initiator '{name}' failed: {message}")]
  ExternalInitiator { name: String, message: String },
}

impl From<augur_store::Error> for EngineError {
  fn from(error: augur_store::Error) -> Self {
    match error {
      augur_store::Error::NotFound(what) => EngineError::NotFound(what),
      other => EngineError::Store(other),
    }
  }
}
