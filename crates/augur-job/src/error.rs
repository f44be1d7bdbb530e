use augur_task::RegistryError;
use thiserror::Error;

/// Errors raised while decoding, gating or validating a job spec.
#[derive(Debug, Error)]
pub enum JobError {
  /// The document could not be decoded at all.
  #[error("malformed job spec: {0}")]
  Malformed(String),

  /// The document decoded but breaks a validation rule.
  #[error("job spec invalid: {0}")]
  Invalid(String),

  /// The job kind is disabled by configuration.
  #[error("{0}")]
  NotImplemented(String),

  /// The bridge registry could not be consulted.
  #[error(transparent)]
  Registry(RegistryError),
}

impl JobError {
  pub(crate) fn invalid(message: impl Into<String>) -> Self {
    JobError::Invalid(message.into())
  }
}
