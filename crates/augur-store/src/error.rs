use thiserror::Error;

/// Errors returned by a [`crate::Store`].
#[derive(Debug, Error)]
pub enum Error {
  /// No record with the given key, or the record is no longer live.
  #[error("{0} not found")]
  NotFound(String),

  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("migration failed: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  /// A stored record could not be turned back into its model.
  #[error("corrupt record: {0}")]
  Corrupt(String),
}

impl Error {
  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::NotFound(_))
  }
}
