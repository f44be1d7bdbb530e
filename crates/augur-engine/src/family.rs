//! V1 and V2 jobs as two families sharing one create/remove lifecycle.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use augur_config::FeatureFlags;
use augur_job::{JobError, JobId, JobSpec, JobSpecV2, JobState, require_implemented_v1, require_implemented_v2};
use augur_store::Store;
use augur_task::HttpClient;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::external::notify_external_initiators;

/// One generation of job specs.
pub trait JobFamily: Send + Sync {
  type Spec: Send + Sync;
  type Id: Copy + Display + Send + Sync;

  /// State a removed job ends in.
  const REMOVED: JobState;

  /// Family name for logs.
  fn name(&self) -> &'static str;

  /// Reject specs whose job kind is disabled by configuration.
  fn require_implemented(&self, spec: &Self::Spec) -> Result<(), JobError>;

  fn validate(&self, spec: &Self::Spec) -> impl Future<Output = Result<(), JobError>> + Send;

  /// Tell outside parties about a validated job before it is stored.
  fn announce(&self, _spec: &Self::Spec) -> impl Future<Output = Result<(), EngineError>> + Send {
    async { Ok::<(), EngineError>(()) }
  }

  /// Current lifecycle state of a stored job.
  fn state(&self, id: Self::Id) -> impl Future<Output = Result<JobState, EngineError>> + Send;

  fn persist(&self, spec: &Self::Spec) -> impl Future<Output = Result<Self::Id, EngineError>> + Send;

  fn remove(&self, id: Self::Id) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// Gate, validate, announce and persist `spec`. Nothing is stored unless
/// every step succeeds.
pub async fn create<F: JobFamily>(family: &F, spec: &F::Spec) -> Result<F::Id, EngineError> {
  if let Err(e) = family.require_implemented(spec) {
    warn!(family = family.name(), error = %e, "job rejected by feature gate");
    return Err(e.into());
  }
  family.validate(spec).await?;
  family.announce(spec).await?;

  let id = family.persist(spec).await?;
  info!(family = family.name(), job_id = %id, state = %JobState::Active, "job created");
  Ok(id)
}

/// Archive or delete a job, depending on the family. Jobs whose stored
/// state cannot move to the family's removed state are reported missing.
pub async fn remove<F: JobFamily>(family: &F, id: F::Id) -> Result<(), EngineError> {
  let state = family.state(id).await?;
  if !state.can_transition_to(F::REMOVED) {
    debug!(family = family.name(), job_id = %id, state = %state, "job already removed");
    return Err(EngineError::NotFound(format!("job {}", id)));
  }

  family.remove(id).await?;
  info!(family = family.name(), job_id = %id, from = %state, state = %F::REMOVED, "job removed");
  Ok(())
}

/// V1 jobs: UUID ids, soft delete by archiving.
pub struct LegacyJobs<S> {
  store: Arc<S>,
  flags: Arc<dyn FeatureFlags>,
  http: HttpClient,
}

impl<S> LegacyJobs<S> {
  pub fn new(store: Arc<S>, flags: Arc<dyn FeatureFlags>, http: HttpClient) -> Self {
    Self { store, flags, http }
  }
}

impl<S: Store> JobFamily for LegacyJobs<S> {
  type Spec = JobSpec;
  type Id = JobId;

  const REMOVED: JobState = JobState::Archived;

  fn name(&self) -> &'static str {
    "v1"
  }

  fn require_implemented(&self, spec: &JobSpec) -> Result<(), JobError> {
    require_implemented_v1(spec, self.flags.as_ref())
  }

  async fn validate(&self, spec: &JobSpec) -> Result<(), JobError> {
    augur_job::v1::validate(spec, self.store.as_ref(), Utc::now()).await
  }

  async fn announce(&self, spec: &JobSpec) -> Result<(), EngineError> {
    notify_external_initiators(spec, self.store.as_ref(), &self.http).await
  }

  async fn state(&self, id: JobId) -> Result<JobState, EngineError> {
    let job = self.store.find_job(&id).await?;
    Ok(if job.is_archived() {
      JobState::Archived
    } else {
      JobState::Active
    })
  }

  async fn persist(&self, spec: &JobSpec) -> Result<JobId, EngineError> {
    self.store.create_job(spec).await?;
    Ok(spec.id)
  }

  async fn remove(&self, id: JobId) -> Result<(), EngineError> {
    self.store.archive_job(&id, Utc::now()).await?;
    Ok(())
  }
}

/// V2 jobs: integer ids, hard delete.
pub struct OracleJobs<S> {
  store: Arc<S>,
  flags: Arc<dyn FeatureFlags>,
}

impl<S> OracleJobs<S> {
  pub fn new(store: Arc<S>, flags: Arc<dyn FeatureFlags>) -> Self {
    Self { store, flags }
  }
}

impl<S: Store> JobFamily for OracleJobs<S> {
  type Spec = JobSpecV2;
  type Id = i32;

  const REMOVED: JobState = JobState::Deleted;

  fn name(&self) -> &'static str {
    "v2"
  }

  fn require_implemented(&self, spec: &JobSpecV2) -> Result<(), JobError> {
    require_implemented_v2(spec, self.flags.as_ref())
  }

  async fn validate(&self, spec: &JobSpecV2) -> Result<(), JobError> {
    augur_job::v2::validate(spec, self.store.as_ref()).await
  }

  async fn state(&self, id: i32) -> Result<JobState, EngineError> {
    self.store.find_job_v2(id).await?;
    Ok(JobState::Active)
  }

  async fn persist(&self, spec: &JobSpecV2) -> Result<i32, EngineError> {
    Ok(self.store.create_job_v2(spec, Utc::now()).await?)
  }

  async fn remove(&self, id: i32) -> Result<(), EngineError> {
    self.store.delete_job_v2(id).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Recorded {
    state: JobState,
    removed: AtomicUsize,
  }

  impl Recorded {
    fn new(state: JobState) -> Self {
      Self {
        state,
        removed: AtomicUsize::new(0),
      }
    }
  }

  impl JobFamily for Recorded {
    type Spec = ();
    type Id = i32;

    const REMOVED: JobState = JobState::Deleted;

    fn name(&self) -> &'static str {
      "recorded"
    }

    fn require_implemented(&self, _: &()) -> Result<(), JobError> {
      Ok(())
    }

    async fn validate(&self, _: &()) -> Result<(), JobError> {
      Ok(())
    }

    async fn state(&self, _: i32) -> Result<JobState, EngineError> {
      Ok(self.state)
    }

    async fn persist(&self, _: &()) -> Result<i32, EngineError> {
      Ok(1)
    }

    async fn remove(&self, _: i32) -> Result<(), EngineError> {
      self.removed.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
  }

  #[tokio::test]
  async fn test_remove_active_job() {
    let family = Recorded::new(JobState::Active);
    remove(&family, 1).await.unwrap();
    assert_eq!(family.removed.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_remove_respects_stored_state() {
    for state in [JobState::Deleted, JobState::Archived, JobState::Validated] {
      let family = Recorded::new(state);
      assert!(matches!(remove(&family, 1).await, Err(EngineError::NotFound(_))));
      assert_eq!(family.removed.load(Ordering::SeqCst), 0, "{} job was removed", state);
    }
  }

  #[tokio::test]
  async fn test_create_runs_every_step() {
    assert_eq!(create(&Recorded::new(JobState::Proposed), &()).await.unwrap(), 1);
  }
}
