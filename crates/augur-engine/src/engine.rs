//! Job engine.
//!
//! The `JobEngine` is the single entry point for the job lifecycle: it routes
//! V1 and V2 specs to their family, reads and lists stored jobs, and runs a
//! stored job's pipeline or observation source once.

use std::sync::Arc;

use augur_config::FeatureFlags;
use augur_job::{JobId, JobSpec, JobSpecRequest, JobSpecV2};
use augur_pipeline::{Notifiee, PipelineRun, Runner};
use augur_store::{JobRecordV2, SortOrder, Store};
use augur_task::{BridgeRegistry, HttpClient, TaskContext, TaskResult};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::EngineError;
use crate::family::{self, LegacyJobs, OracleJobs};

/// The job lifecycle façade.
pub struct JobEngine<S> {
  store: Arc<S>,
  legacy: LegacyJobs<S>,
  oracle: OracleJobs<S>,
  http: HttpClient,
  notifiee: Option<Arc<dyn Notifiee>>,
}

impl<S: Store + 'static> JobEngine<S> {
  /// Create a new engine backed by `store`.
  pub fn new(store: Arc<S>, flags: Arc<dyn FeatureFlags>, http: HttpClient) -> Self {
    Self {
      legacy: LegacyJobs::new(store.clone(), flags.clone(), http.clone()),
      oracle: OracleJobs::new(store.clone(), flags),
      store,
      http,
      notifiee: None,
    }
  }

  /// Send run events for every pipeline and fetcher tree to `notifiee`.
  pub fn with_notifiee(mut self, notifiee: Arc<dyn Notifiee>) -> Self {
    self.notifiee = Some(notifiee);
    self
  }

  pub fn store(&self) -> &Arc<S> {
    &self.store
  }

  /// Create a V1 job from a decoded request.
  pub async fn create_job(&self, request: JobSpecRequest) -> Result<JobSpec, EngineError> {
    let job = JobSpec::from_request(request, Utc::now());
    family::create(&self.legacy, &job).await?;
    Ok(job)
  }

  /// Create a V2 job and return its id.
  pub async fn create_job_v2(&self, spec: &JobSpecV2) -> Result<i32, EngineError> {
    family::create(&self.oracle, spec).await
  }

  /// A V1 job by id. Archived jobs are still returned.
  pub async fn show_job(&self, id: &JobId) -> Result<JobSpec, EngineError> {
    Ok(self.store.find_job(id).await?)
  }

  pub async fn show_job_v2(&self, id: i32) -> Result<JobRecordV2, EngineError> {
    Ok(self.store.find_job_v2(id).await?)
  }

  /// One page of live V1 jobs and the total number of live jobs.
  pub async fn list_jobs(
    &self,
    order: SortOrder,
    offset: u32,
    size: u32,
  ) -> Result<(Vec<JobSpec>, u64), EngineError> {
    Ok(self.store.jobs_sorted(order, offset, size).await?)
  }

  /// Archive a live V1 job.
  pub async fn archive_job(&self, id: JobId) -> Result<(), EngineError> {
    family::remove(&self.legacy, id).await
  }

  /// Delete a V2 job.
  pub async fn delete_job_v2(&self, id: i32) -> Result<(), EngineError> {
    family::remove(&self.oracle, id).await
  }

  /// Run a V1 job's task pipeline once.
  #[instrument(name = "run_job", skip_all, fields(job_id = %id))]
  pub async fn run_job(&self, id: &JobId, cancel: CancellationToken) -> Result<PipelineRun, EngineError> {
    let job = self.store.find_job(id).await?;
    if job.is_archived() {
      return Err(EngineError::NotFound(format!("job {}", id)));
    }

    let mut pipeline = job.pipeline()?;
    if let Some(notifiee) = &self.notifiee {
      pipeline = pipeline.with_notifiee(notifiee.clone());
    }

    let run = Runner::new(self.context(cancel)).run(&pipeline).await?;
    info!(run_id = %run.run_id, failed = run.output.is_error(), "job run finished");
    Ok(run)
  }

  /// Fetch a V2 job's observation source once.
  #[instrument(name = "run_job_v2", skip(self, cancel))]
  pub async fn run_job_v2(&self, id: i32, cancel: CancellationToken) -> Result<TaskResult, EngineError> {
    let mut record = self.store.find_job_v2(id).await?;
    if let Some(notifiee) = &self.notifiee {
      record.spec.observation_source.attach_notifiee(notifiee.clone());
    }

    let root = record
      .spec
      .observation_source
      .first()
      .ok_or(EngineError::NoObservationSource(id))?;
    let result = root.fetch(&self.context(cancel)).await;
    info!(failed = result.is_error(), "observation finished");
    Ok(result)
  }

  fn context(&self, cancel: CancellationToken) -> TaskContext {
    let bridges: Arc<dyn BridgeRegistry> = self.store.clone();
    TaskContext::new(bridges, self.http.clone()).with_cancel(cancel)
  }
}
