//! Augur Store
//!
//! Storage trait and SQLite implementation for job specs and bridges.
//!
//! The [`Store`] trait defines operations for:
//! - Creating, reading, listing and archiving V1 job specs
//! - Creating, reading and deleting V2 job specs
//! - Registering and looking up bridges and external initiators
//!
//! Every store is also a [`BridgeRegistry`], so pipelines can resolve bridge
//! names against it directly.

mod error;
mod sqlite;
mod types;

use std::future::Future;

use augur_job::{JobId, JobSpec, JobSpecV2};
use augur_task::BridgeRegistry;
use chrono::{DateTime, Utc};

pub use error::Error;
pub use sqlite::SqliteStore;
pub use types::{Bridge, ExternalInitiator, JobRecordV2, SortOrder};

/// Storage trait for job specs and bridges.
pub trait Store: BridgeRegistry + Send + Sync {
  /// Persist a new V1 job.
  fn create_job(&self, job: &JobSpec) -> impl Future<Output = Result<(), Error>> + Send;

  /// Get a V1 job by id, archived or not.
  fn find_job(&self, id: &JobId) -> impl Future<Output = Result<JobSpec, Error>> + Send;

  /// One page of live V1 jobs ordered by creation time, plus the total
  /// number of live jobs.
  fn jobs_sorted(
    &self,
    order: SortOrder,
    offset: u32,
    limit: u32,
  ) -> impl Future<Output = Result<(Vec<JobSpec>, u64), Error>> + Send;

  /// Mark a live V1 job archived.
  fn archive_job(
    &self,
    id: &JobId,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Error>> + Send;

  /// Persist a new V2 job and return its id.
  fn create_job_v2(
    &self,
    spec: &JobSpecV2,
    created_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<i32, Error>> + Send;

  /// Get a V2 job by id.
  fn find_job_v2(&self, id: i32) -> impl Future<Output = Result<JobRecordV2, Error>> + Send;

  /// Remove a V2 job.
  fn delete_job_v2(&self, id: i32) -> impl Future<Output = Result<(), Error>> + Send;

  /// Register or replace a bridge.
  fn create_bridge(&self, bridge: &Bridge) -> impl Future<Output = Result<(), Error>> + Send;

  /// Get a bridge by name (case-insensitive).
  fn find_bridge(&self, name: &str) -> impl Future<Output = Result<Bridge, Error>> + Send;

  /// Register or replace an external initiator.
  fn create_external_initiator(
    &self,
    initiator: &ExternalInitiator,
  ) -> impl Future<Output = Result<(), Error>> + Send;

  /// Get an external initiator by name (case-insensitive).
  fn find_external_initiator(
    &self,
    name: &str,
  ) -> impl Future<Output = Result<ExternalInitiator, Error>> + Send;
}
