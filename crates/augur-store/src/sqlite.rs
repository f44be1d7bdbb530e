use std::str::FromStr;

use async_trait::async_trait;
use augur_job::{JobId, JobSpec, JobSpecV2};
use augur_pipeline::JobOwner;
use augur_task::{BridgeRegistry, RegistryError};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use url::Url;

use crate::{Bridge, Error, ExternalInitiator, JobRecordV2, SortOrder, Store};

#[derive(FromRow)]
struct JobRow {
  spec: Json<JobSpec>,
  archived_at: Option<DateTime<Utc>>,
}

impl From<JobRow> for JobSpec {
  fn from(row: JobRow) -> Self {
    let mut job = row.spec.0;
    job.archived_at = row.archived_at;
    job
  }
}

#[derive(FromRow)]
struct JobRowV2 {
  id: i64,
  spec: Json<JobSpecV2>,
  created_at: DateTime<Utc>,
}

impl TryFrom<JobRowV2> for JobRecordV2 {
  type Error = Error;

  fn try_from(row: JobRowV2) -> Result<Self, Error> {
    let id = i32::try_from(row.id).map_err(|_| Error::Corrupt(format!("job id {} out of range", row.id)))?;
    let mut spec = row.spec.0;
    spec.observation_source.assign_owner(JobOwner {
      kind: spec.job_type.owner_kind(),
      job_id: id,
    });
    spec.observation_source.assign_ids(1);
    Ok(JobRecordV2 {
      id,
      spec,
      created_at: row.created_at,
    })
  }
}

#[derive(FromRow)]
struct BridgeRow {
  name: String,
  url: String,
  created_at: DateTime<Utc>,
}

impl TryFrom<BridgeRow> for Bridge {
  type Error = Error;

  fn try_from(row: BridgeRow) -> Result<Self, Error> {
    let url = Url::parse(&row.url)
      .map_err(|e| Error::Corrupt(format!("bridge '{}' has invalid url: {}", row.name, e)))?;
    Ok(Bridge {
      name: row.name,
      url,
      created_at: row.created_at,
    })
  }
}

#[derive(FromRow)]
struct ExternalInitiatorRow {
  name: String,
  url: Option<String>,
  outgoing_token: String,
  outgoing_secret: String,
  created_at: DateTime<Utc>,
}

impl TryFrom<ExternalInitiatorRow> for ExternalInitiator {
  type Error = Error;

  fn try_from(row: ExternalInitiatorRow) -> Result<Self, Error> {
    let url = row
      .url
      .as_deref()
      .map(Url::parse)
      .transpose()
      .map_err(|e| Error::Corrupt(format!("external initiator '{}' has invalid url: {}", row.name, e)))?;
    Ok(ExternalInitiator {
      name: row.name,
      url,
      outgoing_token: row.outgoing_token,
      outgoing_secret: row.outgoing_secret,
      created_at: row.created_at,
    })
  }
}

/// SQLite-based store implementation.
#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open `database_url`, creating the file if needed, and run migrations.
  ///
  /// In-memory databases get a single connection so every query sees the
  /// same database.
  pub async fn connect(database_url: &str) -> Result<Self, Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
      .max_connections(max_connections)
      .connect_with(options)
      .await?;
    let store = Self::new(pool);
    store.migrate().await?;
    debug!(database_url = %database_url, "store ready");
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), Error> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    Ok(())
  }
}

impl Store for SqliteStore {
  async fn create_job(&self, job: &JobSpec) -> Result<(), Error> {
    sqlx::query(
      r#"
      INSERT INTO job_specs (id, name, spec, created_at, archived_at)
      VALUES (?, ?, ?, ?, ?)
      "#,
    )
    .bind(job.id.to_string())
    .bind(&job.name)
    .bind(Json(job))
    .bind(job.created_at)
    .bind(job.archived_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn find_job(&self, id: &JobId) -> Result<JobSpec, Error> {
    let row: Option<JobRow> = sqlx::query_as(
      r#"
      SELECT spec, archived_at
      FROM job_specs
      WHERE id = ?
      "#,
    )
    .bind(id.to_string())
    .fetch_optional(&self.pool)
    .await?;

    row
      .map(JobSpec::from)
      .ok_or_else(|| Error::NotFound(format!("job {}", id)))
  }

  async fn jobs_sorted(
    &self,
    order: SortOrder,
    offset: u32,
    limit: u32,
  ) -> Result<(Vec<JobSpec>, u64), Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_specs WHERE archived_at IS NULL")
      .fetch_one(&self.pool)
      .await?;

    let sql = format!(
      r#"
      SELECT spec, archived_at
      FROM job_specs
      WHERE archived_at IS NULL
      ORDER BY created_at {order}, rowid {order}
      LIMIT ? OFFSET ?
      "#,
      order = order.as_sql()
    );
    let rows: Vec<JobRow> = sqlx::query_as(&sql)
      .bind(i64::from(limit))
      .bind(i64::from(offset))
      .fetch_all(&self.pool)
      .await?;

    let total = u64::try_from(total).map_err(|_| Error::Corrupt(format!("negative job count {}", total)))?;
    Ok((rows.into_iter().map(JobSpec::from).collect(), total))
  }

  async fn archive_job(&self, id: &JobId, at: DateTime<Utc>) -> Result<(), Error> {
    let result = sqlx::query(
      r#"
      UPDATE job_specs
      SET archived_at = ?
      WHERE id = ? AND archived_at IS NULL
      "#,
    )
    .bind(at)
    .bind(id.to_string())
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(Error::NotFound(format!("job {}", id)));
    }
    Ok(())
  }

  async fn create_job_v2(&self, spec: &JobSpecV2, created_at: DateTime<Utc>) -> Result<i32, Error> {
    let result = sqlx::query(
      r#"
      INSERT INTO job_specs_v2 (job_type, spec, created_at)
      VALUES (?, ?, ?)
      "#,
    )
    .bind(spec.job_type.to_string())
    .bind(Json(spec))
    .bind(created_at)
    .execute(&self.pool)
    .await?;

    let id = result.last_insert_rowid();
    i32::try_from(id).map_err(|_| Error::Corrupt(format!("job id {} out of range", id)))
  }

  async fn find_job_v2(&self, id: i32) -> Result<JobRecordV2, Error> {
    let row: Option<JobRowV2> = sqlx::query_as(
      r#"
      SELECT id, spec, created_at
      FROM job_specs_v2
      WHERE id = ?
      "#,
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    row
      .ok_or_else(|| Error::NotFound(format!("job {}", id)))?
      .try_into()
  }

  async fn delete_job_v2(&self, id: i32) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM job_specs_v2 WHERE id = ?")
      .bind(id)
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
      return Err(Error::NotFound(format!("job {}", id)));
    }
    Ok(())
  }

  async fn create_bridge(&self, bridge: &Bridge) -> Result<(), Error> {
    sqlx::query(
      r#"
      INSERT INTO bridges (name, url, created_at)
      VALUES (?, ?, ?)
      ON CONFLICT (name) DO UPDATE SET url = excluded.url
      "#,
    )
    .bind(bridge.name.to_lowercase())
    .bind(bridge.url.as_str())
    .bind(bridge.created_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn find_bridge(&self, name: &str) -> Result<Bridge, Error> {
    let row: Option<BridgeRow> = sqlx::query_as(
      r#"
      SELECT name, url, created_at
      FROM bridges
      WHERE name = ?
      "#,
    )
    .bind(name.to_lowercase())
    .fetch_optional(&self.pool)
    .await?;

    row
      .ok_or_else(|| Error::NotFound(format!("bridge {}", name)))?
      .try_into()
  }

  async fn create_external_initiator(&self, initiator: &ExternalInitiator) -> Result<(), Error> {
    sqlx::query(
      r#"
      INSERT INTO external_initiators (name, url, outgoing_token, outgoing_secret, created_at)
      VALUES (?, ?, ?, ?, ?)
      ON CONFLICT (name) DO UPDATE SET
        url = excluded.url,
        outgoing_token = excluded.outgoing_token,
        outgoing_secret = excluded.outgoing_secret
      "#,
    )
    .bind(initiator.name.to_lowercase())
    .bind(initiator.url.as_ref().map(Url::as_str))
    .bind(&initiator.outgoing_token)
    .bind(&initiator.outgoing_secret)
    .bind(initiator.created_at)
    .execute(&self.pool)
    .await?;

    debug!(name = %initiator.name, "external initiator registered");
    Ok(())
  }

  async fn find_external_initiator(&self, name: &str) -> Result<ExternalInitiator, Error> {
    let row: Option<ExternalInitiatorRow> = sqlx::query_as(
      r#"
      SELECT name, url, outgoing_token, outgoing_secret, created_at
      FROM external_initiators
      WHERE name = ?
      "#,
    )
    .bind(name.to_lowercase())
    .fetch_optional(&self.pool)
    .await?;

    row
      .ok_or_else(|| Error::NotFound(format!("external initiator {}", name)))?
      .try_into()
  }
}

#[async_trait]
impl BridgeRegistry for SqliteStore {
  async fn find_bridge_url(&self, name: &str) -> Result<Url, RegistryError> {
    match self.find_bridge(name).await {
      Ok(bridge) => Ok(bridge.url),
      Err(Error::NotFound(_)) => Err(RegistryError::NotFound {
        name: name.to_string(),
      }),
      Err(e) => Err(RegistryError::Backend {
        message: e.to_string(),
      }),
    }
  }
}
