use std::sync::Arc;

use augur_engine::JobEngine;
use augur_job::{JobId, JobSpecRequest, JobSpecV2};
use augur_store::Store;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ApiError;
use crate::pagination::{Page, PageParams};

type Engine<S> = State<Arc<JobEngine<S>>>;

/// Routes for the `/specs` surface.
pub fn router<S: Store + 'static>(engine: Arc<JobEngine<S>>) -> Router {
  Router::new()
    .route("/specs", get(index::<S>).post(create::<S>))
    .route("/specs/v2", post(create_v2::<S>))
    .route("/specs/v2/{id}", delete(destroy_v2::<S>))
    .route("/specs/{id}", get(show::<S>).delete(destroy::<S>))
    .with_state(engine)
}

async fn index<S: Store + 'static>(
  State(engine): Engine<S>,
  Query(params): Query<PageParams>,
) -> Result<Json<Value>, ApiError> {
  let page = Page::try_from(params)?;
  let (jobs, total) = engine.list_jobs(page.order, page.offset(), page.size).await?;
  Ok(Json(json!({
    "data": jobs,
    "meta": { "count": total },
    "links": page.links("/specs", total),
  })))
}

async fn create<S: Store + 'static>(State(engine): Engine<S>, body: Bytes) -> Result<Json<Value>, ApiError> {
  let request = JobSpecRequest::from_slice(&body)?;
  let job = engine.create_job(request).await?;
  debug!(job_id = %job.id, "created v1 job");
  Ok(Json(json!({ "data": job })))
}

async fn create_v2<S: Store + 'static>(State(engine): Engine<S>, body: String) -> Result<Json<Value>, ApiError> {
  let spec = JobSpecV2::from_toml(&body)?;
  let id = engine.create_job_v2(&spec).await?;
  debug!(job_id = id, "created v2 job");
  Ok(Json(json!({ "jobID": id })))
}

async fn show<S: Store + 'static>(State(engine): Engine<S>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
  let id = parse_job_id(&id)?;
  let job = engine.show_job(&id).await?;
  Ok(Json(json!({ "data": job })))
}

async fn destroy<S: Store + 'static>(State(engine): Engine<S>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
  let id = parse_job_id(&id)?;
  engine.archive_job(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

async fn destroy_v2<S: Store + 'static>(
  State(engine): Engine<S>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  let id = id
    .parse::<i32>()
    .map_err(|_| ApiError::unprocessable(format!("invalid job id '{}'", id)))?;
  engine.delete_job_v2(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

fn parse_job_id(text: &str) -> Result<JobId, ApiError> {
  text
    .parse()
    .map_err(|_| ApiError::unprocessable(format!("invalid job id '{}'", text)))
}
