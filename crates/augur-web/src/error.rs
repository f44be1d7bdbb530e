use augur_engine::EngineError;
use augur_job::JobError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error returned by a route, rendered as `{"errors": [{"detail": ...}]}`.
#[derive(Debug, Error)]
#[error("{detail}")]
pub struct ApiError {
  pub status: StatusCode,
  pub detail: String,
}

impl ApiError {
  pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
    Self {
      status,
      detail: detail.into(),
    }
  }

  pub fn bad_request(detail: impl Into<String>) -> Self {
    Self::new(StatusCode::BAD_REQUEST, detail)
  }

  pub fn unprocessable(detail: impl Into<String>) -> Self {
    Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
  }
}

impl From<EngineError> for ApiError {
  fn from(error: EngineError) -> Self {
    let status = match &error {
      EngineError::Job(JobError::Malformed(_) | JobError::Invalid(_)) => StatusCode::BAD_REQUEST,
      EngineError::Job(JobError::NotImplemented(_)) => StatusCode::NOT_IMPLEMENTED,
      EngineError::NotFound(_) => StatusCode::NOT_FOUND,
      EngineError::Job(_)
      | EngineError::Store(_)
      | EngineError::Pipeline(_)
      | EngineError::NoObservationSource(_)
      | EngineError::ExternalInitiator { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
      error!(error = %error, "request failed");
    }
    ApiError::new(status, error.to_string())
  }
}

impl From<JobError> for ApiError {
  fn from(error: JobError) -> Self {
    EngineError::from(error).into()
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = json!({ "errors": [{ "detail": self.detail }] });
    (self.status, Json(body)).into_response()
  }
}
