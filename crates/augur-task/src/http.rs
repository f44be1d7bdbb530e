use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::context::TaskContext;
use crate::error::TaskError;
use crate::network::{RestrictedAddress, check_literal, restriction_of};
use crate::result::{TaskResult, TaskValue};
use crate::task::{BaseTask, check_cardinality};
use crate::types::TaskType;

/// Request payload object sent as the JSON body.
pub type RequestData = Map<String, Value>;

/// Fetch a URL and return the raw response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpTask {
  #[serde(flatten)]
  pub base: BaseTask,

  #[serde(default = "default_method")]
  pub method: String,

  pub url: Url,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub request_data: Option<RequestData>,

  /// Permit loopback and private targets for this task.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub allow_unrestricted_network_access: bool,
}

fn default_method() -> String {
  "GET".to_string()
}

impl HttpTask {
  pub fn new(method: &str, url: Url) -> Self {
    Self {
      base: BaseTask::default(),
      method: method.to_string(),
      url,
      request_data: None,
      allow_unrestricted_network_access: false,
    }
  }

  /// Run the task. A single upstream value becomes the body when no
  /// `requestData` is configured.
  pub async fn run(&self, inputs: &[TaskResult], ctx: &TaskContext) -> TaskResult {
    if let Err(e) = check_cardinality(TaskType::Http, inputs) {
      return TaskResult::error(e);
    }
    let upstream = match inputs.first() {
      Some(TaskResult::Error(failure)) => {
        return TaskResult::Error(failure.clone().with_context("http task input"));
      }
      Some(TaskResult::Value(value)) => Some(value),
      None => None,
    };
    let body = match (&self.request_data, upstream) {
      (Some(data), _) => Some(Value::Object(data.clone())),
      (None, Some(value)) => Some(value.to_json()),
      (None, None) => None,
    };

    match self.fetch(body, ctx).await {
      Ok(bytes) => TaskResult::value(TaskValue::Bytes(bytes)),
      Err(e) => TaskResult::error(e),
    }
  }

  async fn fetch(&self, body: Option<Value>, ctx: &TaskContext) -> Result<Vec<u8>, TaskError> {
    let method = parse_method(&self.method)?;
    let http = ctx.http();
    let settings = http.settings();
    if self.url.host().is_none() {
      return Err(TaskError::InvalidUrl {
        url: self.url.to_string(),
        message: "missing host".to_string(),
      });
    }
    if !(self.allow_unrestricted_network_access || settings.allow_unrestricted_network_access) {
      check_literal(&self.url, http.address_filter()).map_err(refused)?;
    }

    let limit = settings.max_response_bytes;
    let request = async {
      let mut request = http
        .client(self.allow_unrestricted_network_access)
        .request(method.clone(), self.url.clone());
      if let Some(body) = &body {
        request = request.json(body);
      }
      let response = request.send().await.map_err(|e| {
        let address = restriction_of(&e).cloned();
        match address {
          Some(address) => refused(address),
          None => TaskError::Http(e),
        }
      })?;
      let status = response.status();
      let bytes = read_limited(response, limit).await?;
      if !status.is_success() {
        return Err(TaskError::BadStatus {
          url: self.url.to_string(),
          status: status.as_u16(),
          body: String::from_utf8_lossy(&bytes).into_owned(),
        });
      }
      Ok(bytes)
    };

    debug!(method = %method, url = %self.url, "http fetch");
    let timeout = settings.timeout;
    tokio::select! {
      _ = ctx.cancel_token().cancelled() => Err(TaskError::Cancelled),
      result = tokio::time::timeout(timeout, request) => match result {
        Ok(result) => result,
        Err(_) => Err(TaskError::Timeout {
          timeout_ms: timeout.as_millis() as u64,
        }),
      },
    }
  }
}

async fn read_limited(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>, TaskError> {
  if response.content_length().is_some_and(|len| len > limit as u64) {
    return Err(TaskError::ResponseTooLarge { limit });
  }
  let mut body = Vec::new();
  while let Some(chunk) = response.chunk().await? {
    if body.len() + chunk.len() > limit {
      return Err(TaskError::ResponseTooLarge { limit });
    }
    body.extend_from_slice(&chunk);
  }
  Ok(body)
}

fn refused(address: RestrictedAddress) -> TaskError {
  debug!(host = %address.host, ip = %address.ip, "restricted address refused");
  TaskError::RestrictedNetworkAccess { host: address.host }
}

pub(crate) fn parse_method(method: &str) -> Result<Method, TaskError> {
  match method.to_uppercase().as_str() {
    "GET" => Ok(Method::GET),
    "POST" => Ok(Method::POST),
    "PUT" => Ok(Method::PUT),
    "DELETE" => Ok(Method::DELETE),
    "PATCH" => Ok(Method::PATCH),
    "HEAD" => Ok(Method::HEAD),
    "OPTIONS" => Ok(Method::OPTIONS),
    _ => Err(TaskError::InvalidMethod(method.to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_method() {
    assert_eq!(parse_method("post").unwrap(), Method::POST);
    assert!(matches!(parse_method("BREW"), Err(TaskError::InvalidMethod(_))));
  }

  #[test]
  fn test_decode_defaults() {
    let task: HttpTask = serde_json::from_str(r#"{"url": "https://example.com/price"}"#).unwrap();
    assert_eq!(task.method, "GET");
    assert!(task.request_data.is_none());
    assert!(!task.allow_unrestricted_network_access);
  }
}
