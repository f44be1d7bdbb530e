use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::context::TaskContext;
use crate::http::{HttpTask, RequestData};
use crate::result::TaskResult;
use crate::task::{BaseTask, check_cardinality};
use crate::types::TaskType;

/// Call a named external adapter.
///
/// The bridge name is resolved through the context's registry and the
/// request is delegated to an [`HttpTask`] that POSTs `requestData` plus a
/// freshly generated `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeTask {
  #[serde(flatten)]
  pub base: BaseTask,

  pub name: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub request_data: Option<RequestData>,
}

impl BridgeTask {
  pub fn new(name: &str) -> Self {
    Self {
      base: BaseTask::default(),
      name: name.to_string(),
      request_data: None,
    }
  }

  pub async fn run(&self, inputs: &[TaskResult], ctx: &TaskContext) -> TaskResult {
    if let Err(e) = check_cardinality(TaskType::Bridge, inputs) {
      return TaskResult::error(e);
    }

    let url = match ctx.bridges().find_bridge_url(&self.name).await {
      Ok(url) => url,
      Err(e) => return TaskResult::error(e.into()),
    };

    let http = HttpTask {
      base: self.base.clone(),
      method: "POST".to_string(),
      url: url.clone(),
      request_data: Some(self.request_body()),
      allow_unrestricted_network_access: true,
    };
    let result = http.run(inputs, ctx).await;

    match &result {
      TaskResult::Value(answer) => {
        debug!(bridge = %self.name, url = %url, answer = %answer, "bridge answered")
      }
      TaskResult::Error(failure) => {
        debug!(bridge = %self.name, url = %url, error = %failure, "bridge failed")
      }
    }
    result
  }

  /// The configured request data with a new request id. Never mutates the
  /// task, so every run gets its own id.
  pub fn request_body(&self) -> RequestData {
    let mut body = self.request_data.clone().unwrap_or_default();
    body.insert(
      "id".to_string(),
      Value::String(Uuid::new_v4().simple().to_string()),
    );
    body
  }
}
