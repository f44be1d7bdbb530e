use augur_job::{InitiatorParams, InitiatorType, JobId, JobSpec};
use augur_store::Store;
use augur_task::HttpClient;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::EngineError;

/// Header carrying the initiator's outgoing token.
pub const ACCESS_KEY_HEADER: &str = "X-Augur-EI-AccessKey";

/// Header carrying the initiator's outgoing secret.
pub const SECRET_HEADER: &str = "X-Augur-EI-Secret";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobNotice<'a> {
  job_id: JobId,
  #[serde(rename = "type")]
  kind: InitiatorType,
  params: &'a InitiatorParams,
}

/// Post a notice for `job` to every external initiator it names.
///
/// Initiators registered without a URL are skipped. Any other failure,
/// including an unregistered initiator name, stops at the first error.
pub async fn notify_external_initiators<S: Store>(
  job: &JobSpec,
  store: &S,
  http: &HttpClient,
) -> Result<(), EngineError> {
  for initiator in job.initiators_for(InitiatorType::External) {
    let name = initiator.params.name.as_deref().unwrap_or_default();
    let registered = store
      .find_external_initiator(name)
      .await
      .map_err(|e| failed(name, e))?;
    let Some(url) = &registered.url else {
      debug!(initiator = %registered.name, "external initiator has no url");
      continue;
    };

    let notice = JobNotice {
      job_id: job.id,
      kind: InitiatorType::External,
      params: &initiator.params,
    };
    let response = http
      .client(true)
      .post(url.clone())
      .header(ACCESS_KEY_HEADER, &registered.outgoing_token)
      .header(SECRET_HEADER, &registered.outgoing_secret)
      .timeout(http.settings().timeout)
      .json(&notice)
      .send()
      .await
      .map_err(|e| failed(name, e))?;

    let status = response.status();
    if !status.is_success() {
      return Err(failed(&registered.name, format!("{} returned status {}", url, status)));
    }
    info!(initiator = %registered.name, job_id = %job.id, "external initiator notified");
  }
  Ok(())
}

fn failed(name: &str, error: impl ToString) -> EngineError {
  EngineError::ExternalInitiator {
    name: name.to_string(),
    message: error.to_string(),
  }
}
