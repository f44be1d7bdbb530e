use augur_config::FeatureFlags;

use crate::error::JobError;
use crate::v1::{InitiatorType, JobSpec};
use crate::v2::{JobSpecV2, JobType};

const FLUX_MONITOR_DISABLED: &str = "The Flux Monitor feature is disabled by configuration";
const OFFCHAIN_REPORTING_DISABLED: &str = "The Offchain Reporting feature is disabled by configuration";

/// Reject a V1 spec that uses a job kind turned off by configuration.
pub fn require_implemented_v1(spec: &JobSpec, flags: &dyn FeatureFlags) -> Result<(), JobError> {
  if flags.dev() {
    return Ok(());
  }
  if spec.initiators_for(InitiatorType::FluxMonitor).next().is_some() && !flags.feature_flux_monitor() {
    return Err(JobError::NotImplemented(FLUX_MONITOR_DISABLED.to_string()));
  }
  Ok(())
}

/// Reject a V2 spec whose job type is turned off by configuration.
pub fn require_implemented_v2(spec: &JobSpecV2, flags: &dyn FeatureFlags) -> Result<(), JobError> {
  if flags.dev() {
    return Ok(());
  }
  match spec.job_type {
    JobType::FluxMonitor if !flags.feature_flux_monitor() => {
      Err(JobError::NotImplemented(FLUX_MONITOR_DISABLED.to_string()))
    }
    JobType::OffchainReporting if !flags.feature_offchain_reporting() => {
      Err(JobError::NotImplemented(OFFCHAIN_REPORTING_DISABLED.to_string()))
    }
    _ => Ok(()),
  }
}
