use augur_task::{BridgeRegistry, RegistryError};

use crate::error::JobError;

/// Fail unless every named bridge is registered.
pub async fn ensure_registered<'a, I>(names: I, registry: &dyn BridgeRegistry) -> Result<(), JobError>
where
  I: IntoIterator<Item = &'a str>,
{
  for name in names {
    match registry.find_bridge_url(name).await {
      Ok(_) => {}
      Err(RegistryError::NotFound { name }) => {
        return Err(JobError::invalid(format!("bridge '{}' is not registered", name)));
      }
      Err(e) => return Err(JobError::Registry(e)),
    }
  }
  Ok(())
}
