/// Feature switches consulted before a job kind may be created.
///
/// `dev` is a global override: when it is set every gated job kind is
/// available regardless of its individual flag.
pub trait FeatureFlags: Send + Sync {
  /// Development mode.
  fn dev(&self) -> bool;

  /// Flux monitor jobs (V1 `fluxmonitor` initiators and V2 `fluxmonitor` jobs).
  fn feature_flux_monitor(&self) -> bool;

  /// Offchain reporting V2 jobs.
  fn feature_offchain_reporting(&self) -> bool;
}
