use std::fmt;
use std::sync::Arc;

/// Progress reported while pipelines and fetchers run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
  RunStarted { run_id: String },
  TaskFinished { run_id: String, task_id: String, failed: bool },
  RunFinished { run_id: String, failed: bool },
  RunCancelled { run_id: String },
  FetchStarted { stage: String },
  FetchCompleted { stage: String, answer: String },
  FetchFailed { stage: String, error: String },
  TransformApplied { stage: String, transformer: String },
}

/// Receiver of pipeline events.
///
/// Shared across concurrently running stages; events may arrive in any order.
pub trait Notifiee: Send + Sync {
  fn notify(&self, event: &PipelineEvent);
}

/// Optional handle to the notifiee a stage reports to.
#[derive(Clone, Default)]
pub struct NotifieeRef(Option<Arc<dyn Notifiee>>);

impl NotifieeRef {
  pub fn new(notifiee: Arc<dyn Notifiee>) -> Self {
    Self(Some(notifiee))
  }

  pub fn is_attached(&self) -> bool {
    self.0.is_some()
  }

  /// Whether this handle points at `notifiee`.
  pub fn is(&self, notifiee: &Arc<dyn Notifiee>) -> bool {
    self.0.as_ref().is_some_and(|n| Arc::ptr_eq(n, notifiee))
  }

  pub fn notify(&self, event: PipelineEvent) {
    if let Some(notifiee) = &self.0 {
      notifiee.notify(&event);
    }
  }
}

impl fmt::Debug for NotifieeRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_attached() {
      f.write_str("NotifieeRef(attached)")
    } else {
      f.write_str("NotifieeRef(none)")
    }
  }
}

impl PartialEq for NotifieeRef {
  fn eq(&self, other: &Self) -> bool {
    match (&self.0, &other.0) {
      (Some(a), Some(b)) => Arc::ptr_eq(a, b),
      (None, None) => true,
      _ => false,
    }
  }
}
