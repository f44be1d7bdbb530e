use std::fmt;

/// Lifecycle of a job spec.
///
/// `Proposed -> Validated -> Active -> Archived | Deleted`. Archived applies
/// to V1 jobs (soft delete), Deleted to V2 jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
  Proposed,
  Validated,
  Active,
  Archived,
  Deleted,
}

impl JobState {
  pub fn can_transition_to(&self, next: JobState) -> bool {
    matches!(
      (self, next),
      (JobState::Proposed, JobState::Validated)
        | (JobState::Validated, JobState::Active)
        | (JobState::Active, JobState::Archived)
        | (JobState::Active, JobState::Deleted)
    )
  }
}

impl fmt::Display for JobState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      JobState::Proposed => "proposed",
      JobState::Validated => "validated",
      JobState::Active => "active",
      JobState::Archived => "archived",
      JobState::Deleted => "deleted",
    };
    f.write_str(name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_happy_path() {
    let path = [JobState::Proposed, JobState::Validated, JobState::Active, JobState::Archived];
    for pair in path.windows(2) {
      assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
    }
    assert!(JobState::Active.can_transition_to(JobState::Deleted));
  }

  #[test]
  fn test_terminal_states_accept_nothing() {
    for next in [
      JobState::Proposed,
      JobState::Validated,
      JobState::Active,
      JobState::Archived,
      JobState::Deleted,
    ] {
      assert!(!JobState::Archived.can_transition_to(next));
      assert!(!JobState::Deleted.can_transition_to(next));
    }
  }

  #[test]
  fn test_cannot_skip_validation() {
    assert!(!JobState::Proposed.can_transition_to(JobState::Active));
    assert!(!JobState::Validated.can_transition_to(JobState::Archived));
  }
}
