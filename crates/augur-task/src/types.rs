use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminator of a pipeline task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
  Http,
  Bridge,
  Median,
  JsonParse,
  Multiply,
}

impl TaskType {
  /// Every registered task type.
  pub const ALL: [TaskType; 5] = [
    TaskType::Http,
    TaskType::Bridge,
    TaskType::Median,
    TaskType::JsonParse,
    TaskType::Multiply,
  ];

  /// Wire name used in the `type` field.
  pub fn as_str(&self) -> &'static str {
    match self {
      TaskType::Http => "http",
      TaskType::Bridge => "bridge",
      TaskType::Median => "median",
      TaskType::JsonParse => "jsonparse",
      TaskType::Multiply => "multiply",
    }
  }

  /// Look up a task type by its exact wire name.
  pub fn from_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|t| t.as_str() == name)
  }

  /// Number of inputs this task type accepts.
  pub fn cardinality(&self) -> Cardinality {
    match self {
      TaskType::Http => Cardinality::AtMost(1),
      TaskType::Bridge => Cardinality::Exactly(0),
      TaskType::Median => Cardinality::AtLeast(1),
      TaskType::JsonParse | TaskType::Multiply => Cardinality::Exactly(1),
    }
  }
}

impl fmt::Display for TaskType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Accepted number of inputs for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
  Exactly(usize),
  AtLeast(usize),
  AtMost(usize),
}

impl Cardinality {
  pub fn accepts(&self, count: usize) -> bool {
    match *self {
      Cardinality::Exactly(n) => count == n,
      Cardinality::AtLeast(n) => count >= n,
      Cardinality::AtMost(n) => count <= n,
    }
  }
}

impl fmt::Display for Cardinality {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Cardinality::Exactly(n) => write!(f, "exactly {} input(s)", n),
      Cardinality::AtLeast(n) => write!(f, "at least {} input(s)", n),
      Cardinality::AtMost(n) => write!(f, "at most {} input(s)", n),
    }
  }
}
