use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TaskError;
use crate::result::TaskResult;
use crate::task::{BaseTask, check_cardinality};
use crate::types::TaskType;

/// Median of the numeric inputs that succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedianTask {
  #[serde(flatten)]
  pub base: BaseTask,

  /// Successful numeric answers required before a median is produced.
  #[serde(default = "default_min_answers")]
  pub min_answers: usize,
}

fn default_min_answers() -> usize {
  1
}

impl Default for MedianTask {
  fn default() -> Self {
    Self {
      base: BaseTask::default(),
      min_answers: default_min_answers(),
    }
  }
}

impl MedianTask {
  pub fn run(&self, inputs: &[TaskResult]) -> TaskResult {
    if let Err(e) = check_cardinality(TaskType::Median, inputs) {
      return TaskResult::error(e);
    }

    let mut answers = Vec::with_capacity(inputs.len());
    for input in inputs {
      match input {
        TaskResult::Value(value) => match value.as_decimal() {
          Ok(answer) => answers.push(answer),
          Err(e) => debug!(error = %e, "median skipping non-numeric input"),
        },
        TaskResult::Error(failure) => debug!(error = %failure, "median skipping failed input"),
      }
    }

    match median_of(answers, self.min_answers) {
      Ok(median) => TaskResult::value(median),
      Err(e) => TaskResult::error(e),
    }
  }
}

/// Median of `answers`, requiring at least `min_answers` of them (and never
/// fewer than one). Even counts average the two central values exactly.
pub fn median_of(
  mut answers: Vec<BigDecimal>,
  min_answers: usize,
) -> Result<BigDecimal, TaskError> {
  let required = min_answers.max(1);
  if answers.len() < required {
    return Err(TaskError::InsufficientAnswers {
      received: answers.len(),
      required,
    });
  }

  answers.sort();
  let mid = answers.len() / 2;
  if answers.len() % 2 == 1 {
    return Ok(answers.swap_remove(mid));
  }
  Ok((&answers[mid - 1] + &answers[mid]).half())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::result::TaskValue;
  use std::str::FromStr;

  fn values(answers: &[&str]) -> Vec<TaskResult> {
    answers
      .iter()
      .map(|a| TaskResult::value(TaskValue::Bytes(a.as_bytes().to_vec())))
      .collect()
  }

  fn decimal(text: &str) -> BigDecimal {
    BigDecimal::from_str(text).unwrap()
  }

  #[test]
  fn test_odd_count() {
    let result = MedianTask::default().run(&values(&["30", "10", "20"]));
    assert_eq!(result.as_value().unwrap().as_decimal().unwrap(), decimal("20"));
  }

  #[test]
  fn test_even_count_averages() {
    let result = MedianTask::default().run(&values(&["10", "40", "20", "30"]));
    assert_eq!(result.as_value().unwrap().as_decimal().unwrap(), decimal("25"));
  }

  #[test]
  fn test_exact_eighteen_decimals() {
    let result = MedianTask::default().run(&values(&[
      "0.100000000000000001",
      "0.100000000000000002",
    ]));
    assert_eq!(
      result.as_value().unwrap().as_decimal().unwrap(),
      decimal("0.1000000000000000015")
    );
  }

  #[test]
  fn test_thirty_digit_answers_are_kept() {
    let result = MedianTask::default().run(&values(&["123456789012.123456789012345678", "10", "20"]));
    assert_eq!(result.as_value().unwrap().as_decimal().unwrap(), decimal("20"));

    let result = MedianTask::default().run(&values(&[
      "123456789012.123456789012345678",
      "123456789012.123456789012345679",
    ]));
    assert_eq!(
      result.as_value().unwrap().as_decimal().unwrap(),
      decimal("123456789012.1234567890123456785")
    );
  }

  #[test]
  fn test_failed_inputs_are_excluded() {
    let mut inputs = values(&["10", "not a number", "30"]);
    inputs.push(TaskResult::error(TaskError::Cancelled));

    let result = MedianTask::default().run(&inputs);
    assert_eq!(result.as_value().unwrap().as_decimal().unwrap(), decimal("20"));
  }

  #[test]
  fn test_insufficient_answers() {
    let task = MedianTask {
      min_answers: 3,
      ..Default::default()
    };
    let mut inputs = values(&["1", "2"]);
    inputs.push(TaskResult::error(TaskError::Cancelled));

    let result = task.run(&inputs);
    match result.as_error().map(|f| f.error()) {
      Some(TaskError::InsufficientAnswers { received, required }) => {
        assert_eq!((*received, *required), (2, 3));
      }
      other => panic!("expected insufficient answers, got {:?}", other),
    }
  }

  #[test]
  fn test_no_inputs() {
    let result = MedianTask::default().run(&[]);
    assert!(matches!(
      result.as_error().map(|f| f.error()),
      Some(TaskError::WrongInputCardinality { .. })
    ));
  }
}
