use std::collections::HashMap;

use crate::error::PipelineError;

/// Dependency graph of a pipeline, keyed by task id.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: task_id -> downstream task_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: task_id -> upstream task_ids, in declared order.
  reverse_adjacency: HashMap<String, Vec<String>>,
  /// Tasks with no inputs.
  entry_points: Vec<String>,
  /// Tasks nothing depends on.
  terminal_points: Vec<String>,
}

impl Graph {
  /// Build a graph from `(task_id, inputs)` pairs, keeping declaration order.
  ///
  /// Fails on duplicate ids and on inputs that name no task.
  pub fn new(tasks: &[(String, Vec<String>)]) -> Result<Self, PipelineError> {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for (id, _) in tasks {
      if adjacency.insert(id.clone(), Vec::new()).is_some() {
        return Err(PipelineError::DuplicateTaskId { id: id.clone() });
      }
    }

    for (id, inputs) in tasks {
      for input in inputs {
        let Some(downstream) = adjacency.get_mut(input) else {
          return Err(PipelineError::UnknownInput {
            task: id.clone(),
            input: input.clone(),
          });
        };
        downstream.push(id.clone());
      }
      reverse_adjacency.insert(id.clone(), inputs.clone());
    }

    let entry_points = tasks
      .iter()
      .filter(|(_, inputs)| inputs.is_empty())
      .map(|(id, _)| id.clone())
      .collect();
    let terminal_points = tasks
      .iter()
      .filter(|(id, _)| adjacency.get(id).is_none_or(|v| v.is_empty()))
      .map(|(id, _)| id.clone())
      .collect();

    Ok(Self {
      adjacency,
      reverse_adjacency,
      entry_points,
      terminal_points,
    })
  }

  /// Tasks with no inputs.
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  /// Tasks whose results feed nothing.
  pub fn terminal_points(&self) -> &[String] {
    &self.terminal_points
  }

  pub fn downstream(&self, task_id: &str) -> &[String] {
    self
      .adjacency
      .get(task_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  pub fn upstream(&self, task_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(task_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Fail if the graph has a cycle.
  pub fn check_acyclic(&self) -> Result<(), PipelineError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
      Unvisited,
      InProgress,
      Done,
    }

    fn visit<'a>(node: &'a str, graph: &'a Graph, marks: &mut HashMap<&'a str, Mark>) -> bool {
      marks.insert(node, Mark::InProgress);
      for neighbor in graph.downstream(node) {
        match marks.get(neighbor.as_str()) {
          Some(Mark::InProgress) => return true,
          Some(Mark::Unvisited) => {
            if visit(neighbor, graph, marks) {
              return true;
            }
          }
          _ => {}
        }
      }
      marks.insert(node, Mark::Done);
      false
    }

    let mut marks: HashMap<&str, Mark> = self
      .adjacency
      .keys()
      .map(|id| (id.as_str(), Mark::Unvisited))
      .collect();
    for id in self.adjacency.keys() {
      if marks.get(id.as_str()) == Some(&Mark::Unvisited) && visit(id, self, &mut marks) {
        return Err(PipelineError::CycleDetected);
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn edges(spec: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
    spec
      .iter()
      .map(|(id, inputs)| (id.to_string(), inputs.iter().map(|s| s.to_string()).collect()))
      .collect()
  }

  #[test]
  fn test_diamond() {
    let graph = Graph::new(&edges(&[
      ("a", &[]),
      ("b", &[]),
      ("median", &["a", "b"]),
      ("scale", &["median"]),
    ]))
    .unwrap();

    assert_eq!(graph.entry_points(), ["a", "b"]);
    assert_eq!(graph.terminal_points(), ["scale"]);
    assert_eq!(graph.upstream("median"), ["a", "b"]);
    assert_eq!(graph.downstream("a"), ["median"]);
    assert!(graph.check_acyclic().is_ok());
  }

  #[test]
  fn test_duplicate_id() {
    let result = Graph::new(&edges(&[("a", &[]), ("a", &[])]));
    assert!(matches!(result, Err(PipelineError::DuplicateTaskId { id }) if id == "a"));
  }

  #[test]
  fn test_unknown_input() {
    let result = Graph::new(&edges(&[("a", &["ghost"])]));
    assert!(matches!(
      result,
      Err(PipelineError::UnknownInput { task, input }) if task == "a" && input == "ghost"
    ));
  }

  #[test]
  fn test_cycle() {
    let graph = Graph::new(&edges(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"])])).unwrap();
    assert!(matches!(graph.check_acyclic(), Err(PipelineError::CycleDetected)));
  }
}
