use std::collections::HashMap;
use std::sync::Arc;

use augur_task::decode::split_collection;
use augur_task::{Task, TaskResult};
use serde_json::Value;

use crate::error::PipelineError;
use crate::graph::Graph;
use crate::notify::{Notifiee, NotifieeRef};

/// A task with its resolved id and inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineTask {
  pub id: String,
  pub inputs: Vec<String>,
  pub task: Task,
}

/// A validated task graph with a single terminal task.
#[derive(Debug, Clone)]
pub struct Pipeline {
  tasks: Vec<PipelineTask>,
  graph: Graph,
  terminal: String,
  notifiee: NotifieeRef,
}

impl Pipeline {
  /// Decode and validate a JSON array of task documents.
  pub fn decode(bytes: &[u8]) -> Result<Self, PipelineError> {
    Self::from_values(split_collection(bytes)?)
  }

  pub fn from_values(documents: Vec<Value>) -> Result<Self, PipelineError> {
    Self::from_tasks(Task::decode_values(documents)?)
  }

  /// Resolve ids and inputs, then validate the graph.
  ///
  /// A task without an `id` is named `task-<index>`. A task without `inputs`
  /// takes the previous task as its only input, so a plain list runs as a
  /// chain; `inputs: []` marks an entry task.
  pub fn from_tasks(tasks: Vec<Task>) -> Result<Self, PipelineError> {
    if tasks.is_empty() {
      return Err(PipelineError::Empty);
    }

    let mut resolved: Vec<PipelineTask> = Vec::with_capacity(tasks.len());
    for (index, task) in tasks.into_iter().enumerate() {
      let id = task
        .base()
        .id
        .clone()
        .unwrap_or_else(|| format!("task-{}", index));
      let inputs = match &task.base().inputs {
        Some(inputs) => inputs.clone(),
        None => resolved.last().map(|prev| vec![prev.id.clone()]).unwrap_or_default(),
      };
      resolved.push(PipelineTask { id, inputs, task });
    }

    let edges: Vec<(String, Vec<String>)> = resolved
      .iter()
      .map(|t| (t.id.clone(), t.inputs.clone()))
      .collect();
    let graph = Graph::new(&edges)?;
    graph.check_acyclic()?;

    let terminal = match graph.terminal_points() {
      [terminal] => terminal.clone(),
      others => return Err(PipelineError::TerminalCount { count: others.len() }),
    };

    Ok(Self {
      tasks: resolved,
      graph,
      terminal,
      notifiee: NotifieeRef::default(),
    })
  }

  /// Report run progress to `notifiee`.
  pub fn with_notifiee(mut self, notifiee: Arc<dyn Notifiee>) -> Self {
    self.notifiee = NotifieeRef::new(notifiee);
    self
  }

  pub fn notifiee(&self) -> &NotifieeRef {
    &self.notifiee
  }

  pub fn tasks(&self) -> &[PipelineTask] {
    &self.tasks
  }

  pub fn get(&self, id: &str) -> Option<&PipelineTask> {
    self.tasks.iter().find(|t| t.id == id)
  }

  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  /// Id of the task whose result is the pipeline's output.
  pub fn terminal(&self) -> &str {
    &self.terminal
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  /// Names of the bridges referenced by bridge tasks.
  pub fn bridge_names(&self) -> Vec<&str> {
    self
      .tasks
      .iter()
      .filter_map(|t| match &t.task {
        Task::Bridge(bridge) => Some(bridge.name.as_str()),
        _ => None,
      })
      .collect()
  }

  /// Tasks not yet completed whose inputs all are, in declaration order.
  pub(crate) fn ready_tasks(&self, completed: &HashMap<String, TaskResult>) -> Vec<&PipelineTask> {
    self
      .tasks
      .iter()
      .filter(|t| !completed.contains_key(&t.id))
      .filter(|t| t.inputs.iter().all(|input| completed.contains_key(input)))
      .collect()
  }
}
