//! Pipeline runner.
//!
//! The [`Runner`] executes a [`Pipeline`] in waves: every task whose inputs
//! are complete is spawned, the wave is joined, and the loop repeats until
//! nothing is ready. A failed task does not stop the run; its failure flows
//! to downstream tasks as an input result.

use std::collections::HashMap;

use augur_task::{TaskContext, TaskResult};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::PipelineError;
use crate::notify::PipelineEvent;
use crate::pipeline::Pipeline;

/// Handle for a spawned task.
type TaskHandle = tokio::task::JoinHandle<(String, TaskResult)>;

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
  pub run_id: String,
  /// Result of every task, keyed by task id.
  pub results: HashMap<String, TaskResult>,
  /// Result of the terminal task.
  pub output: TaskResult,
}

/// Runs pipelines against a task context.
#[derive(Debug, Clone)]
pub struct Runner {
  ctx: TaskContext,
}

impl Runner {
  pub fn new(ctx: TaskContext) -> Self {
    Self { ctx }
  }

  pub fn context(&self) -> &TaskContext {
    &self.ctx
  }

  /// Run the pipeline once.
  #[instrument(name = "pipeline_run", skip_all, fields(tasks = pipeline.len()))]
  pub async fn run(&self, pipeline: &Pipeline) -> Result<PipelineRun, PipelineError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let notifiee = pipeline.notifiee();

    info!(run_id = %run_id, terminal = %pipeline.terminal(), "pipeline_started");
    notifiee.notify(PipelineEvent::RunStarted {
      run_id: run_id.clone(),
    });

    let mut completed = HashMap::new();
    let result = self.run_loop(pipeline, &mut completed, &run_id).await;

    match result {
      Ok(()) => {
        let output = completed.get(pipeline.terminal()).cloned().ok_or_else(|| {
          PipelineError::Join(format!("terminal task '{}' did not run", pipeline.terminal()))
        })?;
        let failed = output.is_error();
        info!(run_id = %run_id, failed, "pipeline_completed");
        notifiee.notify(PipelineEvent::RunFinished {
          run_id: run_id.clone(),
          failed,
        });
        Ok(PipelineRun {
          run_id,
          results: completed,
          output,
        })
      }
      Err(PipelineError::Cancelled) => {
        notifiee.notify(PipelineEvent::RunCancelled { run_id });
        Err(PipelineError::Cancelled)
      }
      Err(e) => {
        error!(run_id = %run_id, error = %e, "pipeline_failed");
        Err(e)
      }
    }
  }

  async fn run_loop(
    &self,
    pipeline: &Pipeline,
    completed: &mut HashMap<String, TaskResult>,
    run_id: &str,
  ) -> Result<(), PipelineError> {
    let cancel: &CancellationToken = self.ctx.cancel_token();
    loop {
      if cancel.is_cancelled() {
        warn!(run_id = %run_id, "pipeline cancelled");
        return Err(PipelineError::Cancelled);
      }

      let handles = self.spawn_ready(pipeline, completed);
      if handles.is_empty() {
        break;
      }

      let results = tokio::select! {
        results = futures::future::join_all(handles) => results,
        _ = cancel.cancelled() => {
          warn!(run_id = %run_id, "pipeline cancelled during task execution");
          return Err(PipelineError::Cancelled);
        }
      };

      for joined in results {
        let (task_id, result) = joined.map_err(|e| PipelineError::Join(e.to_string()))?;
        let result = match result {
          TaskResult::Error(failure) => {
            warn!(run_id = %run_id, task_id = %task_id, error = %failure, "task_failed");
            TaskResult::Error(failure.with_context(format!("task '{}'", task_id)))
          }
          value => {
            info!(run_id = %run_id, task_id = %task_id, "task_completed");
            value
          }
        };
        pipeline.notifiee().notify(PipelineEvent::TaskFinished {
          run_id: run_id.to_string(),
          task_id: task_id.clone(),
          failed: result.is_error(),
        });
        completed.insert(task_id, result);
      }
    }
    Ok(())
  }

  /// Spawn every ready task with the results of its inputs, in input order.
  fn spawn_ready(
    &self,
    pipeline: &Pipeline,
    completed: &HashMap<String, TaskResult>,
  ) -> Vec<TaskHandle> {
    pipeline
      .ready_tasks(completed)
      .into_iter()
      .map(|ready| {
        let inputs: Vec<TaskResult> = ready
          .inputs
          .iter()
          .filter_map(|id| completed.get(id).cloned())
          .collect();
        let task_id = ready.id.clone();
        let task = ready.task.clone();
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
          let result = task.run(&inputs, &ctx).await;
          (task_id, result)
        })
      })
      .collect()
  }
}
