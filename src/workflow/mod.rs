//! # Workflows
//!
//! Declarative task graphs, one per notebook, and the single-task runner the
//! host calls into.

pub mod builder;
pub mod definition;
pub mod discovery;

pub use builder::{dag_id_for, WorkflowBuilder};
pub use definition::{DefaultArgs, Operator, TaskNode, WorkflowDefinition};
pub use discovery::{discover_workflows, notebook_basenames, refresh_registry, RefreshSummary};

use crate::error::{EtlError, Result};
use crate::step_handlers::{TaskOutcome, TaskServices};

/// Run one task of `definition`, bounded by the workflow timeout.
///
/// Upstream tasks are not run.
pub async fn run_task(
    definition: &WorkflowDefinition,
    task_id: &str,
    services: &TaskServices,
) -> Result<TaskOutcome> {
    let task = definition
        .task(task_id)
        .ok_or_else(|| EtlError::UnknownTask {
            dag_id: definition.dag_id.clone(),
            task_id: task_id.to_string(),
        })?;

    tokio::time::timeout(definition.timeout, task.run(&definition.dag_id, services))
        .await
        .map_err(|_| EtlError::Timeout {
            task_id: task_id.to_string(),
            timeout: definition.timeout,
        })?
}
