//! # Workflow Builder
//!
//! Wires one notebook's pipeline:
//!
//! ```text
//! start -> cleanup -> execute_notebook -> upload_to_s3 -> upload_to_snowflake
//!       -> execute_script_<file>... -> [qa_checks] -> end
//! ```
//!
//! Transformation scripts are discovered here, when the graph is built. The
//! generated files the later stages consume are matched when those stages run.

use super::definition::{DefaultArgs, Operator, TaskNode, WorkflowDefinition};
use crate::config::{EtlConfig, ScheduleTable};
use crate::constants::{task_ids, MAX_ACTIVE_RUNS, WORKFLOW_ID_PREFIX, WORKFLOW_TIMEOUT};
use crate::error::{EtlError, Result};
use crate::logging::log_workflow_operation;
use crate::step_handlers::{
    matching_files, CleanupHandler, NotebookHandler, QualityCheckHandler, SqlScriptHandler,
    StorageUploadHandler, WarehouseLoadHandler,
};
use std::sync::Arc;
use tracing::debug;

/// `etl_<basename>`
pub fn dag_id_for(basename: &str) -> String {
    format!("{WORKFLOW_ID_PREFIX}{basename}")
}

pub struct WorkflowBuilder {
    config: Arc<EtlConfig>,
}

impl WorkflowBuilder {
    pub fn new(config: Arc<EtlConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    pub fn build(
        &self,
        basename: &str,
        schedules: &ScheduleTable,
        default_args: DefaultArgs,
    ) -> Result<WorkflowDefinition> {
        let layout = &self.config.layout;
        let notebook = layout.notebook_file(basename);
        if basename.is_empty() || !notebook.is_file() {
            return Err(EtlError::NotebookNotFound {
                basename: basename.to_string(),
                path: notebook,
            });
        }

        let dag_id = dag_id_for(basename);
        let output_pattern = layout.output_pattern(basename);
        let chain = |id: &str| vec![id.to_string()];

        let mut tasks = vec![
            TaskNode::new(task_ids::START, Vec::new(), Operator::Marker),
            TaskNode::new(
                task_ids::CLEANUP,
                chain(task_ids::START),
                Operator::Cleanup(CleanupHandler::new(output_pattern.clone())),
            ),
            TaskNode::new(
                task_ids::EXECUTE_NOTEBOOK,
                chain(task_ids::CLEANUP),
                Operator::ExecuteNotebook(NotebookHandler::new(notebook)),
            ),
            TaskNode::new(
                task_ids::UPLOAD_TO_STORAGE,
                chain(task_ids::EXECUTE_NOTEBOOK),
                Operator::UploadToStorage(StorageUploadHandler::new(output_pattern)),
            ),
            TaskNode::new(
                task_ids::LOAD_TO_WAREHOUSE,
                chain(task_ids::UPLOAD_TO_STORAGE),
                Operator::LoadToWarehouse(WarehouseLoadHandler::new(layout.csv_pattern(basename))),
            ),
        ];

        let mut fan_in = Vec::new();
        for script in matching_files(&layout.sql_pattern(basename))? {
            let handler = SqlScriptHandler::new(script);
            let task_id = format!("{}{}", task_ids::EXECUTE_SCRIPT_PREFIX, handler.script_name());
            debug!(dag_id = %dag_id, task_id = %task_id, "Attaching transformation script");
            fan_in.push(task_id.clone());
            tasks.push(TaskNode::new(
                task_id,
                chain(task_ids::LOAD_TO_WAREHOUSE),
                Operator::ExecuteSqlScript(handler),
            ));
        }
        if fan_in.is_empty() {
            fan_in.push(task_ids::LOAD_TO_WAREHOUSE.to_string());
        }

        let quality_checks = self.config.quality_checks_enabled(basename);
        if quality_checks {
            tasks.push(TaskNode::new(
                task_ids::QUALITY_CHECK,
                fan_in,
                Operator::QualityCheck(QualityCheckHandler::new(layout.qa_file(basename))),
            ));
            fan_in = chain(task_ids::QUALITY_CHECK);
        }
        tasks.push(TaskNode::new(task_ids::END, fan_in, Operator::Marker));

        let definition = WorkflowDefinition {
            schedule: schedules.schedule_for(basename).map(str::to_string),
            dag_id,
            basename: basename.to_string(),
            max_active_runs: MAX_ACTIVE_RUNS,
            timeout: WORKFLOW_TIMEOUT,
            default_args,
            tasks,
        };

        let details = format!(
            "tasks={} schedule={} quality_checks={}",
            definition.tasks.len(),
            definition.schedule.as_deref().unwrap_or("none"),
            quality_checks
        );
        log_workflow_operation("build", &definition.dag_id, "built", Some(&details));
        Ok(definition)
    }
}
