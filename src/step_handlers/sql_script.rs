//! Renders one transformation script with the template parameters and runs it
//! as a single batch.

use super::{StepHandler, TaskOutcome, TaskServices};
use crate::error::Result;
use crate::sql::{split_statements, SqlBatch};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlScriptHandler {
    pub script: PathBuf,
}

impl SqlScriptHandler {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// File name of the script; the task id suffix
    pub fn script_name(&self) -> String {
        self.script
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StepHandler for SqlScriptHandler {
    async fn handle(&self, services: &TaskServices) -> Result<TaskOutcome> {
        let rendered = services.config().template_params.render_file(&self.script)?;
        let batch = SqlBatch::new(split_statements(&rendered)).with_commit();

        services.warehouse()?.run_batch(&batch).await?;

        info!(
            script = %self.script.display(),
            statements = batch.len(),
            "📜 Transformation script executed"
        );
        Ok(TaskOutcome::StatementsExecuted { count: batch.len() })
    }

    fn handler_name(&self) -> &'static str {
        "execute_script"
    }
}
