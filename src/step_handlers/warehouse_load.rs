//! Loads generated CSV files into same-named warehouse tables.
//!
//! The CSV list is resolved when the step runs, after the notebook produced it.

use super::{matching_files, StepHandler, TaskOutcome, TaskServices};
use crate::error::Result;
use crate::sql::load_statements;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarehouseLoadHandler {
    /// `output/<basename>*.csv`
    pub pattern: String,
}

impl WarehouseLoadHandler {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

#[async_trait]
impl StepHandler for WarehouseLoadHandler {
    async fn handle(&self, services: &TaskServices) -> Result<TaskOutcome> {
        let variables = &services.config().variables;
        let warehouse = services.warehouse()?;

        let files = matching_files(&self.pattern)?;
        let batch = load_statements(&files, &variables.snowflake_stage);
        warehouse.run_batch(&batch).await?;

        info!(
            stage = %variables.snowflake_stage,
            connection = %variables.snowflake_connection,
            tables = files.len(),
            "🗄️ CSV files loaded into warehouse"
        );
        Ok(TaskOutcome::StatementsExecuted { count: batch.len() })
    }

    fn handler_name(&self) -> &'static str {
        "upload_to_snowflake"
    }
}
