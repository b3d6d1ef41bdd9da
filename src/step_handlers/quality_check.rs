//! # Quality Checks
//!
//! Runs the workflow's QA script against the warehouse. Every returned row is a
//! failed check and becomes one issue in the tracker. Filing is best-effort: a
//! rejected or unreachable tracker is logged and the task still succeeds.

use super::{StepHandler, TaskOutcome, TaskServices};
use crate::client::{IssueOutcome, Row};
use crate::constants::quality;
use crate::error::{EtlError, Result};
use crate::sql::split_quality_queries;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// One failing row returned by a QA query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaFailure {
    pub table_name: String,
    pub error_desc: String,
    pub error_count: String,
    pub error_condition: String,
}

impl QaFailure {
    /// All four columns are required
    pub fn from_row(row: &Row) -> Result<Self> {
        let column = |name: &str| {
            row.get_text(name).ok_or_else(|| {
                EtlError::warehouse("qa_checks", format!("QA result row has no {name} column"))
            })
        };

        Ok(Self {
            table_name: column(quality::TABLE_NAME_COLUMN)?,
            error_desc: column(quality::ERROR_DESC_COLUMN)?,
            error_count: column(quality::ERROR_COUNT_COLUMN)?,
            error_condition: column(quality::ERROR_CONDITION_COLUMN)?,
        })
    }

    pub fn issue_title(&self) -> String {
        format!("{}{}", quality::ISSUE_TITLE_PREFIX, self.table_name)
    }

    pub fn issue_body(&self) -> String {
        format!(
            "Error: {}\nError Count: {}\n{}",
            self.error_desc, self.error_count, self.error_condition
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityCheckHandler {
    pub qa_file: PathBuf,
}

impl QualityCheckHandler {
    pub fn new(qa_file: impl Into<PathBuf>) -> Self {
        Self {
            qa_file: qa_file.into(),
        }
    }
}

#[async_trait]
impl StepHandler for QualityCheckHandler {
    async fn handle(&self, services: &TaskServices) -> Result<TaskOutcome> {
        let script = tokio::fs::read_to_string(&self.qa_file)
            .await
            .map_err(|e| EtlError::io(format!("read {}", self.qa_file.display()), e))?;
        let warehouse = services.warehouse()?;
        let tracker = services.issue_tracker()?;

        let mut failures = 0;
        let mut issues_filed = 0;
        for query in split_quality_queries(&script) {
            for row in warehouse.query(&query).await? {
                let failure = QaFailure::from_row(&row)?;
                failures += 1;
                warn!(
                    table = %failure.table_name,
                    error = %failure.error_desc,
                    count = %failure.error_count,
                    "🔍 QA check failed"
                );

                match tracker
                    .file_issue(&failure.issue_title(), &failure.issue_body(), &quality::ISSUE_LABELS)
                    .await
                {
                    IssueOutcome::Created => issues_filed += 1,
                    outcome => {
                        warn!(table = %failure.table_name, ?outcome, "QA issue was not filed");
                    }
                }
            }
        }

        info!(
            qa_file = %self.qa_file.display(),
            failures = failures,
            issues_filed = issues_filed,
            "✅ Quality checks complete"
        );
        Ok(TaskOutcome::QualityChecked {
            failures,
            issues_filed,
        })
    }

    fn handler_name(&self) -> &'static str {
        "qa_checks"
    }
}
