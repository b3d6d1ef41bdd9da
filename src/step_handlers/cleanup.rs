//! Removes the previous run's generated files before the notebook runs again.

use super::{matching_files, StepHandler, TaskOutcome, TaskServices};
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::io::ErrorKind;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupHandler {
    /// `output/<basename>*`
    pub pattern: String,
}

impl CleanupHandler {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

#[async_trait]
impl StepHandler for CleanupHandler {
    async fn handle(&self, _services: &TaskServices) -> Result<TaskOutcome> {
        let mut count = 0;
        for file in matching_files(&self.pattern)? {
            match tokio::fs::remove_file(&file).await {
                Ok(()) => {
                    debug!(file = %file.display(), "Removed generated file");
                    count += 1;
                }
                // gone since we matched it
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(EtlError::io(format!("remove {}", file.display()), e));
                }
            }
        }

        info!(pattern = %self.pattern, removed = count, "🧹 Output folder cleaned");
        Ok(TaskOutcome::FilesRemoved { count })
    }

    fn handler_name(&self) -> &'static str {
        "cleanup"
    }
}
