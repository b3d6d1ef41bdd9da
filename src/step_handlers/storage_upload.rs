//! Uploads every generated file to the configured bucket under its file name.

use super::{matching_files, StepHandler, TaskOutcome, TaskServices};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageUploadHandler {
    /// `output/<basename>*`
    pub pattern: String,
}

impl StorageUploadHandler {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

#[async_trait]
impl StepHandler for StorageUploadHandler {
    async fn handle(&self, services: &TaskServices) -> Result<TaskOutcome> {
        let storage = services.storage()?;
        let bucket = services.config().variables.s3_bucket()?;

        let files = matching_files(&self.pattern)?;
        let mut last_result = false;
        for file in &files {
            let key = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            // each upload overwrites the reported result
            last_result = storage.upload(file, bucket, &key).await?;
            debug!(file = %file.display(), bucket = %bucket, key = %key, "Uploaded");
        }

        info!(
            bucket = %bucket,
            files = files.len(),
            last_result = last_result,
            "☁️ Output files uploaded"
        );
        Ok(TaskOutcome::Uploaded {
            files: files.len(),
            last_result,
        })
    }

    fn handler_name(&self) -> &'static str {
        "upload_to_s3"
    }
}
