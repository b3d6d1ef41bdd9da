//! S3 object storage backed by `aws-sdk-s3`.

use super::traits::ObjectStorage;
use crate::config::Variables;
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::path::Path;
use tracing::debug;

/// Provider name recorded on the static credentials
const CREDENTIALS_PROVIDER: &str = "etl-variables";

pub struct S3ObjectStorage {
    client: S3Client,
}

impl S3ObjectStorage {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Build a client from the `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
    /// variables; missing keys are an error
    pub async fn from_variables(variables: &Variables) -> Result<Self> {
        let (access_key, secret_key) = variables.aws_credentials()?;
        let credentials = Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(variables.aws_region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        Ok(Self::new(S3Client::new(&config)))
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn upload(&self, local_path: &Path, bucket: &str, remote_key: &str) -> Result<bool> {
        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            EtlError::storage(
                "read",
                format!("failed to read {}: {e}", local_path.display()),
            )
        })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(remote_key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                EtlError::storage(
                    "put_object",
                    format!("s3://{bucket}/{remote_key}: {}", aws_sdk_s3::error::DisplayErrorContext(&e)),
                )
            })?;

        debug!(bucket = %bucket, key = %remote_key, "Object uploaded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_variables_requires_credentials() {
        let err = S3ObjectStorage::from_variables(&Variables::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, EtlError::MissingVariable { .. }));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_storage_error() {
        let variables = Variables {
            aws_access_key_id: Some("AKIDEXAMPLE".to_string()),
            aws_secret_access_key: Some("secret".to_string()),
            ..Variables::default()
        };
        let storage = S3ObjectStorage::from_variables(&variables).await.unwrap();
        let err = storage
            .upload(Path::new("/nonexistent/file.csv"), "bucket", "file.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::Storage { operation, .. } if operation == "read"));
    }
}
