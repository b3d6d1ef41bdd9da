//! Process-wide variables.
//!
//! Keys keep their conventional upper-case names in the environment (`GIT_USER`,
//! `S3_BUCKET`, ...) and are folded to lower case on load, which is what the field
//! names below match; the variables file uses the lower-case spelling. Warehouse
//! connection profiles live under `connections.<name>`
//! (`CONNECTIONS__SNOWFLAKE__TOKEN` in the environment).

use crate::constants::variables as keys;
use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_snowflake_stage() -> String {
    keys::DEFAULT_SNOWFLAKE_STAGE.to_string()
}

fn default_snowflake_connection() -> String {
    keys::DEFAULT_SNOWFLAKE_CONNECTION.to_string()
}

fn default_aws_region() -> String {
    keys::DEFAULT_AWS_REGION.to_string()
}

fn default_issue_repository() -> String {
    keys::DEFAULT_ISSUE_REPOSITORY.to_string()
}

fn default_papermill_bin() -> String {
    keys::DEFAULT_PAPERMILL_BIN.to_string()
}

fn default_token_type() -> String {
    "OAUTH".to_string()
}

fn default_statement_timeout() -> u64 {
    600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Variables {
    #[serde(default)]
    pub git_user: Option<String>,
    #[serde(default)]
    pub git_token: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub aws_access_key_id: Option<String>,
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,
    #[serde(default = "default_aws_region")]
    pub aws_region: String,
    #[serde(default)]
    pub s3_bucket: Option<String>,
    #[serde(default = "default_snowflake_stage")]
    pub snowflake_stage: String,
    #[serde(default = "default_snowflake_connection")]
    pub snowflake_connection: String,
    /// `<owner>/<repo>` receiving QA issues
    #[serde(default = "default_issue_repository")]
    pub issue_repository: String,
    #[serde(default = "default_papermill_bin")]
    pub papermill_bin: String,
    #[serde(default)]
    pub connections: HashMap<String, ConnectionProfile>,
}

impl Default for Variables {
    fn default() -> Self {
        Self {
            git_user: None,
            git_token: None,
            environment: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: default_aws_region(),
            s3_bucket: None,
            snowflake_stage: default_snowflake_stage(),
            snowflake_connection: default_snowflake_connection(),
            issue_repository: default_issue_repository(),
            papermill_bin: default_papermill_bin(),
            connections: HashMap::new(),
        }
    }
}

/// Snowflake SQL API connection profile
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionProfile {
    /// e.g. `https://myorg-myaccount.snowflakecomputing.com`
    pub account_url: String,
    pub token: String,
    /// `OAUTH` or `KEYPAIR_JWT`
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "default_statement_timeout")]
    pub timeout_seconds: u64,
}

impl Variables {
    /// Both tracker credentials, or nothing
    pub fn git_credentials(&self) -> Option<(&str, &str)> {
        match (self.git_user.as_deref(), self.git_token.as_deref()) {
            (Some(user), Some(token)) => Some((user, token)),
            _ => None,
        }
    }

    pub fn is_ci(&self) -> bool {
        self.environment.as_deref() == Some(keys::CI_ENVIRONMENT)
    }

    pub fn s3_bucket(&self) -> Result<&str> {
        self.s3_bucket
            .as_deref()
            .ok_or_else(|| EtlError::missing_variable(keys::S3_BUCKET))
    }

    pub fn aws_credentials(&self) -> Result<(&str, &str)> {
        let access_key = self
            .aws_access_key_id
            .as_deref()
            .ok_or_else(|| EtlError::missing_variable(keys::AWS_ACCESS_KEY_ID))?;
        let secret_key = self
            .aws_secret_access_key
            .as_deref()
            .ok_or_else(|| EtlError::missing_variable(keys::AWS_SECRET_ACCESS_KEY))?;
        Ok((access_key, secret_key))
    }

    /// Split `issue_repository` into owner and repository name
    pub fn issue_repository(&self) -> Result<(&str, &str)> {
        self.issue_repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .ok_or_else(|| {
                EtlError::configuration(
                    keys::ISSUE_REPOSITORY,
                    format!("expected <owner>/<repo>, got '{}'", self.issue_repository),
                )
            })
    }

    /// Resolve a connection profile; names are matched case-insensitively since
    /// the `config` crate lower-cases keys.
    pub fn connection(&self, name: &str) -> Result<&ConnectionProfile> {
        self.connections
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, profile)| profile)
            .ok_or_else(|| {
                EtlError::configuration(
                    keys::SNOWFLAKE_CONNECTION,
                    format!("connection '{name}' is not configured"),
                )
            })
    }

    /// Variables rendered for logging, secrets masked
    pub fn sanitized(&self) -> serde_json::Value {
        let mut value = serde_json::json!(self);
        sanitize_json_recursive(&mut value, &["token", "secret", "key", "password"]);
        value
    }
}

fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let is_sensitive = sensitive_patterns
                    .iter()
                    .any(|pattern| key_lower.contains(pattern));

                if is_sensitive && !val.is_null() {
                    *val = serde_json::Value::String("[MASKED]".to_string());
                } else {
                    sanitize_json_recursive(val, sensitive_patterns);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                sanitize_json_recursive(item, sensitive_patterns);
            }
        }
        _ => {}
    }
}
