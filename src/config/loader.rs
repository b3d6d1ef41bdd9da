//! Configuration Loader
//!
//! Builds the [`EtlConfig`] once at process start: variables from an optional
//! TOML file overlaid with the process environment, then the schedule table and
//! the template parameters from the layout root. Any failure here is fatal.

use super::{EtlConfig, FolderLayout, ScheduleTable, TemplateParams, Variables};
use crate::constants::variables as keys;
use crate::error::{EtlError, Result};
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Variable names picked up from the process environment
const ENVIRONMENT_KEYS: [&str; 11] = [
    keys::GIT_USER,
    keys::GIT_TOKEN,
    keys::ENVIRONMENT,
    keys::AWS_ACCESS_KEY_ID,
    keys::AWS_SECRET_ACCESS_KEY,
    keys::AWS_REGION,
    keys::S3_BUCKET,
    keys::SNOWFLAKE_STAGE,
    keys::SNOWFLAKE_CONNECTION,
    keys::ISSUE_REPOSITORY,
    keys::PAPERMILL_BIN,
];

/// Environment prefix for nested connection profiles
const CONNECTIONS_PREFIX: &str = "CONNECTIONS__";

pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration for a layout root, reading variables from the process
    /// environment
    pub fn load(root: impl Into<PathBuf>, variables_file: Option<&Path>) -> Result<Arc<EtlConfig>> {
        Self::load_with_environment(root, variables_file, std::env::vars().collect())
    }

    /// Load configuration with an explicit environment map.
    /// This is useful for testing without modifying global environment variables
    pub fn load_with_environment(
        root: impl Into<PathBuf>,
        variables_file: Option<&Path>,
        environment: HashMap<String, String>,
    ) -> Result<Arc<EtlConfig>> {
        let layout = FolderLayout::from_root(root);

        debug!(
            root = %layout.root.display(),
            variables_file = ?variables_file,
            "Loading ETL configuration"
        );

        let variables = Self::load_variables(variables_file, environment)?;
        let schedules = ScheduleTable::load(&layout.schedules_file)?;
        let template_params = TemplateParams::load(&layout.template_params_file)?;

        debug!(
            variables = %variables.sanitized(),
            "Variables resolved"
        );
        info!(
            root = %layout.root.display(),
            scheduled_notebooks = schedules.len(),
            template_params = template_params.len(),
            environment = variables.environment.as_deref().unwrap_or("unset"),
            "✅ ETL configuration loaded"
        );

        Ok(Arc::new(EtlConfig::new(
            layout,
            variables,
            schedules,
            template_params,
        )))
    }

    /// Layer the optional variables file under the filtered environment
    pub fn load_variables(
        variables_file: Option<&Path>,
        environment: HashMap<String, String>,
    ) -> Result<Variables> {
        let mut builder = Config::builder();

        if let Some(path) = variables_file {
            if !path.is_file() {
                return Err(EtlError::configuration(
                    "variables",
                    format!("variables file not found: {}", path.display()),
                ));
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        // Keys are folded to lower case so they line up with the file's keys
        let filtered: HashMap<String, String> = environment
            .into_iter()
            .filter(|(key, _)| {
                ENVIRONMENT_KEYS.contains(&key.as_str()) || key.starts_with(CONNECTIONS_PREFIX)
            })
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();

        builder = builder.add_source(
            Environment::default()
                .separator("__")
                .try_parsing(false)
                .source(Some(filtered)),
        );

        let variables: Variables = builder.build()?.try_deserialize()?;
        Ok(variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_layout(root: &Path) {
        fs::create_dir_all(root.join("snowflake/sql")).unwrap();
        fs::write(
            root.join("refresh_schedules.json"),
            r#"{"recurring": {"JHU_COVID-19": "@hourly"}}"#,
        )
        .unwrap();
        fs::write(
            root.join("snowflake/sql/template_params.json"),
            r#"{"database": "COVID19"}"#,
        )
        .unwrap();
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_from_environment() {
        let dir = tempfile::tempdir().unwrap();
        write_layout(dir.path());

        let config = ConfigManager::load_with_environment(
            dir.path(),
            None,
            env(&[
                ("GIT_USER", "qa-bot"),
                ("GIT_TOKEN", "t0ken"),
                ("S3_BUCKET", "covid-output"),
                ("PATH", "/usr/bin"),
            ]),
        )
        .unwrap();

        assert_eq!(config.variables.git_credentials(), Some(("qa-bot", "t0ken")));
        assert_eq!(config.variables.s3_bucket().unwrap(), "covid-output");
        assert_eq!(config.variables.snowflake_stage, "COVID_PROD");
        assert_eq!(config.schedules.schedule_for("JHU_COVID-19"), Some("@hourly"));
        assert_eq!(
            config.template_params.get("database"),
            Some(&serde_json::json!("COVID19"))
        );
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        write_layout(dir.path());
        let file = dir.path().join("variables.toml");
        fs::write(
            &file,
            r#"
s3_bucket = "from-file"
snowflake_stage = "COVID_DEV"

[connections.snowflake]
account_url = "https://acme.snowflakecomputing.com"
token = "file-token"
"#,
        )
        .unwrap();

        let variables = ConfigManager::load_variables(
            Some(&file),
            env(&[
                ("S3_BUCKET", "from-env"),
                ("CONNECTIONS__SNOWFLAKE__ROLE", "LOADER"),
            ]),
        )
        .unwrap();

        assert_eq!(variables.s3_bucket().unwrap(), "from-env");
        assert_eq!(variables.snowflake_stage, "COVID_DEV");
        let profile = variables.connection("SNOWFLAKE").unwrap();
        assert_eq!(profile.token, "file-token");
        assert_eq!(profile.role.as_deref(), Some("LOADER"));
    }

    #[test]
    fn test_missing_schedule_file_aborts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("snowflake/sql")).unwrap();
        fs::write(dir.path().join("snowflake/sql/template_params.json"), "{}").unwrap();

        let err = ConfigManager::load_with_environment(dir.path(), None, HashMap::new()).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_malformed_template_params_abort() {
        let dir = tempfile::tempdir().unwrap();
        write_layout(dir.path());
        fs::write(dir.path().join("snowflake/sql/template_params.json"), "{").unwrap();

        let err = ConfigManager::load_with_environment(dir.path(), None, HashMap::new()).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_missing_variables_file_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigManager::load_variables(Some(&dir.path().join("nope.toml")), HashMap::new())
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
