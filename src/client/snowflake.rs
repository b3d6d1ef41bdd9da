//! # Snowflake SQL API Warehouse
//!
//! Talks to the Snowflake SQL REST API (`/api/v2/statements`). A batch is sent as
//! one multi-statement request wrapped in `BEGIN`, so nothing commits until the
//! batch's own trailing `COMMIT` runs. Snowflake stops at the first failing
//! statement and reports it with a non-success status.
//!
//! Requests Snowflake cannot finish within its synchronous window come back as
//! `202 Accepted`; the client then polls the statement handle until it settles
//! or the profile's timeout elapses.

use super::traits::{Row, Warehouse};
use crate::config::ConnectionProfile;
use crate::error::{EtlError, Result};
use crate::sql::SqlBatch;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const STATEMENTS_PATH: &str = "/api/v2/statements";
const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";
const USER_AGENT: &str = concat!("notebook-etl/", env!("CARGO_PKG_VERSION"));
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: String,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parameters: HashMap<&'static str, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    #[serde(default)]
    row_type: Vec<ColumnType>,
    /// One entry per result partition; the first partition's rows come inline
    #[serde(default)]
    partition_info: Vec<PartitionInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionInfo {
    #[serde(default)]
    row_count: u64,
}

#[derive(Debug, Deserialize)]
struct ColumnType {
    name: String,
}

impl StatementResponse {
    fn partition_count(&self) -> usize {
        self.result_set_meta_data
            .as_ref()
            .map_or(0, |meta| meta.partition_info.len())
    }

    fn into_rows(self) -> Vec<Row> {
        let columns: Vec<String> = self
            .result_set_meta_data
            .map(|meta| meta.row_type.into_iter().map(|c| c.name).collect())
            .unwrap_or_default();

        self.data
            .into_iter()
            .map(|values| {
                Row::from_pairs(columns.iter().cloned().zip(values.into_iter().map(|v| {
                    v.map(serde_json::Value::String)
                        .unwrap_or(serde_json::Value::Null)
                })))
            })
            .collect()
    }
}

/// Warehouse client for one connection profile
#[derive(Clone)]
pub struct SnowflakeSqlApi {
    client: Client,
    profile: ConnectionProfile,
    poll_interval: Duration,
}

impl SnowflakeSqlApi {
    pub fn new(profile: ConnectionProfile) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(profile.timeout_seconds.saturating_add(30)))
            .build()
            .map_err(|e| EtlError::warehouse("connect", e.to_string()))?;

        Ok(Self {
            client,
            profile,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn base_url(&self) -> &str {
        self.profile.account_url.trim_end_matches('/')
    }

    /// Multi-statement text for a batch: an explicit transaction around it.
    ///
    /// Separators sit on their own line so a trailing `--` comment cannot swallow
    /// them. Comment-only fragments are left out of the text and the count.
    pub fn batch_text(batch: &SqlBatch) -> (String, usize) {
        let mut statements = Vec::with_capacity(batch.len() + 1);
        statements.push("BEGIN");
        statements.extend(
            batch
                .statements()
                .iter()
                .map(|s| s.trim())
                .filter(|s| has_code(s)),
        );
        let count = statements.len();
        (statements.join("\n;\n"), count)
    }

    /// Rows of result partition `partition` (1-based beyond the inline one)
    async fn fetch_partition(&self, handle: &str, partition: usize) -> Result<StatementResponse> {
        let response = self
            .client
            .get(format!("{}{STATEMENTS_PATH}/{handle}", self.base_url()))
            .query(&[("partition", partition)])
            .bearer_auth(&self.profile.token)
            .header(TOKEN_TYPE_HEADER, &self.profile.token_type)
            .send()
            .await
            .map_err(|e| EtlError::warehouse("fetch partition", e.to_string()))?;

        self.settle(response).await
    }

    async fn submit(&self, statement: String, statement_count: usize) -> Result<StatementResponse> {
        let mut parameters = HashMap::new();
        parameters.insert("MULTI_STATEMENT_COUNT", statement_count.to_string());

        let request = StatementRequest {
            statement,
            timeout: self.profile.timeout_seconds,
            warehouse: self.profile.warehouse.as_deref(),
            database: self.profile.database.as_deref(),
            schema: self.profile.schema.as_deref(),
            role: self.profile.role.as_deref(),
            parameters,
        };

        let response = self
            .client
            .post(format!("{}{STATEMENTS_PATH}", self.base_url()))
            .bearer_auth(&self.profile.token)
            .header(TOKEN_TYPE_HEADER, &self.profile.token_type)
            .json(&request)
            .send()
            .await
            .map_err(|e| EtlError::warehouse("submit", e.to_string()))?;

        self.settle(response).await
    }

    /// Follow a response until the statement has finished
    async fn settle(&self, response: reqwest::Response) -> Result<StatementResponse> {
        let started = Instant::now();
        let deadline = Duration::from_secs(self.profile.timeout_seconds);
        let mut response = response;

        loop {
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| EtlError::warehouse("read response", e.to_string()))?;

            match status {
                StatusCode::OK => {
                    return serde_json::from_str(&text)
                        .map_err(|e| EtlError::warehouse("decode response", e.to_string()));
                }
                StatusCode::ACCEPTED => {
                    let pending: StatementResponse = serde_json::from_str(&text)
                        .map_err(|e| EtlError::warehouse("decode response", e.to_string()))?;
                    let handle = pending.statement_handle.ok_or_else(|| {
                        EtlError::warehouse("poll", "accepted response without a statement handle")
                    })?;

                    if started.elapsed() >= deadline {
                        return Err(EtlError::warehouse(
                            "poll",
                            format!("statement {handle} still running after {}s", deadline.as_secs()),
                        ));
                    }

                    debug!(statement_handle = %handle, "Statement still running, polling");
                    tokio::time::sleep(self.poll_interval).await;

                    response = self
                        .client
                        .get(format!("{}{STATEMENTS_PATH}/{handle}", self.base_url()))
                        .bearer_auth(&self.profile.token)
                        .header(TOKEN_TYPE_HEADER, &self.profile.token_type)
                        .send()
                        .await
                        .map_err(|e| EtlError::warehouse("poll", e.to_string()))?;
                }
                _ => {
                    let failure: StatementResponse = serde_json::from_str(&text).unwrap_or_default();
                    warn!(
                        status = status.as_u16(),
                        code = ?failure.code,
                        statement_handle = ?failure.statement_handle,
                        "❌ Snowflake statement failed"
                    );
                    return Err(EtlError::warehouse(
                        "execute",
                        format!(
                            "HTTP {}: {}",
                            status.as_u16(),
                            failure.message.unwrap_or(text)
                        ),
                    ));
                }
            }
        }
    }
}

#[async_trait]
impl Warehouse for SnowflakeSqlApi {
    async fn run_batch(&self, batch: &SqlBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let (text, count) = Self::batch_text(batch);
        self.submit(text, count).await?;
        info!(statements = batch.len(), "🗄️ Warehouse batch committed");
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let mut response = self.submit(sql.trim().to_string(), 1).await?;

        let partitions = response.partition_count();
        if partitions > 1 {
            let handle = response.statement_handle.clone().ok_or_else(|| {
                EtlError::warehouse("fetch partition", "partitioned result without a statement handle")
            })?;
            for partition in 1..partitions {
                let next = self.fetch_partition(&handle, partition).await?;
                response.data.extend(next.data);
            }
            debug!(statement_handle = %handle, partitions = partitions, "Fetched result partitions");
        }

        Ok(response.into_rows())
    }
}

/// False for fragments holding nothing but whitespace and `--` comments
fn has_code(fragment: &str) -> bool {
    fragment.lines().any(|line| {
        let code = line.split_once("--").map_or(line, |(code, _)| code);
        !code.trim().is_empty()
    })
}
