//! GitHub issue tracker.
//!
//! Filing is best-effort notification: whatever GitHub answers, the caller gets an
//! [`IssueOutcome`] and a log line, never an error.

use super::traits::{IssueOutcome, IssueTracker};
use crate::config::Variables;
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

/// GitHub REST API base URL.
const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("notebook-etl/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct NewIssue<'a> {
    title: &'a str,
    body: &'a str,
    labels: &'a [&'a str],
}

#[derive(Clone)]
pub struct GitHubIssueTracker {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    user: String,
    token: String,
}

impl GitHubIssueTracker {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        user: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EtlError::configuration("issue_tracker", e.to_string()))?;

        Ok(Self {
            client,
            api_base: GITHUB_API_BASE.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            user: user.into(),
            token: token.into(),
        })
    }

    /// Tracker for the configured repository; `None` without both credentials
    pub fn from_variables(variables: &Variables) -> Result<Option<Self>> {
        let Some((user, token)) = variables.git_credentials() else {
            return Ok(None);
        };
        let (owner, repo) = variables.issue_repository()?;
        Self::new(owner, repo, user, token).map(Some)
    }

    /// Point at another API host (GitHub Enterprise, tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/{}/issues", self.api_base, self.owner, self.repo)
    }
}

#[async_trait]
impl IssueTracker for GitHubIssueTracker {
    async fn file_issue(&self, title: &str, body: &str, labels: &[&str]) -> IssueOutcome {
        let issue = NewIssue { title, body, labels };

        let response = match self
            .client
            .post(self.issues_url())
            .basic_auth(&self.user, Some(&self.token))
            .header("Accept", "application/vnd.github+json")
            .json(&issue)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(title = %title, error = %e, "Could not create Issue");
                return IssueOutcome::Unreachable {
                    message: e.to_string(),
                };
            }
        };

        let status = response.status();
        if status == StatusCode::CREATED {
            info!(title = %title, "Successfully created Issue");
            return IssueOutcome::Created;
        }

        let body = response.text().await.unwrap_or_default();
        error!(title = %title, status = status.as_u16(), "Could not create Issue");
        info!(response = %body, "Response");
        IssueOutcome::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}
