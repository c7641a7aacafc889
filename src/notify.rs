//! Posts a digest as a GitHub issue.
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::http::{read_limited_bytes, BodyError, MAX_BODY_SIZE};

/// Upper bound on how much of an error response is kept.
const MAX_ERROR_BODY: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    /// Non-2xx response, with whatever body the API returned
    #[error("Issue creation rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Invalid notification target '{0}', expected 'owner/repo'")]
    InvalidTarget(String),
    #[error("Could not read response: {0}")]
    Body(#[from] BodyError),
    #[error("Could not encode or decode issue JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct NewIssue<'a> {
    title: &'a str,
    body: &'a str,
}

/// The created issue, as reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    pub number: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Creates issues in one repository.
pub struct IssueNotifier {
    http: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    token: SecretString,
    timeout: Duration,
}

impl IssueNotifier {
    pub fn new(
        http: reqwest::Client,
        api_url: &str,
        target: &str,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let (owner, repo) = target
            .split_once('/')
            .filter(|(o, r)| !o.is_empty() && !r.is_empty() && !r.contains('/'))
            .ok_or_else(|| NotifyError::InvalidTarget(target.to_string()))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token,
            timeout,
        })
    }

    /// Builds a notifier from config, or `None` when notification is not
    /// configured (no token or no target).
    pub fn from_config(
        http: reqwest::Client,
        config: &Config,
    ) -> Option<Result<Self, NotifyError>> {
        let token = config.notify_token.clone()?;
        let target = config.notify_target.as_deref()?;
        Some(Self::new(
            http,
            &config.notify_api_url,
            target,
            SecretString::from(token),
            Duration::from_secs(config.request_timeout_secs),
        ))
    }

    pub fn target(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Opens one issue with the given title and body.
    pub async fn create_issue(&self, title: &str, body: &str) -> Result<CreatedIssue, NotifyError> {
        let url = format!("{}/repos/{}/{}/issues", self.api_url, self.owner, self.repo);
        let payload = serde_json::to_vec(&NewIssue { title, body })?;

        tracing::debug!(target_repo = %self.target(), title = %title, "Creating issue");

        let request = self
            .http
            .post(url.as_str())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .body(payload);

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| NotifyError::Timeout)??;

        let status = response.status();
        let read =
            tokio::time::timeout(self.timeout, read_limited_bytes(response, MAX_BODY_SIZE)).await;

        if !status.is_success() {
            // The status is the useful part; an unreadable body is left empty
            let body = match read {
                Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_ERROR_BODY)])
                    .trim()
                    .to_string(),
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "Could not read error response body");
                    String::new()
                }
                Err(_) => String::new(),
            };
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = read.map_err(|_| NotifyError::Timeout)??;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
