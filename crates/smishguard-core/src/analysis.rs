//! Client for the remote phishing classification service.
//!
//! Each call sends exactly one `POST /api/analyze` request. There is no retry
//! at this layer; callers decide whether a failure is worth another attempt.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::AnalysisResult;

/// Production classifier endpoint.
pub const DEFAULT_BASE_URL: &str = "https://phishing-backend-476481782289.us-west1.run.app";

/// Path of the analysis endpoint, relative to the base URL.
pub const ANALYZE_PATH: &str = "/api/analyze";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reason used when a failed response carries no `error` field.
pub const DEFAULT_FAILURE_REASON: &str = "Failed to analyze message";

/// Errors returned by [`RemoteAnalysisClient::analyze`].
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with a non-success status.
    #[error("analysis rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// The response body did not match the expected result shape.
    #[error("invalid analysis response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The client could not be constructed.
    #[error("client configuration error: {0}")]
    Config(String),

    /// Nothing to analyze.
    #[error("message is empty")]
    EmptyMessage,
}

impl AnalysisError {
    /// Human-readable reason, suitable for showing to the user.
    pub fn reason(&self) -> String {
        match self {
            Self::Rejected { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the classifier (without the `/api/analyze` path).
    pub base_url: String,
    /// Upper bound on a single request, including reading the body.
    pub timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("SmishGuard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at the given base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the `User-Agent` sent with every request.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Full URL of the analysis endpoint.
    pub fn analyze_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), ANALYZE_PATH)
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    message: &'a str,
    language: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Async client for the phishing classification service.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct RemoteAnalysisClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl RemoteAnalysisClient {
    /// Creates a client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submits a message for analysis.
    pub async fn analyze(&self, message: &str, language: &str) -> Result<AnalysisResult> {
        let url = self.config.analyze_url();
        debug!("Submitting {} chars for analysis to {}", message.chars().count(), url);

        let response = self
            .client
            .post(&url)
            .json(&AnalyzeRequest { message, language })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let reason = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string());
            return Err(AnalysisError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    fn transport_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::Timeout(self.config.timeout)
        } else {
            AnalysisError::Transport(e)
        }
    }
}
