//! Production implementation of AgentBackend over HTTP.

use crate::backend::AgentBackend;
use crate::error::EnvError;
use crate::types::{AgentRecord, DecisionRequest, DecisionResponse};
use async_trait::async_trait;
use std::time::Duration;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const FETCH_AGENTS: &str = "Failed to fetch agents";
const DECIDE: &str = "Failed to get agent decision";

/// Agent backend speaking JSON over HTTP.
///
/// - `GET {base_url}/api/agents` for the roster
/// - `POST {base_url}/api/agents/decide` for decisions
pub struct HttpAgentBackend {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl HttpAgentBackend {
    /// Creates a backend for the given base URL (a trailing `/` is ignored).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout: None,
        }
    }

    /// Applies a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn agents_endpoint(&self) -> String {
        format!("{}/api/agents", self.base_url)
    }

    pub fn decide_endpoint(&self) -> String {
        format!("{}/api/agents/decide", self.base_url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<reqwest::Response, EnvError> {
        let request = match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        };
        let response = request.send().await.map_err(|err| self.map_error(err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EnvError::status(operation, status.as_u16()));
        }
        Ok(response)
    }

    fn map_error(&self, err: reqwest::Error) -> EnvError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => EnvError::Timeout(timeout.as_millis() as u64),
            _ => EnvError::from(err),
        }
    }
}

impl Default for HttpAgentBackend {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl AgentBackend for HttpAgentBackend {
    async fn fetch_agents(&self) -> Result<Vec<AgentRecord>, EnvError> {
        let response = self
            .send(self.client.get(self.agents_endpoint()), FETCH_AGENTS)
            .await?;
        response
            .json::<Vec<AgentRecord>>()
            .await
            .map_err(|err| self.map_error(err))
    }

    async fn decide(&self, request: DecisionRequest) -> Result<DecisionResponse, EnvError> {
        let response = self
            .send(self.client.post(self.decide_endpoint()).json(&request), DECIDE)
            .await?;
        response
            .json::<DecisionResponse>()
            .await
            .map_err(|err| self.map_error(err))
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
