//! Agent Feed - holds the current roster polled from an agent backend.
//!
//! The feed never retries on its own. A failed refresh keeps the previous
//! roster (now stale) and records the error message for display.

use agentscape_env::{AgentBackend, AgentId, AgentRecord, DecisionResponse, EnvError};
use std::sync::Arc;
use tracing::{debug, error};

/// Hard-coded roster shown when no backend is available.
pub fn demo_roster() -> Vec<AgentRecord> {
    vec![
        AgentRecord::new(1, [-2.0, 0.0], "communicating").with_reasoning("Chatting with Agent 3"),
        AgentRecord::new(2, [0.0, 0.0], "working").with_reasoning("Building features"),
        AgentRecord::new(3, [2.0, 0.0], "communicating").with_reasoning("Chatting with Agent 1"),
    ]
}

/// Roster snapshot plus loading/error status for one backend.
pub struct AgentFeed<B: AgentBackend> {
    backend: Arc<B>,
    agents: Vec<AgentRecord>,
    loading: bool,
    last_error: Option<String>,
    refresh_count: u64,
}

impl<B: AgentBackend> AgentFeed<B> {
    /// Creates a feed that hasn't fetched yet (reported as loading).
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            agents: Vec::new(),
            loading: true,
            last_error: None,
            refresh_count: 0,
        }
    }

    /// Creates a feed and performs the initial fetch.
    pub async fn connect(backend: Arc<B>) -> Self {
        let mut feed = Self::new(backend);
        feed.refresh().await;
        feed
    }

    /// Re-fetches the roster.
    ///
    /// Returns true on success. On failure the old roster is kept and
    /// [`last_error`](Self::last_error) holds the message.
    pub async fn refresh(&mut self) -> bool {
        self.loading = true;
        self.last_error = None;
        self.refresh_count += 1;

        let ok = match self.backend.fetch_agents().await {
            Ok(agents) => {
                debug!(source = %self.backend.describe(), count = agents.len(), "roster refreshed");
                self.agents = agents;
                true
            }
            Err(e) => {
                error!(source = %self.backend.describe(), "Error fetching agents: {}", e);
                self.last_error = Some(e.to_string());
                false
            }
        };

        self.loading = false;
        ok
    }

    /// Asks the backend for a decision. Failures are returned to the caller.
    pub async fn decide(
        &self,
        agent_id: AgentId,
        position: [f64; 2],
        nearby_agents: Vec<AgentId>,
    ) -> Result<DecisionResponse, EnvError> {
        self.backend
            .decide_for(agent_id, position, nearby_agents)
            .await
            .inspect_err(|e| error!(agent = %agent_id, "Error getting agent decision: {}", e))
    }

    pub fn agents(&self) -> &[AgentRecord] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentRecord> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of refreshes attempted so far.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentscape_env::DecisionRequest;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend returning queued results in order.
    struct ScriptedBackend {
        fetches: Mutex<Vec<Result<Vec<AgentRecord>, EnvError>>>,
        fail_decisions: bool,
    }

    impl ScriptedBackend {
        fn new(mut fetches: Vec<Result<Vec<AgentRecord>, EnvError>>) -> Self {
            fetches.reverse();
            Self {
                fetches: Mutex::new(fetches),
                fail_decisions: false,
            }
        }
    }

    #[async_trait]
    impl AgentBackend for ScriptedBackend {
        async fn fetch_agents(&self) -> Result<Vec<AgentRecord>, EnvError> {
            self.fetches
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(EnvError::network("script exhausted")))
        }

        async fn decide(&self, request: DecisionRequest) -> Result<DecisionResponse, EnvError> {
            if self.fail_decisions {
                return Err(EnvError::status("Failed to get agent decision", 500));
            }
            Ok(DecisionResponse {
                agent_id: request.agent_id,
                action: "idle".to_string(),
                reasoning: "scripted".to_string(),
                observations: vec![],
            })
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    #[test]
    fn test_demo_roster() {
        let roster = demo_roster();
        assert_eq!(roster.len(), 3);
        assert_eq!(roster[0].state, agentscape_env::AgentState::Communicating);
        assert_eq!(roster[1].reasoning.as_deref(), Some("Building features"));
    }

    #[tokio::test]
    async fn test_new_feed_is_loading() {
        let feed = AgentFeed::new(Arc::new(ScriptedBackend::new(vec![])));
        assert!(feed.is_loading());
        assert!(feed.agents().is_empty());
        assert!(feed.last_error().is_none());
    }

    #[tokio::test]
    async fn test_connect_fetches_roster() {
        let backend = ScriptedBackend::new(vec![Ok(demo_roster())]);
        let feed = AgentFeed::connect(Arc::new(backend)).await;

        assert!(!feed.is_loading());
        assert_eq!(feed.agents().len(), 3);
        assert_eq!(feed.agent(AgentId(2)).unwrap().position, [0.0, 0.0]);
        assert_eq!(feed.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_roster() {
        let backend = ScriptedBackend::new(vec![
            Ok(demo_roster()),
            Err(EnvError::status("Failed to fetch agents", 502)),
        ]);
        let mut feed = AgentFeed::connect(Arc::new(backend)).await;

        assert!(!feed.refresh().await);

        assert_eq!(feed.agents().len(), 3);
        assert_eq!(feed.last_error(), Some("Failed to fetch agents: 502"));
        assert!(!feed.is_loading());
    }

    #[tokio::test]
    async fn test_successful_refresh_clears_error() {
        let backend = ScriptedBackend::new(vec![
            Err(EnvError::network("connection refused")),
            Ok(vec![AgentRecord::new(9, [1.0, 1.0], "idle")]),
        ]);
        let mut feed = AgentFeed::connect(Arc::new(backend)).await;
        assert!(feed.last_error().is_some());

        assert!(feed.refresh().await);

        assert!(feed.last_error().is_none());
        assert_eq!(feed.agents()[0].id, AgentId(9));
    }

    #[tokio::test]
    async fn test_decide_propagates_failure() {
        let backend = ScriptedBackend {
            fail_decisions: true,
            ..ScriptedBackend::new(vec![])
        };
        let feed = AgentFeed::new(Arc::new(backend));

        let err = feed.decide(AgentId(1), [0.0, 0.0], vec![]).await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_decide_success() {
        let feed = AgentFeed::new(Arc::new(ScriptedBackend::new(vec![])));
        let response = feed.decide(AgentId(4), [1.0, 2.0], vec![AgentId(1)]).await.unwrap();
        assert_eq!(response.agent_id, AgentId(4));
    }
}
