//! Agent backend abstraction for Agentscape scenes.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{AgentId, AgentRecord, DecisionRequest, DecisionResponse};

/// Source of agent roster snapshots and agent decisions.
///
/// # Implementations
///
/// - **Production**: `HttpAgentBackend` - polls `{base_url}/api/agents`
/// - **Simulation**: `StaticBackend` in `agentscape_sim` - hard-coded demo
///   roster with fault injection
///
/// Calls may be slow or fail; nothing here is retried. Two fetches in
/// flight at once resolve in whatever order the transport completes them.
#[async_trait]
pub trait AgentBackend: Send + Sync + 'static {
    /// Fetches the current roster.
    ///
    /// # Returns
    /// * `Ok(records)` - The full roster snapshot
    /// * `Err(EnvError::HttpStatus)` - The backend answered non-2xx
    /// * `Err(EnvError::NetworkError)` - The request never completed
    async fn fetch_agents(&self) -> Result<Vec<AgentRecord>, EnvError>;

    /// Asks the backend what the agent should do next.
    async fn decide(&self, request: DecisionRequest) -> Result<DecisionResponse, EnvError>;

    /// Convenience wrapper building the request body.
    async fn decide_for(
        &self,
        agent_id: AgentId,
        position: [f64; 2],
        nearby_agents: Vec<AgentId>,
    ) -> Result<DecisionResponse, EnvError> {
        self.decide(DecisionRequest {
            agent_id,
            position: position.to_vec(),
            nearby_agents,
        })
        .await
    }

    /// Human-readable description of where agents come from (for logging).
    fn describe(&self) -> String;
}
