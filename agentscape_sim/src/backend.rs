//! In-process agent backend with fault injection.

use agentscape_core::{demo_roster, Bounds};
use agentscape_env::{AgentBackend, AgentId, AgentRecord, AgentState, DecisionRequest, DecisionResponse, EnvError};
use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Observations for a decision request.
pub fn perceive(request: &DecisionRequest) -> Vec<String> {
    let position = format!("Current position: {:?}", request.position);
    if request.nearby_agents.is_empty() {
        vec![
            "No nearby agents detected".to_string(),
            position,
            "Environment appears quiet".to_string(),
        ]
    } else {
        vec![
            format!("Detected {} nearby agents", request.nearby_agents.len()),
            position,
            format!("Current state: {}", AgentState::Idle),
        ]
    }
}

/// Picks the next action from the number of nearby agents.
pub fn reason(nearby_count: usize) -> (AgentState, String) {
    match nearby_count {
        0 => (AgentState::Idle, "No agents nearby, continue current activity".to_string()),
        1 => (
            AgentState::Working,
            "Single agent nearby, could collaborate or communicate".to_string(),
        ),
        n => (
            AgentState::Communicating,
            format!("Multiple agents ({}) detected, initiate group communication", n),
        ),
    }
}

/// Runs one perceive → reason cycle for a request.
pub fn decide_locally(request: &DecisionRequest) -> DecisionResponse {
    let observations = perceive(request);
    let (action, reasoning) = reason(request.nearby_agents.len());
    DecisionResponse {
        agent_id: request.agent_id,
        action: action.as_str().to_string(),
        reasoning,
        observations,
    }
}

/// Generates `count` agents with ids `1..=count` at random positions.
pub fn generated_roster<R: Rng + ?Sized>(count: usize, bounds: &Bounds, rng: &mut R) -> Vec<AgentRecord> {
    (1..=count as u32)
        .map(|id| {
            let position = bounds.sample(rng);
            let state = match rng.gen_range(0..3) {
                0 => AgentState::Idle,
                1 => AgentState::Working,
                _ => AgentState::Communicating,
            };
            AgentRecord::new(id, [position.x, position.y], state)
        })
        .collect()
}

/// Backend serving a fixed roster from memory.
///
/// Failures can be switched on to exercise the feed's error path: while a
/// status is set, every call answers with that HTTP status.
pub struct StaticBackend {
    roster: Mutex<Vec<AgentRecord>>,
    failure: Mutex<Option<u16>>,
    fetches: AtomicU64,
    decisions: AtomicU64,
}

impl StaticBackend {
    pub fn new(roster: Vec<AgentRecord>) -> Self {
        Self {
            roster: Mutex::new(roster),
            failure: Mutex::new(None),
            fetches: AtomicU64::new(0),
            decisions: AtomicU64::new(0),
        }
    }

    /// The three-agent demo roster.
    pub fn demo() -> Self {
        Self::new(demo_roster())
    }

    /// Replaces the served roster.
    pub fn set_roster(&self, roster: Vec<AgentRecord>) {
        *lock(&self.roster) = roster;
    }

    /// Sets (or clears) the injected failure status.
    pub fn set_failure(&self, status: Option<u16>) {
        *lock(&self.failure) = status;
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn decision_count(&self) -> u64 {
        self.decisions.load(Ordering::Relaxed)
    }

    fn injected(&self, operation: &'static str) -> Result<(), EnvError> {
        match *lock(&self.failure) {
            Some(status) => Err(EnvError::status(operation, status)),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl AgentBackend for StaticBackend {
    async fn fetch_agents(&self) -> Result<Vec<AgentRecord>, EnvError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.injected("Failed to fetch agents")?;
        Ok(lock(&self.roster).clone())
    }

    async fn decide(&self, request: DecisionRequest) -> Result<DecisionResponse, EnvError> {
        self.decisions.fetch_add(1, Ordering::Relaxed);
        self.injected("Failed to get agent decision")?;
        Ok(decide_locally(&request))
    }

    fn describe(&self) -> String {
        format!("static roster ({} agents)", lock(&self.roster).len())
    }
}

/// Ids of other agents within `radius` of `id`.
pub fn nearby(id: AgentId, roster: &[AgentRecord], radius: f64) -> Vec<AgentId> {
    let Some(me) = roster.iter().find(|r| r.id == id) else {
        return Vec::new();
    };
    roster
        .iter()
        .filter(|other| other.id != id)
        .filter(|other| {
            let dx = other.position[0] - me.position[0];
            let dy = other.position[1] - me.position[1];
            (dx * dx + dy * dy).sqrt() <= radius
        })
        .map(|other| other.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn request(nearby: Vec<u32>) -> DecisionRequest {
        DecisionRequest {
            agent_id: AgentId(1),
            position: vec![1.0, 2.0],
            nearby_agents: nearby.into_iter().map(AgentId).collect(),
        }
    }

    #[test]
    fn test_decide_alone() {
        let response = decide_locally(&request(vec![]));

        assert_eq!(response.action, "idle");
        assert_eq!(response.reasoning, "No agents nearby, continue current activity");
        assert_eq!(response.observations[0], "No nearby agents detected");
        assert_eq!(response.observations[1], "Current position: [1.0, 2.0]");
        assert_eq!(response.observations[2], "Environment appears quiet");
    }

    #[test]
    fn test_decide_one_neighbor() {
        let response = decide_locally(&request(vec![2]));
        assert_eq!(response.action, "working");
        assert_eq!(response.observations[0], "Detected 1 nearby agents");
    }

    #[test]
    fn test_decide_group() {
        let response = decide_locally(&request(vec![2, 3, 4]));
        assert_eq!(response.action, "communicating");
        assert_eq!(
            response.reasoning,
            "Multiple agents (3) detected, initiate group communication"
        );
    }

    proptest! {
        #[test]
        fn prop_generated_roster_within_bounds(seed in any::<u64>(), count in 0usize..200) {
            let bounds = Bounds::default();
            let roster = generated_roster(count, &bounds, &mut ChaCha8Rng::seed_from_u64(seed));

            prop_assert_eq!(roster.len(), count);
            for (i, record) in roster.iter().enumerate() {
                prop_assert_eq!(record.id, AgentId(i as u32 + 1));
                let p = agentscape_core::Vec2::new(record.position[0], record.position[1]);
                prop_assert!(bounds.contains(&p));
            }
        }

        #[test]
        fn prop_reason_follows_nearby_count(n in 0usize..50) {
            let (action, _) = reason(n);
            let expected = match n {
                0 => AgentState::Idle,
                1 => AgentState::Working,
                _ => AgentState::Communicating,
            };
            prop_assert_eq!(action, expected);
        }
    }

    #[test]
    fn test_generated_roster_deterministic() {
        let bounds = Bounds::default();
        let a = generated_roster(10, &bounds, &mut ChaCha8Rng::seed_from_u64(1));
        let b = generated_roster(10, &bounds, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_nearby() {
        let roster = demo_roster();
        assert_eq!(nearby(AgentId(2), &roster, 2.0), vec![AgentId(1), AgentId(3)]);
        assert!(nearby(AgentId(1), &roster, 1.0).is_empty());
        assert!(nearby(AgentId(9), &roster, 10.0).is_empty());
    }

    #[tokio::test]
    async fn test_static_backend_serves_roster() {
        let backend = StaticBackend::demo();
        let agents = backend.fetch_agents().await.unwrap();

        assert_eq!(agents.len(), 3);
        assert_eq!(backend.fetch_count(), 1);
        assert_eq!(backend.describe(), "static roster (3 agents)");
    }

    #[tokio::test]
    async fn test_static_backend_fault_injection() {
        let backend = StaticBackend::demo();
        backend.set_failure(Some(503));

        let err = backend.fetch_agents().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch agents: 503");

        let err = backend.decide(request(vec![])).await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));

        backend.set_failure(None);
        assert!(backend.fetch_agents().await.is_ok());
        assert_eq!(backend.fetch_count(), 2);
        assert_eq!(backend.decision_count(), 1);
    }
}
