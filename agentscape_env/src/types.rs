//! Wire types shared between the agent backend and the scene.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Identifier of an agent in the active roster.
///
/// Backends hand these out as positive integers; uniqueness is only
/// guaranteed within one roster snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u32);

impl AgentId {
    /// Returns the raw integer id.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for AgentId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Semantic state reported for an agent.
///
/// This is an open enum: anything the visual layer doesn't know about is
/// kept verbatim in `Other` and rendered like `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "String")]
pub enum AgentState {
    #[default]
    Idle,
    Working,
    Communicating,
    Other(String),
}

impl AgentState {
    /// Returns the wire name of the state.
    pub fn as_str(&self) -> &str {
        match self {
            AgentState::Idle => "idle",
            AgentState::Working => "working",
            AgentState::Communicating => "communicating",
            AgentState::Other(s) => s,
        }
    }

    pub fn is_communicating(&self) -> bool {
        matches!(self, AgentState::Communicating)
    }
}

impl From<String> for AgentState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "idle" => AgentState::Idle,
            "working" => AgentState::Working,
            "communicating" => AgentState::Communicating,
            _ => AgentState::Other(s),
        }
    }
}

impl From<&str> for AgentState {
    fn from(s: &str) -> Self {
        AgentState::from(s.to_string())
    }
}

impl From<AgentState> for String {
    fn from(state: AgentState) -> Self {
        match state {
            AgentState::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for AgentState {
    /// Non-string states (null, numbers, objects) read as `Idle`.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => AgentState::from(s),
            _ => AgentState::Idle,
        })
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One agent as reported by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,

    /// `[x, y]` in scene units. Missing axes read as 0, extra axes are dropped.
    #[serde(
        deserialize_with = "deserialize_position",
        serialize_with = "serialize_position",
        default
    )]
    pub position: [f64; 2],

    #[serde(default)]
    pub state: AgentState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearby_agents: Option<Vec<AgentId>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl AgentRecord {
    /// Creates a record with no descriptive metadata.
    pub fn new(id: impl Into<AgentId>, position: [f64; 2], state: impl Into<AgentState>) -> Self {
        Self {
            id: id.into(),
            position,
            state: state.into(),
            nearby_agents: None,
            reasoning: None,
            task_id: None,
        }
    }

    /// Attaches a reasoning string.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Attaches the ids of nearby agents.
    pub fn with_nearby(mut self, nearby: Vec<AgentId>) -> Self {
        self.nearby_agents = Some(nearby);
        self
    }
}

fn deserialize_position<'de, D>(deserializer: D) -> Result<[f64; 2], D::Error>
where
    D: Deserializer<'de>,
{
    // Anything that is not a list reads as the origin; non-numeric axes as 0.
    let axes = match Value::deserialize(deserializer)? {
        Value::Array(axes) => axes,
        _ => return Ok([0.0, 0.0]),
    };
    let axis = |i: usize| axes.get(i).and_then(Value::as_f64).unwrap_or(0.0);
    Ok([axis(0), axis(1)])
}

fn serialize_position<S>(position: &[f64; 2], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    position.serialize(serializer)
}

/// Body of `POST /api/agents/decide`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub agent_id: AgentId,
    pub position: Vec<f64>,
    pub nearby_agents: Vec<AgentId>,
}

/// Response of `POST /api/agents/decide`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub agent_id: AgentId,
    pub action: String,
    pub reasoning: String,
    #[serde(default)]
    pub observations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_state_is_kept_verbatim() {
        let state = AgentState::from("moving");
        assert_eq!(state, AgentState::Other("moving".to_string()));
        assert_eq!(state.as_str(), "moving");
        assert!(!state.is_communicating());
    }

    #[test]
    fn test_record_parses_backend_json() {
        let json = r#"{"id": 3, "position": [2, 0], "state": "communicating", "nearby_agents": [1]}"#;
        let record: AgentRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.id, AgentId(3));
        assert_eq!(record.position, [2.0, 0.0]);
        assert_eq!(record.state, AgentState::Communicating);
        assert_eq!(record.nearby_agents, Some(vec![AgentId(1)]));
        assert!(record.reasoning.is_none());
    }

    #[test]
    fn test_missing_axes_default_to_zero() {
        let short: AgentRecord = serde_json::from_str(r#"{"id": 1, "position": [1.5], "state": "idle"}"#).unwrap();
        assert_eq!(short.position, [1.5, 0.0]);

        let empty: AgentRecord = serde_json::from_str(r#"{"id": 1, "position": [], "state": "idle"}"#).unwrap();
        assert_eq!(empty.position, [0.0, 0.0]);

        let absent: AgentRecord = serde_json::from_str(r#"{"id": 1, "state": "idle"}"#).unwrap();
        assert_eq!(absent.position, [0.0, 0.0]);

        let nulls: AgentRecord = serde_json::from_str(r#"{"id": 1, "position": [null, 4], "state": "idle"}"#).unwrap();
        assert_eq!(nulls.position, [0.0, 4.0]);
    }

    #[test]
    fn test_malformed_position_does_not_fail_roster() {
        let json = r#"[
            {"id": 1, "position": {"x": 1}, "state": "idle"},
            {"id": 2, "position": "oops", "state": "working"},
            {"id": 3, "position": ["a", 2], "state": "idle"},
            {"id": 4, "position": [1, 1], "state": "idle"}
        ]"#;
        let roster: Vec<AgentRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(roster.len(), 4);
        assert_eq!(roster[0].position, [0.0, 0.0]);
        assert_eq!(roster[1].position, [0.0, 0.0]);
        assert_eq!(roster[2].position, [0.0, 2.0]);
        assert_eq!(roster[3].position, [1.0, 1.0]);
    }

    #[test]
    fn test_non_string_state_reads_as_idle() {
        let json = r#"[
            {"id": 1, "position": [0, 0], "state": null},
            {"id": 2, "position": [1, 0], "state": 3},
            {"id": 3, "position": [2, 0], "state": "communicating"}
        ]"#;
        let roster: Vec<AgentRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(roster[0].state, AgentState::Idle);
        assert_eq!(roster[1].state, AgentState::Idle);
        assert_eq!(roster[2].state, AgentState::Communicating);
    }

    #[test]
    fn test_extra_axis_is_ignored() {
        let record: AgentRecord = serde_json::from_str(r#"{"id": 2, "position": [-2, 1, 7], "state": "working"}"#).unwrap();
        assert_eq!(record.position, [-2.0, 1.0]);
    }

    #[test]
    fn test_record_serializes_state_as_string() {
        let record = AgentRecord::new(7, [1.0, 2.0], "thinking");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["state"], "thinking");
        assert_eq!(json["position"], serde_json::json!([1.0, 2.0]));
        assert!(json.get("reasoning").is_none());
    }

    #[test]
    fn test_decision_response_without_observations() {
        let json = r#"{"agent_id": 2, "action": "idle", "reasoning": "quiet"}"#;
        let response: DecisionResponse = serde_json::from_str(json).unwrap();
        assert!(response.observations.is_empty());
    }
}
