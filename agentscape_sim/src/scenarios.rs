//! Scene scenarios for deterministic runs.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Agents wander inside the bounds and keep re-rolling targets
    Wander,

    /// Communicating pairs exchange bubbles that fade and are reclaimed
    Chatter,

    /// Motion freezes while paused, bubbles keep expiring
    PauseResume,

    /// Backend outage: error surfaced, stale roster kept
    FeedOutage,

    /// Large generated roster exercising the pairwise link scan
    Crowd,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Wander,
            ScenarioId::Chatter,
            ScenarioId::PauseResume,
            ScenarioId::FeedOutage,
            ScenarioId::Crowd,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Wander => "wander",
            ScenarioId::Chatter => "chatter",
            ScenarioId::PauseResume => "pause_resume",
            ScenarioId::FeedOutage => "feed_outage",
            ScenarioId::Crowd => "crowd",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Wander => "Positions stay inside the wander bounds and every agent re-targets",
            ScenarioId::Chatter => "Linked agents announce messages; every bubble fades and is reclaimed",
            ScenarioId::PauseResume => "Positions and frames frozen while paused, bubbles still expire",
            ScenarioId::FeedOutage => "Backend returns 503; feed reports the error and keeps the stale roster",
            ScenarioId::Crowd => "100 generated agents; link count matches communicating pairs",
        }
    }

    /// Returns the names of all scenarios, comma separated.
    pub fn names() -> String {
        Self::all()
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wander" => Ok(ScenarioId::Wander),
            "chatter" => Ok(ScenarioId::Chatter),
            "pause_resume" | "pauseresume" | "pause" => Ok(ScenarioId::PauseResume),
            "feed_outage" | "feedoutage" | "outage" => Ok(ScenarioId::FeedOutage),
            "crowd" => Ok(ScenarioId::Crowd),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
