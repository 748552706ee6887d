//! Connection Policy - which agent pairs get a connector line.
//!
//! Links are evaluated over every unordered pair of rendered agents each
//! tick, so the cost is O(n²) in the roster size. That is fine for the
//! tens of agents this is meant for; rosters beyond
//! [`RECOMMENDED_MAX_ROSTER`] still get the full scan (the scene logs a
//! warning when its roster grows past it).

use crate::animation::COMMUNICATING_BLUE;
use crate::motion::Vec2;
use agentscape_env::{AgentId, AgentState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Roster size above which the pairwise scan is reported as a scaling risk.
pub const RECOMMENDED_MAX_ROSTER: usize = 64;

/// True iff both agents are communicating.
pub fn should_link(a: &AgentState, b: &AgentState) -> bool {
    a.is_communicating() && b.is_communicating()
}

/// Line color for a state; `None` means "don't draw".
pub fn link_color(state: &AgentState) -> Option<&'static str> {
    match state {
        AgentState::Communicating => Some(COMMUNICATING_BLUE),
        _ => None,
    }
}

/// A connector line between two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub from: AgentId,
    pub to: AgentId,
    pub start: [f64; 2],
    pub end: [f64; 2],
    pub color: String,
}

/// Evaluates every unordered pair `(i, j)`, `i < j`, of `agents`.
///
/// Agents without an entry in `positions` are skipped. The output order
/// follows the input order.
pub fn links(agents: &[(AgentId, &AgentState)], positions: &HashMap<AgentId, Vec2>) -> Vec<Link> {
    let mut out = Vec::new();
    for (i, (id_a, state_a)) in agents.iter().enumerate() {
        let Some(pos_a) = positions.get(id_a) else {
            continue;
        };
        for (id_b, state_b) in &agents[i + 1..] {
            if !should_link(state_a, state_b) {
                continue;
            }
            let (Some(pos_b), Some(color)) = (positions.get(id_b), link_color(state_a)) else {
                continue;
            };
            out.push(Link {
                from: *id_a,
                to: *id_b,
                start: [pos_a.x, pos_a.y],
                end: [pos_b.x, pos_b.y],
                color: color.to_string(),
            });
        }
    }
    out
}
