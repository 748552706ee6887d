//! Scene Runtime - drives the per-agent models once per render tick.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Scene<Ctx>                           │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Context: SceneContext                                  │  │
//! │  │  • now()        → tick deltas, bubble ages, sweep      │  │
//! │  │  • derive_rng() → one wander stream per agent          │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  per agent: MotionState + AnimationState  ──► PositionMap    │
//! │                                                 │            │
//! │                              Connection Policy ◄┘            │
//! │  MessageQueue (clock time, never paused)                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two clocks are in play. Bubbles age on the context clock. Motion dwell
//! and sprite frames use the *scene clock*, which only advances on ticks
//! taken while running, so pausing freezes them and resuming continues
//! where they stopped.

use crate::animation::{self, AnimationState, FRAME_DURATION};
use crate::bubbles::{BubbleId, BubbleTiming, BubbleView, MessageBubble, MessageQueue, CLEANUP_INTERVAL};
use crate::connection::{self, Link, RECOMMENDED_MAX_ROSTER};
use crate::motion::{MotionState, Vec2, WanderParams};
use crate::run_state::RunControl;

use agentscape_env::{AgentId, AgentRecord, AgentState, SceneContext};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Invalid scene configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("wander speed must be in (0, 1], got {0}")]
    InvalidSpeed(f64),

    #[error("arrival tolerance must be non-negative, got {0}")]
    InvalidTolerance(f64),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Configuration for a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Wander policy (speed, tolerance, dwell, bounds)
    pub wander: WanderParams,

    /// Time each sprite frame is shown
    pub frame_duration: Duration,

    /// Bubble lifetime, fade and scale-in timing
    pub bubbles: BubbleTiming,

    /// Cadence of the bubble sweep
    pub cleanup_interval: Duration,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            wander: WanderParams::default(),
            frame_duration: FRAME_DURATION,
            bubbles: BubbleTiming::default(),
            cleanup_interval: CLEANUP_INTERVAL,
        }
    }
}

impl SceneConfig {
    /// Checks the values the update loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let speed = self.wander.speed;
        if !(speed > 0.0 && speed <= 1.0) {
            return Err(ConfigError::InvalidSpeed(speed));
        }
        if !(self.wander.tolerance >= 0.0) {
            return Err(ConfigError::InvalidTolerance(self.wander.tolerance));
        }
        if self.frame_duration.is_zero() {
            return Err(ConfigError::ZeroDuration("frame duration"));
        }
        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("cleanup interval"));
        }
        if self.bubbles.default_duration.is_zero() {
            return Err(ConfigError::ZeroDuration("bubble duration"));
        }
        Ok(())
    }
}

/// Latest rendered position of every agent.
///
/// Single writer per key: only an agent's own motion step writes its entry
/// (plus roster sync when the agent appears or leaves). Everyone else only
/// reads, so no locking is involved.
#[derive(Debug, Clone, Default)]
pub struct PositionMap {
    positions: HashMap<AgentId, Vec2>,
}

impl PositionMap {
    pub fn write(&mut self, id: AgentId, position: Vec2) {
        self.positions.insert(id, position);
    }

    pub fn remove(&mut self, id: AgentId) {
        self.positions.remove(&id);
    }

    pub fn get(&self, id: AgentId) -> Option<&Vec2> {
        self.positions.get(&id)
    }

    pub fn as_map(&self) -> &HashMap<AgentId, Vec2> {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

struct SceneAgent {
    record: AgentRecord,
    motion: MotionState,
    animation: AnimationState,
}

/// One sprite as it should be drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteView {
    pub id: AgentId,
    pub state: AgentState,
    /// Motion position with the bob applied to y
    pub position: [f64; 2],
    pub color: String,
    pub frame: u32,
}

/// Everything an external renderer needs for one displayed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFrame {
    pub clock_ms: u64,
    pub scene_ms: u64,
    pub paused: bool,
    pub sprites: Vec<SpriteView>,
    pub links: Vec<Link>,
    pub bubbles: Vec<BubbleView>,
}

/// Inspector data for a selected agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDetails {
    pub id: AgentId,
    pub state: AgentState,
    pub position: [f64; 2],
    pub nearby_agents: Option<Vec<AgentId>>,
    pub reasoning: Option<String>,
}

impl AgentDetails {
    /// Comma-separated nearby ids, or `None` when there are none.
    pub fn nearby_label(&self) -> String {
        match &self.nearby_agents {
            Some(ids) if !ids.is_empty() => ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            _ => "None".to_string(),
        }
    }
}

/// Counters for the bubble expiry paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BubbleStats {
    pub completed: u64,
    pub swept: u64,
    pub orphaned: u64,
    pub sweeps: u64,
}

type CompletionHook = Box<dyn FnMut(&MessageBubble) + Send>;

/// The scene: roster, per-agent model state, positions and bubbles.
pub struct Scene<Ctx: SceneContext> {
    context: Arc<Ctx>,
    config: SceneConfig,
    agents: BTreeMap<AgentId, SceneAgent>,
    positions: PositionMap,
    bubbles: MessageQueue,
    run: RunControl,

    /// Advances only on running ticks
    scene_time: Duration,

    /// Context time seen by the previous tick
    last_clock: Duration,

    last_sweep: Duration,
    tick_count: u64,
    on_bubble_complete: Option<CompletionHook>,
    stats: BubbleStats,
}

impl<Ctx: SceneContext> Scene<Ctx> {
    /// Creates an empty scene.
    pub fn new(context: Arc<Ctx>, config: SceneConfig) -> Self {
        let now = context.now();
        let bubbles = MessageQueue::with_timing(config.bubbles);
        Self {
            context,
            config,
            agents: BTreeMap::new(),
            positions: PositionMap::default(),
            bubbles,
            run: RunControl::new(),
            scene_time: Duration::ZERO,
            last_clock: now,
            last_sweep: now,
            tick_count: 0,
            on_bubble_complete: None,
            stats: BubbleStats::default(),
        }
    }

    /// Registers a hook called once for every bubble completing its life.
    pub fn on_bubble_complete<F>(&mut self, hook: F)
    where
        F: FnMut(&MessageBubble) + Send + 'static,
    {
        self.on_bubble_complete = Some(Box::new(hook));
    }

    /// Reconciles the scene with a roster snapshot.
    ///
    /// New agents start at their reported position with fresh motion and
    /// animation state. Known agents get their state and metadata updated
    /// but keep moving from where they are. Agents missing from the
    /// snapshot are dropped along with their position.
    pub fn sync_roster(&mut self, records: &[AgentRecord]) {
        let before = self.agents.len();
        let incoming: HashSet<AgentId> = records.iter().map(|r| r.id).collect();
        let gone: Vec<AgentId> = self
            .agents
            .keys()
            .filter(|id| !incoming.contains(id))
            .copied()
            .collect();
        for id in gone {
            self.agents.remove(&id);
            self.positions.remove(id);
            debug!(agent = %id, "agent left the roster");
        }

        for record in records {
            match self.agents.get_mut(&record.id) {
                Some(agent) => agent.record = record.clone(),
                None => {
                    let start = Vec2::new(record.position[0], record.position[1]);
                    let rng = self.context.derive_rng(record.id.get() as u64);
                    self.agents.insert(
                        record.id,
                        SceneAgent {
                            record: record.clone(),
                            motion: MotionState::new(start, self.scene_time, rng),
                            animation: AnimationState::new(self.scene_time),
                        },
                    );
                    self.positions.write(record.id, start);
                    debug!(agent = %record.id, state = %record.state, "agent joined the roster");
                }
            }
        }

        if self.agents.len() > RECOMMENDED_MAX_ROSTER && before <= RECOMMENDED_MAX_ROSTER {
            warn!(
                roster = self.agents.len(),
                limit = RECOMMENDED_MAX_ROSTER,
                "roster exceeds the pairwise connection scan limit"
            );
        }
    }

    /// One render tick.
    ///
    /// While running, every agent's motion advances exactly once and writes
    /// its own position. Regardless of pause, finished bubbles complete and
    /// the sweep runs if its cadence has elapsed.
    pub fn tick(&mut self) {
        let now = self.context.now();
        let delta = now.saturating_sub(self.last_clock);
        self.last_clock = now;

        if !self.run.is_paused() {
            self.scene_time += delta;
            let scene_time = self.scene_time;
            let wander = self.config.wander;
            for (id, agent) in self.agents.iter_mut() {
                let position = agent.motion.step(scene_time, &wander);
                self.positions.write(*id, position);
            }
        }

        let hook = &mut self.on_bubble_complete;
        let completed = self.bubbles.complete_elapsed(now, |bubble| {
            debug!(bubble = %bubble.id, from = %bubble.from, to = %bubble.to, "bubble completed");
            if let Some(hook) = hook.as_mut() {
                hook(bubble);
            }
        });
        self.stats.completed += completed as u64;

        if now.saturating_sub(self.last_sweep) >= self.config.cleanup_interval {
            self.sweep();
        }

        self.tick_count += 1;
    }

    /// Bubble sweep: drops stale bubbles and bubbles whose agents are gone.
    pub fn sweep(&mut self) {
        let now = self.context.now();
        let stale = self.bubbles.cleanup(now);
        let orphaned = self.bubbles.retain_resolvable(self.positions.as_map());
        self.last_sweep = now;

        self.stats.sweeps += 1;
        self.stats.swept += stale.len() as u64;
        self.stats.orphaned += orphaned.len() as u64;
        if !stale.is_empty() || !orphaned.is_empty() {
            debug!(stale = stale.len(), orphaned = orphaned.len(), "bubble sweep");
        }
    }

    /// Connector lines for the current positions.
    pub fn links(&self) -> Vec<Link> {
        let states: Vec<(AgentId, &AgentState)> = self
            .agents
            .iter()
            .map(|(id, agent)| (*id, &agent.record.state))
            .collect();
        connection::links(&states, self.positions.as_map())
    }

    /// Snapshot for the renderer.
    pub fn frame(&self) -> SceneFrame {
        let now = self.context.now();
        let sprites = self
            .agents
            .iter()
            .filter_map(|(id, agent)| {
                let position = self.positions.get(*id)?;
                let state = &agent.record.state;
                let bob = animation::bob_offset(agent.animation.elapsed(self.scene_time), *id);
                Some(SpriteView {
                    id: *id,
                    state: state.clone(),
                    position: [position.x, position.y + bob],
                    color: animation::color_for(state).to_string(),
                    frame: agent.animation.frame(state, self.scene_time, self.config.frame_duration),
                })
            })
            .collect();

        SceneFrame {
            clock_ms: now.as_millis() as u64,
            scene_ms: self.scene_time.as_millis() as u64,
            paused: self.run.is_paused(),
            sprites,
            links: self.links(),
            bubbles: self.bubbles.views(now, self.positions.as_map()),
        }
    }

    /// Details card data for one agent.
    pub fn inspect(&self, id: AgentId) -> Option<AgentDetails> {
        let agent = self.agents.get(&id)?;
        let position = self
            .positions
            .get(id)
            .map(|p| [p.x, p.y])
            .unwrap_or(agent.record.position);
        Some(AgentDetails {
            id,
            state: agent.record.state.clone(),
            position,
            nearby_agents: agent.record.nearby_agents.clone(),
            reasoning: agent.record.reasoning.clone(),
        })
    }

    /// Queues a message bubble stamped with the current clock time.
    pub fn add_message(
        &mut self,
        from: AgentId,
        to: AgentId,
        message: impl Into<String>,
        duration: Option<Duration>,
    ) -> BubbleId {
        let now = self.context.now();
        self.bubbles.add(from, to, message, duration, now)
    }

    /// Queues a templated communication bubble.
    pub fn announce(&mut self, from: AgentId, to: AgentId, action: &str, context: Option<&str>) -> BubbleId {
        let now = self.context.now();
        self.bubbles.announce(from, to, action, context, now)
    }

    pub fn remove_message(&mut self, id: BubbleId) {
        self.bubbles.remove(id);
    }

    pub fn clear_messages(&mut self) {
        self.bubbles.clear();
    }

    pub fn messages(&self) -> &MessageQueue {
        &self.bubbles
    }

    pub fn pause(&mut self) {
        self.run.pause();
    }

    pub fn resume(&mut self) {
        self.run.resume();
    }

    /// Flips pause and returns the new paused value.
    pub fn toggle_pause(&mut self) -> bool {
        self.run.toggle()
    }

    pub fn is_paused(&self) -> bool {
        self.run.is_paused()
    }

    pub fn run_control(&self) -> &RunControl {
        &self.run
    }

    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    /// Current motion state of an agent.
    pub fn motion(&self, id: AgentId) -> Option<&MotionState> {
        self.agents.get(&id).map(|a| &a.motion)
    }

    /// Current sprite frame of an agent.
    pub fn sprite_frame(&self, id: AgentId) -> Option<u32> {
        let agent = self.agents.get(&id)?;
        Some(agent.animation.frame(&agent.record.state, self.scene_time, self.config.frame_duration))
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn scene_time(&self) -> Duration {
        self.scene_time
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn bubble_stats(&self) -> BubbleStats {
        self.stats
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }
}
