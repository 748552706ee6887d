//! Agentscape Core - per-agent models for an animated agent scene
//!
//! Everything here is pure state plus a clock value handed in by the
//! caller, which keeps each model deterministic under a virtual clock:
//! 1. **Motion**: bounded random wander with dwell-driven retargeting
//! 2. **Animation**: state-dependent sprite frames, colors and bob
//! 3. **Connections**: pairwise links between communicating agents
//! 4. **Bubbles**: time-bounded message bubbles with fade and scale-in
//!
//! [`Scene`] ties them together over a [`SceneContext`](agentscape_env::SceneContext)
//! and [`AgentFeed`] keeps the roster in sync with an agent backend.

pub mod animation;
pub mod bubbles;
pub mod connection;
pub mod feed;
pub mod motion;
pub mod run_state;
pub mod scene;

// Re-export key types for convenience
pub use animation::AnimationState;
pub use bubbles::{BubbleId, BubblePhase, BubbleTiming, BubbleView, CommunicationKind, MessageBubble, MessageQueue};
pub use connection::Link;
pub use feed::{demo_roster, AgentFeed};
pub use motion::{Bounds, MotionState, Vec2, WanderParams};
pub use run_state::RunControl;
pub use scene::{AgentDetails, BubbleStats, ConfigError, PositionMap, Scene, SceneConfig, SceneFrame, SpriteView};
