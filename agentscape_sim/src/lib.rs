//! Agentscape Deterministic Simulation Harness
//!
//! Runs the whole scene (feed, motion, animation, links, bubbles) on a
//! virtual clock so every run is reproducible from a single seed.
//!
//! # Core Principle
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: Virtual clock advanced one tick at a time
//! - **Backend**: In-memory roster with switchable failures
//! - **Randomness**: Every agent's wander stream derived from the master seed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (Virtual Clock + Seeded Streams)          │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │                        │                            │
//! │  ┌────▼──────────┐        ┌────▼─────────────┐              │
//! │  │ StaticBackend │◄───────│ AgentFeed        │              │
//! │  │ (fault inj.)  │        └────┬─────────────┘              │
//! │  └───────────────┘             │ sync_roster                │
//! │                           ┌────▼─────────────┐              │
//! │                           │ Scene            │──► SimExport │
//! │                           └──────────────────┘              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use agentscape_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let runner = ScenarioRunner::new(42, 3).with_duration(10.0);
//! let result = runner.run(ScenarioId::Chatter).await;
//! assert!(result.passed);
//! ```

mod backend;
mod context;
mod exporter;
mod runner;
mod world;
pub mod scenarios;

pub use backend::{decide_locally, generated_roster, nearby, perceive, reason, StaticBackend};
pub use context::SimContext;
pub use exporter::{ExportError, SimEvent, SimExport, SimFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner, CROWD_AGENTS};
pub use world::{SimConfig, SimWorld};
