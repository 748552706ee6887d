//! Agentscape Environment Abstraction Layer
//!
//! This crate separates the scene model from everything that touches the
//! outside world, so the same update code runs on a real event loop and
//! under a virtual clock in tests.
//!
//! # Seams
//!
//! - Time and randomness: [`SceneContext`] (`now()`, `sleep()`, `derive_rng()`)
//! - Agent data: [`AgentBackend`] (`fetch_agents()`, `decide()`)
//!
//! # Example
//!
//! ```ignore
//! use agentscape_env::{AgentBackend, HttpAgentBackend, SceneContext, TokioContext};
//!
//! async fn poll<Ctx: SceneContext, B: AgentBackend>(ctx: &Ctx, backend: &B) {
//!     loop {
//!         match backend.fetch_agents().await {
//!             Ok(agents) => render(agents),
//!             Err(e) => show_error(e.to_string()),
//!         }
//!         ctx.sleep(Duration::from_secs(5)).await;
//!     }
//! }
//! ```

mod backend;
mod context;
mod error;
mod http_impl;
mod tokio_impl;
mod types;

pub use backend::AgentBackend;
pub use context::SceneContext;
pub use error::EnvError;
pub use http_impl::{HttpAgentBackend, DEFAULT_BASE_URL};
pub use tokio_impl::TokioContext;
pub use types::{AgentId, AgentRecord, AgentState, DecisionRequest, DecisionResponse};
