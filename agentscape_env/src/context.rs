//! Core environment context trait for Agentscape scenes.

use async_trait::async_trait;
use rand::rngs::StdRng;
use std::future::Future;
use std::time::{Duration, SystemTime};

/// The central interface for environment interaction.
///
/// Abstracts the clock and entropy so the scene can be driven either by a
/// real event loop (`TokioContext`) or by a virtual clock in deterministic
/// tests (`SimContext` in `agentscape_sim`).
#[async_trait]
pub trait SceneContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    ///
    /// Bubble lifetimes, cleanup cadence and tick deltas are all measured
    /// against this clock. In simulation it is the virtual clock.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time.
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Derives a random number generator for one consumer.
    ///
    /// Seeded implementations combine their master seed with
    /// `seed_extension` so every consumer (e.g. every agent's wander) gets
    /// a reproducible stream that doesn't shift when other consumers are
    /// added or removed.
    fn derive_rng(&self, seed_extension: u64) -> StdRng;

    /// Returns the context's seed (0 when unseeded).
    fn seed(&self) -> u64;
}
