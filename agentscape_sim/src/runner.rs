//! Scenario runner - executes scene scenarios on a virtual clock.

use crate::backend::nearby;
use crate::exporter::SimExport;
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use agentscape_core::connection::RECOMMENDED_MAX_ROSTER;
use agentscape_env::AgentState;
use tracing::{info, warn};

/// Roster size used by the crowd scenario.
pub const CROWD_AGENTS: usize = 100;

/// Seconds between announcement rounds in the chatter scenario.
const CHATTER_INTERVAL_SECS: f64 = 0.5;

/// Quiet time after chatter so every bubble can complete and be swept.
const DRAIN_SECS: f64 = 4.5;

/// Distance within which agents count as nearby for decisions.
const NEARBY_RADIUS: f64 = 2.5;

const ANNOUNCE_KINDS: [&str; 4] = ["collaborate", "share", "request", "complete"];

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Number of agents in the scene at the end
    pub final_agent_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Wander targets rolled across all agents
    pub retargets: u64,

    /// Bubbles queued
    pub bubbles_created: u64,

    /// Bubbles that completed their display time
    pub bubbles_completed: u64,

    /// Bubbles removed by the sweep after going stale
    pub bubbles_swept: u64,

    /// Bubbles removed because an endpoint left the scene
    pub bubbles_orphaned: u64,

    /// Largest connector count seen on one tick
    pub max_links: usize,

    /// Feed fetch or decision failures observed
    pub feed_errors: u64,

    /// Ticks taken while paused
    pub paused_ticks: u64,
}

/// Runs scene scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Number of agents
    num_agents: usize,

    /// Tick rate in Hz
    tick_rate_hz: u32,

    /// Maximum duration in seconds
    max_duration_secs: f64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_agents: usize) -> Self {
        let defaults = SimConfig::default();
        Self {
            seed,
            num_agents,
            tick_rate_hz: defaults.tick_rate_hz,
            max_duration_secs: defaults.max_duration_secs,
        }
    }

    /// Sets the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Runs a scenario and returns the result.
    pub async fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None).await.0
    }

    /// Runs a scenario, capturing a frame every `every` ticks.
    pub async fn run_with_export(&self, scenario: ScenarioId, every: u64) -> (ScenarioResult, SimExport) {
        let (result, export) = self.execute(scenario, Some(every)).await;
        let export = export.unwrap_or_else(|| SimExport::new(scenario.name(), self.seed));
        (result, export)
    }

    fn config_for(&self, scenario: ScenarioId) -> SimConfig {
        let num_agents = match scenario {
            ScenarioId::Crowd => self.num_agents.max(CROWD_AGENTS),
            _ => self.num_agents,
        };
        SimConfig {
            seed: self.seed,
            num_agents,
            tick_rate_hz: self.tick_rate_hz,
            max_duration_secs: self.max_duration_secs,
            ..Default::default()
        }
    }

    async fn execute(&self, scenario: ScenarioId, record_every: Option<u64>) -> (ScenarioResult, Option<SimExport>) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut world = SimWorld::connect(self.config_for(scenario)).await;
        if let Some(every) = record_every {
            world.record(scenario.name(), every);
        }

        let mut metrics = ScenarioMetrics::default();
        let failures = match scenario {
            ScenarioId::Wander => self.run_wander(&mut world, &mut metrics),
            ScenarioId::Chatter => self.run_chatter(&mut world, &mut metrics),
            ScenarioId::PauseResume => self.run_pause_resume(&mut world, &mut metrics),
            ScenarioId::FeedOutage => self.run_feed_outage(&mut world, &mut metrics).await,
            ScenarioId::Crowd => self.run_crowd(&mut world, &mut metrics),
        };

        let stats = world.scene.bubble_stats();
        metrics.bubbles_completed = stats.completed;
        metrics.bubbles_swept = stats.swept;
        metrics.bubbles_orphaned = stats.orphaned;
        metrics.retargets = world
            .scene
            .agent_ids()
            .into_iter()
            .filter_map(|id| world.scene.motion(id).map(|m| m.retargets()))
            .sum();

        let passed = failures.is_empty();
        let failure_reason = (!passed).then(|| failures.join("; "));

        let export = world.take_export().map(|mut export| {
            export.finalize(passed, failure_reason.clone());
            export
        });

        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_ticks: world.tick_count(),
            final_time_secs: world.time(),
            final_agent_count: world.agent_count(),
            failure_reason,
            metrics,
        };
        (result, export)
    }

    /// Wander: every position stays in bounds and every agent re-targets.
    fn run_wander(&self, world: &mut SimWorld, _metrics: &mut ScenarioMetrics) -> Vec<String> {
        info!("Wander: bounded random motion");

        let bounds = world.config.scene.wander.bounds;
        let mut violations = 0u64;
        for _ in 0..world.ticks_for(self.max_duration_secs) {
            world.tick();
            violations += world
                .scene
                .positions()
                .as_map()
                .values()
                .filter(|p| !bounds.contains(p))
                .count() as u64;
        }

        let mut failures = Vec::new();
        if violations > 0 {
            failures.push(format!("{} positions left the wander bounds", violations));
        }
        let stuck: Vec<String> = world
            .scene
            .agent_ids()
            .into_iter()
            .filter(|id| world.scene.motion(*id).map_or(true, |m| m.retargets() == 0))
            .map(|id| id.to_string())
            .collect();
        if !stuck.is_empty() {
            failures.push(format!("agents never picked a target: {}", stuck.join(", ")));
        }
        failures
    }

    /// Chatter: linked agents announce; every bubble is eventually reclaimed.
    fn run_chatter(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Vec<String> {
        info!("Chatter: bubbles between communicating agents");

        let mut failures = Vec::new();
        let interval = world.ticks_for(CHATTER_INTERVAL_SECS).max(1);
        let mut bad_views = 0u64;

        for tick in 0..world.ticks_for(self.max_duration_secs) {
            let links = world.scene.links();
            metrics.max_links = metrics.max_links.max(links.len());
            if tick % interval == 0 {
                for link in &links {
                    let kind = ANNOUNCE_KINDS[(metrics.bubbles_created % ANNOUNCE_KINDS.len() as u64) as usize];
                    world.scene.announce(link.from, link.to, kind, None);
                    metrics.bubbles_created += 1;
                }
            }

            world.tick();

            bad_views += world
                .scene
                .frame()
                .bubbles
                .iter()
                .filter(|v| !(0.0..=1.0).contains(&v.opacity) || v.scale < 0.0)
                .count() as u64;
        }

        if metrics.bubbles_created == 0 {
            warn!("no communicating pairs, nothing announced");
        }

        world.run_for(DRAIN_SECS);

        if bad_views > 0 {
            failures.push(format!("{} bubble views out of range", bad_views));
        }
        let left = world.scene.messages().len();
        if left > 0 {
            failures.push(format!("{} bubbles never reclaimed", left));
        }
        let stats = world.scene.bubble_stats();
        let reclaimed = stats.completed + stats.swept + stats.orphaned;
        if reclaimed != metrics.bubbles_created {
            failures.push(format!(
                "created {} bubbles but reclaimed {}",
                metrics.bubbles_created, reclaimed
            ));
        }
        failures
    }

    /// PauseResume: frozen motion, live bubble expiry.
    fn run_pause_resume(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Vec<String> {
        info!("PauseResume: freeze and continue");

        let mut failures = Vec::new();
        let ids = world.scene.agent_ids();
        if ids.len() < 2 {
            return vec![format!("needs at least 2 agents, have {}", ids.len())];
        }

        world.run_for(1.0);
        let bubble = world.scene.add_message(ids[0], ids[1], "Pausing for a moment", None);
        metrics.bubbles_created += 1;

        world.scene.pause();
        world.event("paused", None);
        let frozen = world.scene.positions().as_map().clone();
        let frames: Vec<_> = ids.iter().map(|id| world.scene.sprite_frame(*id)).collect();

        let mut moved = 0u64;
        for _ in 0..world.ticks_for(3.5) {
            world.tick();
            metrics.paused_ticks += 1;
            if world.scene.positions().as_map() != &frozen {
                moved += 1;
            }
        }

        if moved > 0 {
            failures.push(format!("positions changed on {} paused ticks", moved));
        }
        let frames_after: Vec<_> = ids.iter().map(|id| world.scene.sprite_frame(*id)).collect();
        if frames_after != frames {
            failures.push("sprite frames advanced while paused".to_string());
        }
        if world.scene.messages().get(bubble).is_some() {
            failures.push("bubble did not expire while paused".to_string());
        }

        world.scene.resume();
        world.event("resumed", None);
        world.run_for(1.0);
        if world.scene.positions().as_map() == &frozen {
            failures.push("positions did not change after resume".to_string());
        }
        failures
    }

    /// FeedOutage: failures surface as an error string over a stale roster.
    async fn run_feed_outage(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Vec<String> {
        info!("FeedOutage: backend answers 503");

        let mut failures = Vec::new();
        world.run_for(1.0);
        let roster_before = world.feed.agents().len();
        let scene_before = world.scene.agent_count();

        world.backend.set_failure(Some(503));
        world.event("backend down", Some("warn"));

        if world.refresh().await {
            failures.push("refresh succeeded during outage".to_string());
        } else {
            metrics.feed_errors += 1;
        }
        match world.feed.last_error() {
            Some("Failed to fetch agents: 503") => {}
            other => failures.push(format!("unexpected feed error: {:?}", other)),
        }
        if world.feed.agents().len() != roster_before {
            failures.push("stale roster was discarded".to_string());
        }

        if let Some(id) = world.scene.agent_ids().first().copied() {
            let position = world
                .scene
                .inspect(id)
                .map(|d| d.position)
                .unwrap_or([0.0, 0.0]);
            let neighbors = nearby(id, world.feed.agents(), NEARBY_RADIUS);
            match world.feed.decide(id, position, neighbors).await {
                Ok(_) => failures.push("decision succeeded during outage".to_string()),
                Err(_) => metrics.feed_errors += 1,
            }
        }

        world.run_for(1.0);
        if world.scene.agent_count() != scene_before {
            failures.push("scene lost agents during outage".to_string());
        }

        world.backend.set_failure(None);
        world.event("backend restored", None);
        if !world.refresh().await {
            failures.push("refresh failed after recovery".to_string());
        }
        if world.feed.last_error().is_some() {
            failures.push("error not cleared after recovery".to_string());
        }
        world.run_for(1.0);
        failures
    }

    /// Crowd: link count equals the number of communicating pairs.
    fn run_crowd(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Vec<String> {
        info!("Crowd: {} agents", world.agent_count());

        let mut failures = Vec::new();
        if world.agent_count() <= RECOMMENDED_MAX_ROSTER {
            failures.push(format!(
                "crowd of {} does not exceed the scan limit {}",
                world.agent_count(),
                RECOMMENDED_MAX_ROSTER
            ));
        }

        let communicating = world
            .feed
            .agents()
            .iter()
            .filter(|a| a.state == AgentState::Communicating)
            .count();
        let expected = communicating * communicating.saturating_sub(1) / 2;

        let mut mismatches = 0u64;
        for _ in 0..world.ticks_for(self.max_duration_secs) {
            world.tick();
            let links = world.scene.links().len();
            metrics.max_links = metrics.max_links.max(links);
            if links != expected {
                mismatches += 1;
            }
        }

        if mismatches > 0 {
            failures.push(format!(
                "link count differed from {} pairs on {} ticks",
                expected, mismatches
            ));
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> ScenarioRunner {
        ScenarioRunner::new(42, 3).with_duration(5.0)
    }

    #[tokio::test]
    async fn test_wander_passes() {
        let result = runner().run(ScenarioId::Wander).await;

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_ticks, 300);
        assert!(result.metrics.retargets >= 3);
    }

    #[tokio::test]
    async fn test_chatter_reclaims_every_bubble() {
        let result = runner().run(ScenarioId::Chatter).await;

        assert!(result.passed, "{:?}", result.failure_reason);
        // one link (1-3) announced every 0.5s for 5s
        assert_eq!(result.metrics.bubbles_created, 10);
        assert_eq!(result.metrics.max_links, 1);
        assert_eq!(result.metrics.bubbles_completed, 10);
    }

    #[tokio::test]
    async fn test_pause_resume_passes() {
        let result = runner().run(ScenarioId::PauseResume).await;

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.paused_ticks, 210);
        assert_eq!(result.metrics.bubbles_completed, 1);
    }

    #[tokio::test]
    async fn test_pause_resume_needs_two_agents() {
        let result = ScenarioRunner::new(1, 1).run(ScenarioId::PauseResume).await;

        assert!(!result.passed);
        assert_eq!(result.failure_reason.as_deref(), Some("needs at least 2 agents, have 1"));
    }

    #[tokio::test]
    async fn test_feed_outage_passes() {
        let result = runner().run(ScenarioId::FeedOutage).await;

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.feed_errors, 2);
        assert_eq!(result.final_agent_count, 3);
    }

    #[tokio::test]
    async fn test_crowd_passes() {
        let result = ScenarioRunner::new(7, 3).with_duration(1.0).run(ScenarioId::Crowd).await;

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.final_agent_count, CROWD_AGENTS);
    }

    #[tokio::test]
    async fn test_same_seed_same_result() {
        let a = runner().run(ScenarioId::Wander).await;
        let b = runner().run(ScenarioId::Wander).await;
        assert_eq!(a.metrics.retargets, b.metrics.retargets);
    }

    #[tokio::test]
    async fn test_run_with_export() {
        let (result, export) = ScenarioRunner::new(42, 3)
            .with_duration(1.0)
            .run_with_export(ScenarioId::Wander, 6)
            .await;

        assert!(result.passed);
        assert!(export.passed);
        assert_eq!(export.scenario, "wander");
        assert_eq!(export.frames.len(), 10);
    }
}
