//! SimWorld - The simulation harness container.

use crate::backend::{generated_roster, StaticBackend};
use crate::context::SimContext;
use crate::exporter::{SimEvent, SimExport, SimFrame};

use agentscape_core::{demo_roster, AgentFeed, Scene, SceneConfig};
use agentscape_env::{AgentRecord, SceneContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Seed extension of the roster generator stream (agent ids are `u32`, so
/// this never collides with a per-agent wander stream).
const ROSTER_STREAM: u64 = u64::MAX;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of agents (up to 3 uses the demo roster)
    pub num_agents: usize,

    /// Tick rate in Hz
    pub tick_rate_hz: u32,

    /// Maximum simulation duration in seconds
    pub max_duration_secs: f64,

    /// Scene tuning
    pub scene: SceneConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_agents: 3,
            tick_rate_hz: 60,
            max_duration_secs: 10.0,
            scene: SceneConfig::default(),
        }
    }
}

struct Recorder {
    every: u64,
    export: SimExport,
    pending: Vec<SimEvent>,
}

/// The SimWorld - backend, feed and scene on one virtual clock.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    /// In-memory backend for fault injection
    pub backend: Arc<StaticBackend>,

    /// Roster feed over the backend
    pub feed: AgentFeed<StaticBackend>,

    /// The scene under test
    pub scene: Scene<SimContext>,

    recorder: Option<Recorder>,
    tick_count: u64,
}

impl SimWorld {
    /// Creates a new SimWorld. The feed has not fetched yet.
    pub fn new(config: SimConfig) -> Self {
        let context = SimContext::shared(config.seed);
        let roster = initial_roster(&config, &context);
        let backend = Arc::new(StaticBackend::new(roster));
        let feed = AgentFeed::new(backend.clone());
        let scene = Scene::new(context.clone(), config.scene.clone());

        Self {
            config,
            context,
            backend,
            feed,
            scene,
            recorder: None,
            tick_count: 0,
        }
    }

    /// Creates a SimWorld and loads the initial roster into the scene.
    pub async fn connect(config: SimConfig) -> Self {
        let mut world = Self::new(config);
        world.refresh().await;
        world
    }

    /// Refreshes the feed; on success the scene picks up the new roster.
    pub async fn refresh(&mut self) -> bool {
        let ok = self.feed.refresh().await;
        if ok {
            self.scene.sync_roster(self.feed.agents());
        } else {
            let message = self.feed.last_error().unwrap_or("unknown").to_string();
            self.event(format!("feed error: {}", message), Some("error"));
        }
        ok
    }

    /// Advances simulation by one tick.
    pub fn tick(&mut self) {
        self.context.advance_time(self.dt());
        self.scene.tick();
        self.tick_count += 1;

        if let Some(recorder) = self.recorder.as_mut() {
            if self.tick_count % recorder.every == 0 {
                let time_sec = self.context.now().as_secs_f64();
                recorder.export.add_frame(SimFrame {
                    time_sec,
                    scene: self.scene.frame(),
                    events: std::mem::take(&mut recorder.pending),
                });
            }
        }

        if self.tick_count % self.config.tick_rate_hz.max(1) as u64 == 0 {
            debug!(
                "  t={:.1}s | agents={} | bubbles={} | paused={}",
                self.time(),
                self.scene.agent_count(),
                self.scene.messages().len(),
                self.scene.is_paused()
            );
        }
    }

    /// Runs ticks covering `secs` of virtual time. Returns the tick count.
    pub fn run_for(&mut self, secs: f64) -> u64 {
        let ticks = self.ticks_for(secs);
        for _ in 0..ticks {
            self.tick();
        }
        ticks
    }

    /// Number of ticks covering `secs`.
    pub fn ticks_for(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.config.tick_rate_hz as f64).round() as u64
    }

    /// Duration of one tick.
    pub fn dt(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.tick_rate_hz.max(1) as f64)
    }

    /// Starts capturing a frame every `every` ticks.
    pub fn record(&mut self, scenario: &str, every: u64) {
        self.recorder = Some(Recorder {
            every: every.max(1),
            export: SimExport::new(scenario, self.config.seed),
            pending: Vec::new(),
        });
    }

    /// Attaches an event to the next recorded frame.
    pub fn event(&mut self, message: impl Into<String>, level: Option<&str>) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.pending.push(SimEvent {
                message: message.into(),
                level: level.map(str::to_string),
            });
        }
    }

    /// Stops recording and hands back the export.
    pub fn take_export(&mut self) -> Option<SimExport> {
        self.recorder.take().map(|r| r.export)
    }

    /// Returns the current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    /// Returns the current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Returns the number of agents in the scene.
    pub fn agent_count(&self) -> usize {
        self.scene.agent_count()
    }
}

fn initial_roster(config: &SimConfig, context: &SimContext) -> Vec<AgentRecord> {
    if config.num_agents <= 3 {
        let mut roster = demo_roster();
        roster.truncate(config.num_agents);
        roster
    } else {
        let mut rng = context.derive_rng(ROSTER_STREAM);
        generated_roster(config.num_agents, &config.scene.wander.bounds, &mut rng)
    }
}
