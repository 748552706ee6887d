//! Agentscape simulator CLI
//!
//! Run deterministic scene scenarios, or drive a scene live against an
//! agent backend.

use agentscape_core::{demo_roster, AgentFeed, Scene, SceneConfig};
use agentscape_env::{HttpAgentBackend, SceneContext, TokioContext, DEFAULT_BASE_URL};
use agentscape_sim::scenarios::ScenarioId;
use agentscape_sim::{ScenarioResult, ScenarioRunner, SimExport, SimFrame};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Frames between exported snapshots.
const EXPORT_EVERY: u64 = 6;

/// Agentscape scene simulation CLI
#[derive(Parser, Debug)]
#[command(name = "agentscape-sim")]
#[command(about = "Run deterministic scene scenarios for Agentscape", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of agents (up to 3 uses the demo roster)
    #[arg(short, long, default_value = "3")]
    agents: usize,

    /// Scenario to run (wander, chatter, pause_resume, feed_outage, crowd, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Simulation duration in seconds
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// Tick rate in Hz
    #[arg(long, default_value = "60")]
    tick_rate: u32,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export scene frames to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Drive a live scene from this agent backend instead of a scenario
    #[arg(long, env = "AGENTSCAPE_BACKEND_URL", num_args = 0..=1, default_missing_value = DEFAULT_BASE_URL)]
    backend: Option<String>,
}

/// Polls the backend once, then renders on the real clock for `duration`.
///
/// Returns false if the feed reported an error.
async fn run_live(url: &str, duration: f64, tick_rate_hz: u32, export_path: Option<&str>) -> bool {
    let backend = Arc::new(HttpAgentBackend::new(url).with_timeout(Duration::from_secs(5)));
    let feed = AgentFeed::connect(backend).await;

    let roster = if feed.agents().is_empty() {
        warn!("No agents from {}, showing the demo roster", url);
        demo_roster()
    } else {
        info!("Loaded {} agents from {}", feed.agents().len(), url);
        feed.agents().to_vec()
    };

    let context = TokioContext::shared();
    let mut scene = Scene::new(context.clone(), SceneConfig::default());
    scene.sync_roster(&roster);

    let mut export = export_path.map(|_| SimExport::new("live", 0));
    let tick_rate_hz = tick_rate_hz.max(1);
    let ticks = (duration.max(0.0) * tick_rate_hz as f64).round() as u64;
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / tick_rate_hz as f64));

    for tick in 0..ticks {
        interval.tick().await;

        if tick % tick_rate_hz as u64 == 0 {
            for link in scene.links() {
                scene.announce(link.from, link.to, "collaborate", None);
            }
        }
        scene.tick();

        if let Some(export) = export.as_mut() {
            if tick % EXPORT_EVERY == 0 {
                export.add_frame(SimFrame {
                    time_sec: context.now().as_secs_f64(),
                    scene: scene.frame(),
                    events: vec![],
                });
            }
        }

        if tick % tick_rate_hz as u64 == 0 {
            let frame = scene.frame();
            debug!(
                "  t={:.1}s | sprites={} | links={} | bubbles={}",
                context.now().as_secs_f64(),
                frame.sprites.len(),
                frame.links.len(),
                frame.bubbles.len()
            );
        }
    }

    let ok = feed.last_error().is_none();
    if let Some(message) = feed.last_error() {
        error!("Feed error: {}", message);
    }

    if let (Some(mut export), Some(path)) = (export, export_path) {
        export.finalize(ok, feed.last_error().map(str::to_string));
        match export.write_to_file(path) {
            Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path),
            Err(e) => error!("Failed to write export: {}", e),
        }
    }
    ok
}

fn print_json_summary(results: &[ScenarioResult], failed_count: usize) {
    let summary = serde_json::json!({
        "total": results.len(),
        "passed": results.len() - failed_count,
        "failed": failed_count,
        "results": results.iter().map(|r| {
            serde_json::json!({
                "scenario": r.scenario.name(),
                "seed": r.seed,
                "passed": r.passed,
                "ticks": r.total_ticks,
                "time_secs": r.final_time_secs,
                "agents": r.final_agent_count,
                "bubbles_created": r.metrics.bubbles_created,
                "bubbles_completed": r.metrics.bubbles_completed,
                "max_links": r.metrics.max_links,
                "failure_reason": r.failure_reason,
            })
        }).collect::<Vec<_>>(),
    });
    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{}", text),
        Err(e) => error!("Failed to encode summary: {}", e),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Agentscape Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    if let Some(url) = &args.backend {
        info!("Live scene from {} for {:.1}s", url, args.duration);
        let ok = run_live(url, args.duration, args.tick_rate, args.export.as_deref()).await;
        if !ok {
            std::process::exit(1);
        }
        return;
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: {}, all", ScenarioId::names());
                std::process::exit(1);
            }
        }
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        let scenario = scenarios[0];
        info!("Running with export to: {}", export_path);
        let (result, export) = ScenarioRunner::new(base_seed, args.agents)
            .with_tick_rate(args.tick_rate)
            .with_duration(args.duration)
            .run_with_export(scenario, EXPORT_EVERY)
            .await;

        if let Err(e) = export.write_to_file(export_path) {
            error!("Failed to write export: {}", e);
            std::process::exit(1);
        }

        if result.passed {
            info!(
                "✓ {} (seed={}) PASSED - exported {} frames to {}",
                scenario.name(),
                base_seed,
                export.frames.len(),
                export_path
            );
            return;
        }
        error!(
            "✗ {} FAILED: {}",
            scenario.name(),
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
        std::process::exit(1);
    }

    // Run simulations
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let runner = ScenarioRunner::new(seed, args.agents)
            .with_tick_rate(args.tick_rate)
            .with_duration(args.duration);

        for scenario in &scenarios {
            let result = runner.run(*scenario).await;

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    if args.json {
        print_json_summary(&all_results, failed_count);
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
