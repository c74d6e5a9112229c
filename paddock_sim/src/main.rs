//! Paddock simulator CLI
//!
//! Run deterministic race-weekend scenarios and check their invariants.

use clap::Parser;
use paddock_core::weekend::{Stage, WeekendConfig};
use paddock_sim::scenarios::ScenarioId;
use paddock_sim::{load_config, run_phase, LeagueFixture, RaceExport, ScenarioResult, ScenarioRunner, StoreKind};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Paddock deterministic weekend simulator
#[derive(Parser, Debug)]
#[command(name = "paddock-sim")]
#[command(about = "Run deterministic race-weekend scenarios", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (full_weekend, replay_guard, missing_grid, post_race_gate,
    /// multi_league, news_outage, season_sweep, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Leagues in the generated fixture
    #[arg(short, long, default_value = "1")]
    leagues: usize,

    /// Teams per league
    #[arg(short, long, default_value = "8")]
    teams: usize,

    /// Races per season
    #[arg(short, long, default_value = "3")]
    races: usize,

    /// Weekend configuration (JSON); defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Persist scenario data in sled databases under this directory
    #[arg(long)]
    db: Option<PathBuf>,

    /// Run one weekend phase (qualifying, race, post-race) on the real clock
    /// against the --db database instead of simulating scenarios
    #[arg(long)]
    phase: Option<String>,

    /// Export the last finished race of the scenario to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if !args.json {
        info!("Paddock Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                error!("{}", e);
                let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
                error!("Available scenarios: {}, all", names.join(", "));
                std::process::exit(2);
            }
        }
    };

    let config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                std::process::exit(2);
            }
        },
        None => WeekendConfig::default(),
    };

    if let Some(phase) = &args.phase {
        run_live(&args, phase, config);
        return;
    }

    if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
        error!("--export only supports a single scenario and seed");
        std::process::exit(2);
    }

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let store = args.db.clone().map(StoreKind::Sled).unwrap_or_default();

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let runner = ScenarioRunner::new(seed)
            .with_leagues(args.leagues)
            .with_teams(args.teams)
            .with_races(args.races)
            .with_config(config.clone())
            .with_store(store.clone());

        for scenario in &scenarios {
            let result = runner.run(*scenario);

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

    if let Some(export_path) = &args.export {
        let exported = all_results.first().and_then(|result| {
            let record = result.last_race.as_ref()?;
            let mut export = RaceExport::from_record(result.scenario.name(), result.seed, record)?;
            export.finalize(result.passed);
            Some(export)
        });
        match exported {
            Some(export) => match export.write_to_file(export_path) {
                Ok(()) => info!("Exported {} to {}", export.race_id, export_path),
                Err(e) => {
                    error!("Failed to write export: {}", e);
                    failed_count += 1;
                }
            },
            None => warn!("Scenario finished no race, nothing exported"),
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count.min(total);

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "failure_reason": r.failure_reason,
                    "metrics": r.metrics,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to render summary: {}", e),
        }
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

/// Runs one phase against a persistent database and exits.
fn run_live(args: &Args, phase: &str, config: WeekendConfig) {
    let stage: Stage = match phase.parse() {
        Ok(stage) => stage,
        Err(e) => {
            error!("{} (expected qualifying, race or post-race)", e);
            std::process::exit(2);
        }
    };
    let Some(db) = &args.db else {
        error!("--phase needs --db <path>");
        std::process::exit(2);
    };

    let fixture = LeagueFixture::new(args.seed)
        .with_leagues(args.leagues)
        .with_teams(args.teams)
        .with_races(args.races);

    match run_phase(db, stage, config, fixture) {
        Ok(run) => {
            if args.json {
                match serde_json::to_string_pretty(&run) {
                    Ok(text) => println!("{}", text),
                    Err(e) => error!("Failed to render report: {}", e),
                }
            } else {
                info!(
                    "{} done: completed={} skipped={} failed={} press={} office={}",
                    stage,
                    run.report.completed(),
                    run.report.skipped(),
                    run.report.failed(),
                    run.press_news,
                    run.office_news
                );
            }
            if run.report.failed() > 0 {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("{} failed: {}", stage, e);
            std::process::exit(1);
        }
    }
}
