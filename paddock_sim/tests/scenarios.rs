//! Every named scenario across seeds and store backends.
//!
//! Run with: cargo test -p paddock_sim --test scenarios -- --nocapture

use paddock_core::weekend::WeekendConfig;
use paddock_sim::scenarios::ScenarioId;
use paddock_sim::{ScenarioRunner, StoreKind};

fn assert_passes(runner: &ScenarioRunner, scenario: ScenarioId, seed: u64) {
    let result = runner.run(scenario);
    assert!(
        result.passed,
        "{} seed={} failed: {}",
        scenario,
        seed,
        result.failure_reason.unwrap_or_default()
    );
}

#[test]
fn test_all_scenarios_in_memory() {
    for seed in [1, 42, 7_777] {
        let runner = ScenarioRunner::new(seed);
        for scenario in ScenarioId::all() {
            assert_passes(&runner, scenario, seed);
        }
    }
}

#[test]
fn test_scenarios_with_several_leagues() {
    let runner = ScenarioRunner::new(5).with_leagues(3).with_teams(6);
    for scenario in [
        ScenarioId::FullWeekend,
        ScenarioId::PostRaceGate,
        ScenarioId::MultiLeague,
        ScenarioId::SeasonSweep,
    ] {
        assert_passes(&runner, scenario, 5);
    }
}

#[test]
fn test_scenarios_on_sled() {
    let root = std::env::temp_dir().join(format!("paddock-sled-{}", std::process::id()));
    let runner = ScenarioRunner::new(13).with_store(StoreKind::Sled(root.clone()));
    for scenario in [
        ScenarioId::FullWeekend,
        ScenarioId::ReplayGuard,
        ScenarioId::MultiLeague,
        ScenarioId::SeasonSweep,
    ] {
        assert_passes(&runner, scenario, 13);
    }
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_zero_delays_still_pass() {
    let config = WeekendConfig {
        league_stagger_secs: 0,
        post_race_delay_secs: 0,
        ..WeekendConfig::default()
    };
    let runner = ScenarioRunner::new(21).with_leagues(2).with_config(config);
    for scenario in ScenarioId::all() {
        assert_passes(&runner, scenario, 21);
    }
}

#[test]
fn test_metrics_reflect_the_run() {
    let result = ScenarioRunner::new(99).with_races(4).run(ScenarioId::SeasonSweep);
    assert!(result.passed, "{:?}", result.failure_reason);
    assert_eq!(result.metrics.races_run, 4);
    assert!(result.metrics.laps_simulated > 0);
    assert!(result.metrics.office_news >= 8 * 2 * 4);
    assert!(result.metrics.virtual_secs >= 4 * 7 * 24 * 3600);

    let outage = ScenarioRunner::new(99).run(ScenarioId::NewsOutage);
    assert!(outage.passed);
    assert_eq!(outage.metrics.press_news, 0);
    assert!(outage.metrics.failed_deliveries > 0);
}
