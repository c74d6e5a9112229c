//! Scenario runner - drives weekend phases on the virtual clock and checks
//! what they produced.

use crate::context::SimContext;
use crate::fixture::{FixtureData, LeagueFixture};
use crate::invariants::{self, ensure};
use crate::memory::MemoryStore;
use crate::newsroom::RecordingNewsroom;
use crate::scenarios::ScenarioId;
use crate::sled_store::SledStore;
use crate::store::{FixtureSink, ScenarioStore};

use paddock_core::circuit::circuit;
use paddock_core::news::NewsKind;
use paddock_core::phase::{RacePhase, RaceRecord};
use paddock_core::qualifying;
use paddock_core::setup::CAR_STAT_MAX;
use paddock_core::store::{League, LeagueStore, Team};
use paddock_core::weekend::{LeagueOutcome, PhaseReport, SkipReason, WeekendConfig, WeekendOrchestrator};
use paddock_env::{EnvError, PaddockContext, RaceId, TeamId};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// The last race the scenario finished, as stored
    pub last_race: Option<RaceRecord>,
}

impl ScenarioResult {
    fn failed(scenario: ScenarioId, seed: u64, reason: String) -> Self {
        Self {
            scenario,
            seed,
            passed: false,
            failure_reason: Some(reason),
            metrics: ScenarioMetrics::default(),
            last_race: None,
        }
    }
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioMetrics {
    /// Races simulated and checked
    pub races_run: u64,

    /// Laps checked against the full race log
    pub laps_simulated: u64,

    pub overtakes: u64,
    pub pit_stops: u64,
    pub crashes: u64,
    pub dnfs: u64,

    /// Finishers who never ran the hard compound
    pub hard_penalties: u64,

    pub press_news: u64,
    pub office_news: u64,
    pub failed_deliveries: u64,

    /// League outcomes over every phase call
    pub skipped_leagues: u64,
    pub failed_leagues: u64,

    /// Virtual time elapsed
    pub virtual_secs: u64,
}

impl ScenarioMetrics {
    fn absorb(&mut self, tally: &invariants::RaceTally) {
        self.races_run += 1;
        self.laps_simulated += tally.laps;
        self.overtakes += tally.overtakes;
        self.pit_stops += tally.pit_stops;
        self.crashes += tally.crashes;
        self.dnfs += tally.dnfs;
        self.hard_penalties += tally.hard_penalties;
    }

    fn count(&mut self, report: &PhaseReport) {
        self.skipped_leagues += report.skipped() as u64;
        self.failed_leagues += report.failed() as u64;
    }
}

/// Where scenario data lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoreKind {
    #[default]
    Memory,

    /// A sled database per scenario run under this directory
    Sled(PathBuf),
}

type Orchestrator = WeekendOrchestrator<SimContext, dyn ScenarioStore, RecordingNewsroom>;

/// Everything one scenario run works against.
struct Harness {
    context: Arc<SimContext>,
    store: Arc<dyn ScenarioStore>,
    memory: Option<Arc<MemoryStore>>,
    newsroom: Arc<RecordingNewsroom>,
    orchestrator: Orchestrator,
    fixture: FixtureData,
    config: WeekendConfig,
}

/// What a scenario observed besides pass/fail.
#[derive(Default)]
struct RunLog {
    metrics: ScenarioMetrics,
    last_race: Option<RaceRecord>,
}

fn env<T>(res: Result<T, EnvError>) -> Result<T, String> {
    res.map_err(|e| e.to_string())
}

impl Harness {
    async fn qualifying(&self, log: &mut RunLog) -> Result<PhaseReport, String> {
        let report = self.orchestrator.run_qualifying().await.map_err(|e| e.to_string())?;
        log.metrics.count(&report);
        Ok(report)
    }

    async fn race(&self, log: &mut RunLog) -> Result<PhaseReport, String> {
        let report = self.orchestrator.run_race().await.map_err(|e| e.to_string())?;
        log.metrics.count(&report);
        Ok(report)
    }

    async fn post_race(&self, log: &mut RunLog) -> Result<PhaseReport, String> {
        let report = self.orchestrator.run_post_race().await.map_err(|e| e.to_string())?;
        log.metrics.count(&report);
        Ok(report)
    }

    fn league(&self, idx: usize) -> Result<&League, String> {
        self.fixture
            .leagues
            .get(idx)
            .ok_or_else(|| format!("fixture has no league #{}", idx))
    }

    fn record(&self, race_id: &RaceId) -> Result<RaceRecord, String> {
        env(self.store.race(race_id))?.ok_or_else(|| format!("race {} not stored", race_id))
    }

    fn teams_of(&self, league: &League) -> Result<HashMap<TeamId, Team>, String> {
        Ok(env(self.store.teams(&league.team_ids()))?
            .into_iter()
            .map(|team| (team.id.clone(), team))
            .collect())
    }

    fn drivers_in(&self, league: &League) -> usize {
        let team_ids = league.team_ids();
        self.fixture
            .drivers
            .iter()
            .filter(|d| team_ids.contains(&d.team_id))
            .count()
    }

    /// Grid checks for a race whose qualifying just ran.
    fn check_qualified(&self, league: &League, race_id: &RaceId) -> Result<RaceRecord, String> {
        let record = self.record(race_id)?;
        ensure(record.has_grid(), || format!("{} has no grid after qualifying", race_id))?;
        invariants::check_grid(&record.grid)?;
        let expected = self.drivers_in(league);
        ensure(record.grid.len() == expected, || {
            format!("{} grid has {} rows, league has {} drivers", race_id, record.grid.len(), expected)
        })?;
        Ok(record)
    }

    /// Classification and playback checks for a race that just finished.
    fn check_finished(&self, race_id: &RaceId, log: &mut RunLog) -> Result<RaceRecord, String> {
        let record = self.record(race_id)?;
        ensure(record.phase == RacePhase::RaceDone, || {
            format!("{} is {} after the race phase", race_id, record.phase)
        })?;
        let result = record
            .result
            .as_ref()
            .ok_or_else(|| format!("{} finished without a result", race_id))?;
        let track = circuit(&record.circuit_id);
        let tally = invariants::check_race(result, track, &record.grid)?;

        let live = qualifying::live_duration_secs(&record.grid, track.laps);
        ensure(record.live_duration_secs == live, || {
            format!("{} live duration {} != {}", race_id, record.live_duration_secs, live)
        })?;
        ensure(record.update_interval_secs == self.config.playback_update_interval_secs, || {
            format!("{} update interval {}", race_id, record.update_interval_secs)
        })?;

        debug!("{}: {:?}", race_id, tally);
        log.metrics.absorb(&tally);
        log.last_race = Some(record.clone());
        Ok(record)
    }

    /// Reset checks after post-race processing of a league's race.
    fn check_reset(&self, league: &League, before: &HashMap<TeamId, Team>) -> Result<(), String> {
        for (team_id, team) in self.teams_of(league)? {
            let status = &team.week_status;
            ensure(!status.locked_for_processing, || format!("{} still locked", team_id))?;
            ensure(
                !status.practice_completed && !status.strategy_set && !status.sponsor_reviewed,
                || format!("{} weekly flags not reset", team_id),
            )?;
            ensure(!status.has_upgraded_this_week && status.upgrades_this_week == 0, || {
                format!("{} upgrade counters not reset", team_id)
            })?;
            ensure(status.driver_setups.is_empty(), || format!("{} setups survived the reset", team_id))?;

            let Some(prev) = before.get(&team_id) else { continue };
            for (slot, car) in team.car_stats.iter().enumerate() {
                let old = prev.car(slot).unwrap_or_default();
                ensure(
                    car.aero <= CAR_STAT_MAX && car.powertrain <= CAR_STAT_MAX && car.chassis <= CAR_STAT_MAX,
                    || format!("{} slot {} above the rating ceiling", team_id, slot),
                )?;
                if team.is_bot {
                    ensure(
                        car.aero >= old.aero && car.powertrain >= old.powertrain && car.chassis >= old.chassis,
                        || format!("bot {} slot {} lost rating", team_id, slot),
                    )?;
                } else {
                    ensure(*car == old, || format!("human {} car changed in post-race", team_id))?;
                }
            }
        }
        Ok(())
    }
}

fn expect_outcome(report: &PhaseReport, league_id: &str, expected: &LeagueOutcome) -> Result<(), String> {
    let actual = report.outcome_for(league_id);
    ensure(actual == Some(expected), || {
        format!("{} {}: expected {:?}, got {:?}", report.stage, league_id, expected, actual)
    })
}

fn expect_skipped(report: &PhaseReport, league_id: &str) -> Result<(), String> {
    let actual = report.outcome_for(league_id);
    ensure(matches!(actual, Some(LeagueOutcome::Skipped(_))), || {
        format!("{} {}: expected a skip, got {:?}", report.stage, league_id, actual)
    })
}

fn race_id_of(report: &PhaseReport, league_id: &str) -> Result<RaceId, String> {
    report
        .leagues
        .iter()
        .find(|l| l.league_id == league_id)
        .and_then(|l| l.race_id.clone())
        .ok_or_else(|| format!("{} reported no race for {}", report.stage, league_id))
}

/// Award checks: one race and the prize for every team, the race's points
/// handed out exactly once.
fn check_awards(
    config: &WeekendConfig,
    record: &RaceRecord,
    before: &HashMap<TeamId, Team>,
    after: &HashMap<TeamId, Team>,
) -> Result<(), String> {
    let Some(result) = record.result.as_ref() else {
        return Err(format!("{} has no result to award", record.id));
    };
    let classified = result.final_positions.len() - result.dnfs.len();
    let mut points = 0;
    let mut wins = 0;

    for (team_id, team) in after {
        let Some(prev) = before.get(team_id) else { continue };
        let gained = team.season.points.saturating_sub(prev.season.points);
        ensure(team.season.races == prev.season.races + 1, || {
            format!("{} has {} races, had {}", team_id, team.season.races, prev.season.races)
        })?;
        ensure(team.budget == prev.budget + config.prize.award(gained), || {
            format!("{} budget {} after {} points", team_id, team.budget, gained)
        })?;
        ensure(team.week_status.locked_for_processing, || format!("{} not locked after the race", team_id))?;
        points += gained;
        wins += team.season.wins - prev.season.wins;
    }

    let available = invariants::points_available(classified);
    ensure(points == available, || format!("{} points awarded, {} available", points, available))?;
    ensure(wins == u32::from(classified > 0), || format!("{} team wins credited", wins))?;
    Ok(())
}

/// Runs weekend scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    leagues: usize,
    teams_per_league: usize,
    races_per_season: usize,
    config: WeekendConfig,
    store: StoreKind,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            leagues: 1,
            teams_per_league: 8,
            races_per_season: 3,
            config: WeekendConfig::default(),
            store: StoreKind::Memory,
        }
    }

    pub fn with_leagues(mut self, leagues: usize) -> Self {
        self.leagues = leagues.max(1);
        self
    }

    pub fn with_teams(mut self, teams: usize) -> Self {
        self.teams_per_league = teams.max(1);
        self
    }

    pub fn with_races(mut self, races: usize) -> Self {
        self.races_per_season = races.max(1);
        self
    }

    pub fn with_config(mut self, config: WeekendConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_store(mut self, store: StoreKind) -> Self {
        self.store = store;
        self
    }

    /// Runs a scenario on a fresh single-threaded runtime.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime,
            Err(e) => return ScenarioResult::failed(scenario, self.seed, format!("Failed to start runtime: {}", e)),
        };
        runtime.block_on(self.run_async(scenario))
    }

    /// Runs a scenario on the caller's runtime.
    pub async fn run_async(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let harness = match self.harness(scenario) {
            Ok(harness) => harness,
            Err(reason) => return ScenarioResult::failed(scenario, self.seed, reason),
        };

        let mut log = RunLog::default();
        let outcome = match scenario {
            ScenarioId::FullWeekend => self.run_full_weekend(&harness, &mut log).await,
            ScenarioId::ReplayGuard => self.run_replay_guard(&harness, &mut log).await,
            ScenarioId::MissingGrid => self.run_missing_grid(&harness, &mut log).await,
            ScenarioId::PostRaceGate => self.run_post_race_gate(&harness, &mut log).await,
            ScenarioId::MultiLeague => self.run_multi_league(&harness, &mut log).await,
            ScenarioId::NewsOutage => self.run_news_outage(&harness, &mut log).await,
            ScenarioId::SeasonSweep => self.run_season_sweep(&harness, &mut log).await,
        };

        let mut metrics = log.metrics;
        metrics.virtual_secs = harness.context.now().as_secs();
        metrics.press_news = harness.newsroom.press_news().len() as u64;
        metrics.office_news = harness.newsroom.office_news().len() as u64;
        metrics.failed_deliveries = harness.newsroom.failed_deliveries();

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: outcome.is_ok(),
            failure_reason: outcome.err(),
            metrics,
            last_race: log.last_race,
        }
    }

    fn harness(&self, scenario: ScenarioId) -> Result<Harness, String> {
        let context = SimContext::shared(self.seed);
        let (store, memory) = match &self.store {
            StoreKind::Memory => {
                let memory = Arc::new(MemoryStore::new());
                let store: Arc<dyn ScenarioStore> = memory.clone();
                (store, Some(memory))
            }
            StoreKind::Sled(root) => {
                let path = root.join(format!("{}-{}", scenario.name(), self.seed));
                if path.exists() {
                    std::fs::remove_dir_all(&path)
                        .map_err(|e| format!("Failed to clear {}: {}", path.display(), e))?;
                }
                let store: Arc<dyn ScenarioStore> = Arc::new(env(SledStore::open(&path))?);
                (store, None)
            }
        };

        let leagues = match scenario {
            ScenarioId::MultiLeague => self.leagues.max(3),
            _ => self.leagues,
        };
        let fixture = env(
            LeagueFixture::new(self.seed)
                .with_leagues(leagues)
                .with_teams(self.teams_per_league)
                .with_races(self.races_per_season)
                .seed_into(store.as_ref()),
        )?;

        let newsroom = Arc::new(match scenario {
            ScenarioId::NewsOutage => RecordingNewsroom::failing(),
            _ => RecordingNewsroom::new(),
        });
        let orchestrator = WeekendOrchestrator::new(
            Arc::clone(&context),
            Arc::clone(&store),
            Arc::clone(&newsroom),
            self.config.clone(),
        );

        Ok(Harness {
            context,
            store,
            memory,
            newsroom,
            orchestrator,
            fixture,
            config: self.config.clone(),
        })
    }

    /// WK-001: FullWeekend - one weekend end to end.
    ///
    /// **Assertion**: sorted grid, one pole, classification 1..n with DNFs
    /// last, points and prize paid once, teams locked until post-race,
    /// then flags reset and the lock released.
    async fn run_full_weekend(&self, h: &Harness, log: &mut RunLog) -> Result<(), String> {
        info!("WK-001: FullWeekend");
        let league = h.league(0)?;
        let before = h.teams_of(league)?;

        let quali = h.qualifying(log).await?;
        ensure(quali.completed() == h.fixture.leagues.len(), || {
            format!("qualifying completed {} of {} leagues", quali.completed(), h.fixture.leagues.len())
        })?;
        let race_id = race_id_of(&quali, &league.id)?;
        let record = h.check_qualified(league, &race_id)?;

        let pole = qualifying::pole(&record.grid);
        let pole_news = h
            .newsroom
            .press_of_kind(NewsKind::Pole)
            .iter()
            .filter(|n| n.league_id == league.id)
            .count();
        ensure(pole_news == usize::from(pole.is_some()), || {
            format!("{} pole announcements for {}", pole_news, league.id)
        })?;
        if let Some(pole) = pole {
            let driver = env(h.store.driver(&pole.driver_id))?
                .ok_or_else(|| format!("pole sitter {} missing", pole.driver_id))?;
            ensure(driver.career.poles == 1, || format!("pole sitter has {} poles", driver.career.poles))?;
        }
        for team_id in before.keys() {
            let reports = h.newsroom.office_for(team_id);
            ensure(reports.iter().filter(|n| n.kind == NewsKind::QualifyingResult).count() == 1, || {
                format!("{} did not get exactly one qualifying report", team_id)
            })?;
        }

        let race = h.race(log).await?;
        expect_outcome(&race, &league.id, &LeagueOutcome::Completed)?;
        let record = h.check_finished(&race_id, log)?;
        let after = h.teams_of(league)?;
        check_awards(&h.config, &record, &before, &after)?;

        let season = env(h.store.season(&record.season_id))?
            .ok_or_else(|| format!("season {} missing", record.season_id))?;
        ensure(
            season.calendar.iter().any(|e| e.id == record.event_id && e.completed),
            || format!("calendar entry {} not completed", record.event_id),
        )?;
        for team_id in after.keys() {
            ensure(
                h.newsroom.office_for(team_id).iter().any(|n| n.kind == NewsKind::RaceResult),
                || format!("{} got no race report", team_id),
            )?;
        }

        h.context.advance_time(h.config.post_race_delay());
        let post = h.post_race(log).await?;
        expect_outcome(&post, &league.id, &LeagueOutcome::Completed)?;
        h.check_reset(league, &after)?;
        let record = h.record(&race_id)?;
        ensure(record.post_race_processed(), || format!("{} is {}", race_id, record.phase))?;
        Ok(())
    }

    /// WK-002: ReplayGuard - every phase invoked twice.
    ///
    /// The race replay runs against a calendar that still lists the race as
    /// pending, as if the previous run stopped right after storing it.
    ///
    /// **Assertion**: replays skip and leave records and stats unchanged.
    async fn run_replay_guard(&self, h: &Harness, log: &mut RunLog) -> Result<(), String> {
        info!("WK-002: ReplayGuard");
        let league = h.league(0)?;
        let season = h
            .fixture
            .seasons
            .iter()
            .find(|s| Some(&s.id) == league.current_season_id.as_ref())
            .cloned()
            .ok_or_else(|| format!("no fixture season for {}", league.id))?;

        let first = h.qualifying(log).await?;
        expect_outcome(&first, &league.id, &LeagueOutcome::Completed)?;
        let race_id = race_id_of(&first, &league.id)?;
        let grid = h.check_qualified(league, &race_id)?;
        let teams = h.teams_of(league)?;

        let again = h.qualifying(log).await?;
        expect_outcome(&again, &league.id, &LeagueOutcome::Skipped(SkipReason::AlreadyProcessed))?;
        ensure(h.record(&race_id)? == grid, || "qualifying replay rewrote the grid".to_string())?;
        ensure(h.teams_of(league)? == teams, || "qualifying replay touched team stats".to_string())?;

        let race = h.race(log).await?;
        expect_outcome(&race, &league.id, &LeagueOutcome::Completed)?;
        let finished = h.check_finished(&race_id, log)?;
        let teams = h.teams_of(league)?;

        // Calendar still pending: the replay finds the finished record.
        env(h.store.insert_season(season))?;
        let again = h.race(log).await?;
        expect_outcome(&again, &league.id, &LeagueOutcome::Skipped(SkipReason::AlreadyProcessed))?;
        ensure(h.record(&race_id)? == finished, || "race replay rewrote the result".to_string())?;
        ensure(h.teams_of(league)? == teams, || "race replay awarded twice".to_string())?;

        h.context.advance_time(h.config.post_race_delay());
        let post = h.post_race(log).await?;
        expect_outcome(&post, &league.id, &LeagueOutcome::Completed)?;
        let reset = h.teams_of(league)?;

        let again = h.post_race(log).await?;
        ensure(again.outcome_for(&league.id).is_none(), || {
            format!("processed race offered again: {:?}", again.outcome_for(&league.id))
        })?;
        ensure(h.teams_of(league)? == reset, || "post-race replay touched teams".to_string())?;
        Ok(())
    }

    /// WK-003: MissingGrid - race phase before qualifying.
    ///
    /// **Assertion**: the league is skipped with nothing written, and the
    /// weekend then runs normally.
    async fn run_missing_grid(&self, h: &Harness, log: &mut RunLog) -> Result<(), String> {
        info!("WK-003: MissingGrid");
        let league = h.league(0)?;
        let before = h.teams_of(league)?;

        let early = h.race(log).await?;
        ensure(
            matches!(early.outcome_for(&league.id), Some(LeagueOutcome::Skipped(SkipReason::MissingData(_)))),
            || format!("race without grid: {:?}", early.outcome_for(&league.id)),
        )?;
        let race_id = race_id_of(&early, &league.id)?;
        ensure(env(h.store.race(&race_id))?.is_none(), || format!("{} written without a grid", race_id))?;
        ensure(h.teams_of(league)? == before, || "skipped race touched teams".to_string())?;

        let quali = h.qualifying(log).await?;
        expect_outcome(&quali, &league.id, &LeagueOutcome::Completed)?;
        h.check_qualified(league, &race_id)?;

        let race = h.race(log).await?;
        expect_outcome(&race, &league.id, &LeagueOutcome::Completed)?;
        h.check_finished(&race_id, log)?;
        Ok(())
    }

    /// WK-004: PostRaceGate - post-race waits for its scheduled time.
    ///
    /// **Assertion**: not due one second early, teams stay locked; due at
    /// the scheduled time, teams released.
    async fn run_post_race_gate(&self, h: &Harness, log: &mut RunLog) -> Result<(), String> {
        info!("WK-004: PostRaceGate");
        let league = h.league(0)?;

        let quali = h.qualifying(log).await?;
        expect_outcome(&quali, &league.id, &LeagueOutcome::Completed)?;
        let race_id = race_id_of(&quali, &league.id)?;

        let started = h.context.system_time();
        let race = h.race(log).await?;
        expect_outcome(&race, &league.id, &LeagueOutcome::Completed)?;
        let record = h.check_finished(&race_id, log)?;
        let due = record
            .post_race_at
            .ok_or_else(|| format!("{} has no post-race time", race_id))?;
        ensure(due == started + h.config.post_race_delay(), || {
            format!("{} post-race scheduled at {:?}", race_id, due)
        })?;
        let locked = h.teams_of(league)?;

        let wait = due.duration_since(h.context.system_time()).unwrap_or_default();
        if wait >= Duration::from_secs(1) {
            h.context.advance_time(wait - Duration::from_secs(1));
            let early = h.post_race(log).await?;
            expect_outcome(&early, &league.id, &LeagueOutcome::Skipped(SkipReason::NotYetDue))?;
            ensure(h.teams_of(league)? == locked, || "teams changed before post-race".to_string())?;
            h.context.advance_time(Duration::from_secs(1));
        } else {
            warn!("Post-race delay under a second, gate not exercised");
        }

        let post = h.post_race(log).await?;
        expect_outcome(&post, &league.id, &LeagueOutcome::Completed)?;
        h.check_reset(league, &locked)?;
        Ok(())
    }

    /// WK-005: MultiLeague - failure isolation and stagger.
    ///
    /// Adds a league pointing at a missing season and one without a season;
    /// with the in-memory store one healthy league's store reads also fail.
    ///
    /// **Assertion**: broken leagues are skipped or failed, every other
    /// league completes, and leagues are started one stagger apart.
    async fn run_multi_league(&self, h: &Harness, log: &mut RunLog) -> Result<(), String> {
        info!("WK-005: MultiLeague");
        let orphan = League {
            id: "league-orphan".into(),
            name: "Orphan League".into(),
            divisions: Vec::new(),
            current_season_id: Some("season-orphan".into()),
        };
        let idle = League {
            id: "league-idle".into(),
            name: "Idle League".into(),
            divisions: Vec::new(),
            current_season_id: None,
        };
        env(h.store.insert_league(orphan.clone()))?;
        env(h.store.insert_league(idle.clone()))?;

        let broken = match &h.memory {
            Some(memory) => {
                let league = h.league(1)?;
                let team_id = league
                    .team_ids()
                    .into_iter()
                    .next()
                    .ok_or_else(|| format!("{} has no teams", league.id))?;
                memory.fail_team(&team_id);
                Some(league.id.clone())
            }
            None => {
                warn!("Store fault injection needs the in-memory store");
                None
            }
        };
        let healthy: Vec<&League> = h
            .fixture
            .leagues
            .iter()
            .filter(|l| Some(&l.id) != broken.as_ref())
            .collect();

        let started = h.context.now();
        let quali = h.qualifying(log).await?;
        let elapsed = h.context.now() - started;
        let expected = h.config.league_stagger() * (quali.leagues.len().saturating_sub(1) as u32);
        ensure(elapsed == expected, || format!("qualifying took {:?}, stagger implies {:?}", elapsed, expected))?;

        for league in &healthy {
            expect_outcome(&quali, &league.id, &LeagueOutcome::Completed)?;
        }
        if let Some(broken) = &broken {
            ensure(matches!(quali.outcome_for(broken), Some(LeagueOutcome::Failed(_))), || {
                format!("broken league: {:?}", quali.outcome_for(broken))
            })?;
        }
        ensure(
            matches!(quali.outcome_for(&orphan.id), Some(LeagueOutcome::Skipped(SkipReason::MissingData(_)))),
            || format!("orphan league: {:?}", quali.outcome_for(&orphan.id)),
        )?;
        expect_outcome(&quali, &idle.id, &LeagueOutcome::Skipped(SkipReason::NoPendingRace))?;

        let race = h.race(log).await?;
        for league in &healthy {
            expect_outcome(&race, &league.id, &LeagueOutcome::Completed)?;
            h.check_finished(&race_id_of(&race, &league.id)?, log)?;
        }
        if let Some(broken) = &broken {
            expect_skipped(&race, broken)?;
        }

        h.context.advance_time(h.config.post_race_delay());
        let post = h.post_race(log).await?;
        ensure(post.completed() == healthy.len(), || {
            format!("post-race completed {} of {} races", post.completed(), healthy.len())
        })?;
        Ok(())
    }

    /// WK-006: NewsOutage - every delivery fails.
    ///
    /// **Assertion**: phases complete regardless and failures are counted.
    async fn run_news_outage(&self, h: &Harness, log: &mut RunLog) -> Result<(), String> {
        info!("WK-006: NewsOutage");
        let league = h.league(0)?;

        let quali = h.qualifying(log).await?;
        expect_outcome(&quali, &league.id, &LeagueOutcome::Completed)?;
        let race_id = race_id_of(&quali, &league.id)?;
        let race = h.race(log).await?;
        expect_outcome(&race, &league.id, &LeagueOutcome::Completed)?;
        h.check_finished(&race_id, log)?;

        h.context.advance_time(h.config.post_race_delay());
        let post = h.post_race(log).await?;
        expect_outcome(&post, &league.id, &LeagueOutcome::Completed)?;

        ensure(h.newsroom.press_news().is_empty() && h.newsroom.office_news().is_empty(), || {
            "news delivered while offline".to_string()
        })?;
        ensure(h.newsroom.failed_deliveries() > 0, || "no delivery was attempted".to_string())?;
        Ok(())
    }

    /// WK-007: SeasonSweep - the full calendar, one weekend per week.
    ///
    /// **Assertion**: every calendar entry completed, team and driver
    /// totals agree, budgets match the prize formula.
    async fn run_season_sweep(&self, h: &Harness, log: &mut RunLog) -> Result<(), String> {
        info!("WK-007: SeasonSweep");
        let week = Duration::from_secs(7 * 24 * 3600);
        let mut points_handed_out = 0u32;
        let mut poles = 0u32;

        for round in 0..self.races_per_season {
            debug!("Round {}", round + 1);
            let quali = h.qualifying(log).await?;
            let race = h.race(log).await?;
            for league in &h.fixture.leagues {
                expect_outcome(&quali, &league.id, &LeagueOutcome::Completed)?;
                expect_outcome(&race, &league.id, &LeagueOutcome::Completed)?;
                let record = h.check_finished(&race_id_of(&race, &league.id)?, log)?;
                if let Some(result) = &record.result {
                    points_handed_out += invariants::points_available(result.final_positions.len() - result.dnfs.len());
                }
                poles += u32::from(qualifying::pole(&record.grid).is_some());
            }
            h.context.advance_time(h.config.post_race_delay());
            let post = h.post_race(log).await?;
            ensure(post.completed() == h.fixture.leagues.len(), || {
                format!("round {} post-race completed {}", round + 1, post.completed())
            })?;
            h.context.advance_time(week);
        }

        let done = h.qualifying(log).await?;
        for league in &h.fixture.leagues {
            expect_outcome(&done, &league.id, &LeagueOutcome::Skipped(SkipReason::NoPendingRace))?;
        }
        for season in &h.fixture.seasons {
            let stored = env(h.store.season(&season.id))?.ok_or_else(|| format!("season {} missing", season.id))?;
            ensure(stored.next_pending().is_none(), || format!("season {} has pending races", season.id))?;
        }

        let races = self.races_per_season as u32;
        let mut team_points = 0;
        for original in &h.fixture.teams {
            let team = env(h.store.team(&original.id))?.ok_or_else(|| format!("team {} missing", original.id))?;
            ensure(team.season.races == races, || format!("{} raced {} times", team.id, team.season.races))?;
            let expected_budget = original.budget
                + h.config.prize.base * u64::from(races)
                + h.config.prize.per_point * u64::from(team.season.points);
            ensure(team.budget == expected_budget, || {
                format!("{} budget {} expected {}", team.id, team.budget, expected_budget)
            })?;
            team_points += team.season.points;
        }

        let mut driver_points = 0;
        let mut driver_poles = 0;
        for original in &h.fixture.drivers {
            let driver =
                env(h.store.driver(&original.id))?.ok_or_else(|| format!("driver {} missing", original.id))?;
            ensure(driver.career.points == driver.season.points, || {
                format!("{} career and season points diverged", driver.id)
            })?;
            driver_points += driver.season.points;
            driver_poles += driver.career.poles;
        }

        ensure(team_points == points_handed_out && driver_points == points_handed_out, || {
            format!(
                "points: teams {} drivers {} handed out {}",
                team_points, driver_points, points_handed_out
            )
        })?;
        ensure(driver_poles == poles, || format!("{} poles credited, {} taken", driver_poles, poles))?;
        Ok(())
    }
}
