//! Weekend orchestrator: qualifying, race and post-race phases across every
//! active league.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     WeekendOrchestrator                      │
//! │                                                              │
//! │   run_qualifying ──► run_race ──► (delay) ──► run_post_race  │
//! │         │               │                          │         │
//! │   ┌─────▼───────────────▼──────────────────────────▼─────┐   │
//! │   │   RaceRecord phase marker (NotStarted → PostRaceDone) │   │
//! │   └───────────────────────────────────────────────────────┘   │
//! │                                                              │
//! │   Context: clock, stagger sleep, per-race RNG streams        │
//! │   LeagueStore: blocking reads/writes                         │
//! │   Newsroom: press + office notifications                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each league is an independent unit of work. A league that is missing
//! data, already processed or not yet due is skipped; a league that fails is
//! logged and reported. Neither stops the remaining leagues.

use crate::circuit::{circuit, CircuitProfile};
use crate::entrant::RaceEntrant;
use crate::error::{PhaseError, WeekendError};
use crate::news::{self, Newsroom, OfficeNews, PressNews, RaceReportLine};
use crate::phase::{RacePhase, RaceRecord, TeamReset};
use crate::qualifying::{self, QualifyingEntry};
use crate::race::simulate_race;
use crate::role::ManagerRole;
use crate::scoring::{score_race, PrizeScheme, ScoreSheet};
use crate::setup::{CarStats, CAR_SLOTS, CAR_STAT_MAX};
use crate::store::{CalendarEntry, CareerStats, League, LeagueStore, Season, Team};
use crate::strategy::{resolve_qualifying_setup, resolve_race_setup};

use paddock_env::{DriverId, EnvError, PaddockContext, RaceId, RandomSource, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Tunables of the weekend engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekendConfig {
    /// Pause between consecutive leagues within one phase invocation
    pub league_stagger_secs: u64,

    /// Time between a race finishing and its post-race reset
    pub post_race_delay_secs: u64,

    /// Playback refresh interval stored with race results
    pub playback_update_interval_secs: u64,

    pub prize: PrizeScheme,

    /// Per-stat, per-slot chance that a bot car gains a rating point
    pub bot_upgrade_chance: f64,
}

impl Default for WeekendConfig {
    fn default() -> Self {
        Self {
            league_stagger_secs: 5 * 60,
            post_race_delay_secs: 60 * 60,
            playback_update_interval_secs: 120,
            prize: PrizeScheme::default(),
            bot_upgrade_chance: 0.3,
        }
    }
}

impl WeekendConfig {
    pub fn league_stagger(&self) -> Duration {
        Duration::from_secs(self.league_stagger_secs)
    }

    pub fn post_race_delay(&self) -> Duration {
        Duration::from_secs(self.post_race_delay_secs)
    }
}

/// Which phase an invocation ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Qualifying,
    Race,
    PostRace,
}

impl Stage {
    fn stream_tag(self) -> u64 {
        match self {
            Stage::Qualifying => 0x51,
            Stage::Race => 0x52,
            Stage::PostRace => 0x53,
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qualifying" | "quali" => Ok(Stage::Qualifying),
            "race" => Ok(Stage::Race),
            "post-race" | "post_race" | "postrace" => Ok(Stage::PostRace),
            _ => Err(format!("Unknown phase: {}", s)),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Qualifying => "qualifying",
            Stage::Race => "race",
            Stage::PostRace => "post-race",
        })
    }
}

/// Why a league did no work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The league has no current season or every calendar entry is done
    NoPendingRace,
    AlreadyProcessed,
    NotYetDue,
    MissingData(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeagueOutcome {
    Completed,
    Skipped(SkipReason),
    Failed(String),
}

impl From<WeekendError> for LeagueOutcome {
    fn from(err: WeekendError) -> Self {
        match err {
            WeekendError::MissingData(what) => LeagueOutcome::Skipped(SkipReason::MissingData(what)),
            WeekendError::Env(EnvError::NotFound(what)) => LeagueOutcome::Skipped(SkipReason::MissingData(what)),
            WeekendError::Phase(PhaseError::AlreadyProcessed { .. }) => {
                LeagueOutcome::Skipped(SkipReason::AlreadyProcessed)
            }
            WeekendError::Phase(err @ PhaseError::NotReady { .. }) => {
                LeagueOutcome::Skipped(SkipReason::MissingData(err.to_string()))
            }
            other => LeagueOutcome::Failed(other.to_string()),
        }
    }
}

/// Outcome of one league (or one race, for post-race) in a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueReport {
    pub league_id: String,
    pub race_id: Option<RaceId>,
    pub outcome: LeagueOutcome,
}

/// Outcome of one phase invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub stage: Stage,
    pub leagues: Vec<LeagueReport>,
}

impl PhaseReport {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            leagues: Vec::new(),
        }
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, LeagueOutcome::Completed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, LeagueOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, LeagueOutcome::Failed(_)))
    }

    pub fn outcome_for(&self, league_id: &str) -> Option<&LeagueOutcome> {
        self.leagues.iter().find(|l| l.league_id == league_id).map(|l| &l.outcome)
    }

    fn count(&self, pred: impl Fn(&LeagueOutcome) -> bool) -> usize {
        self.leagues.iter().filter(|l| pred(&l.outcome)).count()
    }
}

/// The calendar slot a league is currently working on.
struct Weekend {
    season: Season,
    entry: CalendarEntry,
    race_id: RaceId,
}

impl Weekend {
    fn circuit(&self) -> &'static CircuitProfile {
        circuit(&self.entry.circuit_id)
    }
}

fn fnv1a(key: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in key.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Stable RNG stream for one phase of one race.
fn stream_for(race_id: &RaceId, stage: Stage) -> u64 {
    fnv1a(race_id.as_str()) ^ stage.stream_tag()
}

/// Treats an update of a record that no longer exists as done.
fn skip_missing(result: Result<(), EnvError>) -> Result<(), EnvError> {
    match result {
        Err(EnvError::NotFound(what)) => {
            warn!("{} no longer exists, update skipped", what);
            Ok(())
        }
        other => other,
    }
}

/// Rolls the weekly upgrades of a bot team. Returns the new ratings if any
/// stat went up.
pub fn roll_bot_upgrades<R: RandomSource + ?Sized>(
    car_stats: &[CarStats],
    chance: f64,
    rng: &mut R,
) -> Option<Vec<CarStats>> {
    let mut upgraded = false;
    let mut cars: Vec<CarStats> = (0..CAR_SLOTS.max(car_stats.len()))
        .map(|slot| car_stats.get(slot).copied().unwrap_or_default())
        .collect();

    for car in cars.iter_mut().take(CAR_SLOTS) {
        for stat in [&mut car.aero, &mut car.powertrain, &mut car.chassis] {
            if rng.chance(chance) {
                *stat = (*stat + 1).min(CAR_STAT_MAX);
                upgraded = true;
            }
        }
    }
    upgraded.then_some(cars)
}

/// Runs weekend phases against a store and a newsroom.
///
/// Generic over the context so the same code runs with the tokio clock in
/// production and the virtual clock in simulation.
pub struct WeekendOrchestrator<Ctx, S, N>
where
    Ctx: PaddockContext,
    S: LeagueStore + ?Sized,
    N: Newsroom,
{
    context: Arc<Ctx>,
    store: Arc<S>,
    newsroom: Arc<N>,
    config: WeekendConfig,
}

impl<Ctx, S, N> WeekendOrchestrator<Ctx, S, N>
where
    Ctx: PaddockContext,
    S: LeagueStore + ?Sized,
    N: Newsroom,
{
    pub fn new(context: Arc<Ctx>, store: Arc<S>, newsroom: Arc<N>, config: WeekendConfig) -> Self {
        Self {
            context,
            store,
            newsroom,
            config,
        }
    }

    pub fn config(&self) -> &WeekendConfig {
        &self.config
    }

    /// Qualifying phase for every active league.
    pub async fn run_qualifying(&self) -> Result<PhaseReport, WeekendError> {
        self.run_leagues(Stage::Qualifying, |league, weekend| self.qualify(league, weekend))
            .await
    }

    /// Race phase for every active league.
    pub async fn run_race(&self) -> Result<PhaseReport, WeekendError> {
        self.run_leagues(Stage::Race, |league, weekend| self.race(league, weekend))
            .await
    }

    /// Post-race reset for every finished, unprocessed race whose scheduled
    /// time has passed. Not staggered: the work per race is small.
    pub async fn run_post_race(&self) -> Result<PhaseReport, WeekendError> {
        info!("=== POST-RACE START ===");
        let started = self.context.now();
        let mut report = PhaseReport::new(Stage::PostRace);
        let now = self.context.system_time();

        for record in self.store.races_awaiting_post_race()? {
            let league_id = record.league_id.clone();
            let race_id = record.id.clone();
            let outcome = if record.post_race_due(now) {
                self.post_race(record).map_or_else(LeagueOutcome::from, |_| LeagueOutcome::Completed)
            } else {
                LeagueOutcome::Skipped(SkipReason::NotYetDue)
            };
            log_outcome(Stage::PostRace, &league_id, Some(&race_id), &outcome);
            report.leagues.push(LeagueReport {
                league_id,
                race_id: Some(race_id),
                outcome,
            });
        }

        info!(
            "=== POST-RACE END === completed={} skipped={} failed={} elapsed={:?}",
            report.completed(),
            report.skipped(),
            report.failed(),
            self.context.now().saturating_sub(started)
        );
        Ok(report)
    }

    async fn run_leagues<F>(&self, stage: Stage, mut work: F) -> Result<PhaseReport, WeekendError>
    where
        F: FnMut(&League, &Weekend) -> Result<(), WeekendError>,
    {
        info!("=== {} START ===", stage.to_string().to_uppercase());
        let started = self.context.now();
        let leagues = self.store.active_leagues()?;
        let mut report = PhaseReport::new(stage);

        for (idx, league) in leagues.iter().enumerate() {
            if idx > 0 {
                self.context.sleep(self.config.league_stagger()).await;
            }

            let (race_id, outcome) = match self.locate(league) {
                Ok(Some(weekend)) => {
                    let outcome = work(league, &weekend).map_or_else(LeagueOutcome::from, |_| LeagueOutcome::Completed);
                    (Some(weekend.race_id), outcome)
                }
                Ok(None) => (None, LeagueOutcome::Skipped(SkipReason::NoPendingRace)),
                Err(err) => (None, LeagueOutcome::from(err)),
            };

            log_outcome(stage, &league.id, race_id.as_ref(), &outcome);
            report.leagues.push(LeagueReport {
                league_id: league.id.clone(),
                race_id,
                outcome,
            });
        }

        info!(
            "=== {} END === completed={} skipped={} failed={} elapsed={:?}",
            stage.to_string().to_uppercase(),
            report.completed(),
            report.skipped(),
            report.failed(),
            self.context.now().saturating_sub(started)
        );
        Ok(report)
    }

    /// Finds the league's current season and its next pending race.
    fn locate(&self, league: &League) -> Result<Option<Weekend>, WeekendError> {
        let Some(season_id) = league.current_season_id.as_deref() else {
            return Ok(None);
        };
        let season = self
            .store
            .season(season_id)?
            .ok_or_else(|| WeekendError::missing(format!("season {}", season_id)))?;
        let Some(entry) = season.next_pending().cloned() else {
            return Ok(None);
        };
        let race_id = season.race_id(&entry);
        Ok(Some(Weekend { season, entry, race_id }))
    }

    fn role_of(&self, team: &Team) -> Result<ManagerRole, WeekendError> {
        let Some(manager_id) = team.manager_id.as_deref() else {
            return Ok(ManagerRole::None);
        };
        Ok(self.store.manager(manager_id)?.map(|m| m.role).unwrap_or_default())
    }

    fn qualify(&self, league: &League, weekend: &Weekend) -> Result<(), WeekendError> {
        let existing = self.store.race(&weekend.race_id)?;
        if existing.as_ref().map(|r| r.has_grid()).unwrap_or(false) {
            return Err(PhaseError::AlreadyProcessed {
                race_id: weekend.race_id.clone(),
                phase: RacePhase::QualifyingDone,
            }
            .into());
        }
        let mut record = existing.unwrap_or_else(|| RaceRecord::new(&league.id, &weekend.season, &weekend.entry));

        let team_ids = league.team_ids();
        if team_ids.is_empty() {
            return Err(WeekendError::missing(format!("league {} has no teams", league.id)));
        }

        info!("Qualifying: {} - {}", league.name, weekend.entry.track_name);
        let circuit = weekend.circuit();
        let mut rng = self.context.derive_rng(stream_for(&weekend.race_id, Stage::Qualifying));

        let mut entries = Vec::new();
        for team in self.store.teams(&team_ids)? {
            let role = self.role_of(&team)?;
            for driver in self.store.team_drivers(&team.id)? {
                let resolved = resolve_qualifying_setup(
                    circuit,
                    team.is_bot,
                    team.week_status.submission(&driver.id),
                    rng.as_mut(),
                );
                entries.push(QualifyingEntry {
                    driver_id: driver.id.clone(),
                    driver_name: driver.name.clone(),
                    team_id: team.id.clone(),
                    team_name: team.name.clone(),
                    car: team.car(driver.car_slot),
                    driver: driver.stats,
                    setup: resolved.setup,
                    role,
                    setup_submitted: resolved.submitted,
                });
            }
        }
        if entries.is_empty() {
            return Err(WeekendError::missing(format!("league {} has no drivers", league.id)));
        }

        let grid = qualifying::run_qualifying(circuit, &entries, rng.as_mut());
        record.record_qualifying(grid)?;
        self.store.put_race(&record)?;
        debug!("Grid stored for {} ({} drivers)", record.id, record.grid.len());

        if let Some(pole) = qualifying::pole(&record.grid) {
            self.store.add_driver_stats(&pole.driver_id, &CareerStats::pole())?;
            self.store.add_team_stats(&pole.team_id, &CareerStats::pole(), 0)?;
            self.send_press(news::pole_news(&league.id, &record.track_name, pole));
        }

        for (team_id, rows) in group_by_team(&record.grid, |row| &row.team_id) {
            self.send_office(news::qualifying_report(&team_id, &rows));
        }
        Ok(())
    }

    fn race(&self, league: &League, weekend: &Weekend) -> Result<(), WeekendError> {
        let mut record = self
            .store
            .race(&weekend.race_id)?
            .ok_or_else(|| WeekendError::missing(format!("no qualifying grid for {}", weekend.race_id)))?;
        if record.is_settled() {
            return Err(PhaseError::AlreadyProcessed {
                race_id: record.id.clone(),
                phase: RacePhase::RaceDone,
            }
            .into());
        }
        if record.is_finished() {
            warn!("Race {} finished but not fully settled, resuming", record.id);
            return self.settle(league, weekend, &mut record);
        }
        if !record.has_grid() {
            return Err(WeekendError::missing(format!("no qualifying grid for {}", record.id)));
        }

        info!("Race: {} - {}", league.name, weekend.entry.track_name);
        let circuit = weekend.circuit();
        let mut rng = self.context.derive_rng(stream_for(&record.id, Stage::Race));

        let team_ids: Vec<TeamId> = unique(record.grid.iter().map(|row| row.team_id.clone()));
        let teams: HashMap<TeamId, Team> = self
            .store
            .teams(&team_ids)?
            .into_iter()
            .map(|team| (team.id.clone(), team))
            .collect();
        let mut roles = HashMap::new();
        for team in teams.values() {
            roles.insert(team.id.clone(), self.role_of(team)?);
        }

        let mut entrants = Vec::with_capacity(record.grid.len());
        for row in &record.grid {
            let Some(driver) = self.store.driver(&row.driver_id)? else {
                warn!("Driver {} on the grid of {} no longer exists", row.driver_id, record.id);
                continue;
            };
            let team = teams.get(&row.team_id);
            let setup = resolve_race_setup(
                circuit,
                team.map(|t| t.is_bot).unwrap_or(false),
                team.and_then(|t| t.week_status.submission(&row.driver_id)),
                row.compound,
                rng.as_mut(),
            );
            entrants.push(RaceEntrant {
                driver_id: driver.id.clone(),
                name: driver.name.clone(),
                team_id: row.team_id.clone(),
                car: team.and_then(|t| t.car(driver.car_slot)),
                driver: driver.stats,
                setup,
                role: roles.get(&row.team_id).copied().unwrap_or_default(),
            });
        }
        if entrants.is_empty() {
            return Err(WeekendError::missing(format!("no drivers for {}", record.id)));
        }

        let result = simulate_race(circuit, &entrants, rng.as_mut());
        let live_duration = qualifying::live_duration_secs(&record.grid, circuit.laps);
        let post_race_at = self.context.system_time() + self.config.post_race_delay();

        // The finished marker goes in first; every write after it is listed
        // in the record's progress so a retry picks up where this one stopped.
        record.record_race(result, live_duration, self.config.playback_update_interval_secs, post_race_at)?;
        self.store.put_race(&record)?;
        self.settle(league, weekend, &mut record)
    }

    /// Locks the grid's teams, awards the result and completes the calendar
    /// entry, skipping whatever `record.progress` already lists. News goes
    /// out once all of it is stored.
    fn settle(&self, league: &League, weekend: &Weekend, record: &mut RaceRecord) -> Result<(), WeekendError> {
        let sheet = {
            let result = record
                .result
                .as_ref()
                .ok_or_else(|| WeekendError::missing(format!("no race result for {}", record.id)))?;
            let entrant_teams: HashMap<DriverId, TeamId> = record
                .grid
                .iter()
                .filter(|row| result.final_positions.contains_key(&row.driver_id))
                .map(|row| (row.driver_id.clone(), row.team_id.clone()))
                .collect();
            score_race(result, &entrant_teams, &self.config.prize)
        };

        for team_id in unique(record.grid.iter().map(|row| row.team_id.clone())) {
            if record.progress.teams_locked.contains(&team_id) {
                continue;
            }
            skip_missing(self.store.set_team_locked(&team_id, true))?;
            record.progress.teams_locked.insert(team_id);
            self.store.put_race(record)?;
        }

        self.award(&sheet, record)?;

        if !record.progress.calendar_completed {
            self.store.complete_calendar_entry(&weekend.season.id, &weekend.entry.id)?;
            record.progress.calendar_completed = true;
            self.store.put_race(record)?;
        }

        let names: HashMap<&DriverId, &str> = record
            .grid
            .iter()
            .map(|row| (&row.driver_id, row.driver_name.as_str()))
            .collect();
        let team_names: HashMap<&TeamId, &str> = record
            .grid
            .iter()
            .map(|row| (&row.team_id, row.team_name.as_str()))
            .collect();

        if let Some(winner) = sheet.winner() {
            self.send_press(news::winner_news(
                &league.id,
                &record.track_name,
                names.get(&winner.driver_id).copied().unwrap_or_default(),
                team_names.get(&winner.team_id).copied().unwrap_or(winner.team_id.as_str()),
            ));
        }

        for (team_id, scores) in group_by_team(&sheet.drivers, |score| &score.team_id) {
            let lines: Vec<RaceReportLine> = scores
                .iter()
                .map(|score| RaceReportLine {
                    driver_name: names.get(&score.driver_id).copied().unwrap_or_default().to_string(),
                    position: (!score.dnf).then_some(score.position),
                    points: score.points,
                })
                .collect();
            let prize = sheet.teams.get(&team_id).map(|t| t.prize).unwrap_or_default();
            self.send_office(news::race_report(&team_id, &record.track_name, &lines, prize));
        }

        info!("Race complete: {} (post-race due in {:?})", record.id, self.config.post_race_delay());
        Ok(())
    }

    /// Writes a race's counters and prize money. Retired drivers get no
    /// update; every team gets its race and its prize.
    fn award(&self, sheet: &ScoreSheet, record: &mut RaceRecord) -> Result<(), WeekendError> {
        for score in sheet.drivers.iter().filter(|s| !s.dnf) {
            if record.progress.drivers_awarded.contains(&score.driver_id) {
                continue;
            }
            let delta = CareerStats {
                races: 1,
                points: score.points,
                wins: score.win as u32,
                podiums: score.podium as u32,
                poles: 0,
            };
            skip_missing(self.store.add_driver_stats(&score.driver_id, &delta))?;
            record.progress.drivers_awarded.insert(score.driver_id.clone());
            self.store.put_race(record)?;
        }
        for (team_id, team) in &sheet.teams {
            if record.progress.teams_awarded.contains(team_id) {
                continue;
            }
            let delta = CareerStats {
                races: 1,
                points: team.points,
                wins: team.wins,
                podiums: team.podiums,
                poles: 0,
            };
            skip_missing(self.store.add_team_stats(team_id, &delta, team.prize))?;
            record.progress.teams_awarded.insert(team_id.clone());
            self.store.put_race(record)?;
        }
        Ok(())
    }

    /// Weekly reset of every team that raced plus bot upgrades.
    ///
    /// The targets are planned once and stored on the record before any is
    /// written. The writes set absolute values, so a retry applies the same
    /// plan again instead of rolling a second time.
    fn post_race(&self, mut record: RaceRecord) -> Result<(), WeekendError> {
        info!("Post-race processing: {}", record.id);
        let plan = match record.progress.post_race_plan.clone() {
            Some(plan) => {
                warn!("Resuming post-race of {} from its stored plan", record.id);
                plan
            }
            None => {
                let plan = self.plan_post_race(&record)?;
                record.progress.post_race_plan = Some(plan.clone());
                self.store.put_race(&record)?;
                plan
            }
        };

        for (team_id, reset) in &plan {
            skip_missing(self.store.put_week_status(team_id, &reset.week_status))?;
            if let Some(cars) = &reset.car_stats {
                skip_missing(self.store.put_car_stats(team_id, cars))?;
            }
        }

        record.mark_post_race_processed()?;
        self.store.put_race(&record)?;
        info!("Post-race done: {}", record.id);
        Ok(())
    }

    fn plan_post_race(&self, record: &RaceRecord) -> Result<BTreeMap<TeamId, TeamReset>, WeekendError> {
        let result = record
            .result
            .as_ref()
            .ok_or_else(|| WeekendError::missing(format!("no race result for {}", record.id)))?;

        let mut team_ids = BTreeSet::new();
        for driver_id in result.final_positions.keys() {
            if let Some(driver) = self.store.driver(driver_id)? {
                team_ids.insert(driver.team_id);
            }
        }

        let mut rng = self.context.derive_rng(stream_for(&record.id, Stage::PostRace));
        let mut plan = BTreeMap::new();
        for team_id in team_ids {
            let Some(team) = self.store.team(&team_id)? else { continue };
            let car_stats = if team.is_bot {
                roll_bot_upgrades(&team.car_stats, self.config.bot_upgrade_chance, rng.as_mut())
            } else {
                None
            };
            if let Some(cars) = &car_stats {
                debug!("Bot team {} upgraded: {:?}", team_id, cars);
            }
            plan.insert(
                team_id,
                TeamReset {
                    week_status: team.week_status.next_week(),
                    car_stats,
                },
            );
        }
        Ok(plan)
    }

    fn send_press(&self, news: PressNews) {
        let title = news.title.clone();
        if let Err(e) = self.newsroom.press(news) {
            warn!("Press news '{}' not delivered: {}", title, e);
        }
    }

    fn send_office(&self, news: OfficeNews) {
        let team_id = news.team_id.clone();
        if let Err(e) = self.newsroom.office(news) {
            warn!("Office news for {} not delivered: {}", team_id, e);
        }
    }
}

fn log_outcome(stage: Stage, league_id: &str, race_id: Option<&RaceId>, outcome: &LeagueOutcome) {
    let race = race_id.map(|r| r.as_str()).unwrap_or("-");
    match outcome {
        LeagueOutcome::Completed => info!("[{}] league={} race={} completed", stage, league_id, race),
        LeagueOutcome::Skipped(SkipReason::MissingData(what)) => {
            warn!("[{}] league={} race={} skipped, missing data: {}", stage, league_id, race, what)
        }
        LeagueOutcome::Skipped(reason) => {
            info!("[{}] league={} race={} skipped: {:?}", stage, league_id, race, reason)
        }
        LeagueOutcome::Failed(err) => error!("[{}] league={} race={} failed: {}", stage, league_id, race, err),
    }
}

/// Groups rows by team, keeping first-appearance order of teams and the
/// original order within each team.
fn group_by_team<'a, T>(rows: &'a [T], team_of: impl Fn(&T) -> &TeamId) -> Vec<(TeamId, Vec<&'a T>)> {
    let mut groups: Vec<(TeamId, Vec<&T>)> = Vec::new();
    for row in rows {
        let team_id = team_of(row);
        match groups.iter_mut().find(|(id, _)| id == team_id) {
            Some((_, members)) => members.push(row),
            None => groups.push((team_id.clone(), vec![row])),
        }
    }
    groups
}

fn unique<T: PartialEq>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut out = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_env::SequenceSource;

    #[test]
    fn test_config_defaults() {
        let config = WeekendConfig::default();
        assert_eq!(config.league_stagger(), Duration::from_secs(300));
        assert_eq!(config.post_race_delay(), Duration::from_secs(3600));
        assert_eq!(config.playback_update_interval_secs, 120);
        assert_eq!(config.prize.base, 250_000);
        assert_eq!(config.prize.per_point, 150_000);
        assert_eq!(config.bot_upgrade_chance, 0.3);
    }

    #[test]
    fn test_config_partial_json() {
        let config: WeekendConfig = serde_json::from_str(r#"{ "league_stagger_secs": 0 }"#).unwrap();
        assert_eq!(config.league_stagger_secs, 0);
        assert_eq!(config.post_race_delay_secs, 3600);
    }

    #[test]
    fn test_bot_upgrades_all_hit() {
        let cars = vec![CarStats::new(5, 5, 5), CarStats::new(20, 1, 1)];
        let upgraded = roll_bot_upgrades(&cars, 0.3, &mut SequenceSource::constant(0.1)).unwrap();
        assert_eq!(upgraded[0], CarStats::new(6, 6, 6));
        // capped at the rating ceiling
        assert_eq!(upgraded[1], CarStats::new(20, 2, 2));
    }

    #[test]
    fn test_bot_upgrades_none_hit() {
        let cars = vec![CarStats::new(5, 5, 5)];
        assert!(roll_bot_upgrades(&cars, 0.3, &mut SequenceSource::constant(0.9)).is_none());
    }

    #[test]
    fn test_bot_upgrades_fill_missing_slots() {
        // second slot missing: starts from default ratings
        let upgraded = roll_bot_upgrades(&[CarStats::new(3, 3, 3)], 0.3, &mut SequenceSource::constant(0.0)).unwrap();
        assert_eq!(upgraded.len(), 2);
        assert_eq!(upgraded[1], CarStats::new(2, 2, 2));
    }

    #[test]
    fn test_error_classification() {
        let missing: LeagueOutcome = WeekendError::missing("season s1").into();
        assert_eq!(missing, LeagueOutcome::Skipped(SkipReason::MissingData("season s1".into())));

        let done: LeagueOutcome = WeekendError::from(PhaseError::AlreadyProcessed {
            race_id: RaceId::for_event("s1", "r1"),
            phase: RacePhase::RaceDone,
        })
        .into();
        assert_eq!(done, LeagueOutcome::Skipped(SkipReason::AlreadyProcessed));

        let io: LeagueOutcome = WeekendError::from(EnvError::store("disk full")).into();
        assert!(matches!(io, LeagueOutcome::Failed(msg) if msg.contains("disk full")));

        let not_found: LeagueOutcome = WeekendError::from(EnvError::not_found("team t9")).into();
        assert!(matches!(not_found, LeagueOutcome::Skipped(SkipReason::MissingData(_))));
    }

    #[test]
    fn test_stream_is_stable_and_distinct() {
        let a = RaceId::for_event("s1", "r1");
        let b = RaceId::for_event("s1", "r2");
        assert_eq!(stream_for(&a, Stage::Race), stream_for(&a, Stage::Race));
        assert_ne!(stream_for(&a, Stage::Race), stream_for(&b, Stage::Race));
        assert_ne!(stream_for(&a, Stage::Race), stream_for(&a, Stage::Qualifying));
    }

    #[test]
    fn test_skip_missing_only_forgives_not_found() {
        assert!(skip_missing(Err(EnvError::not_found("team t9"))).is_ok());
        assert!(matches!(skip_missing(Err(EnvError::store("io"))), Err(EnvError::Store(_))));
    }

    #[test]
    fn test_stage_parses() {
        assert_eq!("post-race".parse::<Stage>(), Ok(Stage::PostRace));
        assert_eq!("Qualifying".parse::<Stage>(), Ok(Stage::Qualifying));
        assert!("warmup".parse::<Stage>().is_err());
    }

    #[test]
    fn test_group_by_team_preserves_order() {
        let rows = vec![("a", TeamId::from("t2")), ("b", TeamId::from("t1")), ("c", TeamId::from("t2"))];
        let groups = group_by_team(&rows, |r| &r.1);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.as_str(), "t2");
        assert_eq!(groups[0].1.iter().map(|r| r.0).collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(groups[1].1[0].0, "b");
    }
}
