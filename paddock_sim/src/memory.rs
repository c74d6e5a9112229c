//! In-memory league store.

use crate::store::FixtureSink;
use paddock_core::phase::{RacePhase, RaceRecord};
use paddock_core::setup::CarStats;
use paddock_core::store::{CareerStats, Driver, League, LeagueStore, Manager, Season, Team, WeekStatus};
use paddock_env::{DriverId, EnvError, RaceId, TeamId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Kinds of store write that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreWrite {
    Race,
    Calendar,
    TeamLock,
    TeamStats,
    DriverStats,
    WeekStatus,
    CarStats,
}

#[derive(Default)]
struct State {
    leagues: BTreeMap<String, League>,
    seasons: BTreeMap<String, Season>,
    teams: BTreeMap<TeamId, Team>,
    drivers: BTreeMap<DriverId, Driver>,
    managers: BTreeMap<String, Manager>,
    races: BTreeMap<RaceId, RaceRecord>,
    race_writes: u64,
    failing_teams: HashSet<TeamId>,
    /// Writes of a kind still allowed before the next one fails
    armed: HashMap<StoreWrite, usize>,
}

impl State {
    fn write(&mut self, kind: StoreWrite) -> Result<(), EnvError> {
        let Some(left) = self.armed.get(&kind).copied() else {
            return Ok(());
        };
        if left == 0 {
            self.armed.remove(&kind);
            return Err(EnvError::store(format!("injected {:?} write failure", kind)));
        }
        self.armed.insert(kind, left - 1);
        Ok(())
    }
}

/// Thread-safe in-memory implementation of `LeagueStore`.
///
/// Keeps full lap logs (no down-sampling). Reads for chosen teams and single
/// writes can be made to fail, to exercise failure isolation and retries.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every driver lookup for `team_id` fail with a store error.
    pub fn fail_team(&self, team_id: &TeamId) {
        self.state().failing_teams.insert(team_id.clone());
    }

    /// Lets `after` writes of `kind` through, then fails the next one once.
    pub fn fail_write(&self, kind: StoreWrite, after: usize) {
        self.state().armed.insert(kind, after);
    }

    /// Deletes a team, as if it left the game mid-weekend.
    pub fn remove_team(&self, team_id: &TeamId) -> Option<Team> {
        self.state().teams.remove(team_id)
    }

    /// Number of race record writes so far.
    pub fn race_writes(&self) -> u64 {
        self.state().race_writes
    }

    pub fn all_races(&self) -> Vec<RaceRecord> {
        self.state().races.values().cloned().collect()
    }
}

impl FixtureSink for MemoryStore {
    fn insert_league(&self, league: League) -> Result<(), EnvError> {
        self.state().leagues.insert(league.id.clone(), league);
        Ok(())
    }

    fn insert_season(&self, season: Season) -> Result<(), EnvError> {
        self.state().seasons.insert(season.id.clone(), season);
        Ok(())
    }

    fn insert_team(&self, team: Team) -> Result<(), EnvError> {
        self.state().teams.insert(team.id.clone(), team);
        Ok(())
    }

    fn insert_driver(&self, driver: Driver) -> Result<(), EnvError> {
        self.state().drivers.insert(driver.id.clone(), driver);
        Ok(())
    }

    fn insert_manager(&self, manager: Manager) -> Result<(), EnvError> {
        self.state().managers.insert(manager.id.clone(), manager);
        Ok(())
    }
}

impl LeagueStore for MemoryStore {
    fn active_leagues(&self) -> Result<Vec<League>, EnvError> {
        Ok(self.state().leagues.values().cloned().collect())
    }

    fn season(&self, season_id: &str) -> Result<Option<Season>, EnvError> {
        Ok(self.state().seasons.get(season_id).cloned())
    }

    fn complete_calendar_entry(&self, season_id: &str, event_id: &str) -> Result<(), EnvError> {
        let mut state = self.state();
        state.write(StoreWrite::Calendar)?;
        let season = state
            .seasons
            .get_mut(season_id)
            .ok_or_else(|| EnvError::not_found(format!("season {}", season_id)))?;
        let entry = season
            .calendar
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| EnvError::not_found(format!("calendar entry {}/{}", season_id, event_id)))?;
        entry.completed = true;
        Ok(())
    }

    fn team(&self, team_id: &TeamId) -> Result<Option<Team>, EnvError> {
        Ok(self.state().teams.get(team_id).cloned())
    }

    fn teams(&self, team_ids: &[TeamId]) -> Result<Vec<Team>, EnvError> {
        let state = self.state();
        Ok(team_ids.iter().filter_map(|id| state.teams.get(id).cloned()).collect())
    }

    fn driver(&self, driver_id: &DriverId) -> Result<Option<Driver>, EnvError> {
        Ok(self.state().drivers.get(driver_id).cloned())
    }

    fn team_drivers(&self, team_id: &TeamId) -> Result<Vec<Driver>, EnvError> {
        let state = self.state();
        if state.failing_teams.contains(team_id) {
            return Err(EnvError::store(format!("injected failure reading drivers of {}", team_id)));
        }
        let mut drivers: Vec<Driver> = state.drivers.values().filter(|d| &d.team_id == team_id).cloned().collect();
        drivers.sort_by_key(|d| d.car_slot);
        Ok(drivers)
    }

    fn manager(&self, manager_id: &str) -> Result<Option<Manager>, EnvError> {
        Ok(self.state().managers.get(manager_id).cloned())
    }

    fn race(&self, race_id: &RaceId) -> Result<Option<RaceRecord>, EnvError> {
        Ok(self.state().races.get(race_id).cloned())
    }

    fn put_race(&self, record: &RaceRecord) -> Result<(), EnvError> {
        let mut state = self.state();
        state.write(StoreWrite::Race)?;
        state.race_writes += 1;
        state.races.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn races_awaiting_post_race(&self) -> Result<Vec<RaceRecord>, EnvError> {
        Ok(self
            .state()
            .races
            .values()
            .filter(|r| r.phase == RacePhase::RaceDone)
            .cloned()
            .collect())
    }

    fn add_driver_stats(&self, driver_id: &DriverId, delta: &CareerStats) -> Result<(), EnvError> {
        let mut state = self.state();
        state.write(StoreWrite::DriverStats)?;
        let driver = state
            .drivers
            .get_mut(driver_id)
            .ok_or_else(|| EnvError::not_found(format!("driver {}", driver_id)))?;
        driver.record(delta);
        Ok(())
    }

    fn add_team_stats(&self, team_id: &TeamId, delta: &CareerStats, prize: u64) -> Result<(), EnvError> {
        self.with_team(StoreWrite::TeamStats, team_id, |team| team.record(delta, prize))
    }

    fn set_team_locked(&self, team_id: &TeamId, locked: bool) -> Result<(), EnvError> {
        self.with_team(StoreWrite::TeamLock, team_id, |team| team.week_status.locked_for_processing = locked)
    }

    fn put_week_status(&self, team_id: &TeamId, status: &WeekStatus) -> Result<(), EnvError> {
        self.with_team(StoreWrite::WeekStatus, team_id, |team| team.week_status = status.clone())
    }

    fn put_car_stats(&self, team_id: &TeamId, car_stats: &[CarStats]) -> Result<(), EnvError> {
        self.with_team(StoreWrite::CarStats, team_id, |team| team.car_stats = car_stats.to_vec())
    }
}

impl MemoryStore {
    fn with_team(&self, kind: StoreWrite, team_id: &TeamId, update: impl FnOnce(&mut Team)) -> Result<(), EnvError> {
        let mut state = self.state();
        state.write(kind)?;
        let team = state
            .teams
            .get_mut(team_id)
            .ok_or_else(|| EnvError::not_found(format!("team {}", team_id)))?;
        update(team);
        Ok(())
    }
}
