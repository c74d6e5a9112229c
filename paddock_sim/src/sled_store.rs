//! Sled-backed persistent league store.
//!
//! Records are stored as JSON in one tree per record kind. Race lap logs are
//! down-sampled on write to every `LAP_SAMPLE_STRIDE`th lap plus the last;
//! writing a record read back from the store keeps the same laps.

use crate::store::FixtureSink;
use paddock_core::phase::{RacePhase, RaceRecord};
use paddock_core::setup::CarStats;
use paddock_core::store::{CareerStats, Driver, League, LeagueStore, Manager, Season, Team, WeekStatus};
use paddock_env::{DriverId, EnvError, RaceId, TeamId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Stored lap logs keep every 5th lap plus the final one.
pub const LAP_SAMPLE_STRIDE: usize = 5;

const LEAGUES: &str = "leagues";
const SEASONS: &str = "seasons";
const TEAMS: &str = "teams";
const DRIVERS: &str = "drivers";
const MANAGERS: &str = "managers";
const RACES: &str = "races";

/// Persistent store backed by an embedded key-value database.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open a persistent store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EnvError> {
        let db = sled::open(path).map_err(|e| EnvError::store(format!("Failed to open sled DB: {}", e)))?;
        Ok(Self { db })
    }

    /// Create a temporary store, removed on drop
    pub fn open_temp() -> Result<Self, EnvError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| EnvError::store(format!("Failed to open temp DB: {}", e)))?;
        Ok(Self { db })
    }

    fn tree(&self, name: &str) -> Result<sled::Tree, EnvError> {
        self.db
            .open_tree(name)
            .map_err(|e| EnvError::store(format!("Failed to open tree {}: {}", name, e)))
    }

    fn get<T: DeserializeOwned>(&self, tree: &str, key: &str) -> Result<Option<T>, EnvError> {
        let Some(bytes) = self
            .tree(tree)?
            .get(key.as_bytes())
            .map_err(|e| EnvError::store(format!("Read {}/{} failed: {}", tree, key, e)))?
        else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| EnvError::Serialization(format!("{}/{}: {}", tree, key, e)))
    }

    fn put<T: Serialize>(&self, tree: &str, key: &str, value: &T) -> Result<(), EnvError> {
        let bytes = serde_json::to_vec(value).map_err(|e| EnvError::Serialization(format!("{}/{}: {}", tree, key, e)))?;
        let tree_handle = self.tree(tree)?;
        tree_handle
            .insert(key.as_bytes(), bytes)
            .map_err(|e| EnvError::store(format!("Insert {}/{} failed: {}", tree, key, e)))?;
        tree_handle
            .flush()
            .map_err(|e| EnvError::store(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn all<T: DeserializeOwned>(&self, tree: &str) -> Result<Vec<T>, EnvError> {
        let mut out = Vec::new();
        for entry in self.tree(tree)?.iter() {
            let (key, bytes) = entry.map_err(|e| EnvError::store(format!("Iteration failed: {}", e)))?;
            let value = serde_json::from_slice(&bytes).map_err(|e| {
                EnvError::Serialization(format!("{}/{}: {}", tree, String::from_utf8_lossy(&key), e))
            })?;
            out.push(value);
        }
        Ok(out)
    }

    /// Read-modify-write of one record; missing records are `NotFound`.
    fn update<T, F>(&self, tree: &str, key: &str, apply: F) -> Result<(), EnvError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let mut value: T = self
            .get(tree, key)?
            .ok_or_else(|| EnvError::not_found(format!("{}/{}", tree, key)))?;
        apply(&mut value);
        self.put(tree, key, &value)
    }

    fn update_team(&self, team_id: &TeamId, apply: impl FnOnce(&mut Team)) -> Result<(), EnvError> {
        self.update(TEAMS, team_id.as_str(), apply)
    }
}

/// Copy of a race record with its lap log reduced to the key laps.
fn down_sampled(record: &RaceRecord) -> RaceRecord {
    let mut stored = record.clone();
    if let Some(result) = stored.result.as_mut() {
        let laps = result.key_laps(LAP_SAMPLE_STRIDE).into_iter().cloned().collect();
        result.laps = laps;
    }
    stored
}

impl FixtureSink for SledStore {
    fn insert_league(&self, league: League) -> Result<(), EnvError> {
        self.put(LEAGUES, &league.id, &league)
    }

    fn insert_season(&self, season: Season) -> Result<(), EnvError> {
        self.put(SEASONS, &season.id, &season)
    }

    fn insert_team(&self, team: Team) -> Result<(), EnvError> {
        self.put(TEAMS, team.id.as_str(), &team)
    }

    fn insert_driver(&self, driver: Driver) -> Result<(), EnvError> {
        self.put(DRIVERS, driver.id.as_str(), &driver)
    }

    fn insert_manager(&self, manager: Manager) -> Result<(), EnvError> {
        self.put(MANAGERS, &manager.id, &manager)
    }
}

impl LeagueStore for SledStore {
    fn active_leagues(&self) -> Result<Vec<League>, EnvError> {
        self.all(LEAGUES)
    }

    fn season(&self, season_id: &str) -> Result<Option<Season>, EnvError> {
        self.get(SEASONS, season_id)
    }

    fn complete_calendar_entry(&self, season_id: &str, event_id: &str) -> Result<(), EnvError> {
        let mut season: Season = self
            .get(SEASONS, season_id)?
            .ok_or_else(|| EnvError::not_found(format!("season {}", season_id)))?;
        let entry = season
            .calendar
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| EnvError::not_found(format!("calendar entry {}/{}", season_id, event_id)))?;
        entry.completed = true;
        self.put(SEASONS, season_id, &season)
    }

    fn team(&self, team_id: &TeamId) -> Result<Option<Team>, EnvError> {
        self.get(TEAMS, team_id.as_str())
    }

    fn teams(&self, team_ids: &[TeamId]) -> Result<Vec<Team>, EnvError> {
        let mut teams = Vec::with_capacity(team_ids.len());
        for id in team_ids {
            if let Some(team) = self.team(id)? {
                teams.push(team);
            }
        }
        Ok(teams)
    }

    fn driver(&self, driver_id: &DriverId) -> Result<Option<Driver>, EnvError> {
        self.get(DRIVERS, driver_id.as_str())
    }

    fn team_drivers(&self, team_id: &TeamId) -> Result<Vec<Driver>, EnvError> {
        let mut drivers: Vec<Driver> = self
            .all::<Driver>(DRIVERS)?
            .into_iter()
            .filter(|d| &d.team_id == team_id)
            .collect();
        drivers.sort_by_key(|d| d.car_slot);
        Ok(drivers)
    }

    fn manager(&self, manager_id: &str) -> Result<Option<Manager>, EnvError> {
        self.get(MANAGERS, manager_id)
    }

    fn race(&self, race_id: &RaceId) -> Result<Option<RaceRecord>, EnvError> {
        self.get(RACES, race_id.as_str())
    }

    fn put_race(&self, record: &RaceRecord) -> Result<(), EnvError> {
        self.put(RACES, record.id.as_str(), &down_sampled(record))
    }

    fn races_awaiting_post_race(&self) -> Result<Vec<RaceRecord>, EnvError> {
        Ok(self
            .all::<RaceRecord>(RACES)?
            .into_iter()
            .filter(|r| r.phase == RacePhase::RaceDone)
            .collect())
    }

    fn add_driver_stats(&self, driver_id: &DriverId, delta: &CareerStats) -> Result<(), EnvError> {
        self.update(DRIVERS, driver_id.as_str(), |driver: &mut Driver| driver.record(delta))
    }

    fn add_team_stats(&self, team_id: &TeamId, delta: &CareerStats, prize: u64) -> Result<(), EnvError> {
        self.update_team(team_id, |team| team.record(delta, prize))
    }

    fn set_team_locked(&self, team_id: &TeamId, locked: bool) -> Result<(), EnvError> {
        self.update_team(team_id, |team| team.week_status.locked_for_processing = locked)
    }

    fn put_week_status(&self, team_id: &TeamId, status: &WeekStatus) -> Result<(), EnvError> {
        self.update_team(team_id, |team| team.week_status = status.clone())
    }

    fn put_car_stats(&self, team_id: &TeamId, car_stats: &[CarStats]) -> Result<(), EnvError> {
        self.update_team(team_id, |team| team.car_stats = car_stats.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_core::race::{LapRecord, RaceResult};
    use paddock_core::store::CalendarEntry;
    use std::collections::BTreeMap;
    use std::time::SystemTime;

    fn season() -> Season {
        Season {
            id: "s1".into(),
            league_id: "l1".into(),
            calendar: vec![CalendarEntry {
                id: "r1".into(),
                circuit_id: "vegas".into(),
                track_name: "Las Vegas".into(),
                completed: false,
            }],
        }
    }

    fn lap(n: u32) -> LapRecord {
        LapRecord {
            lap: n,
            lap_times: BTreeMap::new(),
            positions: BTreeMap::new(),
            tyres: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_team_round_trip_and_stats() {
        let store = SledStore::open_temp().unwrap();
        store
            .insert_team(Team {
                id: TeamId::from("t1"),
                name: "Alpha".into(),
                budget: 100,
                ..Team::default()
            })
            .unwrap();

        store
            .add_team_stats(&TeamId::from("t1"), &CareerStats { races: 1, points: 18, ..Default::default() }, 500)
            .unwrap();
        store.set_team_locked(&TeamId::from("t1"), true).unwrap();

        let team = store.team(&TeamId::from("t1")).unwrap().unwrap();
        assert_eq!(team.budget, 600);
        assert_eq!(team.career.points, 18);
        assert_eq!(team.season.races, 1);
        assert!(team.week_status.locked_for_processing);
    }

    #[test]
    fn test_missing_team_is_not_found() {
        let store = SledStore::open_temp().unwrap();
        let err = store.set_team_locked(&TeamId::from("ghost"), true).unwrap_err();
        assert!(matches!(err, EnvError::NotFound(_)));
    }

    #[test]
    fn test_race_log_down_sampled() {
        let store = SledStore::open_temp().unwrap();
        let s = season();
        let mut record = RaceRecord::new("l1", &s, &s.calendar[0]);
        record.record_qualifying(Vec::new()).unwrap();
        let result = RaceResult {
            laps: (1..=12).map(lap).collect(),
            final_positions: BTreeMap::new(),
            total_times: BTreeMap::new(),
            dnfs: Vec::new(),
        };
        record.record_race(result, 0, 120, SystemTime::UNIX_EPOCH).unwrap();
        store.put_race(&record).unwrap();

        let stored = store.race(&record.id).unwrap().unwrap();
        let laps: Vec<u32> = stored.result.unwrap().laps.iter().map(|l| l.lap).collect();
        assert_eq!(laps, vec![1, 6, 11, 12]);

        let awaiting = store.races_awaiting_post_race().unwrap();
        assert_eq!(awaiting.len(), 1);
    }

    #[test]
    fn test_rewrite_keeps_sampled_laps() {
        let store = SledStore::open_temp().unwrap();
        let s = season();
        let mut record = RaceRecord::new("l1", &s, &s.calendar[0]);
        record.record_qualifying(Vec::new()).unwrap();
        let result = RaceResult {
            laps: (1..=71).map(lap).collect(),
            final_positions: BTreeMap::new(),
            total_times: BTreeMap::new(),
            dnfs: Vec::new(),
        };
        record.record_race(result, 0, 120, SystemTime::UNIX_EPOCH).unwrap();
        store.put_race(&record).unwrap();

        let first = store.race(&record.id).unwrap().unwrap();
        let mut again = first.clone();
        again.mark_post_race_processed().unwrap();
        store.put_race(&again).unwrap();

        let laps = |r: &RaceRecord| -> Vec<u32> { r.result.as_ref().unwrap().laps.iter().map(|l| l.lap).collect() };
        let stored = store.race(&record.id).unwrap().unwrap();
        assert_eq!(laps(&first).len(), 15);
        assert_eq!(laps(&stored), laps(&first));
        assert_eq!(laps(&stored).last(), Some(&71));
    }

    #[test]
    fn test_calendar_completion_persists() {
        let store = SledStore::open_temp().unwrap();
        store.insert_season(season()).unwrap();
        store.complete_calendar_entry("s1", "r1").unwrap();
        let s = store.season("s1").unwrap().unwrap();
        assert!(s.calendar[0].completed);
    }
}
