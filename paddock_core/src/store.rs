//! Records read and written through the external league store.
//!
//! The store owns the schema; the core only sees these shapes. Every call is
//! blocking I/O from the orchestrator's point of view.

use crate::phase::RaceRecord;
use crate::role::ManagerRole;
use crate::setup::{CarStats, DriverStats, Setup};
use paddock_env::{DriverId, EnvError, RaceId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A group of teams racing each other inside a league.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Division {
    pub name: String,
    pub team_ids: Vec<TeamId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct League {
    pub id: String,
    pub name: String,
    pub divisions: Vec<Division>,
    pub current_season_id: Option<String>,
}

impl League {
    /// Every team of every division, in division order.
    pub fn team_ids(&self) -> Vec<TeamId> {
        self.divisions.iter().flat_map(|d| d.team_ids.iter().cloned()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: String,
    pub circuit_id: String,
    pub track_name: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Season {
    pub id: String,
    pub league_id: String,
    pub calendar: Vec<CalendarEntry>,
}

impl Season {
    /// The first calendar entry not yet completed.
    pub fn next_pending(&self) -> Option<&CalendarEntry> {
        self.calendar.iter().find(|e| !e.completed)
    }

    pub fn race_id(&self, entry: &CalendarEntry) -> RaceId {
        RaceId::for_event(&self.id, &entry.id)
    }
}

/// A human manager's setup submission for one driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriverSetupSubmission {
    pub sent: bool,
    pub qualifying: Option<Setup>,
    pub race: Option<Setup>,
}

/// A team's weekly activity flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeekStatus {
    pub practice_completed: bool,
    pub strategy_set: bool,
    pub sponsor_reviewed: bool,
    pub has_upgraded_this_week: bool,
    pub upgrades_this_week: u32,
    pub upgrade_cooldown_weeks: u32,
    pub locked_for_processing: bool,
    pub driver_setups: BTreeMap<DriverId, DriverSetupSubmission>,
}

impl WeekStatus {
    /// The status a team starts the next week with: every flag and
    /// submission cleared, the lock released, the cooldown one week shorter.
    pub fn next_week(&self) -> Self {
        Self {
            upgrade_cooldown_weeks: self.upgrade_cooldown_weeks.saturating_sub(1),
            ..Self::default()
        }
    }

    pub fn submission(&self, driver_id: &DriverId) -> Option<&DriverSetupSubmission> {
        self.driver_setups.get(driver_id)
    }
}

/// Result counters. Used both as running totals and as per-race deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareerStats {
    pub races: u32,
    pub points: u32,
    pub wins: u32,
    pub podiums: u32,
    pub poles: u32,
}

impl CareerStats {
    pub fn pole() -> Self {
        Self {
            poles: 1,
            ..Self::default()
        }
    }

    pub fn add(&mut self, delta: &CareerStats) {
        self.races += delta.races;
        self.points += delta.points;
        self.wins += delta.wins;
        self.podiums += delta.podiums;
        self.poles += delta.poles;
    }

    /// The part of a delta that also counts toward season totals.
    /// Poles are tracked over the career only.
    pub fn season_share(&self) -> Self {
        Self { poles: 0, ..*self }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub is_bot: bool,
    /// Ratings per car slot
    pub car_stats: Vec<CarStats>,
    pub manager_id: Option<String>,
    pub week_status: WeekStatus,
    pub budget: u64,
    pub career: CareerStats,
    pub season: CareerStats,
}

impl Team {
    pub fn car(&self, slot: usize) -> Option<CarStats> {
        self.car_stats.get(slot).copied()
    }

    /// Applies a race's counters and prize money.
    pub fn record(&mut self, delta: &CareerStats, prize: u64) {
        self.career.add(delta);
        self.season.add(&delta.season_share());
        self.budget += prize;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub team_id: TeamId,
    /// Which of the team's cars this driver races
    pub car_slot: usize,
    pub stats: DriverStats,
    pub career: CareerStats,
    pub season: CareerStats,
}

impl Driver {
    pub fn record(&mut self, delta: &CareerStats) {
        self.career.add(delta);
        self.season.add(&delta.season_share());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manager {
    pub id: String,
    pub name: String,
    pub role: ManagerRole,
}

/// External persistent store of leagues, teams, drivers and races.
pub trait LeagueStore: Send + Sync {
    fn active_leagues(&self) -> Result<Vec<League>, EnvError>;

    fn season(&self, season_id: &str) -> Result<Option<Season>, EnvError>;

    /// Marks a calendar entry completed.
    fn complete_calendar_entry(&self, season_id: &str, event_id: &str) -> Result<(), EnvError>;

    fn team(&self, team_id: &TeamId) -> Result<Option<Team>, EnvError>;

    /// Fetches the given teams; unknown ids are left out.
    fn teams(&self, team_ids: &[TeamId]) -> Result<Vec<Team>, EnvError>;

    fn driver(&self, driver_id: &DriverId) -> Result<Option<Driver>, EnvError>;

    /// The team's drivers ordered by car slot.
    fn team_drivers(&self, team_id: &TeamId) -> Result<Vec<Driver>, EnvError>;

    fn manager(&self, manager_id: &str) -> Result<Option<Manager>, EnvError>;

    fn race(&self, race_id: &RaceId) -> Result<Option<RaceRecord>, EnvError>;

    fn put_race(&self, record: &RaceRecord) -> Result<(), EnvError>;

    /// Races that finished but have not been through post-race processing.
    fn races_awaiting_post_race(&self) -> Result<Vec<RaceRecord>, EnvError>;

    fn add_driver_stats(&self, driver_id: &DriverId, delta: &CareerStats) -> Result<(), EnvError>;

    fn add_team_stats(&self, team_id: &TeamId, delta: &CareerStats, prize: u64) -> Result<(), EnvError>;

    fn set_team_locked(&self, team_id: &TeamId, locked: bool) -> Result<(), EnvError>;

    fn put_week_status(&self, team_id: &TeamId, status: &WeekStatus) -> Result<(), EnvError>;

    fn put_car_stats(&self, team_id: &TeamId, car_stats: &[CarStats]) -> Result<(), EnvError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_week_resets_flags() {
        let mut status = WeekStatus {
            practice_completed: true,
            strategy_set: true,
            sponsor_reviewed: true,
            has_upgraded_this_week: true,
            upgrades_this_week: 2,
            upgrade_cooldown_weeks: 3,
            locked_for_processing: true,
            ..WeekStatus::default()
        };
        status.driver_setups.insert(DriverId::from("d1"), DriverSetupSubmission { sent: true, ..Default::default() });

        let next = status.next_week();
        assert!(!next.practice_completed);
        assert!(!next.strategy_set);
        assert!(!next.sponsor_reviewed);
        assert!(!next.has_upgraded_this_week);
        assert_eq!(next.upgrades_this_week, 0);
        assert_eq!(next.upgrade_cooldown_weeks, 2);
        assert!(!next.locked_for_processing);
        assert!(next.driver_setups.is_empty());
    }

    #[test]
    fn test_cooldown_floors_at_zero() {
        let status = WeekStatus::default();
        assert_eq!(status.next_week().upgrade_cooldown_weeks, 0);
    }

    #[test]
    fn test_poles_are_career_only() {
        let mut driver = Driver::default();
        driver.record(&CareerStats::pole());
        driver.record(&CareerStats {
            races: 1,
            points: 25,
            wins: 1,
            podiums: 1,
            poles: 0,
        });

        assert_eq!(driver.career.poles, 1);
        assert_eq!(driver.season.poles, 0);
        assert_eq!(driver.career.points, 25);
        assert_eq!(driver.season.points, 25);
        assert_eq!(driver.season.races, 1);
    }

    #[test]
    fn test_team_record_adds_prize() {
        let mut team = Team {
            budget: 1_000,
            ..Team::default()
        };
        team.record(&CareerStats { races: 1, ..Default::default() }, 250_000);
        assert_eq!(team.budget, 251_000);
        assert_eq!(team.career.races, 1);
    }

    #[test]
    fn test_next_pending_entry() {
        let season = Season {
            id: "s1".into(),
            league_id: "l1".into(),
            calendar: vec![
                CalendarEntry { id: "r1".into(), circuit_id: "mexico".into(), track_name: "Mexico".into(), completed: true },
                CalendarEntry { id: "r2".into(), circuit_id: "vegas".into(), track_name: "Vegas".into(), completed: false },
            ],
        };
        let next = season.next_pending().unwrap();
        assert_eq!(next.id, "r2");
        assert_eq!(season.race_id(next).as_str(), "s1_r2");
    }

    #[test]
    fn test_league_team_ids_span_divisions() {
        let league = League {
            divisions: vec![
                Division { name: "A".into(), team_ids: vec![TeamId::from("t1"), TeamId::from("t2")] },
                Division { name: "B".into(), team_ids: vec![TeamId::from("t3")] },
            ],
            ..League::default()
        };
        let ids: Vec<_> = league.team_ids().iter().map(|t| t.as_str().to_string()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
    }
}
