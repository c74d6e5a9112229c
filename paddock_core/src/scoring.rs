//! Points, podiums and prize money from a final classification.

use crate::race::RaceResult;
use paddock_env::{DriverId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Points for classified positions 1..=10.
pub const POINTS: [u32; 10] = [25, 18, 15, 12, 10, 8, 6, 4, 2, 1];

/// Points for a 0-based classified rank. DNFs never reach this function.
pub fn points_for_rank(rank: usize) -> u32 {
    POINTS.get(rank).copied().unwrap_or(0)
}

/// Prize money paid to every participating team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrizeScheme {
    pub base: u64,
    pub per_point: u64,
}

impl Default for PrizeScheme {
    fn default() -> Self {
        Self {
            base: 250_000,
            per_point: 150_000,
        }
    }
}

impl PrizeScheme {
    pub fn award(&self, points: u32) -> u64 {
        self.base + self.per_point * points as u64
    }
}

/// One driver's share of a race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverScore {
    pub driver_id: DriverId,
    pub team_id: TeamId,
    /// 1-based final position (DNFs included at the back)
    pub position: usize,
    pub points: u32,
    pub win: bool,
    pub podium: bool,
    pub dnf: bool,
}

/// One team's share of a race.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScore {
    pub points: u32,
    /// 0 or 1: a team wins a race at most once
    pub wins: u32,
    /// One per podium driver
    pub podiums: u32,
    pub prize: u64,
}

/// Scoring of a whole race.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSheet {
    pub drivers: Vec<DriverScore>,
    pub teams: BTreeMap<TeamId, TeamScore>,
}

impl ScoreSheet {
    pub fn driver(&self, driver_id: &DriverId) -> Option<&DriverScore> {
        self.drivers.iter().find(|d| &d.driver_id == driver_id)
    }

    pub fn winner(&self) -> Option<&DriverScore> {
        self.drivers.iter().find(|d| d.win)
    }
}

/// Reduces a race result to driver and team scores.
///
/// Every team in `teams` is paid the prize, including teams whose drivers
/// all retired. Drivers missing from `teams` keep their place in the
/// ranking but score for nobody.
pub fn score_race(result: &RaceResult, teams: &HashMap<DriverId, TeamId>, prize: &PrizeScheme) -> ScoreSheet {
    let mut sheet = ScoreSheet::default();
    for team_id in teams.values() {
        sheet.teams.entry(team_id.clone()).or_default();
    }

    let mut rank = 0;
    for (idx, driver_id) in result.classification().into_iter().enumerate() {
        let dnf = result.is_dnf(&driver_id);
        let driver_rank = rank;
        if !dnf {
            rank += 1;
        }
        let Some(team_id) = teams.get(&driver_id) else {
            continue;
        };
        let (points, win, podium) = if dnf {
            (0, false, false)
        } else {
            (points_for_rank(driver_rank), driver_rank == 0, driver_rank < 3)
        };

        let team = sheet.teams.entry(team_id.clone()).or_default();
        team.points += points;
        if win {
            team.wins = 1;
        }
        if podium {
            team.podiums += 1;
        }

        sheet.drivers.push(DriverScore {
            driver_id,
            team_id: team_id.clone(),
            position: idx + 1,
            points,
            win,
            podium,
            dnf,
        });
    }

    for team in sheet.teams.values_mut() {
        team.prize = prize.award(team.points);
    }
    sheet
}
