//! Single-lap qualifying and grid assembly.

use crate::circuit::CircuitProfile;
use crate::performance::{simulate_lap, LapInput};
use crate::role::ManagerRole;
use crate::setup::{CarStats, DriverStats, Setup, TyreCompound};
use paddock_env::{DriverId, RandomSource, TeamId};
use serde::{Deserialize, Serialize};

/// A driver entered in qualifying.
#[derive(Debug, Clone)]
pub struct QualifyingEntry {
    pub driver_id: DriverId,
    pub driver_name: String,
    pub team_id: TeamId,
    pub team_name: String,
    pub car: Option<CarStats>,
    pub driver: DriverStats,
    pub setup: Setup,
    pub role: ManagerRole,
    /// False when the default setup stands in for a missing submission
    pub setup_submitted: bool,
}

/// One row of the qualifying grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifyingResult {
    pub driver_id: DriverId,
    pub driver_name: String,
    pub team_id: TeamId,
    pub team_name: String,
    pub lap_time: f64,
    pub crashed: bool,
    pub compound: TyreCompound,
    pub setup_submitted: bool,
    /// 1-based grid slot
    pub position: usize,
    /// Seconds behind pole
    pub gap: f64,
}

/// Runs one qualifying lap per entry and returns the sorted grid.
pub fn run_qualifying<R: RandomSource + ?Sized>(
    circuit: &CircuitProfile,
    entries: &[QualifyingEntry],
    rng: &mut R,
) -> Vec<QualifyingResult> {
    let mut grid: Vec<QualifyingResult> = entries
        .iter()
        .map(|entry| {
            let outcome = simulate_lap(
                &LapInput {
                    circuit,
                    car: entry.car.as_ref(),
                    driver: &entry.driver,
                    setup: &entry.setup,
                    style: entry.setup.qualifying_style,
                    role: entry.role,
                },
                rng,
            );
            let lap_time = if outcome.crashed {
                outcome.lap_time
            } else {
                entry.role.qualifying_pace(outcome.lap_time)
            };

            QualifyingResult {
                driver_id: entry.driver_id.clone(),
                driver_name: entry.driver_name.clone(),
                team_id: entry.team_id.clone(),
                team_name: entry.team_name.clone(),
                lap_time,
                crashed: outcome.crashed,
                compound: entry.setup.tyre_compound,
                setup_submitted: entry.setup_submitted,
                position: 0,
                gap: 0.0,
            }
        })
        .collect();

    grid.sort_by(|a, b| a.lap_time.total_cmp(&b.lap_time));

    let pole_time = grid.first().map(|r| r.lap_time).unwrap_or(0.0);
    for (idx, row) in grid.iter_mut().enumerate() {
        row.position = idx + 1;
        row.gap = row.lap_time - pole_time;
    }
    grid
}

/// The pole sitter: the fastest clean lap, if anyone set one.
pub fn pole(grid: &[QualifyingResult]) -> Option<&QualifyingResult> {
    grid.iter().find(|row| !row.crashed)
}

/// Estimated replay length: mean clean qualifying lap times the race length.
pub fn live_duration_secs(grid: &[QualifyingResult], laps: u32) -> u64 {
    let clean: Vec<f64> = grid.iter().filter(|r| !r.crashed).map(|r| r.lap_time).collect();
    if clean.is_empty() {
        return 0;
    }
    let mean = clean.iter().sum::<f64>() / clean.len() as f64;
    (mean * laps as f64).round() as u64
}
