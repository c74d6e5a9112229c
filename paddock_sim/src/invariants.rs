//! Ground-truth checks applied to what the weekend engine produced.

use paddock_core::circuit::CircuitProfile;
use paddock_core::performance::CRASH_LAP_TIME;
use paddock_core::qualifying::QualifyingResult;
use paddock_core::race::{EventKind, RaceResult, HARD_COMPOUND_PENALTY};
use paddock_core::setup::TyreCompound;
use paddock_core::scoring::POINTS;
use paddock_env::DriverId;
use std::collections::HashSet;

/// Counters gathered while checking a race.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RaceTally {
    pub laps: u64,
    pub overtakes: u64,
    pub pit_stops: u64,
    pub crashes: u64,
    pub hard_penalties: u64,
    pub dnfs: u64,
}

const EPS: f64 = 1e-6;

pub(crate) fn ensure(cond: bool, msg: impl FnOnce() -> String) -> Result<(), String> {
    if cond {
        Ok(())
    } else {
        Err(msg())
    }
}

/// Grid positions are 1..n in lap-time order, crashed rows carry the
/// sentinel and trail every clean lap, gaps are measured to pole.
pub fn check_grid(grid: &[QualifyingResult]) -> Result<(), String> {
    let pole_time = grid.first().map(|r| r.lap_time).unwrap_or(0.0);
    let mut seen_crash = false;

    for (idx, row) in grid.iter().enumerate() {
        ensure(row.position == idx + 1, || format!("grid row {} has position {}", idx, row.position))?;
        ensure(row.lap_time >= 0.0, || format!("{} has negative qualifying time", row.driver_id))?;
        ensure((row.gap - (row.lap_time - pole_time)).abs() < EPS, || {
            format!("{} gap {} does not match pole delta", row.driver_id, row.gap)
        })?;
        if idx > 0 {
            ensure(grid[idx - 1].lap_time <= row.lap_time, || format!("grid not sorted at P{}", row.position))?;
        }
        if row.crashed {
            ensure(row.lap_time == CRASH_LAP_TIME, || format!("crashed {} has time {}", row.driver_id, row.lap_time))?;
            seen_crash = true;
        } else {
            ensure(!seen_crash, || format!("clean lap of {} ranked behind a crash", row.driver_id))?;
        }
    }
    Ok(())
}

/// Classification and race log invariants.
///
/// Log-level checks only run when the full log is present; persistent
/// stores keep a down-sampled log.
pub fn check_race(
    result: &RaceResult,
    circuit: &CircuitProfile,
    grid: &[QualifyingResult],
) -> Result<RaceTally, String> {
    let n = result.final_positions.len();
    let mut positions: Vec<usize> = result.final_positions.values().copied().collect();
    positions.sort_unstable();
    ensure(positions == (1..=n).collect::<Vec<_>>(), || format!("final positions are not 1..{}", n))?;

    let dnfs: HashSet<&DriverId> = result.dnfs.iter().collect();
    ensure(dnfs.len() == result.dnfs.len(), || "a driver retired twice".to_string())?;
    let worst_classified = result
        .final_positions
        .iter()
        .filter(|(id, _)| !dnfs.contains(id))
        .map(|(_, p)| *p)
        .max()
        .unwrap_or(0);
    for dnf in &result.dnfs {
        let pos = result.final_positions.get(dnf).copied().unwrap_or(0);
        ensure(pos > worst_classified, || format!("DNF {} classified at P{}", dnf, pos))?;
    }

    let mut tally = RaceTally {
        dnfs: result.dnfs.len() as u64,
        ..RaceTally::default()
    };
    tally.overtakes = result.events_of(EventKind::Overtake).count() as u64;
    tally.pit_stops = result.events_of(EventKind::Pit).count() as u64;
    tally.crashes = result.events_of(EventKind::Crash).count() as u64;
    tally.hard_penalties = result
        .events_of(EventKind::Info)
        .filter(|e| e.description.starts_with("35s PENALTY"))
        .count() as u64;

    if result.laps.len() != circuit.laps as usize {
        return Ok(tally);
    }
    tally.laps = result.laps.len() as u64;
    ensure(tally.crashes == tally.dnfs, || format!("{} crash events for {} DNFs", tally.crashes, tally.dnfs))?;

    for (driver_id, total) in &result.total_times {
        let mut logged = 0.0;
        for lap in &result.laps {
            if let Some(time) = lap.lap_times.get(driver_id) {
                ensure(*time > 0.0, || format!("{} lap {} non-positive", driver_id, lap.lap))?;
                logged += time;
            }
        }

        if dnfs.contains(driver_id) {
            ensure((total - logged).abs() < EPS, || format!("DNF {} was penalised", driver_id))?;
            continue;
        }

        let started_on_hard = grid
            .iter()
            .find(|r| &r.driver_id == driver_id)
            .map(|r| r.compound == TyreCompound::Hard)
            .unwrap_or(false);
        let fitted_hard = result
            .laps
            .iter()
            .any(|lap| lap.tyres.get(driver_id) == Some(&TyreCompound::Hard));
        let expected = if started_on_hard || fitted_hard { 0.0 } else { HARD_COMPOUND_PENALTY };
        ensure((total - logged - expected).abs() < EPS, || {
            format!("{} total {:.3} vs logged {:.3} + penalty {}", driver_id, total, logged, expected)
        })?;
    }
    Ok(tally)
}

/// Sum of points a race hands out for `classified` finishers.
pub fn points_available(classified: usize) -> u32 {
    POINTS.iter().take(classified).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_core::circuit::circuit;
    use paddock_core::setup::TyreCompound;
    use paddock_env::TeamId;

    fn row(id: &str, position: usize, lap_time: f64, crashed: bool, gap: f64) -> QualifyingResult {
        QualifyingResult {
            driver_id: DriverId::from(id),
            driver_name: id.into(),
            team_id: TeamId::from("t"),
            team_name: "T".into(),
            lap_time,
            crashed,
            compound: TyreCompound::Medium,
            setup_submitted: true,
            position,
            gap,
        }
    }

    #[test]
    fn test_valid_grid_passes() {
        let grid = vec![row("a", 1, 80.0, false, 0.0), row("b", 2, 81.0, false, 1.0), row("c", 3, 999.0, true, 919.0)];
        assert!(check_grid(&grid).is_ok());
    }

    #[test]
    fn test_unsorted_grid_fails() {
        let grid = vec![row("a", 1, 82.0, false, 0.0), row("b", 2, 81.0, false, -1.0)];
        assert!(check_grid(&grid).is_err());
    }

    #[test]
    fn test_points_available() {
        assert_eq!(points_available(0), 0);
        assert_eq!(points_available(3), 58);
        assert_eq!(points_available(20), 101);
    }

    #[test]
    fn test_short_log_skips_log_checks() {
        let result = RaceResult {
            laps: Vec::new(),
            final_positions: [(DriverId::from("a"), 1)].into_iter().collect(),
            total_times: [(DriverId::from("a"), 10.0)].into_iter().collect(),
            dnfs: Vec::new(),
        };
        let tally = check_race(&result, circuit("mexico"), &[]).unwrap();
        assert_eq!(tally.laps, 0);
    }
}
