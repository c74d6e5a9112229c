//! Per-race phase marker and the race record it lives on.
//!
//! ```text
//! NotStarted ──qualifying──► QualifyingDone ──race──► RaceDone ──post-race──► PostRaceDone
//! ```
//!
//! Each transition is accepted exactly once. Replaying a phase is rejected
//! with [`PhaseError::AlreadyProcessed`]; skipping ahead is rejected with
//! [`PhaseError::NotReady`].
//!
//! The writes that follow a transition (locks, awards, the calendar, the
//! weekly reset) touch other records one at a time. [`RaceProgress`] lists
//! the ones already applied, so an interrupted phase resumes instead of
//! repeating or losing work.

use crate::error::PhaseError;
use crate::qualifying::QualifyingResult;
use crate::race::RaceResult;
use crate::setup::CarStats;
use crate::store::{CalendarEntry, Season, WeekStatus};
use paddock_env::{DriverId, RaceId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RacePhase {
    #[default]
    NotStarted,
    QualifyingDone,
    RaceDone,
    PostRaceDone,
}

impl fmt::Display for RacePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RacePhase::NotStarted => "not started",
            RacePhase::QualifyingDone => "qualifying",
            RacePhase::RaceDone => "race",
            RacePhase::PostRaceDone => "post-race",
        };
        f.write_str(name)
    }
}

/// What post-race processing writes for one team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamReset {
    pub week_status: WeekStatus,
    /// New ratings when a bot car was upgraded
    pub car_stats: Option<Vec<CarStats>>,
}

/// Follow-up writes already applied for a race.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaceProgress {
    pub teams_locked: BTreeSet<TeamId>,
    pub drivers_awarded: BTreeSet<DriverId>,
    pub teams_awarded: BTreeSet<TeamId>,
    /// Last step of the race phase
    pub calendar_completed: bool,
    /// Post-race targets, fixed before any of them is written
    pub post_race_plan: Option<BTreeMap<TeamId, TeamReset>>,
}

/// Everything persisted about one race weekend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceRecord {
    pub id: RaceId,
    pub league_id: String,
    pub season_id: String,
    pub event_id: String,
    pub track_name: String,
    pub circuit_id: String,
    pub phase: RacePhase,
    #[serde(default)]
    pub grid: Vec<QualifyingResult>,
    #[serde(default)]
    pub result: Option<RaceResult>,
    #[serde(default)]
    pub live_duration_secs: u64,
    #[serde(default)]
    pub update_interval_secs: u64,
    /// Earliest wall-clock time post-race processing may run
    #[serde(default)]
    pub post_race_at: Option<SystemTime>,
    #[serde(default)]
    pub progress: RaceProgress,
}

impl RaceRecord {
    pub fn new(league_id: &str, season: &Season, entry: &CalendarEntry) -> Self {
        Self {
            id: season.race_id(entry),
            league_id: league_id.to_string(),
            season_id: season.id.clone(),
            event_id: entry.id.clone(),
            track_name: entry.track_name.clone(),
            circuit_id: entry.circuit_id.clone(),
            phase: RacePhase::NotStarted,
            grid: Vec::new(),
            result: None,
            live_duration_secs: 0,
            update_interval_secs: 0,
            post_race_at: None,
            progress: RaceProgress::default(),
        }
    }

    pub fn has_grid(&self) -> bool {
        self.phase >= RacePhase::QualifyingDone
    }

    pub fn is_finished(&self) -> bool {
        self.phase >= RacePhase::RaceDone
    }

    /// True once the race result and every write that follows it are stored.
    pub fn is_settled(&self) -> bool {
        self.is_finished() && self.progress.calendar_completed
    }

    pub fn post_race_processed(&self) -> bool {
        self.phase == RacePhase::PostRaceDone
    }

    /// True once the race is settled, unprocessed, and its scheduled
    /// post-race time has passed.
    pub fn post_race_due(&self, now: SystemTime) -> bool {
        self.phase == RacePhase::RaceDone
            && self.is_settled()
            && self.post_race_at.map(|at| now >= at).unwrap_or(false)
    }

    fn expect_phase(&self, required: RacePhase, target: RacePhase) -> Result<(), PhaseError> {
        if self.phase >= target {
            return Err(PhaseError::AlreadyProcessed {
                race_id: self.id.clone(),
                phase: target,
            });
        }
        if self.phase < required {
            return Err(PhaseError::NotReady {
                race_id: self.id.clone(),
                phase: required,
            });
        }
        Ok(())
    }

    pub fn record_qualifying(&mut self, grid: Vec<QualifyingResult>) -> Result<(), PhaseError> {
        self.expect_phase(RacePhase::NotStarted, RacePhase::QualifyingDone)?;
        self.grid = grid;
        self.phase = RacePhase::QualifyingDone;
        Ok(())
    }

    pub fn record_race(
        &mut self,
        result: RaceResult,
        live_duration_secs: u64,
        update_interval_secs: u64,
        post_race_at: SystemTime,
    ) -> Result<(), PhaseError> {
        self.expect_phase(RacePhase::QualifyingDone, RacePhase::RaceDone)?;
        self.result = Some(result);
        self.live_duration_secs = live_duration_secs;
        self.update_interval_secs = update_interval_secs;
        self.post_race_at = Some(post_race_at);
        self.phase = RacePhase::RaceDone;
        Ok(())
    }

    pub fn mark_post_race_processed(&mut self) -> Result<(), PhaseError> {
        self.expect_phase(RacePhase::RaceDone, RacePhase::PostRaceDone)?;
        self.phase = RacePhase::PostRaceDone;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn record() -> RaceRecord {
        let season = Season {
            id: "s1".into(),
            league_id: "l1".into(),
            calendar: vec![CalendarEntry {
                id: "r1".into(),
                circuit_id: "mexico".into(),
                track_name: "Autodromo".into(),
                completed: false,
            }],
        };
        RaceRecord::new("l1", &season, &season.calendar[0])
    }

    fn empty_result() -> RaceResult {
        RaceResult {
            laps: Vec::new(),
            final_positions: BTreeMap::new(),
            total_times: BTreeMap::new(),
            dnfs: Vec::new(),
        }
    }

    #[test]
    fn test_happy_path() {
        let mut r = record();
        assert_eq!(r.id.as_str(), "s1_r1");
        assert_eq!(r.phase, RacePhase::NotStarted);

        r.record_qualifying(Vec::new()).unwrap();
        assert!(r.has_grid());
        assert!(!r.is_finished());

        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(3600);
        r.record_race(empty_result(), 5000, 120, at).unwrap();
        assert!(r.is_finished());
        assert!(!r.is_settled());
        assert!(!r.post_race_due(at));

        r.progress.calendar_completed = true;
        assert!(r.is_settled());
        assert!(!r.post_race_due(SystemTime::UNIX_EPOCH));
        assert!(r.post_race_due(at));

        r.mark_post_race_processed().unwrap();
        assert!(r.post_race_processed());
        assert!(!r.post_race_due(at));
    }

    #[test]
    fn test_replay_rejected() {
        let mut r = record();
        r.record_qualifying(Vec::new()).unwrap();
        let err = r.record_qualifying(Vec::new()).unwrap_err();
        assert_eq!(
            err,
            PhaseError::AlreadyProcessed {
                race_id: r.id.clone(),
                phase: RacePhase::QualifyingDone
            }
        );
    }

    #[test]
    fn test_race_without_grid_not_ready() {
        let mut r = record();
        let err = r
            .record_race(empty_result(), 0, 120, SystemTime::UNIX_EPOCH)
            .unwrap_err();
        assert!(matches!(err, PhaseError::NotReady { phase: RacePhase::QualifyingDone, .. }));
        assert_eq!(r.phase, RacePhase::NotStarted);
    }

    #[test]
    fn test_post_race_before_race_not_ready() {
        let mut r = record();
        r.record_qualifying(Vec::new()).unwrap();
        assert!(matches!(
            r.mark_post_race_processed(),
            Err(PhaseError::NotReady { phase: RacePhase::RaceDone, .. })
        ));
    }

    #[test]
    fn test_progress_survives_json() {
        let mut r = record();
        r.progress.teams_locked.insert(TeamId::from("t1"));
        r.progress.drivers_awarded.insert(DriverId::from("d1"));
        let json = serde_json::to_string(&r).unwrap();
        let back: RaceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.progress, r.progress);
    }

    #[test]
    fn test_records_without_progress_still_load() {
        let mut value = serde_json::to_value(record()).unwrap();
        value.as_object_mut().unwrap().remove("progress");
        let back: RaceRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.progress, RaceProgress::default());
    }

    #[test]
    fn test_qualifying_after_race_rejected() {
        let mut r = record();
        r.record_qualifying(Vec::new()).unwrap();
        r.record_race(empty_result(), 0, 120, SystemTime::UNIX_EPOCH).unwrap();
        assert!(matches!(r.record_qualifying(Vec::new()), Err(PhaseError::AlreadyProcessed { .. })));
    }
}
