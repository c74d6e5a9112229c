//! JSON exporter for finished races.
//!
//! Writes the classification and a sampled lap log of one race so a run can
//! be inspected or replayed by external tooling.

use crate::sled_store::LAP_SAMPLE_STRIDE;
use paddock_core::circuit::circuit;
use paddock_core::phase::RaceRecord;
use paddock_core::race::LapRecord;
use paddock_env::{DriverId, RaceId, TeamId};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// One row of the final classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedDriver {
    pub position: usize,
    pub driver_id: DriverId,
    pub driver_name: String,
    pub team_id: TeamId,
    pub team_name: String,

    /// Race time including penalties
    pub total_time: f64,

    pub dnf: bool,
}

/// Complete race export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    pub race_id: RaceId,
    pub league_id: String,
    pub circuit_id: String,
    pub track_name: String,
    pub total_laps: u32,

    pub classification: Vec<ClassifiedDriver>,

    /// Every fifth lap plus the last
    pub laps: Vec<LapRecord>,

    pub passed: bool,
}

impl RaceExport {
    /// Builds an export from a stored race. Returns `None` until the race
    /// has a result.
    pub fn from_record(scenario: &str, seed: u64, record: &RaceRecord) -> Option<Self> {
        let result = record.result.as_ref()?;
        let track = circuit(&record.circuit_id);

        let classification = result
            .classification()
            .into_iter()
            .enumerate()
            .map(|(idx, driver_id)| {
                let row = record.grid.iter().find(|r| r.driver_id == driver_id);
                ClassifiedDriver {
                    position: idx + 1,
                    driver_name: row.map(|r| r.driver_name.clone()).unwrap_or_default(),
                    team_id: row.map(|r| r.team_id.clone()).unwrap_or_default(),
                    team_name: row.map(|r| r.team_name.clone()).unwrap_or_default(),
                    total_time: result.total_times.get(&driver_id).copied().unwrap_or_default(),
                    dnf: result.is_dnf(&driver_id),
                    driver_id,
                }
            })
            .collect();

        // Stored logs may already be sampled; sampling again keeps them as is.
        let laps = result.key_laps(LAP_SAMPLE_STRIDE).into_iter().cloned().collect();

        Some(Self {
            scenario: scenario.to_string(),
            seed,
            race_id: record.id.clone(),
            league_id: record.league_id.clone(),
            circuit_id: record.circuit_id.clone(),
            track_name: record.track_name.clone(),
            total_laps: track.laps,
            classification,
            laps,
            passed: false,
        })
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool) {
        self.passed = passed;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ScenarioRunner;
    use crate::scenarios::ScenarioId;

    #[test]
    fn test_export_from_finished_race() {
        let result = ScenarioRunner::new(3).run(ScenarioId::FullWeekend);
        let record = result.last_race.expect("full weekend finishes a race");
        let export = RaceExport::from_record("full_weekend", 3, &record).unwrap();

        assert_eq!(export.classification.len(), record.grid.len());
        assert_eq!(export.classification[0].position, 1);
        assert!(export.laps.len() < export.total_laps as usize);
        assert_eq!(export.laps.last().map(|l| l.lap), Some(export.total_laps));

        let dnfs_last = export
            .classification
            .iter()
            .skip_while(|row| !row.dnf)
            .all(|row| row.dnf);
        assert!(dnfs_last);
    }

    #[test]
    fn test_no_export_without_result() {
        let result = ScenarioRunner::new(3).run(ScenarioId::FullWeekend);
        let mut record = result.last_race.unwrap();
        record.result = None;
        assert!(RaceExport::from_record("x", 3, &record).is_none());
    }

    #[test]
    fn test_written_json_parses() {
        let result = ScenarioRunner::new(11).run(ScenarioId::FullWeekend);
        let mut export = RaceExport::from_record("full_weekend", 11, result.last_race.as_ref().unwrap()).unwrap();
        export.finalize(result.passed);

        let path = std::env::temp_dir().join(format!("paddock-export-{}.json", std::process::id()));
        export.write_to_file(path.to_str().unwrap()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let parsed: RaceExport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.race_id, export.race_id);
        assert_eq!(parsed.classification.len(), export.classification.len());
        assert!(parsed.passed);
    }
}
