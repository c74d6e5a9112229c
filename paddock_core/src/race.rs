//! The race loop: drives every entrant through every lap, keeps the running
//! order, detects overtakes and assembles the full lap-by-lap log.

use crate::circuit::CircuitProfile;
use crate::entrant::{EntrantRaceState, LapStep, RaceEntrant};
use crate::setup::TyreCompound;
use paddock_env::{DriverId, RandomSource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Flat penalty for finishing without ever fitting the hard compound.
pub const HARD_COMPOUND_PENALTY: f64 = 35.0;

/// Narrative event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Crash,
    Pit,
    Overtake,
    Info,
}

/// One narrative event in the race log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEvent {
    pub lap: u32,
    pub driver_id: DriverId,
    pub description: String,
    pub kind: EventKind,
}

impl RaceEvent {
    pub fn new(lap: u32, driver_id: &DriverId, kind: EventKind, description: impl Into<String>) -> Self {
        Self {
            lap,
            driver_id: driver_id.clone(),
            description: description.into(),
            kind,
        }
    }
}

/// Everything that happened on one lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub lap: u32,
    /// Lap times of entrants that completed the lap
    pub lap_times: BTreeMap<DriverId, f64>,
    /// 1-based running order after the lap, DNFs included at the back
    pub positions: BTreeMap<DriverId, usize>,
    pub tyres: BTreeMap<DriverId, TyreCompound>,
    pub events: Vec<RaceEvent>,
}

/// Complete output of one race simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub laps: Vec<LapRecord>,
    /// 1-based final classification
    pub final_positions: BTreeMap<DriverId, usize>,
    pub total_times: BTreeMap<DriverId, f64>,
    /// Retired entrants in the order they crashed
    pub dnfs: Vec<DriverId>,
}

impl RaceResult {
    pub fn is_dnf(&self, driver_id: &DriverId) -> bool {
        self.dnfs.contains(driver_id)
    }

    /// Driver ids in final classification order.
    pub fn classification(&self) -> Vec<DriverId> {
        let mut order: Vec<_> = self.final_positions.iter().collect();
        order.sort_by_key(|(_, pos)| **pos);
        order.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Laps `1, 1 + stride, 1 + 2*stride, ...` plus the last logged lap.
    ///
    /// Selection goes by lap number, so sampling an already sampled log
    /// returns it unchanged.
    pub fn key_laps(&self, stride: usize) -> Vec<&LapRecord> {
        let stride = stride.max(1) as u32;
        let last = self.laps.last().map(|lap| lap.lap);
        self.laps
            .iter()
            .filter(|lap| lap.lap.saturating_sub(1) % stride == 0 || Some(lap.lap) == last)
            .collect()
    }

    /// All events of a kind across the whole race.
    pub fn events_of(&self, kind: EventKind) -> impl Iterator<Item = &RaceEvent> {
        self.laps
            .iter()
            .flat_map(|lap| lap.events.iter())
            .filter(move |e| e.kind == kind)
    }
}

/// Simulates a full race from the starting grid order in `entrants`.
pub fn simulate_race<R: RandomSource + ?Sized>(
    circuit: &CircuitProfile,
    entrants: &[RaceEntrant],
    rng: &mut R,
) -> RaceResult {
    let total_laps = circuit.laps;
    let by_id: HashMap<&DriverId, &RaceEntrant> = entrants.iter().map(|e| (&e.driver_id, e)).collect();
    let mut states: HashMap<DriverId, EntrantRaceState> = entrants
        .iter()
        .map(|e| (e.driver_id.clone(), EntrantRaceState::new(&e.setup)))
        .collect();

    let mut order: Vec<DriverId> = entrants.iter().map(|e| e.driver_id.clone()).collect();
    let mut dnfs: Vec<DriverId> = Vec::new();
    let mut laps = Vec::with_capacity(total_laps as usize);

    for lap in 1..=total_laps {
        let mut lap_times = BTreeMap::new();
        let mut events = Vec::new();

        for driver_id in &order {
            let (Some(entrant), Some(state)) = (by_id.get(driver_id), states.get_mut(driver_id)) else {
                continue;
            };
            match state.advance(entrant, circuit, lap, total_laps, &mut events, rng) {
                LapStep::Completed { lap_time, .. } => {
                    lap_times.insert(driver_id.clone(), lap_time);
                }
                LapStep::Retired => dnfs.push(driver_id.clone()),
                LapStep::Idle => {}
            }
        }

        let new_order = running_order(&order, &states, &dnfs);
        detect_overtakes(lap, &order, &new_order, &dnfs, &by_id, &mut events);
        order = new_order;

        laps.push(LapRecord {
            lap,
            lap_times,
            positions: positions(&order),
            tyres: states.iter().map(|(id, s)| (id.clone(), s.compound)).collect(),
            events,
        });
    }

    for driver_id in &order {
        let Some(state) = states.get_mut(driver_id) else { continue };
        if state.dnf || state.used_hard {
            continue;
        }
        state.cumulative_time += HARD_COMPOUND_PENALTY;
        if let Some(last) = laps.last_mut() {
            last.events.push(RaceEvent::new(
                total_laps,
                driver_id,
                EventKind::Info,
                "35s PENALTY: Failed to use Hard compound",
            ));
        }
    }

    let order = running_order(&order, &states, &dnfs);
    RaceResult {
        laps,
        final_positions: positions(&order),
        total_times: states.iter().map(|(id, s)| (id.clone(), s.cumulative_time)).collect(),
        dnfs,
    }
}

/// Classified entrants by ascending cumulative time (stable on ties), then
/// retired entrants in crash order.
fn running_order(
    previous: &[DriverId],
    states: &HashMap<DriverId, EntrantRaceState>,
    dnfs: &[DriverId],
) -> Vec<DriverId> {
    let time = |id: &DriverId| states.get(id).map(|s| s.cumulative_time).unwrap_or(0.0);
    let mut classified: Vec<DriverId> = previous.iter().filter(|id| !dnfs.contains(id)).cloned().collect();
    classified.sort_by(|a, b| time(a).total_cmp(&time(b)));
    classified.extend(dnfs.iter().cloned());
    classified
}

fn positions(order: &[DriverId]) -> BTreeMap<DriverId, usize> {
    order.iter().enumerate().map(|(i, id)| (id.clone(), i + 1)).collect()
}

/// Emits an OVERTAKE event for every classified entrant whose position
/// index improved since the previous lap.
fn detect_overtakes(
    lap: u32,
    previous: &[DriverId],
    current: &[DriverId],
    dnfs: &[DriverId],
    entrants: &HashMap<&DriverId, &RaceEntrant>,
    events: &mut Vec<RaceEvent>,
) {
    for (idx, driver_id) in current.iter().enumerate() {
        if dnfs.contains(driver_id) {
            continue;
        }
        let Some(old_idx) = previous.iter().position(|id| id == driver_id) else {
            continue;
        };
        if idx >= old_idx {
            continue;
        }

        let description = match current.get(idx + 1) {
            Some(passed_id) => {
                let passed = entrants.get(passed_id).map(|e| e.name.as_str()).unwrap_or("rival");
                overtake_phrase(current.len(), idx + 1, passed)
            }
            None => "Overtake move!".to_string(),
        };
        events.push(RaceEvent::new(lap, driver_id, EventKind::Overtake, description));
    }
}

/// Flavour text for a pass, chosen by field size.
fn overtake_phrase(field_size: usize, position: usize, passed: &str) -> String {
    match field_size % 4 {
        0 => format!("Dives down the inside of {}!", passed),
        1 => format!("Moves past {} for P{}!", passed, position),
        2 => format!("Great move on {}!", passed),
        _ => format!("Takes P{} from {}!", position, passed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::circuit;
    use crate::role::ManagerRole;
    use crate::setup::{CarStats, DriverStats, DrivingStyle, Setup};
    use paddock_env::{SequenceSource, TeamId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn entrant(id: &str, setup: Setup) -> RaceEntrant {
        RaceEntrant {
            driver_id: DriverId::from(id),
            name: format!("Driver {}", id),
            team_id: TeamId::from("t1"),
            car: Some(CarStats::new(12, 12, 12)),
            driver: DriverStats::default(),
            setup,
            role: ManagerRole::None,
        }
    }

    fn safe_setup() -> Setup {
        Setup {
            race_style: DrivingStyle::Defensive,
            pit_stop_styles: vec![DrivingStyle::Defensive],
            ..Setup::default()
        }
    }

    #[test]
    fn test_every_lap_is_logged() {
        let vegas = circuit("vegas");
        let entrants = vec![entrant("a", safe_setup()), entrant("b", safe_setup())];
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let result = simulate_race(vegas, &entrants, &mut rng);

        assert_eq!(result.laps.len(), vegas.laps as usize);
        for (i, lap) in result.laps.iter().enumerate() {
            assert_eq!(lap.lap, i as u32 + 1);
            assert_eq!(lap.positions.len(), 2);
        }
        assert_eq!(result.final_positions.len(), 2);
    }

    #[test]
    fn test_dnfs_classified_last() {
        let mexico = circuit("mexico");
        let entrants: Vec<_> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|id| entrant(id, Setup { race_style: DrivingStyle::MostRisky, ..Setup::default() }))
            .collect();

        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = simulate_race(mexico, &entrants, &mut rng);

            let worst_classified = result
                .final_positions
                .iter()
                .filter(|(id, _)| !result.is_dnf(id))
                .map(|(_, pos)| *pos)
                .max()
                .unwrap_or(0);
            for dnf in &result.dnfs {
                assert!(result.final_positions[dnf] > worst_classified);
            }

            let mut positions: Vec<_> = result.final_positions.values().copied().collect();
            positions.sort();
            assert_eq!(positions, (1..=entrants.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_cumulative_time_monotone() {
        let interlagos = circuit("interlagos");
        let entrants = vec![entrant("a", safe_setup()), entrant("b", safe_setup()), entrant("c", safe_setup())];
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let result = simulate_race(interlagos, &entrants, &mut rng);

        for lap in &result.laps {
            for time in lap.lap_times.values() {
                assert!(*time > 0.0);
            }
        }
        // Penalties only ever add to the logged laps
        for (id, total) in &result.total_times {
            let logged: f64 = result.laps.iter().filter_map(|l| l.lap_times.get(id)).sum();
            assert!(logged <= *total + 1e-6);
        }
    }

    #[test]
    fn test_hard_compound_penalty_applied_once_at_end() {
        // Every planned stop goes back on mediums, so hards are never fitted
        let generic = circuit("unknown-track");
        let setup = Setup {
            initial_fuel: 200.0,
            race_style: DrivingStyle::Defensive,
            pit_stops: vec![TyreCompound::Medium; 4],
            pit_stop_styles: vec![DrivingStyle::Defensive; 4],
            pit_stop_fuel: vec![200.0; 4],
            ..Setup::default()
        };
        let entrants = vec![entrant("a", setup)];
        let mut rng = SequenceSource::constant(0.99);
        let result = simulate_race(generic, &entrants, &mut rng);

        let id = DriverId::from("a");
        let logged: f64 = result.laps.iter().filter_map(|l| l.lap_times.get(&id)).sum();
        let penalties: Vec<_> = result
            .events_of(EventKind::Info)
            .filter(|e| e.description.starts_with("35s PENALTY"))
            .collect();

        assert!(result.events_of(EventKind::Pit).count() > 0);
        assert_eq!(penalties.len(), 1);
        assert_eq!(penalties[0].lap, generic.laps);
        assert!((result.total_times[&id] - logged - HARD_COMPOUND_PENALTY).abs() < 1e-6);
    }

    #[test]
    fn test_starting_on_hards_avoids_penalty() {
        let generic = circuit("generic");
        let setup = Setup {
            tyre_compound: TyreCompound::Hard,
            initial_fuel: 200.0,
            race_style: DrivingStyle::Defensive,
            ..Setup::default()
        };
        let entrants = vec![entrant("a", setup)];
        let mut rng = SequenceSource::constant(0.99);
        let result = simulate_race(generic, &entrants, &mut rng);
        assert!(result.dnfs.is_empty());
        assert_eq!(result.events_of(EventKind::Info).filter(|e| e.description.starts_with("35s")).count(), 0);
    }

    #[test]
    fn test_overtake_phrase_rotates_with_field_size() {
        assert_eq!(overtake_phrase(4, 2, "Max"), "Dives down the inside of Max!");
        assert_eq!(overtake_phrase(5, 2, "Max"), "Moves past Max for P2!");
        assert_eq!(overtake_phrase(6, 2, "Max"), "Great move on Max!");
        assert_eq!(overtake_phrase(7, 3, "Max"), "Takes P3 from Max!");
    }

    #[test]
    fn test_overtake_detected_when_position_improves() {
        let a = entrant("a", Setup::default());
        let b = entrant("b", Setup::default());
        let by_id: HashMap<&DriverId, &RaceEntrant> = [(&a.driver_id, &a), (&b.driver_id, &b)].into_iter().collect();

        let previous = vec![a.driver_id.clone(), b.driver_id.clone()];
        let current = vec![b.driver_id.clone(), a.driver_id.clone()];
        let mut events = Vec::new();
        detect_overtakes(3, &previous, &current, &[], &by_id, &mut events);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].driver_id, b.driver_id);
        assert_eq!(events[0].kind, EventKind::Overtake);
        assert_eq!(events[0].description, "Great move on Driver a!");
    }

    #[test]
    fn test_crash_order_preserved_among_dnfs() {
        let mut states = HashMap::new();
        for (id, t) in [("a", 10.0), ("b", 5.0), ("c", 1.0), ("d", 2.0)] {
            let mut s = EntrantRaceState::new(&Setup::default());
            s.cumulative_time = t;
            states.insert(DriverId::from(id), s);
        }
        let previous: Vec<_> = ["a", "b", "c", "d"].iter().map(|s| DriverId::from(*s)).collect();
        let dnfs = vec![DriverId::from("d"), DriverId::from("c")];
        let order = running_order(&previous, &states, &dnfs);
        let names: Vec<_> = order.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn test_key_laps_sampling() {
        let vegas = circuit("vegas");
        let entrants = vec![entrant("a", safe_setup())];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let result = simulate_race(vegas, &entrants, &mut rng);

        let sampled: Vec<u32> = result.key_laps(5).iter().map(|l| l.lap).collect();
        assert_eq!(sampled.first(), Some(&1));
        assert_eq!(sampled.last(), Some(&vegas.laps));
        assert!(sampled.contains(&6));
        assert!(!sampled.contains(&2));
    }

    #[test]
    fn test_key_laps_idempotent() {
        let vegas = circuit("vegas");
        let entrants = vec![entrant("a", safe_setup())];
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut result = simulate_race(vegas, &entrants, &mut rng);

        let once: Vec<LapRecord> = result.key_laps(5).into_iter().cloned().collect();
        result.laps = once.clone();
        let twice: Vec<LapRecord> = result.key_laps(5).into_iter().cloned().collect();
        assert_eq!(twice, once);
    }
}
