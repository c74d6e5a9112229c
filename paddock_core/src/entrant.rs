//! Per-entrant race state, advanced one lap at a time.
//!
//! ```text
//!            ┌────────── lap ──────────┐
//!            ▼                         │
//!        RUNNING ── wear > 80 or low fuel (laps remain) ──► PIT ──┘
//!            │
//!            └── crash roll ──► DNF (terminal)
//! ```

use crate::circuit::CircuitProfile;
use crate::performance::{simulate_lap, LapInput};
use crate::race::{EventKind, RaceEvent};
use crate::role::ManagerRole;
use crate::setup::{CarStats, DriverStats, DrivingStyle, Setup, TyreCompound};
use paddock_env::{DriverId, RandomSource, TeamId};

/// Fuel burned per lap before circuit and style multipliers.
pub const BASE_FUEL_PER_LAP: f64 = 2.5;

/// Wear above which the entrant pits for fresh tyres.
pub const WEAR_PIT_THRESHOLD: f64 = 80.0;

/// Penalty for running the tank dry on a lap.
pub const OUT_OF_FUEL_PENALTY: f64 = 10.0;

/// Fuel left in the tank after running dry.
pub const LIMP_FUEL: f64 = 0.5;

/// Refuel target once the per-stop fuel plan is exhausted.
pub const DEFAULT_REFUEL: f64 = 50.0;

/// Minimum stationary time of a stop; up to 2 s more is drawn per stop.
pub const PIT_BASE_TIME: f64 = 24.0;
const PIT_TIME_SPREAD: f64 = 2.0;

/// Laps of fuel that must remain after this lap to avoid a stop.
const FUEL_RESERVE_LAPS: f64 = 2.5;

const BASE_WEAR_PER_LAP: f64 = 4.5;
const WEAR_PENALTY_SCALE: f64 = 8.0;
const FUEL_WEIGHT_PENALTY: f64 = 1.5;

/// A driver entered in a race with everything the simulation reads.
#[derive(Debug, Clone)]
pub struct RaceEntrant {
    pub driver_id: DriverId,
    pub name: String,
    pub team_id: TeamId,
    /// `None` when the team has no ratings for the driver's car slot
    pub car: Option<CarStats>,
    pub driver: DriverStats,
    pub setup: Setup,
    pub role: ManagerRole,
}

/// What happened to an entrant on one lap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LapStep {
    /// Entrant was already out; nothing simulated.
    Idle,
    /// Entrant crashed this lap and is now DNF.
    Retired,
    /// Entrant completed the lap in `lap_time` seconds.
    Completed { lap_time: f64, pitted: bool },
}

/// Mutable race state of one entrant, owned by the race loop.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrantRaceState {
    pub cumulative_time: f64,
    pub tyre_wear: f64,
    pub fuel: f64,
    pub compound: TyreCompound,
    pub style: DrivingStyle,
    pub stops: usize,
    pub used_hard: bool,
    pub dnf: bool,
}

impl EntrantRaceState {
    /// Starting state derived from the race setup.
    pub fn new(setup: &Setup) -> Self {
        Self {
            cumulative_time: 0.0,
            tyre_wear: 0.0,
            fuel: setup.initial_fuel,
            compound: setup.tyre_compound,
            style: setup.race_style,
            stops: 0,
            used_hard: setup.tyre_compound == TyreCompound::Hard,
            dnf: false,
        }
    }

    /// Advances the entrant through lap `lap` of `total_laps`, pushing any
    /// narrative events into `events`.
    pub fn advance<R: RandomSource + ?Sized>(
        &mut self,
        entrant: &RaceEntrant,
        circuit: &CircuitProfile,
        lap: u32,
        total_laps: u32,
        events: &mut Vec<RaceEvent>,
        rng: &mut R,
    ) -> LapStep {
        if self.dnf {
            return LapStep::Idle;
        }

        let outcome = simulate_lap(
            &LapInput {
                circuit,
                car: entrant.car.as_ref(),
                driver: &entrant.driver,
                setup: &entrant.setup,
                style: self.style,
                role: entrant.role,
            },
            rng,
        );

        if outcome.crashed {
            self.dnf = true;
            events.push(RaceEvent::new(lap, &entrant.driver_id, EventKind::Crash, "CRASH: Retired from race"));
            return LapStep::Retired;
        }

        let mut lap_time = entrant.role.race_pace(outcome.lap_time);
        lap_time += (self.tyre_wear / 100.0).powi(2) * WEAR_PENALTY_SCALE;
        lap_time += (self.fuel / 100.0) * FUEL_WEIGHT_PENALTY;

        let base_consumption = BASE_FUEL_PER_LAP * circuit.fuel_consumption_multiplier;
        self.fuel -= base_consumption * self.style.fuel_multiplier();

        if self.fuel <= 0.0 {
            lap_time += OUT_OF_FUEL_PENALTY;
            self.fuel = LIMP_FUEL;
            events.push(RaceEvent::new(lap, &entrant.driver_id, EventKind::Info, "OUT OF FUEL: Limping to pits"));
        }

        let needs_tyres = self.tyre_wear > WEAR_PIT_THRESHOLD;
        let needs_fuel = self.fuel < base_consumption * FUEL_RESERVE_LAPS;
        let pitted = (needs_tyres || needs_fuel) && lap < total_laps;

        if pitted {
            lap_time += PIT_BASE_TIME + rng.uniform() * PIT_TIME_SPREAD;
            let compound = self.pit(&entrant.setup);
            events.push(RaceEvent::new(
                lap,
                &entrant.driver_id,
                EventKind::Pit,
                format!("In for a stop! Swapping to {}s.", compound.name().to_uppercase()),
            ));
        } else {
            self.tyre_wear += BASE_WEAR_PER_LAP
                * circuit.tyre_wear_multiplier
                * self.compound.wear_multiplier()
                * self.style.wear_multiplier()
                + rng.uniform();
            self.tyre_wear = entrant.role.tyre_wear(self.tyre_wear);
        }

        self.cumulative_time += lap_time;
        LapStep::Completed { lap_time, pitted }
    }

    /// Services a stop from the setup's plan and returns the new compound.
    fn pit(&mut self, setup: &Setup) -> TyreCompound {
        let stop = self.stops;
        let compound = self.next_compound(&setup.pit_stops);

        self.tyre_wear = 0.0;
        self.fuel = setup.pit_stop_fuel.get(stop).copied().unwrap_or(DEFAULT_REFUEL);
        self.style = setup.pit_stop_styles.get(stop).copied().unwrap_or_default();
        self.compound = compound;
        self.stops += 1;
        if compound == TyreCompound::Hard {
            self.used_hard = true;
        }
        compound
    }

    /// Next planned compound; once the plan runs out, hard if it was never
    /// fitted, otherwise the last planned compound again.
    fn next_compound(&self, plan: &[TyreCompound]) -> TyreCompound {
        match plan.get(self.stops) {
            Some(compound) => *compound,
            None if self.used_hard => plan.last().copied().unwrap_or(TyreCompound::Medium),
            None => TyreCompound::Hard,
        }
    }
}
