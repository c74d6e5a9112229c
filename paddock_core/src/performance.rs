//! The performance model: one lap's time and crash outcome.
//!
//! Pure function of circuit, car, driver, setup, style and manager role. All
//! randomness comes from the caller's [`RandomSource`]; a lap consumes exactly
//! two draws (crash roll, then jitter) whether or not it crashes.

use crate::circuit::CircuitProfile;
use crate::role::ManagerRole;
use crate::setup::{CarStats, DriverStats, DrivingStyle, Setup};
use paddock_env::RandomSource;

/// Lap time reported for a crashed lap.
pub const CRASH_LAP_TIME: f64 = 999.0;

/// Setup deviation (in setup units) absorbed before any penalty applies.
const SETUP_TOLERANCE: f64 = 3.0;

/// Best-case lap-time reduction from a maxed-out car.
const MAX_CAR_GAIN: f64 = 0.25;

/// Full width of the symmetric lap jitter (±0.4 s).
const LAP_JITTER: f64 = 0.8;

/// Everything needed to simulate one lap.
#[derive(Debug, Clone, Copy)]
pub struct LapInput<'a> {
    pub circuit: &'a CircuitProfile,
    /// `None` when the team has no ratings for this slot (treated as 1/1/1)
    pub car: Option<&'a CarStats>,
    pub driver: &'a DriverStats,
    pub setup: &'a Setup,
    pub style: DrivingStyle,
    pub role: ManagerRole,
}

/// Result of a simulated lap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LapOutcome {
    pub lap_time: f64,
    pub crashed: bool,
}

/// Time lost to a setup that strays from the circuit's ideal.
///
/// Each axis is penalised only beyond a 3-unit tolerance band, scaled down by
/// how well the governing car rating masks the mistake.
pub fn setup_penalty(circuit: &CircuitProfile, car: &CarStats, setup: &Setup) -> f64 {
    let ideal = &circuit.ideal_setup;
    let (aero, powertrain, chassis) = car.clamped();
    let masking = |stat: f64| 1.0 - stat / 40.0;
    let excess = |actual: f64, target: f64| ((actual - target).abs() - SETUP_TOLERANCE).max(0.0);

    excess(setup.front_wing, ideal.front_wing) * 0.03 * masking(aero)
        + excess(setup.rear_wing, ideal.rear_wing) * 0.03 * masking(aero)
        + excess(setup.suspension, ideal.suspension) * 0.02 * masking(chassis)
        + excess(setup.gear_ratio, ideal.gear_ratio) * 0.025 * masking(powertrain)
}

/// Multiplicative lap-time factor from the car's weighted ratings.
pub fn car_factor(circuit: &CircuitProfile, car: &CarStats) -> f64 {
    let (aero, powertrain, chassis) = car.clamped();
    let weighted = aero * circuit.aero_weight
        + powertrain * circuit.powertrain_weight
        + chassis * circuit.chassis_weight;
    1.0 - (weighted / 20.0) * MAX_CAR_GAIN
}

/// Multiplicative lap-time factor from the driver's ratings.
pub fn driver_factor(driver: &DriverStats) -> f64 {
    let norm = |v: u32| v.min(100) as f64 / 100.0;
    let braking = norm(driver.braking);
    let cornering = norm(driver.cornering);
    let focus = norm(driver.focus);
    1.0 - (braking * 0.02 + cornering * 0.025 + (focus - 0.5) * 0.01)
}

/// Simulates a single lap.
pub fn simulate_lap<R: RandomSource + ?Sized>(input: &LapInput<'_>, rng: &mut R) -> LapOutcome {
    let default_car = CarStats::default();
    let car = input.car.unwrap_or(&default_car);

    let penalty = setup_penalty(input.circuit, car, input.setup);
    let car_scale = car_factor(input.circuit, car);
    let driver_scale = driver_factor(input.driver) - input.style.pace_bonus();

    let crash_probability = input.style.crash_probability() + input.role.extra_crash_probability();
    let crashed = rng.uniform() < crash_probability;

    let jitter = (rng.uniform() - 0.5) * LAP_JITTER;
    let lap_time = input.circuit.base_lap_time * car_scale * driver_scale + penalty + jitter;

    LapOutcome {
        lap_time: if crashed { CRASH_LAP_TIME } else { lap_time.max(0.0) },
        crashed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::circuit;
    use approx::assert_relative_eq;
    use paddock_env::SequenceSource;

    fn ideal_setup(circuit: &CircuitProfile) -> Setup {
        Setup {
            front_wing: circuit.ideal_setup.front_wing,
            rear_wing: circuit.ideal_setup.rear_wing,
            suspension: circuit.ideal_setup.suspension,
            gear_ratio: circuit.ideal_setup.gear_ratio,
            ..Setup::default()
        }
    }

    #[test]
    fn test_ideal_setup_has_no_penalty() {
        for profile in crate::circuit::all_circuits() {
            let setup = ideal_setup(profile);
            assert_eq!(setup_penalty(profile, &CarStats::default(), &setup), 0.0);
        }
    }

    #[test]
    fn test_tolerance_band_and_masking() {
        let mexico = circuit("mexico");
        let mut setup = ideal_setup(mexico);
        setup.front_wing += 3.0;
        assert_eq!(setup_penalty(mexico, &CarStats::new(10, 10, 10), &setup), 0.0);

        setup.front_wing = mexico.ideal_setup.front_wing - 13.0;
        let penalty = setup_penalty(mexico, &CarStats::new(10, 10, 10), &setup);
        assert_relative_eq!(penalty, 10.0 * 0.03 * 0.75, epsilon = 1e-12);

        // A better aero rating masks more of the same mistake
        let masked = setup_penalty(mexico, &CarStats::new(20, 10, 10), &setup);
        assert!(masked < penalty);
    }

    #[test]
    fn test_reference_lap_time() {
        let mexico = circuit("mexico");
        let setup = ideal_setup(mexico);
        let car = CarStats::new(10, 10, 10);
        let driver = DriverStats::default();
        let input = LapInput {
            circuit: mexico,
            car: Some(&car),
            driver: &driver,
            setup: &setup,
            style: DrivingStyle::Normal,
            role: ManagerRole::None,
        };

        // crash roll 0.99 (clean), jitter roll 0.5 (zero jitter)
        let mut rng = SequenceSource::new(vec![0.99, 0.5]);
        let outcome = simulate_lap(&input, &mut rng);

        assert!(!outcome.crashed);
        assert_relative_eq!(outcome.lap_time, 76.0 * 0.875 * 0.9775, epsilon = 1e-9);
        assert_eq!(rng.draws(), 2);
    }

    #[test]
    fn test_crash_reports_sentinel() {
        let mexico = circuit("mexico");
        let setup = Setup::default();
        let driver = DriverStats::default();
        let input = LapInput {
            circuit: mexico,
            car: None,
            driver: &driver,
            setup: &setup,
            style: DrivingStyle::Offensive,
            role: ManagerRole::None,
        };

        let mut rng = SequenceSource::new(vec![0.09, 0.0]);
        let outcome = simulate_lap(&input, &mut rng);
        assert!(outcome.crashed);
        assert_eq!(outcome.lap_time, CRASH_LAP_TIME);
        assert_eq!(rng.draws(), 2);
    }

    #[test]
    fn test_ex_driver_adds_crash_risk() {
        let vegas = circuit("vegas");
        let setup = Setup::default();
        let driver = DriverStats::default();
        let mut input = LapInput {
            circuit: vegas,
            car: None,
            driver: &driver,
            setup: &setup,
            style: DrivingStyle::Defensive,
            role: ManagerRole::None,
        };

        // 0.04 is above defensive's 1% but below 1% + 5%
        let clean = simulate_lap(&input, &mut SequenceSource::new(vec![0.04, 0.5]));
        assert!(!clean.crashed);

        input.role = ManagerRole::ExDriver;
        let crashed = simulate_lap(&input, &mut SequenceSource::new(vec![0.04, 0.5]));
        assert!(crashed.crashed);
    }

    #[test]
    fn test_style_pace_ordering() {
        let miami = circuit("miami");
        let setup = ideal_setup(miami);
        let driver = DriverStats::new(70, 70, 70);
        let lap = |style| {
            let input = LapInput {
                circuit: miami,
                car: None,
                driver: &driver,
                setup: &setup,
                style,
                role: ManagerRole::None,
            };
            simulate_lap(&input, &mut SequenceSource::new(vec![0.99, 0.5])).lap_time
        };

        let risky = lap(DrivingStyle::MostRisky);
        let offensive = lap(DrivingStyle::Offensive);
        let normal = lap(DrivingStyle::Normal);
        let defensive = lap(DrivingStyle::Defensive);
        assert!(risky < offensive && offensive < normal && normal < defensive);
    }

    #[test]
    fn test_jitter_bounds() {
        let texas = circuit("texas");
        let setup = ideal_setup(texas);
        let driver = DriverStats::default();
        let input = LapInput {
            circuit: texas,
            car: None,
            driver: &driver,
            setup: &setup,
            style: DrivingStyle::Normal,
            role: ManagerRole::None,
        };
        let low = simulate_lap(&input, &mut SequenceSource::new(vec![0.99, 0.0])).lap_time;
        let high = simulate_lap(&input, &mut SequenceSource::new(vec![0.99, 1.0])).lap_time;
        assert_relative_eq!(high - low, 0.8, epsilon = 1e-9);
    }
}
