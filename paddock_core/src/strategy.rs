//! Setup resolution: jittered near-ideal setups for bot teams, submitted or
//! default setups for human teams.

use crate::circuit::CircuitProfile;
use crate::setup::{DrivingStyle, Setup, TyreCompound};
use crate::store::DriverSetupSubmission;
use paddock_env::RandomSource;

/// Qualifying styles a bot draws from; normal is twice as likely.
const BOT_QUALIFYING_STYLES: [DrivingStyle; 4] = [
    DrivingStyle::Normal,
    DrivingStyle::Normal,
    DrivingStyle::Offensive,
    DrivingStyle::MostRisky,
];

const BOT_BASE_FUEL: f64 = 80.0;
const BOT_FUEL_SPREAD: f64 = 20.0;

/// The setup a driver will run, and whether it came from a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSetup {
    pub setup: Setup,
    pub submitted: bool,
}

/// Offset in `-5..=4` applied to one ideal axis.
fn jitter<R: RandomSource + ?Sized>(rng: &mut R) -> f64 {
    (rng.uniform() * 10.0).floor() - 5.0
}

fn near_ideal<R: RandomSource + ?Sized>(circuit: &CircuitProfile, rng: &mut R) -> Setup {
    let ideal = &circuit.ideal_setup;
    Setup {
        front_wing: ideal.front_wing + jitter(rng),
        rear_wing: ideal.rear_wing + jitter(rng),
        suspension: ideal.suspension + jitter(rng),
        gear_ratio: ideal.gear_ratio + jitter(rng),
        ..Setup::default()
    }
}

pub fn bot_qualifying_setup<R: RandomSource + ?Sized>(circuit: &CircuitProfile, rng: &mut R) -> Setup {
    let mut setup = near_ideal(circuit, rng);
    setup.qualifying_style = BOT_QUALIFYING_STYLES[rng.index(BOT_QUALIFYING_STYLES.len())];
    setup
}

/// Near-ideal setup with a heavy tank and a hard-then-medium two-stop plan.
pub fn bot_race_setup<R: RandomSource + ?Sized>(circuit: &CircuitProfile, rng: &mut R) -> Setup {
    let mut setup = near_ideal(circuit, rng);
    setup.initial_fuel = BOT_BASE_FUEL + (rng.uniform() * BOT_FUEL_SPREAD).floor();
    setup.pit_stops = vec![TyreCompound::Hard, TyreCompound::Medium];
    setup.pit_stop_fuel = vec![60.0, 40.0];
    setup.race_style = DrivingStyle::Normal;
    setup
}

/// Qualifying setup for one driver. Bots always count as submitted.
pub fn resolve_qualifying_setup<R: RandomSource + ?Sized>(
    circuit: &CircuitProfile,
    is_bot: bool,
    submission: Option<&DriverSetupSubmission>,
    rng: &mut R,
) -> ResolvedSetup {
    if is_bot {
        return ResolvedSetup {
            setup: bot_qualifying_setup(circuit, rng),
            submitted: true,
        };
    }

    let sent = submission.map(|s| s.sent).unwrap_or(false);
    let setup = submission
        .filter(|s| s.sent)
        .and_then(|s| s.qualifying.clone())
        .unwrap_or_default();
    ResolvedSetup { setup, submitted: sent }
}

/// Race setup for one driver, forced onto the compound it qualified on.
pub fn resolve_race_setup<R: RandomSource + ?Sized>(
    circuit: &CircuitProfile,
    is_bot: bool,
    submission: Option<&DriverSetupSubmission>,
    grid_compound: TyreCompound,
    rng: &mut R,
) -> Setup {
    let mut setup = if is_bot {
        bot_race_setup(circuit, rng)
    } else {
        submission
            .filter(|s| s.sent)
            .and_then(|s| s.race.clone())
            .unwrap_or_default()
    };
    setup.tyre_compound = grid_compound;
    setup
}
