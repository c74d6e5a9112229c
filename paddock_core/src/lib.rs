//! Paddock Core - race weekend engines
//!
//! Turns static inputs (circuit profile, car ratings, driver ratings, team
//! setups and strategies) into a qualifying grid, a lap-by-lap race,
//! a final classification, points and prize money.
//!
//! The engines are layered, leaves first:
//! 1. **Circuit catalog**: static per-track parameters
//! 2. **Performance model**: one lap's time and crash outcome
//! 3. **Entrant state machine**: tyres, fuel, stops and retirement per lap
//! 4. **Race loop**: running order, overtakes and the full race log
//! 5. **Scoring**: points, podiums and prize money
//! 6. **Weekend orchestrator**: idempotent qualifying, race and post-race
//!    phases across leagues
//!
//! Everything below the orchestrator is synchronous and pure apart from the
//! injected [`paddock_env::RandomSource`].

pub mod circuit;
pub mod setup;
pub mod role;
pub mod performance;
pub mod entrant;
pub mod race;
pub mod qualifying;
pub mod scoring;
pub mod strategy;
pub mod store;
pub mod news;
pub mod phase;
pub mod error;
pub mod weekend;

// Re-export key types for convenience
pub use circuit::{circuit, CircuitProfile};
pub use setup::{CarStats, DriverStats, DrivingStyle, Setup, TyreCompound};
pub use role::ManagerRole;
pub use performance::{simulate_lap, LapInput, LapOutcome};
pub use entrant::{EntrantRaceState, RaceEntrant};
pub use race::{simulate_race, EventKind, LapRecord, RaceEvent, RaceResult};
pub use qualifying::{run_qualifying, QualifyingEntry, QualifyingResult};
pub use scoring::{score_race, PrizeScheme, ScoreSheet};
pub use store::{Driver, League, LeagueStore, Manager, Season, Team, WeekStatus};
pub use news::{Newsroom, OfficeNews, PressNews};
pub use phase::{RacePhase, RaceRecord};
pub use error::{PhaseError, WeekendError};
pub use weekend::{LeagueOutcome, PhaseReport, SkipReason, Stage, WeekendConfig, WeekendOrchestrator};
