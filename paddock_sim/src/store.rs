//! Store seams used by the harness on top of the core's `LeagueStore`.

use paddock_core::store::{Driver, League, LeagueStore, Manager, Season, Team};
use paddock_env::EnvError;

/// Seeding interface for fixtures.
pub trait FixtureSink {
    fn insert_league(&self, league: League) -> Result<(), EnvError>;

    fn insert_season(&self, season: Season) -> Result<(), EnvError>;

    fn insert_team(&self, team: Team) -> Result<(), EnvError>;

    fn insert_driver(&self, driver: Driver) -> Result<(), EnvError>;

    fn insert_manager(&self, manager: Manager) -> Result<(), EnvError>;
}

/// A store the scenario runner can both seed and run weekends against.
pub trait ScenarioStore: LeagueStore + FixtureSink {}

impl<T: LeagueStore + FixtureSink> ScenarioStore for T {}
