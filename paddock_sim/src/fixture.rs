//! Seeded league fixtures.
//!
//! Builds leagues, seasons, teams, drivers and managers from a seed. Every
//! fixture mixes bot teams, human teams with sent setups, human teams with
//! unsent drafts and human teams with nothing submitted, and cycles manager
//! roles across teams.

use crate::store::FixtureSink;
use paddock_core::circuit::all_circuits;
use paddock_core::role::ManagerRole;
use paddock_core::setup::{CarStats, DriverStats, DrivingStyle, Setup, TyreCompound, CAR_SLOTS};
use paddock_core::store::{
    CalendarEntry, DriverSetupSubmission, Division, Driver, League, Manager, Season, Team, WeekStatus,
};
use paddock_env::{DriverId, EnvError, TeamId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

const DRIVER_NAMES: [&str; 16] = [
    "Ana Sol", "Bruno Vale", "Carla Reis", "Diego Luna", "Elena Cruz", "Fabio Neri", "Gina Paz", "Hugo Lara",
    "Ines Mora", "Joel Rios", "Kira Vega", "Leo Brandt", "Mara Quint", "Nico Salas", "Olga Petri", "Pablo Ruiz",
];

const ROLES: [ManagerRole; 4] = [
    ManagerRole::None,
    ManagerRole::ExDriver,
    ManagerRole::ExEngineer,
    ManagerRole::BusinessAdmin,
];

/// How a team takes part in the weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamKind {
    Bot,
    HumanSent,
    HumanDraft,
    HumanIdle,
}

impl TeamKind {
    fn for_index(idx: usize) -> Self {
        match idx % 4 {
            0 => TeamKind::Bot,
            1 => TeamKind::HumanSent,
            2 => TeamKind::HumanDraft,
            _ => TeamKind::HumanIdle,
        }
    }
}

/// Everything a fixture inserts.
#[derive(Debug, Clone, Default)]
pub struct FixtureData {
    pub leagues: Vec<League>,
    pub seasons: Vec<Season>,
    pub teams: Vec<Team>,
    pub drivers: Vec<Driver>,
    pub managers: Vec<Manager>,
}

impl FixtureData {
    pub fn team(&self, team_id: &TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| &t.id == team_id)
    }

    pub fn driver(&self, driver_id: &DriverId) -> Option<&Driver> {
        self.drivers.iter().find(|d| &d.id == driver_id)
    }
}

/// Seeded fixture generator.
#[derive(Debug, Clone)]
pub struct LeagueFixture {
    seed: u64,
    leagues: usize,
    teams_per_league: usize,
    races_per_season: usize,
}

impl LeagueFixture {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            leagues: 1,
            teams_per_league: 8,
            races_per_season: 3,
        }
    }

    pub fn with_leagues(mut self, leagues: usize) -> Self {
        self.leagues = leagues;
        self
    }

    pub fn with_teams(mut self, teams: usize) -> Self {
        self.teams_per_league = teams;
        self
    }

    pub fn with_races(mut self, races: usize) -> Self {
        self.races_per_season = races;
        self
    }

    /// Generates the fixture without inserting it anywhere.
    pub fn build(&self) -> FixtureData {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ 0xf1c7_0000);
        let skill: Normal<f64> = Normal::new(60.0, 15.0).expect("valid normal parameters");
        let circuits = all_circuits();
        let mut data = FixtureData::default();

        for l in 0..self.leagues {
            let league_id = format!("league-{}", l);
            let season_id = format!("season-{}", l);

            let calendar = (0..self.races_per_season)
                .map(|r| {
                    let circuit = &circuits[(l + r) % circuits.len()];
                    CalendarEntry {
                        id: format!("r{:02}", r + 1),
                        circuit_id: circuit.id.to_string(),
                        track_name: track_name(circuit.id),
                        completed: false,
                    }
                })
                .collect();
            data.seasons.push(Season {
                id: season_id.clone(),
                league_id: league_id.clone(),
                calendar,
            });

            let mut divisions = vec![
                Division { name: "Elite".into(), team_ids: Vec::new() },
                Division { name: "Challenger".into(), team_ids: Vec::new() },
            ];

            for t in 0..self.teams_per_league {
                let team_id = TeamId::new(format!("l{}-t{}", l, t));
                let kind = TeamKind::for_index(t);
                let manager_id = format!("m-{}", team_id);
                data.managers.push(Manager {
                    id: manager_id.clone(),
                    name: format!("Manager {}", team_id),
                    role: ROLES[t % ROLES.len()],
                });

                let mut week_status = WeekStatus::default();
                for slot in 0..CAR_SLOTS {
                    let driver_id = DriverId::new(format!("{}-d{}", team_id, slot));
                    let name_idx = (l * self.teams_per_league * CAR_SLOTS + t * CAR_SLOTS + slot) % DRIVER_NAMES.len();
                    let mut stat = || skill.sample(&mut rng).clamp(0.0, 100.0).round() as u32;
                    data.drivers.push(Driver {
                        id: driver_id.clone(),
                        name: DRIVER_NAMES[name_idx].to_string(),
                        team_id: team_id.clone(),
                        car_slot: slot,
                        stats: DriverStats::new(stat(), stat(), stat()),
                        ..Driver::default()
                    });

                    match kind {
                        TeamKind::HumanSent => {
                            week_status.driver_setups.insert(driver_id, submitted(&mut rng, true));
                        }
                        TeamKind::HumanDraft => {
                            week_status.driver_setups.insert(driver_id, submitted(&mut rng, false));
                        }
                        TeamKind::Bot | TeamKind::HumanIdle => {}
                    }
                }

                let car_stats = (0..CAR_SLOTS)
                    .map(|_| CarStats::new(rng.gen_range(1..=12), rng.gen_range(1..=12), rng.gen_range(1..=12)))
                    .collect();
                data.teams.push(Team {
                    id: team_id.clone(),
                    name: format!("Team {}-{}", l, t),
                    is_bot: kind == TeamKind::Bot,
                    car_stats,
                    manager_id: Some(manager_id),
                    week_status,
                    budget: 5_000_000,
                    ..Team::default()
                });
                let n_div = divisions.len();
                divisions[t % n_div].team_ids.push(team_id);
            }

            data.leagues.push(League {
                id: league_id,
                name: format!("League {}", l),
                divisions,
                current_season_id: Some(season_id),
            });
        }
        data
    }

    /// Generates the fixture and inserts it into `sink`.
    pub fn seed_into<S: FixtureSink + ?Sized>(&self, sink: &S) -> Result<FixtureData, EnvError> {
        let data = self.build();
        for league in &data.leagues {
            sink.insert_league(league.clone())?;
        }
        for season in &data.seasons {
            sink.insert_season(season.clone())?;
        }
        for team in &data.teams {
            sink.insert_team(team.clone())?;
        }
        for driver in &data.drivers {
            sink.insert_driver(driver.clone())?;
        }
        for manager in &data.managers {
            sink.insert_manager(manager.clone())?;
        }
        Ok(data)
    }
}

fn track_name(circuit_id: &str) -> String {
    circuit_id
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn submitted(rng: &mut ChaCha8Rng, sent: bool) -> DriverSetupSubmission {
    const STYLES: [DrivingStyle; 4] = [
        DrivingStyle::Normal,
        DrivingStyle::Offensive,
        DrivingStyle::Defensive,
        DrivingStyle::MostRisky,
    ];
    const COMPOUNDS: [TyreCompound; 3] = [TyreCompound::Soft, TyreCompound::Medium, TyreCompound::Hard];

    let mut axis = || rng.gen_range(20..=90) as f64;
    let base = Setup {
        front_wing: axis(),
        rear_wing: axis(),
        suspension: axis(),
        gear_ratio: axis(),
        ..Setup::default()
    };
    let qualifying = Setup {
        tyre_compound: COMPOUNDS[rng.gen_range(0..COMPOUNDS.len())],
        qualifying_style: STYLES[rng.gen_range(0..STYLES.len())],
        ..base.clone()
    };
    // Some plans never fit hards, so the end-of-race penalty shows up
    let plan = if rng.gen_bool(0.5) {
        vec![TyreCompound::Hard]
    } else {
        vec![TyreCompound::Medium, TyreCompound::Soft]
    };
    let race = Setup {
        initial_fuel: rng.gen_range(55..=100) as f64,
        race_style: STYLES[rng.gen_range(0..STYLES.len())],
        pit_stop_styles: vec![STYLES[rng.gen_range(0..STYLES.len())]],
        pit_stop_fuel: vec![rng.gen_range(40..=80) as f64],
        pit_stops: plan,
        ..base
    };

    DriverSetupSubmission {
        sent,
        qualifying: Some(qualifying),
        race: Some(race),
    }
}
