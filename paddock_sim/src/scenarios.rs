//! Named weekend scenarios for deterministic runs.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// WK-001: qualifying, race and post-race for one league
    FullWeekend,

    /// WK-002: every phase invoked twice
    ReplayGuard,

    /// WK-003: race phase before any qualifying grid exists
    MissingGrid,

    /// WK-004: post-race held back until the delay has elapsed
    PostRaceGate,

    /// WK-005: several leagues, one of them broken
    MultiLeague,

    /// WK-006: every notification delivery fails
    NewsOutage,

    /// WK-007: a whole calendar, week after week
    SeasonSweep,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::FullWeekend,
            ScenarioId::ReplayGuard,
            ScenarioId::MissingGrid,
            ScenarioId::PostRaceGate,
            ScenarioId::MultiLeague,
            ScenarioId::NewsOutage,
            ScenarioId::SeasonSweep,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::FullWeekend => "full_weekend",
            ScenarioId::ReplayGuard => "replay_guard",
            ScenarioId::MissingGrid => "missing_grid",
            ScenarioId::PostRaceGate => "post_race_gate",
            ScenarioId::MultiLeague => "multi_league",
            ScenarioId::NewsOutage => "news_outage",
            ScenarioId::SeasonSweep => "season_sweep",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::FullWeekend => "One league through qualifying, race and post-race; grid, classification and awards checked",
            ScenarioId::ReplayGuard => "Each phase invoked twice; the second run must skip and leave stats untouched",
            ScenarioId::MissingGrid => "Race phase before qualifying is skipped, then the weekend proceeds normally",
            ScenarioId::PostRaceGate => "Post-race skipped until the configured delay has passed; teams stay locked",
            ScenarioId::MultiLeague => "Several leagues with one failing store; the others complete, stagger applied",
            ScenarioId::NewsOutage => "Newsroom rejects every delivery; phases still complete",
            ScenarioId::SeasonSweep => "Whole calendar raced; totals and calendar completion checked",
        }
    }

    /// Whether the scenario relies on injected store failures.
    pub fn needs_fault_injection(&self) -> bool {
        matches!(self, ScenarioId::MultiLeague)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full_weekend" | "fullweekend" | "wk-001" => Ok(ScenarioId::FullWeekend),
            "replay_guard" | "replayguard" | "wk-002" => Ok(ScenarioId::ReplayGuard),
            "missing_grid" | "missinggrid" | "wk-003" => Ok(ScenarioId::MissingGrid),
            "post_race_gate" | "postracegate" | "wk-004" => Ok(ScenarioId::PostRaceGate),
            "multi_league" | "multileague" | "wk-005" => Ok(ScenarioId::MultiLeague),
            "news_outage" | "newsoutage" | "wk-006" => Ok(ScenarioId::NewsOutage),
            "season_sweep" | "seasonsweep" | "wk-007" => Ok(ScenarioId::SeasonSweep),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("WK-004".parse::<ScenarioId>(), Ok(ScenarioId::PostRaceGate));
        assert_eq!("SeasonSweep".parse::<ScenarioId>(), Ok(ScenarioId::SeasonSweep));
        assert!("nope".parse::<ScenarioId>().is_err());
    }
}
