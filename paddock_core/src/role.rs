//! Manager role modifiers.
//!
//! A team's manager carries one of a closed set of backgrounds. Each variant
//! is a bundle of pure adjustments applied uniformly to every lap and
//! strategic decision of that team's entrants.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ManagerRole {
    #[default]
    None,
    /// Former racer: quicker in the race, more prone to crashing.
    ExDriver,
    /// Former engineer: gentler on tyres, better qualifying laps.
    ExEngineer,
    /// Business administrator: slower race pace.
    BusinessAdmin,
}

impl ManagerRole {
    /// Parses the stored role tag; unknown or empty tags carry no modifier.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "exDriver" => ManagerRole::ExDriver,
            "exEngineer" => ManagerRole::ExEngineer,
            "businessAdmin" => ManagerRole::BusinessAdmin,
            _ => ManagerRole::None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ManagerRole::None => "",
            ManagerRole::ExDriver => "exDriver",
            ManagerRole::ExEngineer => "exEngineer",
            ManagerRole::BusinessAdmin => "businessAdmin",
        }
    }

    /// Added to the style's crash probability on every simulated lap.
    pub fn extra_crash_probability(self) -> f64 {
        match self {
            ManagerRole::ExDriver => 0.05,
            _ => 0.0,
        }
    }

    /// Applied to every completed race lap.
    pub fn race_pace(self, lap_time: f64) -> f64 {
        match self {
            ManagerRole::ExDriver => lap_time * 0.98,
            ManagerRole::BusinessAdmin => lap_time * 1.02,
            _ => lap_time,
        }
    }

    /// Applied to a non-crashed qualifying lap.
    pub fn qualifying_pace(self, lap_time: f64) -> f64 {
        match self {
            ManagerRole::ExEngineer => lap_time * 0.95,
            _ => lap_time,
        }
    }

    /// Applied to the entrant's wear after each lap without a stop.
    pub fn tyre_wear(self, wear: f64) -> f64 {
        match self {
            ManagerRole::ExEngineer => wear * 0.9,
            _ => wear,
        }
    }
}

impl fmt::Display for ManagerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerRole::None => f.write_str("none"),
            other => f.write_str(other.tag()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_tag() {
        assert_eq!(ManagerRole::from_tag("exDriver"), ManagerRole::ExDriver);
        assert_eq!(ManagerRole::from_tag("exEngineer"), ManagerRole::ExEngineer);
        assert_eq!(ManagerRole::from_tag("businessAdmin"), ManagerRole::BusinessAdmin);
        assert_eq!(ManagerRole::from_tag(""), ManagerRole::None);
        assert_eq!(ManagerRole::from_tag("bureaucrat"), ManagerRole::None);
    }

    #[test]
    fn test_modifiers_only_touch_their_axis() {
        assert_relative_eq!(ManagerRole::ExDriver.race_pace(100.0), 98.0);
        assert_relative_eq!(ManagerRole::BusinessAdmin.race_pace(100.0), 102.0);
        assert_relative_eq!(ManagerRole::ExEngineer.race_pace(100.0), 100.0);

        assert_relative_eq!(ManagerRole::ExEngineer.qualifying_pace(80.0), 76.0);
        assert_relative_eq!(ManagerRole::ExDriver.qualifying_pace(80.0), 80.0);

        assert_relative_eq!(ManagerRole::ExEngineer.tyre_wear(50.0), 45.0);
        assert_relative_eq!(ManagerRole::None.tyre_wear(50.0), 50.0);

        assert_relative_eq!(ManagerRole::ExDriver.extra_crash_probability(), 0.05);
        assert_relative_eq!(ManagerRole::BusinessAdmin.extra_crash_probability(), 0.0);
    }
}
