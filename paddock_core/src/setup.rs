//! Car ratings, driver ratings and the team-tunable setup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest and highest meaningful car rating.
pub const CAR_STAT_MIN: u32 = 1;
pub const CAR_STAT_MAX: u32 = 20;

/// Number of car slots a team fields.
pub const CAR_SLOTS: usize = 2;

/// Tyre compound, trading wear rate against pace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TyreCompound {
    Soft,
    #[default]
    Medium,
    Hard,
}

impl TyreCompound {
    /// Wear accumulation multiplier of the compound.
    pub fn wear_multiplier(self) -> f64 {
        match self {
            TyreCompound::Soft => 1.6,
            TyreCompound::Medium => 1.1,
            TyreCompound::Hard => 0.7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TyreCompound::Soft => "soft",
            TyreCompound::Medium => "medium",
            TyreCompound::Hard => "hard",
        }
    }
}

impl fmt::Display for TyreCompound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TyreCompound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "soft" => Ok(TyreCompound::Soft),
            "medium" => Ok(TyreCompound::Medium),
            "hard" => Ok(TyreCompound::Hard),
            _ => Err(format!("Unknown tyre compound: {}", s)),
        }
    }
}

/// Driving aggressiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DrivingStyle {
    #[default]
    Normal,
    Offensive,
    Defensive,
    MostRisky,
}

impl DrivingStyle {
    /// Fractional lap-time reduction (negative = slower).
    pub fn pace_bonus(self) -> f64 {
        match self {
            DrivingStyle::Normal => 0.0,
            DrivingStyle::Offensive => 0.02,
            DrivingStyle::MostRisky => 0.04,
            DrivingStyle::Defensive => -0.01,
        }
    }

    /// Per-lap crash probability before role modifiers.
    pub fn crash_probability(self) -> f64 {
        match self {
            DrivingStyle::Normal => 0.03,
            DrivingStyle::Offensive => 0.10,
            DrivingStyle::MostRisky => 0.20,
            DrivingStyle::Defensive => 0.01,
        }
    }

    pub fn fuel_multiplier(self) -> f64 {
        match self {
            DrivingStyle::Normal => 1.0,
            DrivingStyle::Offensive => 1.15,
            DrivingStyle::MostRisky => 1.35,
            DrivingStyle::Defensive => 0.85,
        }
    }

    pub fn wear_multiplier(self) -> f64 {
        match self {
            DrivingStyle::Normal => 1.0,
            DrivingStyle::Offensive => 1.25,
            DrivingStyle::MostRisky => 1.6,
            DrivingStyle::Defensive => 0.75,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DrivingStyle::Normal => "normal",
            DrivingStyle::Offensive => "offensive",
            DrivingStyle::Defensive => "defensive",
            DrivingStyle::MostRisky => "mostRisky",
        }
    }
}

impl fmt::Display for DrivingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DrivingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(DrivingStyle::Normal),
            "offensive" => Ok(DrivingStyle::Offensive),
            "defensive" => Ok(DrivingStyle::Defensive),
            "mostrisky" | "most_risky" => Ok(DrivingStyle::MostRisky),
            _ => Err(format!("Unknown driving style: {}", s)),
        }
    }
}

/// Performance ratings of one car slot, each conceptually in `[1, 20]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarStats {
    pub aero: u32,
    pub powertrain: u32,
    pub chassis: u32,
}

impl Default for CarStats {
    fn default() -> Self {
        Self {
            aero: CAR_STAT_MIN,
            powertrain: CAR_STAT_MIN,
            chassis: CAR_STAT_MIN,
        }
    }
}

impl CarStats {
    pub fn new(aero: u32, powertrain: u32, chassis: u32) -> Self {
        Self { aero, powertrain, chassis }
    }

    /// Ratings clamped into `[1, 20]`, as the performance model sees them.
    pub fn clamped(&self) -> (f64, f64, f64) {
        let clamp = |v: u32| v.clamp(CAR_STAT_MIN, CAR_STAT_MAX) as f64;
        (clamp(self.aero), clamp(self.powertrain), clamp(self.chassis))
    }
}

/// Driver skill ratings in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverStats {
    pub braking: u32,
    pub cornering: u32,
    pub focus: u32,
}

impl Default for DriverStats {
    fn default() -> Self {
        Self {
            braking: 50,
            cornering: 50,
            focus: 50,
        }
    }
}

impl DriverStats {
    pub fn new(braking: u32, cornering: u32, focus: u32) -> Self {
        Self { braking, cornering, focus }
    }
}

/// A team's tunable car configuration plus strategic plan.
///
/// Deserializing a partial submission fills every missing field from
/// [`Setup::default`], so a team that only sends wing angles still races on
/// the default strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Setup {
    pub front_wing: f64,
    pub rear_wing: f64,
    pub suspension: f64,
    pub gear_ratio: f64,
    pub tyre_compound: TyreCompound,
    pub qualifying_style: DrivingStyle,
    pub race_style: DrivingStyle,
    pub initial_fuel: f64,
    pub pit_stops: Vec<TyreCompound>,
    pub pit_stop_styles: Vec<DrivingStyle>,
    pub pit_stop_fuel: Vec<f64>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            front_wing: 50.0,
            rear_wing: 50.0,
            suspension: 50.0,
            gear_ratio: 50.0,
            tyre_compound: TyreCompound::Medium,
            qualifying_style: DrivingStyle::Normal,
            race_style: DrivingStyle::Normal,
            initial_fuel: 50.0,
            pit_stops: vec![TyreCompound::Hard],
            pit_stop_styles: vec![DrivingStyle::Normal],
            pit_stop_fuel: vec![50.0],
        }
    }
}
