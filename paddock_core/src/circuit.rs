//! Circuit catalog: static per-track parameters.

use serde::{Deserialize, Serialize};

/// The setup that costs nothing on a given circuit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdealSetup {
    pub front_wing: f64,
    pub rear_wing: f64,
    pub suspension: f64,
    pub gear_ratio: f64,
}

/// Static profile of one circuit.
///
/// The axis weights are relative; they need not sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitProfile {
    pub id: &'static str,
    /// Baseline lap time in seconds
    pub base_lap_time: f64,
    pub laps: u32,
    pub tyre_wear_multiplier: f64,
    pub fuel_consumption_multiplier: f64,
    pub aero_weight: f64,
    pub powertrain_weight: f64,
    pub chassis_weight: f64,
    pub ideal_setup: IdealSetup,
}

macro_rules! circuit {
    (
        $id:literal, $base:literal, $laps:literal, wear $wear:literal, fuel $fuel:literal,
        weights ($aw:literal, $pw:literal, $cw:literal),
        ideal ($fw:literal, $rw:literal, $su:literal, $gr:literal)
    ) => {
        CircuitProfile {
            id: $id,
            base_lap_time: $base,
            laps: $laps,
            tyre_wear_multiplier: $wear,
            fuel_consumption_multiplier: $fuel,
            aero_weight: $aw,
            powertrain_weight: $pw,
            chassis_weight: $cw,
            ideal_setup: IdealSetup {
                front_wing: $fw,
                rear_wing: $rw,
                suspension: $su,
                gear_ratio: $gr,
            },
        }
    };
}

static CIRCUITS: [CircuitProfile; 9] = [
    circuit!("mexico", 76.0, 71, wear 1.1, fuel 1.0, weights (0.4, 0.4, 0.2), ideal (80.0, 75.0, 50.0, 85.0)),
    circuit!("vegas", 92.0, 50, wear 0.8, fuel 1.1, weights (0.2, 0.6, 0.2), ideal (25.0, 20.0, 70.0, 90.0)),
    circuit!("interlagos", 70.5, 71, wear 1.2, fuel 1.2, weights (0.3, 0.3, 0.4), ideal (65.0, 60.0, 45.0, 55.0)),
    circuit!("miami", 90.0, 57, wear 1.0, fuel 1.0, weights (0.4, 0.3, 0.3), ideal (55.0, 50.0, 60.0, 65.0)),
    circuit!("san_pablo_street", 82.0, 40, wear 1.3, fuel 1.3, weights (0.2, 0.2, 0.6), ideal (85.0, 80.0, 30.0, 35.0)),
    circuit!("indianapolis", 72.0, 73, wear 1.1, fuel 1.1, weights (0.3, 0.4, 0.3), ideal (40.0, 35.0, 75.0, 80.0)),
    circuit!("montreal", 73.0, 70, wear 0.9, fuel 1.3, weights (0.2, 0.4, 0.4), ideal (45.0, 40.0, 55.0, 70.0)),
    circuit!("texas", 94.0, 56, wear 1.4, fuel 1.1, weights (0.5, 0.2, 0.3), ideal (75.0, 70.0, 50.0, 60.0)),
    circuit!("buenos_aires", 74.0, 72, wear 1.1, fuel 1.0, weights (0.3, 0.2, 0.5), ideal (65.0, 60.0, 45.0, 50.0)),
];

static GENERIC: CircuitProfile =
    circuit!("generic", 85.0, 50, wear 1.0, fuel 1.0, weights (0.33, 0.34, 0.33), ideal (50.0, 50.0, 50.0, 50.0));

/// Looks up a circuit profile; unknown ids map to the generic profile.
pub fn circuit(id: &str) -> &'static CircuitProfile {
    CIRCUITS.iter().find(|c| c.id == id).unwrap_or(&GENERIC)
}

/// The fallback profile used for unknown circuit ids.
pub fn generic_circuit() -> &'static CircuitProfile {
    &GENERIC
}

/// All named circuits in the catalog.
pub fn all_circuits() -> &'static [CircuitProfile] {
    &CIRCUITS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_circuit_lookup() {
        let mexico = circuit("mexico");
        assert_eq!(mexico.base_lap_time, 76.0);
        assert_eq!(mexico.laps, 71);
        assert_eq!(mexico.ideal_setup.gear_ratio, 85.0);
    }

    #[test]
    fn test_unknown_circuit_is_generic() {
        let unknown = circuit("monaco");
        assert_eq!(unknown.id, "generic");
        assert_eq!(unknown.laps, 50);
        assert_eq!(unknown, generic_circuit());
    }

    #[test]
    fn test_catalog_ids_unique() {
        let mut ids: Vec<_> = all_circuits().iter().map(|c| c.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), all_circuits().len());
    }
}
