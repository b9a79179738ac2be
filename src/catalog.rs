//! Static game data: biomes, crop species, farming actions and the tuning
//! constants shared by the simulation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GRID_WIDTH: usize = 4;
pub const GRID_CELLS: usize = GRID_WIDTH * GRID_WIDTH;

/// Time-of-day units per simulated day.
pub const TICKS_PER_DAY: u32 = 100;
pub const GROWTH_RATE: f64 = 1.0;

pub const SPROUT_THRESHOLD: f64 = 35.0;
pub const MATURE_THRESHOLD: f64 = 75.0;
pub const HARVEST_THRESHOLD: f64 = MATURE_THRESHOLD;

pub const MAX_HEALTH: f64 = 100.0;
pub const HEALTH_RECOVERY: f64 = 0.12;
pub const DROUGHT_DAMAGE: f64 = 0.45;
pub const WATERLOG_DAMAGE: f64 = 0.35;
pub const NATIVE_BIOME_HEALTH: f64 = 82.0;
pub const FOREIGN_BIOME_HEALTH: f64 = 74.0;

pub const SEED_COST: u64 = 2;
pub const DEATH_PENALTY: u64 = 5;

pub const IRRIGATION_HEALTH_BOOST: f64 = 10.0;
pub const IRRIGATION_RAIN_BOOST: f64 = 20.0;

/// Plantings scoring below this are sown dead.
pub const MIN_SUITABILITY: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown crop species '{0}'")]
    UnknownSpecies(String),
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("unknown biome '{0}'")]
    UnknownBiome(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    Terai,
    Hilly,
    #[serde(alias = "Himalayan")]
    Mountain,
}

impl Biome {
    pub const ALL: [Biome; 3] = [Biome::Terai, Biome::Hilly, Biome::Mountain];

    pub fn from_elevation(elevation_m: f64) -> Self {
        if elevation_m < 300.0 {
            Biome::Terai
        } else if elevation_m < 2000.0 {
            Biome::Hilly
        } else {
            Biome::Mountain
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Biome::Terai => "Terai",
            Biome::Hilly => "Hilly",
            Biome::Mountain => "Mountain",
        }
    }

    /// Typical soil moisture percentage for the region.
    pub fn soil_moisture(self) -> f64 {
        match self {
            Biome::Terai => 60.0,
            Biome::Hilly => 45.0,
            Biome::Mountain => 30.0,
        }
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Biome {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terai" => Ok(Biome::Terai),
            "hilly" => Ok(Biome::Hilly),
            "mountain" | "himalayan" => Ok(Biome::Mountain),
            _ => Err(CatalogError::UnknownBiome(s.to_string())),
        }
    }
}

/// Ideal growing conditions for a species, in the units of the
/// suitability vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdealConditions {
    pub moisture: f64,
    pub temperature: f64,
    pub n: f64,
    pub p: f64,
    pub k: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropProfile {
    pub species: Species,
    pub preferred_biome: Biome,
    pub days_to_mature: f64,
    pub harvest_gold: u64,
    pub ideal: IdealConditions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Rice,
    Maize,
    Banana,
    Mango,
    Apple,
    Jute,
    Papaya,
    Lentil,
    Orange,
    Cotton,
}

impl Species {
    pub const ALL: [Species; 10] = [
        Species::Rice,
        Species::Maize,
        Species::Banana,
        Species::Mango,
        Species::Apple,
        Species::Jute,
        Species::Papaya,
        Species::Lentil,
        Species::Orange,
        Species::Cotton,
    ];

    pub fn profile(self) -> &'static CropProfile {
        &CROP_PROFILES[self as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Species::Rice => "Rice",
            Species::Maize => "Maize",
            Species::Banana => "Banana",
            Species::Mango => "Mango",
            Species::Apple => "Apple",
            Species::Jute => "Jute",
            Species::Papaya => "Papaya",
            Species::Lentil => "Lentil",
            Species::Orange => "Orange",
            Species::Cotton => "Cotton",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Species {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Species::ALL
            .into_iter()
            .find(|species| species.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CatalogError::UnknownSpecies(s.to_string()))
    }
}

const fn ideal(
    moisture: f64,
    temperature: f64,
    n: f64,
    p: f64,
    k: f64,
    humidity: f64,
    ph: f64,
    rainfall: f64,
) -> IdealConditions {
    IdealConditions {
        moisture,
        temperature,
        n,
        p,
        k,
        humidity,
        ph,
        rainfall,
    }
}

// Indexed by `Species as usize`.
static CROP_PROFILES: [CropProfile; 10] = [
    CropProfile {
        species: Species::Rice,
        preferred_biome: Biome::Terai,
        days_to_mature: 12.0,
        harvest_gold: 220,
        ideal: ideal(80.0, 24.0, 80.0, 48.0, 40.0, 82.0, 6.0, 236.0),
    },
    CropProfile {
        species: Species::Maize,
        preferred_biome: Biome::Hilly,
        days_to_mature: 10.0,
        harvest_gold: 190,
        ideal: ideal(55.0, 22.0, 78.0, 48.0, 20.0, 65.0, 6.0, 85.0),
    },
    CropProfile {
        species: Species::Banana,
        preferred_biome: Biome::Terai,
        days_to_mature: 18.0,
        harvest_gold: 320,
        ideal: ideal(70.0, 27.0, 100.0, 82.0, 50.0, 80.0, 6.0, 105.0),
    },
    CropProfile {
        species: Species::Mango,
        preferred_biome: Biome::Terai,
        days_to_mature: 18.0,
        harvest_gold: 340,
        ideal: ideal(60.0, 31.0, 20.0, 27.0, 30.0, 50.0, 6.0, 95.0),
    },
    CropProfile {
        species: Species::Apple,
        preferred_biome: Biome::Mountain,
        days_to_mature: 20.0,
        harvest_gold: 360,
        ideal: ideal(50.0, 23.0, 21.0, 134.0, 200.0, 92.0, 6.0, 113.0),
    },
    CropProfile {
        species: Species::Jute,
        preferred_biome: Biome::Terai,
        days_to_mature: 14.0,
        harvest_gold: 230,
        ideal: ideal(65.0, 25.0, 78.0, 47.0, 40.0, 80.0, 7.0, 175.0),
    },
    CropProfile {
        species: Species::Papaya,
        preferred_biome: Biome::Terai,
        days_to_mature: 16.0,
        harvest_gold: 310,
        ideal: ideal(65.0, 34.0, 50.0, 59.0, 50.0, 92.0, 7.0, 143.0),
    },
    CropProfile {
        species: Species::Lentil,
        preferred_biome: Biome::Hilly,
        days_to_mature: 11.0,
        harvest_gold: 200,
        ideal: ideal(45.0, 25.0, 19.0, 68.0, 19.0, 65.0, 7.0, 46.0),
    },
    CropProfile {
        species: Species::Orange,
        preferred_biome: Biome::Hilly,
        days_to_mature: 18.0,
        harvest_gold: 330,
        ideal: ideal(55.0, 23.0, 20.0, 17.0, 10.0, 92.0, 7.0, 110.0),
    },
    CropProfile {
        species: Species::Cotton,
        preferred_biome: Biome::Terai,
        days_to_mature: 15.0,
        harvest_gold: 240,
        ideal: ideal(55.0, 24.0, 118.0, 46.0, 20.0, 80.0, 7.0, 80.0),
    },
];

/// Change applied to a soil plot by an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SoilEffect {
    pub moisture: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub ph: f64,
}

/// Per-cell cost in each biome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BiomeCost {
    pub terai: u64,
    pub hilly: u64,
    pub himalayan: u64,
}

impl BiomeCost {
    pub fn for_biome(&self, biome: Biome) -> u64 {
        match biome {
            Biome::Terai => self.terai,
            Biome::Hilly => self.hilly,
            Biome::Mountain => self.himalayan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActionDef {
    pub action: ActionKind,
    pub name: &'static str,
    pub cost: BiomeCost,
    pub effect: SoilEffect,
    pub duration_ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "manual_plough")]
    ManualPlough,
    #[serde(rename = "plough")]
    Plough,
    #[serde(rename = "irrigate")]
    Irrigate,
    #[serde(rename = "fertilizer/chemical/nitrogen")]
    Nitrogen,
    #[serde(rename = "fertilizer/chemical/phosphorus")]
    Phosphorus,
    #[serde(rename = "fertilizer/chemical/potassium")]
    Potassium,
    #[serde(rename = "fertilizer/organic/fym")]
    Manure,
    #[serde(rename = "mulch")]
    Mulch,
    #[serde(rename = "harvest")]
    Harvest,
    #[serde(rename = "remove_crop")]
    RemoveCrop,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        ActionKind::ManualPlough,
        ActionKind::Plough,
        ActionKind::Irrigate,
        ActionKind::Nitrogen,
        ActionKind::Phosphorus,
        ActionKind::Potassium,
        ActionKind::Manure,
        ActionKind::Mulch,
        ActionKind::Harvest,
        ActionKind::RemoveCrop,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ActionKind::ManualPlough => "manual_plough",
            ActionKind::Plough => "plough",
            ActionKind::Irrigate => "irrigate",
            ActionKind::Nitrogen => "fertilizer/chemical/nitrogen",
            ActionKind::Phosphorus => "fertilizer/chemical/phosphorus",
            ActionKind::Potassium => "fertilizer/chemical/potassium",
            ActionKind::Manure => "fertilizer/organic/fym",
            ActionKind::Mulch => "mulch",
            ActionKind::Harvest => "harvest",
            ActionKind::RemoveCrop => "remove_crop",
        }
    }

    pub fn def(self) -> &'static ActionDef {
        &ACTION_DEFS[self as usize]
    }

    pub fn is_plough(self) -> bool {
        matches!(self, ActionKind::Plough | ActionKind::ManualPlough)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ActionKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ActionKind::ALL
            .into_iter()
            .find(|action| action.key() == wanted)
            .ok_or_else(|| CatalogError::UnknownAction(s.to_string()))
    }
}

const fn cost(terai: u64, hilly: u64, himalayan: u64) -> BiomeCost {
    BiomeCost {
        terai,
        hilly,
        himalayan,
    }
}

const NO_EFFECT: SoilEffect = SoilEffect {
    moisture: 0.0,
    nitrogen: 0.0,
    phosphorus: 0.0,
    potassium: 0.0,
    ph: 0.0,
};

// Indexed by `ActionKind as usize`.
static ACTION_DEFS: [ActionDef; 10] = [
    ActionDef {
        action: ActionKind::ManualPlough,
        name: "Manual Ploughing",
        cost: cost(30, 35, 40),
        effect: SoilEffect {
            moisture: -2.0,
            ..NO_EFFECT
        },
        duration_ticks: 10,
    },
    ActionDef {
        action: ActionKind::Plough,
        name: "Tractor Ploughing",
        cost: cost(90, 110, 130),
        effect: SoilEffect {
            moisture: -5.0,
            ..NO_EFFECT
        },
        duration_ticks: 5,
    },
    ActionDef {
        action: ActionKind::Irrigate,
        name: "Canal / Tube-well Irrigation",
        cost: cost(70, 90, 110),
        effect: SoilEffect {
            moisture: 20.0,
            ..NO_EFFECT
        },
        duration_ticks: 4,
    },
    ActionDef {
        action: ActionKind::Nitrogen,
        name: "Urea (46% N)",
        cost: cost(60, 65, 70),
        effect: SoilEffect {
            nitrogen: 30.0,
            ph: -0.1,
            ..NO_EFFECT
        },
        duration_ticks: 2,
    },
    ActionDef {
        action: ActionKind::Phosphorus,
        name: "DAP (18-46-0)",
        cost: cost(70, 75, 80),
        effect: SoilEffect {
            nitrogen: 10.0,
            phosphorus: 25.0,
            ph: -0.05,
            ..NO_EFFECT
        },
        duration_ticks: 2,
    },
    ActionDef {
        action: ActionKind::Potassium,
        name: "MOP (0-0-60)",
        cost: cost(65, 70, 75),
        effect: SoilEffect {
            potassium: 25.0,
            ..NO_EFFECT
        },
        duration_ticks: 2,
    },
    ActionDef {
        action: ActionKind::Manure,
        name: "Farmyard Manure",
        cost: cost(50, 55, 60),
        effect: SoilEffect {
            moisture: 0.0,
            nitrogen: 5.0,
            phosphorus: 5.0,
            potassium: 5.0,
            ph: 0.05,
        },
        duration_ticks: 7,
    },
    ActionDef {
        action: ActionKind::Mulch,
        name: "Mulching",
        cost: cost(40, 45, 50),
        effect: SoilEffect {
            moisture: 10.0,
            ..NO_EFFECT
        },
        duration_ticks: 5,
    },
    ActionDef {
        action: ActionKind::Harvest,
        name: "Harvest & Thresh",
        cost: cost(100, 110, 130),
        effect: NO_EFFECT,
        duration_ticks: 13,
    },
    ActionDef {
        action: ActionKind::RemoveCrop,
        name: "Remove Crop",
        cost: cost(20, 25, 30),
        effect: NO_EFFECT,
        duration_ticks: 2,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_indexed_by_variant() {
        for species in Species::ALL {
            assert_eq!(species.profile().species, species);
        }
        for action in ActionKind::ALL {
            assert_eq!(action.def().action, action);
        }
    }

    #[test]
    fn names_parse_back() {
        assert_eq!("maize".parse::<Species>(), Ok(Species::Maize));
        assert_eq!(" Rice ".parse::<Species>(), Ok(Species::Rice));
        assert!("wheat".parse::<Species>().is_err());
        assert_eq!(
            "fertilizer/organic/fym".parse::<ActionKind>(),
            Ok(ActionKind::Manure)
        );
        assert_eq!("Himalayan".parse::<Biome>(), Ok(Biome::Mountain));
    }

    #[test]
    fn elevation_bands() {
        assert_eq!(Biome::from_elevation(150.0), Biome::Terai);
        assert_eq!(Biome::from_elevation(300.0), Biome::Hilly);
        assert_eq!(Biome::from_elevation(1999.0), Biome::Hilly);
        assert_eq!(Biome::from_elevation(3500.0), Biome::Mountain);
    }

    #[test]
    fn mountain_pays_the_himalayan_rate() {
        let harvest = ActionKind::Harvest.def();
        assert_eq!(harvest.cost.for_biome(Biome::Mountain), 130);
        assert_eq!(harvest.cost.for_biome(Biome::Hilly), 110);
    }

    #[test]
    fn serde_keys_match_action_keys() {
        for action in ActionKind::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.key()));
        }
    }
}
