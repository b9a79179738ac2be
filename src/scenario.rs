use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::{
    actions,
    catalog::{Biome, Species, GRID_CELLS},
    components::{Environment, SoilPlot},
    engine::Speed,
    rng::{RngExt, RngManager},
    selection::Selection,
    world::Farm,
};

fn default_location() -> String {
    "Kathmandu".to_string()
}

fn default_starting_coins() -> u64 {
    2000
}

fn default_snapshot_interval_ticks() -> u64 {
    100
}

fn default_alert_cooldown_ticks() -> u64 {
    30
}

fn default_ticks() -> u64 {
    1000
}

fn default_sun() -> f64 {
    64.0
}

fn default_rain() -> f64 {
    48.0
}

fn default_wind() -> f64 {
    34.0
}

fn default_temperature() -> f64 {
    22.0
}

fn default_nutrient() -> f64 {
    40.0
}

fn default_ph() -> f64 {
    6.5
}

fn default_nutrient_jitter() -> f64 {
    10.0
}

fn default_ph_jitter() -> f64 {
    0.5
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_location")]
    pub location: String,
    /// Takes precedence over `elevation_m`.
    #[serde(default)]
    pub biome: Option<Biome>,
    #[serde(default)]
    pub elevation_m: Option<f64>,
    #[serde(default = "default_starting_coins")]
    pub starting_coins: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub speed: Speed,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    #[serde(default = "default_alert_cooldown_ticks")]
    pub alert_cooldown_ticks: u64,
    #[serde(default)]
    pub weather: WeatherInit,
    #[serde(default)]
    pub soil: SoilInit,
    #[serde(default)]
    pub plantings: Vec<PlantingInit>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherInit {
    #[serde(default = "default_sun")]
    pub sun: f64,
    #[serde(default = "default_rain")]
    pub rain: f64,
    #[serde(default = "default_wind")]
    pub wind: f64,
    #[serde(default = "default_temperature")]
    pub temperature_c: f64,
}

impl Default for WeatherInit {
    fn default() -> Self {
        Self {
            sun: default_sun(),
            rain: default_rain(),
            wind: default_wind(),
            temperature_c: default_temperature(),
        }
    }
}

/// Soil baseline; each plot gets its own seeded offset around it.
#[derive(Debug, Clone, Deserialize)]
pub struct SoilInit {
    #[serde(default = "default_nutrient")]
    pub nitrogen: f64,
    #[serde(default = "default_nutrient")]
    pub phosphorus: f64,
    #[serde(default = "default_nutrient")]
    pub potassium: f64,
    #[serde(default = "default_ph")]
    pub ph: f64,
    /// Defaults to the biome's typical soil moisture.
    #[serde(default)]
    pub moisture: Option<f64>,
    #[serde(default = "default_nutrient_jitter")]
    pub jitter: f64,
    #[serde(default = "default_ph_jitter")]
    pub ph_jitter: f64,
}

impl Default for SoilInit {
    fn default() -> Self {
        Self {
            nitrogen: default_nutrient(),
            phosphorus: default_nutrient(),
            potassium: default_nutrient(),
            ph: default_ph(),
            moisture: None,
            jitter: default_nutrient_jitter(),
            ph_jitter: default_ph_jitter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlantingInit {
    pub species: Species,
    pub cells: Vec<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

fn ensure_percentage(label: &str, value: f64) -> Result<()> {
    ensure!(
        (0.0..=100.0).contains(&value),
        "{label} must be between 0 and 100, got {value}"
    );
    Ok(())
}

impl Scenario {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.name.trim().is_empty(), "scenario name must not be empty");
        ensure_percentage("weather.sun", self.weather.sun)?;
        ensure_percentage("weather.rain", self.weather.rain)?;
        ensure_percentage("weather.wind", self.weather.wind)?;
        if let Some(moisture) = self.soil.moisture {
            ensure_percentage("soil.moisture", moisture)?;
        }
        ensure!(
            (0.0..=14.0).contains(&self.soil.ph),
            "soil.ph must be between 0 and 14, got {}",
            self.soil.ph
        );
        for planting in &self.plantings {
            for &cell in &planting.cells {
                ensure!(
                    cell < GRID_CELLS,
                    "planting of {} uses cell {cell}, outside the 4x4 field",
                    planting.species
                );
            }
        }
        Ok(())
    }

    /// Explicit biome, else derived from elevation, else Hilly.
    pub fn resolve_biome(&self) -> Biome {
        self.biome
            .or_else(|| self.elevation_m.map(Biome::from_elevation))
            .unwrap_or(Biome::Hilly)
    }

    pub fn environment(&self) -> Environment {
        Environment {
            location: self.location.clone(),
            biome: self.resolve_biome(),
            sun: self.weather.sun,
            rain: self.weather.rain,
            wind: self.weather.wind,
            temperature_c: self.weather.temperature_c,
        }
    }

    pub fn build_farm(&self) -> Result<Farm> {
        self.validate()?;
        let environment = self.environment();
        let moisture = self
            .soil
            .moisture
            .unwrap_or(environment.biome.soil_moisture());
        let rng = RngManager::new(self.seed);
        let soil: [SoilPlot; GRID_CELLS] = std::array::from_fn(|index| {
            let mut stream = rng.indexed_stream("soil", index as u64);
            let jitter = self.soil.jitter;
            SoilPlot {
                ploughed: false,
                nitrogen: (self.soil.nitrogen + stream.jitter(jitter)).max(0.0),
                phosphorus: (self.soil.phosphorus + stream.jitter(jitter)).max(0.0),
                potassium: (self.soil.potassium + stream.jitter(jitter)).max(0.0),
                ph: (self.soil.ph + stream.jitter(self.soil.ph_jitter)).clamp(0.0, 14.0),
                moisture,
            }
        });

        let mut farm = Farm::with_soil(environment, self.starting_coins, soil);
        for planting in &self.plantings {
            let selection = Selection::from_cells(planting.cells.iter().copied())?;
            actions::plant(&mut farm, planting.species, &selection)
                .with_context(|| format!("Initial planting of {} failed", planting.species))?;
        }
        Ok(farm)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or_else(default_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Scenario {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn defaults_fill_in() {
        let scenario = parse("name: bare\n");
        assert_eq!(scenario.starting_coins, 2000);
        assert_eq!(scenario.speed, Speed::Medium);
        assert_eq!(scenario.resolve_biome(), Biome::Hilly);
        assert_eq!(scenario.ticks(None), 1000);
        assert_eq!(scenario.ticks(Some(5)), 5);
        assert_eq!(scenario.logging.level, "info");
    }

    #[test]
    fn elevation_picks_biome() {
        let scenario = parse("name: high\nelevation_m: 3200\n");
        assert_eq!(scenario.resolve_biome(), Biome::Mountain);
        let scenario = parse("name: pinned\nbiome: Himalayan\nelevation_m: 100\n");
        assert_eq!(scenario.resolve_biome(), Biome::Mountain);
    }

    #[test]
    fn soil_is_seeded() {
        let scenario = parse("name: seeded\nseed: 9\n");
        let a = scenario.build_farm().unwrap();
        let b = scenario.build_farm().unwrap();
        for index in 0..GRID_CELLS {
            let soil = a.soil(index).unwrap();
            assert_eq!(soil, b.soil(index).unwrap());
            assert!((30.0..50.0).contains(&soil.nitrogen));
            assert!((6.0..7.0).contains(&soil.ph));
            assert_eq!(soil.moisture, 45.0);
        }
        assert_ne!(a.soil(0).unwrap().nitrogen, a.soil(1).unwrap().nitrogen);
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(parse("name: wet\nweather:\n  rain: 120\n").build_farm().is_err());
        assert!(parse("name: ''\n").validate().is_err());
        let bad_cell = "name: x\nplantings:\n  - species: Maize\n    cells: [16]\n";
        assert!(parse(bad_cell).build_farm().is_err());
    }

    #[test]
    fn initial_plantings_are_sown() {
        let yaml = "name: sown\nplantings:\n  - species: Maize\n    cells: [0, 1, 2]\n";
        let farm = parse(yaml).build_farm().unwrap();
        assert_eq!(farm.planted_count(), 3);
        assert_eq!(farm.coins(), 1994);
    }
}
