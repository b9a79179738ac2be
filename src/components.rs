use serde::{Deserialize, Serialize};

use crate::catalog::{
    Biome, SoilEffect, Species, DROUGHT_DAMAGE, FOREIGN_BIOME_HEALTH,
    HARVEST_THRESHOLD, HEALTH_RECOVERY, MATURE_THRESHOLD, MAX_HEALTH, NATIVE_BIOME_HEALTH,
    SPROUT_THRESHOLD, TICKS_PER_DAY, WATERLOG_DAMAGE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Seed,
    Sprout,
    Mature,
}

impl Stage {
    pub fn from_progress(progress: f64) -> Self {
        if progress < SPROUT_THRESHOLD {
            Stage::Seed
        } else if progress < MATURE_THRESHOLD {
            Stage::Sprout
        } else {
            Stage::Mature
        }
    }
}

/// A planted crop occupying one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub species: Species,
    pub growth_days: f64,
    pub health: f64,
    pub is_dead: bool,
}

impl Crop {
    /// A freshly sown crop. Non-viable sowings start out dead.
    pub fn sown(species: Species, biome: Biome, viable: bool) -> Self {
        let health = if !viable {
            0.0
        } else if species.profile().preferred_biome == biome {
            NATIVE_BIOME_HEALTH
        } else {
            FOREIGN_BIOME_HEALTH
        };
        Self {
            species,
            growth_days: 0.0,
            health,
            is_dead: !viable,
        }
    }

    pub fn days_to_mature(&self) -> f64 {
        self.species.profile().days_to_mature
    }

    /// Growth progress as a percentage in `[0, 100]`.
    pub fn progress(&self) -> f64 {
        (self.growth_days / self.days_to_mature() * 100.0).clamp(0.0, 100.0)
    }

    pub fn stage(&self) -> Stage {
        Stage::from_progress(self.progress())
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    pub fn is_harvestable(&self) -> bool {
        self.is_alive() && self.progress() >= HARVEST_THRESHOLD
    }

    /// Advances growth and health by one tick. Returns `true` when the crop
    /// died on this tick. Dead crops are left untouched.
    pub fn advance(&mut self, growth_days: f64, health_delta: f64) -> bool {
        if self.is_dead {
            return false;
        }
        self.growth_days = (self.growth_days + growth_days).clamp(0.0, self.days_to_mature());
        self.health = (self.health + health_delta).clamp(0.0, MAX_HEALTH);
        if self.health <= 0.0 {
            self.is_dead = true;
        }
        self.is_dead
    }

    pub fn heal(&mut self, amount: f64) {
        if self.is_alive() {
            self.health = (self.health + amount).clamp(0.0, MAX_HEALTH);
        }
    }
}

/// Soil state of one plot, parallel to the crop grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilPlot {
    pub ploughed: bool,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub ph: f64,
    pub moisture: f64,
}

impl SoilPlot {
    pub fn baseline(moisture: f64) -> Self {
        Self {
            ploughed: false,
            nitrogen: 40.0,
            phosphorus: 40.0,
            potassium: 40.0,
            ph: 6.5,
            moisture,
        }
    }

    pub fn apply(&mut self, effect: &SoilEffect) {
        self.moisture = (self.moisture + effect.moisture).clamp(0.0, 100.0);
        self.nitrogen = (self.nitrogen + effect.nitrogen).max(0.0);
        self.phosphorus = (self.phosphorus + effect.phosphorus).max(0.0);
        self.potassium = (self.potassium + effect.potassium).max(0.0);
        self.ph = (self.ph + effect.ph).clamp(0.0, 14.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conditions {
    Normal,
    Drought,
    Waterlogged,
}

impl Conditions {
    pub fn health_delta(self) -> f64 {
        match self {
            Conditions::Normal => HEALTH_RECOVERY,
            Conditions::Drought => -DROUGHT_DAMAGE,
            Conditions::Waterlogged => -WATERLOG_DAMAGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Drought,
    Waterlogging,
    HighWind,
}

impl AlertKind {
    pub fn message(self) -> &'static str {
        match self {
            AlertKind::Drought => {
                "Alert: drought conditions. Irrigate or increase rain to protect crops."
            }
            AlertKind::Waterlogging => "Alert: waterlogging risk. Reduce rain and add wind to dry.",
            AlertKind::HighWind => "Alert: high wind. Seedlings may stress; avoid heavy watering.",
        }
    }
}

/// Weather and location shared by every plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub location: String,
    pub biome: Biome,
    pub sun: f64,
    pub rain: f64,
    pub wind: f64,
    pub temperature_c: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            location: "Kathmandu".to_string(),
            biome: Biome::Hilly,
            sun: 64.0,
            rain: 48.0,
            wind: 34.0,
            temperature_c: 22.0,
        }
    }
}

impl Environment {
    pub fn set_sun(&mut self, value: f64) {
        self.sun = value.clamp(0.0, 100.0);
    }

    pub fn set_rain(&mut self, value: f64) {
        self.rain = value.clamp(0.0, 100.0);
    }

    pub fn set_wind(&mut self, value: f64) {
        self.wind = value.clamp(0.0, 100.0);
    }

    pub fn is_drought(&self) -> bool {
        self.sun > 80.0 && self.rain < 20.0
    }

    pub fn is_waterlogged(&self) -> bool {
        self.rain > 80.0
    }

    pub fn is_windy(&self) -> bool {
        self.wind >= 75.0
    }

    /// Drought wins over waterlogging.
    pub fn conditions(&self) -> Conditions {
        if self.is_drought() {
            Conditions::Drought
        } else if self.is_waterlogged() {
            Conditions::Waterlogged
        } else {
            Conditions::Normal
        }
    }

    pub fn alert(&self) -> Option<AlertKind> {
        if self.is_drought() {
            Some(AlertKind::Drought)
        } else if self.is_waterlogged() {
            Some(AlertKind::Waterlogging)
        } else if self.is_windy() {
            Some(AlertKind::HighWind)
        } else {
            None
        }
    }
}

/// Day counter plus time of day in `0..TICKS_PER_DAY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub day: u64,
    pub time_of_day: u32,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            day: 1,
            time_of_day: 20,
        }
    }
}

impl Clock {
    /// Advances one unit; returns `true` when a new day started.
    pub fn advance(&mut self) -> bool {
        let next = self.time_of_day + 1;
        if next >= TICKS_PER_DAY {
            self.time_of_day = 0;
            self.day += 1;
            true
        } else {
            self.time_of_day = next;
            false
        }
    }

    pub fn label(&self) -> String {
        let minutes = (f64::from(self.time_of_day) / f64::from(TICKS_PER_DAY) * 24.0 * 60.0)
            .round() as u32;
        let hour = (minutes / 60) % 24;
        let minute = minutes % 60;
        let suffix = if hour >= 12 { "PM" } else { "AM" };
        let hour12 = (hour + 11) % 12 + 1;
        format!("{hour12}:{minute:02} {suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_boundaries() {
        assert_eq!(Stage::from_progress(0.0), Stage::Seed);
        assert_eq!(Stage::from_progress(34.9), Stage::Seed);
        assert_eq!(Stage::from_progress(35.0), Stage::Sprout);
        assert_eq!(Stage::from_progress(74.9), Stage::Sprout);
        assert_eq!(Stage::from_progress(75.0), Stage::Mature);
    }

    #[test]
    fn sowing_health_depends_on_biome() {
        let native = Crop::sown(Species::Maize, Biome::Hilly, true);
        let foreign = Crop::sown(Species::Rice, Biome::Hilly, true);
        let failed = Crop::sown(Species::Rice, Biome::Terai, false);
        assert_eq!(native.health, 82.0);
        assert_eq!(foreign.health, 74.0);
        assert!(failed.is_dead);
        assert_eq!(failed.health, 0.0);
        assert_eq!(native.progress(), 0.0);
    }

    #[test]
    fn growth_is_clamped_to_maturity() {
        let mut crop = Crop::sown(Species::Maize, Biome::Hilly, true);
        crop.advance(25.0, 0.0);
        assert_eq!(crop.growth_days, 10.0);
        assert_eq!(crop.progress(), 100.0);
        assert_eq!(crop.stage(), Stage::Mature);
    }

    #[test]
    fn dead_crops_do_not_advance() {
        let mut crop = Crop::sown(Species::Maize, Biome::Hilly, true);
        crop.health = 0.2;
        assert!(crop.advance(0.01, -0.45));
        let frozen = crop.clone();
        assert!(!crop.advance(0.01, 0.12));
        crop.heal(10.0);
        assert_eq!(crop, frozen);
    }

    #[test]
    fn drought_takes_precedence() {
        let env = Environment {
            sun: 90.0,
            rain: 10.0,
            ..Environment::default()
        };
        assert_eq!(env.conditions(), Conditions::Drought);
        assert_eq!(env.alert(), Some(AlertKind::Drought));

        let soaked = Environment {
            rain: 95.0,
            wind: 90.0,
            ..Environment::default()
        };
        assert_eq!(soaked.conditions(), Conditions::Waterlogged);
        assert_eq!(soaked.alert(), Some(AlertKind::Waterlogging));
        assert_eq!(Environment::default().conditions(), Conditions::Normal);
    }

    #[test]
    fn clock_rolls_over() {
        let mut clock = Clock {
            day: 3,
            time_of_day: 98,
        };
        assert!(!clock.advance());
        assert!(clock.advance());
        assert_eq!(clock, Clock { day: 4, time_of_day: 0 });
    }

    #[test]
    fn clock_label() {
        assert_eq!(Clock::default().label(), "4:48 AM");
        let noon = Clock {
            day: 1,
            time_of_day: 50,
        };
        assert_eq!(noon.label(), "12:00 PM");
        let midnight = Clock {
            day: 1,
            time_of_day: 0,
        };
        assert_eq!(midnight.label(), "12:00 AM");
    }

    #[test]
    fn soil_effects_are_clamped() {
        let mut soil = SoilPlot::baseline(Biome::Mountain.soil_moisture());
        soil.apply(&SoilEffect {
            moisture: -50.0,
            nitrogen: -100.0,
            ph: 20.0,
            ..SoilEffect::default()
        });
        assert_eq!(soil.moisture, 0.0);
        assert_eq!(soil.nitrogen, 0.0);
        assert_eq!(soil.ph, 14.0);
    }
}
