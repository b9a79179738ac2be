use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog::{ActionKind, Species, GRID_CELLS, GRID_WIDTH},
    components::{AlertKind, Clock, Conditions, Crop, Environment, SoilPlot, Stage},
};

/// Something that happened on the farm, reported with the tick it occurred in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FarmEvent {
    DayStarted {
        day: u64,
    },
    Advice {
        message: String,
    },
    Alert {
        alert: AlertKind,
        message: String,
    },
    CropsDied {
        count: usize,
        penalty: u64,
    },
    AllMature,
    Planted {
        species: Species,
        planted: usize,
        died: usize,
        cost: u64,
    },
    ActionApplied {
        action: ActionKind,
        affected: usize,
        cost: u64,
    },
    Harvested {
        count: usize,
        earnings: u64,
        cost: u64,
    },
    DeadCleared {
        count: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSnapshot {
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub crop: Option<Crop>,
    pub progress: Option<f64>,
    pub stage: Option<Stage>,
    pub soil: SoilPlot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub clock: Clock,
    pub clock_label: String,
    pub coins: u64,
    pub environment: Environment,
    pub conditions: Conditions,
    pub planted: usize,
    pub alive: usize,
    pub average_health: f64,
    #[serde(default)]
    pub maturity_notified: bool,
    pub plots: Vec<PlotSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestoreError {
    #[error("snapshot holds {0} plots, expected 16")]
    PlotCount(usize),
    #[error("snapshot plot index {0} is out of range or repeated")]
    PlotIndex(usize),
}

pub struct Farm {
    tick: u64,
    pub(crate) clock: Clock,
    pub(crate) coins: u64,
    pub(crate) environment: Environment,
    pub(crate) plots: [Option<Crop>; GRID_CELLS],
    pub(crate) soil: [SoilPlot; GRID_CELLS],
    pub(crate) maturity_notified: bool,
    events: Vec<FarmEvent>,
}

impl Farm {
    /// An empty field with the biome's baseline soil.
    pub fn new(environment: Environment, coins: u64) -> Self {
        let soil = [SoilPlot::baseline(environment.biome.soil_moisture()); GRID_CELLS];
        Self::with_soil(environment, coins, soil)
    }

    pub fn with_soil(environment: Environment, coins: u64, soil: [SoilPlot; GRID_CELLS]) -> Self {
        Self {
            tick: 0,
            clock: Clock::default(),
            coins,
            environment,
            plots: std::array::from_fn(|_| None),
            soil,
            maturity_notified: false,
            events: Vec::new(),
        }
    }

    pub fn restore(snapshot: &FarmSnapshot) -> Result<Self, RestoreError> {
        if snapshot.plots.len() != GRID_CELLS {
            return Err(RestoreError::PlotCount(snapshot.plots.len()));
        }
        let mut farm = Self::new(snapshot.environment.clone(), snapshot.coins);
        let mut seen = [false; GRID_CELLS];
        for plot in &snapshot.plots {
            if plot.index >= GRID_CELLS || seen[plot.index] {
                return Err(RestoreError::PlotIndex(plot.index));
            }
            seen[plot.index] = true;
            farm.plots[plot.index] = plot.crop.clone();
            farm.soil[plot.index] = plot.soil;
        }
        farm.tick = snapshot.tick;
        farm.clock = snapshot.clock;
        farm.maturity_notified = snapshot.maturity_notified;
        Ok(farm)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn advance_tick(&mut self) {
        self.tick += 1;
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn day(&self) -> u64 {
        self.clock.day
    }

    pub fn time_of_day(&self) -> u32 {
        self.clock.time_of_day
    }

    pub fn coins(&self) -> u64 {
        self.coins
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn crop(&self, index: usize) -> Option<&Crop> {
        self.plots.get(index).and_then(Option::as_ref)
    }

    pub fn crop_mut(&mut self, index: usize) -> Option<&mut Crop> {
        self.plots.get_mut(index).and_then(Option::as_mut)
    }

    pub fn is_empty_plot(&self, index: usize) -> bool {
        matches!(self.plots.get(index), Some(None))
    }

    pub fn soil(&self, index: usize) -> Option<&SoilPlot> {
        self.soil.get(index)
    }

    pub fn crops(&self) -> impl Iterator<Item = (usize, &Crop)> {
        self.plots
            .iter()
            .enumerate()
            .filter_map(|(index, plot)| plot.as_ref().map(|crop| (index, crop)))
    }

    pub fn planted_count(&self) -> usize {
        self.crops().count()
    }

    pub fn alive_count(&self) -> usize {
        self.crops().filter(|(_, crop)| crop.is_alive()).count()
    }

    /// Mean health over every occupied plot, dead ones included.
    pub fn average_health(&self) -> f64 {
        let planted = self.planted_count();
        if planted == 0 {
            return 0.0;
        }
        self.crops().map(|(_, crop)| crop.health).sum::<f64>() / planted as f64
    }

    /// At least one living crop and every living crop mature.
    pub fn all_alive_mature(&self) -> bool {
        let mut alive = self.crops().filter(|(_, crop)| crop.is_alive()).peekable();
        alive.peek().is_some() && alive.all(|(_, crop)| crop.stage() == Stage::Mature)
    }

    pub fn record(&mut self, event: FarmEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[FarmEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<FarmEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn plot_snapshot(&self, index: usize) -> Option<PlotSnapshot> {
        let soil = *self.soil.get(index)?;
        let crop = self.crop(index).cloned();
        Some(PlotSnapshot {
            index,
            row: index / GRID_WIDTH,
            col: index % GRID_WIDTH,
            progress: crop.as_ref().map(Crop::progress),
            stage: crop.as_ref().map(Crop::stage),
            crop,
            soil,
        })
    }

    pub fn snapshot(&self, scenario: &str) -> FarmSnapshot {
        FarmSnapshot {
            scenario: scenario.to_string(),
            tick: self.tick,
            clock: self.clock,
            clock_label: self.clock.label(),
            coins: self.coins,
            environment: self.environment.clone(),
            conditions: self.environment.conditions(),
            planted: self.planted_count(),
            alive: self.alive_count(),
            average_health: self.average_health(),
            maturity_notified: self.maturity_notified,
            plots: (0..GRID_CELLS)
                .filter_map(|index| self.plot_snapshot(index))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Biome;

    fn farm_with_maize(cells: &[usize]) -> Farm {
        let mut farm = Farm::new(Environment::default(), 100);
        for &index in cells {
            farm.plots[index] = Some(Crop::sown(Species::Maize, Biome::Hilly, true));
        }
        farm
    }

    #[test]
    fn new_farm_is_empty() {
        let farm = Farm::new(Environment::default(), 2000);
        assert_eq!(farm.planted_count(), 0);
        assert_eq!(farm.average_health(), 0.0);
        assert!(!farm.all_alive_mature());
        assert!(farm.is_empty_plot(15));
        assert!(!farm.is_empty_plot(16));
        assert_eq!(farm.day(), 1);
        assert_eq!(farm.time_of_day(), 20);
    }

    #[test]
    fn maturity_ignores_dead_crops() {
        let mut farm = farm_with_maize(&[0, 1]);
        farm.crop_mut(0).unwrap().growth_days = 10.0;
        farm.crop_mut(1).unwrap().is_dead = true;
        assert!(farm.all_alive_mature());

        farm.crop_mut(0).unwrap().is_dead = true;
        assert!(!farm.all_alive_mature());
    }

    #[test]
    fn snapshot_restores() {
        let mut farm = farm_with_maize(&[3, 9]);
        farm.crop_mut(9).unwrap().growth_days = 4.0;
        farm.clock.advance();
        farm.advance_tick();
        let snapshot = farm.snapshot("test");
        assert_eq!(snapshot.plots.len(), GRID_CELLS);
        assert_eq!(snapshot.plots[9].progress, Some(40.0));
        assert_eq!(snapshot.plots[9].stage, Some(Stage::Sprout));
        assert_eq!(snapshot.plots[9].row, 2);
        assert_eq!(snapshot.plots[9].col, 1);

        let restored = Farm::restore(&snapshot).unwrap();
        assert_eq!(restored.snapshot("test"), snapshot);
    }

    #[test]
    fn restore_rejects_bad_plots() {
        let farm = Farm::new(Environment::default(), 10);
        let mut snapshot = farm.snapshot("test");
        snapshot.plots.pop();
        assert_eq!(
            Farm::restore(&snapshot).err(),
            Some(RestoreError::PlotCount(15))
        );

        let mut snapshot = farm.snapshot("test");
        snapshot.plots[4].index = 3;
        assert_eq!(
            Farm::restore(&snapshot).err(),
            Some(RestoreError::PlotIndex(3))
        );
    }
}
