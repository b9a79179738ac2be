//! Planting and farming operations on a selection of cells.
//!
//! Every operation validates first and mutates only once it is known to
//! succeed, so a rejected call leaves the farm exactly as it was.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    catalog::{ActionKind, Species, IRRIGATION_HEALTH_BOOST, IRRIGATION_RAIN_BOOST, SEED_COST},
    components::Crop,
    selection::Selection,
    suitability::{self, SoilReading},
    world::{Farm, FarmEvent},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("no cells selected")]
    NoSelection,
    #[error("no empty cells in the selection")]
    NoEmptyCells,
    #[error("not enough coins: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("nothing in the selection is ready to harvest")]
    NothingToHarvest,
    #[error("the simulation is paused")]
    NotRunning,
    #[error("another action is still in progress")]
    Busy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantReport {
    pub species: Species,
    pub planted: usize,
    /// Crops sown dead because the conditions could not support them.
    pub died: usize,
    pub cost: u64,
    pub suitability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReport {
    pub action: ActionKind,
    pub affected: usize,
    pub cost: u64,
    pub harvested: usize,
    pub earnings: u64,
}

fn ensure_funds(farm: &Farm, needed: u64) -> Result<(), ActionError> {
    if farm.coins < needed {
        return Err(ActionError::InsufficientFunds {
            needed,
            available: farm.coins,
        });
    }
    Ok(())
}

/// Sows `species` on every empty selected cell at two coins a seed.
pub fn plant(
    farm: &mut Farm,
    species: Species,
    selection: &Selection,
) -> Result<PlantReport, ActionError> {
    if selection.is_empty() {
        return Err(ActionError::NoSelection);
    }
    let empty: Vec<usize> = selection
        .indices()
        .into_iter()
        .filter(|&index| farm.is_empty_plot(index))
        .collect();
    if empty.is_empty() {
        return Err(ActionError::NoEmptyCells);
    }
    let cost = SEED_COST * empty.len() as u64;
    ensure_funds(farm, cost)?;

    let score = suitability::score(&SoilReading::from_environment(&farm.environment), species);
    let viable = suitability::is_viable(score);
    let biome = farm.environment.biome;

    farm.coins -= cost;
    for &index in &empty {
        farm.plots[index] = Some(Crop::sown(species, biome, viable));
        if viable {
            farm.soil[index].ploughed = false;
        }
    }
    farm.maturity_notified = false;

    let died = if viable { 0 } else { empty.len() };
    if viable {
        info!(%species, cells = empty.len(), cost, score, "planted");
    } else {
        info!(%species, cells = empty.len(), cost, score, "planting failed, crops sown dead");
    }
    farm.record(FarmEvent::Planted {
        species,
        planted: empty.len(),
        died,
        cost,
    });

    Ok(PlantReport {
        species,
        planted: empty.len(),
        died,
        cost,
        suitability: score,
    })
}

/// Price of running `action` on the selection. Only the selection and the
/// balance are checked; crop readiness is left to [`apply`].
pub fn quote(farm: &Farm, action: ActionKind, selection: &Selection) -> Result<u64, ActionError> {
    if selection.is_empty() {
        return Err(ActionError::NoSelection);
    }
    let cost = action.def().cost.for_biome(farm.environment.biome) * selection.len() as u64;
    ensure_funds(farm, cost)?;
    Ok(cost)
}

/// Runs `action` on every selected cell and charges for the whole selection.
pub fn apply(
    farm: &mut Farm,
    action: ActionKind,
    selection: &Selection,
) -> Result<ActionReport, ActionError> {
    if action == ActionKind::Harvest
        && !selection.is_empty()
        && !selection
            .indices()
            .into_iter()
            .any(|index| farm.crop(index).is_some_and(Crop::is_harvestable))
    {
        return Err(ActionError::NothingToHarvest);
    }
    let cost = quote(farm, action, selection)?;
    let def = action.def();
    farm.coins -= cost;

    let mut affected = 0;
    let mut harvested = 0;
    let mut earnings = 0;
    for index in selection.indices() {
        farm.soil[index].apply(&def.effect);
        if action.is_plough() {
            farm.soil[index].ploughed = true;
        }

        let plot = &mut farm.plots[index];
        match action {
            ActionKind::RemoveCrop => {
                if plot.take().is_some() {
                    affected += 1;
                }
            }
            ActionKind::Harvest => {
                if !plot.as_ref().is_some_and(Crop::is_harvestable) {
                    continue;
                }
                if let Some(crop) = plot.take() {
                    earnings += crop.species.profile().harvest_gold;
                    harvested += 1;
                    affected += 1;
                }
            }
            ActionKind::Irrigate => {
                if let Some(crop) = plot.as_mut().filter(|crop| crop.is_alive()) {
                    crop.heal(IRRIGATION_HEALTH_BOOST);
                    affected += 1;
                }
            }
            // Empty plots count; dead ones are left alone.
            _ => {
                if plot.as_ref().map_or(true, Crop::is_alive) {
                    affected += 1;
                }
            }
        }
    }

    if action == ActionKind::Irrigate {
        let rain = farm.environment.rain + IRRIGATION_RAIN_BOOST;
        farm.environment.set_rain(rain);
    }
    farm.coins += earnings;

    debug!(%action, affected, cost, earnings, "action applied");
    if action == ActionKind::Harvest {
        info!(harvested, earnings, cost, "harvest complete");
        farm.record(FarmEvent::Harvested {
            count: harvested,
            earnings,
            cost,
        });
    } else {
        farm.record(FarmEvent::ActionApplied {
            action,
            affected,
            cost,
        });
    }

    Ok(ActionReport {
        action,
        affected,
        cost,
        harvested,
        earnings,
    })
}

/// Removes every dead crop free of charge.
pub fn clear_dead(farm: &mut Farm) -> usize {
    let mut count = 0;
    for plot in farm.plots.iter_mut() {
        if plot.as_ref().is_some_and(|crop| crop.is_dead) {
            *plot = None;
            count += 1;
        }
    }
    if count > 0 {
        info!(count, "cleared dead crops");
        farm.record(FarmEvent::DeadCleared { count });
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::Biome, components::Environment};

    fn maize_farm(coins: u64, cells: &[usize]) -> Farm {
        let mut farm = Farm::new(Environment::default(), coins);
        plant(
            &mut farm,
            Species::Maize,
            &Selection::from_cells(cells.iter().copied()).unwrap(),
        )
        .unwrap();
        farm
    }

    #[test]
    fn plants_only_empty_cells() {
        let mut farm = maize_farm(100, &[0]);
        let report = plant(
            &mut farm,
            Species::Maize,
            &Selection::from_cells([0, 1, 2]).unwrap(),
        )
        .unwrap();
        assert_eq!(report.planted, 2);
        assert_eq!(report.cost, 4);
        assert_eq!(farm.coins(), 94);
        assert_eq!(farm.planted_count(), 3);
    }

    #[test]
    fn native_crop_starts_at_82_health() {
        let farm = maize_farm(2, &[5]);
        let crop = farm.crop(5).unwrap();
        assert_eq!(crop.health, 82.0);
        assert_eq!(crop.progress(), 0.0);
        assert!(crop.is_alive());
        assert_eq!(farm.coins(), 0);
    }

    #[test]
    fn planting_without_funds_changes_nothing() {
        let mut farm = Farm::new(Environment::default(), 5);
        let err = plant(
            &mut farm,
            Species::Maize,
            &Selection::from_cells([0, 1, 2]).unwrap(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ActionError::InsufficientFunds {
                needed: 6,
                available: 5
            }
        );
        assert_eq!(farm.coins(), 5);
        assert_eq!(farm.planted_count(), 0);
        assert!(farm.events().is_empty());
    }

    #[test]
    fn planting_rejections() {
        let mut farm = maize_farm(100, &[0]);
        assert_eq!(
            plant(&mut farm, Species::Rice, &Selection::new()),
            Err(ActionError::NoSelection)
        );
        assert_eq!(
            plant(&mut farm, Species::Rice, &Selection::from_cells([0]).unwrap()),
            Err(ActionError::NoEmptyCells)
        );
    }

    #[test]
    fn unsuitable_planting_is_sown_dead_and_charged() {
        let mut env = Environment::default();
        env.set_rain(100.0);
        let mut farm = Farm::new(env, 50);
        let report = plant(
            &mut farm,
            Species::Lentil,
            &Selection::from_cells([0, 1]).unwrap(),
        )
        .unwrap();
        assert_eq!(report.died, 2);
        assert_eq!(farm.coins(), 46);
        assert_eq!(farm.alive_count(), 0);
        assert!(farm.crop(0).unwrap().is_dead);
    }

    #[test]
    fn harvest_takes_only_ripe_crops() {
        let mut farm = maize_farm(1000, &[0, 1]);
        farm.crop_mut(0).unwrap().growth_days = 7.5;
        farm.crop_mut(1).unwrap().growth_days = 7.0;
        let before = farm.coins();

        let report = apply(
            &mut farm,
            ActionKind::Harvest,
            &Selection::from_cells([0, 1]).unwrap(),
        )
        .unwrap();
        assert_eq!(report.harvested, 1);
        assert_eq!(report.earnings, 190);
        assert_eq!(report.cost, 220);
        assert_eq!(farm.coins(), before - 220 + 190);
        assert!(farm.is_empty_plot(0));
        assert!(farm.crop(1).is_some());
    }

    #[test]
    fn harvest_with_nothing_ripe_is_free() {
        let mut farm = maize_farm(1000, &[0]);
        let before = farm.coins();
        assert_eq!(
            apply(&mut farm, ActionKind::Harvest, &Selection::all()),
            Err(ActionError::NothingToHarvest)
        );
        assert_eq!(farm.coins(), before);
    }

    #[test]
    fn irrigation_heals_and_adds_rain() {
        let mut farm = maize_farm(1000, &[0, 1]);
        farm.crop_mut(0).unwrap().health = 50.0;
        farm.crop_mut(1).unwrap().is_dead = true;
        let report = apply(
            &mut farm,
            ActionKind::Irrigate,
            &Selection::from_cells([0, 1, 2]).unwrap(),
        )
        .unwrap();
        assert_eq!(report.affected, 1);
        assert_eq!(report.cost, 270);
        assert_eq!(farm.crop(0).unwrap().health, 60.0);
        assert_eq!(farm.environment().rain, 68.0);
        assert_eq!(farm.soil(2).unwrap().moisture, 65.0);
    }

    #[test]
    fn plough_marks_plots_and_planting_consumes_it() {
        let mut farm = Farm::new(Environment::default(), 1000);
        let selection = Selection::from_cells([3, 7]).unwrap();
        let report = apply(&mut farm, ActionKind::ManualPlough, &selection).unwrap();
        assert_eq!(report.affected, 2);
        assert_eq!(report.cost, 70);
        assert!(farm.soil(3).unwrap().ploughed);

        plant(&mut farm, Species::Maize, &Selection::from_cells([3]).unwrap()).unwrap();
        assert!(!farm.soil(3).unwrap().ploughed);
        assert!(farm.soil(7).unwrap().ploughed);
    }

    #[test]
    fn remove_crop_clears_dead_and_alive() {
        let mut farm = maize_farm(1000, &[0, 1]);
        farm.crop_mut(1).unwrap().is_dead = true;
        let report = apply(
            &mut farm,
            ActionKind::RemoveCrop,
            &Selection::from_cells([0, 1, 2]).unwrap(),
        )
        .unwrap();
        assert_eq!(report.affected, 2);
        assert_eq!(farm.planted_count(), 0);
    }

    #[test]
    fn action_cost_uses_mountain_rate() {
        let env = Environment {
            biome: Biome::Mountain,
            ..Environment::default()
        };
        let farm = Farm::new(env, 1000);
        assert_eq!(
            quote(&farm, ActionKind::Mulch, &Selection::from_cells([0, 1]).unwrap()),
            Ok(100)
        );
    }

    #[test]
    fn quote_ignores_crop_readiness() {
        let farm = maize_farm(1000, &[0]);
        assert_eq!(
            quote(&farm, ActionKind::Harvest, &Selection::from_cells([0]).unwrap()),
            Ok(110)
        );
    }

    #[test]
    fn action_cannot_overdraw() {
        let mut farm = Farm::new(Environment::default(), 100);
        let err = apply(&mut farm, ActionKind::Plough, &Selection::all()).unwrap_err();
        assert_eq!(
            err,
            ActionError::InsufficientFunds {
                needed: 1760,
                available: 100
            }
        );
        assert_eq!(farm.coins(), 100);
    }

    #[test]
    fn clear_dead_is_free() {
        let mut farm = maize_farm(100, &[0, 1, 2]);
        farm.crop_mut(0).unwrap().is_dead = true;
        farm.crop_mut(2).unwrap().is_dead = true;
        let coins = farm.coins();
        assert_eq!(clear_dead(&mut farm), 2);
        assert_eq!(farm.coins(), coins);
        assert_eq!(farm.planted_count(), 1);
        assert_eq!(clear_dead(&mut farm), 0);
    }
}
