use anyhow::Result;
use tracing::{info, warn};

use crate::{
    catalog::{DEATH_PENALTY, GROWTH_RATE, TICKS_PER_DAY},
    engine::{System, SystemContext},
    world::{Farm, FarmEvent},
};

/// Grows every living crop and applies the weather's health effect.
pub struct GrowthSystem;

impl GrowthSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrowthSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for GrowthSystem {
    fn name(&self) -> &str {
        "growth"
    }

    fn run(&mut self, ctx: &SystemContext, farm: &mut Farm) -> Result<()> {
        let growth_days = GROWTH_RATE / f64::from(TICKS_PER_DAY);
        let health_delta = farm.environment.conditions().health_delta();

        let died = farm
            .plots
            .iter_mut()
            .flatten()
            .map(|crop| crop.advance(growth_days, health_delta))
            .filter(|&died| died)
            .count();

        if died > 0 {
            // Charged up to the remaining balance; the event reports what was taken.
            let penalty = (DEATH_PENALTY * died as u64).min(farm.coins);
            farm.coins -= penalty;
            warn!(tick = ctx.tick, died, penalty, "crops died");
            farm.record(FarmEvent::CropsDied {
                count: died,
                penalty,
            });
        }

        if !farm.maturity_notified && farm.all_alive_mature() {
            farm.maturity_notified = true;
            info!(tick = ctx.tick, "every living crop is mature");
            farm.record(FarmEvent::AllMature);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        actions,
        catalog::Species,
        components::Environment,
        selection::Selection,
    };

    fn ctx(tick: u64) -> SystemContext<'static> {
        SystemContext {
            tick,
            scenario_name: "test",
            resumed: false,
        }
    }

    #[test]
    fn death_charges_penalty_once() {
        let mut farm = Farm::new(Environment::default(), 100);
        actions::plant(&mut farm, Species::Maize, &Selection::from_cells([0, 1]).unwrap())
            .unwrap();
        farm.crop_mut(0).unwrap().health = 0.3;
        farm.crop_mut(1).unwrap().health = 0.3;
        farm.environment_mut().set_sun(90.0);
        farm.environment_mut().set_rain(10.0);

        let mut system = GrowthSystem::new();
        system.run(&ctx(1), &mut farm).unwrap();
        assert_eq!(farm.coins(), 96 - 10);
        assert_eq!(farm.alive_count(), 0);

        system.run(&ctx(2), &mut farm).unwrap();
        assert_eq!(farm.coins(), 86);
        assert_eq!(
            farm.drain_events().last(),
            Some(&FarmEvent::CropsDied {
                count: 2,
                penalty: 10
            })
        );
    }

    #[test]
    fn penalty_never_goes_below_zero() {
        let mut farm = Farm::new(Environment::default(), 5);
        actions::plant(&mut farm, Species::Maize, &Selection::from_cells([0]).unwrap()).unwrap();
        assert_eq!(farm.coins(), 3);
        farm.crop_mut(0).unwrap().health = 0.1;
        farm.environment_mut().set_rain(95.0);
        farm.drain_events();
        GrowthSystem::new().run(&ctx(1), &mut farm).unwrap();
        assert_eq!(farm.coins(), 0);
        assert_eq!(
            farm.drain_events(),
            vec![FarmEvent::CropsDied {
                count: 1,
                penalty: 3
            }]
        );
    }

    #[test]
    fn maturity_is_announced_once() {
        let mut farm = Farm::new(Environment::default(), 100);
        actions::plant(&mut farm, Species::Maize, &Selection::from_cells([0]).unwrap()).unwrap();
        farm.crop_mut(0).unwrap().growth_days = 9.0;
        farm.drain_events();

        let mut system = GrowthSystem::new();
        system.run(&ctx(1), &mut farm).unwrap();
        system.run(&ctx(2), &mut farm).unwrap();
        let announced = farm
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, FarmEvent::AllMature))
            .count();
        assert_eq!(announced, 1);
    }
}
