use std::collections::HashMap;

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    catalog::Biome,
    components::{AlertKind, Environment},
    engine::{System, SystemContext},
    world::{Farm, FarmEvent},
};

/// Advice for the day ahead, from the most pressing weather down.
pub fn daily_advice(env: &Environment) -> &'static str {
    if env.rain >= 80.0 {
        "Heavy rain today. Skip watering and watch for waterlogging."
    } else if env.rain >= 55.0 {
        "Light rain expected. Reduce irrigation and monitor soil moisture."
    } else if env.sun > 80.0 && env.rain < 25.0 {
        "Hot and dry today. Water to prevent wilting."
    } else if env.wind >= 70.0 {
        "Strong winds today. Avoid spraying and secure supports."
    } else if env.biome == Biome::Mountain && env.temperature_c <= 12.0 {
        "Cold mountain morning. Growth slows, so avoid overwatering."
    } else {
        "Stable field conditions. Keep watering regularly and watch plant health."
    }
}

/// Posts the daily advice and raises weather alerts when sun, rain or wind
/// change or the simulation resumes. A repeat of the same alert is held back
/// for `cooldown_ticks`.
pub struct AdvisorySystem {
    cooldown_ticks: u64,
    last_weather: Option<(f64, f64, f64)>,
    last_alert: HashMap<AlertKind, u64>,
}

impl AdvisorySystem {
    pub fn new(cooldown_ticks: u64) -> Self {
        Self {
            cooldown_ticks,
            last_weather: None,
            last_alert: HashMap::new(),
        }
    }
}

impl Default for AdvisorySystem {
    fn default() -> Self {
        Self::new(30)
    }
}

impl System for AdvisorySystem {
    fn name(&self) -> &str {
        "advisory"
    }

    fn run(&mut self, ctx: &SystemContext, farm: &mut Farm) -> Result<()> {
        if farm.time_of_day() == 0 {
            let message = daily_advice(farm.environment());
            info!(day = farm.day(), message, "daily advice");
            farm.record(FarmEvent::Advice {
                message: message.to_string(),
            });
        }

        let env = farm.environment();
        let weather = (env.sun, env.rain, env.wind);
        if self.last_weather == Some(weather) && !ctx.resumed {
            return Ok(());
        }
        self.last_weather = Some(weather);

        let Some(alert) = env.alert() else {
            return Ok(());
        };
        let cooled_down = self
            .last_alert
            .get(&alert)
            .map_or(true, |&raised| {
                // A farm restored to an earlier tick starts a fresh timeline.
                raised > ctx.tick || ctx.tick - raised >= self.cooldown_ticks
            });
        if cooled_down {
            self.last_alert.insert(alert, ctx.tick);
            warn!(tick = ctx.tick, ?alert, "weather alert");
            farm.record(FarmEvent::Alert {
                alert,
                message: alert.message().to_string(),
            });
        }
        Ok(())
    }
}
