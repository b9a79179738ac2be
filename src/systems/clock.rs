use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    world::{Farm, FarmEvent},
};

/// Advances the time of day, rolling over into a new day.
pub struct ClockSystem;

impl ClockSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClockSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ClockSystem {
    fn name(&self) -> &str {
        "clock"
    }

    fn run(&mut self, ctx: &SystemContext, farm: &mut Farm) -> Result<()> {
        if farm.clock.advance() {
            let day = farm.day();
            debug!(tick = ctx.tick, day, "new day");
            farm.record(FarmEvent::DayStarted { day });
        }
        Ok(())
    }
}
