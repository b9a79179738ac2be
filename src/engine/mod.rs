use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    actions::{self, ActionError, ActionReport},
    catalog::ActionKind,
    selection::Selection,
    snapshot::SnapshotWriter,
    systems::{AdvisorySystem, ClockSystem, GrowthSystem},
    world::{Farm, FarmEvent},
};

/// Tick interval while a timed action is in progress.
pub const ACTION_TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Speed {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl Speed {
    pub fn tick_interval(self) -> Duration {
        match self {
            Speed::Slow => Duration::from_millis(500),
            Speed::Medium => Duration::from_millis(200),
            Speed::Fast => Duration::from_millis(80),
        }
    }
}

pub struct EngineSettings {
    pub scenario_name: String,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
    pub speed: Speed,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Clock, growth and advisory, in that order.
    pub fn with_default_systems(self, alert_cooldown_ticks: u64) -> Self {
        self.with_system(ClockSystem::new())
            .with_system(GrowthSystem::new())
            .with_system(AdvisorySystem::new(alert_cooldown_ticks))
    }

    pub fn build(self) -> Engine {
        Engine {
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            speed: self.settings.speed,
            settings: self.settings,
            running: false,
            resumed: false,
            pending: None,
        }
    }
}

/// A timed action waiting for its ticks to elapse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingAction {
    pub action: ActionKind,
    pub selection: Selection,
    pub progress: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    Completed(ActionReport),
    /// The action no longer applied when its time was up, e.g. the coins
    /// were spent elsewhere meanwhile.
    Rejected { action: ActionKind, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub day: u64,
    pub time_of_day: u32,
    pub coins: u64,
    pub events: Vec<FarmEvent>,
    pub action: Option<ActionOutcome>,
    pub snapshot_path: Option<PathBuf>,
}

pub struct Engine {
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
    speed: Speed,
    running: bool,
    /// Set by a paused-to-running transition, cleared by the next step.
    resumed: bool,
    pending: Option<PendingAction>,
}

impl Engine {
    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    pub fn start(&mut self) {
        if !self.running {
            self.resumed = true;
        }
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the driver should keep ticking. A timed action finishes even
    /// after the farm paused itself.
    pub fn should_step(&self) -> bool {
        self.running || self.pending.is_some()
    }

    pub fn tick_interval(&self) -> Duration {
        if self.pending.is_some() {
            ACTION_TICK_INTERVAL
        } else {
            self.speed.tick_interval()
        }
    }

    /// Queues a timed action. Nothing is charged until it completes.
    pub fn begin_action(
        &mut self,
        farm: &Farm,
        action: ActionKind,
        selection: Selection,
    ) -> Result<PendingAction, ActionError> {
        if !self.running {
            return Err(ActionError::NotRunning);
        }
        if self.pending.is_some() {
            return Err(ActionError::Busy);
        }
        actions::quote(farm, action, &selection)?;
        let pending = PendingAction {
            action,
            selection,
            progress: 0,
            total: action.def().duration_ticks,
        };
        debug!(%action, ticks = pending.total, "action started");
        self.pending = Some(pending.clone());
        Ok(pending)
    }

    pub fn step(&mut self, farm: &mut Farm) -> Result<TickReport> {
        farm.advance_tick();
        let ctx = SystemContext {
            tick: farm.tick(),
            scenario_name: &self.settings.scenario_name,
            resumed: std::mem::take(&mut self.resumed),
        };
        for system in &mut self.systems {
            system.run(&ctx, farm)?;
        }

        let action = self.advance_pending(farm);

        if farm
            .events()
            .iter()
            .any(|event| matches!(event, FarmEvent::AllMature))
        {
            info!(tick = farm.tick(), "all crops mature, pausing");
            self.running = false;
        }

        let snapshot_path = self
            .snapshot_writer
            .maybe_write(farm, &self.settings.scenario_name)?;

        Ok(TickReport {
            tick: farm.tick(),
            day: farm.day(),
            time_of_day: farm.time_of_day(),
            coins: farm.coins(),
            events: farm.drain_events(),
            action,
            snapshot_path,
        })
    }

    fn advance_pending(&mut self, farm: &mut Farm) -> Option<ActionOutcome> {
        let pending = self.pending.as_mut()?;
        pending.progress += 1;
        if pending.progress < pending.total {
            return None;
        }
        let PendingAction {
            action, selection, ..
        } = self.pending.take()?;
        match actions::apply(farm, action, &selection) {
            Ok(report) => Some(ActionOutcome::Completed(report)),
            Err(err) => {
                warn!(%action, error = %err, "timed action rejected at completion");
                Some(ActionOutcome::Rejected {
                    action,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Starts the engine and steps until `ticks` have run or it stops.
    pub fn run(&mut self, farm: &mut Farm, ticks: u64) -> Result<u64> {
        self.run_with_hook(farm, ticks, |_| {})
    }

    /// Like [`Engine::run`], handing each tick's report to `hook`. Returns the
    /// number of ticks executed.
    pub fn run_with_hook<F>(&mut self, farm: &mut Farm, ticks: u64, mut hook: F) -> Result<u64>
    where
        F: FnMut(TickReport),
    {
        self.start();
        let mut executed = 0;
        while executed < ticks && self.should_step() {
            let report = self.step(farm)?;
            executed += 1;
            hook(report);
        }
        Ok(executed)
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub scenario_name: &'a str,
    /// First tick after the engine was started from paused.
    pub resumed: bool,
}

pub trait System: Send {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &SystemContext, farm: &mut Farm) -> Result<()>;
}
