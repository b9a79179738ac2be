//! Periodic JSON checkpoints of the farm.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::world::{Farm, FarmSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub written_at: DateTime<Utc>,
    pub farm: FarmSnapshot,
}

pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    /// Writes a snapshot when the farm's tick falls on the interval. An
    /// interval of 0 disables snapshots.
    pub fn maybe_write(&self, farm: &Farm, scenario_name: &str) -> Result<Option<PathBuf>> {
        if self.interval == 0 || farm.tick() % self.interval != 0 {
            return Ok(None);
        }
        self.write(farm, scenario_name).map(Some)
    }

    pub fn write(&self, farm: &Farm, scenario_name: &str) -> Result<PathBuf> {
        let dir = self.dir.join(scenario_name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("tick_{:06}.json", farm.tick()));
        let file = SnapshotFile {
            written_at: Utc::now(),
            farm: farm.snapshot(scenario_name),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        debug!(path = %path.display(), "snapshot written");
        Ok(path)
    }
}

pub fn load(path: impl AsRef<Path>) -> Result<SnapshotFile> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
}
