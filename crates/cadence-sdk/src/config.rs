// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Host configuration, loaded from JSON.

use anyhow::{Context, Result};
use cadence_control::SchedulerOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which frame loop the host runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopBackend {
    /// The frame scheduler state machine.
    #[default]
    StateMachine,
    /// The minimal loop without recovery. Needs the `legacy-loop` feature.
    Legacy,
}

/// Everything the composition root needs, passed in at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Selected frame loop.
    pub backend: LoopBackend,
    /// Scheduler configuration, timeouts and budgets.
    pub scheduler: SchedulerOptions,
    /// Pause before each recovery step.
    pub recovery_step_delay_ms: u64,
    /// Interval between graphics-resource probes after a context loss.
    pub context_poll_interval_ms: u64,
    /// Capacity of the inbound event queue; `0` means unbounded. When the
    /// queue is full, `SchedulerHandle::send` drops the event and returns `false`.
    pub event_buffer_size: usize,
    /// Produce frame ticks from a built-in interval timer. Disable to feed
    /// `FRAME_TICK` events from an external frame source instead.
    pub drive_frames: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            backend: LoopBackend::StateMachine,
            scheduler: SchedulerOptions::default(),
            recovery_step_delay_ms: 50,
            context_poll_interval_ms: 100,
            event_buffer_size: 0,
            drive_frames: true,
        }
    }
}

impl HostConfig {
    /// Parses a configuration from a JSON string. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: HostConfig =
            serde_json::from_str(json).context("Failed to parse host configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read host configuration '{}'", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("Invalid host configuration '{}'", path.display()))
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write host configuration '{}'", path.display()))
    }

    /// Checks the scheduler options and the coordinator intervals.
    pub fn validate(&self) -> Result<()> {
        self.scheduler
            .validate()
            .context("Invalid scheduler options")?;
        anyhow::ensure!(
            self.context_poll_interval_ms > 0,
            "context_poll_interval_ms must be positive"
        );
        Ok(())
    }

    /// [`recovery_step_delay_ms`](Self::recovery_step_delay_ms) as a duration.
    pub fn recovery_step_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_step_delay_ms)
    }

    /// [`context_poll_interval_ms`](Self::context_poll_interval_ms) as a duration.
    pub fn context_poll_interval(&self) -> Duration {
        Duration::from_millis(self.context_poll_interval_ms)
    }
}
