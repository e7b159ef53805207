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


//! Tunable scheduler parameters.
//!
//! [`SchedulerConfig`] is the part that can change at runtime through
//! `UPDATE_CONFIG` (as a [`ConfigPatch`]); [`SchedulerTimeouts`] and the rest of
//! [`SchedulerOptions`] are fixed when the scheduler is built.

use cadence_core::SystemFlags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a configuration violates its bounds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The frame-rate target is zero, negative or not finite.
    #[error("target_fps must be positive and finite, got {0}")]
    InvalidTargetFps(f64),
    /// The frame-time history cannot hold any sample.
    #[error("max_frame_time_history must be at least 1")]
    EmptyHistory,
    /// The sampling window is zero, negative or not finite.
    #[error("performance_update_interval_ms must be positive, got {0}")]
    InvalidUpdateInterval(f64),
    /// The stall threshold is zero, negative or not finite.
    #[error("max_frame_time_ms must be positive, got {0}")]
    InvalidFrameTimeCeiling(f64),
    /// The adaptation tolerance is outside `(0, 1)`.
    #[error("fps_tolerance must be within (0, 1), got {0}")]
    InvalidTolerance(f64),
    /// The adaptive floor is not positive or exceeds the target.
    #[error("min_adaptive_fps ({min}) must be positive and not exceed target_fps ({target})")]
    InvalidAdaptiveFloor {
        /// The requested floor.
        min: f64,
        /// The configured target.
        target: f64,
    },
    /// A timeout is zero, negative or not finite.
    #[error("timeout '{name}' must be positive, got {value}ms")]
    InvalidTimeout {
        /// Which timeout.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Runtime-tunable scheduler parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Desired frames per second.
    pub target_fps: f64,
    /// Capacity of the rolling frame-time history.
    pub max_frame_time_history: usize,
    /// Length of a performance sampling window in milliseconds.
    pub performance_update_interval_ms: f64,
    /// Whether the effective frame rate follows the measured one.
    pub adaptive_frame_rate: bool,
    /// Frames slower than this are treated as stalls.
    pub max_frame_time_ms: f64,
    /// Relative deviation between measured and effective fps that triggers adaptation.
    pub fps_tolerance: f64,
    /// Lowest frame rate adaptation may settle on.
    pub min_adaptive_fps: f64,
    /// Samples required in the history before adaptation is considered.
    pub min_adaptation_samples: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            max_frame_time_history: 60,
            performance_update_interval_ms: 1000.0,
            adaptive_frame_rate: true,
            max_frame_time_ms: 100.0,
            fps_tolerance: 0.1,
            min_adaptive_fps: 30.0,
            min_adaptation_samples: 3,
        }
    }
}

impl SchedulerConfig {
    /// Checks every field against its bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.target_fps) {
            return Err(ConfigError::InvalidTargetFps(self.target_fps));
        }
        if self.max_frame_time_history == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        if !positive(self.performance_update_interval_ms) {
            return Err(ConfigError::InvalidUpdateInterval(
                self.performance_update_interval_ms,
            ));
        }
        if !positive(self.max_frame_time_ms) {
            return Err(ConfigError::InvalidFrameTimeCeiling(self.max_frame_time_ms));
        }
        if !(self.fps_tolerance > 0.0 && self.fps_tolerance < 1.0) {
            return Err(ConfigError::InvalidTolerance(self.fps_tolerance));
        }
        if !positive(self.min_adaptive_fps) || self.min_adaptive_fps > self.target_fps {
            return Err(ConfigError::InvalidAdaptiveFloor {
                min: self.min_adaptive_fps,
                target: self.target_fps,
            });
        }
        Ok(())
    }

    /// Returns a copy with every field present in `patch` replaced.
    pub fn merged(&self, patch: &ConfigPatch) -> SchedulerConfig {
        SchedulerConfig {
            target_fps: patch.target_fps.unwrap_or(self.target_fps),
            max_frame_time_history: patch
                .max_frame_time_history
                .unwrap_or(self.max_frame_time_history),
            performance_update_interval_ms: patch
                .performance_update_interval_ms
                .unwrap_or(self.performance_update_interval_ms),
            adaptive_frame_rate: patch.adaptive_frame_rate.unwrap_or(self.adaptive_frame_rate),
            max_frame_time_ms: patch.max_frame_time_ms.unwrap_or(self.max_frame_time_ms),
            fps_tolerance: patch.fps_tolerance.unwrap_or(self.fps_tolerance),
            min_adaptive_fps: patch.min_adaptive_fps.unwrap_or(self.min_adaptive_fps),
            min_adaptation_samples: patch
                .min_adaptation_samples
                .unwrap_or(self.min_adaptation_samples),
        }
    }

    /// The frame budget at the target rate, in milliseconds.
    pub fn target_frame_time_ms(&self) -> f64 {
        1000.0 / self.target_fps
    }
}

/// A partial [`SchedulerConfig`]; absent fields are left untouched on merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_frame_time_history: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_update_interval_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive_frame_rate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_frame_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps_tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_adaptive_fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_adaptation_samples: Option<usize>,
}

impl ConfigPatch {
    /// A patch that only changes the frame-rate target.
    pub fn target_fps(fps: f64) -> Self {
        Self {
            target_fps: Some(fps),
            ..Self::default()
        }
    }

    /// Returns `true` if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Delays for the scheduler's timers, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerTimeouts {
    /// Period of the adaptive frame-rate check while running.
    pub adaptation_check_ms: f64,
    /// How long a recovery invocation may take before the scheduler gives up.
    pub recovery_timeout_ms: f64,
    /// How long to wait for the graphics context to come back.
    pub context_loss_timeout_ms: f64,
    /// Delay before the error state retries recovery on its own.
    pub error_retry_delay_ms: f64,
}

impl Default for SchedulerTimeouts {
    fn default() -> Self {
        Self {
            adaptation_check_ms: 5000.0,
            recovery_timeout_ms: 10_000.0,
            context_loss_timeout_ms: 30_000.0,
            error_retry_delay_ms: 5000.0,
        }
    }
}

impl SchedulerTimeouts {
    /// Checks that every delay is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let delays = [
            ("adaptation_check_ms", self.adaptation_check_ms),
            ("recovery_timeout_ms", self.recovery_timeout_ms),
            ("context_loss_timeout_ms", self.context_loss_timeout_ms),
            ("error_retry_delay_ms", self.error_retry_delay_ms),
        ];
        match delays.into_iter().find(|(_, value)| !positive(*value)) {
            Some((name, value)) => Err(ConfigError::InvalidTimeout { name, value }),
            None => Ok(()),
        }
    }
}

/// Everything needed to build a [`FrameScheduler`](crate::FrameScheduler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerOptions {
    /// Initial runtime configuration.
    pub config: SchedulerConfig,
    /// Timer delays.
    pub timeouts: SchedulerTimeouts,
    /// Systems enabled at start.
    pub systems: SystemFlags,
    /// Recovery attempts allowed before the scheduler settles in `error`.
    pub max_recovery_attempts: u32,
    /// Emit a frame-tick telemetry payload every this many ticks; `0` disables them.
    pub telemetry_frame_stride: u64,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            config: SchedulerConfig::default(),
            timeouts: SchedulerTimeouts::default(),
            systems: SystemFlags::ALL,
            max_recovery_attempts: 3,
            telemetry_frame_stride: 60,
        }
    }
}

impl SchedulerOptions {
    /// Validates the configuration and the timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()?;
        self.timeouts.validate()
    }
}
