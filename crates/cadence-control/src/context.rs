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


//! The data owned by the scheduler and mutated by its actions.

use crate::config::{SchedulerConfig, SchedulerOptions};
use crate::error::ErrorKind;
use crate::history::FrameTimeHistory;
use crate::invocation::RecoveryReport;
use cadence_core::SystemFlags;
use serde::Serialize;

/// Frame timing as last observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimingState {
    /// Duration of the last frame in milliseconds.
    pub delta_time: f64,
    /// Timestamp of the last frame processed.
    pub last_frame_time: f64,
    /// Clock reading when the last frame was processed.
    pub current_time: f64,
    /// How many times the frame clock was initialized from `idle`.
    pub clock_starts: u32,
}

/// Rolling performance figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceState {
    /// Frames per second of the last sampling window.
    pub fps: f64,
    /// Frames per second derived from the mean of the frame-time history.
    pub average_fps: f64,
    /// Frames accounted for by sampling windows so far.
    pub frame_count: u64,
    /// Recent mean frame times, one per sampling window.
    pub frame_times: FrameTimeHistory,
    /// Slowest frame seen since the last reset.
    pub max_frame_time: f64,
    /// Fastest frame seen since the last reset; `0.0` until the first window.
    pub min_frame_time: f64,
    /// Frames missed against the target rate in the last sampling window.
    pub dropped_frames: u32,
    /// The frame rate the frame driver is asked to run at.
    pub effective_fps: f64,
    /// Wall time of the last system-update pass.
    pub last_update_duration_ms: f64,
}

impl PerformanceState {
    /// A cleared state for `config`.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            fps: 0.0,
            average_fps: 0.0,
            frame_count: 0,
            frame_times: FrameTimeHistory::new(config.max_frame_time_history),
            max_frame_time: 0.0,
            min_frame_time: 0.0,
            dropped_frames: 0,
            effective_fps: config.target_fps,
            last_update_duration_ms: 0.0,
        }
    }
}

/// The last recorded error and the recovery budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorState {
    /// Set while an error is unresolved.
    pub has_error: bool,
    /// Kind of the last recorded error.
    pub error_type: Option<ErrorKind>,
    /// Message of the last recorded error.
    pub error_message: Option<String>,
    /// Errors recorded since the last reset.
    pub error_count: u32,
    /// When the last error was recorded.
    pub last_error_time: Option<f64>,
    /// Recovery sequences started since the last reset or fresh start.
    pub recovery_attempts: u32,
    /// Recovery sequences allowed before giving up.
    pub max_recovery_attempts: u32,
}

impl ErrorState {
    /// A clean state with the given budget.
    pub fn new(max_recovery_attempts: u32) -> Self {
        Self {
            has_error: false,
            error_type: None,
            error_message: None,
            error_count: 0,
            last_error_time: None,
            recovery_attempts: 0,
            max_recovery_attempts,
        }
    }

    /// Marks the current error as resolved, keeping counters.
    pub fn resolve(&mut self) {
        self.has_error = false;
        self.error_type = None;
        self.error_message = None;
    }
}

/// Progress of the current or last recovery sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecoveryState {
    /// Set while in `recovering`.
    pub is_recovering: bool,
    /// When the current sequence started.
    pub recovery_start_time: Option<f64>,
    /// Completed fraction in `[0, 1]`; never decreases within a sequence.
    pub recovery_progress: f64,
    /// Performance figures captured when the sequence started.
    pub backup_performance: Option<PerformanceState>,
    /// Report of the last successful sequence.
    pub last_report: Option<RecoveryReport>,
}

/// Flags driven by the host and the debugger.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Controls {
    /// Set while in `paused`.
    pub is_paused: bool,
    /// Verbose diagnostics requested.
    pub debug_mode: bool,
    /// Frames only advance on `STEP_FRAME`.
    pub step_mode: bool,
    /// Frames advanced by stepping.
    pub frame_step: u64,
}

/// Everything the scheduler knows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerContext {
    /// Frame timing.
    pub timing: TimingState,
    /// Performance figures.
    pub performance: PerformanceState,
    /// Enabled per-frame systems.
    pub systems: SystemFlags,
    /// Current configuration.
    pub config: SchedulerConfig,
    /// Error bookkeeping.
    pub error: ErrorState,
    /// Recovery bookkeeping.
    pub recovery: RecoveryState,
    /// Host and debugger flags.
    pub controls: Controls,
}

impl SchedulerContext {
    /// The initial context for `options`.
    pub fn new(options: &SchedulerOptions) -> Self {
        Self {
            timing: TimingState::default(),
            performance: PerformanceState::new(&options.config),
            systems: options.systems,
            config: options.config.clone(),
            error: ErrorState::new(options.max_recovery_attempts),
            recovery: RecoveryState::default(),
            controls: Controls::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_context_follows_options() {
        let options = SchedulerOptions::default();
        let context = SchedulerContext::new(&options);
        assert_eq!(context.performance.effective_fps, 60.0);
        assert_eq!(context.performance.frame_times.capacity(), 60);
        assert_eq!(context.error.max_recovery_attempts, 3);
        assert_eq!(context.systems, SystemFlags::ALL);
        assert!(!context.error.has_error);
    }

    #[test]
    fn context_serializes_to_json() {
        let context = SchedulerContext::new(&SchedulerOptions::default());
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["config"]["target_fps"], 60.0);
        assert_eq!(json["systems"]["render"], true);
        assert!(json["error"]["error_type"].is_null());
    }
}
