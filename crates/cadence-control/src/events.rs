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


//! Events accepted by the [`FrameScheduler`](crate::FrameScheduler).

use crate::config::ConfigPatch;
use crate::error::ReportedError;
use crate::invocation::{ContextRestoreReport, InvocationId, RecoveryReport};
use crate::sampler::PerformanceMetrics;
use cadence_core::SystemKind;
use serde::{Deserialize, Serialize};

/// One frame delivered by the frame driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameTick {
    /// Time since the previous frame, in milliseconds.
    pub delta_ms: f64,
    /// When the frame started, in scheduler milliseconds.
    pub timestamp_ms: f64,
}

impl FrameTick {
    /// Creates a tick.
    pub fn new(delta_ms: f64, timestamp_ms: f64) -> Self {
        Self {
            delta_ms,
            timestamp_ms,
        }
    }
}

/// Everything the scheduler can be told.
///
/// Events that a state does not handle are dropped without touching the
/// context.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// Start the frame loop from `idle`, or retry from `error`.
    StartLoop,
    /// Stop the frame loop and return to `idle`.
    StopLoop,
    /// Suspend frame processing.
    PauseLoop,
    /// Resume after a pause.
    ResumeLoop,
    /// Flip the debug flag.
    ToggleDebugMode,
    /// Enter single-step debugging.
    EnableStepMode,
    /// Leave single-step debugging and resume.
    DisableStepMode,
    /// Advance exactly one frame while stepping.
    StepFrame,
    /// Merge a partial configuration.
    UpdateConfig(ConfigPatch),
    /// Clear metrics, errors and the recovery attempt count.
    ResetPerformanceMetrics,
    /// The graphics context was lost.
    ContextLost,
    /// The graphics context is usable again.
    ContextRestored,
    /// Enable or disable one per-frame system.
    SetSystemEnabled {
        /// The system.
        system: SystemKind,
        /// Its new state.
        enabled: bool,
    },
    /// A frame from the frame driver.
    FrameTick(FrameTick),
    /// Aggregated metrics for one sampling window.
    PerformanceUpdate(PerformanceMetrics),
    /// Progress reported by the recovery coordinator.
    RecoveryProgress {
        /// The invocation reporting.
        invocation: InvocationId,
        /// Completed fraction in `[0, 1]`.
        progress: f64,
    },
    /// Something went wrong.
    ErrorOccurred(ReportedError),
    /// The recovery coordinator finished.
    RecoveryResolved {
        /// The invocation that finished.
        invocation: InvocationId,
        /// Its result; the error is a human-readable reason.
        outcome: Result<RecoveryReport, String>,
    },
    /// The context probe finished.
    ContextProbeResolved {
        /// The invocation that finished.
        invocation: InvocationId,
        /// Its result; the error is a human-readable reason.
        outcome: Result<ContextRestoreReport, String>,
    },
}

impl SchedulerEvent {
    /// The canonical upper-case name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            SchedulerEvent::StartLoop => "START_LOOP",
            SchedulerEvent::StopLoop => "STOP_LOOP",
            SchedulerEvent::PauseLoop => "PAUSE_LOOP",
            SchedulerEvent::ResumeLoop => "RESUME_LOOP",
            SchedulerEvent::ToggleDebugMode => "TOGGLE_DEBUG_MODE",
            SchedulerEvent::EnableStepMode => "ENABLE_STEP_MODE",
            SchedulerEvent::DisableStepMode => "DISABLE_STEP_MODE",
            SchedulerEvent::StepFrame => "STEP_FRAME",
            SchedulerEvent::UpdateConfig(_) => "UPDATE_CONFIG",
            SchedulerEvent::ResetPerformanceMetrics => "RESET_PERFORMANCE_METRICS",
            SchedulerEvent::ContextLost => "WEBGL_CONTEXT_LOST",
            SchedulerEvent::ContextRestored => "WEBGL_CONTEXT_RESTORED",
            SchedulerEvent::SetSystemEnabled { .. } => "SET_SYSTEM_ENABLED",
            SchedulerEvent::FrameTick(_) => "FRAME_TICK",
            SchedulerEvent::PerformanceUpdate(_) => "PERFORMANCE_UPDATE",
            SchedulerEvent::RecoveryProgress { .. } => "RECOVERY_PROGRESS",
            SchedulerEvent::ErrorOccurred(_) => "ERROR_OCCURRED",
            SchedulerEvent::RecoveryResolved { .. } => "RECOVERY_RESOLVED",
            SchedulerEvent::ContextProbeResolved { .. } => "CONTEXT_PROBE_RESOLVED",
        }
    }

    /// Shorthand for a [`SchedulerEvent::FrameTick`].
    pub fn frame_tick(delta_ms: f64, timestamp_ms: f64) -> Self {
        SchedulerEvent::FrameTick(FrameTick::new(delta_ms, timestamp_ms))
    }

    /// Returns `true` for events that arrive at frame rate.
    ///
    /// Used to keep per-frame traffic out of debug-level logs.
    pub fn is_high_frequency(&self) -> bool {
        matches!(
            self,
            SchedulerEvent::FrameTick(_) | SchedulerEvent::RecoveryProgress { .. }
        )
    }
}
