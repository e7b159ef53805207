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


//! Context mutations run on transitions and state entry.
//!
//! Every action is a plain function over [`SchedulerContext`]; none of them
//! read the clock or produce effects. The state machine supplies the time and
//! turns return values into effects and telemetry.

use crate::config::{ConfigError, ConfigPatch};
use crate::context::{ErrorState, PerformanceState, RecoveryState, SchedulerContext};
use crate::error::{ErrorKind, ReportedError};
use crate::events::FrameTick;
use crate::invocation::{ContextRestoreReport, RecoveryReport};
use crate::sampler::PerformanceMetrics;
use cadence_core::SystemKind;

/// A change of the effective frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateChange {
    /// Rate before the change.
    pub from: f64,
    /// Rate after the change.
    pub to: f64,
}

/// Prepares timing for a fresh start from `idle`.
///
/// This is the only place, besides a metrics reset, where the recovery
/// attempt count goes back to zero.
pub fn initialize_clock(context: &mut SchedulerContext, now_ms: f64) {
    context.timing.delta_time = 0.0;
    context.timing.last_frame_time = now_ms;
    context.timing.current_time = now_ms;
    context.timing.clock_starts += 1;
    context.error.recovery_attempts = 0;
    context.controls.is_paused = false;
}

/// Records the timing of one frame.
pub fn update_delta_time(context: &mut SchedulerContext, tick: &FrameTick, now_ms: f64) {
    context.timing.delta_time = tick.delta_ms;
    context.timing.last_frame_time = tick.timestamp_ms;
    context.timing.current_time = now_ms;
}

/// Folds one sampling window into the performance state.
pub fn update_performance_metrics(context: &mut SchedulerContext, metrics: &PerformanceMetrics) {
    let performance = &mut context.performance;
    let first_window = performance.frame_count == 0;

    performance.fps = metrics.fps;
    performance.frame_times.push(metrics.average_frame_time);
    let average = performance.frame_times.average();
    performance.average_fps = if average > 0.0 { 1000.0 / average } else { 0.0 };
    performance.frame_count += u64::from(metrics.frame_count);
    performance.dropped_frames = metrics.dropped_frames;
    performance.max_frame_time = performance.max_frame_time.max(metrics.max_frame_time);
    performance.min_frame_time = if first_window {
        metrics.min_frame_time
    } else {
        performance.min_frame_time.min(metrics.min_frame_time)
    };
}

/// Moves the effective frame rate towards the measured one.
///
/// Lowers it to `max(min_adaptive_fps, floor(average_fps))` when frames are
/// too slow, or raises it to `min(target_fps, ceil(average_fps))` when they
/// are fast again. The configured target is never touched.
pub fn update_adaptive_frame_rate(context: &mut SchedulerContext) -> Option<RateChange> {
    let config = &context.config;
    let performance = &mut context.performance;
    let from = performance.effective_fps;
    let to = if performance.average_fps < from {
        config.min_adaptive_fps.max(performance.average_fps.floor())
    } else {
        config.target_fps.min(performance.average_fps.ceil())
    };
    if (to - from).abs() < f64::EPSILON {
        return None;
    }
    performance.effective_fps = to;
    Some(RateChange { from, to })
}

/// Records `error` as the current unresolved error.
pub fn log_error(context: &mut SchedulerContext, error: &ReportedError) {
    let state = &mut context.error;
    state.has_error = true;
    state.error_type = Some(error.kind);
    state.error_message = Some(error.message.clone());
    state.error_count += 1;
    state.last_error_time = Some(error.timestamp_ms);
}

/// Counts a transient error without marking the scheduler as failed.
pub fn note_transient_error(context: &mut SchedulerContext, error: &ReportedError) {
    context.error.error_count += 1;
    context.error.last_error_time = Some(error.timestamp_ms);
}

/// Begins a recovery sequence, spending one attempt.
pub fn start_recovery(context: &mut SchedulerContext, now_ms: f64) {
    context.error.recovery_attempts += 1;
    let recovery = &mut context.recovery;
    recovery.is_recovering = true;
    recovery.recovery_start_time = Some(now_ms);
    recovery.recovery_progress = 0.0;
    recovery.backup_performance = Some(context.performance.clone());
}

/// Raises the recovery progress; lower values are ignored.
pub fn update_recovery_progress(context: &mut SchedulerContext, progress: f64) {
    if !progress.is_finite() {
        return;
    }
    let recovery = &mut context.recovery;
    recovery.recovery_progress = recovery.recovery_progress.max(progress.clamp(0.0, 1.0));
}

/// Closes a successful recovery sequence.
///
/// The attempt count is kept so that repeated failures across successful
/// recoveries still exhaust the budget.
pub fn complete_recovery(context: &mut SchedulerContext, report: RecoveryReport, now_ms: f64) {
    let recovery = &mut context.recovery;
    recovery.is_recovering = false;
    recovery.recovery_progress = 1.0;
    recovery.last_report = Some(report);
    context.error.resolve();
    context.timing.last_frame_time = now_ms;
}

/// Closes a failed recovery sequence and records why it failed.
pub fn fail_recovery(context: &mut SchedulerContext, error: &ReportedError) {
    context.recovery.is_recovering = false;
    log_error(context, error);
}

/// Records the loss of the graphics context.
pub fn handle_context_lost(context: &mut SchedulerContext, now_ms: f64) {
    log_error(
        context,
        &ReportedError::new(ErrorKind::ContextLoss, "graphics context lost", now_ms),
    );
}

/// Clears a context-loss error once the context is back.
pub fn handle_context_restored(
    context: &mut SchedulerContext,
    report: Option<&ContextRestoreReport>,
    now_ms: f64,
) {
    if context.error.error_type == Some(ErrorKind::ContextLoss) {
        context.error.resolve();
    }
    if let Some(report) = report {
        log::info!(
            "Graphics context restored after {} probe(s) in {:.0}ms",
            report.polls,
            report.elapsed_ms
        );
    }
    context.timing.last_frame_time = now_ms;
}

/// Clears performance figures, errors and the recovery attempt count.
///
/// The recovery bookkeeping is left alone while a sequence is in flight.
pub fn reset_performance_metrics(context: &mut SchedulerContext) {
    let effective_fps = context.performance.effective_fps;
    context.performance = PerformanceState::new(&context.config);
    context.performance.effective_fps = effective_fps;
    context.error = ErrorState::new(context.error.max_recovery_attempts);
    if !context.recovery.is_recovering {
        context.recovery = RecoveryState::default();
    }
}

/// Marks the loop as paused. Errors are left untouched.
pub fn pause_loop(context: &mut SchedulerContext) {
    context.controls.is_paused = true;
}

/// Clears the pause flag and rebases the frame timestamp so the first frame
/// after a pause does not see the paused time as one huge delta.
pub fn resume_loop(context: &mut SchedulerContext, now_ms: f64) {
    context.controls.is_paused = false;
    context.timing.last_frame_time = now_ms;
}

/// Turns on single-step debugging.
pub fn enable_step_mode(context: &mut SchedulerContext) {
    context.controls.step_mode = true;
    context.controls.debug_mode = true;
}

/// Turns off single-step debugging.
pub fn disable_step_mode(context: &mut SchedulerContext) {
    context.controls.step_mode = false;
}

/// Advances one frame of exactly the target frame time, returning its delta.
pub fn step_frame(context: &mut SchedulerContext, now_ms: f64) -> f64 {
    let delta = context.config.target_frame_time_ms();
    context.controls.frame_step += 1;
    context.timing.delta_time = delta;
    context.timing.last_frame_time = now_ms;
    context.timing.current_time = now_ms;
    delta
}

/// Flips the debug flag and returns its new value.
pub fn toggle_debug_mode(context: &mut SchedulerContext) -> bool {
    context.controls.debug_mode = !context.controls.debug_mode;
    context.controls.debug_mode
}

/// Merges `patch` into the configuration.
///
/// The merged result is validated first; on error nothing changes. Returns
/// the effective frame-rate change implied by a new target, if any.
pub fn update_config(
    context: &mut SchedulerContext,
    patch: &ConfigPatch,
) -> Result<Option<RateChange>, ConfigError> {
    let merged = context.config.merged(patch);
    merged.validate()?;

    if merged.max_frame_time_history != context.config.max_frame_time_history {
        context
            .performance
            .frame_times
            .set_capacity(merged.max_frame_time_history);
    }

    let from = context.performance.effective_fps;
    let to = if merged.adaptive_frame_rate {
        from.clamp(merged.min_adaptive_fps, merged.target_fps)
    } else {
        merged.target_fps
    };
    context.config = merged;

    if (to - from).abs() < f64::EPSILON {
        return Ok(None);
    }
    context.performance.effective_fps = to;
    Ok(Some(RateChange { from, to }))
}

/// Enables or disables one system.
pub fn set_system_enabled(context: &mut SchedulerContext, system: SystemKind, enabled: bool) {
    context.systems.set_enabled(system, enabled);
}
