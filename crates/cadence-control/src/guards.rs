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


//! Pure predicates over the context.
//!
//! Guards never mutate anything; transitions consult them before committing.

use crate::context::SchedulerContext;
use crate::error::{ErrorClass, ReportedError};
use crate::events::FrameTick;

/// The loop may start unless a critical error is still unresolved.
pub fn can_start_loop(context: &SchedulerContext) -> bool {
    let error = &context.error;
    !(error.has_error
        && error
            .error_type
            .is_some_and(|kind| kind.class() == ErrorClass::Critical))
}

/// Another recovery sequence is still within budget.
pub fn can_recover(context: &SchedulerContext) -> bool {
    context.error.recovery_attempts < context.error.max_recovery_attempts
}

/// The recovery budget is spent. Always the negation of [`can_recover`].
pub fn has_reached_max_recovery_attempts(context: &SchedulerContext) -> bool {
    !can_recover(context)
}

/// The frame is within the stall threshold.
pub fn is_frame_time_acceptable(context: &SchedulerContext, tick: &FrameTick) -> bool {
    tick.delta_ms.is_finite()
        && tick.delta_ms >= 0.0
        && tick.delta_ms < context.config.max_frame_time_ms
}

/// Adaptation is enabled, there is enough history, and the measured rate is
/// off the effective rate by more than the tolerance.
pub fn should_adapt_frame_rate(context: &SchedulerContext) -> bool {
    let config = &context.config;
    let performance = &context.performance;
    if !config.adaptive_frame_rate
        || performance.frame_times.len() < config.min_adaptation_samples
        || performance.average_fps <= 0.0
    {
        return false;
    }
    let effective = performance.effective_fps;
    (performance.average_fps - effective).abs() > config.fps_tolerance * effective
}

/// A single step may run: step mode is on and no transition is in flight.
pub fn can_step_frame(context: &SchedulerContext, in_transition: bool) -> bool {
    context.controls.step_mode && !in_transition
}

/// The error stops the loop.
pub fn is_critical_error(error: &ReportedError) -> bool {
    error.class() == ErrorClass::Critical
}

/// The error triggers recovery.
pub fn is_recoverable_error(error: &ReportedError) -> bool {
    error.class() == ErrorClass::Recoverable
}

/// The error is a loss of the graphics context.
pub fn is_context_loss_error(error: &ReportedError) -> bool {
    error.class() == ErrorClass::ContextLoss
}
