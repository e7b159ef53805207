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


//! The frame scheduler state machine.

use crate::actions::{self, RateChange};
use crate::config::{ConfigError, SchedulerOptions, SchedulerTimeouts};
use crate::context::SchedulerContext;
use crate::effects::{DriverCommand, Effect};
use crate::error::{ErrorClass, ErrorKind, ReportedError};
use crate::events::{FrameTick, SchedulerEvent};
use crate::guards;
use crate::invocation::{InvocationId, InvocationKind};
use crate::sampler::PerformanceSampler;
use crate::state::{ActiveRegions, StateId, StateValue};
use crate::systems::SystemRegistry;
use crate::timers::{TimerHandle, TimerKind, TimerTable};
use cadence_core::telemetry::{TelemetryKind, TelemetryPayload};
use cadence_core::{Clock, SystemKind, SystemUpdater};
use serde::Serialize;
use serde_json::json;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// A serializable picture of the scheduler at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerSnapshot {
    /// The top-level state.
    pub state: StateId,
    /// Every active leaf path.
    pub paths: Vec<String>,
    /// The full context.
    pub context: SchedulerContext,
}

impl SchedulerSnapshot {
    /// Returns `true` if `path` names an active state or region.
    pub fn matches(&self, path: &str) -> bool {
        self.paths.iter().any(|leaf| {
            leaf == path
                || leaf
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// Work queued while an event is being processed.
#[derive(Debug)]
enum Pending {
    Event(SchedulerEvent),
    FrameStalled(FrameTick),
    Timer(TimerHandle),
}

/// The render-loop scheduler.
///
/// Events are processed one at a time to completion: anything raised while
/// handling an event (performance windows, system failures, stalls) is queued
/// and handled before [`send`](Self::send) returns. Side effects accumulate in
/// an internal queue until [`drain_effects`](Self::drain_effects) is called.
pub struct FrameScheduler {
    state: StateValue,
    context: SchedulerContext,
    timeouts: SchedulerTimeouts,
    telemetry_frame_stride: u64,
    clock: Arc<dyn Clock>,
    timers: TimerTable,
    sampler: PerformanceSampler,
    systems: SystemRegistry,
    pending: VecDeque<Pending>,
    effects: Vec<Effect>,
    next_invocation: u64,
    active_invocation: Option<(InvocationId, InvocationKind)>,
    in_transition: bool,
    ticks_processed: u64,
}

impl FrameScheduler {
    /// Builds a scheduler in `idle`.
    ///
    /// Fails if the options are out of bounds.
    pub fn new(options: SchedulerOptions, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        options.validate()?;
        let mut scheduler = Self {
            state: StateValue::IDLE,
            context: SchedulerContext::new(&options),
            timeouts: options.timeouts,
            telemetry_frame_stride: options.telemetry_frame_stride,
            clock,
            timers: TimerTable::new(),
            sampler: PerformanceSampler::new(),
            systems: SystemRegistry::new(),
            pending: VecDeque::new(),
            effects: Vec::new(),
            next_invocation: 0,
            active_invocation: None,
            in_transition: false,
            ticks_processed: 0,
        };
        scheduler.emit_state_entered();
        log::info!(
            "Frame scheduler ready (target {} fps, {} recovery attempt(s))",
            scheduler.context.config.target_fps,
            scheduler.context.error.max_recovery_attempts
        );
        Ok(scheduler)
    }

    /// Registers the updater driven for `kind` on every accepted frame.
    pub fn register_system(&mut self, kind: SystemKind, updater: impl SystemUpdater + 'static) {
        self.register_boxed_system(kind, Box::new(updater));
    }

    /// Registers an already boxed updater for `kind`.
    pub fn register_boxed_system(&mut self, kind: SystemKind, updater: Box<dyn SystemUpdater>) {
        if self.systems.register(kind, updater).is_some() {
            log::warn!("Replaced the updater of system '{kind}'");
        }
    }

    /// Processes `event` and everything it raises.
    pub fn send(&mut self, event: SchedulerEvent) {
        self.pending.push_back(Pending::Event(event));
        self.run_to_completion();
    }

    /// Fires every timer due at the current clock reading, returning how many fired.
    pub fn poll_timers(&mut self) -> usize {
        let now = self.now();
        let mut fired = 0;
        while let Some(handle) = self.timers.pop_due(now) {
            self.pending.push_back(Pending::Timer(handle));
            self.run_to_completion();
            fired += 1;
        }
        fired
    }

    /// The earliest pending timer deadline, in clock milliseconds.
    pub fn next_deadline(&self) -> Option<f64> {
        self.timers.next_deadline()
    }

    /// Takes every queued effect, oldest first.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// The current state value.
    pub fn state(&self) -> StateValue {
        self.state
    }

    /// The current context.
    pub fn context(&self) -> &SchedulerContext {
        &self.context
    }

    /// Returns `true` if `path` names an active state or region.
    pub fn matches(&self, path: &str) -> bool {
        self.state.matches(path)
    }

    /// The invocation whose results are currently accepted.
    pub fn active_invocation(&self) -> Option<InvocationId> {
        self.active_invocation.map(|(id, _)| id)
    }

    /// A serializable copy of the state and context.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            state: self.state.id(),
            paths: self.state.paths(),
            context: self.context.clone(),
        }
    }

    fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    fn run_to_completion(&mut self) {
        while let Some(work) = self.pending.pop_front() {
            match work {
                Pending::Event(event) => self.process(event),
                Pending::FrameStalled(tick) => self.on_frame_stalled(tick),
                Pending::Timer(handle) => self.on_timer(handle),
            }
        }
    }

    fn process(&mut self, event: SchedulerEvent) {
        let state = self.state.id();
        if event.is_high_frequency() {
            log::trace!("{} in {}", event.name(), self.state);
        } else {
            log::debug!("{} in {}", event.name(), self.state);
        }

        match (state, event) {
            // Handled the same way in every state.
            (_, SchedulerEvent::UpdateConfig(patch)) => {
                match actions::update_config(&mut self.context, &patch) {
                    Ok(change) => {
                        log::info!("Scheduler configuration updated: {patch:?}");
                        if let Some(change) = change {
                            self.apply_rate_change(change, "config");
                        }
                    }
                    Err(e) => log::warn!("Rejected configuration update: {e}"),
                }
            }
            (_, SchedulerEvent::ToggleDebugMode) => {
                let enabled = actions::toggle_debug_mode(&mut self.context);
                log::info!("Debug mode {}", if enabled { "on" } else { "off" });
            }
            (_, SchedulerEvent::SetSystemEnabled { system, enabled }) => {
                actions::set_system_enabled(&mut self.context, system, enabled);
                log::info!(
                    "System '{system}' {}",
                    if enabled { "enabled" } else { "disabled" }
                );
            }
            (StateId::Error, SchedulerEvent::ResetPerformanceMetrics) => {
                self.reset_metrics();
                self.transition(StateId::Idle);
            }
            (_, SchedulerEvent::ResetPerformanceMetrics) => self.reset_metrics(),

            (StateId::Idle, SchedulerEvent::StartLoop) => {
                if guards::can_start_loop(&self.context) {
                    self.transition(StateId::Running);
                } else {
                    log::warn!(
                        "Refusing to start: unresolved {} error ({})",
                        self.context.error.error_type.map_or("unknown", ErrorKind::name),
                        self.context.error.error_message.as_deref().unwrap_or("")
                    );
                }
            }

            (
                StateId::Running
                | StateId::Paused
                | StateId::Debugging
                | StateId::Recovering
                | StateId::ContextLost,
                SchedulerEvent::StopLoop,
            ) => self.transition(StateId::Idle),

            (StateId::Running, SchedulerEvent::FrameTick(tick)) => self.on_frame_tick(tick),
            (StateId::Running, SchedulerEvent::PerformanceUpdate(metrics)) => {
                if self.state.in_region(ActiveRegions::PERFORMANCE_MONITORING) {
                    actions::update_performance_metrics(&mut self.context, &metrics);
                }
            }
            (StateId::Running, SchedulerEvent::PauseLoop) => {
                actions::pause_loop(&mut self.context);
                self.transition(StateId::Paused);
            }
            (StateId::Running, SchedulerEvent::EnableStepMode) => {
                actions::enable_step_mode(&mut self.context);
                self.transition(StateId::Debugging);
            }
            (StateId::Running, SchedulerEvent::ContextLost) => {
                self.transition(StateId::ContextLost);
            }
            (StateId::Running, SchedulerEvent::ErrorOccurred(error)) => {
                self.on_running_error(error);
            }

            (StateId::Paused, SchedulerEvent::ResumeLoop) => {
                let now = self.now();
                actions::resume_loop(&mut self.context, now);
                self.transition(StateId::Running);
            }

            (StateId::Debugging, SchedulerEvent::StepFrame) => {
                if guards::can_step_frame(&self.context, self.in_transition) {
                    let now = self.now();
                    let delta = actions::step_frame(&mut self.context, now);
                    self.run_systems(delta, now);
                }
            }
            (StateId::Debugging, SchedulerEvent::DisableStepMode) => {
                let now = self.now();
                actions::disable_step_mode(&mut self.context);
                actions::resume_loop(&mut self.context, now);
                self.transition(StateId::Running);
            }

            (StateId::Recovering, SchedulerEvent::RecoveryProgress { invocation, progress }) => {
                if self.is_active(invocation, InvocationKind::Recovery) {
                    actions::update_recovery_progress(&mut self.context, progress);
                } else {
                    log::trace!("Dropping progress of stale invocation {invocation}");
                }
            }
            (StateId::Recovering, SchedulerEvent::RecoveryResolved { invocation, outcome }) => {
                if !self.is_active(invocation, InvocationKind::Recovery) {
                    log::debug!("Dropping result of stale recovery {invocation}");
                    return;
                }
                self.active_invocation = None;
                let now = self.now();
                match outcome {
                    Ok(report) => {
                        log::info!(
                            "Recovery {invocation} succeeded in {:.0}ms ({} step(s))",
                            report.elapsed_ms,
                            report.completed_steps.len()
                        );
                        self.emit(
                            TelemetryKind::Recovery,
                            json!({ "outcome": "success", "elapsed_ms": report.elapsed_ms }),
                        );
                        actions::complete_recovery(&mut self.context, report, now);
                        self.transition(StateId::Running);
                    }
                    Err(reason) => self.on_recovery_failed(reason, now),
                }
            }

            (StateId::ContextLost, SchedulerEvent::ContextRestored) => {
                let now = self.now();
                actions::handle_context_restored(&mut self.context, None, now);
                self.transition(StateId::Running);
            }
            (StateId::ContextLost, SchedulerEvent::ContextProbeResolved { invocation, outcome }) => {
                if !self.is_active(invocation, InvocationKind::ContextProbe) {
                    log::debug!("Dropping result of stale context probe {invocation}");
                    return;
                }
                self.active_invocation = None;
                let now = self.now();
                match outcome {
                    Ok(report) => {
                        actions::handle_context_restored(&mut self.context, Some(&report), now);
                        self.transition(StateId::Running);
                    }
                    Err(reason) => {
                        let error = ReportedError::new(
                            ErrorKind::DeviceLost,
                            format!("graphics context could not be restored: {reason}"),
                            now,
                        );
                        self.record_error(&error);
                        self.transition(StateId::Error);
                    }
                }
            }

            (StateId::Error, SchedulerEvent::StartLoop) => {
                if guards::can_recover(&self.context) {
                    self.transition(StateId::Recovering);
                } else {
                    log::warn!("Recovery budget exhausted; resetting to idle");
                    self.reset_metrics();
                    self.transition(StateId::Idle);
                }
            }

            (_, SchedulerEvent::ErrorOccurred(error)) => {
                log::warn!("Error reported in {}: {error}", self.state);
                if error.class() == ErrorClass::Transient {
                    actions::note_transient_error(&mut self.context, &error);
                } else {
                    self.record_error(&error);
                }
            }

            (_, event) => {
                log::trace!("{} ignored in {}", event.name(), self.state);
            }
        }
    }

    fn on_frame_tick(&mut self, tick: FrameTick) {
        let now = self.now();
        if self.state.in_region(ActiveRegions::TIMING) {
            actions::update_delta_time(&mut self.context, &tick, now);
            self.ticks_processed += 1;
            if self.telemetry_frame_stride > 0
                && self.ticks_processed % self.telemetry_frame_stride == 0
            {
                self.emit(
                    TelemetryKind::FrameTick,
                    json!({
                        "delta_ms": tick.delta_ms,
                        "fps": self.context.performance.fps,
                        "effective_fps": self.context.performance.effective_fps,
                    }),
                );
            }
        }

        if !self.state.in_region(ActiveRegions::SYSTEM_UPDATES) {
            return;
        }
        if !guards::is_frame_time_acceptable(&self.context, &tick) {
            self.pending.push_back(Pending::FrameStalled(tick));
            return;
        }
        self.run_systems(tick.delta_ms, now);

        if self.state.in_region(ActiveRegions::PERFORMANCE_MONITORING) {
            self.sampler.record(tick.delta_ms);
            let config = &self.context.config;
            if let Some(metrics) =
                self.sampler
                    .poll(now, config.performance_update_interval_ms, config.target_fps)
            {
                self.pending
                    .push_back(Pending::Event(SchedulerEvent::PerformanceUpdate(metrics)));
            }
        }
    }

    fn on_frame_stalled(&mut self, tick: FrameTick) {
        if self.state.id() != StateId::Running {
            return;
        }
        let error = ReportedError::new(
            ErrorKind::FrameStall,
            format!(
                "frame took {:.1}ms (limit {:.1}ms)",
                tick.delta_ms, self.context.config.max_frame_time_ms
            ),
            self.now(),
        );
        log::warn!("Frame stall detected: {}", error.message);
        self.record_error(&error);
        self.transition(StateId::Recovering);
    }

    fn on_running_error(&mut self, error: ReportedError) {
        if guards::is_critical_error(&error) {
            log::error!("Critical error: {error}");
            self.record_error(&error);
            self.transition(StateId::Error);
        } else if guards::is_recoverable_error(&error) {
            log::warn!("Recoverable error: {error}");
            self.record_error(&error);
            self.transition(StateId::Recovering);
        } else if guards::is_context_loss_error(&error) {
            log::warn!("Context loss reported: {error}");
            self.transition(StateId::ContextLost);
        } else {
            log::warn!("Transient error: {error}");
            actions::note_transient_error(&mut self.context, &error);
        }
    }

    fn on_recovery_failed(&mut self, reason: String, now: f64) {
        let error = ReportedError::new(ErrorKind::RecoveryFailed, reason, now);
        self.emit(
            TelemetryKind::Recovery,
            json!({
                "outcome": "failure",
                "reason": error.message,
                "attempt": self.context.error.recovery_attempts,
            }),
        );
        if guards::has_reached_max_recovery_attempts(&self.context) {
            log::error!(
                "Recovery failed after {} attempt(s): {}",
                self.context.error.recovery_attempts,
                error.message
            );
            actions::fail_recovery(&mut self.context, &error);
            self.emit_error(&error);
            self.transition(StateId::Error);
        } else {
            log::warn!("Recovery attempt failed, retrying: {}", error.message);
            self.record_error(&error);
            self.transition(StateId::Recovering);
        }
    }

    fn on_timer(&mut self, handle: TimerHandle) {
        if handle.owner != self.state.id() || !self.timers.is_current(handle) {
            log::trace!("Ignoring stale {:?} timer #{}", handle.kind, handle.generation);
            return;
        }
        let now = self.now();
        match handle.kind {
            TimerKind::AdaptationCheck => {
                if guards::should_adapt_frame_rate(&self.context) {
                    if let Some(change) = actions::update_adaptive_frame_rate(&mut self.context) {
                        self.apply_rate_change(change, "adaptive");
                    }
                }
                self.timers.arm(
                    TimerKind::AdaptationCheck,
                    StateId::Running,
                    now,
                    self.timeouts.adaptation_check_ms,
                );
            }
            TimerKind::RecoveryTimeout => {
                let error = ReportedError::new(
                    ErrorKind::Timeout,
                    format!(
                        "recovery did not finish within {:.0}ms",
                        self.timeouts.recovery_timeout_ms
                    ),
                    now,
                );
                log::error!("{}", error.message);
                actions::fail_recovery(&mut self.context, &error);
                self.emit_error(&error);
                self.transition(StateId::Error);
            }
            TimerKind::ContextLossTimeout => {
                let error = ReportedError::new(
                    ErrorKind::Timeout,
                    format!(
                        "graphics context not restored within {:.0}ms",
                        self.timeouts.context_loss_timeout_ms
                    ),
                    now,
                );
                log::error!("{}", error.message);
                self.record_error(&error);
                self.transition(StateId::Error);
            }
            TimerKind::ErrorRetry => {
                if guards::can_recover(&self.context) {
                    log::info!("Retrying recovery from error state");
                    self.transition(StateId::Recovering);
                } else {
                    log::debug!("Recovery budget exhausted; staying in error");
                }
            }
        }
    }

    fn run_systems(&mut self, delta_ms: f64, now: f64) {
        let pass = self.systems.run(self.context.systems, delta_ms);
        self.context.performance.last_update_duration_ms = pass.duration_ms;
        for failure in pass.failures {
            let error = ReportedError::new(ErrorKind::SystemUpdate, failure.to_string(), now);
            self.pending
                .push_back(Pending::Event(SchedulerEvent::ErrorOccurred(error)));
        }
    }

    fn reset_metrics(&mut self) {
        let now = self.now();
        actions::reset_performance_metrics(&mut self.context);
        self.sampler.reset(now);
        log::info!("Performance metrics reset");
    }

    fn record_error(&mut self, error: &ReportedError) {
        actions::log_error(&mut self.context, error);
        self.emit_error(error);
    }

    fn emit_error(&mut self, error: &ReportedError) {
        self.emit(
            TelemetryKind::Error,
            json!({
                "kind": error.kind,
                "message": error.message,
                "error_count": self.context.error.error_count,
            }),
        );
    }

    fn apply_rate_change(&mut self, change: RateChange, reason: &str) {
        log::info!(
            "Effective frame rate {:.0} -> {:.0} fps ({reason})",
            change.from,
            change.to
        );
        self.emit(
            TelemetryKind::AdaptiveRate,
            json!({ "from": change.from, "to": change.to, "reason": reason }),
        );
        if self.state.id() == StateId::Running {
            self.effects
                .push(Effect::FrameDriver(DriverCommand::SetRate { fps: change.to }));
        }
    }

    fn is_active(&self, invocation: InvocationId, kind: InvocationKind) -> bool {
        self.active_invocation == Some((invocation, kind))
    }

    fn begin_invocation(&mut self, kind: InvocationKind) -> InvocationId {
        self.next_invocation += 1;
        let id = InvocationId(self.next_invocation);
        self.active_invocation = Some((id, kind));
        id
    }

    fn cancel_invocation(&mut self) {
        if let Some((id, kind)) = self.active_invocation.take() {
            log::debug!("Cancelling {kind:?} invocation {id}");
            self.effects.push(Effect::CancelInvocation(id));
        }
    }

    fn transition(&mut self, target: StateId) {
        let source = self.state.id();
        self.in_transition = true;
        self.exit(source, target);
        self.state = StateValue::new(target);
        log::info!("Scheduler: {source} -> {}", self.state);
        self.enter(source, target);
        self.in_transition = false;
    }

    fn exit(&mut self, source: StateId, target: StateId) {
        self.timers.cancel_owned_by(source);
        match source {
            StateId::Running => {
                self.sampler.suspend();
                if target != StateId::Idle {
                    self.effects.push(Effect::FrameDriver(DriverCommand::Pause));
                }
            }
            StateId::Recovering => {
                self.cancel_invocation();
                self.context.recovery.is_recovering = false;
            }
            StateId::ContextLost => self.cancel_invocation(),
            _ => {}
        }
    }

    fn enter(&mut self, source: StateId, target: StateId) {
        let now = self.now();
        match target {
            StateId::Idle => {
                self.timers.cancel_all();
                self.cancel_invocation();
                self.sampler.suspend();
                self.context.controls.is_paused = false;
                self.context.controls.step_mode = false;
                self.effects.push(Effect::FrameDriver(DriverCommand::Stop));
            }
            StateId::Running => {
                if source == StateId::Idle {
                    actions::initialize_clock(&mut self.context, now);
                    self.ticks_processed = 0;
                    self.effects.push(Effect::FrameDriver(DriverCommand::Start {
                        fps: self.context.performance.effective_fps,
                    }));
                } else {
                    self.effects.push(Effect::FrameDriver(DriverCommand::Resume));
                }
                self.sampler.resume(now);
                self.timers.arm(
                    TimerKind::AdaptationCheck,
                    StateId::Running,
                    now,
                    self.timeouts.adaptation_check_ms,
                );
            }
            StateId::Recovering => {
                actions::start_recovery(&mut self.context, now);
                log::info!(
                    "Recovery attempt {}/{}",
                    self.context.error.recovery_attempts,
                    self.context.error.max_recovery_attempts
                );
                let invocation = self.begin_invocation(InvocationKind::Recovery);
                self.effects.push(Effect::InvokeRecovery {
                    invocation,
                    snapshot: Box::new(self.snapshot()),
                });
                self.timers.arm(
                    TimerKind::RecoveryTimeout,
                    StateId::Recovering,
                    now,
                    self.timeouts.recovery_timeout_ms,
                );
            }
            StateId::ContextLost => {
                actions::handle_context_lost(&mut self.context, now);
                let invocation = self.begin_invocation(InvocationKind::ContextProbe);
                self.effects.push(Effect::InvokeContextProbe { invocation });
                self.timers.arm(
                    TimerKind::ContextLossTimeout,
                    StateId::ContextLost,
                    now,
                    self.timeouts.context_loss_timeout_ms,
                );
            }
            StateId::Error => {
                self.timers.arm(
                    TimerKind::ErrorRetry,
                    StateId::Error,
                    now,
                    self.timeouts.error_retry_delay_ms,
                );
            }
            StateId::Paused | StateId::Debugging => {}
        }
        self.emit_state_entered();
    }

    fn emit_state_entered(&mut self) {
        let detail = json!({
            "paths": self.state.paths(),
            "has_error": self.context.error.has_error,
            "recovery_attempts": self.context.error.recovery_attempts,
        });
        self.emit(TelemetryKind::StateEntered, detail);
    }

    fn emit(&mut self, kind: TelemetryKind, detail: serde_json::Value) {
        let payload =
            TelemetryPayload::new(kind, self.state.id().name(), self.now()).with_detail(detail);
        self.effects.push(Effect::Telemetry(payload));
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("state", &self.state)
            .field("active_invocation", &self.active_invocation)
            .field("pending_timers", &self.timers.len())
            .field("queued_effects", &self.effects.len())
            .field("systems", &self.systems)
            .finish()
    }
}
