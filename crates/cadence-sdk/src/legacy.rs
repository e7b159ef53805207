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


//! The pre-state-machine frame loop, kept as a fallback backend.
//!
//! It starts, stops, pauses and runs the enabled systems on every frame.
//! There is no stall detection, recovery or adaptive pacing: errors are
//! recorded and the loop carries on.

use crate::config::LoopBackend;
use crate::host::LoopStatus;
use crate::runtime::RuntimeParts;
use cadence_control::history::FrameTimeHistory;
use cadence_control::systems::SystemRegistry;
use cadence_control::{SchedulerConfig, SchedulerEvent, SchedulerOptions};
use cadence_core::{Clock, SystemFlags};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegacyState {
    Stopped,
    Running,
    Paused,
}

impl LegacyState {
    fn name(self) -> &'static str {
        match self {
            LegacyState::Stopped => "stopped",
            LegacyState::Running => "running",
            LegacyState::Paused => "paused",
        }
    }
}

/// A flat start/stop/pause/tick loop.
pub struct LegacyFrameLoop {
    state: LegacyState,
    config: SchedulerConfig,
    systems: SystemFlags,
    registry: SystemRegistry,
    clock: Arc<dyn Clock>,
    history: FrameTimeHistory,
    frame_count: u64,
    last_error: Option<String>,
}

impl LegacyFrameLoop {
    /// Builds a stopped loop from the scheduler options and the runtime parts.
    ///
    /// Only the clock and the system updaters are used.
    pub fn new(options: &SchedulerOptions, parts: RuntimeParts) -> Self {
        let mut registry = SystemRegistry::new();
        for (kind, updater) in parts.systems {
            registry.register(kind, updater);
        }
        Self {
            state: LegacyState::Stopped,
            config: options.config.clone(),
            systems: options.systems,
            registry,
            clock: parts.clock,
            history: FrameTimeHistory::new(options.config.max_frame_time_history),
            frame_count: 0,
            last_error: None,
        }
    }

    pub(crate) fn lock(inner: &Mutex<LegacyFrameLoop>) -> MutexGuard<'_, LegacyFrameLoop> {
        inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ticks `inner` at `fps` on a tokio task until aborted.
    pub(crate) fn spawn_driver(inner: Arc<Mutex<LegacyFrameLoop>>, fps: f64) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps.max(1.0)));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last = Instant::now();
            loop {
                let at = interval.tick().await;
                let delta_ms = at.saturating_duration_since(last).as_secs_f64() * 1000.0;
                last = at;
                let mut frame_loop = Self::lock(&inner);
                if frame_loop.is_running() {
                    let now = frame_loop.clock.now_ms();
                    frame_loop.handle(SchedulerEvent::frame_tick(delta_ms, now));
                }
            }
        })
    }

    /// Returns `true` while frames are processed.
    pub fn is_running(&self) -> bool {
        self.state == LegacyState::Running
    }

    /// Applies one event. Events the loop has no notion of are ignored.
    pub fn handle(&mut self, event: SchedulerEvent) {
        match (self.state, event) {
            (LegacyState::Stopped, SchedulerEvent::StartLoop) => {
                self.frame_count = 0;
                self.history.clear();
                self.state = LegacyState::Running;
            }
            (LegacyState::Running | LegacyState::Paused, SchedulerEvent::StopLoop) => {
                self.state = LegacyState::Stopped;
            }
            (LegacyState::Running, SchedulerEvent::PauseLoop) => self.state = LegacyState::Paused,
            (LegacyState::Paused, SchedulerEvent::ResumeLoop) => self.state = LegacyState::Running,
            (LegacyState::Running, SchedulerEvent::FrameTick(tick)) => {
                self.frame_count += 1;
                self.history.push(tick.delta_ms);
                let pass = self.registry.run(self.systems, tick.delta_ms);
                if let Some(failure) = pass.failures.last() {
                    self.last_error = Some(failure.to_string());
                }
            }
            (_, SchedulerEvent::UpdateConfig(patch)) => {
                let merged = self.config.merged(&patch);
                match merged.validate() {
                    Ok(()) => {
                        self.history.set_capacity(merged.max_frame_time_history);
                        self.config = merged;
                    }
                    Err(e) => log::warn!("Legacy loop rejected configuration: {e}"),
                }
            }
            (_, SchedulerEvent::SetSystemEnabled { system, enabled }) => {
                self.systems.set_enabled(system, enabled);
            }
            (_, SchedulerEvent::ResetPerformanceMetrics) => {
                self.history.clear();
                self.frame_count = 0;
                self.last_error = None;
            }
            (_, SchedulerEvent::ErrorOccurred(error)) => {
                log::warn!("Legacy loop error: {error}");
                self.last_error = Some(error.to_string());
            }
            (state, event) => {
                log::trace!("Legacy loop ignores {} while {}", event.name(), state.name());
            }
        }
    }

    /// A summary of the loop.
    pub fn status(&self) -> LoopStatus {
        let average = self.history.average();
        LoopStatus {
            backend: LoopBackend::Legacy,
            state: self.state.name().to_string(),
            fps: if average > 0.0 { 1000.0 / average } else { 0.0 },
            frame_count: self.frame_count,
            has_error: self.last_error.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{SystemError, SystemKind};

    fn frame_loop(parts: RuntimeParts) -> LegacyFrameLoop {
        LegacyFrameLoop::new(&SchedulerOptions::default(), parts)
    }

    #[test]
    fn start_tick_pause_stop() {
        let mut frame_loop = frame_loop(RuntimeParts::default());
        frame_loop.handle(SchedulerEvent::frame_tick(20.0, 0.0));
        assert_eq!(frame_loop.status().frame_count, 0);

        frame_loop.handle(SchedulerEvent::StartLoop);
        for _ in 0..4 {
            frame_loop.handle(SchedulerEvent::frame_tick(20.0, 0.0));
        }
        let status = frame_loop.status();
        assert_eq!(status.state, "running");
        assert_eq!(status.frame_count, 4);
        assert_eq!(status.fps, 50.0);

        frame_loop.handle(SchedulerEvent::PauseLoop);
        frame_loop.handle(SchedulerEvent::frame_tick(20.0, 0.0));
        assert_eq!(frame_loop.status().frame_count, 4);

        frame_loop.handle(SchedulerEvent::StopLoop);
        assert_eq!(frame_loop.status().state, "stopped");
    }

    #[test]
    fn failures_are_recorded_without_stopping() {
        let parts = RuntimeParts::default().with_system(
            SystemKind::Physics,
            |_delta: f64| -> Result<(), SystemError> {
                Err(SystemError::new(SystemKind::Physics, "nan velocity"))
            },
        );
        let mut frame_loop = frame_loop(parts);
        frame_loop.handle(SchedulerEvent::StartLoop);
        frame_loop.handle(SchedulerEvent::frame_tick(200.0, 0.0));
        let status = frame_loop.status();
        assert!(status.has_error);
        assert_eq!(status.state, "running");

        frame_loop.handle(SchedulerEvent::ResetPerformanceMetrics);
        assert!(!frame_loop.status().has_error);
    }
}
