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


//! Client side of a running [`SchedulerRuntime`](crate::SchedulerRuntime).

use anyhow::{anyhow, Result};
use cadence_control::{
    ConfigPatch, ErrorKind, FrameTick, ReportedError, SchedulerEvent, SchedulerSnapshot,
};
use cadence_core::SystemKind;
use cadence_telemetry::TelemetryService;
use std::sync::{Arc, RwLock};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Sends commands to the scheduler task and reads its published snapshot.
#[derive(Debug)]
pub struct SchedulerHandle {
    events: flume::Sender<SchedulerEvent>,
    snapshot: Arc<RwLock<SchedulerSnapshot>>,
    telemetry: Arc<TelemetryService>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub(crate) fn new(
        events: flume::Sender<SchedulerEvent>,
        snapshot: Arc<RwLock<SchedulerSnapshot>>,
        telemetry: Arc<TelemetryService>,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            events,
            snapshot,
            telemetry,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    /// Queues an event without blocking.
    ///
    /// Returns `false` if the event was dropped, either because a bounded
    /// queue is full or because the scheduler task is gone.
    pub fn send(&self, event: SchedulerEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(flume::TrySendError::Full(event)) => {
                log::warn!("Scheduler event queue is full; dropped {}", event.name());
                false
            }
            Err(flume::TrySendError::Disconnected(event)) => {
                log::warn!("Scheduler is not running; dropped {}", event.name());
                false
            }
        }
    }

    /// Queues an event, waiting for room in a bounded queue.
    ///
    /// Returns `false` if the scheduler task is gone.
    pub async fn send_async(&self, event: SchedulerEvent) -> bool {
        match self.events.send_async(event).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Scheduler is not running; dropped {}", e.into_inner().name());
                false
            }
        }
    }

    /// Sends `START_LOOP`.
    pub fn start(&self) -> bool {
        self.send(SchedulerEvent::StartLoop)
    }

    /// Sends `STOP_LOOP`.
    pub fn stop(&self) -> bool {
        self.send(SchedulerEvent::StopLoop)
    }

    /// Sends `PAUSE_LOOP`.
    pub fn pause(&self) -> bool {
        self.send(SchedulerEvent::PauseLoop)
    }

    /// Sends `RESUME_LOOP`.
    pub fn resume(&self) -> bool {
        self.send(SchedulerEvent::ResumeLoop)
    }

    /// Sends `TOGGLE_DEBUG_MODE`.
    pub fn toggle_debug(&self) -> bool {
        self.send(SchedulerEvent::ToggleDebugMode)
    }

    /// Sends `ENABLE_STEP_MODE`.
    pub fn enable_step_mode(&self) -> bool {
        self.send(SchedulerEvent::EnableStepMode)
    }

    /// Sends `DISABLE_STEP_MODE`.
    pub fn disable_step_mode(&self) -> bool {
        self.send(SchedulerEvent::DisableStepMode)
    }

    /// Sends `STEP_FRAME`.
    pub fn step_frame(&self) -> bool {
        self.send(SchedulerEvent::StepFrame)
    }

    /// Sends `UPDATE_CONFIG`.
    pub fn update_config(&self, patch: ConfigPatch) -> bool {
        self.send(SchedulerEvent::UpdateConfig(patch))
    }

    /// Sends `RESET_PERFORMANCE_METRICS`.
    pub fn reset_metrics(&self) -> bool {
        self.send(SchedulerEvent::ResetPerformanceMetrics)
    }

    /// Reports a lost graphics context.
    pub fn context_lost(&self) -> bool {
        self.send(SchedulerEvent::ContextLost)
    }

    /// Reports a restored graphics context.
    pub fn context_restored(&self) -> bool {
        self.send(SchedulerEvent::ContextRestored)
    }

    /// Sends `ERROR_OCCURRED`, stamped with the last published frame time.
    pub fn report_error(&self, kind: ErrorKind, message: impl Into<String>) -> bool {
        let timestamp = self.snapshot().context.timing.current_time;
        self.send(SchedulerEvent::ErrorOccurred(ReportedError::new(
            kind, message, timestamp,
        )))
    }

    /// Enables or disables one system.
    pub fn set_system_enabled(&self, system: SystemKind, enabled: bool) -> bool {
        self.send(SchedulerEvent::SetSystemEnabled { system, enabled })
    }

    /// Delivers a frame from an external frame source.
    pub fn frame_tick(&self, delta_ms: f64, timestamp_ms: f64) -> bool {
        self.send(SchedulerEvent::FrameTick(FrameTick::new(delta_ms, timestamp_ms)))
    }

    /// The snapshot published after the last processed event.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The telemetry service the runtime dispatches to.
    pub fn telemetry(&self) -> &TelemetryService {
        &self.telemetry
    }

    /// Stops the loop, cancels running coordinators and waits for the task.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| anyhow!("Scheduler task failed: {e}")),
            None => Ok(()),
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
