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


//! The async runtime hosting one [`FrameScheduler`].

use crate::config::HostConfig;
use crate::driver::FrameDriver;
use crate::handle::SchedulerHandle;
use anyhow::{Context, Result};
use cadence_control::{Effect, FrameScheduler, InvocationId, SchedulerEvent, SchedulerSnapshot};
use cadence_core::event::EventBus;
use cadence_core::graphics::{ProbeError, ResourceProbe, ResourceStatus};
use cadence_core::telemetry::TelemetrySink;
use cadence_core::{Clock, SystemClock, SystemKind, SystemUpdater};
use cadence_services::{ContextLossCoordinator, NoopRecoveryHooks, RecoveryCoordinator, RecoveryHooks};
use cadence_telemetry::{LogSink, TelemetryService};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// The pluggable pieces of a runtime.
pub struct RuntimeParts {
    /// Time source shared by the scheduler and the frame driver.
    pub clock: Arc<dyn Clock>,
    /// Per-frame system updaters.
    pub systems: Vec<(SystemKind, Box<dyn SystemUpdater>)>,
    /// Answers whether graphics resources are available after a context loss.
    pub probe: Arc<dyn ResourceProbe>,
    /// Work performed at each recovery step.
    pub recovery_hooks: Arc<dyn RecoveryHooks>,
    /// Telemetry destinations.
    pub sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl RuntimeParts {
    /// Adds a system updater.
    pub fn with_system(mut self, kind: SystemKind, updater: impl SystemUpdater + 'static) -> Self {
        self.systems.push((kind, Box::new(updater)));
        self
    }

    /// Adds a telemetry sink.
    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Replaces the resource probe.
    pub fn with_probe(mut self, probe: Arc<dyn ResourceProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replaces the recovery hooks.
    pub fn with_recovery_hooks(mut self, hooks: Arc<dyn RecoveryHooks>) -> Self {
        self.recovery_hooks = hooks;
        self
    }
}

impl Default for RuntimeParts {
    /// A system clock, no systems, a probe that always reports the resources
    /// present, no-op recovery hooks and a debug-level log sink.
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock::new()),
            systems: Vec::new(),
            probe: Arc::new(|| -> Result<ResourceStatus, ProbeError> { Ok(ResourceStatus::READY) }),
            recovery_hooks: Arc::new(NoopRecoveryHooks),
            sinks: vec![Arc::new(LogSink::new(log::Level::Debug))],
        }
    }
}

/// Owns the scheduler and everything that turns its effects into actions.
pub struct SchedulerRuntime {
    scheduler: FrameScheduler,
    clock: Arc<dyn Clock>,
    bus: EventBus<SchedulerEvent>,
    telemetry: Arc<TelemetryService>,
    recovery: RecoveryCoordinator,
    context_loss: ContextLossCoordinator,
    invocations: HashMap<InvocationId, JoinHandle<()>>,
    driver: FrameDriver,
    drive_frames: bool,
    shared: Arc<RwLock<SchedulerSnapshot>>,
}

impl SchedulerRuntime {
    /// Builds the scheduler and its collaborators.
    pub fn new(config: &HostConfig, parts: RuntimeParts) -> Result<Self> {
        config.validate()?;
        let mut scheduler = FrameScheduler::new(config.scheduler.clone(), parts.clock.clone())
            .context("Failed to build the frame scheduler")?;
        for (kind, updater) in parts.systems {
            scheduler.register_boxed_system(kind, updater);
        }

        let mut telemetry = TelemetryService::new();
        for sink in parts.sinks {
            telemetry.register(sink);
        }

        let bus = if config.event_buffer_size == 0 {
            EventBus::new()
        } else {
            EventBus::bounded(config.event_buffer_size)
        };

        let shared = Arc::new(RwLock::new(scheduler.snapshot()));
        Ok(Self {
            scheduler,
            clock: parts.clock,
            bus,
            telemetry: Arc::new(telemetry),
            recovery: RecoveryCoordinator::new(config.recovery_step_delay(), parts.recovery_hooks),
            context_loss: ContextLossCoordinator::new(config.context_poll_interval(), parts.probe),
            invocations: HashMap::new(),
            driver: FrameDriver::new(),
            drive_frames: config.drive_frames,
            shared,
        })
    }

    /// Moves the runtime onto a tokio task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let events = self.bus.sender();
        let snapshot = self.shared.clone();
        let telemetry = self.telemetry.clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle::new(events, snapshot, telemetry, shutdown_tx, task)
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        log::info!("Scheduler runtime started");
        // Telemetry produced while building the scheduler.
        self.dispatch_effects();

        loop {
            let timer = self
                .scheduler
                .next_deadline()
                .map(|deadline| (deadline - self.clock.now_ms()).max(0.0));
            let ticking = self.driver.is_ticking();

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                received = self.bus.receiver().recv_async() => match received {
                    Ok(event) => self.scheduler.send(event),
                    Err(_) => break,
                },
                _ = tokio::time::sleep(Duration::from_secs_f64(timer.unwrap_or(0.0) / 1000.0)), if timer.is_some() => {
                    self.scheduler.poll_timers();
                }
                tick = self.driver.next_tick(self.clock.as_ref()), if ticking => {
                    self.scheduler.send(SchedulerEvent::FrameTick(tick));
                }
            }

            self.dispatch_effects();
            self.publish();
        }

        self.scheduler.send(SchedulerEvent::StopLoop);
        self.dispatch_effects();
        for (_, task) in self.invocations.drain() {
            task.abort();
        }
        self.publish();
        log::info!("Scheduler runtime stopped");
    }

    fn dispatch_effects(&mut self) {
        for effect in self.scheduler.drain_effects() {
            match effect {
                Effect::FrameDriver(command) => {
                    if self.drive_frames {
                        self.driver.apply(command);
                    }
                }
                Effect::InvokeRecovery {
                    invocation,
                    snapshot,
                } => {
                    let task = self.recovery.spawn(invocation, *snapshot, self.bus.sender());
                    self.invocations.insert(invocation, task);
                }
                Effect::InvokeContextProbe { invocation } => {
                    let task = self.context_loss.spawn(invocation, self.bus.sender());
                    self.invocations.insert(invocation, task);
                }
                Effect::CancelInvocation(invocation) => {
                    if let Some(task) = self.invocations.remove(&invocation) {
                        task.abort();
                    }
                }
                Effect::Telemetry(payload) => self.telemetry.dispatch(&payload),
            }
        }
        self.invocations.retain(|_, task| !task.is_finished());
    }

    fn publish(&self) {
        match self.shared.write() {
            Ok(mut guard) => *guard = self.scheduler.snapshot(),
            Err(_) => log::error!("Scheduler snapshot lock poisoned; snapshot not updated"),
        }
    }
}
