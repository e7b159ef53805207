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


#![allow(dead_code)]

use cadence_control::{
    DriverCommand, Effect, FrameScheduler, InvocationId, SchedulerEvent, SchedulerOptions,
};
use cadence_core::telemetry::TelemetryKind;
use cadence_core::ManualClock;
use std::sync::Arc;

/// A scheduler driven by a manual clock.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub scheduler: FrameScheduler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(SchedulerOptions::default())
    }

    pub fn with_options(options: SchedulerOptions) -> Self {
        let clock = Arc::new(ManualClock::new(0.0));
        let mut scheduler = FrameScheduler::new(options, clock.clone()).unwrap();
        scheduler.drain_effects();
        Self { clock, scheduler }
    }

    /// Starts the loop and discards the effects produced so far.
    pub fn running() -> Self {
        let mut harness = Self::new();
        harness.send(SchedulerEvent::StartLoop);
        harness.scheduler.drain_effects();
        harness
    }

    pub fn send(&mut self, event: SchedulerEvent) {
        self.scheduler.send(event);
    }

    /// Advances the clock by `delta_ms` and delivers a frame of that length.
    pub fn tick(&mut self, delta_ms: f64) {
        let now = self.clock.advance_ms(delta_ms);
        self.send(SchedulerEvent::frame_tick(delta_ms, now));
    }

    /// Advances the clock and fires due timers.
    pub fn advance(&mut self, delta_ms: f64) -> usize {
        self.clock.advance_ms(delta_ms);
        self.scheduler.poll_timers()
    }

    pub fn state_name(&self) -> &'static str {
        self.scheduler.state().id().name()
    }

    pub fn effects(&mut self) -> Vec<Effect> {
        self.scheduler.drain_effects()
    }

    /// Drains effects and returns the id of the last recovery invocation.
    pub fn recovery_invocation(&mut self) -> InvocationId {
        self.effects()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::InvokeRecovery { invocation, .. } => Some(invocation),
                _ => None,
            })
            .last()
            .expect("no recovery invocation")
    }

    /// Drains effects and returns the id of the last context probe.
    pub fn probe_invocation(&mut self) -> InvocationId {
        self.effects()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::InvokeContextProbe { invocation } => Some(invocation),
                _ => None,
            })
            .last()
            .expect("no context probe")
    }
}

pub fn driver_commands(effects: &[Effect]) -> Vec<DriverCommand> {
    effects.iter().filter_map(Effect::as_driver_command).collect()
}

pub fn telemetry_kinds(effects: &[Effect]) -> Vec<TelemetryKind> {
    effects
        .iter()
        .filter_map(Effect::as_telemetry)
        .map(|payload| payload.kind)
        .collect()
}
