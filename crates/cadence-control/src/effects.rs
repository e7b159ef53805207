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


//! Commands the scheduler asks its host to carry out.

use crate::invocation::InvocationId;
use crate::machine::SchedulerSnapshot;
use cadence_core::telemetry::TelemetryPayload;

/// Instructions for whatever produces frame ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverCommand {
    /// Begin producing ticks at `fps`.
    Start {
        /// Requested frame rate.
        fps: f64,
    },
    /// Stop producing ticks for now.
    Pause,
    /// Continue after a pause.
    Resume,
    /// Stop producing ticks.
    Stop,
    /// Change the tick rate.
    SetRate {
        /// New frame rate.
        fps: f64,
    },
}

/// A side effect requested by a transition.
///
/// Effects are queued in the order they were produced and handed out by
/// [`FrameScheduler::drain_effects`](crate::FrameScheduler::drain_effects).
#[derive(Debug, Clone)]
pub enum Effect {
    /// Drive the frame clock.
    FrameDriver(DriverCommand),
    /// Run the recovery sequence and report back with `invocation`.
    InvokeRecovery {
        /// Id to tag progress and the result with.
        invocation: InvocationId,
        /// The scheduler as it was when recovery started.
        snapshot: Box<SchedulerSnapshot>,
    },
    /// Poll the graphics resources until they are back.
    InvokeContextProbe {
        /// Id to tag the result with.
        invocation: InvocationId,
    },
    /// Abandon an invocation; its results will be ignored.
    CancelInvocation(InvocationId),
    /// Forward a telemetry payload to the sinks.
    Telemetry(TelemetryPayload),
}

impl Effect {
    /// Returns the driver command, if this is one.
    pub fn as_driver_command(&self) -> Option<DriverCommand> {
        match self {
            Effect::FrameDriver(command) => Some(*command),
            _ => None,
        }
    }

    /// Returns the telemetry payload, if this is one.
    pub fn as_telemetry(&self) -> Option<&TelemetryPayload> {
        match self {
            Effect::Telemetry(payload) => Some(payload),
            _ => None,
        }
    }
}
