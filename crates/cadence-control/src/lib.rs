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


//! # Cadence Control
//!
//! The render-loop frame scheduler. [`FrameScheduler`] is a sans-IO state
//! machine: it owns the [`SchedulerContext`], consumes [`SchedulerEvent`]s one
//! at a time to completion and reports everything it wants done outside of
//! itself (driving the frame clock, invoking coordinators, telemetry) as
//! [`Effect`]s. It never sleeps, spawns or blocks; time only moves when its
//! [`Clock`](cadence_core::Clock) says so.
//!
//! ```text
//!                 START_LOOP                 PAUSE_LOOP
//!        idle ──────────────▶ running ◀──────────────▶ paused
//!         ▲                  │  │  │   RESUME_LOOP
//!         │ STOP_LOOP        │  │  └─ ENABLE_STEP_MODE ─▶ debugging
//!         │                  │  └──── WEBGL_CONTEXT_LOST ─▶ contextLost
//!         │                  └─ stall / recoverable error ─▶ recovering
//!         └──────────── error ◀── critical error / exhausted retries
//! ```

#![warn(missing_docs)]

pub mod actions;
pub mod config;
pub mod context;
pub mod effects;
pub mod error;
pub mod events;
pub mod guards;
pub mod history;
pub mod invocation;
pub mod machine;
pub mod sampler;
pub mod state;
pub mod systems;
pub mod timers;

pub use config::{ConfigError, ConfigPatch, SchedulerConfig, SchedulerOptions, SchedulerTimeouts};
pub use context::SchedulerContext;
pub use effects::{DriverCommand, Effect};
pub use error::{ErrorClass, ErrorKind, ReportedError};
pub use events::{FrameTick, SchedulerEvent};
pub use invocation::{ContextRestoreReport, InvocationId, RecoveryReport, RecoveryStep};
pub use machine::{FrameScheduler, SchedulerSnapshot};
pub use sampler::PerformanceMetrics;
pub use state::{ActiveRegions, StateId, StateValue};
