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


//! # Cadence Core
//!
//! Foundational crate containing the contracts shared by the frame scheduler:
//! time sources, the generic event bus, the typed set of per-frame systems,
//! the graphics-resource probe and the telemetry payload format.

#![warn(missing_docs)]

pub mod clock;
pub mod event;
pub mod graphics;
pub mod systems;
pub mod telemetry;
pub mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use systems::{SystemError, SystemFlags, SystemKind, SystemUpdater};
pub use utils::timer::Stopwatch;
