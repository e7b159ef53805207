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


//! # Cadence Services
//!
//! Long-running work the scheduler invokes but never awaits itself: the
//! recovery sequence and the graphics-context probe. Each coordinator is an
//! `async` task that reports back exclusively through scheduler events tagged
//! with the invocation id it was started with.

#![warn(missing_docs)]

pub mod context_loss;
pub mod recovery;

pub use context_loss::ContextLossCoordinator;
pub use recovery::{NoopRecoveryHooks, RecoveryCoordinator, RecoveryError, RecoveryHooks};
