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


//! # Cadence SDK
//!
//! The composition root of the frame scheduler. [`FrameLoopHost`] owns exactly
//! one frame loop, chosen by [`HostConfig::backend`]: the state-machine
//! [`SchedulerRuntime`] or, with the `legacy-loop` feature, the minimal
//! `LegacyFrameLoop`.
//!
//! ```no_run
//! use cadence_sdk::{FrameLoopHost, HostConfig, RuntimeParts};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let host = FrameLoopHost::start(HostConfig::default(), RuntimeParts::default())?;
//! host.send(cadence_control::SchedulerEvent::StartLoop);
//! println!("{:?}", host.status());
//! host.shutdown().await
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod driver;
pub mod handle;
pub mod host;
#[cfg(feature = "legacy-loop")]
pub mod legacy;
pub mod runtime;

pub use config::{HostConfig, LoopBackend};
pub use handle::SchedulerHandle;
pub use host::{FrameLoopHost, LoopStatus};
pub use runtime::{RuntimeParts, SchedulerRuntime};
