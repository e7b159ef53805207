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


//! The composition root: one host, one frame loop.

use crate::config::{HostConfig, LoopBackend};
use crate::handle::SchedulerHandle;
#[cfg(feature = "legacy-loop")]
use crate::legacy::LegacyFrameLoop;
use crate::runtime::{RuntimeParts, SchedulerRuntime};
use anyhow::Result;
use cadence_control::{SchedulerEvent, SchedulerSnapshot};
use serde::Serialize;
#[cfg(feature = "legacy-loop")]
use std::sync::{Arc, Mutex};
#[cfg(feature = "legacy-loop")]
use tokio::task::JoinHandle;

/// Backend-independent summary of the frame loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopStatus {
    /// Which loop produced the status.
    pub backend: LoopBackend,
    /// Name of the current state.
    pub state: String,
    /// Last measured frames per second.
    pub fps: f64,
    /// Frames processed since the last reset.
    pub frame_count: u64,
    /// Whether an error is currently recorded.
    pub has_error: bool,
}

impl LoopStatus {
    fn from_snapshot(snapshot: &SchedulerSnapshot) -> Self {
        let context = &snapshot.context;
        Self {
            backend: LoopBackend::StateMachine,
            state: snapshot.state.name().to_string(),
            fps: context.performance.fps,
            frame_count: context.performance.frame_count,
            has_error: context.error.has_error,
        }
    }
}

enum Backend {
    StateMachine(SchedulerHandle),
    #[cfg(feature = "legacy-loop")]
    Legacy {
        inner: Arc<Mutex<LegacyFrameLoop>>,
        driver: Option<JoinHandle<()>>,
    },
}

/// Owns exactly one frame loop and exposes the same surface for either backend.
pub struct FrameLoopHost {
    backend: Backend,
}

impl FrameLoopHost {
    /// Builds and starts the loop selected by `config.backend`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(config: HostConfig, parts: RuntimeParts) -> Result<Self> {
        config.validate()?;
        match config.backend {
            LoopBackend::StateMachine => Self::start_state_machine(&config, parts),
            LoopBackend::Legacy => Self::start_legacy(&config, parts),
        }
    }

    fn start_state_machine(config: &HostConfig, parts: RuntimeParts) -> Result<Self> {
        let handle = SchedulerRuntime::new(config, parts)?.spawn();
        log::info!("Frame loop host running the state-machine scheduler");
        Ok(Self {
            backend: Backend::StateMachine(handle),
        })
    }

    #[cfg(not(feature = "legacy-loop"))]
    fn start_legacy(config: &HostConfig, parts: RuntimeParts) -> Result<Self> {
        log::warn!(
            "Legacy frame loop requested but the 'legacy-loop' feature is disabled; \
             falling back to the state-machine scheduler"
        );
        Self::start_state_machine(config, parts)
    }

    #[cfg(feature = "legacy-loop")]
    fn start_legacy(config: &HostConfig, parts: RuntimeParts) -> Result<Self> {
        let inner = Arc::new(Mutex::new(LegacyFrameLoop::new(&config.scheduler, parts)));
        let driver = config
            .drive_frames
            .then(|| LegacyFrameLoop::spawn_driver(inner.clone(), config.scheduler.config.target_fps));
        log::info!("Frame loop host running the legacy frame loop");
        Ok(Self {
            backend: Backend::Legacy { inner, driver },
        })
    }

    /// The backend actually running.
    pub fn backend(&self) -> LoopBackend {
        match &self.backend {
            Backend::StateMachine(_) => LoopBackend::StateMachine,
            #[cfg(feature = "legacy-loop")]
            Backend::Legacy { .. } => LoopBackend::Legacy,
        }
    }

    /// The scheduler handle, when the state machine is running.
    pub fn scheduler(&self) -> Option<&SchedulerHandle> {
        match &self.backend {
            Backend::StateMachine(handle) => Some(handle),
            #[cfg(feature = "legacy-loop")]
            Backend::Legacy { .. } => None,
        }
    }

    /// Forwards an event to the loop. Returns `false` if it could not be delivered.
    pub fn send(&self, event: SchedulerEvent) -> bool {
        match &self.backend {
            Backend::StateMachine(handle) => handle.send(event),
            #[cfg(feature = "legacy-loop")]
            Backend::Legacy { inner, .. } => {
                LegacyFrameLoop::lock(inner).handle(event);
                true
            }
        }
    }

    /// A summary of the loop.
    pub fn status(&self) -> LoopStatus {
        match &self.backend {
            Backend::StateMachine(handle) => LoopStatus::from_snapshot(&handle.snapshot()),
            #[cfg(feature = "legacy-loop")]
            Backend::Legacy { inner, .. } => LegacyFrameLoop::lock(inner).status(),
        }
    }

    /// Stops the loop and releases its tasks.
    pub async fn shutdown(self) -> Result<()> {
        match self.backend {
            Backend::StateMachine(handle) => handle.shutdown().await,
            #[cfg(feature = "legacy-loop")]
            Backend::Legacy { inner, driver } => {
                if let Some(driver) = driver {
                    driver.abort();
                }
                LegacyFrameLoop::lock(&inner).handle(SchedulerEvent::StopLoop);
                Ok(())
            }
        }
    }
}
