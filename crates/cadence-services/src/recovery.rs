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


//! The recovery sequence.

use cadence_control::{
    InvocationId, RecoveryReport, RecoveryStep, SchedulerEvent, SchedulerSnapshot,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Why a recovery sequence failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
    /// A hook refused to complete a step.
    #[error("recovery step '{step}' failed: {reason}")]
    StepFailed {
        /// The step that failed.
        step: &'static str,
        /// Why.
        reason: String,
    },
    /// The state captured at the start of recovery is unusable.
    #[error("scheduler state is invalid: {0}")]
    InvalidState(String),
}

/// Host-provided work performed at each recovery step.
pub trait RecoveryHooks: Send + Sync {
    /// Performs `step`. `snapshot` is the scheduler as it was when recovery began.
    fn perform(&self, step: RecoveryStep, snapshot: &SchedulerSnapshot) -> Result<(), RecoveryError>;
}

/// Hooks that do nothing; the sequence then only validates the snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecoveryHooks;

impl RecoveryHooks for NoopRecoveryHooks {
    fn perform(&self, _step: RecoveryStep, _snapshot: &SchedulerSnapshot) -> Result<(), RecoveryError> {
        Ok(())
    }
}

/// Runs the four recovery steps, reporting progress after each.
#[derive(Clone)]
pub struct RecoveryCoordinator {
    step_delay: Duration,
    hooks: Arc<dyn RecoveryHooks>,
}

impl RecoveryCoordinator {
    /// Creates a coordinator that waits `step_delay` before each step.
    pub fn new(step_delay: Duration, hooks: Arc<dyn RecoveryHooks>) -> Self {
        Self { step_delay, hooks }
    }

    /// Runs the sequence on a new tokio task.
    pub fn spawn(
        &self,
        invocation: InvocationId,
        snapshot: SchedulerSnapshot,
        events: flume::Sender<SchedulerEvent>,
    ) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.run(invocation, snapshot, events).await })
    }

    /// Runs the sequence to completion and sends its result.
    ///
    /// Stops quietly if the scheduler side of `events` is gone.
    pub async fn run(
        &self,
        invocation: InvocationId,
        snapshot: SchedulerSnapshot,
        events: flume::Sender<SchedulerEvent>,
    ) {
        let started = Instant::now();
        log::debug!("Recovery {invocation} started");

        let mut completed_steps = Vec::with_capacity(RecoveryStep::ALL.len());
        for step in RecoveryStep::ALL {
            tokio::time::sleep(self.step_delay).await;
            if let Err(e) = self.perform(step, &snapshot) {
                log::warn!("Recovery {invocation} aborted: {e}");
                let _ = events
                    .send_async(SchedulerEvent::RecoveryResolved {
                        invocation,
                        outcome: Err(e.to_string()),
                    })
                    .await;
                return;
            }
            completed_steps.push(step);
            log::trace!("Recovery {invocation}: {} done", step.name());
            let progress = SchedulerEvent::RecoveryProgress {
                invocation,
                progress: step.progress(),
            };
            if events.send_async(progress).await.is_err() {
                return;
            }
        }

        let report = RecoveryReport {
            completed_steps,
            recovered_systems: snapshot.context.systems.enabled().collect(),
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        let _ = events
            .send_async(SchedulerEvent::RecoveryResolved {
                invocation,
                outcome: Ok(report),
            })
            .await;
    }

    fn perform(&self, step: RecoveryStep, snapshot: &SchedulerSnapshot) -> Result<(), RecoveryError> {
        if step == RecoveryStep::ValidateState {
            snapshot
                .context
                .config
                .validate()
                .map_err(|e| RecoveryError::InvalidState(e.to_string()))?;
        }
        self.hooks.perform(step, snapshot)
    }
}

impl Default for RecoveryCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_millis(50), Arc::new(NoopRecoveryHooks))
    }
}

impl fmt::Debug for RecoveryCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryCoordinator")
            .field("step_delay", &self.step_delay)
            .finish_non_exhaustive()
    }
}
