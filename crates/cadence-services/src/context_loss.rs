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


//! Waiting for the graphics context to come back.

use cadence_control::{ContextRestoreReport, InvocationId, SchedulerEvent};
use cadence_core::graphics::ResourceProbe;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Polls a [`ResourceProbe`] until renderer, scene and camera are all present.
///
/// The coordinator has no deadline of its own; the scheduler's context-loss
/// timeout bounds how long it is allowed to run.
#[derive(Clone)]
pub struct ContextLossCoordinator {
    poll_interval: Duration,
    probe: Arc<dyn ResourceProbe>,
}

impl ContextLossCoordinator {
    /// Creates a coordinator probing every `poll_interval`.
    pub fn new(poll_interval: Duration, probe: Arc<dyn ResourceProbe>) -> Self {
        Self {
            poll_interval,
            probe,
        }
    }

    /// Runs the probe loop on a new tokio task.
    pub fn spawn(
        &self,
        invocation: InvocationId,
        events: flume::Sender<SchedulerEvent>,
    ) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.run(invocation, events).await })
    }

    /// Probes immediately, then once per interval, until the resources are
    /// back or the probe itself fails.
    pub async fn run(&self, invocation: InvocationId, events: flume::Sender<SchedulerEvent>) {
        let started = Instant::now();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls: u32 = 0;

        let outcome = loop {
            interval.tick().await;
            polls += 1;
            match self.probe.probe() {
                Ok(status) if status.all_present() => {
                    break Ok(ContextRestoreReport {
                        polls,
                        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                    });
                }
                Ok(status) => {
                    log::trace!("Context probe {invocation} #{polls}: still missing {status:?}");
                }
                Err(e) => break Err(e.to_string()),
            }
        };

        match &outcome {
            Ok(report) => log::info!(
                "Graphics resources available again after {} probe(s)",
                report.polls
            ),
            Err(reason) => log::error!("Context probe {invocation} failed: {reason}"),
        }
        let _ = events
            .send_async(SchedulerEvent::ContextProbeResolved {
                invocation,
                outcome,
            })
            .await;
    }
}

impl fmt::Debug for ContextLossCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextLossCoordinator")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
