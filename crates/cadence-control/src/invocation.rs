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


//! Identifiers and results of the asynchronous work the scheduler invokes.

use cadence_core::SystemKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one invocation of a coordinator.
///
/// Results are only accepted while their id is the scheduler's active
/// invocation; anything else is stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvocationId(pub u64);

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which coordinator an invocation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationKind {
    /// The recovery sequence.
    Recovery,
    /// The graphics context probe.
    ContextProbe,
}

/// The ordered steps of the recovery sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStep {
    /// Clear the frame-time history and counters.
    ResetMetrics,
    /// Re-create the frame loop.
    ReinitializeLoop,
    /// Check that the scheduler is consistent again.
    ValidateState,
    /// Restart performance sampling.
    RestartMonitoring,
}

impl RecoveryStep {
    /// Every step, in execution order.
    pub const ALL: [RecoveryStep; 4] = [
        RecoveryStep::ResetMetrics,
        RecoveryStep::ReinitializeLoop,
        RecoveryStep::ValidateState,
        RecoveryStep::RestartMonitoring,
    ];

    /// Progress reported once this step has completed, in `(0, 1]`.
    pub fn progress(self) -> f64 {
        let index = Self::ALL.iter().position(|step| *step == self).unwrap_or(0);
        (index + 1) as f64 / Self::ALL.len() as f64
    }

    /// The snake_case name of the step.
    pub const fn name(self) -> &'static str {
        match self {
            RecoveryStep::ResetMetrics => "reset_metrics",
            RecoveryStep::ReinitializeLoop => "reinitialize_loop",
            RecoveryStep::ValidateState => "validate_state",
            RecoveryStep::RestartMonitoring => "restart_monitoring",
        }
    }
}

/// What a successful recovery did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryReport {
    /// Steps run, in order.
    pub completed_steps: Vec<RecoveryStep>,
    /// Systems that were enabled and re-validated.
    pub recovered_systems: Vec<SystemKind>,
    /// Wall time spent in the coordinator.
    pub elapsed_ms: f64,
}

/// What a successful context probe observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRestoreReport {
    /// Number of probes issued, including the successful one.
    pub polls: u32,
    /// Time until the resources came back.
    pub elapsed_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_progress_reaches_one() {
        let progress: Vec<f64> = RecoveryStep::ALL.iter().map(|s| s.progress()).collect();
        assert_eq!(progress, vec![0.25, 0.5, 0.75, 1.0]);
    }
}
