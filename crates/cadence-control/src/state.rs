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


//! The scheduler's hierarchical state value.
//!
//! The top level is a plain [`StateId`]. `running` additionally has three
//! parallel regions, each with a single active child while the state is
//! active:
//!
//! | region                  | child        |
//! |-------------------------|--------------|
//! | `timing`                | `tracking`   |
//! | `systemUpdates`         | `updating`   |
//! | `performanceMonitoring` | `monitoring` |

use cadence_core::cadence_bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level scheduler states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateId {
    /// Not scheduling frames.
    Idle,
    /// Scheduling frames.
    Running,
    /// Suspended by the host.
    Paused,
    /// Single-step debugging.
    Debugging,
    /// Running the recovery sequence.
    Recovering,
    /// Waiting for the graphics context.
    ContextLost,
    /// Stopped on an error.
    Error,
}

impl StateId {
    /// The camelCase name used in state paths.
    pub const fn name(self) -> &'static str {
        match self {
            StateId::Idle => "idle",
            StateId::Running => "running",
            StateId::Paused => "paused",
            StateId::Debugging => "debugging",
            StateId::Recovering => "recovering",
            StateId::ContextLost => "contextLost",
            StateId::Error => "error",
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

cadence_bitflags! {
    /// The parallel regions of `running` that are currently active.
    pub struct ActiveRegions: u8 {
        /// `running.timing.tracking`
        const TIMING = 1 << 0;
        /// `running.systemUpdates.updating`
        const SYSTEM_UPDATES = 1 << 1;
        /// `running.performanceMonitoring.monitoring`
        const PERFORMANCE_MONITORING = 1 << 2;
    }
}

const REGION_PATHS: [(ActiveRegions, &str); 3] = [
    (ActiveRegions::TIMING, "timing.tracking"),
    (ActiveRegions::SYSTEM_UPDATES, "systemUpdates.updating"),
    (
        ActiveRegions::PERFORMANCE_MONITORING,
        "performanceMonitoring.monitoring",
    ),
];

/// A full state value: the top-level state and, for `running`, its regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateValue {
    id: StateId,
    regions: ActiveRegions,
}

impl StateValue {
    /// The initial state.
    pub const IDLE: StateValue = StateValue {
        id: StateId::Idle,
        regions: ActiveRegions::EMPTY,
    };

    /// The value of `id` as entered: `running` activates all its regions.
    pub fn new(id: StateId) -> Self {
        let regions = if id == StateId::Running {
            ActiveRegions::ALL
        } else {
            ActiveRegions::EMPTY
        };
        Self { id, regions }
    }

    /// The top-level state.
    pub fn id(&self) -> StateId {
        self.id
    }

    /// The active regions of `running`; empty in every other state.
    pub fn regions(&self) -> ActiveRegions {
        self.regions
    }

    /// Returns `true` if `region` is active.
    pub fn in_region(&self, region: ActiveRegions) -> bool {
        self.regions.contains(region)
    }

    /// Every leaf path of the value, e.g. `running.timing.tracking`.
    pub fn paths(&self) -> Vec<String> {
        if self.regions.is_empty() {
            return vec![self.id.name().to_string()];
        }
        REGION_PATHS
            .iter()
            .filter(|(region, _)| self.regions.contains(*region))
            .map(|(_, leaf)| format!("{}.{leaf}", self.id.name()))
            .collect()
    }

    /// Returns `true` if `path` is a leaf path of this value or a
    /// dot-separated prefix of one.
    pub fn matches(&self, path: &str) -> bool {
        self.paths().iter().any(|leaf| {
            leaf == path
                || leaf
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

impl Default for StateValue {
    fn default() -> Self {
        Self::IDLE
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.paths().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_has_all_regions() {
        let running = StateValue::new(StateId::Running);
        assert_eq!(
            running.paths(),
            vec![
                "running.timing.tracking",
                "running.systemUpdates.updating",
                "running.performanceMonitoring.monitoring",
            ]
        );
        assert!(running.matches("running"));
        assert!(running.matches("running.systemUpdates"));
        assert!(running.matches("running.timing.tracking"));
        assert!(!running.matches("run"));
        assert!(!running.matches("paused"));
    }

    #[test]
    fn other_states_have_no_regions() {
        for id in [
            StateId::Idle,
            StateId::Paused,
            StateId::Debugging,
            StateId::Recovering,
            StateId::ContextLost,
            StateId::Error,
        ] {
            let value = StateValue::new(id);
            assert!(value.regions().is_empty());
            assert_eq!(value.paths(), vec![id.name().to_string()]);
            assert!(value.matches(id.name()));
        }
        assert_eq!(StateValue::default(), StateValue::IDLE);
    }
}
