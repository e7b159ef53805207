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


//! Delayed transitions, scoped to the state that armed them.
//!
//! Each armed timer gets a fresh generation. Leaving the owning state drops
//! its timers. A firing is honoured only if its owner is the current state
//! and its generation is still the latest arming of that kind, so neither a
//! late timer nor one superseded by a re-arm can act on a newer state.

use crate::state::StateId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Periodic adaptive frame-rate check in `running`.
    AdaptationCheck,
    /// Gives up on a recovery invocation.
    RecoveryTimeout,
    /// Gives up on the graphics context.
    ContextLossTimeout,
    /// Retries recovery from `error`.
    ErrorRetry,
}

/// Identifies one arming of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    /// What the timer is for.
    pub kind: TimerKind,
    /// The state that armed it.
    pub owner: StateId,
    /// Monotonic arming counter.
    pub generation: u64,
}

#[derive(Debug, Clone)]
struct ArmedTimer {
    handle: TimerHandle,
    deadline_ms: f64,
}

/// The set of pending timers.
#[derive(Debug, Default)]
pub struct TimerTable {
    armed: Vec<ArmedTimer>,
    latest: HashMap<TimerKind, u64>,
    next_generation: u64,
}

impl TimerTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `kind` for `owner`, replacing any pending timer of the same kind.
    pub fn arm(&mut self, kind: TimerKind, owner: StateId, now_ms: f64, delay_ms: f64) -> TimerHandle {
        self.armed.retain(|timer| timer.handle.kind != kind);
        self.next_generation += 1;
        self.latest.insert(kind, self.next_generation);
        let handle = TimerHandle {
            kind,
            owner,
            generation: self.next_generation,
        };
        self.armed.push(ArmedTimer {
            handle,
            deadline_ms: now_ms + delay_ms,
        });
        handle
    }

    /// Drops every timer armed by `owner`, returning how many were dropped.
    pub fn cancel_owned_by(&mut self, owner: StateId) -> usize {
        let before = self.armed.len();
        let latest = &mut self.latest;
        self.armed.retain(|timer| {
            let keep = timer.handle.owner != owner;
            if !keep {
                latest.remove(&timer.handle.kind);
            }
            keep
        });
        before - self.armed.len()
    }

    /// Drops every timer.
    pub fn cancel_all(&mut self) {
        self.armed.clear();
        self.latest.clear();
    }

    /// Returns `true` if `handle` is the latest arming of its kind and was not
    /// cancelled. Stays `true` after the timer fires until it is re-armed.
    pub fn is_current(&self, handle: TimerHandle) -> bool {
        self.latest.get(&handle.kind) == Some(&handle.generation)
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<f64> {
        self.armed
            .iter()
            .map(|timer| timer.deadline_ms)
            .reduce(f64::min)
    }

    /// Removes and returns the earliest timer due at `now_ms`.
    ///
    /// Ties are broken by arming order.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<TimerHandle> {
        let index = self
            .armed
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.deadline_ms <= now_ms)
            .min_by(|(_, a), (_, b)| {
                a.deadline_ms
                    .total_cmp(&b.deadline_ms)
                    .then(a.handle.generation.cmp(&b.handle.generation))
            })
            .map(|(index, _)| index)?;
        Some(self.armed.swap_remove(index).handle)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.armed.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}
