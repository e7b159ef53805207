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


//! Registry of per-frame system updaters.

use cadence_core::{Stopwatch, SystemError, SystemFlags, SystemKind, SystemUpdater};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of one pass over the enabled systems.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemsPass {
    /// Systems that were invoked, in dispatch order.
    pub invoked: Vec<SystemKind>,
    /// Failures reported by the invoked systems.
    pub failures: Vec<SystemError>,
    /// Wall time of the whole pass.
    pub duration_ms: f64,
}

/// Updaters keyed by system, dispatched in [`SystemKind::ALL`] order.
#[derive(Default)]
pub struct SystemRegistry {
    updaters: BTreeMap<SystemKind, Box<dyn SystemUpdater>>,
}

impl SystemRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `updater` for `kind`, returning the one it replaces.
    pub fn register(
        &mut self,
        kind: SystemKind,
        updater: Box<dyn SystemUpdater>,
    ) -> Option<Box<dyn SystemUpdater>> {
        log::debug!("Registered updater for system '{kind}'");
        self.updaters.insert(kind, updater)
    }

    /// Removes the updater for `kind`.
    pub fn unregister(&mut self, kind: SystemKind) -> Option<Box<dyn SystemUpdater>> {
        self.updaters.remove(&kind)
    }

    /// Returns `true` if `kind` has an updater.
    pub fn is_registered(&self, kind: SystemKind) -> bool {
        self.updaters.contains_key(&kind)
    }

    /// Number of registered updaters.
    pub fn len(&self) -> usize {
        self.updaters.len()
    }

    /// Returns `true` if no updater is registered.
    pub fn is_empty(&self) -> bool {
        self.updaters.is_empty()
    }

    /// Runs every registered updater whose system is enabled in `flags`.
    ///
    /// A failing updater does not stop the pass.
    pub fn run(&mut self, flags: SystemFlags, delta_ms: f64) -> SystemsPass {
        let stopwatch = Stopwatch::new();
        let mut pass = SystemsPass::default();
        for kind in flags.enabled() {
            let Some(updater) = self.updaters.get_mut(&kind) else {
                continue;
            };
            pass.invoked.push(kind);
            if let Err(error) = updater.update(delta_ms) {
                log::warn!("{error}");
                pass.failures.push(error);
            }
        }
        pass.duration_ms = stopwatch.elapsed_ms_f64();
        pass
    }
}

impl fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.updaters.keys()).finish()
    }
}
