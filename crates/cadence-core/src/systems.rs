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


//! The fixed set of per-frame systems the scheduler can drive.
//!
//! Systems are addressed by the closed [`SystemKind`] enum rather than by
//! free-form names, so the update dispatch loop is statically checked. Which
//! systems run on a given frame is decided by a [`SystemFlags`] set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Identifies one per-frame system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemKind {
    /// Skeletal and property animation.
    Animation,
    /// Physics simulation step.
    Physics,
    /// Particle emitters.
    Particles,
    /// Dynamic lighting.
    Lighting,
    /// Post-processing and screen effects.
    Effects,
    /// Submission of the frame to the renderer.
    Render,
}

impl SystemKind {
    /// Every system, in dispatch order.
    pub const ALL: [SystemKind; 6] = [
        SystemKind::Animation,
        SystemKind::Physics,
        SystemKind::Particles,
        SystemKind::Lighting,
        SystemKind::Effects,
        SystemKind::Render,
    ];

    /// Returns the lowercase name of the system.
    pub const fn name(self) -> &'static str {
        match self {
            SystemKind::Animation => "animation",
            SystemKind::Physics => "physics",
            SystemKind::Particles => "particles",
            SystemKind::Lighting => "lighting",
            SystemKind::Effects => "effects",
            SystemKind::Render => "render",
        }
    }

    /// Parses a lowercase system name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Returns the flag corresponding to this system.
    pub const fn flag(self) -> SystemFlags {
        match self {
            SystemKind::Animation => SystemFlags::ANIMATION,
            SystemKind::Physics => SystemFlags::PHYSICS,
            SystemKind::Particles => SystemFlags::PARTICLES,
            SystemKind::Lighting => SystemFlags::LIGHTING,
            SystemKind::Effects => SystemFlags::EFFECTS,
            SystemKind::Render => SystemFlags::RENDER,
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

crate::cadence_bitflags! {
    /// The set of systems enabled for per-frame updates.
    ///
    /// Serialized as a map of system name to boolean, e.g.
    /// `{"animation": true, "physics": false, ...}`.
    #[derive(Serialize, Deserialize)]
    #[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
    pub struct SystemFlags: u8 {
        /// See [`SystemKind::Animation`].
        const ANIMATION = 1 << 0;
        /// See [`SystemKind::Physics`].
        const PHYSICS = 1 << 1;
        /// See [`SystemKind::Particles`].
        const PARTICLES = 1 << 2;
        /// See [`SystemKind::Lighting`].
        const LIGHTING = 1 << 3;
        /// See [`SystemKind::Effects`].
        const EFFECTS = 1 << 4;
        /// See [`SystemKind::Render`].
        const RENDER = 1 << 5;
    }
}

impl SystemFlags {
    /// Returns `true` if `kind` is enabled.
    pub fn is_enabled(&self, kind: SystemKind) -> bool {
        self.contains(kind.flag())
    }

    /// Enables or disables `kind`.
    pub fn set_enabled(&mut self, kind: SystemKind, enabled: bool) {
        self.set(kind.flag(), enabled);
    }

    /// Iterates over the enabled systems in dispatch order.
    pub fn enabled(&self) -> impl Iterator<Item = SystemKind> + '_ {
        SystemKind::ALL
            .into_iter()
            .filter(move |kind| self.is_enabled(*kind))
    }
}

impl From<BTreeMap<String, bool>> for SystemFlags {
    /// Builds a flag set from a name map. Systems missing from the map stay
    /// enabled; unknown names are ignored.
    fn from(map: BTreeMap<String, bool>) -> Self {
        let mut flags = SystemFlags::ALL;
        for (name, enabled) in map {
            match SystemKind::from_name(&name) {
                Some(kind) => flags.set_enabled(kind, enabled),
                None => log::warn!("Ignoring unknown system '{name}' in system flags"),
            }
        }
        flags
    }
}

impl From<SystemFlags> for BTreeMap<String, bool> {
    fn from(flags: SystemFlags) -> Self {
        SystemKind::ALL
            .into_iter()
            .map(|kind| (kind.name().to_string(), flags.is_enabled(kind)))
            .collect()
    }
}

/// A failure reported by a system updater.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{system} update failed: {message}")]
pub struct SystemError {
    /// The system that failed.
    pub system: SystemKind,
    /// Human-readable cause.
    pub message: String,
}

impl SystemError {
    /// Creates a new error for `system`.
    pub fn new(system: SystemKind, message: impl Into<String>) -> Self {
        Self {
            system,
            message: message.into(),
        }
    }
}

/// A component advanced once per frame by the scheduler.
///
/// The scheduler only decides *whether* an updater runs (from its
/// [`SystemFlags`]) and measures how long the pass takes.
pub trait SystemUpdater: Send {
    /// Advances the system by `delta_ms` milliseconds.
    fn update(&mut self, delta_ms: f64) -> Result<(), SystemError>;
}

impl<F> SystemUpdater for F
where
    F: FnMut(f64) -> Result<(), SystemError> + Send,
{
    fn update(&mut self, delta_ms: f64) -> Result<(), SystemError> {
        self(delta_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in SystemKind::ALL {
            assert_eq!(SystemKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(SystemKind::from_name("audio"), None);
    }

    #[test]
    fn default_flags_are_empty_and_all_enables_everything() {
        assert!(SystemFlags::default().is_empty());
        assert_eq!(SystemFlags::ALL.enabled().count(), SystemKind::ALL.len());
    }

    #[test]
    fn set_enabled_toggles_a_single_system() {
        let mut flags = SystemFlags::ALL;
        flags.set_enabled(SystemKind::Physics, false);
        assert!(!flags.is_enabled(SystemKind::Physics));
        assert!(flags.is_enabled(SystemKind::Render));
        let enabled: Vec<_> = flags.enabled().collect();
        assert_eq!(enabled.len(), 5);
        assert!(!enabled.contains(&SystemKind::Physics));
    }

    #[test]
    fn flags_serialize_as_name_map() {
        let mut flags = SystemFlags::ALL;
        flags.set_enabled(SystemKind::Particles, false);
        let json = serde_json::to_value(flags).unwrap();
        assert_eq!(json["particles"], false);
        assert_eq!(json["render"], true);

        let parsed: SystemFlags =
            serde_json::from_str(r#"{"physics": false, "holograms": true}"#).unwrap();
        assert!(!parsed.is_enabled(SystemKind::Physics));
        assert!(parsed.is_enabled(SystemKind::Animation));
    }

    #[test]
    fn closures_are_updaters() {
        let mut calls = 0;
        let mut updater = |delta: f64| {
            calls += 1;
            if delta > 100.0 {
                Err(SystemError::new(SystemKind::Physics, "step too large"))
            } else {
                Ok(())
            }
        };
        assert!(SystemUpdater::update(&mut updater, 16.0).is_ok());
        let err = SystemUpdater::update(&mut updater, 200.0).unwrap_err();
        assert_eq!(err.to_string(), "physics update failed: step too large");
        drop(updater);
        assert_eq!(calls, 2);
    }
}
