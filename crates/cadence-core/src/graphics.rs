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


//! Contract for probing the availability of external graphics resources.
//!
//! After a graphics-context loss the scheduler cannot resume until the
//! renderer, the scene and the camera exist again. It does not own any of
//! them; it only asks a [`ResourceProbe`] whether they are present.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Presence of each graphics resource required to render a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    /// The renderer/device is usable.
    pub renderer: bool,
    /// The scene graph is loaded.
    pub scene: bool,
    /// An active camera exists.
    pub camera: bool,
}

impl ResourceStatus {
    /// Status with every resource present.
    pub const READY: Self = Self {
        renderer: true,
        scene: true,
        camera: true,
    };

    /// Returns `true` when every resource is present.
    pub fn all_present(&self) -> bool {
        self.renderer && self.scene && self.camera
    }
}

/// The probe itself failed (as opposed to reporting missing resources).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("resource probe failed: {0}")]
pub struct ProbeError(pub String);

/// Answers whether the graphics resources are currently available.
pub trait ResourceProbe: Send + Sync {
    /// Checks the resources once.
    ///
    /// Returning `Ok` with missing resources means "not yet"; returning `Err`
    /// means the check itself is broken and waiting further is pointless.
    fn probe(&self) -> Result<ResourceStatus, ProbeError>;
}

impl<F> ResourceProbe for F
where
    F: Fn() -> Result<ResourceStatus, ProbeError> + Send + Sync,
{
    fn probe(&self) -> Result<ResourceStatus, ProbeError> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_present_requires_every_resource() {
        assert!(ResourceStatus::READY.all_present());
        assert!(!ResourceStatus::default().all_present());
        let partial = ResourceStatus {
            camera: false,
            ..ResourceStatus::READY
        };
        assert!(!partial.all_present());
    }

    #[test]
    fn closures_are_probes() {
        let probe = || -> Result<ResourceStatus, ProbeError> { Ok(ResourceStatus::READY) };
        assert_eq!(ResourceProbe::probe(&probe), Ok(ResourceStatus::READY));

        let broken =
            || -> Result<ResourceStatus, ProbeError> { Err(ProbeError("device removed".into())) };
        assert_eq!(
            ResourceProbe::probe(&broken).unwrap_err().to_string(),
            "resource probe failed: device removed"
        );
    }
}
