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


//! Error taxonomy used to route `ERROR_OCCURRED`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the scheduler reacts to an error while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Logged; the loop keeps going.
    Transient,
    /// Triggers the recovery sequence.
    Recoverable,
    /// Stops in the `error` state.
    Critical,
    /// The graphics context went away; waits for it to come back.
    ContextLoss,
}

/// The kind of a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ErrorKind {
    OutOfMemory,
    DeviceLost,
    Internal,
    FrameStall,
    SystemUpdate,
    ResourceLoad,
    RecoveryFailed,
    Timeout,
    ContextLoss,
    Network,
    Warning,
    Other,
}

impl ErrorKind {
    /// Classifies the kind.
    pub const fn class(self) -> ErrorClass {
        match self {
            ErrorKind::OutOfMemory | ErrorKind::DeviceLost | ErrorKind::Internal => {
                ErrorClass::Critical
            }
            ErrorKind::FrameStall
            | ErrorKind::SystemUpdate
            | ErrorKind::ResourceLoad
            | ErrorKind::RecoveryFailed
            | ErrorKind::Timeout => ErrorClass::Recoverable,
            ErrorKind::ContextLoss => ErrorClass::ContextLoss,
            ErrorKind::Network | ErrorKind::Warning | ErrorKind::Other => ErrorClass::Transient,
        }
    }

    /// The snake_case name of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            ErrorKind::OutOfMemory => "out_of_memory",
            ErrorKind::DeviceLost => "device_lost",
            ErrorKind::Internal => "internal",
            ErrorKind::FrameStall => "frame_stall",
            ErrorKind::SystemUpdate => "system_update",
            ErrorKind::ResourceLoad => "resource_load",
            ErrorKind::RecoveryFailed => "recovery_failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ContextLoss => "context_loss",
            ErrorKind::Network => "network",
            ErrorKind::Warning => "warning",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error as carried by `ERROR_OCCURRED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Human-readable details.
    pub message: String,
    /// When it happened, in scheduler milliseconds.
    pub timestamp_ms: f64,
}

impl ReportedError {
    /// Creates a new report.
    pub fn new(kind: ErrorKind, message: impl Into<String>, timestamp_ms: f64) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp_ms,
        }
    }

    /// Shorthand for `self.kind.class()`.
    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }
}

impl fmt::Display for ReportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
