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


//! The telemetry side channel of the scheduler.
//!
//! The scheduler emits a [`TelemetryPayload`] on every state entry and on a
//! few notable actions. Delivery is fire-and-forget: sinks must never fail
//! or block the caller, and the scheduler never inspects the outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a telemetry payload reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    /// A state (or parallel region set) was entered.
    StateEntered,
    /// Periodic frame timing sample.
    FrameTick,
    /// An error was recorded.
    Error,
    /// Adaptive pacing changed the effective frame rate.
    AdaptiveRate,
    /// A recovery attempt finished, successfully or not.
    Recovery,
}

impl fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TelemetryKind::StateEntered => "state_entered",
            TelemetryKind::FrameTick => "frame_tick",
            TelemetryKind::Error => "error",
            TelemetryKind::AdaptiveRate => "adaptive_rate",
            TelemetryKind::Recovery => "recovery",
        };
        f.write_str(name)
    }
}

/// One telemetry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    /// Record type.
    pub kind: TelemetryKind,
    /// Dotted state path active when the record was produced.
    pub state: String,
    /// Scheduler clock reading, in milliseconds.
    pub timestamp_ms: f64,
    /// Free-form structured detail.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
}

impl TelemetryPayload {
    /// Creates a payload without detail.
    pub fn new(kind: TelemetryKind, state: impl Into<String>, timestamp_ms: f64) -> Self {
        Self {
            kind,
            state: state.into(),
            timestamp_ms,
            detail: serde_json::Value::Null,
        }
    }

    /// Attaches structured detail.
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }

    /// Serializes the payload as a single JSON line for transport.
    pub fn to_json(&self) -> String {
        // A payload only holds strings, numbers and a JSON value, so this cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A destination for telemetry payloads.
pub trait TelemetrySink: Send + Sync {
    /// Delivers a payload. Implementations must not panic or block.
    fn send(&self, payload: &TelemetryPayload);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_json_omits_null_detail() {
        let payload = TelemetryPayload::new(TelemetryKind::StateEntered, "idle", 12.5);
        assert_eq!(
            payload.to_json(),
            r#"{"kind":"state_entered","state":"idle","timestamp_ms":12.5}"#
        );
    }

    #[test]
    fn payload_json_includes_detail() {
        let payload = TelemetryPayload::new(TelemetryKind::AdaptiveRate, "running", 0.0)
            .with_detail(json!({ "from": 60.0, "to": 45.0 }));
        let parsed: TelemetryPayload = serde_json::from_str(&payload.to_json()).unwrap();
        assert_eq!(parsed, payload);
        assert_eq!(parsed.detail["to"], 45.0);
    }

    #[test]
    fn kind_display_matches_serde_name() {
        let kind = TelemetryKind::FrameTick;
        assert_eq!(
            serde_json::to_string(&kind).unwrap(),
            format!("\"{kind}\"")
        );
    }
}
