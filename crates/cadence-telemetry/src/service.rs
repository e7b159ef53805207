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


//! Service fanning telemetry payloads out to every registered sink.

use cadence_core::telemetry::{TelemetryKind, TelemetryPayload, TelemetrySink};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Fans telemetry payloads out to a set of sinks and keeps per-kind counters.
#[derive(Default)]
pub struct TelemetryService {
    sinks: Vec<Arc<dyn TelemetrySink>>,
    counts: Mutex<BTreeMap<TelemetryKind, u64>>,
}

impl TelemetryService {
    /// Creates a service with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink. Payloads are delivered in registration order.
    pub fn register(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sinks.push(sink);
        log::debug!("Registered telemetry sink #{}", self.sinks.len());
    }

    /// Returns the number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Delivers `payload` to every sink.
    pub fn dispatch(&self, payload: &TelemetryPayload) {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(payload.kind).or_insert(0) += 1;
        }
        for sink in &self.sinks {
            sink.send(payload);
        }
    }

    /// Number of payloads of `kind` dispatched so far.
    pub fn dispatched(&self, kind: TelemetryKind) -> u64 {
        self.counts
            .lock()
            .map(|counts| counts.get(&kind).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total number of payloads dispatched so far.
    pub fn total_dispatched(&self) -> u64 {
        self.counts
            .lock()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for TelemetryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryService")
            .field("sinks", &self.sinks.len())
            .field("dispatched", &self.total_dispatched())
            .finish()
    }
}

impl TelemetrySink for TelemetryService {
    fn send(&self, payload: &TelemetryPayload) {
        self.dispatch(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    #[test]
    fn dispatch_reaches_every_sink() {
        let first = Arc::new(MemorySink::new(8));
        let second = Arc::new(MemorySink::new(8));
        let mut service = TelemetryService::new();
        service.register(first.clone());
        service.register(second.clone());
        assert_eq!(service.sink_count(), 2);

        service.dispatch(&TelemetryPayload::new(
            TelemetryKind::StateEntered,
            "running",
            1.0,
        ));

        assert_eq!(first.payloads().len(), 1);
        assert_eq!(second.payloads().len(), 1);
    }

    #[test]
    fn counters_track_kinds() {
        let service = TelemetryService::new();
        service.send(&TelemetryPayload::new(TelemetryKind::Error, "running", 0.0));
        service.send(&TelemetryPayload::new(TelemetryKind::Error, "error", 1.0));
        service.send(&TelemetryPayload::new(
            TelemetryKind::StateEntered,
            "error",
            1.0,
        ));

        assert_eq!(service.dispatched(TelemetryKind::Error), 2);
        assert_eq!(service.dispatched(TelemetryKind::Recovery), 0);
        assert_eq!(service.total_dispatched(), 3);
    }
}
