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


//! Telemetry sink implementations.

use cadence_core::telemetry::{TelemetryKind, TelemetryPayload, TelemetrySink};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Writes every payload to the `log` facade as a JSON line.
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    level: log::Level,
}

impl LogSink {
    /// Creates a sink logging at `level`.
    pub fn new(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(log::Level::Debug)
    }
}

impl TelemetrySink for LogSink {
    fn send(&self, payload: &TelemetryPayload) {
        log::log!(self.level, "[telemetry] {}", payload.to_json());
    }
}

/// Keeps the most recent payloads in memory.
///
/// Useful for UI panels that show recent scheduler activity, and for tests.
#[derive(Debug)]
pub struct MemorySink {
    capacity: usize,
    payloads: Mutex<VecDeque<TelemetryPayload>>,
}

impl MemorySink {
    /// Creates a sink retaining at most `capacity` payloads.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            payloads: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Returns a copy of the retained payloads, oldest first.
    pub fn payloads(&self) -> Vec<TelemetryPayload> {
        match self.payloads.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Returns how many retained payloads are of `kind`.
    pub fn count_of(&self, kind: TelemetryKind) -> usize {
        self.payloads()
            .iter()
            .filter(|payload| payload.kind == kind)
            .count()
    }

    /// Returns the states of the retained `StateEntered` payloads, oldest first.
    pub fn entered_states(&self) -> Vec<String> {
        self.payloads()
            .into_iter()
            .filter(|payload| payload.kind == TelemetryKind::StateEntered)
            .map(|payload| payload.state)
            .collect()
    }

    /// Drops every retained payload.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.payloads.lock() {
            guard.clear();
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl TelemetrySink for MemorySink {
    fn send(&self, payload: &TelemetryPayload) {
        let mut guard = match self.payloads.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.len() == self.capacity {
            guard.pop_front();
        }
        guard.push_back(payload.clone());
    }
}

/// Forwards payloads over a bounded channel to an external transport.
///
/// If the buffer is full, new payloads are dropped and counted.
#[derive(Debug)]
pub struct ChannelSink {
    sender: Sender<TelemetryPayload>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Creates a sink and the receiving end of its channel.
    pub fn new(buffer_size: usize) -> (Self, Receiver<TelemetryPayload>) {
        let (sender, receiver) = crossbeam_channel::bounded(buffer_size.max(1));
        (
            Self {
                sender,
                dropped: AtomicU64::new(0),
            },
            receiver,
        )
    }

    /// Number of payloads dropped because the buffer was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TelemetrySink for ChannelSink {
    fn send(&self, payload: &TelemetryPayload) {
        match self.sender.try_send(payload.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::trace!("Telemetry buffer full, dropping {} payload", payload.kind);
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
