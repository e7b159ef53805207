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


//! Time sources for the scheduler.
//!
//! All scheduler timestamps are milliseconds expressed as `f64`, measured from
//! an arbitrary origin fixed when the clock is created. The state machine reads
//! the clock to arm timers and to stamp context fields; it never sleeps on it.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A monotonic millisecond time source.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time in milliseconds since the clock's origin.
    fn now_ms(&self) -> f64;
}

/// A [`Clock`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// A [`Clock`] that only moves when told to.
///
/// Used to drive timers and timeouts deterministically in tests and replays.
/// The current time is stored as the bit pattern of an `f64` so the clock can
/// be shared between threads without a lock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_bits: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `start_ms`.
    pub fn new(start_ms: f64) -> Self {
        Self {
            now_bits: AtomicU64::new(start_ms.to_bits()),
        }
    }

    /// Sets the current time. Moving backwards is ignored.
    pub fn set_ms(&self, now_ms: f64) {
        if now_ms >= self.now_ms() {
            self.now_bits.store(now_ms.to_bits(), Ordering::SeqCst);
        } else {
            log::warn!("ManualClock: refusing to move backwards to {now_ms:.3}ms");
        }
    }

    /// Advances the current time by `delta_ms` and returns the new reading.
    pub fn advance_ms(&self, delta_ms: f64) -> f64 {
        let next = self.now_ms() + delta_ms.max(0.0);
        self.now_bits.store(next.to_bits(), Ordering::SeqCst);
        next
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.now_bits.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now_ms();
        thread::sleep(Duration::from_millis(5));
        let second = clock.now_ms();
        assert!(second > first);
        assert!(second - first >= 5.0);
    }

    #[test]
    fn manual_clock_starts_where_told() {
        let clock = ManualClock::new(250.0);
        assert_eq!(clock.now_ms(), 250.0);
        assert_eq!(ManualClock::default().now_ms(), 0.0);
    }

    #[test]
    fn manual_clock_advances_and_sets() {
        let clock = ManualClock::new(0.0);
        assert_eq!(clock.advance_ms(16.5), 16.5);
        clock.set_ms(100.0);
        assert_eq!(clock.now_ms(), 100.0);
    }

    #[test]
    fn manual_clock_never_goes_backwards() {
        let clock = ManualClock::new(100.0);
        clock.set_ms(50.0);
        assert_eq!(clock.now_ms(), 100.0);
        clock.advance_ms(-10.0);
        assert_eq!(clock.now_ms(), 100.0);
    }
}
