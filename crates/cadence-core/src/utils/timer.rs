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


//! Wall-clock measurement of short code spans.

use std::time::{Duration, Instant};

/// Measures the wall-clock duration of a span of work.
///
/// The scheduler uses it to time one pass over the enabled system updaters.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start_time: Instant,
}

impl Stopwatch {
    /// Creates a new Stopwatch and starts it immediately.
    ///
    /// ## Returns
    /// A running stopwatch.
    #[inline]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Restarts the stopwatch and returns the time elapsed before the restart.
    #[inline]
    pub fn restart(&mut self) -> Duration {
        let elapsed = self.elapsed();
        self.start_time = Instant::now();
        elapsed
    }

    /// Returns the elapsed time since the stopwatch was started.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the elapsed time in fractional milliseconds.
    ///
    /// ## Returns
    /// The elapsed time as `f64` milliseconds, the unit used throughout the scheduler context.
    #[inline]
    pub fn elapsed_ms_f64(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the elapsed time in whole microseconds.
    #[inline]
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed().as_micros() as u64
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const SLEEP_DURATION_MS: u64 = 20;
    const SLEEP_MARGIN_MS: u64 = 500;

    #[test]
    fn stopwatch_starts_near_zero() {
        let watch = Stopwatch::new();
        assert!(watch.elapsed_ms_f64() < SLEEP_MARGIN_MS as f64);
    }

    #[test]
    fn stopwatch_measures_sleep() {
        let watch = Stopwatch::new();
        thread::sleep(Duration::from_millis(SLEEP_DURATION_MS));
        let elapsed = watch.elapsed_ms_f64();
        assert!(
            elapsed >= SLEEP_DURATION_MS as f64,
            "Elapsed ({elapsed}ms) should cover the sleep"
        );
        assert!(watch.elapsed_us() >= SLEEP_DURATION_MS * 1000);
    }

    #[test]
    fn restart_returns_previous_span() {
        let mut watch = Stopwatch::new();
        thread::sleep(Duration::from_millis(SLEEP_DURATION_MS));
        let first = watch.restart();
        assert!(first >= Duration::from_millis(SLEEP_DURATION_MS));
        assert!(watch.elapsed() < first + Duration::from_millis(SLEEP_MARGIN_MS));
    }
}
