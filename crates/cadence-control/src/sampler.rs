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


//! Windowed aggregation of frame times into [`PerformanceMetrics`].

use serde::{Deserialize, Serialize};

/// Aggregate statistics over one sampling window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Frames per second measured over the window.
    pub fps: f64,
    /// Mean frame time in milliseconds.
    pub average_frame_time: f64,
    /// Fastest frame in the window.
    pub min_frame_time: f64,
    /// Slowest frame in the window.
    pub max_frame_time: f64,
    /// Frames the target rate expected but that never arrived.
    pub dropped_frames: u32,
    /// Frames recorded in the window.
    pub frame_count: u32,
    /// Length of the window in milliseconds.
    pub elapsed_ms: f64,
}

/// Accumulates frame times while the performance-monitoring region is active.
///
/// Inactive samplers ignore frames. [`resume`](Self::resume) starts a fresh
/// window, so time spent paused never counts against the frame rate.
#[derive(Debug, Clone, Default)]
pub struct PerformanceSampler {
    window_start: Option<f64>,
    frame_count: u32,
    total_ms: f64,
    min_ms: f64,
    max_ms: f64,
}

impl PerformanceSampler {
    /// Creates an inactive sampler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a window is open.
    pub fn is_active(&self) -> bool {
        self.window_start.is_some()
    }

    /// Opens a new window at `now_ms`.
    pub fn resume(&mut self, now_ms: f64) {
        self.clear();
        self.window_start = Some(now_ms);
    }

    /// Closes the current window and discards its samples.
    pub fn suspend(&mut self) {
        self.clear();
        self.window_start = None;
    }

    /// Discards the samples of the current window and restarts it at `now_ms`
    /// if one is open.
    pub fn reset(&mut self, now_ms: f64) {
        if self.is_active() {
            self.resume(now_ms);
        }
    }

    /// Adds one frame to the open window.
    pub fn record(&mut self, frame_ms: f64) {
        if !self.is_active() {
            return;
        }
        if self.frame_count == 0 {
            self.min_ms = frame_ms;
            self.max_ms = frame_ms;
        } else {
            self.min_ms = self.min_ms.min(frame_ms);
            self.max_ms = self.max_ms.max(frame_ms);
        }
        self.frame_count += 1;
        self.total_ms += frame_ms;
    }

    /// Closes the window if at least `interval_ms` has elapsed and it holds
    /// frames, returning its metrics and opening the next window at `now_ms`.
    pub fn poll(&mut self, now_ms: f64, interval_ms: f64, target_fps: f64) -> Option<PerformanceMetrics> {
        let start = self.window_start?;
        let elapsed_ms = now_ms - start;
        if elapsed_ms < interval_ms || self.frame_count == 0 || elapsed_ms <= 0.0 {
            return None;
        }
        let count = self.frame_count;
        let expected = (elapsed_ms * target_fps / 1000.0).floor();
        let metrics = PerformanceMetrics {
            fps: f64::from(count) * 1000.0 / elapsed_ms,
            average_frame_time: self.total_ms / f64::from(count),
            min_frame_time: self.min_ms,
            max_frame_time: self.max_ms,
            dropped_frames: (expected - f64::from(count)).max(0.0) as u32,
            frame_count: count,
            elapsed_ms,
        };
        self.resume(now_ms);
        Some(metrics)
    }

    fn clear(&mut self) {
        self.frame_count = 0;
        self.total_ms = 0.0;
        self.min_ms = 0.0;
        self.max_ms = 0.0;
    }
}
