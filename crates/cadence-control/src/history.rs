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


//! Bounded rolling storage for frame times.

use serde::Serialize;
use std::collections::VecDeque;

/// A bounded FIFO of frame durations in milliseconds.
///
/// Unlike a fixed-size ring the capacity can change at runtime; shrinking it
/// drops the oldest samples first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameTimeHistory {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl FrameTimeHistory {
    /// Creates an empty history holding at most `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes a sample, evicting the oldest one if the history is full.
    pub fn push(&mut self, frame_ms: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(frame_ms);
    }

    /// Changes the capacity, truncating from the front if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// The maximum number of samples kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if no sample has been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Arithmetic mean of the samples, `0.0` when empty.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Drops every sample, keeping the capacity.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest_when_full() {
        let mut history = FrameTimeHistory::new(3);
        for value in [10.0, 20.0, 30.0, 40.0] {
            history.push(value);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.samples, [20.0, 30.0, 40.0]);
    }

    #[test]
    fn shrinking_truncates_from_the_front() {
        let mut history = FrameTimeHistory::new(5);
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            history.push(value);
        }
        history.set_capacity(2);
        assert_eq!(history.samples, [4.0, 5.0]);
        history.set_capacity(0);
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.samples, [5.0]);
    }

    #[test]
    fn average_of_samples() {
        let mut history = FrameTimeHistory::new(4);
        assert_eq!(history.average(), 0.0);
        for value in [10.0, 10.0, 20.0, 20.0] {
            history.push(value);
        }
        assert_eq!(history.average(), 15.0);
    }
}
