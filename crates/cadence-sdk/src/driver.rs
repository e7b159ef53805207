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


//! The built-in frame driver: a tokio interval steered by [`DriverCommand`]s.

use cadence_control::{DriverCommand, FrameTick};
use cadence_core::Clock;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

fn period(fps: f64) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1.0))
}

/// Produces [`FrameTick`]s at the rate requested by the scheduler.
#[derive(Debug)]
pub struct FrameDriver {
    interval: Option<Interval>,
    fps: f64,
    paused: bool,
    last_tick: Instant,
}

impl FrameDriver {
    /// Creates a stopped driver.
    pub fn new() -> Self {
        Self {
            interval: None,
            fps: 0.0,
            paused: false,
            last_tick: Instant::now(),
        }
    }

    /// Returns `true` while ticks are being produced.
    pub fn is_ticking(&self) -> bool {
        self.interval.is_some() && !self.paused
    }

    /// The current tick rate.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Applies a command from the scheduler.
    pub fn apply(&mut self, command: DriverCommand) {
        log::debug!("Frame driver: {command:?}");
        match command {
            DriverCommand::Start { fps } => {
                self.paused = false;
                self.restart(fps);
            }
            DriverCommand::Pause => self.paused = true,
            DriverCommand::Resume => {
                self.paused = false;
                if let Some(interval) = self.interval.as_mut() {
                    interval.reset();
                }
                // The first tick after a pause must not carry the paused time.
                self.last_tick = Instant::now();
            }
            DriverCommand::Stop => {
                self.interval = None;
                self.paused = false;
            }
            DriverCommand::SetRate { fps } => {
                if self.interval.is_some() {
                    self.restart(fps);
                } else {
                    self.fps = fps;
                }
            }
        }
    }

    fn restart(&mut self, fps: f64) {
        let mut interval = tokio::time::interval(period(fps));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        self.fps = fps;
        self.last_tick = Instant::now();
    }

    /// Waits for the next tick. Never completes while the driver is not ticking.
    pub async fn next_tick(&mut self, clock: &dyn Clock) -> FrameTick {
        let Some(interval) = self.interval.as_mut().filter(|_| !self.paused) else {
            return std::future::pending().await;
        };
        let at = interval.tick().await;
        let delta = at.saturating_duration_since(self.last_tick);
        self.last_tick = at;
        FrameTick::new(delta.as_secs_f64() * 1000.0, clock.now_ms())
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}
