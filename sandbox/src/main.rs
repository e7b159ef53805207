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


//! Runs the scheduler through a short scripted session: start, a stalled
//! frame, a context loss, a pause and a stop.
//!
//! Usage: `sandbox [host-config.json]`

use anyhow::Result;
use cadence_control::ConfigPatch;
use cadence_core::{SystemError, SystemKind};
use cadence_sdk::{FrameLoopHost, HostConfig, RuntimeParts};
use cadence_telemetry::MemorySink;
use std::sync::Arc;
use std::time::Duration;

fn load_config() -> Result<HostConfig> {
    match std::env::args().nth(1) {
        Some(path) => HostConfig::from_file(path),
        None => Ok(HostConfig::default()),
    }
}

fn parts(sink: Arc<MemorySink>) -> RuntimeParts {
    let mut frames = 0u64;
    RuntimeParts::default()
        .with_sink(sink)
        .with_system(SystemKind::Physics, move |delta_ms: f64| -> Result<(), SystemError> {
            frames += 1;
            if frames % 120 == 0 {
                log::debug!("physics advanced {frames} frames (last delta {delta_ms:.2}ms)");
            }
            Ok(())
        })
        .with_system(SystemKind::Animation, |_delta_ms: f64| -> Result<(), SystemError> { Ok(()) })
}

async fn phase(host: &FrameLoopHost, label: &str, duration: Duration) {
    tokio::time::sleep(duration).await;
    let status = host.status();
    log::info!(
        "[{label}] state={} fps={:.1} frames={} error={}",
        status.state,
        status.fps,
        status.frame_count,
        status.has_error
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let sink = Arc::new(MemorySink::new(256));
    let host = FrameLoopHost::start(config, parts(sink.clone()))?;
    log::info!("Sandbox running the {:?} backend", host.backend());

    let Some(scheduler) = host.scheduler() else {
        host.send(cadence_control::SchedulerEvent::StartLoop);
        phase(&host, "legacy", Duration::from_secs(2)).await;
        return host.shutdown().await;
    };

    scheduler.start();
    phase(&host, "started", Duration::from_millis(1500)).await;

    scheduler.update_config(ConfigPatch::target_fps(30.0));
    phase(&host, "retargeted", Duration::from_millis(1000)).await;

    // A frame far above the frame-time ceiling sends the loop through recovery.
    let now = scheduler.snapshot().context.timing.current_time;
    scheduler.frame_tick(2500.0, now + 2500.0);
    phase(&host, "stalled", Duration::from_millis(500)).await;

    scheduler.context_lost();
    phase(&host, "context", Duration::from_millis(800)).await;

    scheduler.pause();
    phase(&host, "paused", Duration::from_millis(300)).await;
    scheduler.resume();
    scheduler.stop();
    phase(&host, "stopped", Duration::from_millis(100)).await;

    log::info!("States entered: {}", sink.entered_states().join(" -> "));
    host.shutdown().await
}
