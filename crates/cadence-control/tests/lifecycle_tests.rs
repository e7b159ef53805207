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


mod common;

use cadence_control::{
    ConfigPatch, DriverCommand, ErrorKind, ReportedError, SchedulerEvent, SchedulerOptions,
    StateId,
};
use cadence_core::telemetry::TelemetryKind;
use cadence_core::{SystemError, SystemKind};
use common::{driver_commands, telemetry_kinds, Harness};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn counting_system(counter: Arc<AtomicU32>) -> impl FnMut(f64) -> Result<(), SystemError> + Send {
    move |_delta| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_start_loop_enters_every_running_region() {
    let mut harness = Harness::new();
    assert_eq!(harness.state_name(), "idle");

    harness.send(SchedulerEvent::StartLoop);
    let effects = harness.effects();

    assert!(harness.scheduler.matches("running.timing.tracking"));
    assert!(harness.scheduler.matches("running.systemUpdates.updating"));
    assert!(harness.scheduler.matches("running.performanceMonitoring.monitoring"));
    assert_eq!(
        driver_commands(&effects),
        vec![DriverCommand::Start { fps: 60.0 }]
    );
    assert_eq!(telemetry_kinds(&effects), vec![TelemetryKind::StateEntered]);
    assert_eq!(harness.scheduler.context().timing.clock_starts, 1);
    assert_eq!(harness.scheduler.next_deadline(), Some(5000.0));
}

#[test]
fn test_start_stop_round_trip_keeps_config_and_systems() {
    let mut harness = Harness::new();
    harness.send(SchedulerEvent::SetSystemEnabled {
        system: SystemKind::Particles,
        enabled: false,
    });
    let config = harness.scheduler.context().config.clone();
    let systems = harness.scheduler.context().systems;

    harness.send(SchedulerEvent::StartLoop);
    for _ in 0..10 {
        harness.tick(16.0);
    }
    harness.send(SchedulerEvent::StopLoop);

    assert_eq!(harness.state_name(), "idle");
    assert_eq!(harness.scheduler.context().config, config);
    assert_eq!(harness.scheduler.context().systems, systems);
    assert_eq!(harness.scheduler.next_deadline(), None);
    let commands = driver_commands(&harness.effects());
    assert_eq!(commands.last(), Some(&DriverCommand::Stop));
}

#[test]
fn test_frame_ticks_outside_running_are_dropped() {
    let mut harness = Harness::new();
    harness.tick(16.0);
    assert_eq!(harness.scheduler.context().timing.delta_time, 0.0);

    let mut harness = Harness::running();
    harness.send(SchedulerEvent::PauseLoop);
    harness.tick(16.0);
    assert_eq!(harness.scheduler.context().timing.delta_time, 0.0);
}

#[test]
fn test_frame_tick_updates_timing() {
    let mut harness = Harness::running();
    harness.tick(16.5);
    let timing = &harness.scheduler.context().timing;
    assert_eq!(timing.delta_time, 16.5);
    assert_eq!(timing.last_frame_time, 16.5);
}

#[test]
fn test_pause_resume_keeps_errors_and_clock() {
    let mut harness = Harness::running();
    harness.send(SchedulerEvent::PauseLoop);
    assert_eq!(harness.state_name(), "paused");
    assert!(harness.scheduler.context().controls.is_paused);

    harness.send(SchedulerEvent::ErrorOccurred(ReportedError::new(
        ErrorKind::ResourceLoad,
        "texture missing",
        0.0,
    )));
    assert_eq!(harness.state_name(), "paused");

    harness.clock.advance_ms(2000.0);
    harness.send(SchedulerEvent::ResumeLoop);
    assert_eq!(harness.state_name(), "running");

    let context = harness.scheduler.context();
    assert!(context.error.has_error);
    assert!(!context.controls.is_paused);
    assert_eq!(context.timing.clock_starts, 1);
    assert_eq!(context.timing.last_frame_time, 2000.0);
    assert_eq!(
        driver_commands(&harness.effects()),
        vec![DriverCommand::Pause, DriverCommand::Resume]
    );
}

#[test]
fn test_step_mode_advances_one_cycle_per_step() {
    let mut harness = Harness::running();
    let updates = Arc::new(AtomicU32::new(0));
    harness
        .scheduler
        .register_system(SystemKind::Physics, counting_system(updates.clone()));

    harness.send(SchedulerEvent::EnableStepMode);
    assert_eq!(harness.state_name(), "debugging");
    assert!(harness.scheduler.context().controls.debug_mode);

    harness.tick(16.0);
    harness.tick(16.0);
    assert_eq!(updates.load(Ordering::SeqCst), 0);

    harness.send(SchedulerEvent::StepFrame);
    assert_eq!(updates.load(Ordering::SeqCst), 1);
    harness.send(SchedulerEvent::StepFrame);
    assert_eq!(updates.load(Ordering::SeqCst), 2);
    assert_eq!(harness.scheduler.context().controls.frame_step, 2);

    harness.send(SchedulerEvent::DisableStepMode);
    assert_eq!(harness.state_name(), "running");
    assert!(!harness.scheduler.context().controls.step_mode);
    harness.tick(16.0);
    assert_eq!(updates.load(Ordering::SeqCst), 3);
}

#[test]
fn test_step_frame_outside_debugging_is_ignored() {
    let mut harness = Harness::running();
    harness.send(SchedulerEvent::StepFrame);
    assert_eq!(harness.scheduler.context().controls.frame_step, 0);
    assert_eq!(harness.state_name(), "running");
}

#[test]
fn test_disabled_systems_are_skipped() {
    let mut harness = Harness::running();
    let physics = Arc::new(AtomicU32::new(0));
    let render = Arc::new(AtomicU32::new(0));
    harness
        .scheduler
        .register_system(SystemKind::Physics, counting_system(physics.clone()));
    harness
        .scheduler
        .register_system(SystemKind::Render, counting_system(render.clone()));

    harness.send(SchedulerEvent::SetSystemEnabled {
        system: SystemKind::Physics,
        enabled: false,
    });
    harness.tick(16.0);
    harness.tick(16.0);

    assert_eq!(physics.load(Ordering::SeqCst), 0);
    assert_eq!(render.load(Ordering::SeqCst), 2);
}

#[test]
fn test_system_failure_starts_recovery() {
    let mut harness = Harness::running();
    harness.scheduler.register_system(
        SystemKind::Physics,
        |_delta: f64| -> Result<(), SystemError> {
            Err(SystemError::new(SystemKind::Physics, "solver diverged"))
        },
    );
    harness.tick(16.0);

    let context = harness.scheduler.context();
    assert_eq!(harness.state_name(), "recovering");
    assert_eq!(context.error.error_type, Some(ErrorKind::SystemUpdate));
    assert_eq!(
        context.error.error_message.as_deref(),
        Some("physics update failed: solver diverged")
    );
}

#[test]
fn test_performance_window_updates_context() {
    let mut harness = Harness::running();
    for _ in 0..62 {
        harness.tick(16.0);
    }
    assert!(harness.scheduler.context().performance.frame_times.is_empty());

    harness.tick(16.0);
    let performance = &harness.scheduler.context().performance;
    assert_eq!(performance.frame_times.len(), 1);
    assert_eq!(performance.frame_count, 63);
    assert_eq!(performance.fps, 62.5);
    assert_eq!(performance.average_fps, 62.5);
    assert_eq!(performance.dropped_frames, 0);
}

#[test]
fn test_dropped_frames_reflect_the_latest_window() {
    let mut harness = Harness::running();
    // 25 frames of 40ms against a 60 fps target miss 35 frames per window.
    for _ in 0..25 {
        harness.tick(40.0);
    }
    assert_eq!(harness.scheduler.context().performance.dropped_frames, 35);

    for _ in 0..25 {
        harness.tick(40.0);
    }
    let performance = &harness.scheduler.context().performance;
    assert_eq!(performance.frame_times.len(), 2);
    assert_eq!(performance.dropped_frames, 35);
}

#[test]
fn test_frame_time_history_never_exceeds_its_bound() {
    let mut options = SchedulerOptions::default();
    options.config.max_frame_time_history = 2;
    let mut harness = Harness::with_options(options);
    harness.send(SchedulerEvent::StartLoop);

    for _ in 0..5 {
        for _ in 0..50 {
            harness.tick(20.0);
        }
        assert!(harness.scheduler.context().performance.frame_times.len() <= 2);
    }
    assert_eq!(harness.scheduler.context().performance.frame_times.len(), 2);

    harness.send(SchedulerEvent::UpdateConfig(ConfigPatch {
        max_frame_time_history: Some(1),
        ..Default::default()
    }));
    assert_eq!(harness.scheduler.context().performance.frame_times.len(), 1);
}

#[test]
fn test_adaptive_rate_follows_slow_frames() {
    let mut harness = Harness::running();
    for _ in 0..200 {
        harness.tick(25.0);
    }
    assert_eq!(harness.scheduler.context().performance.frame_times.len(), 5);
    harness.effects();

    assert_eq!(harness.scheduler.poll_timers(), 1);
    let effects = harness.effects();
    let context = harness.scheduler.context();
    assert_eq!(context.performance.effective_fps, 40.0);
    assert_eq!(context.config.target_fps, 60.0);
    assert_eq!(
        driver_commands(&effects),
        vec![DriverCommand::SetRate { fps: 40.0 }]
    );
    assert!(telemetry_kinds(&effects).contains(&TelemetryKind::AdaptiveRate));
    assert_eq!(harness.scheduler.next_deadline(), Some(10_000.0));
}

#[test]
fn test_adaptation_disabled_keeps_target_rate() {
    let mut harness = Harness::running();
    harness.send(SchedulerEvent::UpdateConfig(ConfigPatch {
        adaptive_frame_rate: Some(false),
        ..Default::default()
    }));
    for _ in 0..200 {
        harness.tick(25.0);
    }
    harness.scheduler.poll_timers();
    assert_eq!(harness.scheduler.context().performance.effective_fps, 60.0);
}

#[test]
fn test_invalid_config_update_is_rejected() {
    let mut harness = Harness::running();
    let before = harness.scheduler.context().config.clone();
    harness.send(SchedulerEvent::UpdateConfig(ConfigPatch::target_fps(0.0)));
    assert_eq!(harness.scheduler.context().config, before);
    assert_eq!(harness.state_name(), "running");
}

#[test]
fn test_lowering_target_sets_driver_rate() {
    let mut harness = Harness::running();
    harness.send(SchedulerEvent::UpdateConfig(ConfigPatch::target_fps(30.0)));
    assert_eq!(
        driver_commands(&harness.effects()),
        vec![DriverCommand::SetRate { fps: 30.0 }]
    );
    assert_eq!(harness.scheduler.context().performance.effective_fps, 30.0);
}

#[test]
fn test_running_errors_route_by_class() {
    let cases = [
        (ErrorKind::Internal, "error"),
        (ErrorKind::DeviceLost, "error"),
        (ErrorKind::ResourceLoad, "recovering"),
        (ErrorKind::Timeout, "recovering"),
        (ErrorKind::ContextLoss, "contextLost"),
        (ErrorKind::Warning, "running"),
        (ErrorKind::Other, "running"),
    ];
    for (kind, expected) in cases {
        let mut harness = Harness::running();
        harness.send(SchedulerEvent::ErrorOccurred(ReportedError::new(kind, "reported", 1.0)));
        assert_eq!(harness.state_name(), expected, "{kind:?}");
    }
}

#[test]
fn test_transient_errors_keep_running() {
    let mut harness = Harness::running();
    harness.send(SchedulerEvent::ErrorOccurred(ReportedError::new(
        ErrorKind::Network,
        "telemetry upload failed",
        1.0,
    )));
    let context = harness.scheduler.context();
    assert_eq!(harness.state_name(), "running");
    assert!(!context.error.has_error);
    assert_eq!(context.error.error_count, 1);
}

#[test]
fn test_unresolved_critical_error_blocks_start_until_reset() {
    let mut harness = Harness::running();
    harness.send(SchedulerEvent::ErrorOccurred(ReportedError::new(
        ErrorKind::OutOfMemory,
        "allocation failed",
        1.0,
    )));
    assert_eq!(harness.state_name(), "error");

    // Retrying from error goes through recovery while budget remains.
    harness.send(SchedulerEvent::StartLoop);
    assert_eq!(harness.state_name(), "recovering");
    harness.send(SchedulerEvent::StopLoop);
    assert_eq!(harness.state_name(), "idle");

    harness.send(SchedulerEvent::StartLoop);
    assert_eq!(harness.state_name(), "idle");

    harness.send(SchedulerEvent::ResetPerformanceMetrics);
    harness.send(SchedulerEvent::StartLoop);
    assert_eq!(harness.state_name(), "running");
}

#[test]
fn test_reset_in_error_returns_to_idle() {
    let mut harness = Harness::running();
    harness.send(SchedulerEvent::ErrorOccurred(ReportedError::new(
        ErrorKind::DeviceLost,
        "adapter removed",
        1.0,
    )));
    harness.send(SchedulerEvent::ResetPerformanceMetrics);
    assert_eq!(harness.scheduler.state().id(), StateId::Idle);
    assert!(!harness.scheduler.context().error.has_error);
}

#[test]
fn test_debug_toggle_works_in_any_state() {
    let mut harness = Harness::new();
    harness.send(SchedulerEvent::ToggleDebugMode);
    assert!(harness.scheduler.context().controls.debug_mode);
    harness.send(SchedulerEvent::StartLoop);
    harness.send(SchedulerEvent::PauseLoop);
    harness.send(SchedulerEvent::ToggleDebugMode);
    assert!(!harness.scheduler.context().controls.debug_mode);
}

#[test]
fn test_frame_tick_telemetry_respects_stride() {
    let mut options = SchedulerOptions::default();
    options.telemetry_frame_stride = 10;
    let mut harness = Harness::with_options(options);
    harness.send(SchedulerEvent::StartLoop);
    harness.effects();
    for _ in 0..25 {
        harness.tick(16.0);
    }
    let frame_payloads = telemetry_kinds(&harness.effects())
        .into_iter()
        .filter(|kind| *kind == TelemetryKind::FrameTick)
        .count();
    assert_eq!(frame_payloads, 2);
}
