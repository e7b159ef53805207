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


use cadence_control::{
    FrameScheduler, InvocationId, RecoveryStep, SchedulerEvent, SchedulerOptions,
    SchedulerSnapshot,
};
use cadence_core::graphics::{ProbeError, ResourceStatus};
use cadence_core::ManualClock;
use cadence_services::{
    ContextLossCoordinator, NoopRecoveryHooks, RecoveryCoordinator, RecoveryError, RecoveryHooks,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn snapshot() -> SchedulerSnapshot {
    FrameScheduler::new(SchedulerOptions::default(), Arc::new(ManualClock::new(0.0)))
        .unwrap()
        .snapshot()
}

#[derive(Default)]
struct RecordingHooks {
    performed: Mutex<Vec<RecoveryStep>>,
    fail_at: Option<RecoveryStep>,
}

impl RecoveryHooks for RecordingHooks {
    fn perform(&self, step: RecoveryStep, _snapshot: &SchedulerSnapshot) -> Result<(), RecoveryError> {
        if self.fail_at == Some(step) {
            return Err(RecoveryError::StepFailed {
                step: step.name(),
                reason: "device busy".into(),
            });
        }
        self.performed.lock().unwrap().push(step);
        Ok(())
    }
}

fn progress_values(events: &[SchedulerEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|event| match event {
            SchedulerEvent::RecoveryProgress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_recovery_reports_four_steps_then_success() {
    let hooks = Arc::new(RecordingHooks::default());
    let coordinator = RecoveryCoordinator::new(Duration::from_millis(50), hooks.clone());
    let (tx, rx) = flume::unbounded();

    coordinator.run(InvocationId(7), snapshot(), tx).await;
    let events: Vec<SchedulerEvent> = rx.drain().collect();

    assert_eq!(progress_values(&events), vec![0.25, 0.5, 0.75, 1.0]);
    assert_eq!(*hooks.performed.lock().unwrap(), RecoveryStep::ALL.to_vec());
    match events.last() {
        Some(SchedulerEvent::RecoveryResolved {
            invocation,
            outcome: Ok(report),
        }) => {
            assert_eq!(*invocation, InvocationId(7));
            assert_eq!(report.completed_steps, RecoveryStep::ALL.to_vec());
            assert_eq!(report.recovered_systems.len(), 6);
            assert!(report.elapsed_ms >= 200.0);
        }
        other => panic!("unexpected last event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failing_step_resolves_with_error_and_stops_progress() {
    let hooks = Arc::new(RecordingHooks {
        fail_at: Some(RecoveryStep::ReinitializeLoop),
        ..Default::default()
    });
    let coordinator = RecoveryCoordinator::new(Duration::from_millis(10), hooks);
    let (tx, rx) = flume::unbounded();

    coordinator.run(InvocationId(1), snapshot(), tx).await;
    let events: Vec<SchedulerEvent> = rx.drain().collect();

    assert_eq!(progress_values(&events), vec![0.25]);
    match events.last() {
        Some(SchedulerEvent::RecoveryResolved {
            outcome: Err(reason),
            ..
        }) => assert!(reason.contains("reinitialize_loop"), "{reason}"),
        other => panic!("unexpected last event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_invalid_snapshot_fails_validation() {
    let mut snapshot = snapshot();
    snapshot.context.config.target_fps = 0.0;
    let (tx, rx) = flume::unbounded();

    RecoveryCoordinator::default()
        .run(InvocationId(2), snapshot, tx)
        .await;
    let events: Vec<SchedulerEvent> = rx.drain().collect();

    assert_eq!(progress_values(&events), vec![0.25, 0.5]);
    assert!(matches!(
        events.last(),
        Some(SchedulerEvent::RecoveryResolved { outcome: Err(_), .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_recovery_stops_when_scheduler_is_gone() {
    let (tx, rx) = flume::unbounded();
    drop(rx);
    RecoveryCoordinator::new(Duration::from_millis(10), Arc::new(NoopRecoveryHooks))
        .run(InvocationId(3), snapshot(), tx)
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_aborted_recovery_sends_nothing() {
    let (tx, rx) = flume::unbounded();
    let handle = RecoveryCoordinator::default().spawn(InvocationId(4), snapshot(), tx);
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
    assert!(rx.drain().next().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_context_probe_resolves_after_resources_return() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let probe = move || -> Result<ResourceStatus, ProbeError> {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            Ok(ResourceStatus {
                renderer: true,
                ..Default::default()
            })
        } else {
            Ok(ResourceStatus::READY)
        }
    };
    let coordinator = ContextLossCoordinator::new(Duration::from_millis(100), Arc::new(probe));
    let (tx, rx) = flume::unbounded();

    coordinator.run(InvocationId(9), tx).await;

    match rx.try_recv() {
        Ok(SchedulerEvent::ContextProbeResolved {
            invocation,
            outcome: Ok(report),
        }) => {
            assert_eq!(invocation, InvocationId(9));
            assert_eq!(report.polls, 3);
            assert!(report.elapsed_ms >= 200.0);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_context_probe_error_resolves_with_failure() {
    let probe =
        || -> Result<ResourceStatus, ProbeError> { Err(ProbeError("adapter unavailable".into())) };
    let coordinator = ContextLossCoordinator::new(Duration::from_millis(100), Arc::new(probe));
    let (tx, rx) = flume::unbounded();

    coordinator.run(InvocationId(5), tx).await;

    match rx.try_recv() {
        Ok(SchedulerEvent::ContextProbeResolved {
            outcome: Err(reason),
            ..
        }) => assert!(reason.contains("adapter unavailable")),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_context_probe_keeps_polling_while_resources_are_missing() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let probe = move || -> Result<ResourceStatus, ProbeError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(ResourceStatus::default())
    };
    let coordinator = ContextLossCoordinator::new(Duration::from_millis(100), Arc::new(probe));
    let (tx, rx) = flume::unbounded();

    let handle = coordinator.spawn(InvocationId(6), tx);
    tokio::time::sleep(Duration::from_millis(1050)).await;
    handle.abort();

    assert!(rx.drain().next().is_none());
    assert!(calls.load(Ordering::SeqCst) >= 10);
}
