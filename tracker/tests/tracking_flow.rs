mod common;

use common::{ScriptedSource, c, failed_sample, sample};
use tracker::{
    PermissionStatus, TrackingState,
    config::{DEFAULT_FALLBACK, TrackerConfig},
    controller::{SampleOutcome, TrackingController},
    error::{ConfigError, TrackerError},
    route_store::RetentionPolicy,
};

async fn tracking(source: ScriptedSource) -> TrackingController<ScriptedSource> {
    let mut controller = TrackingController::new(source, &TrackerConfig::default());
    assert_eq!(controller.initialize().await, PermissionStatus::Granted);
    controller.start().await.expect("start tracking");
    controller
}

#[tokio::test]
async fn duplicate_sample_is_collapsed() {
    let mut controller = TrackingController::new(ScriptedSource::granted(), &TrackerConfig::default());
    controller.initialize().await;
    assert_eq!(controller.current_location(), c(49.8397, 24.0297));
    assert_eq!(controller.route_len(), 0);

    controller.start().await.unwrap();
    assert_eq!(controller.on_sample(sample(49.84, 24.03)), SampleOutcome::Appended);
    assert_eq!(controller.on_sample(sample(49.84, 24.03)), SampleOutcome::Duplicate);
    assert_eq!(controller.on_sample(sample(49.85, 24.04)), SampleOutcome::Appended);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.route.points(), &[c(49.84, 24.03), c(49.85, 24.04)]);
    assert_eq!(snapshot.current_location, c(49.85, 24.04));
}

#[tokio::test]
async fn sample_while_idle_is_ignored() {
    let mut controller = TrackingController::new(ScriptedSource::granted(), &TrackerConfig::default());
    controller.initialize().await;

    assert_eq!(controller.on_sample(sample(49.84, 24.03)), SampleOutcome::Ignored);
    assert!(controller.snapshot().route.is_empty());
    assert_eq!(controller.current_location(), DEFAULT_FALLBACK);
}

#[tokio::test]
async fn non_consecutive_repeat_is_kept() {
    let mut controller = tracking(ScriptedSource::granted()).await;
    for (lat, lon) in [(1.0, 1.0), (2.0, 2.0), (1.0, 1.0)] {
        controller.on_sample(sample(lat, lon));
    }
    assert_eq!(
        controller.snapshot().route.points(),
        &[c(1.0, 1.0), c(2.0, 2.0), c(1.0, 1.0)]
    );
}

#[tokio::test]
async fn subscription_failure_leaves_controller_idle() {
    let source = ScriptedSource {
        fail_subscribe: true,
        ..ScriptedSource::granted()
    };
    let mut controller = TrackingController::new(source, &TrackerConfig::default());
    controller.initialize().await;

    let result = controller.start().await;
    assert!(matches!(result, Err(TrackerError::Subscription(_))));
    assert_eq!(controller.state(), TrackingState::Idle);
    assert_eq!(controller.on_sample(sample(1.0, 1.0)), SampleOutcome::Ignored);
    assert!(controller.snapshot().route.is_empty());
}

#[tokio::test]
async fn denied_permission_makes_tracking_a_noop() {
    let source = ScriptedSource::denied();
    let recorder = source.recorder.clone();
    let mut controller = TrackingController::new(source, &TrackerConfig::default());

    assert_eq!(controller.initialize().await, PermissionStatus::Denied);
    assert!(matches!(controller.start().await, Err(TrackerError::PermissionDenied)));
    assert!(matches!(controller.start().await, Err(TrackerError::PermissionDenied)));
    controller.stop();

    assert_eq!(controller.state(), TrackingState::Idle);
    assert_eq!(controller.permission(), PermissionStatus::Denied);
    assert_eq!(recorder.prompts(), 1);
    assert_eq!(recorder.subscriptions(), 0);
}

#[tokio::test]
async fn start_before_initialize_is_refused() {
    let mut controller = TrackingController::new(ScriptedSource::granted(), &TrackerConfig::default());
    assert_eq!(controller.permission(), PermissionStatus::Unknown);
    assert!(matches!(controller.start().await, Err(TrackerError::PermissionUnresolved)));
    assert_eq!(controller.state(), TrackingState::Idle);
}

#[tokio::test]
async fn initial_fix_replaces_fallback() {
    let source = ScriptedSource {
        fix: Some(c(45.93, 4.577)),
        ..ScriptedSource::granted()
    };
    let mut controller = TrackingController::new(source, &TrackerConfig::default());
    controller.initialize().await;
    assert_eq!(controller.current_location(), c(45.93, 4.577));
    assert!(controller.snapshot().route.is_empty());
}

#[tokio::test]
async fn stop_releases_subscription_and_filters_late_samples() {
    let source = ScriptedSource::granted();
    let recorder = source.recorder.clone();
    let mut controller = tracking(source).await;
    controller.on_sample(sample(1.0, 1.0));

    controller.stop();
    assert_eq!(controller.state(), TrackingState::Idle);
    assert_eq!(recorder.cancellations(), 1);
    assert!(!recorder.emit(sample(2.0, 2.0)));

    // An in-flight callback that slipped past cancellation.
    assert_eq!(controller.on_sample(sample(3.0, 3.0)), SampleOutcome::Ignored);
    assert_eq!(controller.snapshot().route.points(), &[c(1.0, 1.0)]);
}

#[tokio::test]
async fn stop_is_idempotent() {
    let source = ScriptedSource::granted();
    let recorder = source.recorder.clone();
    let mut controller = TrackingController::new(source, &TrackerConfig::default());
    controller.initialize().await;

    controller.stop();
    assert_eq!(recorder.cancellations(), 0);

    controller.start().await.unwrap();
    controller.stop();
    controller.stop();
    assert_eq!(recorder.cancellations(), 1);
    assert_eq!(controller.state(), TrackingState::Idle);
}

#[tokio::test]
async fn start_twice_subscribes_once() {
    let source = ScriptedSource::granted();
    let recorder = source.recorder.clone();
    let mut controller = tracking(source).await;
    controller.start().await.unwrap();
    assert_eq!(recorder.subscriptions(), 1);
    assert_eq!(controller.state(), TrackingState::Tracking);
}

#[tokio::test]
async fn reset_is_idempotent_and_keeps_state() {
    let mut controller = tracking(ScriptedSource::granted()).await;
    controller.on_sample(sample(1.0, 1.0));
    controller.on_sample(sample(2.0, 2.0));

    for _ in 0..3 {
        controller.reset();
        assert!(controller.snapshot().route.is_empty());
        assert_eq!(controller.state(), TrackingState::Tracking);
    }

    controller.stop();
    controller.reset();
    assert_eq!(controller.state(), TrackingState::Idle);
}

#[tokio::test]
async fn failed_sample_keeps_tracking() {
    let source = ScriptedSource::granted();
    let recorder = source.recorder.clone();
    let mut controller = tracking(source).await;

    assert_eq!(controller.on_sample(failed_sample()), SampleOutcome::Failed);
    assert_eq!(controller.state(), TrackingState::Tracking);
    assert_eq!(controller.on_sample(sample(1.0, 1.0)), SampleOutcome::Appended);
    assert_eq!(recorder.cancellations(), 0);
}

#[tokio::test]
async fn snapshot_is_not_affected_by_later_samples() {
    let mut controller = tracking(ScriptedSource::granted()).await;
    controller.on_sample(sample(1.0, 1.0));
    let before = controller.snapshot();

    controller.on_sample(sample(2.0, 2.0));
    controller.reset();

    assert_eq!(before.route.points(), &[c(1.0, 1.0)]);
    assert_eq!(before.current_location, c(1.0, 1.0));
}

#[tokio::test]
async fn next_sample_reads_live_subscription() {
    let source = ScriptedSource::granted();
    let recorder = source.recorder.clone();
    let mut controller = tracking(source).await;

    assert!(recorder.emit(sample(1.0, 1.0)));
    let event = controller.next_sample().await.expect("sample");
    assert_eq!(controller.on_sample(event), SampleOutcome::Appended);
}

#[tokio::test]
async fn closed_stream_stops_tracking() {
    let source = ScriptedSource::granted().with_script(&[(1.0, 1.0)]);
    let recorder = source.recorder.clone();
    let mut controller = tracking(source).await;

    let event = controller.next_sample().await.expect("scripted sample");
    controller.on_sample(event);
    assert!(controller.next_sample().await.is_none());
    assert_eq!(controller.state(), TrackingState::Idle);
    assert_eq!(recorder.cancellations(), 1);
    assert_eq!(controller.snapshot().route.points(), &[c(1.0, 1.0)]);
}

#[tokio::test]
async fn dropping_controller_cancels_subscription() {
    let source = ScriptedSource::granted();
    let recorder = source.recorder.clone();
    let controller = tracking(source).await;

    drop(controller);
    assert_eq!(recorder.cancellations(), 1);
}

#[tokio::test]
async fn zero_route_window_never_reports_appended() {
    let result = TrackerConfig::from_lookup(|key: &str| {
        (key == "TRACKER_MAX_ROUTE_POINTS").then(|| "0".to_string())
    });
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

    let settings = TrackerConfig {
        retention: RetentionPolicy::KeepLast(0),
        ..TrackerConfig::default()
    };
    let mut controller = TrackingController::new(ScriptedSource::granted(), &settings);
    controller.initialize().await;
    controller.start().await.unwrap();

    assert_ne!(controller.on_sample(sample(1.0, 1.0)), SampleOutcome::Appended);
    assert_eq!(controller.route_len(), 0);
    assert_eq!(controller.current_location(), c(1.0, 1.0));
}
