use std::time::Duration;

use kanal::unbounded_async;
use textgrab_types::{OcrError, Point, SelectionRect, Severity};
use tokio::time::timeout;

use crate::fakes::{FixedRecognizer, Harness, ready_dispatcher};
use crate::dispatch::{BackendRegistry, OcrDispatcher};
use crate::events::AppEvent;
use crate::overlay::{OverlayInput, OverlayOutcome, SelectionOverlay};
use crate::session::{SessionState, TriggerOutcome};

use SessionState::*;

fn selected(x: f64, y: f64, width: f64, height: f64) -> OverlayOutcome {
    OverlayOutcome::Selected(SelectionRect {
        x,
        y,
        width,
        height,
    })
}

#[tokio::test]
async fn test_no_backend_aborts_before_capture() {
    let harness = Harness::default();
    let mut session = harness.session();
    let dispatcher = OcrDispatcher::new(BackendRegistry::new());

    assert_eq!(session.trigger(&dispatcher), TriggerOutcome::Aborted);
    assert_eq!(session.last_run(), &[Idle, Aborted, Idle]);
    assert_eq!(harness.recorder.captures(), 0);
    assert!(harness.recorder.clipboard().is_empty());

    let notices = harness.recorder.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "No OCR Backend");
}

#[tokio::test]
async fn test_recognized_text_reaches_clipboard() {
    let harness = Harness::default();
    let mut session = harness.session();
    let recognizer = FixedRecognizer::ok("こんにちは\n");
    let dispatcher = ready_dispatcher(recognizer.clone()).await;

    assert_eq!(session.trigger(&dispatcher), TriggerOutcome::Selecting);
    assert_eq!(session.state(), Selecting);

    let job = session
        .selection_finished(selected(100.0, 100.0, 200.0, 150.0), &dispatcher)
        .unwrap();
    assert_eq!(session.state(), Dispatching);

    session.recognition_finished(job.run().await);

    assert_eq!(harness.recorder.clipboard(), vec!["こんにちは".to_string()]);
    assert_eq!(
        session.last_run(),
        &[Idle, Triggered, Captured, Selecting, Dispatching, Done, Idle]
    );
    assert!(session.is_idle());

    // 1920x1080 display over a 3840x2160 bitmap doubles the region
    assert_eq!(recognizer.seen_sizes(), vec![(400, 300)]);

    let notices = harness.recorder.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "OCR Complete");
    assert_eq!(notices[0].severity, Severity::Info);
    harness.recorder.with(|o| assert!(o.hides >= 1 && o.shows == 1));
}

#[tokio::test]
async fn test_trigger_while_active_is_ignored() {
    let harness = Harness::default();
    let mut session = harness.session();
    let dispatcher = ready_dispatcher(FixedRecognizer::ok("text")).await;

    session.trigger(&dispatcher);
    assert_eq!(session.trigger(&dispatcher), TriggerOutcome::Ignored);
    assert_eq!(harness.recorder.captures(), 1);

    let job = session
        .selection_finished(selected(0.0, 0.0, 10.0, 10.0), &dispatcher)
        .unwrap();
    assert_eq!(session.trigger(&dispatcher), TriggerOutcome::Ignored);
    session.recognition_finished(job.run().await);

    assert_eq!(session.trigger(&dispatcher), TriggerOutcome::Selecting);
    assert_eq!(harness.recorder.captures(), 2);
}

#[tokio::test]
async fn test_degenerate_selection_skips_dispatch() {
    let harness = Harness::default();
    let mut session = harness.session();
    let recognizer = FixedRecognizer::ok("text");
    let dispatcher = ready_dispatcher(recognizer.clone()).await;

    session.trigger(&dispatcher);
    let job = session.selection_finished(selected(50.0, 50.0, 0.0, 120.0), &dispatcher);

    assert!(job.is_none());
    assert!(recognizer.seen_sizes().is_empty());
    assert!(harness.recorder.notices().is_empty());
    assert_eq!(session.last_run(), &[Idle, Triggered, Captured, Selecting, Aborted, Idle]);
}

#[tokio::test]
async fn test_cancel_hides_overlay_without_notice() {
    let harness = Harness::default();
    let mut session = harness.session();
    let dispatcher = ready_dispatcher(FixedRecognizer::ok("text")).await;

    session.trigger(&dispatcher);
    assert!(session.selection_finished(OverlayOutcome::Cancelled, &dispatcher).is_none());

    assert!(session.is_idle());
    assert!(harness.recorder.notices().is_empty());
    assert!(harness.recorder.clipboard().is_empty());
    harness.recorder.with(|o| assert_eq!(o.hides, 1));
}

#[tokio::test]
async fn test_overlay_closed_mid_drag_frees_the_trigger() {
    let harness = Harness::default();
    let mut session = harness.session();
    let dispatcher = ready_dispatcher(FixedRecognizer::ok("text")).await;
    assert_eq!(session.trigger(&dispatcher), TriggerOutcome::Selecting);

    let mut gesture = SelectionOverlay::new();
    gesture.handle(OverlayInput::PointerDown(Point::new(10.0, 10.0)));
    gesture.handle(OverlayInput::PointerMove(Point::new(80.0, 60.0)));
    let outcome = gesture.handle(OverlayInput::Escape).unwrap();

    assert!(session.selection_finished(outcome, &dispatcher).is_none());
    assert_eq!(
        session.last_run(),
        &[Idle, Triggered, Captured, Selecting, Aborted, Idle]
    );
    assert!(harness.recorder.notices().is_empty());

    assert_eq!(session.trigger(&dispatcher), TriggerOutcome::Selecting);
    assert_eq!(harness.recorder.captures(), 2);
}

#[tokio::test]
async fn test_capture_failure_aborts_with_one_notice() {
    let harness = Harness::default().capture_fails();
    let mut session = harness.session();
    let dispatcher = ready_dispatcher(FixedRecognizer::ok("text")).await;

    assert_eq!(session.trigger(&dispatcher), TriggerOutcome::Aborted);
    assert_eq!(session.last_run(), &[Idle, Triggered, Aborted, Idle]);
    assert!(harness.recorder.clipboard().is_empty());

    let notices = harness.recorder.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Error);
    harness.recorder.with(|o| assert_eq!(o.shows, 0));
}

#[tokio::test]
async fn test_overlay_failure_aborts() {
    let harness = Harness::default().overlay_fails();
    let mut session = harness.session();
    let dispatcher = ready_dispatcher(FixedRecognizer::ok("text")).await;

    assert_eq!(session.trigger(&dispatcher), TriggerOutcome::Aborted);
    assert_eq!(session.last_run(), &[Idle, Triggered, Captured, Aborted, Idle]);
    assert_eq!(harness.recorder.notices().len(), 1);
    harness.recorder.with(|o| assert_eq!(o.hides, 1));
}

#[tokio::test]
async fn test_empty_result_is_silent() {
    let harness = Harness::default();
    let mut session = harness.session();
    let dispatcher = ready_dispatcher(FixedRecognizer::ok("   ")).await;

    session.trigger(&dispatcher);
    let job = session
        .selection_finished(selected(10.0, 10.0, 40.0, 40.0), &dispatcher)
        .unwrap();
    let result = job.run().await;
    assert_eq!(result, Err(OcrError::EmptyResult));

    session.recognition_finished(result);
    assert_eq!(session.last_run().iter().rev().nth(1), Some(&Done));
    assert!(harness.recorder.clipboard().is_empty());
    assert!(harness.recorder.notices().is_empty());
}

#[tokio::test]
async fn test_backend_failure_aborts_with_one_notice() {
    let harness = Harness::default();
    let mut session = harness.session();
    let dispatcher = ready_dispatcher(FixedRecognizer::failing("model crashed")).await;

    session.trigger(&dispatcher);
    let job = session
        .selection_finished(selected(10.0, 10.0, 40.0, 40.0), &dispatcher)
        .unwrap();
    session.recognition_finished(job.run().await);

    assert_eq!(session.last_run().iter().rev().nth(1), Some(&Aborted));
    assert!(harness.recorder.clipboard().is_empty());

    let notices = harness.recorder.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "OCR Error");
    assert!(notices[0].message.contains("model crashed"));
}

#[tokio::test]
async fn test_clipboard_failure_still_completes() {
    let harness = Harness::default().clipboard_fails();
    let mut session = harness.session();
    let dispatcher = ready_dispatcher(FixedRecognizer::ok("text")).await;

    session.trigger(&dispatcher);
    let job = session
        .selection_finished(selected(10.0, 10.0, 40.0, 40.0), &dispatcher)
        .unwrap();
    session.recognition_finished(job.run().await);

    assert_eq!(session.last_run().iter().rev().nth(1), Some(&Done));
    let notices = harness.recorder.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Warning);
}

#[tokio::test]
async fn test_stray_results_are_ignored() {
    let harness = Harness::default();
    let mut session = harness.session();
    let dispatcher = ready_dispatcher(FixedRecognizer::ok("text")).await;

    assert!(session.selection_finished(selected(0.0, 0.0, 5.0, 5.0), &dispatcher).is_none());
    session.recognition_finished(Ok("late".to_string()));

    assert!(session.is_idle());
    assert!(session.last_run().is_empty());
    assert!(harness.recorder.clipboard().is_empty());
}

/// Full loop the way the app runs it: overlay input on the UI side,
/// recognition on a worker task, results back over kanal
#[tokio::test]
async fn test_event_loop_round_trip() {
    let harness = Harness::default();
    let mut session = harness.session();
    let dispatcher = ready_dispatcher(FixedRecognizer::ok("テスト")).await;
    let (tx, rx) = unbounded_async::<AppEvent>();

    tx.send(AppEvent::Trigger).await.unwrap();

    let mut overlay = SelectionOverlay::new();
    while let Ok(Ok(event)) = timeout(Duration::from_secs(1), rx.recv()).await {
        match event {
            AppEvent::Trigger => {
                assert_eq!(session.trigger(&dispatcher), TriggerOutcome::Selecting);
                overlay.handle(OverlayInput::PointerDown(Point::new(400.0, 300.0)));
                overlay.handle(OverlayInput::PointerMove(Point::new(200.0, 250.0)));
                let outcome = overlay
                    .handle(OverlayInput::PointerUp(Point::new(100.0, 200.0)))
                    .unwrap();
                tx.send(AppEvent::SelectionFinished(outcome)).await.unwrap();
            }
            AppEvent::SelectionFinished(outcome) => {
                let job = session.selection_finished(outcome, &dispatcher).unwrap();
                assert_eq!(job.region().width, 600);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = job.run().await;
                    tx.send(AppEvent::RecognitionFinished(result)).await.unwrap();
                });
            }
            AppEvent::RecognitionFinished(result) => {
                session.recognition_finished(result);
                break;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    assert!(session.is_idle());
    assert_eq!(harness.recorder.clipboard(), vec!["テスト".to_string()]);
}
