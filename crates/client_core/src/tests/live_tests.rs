use super::*;

fn text(raw: &str) -> LiveFrame {
    LiveFrame::Text(raw.to_string())
}

#[test]
fn start_moves_idle_to_decoding() {
    let mut live = LiveInterpreter::new();
    assert_eq!(live.state(), LiveState::Idle);

    let outcome = live.handle(text("decode_start:Martin1"));

    assert_eq!(
        outcome,
        LiveOutcome::Started {
            label: "Martin1".to_string()
        }
    );
    assert_eq!(live.state(), LiveState::Decoding);
}

#[test]
fn progress_is_clamped_and_last_write_wins() {
    let mut live = LiveInterpreter::new();
    live.handle(text("decode_start:Martin1"));

    live.handle(text("decode_progress:0.5"));
    assert_eq!(live.progress(), 0.5);
    assert_eq!(live.progress_percent(), 50.0);

    assert_eq!(
        live.handle(text("decode_progress:1.5")),
        LiveOutcome::Progress { fraction: 1.0 }
    );
    assert_eq!(live.progress(), 1.0);

    live.handle(text("decode_progress:-0.2"));
    assert_eq!(live.progress(), 0.0);

    live.handle(text("decode_progress:0.75"));
    live.handle(text("decode_progress:0.25"));
    assert_eq!(live.progress(), 0.25);
    assert_eq!(live.state(), LiveState::Decoding);
}

#[test]
fn binary_resets_progress_from_decoding() {
    let mut live = LiveInterpreter::new();
    live.handle(text("decode_start:Martin1"));
    live.handle(text("decode_progress:0.9"));

    let outcome = live.handle(LiveFrame::Binary(vec![1, 2, 3]));

    assert_eq!(
        outcome,
        LiveOutcome::ImageCompleted {
            pixels: vec![1, 2, 3]
        }
    );
    assert_eq!(live.progress(), 0.0);
    assert_eq!(live.state(), LiveState::Idle);
}

#[test]
fn binary_in_idle_is_tolerated() {
    let mut live = LiveInterpreter::new();
    let outcome = live.handle(LiveFrame::Binary(vec![7; 6]));
    assert!(matches!(outcome, LiveOutcome::ImageCompleted { .. }));
    assert_eq!(live.progress(), 0.0);
    assert_eq!(live.state(), LiveState::Idle);
}

#[test]
fn malformed_control_text_changes_nothing() {
    let mut live = LiveInterpreter::new();
    live.handle(text("decode_start:Martin1"));
    live.handle(text("decode_progress:0.4"));

    let outcome = live.handle(text("decode_banana:3"));

    assert!(matches!(
        outcome,
        LiveOutcome::Rejected(ViewerError::MalformedControlMessage { .. })
    ));
    assert_eq!(live.state(), LiveState::Decoding);
    assert_eq!(live.progress(), 0.4);

    let outcome = live.handle(text("decode_progress:abc"));
    assert!(matches!(outcome, LiveOutcome::Rejected(_)));
    assert_eq!(live.progress(), 0.4);
}

#[test]
fn closed_channel_is_terminal() {
    let mut live = LiveInterpreter::new();
    live.handle(text("decode_start:Martin1"));

    let outcome = live.handle(LiveFrame::Closed {
        reason: Some("server going away".to_string()),
    });
    match outcome {
        LiveOutcome::Disconnected(err) => assert!(err.escalates()),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(live.state(), LiveState::Disconnected);

    assert_eq!(live.handle(text("decode_start:Martin1")), LiveOutcome::Ignored);
    assert_eq!(live.handle(LiveFrame::Binary(vec![0; 3])), LiveOutcome::Ignored);
    assert_eq!(live.state(), LiveState::Disconnected);
}

#[test]
fn progress_before_start_enters_decoding() {
    let mut live = LiveInterpreter::new();
    live.handle(text("decode_progress:0.3"));
    assert_eq!(live.state(), LiveState::Decoding);
    assert!((live.progress() - 0.3).abs() < f32::EPSILON);
}
