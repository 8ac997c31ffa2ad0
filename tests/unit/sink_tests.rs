use coder_bridge::engine::{BufferSink, NullSink, OutputSink};
use coder_bridge::notify::{Notifier, NotifierSink};

#[test]
fn buffer_sink_accumulates_lines() {
    let mut sink = BufferSink::new();

    sink.emit_output("first");
    sink.emit_output("second");
    sink.emit_error("oops");

    assert_eq!(sink.output(), "first\nsecond\n");
    assert_eq!(sink.errors(), "oops\n");
}

#[test]
fn null_sink_discards_everything() {
    let mut sink = NullSink;

    sink.emit_output("gone");
    sink.emit_error("also gone");
}

#[test]
fn notifier_sink_forwards_tokens_in_order() {
    let (notifier, mut rx) = Notifier::channel();
    let mut sink = NotifierSink::new(notifier);

    sink.emit_output("alpha");
    sink.emit_output("beta");

    let first = rx.try_recv().expect("first frame");
    let second = rx.try_recv().expect("second frame");
    assert!(rx.try_recv().is_err());

    assert_eq!(first["method"], "stream");
    assert_eq!(first["params"]["type"], "token");
    assert_eq!(first["params"]["content"], "alpha");
    assert!(first["params"]["timestamp"].is_number());
    assert_eq!(second["params"]["content"], "beta");
}

#[test]
fn notifier_sink_routes_errors_as_notifications() {
    let (notifier, mut rx) = Notifier::channel();
    let mut sink = NotifierSink::new(notifier);

    sink.emit_error("engine stderr line");

    let frame = rx.try_recv().expect("notification frame");
    assert_eq!(frame["method"], "notification");
    assert_eq!(frame["params"]["level"], "error");
    assert_eq!(frame["params"]["message"], "engine stderr line");
}
