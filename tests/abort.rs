use std::time::Duration;

use pretty_assertions::assert_eq;
use vim_core::{EditorOps, Engine, Mode};

mod support;
use support::mock_buffer::MockBuffer;

fn run(buf: &mut MockBuffer, eng: &mut Engine, keys: &str) {
    eng.feed_keys(buf, keys).unwrap();
}

fn assert_idle(eng: &Engine) {
    assert_eq!(eng.mode(), Mode::Normal);
    assert_eq!(eng.pending_keys(), "");
    assert_eq!(eng.pending_timeout(), None);
    assert_eq!(eng.cmdline_text(), None);
}

#[test]
fn test_abort_pending_operator() {
    let mut buf = MockBuffer::new("one two");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "2d");
    assert!(matches!(eng.mode(), Mode::OperatorPending { .. }));
    eng.abort(&mut buf);
    assert_idle(&eng);

    run(&mut buf, &mut eng, "w");
    assert_eq!(buf.text(), "one two");
    assert_eq!(buf.cursor(), (0, 4));
}

#[test]
fn test_abort_ambiguous_mapping() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "inoremap jk <Esc>").unwrap();
    run(&mut buf, &mut eng, "ij");
    assert_eq!(eng.pending_timeout(), Some(Duration::from_millis(1000)));
    eng.abort(&mut buf);
    assert_idle(&eng);
    assert_eq!(buf.text(), "");
}

#[test]
fn test_abort_visual() {
    let mut buf = MockBuffer::new("abcdef");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "vll");
    assert!(buf.selection().is_some());
    eng.abort(&mut buf);
    assert_idle(&eng);
    assert!(buf.selection().is_none());
    assert_eq!(buf.text(), "abcdef");
}

#[test]
fn test_abort_insert_keeps_typed_text() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "ihello");
    assert_eq!(eng.mode(), Mode::Insert);
    eng.abort(&mut buf);
    assert_idle(&eng);
    assert_eq!(buf.text(), "hello");
    assert_eq!(buf.cursor(), (0, 4));
}

#[test]
fn test_abort_command_line() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, ":s/a/b");
    assert_eq!(eng.cmdline_text().as_deref(), Some(":s/a/b"));
    eng.abort(&mut buf);
    assert_idle(&eng);
    assert_eq!(buf.text(), "abc");
}
