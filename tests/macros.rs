use pretty_assertions::assert_eq;
use vim_core::{EditorOps, Engine, EngineError, Mode};

mod support;
use support::mock_buffer::MockBuffer;

fn run(buf: &mut MockBuffer, eng: &mut Engine, keys: &str) {
    eng.feed_keys(buf, keys).unwrap();
}

fn register(eng: &Engine, name: char) -> Option<String> {
    eng.shared().lock().read_register(name).unwrap().map(|r| r.text)
}

#[test]
fn test_record_and_replay() {
    let mut buf = MockBuffer::new("abcdef");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "qa");
    assert_eq!(eng.recording(), Some('a'));
    assert_eq!(eng.snapshot().recording, Some('a'));
    run(&mut buf, &mut eng, "xq");
    assert_eq!(eng.recording(), None);
    assert_eq!(buf.text(), "bcdef");
    assert_eq!(register(&eng, 'a').as_deref(), Some("x"));

    run(&mut buf, &mut eng, "@a");
    assert_eq!(buf.text(), "cdef");
    run(&mut buf, &mut eng, "2@a");
    assert_eq!(buf.text(), "ef");
    run(&mut buf, &mut eng, "@@");
    assert_eq!(buf.text(), "f");
}

#[test]
fn test_macro_with_insert_and_motion() {
    let mut buf = MockBuffer::new("a\nb\nc");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "qbA!<Esc>jq");
    assert_eq!(buf.text(), "a!\nb\nc");
    assert_eq!(buf.cursor(), (1, 0));

    run(&mut buf, &mut eng, "@b");
    assert_eq!(buf.text(), "a!\nb!\nc");
    assert_eq!(buf.cursor(), (2, 0));
    assert_eq!(eng.mode(), Mode::Normal);
}

#[test]
fn test_failing_key_aborts_the_rest_of_the_macro() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "let @a = 'lllx'").unwrap();
    assert_eq!(
        eng.feed_keys(&mut buf, "@a").unwrap_err(),
        EngineError::MotionFailed
    );
    assert_eq!(buf.text(), "abc");
    assert_eq!(buf.cursor(), (0, 2));
    assert_eq!(eng.pending_keys(), "");
}

#[test]
fn test_register_set_from_script_runs_as_macro() {
    let mut buf = MockBuffer::new("one\ntwo\nthree");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "let @b = 'dd'").unwrap();
    run(&mut buf, &mut eng, "@b");
    assert_eq!(buf.text(), "two\nthree");
}

#[test]
fn test_self_invoking_macro_is_too_recursive() {
    let mut buf = MockBuffer::new("text");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "let @a = '@a'").unwrap();
    let err = eng.feed_keys(&mut buf, "@a").unwrap_err();
    assert_eq!(err, EngineError::MacroTooDeep);
    assert_eq!(err.to_string(), "E169: Command too recursive");
    assert_eq!(eng.mode(), Mode::Normal);
    assert_eq!(eng.pending_keys(), "");
    assert_eq!(buf.text(), "text");
    assert_eq!(buf.beeps, 1);
}

#[test]
fn test_executing_empty_register() {
    let mut buf = MockBuffer::new("text");
    let mut eng = Engine::new();

    assert_eq!(
        eng.feed_keys(&mut buf, "@@").unwrap_err(),
        EngineError::EmptyRegister('@')
    );
    assert_eq!(
        eng.feed_keys(&mut buf, "@z").unwrap_err(),
        EngineError::EmptyRegister('z')
    );
}

#[test]
fn test_at_colon_repeats_command_line() {
    let mut buf = MockBuffer::new("a-a\na-a");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "s/-/+/").unwrap();
    run(&mut buf, &mut eng, "j@:");
    assert_eq!(buf.text(), "a+a\na+a");
}

#[test]
fn test_recursive_macro_keeps_edits_made_before_the_limit() {
    let mut buf = MockBuffer::new(&"x".repeat(300));
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "let @a = \"x@a\"").unwrap();
    let err = eng.feed_keys(&mut buf, "@a").unwrap_err();
    assert_eq!(err, EngineError::MacroTooDeep);
    assert_eq!(buf.text(), "x".repeat(200));
    assert_eq!(eng.mode(), Mode::Normal);
    assert_eq!(eng.pending_keys(), "");
}
