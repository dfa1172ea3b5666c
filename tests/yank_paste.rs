use pretty_assertions::assert_eq;
use vim_core::{EditorOps, Engine, EngineError, Mode, RegisterType};

mod support;
use support::mock_buffer::MockBuffer;
use support::mock_clipboard::MockClipboard;

fn run(buf: &mut MockBuffer, eng: &mut Engine, keys: &str) {
    eng.feed_keys(buf, keys).unwrap();
}

fn register(eng: &Engine, name: char) -> Option<String> {
    eng.shared().lock().read_register(name).unwrap().map(|r| r.text)
}

#[test]
fn test_yy_yanks_line() {
    let mut buf = MockBuffer::new("line one\nline two\nline three").with_caret(1, 0);
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "yy");
    assert_eq!(register(&eng, '"').as_deref(), Some("line two\n"));
    assert_eq!(register(&eng, '0').as_deref(), Some("line two\n"));
    assert_eq!(buf.text(), "line one\nline two\nline three");
}

#[test]
fn test_yw_leaves_caret_at_start() {
    let mut buf = MockBuffer::new("hello world");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "wyb");
    assert_eq!(register(&eng, '"').as_deref(), Some("hello "));
    assert_eq!(buf.cursor(), (0, 0));
}

#[test]
fn test_small_delete_register() {
    let mut buf = MockBuffer::new("hello world");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "dw");
    assert_eq!(register(&eng, '-').as_deref(), Some("hello "));
    assert_eq!(register(&eng, '1').as_deref(), Some("hello "));
}

#[test]
fn test_line_deletes_rotate_numbered_registers() {
    let mut buf = MockBuffer::new("one\ntwo\nthree");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "dddd");
    assert_eq!(buf.text(), "three");
    assert_eq!(register(&eng, '1').as_deref(), Some("two\n"));
    assert_eq!(register(&eng, '2').as_deref(), Some("one\n"));
    assert_eq!(register(&eng, '-'), None);

    run(&mut buf, &mut eng, "\"2p");
    assert_eq!(buf.text(), "three\none");
}

#[test]
fn test_yank_survives_deletes_in_register_zero() {
    let mut buf = MockBuffer::new("keep\ndrop");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "yyjdd");
    assert_eq!(buf.text(), "keep");
    run(&mut buf, &mut eng, "\"0p");
    assert_eq!(buf.text(), "keep\nkeep");
}

#[test]
fn test_named_register_and_append() {
    let mut buf = MockBuffer::new("foo bar");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "\"ayiww\"Ayiw");
    assert_eq!(register(&eng, 'a').as_deref(), Some("foobar"));
    assert_eq!(register(&eng, '"').as_deref(), Some("foobar"));
}

#[test]
fn test_black_hole_register() {
    let mut buf = MockBuffer::new("one\ntwo");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "yy");
    run(&mut buf, &mut eng, "j\"_dd");
    assert_eq!(buf.text(), "one");
    assert_eq!(register(&eng, '"').as_deref(), Some("one\n"));
    assert_eq!(register(&eng, '1'), None);
}

#[test]
fn test_put_from_empty_register_fails() {
    let mut buf = MockBuffer::new("text");
    let mut eng = Engine::new();

    let err = eng.feed_keys(&mut buf, "p").unwrap_err();
    assert_eq!(err, EngineError::EmptyRegister('"'));
    assert_eq!(err.to_string(), "E353: Nothing in register \"");
    assert_eq!(buf.text(), "text");
}

#[test]
fn test_counted_charwise_put() {
    let mut buf = MockBuffer::new("ab");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "yl3p");
    assert_eq!(buf.text(), "aaaab");
    assert_eq!(buf.cursor(), (0, 3));
}

#[test]
fn test_put_before() {
    let mut buf = MockBuffer::new("one\ntwo").with_caret(1, 0);
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "yykP");
    assert_eq!(buf.text(), "two\none\ntwo");
    assert_eq!(buf.cursor(), (0, 0));
}

#[test]
fn test_clipboard_registers() {
    let clipboard = MockClipboard::new();
    let mut buf = MockBuffer::new("copy me\nsecond");
    let mut eng = Engine::builder().clipboard(Box::new(clipboard.clone())).build();

    run(&mut buf, &mut eng, "\"+yy");
    assert_eq!(clipboard.contents().as_deref(), Some("copy me\n"));
    let reg = eng.shared().lock().read_register('*').unwrap().unwrap();
    assert_eq!(reg.kind, RegisterType::LineWise);

    eng.execute_command_line(&mut buf, "set clipboard=unnamed").unwrap();
    run(&mut buf, &mut eng, "jyiw");
    assert_eq!(clipboard.contents().as_deref(), Some("second"));
    assert_eq!(register(&eng, '"').as_deref(), Some("second"));
}

#[test]
fn test_last_inserted_and_command_registers() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "ihello<Esc>");
    assert_eq!(register(&eng, '.').as_deref(), Some("hello"));
    eng.execute_command_line(&mut buf, ":let g:x = 1").unwrap();
    assert_eq!(register(&eng, ':').as_deref(), Some("let g:x = 1"));
}

#[test]
fn test_insert_ctrl_r_pastes_register() {
    let mut buf = MockBuffer::new("word");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "yiwA <C-r>\"<Esc>");
    assert_eq!(buf.text(), "word word");
    assert_eq!(eng.mode(), Mode::Normal);
}

#[test]
fn test_registers_are_shared_between_engines() {
    let mut first = Engine::new();
    let mut second = Engine::builder().shared(first.shared()).build();
    let mut a = MockBuffer::new("shared line");
    let mut b = MockBuffer::new("other");

    run(&mut a, &mut first, "yy");
    run(&mut b, &mut second, "p");
    assert_eq!(b.text(), "other\nshared line");
}
