use std::time::Duration;

use pretty_assertions::assert_eq;
use vim_core::{EditorOps, Engine, EngineError, Mode, ScriptErrorKind};

mod support;
use support::mock_buffer::MockBuffer;

fn run(buf: &mut MockBuffer, eng: &mut Engine, keys: &str) {
    eng.feed_keys(buf, keys).unwrap();
}

fn ex(buf: &mut MockBuffer, eng: &mut Engine, line: &str) {
    eng.execute_command_line(buf, line).unwrap();
}

#[test]
fn test_mapping_expands_to_insert() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "map x ihello<Esc>");
    run(&mut buf, &mut eng, "x");
    assert_eq!(buf.text(), "hello");
    assert_eq!(eng.mode(), Mode::Normal);
    assert_eq!(buf.cursor(), (0, 4));
}

#[test]
fn test_noremap_ignores_other_mappings() {
    let mut buf = MockBuffer::new("a\nb");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "nmap j x");
    ex(&mut buf, &mut eng, "nnoremap k j");
    run(&mut buf, &mut eng, "k");
    assert_eq!(buf.text(), "a\nb");
    assert_eq!(buf.cursor(), (1, 0));

    run(&mut buf, &mut eng, "ggj");
    assert_eq!(buf.text(), "\nb");
}

#[test]
fn test_recursive_mapping_is_reported() {
    let mut buf = MockBuffer::new("text");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "map a b");
    ex(&mut buf, &mut eng, "map b a");
    let err = eng.feed_keys(&mut buf, "a").unwrap_err();
    assert_eq!(err, EngineError::RecursiveMapping);
    assert_eq!(err.to_string(), "E223: recursive mapping");
    assert_eq!(eng.mode(), Mode::Normal);
    assert_eq!(eng.pending_keys(), "");
    assert_eq!(buf.text(), "text");
}

#[test]
fn test_ambiguous_insert_mapping_waits_for_timeout() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "inoremap jk <Esc>");
    run(&mut buf, &mut eng, "ij");
    assert_eq!(buf.text(), "");
    assert_eq!(eng.pending_keys(), "j");
    assert_eq!(eng.pending_timeout(), Some(Duration::from_millis(1000)));

    eng.timeout_elapsed(&mut buf).unwrap();
    assert_eq!(buf.text(), "j");
    assert_eq!(eng.mode(), Mode::Insert);
    assert_eq!(eng.pending_timeout(), None);

    run(&mut buf, &mut eng, "jk");
    assert_eq!(buf.text(), "j");
    assert_eq!(eng.mode(), Mode::Normal);
}

#[test]
fn test_diverging_keys_flush_the_prefix() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "inoremap jk <Esc>");
    run(&mut buf, &mut eng, "ijx");
    assert_eq!(buf.text(), "jx");
    assert_eq!(eng.mode(), Mode::Insert);
}

#[test]
fn test_timeoutlen_option() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "set timeoutlen=300");
    ex(&mut buf, &mut eng, "nnoremap ga x");
    run(&mut buf, &mut eng, "g");
    assert_eq!(eng.pending_timeout(), Some(Duration::from_millis(300)));
    ex(&mut buf, &mut eng, "set notimeout");
    assert_eq!(eng.pending_timeout(), None);
}

#[test]
fn test_leader_mapping() {
    let mut buf = MockBuffer::new("one\ntwo");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "let mapleader = ','");
    ex(&mut buf, &mut eng, "nnoremap <leader>d dd");
    run(&mut buf, &mut eng, ",d");
    assert_eq!(buf.text(), "two");
    run(&mut buf, &mut eng, "<Leader>d");
    assert_eq!(buf.text(), "");
}

#[test]
fn test_expr_mapping() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "nnoremap <expr> Q mode() ==# 'n' ? 'x' : ''");
    run(&mut buf, &mut eng, "Q");
    assert_eq!(buf.text(), "bc");
}

#[test]
fn test_unmap() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "nnoremap Q x");
    ex(&mut buf, &mut eng, "nunmap Q");
    assert!(matches!(
        eng.feed_keys(&mut buf, "Q"),
        Err(EngineError::UnknownKeys { .. })
    ));
    assert_eq!(buf.text(), "abc");

    match eng.execute_command_line(&mut buf, "nunmap Q") {
        Err(EngineError::Script(err)) => assert_eq!(err.kind, ScriptErrorKind::NoSuchMapping),
        other => panic!("expected E31, got {other:?}"),
    }
}

#[test]
fn test_unique_mapping_refuses_duplicates() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "nnoremap Q x");
    let err = eng
        .execute_command_line(&mut buf, "nnoremap <unique> Q dd")
        .unwrap_err();
    assert!(err.to_string().starts_with("E227"));
}

#[test]
fn test_map_listing() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "nnoremap Q dd");
    ex(&mut buf, &mut eng, "nmap Q");
    assert_eq!(eng.take_messages(), vec!["n  Q           *dd".to_string()]);
    ex(&mut buf, &mut eng, "imap Z");
    assert_eq!(eng.take_messages(), vec!["No mapping found".to_string()]);
}

#[test]
fn test_operator_pending_mapping() {
    let mut buf = MockBuffer::new("foo(bar) baz");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "onoremap p i(");
    run(&mut buf, &mut eng, "f(ldp");
    assert_eq!(buf.text(), "foo() baz");
}

#[test]
fn test_mappings_are_shared() {
    let mut buf = MockBuffer::new("abc");
    let mut first = Engine::new();
    let mut second = Engine::builder().shared(first.shared()).build();

    ex(&mut buf, &mut first, "nnoremap Q x");
    run(&mut buf, &mut second, "Q");
    assert_eq!(buf.text(), "bc");
}

#[test]
fn test_buffer_mapping_stays_in_its_session() {
    let mut first_buf = MockBuffer::new("one\ntwo");
    let mut second_buf = MockBuffer::new("one\ntwo");
    let mut first = Engine::new();
    let mut second = Engine::builder().shared(first.shared()).build();

    ex(&mut first_buf, &mut first, "nnoremap <buffer> x dd");
    run(&mut second_buf, &mut second, "x");
    assert_eq!(second_buf.text(), "ne\ntwo");
    run(&mut first_buf, &mut first, "x");
    assert_eq!(first_buf.text(), "two");

    ex(&mut first_buf, &mut first, "nmap x");
    assert_eq!(first.take_messages(), vec!["n  x           *@dd".to_string()]);
    ex(&mut second_buf, &mut second, "nmap x");
    assert_eq!(second.take_messages(), vec!["No mapping found".to_string()]);
}

#[test]
fn test_buffer_mapping_shadows_global_one() {
    let mut buf = MockBuffer::new("abc\ndef");
    let mut eng = Engine::new();

    ex(&mut buf, &mut eng, "nnoremap Q x");
    ex(&mut buf, &mut eng, "nnoremap <buffer> Q dd");
    run(&mut buf, &mut eng, "Q");
    assert_eq!(buf.text(), "def");

    ex(&mut buf, &mut eng, "nunmap <buffer> Q");
    run(&mut buf, &mut eng, "Q");
    assert_eq!(buf.text(), "ef");
}
