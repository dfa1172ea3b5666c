use pretty_assertions::assert_eq;
use vim_core::{EditorOps, Engine, EngineError, Mode};

mod support;
use support::mock_buffer::MockBuffer;

fn run(buf: &mut MockBuffer, eng: &mut Engine, keys: &str) {
    eng.feed_keys(buf, keys).unwrap();
}

#[test]
fn test_word_motions() {
    let mut buf = MockBuffer::new("hello world");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "w");
    assert_eq!(buf.cursor(), (0, 6));
    run(&mut buf, &mut eng, "b");
    assert_eq!(buf.cursor(), (0, 0));
    run(&mut buf, &mut eng, "e");
    assert_eq!(buf.cursor(), (0, 4));
}

#[test]
fn test_count_multiplies_word_motion() {
    let mut buf = MockBuffer::new("one two three four");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "3w");
    assert_eq!(buf.cursor(), (0, 14));
}

#[test]
fn test_line_start_and_end() {
    let mut buf = MockBuffer::new("   indented line");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "$");
    assert_eq!(buf.cursor(), (0, 15));
    run(&mut buf, &mut eng, "0");
    assert_eq!(buf.cursor(), (0, 0));
    run(&mut buf, &mut eng, "^");
    assert_eq!(buf.cursor(), (0, 3));
}

#[test]
fn test_vertical_motion_keeps_preferred_column() {
    let mut buf = MockBuffer::new("long line here\nab\nanother long");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "10l");
    assert_eq!(buf.cursor(), (0, 10));
    run(&mut buf, &mut eng, "j");
    assert_eq!(buf.cursor(), (1, 1));
    run(&mut buf, &mut eng, "j");
    assert_eq!(buf.cursor(), (2, 10));
    run(&mut buf, &mut eng, "2k");
    assert_eq!(buf.cursor(), (0, 10));
}

#[test]
fn test_dollar_sticks_to_line_end() {
    let mut buf = MockBuffer::new("short\na much longer line");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "$j");
    assert_eq!(buf.cursor(), (1, 17));
}

#[test]
fn test_file_motions() {
    let mut buf = MockBuffer::new("a\n  b\nc");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "G");
    assert_eq!(buf.cursor(), (2, 0));
    run(&mut buf, &mut eng, "gg");
    assert_eq!(buf.cursor(), (0, 0));
    run(&mut buf, &mut eng, "2G");
    assert_eq!(buf.cursor(), (1, 2));
}

#[test]
fn test_percent_jumps_to_matching_bracket() {
    let mut buf = MockBuffer::new("if (a[1]) {}").with_caret(0, 3);
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "%");
    assert_eq!(buf.cursor(), (0, 8));
    run(&mut buf, &mut eng, "%");
    assert_eq!(buf.cursor(), (0, 3));
}

#[test]
fn test_find_and_repeat() {
    let mut buf = MockBuffer::new("a,b,c,d");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "f,");
    assert_eq!(buf.cursor(), (0, 1));
    run(&mut buf, &mut eng, ";");
    assert_eq!(buf.cursor(), (0, 3));
    run(&mut buf, &mut eng, ";");
    assert_eq!(buf.cursor(), (0, 5));
    run(&mut buf, &mut eng, ",");
    assert_eq!(buf.cursor(), (0, 3));
    run(&mut buf, &mut eng, "F,");
    assert_eq!(buf.cursor(), (0, 1));
}

#[test]
fn test_unmatched_paren() {
    let mut buf = MockBuffer::new("f(a, (b), c)").with_caret(0, 10);
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "[(");
    assert_eq!(buf.cursor(), (0, 1));
    run(&mut buf, &mut eng, "])");
    assert_eq!(buf.cursor(), (0, 11));
}

#[test]
fn test_paragraph_motion() {
    let mut buf = MockBuffer::new("a\nb\n\nc");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "}");
    assert_eq!(buf.cursor(), (2, 0));
    run(&mut buf, &mut eng, "{");
    assert_eq!(buf.cursor(), (0, 0));
}

#[test]
fn test_failed_motion_beeps_and_errors() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    let err = eng.feed_keys(&mut buf, "h").unwrap_err();
    assert_eq!(err, EngineError::MotionFailed);
    assert_eq!(buf.cursor(), (0, 0));
    assert_eq!(buf.beeps, 1);
    assert_eq!(eng.mode(), Mode::Normal);
}

#[test]
fn test_l_stops_on_last_character() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "2l");
    assert_eq!(buf.cursor(), (0, 2));
    assert!(eng.feed_keys(&mut buf, "l").is_err());
    assert_eq!(buf.cursor(), (0, 2));
}

#[test]
fn test_wide_characters_move_one_grapheme() {
    let mut buf = MockBuffer::new("漢字 かな");
    let mut eng = Engine::new();

    assert_eq!(buf.grapheme_count(0), 5);
    run(&mut buf, &mut eng, "l");
    assert_eq!(buf.cursor(), (0, 1));
    run(&mut buf, &mut eng, "$");
    assert_eq!(buf.cursor(), (0, 4));
}

#[test]
fn test_search_word_under_caret() {
    let mut buf = MockBuffer::new("foo bar\nfoobar foo");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "*");
    assert_eq!(buf.cursor(), (1, 7));
    run(&mut buf, &mut eng, "n");
    assert_eq!(buf.cursor(), (0, 0));
}

#[test]
fn test_pending_count_is_visible() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "2d");
    assert_eq!(eng.pending_keys(), "2d");
    assert!(matches!(eng.mode(), Mode::OperatorPending { .. }));
    run(&mut buf, &mut eng, "<Esc>");
    assert_eq!(eng.pending_keys(), "");
    assert_eq!(eng.mode(), Mode::Normal);
    assert_eq!(buf.text(), "abc");
}

#[test]
fn test_word_motion_stops_at_punctuation() {
    let mut buf = MockBuffer::new("foo.bar baz");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "w");
    assert_eq!(buf.cursor(), (0, 3));
    run(&mut buf, &mut eng, "w");
    assert_eq!(buf.cursor(), (0, 4));
    run(&mut buf, &mut eng, "0W");
    assert_eq!(buf.cursor(), (0, 8));
}

#[test]
fn test_till_and_delete_to_char() {
    let mut buf = MockBuffer::new("abc,def,ghi");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "t,");
    assert_eq!(buf.cursor(), (0, 2));
    run(&mut buf, &mut eng, "0dt,");
    assert_eq!(buf.text(), ",def,ghi");
    run(&mut buf, &mut eng, "ldf,");
    assert_eq!(buf.text(), ",ghi");
}
