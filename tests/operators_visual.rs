use pretty_assertions::assert_eq;
use vim_core::{EditorOps, Engine, Mode, VisualKind};

mod support;
use support::mock_buffer::MockBuffer;

fn run(buf: &mut MockBuffer, eng: &mut Engine, keys: &str) {
    eng.feed_keys(buf, keys).unwrap();
}

fn unnamed(eng: &Engine) -> Option<String> {
    eng.shared().lock().read_register('"').unwrap().map(|r| r.text)
}

#[test]
fn test_dw_deletes_word() {
    let mut buf = MockBuffer::new("hello world");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "dw");
    assert_eq!(buf.text(), "world");
    assert_eq!(buf.cursor(), (0, 0));
    assert_eq!(unnamed(&eng).as_deref(), Some("hello "));
}

#[test]
fn test_dw_on_last_word_stops_at_line_end() {
    let mut buf = MockBuffer::new("hello world\nnext").with_caret(0, 6);
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "dw");
    assert_eq!(buf.text(), "hello \nnext");
    assert_eq!(buf.cursor(), (0, 5));
}

#[test]
fn test_dd_and_put() {
    let mut buf = MockBuffer::new("one\ntwo\nthree");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "dd");
    assert_eq!(buf.text(), "two\nthree");
    assert_eq!(unnamed(&eng).as_deref(), Some("one\n"));
    run(&mut buf, &mut eng, "p");
    assert_eq!(buf.text(), "two\none\nthree");
    assert_eq!(buf.cursor(), (1, 0));
}

#[test]
fn test_dd_on_last_line() {
    let mut buf = MockBuffer::new("one\ntwo").with_caret(1, 1);
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "dd");
    assert_eq!(buf.text(), "one");
    assert_eq!(buf.cursor(), (0, 0));
}

#[test]
fn test_counted_dd() {
    let mut buf = MockBuffer::new("a\nb\nc\nd");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "2dd");
    assert_eq!(buf.text(), "c\nd");
    assert_eq!(unnamed(&eng).as_deref(), Some("a\nb\n"));
}

#[test]
fn test_change_word_enters_insert() {
    let mut buf = MockBuffer::new("hello world");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "cw");
    assert_eq!(eng.mode(), Mode::Insert);
    assert_eq!(buf.text(), " world");
    run(&mut buf, &mut eng, "bye<Esc>");
    assert_eq!(buf.text(), "bye world");
    assert_eq!(buf.cursor(), (0, 2));
    assert_eq!(eng.mode(), Mode::Normal);
}

#[test]
fn test_dot_repeats_change_with_inserted_text() {
    let mut buf = MockBuffer::new("aa bb");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "cwX<Esc>");
    assert_eq!(buf.text(), "X bb");
    run(&mut buf, &mut eng, "w.");
    assert_eq!(buf.text(), "X X");
}

#[test]
fn test_dot_repeats_delete() {
    let mut buf = MockBuffer::new("one two three");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "dw");
    run(&mut buf, &mut eng, ".");
    assert_eq!(buf.text(), "three");
}

#[test]
fn test_case_operators() {
    let mut buf = MockBuffer::new("hello world");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "gUiw");
    assert_eq!(buf.text(), "HELLO world");
    run(&mut buf, &mut eng, "g~~");
    assert_eq!(buf.text(), "hello WORLD");
}

#[test]
fn test_tilde_toggles_and_advances() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "~~");
    assert_eq!(buf.text(), "ABc");
    assert_eq!(buf.cursor(), (0, 2));
}

#[test]
fn test_shift_uses_shiftwidth() {
    let mut buf = MockBuffer::new("abc\ndef");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "set sw=4 et").unwrap();
    run(&mut buf, &mut eng, ">j");
    assert_eq!(buf.text(), "    abc\n    def");
    run(&mut buf, &mut eng, "<lt><lt>");
    assert_eq!(buf.text(), "abc\n    def");
}

#[test]
fn test_replace_join_and_increment() {
    let mut buf = MockBuffer::new("abc\nx 41");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "rz");
    assert_eq!(buf.text(), "zbc\nx 41");
    run(&mut buf, &mut eng, "J");
    assert_eq!(buf.text(), "zbc x 41");
    assert_eq!(buf.cursor(), (0, 3));
    run(&mut buf, &mut eng, "<C-a>");
    assert_eq!(buf.text(), "zbc x 42");
    assert_eq!(buf.cursor(), (0, 7));
}

#[test]
fn test_undo_and_redo() {
    let mut buf = MockBuffer::new("hello");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "x");
    assert_eq!(buf.text(), "ello");
    run(&mut buf, &mut eng, "u");
    assert_eq!(buf.text(), "hello");
    run(&mut buf, &mut eng, "<C-r>");
    assert_eq!(buf.text(), "ello");
    assert_eq!(buf.beeps, 0);
    run(&mut buf, &mut eng, "<C-r>");
    assert_eq!(buf.beeps, 1);
}

#[test]
fn test_visual_yank() {
    let mut buf = MockBuffer::new("hello world");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "ve");
    assert_eq!(eng.mode(), Mode::Visual(VisualKind::CharWise));
    assert_eq!(buf.selected_text().as_deref(), Some("hello"));
    run(&mut buf, &mut eng, "y");
    assert_eq!(eng.mode(), Mode::Normal);
    assert_eq!(unnamed(&eng).as_deref(), Some("hello"));
    assert_eq!(buf.selected_text(), None);
}

#[test]
fn test_visual_line_delete() {
    let mut buf = MockBuffer::new("a\nb\nc").with_caret(1, 0);
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "Vd");
    assert_eq!(buf.text(), "a\nc");
    assert_eq!(unnamed(&eng).as_deref(), Some("b\n"));
}

#[test]
fn test_visual_block_delete() {
    let mut buf = MockBuffer::new("abc\ndef\nghi");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "<C-v>jld");
    assert_eq!(buf.text(), "c\nf\nghi");
    assert_eq!(buf.cursor(), (0, 0));
}

#[test]
fn test_visual_block_insert() {
    let mut buf = MockBuffer::new("abc\ndef");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "<C-v>jI# <Esc>");
    assert_eq!(buf.text(), "# abc\n# def");
    assert_eq!(eng.mode(), Mode::Normal);
}

#[test]
fn test_visual_put_swaps_unnamed() {
    let mut buf = MockBuffer::new("foo bar");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "yiwwviwp");
    assert_eq!(buf.text(), "foo foo");
    assert_eq!(unnamed(&eng).as_deref(), Some("bar"));
}

#[test]
fn test_escape_leaves_visual() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "vl<Esc>");
    assert_eq!(eng.mode(), Mode::Normal);
    assert_eq!(buf.text(), "abc");
    assert_eq!(
        buf.modes,
        vec![Mode::Visual(VisualKind::CharWise), Mode::Normal]
    );
}

#[test]
fn test_select_mode_typing_replaces_selection() {
    let mut buf = MockBuffer::new("hello world");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "gh");
    assert_eq!(eng.mode(), Mode::Select(VisualKind::CharWise));
    run(&mut buf, &mut eng, "X");
    assert_eq!(buf.text(), "Xello world");
    assert_eq!(eng.mode(), Mode::Insert);
    run(&mut buf, &mut eng, "<Esc>");
    assert_eq!(eng.mode(), Mode::Normal);
    assert_eq!(unnamed(&eng), None);
}

#[test]
fn test_ctrl_g_toggles_visual_and_select() {
    let mut buf = MockBuffer::new("hello world");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "vl");
    assert_eq!(buf.cursor(), (0, 1));
    run(&mut buf, &mut eng, "<C-g>");
    assert_eq!(eng.mode(), Mode::Select(VisualKind::CharWise));
    assert_eq!(buf.cursor(), (0, 2));
    assert_eq!(buf.selected_text().as_deref(), Some("he"));
    run(&mut buf, &mut eng, "<C-g>");
    assert_eq!(eng.mode(), Mode::Visual(VisualKind::CharWise));
    assert_eq!(buf.cursor(), (0, 1));
    assert_eq!(buf.selected_text().as_deref(), Some("he"));
}

#[test]
fn test_d_percent_without_bracket_changes_nothing() {
    let mut buf = MockBuffer::new("no brackets here");
    let mut eng = Engine::new();

    assert!(eng.feed_keys(&mut buf, "d%").is_err());
    assert_eq!(buf.text(), "no brackets here");
    assert_eq!(eng.mode(), Mode::Normal);

    assert!(eng.feed_keys(&mut buf, "d[(").is_err());
    assert_eq!(buf.text(), "no brackets here");
    assert_eq!(eng.pending_keys(), "");
}

#[test]
fn test_insert_commands() {
    let mut buf = MockBuffer::new("  mid");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "A!<Esc>");
    assert_eq!(buf.text(), "  mid!");
    run(&mut buf, &mut eng, "I<lt><Esc>");
    assert_eq!(buf.text(), "  <mid!");
    run(&mut buf, &mut eng, "oend<Esc>");
    assert_eq!(buf.text(), "  <mid!\nend");
    run(&mut buf, &mut eng, "Otop<Esc>");
    assert_eq!(buf.text(), "  <mid!\ntop\nend");
}

#[test]
fn test_insert_with_count_repeats_text() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "3ia<Esc>");
    assert_eq!(buf.text(), "aaa");
    assert_eq!(buf.cursor(), (0, 2));
}

#[test]
fn test_exclusive_selection_operators() {
    let mut buf = MockBuffer::new("abcdef");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "set selection=exclusive").unwrap();
    run(&mut buf, &mut eng, "vl");
    let selection = buf.selection().unwrap();
    assert_eq!((selection.range.start, selection.range.end), (0, 1));
    run(&mut buf, &mut eng, "d");
    assert_eq!(buf.text(), "bcdef");
    assert_eq!(unnamed(&eng).as_deref(), Some("a"));

    run(&mut buf, &mut eng, "$vhd");
    assert_eq!(buf.text(), "bcdf");
}

#[test]
fn test_exclusive_selection_block_delete() {
    let mut buf = MockBuffer::new("abc\ndef\nghi");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "set selection=exclusive").unwrap();
    run(&mut buf, &mut eng, "<C-v>jlld");
    assert_eq!(buf.text(), "c\nf\nghi");
}

#[test]
fn test_dot_repeats_visual_delete() {
    let mut buf = MockBuffer::new("abcdef");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "vld");
    assert_eq!(buf.text(), "cdef");
    run(&mut buf, &mut eng, ".");
    assert_eq!(buf.text(), "ef");
    assert_eq!(eng.mode(), Mode::Normal);
}

#[test]
fn test_dot_repeats_visual_line_delete() {
    let mut buf = MockBuffer::new("a\nb\nc\nd\ne");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "Vjd");
    assert_eq!(buf.text(), "c\nd\ne");
    run(&mut buf, &mut eng, ".");
    assert_eq!(buf.text(), "e");
}

#[test]
fn test_dot_repeats_visual_change() {
    let mut buf = MockBuffer::new("aa bb cc");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "vlcX<Esc>");
    assert_eq!(buf.text(), "X bb cc");
    run(&mut buf, &mut eng, "w.");
    assert_eq!(buf.text(), "X X cc");
    assert_eq!(eng.mode(), Mode::Normal);
}

#[test]
fn test_visual_yank_does_not_replace_dot() {
    let mut buf = MockBuffer::new("one two three");
    let mut eng = Engine::new();

    run(&mut buf, &mut eng, "dwvey");
    run(&mut buf, &mut eng, ".");
    assert_eq!(buf.text(), "three");
}
