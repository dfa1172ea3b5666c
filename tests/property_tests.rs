use proptest::prelude::*;
use vim_core::{EditorOps, Engine, KeyCode, KeyEvent, Mode, Modifiers};

mod support;
use support::mock_buffer::MockBuffer;

fn key(c: char) -> KeyEvent {
    KeyEvent {
        code: KeyCode::Char(c),
        mods: Modifiers::empty(),
    }
}

fn esc() -> KeyEvent {
    KeyEvent {
        code: KeyCode::Esc,
        mods: Modifiers::empty(),
    }
}

// Only `\n` line breaks: the buffer and the engine agree on those.
fn text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-zA-Z0-9 .!?,;:\\-_]{0,50}",
        "[a-zA-Z0-9 .!?,;:\\-_\n]{0,200}",
        r"[a-zA-Z0-9 ]{0,20}\n\n[a-zA-Z0-9 ]{0,20}",
        "[\u{0020}-\u{007E}\u{00A0}-\u{00FF}\u{4E00}-\u{9FFF}\u{1F600}-\u{1F64F}\n]{0,100}",
        "[ \t]{0,10}\n[ \t]{0,10}\n[a-z]{0,10}",
        "[a-z(){}\\[\\] \n]{0,80}",
    ]
}

fn motion_char_strategy() -> impl Strategy<Value = char> {
    prop::sample::select(vec![
        'h', 'j', 'k', 'l', '0', '^', '$', 'w', 'b', 'e', 'W', 'B', 'E', '{', '}', 'G', '%',
        ';', ',', '|', '_', '+', '-',
    ])
}

// Keys that open and leave every mode without recording or replaying.
fn mode_key_strategy() -> impl Strategy<Value = char> {
    prop::sample::select(vec![
        'v', 'V', 'i', 'a', 'o', 'A', 'R', 'd', 'c', 'y', 'f', 't', 'r', 'g', ':', '/', 'h', 'l', 'w',
        'x', 'z', ' ',
    ])
}

/// The caret sits on a character of a line, or at the start of an empty line.
fn assert_caret_on_text(buf: &MockBuffer) {
    let caret = buf.caret();
    assert!(caret <= buf.text_len());
    let line = buf.line_of_offset(caret);
    assert!(line < buf.line_count());
    let col = caret - buf.line_start(line);
    let len = buf.line_len(line);
    assert!(col < len || (col == 0 && len == 0), "caret {caret} past line {line} of length {len}");
}

proptest! {
    #[test]
    fn motion_keeps_caret_on_text(
        text in text_strategy(),
        motion in motion_char_strategy(),
        count in 0u32..100,
    ) {
        let mut buf = MockBuffer::new(&text);
        let mut eng = Engine::new();

        if count > 0 {
            for digit in count.to_string().chars() {
                let _ = eng.handle_key(&mut buf, key(digit));
            }
        }
        let _ = eng.handle_key(&mut buf, key(motion));

        assert_caret_on_text(&buf);
        prop_assert_eq!(eng.mode(), Mode::Normal);
    }

    #[test]
    fn motion_from_any_position_keeps_caret_on_text(
        text in text_strategy(),
        start in 0usize..400,
        motion in motion_char_strategy(),
    ) {
        let mut buf = MockBuffer::new(&text);
        let start = buf.clamp(start.min(buf.text_len()));
        buf.set_caret(start);
        let mut eng = Engine::new();

        let _ = eng.handle_key(&mut buf, key(motion));

        assert_caret_on_text(&buf);
    }

    #[test]
    fn motions_never_edit(
        text in text_strategy(),
        motions in prop::collection::vec(motion_char_strategy(), 0..10),
    ) {
        let mut buf = MockBuffer::new(&text);
        let mut eng = Engine::new();

        for motion in motions {
            let _ = eng.handle_key(&mut buf, key(motion));
            assert_caret_on_text(&buf);
        }
        prop_assert_eq!(buf.text(), text);
    }

    #[test]
    fn find_char_never_leaves_the_line(
        text in text_strategy(),
        target in prop::char::range('!', '~'),
        till in any::<bool>(),
        count in 1u32..10,
    ) {
        let mut buf = MockBuffer::new(&text);
        let mut eng = Engine::new();

        if count > 1 {
            let _ = eng.handle_key(&mut buf, key(char::from_digit(count, 10).unwrap_or('1')));
        }
        let _ = eng.handle_key(&mut buf, key(if till { 't' } else { 'f' }));
        let _ = eng.handle_key(&mut buf, key(target));

        prop_assert_eq!(buf.line_of_offset(buf.caret()), 0);
        prop_assert_eq!(eng.pending_keys(), "");
    }

    #[test]
    fn visual_selection_stays_in_buffer(
        text in text_strategy(),
        motions in prop::collection::vec(motion_char_strategy(), 1..5),
    ) {
        let mut buf = MockBuffer::new(&text);
        let mut eng = Engine::new();

        let _ = eng.handle_key(&mut buf, key('v'));
        for motion in motions {
            let _ = eng.handle_key(&mut buf, key(motion));
            if let Some(selection) = buf.selection() {
                prop_assert!(selection.range.start <= selection.range.end);
                prop_assert!(selection.range.end <= buf.text_len());
            }
        }
        prop_assert!(eng.mode().is_visual());
    }

    #[test]
    fn escape_always_returns_to_normal(
        text in text_strategy(),
        keys in prop::collection::vec(mode_key_strategy(), 0..12),
    ) {
        let mut buf = MockBuffer::new(&text);
        let mut eng = Engine::new();

        for c in keys {
            let _ = eng.handle_key(&mut buf, key(c));
        }
        let _ = eng.handle_key(&mut buf, esc());
        let _ = eng.handle_key(&mut buf, esc());

        prop_assert_eq!(eng.mode(), Mode::Normal);
        prop_assert_eq!(eng.pending_keys(), "");
        prop_assert_eq!(eng.cmdline_text(), None);
        assert_caret_on_text(&buf);
    }

    #[test]
    fn dd_removes_exactly_one_line(
        lines in prop::collection::vec("[a-z ]{0,10}", 2..8),
        target in 0usize..8,
    ) {
        let target = target % lines.len();
        let mut buf = MockBuffer::new(&lines.join("\n")).with_caret(target, 0);
        let mut eng = Engine::new();

        eng.feed_keys(&mut buf, "dd").unwrap();

        let mut expected = lines.clone();
        let removed = expected.remove(target);
        prop_assert_eq!(buf.text(), expected.join("\n"));
        let reg = eng.shared().lock().read_register('"').unwrap().map(|r| r.text);
        prop_assert_eq!(reg, Some(format!("{removed}\n")));
    }

    #[test]
    fn large_counts_clamp(
        text in "[a-z \n]{10,100}",
        motion in motion_char_strategy(),
        count in 10u32..99999,
    ) {
        let mut buf = MockBuffer::new(&text);
        let mut eng = Engine::new();

        for digit in count.to_string().chars() {
            let _ = eng.handle_key(&mut buf, key(digit));
        }
        let _ = eng.handle_key(&mut buf, key(motion));

        assert_caret_on_text(&buf);
    }
}

#[test]
fn empty_buffer_motions() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    for motion in ['h', 'j', 'k', 'l', 'w', 'b', '{', '}', '0', '$', 'G'] {
        let _ = eng.handle_key(&mut buf, key(motion));
        assert_eq!(buf.cursor(), (0, 0), "motion {motion}");
        assert_eq!(eng.mode(), Mode::Normal);
    }
}

#[test]
fn single_char_buffer_motions() {
    let mut buf = MockBuffer::new("x");
    let mut eng = Engine::new();

    for motion in ['h', 'l', 'w', 'b', 'e', '$', '0'] {
        let _ = eng.handle_key(&mut buf, key(motion));
        assert_eq!(buf.cursor(), (0, 0), "motion {motion}");
    }
}
