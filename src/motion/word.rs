//! Word motions. A line's newline offset plays the role of the end-of-line
//! position, so stepping is plain offset arithmetic.

use crate::traits::EditorOps;
use crate::types::Offset;

pub fn is_keyword(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// 0 for blanks and line ends, 1 for punctuation (or any non-blank in big
/// word mode), 2 for keyword characters.
fn class(editor: &dyn EditorOps, offset: Offset, big: bool) -> u8 {
    match editor.char_at(offset) {
        None | Some(' ' | '\t' | '\n') => 0,
        Some(_) if big => 1,
        Some(c) if is_keyword(c) => 2,
        Some(_) => 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Moved within the line.
    Within,
    /// Moved onto a line's end.
    LineEnd,
    /// Moved to the start of the next (or end of the previous) line.
    NewLine,
    /// At the buffer boundary.
    Boundary,
}

impl Step {
    fn crossed(self) -> bool {
        matches!(self, Step::LineEnd | Step::NewLine)
    }
}

fn inc(editor: &dyn EditorOps, pos: &mut Offset) -> Step {
    if *pos >= editor.text_len() {
        return Step::Boundary;
    }
    let was_newline = editor.char_at(*pos) == Some('\n');
    *pos += 1;
    if was_newline {
        Step::NewLine
    } else if matches!(editor.char_at(*pos), None | Some('\n')) {
        Step::LineEnd
    } else {
        Step::Within
    }
}

fn dec(editor: &dyn EditorOps, pos: &mut Offset) -> Step {
    if *pos == 0 {
        return Step::Boundary;
    }
    *pos -= 1;
    if editor.char_at(*pos) == Some('\n') {
        Step::NewLine
    } else {
        Step::Within
    }
}

fn on_empty_line(editor: &dyn EditorOps, pos: Offset) -> bool {
    let line = editor.line_of_offset(pos);
    editor.line_start(line) == pos && editor.line_len(line) == 0
}

/// `w`/`W`. With `stop_at_eol` (an operator is pending) the last word never
/// extends onto the next line. Returns `None` when no movement is possible.
pub fn forward(editor: &dyn EditorOps, from: Offset, count: usize, big: bool, stop_at_eol: bool) -> Option<Offset> {
    let mut pos = from;
    for remaining in (0..count).rev() {
        let last = remaining == 0;
        let start_class = class(editor, pos, big);
        let step = inc(editor, &mut pos);
        if step == Step::Boundary {
            return (pos != from).then_some(pos);
        }
        if step.crossed() && stop_at_eol && last {
            return Some(pos);
        }
        if start_class != 0 {
            while class(editor, pos, big) == start_class {
                let step = inc(editor, &mut pos);
                if step == Step::Boundary || (step.crossed() && stop_at_eol && last) {
                    return Some(pos);
                }
            }
        }
        while class(editor, pos, big) == 0 {
            if on_empty_line(editor, pos) {
                break;
            }
            let step = inc(editor, &mut pos);
            if step == Step::Boundary || (step.crossed() && stop_at_eol && last) {
                return Some(pos);
            }
        }
    }
    Some(pos)
}

/// `b`/`B`.
pub fn backward(editor: &dyn EditorOps, from: Offset, count: usize, big: bool) -> Option<Offset> {
    let mut pos = from;
    'outer: for _ in 0..count {
        if dec(editor, &mut pos) == Step::Boundary {
            return (pos != from).then_some(pos);
        }
        while class(editor, pos, big) == 0 {
            if on_empty_line(editor, pos) {
                continue 'outer;
            }
            if dec(editor, &mut pos) == Step::Boundary {
                return Some(pos);
            }
        }
        let word_class = class(editor, pos, big);
        while class(editor, pos, big) == word_class {
            if dec(editor, &mut pos) == Step::Boundary {
                return Some(pos);
            }
        }
        inc(editor, &mut pos);
    }
    Some(pos)
}

/// `e`/`E`. With `stay` the first iteration does not leave a word whose end
/// the caret is already on (`cw`).
pub fn end(editor: &dyn EditorOps, from: Offset, count: usize, big: bool, stay: bool) -> Option<Offset> {
    let mut pos = from;
    let mut stay = stay;
    for _ in 0..count {
        let start_class = class(editor, pos, big);
        if inc(editor, &mut pos) == Step::Boundary {
            return None;
        }
        if class(editor, pos, big) == start_class && start_class != 0 {
            if skip_class(editor, &mut pos, start_class, big) {
                return None;
            }
        } else if !stay || start_class == 0 {
            while class(editor, pos, big) == 0 {
                if inc(editor, &mut pos) == Step::Boundary {
                    return None;
                }
            }
            let word_class = class(editor, pos, big);
            if skip_class(editor, &mut pos, word_class, big) {
                return None;
            }
        }
        dec(editor, &mut pos);
        stay = false;
    }
    Some(pos)
}

fn skip_class(editor: &dyn EditorOps, pos: &mut Offset, cls: u8, big: bool) -> bool {
    while class(editor, *pos, big) == cls {
        if inc(editor, pos) == Step::Boundary {
            return true;
        }
    }
    false
}

/// `ge`/`gE`.
pub fn end_backward(editor: &dyn EditorOps, from: Offset, count: usize, big: bool) -> Option<Offset> {
    let mut pos = from;
    for _ in 0..count {
        let start_class = class(editor, pos, big);
        if dec(editor, &mut pos) == Step::Boundary {
            return None;
        }
        if start_class != 0 {
            while class(editor, pos, big) == start_class {
                if dec(editor, &mut pos) == Step::Boundary {
                    return Some(pos);
                }
            }
        }
        while class(editor, pos, big) == 0 {
            if on_empty_line(editor, pos) {
                break;
            }
            if dec(editor, &mut pos) == Step::Boundary {
                return Some(pos);
            }
        }
    }
    Some(pos)
}

/// Start and exclusive end of the keyword under or after `offset` on its
/// line, falling back to a run of non-blanks. Used by `*` and `#`.
pub fn word_under(editor: &dyn EditorOps, offset: Offset) -> Option<(Offset, Offset, bool)> {
    let line = editor.line_of_offset(offset);
    let (start, end) = (editor.line_start(line), editor.line_end(line));
    let chars = |from: Offset| (from..end).filter_map(move |o| editor.char_at(o).map(|c| (o, c)));
    let (hit, keyword) = match chars(offset).find(|(_, c)| is_keyword(*c)) {
        Some((o, _)) => (o, true),
        None => (chars(offset).find(|(_, c)| !c.is_whitespace())?.0, false),
    };
    let same = |c: char| if keyword { is_keyword(c) } else { !c.is_whitespace() };
    let mut first = hit;
    while first > start && editor.char_at(first - 1).is_some_and(same) {
        first -= 1;
    }
    let mut last = hit;
    while last < end && editor.char_at(last).is_some_and(same) {
        last += 1;
    }
    Some((first, last, keyword))
}
