use crate::traits::EditorOps;
use crate::types::Offset;

const PAIRS: [(char, char); 3] = [('(', ')'), ('[', ']'), ('{', '}')];

fn pair_of(c: char) -> Option<(char, char, bool)> {
    PAIRS.iter().find_map(|&(open, close)| {
        if c == open {
            Some((open, close, true))
        } else if c == close {
            Some((open, close, false))
        } else {
            None
        }
    })
}

/// `%`: the match of the first bracket at or after `from` on its line.
pub fn match_pair(editor: &dyn EditorOps, from: Offset) -> Option<Offset> {
    let line = editor.line_of_offset(from);
    let end = editor.line_end(line);
    let (at, (open, close, is_open)) = (from..end)
        .find_map(|o| editor.char_at(o).and_then(pair_of).map(|p| (o, p)))?;
    if is_open {
        scan_forward(editor, at + 1, open, close, 1)
    } else {
        scan_backward(editor, at, open, close, 1)
    }
}

/// Finds the `count`-th unbalanced `close` after `from` (exclusive).
fn scan_forward(editor: &dyn EditorOps, from: Offset, open: char, close: char, count: usize) -> Option<Offset> {
    let mut depth = 0usize;
    let mut remaining = count;
    for offset in from..editor.text_len() {
        match editor.char_at(offset) {
            Some(c) if c == open => depth += 1,
            Some(c) if c == close => {
                if depth == 0 {
                    remaining -= 1;
                    if remaining == 0 {
                        return Some(offset);
                    }
                } else {
                    depth -= 1;
                }
            }
            _ => {}
        }
    }
    None
}

/// Finds the `count`-th unbalanced `open` before `from`.
fn scan_backward(editor: &dyn EditorOps, from: Offset, open: char, close: char, count: usize) -> Option<Offset> {
    let mut depth = 0usize;
    let mut remaining = count;
    for offset in (0..from).rev() {
        match editor.char_at(offset) {
            Some(c) if c == close => depth += 1,
            Some(c) if c == open => {
                if depth == 0 {
                    remaining -= 1;
                    if remaining == 0 {
                        return Some(offset);
                    }
                } else {
                    depth -= 1;
                }
            }
            _ => {}
        }
    }
    None
}

/// `[(` `[{` `])` `]}`: the `count`-th unmatched bracket. Fails at the start
/// of the buffer going backward or at its last character going forward.
pub fn unmatched(editor: &dyn EditorOps, from: Offset, bracket: char, count: usize) -> Option<Offset> {
    let (open, close, is_open) = pair_of(bracket)?;
    if is_open {
        if from == 0 {
            return None;
        }
        scan_backward(editor, from, open, close, count)
    } else {
        if from + 1 >= editor.text_len() {
            return None;
        }
        scan_forward(editor, from + 1, open, close, count)
    }
}

/// The innermost `count`-th pair enclosing `at`; a bracket under `at` counts
/// as enclosing.
pub fn enclosing(editor: &dyn EditorOps, at: Offset, open: char, close: char, count: usize) -> Option<(Offset, Offset)> {
    let start = match editor.char_at(at) {
        Some(c) if c == open => {
            if count <= 1 {
                at
            } else {
                scan_backward(editor, at, open, close, count - 1)?
            }
        }
        Some(c) if c == close => scan_backward(editor, at, open, close, count)?,
        _ => scan_backward(editor, at, open, close, count)?,
    };
    let end = scan_forward(editor, start + 1, open, close, 1)?;
    (end >= at).then_some((start, end))
}
