//! Character, line, paragraph and find-in-line motions.

use unicode_segmentation::UnicodeSegmentation;

use crate::traits::EditorOps;
use crate::types::Offset;

/// Grapheme cluster boundaries of `line`, as offsets, including its end.
fn grapheme_offsets(editor: &dyn EditorOps, line: usize) -> Vec<Offset> {
    let start = editor.line_start(line);
    let text = editor.line_text(line);
    let mut offsets: Vec<Offset> = Vec::new();
    let mut col = 0;
    for g in text.graphemes(true) {
        offsets.push(start + col);
        col += g.chars().count();
    }
    offsets.push(start + col);
    offsets
}

/// Moves `count` graphemes left within the line.
pub fn left(editor: &dyn EditorOps, from: Offset, count: usize) -> Option<Offset> {
    let line = editor.line_of_offset(from);
    let bounds = grapheme_offsets(editor, line);
    let index = bounds.iter().rposition(|&b| b <= from)?;
    if index == 0 {
        return None;
    }
    Some(bounds[index.saturating_sub(count)])
}

/// Moves `count` graphemes right. `past_end` allows landing on the line end,
/// which operators need for `dl` on the last character.
pub fn right(editor: &dyn EditorOps, from: Offset, count: usize, past_end: bool) -> Option<Offset> {
    let line = editor.line_of_offset(from);
    let bounds = grapheme_offsets(editor, line);
    let index = bounds.iter().rposition(|&b| b <= from)?;
    let last = if past_end {
        bounds.len() - 1
    } else {
        bounds.len().saturating_sub(2)
    };
    if index >= last {
        return None;
    }
    Some(bounds[(index + count).min(last)])
}

/// `<BS>`: left, continuing onto the previous line's last character.
pub fn wrap_left(editor: &dyn EditorOps, from: Offset, count: usize) -> Option<Offset> {
    let mut pos = from;
    for _ in 0..count {
        pos = match left(editor, pos, 1) {
            Some(p) => p,
            None => {
                let line = editor.line_of_offset(pos);
                if line == 0 {
                    break;
                }
                editor.line_last_char(line - 1)
            }
        };
    }
    (pos != from).then_some(pos)
}

/// `<Space>`: right, continuing onto the next line's first character.
pub fn wrap_right(editor: &dyn EditorOps, from: Offset, count: usize) -> Option<Offset> {
    let mut pos = from;
    for _ in 0..count {
        pos = match right(editor, pos, 1, false) {
            Some(p) => p,
            None => {
                let line = editor.line_of_offset(pos);
                if line >= editor.last_line() {
                    break;
                }
                editor.line_start(line + 1)
            }
        };
    }
    (pos != from).then_some(pos)
}

/// The offset at `col` on `line`, kept on a character unless `past_end`.
pub fn column_offset(editor: &dyn EditorOps, line: usize, col: usize, past_end: bool) -> Offset {
    let start = editor.line_start(line);
    let limit = if past_end {
        editor.line_end(line)
    } else {
        editor.line_last_char(line)
    };
    start.saturating_add(col).min(limit)
}

/// `j`/`k`: the target line, or `None` when already on the edge line.
pub fn vertical(editor: &dyn EditorOps, from: Offset, count: usize, down: bool) -> Option<usize> {
    let line = editor.line_of_offset(from);
    if down {
        (line < editor.last_line()).then(|| (line + count).min(editor.last_line()))
    } else {
        (line > 0).then(|| line.saturating_sub(count))
    }
}

/// `$`: last character of the line `count - 1` lines down.
pub fn line_end(editor: &dyn EditorOps, from: Offset, count: usize) -> Option<Offset> {
    let line = editor.line_of_offset(from) + count.saturating_sub(1);
    (line <= editor.last_line()).then(|| editor.line_last_char(line))
}

/// `g_`: last non-blank of the line `count - 1` lines down.
pub fn last_non_blank(editor: &dyn EditorOps, from: Offset, count: usize) -> Option<Offset> {
    let line = editor.line_of_offset(from) + count.saturating_sub(1);
    if line > editor.last_line() {
        return None;
    }
    let start = editor.line_start(line);
    let mut pos = editor.line_end(line);
    while pos > start && matches!(editor.char_at(pos - 1), Some(' ' | '\t')) {
        pos -= 1;
    }
    Some(if pos > start { pos - 1 } else { start })
}

pub fn is_blank_line(editor: &dyn EditorOps, line: usize) -> bool {
    editor.line_text(line).chars().all(|c| c == ' ' || c == '\t')
}

/// Outcome of `{` and `}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphTarget {
    pub offset: Offset,
    /// Landed on the last character of the buffer; the motion is inclusive.
    pub inclusive: bool,
}

/// `}` and `{`: the `count`-th empty line after leaving a non-empty run.
pub fn paragraph(editor: &dyn EditorOps, from: Offset, count: usize, forward: bool) -> Option<ParagraphTarget> {
    let last = editor.last_line();
    let mut curr = editor.line_of_offset(from);
    for remaining in (0..count).rev() {
        let mut did_skip = false;
        let mut first = true;
        loop {
            if editor.line_len(curr) != 0 {
                did_skip = true;
            }
            if !first && did_skip && editor.line_len(curr) == 0 {
                break;
            }
            first = false;
            let next = if forward {
                (curr < last).then_some(curr + 1)
            } else {
                curr.checked_sub(1)
            };
            match next {
                Some(n) => curr = n,
                None if remaining > 0 => return None,
                None => break,
            }
        }
    }
    if forward && curr == last && editor.line_len(curr) != 0 {
        let offset = editor.line_last_char(curr);
        if offset == from {
            return None;
        }
        return Some(ParagraphTarget {
            offset,
            inclusive: true,
        });
    }
    let offset = editor.line_start(curr);
    (offset != from).then_some(ParagraphTarget {
        offset,
        inclusive: false,
    })
}

/// `f` `F` `t` `T`. `repeat` makes a till skip an adjacent match, as `;` does.
pub fn find_char(
    editor: &dyn EditorOps,
    from: Offset,
    ch: char,
    forward: bool,
    till: bool,
    count: usize,
    repeat: bool,
) -> Option<Offset> {
    let line = editor.line_of_offset(from);
    let (start, end) = (editor.line_start(line), editor.line_end(line));
    let mut pos = from;
    if till && repeat {
        if forward && pos + 1 < end && editor.char_at(pos + 1) == Some(ch) {
            pos += 1;
        } else if !forward && pos > start && editor.char_at(pos - 1) == Some(ch) {
            pos -= 1;
        }
    }
    for _ in 0..count {
        pos = loop {
            if forward {
                if pos + 1 >= end {
                    return None;
                }
                pos += 1;
            } else {
                if pos <= start {
                    return None;
                }
                pos -= 1;
            }
            if editor.char_at(pos) == Some(ch) {
                break pos;
            }
        };
    }
    match (till, forward) {
        (false, _) => Some(pos),
        (true, true) => Some(pos - 1),
        (true, false) => Some(pos + 1),
    }
}
