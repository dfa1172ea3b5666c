//! Non-operator edits: `r`, `~`, `J`, `p`, `<C-a>`.

use crate::operator::{Operator, convert_char};
use crate::register::{Register, RegisterType};
use crate::traits::EditorOps;
use crate::types::{Offset, Range};

/// `r{c}` on `count` characters. `None` when the line is too short.
pub fn replace_chars(editor: &mut dyn EditorOps, count: usize, ch: char) -> Option<Offset> {
    let caret = editor.caret();
    let line = editor.line_of_offset(caret);
    if caret + count > editor.line_end(line) {
        return None;
    }
    let range = Range::new(caret, caret + count);
    if ch == '\r' || ch == '\n' {
        editor.replace(range, "\n");
        return Some(caret + 1);
    }
    let text: String = std::iter::repeat_n(ch, count).collect();
    editor.replace(range, &text);
    Some(caret + count - 1)
}

/// `~`: toggles the case of `count` characters and moves past them.
pub fn toggle_case(editor: &mut dyn EditorOps, count: usize) -> Option<Offset> {
    let caret = editor.caret();
    let line = editor.line_of_offset(caret);
    let end = (caret + count).min(editor.line_end(line));
    if end <= caret {
        return None;
    }
    let range = Range::new(caret, end);
    let text: String = editor
        .slice(range)
        .chars()
        .map(|c| convert_char(c, Operator::ToggleCase))
        .collect();
    editor.replace(range, &text);
    Some(end.min(editor.line_last_char(line)))
}

/// `J` and `gJ` over `count` lines starting at `first` (at least two).
pub fn join_lines(
    editor: &mut dyn EditorOps,
    first: usize,
    count: usize,
    spaces: bool,
    joinspaces: bool,
) -> Option<Offset> {
    let joins = count.max(2) - 1;
    if first + joins > editor.last_line() {
        return None;
    }
    let mut caret = editor.line_start(first);
    for _ in 0..joins {
        let newline = editor.line_end(first);
        let next_start = newline + 1;
        let mut content = next_start;
        if spaces {
            let next_end = editor.line_end(first + 1);
            while content < next_end && matches!(editor.char_at(content), Some(' ' | '\t')) {
                content += 1;
            }
        }
        let separator = if !spaces {
            ""
        } else {
            let before = if newline > editor.line_start(first) {
                editor.char_at(newline - 1)
            } else {
                None
            };
            let after = editor.char_at(content);
            match (before, after) {
                (_, None | Some('\n')) => "",
                (_, Some(')')) => "",
                (Some(' ' | '\t') | None, _) => "",
                (Some('.' | '!' | '?'), _) if joinspaces => "  ",
                _ => " ",
            }
        };
        editor.replace(Range::new(newline, content), separator);
        caret = if separator.is_empty() {
            newline
        } else {
            newline + separator.chars().count() - 1
        };
    }
    Some(editor.clamp(caret))
}

/// `<C-a>` and `<C-x>`: adds `delta` to the number at or after the caret.
pub fn increment(editor: &mut dyn EditorOps, delta: i64) -> Option<Offset> {
    let caret = editor.caret();
    let line = editor.line_of_offset(caret);
    let start = editor.line_start(line);
    let text: Vec<char> = editor.line_text(line).chars().collect();
    let col = caret - start;

    // Hex number under or after the caret.
    let mut i = col.min(text.len());
    while i > 0 && text[i - 1].is_ascii_hexdigit() {
        i -= 1;
    }
    let hex_at = |p: usize| {
        p + 2 < text.len() + 1
            && text.get(p) == Some(&'0')
            && matches!(text.get(p + 1), Some('x' | 'X'))
            && text.get(p + 2).is_some_and(char::is_ascii_hexdigit)
    };
    let hex_start = if i >= 2 && hex_at(i - 2) {
        Some(i - 2)
    } else {
        (col..text.len()).find(|&p| hex_at(p)).filter(|&p| {
            !(col..p).any(|q| text[q].is_ascii_digit())
        })
    };
    if let Some(hs) = hex_start {
        let digits_start = hs + 2;
        let mut end = digits_start;
        while end < text.len() && text[end].is_ascii_hexdigit() {
            end += 1;
        }
        let digits: String = text[digits_start..end].iter().collect();
        let value = u64::from_str_radix(&digits, 16).ok()?;
        let new = (value as i64).wrapping_add(delta) as u64;
        let upper = digits.chars().any(|c| c.is_ascii_uppercase());
        let mut formatted = if upper {
            format!("{new:0width$X}", width = digits.len())
        } else {
            format!("{new:0width$x}", width = digits.len())
        };
        if formatted.len() > digits.len() && new < value {
            formatted = formatted.trim_start_matches('0').to_string();
        }
        let range = Range::new(start + digits_start, start + end);
        editor.replace(range, &formatted);
        return Some(start + digits_start + formatted.len() - 1);
    }

    // Decimal number.
    let mut begin = col.min(text.len());
    if begin < text.len() && text[begin].is_ascii_digit() {
        while begin > 0 && text[begin - 1].is_ascii_digit() {
            begin -= 1;
        }
    } else {
        begin = (col..text.len()).find(|&p| text[p].is_ascii_digit())?;
    }
    let mut end = begin;
    while end < text.len() && text[end].is_ascii_digit() {
        end += 1;
    }
    let negative = begin > 0 && text[begin - 1] == '-';
    let digits: String = text[begin..end].iter().collect();
    let magnitude: i64 = digits.parse().ok()?;
    let value = if negative { -magnitude } else { magnitude };
    let new = value.saturating_add(delta);
    let span_start = if negative { begin - 1 } else { begin };
    let formatted = new.to_string();
    editor.replace(Range::new(start + span_start, start + end), &formatted);
    Some(start + span_start + formatted.chars().count() - 1)
}

/// `p` and `P`. Returns the caret offset after the put.
pub fn put(editor: &mut dyn EditorOps, reg: &Register, count: usize, before: bool) -> Offset {
    let caret = editor.caret();
    let line = editor.line_of_offset(caret);
    match reg.kind {
        RegisterType::CharWise => {
            let text = reg.text.repeat(count.max(1));
            let at = if before || editor.line_len(line) == 0 {
                caret
            } else {
                (caret + 1).min(editor.line_end(line))
            };
            editor.insert(at, &text);
            if text.contains('\n') {
                at
            } else {
                at + text.chars().count().saturating_sub(1)
            }
        }
        RegisterType::LineWise => {
            let text = reg.text.repeat(count.max(1));
            let target = if before {
                let at = editor.line_start(line);
                editor.insert(at, &text);
                line
            } else if line < editor.last_line() {
                editor.insert(editor.line_start(line + 1), &text);
                line + 1
            } else {
                let body = text.strip_suffix('\n').unwrap_or(&text);
                let at = editor.text_len();
                editor.insert(at, &format!("\n{body}"));
                line + 1
            };
            editor.first_non_blank(target)
        }
        RegisterType::BlockWise { width } => {
            let col = editor.position(caret).col
                + usize::from(!before && editor.line_len(line) > 0);
            for (i, piece) in reg.text.split('\n').enumerate() {
                let target = line + i;
                if target > editor.last_line() {
                    let at = editor.text_len();
                    editor.insert(at, "\n");
                }
                let len = editor.line_len(target);
                let line_start = editor.line_start(target);
                if len < col {
                    editor.insert(line_start + len, &" ".repeat(col - len));
                }
                let mut cell = piece.repeat(count.max(1));
                let cell_width = width * count.max(1);
                if editor.line_len(target) > col {
                    let pad = cell_width.saturating_sub(cell.chars().count());
                    cell.push_str(&" ".repeat(pad));
                }
                editor.insert(line_start + col, &cell);
            }
            editor.line_start(line) + col
        }
    }
}
