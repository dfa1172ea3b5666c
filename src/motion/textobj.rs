use crate::command::TextObject;
use crate::motion::bracket::enclosing;
use crate::motion::line::is_blank_line;
use crate::motion::word::is_keyword;
use crate::traits::EditorOps;
use crate::types::Offset;

/// A selected object. Charwise objects are `[start, end)`; linewise ones
/// cover the lines of `start` through `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRange {
    pub start: Offset,
    pub end: Offset,
    pub linewise: bool,
}

pub fn select(editor: &dyn EditorOps, at: Offset, object: TextObject, count: usize) -> Option<ObjectRange> {
    match object {
        TextObject::Word { inner, big } => word(editor, at, inner, big, count),
        TextObject::Block { inner, open, close } => block(editor, at, inner, open, close, count),
        TextObject::Quote { inner, quote } => quoted(editor, at, inner, quote),
        TextObject::Paragraph { inner } => paragraph(editor, at, inner, count),
    }
}

fn class(c: char, big: bool) -> u8 {
    match c {
        ' ' | '\t' => 0,
        _ if big => 1,
        c if is_keyword(c) => 2,
        _ => 1,
    }
}

/// The run of same-class characters containing `at`, within `[lo, hi)`.
fn run(editor: &dyn EditorOps, at: Offset, lo: Offset, hi: Offset, big: bool) -> (Offset, Offset) {
    let cls = |o: Offset| editor.char_at(o).map(|c| class(c, big));
    let target = cls(at);
    let mut start = at;
    while start > lo && cls(start - 1) == target {
        start -= 1;
    }
    let mut end = at + 1;
    while end < hi && cls(end) == target {
        end += 1;
    }
    (start, end)
}

fn is_blank_at(editor: &dyn EditorOps, o: Offset) -> bool {
    matches!(editor.char_at(o), Some(' ' | '\t'))
}

fn word(editor: &dyn EditorOps, at: Offset, inner: bool, big: bool, count: usize) -> Option<ObjectRange> {
    let line = editor.line_of_offset(at);
    let (lo, hi) = (editor.line_start(line), editor.line_end(line));
    if lo == hi {
        return None;
    }
    let at = at.min(hi - 1);
    let (mut start, mut end) = run(editor, at, lo, hi, big);
    let started_blank = is_blank_at(editor, at);
    if inner {
        for _ in 1..count {
            if end >= hi {
                break;
            }
            end = run(editor, end, lo, hi, big).1;
        }
    } else if started_blank {
        for _ in 0..count {
            if end >= hi {
                break;
            }
            end = run(editor, end, lo, hi, big).1;
        }
    } else {
        for i in 0..count {
            if i > 0 {
                if end >= hi {
                    break;
                }
                end = run(editor, end, lo, hi, big).1;
            }
            if end < hi && is_blank_at(editor, end) {
                end = run(editor, end, lo, hi, big).1;
            } else if i == 0 && start > lo && is_blank_at(editor, start - 1) {
                start = run(editor, start - 1, lo, hi, big).0;
            }
        }
    }
    Some(ObjectRange {
        start,
        end,
        linewise: false,
    })
}

fn block(
    editor: &dyn EditorOps,
    at: Offset,
    inner: bool,
    open: char,
    close: char,
    count: usize,
) -> Option<ObjectRange> {
    let (s, e) = enclosing(editor, at, open, close, count)?;
    if !inner {
        return Some(ObjectRange {
            start: s,
            end: e + 1,
            linewise: false,
        });
    }
    let mut start = s + 1;
    let mut end = e;
    if editor.char_at(start) == Some('\n') {
        start += 1;
    }
    let close_line = editor.line_of_offset(e);
    let close_line_start = editor.line_start(close_line);
    if close_line > editor.line_of_offset(s)
        && (close_line_start..e).all(|o| is_blank_at(editor, o))
    {
        end = close_line_start;
    }
    Some(ObjectRange {
        start: start.min(end),
        end,
        linewise: false,
    })
}

fn quoted(editor: &dyn EditorOps, at: Offset, inner: bool, quote: char) -> Option<ObjectRange> {
    let line = editor.line_of_offset(at);
    let (lo, hi) = (editor.line_start(line), editor.line_end(line));
    let mut quotes = Vec::new();
    let mut escaped = false;
    for o in lo..hi {
        match editor.char_at(o) {
            Some('\\') if !escaped => escaped = true,
            Some(c) => {
                if c == quote && !escaped {
                    quotes.push(o);
                }
                escaped = false;
            }
            None => break,
        }
    }
    let before = quotes.iter().filter(|&&q| q < at).count();
    let on_quote = quotes.contains(&at);
    let (open, close) = if on_quote {
        if before % 2 == 0 {
            (at, *quotes.get(before + 1)?)
        } else {
            (quotes[before - 1], at)
        }
    } else if before % 2 == 1 {
        (quotes[before - 1], *quotes.get(before)?)
    } else {
        (*quotes.get(before)?, *quotes.get(before + 1)?)
    };
    if inner {
        return Some(ObjectRange {
            start: open + 1,
            end: close,
            linewise: false,
        });
    }
    let mut start = open;
    let mut end = close + 1;
    if end < hi && is_blank_at(editor, end) {
        while end < hi && is_blank_at(editor, end) {
            end += 1;
        }
    } else {
        while start > lo && is_blank_at(editor, start - 1) {
            start -= 1;
        }
    }
    Some(ObjectRange {
        start,
        end,
        linewise: false,
    })
}

fn paragraph(editor: &dyn EditorOps, at: Offset, inner: bool, count: usize) -> Option<ObjectRange> {
    let last = editor.last_line();
    let line = editor.line_of_offset(at);
    let blank = |l: usize| is_blank_line(editor, l);
    let started_blank = blank(line);
    let mut start = line;
    while start > 0 && blank(start - 1) == started_blank {
        start -= 1;
    }
    let mut end = line;
    while end < last && blank(end + 1) == started_blank {
        end += 1;
    }
    let extend = |mut end: usize| {
        if end < last {
            let kind = blank(end + 1);
            end += 1;
            while end < last && blank(end + 1) == kind {
                end += 1;
            }
        }
        end
    };
    for _ in 1..count {
        end = extend(end);
    }
    if !inner {
        if started_blank || end < last {
            end = extend(end);
        } else {
            while start > 0 && blank(start - 1) {
                start -= 1;
            }
        }
    }
    Some(ObjectRange {
        start: editor.line_start(start),
        end: editor.line_start(end),
        linewise: true,
    })
}
