//! Operators and the text transformations they perform.

use crate::options::Options;
use crate::register::RegisterType;
use crate::traits::EditorOps;
use crate::types::{Offset, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Delete,
    Yank,
    Change,
    ShiftLeft,
    ShiftRight,
    LowerCase,
    UpperCase,
    ToggleCase,
    Rot13,
}

impl Operator {
    /// The key sequence that invokes the operator in normal mode.
    pub fn keys(self) -> &'static str {
        match self {
            Operator::Delete => "d",
            Operator::Yank => "y",
            Operator::Change => "c",
            Operator::ShiftLeft => "<lt>",
            Operator::ShiftRight => ">",
            Operator::LowerCase => "gu",
            Operator::UpperCase => "gU",
            Operator::ToggleCase => "g~",
            Operator::Rot13 => "g?",
        }
    }

    /// Whether `typed` (the keys after the operator) repeats it, selecting
    /// whole lines: `dd`, `>>`, `gUU`, `gUgU`, and `~~` under `tildeop`.
    pub fn doubles(self, typed: &str, tildeop: bool) -> bool {
        let keys = self.keys();
        if typed == keys {
            return true;
        }
        if let Some(last) = keys.strip_prefix('g')
            && typed == last
        {
            return true;
        }
        self == Operator::ToggleCase && tildeop && typed == "~"
    }

    /// Operators that leave the text alone.
    pub fn is_yank(self) -> bool {
        self == Operator::Yank
    }

    /// Shifts always act on whole lines.
    pub fn is_linewise_only(self) -> bool {
        matches!(self, Operator::ShiftLeft | Operator::ShiftRight)
    }
}

/// The text an operator acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpRange {
    Chars(Range),
    Lines { first: usize, last: usize },
    /// Columns `[start_col, end_col)` on each line.
    Block {
        first_line: usize,
        last_line: usize,
        start_col: usize,
        end_col: usize,
    },
}

impl OpRange {
    pub fn first_line(&self, editor: &dyn EditorOps) -> usize {
        match *self {
            OpRange::Chars(range) => editor.line_of_offset(range.start),
            OpRange::Lines { first, .. } => first,
            OpRange::Block { first_line, .. } => first_line,
        }
    }

    pub fn last_line(&self, editor: &dyn EditorOps) -> usize {
        match *self {
            OpRange::Chars(range) => editor.line_of_offset(range.end.saturating_sub(1).max(range.start)),
            OpRange::Lines { last, .. } => last,
            OpRange::Block { last_line, .. } => last_line,
        }
    }

    /// True when a charwise range stays within one line.
    pub fn is_small(&self, editor: &dyn EditorOps) -> bool {
        match self {
            OpRange::Chars(range) => {
                editor.line_of_offset(range.start) == editor.line_of_offset(range.end)
            }
            _ => false,
        }
    }

    pub fn register_type(&self) -> RegisterType {
        match *self {
            OpRange::Chars(_) => RegisterType::CharWise,
            OpRange::Lines { .. } => RegisterType::LineWise,
            OpRange::Block {
                start_col, end_col, ..
            } => RegisterType::BlockWise {
                width: end_col.saturating_sub(start_col),
            },
        }
    }
}

/// The offsets covered by `line` within a block's columns.
pub fn block_segment(editor: &dyn EditorOps, line: usize, start_col: usize, end_col: usize) -> Range {
    let ls = editor.line_start(line);
    let len = editor.line_len(line);
    Range::new(ls + start_col.min(len), ls + end_col.min(len))
}

/// Offsets spanned by whole lines, newline of `last` included when present.
pub fn lines_range(editor: &dyn EditorOps, first: usize, last: usize) -> Range {
    let end = if last < editor.last_line() {
        editor.line_start(last + 1)
    } else {
        editor.text_len()
    };
    Range::new(editor.line_start(first), end)
}

/// The text an operator would put in a register.
pub fn extract(editor: &dyn EditorOps, range: &OpRange) -> String {
    match *range {
        OpRange::Chars(range) => editor.slice(range),
        OpRange::Lines { first, last } => {
            let mut text = editor.slice(lines_range(editor, first, last));
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text
        }
        OpRange::Block {
            first_line,
            last_line,
            start_col,
            end_col,
        } => (first_line..=last_line)
            .map(|line| editor.slice(block_segment(editor, line, start_col, end_col)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Deletes the range and returns where the caret goes.
pub fn delete(editor: &mut dyn EditorOps, range: &OpRange) -> Offset {
    match *range {
        OpRange::Chars(range) => {
            editor.delete(range);
            range.start
        }
        OpRange::Lines { first, last } => {
            let mut span = lines_range(editor, first, last);
            // Deleting through the final line also removes the newline before it.
            if last >= editor.last_line() && first > 0 {
                span.start -= 1;
            }
            editor.delete(span);
            let line = first.min(editor.last_line());
            editor.first_non_blank(line)
        }
        OpRange::Block {
            first_line,
            last_line,
            start_col,
            end_col,
        } => {
            for line in (first_line..=last_line).rev() {
                editor.delete(block_segment(editor, line, start_col, end_col));
            }
            editor.line_start(first_line) + start_col.min(editor.line_len(first_line))
        }
    }
}

/// Deletes the text of a change, keeping an empty line for linewise
/// ranges. Returns the insert position.
pub fn change(editor: &mut dyn EditorOps, range: &OpRange) -> Offset {
    match *range {
        OpRange::Lines { first, last } => {
            let start = editor.line_start(first);
            editor.delete(Range::new(start, editor.line_end(last)));
            start
        }
        _ => delete(editor, range),
    }
}

/// Applies a case operator, returning the caret offset.
pub fn convert_case(editor: &mut dyn EditorOps, range: &OpRange, op: Operator) -> Offset {
    let spans: Vec<Range> = match *range {
        OpRange::Chars(range) => vec![range],
        OpRange::Lines { first, last } => vec![Range::new(editor.line_start(first), editor.line_end(last))],
        OpRange::Block {
            first_line,
            last_line,
            start_col,
            end_col,
        } => (first_line..=last_line)
            .map(|line| block_segment(editor, line, start_col, end_col))
            .collect(),
    };
    for span in &spans {
        let text = editor.slice(*span);
        let converted: String = text.chars().map(|c| convert_char(c, op)).collect();
        if converted != text {
            editor.replace(*span, &converted);
        }
    }
    match *range {
        OpRange::Lines { first, .. } => editor.first_non_blank(first),
        _ => spans.first().map_or(0, |s| s.start),
    }
}

pub fn convert_char(c: char, op: Operator) -> char {
    match op {
        Operator::LowerCase => c.to_lowercase().next().unwrap_or(c),
        Operator::UpperCase => c.to_uppercase().next().unwrap_or(c),
        Operator::ToggleCase => {
            if c.is_uppercase() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                c.to_uppercase().next().unwrap_or(c)
            }
        }
        Operator::Rot13 => match c {
            'a'..='z' => char::from((c as u8 - b'a' + 13) % 26 + b'a'),
            'A'..='Z' => char::from((c as u8 - b'A' + 13) % 26 + b'A'),
            _ => c,
        },
        _ => c,
    }
}

/// Display width of the leading whitespace of `line`.
fn indent_width(editor: &dyn EditorOps, line: usize, tabstop: usize) -> (usize, Offset) {
    let mut width = 0;
    let mut offset = editor.line_start(line);
    let end = editor.line_end(line);
    while offset < end {
        match editor.char_at(offset) {
            Some(' ') => width += 1,
            Some('\t') => width += tabstop - width % tabstop,
            _ => break,
        }
        offset += 1;
    }
    (width, offset)
}

fn make_indent(width: usize, options: &Options) -> String {
    if options.expandtab() {
        " ".repeat(width)
    } else {
        let ts = options.tabstop().max(1);
        let mut s = "\t".repeat(width / ts);
        s.push_str(&" ".repeat(width % ts));
        s
    }
}

/// `>` and `<` over `first..=last`, `amount` shiftwidths. Empty lines are
/// left alone.
pub fn shift(
    editor: &mut dyn EditorOps,
    first: usize,
    last: usize,
    amount: usize,
    left: bool,
    options: &Options,
) -> Offset {
    let sw = options.shiftwidth();
    let ts = options.tabstop().max(1);
    for line in first..=last.min(editor.last_line()) {
        if editor.line_len(line) == 0 {
            continue;
        }
        let (width, indent_end) = indent_width(editor, line, ts);
        let new_width = if left {
            width.saturating_sub(sw * amount)
        } else {
            width + sw * amount
        };
        let start = editor.line_start(line);
        editor.replace(Range::new(start, indent_end), &make_indent(new_width, options));
    }
    editor.first_non_blank(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubling_rules() {
        assert!(Operator::Delete.doubles("d", false));
        assert!(Operator::UpperCase.doubles("U", false));
        assert!(Operator::UpperCase.doubles("gU", false));
        assert!(!Operator::UpperCase.doubles("u", false));
        assert!(Operator::ShiftLeft.doubles("<lt>", false));
        assert!(Operator::ToggleCase.doubles("~", true));
        assert!(Operator::ToggleCase.doubles("~", false));
    }

    #[test]
    fn rot13_round_trips() {
        let text = "Hello, World";
        let once: String = text.chars().map(|c| convert_char(c, Operator::Rot13)).collect();
        assert_eq!(once, "Uryyb, Jbeyq");
        let twice: String = once.chars().map(|c| convert_char(c, Operator::Rot13)).collect();
        assert_eq!(twice, text);
    }
}
