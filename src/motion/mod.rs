//! Motion computation and conversion of motion ranges to operator ranges.

pub mod bracket;
pub mod line;
pub mod textobj;
pub mod word;

use tracing::trace;

use crate::command::Motion;
use crate::error::{EngineError, Result};
use crate::operator::{OpRange, Operator};
use crate::options::Options;
use crate::search::{Pattern, SearchState, escape_literal, search_buffer};
use crate::traits::EditorOps;
use crate::types::{MotionType, Offset, Range};

/// The last `f` `F` `t` `T`, repeated by `;` and `,`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastFind {
    pub ch: char,
    pub forward: bool,
    pub till: bool,
}

/// A resolved motion. For ordinary motions `start..end` spans the caret and
/// the target in buffer order; text objects carry their own bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionRange {
    pub start: Offset,
    pub end: Offset,
    pub kind: MotionType,
    /// Where the caret lands when no operator is pending.
    pub target: Offset,
    /// Text objects are exempt from the exclusive-linewise rule.
    pub from_object: bool,
}

impl MotionRange {
    fn between(caret: Offset, target: Offset, kind: MotionType) -> Self {
        Self {
            start: caret.min(target),
            end: caret.max(target),
            kind,
            target,
            from_object: false,
        }
    }

    /// The range an operator acts on.
    pub fn to_op_range(&self, editor: &dyn EditorOps) -> OpRange {
        let start_line = editor.line_of_offset(self.start);
        let end_line = editor.line_of_offset(self.end);
        match self.kind {
            MotionType::LineWise => OpRange::Lines {
                first: start_line,
                last: end_line,
            },
            MotionType::Inclusive => {
                let end = match editor.char_at(self.end) {
                    None | Some('\n') => self.end,
                    Some(_) => self.end + 1,
                };
                OpRange::Chars(Range::new(self.start, end))
            }
            MotionType::Exclusive => {
                if !self.from_object
                    && end_line > start_line
                    && self.end == editor.line_start(end_line)
                {
                    if self.start <= editor.first_non_blank(start_line) {
                        OpRange::Lines {
                            first: start_line,
                            last: end_line - 1,
                        }
                    } else {
                        OpRange::Chars(Range::new(self.start, editor.line_end(end_line - 1)))
                    }
                } else {
                    OpRange::Chars(Range::new(self.start, self.end))
                }
            }
            MotionType::BlockWise => OpRange::Chars(Range::new(self.start, self.end)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionResult {
    Found(MotionRange),
    NotFound,
}

/// Everything a motion may read or update.
pub struct MotionContext<'a> {
    pub editor: &'a dyn EditorOps,
    pub options: &'a Options,
    pub search: &'a mut SearchState,
    pub last_find: &'a mut Option<LastFind>,
    pub messages: &'a mut Vec<String>,
    pub caret: Offset,
    pub count: usize,
    pub has_count: bool,
    pub operator: Option<Operator>,
    /// Column `j`/`k` aim for; `usize::MAX` after `$`.
    pub preferred_col: usize,
}

impl MotionContext<'_> {
    fn found(&self, target: Offset, kind: MotionType) -> Result<MotionResult> {
        Ok(MotionResult::Found(MotionRange::between(self.caret, target, kind)))
    }

    fn found_opt(&self, target: Option<Offset>, kind: MotionType) -> Result<MotionResult> {
        match target {
            Some(target) => self.found(target, kind),
            None => Ok(MotionResult::NotFound),
        }
    }

    fn to_line(&self, line: usize) -> Result<MotionResult> {
        let line = line.min(self.editor.last_line());
        self.found(self.editor.first_non_blank(line), MotionType::LineWise)
    }

    fn search(&mut self, pattern: &str, forward: bool, from: Offset, smart: bool) -> Result<MotionResult> {
        let compiled = Pattern::new(
            pattern,
            self.options.ignorecase(),
            smart && self.options.smartcase(),
            self.search.last_replacement.as_deref(),
        )?;
        let hit = search_buffer(
            self.editor,
            &compiled,
            from,
            forward,
            self.count,
            self.options.wrapscan(),
        )
        .ok_or_else(|| EngineError::PatternNotFound(pattern.to_string()))?;
        if hit.wrapped {
            self.messages.push(if forward {
                "search hit BOTTOM, continuing at TOP".to_string()
            } else {
                "search hit TOP, continuing at BOTTOM".to_string()
            });
        }
        self.found(hit.offset, MotionType::Exclusive)
    }
}

/// Computes `motion` from the caret. Search failures are errors; every other
/// missing target is `NotFound`.
pub fn compute(cx: &mut MotionContext<'_>, motion: &Motion) -> Result<MotionResult> {
    let editor = cx.editor;
    let caret = cx.caret;
    let count = cx.count.max(1);
    let pending = cx.operator.is_some();
    trace!(?motion, caret, count, "motion");
    match motion {
        Motion::Left => cx.found_opt(line::left(editor, caret, count), MotionType::Exclusive),
        Motion::Right => cx.found_opt(line::right(editor, caret, count, pending), MotionType::Exclusive),
        Motion::WrapLeft => {
            let target = if cx.options.whichwrap('b') {
                line::wrap_left(editor, caret, count)
            } else {
                line::left(editor, caret, count)
            };
            cx.found_opt(target, MotionType::Exclusive)
        }
        Motion::WrapRight => {
            let target = if cx.options.whichwrap('s') && !pending {
                line::wrap_right(editor, caret, count)
            } else {
                line::right(editor, caret, count, pending)
            };
            cx.found_opt(target, MotionType::Exclusive)
        }
        Motion::Up | Motion::Down => {
            let Some(line) = line::vertical(editor, caret, count, *motion == Motion::Down) else {
                return Ok(MotionResult::NotFound);
            };
            let target = line::column_offset(editor, line, cx.preferred_col, false);
            cx.found(target, MotionType::LineWise)
        }
        Motion::LineStart => cx.found(editor.line_start(editor.line_of_offset(caret)), MotionType::Exclusive),
        Motion::FirstNonBlank => {
            cx.found(editor.first_non_blank(editor.line_of_offset(caret)), MotionType::Exclusive)
        }
        Motion::LineEnd => cx.found_opt(line::line_end(editor, caret, count), MotionType::Inclusive),
        Motion::LastNonBlank => cx.found_opt(line::last_non_blank(editor, caret, count), MotionType::Inclusive),
        Motion::Column => {
            let line = editor.line_of_offset(caret);
            cx.found(line::column_offset(editor, line, count - 1, false), MotionType::Exclusive)
        }
        Motion::NextLine => {
            let line = editor.line_of_offset(caret) + count;
            if line > editor.last_line() {
                return Ok(MotionResult::NotFound);
            }
            cx.to_line(line)
        }
        Motion::PrevLine => match editor.line_of_offset(caret).checked_sub(count) {
            Some(line) => cx.to_line(line),
            None => Ok(MotionResult::NotFound),
        },
        Motion::CurrentLine => cx.to_line(editor.line_of_offset(caret) + count - 1),
        Motion::FirstLine => cx.to_line(if cx.has_count { count - 1 } else { 0 }),
        Motion::LastLine => cx.to_line(if cx.has_count { count - 1 } else { editor.last_line() }),
        Motion::Percent => {
            if cx.has_count {
                if count > 100 {
                    return Ok(MotionResult::NotFound);
                }
                let line = (count * editor.line_count()).div_ceil(100);
                cx.to_line(line.saturating_sub(1))
            } else {
                cx.found_opt(bracket::match_pair(editor, caret), MotionType::Inclusive)
            }
        }
        Motion::WordForward { big } => {
            let on_word = editor.char_at(caret).is_some_and(|c| !c.is_whitespace());
            if cx.operator == Some(Operator::Change) && on_word {
                let target = word::end(editor, caret, count, *big, true);
                cx.found_opt(target, MotionType::Inclusive)
            } else {
                let target = word::forward(editor, caret, count, *big, pending);
                cx.found_opt(target, MotionType::Exclusive)
            }
        }
        Motion::WordBackward { big } => cx.found_opt(word::backward(editor, caret, count, *big), MotionType::Exclusive),
        Motion::WordEnd { big } => cx.found_opt(word::end(editor, caret, count, *big, false), MotionType::Inclusive),
        Motion::WordEndBackward { big } => {
            cx.found_opt(word::end_backward(editor, caret, count, *big), MotionType::Inclusive)
        }
        Motion::Find { ch, forward, till } => {
            *cx.last_find = Some(LastFind {
                ch: *ch,
                forward: *forward,
                till: *till,
            });
            let target = line::find_char(editor, caret, *ch, *forward, *till, count, false);
            let kind = if *forward { MotionType::Inclusive } else { MotionType::Exclusive };
            cx.found_opt(target, kind)
        }
        Motion::RepeatFind { reverse } => {
            let Some(last) = *cx.last_find else {
                return Ok(MotionResult::NotFound);
            };
            let forward = last.forward != *reverse;
            let target = line::find_char(editor, caret, last.ch, forward, last.till, count, true);
            let kind = if forward { MotionType::Inclusive } else { MotionType::Exclusive };
            cx.found_opt(target, kind)
        }
        Motion::Unmatched { bracket } => {
            cx.found_opt(bracket::unmatched(editor, caret, *bracket, count), MotionType::Exclusive)
        }
        Motion::ParagraphForward | Motion::ParagraphBackward => {
            let forward = *motion == Motion::ParagraphForward;
            match line::paragraph(editor, caret, count, forward) {
                Some(target) => {
                    let kind = if target.inclusive { MotionType::Inclusive } else { MotionType::Exclusive };
                    cx.found(target.offset, kind)
                }
                None => Ok(MotionResult::NotFound),
            }
        }
        Motion::Search { pattern, forward } => {
            let pattern = if pattern.is_empty() {
                cx.search.last_pattern.clone().ok_or(EngineError::NoPreviousPattern)?
            } else {
                pattern.clone()
            };
            cx.search.set_pattern(&pattern, *forward);
            cx.search(&pattern, *forward, caret, true)
        }
        Motion::SearchNext { reverse } => {
            let pattern = cx.search.last_pattern.clone().ok_or(EngineError::NoPreviousPattern)?;
            cx.search.highlight = true;
            let forward = cx.search.last_forward != *reverse;
            cx.search(&pattern, forward, caret, true)
        }
        Motion::SearchWord { forward, whole } => {
            let Some((start, end, keyword)) = word::word_under(editor, caret) else {
                return Ok(MotionResult::NotFound);
            };
            let word = escape_literal(&editor.slice(Range::new(start, end)));
            let pattern = if *whole && keyword {
                format!("\\<{word}\\>")
            } else {
                word
            };
            cx.search.set_pattern(&pattern, *forward);
            cx.search(&pattern, *forward, start, false)
        }
        Motion::TextObject(object) => {
            let Some(obj) = textobj::select(editor, caret, *object, count) else {
                return Ok(MotionResult::NotFound);
            };
            let range = if obj.linewise {
                MotionRange {
                    start: obj.start,
                    end: obj.end,
                    kind: MotionType::LineWise,
                    target: obj.end,
                    from_object: true,
                }
            } else {
                MotionRange {
                    start: obj.start,
                    end: obj.end,
                    kind: MotionType::Exclusive,
                    target: obj.end.saturating_sub(1).max(obj.start),
                    from_object: true,
                }
            };
            Ok(MotionResult::Found(range))
        }
    }
}

/// Moves the caret after a motion without an operator, keeping it on a
/// character.
pub fn caret_target(editor: &dyn EditorOps, range: &MotionRange) -> Offset {
    editor.clamp(range.target)
}
