//! The mode state machine and the visual selection it owns.

use tracing::debug;

use crate::operator::OpRange;
use crate::traits::EditorOps;
use crate::types::{Mode, Offset, Range, Selection, VisualKind};

/// The size of a visual selection, kept so `.` can repeat its operator
/// from another caret position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualExtent {
    /// Characters on one line.
    Chars(usize),
    /// Characters across lines, ending at `end_col` on the last one.
    MultiLine { lines: usize, end_col: usize },
    Lines(usize),
    Block { lines: usize, width: usize },
}

impl VisualExtent {
    pub fn of(editor: &dyn EditorOps, range: &OpRange) -> Self {
        match *range {
            OpRange::Chars(r) => {
                let first = editor.line_of_offset(r.start);
                let last = range.last_line(editor);
                if first == last {
                    VisualExtent::Chars(r.end - r.start)
                } else {
                    VisualExtent::MultiLine {
                        lines: last - first,
                        end_col: r.end - editor.line_start(last),
                    }
                }
            }
            OpRange::Lines { first, last } => VisualExtent::Lines(last - first + 1),
            OpRange::Block {
                first_line,
                last_line,
                start_col,
                end_col,
            } => VisualExtent::Block {
                lines: last_line - first_line,
                width: end_col.saturating_sub(start_col),
            },
        }
    }

    /// A region of the same size starting at `caret`.
    pub fn at(&self, editor: &dyn EditorOps, caret: Offset) -> OpRange {
        let pos = editor.position(caret);
        let down = |n: usize| (pos.line + n).min(editor.last_line());
        let chars_to = |line: usize, end: Offset| {
            let end = end.min(editor.line_end(line) + 1).min(editor.text_len());
            OpRange::Chars(Range::new(caret, end.max(caret)))
        };
        match *self {
            VisualExtent::Chars(len) => chars_to(pos.line, caret + len),
            VisualExtent::MultiLine { lines, end_col } => {
                let last = down(lines);
                chars_to(last, editor.line_start(last) + end_col)
            }
            VisualExtent::Lines(count) => OpRange::Lines {
                first: pos.line,
                last: down(count.saturating_sub(1)),
            },
            VisualExtent::Block { lines, width } => OpRange::Block {
                first_line: pos.line,
                last_line: down(lines),
                start_col: pos.col,
                end_col: pos.col + width,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModeMachine {
    mode: Mode,
    /// The fixed end of a visual or select selection.
    anchor: Offset,
    /// Lines of the last visual selection, for `'<` and `'>`.
    last_visual: Option<(usize, usize)>,
}

impl ModeMachine {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            anchor: 0,
            last_visual: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_anchor(&mut self, anchor: Offset) {
        self.anchor = anchor;
    }

    pub fn last_visual(&self) -> Option<(usize, usize)> {
        self.last_visual
    }

    /// Switches mode and tells the host. Leaving visual or select clears
    /// the host selection and remembers its lines.
    pub fn set(&mut self, editor: &mut dyn EditorOps, mode: Mode) {
        if self.mode == mode {
            return;
        }
        if self.mode.visual_kind().is_some() && mode.visual_kind().is_none() {
            let caret = editor.caret();
            let (a, b) = (editor.line_of_offset(self.anchor), editor.line_of_offset(caret));
            self.last_visual = Some((a.min(b), a.max(b)));
            editor.set_selection(None);
        }
        debug!(from = self.mode.name(), to = mode.name(), "mode change");
        self.mode = mode;
        editor.mode_changed(mode);
    }

    /// Enters VISUAL or SELECT with the anchor at the caret.
    pub fn start_visual(&mut self, editor: &mut dyn EditorOps, kind: VisualKind, select: bool, adj: usize) {
        self.anchor = editor.caret();
        let mode = if select { Mode::Select(kind) } else { Mode::Visual(kind) };
        self.set(editor, mode);
        self.sync(editor, adj);
    }

    /// The selection implied by anchor, caret and kind.
    pub fn selection(&self, editor: &dyn EditorOps, adj: usize) -> Option<Selection> {
        let kind = self.mode.visual_kind()?;
        let caret = editor.caret();
        let (lo, hi) = (self.anchor.min(caret), self.anchor.max(caret));
        let len = editor.text_len();
        let range = match kind {
            VisualKind::LineWise => {
                let first = editor.line_of_offset(lo);
                let last = editor.line_of_offset(hi);
                crate::operator::lines_range(editor, first, last)
            }
            VisualKind::CharWise if self.mode.is_select() => {
                let end = if caret > self.anchor { caret } else { self.anchor + 1 };
                Range::new(lo, end.min(len))
            }
            _ => Range::new(lo, (hi + adj).min(len)),
        };
        Some(Selection { range, kind })
    }

    /// Pushes the derived selection to the host.
    pub fn sync(&self, editor: &mut dyn EditorOps, adj: usize) {
        if let Some(selection) = self.selection(editor, adj) {
            editor.set_selection(Some(selection));
        }
    }

    /// `<C-g>` between VISUAL and SELECT, keeping the kind and moving the
    /// caret by the selection adjustment on non-linewise selections.
    pub fn toggle_select(&mut self, editor: &mut dyn EditorOps, adj: usize) {
        let Some(kind) = self.mode.visual_kind() else {
            return;
        };
        let Some(selection) = self.selection(editor, adj) else {
            return;
        };
        let caret = editor.caret();
        let end = selection.range.end;
        let to_select = self.mode.is_visual();
        if kind != VisualKind::LineWise {
            if to_select {
                if caret + adj == end {
                    editor.set_caret(caret + adj);
                }
            } else if caret == end
                && caret >= adj
                && editor.line_start(editor.line_of_offset(caret)) <= caret - adj
            {
                editor.set_caret(caret - adj);
            }
        }
        let mode = if to_select { Mode::Select(kind) } else { Mode::Visual(kind) };
        self.set(editor, mode);
        editor.set_selection(Some(selection));
    }

    /// `o`: swaps caret and anchor.
    pub fn swap_ends(&mut self, editor: &mut dyn EditorOps, adj: usize) {
        let caret = editor.caret();
        editor.set_caret(self.anchor);
        self.anchor = caret;
        self.sync(editor, adj);
    }

    /// The text a visual-mode operator acts on. It matches
    /// [`ModeMachine::selection`] for the same `adj`.
    pub fn op_range(&self, editor: &dyn EditorOps, adj: usize, to_line_end: bool) -> Option<OpRange> {
        let kind = self.mode.visual_kind()?;
        let caret = editor.caret();
        let (lo, hi) = (self.anchor.min(caret), self.anchor.max(caret));
        Some(match kind {
            VisualKind::CharWise => {
                let end = if self.mode.is_select() {
                    if caret > self.anchor { caret } else { self.anchor + 1 }
                } else {
                    hi + adj
                };
                OpRange::Chars(Range::new(lo, end.min(editor.text_len())))
            }
            VisualKind::LineWise => OpRange::Lines {
                first: editor.line_of_offset(lo),
                last: editor.line_of_offset(hi),
            },
            VisualKind::BlockWise => {
                let a = editor.position(self.anchor);
                let c = editor.position(caret);
                let first_line = a.line.min(c.line);
                let last_line = a.line.max(c.line);
                let end_col = if to_line_end {
                    (first_line..=last_line).map(|l| editor.line_len(l)).max().unwrap_or(0)
                } else {
                    a.col.max(c.col) + adj
                };
                OpRange::Block {
                    first_line,
                    last_line,
                    start_col: a.col.min(c.col),
                    end_col,
                }
            }
        })
    }
}
