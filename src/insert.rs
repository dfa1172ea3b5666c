//! INSERT and REPLACE mode key handling.

use tracing::debug;

use crate::engine::Ctx;
use crate::error::Result;
use crate::key::{KeyCode, KeyEvent};
use crate::motion::line;
use crate::motion::word::is_keyword;
use crate::types::{Mode, Offset, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertKind {
    Insert,
    Replace,
}

/// Where a blockwise `c`, `I` or `A` replicates its text on `<Esc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockInsert {
    pub first_line: usize,
    pub last_line: usize,
    pub col: usize,
    /// Short lines are padded instead of skipped.
    pub append: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct InsertState {
    pub kind: InsertKind,
    pub count: usize,
    /// Every key handled in this session, for `.`.
    pub keys: Vec<KeyEvent>,
    /// Text typed since the caret last moved, for counts and `".`.
    pub text: String,
    /// Characters overwritten in REPLACE mode; `None` where text was added.
    pub replaced: Vec<Option<char>>,
    pub block: Option<BlockInsert>,
    /// `<C-r>` waits for a register name.
    pub pending_register: bool,
    /// Set for `o` (false) and `O` (true): each repeat opens a new line.
    pub open: Option<bool>,
    /// Whether the typed keys belong to the `.` record.
    pub record: bool,
}

impl Ctx<'_> {
    pub(crate) fn begin_insert(
        &mut self,
        kind: InsertKind,
        count: usize,
        block: Option<BlockInsert>,
        open: Option<bool>,
    ) {
        self.session.insert = Some(InsertState {
            kind,
            count: count.max(1),
            keys: Vec::new(),
            text: String::new(),
            replaced: Vec::new(),
            block,
            pending_register: false,
            open,
            record: self.session.dot_pending,
        });
        let mode = match kind {
            InsertKind::Insert => Mode::Insert,
            InsertKind::Replace => Mode::Replace,
        };
        self.set_mode(mode);
    }

    pub(crate) fn insert_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(state) = self.session.insert.as_mut() else {
            self.set_mode(Mode::Normal);
            return Ok(());
        };
        if key.is_esc() && !state.pending_register {
            return self.finish_insert();
        }
        state.keys.push(key);
        if state.pending_register {
            state.pending_register = false;
            if let Some(name) = key.printable()
                && let Some(reg) = self.shared.read_register(name)?
            {
                self.type_text(&reg.text);
            }
            return Ok(());
        }
        if let Some(c) = key.printable() {
            self.type_text(c.encode_utf8(&mut [0; 4]));
            return Ok(());
        }
        match key.code {
            KeyCode::Enter => self.type_text("\n"),
            KeyCode::Tab => {
                if self.shared.options.expandtab() {
                    let ts = self.shared.options.tabstop();
                    let col = self.editor.position(self.editor.caret()).col;
                    let spaces = " ".repeat(ts - col % ts);
                    self.type_text(&spaces);
                } else {
                    self.type_text("\t");
                }
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => {
                let caret = self.editor.caret();
                if caret < self.editor.text_len() {
                    self.editor.delete(Range::new(caret, caret + 1));
                }
            }
            KeyCode::Char('w') if key.is_ctrl('w') => self.delete_word_before(),
            KeyCode::Char('u') if key.is_ctrl('u') => self.delete_line_before(),
            KeyCode::Char('h') if key.is_ctrl('h') => self.backspace(),
            KeyCode::Char('r') if key.is_ctrl('r') => {
                if let Some(state) = self.session.insert.as_mut() {
                    state.pending_register = true;
                }
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Home | KeyCode::End => {
                self.insert_move(key.code);
            }
            _ => self.editor.beep(),
        }
        Ok(())
    }

    fn type_text(&mut self, text: &str) {
        let Some(state) = self.session.insert.as_mut() else {
            return;
        };
        let editor = &mut *self.editor;
        match state.kind {
            InsertKind::Insert => {
                let caret = editor.caret();
                editor.insert(caret, text);
                editor.set_caret(caret + text.chars().count());
            }
            InsertKind::Replace => {
                for c in text.chars() {
                    let caret = editor.caret();
                    let line_end = editor.line_end(editor.line_of_offset(caret));
                    if c != '\n' && caret < line_end {
                        state.replaced.push(editor.char_at(caret));
                        editor.replace(Range::new(caret, caret + 1), c.encode_utf8(&mut [0; 4]));
                    } else {
                        state.replaced.push(None);
                        editor.insert(caret, c.encode_utf8(&mut [0; 4]));
                    }
                    editor.set_caret(caret + 1);
                }
            }
        }
        state.text.push_str(text);
    }

    fn backspace(&mut self) {
        let caret = self.editor.caret();
        if caret == 0 {
            self.editor.beep();
            return;
        }
        let Some(state) = self.session.insert.as_mut() else {
            return;
        };
        let prev = Range::new(caret - 1, caret);
        match state.kind {
            InsertKind::Replace => match state.replaced.pop() {
                Some(Some(old)) => self.editor.replace(prev, old.encode_utf8(&mut [0; 4])),
                Some(None) => self.editor.delete(prev),
                None => {}
            },
            InsertKind::Insert => self.editor.delete(prev),
        }
        state.text.pop();
        self.editor.set_caret(caret - 1);
    }

    /// `<C-w>`: deletes the word before the caret, or the line break when
    /// the caret is at the start of a line.
    fn delete_word_before(&mut self) {
        let editor = &mut *self.editor;
        let caret = editor.caret();
        let line_start = editor.line_start(editor.line_of_offset(caret));
        let mut start = caret;
        if start == line_start {
            start = start.saturating_sub(1);
        } else {
            while start > line_start && matches!(editor.char_at(start - 1), Some(' ' | '\t')) {
                start -= 1;
            }
            let keyword = editor.char_at(start.saturating_sub(1)).is_some_and(is_keyword);
            while start > line_start
                && editor.char_at(start - 1).is_some_and(|c| {
                    !matches!(c, ' ' | '\t') && is_keyword(c) == keyword
                })
            {
                start -= 1;
            }
        }
        self.remove_before(start, caret);
    }

    /// `<C-u>`: deletes back to the indent, then to the line start.
    fn delete_line_before(&mut self) {
        let caret = self.editor.caret();
        let line = self.editor.line_of_offset(caret);
        let indent = self.editor.first_non_blank(line);
        let start = if caret > indent {
            indent
        } else {
            self.editor.line_start(line)
        };
        self.remove_before(start, caret);
    }

    fn remove_before(&mut self, start: Offset, caret: Offset) {
        if start >= caret {
            self.editor.beep();
            return;
        }
        self.editor.delete(Range::new(start, caret));
        self.editor.set_caret(start);
        if let Some(state) = self.session.insert.as_mut() {
            let keep = state.text.chars().count().saturating_sub(caret - start);
            state.text = state.text.chars().take(keep).collect();
        }
    }

    fn insert_move(&mut self, code: KeyCode) {
        let editor = &mut *self.editor;
        let caret = editor.caret();
        let line = editor.line_of_offset(caret);
        let target = match code {
            KeyCode::Left => line::left(editor, caret, 1),
            KeyCode::Right => line::right(editor, caret, 1, true),
            KeyCode::Home => Some(editor.line_start(line)),
            KeyCode::End => Some(editor.line_end(line)),
            _ => line::vertical(editor, caret, 1, code == KeyCode::Down).map(|l| {
                line::column_offset(editor, l, caret - editor.line_start(line), true)
            }),
        };
        match target {
            Some(target) => {
                editor.set_caret(target);
                if let Some(state) = self.session.insert.as_mut() {
                    state.text.clear();
                    state.replaced.clear();
                    state.count = 1;
                    state.block = None;
                }
            }
            None => editor.beep(),
        }
    }

    /// `<Esc>`: repeats the insert for its count, replicates block inserts,
    /// stores `".` and steps the caret back onto the text.
    pub(crate) fn finish_insert(&mut self) -> Result<()> {
        let Some(state) = self.session.insert.take() else {
            self.set_mode(Mode::Normal);
            return Ok(());
        };
        let editor = &mut *self.editor;
        if state.count > 1 && !state.text.is_empty() {
            let piece = match state.open {
                Some(_) => format!("\n{}", state.text),
                None => state.text.clone(),
            };
            let repeated = piece.repeat(state.count - 1);
            let caret = editor.caret();
            editor.insert(caret, &repeated);
            editor.set_caret(caret + repeated.chars().count());
        }
        let mut block_caret = None;
        if let Some(block) = state.block
            && !state.text.is_empty()
            && !state.text.contains('\n')
        {
            for line in block.first_line + 1..=block.last_line.min(editor.last_line()) {
                let len = editor.line_len(line);
                let start = editor.line_start(line);
                if len < block.col {
                    if !block.append {
                        continue;
                    }
                    editor.insert(start + len, &" ".repeat(block.col - len));
                }
                editor.insert(start + block.col, &state.text);
            }
            block_caret = Some(editor.line_start(block.first_line) + block.col);
        }
        debug!(text = %state.text, count = state.count, "insert finished");
        self.shared.registers.set_last_inserted(state.text.clone());
        if state.record
            && !self.session.replaying_dot
            && let Some(dot) = self.session.dot.as_mut()
        {
            dot.inserted = Some(state.keys);
        }
        let caret = match block_caret {
            Some(caret) => caret,
            None => {
                let caret = self.editor.caret();
                let line_start = self.editor.line_start(self.editor.line_of_offset(caret));
                if caret > line_start { caret - 1 } else { caret }
            }
        };
        let caret = self.editor.clamp(caret);
        self.editor.set_caret(caret);
        self.session.preferred_col = self.editor.position(caret).col;
        self.set_mode(Mode::Normal);
        Ok(())
    }
}
