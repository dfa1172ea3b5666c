use ropey::Rope;
use unicode_segmentation::UnicodeSegmentation;
use vim_core::{EditorOps, Mode, Offset, Range, Selection};

/// A rope-backed buffer with one undo step per edit.
pub struct MockBuffer {
    rope: Rope,
    caret: Offset,
    selection: Option<Selection>,
    undo: Vec<(String, Offset)>,
    redo: Vec<(String, Offset)>,
    pub modes: Vec<Mode>,
    pub beeps: usize,
}

#[allow(dead_code)]
impl MockBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            caret: 0,
            selection: None,
            undo: Vec::new(),
            redo: Vec::new(),
            modes: Vec::new(),
            beeps: 0,
        }
    }

    /// Places the caret at a 0-based line and column.
    pub fn with_caret(mut self, line: usize, col: usize) -> Self {
        self.caret = self.rope.line_to_char(line) + col;
        self
    }

    pub fn contents(&self) -> String {
        self.rope.to_string()
    }

    /// The caret as (line, column).
    pub fn cursor(&self) -> (usize, usize) {
        let pos = self.position(self.caret);
        (pos.line, pos.col)
    }

    pub fn selected_text(&self) -> Option<String> {
        self.selection.map(|s| self.slice(s.range))
    }

    /// User-perceived characters on `line`.
    pub fn grapheme_count(&self, line: usize) -> usize {
        self.line_text(line).graphemes(true).count()
    }

    fn snapshot(&mut self) {
        self.undo.push((self.rope.to_string(), self.caret));
        self.redo.clear();
    }
}

impl EditorOps for MockBuffer {
    fn text_len(&self) -> usize {
        self.rope.len_chars()
    }

    fn char_at(&self, offset: Offset) -> Option<char> {
        self.rope.get_char(offset)
    }

    fn slice(&self, range: Range) -> String {
        let len = self.rope.len_chars();
        let end = range.end.min(len);
        let start = range.start.min(end);
        self.rope.slice(start..end).to_string()
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_of_offset(&self, offset: Offset) -> usize {
        self.rope.char_to_line(offset.min(self.rope.len_chars()))
    }

    fn line_start(&self, line: usize) -> Offset {
        let line = line.min(self.rope.len_lines() - 1);
        self.rope.line_to_char(line)
    }

    fn line_end(&self, line: usize) -> Offset {
        let line = line.min(self.rope.len_lines() - 1);
        if line + 1 < self.rope.len_lines() {
            self.rope.line_to_char(line + 1) - 1
        } else {
            self.rope.len_chars()
        }
    }

    fn replace(&mut self, range: Range, text: &str) {
        self.snapshot();
        let len = self.rope.len_chars();
        let end = range.end.min(len);
        let start = range.start.min(end);
        self.rope.remove(start..end);
        self.rope.insert(start, text);
    }

    fn caret(&self) -> Offset {
        self.caret
    }

    fn set_caret(&mut self, offset: Offset) {
        self.caret = offset.min(self.rope.len_chars());
    }

    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    fn mode_changed(&mut self, mode: Mode) {
        self.modes.push(mode);
    }

    fn beep(&mut self) {
        self.beeps += 1;
    }

    fn undo(&mut self) -> bool {
        let Some((text, caret)) = self.undo.pop() else {
            return false;
        };
        self.redo.push((self.rope.to_string(), self.caret));
        self.rope = Rope::from_str(&text);
        self.caret = caret;
        true
    }

    fn redo(&mut self) -> bool {
        let Some((text, caret)) = self.redo.pop() else {
            return false;
        };
        self.undo.push((self.rope.to_string(), self.caret));
        self.rope = Rope::from_str(&text);
        self.caret = caret;
        true
    }
}
