use crate::types::{Mode, Offset, Position, Range, Selection};

/// The capability surface a host editor exposes to the engine.
///
/// Offsets are character indices into the whole buffer. A line's end offset is
/// the offset of its terminating newline, or the buffer length for the last
/// line. The engine drives a single primary caret.
pub trait EditorOps {
    // Basic queries
    fn text_len(&self) -> usize;
    fn char_at(&self, offset: Offset) -> Option<char>;
    fn slice(&self, range: Range) -> String;

    fn line_count(&self) -> usize;
    fn line_of_offset(&self, offset: Offset) -> usize;
    fn line_start(&self, line: usize) -> Offset;
    fn line_end(&self, line: usize) -> Offset; // offset of the newline, not past it

    // Mutation
    fn replace(&mut self, range: Range, text: &str);

    // Caret and selection
    fn caret(&self) -> Offset;
    fn set_caret(&mut self, offset: Offset);
    fn selection(&self) -> Option<Selection> {
        None
    }
    fn set_selection(&mut self, selection: Option<Selection>);

    // Host feedback; optional
    fn mode_changed(&mut self, _mode: Mode) {}
    fn beep(&mut self) {}
    fn undo(&mut self) -> bool {
        false
    }
    fn redo(&mut self) -> bool {
        false
    }

    fn insert(&mut self, at: Offset, text: &str) {
        self.replace(Range::empty(at), text);
    }

    fn delete(&mut self, range: Range) {
        if !range.is_empty() {
            self.replace(range, "");
        }
    }

    fn text(&self) -> String {
        self.slice(Range::new(0, self.text_len()))
    }

    fn line_text(&self, line: usize) -> String {
        self.slice(Range::new(self.line_start(line), self.line_end(line)))
    }

    fn line_len(&self, line: usize) -> usize {
        self.line_end(line) - self.line_start(line)
    }

    fn last_line(&self) -> usize {
        self.line_count().saturating_sub(1)
    }

    fn position(&self, offset: Offset) -> Position {
        let line = self.line_of_offset(offset);
        Position {
            line,
            col: offset.saturating_sub(self.line_start(line)),
        }
    }

    fn offset_at(&self, pos: Position) -> Offset {
        let line = pos.line.min(self.last_line());
        (self.line_start(line) + pos.col).min(self.line_end(line))
    }

    /// Offset of the last character on `line`, or its start when empty.
    fn line_last_char(&self, line: usize) -> Offset {
        let start = self.line_start(line);
        let end = self.line_end(line);
        if end > start { end - 1 } else { start }
    }

    fn first_non_blank(&self, line: usize) -> Offset {
        let end = self.line_end(line);
        let mut offset = self.line_start(line);
        while offset < end && matches!(self.char_at(offset), Some(' ' | '\t')) {
            offset += 1;
        }
        offset
    }

    /// Keeps `offset` on a character in normal mode.
    fn clamp(&self, offset: Offset) -> Offset {
        if self.text_len() == 0 {
            return 0;
        }
        let offset = offset.min(self.text_len());
        let line = self.line_of_offset(offset);
        offset.min(self.line_last_char(line))
    }
}

/// Backing store for the `+` and `*` registers.
pub trait Clipboard: Send {
    fn get(&mut self) -> Option<String>;
    fn set(&mut self, text: String);
}
