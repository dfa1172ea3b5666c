//! Terminal UI example using crossterm and ratatui.
//!
//! This example demonstrates how to host vim_core in a terminal application.
//! Run with: cargo run --example tui_crossterm

use crossterm::{
    event::{self, Event, KeyCode as CKeyCode, KeyEvent as CKeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use ropey::Rope;
use std::io;
use std::time::Duration;
use vim_core::{
    EditorOps, Engine, InputEvent, KeyCode, KeyEvent, Mode, Modifiers, Offset, Range, Selection,
    VisualKind,
};

const WELCOME: &str = "Welcome to vim_core!\n\nPress 'i' to enter insert mode.\nPress 'Esc' to return to normal mode.\nPress ':q<Enter>' to quit.\n\nTry vim commands like:\n- hjkl, w, b, e for movement\n- dd to delete a line, u to undo\n- yy to yank a line, p to paste\n- /pattern to search, n for the next match\n- qa ... q to record a macro, @a to replay it\n- :s/old/new/g to substitute\n- :nnoremap <Space>d dd to add a mapping\n";

/// Text buffer implementation using ropey, with snapshot undo.
struct RopeBuffer {
    rope: Rope,
    caret: Offset,
    selection: Option<Selection>,
    undo_stack: Vec<(Rope, Offset)>,
    redo_stack: Vec<(Rope, Offset)>,
}

impl RopeBuffer {
    fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            caret: 0,
            selection: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    fn selected(&self, line: usize, col: usize) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        let offset = self.line_start(line) + col;
        match sel.kind {
            VisualKind::CharWise => offset >= sel.range.start && offset < sel.range.end,
            VisualKind::LineWise => {
                let first = self.line_of_offset(sel.range.start);
                let last = self.line_of_offset(sel.range.end.saturating_sub(1).max(sel.range.start));
                line >= first && line <= last
            }
            VisualKind::BlockWise => {
                let start = self.position(sel.range.start);
                let end = self.position(sel.range.end.saturating_sub(1).max(sel.range.start));
                let (left, right) = (start.col.min(end.col), start.col.max(end.col));
                line >= start.line && line <= end.line && col >= left && col <= right
            }
        }
    }
}

impl EditorOps for RopeBuffer {
    fn text_len(&self) -> usize {
        self.rope.len_chars()
    }

    fn char_at(&self, offset: Offset) -> Option<char> {
        self.rope.get_char(offset)
    }

    fn slice(&self, range: Range) -> String {
        let end = range.end.min(self.rope.len_chars());
        self.rope.slice(range.start.min(end)..end).to_string()
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_of_offset(&self, offset: Offset) -> usize {
        self.rope.char_to_line(offset.min(self.rope.len_chars()))
    }

    fn line_start(&self, line: usize) -> Offset {
        self.rope.line_to_char(line.min(self.rope.len_lines() - 1))
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
        self.undo_stack.push((self.rope.clone(), self.caret));
        self.redo_stack.clear();
        let end = range.end.min(self.rope.len_chars());
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

    fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some((rope, caret)) => {
                let current = std::mem::replace(&mut self.rope, rope);
                self.redo_stack.push((current, self.caret));
                self.caret = caret;
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some((rope, caret)) => {
                let current = std::mem::replace(&mut self.rope, rope);
                self.undo_stack.push((current, self.caret));
                self.caret = caret;
                true
            }
            None => false,
        }
    }
}

struct App {
    engine: Engine,
    buffer: RopeBuffer,
    message: String,
    should_quit: bool,
}

impl App {
    fn new() -> Self {
        let builder = Engine::builder();
        #[cfg(feature = "clipboard")]
        let builder = match vim_core::SystemClipboard::new() {
            Some(clipboard) => builder.clipboard(Box::new(clipboard)),
            None => builder,
        };
        Self {
            engine: builder.build(),
            buffer: RopeBuffer::new(WELCOME),
            message: String::new(),
            should_quit: false,
        }
    }

    fn handle_crossterm_event(&mut self, event: CKeyEvent) {
        let vim_event = convert_crossterm_event(event);

        // Handle quit command
        if let InputEvent::Key(ke) = &vim_event
            && ke.code == KeyCode::Enter
            && matches!(self.engine.cmdline_text().as_deref(), Some(":q" | ":q!" | ":qa"))
        {
            self.should_quit = true;
            return;
        }

        let result = self.engine.handle_event(&mut self.buffer, vim_event);
        self.after_input(result);
    }

    fn handle_timeout(&mut self) {
        let result = self.engine.timeout_elapsed(&mut self.buffer);
        self.after_input(result);
    }

    fn after_input(&mut self, result: vim_core::Result<()>) {
        let messages = self.engine.take_messages();
        if let Err(err) = result {
            self.message = err.to_string();
        } else if let Some(last) = messages.last() {
            self.message = last.clone();
        } else if self.engine.mode() != Mode::Normal {
            self.message.clear();
        }
    }

    fn status(&self) -> String {
        let snapshot = self.engine.snapshot();
        if let Some(cmdline) = snapshot.cmdline {
            return cmdline;
        }
        let mut status = match snapshot.mode {
            Mode::Normal => String::new(),
            mode => format!("-- {} --", mode.name()),
        };
        if let Some(register) = snapshot.recording {
            status.push_str(&format!(" recording @{register}"));
        }
        if !self.message.is_empty() {
            status.push_str("  ");
            status.push_str(&self.message);
        }
        if !snapshot.pending_keys.is_empty() {
            status.push_str(&format!("  {}", snapshot.pending_keys));
        }
        status.trim_start().to_string()
    }
}

fn convert_crossterm_event(event: CKeyEvent) -> InputEvent {
    let mut mods = Modifiers::empty();
    if event.modifiers.contains(KeyModifiers::SHIFT) {
        mods |= Modifiers::SHIFT;
    }
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        mods |= Modifiers::CTRL;
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        mods |= Modifiers::ALT;
    }

    let code = match event.code {
        CKeyCode::Char(c) => KeyCode::Char(c),
        CKeyCode::Esc => KeyCode::Esc,
        CKeyCode::Enter => KeyCode::Enter,
        CKeyCode::Backspace => KeyCode::Backspace,
        CKeyCode::Tab => KeyCode::Tab,
        CKeyCode::Delete => KeyCode::Delete,
        CKeyCode::Insert => KeyCode::Insert,
        CKeyCode::Left => KeyCode::Left,
        CKeyCode::Right => KeyCode::Right,
        CKeyCode::Up => KeyCode::Up,
        CKeyCode::Down => KeyCode::Down,
        CKeyCode::Home => KeyCode::Home,
        CKeyCode::End => KeyCode::End,
        CKeyCode::PageUp => KeyCode::PageUp,
        CKeyCode::PageDown => KeyCode::PageDown,
        CKeyCode::F(n) => KeyCode::F(n),
        _ => KeyCode::Esc,
    };
    InputEvent::Key(KeyEvent { code, mods })
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(3), Constraint::Length(3)].as_ref())
        .split(f.size());

    // Main text area
    let highlight = Style::default().bg(Color::Blue);
    let mut lines = vec![];
    for i in 0..app.buffer.line_count() {
        let text = app.buffer.line_text(i);
        if app.buffer.selection.is_none() {
            lines.push(Line::from(text));
            continue;
        }
        let spans: Vec<Span> = text
            .chars()
            .enumerate()
            .map(|(col, ch)| {
                if app.buffer.selected(i, col) {
                    Span::styled(ch.to_string(), highlight)
                } else {
                    Span::raw(ch.to_string())
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let text = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("vim_core demo"),
    );
    f.render_widget(text, chunks[0]);

    // Status line
    let status = Paragraph::new(app.status())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, chunks[1]);

    match app.engine.cmdline_text() {
        Some(cmdline) => f.set_cursor(
            chunks[1].x + 1 + cmdline.chars().count() as u16,
            chunks[1].y + 1,
        ),
        None => {
            let cursor = app.buffer.position(app.buffer.caret());
            f.set_cursor(
                chunks[0].x + 1 + cursor.col as u16,
                chunks[0].y + 1 + cursor.line as u16,
            );
        }
    }
}

fn main() -> Result<(), io::Error> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();

    loop {
        terminal.draw(|f| ui(f, &app))?;

        // An ambiguous mapping prefix resolves once timeoutlen passes
        let timeout = app.engine.pending_timeout();
        if !event::poll(timeout.unwrap_or(Duration::from_secs(3600)))? {
            if timeout.is_some() {
                app.handle_timeout();
            }
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == CKeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }

            app.handle_crossterm_event(key);

            if app.should_quit {
                break;
            }
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}
