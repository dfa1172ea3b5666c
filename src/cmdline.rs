//! The `:` `/` `?` prompt.

use crate::command::{Command, Motion};
use crate::engine::Ctx;
use crate::error::Result;
use crate::key::{KeyCode, KeyEvent};
use crate::motion::word::is_keyword;
use crate::types::{CmdLineKind, Mode};

#[derive(Debug, Clone)]
pub(crate) struct CmdlineState {
    pub kind: CmdLineKind,
    pub text: String,
    /// Mode restored when a search finishes or the prompt is cancelled.
    pub return_mode: Mode,
    /// Operator, count and register typed before `/` or `?`.
    pub pending: Option<Command>,
    pub pending_register: bool,
}

impl Ctx<'_> {
    pub(crate) fn open_cmdline(&mut self, kind: CmdLineKind, cmd: &Command) {
        let mode = self.session.mode.mode();
        let return_mode = match mode {
            Mode::Visual(_) if kind != CmdLineKind::Command => mode,
            _ => Mode::Normal,
        };
        let text = match (kind, cmd.count) {
            (CmdLineKind::Command, _) if mode.is_visual() => "'<,'>".to_string(),
            (CmdLineKind::Command, Some(1)) => ".".to_string(),
            (CmdLineKind::Command, Some(n)) => format!(".,.+{}", n - 1),
            _ => String::new(),
        };
        let pending = (kind != CmdLineKind::Command).then(|| Command {
            action: None,
            ..cmd.clone()
        });
        self.session.cmdline = Some(CmdlineState {
            kind,
            text,
            return_mode,
            pending,
            pending_register: false,
        });
        self.set_mode(Mode::CmdLine(kind));
    }

    pub(crate) fn cmdline_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(state) = self.session.cmdline.as_mut() else {
            self.set_mode(Mode::Normal);
            return Ok(());
        };
        if state.pending_register {
            state.pending_register = false;
            if let Some(name) = key.printable()
                && let Some(reg) = self.shared.read_register(name)?
                && let Some(state) = self.session.cmdline.as_mut()
            {
                state.text.push_str(reg.text.trim_end_matches('\n'));
            }
            return Ok(());
        }
        if key.is_esc() {
            self.cancel_cmdline();
            return Ok(());
        }
        if let Some(c) = key.printable() {
            state.text.push(c);
            return Ok(());
        }
        match key.code {
            KeyCode::Enter => return self.submit_cmdline(),
            KeyCode::Backspace => {
                if state.text.pop().is_none() {
                    self.cancel_cmdline();
                }
            }
            KeyCode::Tab => state.text.push('\t'),
            KeyCode::Char('h') if key.is_ctrl('h') => {
                if state.text.pop().is_none() {
                    self.cancel_cmdline();
                }
            }
            KeyCode::Char('u') if key.is_ctrl('u') => state.text.clear(),
            KeyCode::Char('w') if key.is_ctrl('w') => {
                let trimmed = state.text.trim_end_matches([' ', '\t']);
                let keyword = trimmed.chars().last().is_some_and(is_keyword);
                let kept = trimmed.trim_end_matches(|c: char| {
                    !matches!(c, ' ' | '\t') && is_keyword(c) == keyword
                });
                state.text.truncate(kept.len());
            }
            KeyCode::Char('r') if key.is_ctrl('r') => state.pending_register = true,
            _ => self.editor.beep(),
        }
        Ok(())
    }

    /// Closes the prompt without running it.
    pub(crate) fn cancel_cmdline(&mut self) {
        let Some(state) = self.session.cmdline.take() else {
            return;
        };
        self.set_mode(state.return_mode);
        if state.return_mode.is_visual() {
            let adj = self.adj();
            self.session.mode.sync(self.editor, adj);
        }
    }

    fn submit_cmdline(&mut self) -> Result<()> {
        let Some(state) = self.session.cmdline.take() else {
            return Ok(());
        };
        match state.kind {
            CmdLineKind::Command => {
                self.set_mode(Mode::Normal);
                if state.text.trim().is_empty() {
                    return Ok(());
                }
                self.shared.registers.set_last_command(state.text.clone());
                self.run_command_line(&state.text)
            }
            CmdLineKind::SearchForward | CmdLineKind::SearchBackward => {
                self.set_mode(state.return_mode);
                if state.return_mode.is_visual() {
                    let adj = self.adj();
                    self.session.mode.sync(self.editor, adj);
                }
                let mut command = state.pending.unwrap_or_default();
                command.motion = Some(Motion::Search {
                    pattern: state.text,
                    forward: state.kind == CmdLineKind::SearchForward,
                });
                command.action = None;
                self.execute(command)
            }
        }
    }
}
