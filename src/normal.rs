//! Command execution for NORMAL, VISUAL, OPERATOR-PENDING and SELECT.

use tracing::{debug, trace};

use crate::command::{Action, Command, InsertCommand, Motion};
use crate::edit;
use crate::engine::{Ctx, Recording, RepeatRecord};
use crate::error::{EngineError, Result};
use crate::insert::{BlockInsert, InsertKind};
use crate::key::{KeyCode, KeyEvent, keys_to_notation, keys_to_text};
use crate::keymap::Context;
use crate::mode::VisualExtent;
use crate::motion::{self, MotionContext, MotionResult, line};
use crate::operator::{self, OpRange, Operator};
use crate::register::{Register, RegisterType, WriteKind};
use crate::resolver::Step;
use crate::types::{Mode, MotionType, Range, VisualKind};

impl Ctx<'_> {
    pub(crate) fn normal_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.session.recording.is_some()
            && self.session.resolver.builder.is_empty()
            && key == KeyEvent::char('q')
        {
            return self.stop_recording();
        }
        let mode = self.session.mode.mode();
        let context = if mode.is_visual() { Context::Visual } else { Context::Normal };
        let tildeop = self.shared.options.tildeop();
        match self.session.resolver.builder.feed(context, key, tildeop) {
            Step::Pending => Ok(()),
            Step::OperatorPending { operator, count } => {
                self.set_mode(Mode::OperatorPending { operator, count });
                Ok(())
            }
            Step::Command(cmd) => {
                let result = self.execute(cmd);
                if matches!(self.session.mode.mode(), Mode::OperatorPending { .. }) {
                    self.set_mode(Mode::Normal);
                }
                result
            }
            Step::Unknown(keys) => Err(EngineError::UnknownKeys { keys }),
            Step::Cancelled => {
                match self.session.mode.mode() {
                    Mode::OperatorPending { .. } | Mode::Visual(_) => self.set_mode(Mode::Normal),
                    _ => self.editor.beep(),
                }
                Ok(())
            }
        }
    }

    fn stop_recording(&mut self) -> Result<()> {
        let Some(Recording { register, mut keys }) = self.session.recording.take() else {
            return Ok(());
        };
        if keys.last() == Some(&KeyEvent::char('q')) {
            keys.pop();
        }
        debug!(register = %register, keys = %keys_to_notation(&keys), "recording stopped");
        let mut reg = Register::charwise(keys_to_text(&keys));
        reg.recorded = true;
        self.shared.write_register(Some(register), reg, WriteKind::Set)
    }

    /// Runs a resolved command.
    pub(crate) fn execute(&mut self, cmd: Command) -> Result<()> {
        trace!(command = %cmd.notation(), "execute");
        self.session.v_count = cmd.count.unwrap_or(0);
        self.session.v_register = cmd.register;
        let visual = self.session.mode.mode().visual_kind().is_some();
        let visual_operator =
            cmd.operator.is_some() || matches!(cmd.action, Some(Action::LinewiseSelection(_)));
        let record = cmd.is_repeatable()
            && (!visual || visual_operator)
            && !self.session.replaying_dot
            && !matches!(cmd.action, Some(Action::CmdLine(_)));
        let previous = if record {
            let extent = if visual { self.visual_extent() } else { None };
            self.session.dot.replace(RepeatRecord {
                command: cmd.clone(),
                inserted: None,
                extent,
            })
        } else {
            None
        };
        self.session.dot_pending = record;

        let vertical = matches!(
            (&cmd.operator, &cmd.motion),
            (None, Some(Motion::Up | Motion::Down | Motion::LineEnd))
        );
        let result = match (&cmd.action, cmd.operator, &cmd.motion) {
            (Some(action), _, _) => self.execute_action(&cmd, action.clone()),
            (None, Some(op), _) if visual => self.visual_operator(&cmd, op),
            (None, None, Some(motion)) => self.move_caret(&cmd, motion),
            (None, Some(op), Some(motion)) => self.operate(&cmd, op, motion),
            _ => Ok(()),
        };
        self.session.dot_pending = false;
        if result.is_err() && record {
            self.session.dot = previous;
        }
        if !vertical && !self.session.mode.mode().is_insert_like() {
            let caret = self.editor.caret();
            self.session.preferred_col = self.editor.position(caret).col;
        }
        result
    }

    fn run_motion(&mut self, cmd: &Command, motion: &Motion, operator: Option<Operator>) -> Result<MotionResult> {
        let caret = self.editor.caret();
        let mut cx = MotionContext {
            editor: &*self.editor,
            options: &self.shared.options,
            search: &mut self.shared.search,
            last_find: &mut self.session.last_find,
            messages: &mut self.session.messages,
            caret,
            count: cmd.count1(),
            has_count: cmd.count.is_some(),
            operator,
            preferred_col: self.session.preferred_col,
        };
        motion::compute(&mut cx, motion)
    }

    fn move_caret(&mut self, cmd: &Command, motion: &Motion) -> Result<()> {
        let MotionResult::Found(range) = self.run_motion(cmd, motion, None)? else {
            return Err(EngineError::MotionFailed);
        };
        let mode = self.session.mode.mode();
        if let Motion::TextObject(_) = motion
            && let Mode::Visual(kind) = mode
        {
            self.session.mode.set_anchor(range.start);
            if range.kind == MotionType::LineWise && kind != VisualKind::LineWise {
                self.set_mode(Mode::Visual(VisualKind::LineWise));
            }
        }
        let target = motion::caret_target(self.editor, &range);
        self.editor.set_caret(target);
        self.session.preferred_col = match motion {
            Motion::Up | Motion::Down => self.session.preferred_col,
            Motion::LineEnd => usize::MAX,
            _ => self.editor.position(target).col,
        };
        if mode.visual_kind().is_some() {
            let adj = self.adj();
            self.session.mode.sync(self.editor, adj);
        }
        Ok(())
    }

    fn operate(&mut self, cmd: &Command, op: Operator, motion: &Motion) -> Result<()> {
        let MotionResult::Found(range) = self.run_motion(cmd, motion, Some(op))? else {
            return Err(EngineError::MotionFailed);
        };
        let mut op_range = range.to_op_range(self.editor);
        if op.is_linewise_only() {
            op_range = OpRange::Lines {
                first: op_range.first_line(self.editor),
                last: op_range.last_line(self.editor),
            };
        }
        self.apply_operator(cmd, op, op_range, false)
    }

    fn visual_operator(&mut self, cmd: &Command, op: Operator) -> Result<()> {
        let to_line_end = self.session.preferred_col == usize::MAX;
        let Some(mut range) = self.session.mode.op_range(self.editor, self.adj(), to_line_end) else {
            return Ok(());
        };
        if op.is_linewise_only() {
            range = OpRange::Lines {
                first: range.first_line(self.editor),
                last: range.last_line(self.editor),
            };
        }
        self.set_mode(Mode::Normal);
        self.apply_operator(cmd, op, range, true)
    }

    /// Applies `op` to `range`, writing registers and placing the caret.
    pub(crate) fn apply_operator(&mut self, cmd: &Command, op: Operator, range: OpRange, visual: bool) -> Result<()> {
        debug!(?op, ?range, "operator");
        let kind = range.register_type();
        match op {
            Operator::Yank => {
                let text = operator::extract(self.editor, &range);
                self.shared.write_register(cmd.register, Register::new(text, kind), WriteKind::Yank)?;
                let caret = self.editor.caret();
                let target = match range {
                    OpRange::Chars(r) => r.start,
                    OpRange::Lines { first, .. } => {
                        let pos = self.editor.position(caret);
                        if pos.line > first || visual {
                            let col = if visual { 0 } else { pos.col };
                            line::column_offset(self.editor, first, col, false)
                        } else {
                            caret
                        }
                    }
                    OpRange::Block {
                        first_line, start_col, ..
                    } => line::column_offset(self.editor, first_line, start_col, false),
                };
                let target = self.editor.clamp(target);
                self.editor.set_caret(target);
            }
            Operator::Delete => {
                let text = operator::extract(self.editor, &range);
                let small = range.is_small(self.editor);
                self.shared
                    .write_register(cmd.register, Register::new(text, kind), WriteKind::Delete { small })?;
                let caret = operator::delete(self.editor, &range);
                let caret = self.editor.clamp(caret);
                self.editor.set_caret(caret);
            }
            Operator::Change => {
                let text = operator::extract(self.editor, &range);
                let small = range.is_small(self.editor);
                self.shared
                    .write_register(cmd.register, Register::new(text, kind), WriteKind::Delete { small })?;
                let block = match range {
                    OpRange::Block {
                        first_line,
                        last_line,
                        start_col,
                        ..
                    } => Some(BlockInsert {
                        first_line,
                        last_line,
                        col: start_col,
                        append: false,
                    }),
                    _ => None,
                };
                let at = operator::change(self.editor, &range);
                self.editor.set_caret(at);
                self.begin_insert(InsertKind::Insert, 1, block, None);
            }
            Operator::ShiftLeft | Operator::ShiftRight => {
                let amount = if visual { cmd.count1() } else { 1 };
                let first = range.first_line(self.editor);
                let last = range.last_line(self.editor);
                let left = op == Operator::ShiftLeft;
                let caret = operator::shift(self.editor, first, last, amount, left, &self.shared.options);
                self.editor.set_caret(caret);
            }
            Operator::LowerCase | Operator::UpperCase | Operator::ToggleCase | Operator::Rot13 => {
                let caret = operator::convert_case(self.editor, &range, op);
                let caret = self.editor.clamp(caret);
                self.editor.set_caret(caret);
            }
        }
        Ok(())
    }

    fn execute_action(&mut self, cmd: &Command, action: Action) -> Result<()> {
        let adj = self.adj();
        let count = cmd.count1();
        match action {
            Action::Insert(kind) => self.start_insert(cmd, kind),
            Action::ReplaceMode => {
                self.begin_insert(InsertKind::Replace, count, None, None);
                Ok(())
            }
            Action::Visual(kind) => {
                match self.session.mode.mode() {
                    Mode::Visual(current) if current == kind => self.set_mode(Mode::Normal),
                    Mode::Visual(_) => {
                        self.set_mode(Mode::Visual(kind));
                        self.session.mode.sync(self.editor, adj);
                    }
                    _ => self.session.mode.start_visual(self.editor, kind, false, adj),
                }
                Ok(())
            }
            Action::Select(kind) => {
                self.session.mode.start_visual(self.editor, kind, true, adj);
                Ok(())
            }
            Action::ToggleSelect => {
                self.session.mode.toggle_select(self.editor, adj);
                Ok(())
            }
            Action::SwapVisualEnds => {
                self.session.mode.swap_ends(self.editor, adj);
                Ok(())
            }
            Action::ExitVisual => {
                self.set_mode(Mode::Normal);
                Ok(())
            }
            Action::CmdLine(kind) => {
                self.open_cmdline(kind, cmd);
                Ok(())
            }
            Action::ReplaceChar(ch) => self.replace_char(count, ch),
            Action::ToggleCase => {
                let target = edit::toggle_case(self.editor, count).ok_or(EngineError::MotionFailed)?;
                self.editor.set_caret(target);
                Ok(())
            }
            Action::Join { spaces } => self.join(count, spaces),
            Action::Put { before } => self.put(cmd, before),
            Action::Increment { negative } => self.increment(count, negative),
            Action::Undo | Action::Redo => {
                for _ in 0..count {
                    let done = if action == Action::Undo {
                        self.editor.undo()
                    } else {
                        self.editor.redo()
                    };
                    if !done {
                        self.editor.beep();
                        break;
                    }
                }
                let caret = self.editor.clamp(self.editor.caret());
                self.editor.set_caret(caret);
                Ok(())
            }
            Action::Repeat => self.repeat_last(cmd),
            Action::StartRecording(register) => {
                if self.session.recording.is_none() {
                    debug!(register = %register, "recording started");
                    self.session.recording = Some(Recording {
                        register,
                        keys: Vec::new(),
                    });
                }
                Ok(())
            }
            Action::StopRecording => self.stop_recording(),
            Action::ExecuteRegister(name) => self.execute_register(name, count),
            Action::BlockInsert { append } => self.block_insert(append),
            Action::LinewiseSelection(op) => {
                let Some(range) = self.session.mode.op_range(self.editor, self.adj(), false) else {
                    return Ok(());
                };
                let first = range.first_line(self.editor);
                let last = range.last_line(self.editor);
                self.set_mode(Mode::Normal);
                self.apply_operator(cmd, op, OpRange::Lines { first, last }, true)
            }
        }
    }

    fn start_insert(&mut self, cmd: &Command, kind: InsertCommand) -> Result<()> {
        let editor = &mut *self.editor;
        let caret = editor.caret();
        let line = editor.line_of_offset(caret);
        let (at, open) = match kind {
            InsertCommand::Before => (caret, None),
            InsertCommand::After => {
                let at = if editor.line_len(line) == 0 {
                    caret
                } else {
                    (caret + 1).min(editor.line_end(line))
                };
                (at, None)
            }
            InsertCommand::FirstNonBlank => (editor.first_non_blank(line), None),
            InsertCommand::LineStart => (editor.line_start(line), None),
            InsertCommand::LineEnd => (editor.line_end(line), None),
            InsertCommand::OpenBelow => {
                let end = editor.line_end(line);
                editor.insert(end, "\n");
                (end + 1, Some(false))
            }
            InsertCommand::OpenAbove => {
                let start = editor.line_start(line);
                editor.insert(start, "\n");
                (start, Some(true))
            }
        };
        editor.set_caret(at);
        self.begin_insert(InsertKind::Insert, cmd.count1(), None, open);
        Ok(())
    }

    fn replace_char(&mut self, count: usize, ch: char) -> Result<()> {
        if self.session.mode.mode().is_visual() {
            let Some(range) = self.session.mode.op_range(self.editor, self.adj(), false) else {
                return Ok(());
            };
            self.set_mode(Mode::Normal);
            let spans: Vec<Range> = match range {
                OpRange::Chars(r) => vec![r],
                OpRange::Lines { first, last } => (first..=last)
                    .map(|l| Range::new(self.editor.line_start(l), self.editor.line_end(l)))
                    .collect(),
                OpRange::Block {
                    first_line,
                    last_line,
                    start_col,
                    end_col,
                } => (first_line..=last_line)
                    .map(|l| operator::block_segment(self.editor, l, start_col, end_col))
                    .collect(),
            };
            for span in &spans {
                let text: String = self
                    .editor
                    .slice(*span)
                    .chars()
                    .map(|c| if c == '\n' { c } else { ch })
                    .collect();
                self.editor.replace(*span, &text);
            }
            let start = spans.first().map_or(0, |s| s.start);
            let caret = self.editor.clamp(start);
            self.editor.set_caret(caret);
            return Ok(());
        }
        let target = edit::replace_chars(self.editor, count, ch).ok_or(EngineError::MotionFailed)?;
        self.editor.set_caret(target);
        Ok(())
    }

    fn join(&mut self, count: usize, spaces: bool) -> Result<()> {
        let (first, count) = match self.session.mode.op_range(self.editor, self.adj(), false) {
            Some(range) if self.session.mode.mode().is_visual() => {
                let first = range.first_line(self.editor);
                let last = range.last_line(self.editor);
                self.set_mode(Mode::Normal);
                (first, last - first + 1)
            }
            _ => (self.editor.line_of_offset(self.editor.caret()), count),
        };
        let joinspaces = self.shared.options.joinspaces();
        let caret = edit::join_lines(self.editor, first, count, spaces, joinspaces).ok_or(EngineError::MotionFailed)?;
        self.editor.set_caret(caret);
        Ok(())
    }

    fn put(&mut self, cmd: &Command, before: bool) -> Result<()> {
        let name = cmd.register.unwrap_or('"');
        let reg = self
            .shared
            .read_register(name)?
            .ok_or(EngineError::EmptyRegister(name))?;
        let count = cmd.count1();
        if self.session.mode.mode().is_visual() {
            return self.put_over_selection(reg, count);
        }
        let caret = edit::put(self.editor, &reg, count, before);
        let caret = self.editor.clamp(caret);
        self.editor.set_caret(caret);
        Ok(())
    }

    /// VISUAL `p`: the selection is replaced and ends up in the unnamed
    /// register.
    fn put_over_selection(&mut self, reg: Register, count: usize) -> Result<()> {
        let Some(range) = self.session.mode.op_range(self.editor, self.adj(), false) else {
            return Ok(());
        };
        self.set_mode(Mode::Normal);
        let replaced = Register::new(operator::extract(self.editor, &range), range.register_type());
        let text = reg.text.repeat(count);
        let caret = match (range, reg.kind) {
            (OpRange::Lines { first, last }, RegisterType::LineWise) => {
                let mut span = operator::lines_range(self.editor, first, last);
                let body = if span.end == self.editor.text_len() && !self.editor.slice(span).ends_with('\n') {
                    text.strip_suffix('\n').unwrap_or(&text).to_string()
                } else {
                    text
                };
                span.end = span.end.min(self.editor.text_len());
                self.editor.replace(span, &body);
                self.editor.first_non_blank(first)
            }
            (OpRange::Lines { first, last }, _) => {
                let start = self.editor.line_start(first);
                let span = Range::new(start, self.editor.line_end(last));
                self.editor.replace(span, &text);
                start
            }
            (_, RegisterType::LineWise) => {
                let start = operator::delete(self.editor, &range);
                self.editor.insert(start, &format!("\n{text}"));
                start + 1
            }
            _ => {
                let start = operator::delete(self.editor, &range);
                self.editor.insert(start, &text);
                start + text.chars().count().saturating_sub(1)
            }
        };
        let caret = self.editor.clamp(caret);
        self.editor.set_caret(caret);
        self.shared.write_register(None, replaced, WriteKind::Delete { small: false })
    }

    fn increment(&mut self, count: usize, negative: bool) -> Result<()> {
        let delta = if negative { -(count as i64) } else { count as i64 };
        if self.session.mode.mode().is_visual() {
            let Some(range) = self.session.mode.op_range(self.editor, self.adj(), false) else {
                return Ok(());
            };
            let first = range.first_line(self.editor);
            let last = range.last_line(self.editor);
            self.set_mode(Mode::Normal);
            for line in first..=last {
                let start = self.editor.line_start(line);
                self.editor.set_caret(start);
                edit::increment(self.editor, delta);
            }
            let start = self.editor.line_start(first);
            self.editor.set_caret(start);
            return Ok(());
        }
        let caret = edit::increment(self.editor, delta).ok_or(EngineError::MotionFailed)?;
        self.editor.set_caret(caret);
        Ok(())
    }

    /// `.`: runs the last change again, retyping its inserted text.
    fn repeat_last(&mut self, cmd: &Command) -> Result<()> {
        let Some(record) = self.session.dot.clone() else {
            self.editor.beep();
            return Ok(());
        };
        let mut command = record.command;
        if cmd.count.is_some() {
            command.count = cmd.count;
            if let Some(dot) = self.session.dot.as_mut() {
                dot.command.count = cmd.count;
            }
        }
        debug!(command = %command.notation(), "repeat");
        self.session.replaying_dot = true;
        let result = self.replay_change(command, record.inserted, record.extent);
        self.session.replaying_dot = false;
        result
    }

    fn replay_change(
        &mut self,
        command: Command,
        inserted: Option<Vec<KeyEvent>>,
        extent: Option<VisualExtent>,
    ) -> Result<()> {
        match extent {
            Some(extent) => self.repeat_visual_operator(&command, extent)?,
            None => self.execute(command)?,
        }
        if self.session.mode.mode().is_insert_like() {
            for key in inserted.unwrap_or_default() {
                self.insert_key(key)?;
            }
            self.finish_insert()?;
        }
        Ok(())
    }

    fn visual_extent(&self) -> Option<VisualExtent> {
        let to_line_end = self.session.preferred_col == usize::MAX;
        let range = self.session.mode.op_range(self.editor, self.adj(), to_line_end)?;
        Some(VisualExtent::of(self.editor, &range))
    }

    /// Repeats a visual operator over a region of the recorded size at the
    /// caret.
    fn repeat_visual_operator(&mut self, cmd: &Command, extent: VisualExtent) -> Result<()> {
        let range = extent.at(self.editor, self.editor.caret());
        let (op, linewise) = match (cmd.operator, &cmd.action) {
            (Some(op), _) => (op, op.is_linewise_only()),
            (None, Some(Action::LinewiseSelection(op))) => (*op, true),
            _ => return Ok(()),
        };
        let range = if linewise {
            OpRange::Lines {
                first: range.first_line(self.editor),
                last: range.last_line(self.editor),
            }
        } else {
            range
        };
        self.apply_operator(cmd, op, range, true)
    }

    fn execute_register(&mut self, name: char, count: usize) -> Result<()> {
        let name = match name {
            '@' => self.session.last_executed.ok_or(EngineError::EmptyRegister('@'))?,
            other => other,
        };
        self.session.last_executed = Some(name);
        if name == ':' {
            let line = self
                .shared
                .registers
                .last_command()
                .map(str::to_string)
                .ok_or(EngineError::EmptyRegister(':'))?;
            for _ in 0..count {
                self.run_command_line(&line)?;
            }
            return Ok(());
        }
        let reg = self
            .shared
            .read_register(name)?
            .ok_or(EngineError::EmptyRegister(name))?;
        self.replay_register(&reg.text, count)
    }

    /// VISUAL `I` and `A`. In VISUAL BLOCK the text is replicated on every
    /// line of the block.
    fn block_insert(&mut self, append: bool) -> Result<()> {
        let to_line_end = self.session.preferred_col == usize::MAX;
        let Some(range) = self.session.mode.op_range(self.editor, self.adj(), to_line_end) else {
            return Ok(());
        };
        self.set_mode(Mode::Normal);
        let editor = &mut *self.editor;
        let (at, block) = match range {
            OpRange::Block {
                first_line,
                last_line,
                start_col,
                end_col,
            } => {
                let col = if append { end_col } else { start_col };
                let len = editor.line_len(first_line);
                let start = editor.line_start(first_line);
                if len < col {
                    editor.insert(start + len, &" ".repeat(col - len));
                }
                let block = BlockInsert {
                    first_line,
                    last_line,
                    col,
                    append,
                };
                (start + col, Some(block))
            }
            OpRange::Chars(r) => (if append { r.end } else { r.start }, None),
            OpRange::Lines { first, last } => {
                let at = if append {
                    editor.line_end(last)
                } else {
                    editor.first_non_blank(first)
                };
                (at, None)
            }
        };
        editor.set_caret(at);
        self.begin_insert(InsertKind::Insert, 1, block, None);
        Ok(())
    }

    pub(crate) fn select_key(&mut self, key: KeyEvent) -> Result<()> {
        let adj = self.adj();
        if key.is_esc() {
            self.set_mode(Mode::Normal);
            let caret = self.editor.clamp(self.editor.caret());
            self.editor.set_caret(caret);
            return Ok(());
        }
        if key.is_ctrl('g') {
            self.session.mode.toggle_select(self.editor, adj);
            return Ok(());
        }
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Home | KeyCode::End => {
                let editor = &mut *self.editor;
                let caret = editor.caret();
                let line = editor.line_of_offset(caret);
                let target = match key.code {
                    KeyCode::Left => line::left(editor, caret, 1),
                    KeyCode::Right => line::right(editor, caret, 1, true),
                    KeyCode::Home => Some(editor.line_start(line)),
                    KeyCode::End => Some(editor.line_end(line)),
                    code => line::vertical(editor, caret, 1, code == KeyCode::Down)
                        .map(|l| line::column_offset(editor, l, caret - editor.line_start(line), true)),
                };
                match target {
                    Some(target) => {
                        editor.set_caret(target);
                        self.session.mode.sync(self.editor, adj);
                    }
                    None => editor.beep(),
                }
                Ok(())
            }
            KeyCode::Backspace | KeyCode::Delete => {
                self.replace_selection();
                Ok(())
            }
            _ if key.printable().is_some() => {
                self.replace_selection();
                self.insert_key(key)
            }
            _ => {
                self.editor.beep();
                Ok(())
            }
        }
    }

    /// Deletes the selection without touching registers and starts INSERT.
    fn replace_selection(&mut self) {
        let Some(range) = self.session.mode.op_range(self.editor, self.adj(), false) else {
            return;
        };
        self.set_mode(Mode::Normal);
        let at = operator::change(self.editor, &range);
        self.editor.set_caret(at);
        self.begin_insert(InsertKind::Insert, 1, None, None);
    }
}
