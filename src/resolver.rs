//! Key resolution: the typeahead queue and mapping layer, and the
//! [`CommandBuilder`] that turns built-in key sequences into commands.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::command::{Action, Command, Motion};
use crate::engine::Ctx;
use crate::error::{EngineError, Result};
use crate::key::{KeyEvent, keys_to_notation, text_to_keys};
use crate::keymap::{self, Await, Binding, Context};
use crate::mapping::{MapModes, MapRhs, Mapping, MappingTable, Resolution};
use crate::operator::Operator;
use crate::register::is_valid_name;
use crate::types::Mode;

/// A key waiting in the typeahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedKey {
    pub key: KeyEvent,
    /// Whether mappings may apply to this key.
    pub remap: bool,
    /// Mapping and macro expansion depth that produced the key.
    pub depth: usize,
    pub from_user: bool,
}

impl QueuedKey {
    pub fn typed(key: KeyEvent) -> Self {
        Self {
            key,
            remap: true,
            depth: 0,
            from_user: true,
        }
    }
}

/// Outcome of feeding one key to the [`CommandBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// More keys are needed.
    Pending,
    /// An operator was typed and waits for its motion.
    OperatorPending { operator: Operator, count: u32 },
    Command(Command),
    /// The keys (in notation) match no command.
    Unknown(String),
    /// `<Esc>` dropped the partial command.
    Cancelled,
}

/// Builds a [`Command`] from counts, a register prefix, an operator and a
/// built-in key sequence.
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    count: Option<u32>,
    register: Option<char>,
    operator: Option<Operator>,
    /// Count typed after the operator.
    motion_count: Option<u32>,
    /// The built-in sequence being matched.
    keys: Vec<KeyEvent>,
    /// Everything consumed so far.
    consumed: Vec<KeyEvent>,
    awaiting: Option<Await>,
}

impl CommandBuilder {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }

    /// The next key is a character argument, not a command.
    pub fn awaiting_char(&self) -> bool {
        self.awaiting.is_some()
    }

    /// Part of a multi-key built-in sequence such as `g` has been typed.
    pub fn has_partial(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Keys consumed so far, for display.
    pub fn pending_keys(&self) -> &[KeyEvent] {
        &self.consumed
    }

    fn total_count(&self) -> Option<u32> {
        match (self.count, self.motion_count) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(1).saturating_mul(b.unwrap_or(1))),
        }
    }

    fn finish(&mut self, motion: Option<Motion>, action: Option<Action>, argument: Option<char>) -> Step {
        let command = Command {
            count: self.total_count(),
            register: self.register,
            operator: self.operator,
            motion,
            action,
            argument,
            keys: std::mem::take(&mut self.consumed),
        };
        self.reset();
        Step::Command(command)
    }

    fn unknown(&mut self) -> Step {
        let keys = keys_to_notation(&self.consumed);
        self.reset();
        Step::Unknown(keys)
    }

    fn pending(&self) -> Step {
        match self.operator {
            Some(operator) => Step::OperatorPending {
                operator,
                count: self.total_count().unwrap_or(1),
            },
            None => Step::Pending,
        }
    }

    /// Feeds one key. `ctx` is the table for the current mode; once an
    /// operator has been typed the operator-pending table is used instead.
    pub fn feed(&mut self, ctx: Context, key: KeyEvent, tildeop: bool) -> Step {
        self.consumed.push(key);
        if let Some(awaiting) = self.awaiting.take() {
            return self.argument(awaiting, key);
        }
        if key.is_esc() {
            self.reset();
            return Step::Cancelled;
        }
        let ctx = if self.operator.is_some() { Context::OpPending } else { ctx };

        if self.keys.is_empty()
            && let Some(digit) = key.digit()
        {
            let slot = if self.operator.is_some() {
                &mut self.motion_count
            } else {
                &mut self.count
            };
            if digit != 0 || slot.is_some() {
                *slot = Some(slot.unwrap_or(0).saturating_mul(10).saturating_add(digit).min(99_999_999));
                return self.pending();
            }
        }

        if self.keys.is_empty() && self.operator.is_none() && key == KeyEvent::char('"') {
            self.awaiting = Some(Await::Register);
            return Step::Pending;
        }

        self.keys.push(key);
        let notation = keys_to_notation(&self.keys);
        if let Some(op) = self.operator
            && op.doubles(&notation, tildeop)
        {
            return self.finish(Some(Motion::CurrentLine), None, None);
        }
        match keymap::lookup(ctx, &notation, tildeop) {
            Some(binding) => self.bind(ctx, binding),
            None if keymap::is_prefix(ctx, &notation) => self.pending(),
            None => self.unknown(),
        }
    }

    fn bind(&mut self, ctx: Context, binding: Binding) -> Step {
        self.keys.clear();
        match binding {
            Binding::Motion(motion) => self.finish(Some(motion), None, None),
            Binding::TextObject(object) => self.finish(Some(Motion::TextObject(object)), None, None),
            Binding::Operator(op) => {
                if ctx == Context::Visual {
                    self.operator = Some(op);
                    return self.finish(None, None, None);
                }
                self.operator = Some(op);
                self.pending()
            }
            Binding::Sugar(op, motion) => {
                self.operator = Some(op);
                self.finish(Some(motion), None, None)
            }
            Binding::Await(awaiting) => {
                self.awaiting = Some(awaiting);
                self.pending()
            }
            Binding::Action(action) => {
                if self.operator.is_some() && !matches!(action, Action::CmdLine(_)) {
                    return self.unknown();
                }
                self.finish(None, Some(action), None)
            }
        }
    }

    fn argument(&mut self, awaiting: Await, key: KeyEvent) -> Step {
        if key.is_esc() {
            self.reset();
            return Step::Cancelled;
        }
        let ch = match key.printable() {
            Some(c) => Some(c),
            None if key == KeyEvent::enter() => Some('\r'),
            None if key.code == crate::key::KeyCode::Tab => Some('\t'),
            None => None,
        };
        let Some(ch) = ch else {
            return self.unknown();
        };
        match awaiting {
            Await::Register => {
                if !is_valid_name(ch) {
                    return self.unknown();
                }
                self.register = Some(ch);
                Step::Pending
            }
            Await::Find { forward, till } => {
                self.finish(Some(Motion::Find { ch, forward, till }), None, Some(ch))
            }
            Await::Replace => self.finish(None, Some(Action::ReplaceChar(ch)), Some(ch)),
            Await::Record => {
                if ch.is_ascii_alphanumeric() || ch == '"' {
                    self.finish(None, Some(Action::StartRecording(ch)), Some(ch))
                } else {
                    self.unknown()
                }
            }
            Await::Execute => {
                if is_valid_name(ch) || ch == '@' {
                    self.finish(None, Some(Action::ExecuteRegister(ch)), Some(ch))
                } else {
                    self.unknown()
                }
            }
        }
    }
}

/// The typeahead queue plus the command under construction.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    pub typeahead: VecDeque<QueuedKey>,
    pub builder: CommandBuilder,
    /// Set while `:normal` runs: no more keys can arrive, so ambiguous
    /// mappings resolve immediately.
    pub closed: bool,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues keys at the front of the typeahead, as macro replay and
    /// mapping expansion do.
    pub fn push_front(&mut self, keys: impl DoubleEndedIterator<Item = QueuedKey>) {
        for key in keys.rev() {
            self.typeahead.push_front(key);
        }
    }

    pub fn flush(&mut self) {
        self.typeahead.clear();
        self.builder.reset();
    }
}

/// Nesting limit for `@` replay.
pub const MAX_MACRO_DEPTH: usize = 100;

impl Ctx<'_> {
    /// Whether the next key skips the mapping layer.
    fn mapping_bypassed(&self) -> bool {
        let builder = &self.session.resolver.builder;
        match self.session.mode.mode() {
            Mode::Insert | Mode::Replace => self.session.insert.as_ref().is_some_and(|s| s.pending_register),
            Mode::CmdLine(_) => self.session.cmdline.as_ref().is_some_and(|s| s.pending_register),
            _ => builder.awaiting_char() || builder.has_partial(),
        }
    }

    /// Resolves and dispatches queued keys until the queue is empty or an
    /// ambiguous mapping prefix needs more input.
    pub(crate) fn process_typeahead(&mut self, timed_out: bool) -> Result<()> {
        let result = self.drain(timed_out);
        if let Err(err) = &result {
            self.recover(err);
        }
        result
    }

    fn drain(&mut self, timed_out: bool) -> Result<()> {
        loop {
            let Some(front) = self.session.resolver.typeahead.front().copied() else {
                return Ok(());
            };
            if !front.remap || self.mapping_bypassed() {
                self.session.resolver.typeahead.pop_front();
                self.dispatch(front)?;
                continue;
            }
            let queue = &self.session.resolver.typeahead;
            let run: Vec<KeyEvent> = queue.iter().take_while(|q| q.remap).map(|q| q.key).collect();
            let open = run.len() == queue.len() && !self.session.resolver.closed;
            let modes = MapModes::for_mode(self.session.mode.mode());
            let tables = [&self.session.buffer_mappings, &self.shared.mappings];
            match MappingTable::resolve_layered(&tables, modes, &run, open, timed_out) {
                Resolution::Wait => {
                    trace!(keys = %keys_to_notation(&run), "waiting for more keys");
                    return Ok(());
                }
                Resolution::PassThrough => {
                    self.session.resolver.typeahead.pop_front();
                    self.dispatch(front)?;
                }
                Resolution::Expand { len, mapping } => self.expand(len, mapping)?,
            }
        }
    }

    /// Replaces the first `len` queued keys with the mapping's rhs.
    fn expand(&mut self, len: usize, mapping: Arc<Mapping>) -> Result<()> {
        let consumed: Vec<QueuedKey> = self.session.resolver.typeahead.drain(..len).collect();
        let depth = consumed.iter().map(|q| q.depth).max().unwrap_or(0) + 1;
        if depth > self.shared.options.maxmapdepth() {
            warn!(lhs = %keys_to_notation(&mapping.lhs), depth, "mapping recursion limit");
            return Err(EngineError::RecursiveMapping);
        }
        let rhs = match &mapping.rhs {
            MapRhs::Keys(keys) => keys.clone(),
            MapRhs::Expr(expr) => {
                let value = self.eval_map_expr(expr, mapping.sid)?;
                text_to_keys(&value)
            }
        };
        debug!(
            lhs = %keys_to_notation(&mapping.lhs),
            rhs = %keys_to_notation(&rhs),
            depth,
            "mapping expanded"
        );
        let protect = if mapping.remap && rhs.starts_with(&mapping.lhs) {
            mapping.lhs.len()
        } else {
            0
        };
        let queued: Vec<QueuedKey> = rhs
            .into_iter()
            .enumerate()
            .map(|(i, key)| QueuedKey {
                key,
                remap: mapping.remap && i >= protect,
                depth,
                from_user: false,
            })
            .collect();
        self.session.resolver.push_front(queued.into_iter());
        Ok(())
    }

    /// Sends one resolved key to the handler for the current mode.
    pub(crate) fn dispatch(&mut self, queued: QueuedKey) -> Result<()> {
        trace!(key = %queued.key, mode = self.session.mode.mode().name(), "dispatch");
        self.session.depth = queued.depth;
        match self.session.mode.mode() {
            Mode::Insert | Mode::Replace => self.insert_key(queued.key),
            Mode::CmdLine(_) => self.cmdline_key(queued.key),
            Mode::Select(_) => self.select_key(queued.key),
            _ => self.normal_key(queued.key),
        }
    }

    /// Queues a register's keys for replay, `count` times.
    pub(crate) fn replay_register(&mut self, text: &str, count: usize) -> Result<()> {
        let depth = self.session.depth + 1;
        if depth > MAX_MACRO_DEPTH {
            warn!(depth, "macro recursion limit");
            return Err(EngineError::MacroTooDeep);
        }
        let keys = text_to_keys(text);
        debug!(keys = %keys_to_notation(&keys), count, depth, "replaying register");
        let queued: Vec<QueuedKey> = std::iter::repeat_n(keys, count)
            .flatten()
            .map(|key| QueuedKey {
                key,
                remap: true,
                depth,
                from_user: false,
            })
            .collect();
        self.session.resolver.push_front(queued.into_iter());
        Ok(())
    }

    /// Restores a consistent state after an error: typeahead flushed,
    /// pending command cleared, NORMAL mode for resolution and recursion
    /// failures.
    pub(crate) fn recover(&mut self, err: &EngineError) {
        debug!(%err, "recovering");
        self.session.resolver.flush();
        match err {
            EngineError::RecursiveMapping | EngineError::MacroTooDeep | EngineError::NormalTooDeep => {
                self.reset_to_normal();
            }
            _ => {
                if matches!(self.session.mode.mode(), Mode::OperatorPending { .. }) {
                    self.set_mode(Mode::Normal);
                }
            }
        }
        self.editor.beep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::parse_keys;

    fn feed_all(builder: &mut CommandBuilder, ctx: Context, keys: &str) -> Vec<Step> {
        parse_keys(keys)
            .into_iter()
            .map(|k| builder.feed(ctx, k, false))
            .collect()
    }

    fn last_command(steps: &[Step]) -> Command {
        match steps.last() {
            Some(Step::Command(cmd)) => cmd.clone(),
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn counts_multiply() {
        let mut b = CommandBuilder::default();
        let steps = feed_all(&mut b, Context::Normal, "2d3w");
        let cmd = last_command(&steps);
        assert_eq!(cmd.count, Some(6));
        assert_eq!(cmd.operator, Some(Operator::Delete));
        assert_eq!(cmd.motion, Some(Motion::WordForward { big: false }));
        assert_eq!(cmd.notation(), "2d3w");
    }

    #[test]
    fn zero_is_a_motion_without_count() {
        let mut b = CommandBuilder::default();
        let cmd = last_command(&feed_all(&mut b, Context::Normal, "0"));
        assert_eq!(cmd.motion, Some(Motion::LineStart));
        let cmd = last_command(&feed_all(&mut b, Context::Normal, "10j"));
        assert_eq!(cmd.count, Some(10));
    }

    #[test]
    fn doubled_operators_select_lines() {
        let mut b = CommandBuilder::default();
        for keys in ["dd", "gUU", "gUgU", "<lt><lt>", "g??"] {
            let cmd = last_command(&feed_all(&mut b, Context::Normal, keys));
            assert_eq!(cmd.motion, Some(Motion::CurrentLine), "{keys}");
        }
    }

    #[test]
    fn register_and_arguments() {
        let mut b = CommandBuilder::default();
        let cmd = last_command(&feed_all(&mut b, Context::Normal, "\"ayy"));
        assert_eq!(cmd.register, Some('a'));
        let cmd = last_command(&feed_all(&mut b, Context::Normal, "dfx"));
        assert_eq!(cmd.motion, Some(Motion::Find { ch: 'x', forward: true, till: false }));
        let cmd = last_command(&feed_all(&mut b, Context::Normal, "r<CR>"));
        assert_eq!(cmd.action, Some(Action::ReplaceChar('\r')));
    }

    #[test]
    fn unknown_and_cancel() {
        let mut b = CommandBuilder::default();
        assert_eq!(feed_all(&mut b, Context::Normal, "d<Esc>").last(), Some(&Step::Cancelled));
        assert!(b.is_empty());
        assert_eq!(
            feed_all(&mut b, Context::Normal, "gz").last(),
            Some(&Step::Unknown("gz".to_string()))
        );
        assert_eq!(
            feed_all(&mut b, Context::Normal, "dv").last(),
            Some(&Step::Unknown("dv".to_string()))
        );
    }
}
