use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cmdline::CmdlineState;
use crate::command::Command;
use crate::error::{EngineError, Result};
use crate::insert::InsertState;
use crate::key::{InputEvent, KeyEvent, keys_to_notation, parse_keys_with_leader};
use crate::mapping::MappingTable;
use crate::mode::{ModeMachine, VisualExtent};
use crate::motion::LastFind;
use crate::resolver::{QueuedKey, Resolver};
use crate::shared::{SharedHandle, SharedState};
use crate::traits::{Clipboard, EditorOps};
use crate::types::Mode;
use crate::vimscript::{self, Interpreter, ScriptError, ScriptHost};

/// Nesting limit for `:normal`.
pub const MAX_NORMAL_DEPTH: usize = 64;

/// A `q{reg}` recording in progress.
#[derive(Debug, Clone)]
pub(crate) struct Recording {
    pub register: char,
    pub keys: Vec<KeyEvent>,
}

/// What `.` repeats.
#[derive(Debug, Clone)]
pub(crate) struct RepeatRecord {
    pub command: Command,
    /// Keys typed in the insert session the command started.
    pub inserted: Option<Vec<KeyEvent>>,
    /// Set when the command was a visual operator.
    pub extent: Option<VisualExtent>,
}

/// Per-session state: everything that is not shared between engines.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub mode: ModeMachine,
    pub resolver: Resolver,
    /// `<buffer>` mappings; they shadow the shared table in this session.
    pub buffer_mappings: MappingTable,
    pub recording: Option<Recording>,
    pub last_find: Option<LastFind>,
    /// Column `j`/`k` aim for; `usize::MAX` after `$`.
    pub preferred_col: usize,
    pub dot: Option<RepeatRecord>,
    /// Set while the command being executed is being recorded for `.`.
    pub dot_pending: bool,
    pub replaying_dot: bool,
    pub insert: Option<InsertState>,
    pub cmdline: Option<CmdlineState>,
    pub messages: Vec<String>,
    pub last_executed: Option<char>,
    pub leader: String,
    pub normal_depth: usize,
    /// Expansion depth of the key being dispatched.
    pub depth: usize,
    pub v_count: u32,
    pub v_register: Option<char>,
}

impl Session {
    fn new(mode: Mode, leader: String) -> Self {
        Self {
            mode: ModeMachine::new(mode),
            resolver: Resolver::new(),
            buffer_mappings: MappingTable::new(),
            recording: None,
            last_find: None,
            preferred_col: 0,
            dot: None,
            dot_pending: false,
            replaying_dot: false,
            insert: None,
            cmdline: None,
            messages: Vec::new(),
            last_executed: None,
            leader,
            normal_depth: 0,
            depth: 0,
            v_count: 0,
            v_register: None,
        }
    }
}

/// Everything one dispatched key may touch. Built once per public entry
/// point while the shared lock is held.
pub(crate) struct Ctx<'a> {
    pub shared: &'a mut SharedState,
    pub session: &'a mut Session,
    pub editor: &'a mut dyn EditorOps,
}

impl Ctx<'_> {
    pub(crate) fn set_mode(&mut self, mode: Mode) {
        self.session.mode.set(self.editor, mode);
    }

    pub(crate) fn adj(&self) -> usize {
        self.shared.options.selection_adjustment()
    }

    /// Abandons insert, visual, command-line and pending state.
    pub(crate) fn reset_to_normal(&mut self) {
        self.session.resolver.builder.reset();
        self.session.insert = None;
        self.session.cmdline = None;
        self.set_mode(Mode::Normal);
        let caret = self.editor.clamp(self.editor.caret());
        self.editor.set_caret(caret);
    }

    pub(crate) fn message(&mut self, text: impl Into<String>) {
        self.session.messages.push(text.into());
    }

    /// Evaluates the rhs of an `<expr>` mapping.
    pub(crate) fn eval_map_expr(&mut self, expr: &str, sid: u32) -> Result<String> {
        let mut interp = Interpreter::new(sid);
        let value = interp.eval_source(self, expr)?;
        Ok(value.to_str()?)
    }

    /// Parses and runs one `:` command line.
    pub(crate) fn run_command_line(&mut self, line: &str) -> Result<()> {
        debug!(line, "command line");
        let program = vimscript::parse(line)?;
        let mut interp = Interpreter::new(0);
        interp.run(self, &program).map_err(ScriptError::into_engine)
    }

    /// `:normal`: runs `keys` to completion with a private typeahead, then
    /// aborts whatever command is left incomplete.
    pub(crate) fn run_normal(&mut self, keys: Vec<KeyEvent>, remap: bool) -> Result<()> {
        if self.session.normal_depth >= MAX_NORMAL_DEPTH {
            warn!(depth = self.session.normal_depth, ":normal recursion limit");
            return Err(EngineError::NormalTooDeep);
        }
        debug!(keys = %keys_to_notation(&keys), remap, "normal");
        self.session.normal_depth += 1;
        let saved = std::mem::take(&mut self.session.resolver.typeahead);
        let closed = std::mem::replace(&mut self.session.resolver.closed, true);
        let depth = self.session.depth;
        self.session.resolver.typeahead.extend(keys.into_iter().map(|key| QueuedKey {
            key,
            remap,
            depth,
            from_user: false,
        }));
        let result = self.process_typeahead(false);
        self.abort_incomplete();
        self.session.resolver.typeahead = saved;
        self.session.resolver.closed = closed;
        self.session.normal_depth -= 1;
        match result {
            Err(
                err @ (EngineError::NormalTooDeep
                | EngineError::MacroTooDeep
                | EngineError::RecursiveMapping),
            ) => Err(err),
            Err(err) => {
                self.message(err.to_string());
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Ends a command `:normal` left unfinished, as `<Esc>` would.
    fn abort_incomplete(&mut self) {
        self.session.resolver.builder.reset();
        self.session.resolver.typeahead.clear();
        match self.session.mode.mode() {
            Mode::Insert | Mode::Replace => {
                if let Err(err) = self.finish_insert() {
                    self.message(err.to_string());
                }
            }
            Mode::CmdLine(_) => self.cancel_cmdline(),
            Mode::OperatorPending { .. } => self.set_mode(Mode::Normal),
            _ => {}
        }
    }

    /// Queues keys as if typed, for `feedkeys()`.
    pub(crate) fn queue_keys(&mut self, keys: Vec<KeyEvent>, remap: bool, execute: bool) -> Result<()> {
        let depth = self.session.depth;
        self.session.resolver.typeahead.extend(keys.into_iter().map(|key| QueuedKey {
            key,
            remap,
            depth,
            from_user: false,
        }));
        if execute {
            let closed = std::mem::replace(&mut self.session.resolver.closed, true);
            let result = self.process_typeahead(false);
            self.session.resolver.closed = closed;
            result?;
        }
        Ok(())
    }
}

impl ScriptHost for Ctx<'_> {
    fn state(&mut self) -> &mut SharedState {
        self.shared
    }

    fn editor(&mut self) -> &mut dyn EditorOps {
        self.editor
    }

    fn buffer_mappings(&mut self) -> &mut MappingTable {
        &mut self.session.buffer_mappings
    }

    fn mode(&self) -> Mode {
        self.session.mode.mode()
    }

    fn v_count(&self) -> u32 {
        self.session.v_count
    }

    fn v_register(&self) -> char {
        self.session.v_register.unwrap_or('"')
    }

    fn feed_keys(&mut self, keys: Vec<KeyEvent>, remap: bool, execute: bool) -> Result<()> {
        self.queue_keys(keys, remap, execute)
    }

    fn normal(&mut self, keys: Vec<KeyEvent>, remap: bool) -> Result<()> {
        self.run_normal(keys, remap)
    }

    fn start_insert(&mut self, append: bool) {
        if append {
            let line = self.editor.line_of_offset(self.editor.caret());
            let end = self.editor.line_end(line);
            self.editor.set_caret(end);
        }
        self.begin_insert(crate::insert::InsertKind::Insert, 1, None, None);
    }

    fn stop_insert(&mut self) {
        if self.session.mode.mode().is_insert_like()
            && let Err(err) = self.finish_insert()
        {
            self.message(err.to_string());
        }
    }

    fn message(&mut self, text: String) {
        self.session.messages.push(text);
    }

    fn visual_lines(&self) -> Option<(usize, usize)> {
        self.session.mode.last_visual()
    }

    fn leader(&self) -> String {
        self.session.leader.clone()
    }
}

/// A read-only view of the session for hosts and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub mode: Mode,
    /// Keys of the command being typed, in notation.
    pub pending_keys: String,
    pub recording: Option<char>,
    /// The command line including its prompt character.
    pub cmdline: Option<String>,
}

/// The Vim engine for one editing session.
#[derive(Debug)]
pub struct Engine {
    shared: SharedHandle,
    session: Session,
}

pub struct EngineBuilder {
    mode: Mode,
    shared: Option<SharedHandle>,
    clipboard: Option<Box<dyn Clipboard>>,
    leader: String,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            shared: None,
            clipboard: None,
            leader: "\\".to_string(),
        }
    }
}

impl EngineBuilder {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Shares registers, mappings, options and script globals with other
    /// engines built from the same handle.
    pub fn shared(mut self, shared: SharedHandle) -> Self {
        self.shared = Some(shared);
        self
    }

    pub fn clipboard(mut self, clipboard: Box<dyn Clipboard>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    /// The `<Leader>` used when `g:mapleader` is unset.
    pub fn leader(mut self, leader: impl Into<String>) -> Self {
        self.leader = leader.into();
        self
    }

    pub fn build(self) -> Engine {
        let shared = self.shared.unwrap_or_else(SharedState::handle);
        if let Some(clipboard) = self.clipboard {
            shared.lock().set_clipboard(clipboard);
        }
        Engine {
            shared,
            session: Session::new(self.mode, self.leader),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        EngineBuilder::default().build()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The process-wide state this engine uses.
    pub fn shared(&self) -> SharedHandle {
        Arc::clone(&self.shared)
    }

    pub fn mode(&self) -> Mode {
        self.session.mode.mode()
    }

    pub fn recording(&self) -> Option<char> {
        self.session.recording.as_ref().map(|r| r.register)
    }

    pub fn pending_keys(&self) -> String {
        let mut keys = keys_to_notation(self.session.resolver.builder.pending_keys());
        let queued: Vec<KeyEvent> = self.session.resolver.typeahead.iter().map(|q| q.key).collect();
        keys.push_str(&keys_to_notation(&queued));
        keys
    }

    pub fn cmdline_text(&self) -> Option<String> {
        self.session
            .cmdline
            .as_ref()
            .map(|c| format!("{}{}", c.kind.prompt(), c.text))
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            mode: self.mode(),
            pending_keys: self.pending_keys(),
            recording: self.recording(),
            cmdline: self.cmdline_text(),
        }
    }

    /// Messages produced since the last call: `:echo` output, search
    /// wrap notices, `:registers` listings.
    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.session.messages)
    }

    /// How long the host should wait before calling
    /// [`Engine::timeout_elapsed`], when an ambiguous mapping is pending.
    pub fn pending_timeout(&self) -> Option<Duration> {
        if self.session.resolver.typeahead.is_empty() {
            return None;
        }
        self.shared.lock().options.timeoutlen()
    }

    fn with_ctx<R>(&mut self, editor: &mut dyn EditorOps, f: impl FnOnce(&mut Ctx<'_>) -> R) -> R {
        let mut shared = self.shared.lock();
        let mut ctx = Ctx {
            shared: &mut shared,
            session: &mut self.session,
            editor,
        };
        f(&mut ctx)
    }

    pub fn handle_event(&mut self, editor: &mut dyn EditorOps, event: InputEvent) -> Result<()> {
        let queued = match event {
            InputEvent::Key(key) => QueuedKey::typed(key.normalized()),
            InputEvent::ReceivedChar(c) => QueuedKey {
                remap: false,
                ..QueuedKey::typed(KeyEvent::char(c))
            },
        };
        if let Some(recording) = self.session.recording.as_mut() {
            recording.keys.push(queued.key);
        }
        self.session.resolver.typeahead.push_back(queued);
        self.with_ctx(editor, |ctx| ctx.process_typeahead(false))
    }

    pub fn handle_key(&mut self, editor: &mut dyn EditorOps, key: KeyEvent) -> Result<()> {
        self.handle_event(editor, InputEvent::Key(key))
    }

    /// Types keys given in Vim notation, e.g. `"d2w"` or `"ihi<Esc>"`.
    pub fn feed_keys(&mut self, editor: &mut dyn EditorOps, notation: &str) -> Result<()> {
        let leader = self.current_leader();
        for key in parse_keys_with_leader(notation, &leader) {
            self.handle_key(editor, key)?;
        }
        Ok(())
    }

    fn current_leader(&self) -> String {
        let shared = self.shared.lock();
        match shared.script.globals.get("mapleader") {
            Some(value) => value.to_str().unwrap_or_else(|_| self.session.leader.clone()),
            None => self.session.leader.clone(),
        }
    }

    /// Resolves an ambiguous mapping prefix after `timeoutlen`.
    pub fn timeout_elapsed(&mut self, editor: &mut dyn EditorOps) -> Result<()> {
        if self.session.resolver.typeahead.is_empty() {
            return Ok(());
        }
        debug!("mapping timeout");
        self.with_ctx(editor, |ctx| ctx.process_typeahead(true))
    }

    /// Drops all pending input and returns to NORMAL.
    pub fn abort(&mut self, editor: &mut dyn EditorOps) {
        debug!("abort");
        self.with_ctx(editor, |ctx| {
            ctx.session.resolver.flush();
            ctx.reset_to_normal();
        });
    }

    /// Parses and runs a Vimscript file. Nothing runs when the script has
    /// a syntax error.
    pub fn source(&mut self, editor: &mut dyn EditorOps, script: &str) -> Result<()> {
        self.with_ctx(editor, |ctx| {
            let sid = ctx.shared.script.next_script_id();
            debug!(sid, len = script.len(), "sourcing script");
            let program = vimscript::parse(script).inspect_err(|err| debug!(%err, "script syntax error"))?;
            let mut interp = Interpreter::new(sid);
            interp
                .run(ctx, &program)
                .inspect_err(|err| debug!(%err, "script error"))
                .map_err(ScriptError::into_engine)?;
            ctx.process_typeahead(false)
        })
    }

    /// Runs one command line as if typed after `:`.
    pub fn execute_command_line(&mut self, editor: &mut dyn EditorOps, line: &str) -> Result<()> {
        self.with_ctx(editor, |ctx| {
            let line = line.strip_prefix(':').unwrap_or(line);
            ctx.shared.registers.set_last_command(line.to_string());
            let result = ctx.run_command_line(line);
            if let Err(err) = &result {
                ctx.recover(err);
                return result;
            }
            ctx.process_typeahead(false)
        })
    }
}
