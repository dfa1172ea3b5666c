//! A Vimscript subset: variables, control flow, user functions, lambdas,
//! exceptions and the ex commands that configure the engine.
//!
//! A script is parsed completely before anything runs, so a syntax error
//! anywhere means nothing executes. Execution stops at the first uncaught
//! error; whatever earlier statements did stays done.

mod ast;
mod builtins;
mod error;
mod ex;
mod expr;
mod interp;
mod parser;
mod value;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::Result as EngineResult;
use crate::key::KeyEvent;
use crate::mapping::MappingTable;
use crate::shared::SharedState;
use crate::traits::EditorOps;
use crate::types::Mode;

pub use self::ast::{Expr, Program, Stmt, StmtKind};
pub use self::error::{Location, ScriptError, ScriptErrorKind};
pub use self::expr::parse_expression;
pub(crate) use self::interp::Interpreter;
pub use self::parser::parse;
pub use self::value::{Dict, Funcref, List, Value};

/// What the interpreter needs from the engine. Implemented by the engine's
/// per-key context; tests can drive the interpreter through any host.
pub(crate) trait ScriptHost {
    fn state(&mut self) -> &mut SharedState;
    fn editor(&mut self) -> &mut dyn EditorOps;
    /// Mappings defined with `<buffer>` in this session.
    fn buffer_mappings(&mut self) -> &mut MappingTable;
    fn mode(&self) -> Mode;
    fn v_count(&self) -> u32;
    fn v_register(&self) -> char;
    /// `feedkeys()`. With `execute` the keys are processed before returning.
    fn feed_keys(&mut self, keys: Vec<KeyEvent>, remap: bool, execute: bool) -> EngineResult<()>;
    /// `:normal`.
    fn normal(&mut self, keys: Vec<KeyEvent>, remap: bool) -> EngineResult<()>;
    fn start_insert(&mut self, append: bool);
    fn stop_insert(&mut self);
    fn message(&mut self, text: String);
    /// First and last line of the last visual selection.
    fn visual_lines(&self) -> Option<(usize, usize)>;
    fn leader(&self) -> String;
}

/// The code a user function runs.
#[derive(Debug, Clone)]
pub enum FunctionBody {
    Statements(Arc<Vec<Stmt>>),
    /// A lambda's single expression.
    Lambda(Arc<Expr>),
}

#[derive(Debug, Clone)]
pub struct UserFunction {
    pub name: String,
    pub params: Vec<String>,
    pub varargs: bool,
    pub body: FunctionBody,
    /// Script the function was defined in; `s:` inside it resolves there.
    pub sid: u32,
    /// Variables a lambda closes over: the defining function's `l:` and `a:`.
    pub closure: Option<(Dict, Dict)>,
}

/// Script state shared by every engine on the same handle.
#[derive(Debug, Default)]
pub struct ScriptState {
    /// `g:` variables, keyed without the prefix.
    pub globals: IndexMap<String, Value>,
    /// `b:`, `w:` and `t:` variables, keyed with their prefix.
    pub scoped: IndexMap<String, Value>,
    /// `s:` variables per script id.
    pub script_vars: HashMap<u32, Dict>,
    /// `let $VAR = ...` values. They shadow the process environment
    /// without modifying it.
    pub environment: IndexMap<String, String>,
    pub functions: IndexMap<String, Arc<UserFunction>>,
    /// Last error message, `v:errmsg`.
    pub errmsg: String,
    next_sid: u32,
    anonymous: usize,
}

impl ScriptState {
    /// Allocates the id `<SID>` and `s:` use for one sourced script.
    /// Zero is reserved for command lines.
    pub fn next_script_id(&mut self) -> u32 {
        self.next_sid += 1;
        self.next_sid
    }

    pub(crate) fn next_anonymous(&mut self) -> usize {
        self.anonymous += 1;
        self.anonymous
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name.strip_prefix("g:").unwrap_or(name))
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals
            .insert(name.strip_prefix("g:").unwrap_or(name).to_string(), value);
    }

    pub(crate) fn script_dict(&mut self, sid: u32) -> Dict {
        self.script_vars
            .entry(sid)
            .or_insert_with(|| Dict::new(IndexMap::new()))
            .clone()
    }
}
