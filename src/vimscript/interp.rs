//! Tree-walking evaluation of parsed scripts.

use std::cmp::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use super::ast::{
    AssignOp, BinaryOp, CompareOp, EchoKind, Expr, FunctionDef, LetTarget, Program, Stmt, StmtKind, UnaryOp,
};
use super::error::{Result, ScriptError, ScriptErrorKind};
use super::expr::parse_expression;
use super::value::{Dict, Funcref, Value, compare, equals, format_float};
use super::{FunctionBody, ScriptHost, UserFunction, builtins, ex, parser};
use crate::options::OptionValue;
use crate::register::{Register, RegisterType, WriteKind};
use crate::search::{Pattern, Submatches};

const SCOPES: &str = "gslavbwt";

/// How a statement hands control back to its block.
#[derive(Debug)]
pub(super) enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

struct Frame {
    locals: Dict,
    args: Dict,
    self_dict: Option<Dict>,
    closure: Option<(Dict, Dict)>,
    sid: u32,
}

pub(crate) struct Interpreter {
    sid: u32,
    frames: Vec<Frame>,
    /// `v:key` and `v:val` for the innermost `map()` or `filter()`.
    pub(super) iteration: Vec<(Value, Value)>,
    exception: Option<String>,
    /// Output of `:echo` while `execute()` collects it.
    pub(super) capture: Option<String>,
    /// Groups of the match a `\=` replacement is evaluated for.
    pub(super) submatch: Option<Submatches>,
}

/// Splits `g:name` into its scope letter and the bare name.
fn split_scope(name: &str) -> (Option<char>, &str) {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(scope), Some(':')) if SCOPES.contains(scope) => (Some(scope), &name[2..]),
        _ => (None, name),
    }
}

fn strip_option_scope(name: &str) -> &str {
    name.strip_prefix("l:")
        .or_else(|| name.strip_prefix("g:"))
        .unwrap_or(name)
}

pub(super) fn option_to_value(value: &OptionValue) -> Value {
    match value {
        OptionValue::Bool(b) => Value::Number(i64::from(*b)),
        OptionValue::Number(n) => Value::Number(*n),
        OptionValue::String(s) => Value::String(s.clone()),
    }
}

/// The text a value contributes to `..` and `:execute`.
pub(super) fn concat_text(value: &Value) -> Result<String> {
    match value {
        Value::Float(f) => Ok(format_float(*f)),
        other => other.to_str(),
    }
}

/// Register content for `:let @r =` and `setreg()`. A List becomes lines.
pub(super) fn register_text(value: &Value) -> Result<String> {
    match value {
        Value::List(list) => {
            let mut text = String::new();
            for item in list.items() {
                text.push_str(&item.to_str()?);
                text.push('\n');
            }
            Ok(text)
        }
        other => concat_text(other),
    }
}

/// Resolves a possibly negative list index.
pub(super) fn list_index(len: usize, index: i64) -> Result<usize> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    if (0..len as i64).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(ScriptErrorKind::IndexOutOfRange(index).into())
    }
}

/// `[from:to]` with an inclusive end, as a half-open range. Out of range
/// slices are empty.
fn slice_bounds(len: usize, from: i64, to: i64) -> (usize, usize) {
    let len = len as i64;
    let start = if from < 0 { (len + from).max(0) } else { from };
    let end = if to < 0 { len + to } else { to.min(len - 1) };
    if start > end || start >= len {
        (0, 0)
    } else {
        (start as usize, end as usize + 1)
    }
}

fn divide(x: i64, y: i64) -> i64 {
    match (x, y) {
        (0, 0) => i64::MIN,
        (x, 0) if x > 0 => i64::MAX,
        (_, 0) => -i64::MAX,
        (x, y) => x.wrapping_div(y),
    }
}

pub(super) fn binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    if op == BinaryOp::Concat {
        return Ok(Value::String(format!("{}{}", concat_text(a)?, concat_text(b)?)));
    }
    if let (BinaryOp::Add, Value::List(x), Value::List(y)) = (op, a, b) {
        let mut items = x.items();
        items.extend(y.items());
        return Ok(Value::list(items));
    }
    if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) {
        let (x, y) = (a.to_float()?, b.to_float()?);
        let result = match op {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => x / y,
            BinaryOp::Mod | BinaryOp::Concat => return Err(ScriptErrorKind::FloatAsNumber.into()),
        };
        return Ok(Value::Float(result));
    }
    let (x, y) = (a.to_number()?, b.to_number()?);
    Ok(Value::Number(match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Sub => x.wrapping_sub(y),
        BinaryOp::Mul => x.wrapping_mul(y),
        BinaryOp::Div => divide(x, y),
        BinaryOp::Mod | BinaryOp::Concat => {
            if y == 0 {
                0
            } else {
                x.wrapping_rem(y)
            }
        }
    }))
}

fn unary(op: UnaryOp, value: &Value) -> Result<Value> {
    Ok(match (op, value) {
        (UnaryOp::Not, v) => Value::from(!v.truthy()?),
        (UnaryOp::Neg, Value::Float(f)) => Value::Float(-f),
        (UnaryOp::Neg, v) => Value::Number(v.to_number()?.wrapping_neg()),
        (UnaryOp::Plus, Value::Float(f)) => Value::Float(*f),
        (UnaryOp::Plus, v) => Value::Number(v.to_number()?),
    })
}

fn compare_values(op: CompareOp, a: &Value, b: &Value, ic: bool) -> Result<bool> {
    Ok(match op {
        CompareOp::Eq => equals(a, b, ic)?,
        CompareOp::Ne => !equals(a, b, ic)?,
        CompareOp::Gt => compare(a, b, ic)? == Ordering::Greater,
        CompareOp::Ge => compare(a, b, ic)? != Ordering::Less,
        CompareOp::Lt => compare(a, b, ic)? == Ordering::Less,
        CompareOp::Le => compare(a, b, ic)? != Ordering::Greater,
        CompareOp::Match | CompareOp::NoMatch => {
            let pattern = Pattern::new(&b.to_str()?, ic, false, None)?;
            pattern.is_match(&a.to_str()?) == (op == CompareOp::Match)
        }
        CompareOp::Is | CompareOp::IsNot => {
            let same = match (a, b) {
                (Value::List(x), Value::List(y)) => x.ptr_eq(y),
                (Value::Dict(x), Value::Dict(y)) => x.ptr_eq(y),
                (Value::List(_) | Value::Dict(_), _) | (_, Value::List(_) | Value::Dict(_)) => false,
                _ => a.type_code() == b.type_code() && equals(a, b, ic)?,
            };
            same == (op == CompareOp::Is)
        }
    })
}

fn index_value(base: &Value, index: &Value) -> Result<Value> {
    match base {
        Value::List(list) => {
            let i = list_index(list.len(), index.to_number()?)?;
            Ok(list.get(i).unwrap_or_default())
        }
        Value::Dict(dict) => {
            let key = index.to_str()?;
            dict.get(&key)
                .ok_or_else(|| ScriptErrorKind::KeyNotFound(key).into())
        }
        Value::String(_) | Value::Number(_) => {
            let text = base.to_str()?;
            let n = index.to_number()?;
            let ch = usize::try_from(n).ok().and_then(|i| text.chars().nth(i));
            Ok(Value::String(ch.map(String::from).unwrap_or_default()))
        }
        _ => Err(ScriptErrorKind::NotIndexable.into()),
    }
}

fn slice_value(base: &Value, from: Option<i64>, to: Option<i64>) -> Result<Value> {
    let (from, to) = (from.unwrap_or(0), to.unwrap_or(-1));
    match base {
        Value::List(list) => {
            let items = list.items();
            let (start, end) = slice_bounds(items.len(), from, to);
            Ok(Value::list(items[start..end].to_vec()))
        }
        Value::String(_) | Value::Number(_) => {
            let chars: Vec<char> = base.to_str()?.chars().collect();
            let (start, end) = slice_bounds(chars.len(), from, to);
            Ok(Value::String(chars[start..end].iter().collect()))
        }
        _ => Err(ScriptErrorKind::NotIndexable.into()),
    }
}

fn clear_location(mut err: ScriptError) -> ScriptError {
    err.location = None;
    err
}

impl Interpreter {
    /// An interpreter for one script; `sid` resolves `s:` and `<SID>`.
    pub fn new(sid: u32) -> Self {
        Self {
            sid,
            frames: Vec::new(),
            iteration: Vec::new(),
            exception: None,
            capture: None,
            submatch: None,
        }
    }

    /// Runs `program` until it finishes or the first uncaught error.
    pub fn run(&mut self, host: &mut dyn ScriptHost, program: &Program) -> Result<()> {
        match self.exec_block(host, &program.body) {
            Ok(_) => Ok(()),
            Err(err) => {
                debug!(%err, "script aborted");
                host.state().script.errmsg = err.kind.to_string();
                Err(err)
            }
        }
    }

    /// Evaluates one expression given as source text.
    pub fn eval_source(&mut self, host: &mut dyn ScriptHost, text: &str) -> Result<Value> {
        let expr = parse_expression(text)?;
        self.eval(host, &expr)
    }

    pub(super) fn current_sid(&self) -> u32 {
        self.frames.last().map_or(self.sid, |f| f.sid)
    }

    /// Sends `:echo` output to the host, or to `execute()`'s buffer.
    pub(super) fn output(&mut self, host: &mut dyn ScriptHost, text: String) {
        match self.capture.as_mut() {
            Some(buffer) => {
                buffer.push('\n');
                buffer.push_str(&text);
            }
            None => host.message(text),
        }
    }

    /// `:execute` and `execute()`: parses and runs `source` in the current
    /// scope.
    pub(super) fn execute_source(&mut self, host: &mut dyn ScriptHost, source: &str) -> Result<()> {
        trace!(source, "execute");
        let program = parser::parse(source).map_err(clear_location)?;
        self.exec_block(host, &program.body).map_err(clear_location)?;
        Ok(())
    }

    fn exec_block(&mut self, host: &mut dyn ScriptHost, body: &[Stmt]) -> Result<Flow> {
        for stmt in body {
            let flow = self.exec_stmt(host, stmt).map_err(|err| err.at(stmt.location))?;
            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, host: &mut dyn ScriptHost, stmt: &Stmt) -> Result<Flow> {
        trace!(line = stmt.location.line, "statement");
        match &stmt.kind {
            StmtKind::Let { target, op, value } => {
                let value = self.eval(host, value)?;
                self.assign_target(host, target, *op, value)?;
            }
            StmtKind::ShowVar(names) => self.show_vars(host, names)?,
            StmtKind::Unlet { targets, bang } => {
                for target in targets {
                    self.unlet(host, target, *bang)?;
                }
            }
            StmtKind::If { branches, otherwise } => {
                for (cond, body) in branches {
                    if self.eval(host, cond)?.truthy()? {
                        return self.exec_block(host, body);
                    }
                }
                if let Some(body) = otherwise {
                    return self.exec_block(host, body);
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval(host, cond)?.truthy()? {
                    match self.exec_block(host, body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            StmtKind::For { target, iter, body } => {
                let items = match self.eval(host, iter)? {
                    Value::List(list) => list.items(),
                    Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                    _ => return Err(ScriptErrorKind::ListRequired.into()),
                };
                for item in items {
                    self.assign_target(host, target, AssignOp::Set, item)?;
                    match self.exec_block(host, body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Function(def) => self.define_function(host, def)?,
            StmtKind::ListFunctions => {
                let listing: Vec<String> = host
                    .state()
                    .script
                    .functions
                    .values()
                    .filter(|f| matches!(f.body, FunctionBody::Statements(_)))
                    .map(|f| {
                        let mut params = f.params.clone();
                        if f.varargs {
                            params.push("...".to_string());
                        }
                        format!("function {}({})", f.name, params.join(", "))
                    })
                    .collect();
                for line in listing {
                    self.output(host, line);
                }
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(host, expr)?,
                    None => Value::Number(0),
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::DelFunction { name, bang } => self.delete_function(host, name, *bang)?,
            StmtKind::Call(expr) => {
                self.eval(host, expr)?;
            }
            StmtKind::Echo { kind, args } => {
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(self.eval(host, arg)?.display());
                }
                let separator = if *kind == EchoKind::Echon { "" } else { " " };
                let text = parts.join(separator);
                if *kind == EchoKind::Echoerr {
                    return Err(ScriptErrorKind::EchoErr(text).into());
                }
                self.output(host, text);
            }
            StmtKind::Execute(args) => {
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(concat_text(&self.eval(host, arg)?)?);
                }
                self.execute_source(host, &parts.join(" "))?;
            }
            StmtKind::Try { body, catches, finally } => {
                let mut result = self.exec_block(host, body);
                if let Some(text) = result.as_ref().err().map(ScriptError::exception_text) {
                    for catch in catches {
                        let matched = match &catch.pattern {
                            None => true,
                            Some(pattern) => Pattern::new(pattern, false, false, None)?.is_match(&text),
                        };
                        if matched {
                            trace!(exception = %text, "caught");
                            let saved = self.exception.replace(text);
                            result = self.exec_block(host, &catch.body);
                            self.exception = saved;
                            break;
                        }
                    }
                }
                if let Some(finally) = finally {
                    match self.exec_block(host, finally)? {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                return result;
            }
            StmtKind::Throw(expr) => {
                let value = self.eval(host, expr)?.display();
                debug!(exception = %value, "throw");
                return Err(ScriptErrorKind::Exception(value).into());
            }
            StmtKind::Ex(cmd) => ex::execute(self, host, cmd)?,
        }
        Ok(Flow::Normal)
    }

    fn show_vars(&mut self, host: &mut dyn ScriptHost, names: &[Expr]) -> Result<()> {
        if names.is_empty() {
            let listing: Vec<String> = host
                .state()
                .script
                .globals
                .iter()
                .map(|(name, value)| format!("g:{name:<16} {}", value.repr()))
                .collect();
            for line in listing {
                self.output(host, line);
            }
            return Ok(());
        }
        for expr in names {
            let value = self.eval(host, expr)?;
            let label = match expr {
                Expr::Name(name) => name.clone(),
                Expr::Option(name) => format!("&{name}"),
                Expr::Register(name) => format!("@{name}"),
                _ => String::new(),
            };
            self.output(host, format!("{label:<16} {}", value.repr()));
        }
        Ok(())
    }

    fn assign_target(&mut self, host: &mut dyn ScriptHost, target: &LetTarget, op: AssignOp, value: Value) -> Result<()> {
        match target {
            LetTarget::Single(expr) => self.assign(host, expr, op, value),
            LetTarget::Unpack { names, rest } => {
                let Value::List(list) = value else {
                    return Err(ScriptErrorKind::ListRequired.into());
                };
                let items = list.items();
                if items.len() < names.len() {
                    return Err(ScriptErrorKind::TooManyTargets.into());
                }
                if rest.is_none() && items.len() > names.len() {
                    return Err(ScriptErrorKind::TooFewTargets.into());
                }
                for (name, item) in names.iter().zip(&items) {
                    self.assign(host, name, op, item.clone())?;
                }
                if let Some(rest) = rest {
                    self.assign(host, rest, op, Value::list(items[names.len()..].to_vec()))?;
                }
                Ok(())
            }
        }
    }

    /// The value `target op= value` stores.
    fn compound(&self, op: AssignOp, current: Value, value: Value) -> Result<Value> {
        let binary_op = match op {
            AssignOp::Set => return Ok(value),
            AssignOp::Add => {
                if let (Value::List(list), Value::List(more)) = (&current, &value) {
                    let items = more.items();
                    list.with_mut(|v| v.extend(items));
                    return Ok(current);
                }
                BinaryOp::Add
            }
            AssignOp::Sub => BinaryOp::Sub,
            AssignOp::Mul => BinaryOp::Mul,
            AssignOp::Div => BinaryOp::Div,
            AssignOp::Mod => BinaryOp::Mod,
            AssignOp::Concat => BinaryOp::Concat,
        };
        binary(binary_op, &current, &value)
    }

    fn assign(&mut self, host: &mut dyn ScriptHost, target: &Expr, op: AssignOp, value: Value) -> Result<()> {
        match target {
            Expr::Name(name) => {
                let value = if op == AssignOp::Set {
                    value
                } else {
                    let current = self.lookup(host, name)?;
                    self.compound(op, current, value)?
                };
                self.set_var(host, name, value)
            }
            Expr::Option(name) => {
                let name = strip_option_scope(name);
                let current = host.state().options.get(name)?.clone();
                let value = self.compound(op, option_to_value(&current), value)?;
                let value = match current {
                    OptionValue::Bool(_) => OptionValue::Bool(value.to_number()? != 0),
                    OptionValue::Number(_) => OptionValue::Number(value.to_number()?),
                    OptionValue::String(_) => OptionValue::String(value.to_str()?),
                };
                debug!(option = name, %value, "let option");
                host.state().options.set(name, value)?;
                Ok(())
            }
            Expr::Register(name) => {
                let mut text = register_text(&value)?;
                match op {
                    AssignOp::Set => {}
                    AssignOp::Concat => {
                        let current = host.state().read_register(*name)?.map(|r| r.text).unwrap_or_default();
                        text.insert_str(0, &current);
                    }
                    _ => return Err(ScriptErrorKind::WrongVariableType(format!("@{name}")).into()),
                }
                let kind = if text.ends_with('\n') {
                    RegisterType::LineWise
                } else {
                    RegisterType::CharWise
                };
                let target = if *name == '"' { None } else { Some(*name) };
                host.state()
                    .write_register(target, Register::new(text, kind), WriteKind::Set)?;
                Ok(())
            }
            Expr::Index(base, index) => {
                let container = self.eval(host, base)?;
                let index = self.eval(host, index)?;
                match container {
                    Value::List(list) => {
                        let i = list_index(list.len(), index.to_number()?)?;
                        let value = self.compound(op, list.get(i).unwrap_or_default(), value)?;
                        list.with_mut(|items| items[i] = value);
                        Ok(())
                    }
                    Value::Dict(dict) => self.assign_member(&dict, index.to_str()?, op, value),
                    _ => Err(ScriptErrorKind::NotIndexable.into()),
                }
            }
            Expr::Dot(base, key) => match self.eval(host, base)? {
                Value::Dict(dict) => self.assign_member(&dict, key.clone(), op, value),
                _ => Err(ScriptErrorKind::DictRequired.into()),
            },
            Expr::Slice(base, from, to) => {
                let Value::List(list) = self.eval(host, base)? else {
                    return Err(ScriptErrorKind::ListRequired.into());
                };
                let Value::List(values) = value else {
                    return Err(ScriptErrorKind::ListRequired.into());
                };
                let from = self.eval_index(host, from.as_deref())?;
                let to = self.eval_index(host, to.as_deref())?;
                let (start, end) = slice_bounds(list.len(), from.unwrap_or(0), to.unwrap_or(-1));
                let values = values.items();
                if values.len() < end - start {
                    return Err(ScriptErrorKind::TooManyTargets.into());
                }
                if values.len() > end - start {
                    return Err(ScriptErrorKind::TooFewTargets.into());
                }
                list.with_mut(|items| {
                    items.splice(start..end, values);
                });
                Ok(())
            }
            other => Err(ScriptErrorKind::IllegalVariableName(format!("{other:?}")).into()),
        }
    }

    fn assign_member(&self, dict: &Dict, key: String, op: AssignOp, value: Value) -> Result<()> {
        let value = if op == AssignOp::Set {
            value
        } else {
            let current = dict
                .get(&key)
                .ok_or_else(|| ScriptError::from(ScriptErrorKind::KeyNotFound(key.clone())))?;
            self.compound(op, current, value)?
        };
        dict.insert(key, value);
        Ok(())
    }

    fn eval_index(&mut self, host: &mut dyn ScriptHost, expr: Option<&Expr>) -> Result<Option<i64>> {
        match expr {
            Some(expr) => Ok(Some(self.eval(host, expr)?.to_number()?)),
            None => Ok(None),
        }
    }

    fn set_var(&mut self, host: &mut dyn ScriptHost, name: &str, value: Value) -> Result<()> {
        if let Some(var) = name.strip_prefix('$') {
            let text = concat_text(&value)?;
            host.state().script.environment.insert(var.to_string(), text);
            return Ok(());
        }
        let (scope, key) = split_scope(name);
        if key.is_empty() {
            return Err(ScriptErrorKind::IllegalVariableName(name.to_string()).into());
        }
        trace!(name, "set variable");
        match scope {
            Some('g') => host.state().script.set_global(key, value),
            Some('s') => {
                let sid = self.current_sid();
                host.state().script.script_dict(sid).insert(key, value);
            }
            Some('l') => match self.frames.last() {
                Some(frame) => frame.locals.insert(key, value),
                None => return Err(ScriptErrorKind::IllegalVariableName(name.to_string()).into()),
            },
            Some('v') if key == "errmsg" => host.state().script.errmsg = value.to_str()?,
            Some('a' | 'v') => return Err(ScriptErrorKind::ReadOnly(name.to_string()).into()),
            Some(_) => {
                host.state().script.scoped.insert(name.to_string(), value);
            }
            None => match self.frames.last() {
                Some(frame) => frame.locals.insert(key, value),
                None => host.state().script.set_global(key, value),
            },
        }
        Ok(())
    }

    pub(super) fn lookup(&mut self, host: &mut dyn ScriptHost, name: &str) -> Result<Value> {
        self.try_lookup(host, name)?
            .ok_or_else(|| ScriptErrorKind::UndefinedVariable(name.to_string()).into())
    }

    /// A variable's value, `None` when it does not exist.
    pub(super) fn try_lookup(&mut self, host: &mut dyn ScriptHost, name: &str) -> Result<Option<Value>> {
        if let Some(var) = name.strip_prefix('$') {
            let overlay = host.state().script.environment.get(var).cloned();
            let text = overlay.or_else(|| std::env::var(var).ok()).unwrap_or_default();
            return Ok(Some(Value::String(text)));
        }
        let (scope, key) = split_scope(name);
        Ok(match scope {
            Some('g') => host.state().script.globals.get(key).cloned(),
            Some('s') => {
                let sid = self.current_sid();
                host.state().script.script_dict(sid).get(key)
            }
            Some('l') => self.frames.last().and_then(|f| f.locals.get(key)),
            Some('a') => self.frames.last().and_then(|f| {
                f.args
                    .get(key)
                    .or_else(|| f.closure.as_ref().and_then(|(_, args)| args.get(key)))
            }),
            Some('v') => self.v_var(host, key),
            Some(_) => host.state().script.scoped.get(name).cloned(),
            None => match self.frames.last() {
                Some(frame) if key == "self" && frame.self_dict.is_some() => frame.self_dict.clone().map(Value::Dict),
                Some(frame) => frame
                    .locals
                    .get(key)
                    .or_else(|| frame.closure.as_ref().and_then(|(locals, _)| locals.get(key))),
                None => host.state().script.globals.get(key).cloned(),
            },
        })
    }

    fn v_var(&self, host: &mut dyn ScriptHost, key: &str) -> Option<Value> {
        Some(match key {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "null" => Value::Null,
            "none" => Value::Null,
            "count" => Value::Number(i64::from(host.v_count())),
            "count1" => Value::Number(i64::from(host.v_count().max(1))),
            "register" => Value::String(host.v_register().to_string()),
            "val" => self.iteration.last()?.1.clone(),
            "key" => self.iteration.last()?.0.clone(),
            "exception" => Value::String(self.exception.clone().unwrap_or_default()),
            "errmsg" => Value::String(host.state().script.errmsg.clone()),
            "version" => Value::Number(900),
            "t_number" => Value::Number(0),
            "t_string" => Value::Number(1),
            "t_func" => Value::Number(2),
            "t_list" => Value::Number(3),
            "t_dict" => Value::Number(4),
            "t_float" => Value::Number(5),
            "t_bool" => Value::Number(6),
            "t_none" => Value::Number(7),
            _ => return None,
        })
    }

    fn unlet(&mut self, host: &mut dyn ScriptHost, target: &Expr, bang: bool) -> Result<()> {
        match target {
            Expr::Name(name) => {
                let (scope, key) = split_scope(name);
                let removed = match scope {
                    _ if name.starts_with('$') => host.state().script.environment.shift_remove(&name[1..]).is_some(),
                    Some('g') => host.state().script.globals.shift_remove(key).is_some(),
                    Some('s') => {
                        let sid = self.current_sid();
                        host.state().script.script_dict(sid).remove(key).is_some()
                    }
                    Some('a' | 'v') => return Err(ScriptErrorKind::ReadOnly(name.clone()).into()),
                    Some('l') | None if !self.frames.is_empty() => {
                        self.frames.last().is_some_and(|f| f.locals.remove(key).is_some())
                    }
                    Some('l') => false,
                    Some(_) => host.state().script.scoped.shift_remove(name.as_str()).is_some(),
                    None => host.state().script.globals.shift_remove(key).is_some(),
                };
                if !removed && !bang {
                    return Err(ScriptErrorKind::NoSuchVariable(name.clone()).into());
                }
                Ok(())
            }
            Expr::Index(base, index) => {
                let container = self.eval(host, base)?;
                let index = self.eval(host, index)?;
                match container {
                    Value::List(list) => {
                        let i = list_index(list.len(), index.to_number()?)?;
                        list.with_mut(|items| items.remove(i));
                        Ok(())
                    }
                    Value::Dict(dict) => {
                        let key = index.to_str()?;
                        if dict.remove(&key).is_none() && !bang {
                            return Err(ScriptErrorKind::KeyNotFound(key).into());
                        }
                        Ok(())
                    }
                    _ => Err(ScriptErrorKind::NotIndexable.into()),
                }
            }
            Expr::Dot(base, key) => match self.eval(host, base)? {
                Value::Dict(dict) => {
                    if dict.remove(key).is_none() && !bang {
                        return Err(ScriptErrorKind::KeyNotFound(key.clone()).into());
                    }
                    Ok(())
                }
                _ => Err(ScriptErrorKind::DictRequired.into()),
            },
            Expr::Slice(base, from, to) => {
                let Value::List(list) = self.eval(host, base)? else {
                    return Err(ScriptErrorKind::ListRequired.into());
                };
                let from = self.eval_index(host, from.as_deref())?;
                let to = self.eval_index(host, to.as_deref())?;
                let (start, end) = slice_bounds(list.len(), from.unwrap_or(0), to.unwrap_or(-1));
                list.with_mut(|items| {
                    items.drain(start..end);
                });
                Ok(())
            }
            other => Err(ScriptErrorKind::IllegalVariableName(format!("{other:?}")).into()),
        }
    }

    /// The table key for a function name: `s:F` and `<SID>F` become
    /// `<SNR>{sid}_F`, `g:F` becomes `F`.
    pub(super) fn function_key(&self, name: &str) -> String {
        if let Some(rest) = name.strip_prefix("s:").or_else(|| name.strip_prefix("<SID>")) {
            format!("<SNR>{}_{rest}", self.current_sid())
        } else {
            name.strip_prefix("g:").unwrap_or(name).to_string()
        }
    }

    fn define_function(&mut self, host: &mut dyn ScriptHost, def: &FunctionDef) -> Result<()> {
        let sid = self.current_sid();
        let function = |name: String| UserFunction {
            name,
            params: def.params.clone(),
            varargs: def.varargs,
            body: FunctionBody::Statements(Arc::clone(&def.body)),
            sid,
            closure: None,
        };
        if let Some((base, member)) = def.name.rsplit_once('.') {
            let Value::Dict(dict) = self.lookup(host, base)? else {
                return Err(ScriptErrorKind::DictRequired.into());
            };
            if dict.contains_key(member) && !def.bang {
                return Err(ScriptErrorKind::FunctionExists(def.name.clone()).into());
            }
            let key = host.state().script.next_anonymous().to_string();
            debug!(name = %def.name, key, "define dictionary function");
            host.state()
                .script
                .functions
                .insert(key.clone(), Arc::new(function(key.clone())));
            dict.insert(member, Value::Funcref(Funcref::new(key)));
            return Ok(());
        }
        let key = self.function_key(&def.name);
        let valid = key.starts_with("<SNR>") || key.starts_with(|c: char| c.is_ascii_uppercase()) || key.contains('#');
        if !valid {
            return Err(ScriptErrorKind::FunctionName(def.name.clone()).into());
        }
        let script = &mut host.state().script;
        if script.functions.contains_key(&key) && !def.bang {
            return Err(ScriptErrorKind::FunctionExists(def.name.clone()).into());
        }
        debug!(name = %key, "define function");
        script.functions.insert(key.clone(), Arc::new(function(key)));
        Ok(())
    }

    fn delete_function(&mut self, host: &mut dyn ScriptHost, name: &str, bang: bool) -> Result<()> {
        let removed = if let Some((base, member)) = name.rsplit_once('.') {
            match self.lookup(host, base)? {
                Value::Dict(dict) => match dict.remove(member) {
                    Some(Value::Funcref(f)) => {
                        host.state().script.functions.shift_remove(&f.name);
                        true
                    }
                    Some(_) => true,
                    None => false,
                },
                _ => return Err(ScriptErrorKind::DictRequired.into()),
            }
        } else {
            let key = self.function_key(name);
            host.state().script.functions.shift_remove(&key).is_some()
        };
        if !removed && !bang {
            return Err(ScriptErrorKind::DeleteUnknownFunction(name.to_string()).into());
        }
        Ok(())
    }

    fn make_lambda(&mut self, host: &mut dyn ScriptHost, params: &[String], body: &Expr) -> Value {
        let closure = self.frames.last().map(|frame| match &frame.closure {
            Some((outer_locals, outer_args)) => {
                let mut locals: IndexMap<String, Value> = outer_locals.entries().into_iter().collect();
                locals.extend(frame.locals.entries());
                (Dict::new(locals), outer_args.clone())
            }
            None => (frame.locals.clone(), frame.args.clone()),
        });
        let script = &mut host.state().script;
        let name = format!("<lambda>{}", script.next_anonymous());
        script.functions.insert(
            name.clone(),
            Arc::new(UserFunction {
                name: name.clone(),
                params: params.to_vec(),
                varargs: false,
                body: FunctionBody::Lambda(Arc::new(body.clone())),
                sid: self.current_sid(),
                closure,
            }),
        );
        Value::Funcref(Funcref::new(name))
    }

    fn eval_args(&mut self, host: &mut dyn ScriptHost, args: &[Expr]) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(host, arg)?);
        }
        Ok(values)
    }

    pub(super) fn eval(&mut self, host: &mut dyn ScriptHost, expr: &Expr) -> Result<Value> {
        Ok(match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Float(f) => Value::Float(*f),
            Expr::String(s) => Value::String(s.clone()),
            Expr::List(items) => Value::list(self.eval_args(host, items)?),
            Expr::Dict(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval(host, key)?.to_str()?;
                    let value = self.eval(host, value)?;
                    map.insert(key, value);
                }
                Value::dict(map)
            }
            Expr::Name(name) => self.lookup(host, name)?,
            Expr::Option(name) => option_to_value(host.state().options.get(strip_option_scope(name))?),
            Expr::Register(name) => Value::String(
                host.state()
                    .read_register(*name)?
                    .map(|r| r.text)
                    .unwrap_or_default(),
            ),
            Expr::Unary(op, operand) => unary(*op, &self.eval(host, operand)?)?,
            Expr::Binary(op, a, b) => {
                let a = self.eval(host, a)?;
                let b = self.eval(host, b)?;
                binary(*op, &a, &b)?
            }
            Expr::Compare {
                op,
                ignore_case,
                lhs,
                rhs,
            } => {
                let a = self.eval(host, lhs)?;
                let b = self.eval(host, rhs)?;
                let ic = match ignore_case {
                    Some(ic) => *ic,
                    None => host.state().options.ignorecase(),
                };
                Value::from(compare_values(*op, &a, &b, ic)?)
            }
            Expr::And(a, b) => Value::from(self.eval(host, a)?.truthy()? && self.eval(host, b)?.truthy()?),
            Expr::Or(a, b) => Value::from(self.eval(host, a)?.truthy()? || self.eval(host, b)?.truthy()?),
            Expr::Ternary(cond, then, otherwise) => {
                if self.eval(host, cond)?.truthy()? {
                    self.eval(host, then)?
                } else {
                    self.eval(host, otherwise)?
                }
            }
            Expr::Index(base, index) => {
                let base = self.eval(host, base)?;
                let index = self.eval(host, index)?;
                index_value(&base, &index)?
            }
            Expr::Slice(base, from, to) => {
                let base = self.eval(host, base)?;
                let from = self.eval_index(host, from.as_deref())?;
                let to = self.eval_index(host, to.as_deref())?;
                slice_value(&base, from, to)?
            }
            Expr::Dot(base, key) => match self.eval(host, base)? {
                Value::Dict(dict) => dict
                    .get(key)
                    .ok_or_else(|| ScriptError::from(ScriptErrorKind::KeyNotFound(key.clone())))?,
                other => {
                    let rhs = self.lookup(host, key)?;
                    binary(BinaryOp::Concat, &other, &rhs)?
                }
            },
            Expr::Call(callee, args) => self.eval_call(host, callee, args)?,
            Expr::Method { base, name, args } => {
                let mut values = vec![self.eval(host, base)?];
                values.extend(self.eval_args(host, args)?);
                match name.as_ref() {
                    Expr::Name(name) => self.call_name(host, name, values, None)?,
                    other => {
                        let function = self.eval(host, other)?;
                        self.call_value(host, &function, values, None)?
                    }
                }
            }
            Expr::Lambda(params, body) => self.make_lambda(host, params, body),
        })
    }

    fn eval_call(&mut self, host: &mut dyn ScriptHost, callee: &Expr, args: &[Expr]) -> Result<Value> {
        let (function, self_dict) = match callee {
            Expr::Name(name) => {
                let values = self.eval_args(host, args)?;
                if let Some(Value::Funcref(f)) = self.try_lookup(host, name)? {
                    return self.call_funcref(host, &f, values, None);
                }
                return self.call_name(host, name, values, None);
            }
            Expr::Dot(base, key) => match self.eval(host, base)? {
                Value::Dict(dict) => {
                    let member = dict
                        .get(key)
                        .ok_or_else(|| ScriptError::from(ScriptErrorKind::KeyNotFound(key.clone())))?;
                    (member, Some(dict))
                }
                other => {
                    let rhs = self.lookup(host, key)?;
                    (binary(BinaryOp::Concat, &other, &rhs)?, None)
                }
            },
            Expr::Index(base, index) => {
                let base = self.eval(host, base)?;
                let index = self.eval(host, index)?;
                let member = index_value(&base, &index)?;
                let dict = match base {
                    Value::Dict(dict) => Some(dict),
                    _ => None,
                };
                (member, dict)
            }
            other => (self.eval(host, other)?, None),
        };
        let values = self.eval_args(host, args)?;
        self.call_value(host, &function, values, self_dict)
    }

    /// Calls a Funcref, or a function named by a String.
    pub(super) fn call_value(
        &mut self,
        host: &mut dyn ScriptHost,
        function: &Value,
        args: Vec<Value>,
        self_dict: Option<Dict>,
    ) -> Result<Value> {
        match function {
            Value::Funcref(f) => self.call_funcref(host, f, args, self_dict),
            Value::String(name) => self.call_name(host, name, args, self_dict),
            other => Err(ScriptErrorKind::NoSuchFunction(other.display()).into()),
        }
    }

    fn call_funcref(
        &mut self,
        host: &mut dyn ScriptHost,
        f: &Funcref,
        args: Vec<Value>,
        self_dict: Option<Dict>,
    ) -> Result<Value> {
        let mut all = f.args.clone();
        all.extend(args);
        let self_dict = self_dict.or_else(|| f.dict.clone());
        self.call_name(host, &f.name, all, self_dict)
    }

    /// Calls a user function or builtin by name.
    pub(super) fn call_name(
        &mut self,
        host: &mut dyn ScriptHost,
        name: &str,
        args: Vec<Value>,
        self_dict: Option<Dict>,
    ) -> Result<Value> {
        let key = self.function_key(name);
        let user = host.state().script.functions.get(&key).cloned();
        if let Some(function) = user {
            return self.call_user(host, &function, args, self_dict);
        }
        if !name.contains([':', '<', '#']) && builtins::exists(name) {
            return builtins::call(self, host, name, args);
        }
        Err(ScriptErrorKind::UnknownFunction(name.to_string()).into())
    }

    /// True when `name` is a user function or a builtin.
    pub(super) fn function_exists(&self, host: &mut dyn ScriptHost, name: &str) -> bool {
        let key = self.function_key(name);
        host.state().script.functions.contains_key(&key) || (!name.contains([':', '<', '#']) && builtins::exists(name))
    }

    fn call_user(
        &mut self,
        host: &mut dyn ScriptHost,
        function: &UserFunction,
        args: Vec<Value>,
        self_dict: Option<Dict>,
    ) -> Result<Value> {
        let max = host.state().options.maxfuncdepth();
        if self.frames.len() >= max {
            warn!(depth = self.frames.len(), function = %function.name, "maxfuncdepth exceeded");
            return Err(ScriptErrorKind::FunctionDepth.into());
        }
        let too_few = args.len() < function.params.len();
        let too_many = args.len() > function.params.len() && !function.varargs;
        if too_few {
            return Err(ScriptErrorKind::NotEnoughArguments(function.name.clone()).into());
        }
        if too_many {
            return Err(ScriptErrorKind::TooManyArguments(function.name.clone()).into());
        }
        let locals = Dict::default();
        let arg_dict = Dict::default();
        let mut args = args.into_iter();
        match &function.body {
            FunctionBody::Lambda(_) => {
                for param in &function.params {
                    locals.insert(param.clone(), args.next().unwrap_or_default());
                }
            }
            FunctionBody::Statements(_) => {
                for param in &function.params {
                    arg_dict.insert(param.clone(), args.next().unwrap_or_default());
                }
                let extra: Vec<Value> = args.collect();
                arg_dict.insert("0", Value::Number(extra.len() as i64));
                for (i, value) in extra.iter().enumerate() {
                    arg_dict.insert((i + 1).to_string(), value.clone());
                }
                arg_dict.insert("000", Value::list(extra));
            }
        }
        trace!(function = %function.name, depth = self.frames.len(), "call");
        self.frames.push(Frame {
            locals,
            args: arg_dict,
            self_dict,
            closure: function.closure.clone(),
            sid: function.sid,
        });
        let result = match &function.body {
            FunctionBody::Lambda(body) => self.eval(host, body),
            FunctionBody::Statements(body) => self.exec_block(host, body).map(|flow| match flow {
                Flow::Return(value) => value,
                _ => Value::Number(0),
            }),
        };
        self.frames.pop();
        result
    }
}
