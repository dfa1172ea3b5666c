//! Vimscript values and Vim's coercion rules.

use std::cmp::Ordering;
use std::fmt::Write as _;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::error::{Result, ScriptErrorKind};

/// A list shared by reference, as in Vim: `let b = a` aliases.
#[derive(Debug, Clone, Default)]
pub struct List(Arc<RwLock<Vec<Value>>>);

/// An insertion-ordered dictionary shared by reference.
#[derive(Debug, Clone, Default)]
pub struct Dict(Arc<RwLock<IndexMap<String, Value>>>);

impl List {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// A snapshot of the items.
    pub fn items(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    pub fn push(&self, value: Value) {
        self.0.write().push(value);
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        f(&mut self.0.write())
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Dict {
    pub fn new(entries: IndexMap<String, Value>) -> Self {
        Self(Arc::new(RwLock::new(entries)))
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.0.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.write().shift_remove(key)
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut IndexMap<String, Value>) -> R) -> R {
        f(&mut self.0.write())
    }

    pub fn ptr_eq(&self, other: &Dict) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A reference to a user or builtin function, optionally partially applied.
#[derive(Debug, Clone)]
pub struct Funcref {
    pub name: String,
    pub args: Vec<Value>,
    /// Bound as `self` when the function is called.
    pub dict: Option<Dict>,
}

impl Funcref {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            dict: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Number(i64),
    Float(f64),
    String(String),
    List(List),
    Dict(Dict),
    Funcref(Funcref),
    Bool(bool),
    Null,
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(i64::from(b))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(List::new(items))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equals(self, other, false).unwrap_or(false)
    }
}

/// The leading integer of `text`, honouring `0x`, `0b` and leading-zero
/// octal prefixes. `"12abc"` is 12 and `"abc"` is 0.
pub fn str_to_number(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let lower = digits.get(..2).map(str::to_ascii_lowercase);
    let (radix, body) = match lower.as_deref() {
        Some("0x") if digits[2..].starts_with(|c: char| c.is_ascii_hexdigit()) => (16, &digits[2..]),
        Some("0b") if digits[2..].starts_with(['0', '1']) => (2, &digits[2..]),
        Some("0o") if digits[2..].starts_with(|c: char| ('0'..='7').contains(&c)) => (8, &digits[2..]),
        _ if digits.starts_with('0') && digits[1..].starts_with(|c: char| c.is_ascii_digit()) => {
            let run: &str = &digits[1..];
            let end = run.find(|c: char| !c.is_ascii_digit()).unwrap_or(run.len());
            if run[..end].chars().all(|c| ('0'..='7').contains(&c)) {
                (8, run)
            } else {
                (10, digits)
            }
        }
        _ => (10, digits),
    };
    let end = body.find(|c: char| !c.is_digit(radix)).unwrap_or(body.len());
    let magnitude = i64::from_str_radix(&body[..end], radix).unwrap_or(if end == 0 { 0 } else { i64::MAX });
    if negative { -magnitude } else { magnitude }
}

/// Formats a Float the way `:echo` does: integral values keep a `.0`.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.1}")
    } else if f.abs() >= 1e15 || f.abs() < 1e-4 {
        let text = format!("{f:e}");
        match text.split_once('e') {
            Some((mantissa, exp)) if !mantissa.contains('.') => format!("{mantissa}.0e{exp}"),
            _ => text,
        }
    } else {
        format!("{f}")
    }
}

/// Escapes `text` as a single-quoted Vim string.
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

const MAX_REPR_DEPTH: usize = 100;

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(List::new(items))
    }

    pub fn dict(entries: IndexMap<String, Value>) -> Self {
        Value::Dict(Dict::new(entries))
    }

    /// The number `type()` returns.
    pub fn type_code(&self) -> i64 {
        match self {
            Value::Number(_) => 0,
            Value::String(_) => 1,
            Value::Funcref(_) => 2,
            Value::List(_) => 3,
            Value::Dict(_) => 4,
            Value::Float(_) => 5,
            Value::Bool(_) => 6,
            Value::Null => 7,
        }
    }

    pub fn to_number(&self) -> Result<i64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::String(s) => Ok(str_to_number(s)),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Null => Ok(0),
            Value::Float(_) => Err(ScriptErrorKind::FloatAsNumber.into()),
            Value::List(_) => Err(ScriptErrorKind::ListAsNumber.into()),
            Value::Dict(_) => Err(ScriptErrorKind::DictAsNumber.into()),
            Value::Funcref(_) => Err(ScriptErrorKind::FuncrefAsNumber.into()),
        }
    }

    /// Float arithmetic operand: Numbers and Strings widen, Floats pass.
    pub fn to_float(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            other => Ok(other.to_number()? as f64),
        }
    }

    pub fn to_str(&self) -> Result<String> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok("null".to_string()),
            Value::Float(_) => Err(ScriptErrorKind::FloatAsString.into()),
            Value::List(_) => Err(ScriptErrorKind::ListAsString.into()),
            Value::Dict(_) => Err(ScriptErrorKind::DictAsString.into()),
            Value::Funcref(_) => Err(ScriptErrorKind::FuncrefAsString.into()),
        }
    }

    pub fn truthy(&self) -> Result<bool> {
        match self {
            Value::Float(f) => Ok(*f != 0.0),
            other => Ok(other.to_number()? != 0),
        }
    }

    /// How `:echo` shows the value: strings raw, everything else as
    /// `string()` would.
    pub fn display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// `string()`.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out, 0);
        out
    }

    fn write_repr(&self, out: &mut String, depth: usize) {
        match self {
            Value::Number(n) => {
                let _ = write!(out, "{n}");
            }
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::String(s) => out.push_str(&quote(s)),
            Value::Bool(b) => {
                let _ = write!(out, "v:{b}");
            }
            Value::Null => out.push_str("v:null"),
            Value::Funcref(f) => {
                let _ = write!(out, "function({})", quote(&f.name));
            }
            Value::List(_) | Value::Dict(_) if depth >= MAX_REPR_DEPTH => {
                out.push_str(if matches!(self, Value::List(_)) { "[...]" } else { "{...}" });
            }
            Value::List(list) => {
                out.push('[');
                for (i, item) in list.items().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, depth + 1);
                }
                out.push(']');
            }
            Value::Dict(dict) => {
                out.push('{');
                for (i, (key, item)) in dict.entries().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&quote(key));
                    out.push_str(": ");
                    item.write_repr(out, depth + 1);
                }
                out.push('}');
            }
        }
    }

    /// `copy()`: a new top-level container sharing the items.
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::List(list) => Value::list(list.items()),
            Value::Dict(dict) => Value::dict(dict.entries().into_iter().collect()),
            other => other.clone(),
        }
    }

    /// `deepcopy()`.
    pub fn deep_copy(&self) -> Value {
        self.deep_copy_at(0)
    }

    fn deep_copy_at(&self, depth: usize) -> Value {
        if depth >= MAX_REPR_DEPTH {
            return self.clone();
        }
        match self {
            Value::List(list) => Value::list(list.items().iter().map(|v| v.deep_copy_at(depth + 1)).collect()),
            Value::Dict(dict) => Value::dict(
                dict.entries()
                    .into_iter()
                    .map(|(k, v)| (k, v.deep_copy_at(depth + 1)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// `empty()`.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Value::Number(n) => *n == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::List(list) => list.is_empty(),
            Value::Dict(dict) => dict.is_empty(),
            Value::Funcref(_) => false,
            Value::Bool(b) => !b,
            Value::Null => true,
        }
    }
}

/// `==` with Vim's rules. `ic` compares strings ignoring case.
pub fn equals(a: &Value, b: &Value, ic: bool) -> Result<bool> {
    match (a, b) {
        (Value::List(x), Value::List(y)) => {
            if x.ptr_eq(y) {
                return Ok(true);
            }
            let (xs, ys) = (x.items(), y.items());
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (p, q) in xs.iter().zip(&ys) {
                if !same_type_equals(p, q, ic)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::List(_), _) | (_, Value::List(_)) => Err(ScriptErrorKind::CompareList.into()),
        (Value::Dict(x), Value::Dict(y)) => {
            if x.ptr_eq(y) {
                return Ok(true);
            }
            let (xs, ys) = (x.entries(), y.entries());
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (key, value) in &xs {
                match y.get(key) {
                    Some(other) if same_type_equals(value, &other, ic)? => {}
                    _ => return Ok(false),
                }
            }
            Ok(true)
        }
        (Value::Dict(_), _) | (_, Value::Dict(_)) => Err(ScriptErrorKind::CompareDict.into()),
        (Value::Funcref(x), Value::Funcref(y)) => Ok(x.name == y.name),
        (Value::Funcref(_), _) | (_, Value::Funcref(_)) => Err(ScriptErrorKind::FuncrefOperation.into()),
        _ => Ok(compare(a, b, ic)? == Ordering::Equal),
    }
}

/// Inside containers a String never equals a Number.
fn same_type_equals(a: &Value, b: &Value, ic: bool) -> Result<bool> {
    match (a, b) {
        (Value::String(_), Value::Number(_) | Value::Float(_))
        | (Value::Number(_) | Value::Float(_), Value::String(_)) => Ok(false),
        _ => equals(a, b, ic),
    }
}

/// Ordering for `<` `>` and friends. A String against a Number compares
/// numerically.
pub fn compare(a: &Value, b: &Value, ic: bool) -> Result<Ordering> {
    match (a, b) {
        (Value::List(_), _) | (_, Value::List(_)) => Err(ScriptErrorKind::CompareList.into()),
        (Value::Dict(_), _) | (_, Value::Dict(_)) => Err(ScriptErrorKind::CompareDict.into()),
        (Value::Funcref(_), _) | (_, Value::Funcref(_)) => Err(ScriptErrorKind::FuncrefOperation.into()),
        (Value::String(x), Value::String(y)) => Ok(if ic {
            x.to_lowercase().cmp(&y.to_lowercase())
        } else {
            x.cmp(y)
        }),
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            let (x, y) = (a.to_float()?, b.to_float()?);
            Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal))
        }
        _ => Ok(a.to_number()?.cmp(&b.to_number()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_convert_through_their_leading_integer() {
        assert_eq!(str_to_number("12abc"), 12);
        assert_eq!(str_to_number("abc"), 0);
        assert_eq!(str_to_number("-7"), -7);
        assert_eq!(str_to_number("0x1F"), 31);
        assert_eq!(str_to_number("017"), 15);
        assert_eq!(str_to_number("019"), 19);
        assert_eq!(str_to_number("0b101"), 5);
    }

    #[test]
    fn containers_never_coerce() {
        let list = Value::list(vec![]);
        let err = list.to_number().unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::ListAsNumber);
        let dict = Value::dict(IndexMap::new());
        assert_eq!(dict.to_number().unwrap_err().kind, ScriptErrorKind::DictAsNumber);
        assert_eq!(list.to_str().unwrap_err().kind, ScriptErrorKind::ListAsString);
        let func = Value::Funcref(Funcref::new("F"));
        assert_eq!(func.to_number().unwrap_err().kind, ScriptErrorKind::FuncrefAsNumber);
    }

    #[test]
    fn string_against_number_compares_numerically() {
        let a = Value::from("10");
        let b = Value::Number(9);
        assert_eq!(compare(&a, &b, false).unwrap(), Ordering::Greater);
        assert!(equals(&Value::from("3"), &Value::Number(3), false).unwrap());
    }

    #[test]
    fn list_against_other_types_is_an_error() {
        let list = Value::list(vec![Value::Number(1)]);
        let err = equals(&list, &Value::Number(1), false).unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::CompareList);
        let dict = Value::dict(IndexMap::new());
        let err = equals(&dict, &Value::from("x"), false).unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::CompareDict);
    }

    #[test]
    fn lists_alias_on_clone() {
        let a = List::new(vec![Value::Number(1)]);
        let b = a.clone();
        b.push(Value::Number(2));
        assert_eq!(a.len(), 2);
        let copy = Value::List(a.clone()).deep_copy();
        if let Value::List(c) = copy {
            c.push(Value::Number(3));
            assert_eq!(a.len(), 2);
        }
    }

    #[test]
    fn repr_matches_vim() {
        let mut entries = IndexMap::new();
        entries.insert("a".to_string(), Value::from("it's"));
        entries.insert("b".to_string(), Value::list(vec![Value::Number(1), Value::Float(2.0)]));
        assert_eq!(Value::dict(entries).repr(), "{'a': 'it''s', 'b': [1, 2.0]}");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(Value::Bool(true).repr(), "v:true");
    }
}
