//! Builtin functions.

use std::cmp::Ordering;

use indexmap::IndexMap;
use tracing::trace;

use super::ast::Expr;
use super::error::{Result, ScriptError, ScriptErrorKind};
use super::ex::{self, Replacement, leader};
use super::expr::parse_expression;
use super::interp::{Interpreter, concat_text, list_index, register_text};
use super::parser;
use super::value::{Dict, Funcref, List, Value, equals, str_to_number};
use super::ScriptHost;
use crate::key::{keys_to_notation, parse_keys_with_leader, text_to_keys};
use crate::mapping::MapModes;
use crate::options::Options;
use crate::register::{Register, RegisterType, WriteKind};
use crate::search::Pattern;
use crate::types::Range;

/// Name, minimum and maximum argument count.
const BUILTINS: &[(&str, usize, usize)] = &[
    ("abs", 1, 1),
    ("add", 2, 2),
    ("call", 2, 3),
    ("char2nr", 1, 2),
    ("col", 1, 1),
    ("copy", 1, 1),
    ("count", 2, 3),
    ("deepcopy", 1, 2),
    ("empty", 1, 1),
    ("escape", 2, 2),
    ("eval", 1, 1),
    ("execute", 1, 2),
    ("exists", 1, 1),
    ("extend", 2, 3),
    ("feedkeys", 1, 2),
    ("filter", 2, 2),
    ("function", 1, 3),
    ("get", 2, 3),
    ("getline", 1, 2),
    ("getreg", 0, 3),
    ("getregtype", 0, 1),
    ("has", 1, 1),
    ("has_key", 2, 2),
    ("index", 2, 4),
    ("insert", 2, 3),
    ("items", 1, 1),
    ("join", 1, 2),
    ("keys", 1, 1),
    ("len", 1, 1),
    ("line", 1, 1),
    ("map", 2, 2),
    ("maparg", 1, 4),
    ("mapcheck", 1, 2),
    ("match", 2, 3),
    ("matchstr", 2, 3),
    ("max", 1, 1),
    ("min", 1, 1),
    ("mode", 0, 1),
    ("nr2char", 1, 2),
    ("printf", 1, 20),
    ("range", 1, 3),
    ("remove", 2, 3),
    ("repeat", 2, 2),
    ("reverse", 1, 1),
    ("setline", 2, 2),
    ("setreg", 2, 3),
    ("sort", 1, 3),
    ("split", 1, 3),
    ("str2float", 1, 1),
    ("str2nr", 1, 2),
    ("strchars", 1, 2),
    ("string", 1, 1),
    ("strlen", 1, 1),
    ("submatch", 1, 2),
    ("substitute", 4, 4),
    ("tolower", 1, 1),
    ("toupper", 1, 1),
    ("tr", 3, 3),
    ("trim", 1, 3),
    ("type", 1, 1),
    ("uniq", 1, 3),
    ("values", 1, 1),
];

const FEATURES: &[&str] = &["eval", "float", "lambda", "multi_byte", "syntax", "vim_starting"];

pub(super) fn exists(name: &str) -> bool {
    BUILTINS.iter().any(|(n, ..)| *n == name)
}

fn list_arg(value: &Value) -> Result<&List> {
    match value {
        Value::List(list) => Ok(list),
        _ => Err(ScriptErrorKind::ListRequired.into()),
    }
}

fn dict_arg(value: &Value) -> Result<&Dict> {
    match value {
        Value::Dict(dict) => Ok(dict),
        _ => Err(ScriptErrorKind::DictRequired.into()),
    }
}

fn opt_number(args: &[Value], i: usize, default: i64) -> Result<i64> {
    args.get(i).map_or(Ok(default), Value::to_number)
}

fn opt_str(args: &[Value], i: usize) -> Result<String> {
    args.get(i).map_or(Ok(String::new()), Value::to_str)
}

fn opt_bool(args: &[Value], i: usize) -> Result<bool> {
    args.get(i).map_or(Ok(false), Value::truthy)
}

pub(super) fn call(interp: &mut Interpreter, host: &mut dyn ScriptHost, name: &str, args: Vec<Value>) -> Result<Value> {
    let Some(&(_, min, max)) = BUILTINS.iter().find(|(n, ..)| *n == name) else {
        return Err(ScriptErrorKind::UnknownFunction(name.to_string()).into());
    };
    if args.len() < min {
        return Err(ScriptErrorKind::NotEnoughArguments(name.to_string()).into());
    }
    if args.len() > max {
        return Err(ScriptErrorKind::TooManyArguments(name.to_string()).into());
    }
    trace!(name, args = args.len(), "builtin");
    let a = &args;
    Ok(match name {
        // Lists and dictionaries
        "len" => {
            let len = match &a[0] {
                Value::List(list) => list.len(),
                Value::Dict(dict) => dict.len(),
                other => other.to_str()?.len(),
            };
            Value::Number(len as i64)
        }
        "empty" => Value::from(a[0].is_empty_value()),
        "add" => {
            list_arg(&a[0])?.push(a[1].clone());
            a[0].clone()
        }
        "insert" => {
            let list = list_arg(&a[0])?;
            let len = list.len() as i64;
            let index = opt_number(a, 2, 0)?;
            let pos = if index < 0 { len + index } else { index };
            if !(0..=len).contains(&pos) {
                return Err(ScriptErrorKind::IndexOutOfRange(index).into());
            }
            let item = a[1].clone();
            list.with_mut(|items| items.insert(pos as usize, item));
            a[0].clone()
        }
        "remove" => remove(a)?,
        "extend" => extend(a)?,
        "copy" => a[0].shallow_copy(),
        "deepcopy" => a[0].deep_copy(),
        "get" => get(a)?,
        "has_key" => Value::from(dict_arg(&a[0])?.contains_key(&a[1].to_str()?)),
        "keys" => Value::list(dict_arg(&a[0])?.entries().into_iter().map(|(k, _)| Value::String(k)).collect()),
        "values" => Value::list(dict_arg(&a[0])?.entries().into_iter().map(|(_, v)| v).collect()),
        "items" => Value::list(
            dict_arg(&a[0])?
                .entries()
                .into_iter()
                .map(|(k, v)| Value::list(vec![Value::String(k), v]))
                .collect(),
        ),
        "index" => {
            let items = list_arg(&a[0])?.items();
            let start = list_start(items.len(), opt_number(a, 2, 0)?);
            let ic = opt_bool(a, 3)?;
            let mut found = -1;
            for (i, item) in items.iter().enumerate().skip(start) {
                if item.type_code() == a[1].type_code() && equals(item, &a[1], ic)? {
                    found = i as i64;
                    break;
                }
            }
            Value::Number(found)
        }
        "count" => Value::Number(count(a)?),
        "reverse" => match &a[0] {
            Value::List(list) => {
                list.with_mut(|items| items.reverse());
                a[0].clone()
            }
            other => Value::String(other.to_str()?.chars().rev().collect()),
        },
        "sort" => {
            let list = list_arg(&a[0])?;
            let kind = SortKind::from_arg(a.get(1))?;
            let sorted = sort_values(list.items(), &mut |x, y| kind.compare(interp, host, x, y))?;
            list.with_mut(|items| *items = sorted);
            a[0].clone()
        }
        "uniq" => {
            let list = list_arg(&a[0])?;
            let kind = SortKind::from_arg(a.get(1))?;
            let mut kept: Vec<Value> = Vec::new();
            for item in list.items() {
                let duplicate = match kept.last() {
                    Some(last) => kind.compare(interp, host, last, &item)? == Ordering::Equal,
                    None => false,
                };
                if !duplicate {
                    kept.push(item);
                }
            }
            list.with_mut(|items| *items = kept);
            a[0].clone()
        }
        "join" => {
            let separator = match a.get(1) {
                Some(sep) => sep.to_str()?,
                None => " ".to_string(),
            };
            let parts: Vec<String> = list_arg(&a[0])?.items().iter().map(Value::display).collect();
            Value::String(parts.join(&separator))
        }
        "split" => {
            let pattern = a.get(1).map(Value::to_str).transpose()?;
            Value::list(split(&a[0].to_str()?, pattern.as_deref(), opt_bool(a, 2)?)?)
        }
        "range" => range(a)?,
        "repeat" => {
            let times = a[1].to_number()?.max(0) as usize;
            match &a[0] {
                Value::List(list) => {
                    let items = list.items();
                    Value::list(items.iter().cycle().take(items.len() * times).cloned().collect())
                }
                other => Value::String(concat_text(other)?.repeat(times)),
            }
        }
        "min" | "max" => {
            let values = match &a[0] {
                Value::List(list) => list.items(),
                Value::Dict(dict) => dict.entries().into_iter().map(|(_, v)| v).collect(),
                _ => return Err(ScriptErrorKind::ListOrDictRequired(format!("{name}()")).into()),
            };
            let mut numbers = Vec::with_capacity(values.len());
            for value in &values {
                numbers.push(value.to_number()?);
            }
            let result = if name == "min" { numbers.into_iter().min() } else { numbers.into_iter().max() };
            Value::Number(result.unwrap_or(0))
        }
        "map" | "filter" => map_items(interp, host, &a[0], &a[1], name == "filter")?,

        // Strings
        "strlen" => Value::Number(a[0].to_str()?.len() as i64),
        "strchars" => Value::Number(a[0].to_str()?.chars().count() as i64),
        "toupper" => Value::String(a[0].to_str()?.to_uppercase()),
        "tolower" => Value::String(a[0].to_str()?.to_lowercase()),
        "trim" => Value::String(trim(&a[0].to_str()?, a.get(1), opt_number(a, 2, 0)?)?),
        "string" => Value::String(a[0].repr()),
        "str2nr" => Value::Number(str2nr(&a[0].to_str()?, opt_number(a, 1, 10)?)?),
        "str2float" => Value::Float(str2float(&a[0].to_str()?)),
        "printf" => Value::String(printf(&a[0].to_str()?, &a[1..])?),
        "tr" => Value::String(tr(&a[0].to_str()?, &a[1].to_str()?, &a[2].to_str()?)?),
        "escape" => {
            let special = a[1].to_str()?;
            let mut out = String::new();
            for c in a[0].to_str()?.chars() {
                if special.contains(c) {
                    out.push('\\');
                }
                out.push(c);
            }
            Value::String(out)
        }
        "nr2char" => {
            let code = u32::try_from(a[0].to_number()?).unwrap_or(0);
            Value::String(char::from_u32(code).map(String::from).unwrap_or_default())
        }
        "char2nr" => Value::Number(a[0].to_str()?.chars().next().map_or(0, |c| i64::from(u32::from(c)))),
        "substitute" => {
            let text = a[0].to_str()?;
            let ic = host.state().options.ignorecase();
            let pattern = Pattern::new(&a[1].to_str()?, ic, false, None)?;
            let replacement = Replacement::parse(&a[2].to_str()?)?;
            let global = a[3].to_str()?.contains('g');
            let (result, _) = ex::replace_matches(interp, host, &text, &pattern, &replacement, global)?;
            Value::String(result)
        }
        "match" | "matchstr" => match_pattern(host, a, name == "matchstr")?,
        "submatch" => {
            let n = a[0].to_number()?.max(0) as usize;
            let group = interp.submatch.as_ref().map(|subs| subs.group(n).to_string());
            Value::String(group.unwrap_or_default())
        }

        // Values and types
        "abs" => match &a[0] {
            Value::Float(f) => Value::Float(f.abs()),
            other => Value::Number(other.to_number()?.wrapping_abs()),
        },
        "type" => Value::Number(a[0].type_code()),
        "exists" => Value::Number(exists_expr(interp, host, &a[0].to_str()?)),
        "has" => {
            let feature = a[0].to_str()?;
            let supported = FEATURES.contains(&feature.as_str())
                || (feature == "clipboard" && cfg!(feature = "clipboard"))
                || (feature == "unix" && cfg!(unix))
                || (feature == "win32" && cfg!(windows));
            Value::from(supported)
        }
        "function" => function(interp, host, a)?,
        "call" => {
            let call_args = list_arg(&a[1])?.items();
            let dict = a.get(2).map(dict_arg).transpose()?.cloned();
            interp.call_value(host, &a[0], call_args, dict)?
        }
        "eval" => interp.eval_source(host, &a[0].to_str()?)?,
        "execute" => {
            let commands = match &a[0] {
                Value::List(list) => list.items().iter().map(Value::to_str).collect::<Result<Vec<_>>>()?,
                other => vec![other.to_str()?],
            };
            let saved = interp.capture.replace(String::new());
            let mut result = Ok(());
            for command in &commands {
                result = interp.execute_source(host, command);
                if result.is_err() {
                    break;
                }
            }
            let output = std::mem::replace(&mut interp.capture, saved).unwrap_or_default();
            result?;
            Value::String(output)
        }

        // Engine state
        "mode" => Value::String(host.mode().code().to_string()),
        "line" => Value::Number(line_number(host, &a[0].to_str()?)),
        "col" => {
            let editor = host.editor();
            let pos = editor.position(editor.caret());
            Value::Number(match a[0].to_str()?.as_str() {
                "." => pos.col as i64 + 1,
                "$" => editor.line_len(pos.line) as i64 + 1,
                _ => 0,
            })
        }
        "getline" => getline(host, a)?,
        "setline" => setline(host, a)?,
        "getreg" => {
            let name = register_name(a.first())?;
            let reg = host.state().read_register(name)?;
            let text = reg.map(|r| r.text).unwrap_or_default();
            if opt_bool(a, 2)? {
                let mut lines: Vec<Value> = text.split('\n').map(Value::from).collect();
                if text.ends_with('\n') {
                    lines.pop();
                }
                Value::list(lines)
            } else {
                Value::String(text)
            }
        }
        "getregtype" => {
            let name = register_name(a.first())?;
            let reg = host.state().read_register(name)?;
            Value::String(reg.map(|r| r.kind.code()).unwrap_or_default())
        }
        "setreg" => setreg(host, a)?,
        "feedkeys" => {
            let keys = text_to_keys(&a[0].to_str()?);
            let flags = opt_str(a, 1)?;
            trace!(keys = %keys_to_notation(&keys), flags, "feedkeys");
            host.feed_keys(keys, !flags.contains('n'), flags.contains('x'))?;
            Value::Number(0)
        }
        "maparg" | "mapcheck" => maparg(host, a, name == "mapcheck")?,
        _ => return Err(ScriptErrorKind::UnknownFunction(name.to_string()).into()),
    })
}

fn list_start(len: usize, start: i64) -> usize {
    if start < 0 {
        (len as i64 + start).max(0) as usize
    } else {
        start as usize
    }
}

fn remove(a: &[Value]) -> Result<Value> {
    match &a[0] {
        Value::List(list) => {
            let first = list_index(list.len(), a[1].to_number()?)?;
            match a.get(2) {
                Some(end) => {
                    let last = list_index(list.len(), end.to_number()?)?;
                    if last < first {
                        return Err(ScriptErrorKind::InvalidArgument(format!("{} > {}", first, last)).into());
                    }
                    Ok(Value::list(list.with_mut(|items| items.drain(first..=last).collect())))
                }
                None => Ok(list.with_mut(|items| items.remove(first))),
            }
        }
        Value::Dict(dict) => {
            let key = a[1].to_str()?;
            dict.remove(&key)
                .ok_or_else(|| ScriptErrorKind::KeyNotFound(key).into())
        }
        _ => Err(ScriptErrorKind::ListOrDictRequired("remove()".to_string()).into()),
    }
}

fn extend(a: &[Value]) -> Result<Value> {
    match (&a[0], &a[1]) {
        (Value::List(list), Value::List(more)) => {
            let items = more.items();
            let len = list.len() as i64;
            let index = opt_number(a, 2, len)?;
            let pos = if index < 0 { len + index } else { index };
            if !(0..=len).contains(&pos) {
                return Err(ScriptErrorKind::IndexOutOfRange(index).into());
            }
            list.with_mut(|v| {
                v.splice(pos as usize..pos as usize, items);
            });
            Ok(a[0].clone())
        }
        (Value::Dict(dict), Value::Dict(more)) => {
            let how = match a.get(2) {
                Some(how) => how.to_str()?,
                None => "force".to_string(),
            };
            for (key, value) in more.entries() {
                if dict.contains_key(&key) {
                    match how.as_str() {
                        "keep" => continue,
                        "error" => {
                            return Err(ScriptErrorKind::InvalidArgument(format!("E737: Key already exists: {key}")).into());
                        }
                        _ => {}
                    }
                }
                dict.insert(key, value);
            }
            Ok(a[0].clone())
        }
        _ => Err(ScriptErrorKind::ListOrDictRequired("extend()".to_string()).into()),
    }
}

fn get(a: &[Value]) -> Result<Value> {
    let default = a.get(2).cloned().unwrap_or_default();
    Ok(match &a[0] {
        Value::List(list) => list_index(list.len(), a[1].to_number()?)
            .ok()
            .and_then(|i| list.get(i))
            .unwrap_or(default),
        Value::Dict(dict) => dict.get(&a[1].to_str()?).unwrap_or(default),
        Value::Funcref(f) => match a[1].to_str()?.as_str() {
            "name" => Value::String(f.name.clone()),
            "args" => Value::list(f.args.clone()),
            "dict" => f.dict.clone().map(Value::Dict).unwrap_or(default),
            _ => default,
        },
        _ => return Err(ScriptErrorKind::ListOrDictRequired("get()".to_string()).into()),
    })
}

fn count(a: &[Value]) -> Result<i64> {
    let ic = opt_bool(a, 2)?;
    let values = match &a[0] {
        Value::List(list) => list.items(),
        Value::Dict(dict) => dict.entries().into_iter().map(|(_, v)| v).collect(),
        other => {
            let (text, needle) = (other.to_str()?, a[1].to_str()?);
            if needle.is_empty() {
                return Ok(0);
            }
            let (text, needle) = if ic {
                (text.to_lowercase(), needle.to_lowercase())
            } else {
                (text, needle)
            };
            return Ok(text.matches(needle.as_str()).count() as i64);
        }
    };
    let mut n = 0;
    for value in &values {
        if value.type_code() == a[1].type_code() && equals(value, &a[1], ic)? {
            n += 1;
        }
    }
    Ok(n)
}

fn range(a: &[Value]) -> Result<Value> {
    let (start, end) = match a.get(1) {
        Some(end) => (a[0].to_number()?, end.to_number()?),
        None => (0, a[0].to_number()? - 1),
    };
    let stride = opt_number(a, 2, 1)?;
    if stride == 0 {
        return Err(ScriptErrorKind::InvalidArgument("E726: Stride is zero".to_string()).into());
    }
    let mut items = Vec::new();
    let mut n = start;
    while (stride > 0 && n <= end) || (stride < 0 && n >= end) {
        items.push(Value::Number(n));
        n += stride;
    }
    Ok(Value::list(items))
}

fn split(text: &str, pattern: Option<&str>, keep_empty: bool) -> Result<Vec<Value>> {
    let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
        return Ok(text.split_whitespace().map(Value::from).collect());
    };
    let pattern = Pattern::new(pattern, false, false, None)?;
    let mut parts = Vec::new();
    let mut push = |part: &str| {
        if keep_empty || !part.is_empty() {
            parts.push(Value::from(part));
        }
    };
    let (mut start, mut scan) = (0, 0);
    while scan <= text.len() {
        let Some((s, e)) = pattern.find_at(text, scan) else {
            break;
        };
        if s == e {
            if s >= text.len() {
                break;
            }
            if s > start {
                push(&text[start..s]);
                start = s;
            }
            scan = s + text[s..].chars().next().map_or(1, char::len_utf8);
            continue;
        }
        push(&text[start..s]);
        start = e;
        scan = e;
    }
    push(&text[start..]);
    Ok(parts)
}

fn trim(text: &str, mask: Option<&Value>, dir: i64) -> Result<String> {
    let mask = match mask {
        Some(mask) => mask.to_str()?,
        None => " \t\n\r\x0b\x0c\u{a0}".to_string(),
    };
    let is_mask = |c: char| mask.contains(c);
    Ok(match dir {
        1 => text.trim_start_matches(is_mask).to_string(),
        2 => text.trim_end_matches(is_mask).to_string(),
        _ => text.trim_matches(is_mask).to_string(),
    })
}

fn str2nr(text: &str, base: i64) -> Result<i64> {
    let radix = match base {
        2 | 8 | 10 | 16 => base as u32,
        _ => return Err(ScriptErrorKind::InvalidArgument(base.to_string()).into()),
    };
    let text = text.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let prefixes: &[&str] = match radix {
        16 => &["0x", "0X"],
        8 => &["0o", "0O"],
        2 => &["0b", "0B"],
        _ => &[],
    };
    let digits = prefixes
        .iter()
        .find_map(|p| digits.strip_prefix(p))
        .unwrap_or(digits);
    let end = digits.find(|c: char| !c.is_digit(radix)).unwrap_or(digits.len());
    let n = i64::from_str_radix(&digits[..end], radix).unwrap_or(0);
    Ok(if negative { -n } else { n })
}

fn str2float(text: &str) -> f64 {
    let text = text.trim_start();
    let len = text
        .find(|c: char| !(c.is_ascii_digit() || "+-.eE".contains(c)))
        .unwrap_or(text.len());
    (1..=len)
        .rev()
        .find_map(|n| text[..n].parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn tr(text: &str, from: &str, to: &str) -> Result<String> {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    if from.len() != to.len() {
        return Err(ScriptErrorKind::InvalidArgument(to.iter().collect()).into());
    }
    Ok(text
        .chars()
        .map(|c| from.iter().position(|f| *f == c).map_or(c, |i| to[i]))
        .collect())
}

/// C-style exponent: `1.500000e+02`.
fn exponent(value: f64, precision: usize, upper: bool) -> String {
    let formatted = format!("{value:.precision$e}");
    let (mantissa, exp) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{mantissa}{e}{sign}{:02}", exp.abs())
}

fn general(value: f64, precision: usize, upper: bool) -> String {
    let precision = precision.max(1);
    if value == 0.0 {
        return "0".to_string();
    }
    let exp = value.abs().log10().floor() as i32;
    let trim = |s: String| {
        if s.contains('.') {
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            s
        }
    };
    if exp < -4 || exp >= precision as i32 {
        let formatted = exponent(value, precision - 1, upper);
        match formatted.split_once(['e', 'E']) {
            Some((mantissa, rest)) => {
                format!("{}{}{rest}", trim(mantissa.to_string()), if upper { 'E' } else { 'e' })
            }
            None => formatted,
        }
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        trim(format!("{value:.decimals$}"))
    }
}

/// `printf()` for `%d %i %s %S %c %x %X %o %b %f %F %e %E %g %G %%`, with
/// flags, width and precision.
fn printf(format: &str, args: &[Value]) -> Result<String> {
    let mut out = String::new();
    let mut args = args.iter();
    let mut next_arg = || {
        args.next()
            .ok_or_else(|| ScriptError::from(ScriptErrorKind::NotEnoughArguments("printf()".to_string())))
    };
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut flags = String::new();
        while let Some(&f) = chars.peek()
            && "-+ 0#".contains(f)
        {
            flags.push(f);
            chars.next();
        }
        let mut width = 0usize;
        if chars.peek() == Some(&'*') {
            chars.next();
            width = next_arg()?.to_number()?.max(0) as usize;
        }
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            width = width * 10 + d as usize;
            chars.next();
        }
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut p = 0usize;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                p = p * 10 + d as usize;
                chars.next();
            }
            precision = Some(p);
        }
        let Some(conv) = chars.next() else {
            out.push('%');
            break;
        };
        let numeric = !matches!(conv, 's' | 'S' | 'c');
        let body = match conv {
            '%' => {
                out.push('%');
                continue;
            }
            'd' | 'i' => {
                let n = next_arg()?.to_number()?;
                if n >= 0 && flags.contains('+') {
                    format!("+{n}")
                } else if n >= 0 && flags.contains(' ') {
                    format!(" {n}")
                } else {
                    n.to_string()
                }
            }
            'x' => format!("{:x}", next_arg()?.to_number()?),
            'X' => format!("{:X}", next_arg()?.to_number()?),
            'o' => format!("{:o}", next_arg()?.to_number()?),
            'b' | 'B' => format!("{:b}", next_arg()?.to_number()?),
            'c' => {
                let code = u32::try_from(next_arg()?.to_number()?).unwrap_or(0);
                char::from_u32(code).map(String::from).unwrap_or_default()
            }
            's' | 'S' => {
                let text = next_arg()?.display();
                match precision {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                }
            }
            'f' | 'F' => {
                let p = precision.unwrap_or(6);
                format!("{:.p$}", next_arg()?.to_float()?)
            }
            'e' | 'E' => exponent(next_arg()?.to_float()?, precision.unwrap_or(6), conv == 'E'),
            'g' | 'G' => general(next_arg()?.to_float()?, precision.unwrap_or(6), conv == 'G'),
            other => return Err(ScriptErrorKind::InvalidArgument(format!("printf(): %{other}")).into()),
        };
        let len = body.chars().count();
        if len >= width {
            out.push_str(&body);
        } else if flags.contains('-') {
            out.push_str(&body);
            out.push_str(&" ".repeat(width - len));
        } else if flags.contains('0') && numeric {
            let (sign, digits) = match body.strip_prefix(['-', '+']) {
                Some(rest) => (&body[..1], rest),
                None => ("", body.as_str()),
            };
            out.push_str(sign);
            out.push_str(&"0".repeat(width - len));
            out.push_str(digits);
        } else {
            out.push_str(&" ".repeat(width - len));
            out.push_str(&body);
        }
    }
    if args.next().is_some() {
        return Err(ScriptErrorKind::TooManyArguments("printf()".to_string()).into());
    }
    Ok(out)
}

enum SortKind {
    Text { ignore_case: bool },
    Numeric,
    NumericText,
    Float,
    Function(Value),
}

impl SortKind {
    fn from_arg(arg: Option<&Value>) -> Result<Self> {
        Ok(match arg {
            None => SortKind::Text { ignore_case: false },
            Some(Value::String(s)) => match s.as_str() {
                "" => SortKind::Text { ignore_case: false },
                "i" | "1" => SortKind::Text { ignore_case: true },
                "n" => SortKind::Numeric,
                "N" => SortKind::NumericText,
                "f" => SortKind::Float,
                _ => SortKind::Function(Value::String(s.clone())),
            },
            Some(f @ Value::Funcref(_)) => SortKind::Function(f.clone()),
            Some(other) => SortKind::Text {
                ignore_case: other.truthy()?,
            },
        })
    }

    fn compare(&self, interp: &mut Interpreter, host: &mut dyn ScriptHost, a: &Value, b: &Value) -> Result<Ordering> {
        Ok(match self {
            SortKind::Text { ignore_case } => {
                let (x, y) = (a.display(), b.display());
                if *ignore_case {
                    x.to_lowercase().cmp(&y.to_lowercase())
                } else {
                    x.cmp(&y)
                }
            }
            SortKind::Numeric => {
                let number = |v: &Value| match v {
                    Value::Number(n) => *n as f64,
                    Value::Float(f) => *f,
                    _ => 0.0,
                };
                number(a).partial_cmp(&number(b)).unwrap_or(Ordering::Equal)
            }
            SortKind::NumericText => str_to_number(&a.display()).cmp(&str_to_number(&b.display())),
            SortKind::Float => a
                .to_float()?
                .partial_cmp(&b.to_float()?)
                .unwrap_or(Ordering::Equal),
            SortKind::Function(f) => {
                let result = interp.call_value(host, f, vec![a.clone(), b.clone()], None)?;
                result.to_number()?.cmp(&0)
            }
        })
    }
}

/// A stable merge sort with a comparator that can fail. User comparators
/// need not be consistent.
fn sort_values(
    items: Vec<Value>,
    cmp: &mut dyn FnMut(&Value, &Value) -> Result<Ordering>,
) -> Result<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = sort_values(left, cmp)?;
    let right = sort_values(right, cmp)?;
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        if cmp(b, a)? == Ordering::Less {
            out.extend(right.next());
        } else {
            out.extend(left.next());
        }
    }
    out.extend(left);
    out.extend(right);
    Ok(out)
}

fn apply(interp: &mut Interpreter, host: &mut dyn ScriptHost, func: &Value, key: Value, value: Value) -> Result<Value> {
    match func {
        Value::String(expr) => {
            interp.iteration.push((key, value));
            let result = interp.eval_source(host, expr);
            interp.iteration.pop();
            result
        }
        other => interp.call_value(host, other, vec![key, value], None),
    }
}

fn map_items(
    interp: &mut Interpreter,
    host: &mut dyn ScriptHost,
    target: &Value,
    func: &Value,
    filter: bool,
) -> Result<Value> {
    match target {
        Value::List(list) => {
            let items = list.items();
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                let result = apply(interp, host, func, Value::Number(i as i64), item.clone())?;
                if !filter {
                    out.push(result);
                } else if result.truthy()? {
                    out.push(item);
                }
            }
            list.with_mut(|items| *items = out);
        }
        Value::Dict(dict) => {
            let mut out = IndexMap::new();
            for (key, item) in dict.entries() {
                let result = apply(interp, host, func, Value::String(key.clone()), item.clone())?;
                if !filter {
                    out.insert(key, result);
                } else if result.truthy()? {
                    out.insert(key, item);
                }
            }
            dict.with_mut(|entries| *entries = out);
        }
        _ => {
            let name = if filter { "filter()" } else { "map()" };
            return Err(ScriptErrorKind::ListOrDictRequired(name.to_string()).into());
        }
    }
    Ok(target.clone())
}

fn match_pattern(host: &mut dyn ScriptHost, a: &[Value], want_text: bool) -> Result<Value> {
    let ic = host.state().options.ignorecase();
    let pattern = Pattern::new(&a[1].to_str()?, ic, false, None)?;
    let start = opt_number(a, 2, 0)?;
    if let Value::List(list) = &a[0] {
        let items = list.items();
        for (i, item) in items.iter().enumerate().skip(list_start(items.len(), start)) {
            let text = item.to_str()?;
            if let Some((s, e)) = pattern.find_at(&text, 0) {
                return Ok(if want_text {
                    Value::String(text[s..e].to_string())
                } else {
                    Value::Number(i as i64)
                });
            }
        }
        return Ok(if want_text { Value::from("") } else { Value::Number(-1) });
    }
    let text = a[0].to_str()?;
    let byte_start = text
        .char_indices()
        .nth(start.max(0) as usize)
        .map_or(text.len(), |(i, _)| i);
    if start as usize > text.chars().count() {
        return Ok(if want_text { Value::from("") } else { Value::Number(-1) });
    }
    Ok(match pattern.find_at(&text, byte_start) {
        Some((s, e)) if want_text => Value::String(text[s..e].to_string()),
        Some((s, _)) => Value::Number(text[..s].chars().count() as i64),
        None if want_text => Value::from(""),
        None => Value::Number(-1),
    })
}

fn exists_expr(interp: &mut Interpreter, host: &mut dyn ScriptHost, text: &str) -> i64 {
    let text = text.trim();
    if let Some(name) = text.strip_prefix('&') {
        let name = name.strip_prefix("l:").or_else(|| name.strip_prefix("g:")).unwrap_or(name);
        return i64::from(Options::exists(name));
    }
    if let Some(name) = text.strip_prefix('*') {
        return i64::from(interp.function_exists(host, name));
    }
    if let Some(name) = text.strip_prefix(':') {
        return if parser::is_command(name) { 2 } else { 0 };
    }
    if let Some(name) = text.strip_prefix('$') {
        let set = host.state().script.environment.contains_key(name) || std::env::var_os(name).is_some();
        return i64::from(set);
    }
    fn is_variable(expr: &Expr) -> bool {
        match expr {
            Expr::Name(_) | Expr::Option(_) => true,
            Expr::Index(base, _) | Expr::Dot(base, _) => is_variable(base),
            _ => false,
        }
    }
    match parse_expression(text) {
        Ok(expr) if is_variable(&expr) => i64::from(interp.eval(host, &expr).is_ok()),
        _ => 0,
    }
}

fn function(interp: &mut Interpreter, host: &mut dyn ScriptHost, a: &[Value]) -> Result<Value> {
    let name = match &a[0] {
        Value::Funcref(f) => f.name.clone(),
        other => other.to_str()?,
    };
    if !interp.function_exists(host, &name) {
        return Err(ScriptErrorKind::NoSuchFunction(name).into());
    }
    let key = interp.function_key(&name);
    let name = if host.state().script.functions.contains_key(&key) {
        key
    } else {
        name
    };
    let mut funcref = Funcref::new(name);
    if let Value::Funcref(base) = &a[0] {
        funcref.args = base.args.clone();
        funcref.dict = base.dict.clone();
    }
    for extra in &a[1..] {
        match extra {
            Value::List(list) => funcref.args.extend(list.items()),
            Value::Dict(dict) => funcref.dict = Some(dict.clone()),
            _ => return Err(ScriptErrorKind::ListRequired.into()),
        }
    }
    Ok(Value::Funcref(funcref))
}

/// 1-based line for `line()` and `getline()` arguments: `.`, `$`, `'<`,
/// `'>`; 0 when unknown.
fn line_number(host: &mut dyn ScriptHost, spec: &str) -> i64 {
    let visual = host.visual_lines();
    let editor = host.editor();
    match spec {
        "." | "v" => editor.line_of_offset(editor.caret()) as i64 + 1,
        "$" => editor.line_count() as i64,
        "'<" => visual.map_or(0, |(first, _)| first as i64 + 1),
        "'>" => visual.map_or(0, |(_, last)| last as i64 + 1),
        _ => spec.parse().unwrap_or(0),
    }
}

fn line_arg(host: &mut dyn ScriptHost, value: &Value) -> Result<i64> {
    match value {
        Value::String(s) => Ok(line_number(host, s)),
        other => other.to_number(),
    }
}

fn getline(host: &mut dyn ScriptHost, a: &[Value]) -> Result<Value> {
    let first = line_arg(host, &a[0])?;
    let last = a.get(1).map(|end| line_arg(host, end)).transpose()?;
    let editor = host.editor();
    let count = editor.line_count() as i64;
    match last {
        None if (1..=count).contains(&first) => Ok(Value::String(editor.line_text(first as usize - 1))),
        None => Ok(Value::from("")),
        Some(last) => {
            let lines = (first.max(1)..=last.min(count))
                .map(|line| Value::String(editor.line_text(line as usize - 1)))
                .collect();
            Ok(Value::list(lines))
        }
    }
}

fn setline(host: &mut dyn ScriptHost, a: &[Value]) -> Result<Value> {
    let first = line_arg(host, &a[0])?;
    let lines = match &a[1] {
        Value::List(list) => list.items().iter().map(Value::to_str).collect::<Result<Vec<_>>>()?,
        other => vec![other.to_str()?],
    };
    if first < 1 {
        return Ok(Value::Number(1));
    }
    let editor = host.editor();
    for (i, line) in lines.iter().enumerate() {
        let target = first as usize - 1 + i;
        let count = editor.line_count();
        if target < count {
            let range = Range::new(editor.line_start(target), editor.line_end(target));
            editor.replace(range, line);
        } else if target == count {
            let end = editor.text_len();
            editor.insert(end, &format!("\n{line}"));
        } else {
            return Ok(Value::Number(1));
        }
    }
    let caret = editor.clamp(editor.caret());
    editor.set_caret(caret);
    Ok(Value::Number(0))
}

fn register_name(arg: Option<&Value>) -> Result<char> {
    Ok(match arg {
        Some(value) => value.to_str()?.chars().next().unwrap_or('"'),
        None => '"',
    })
}

fn setreg(host: &mut dyn ScriptHost, a: &[Value]) -> Result<Value> {
    let name = register_name(a.first())?;
    let options = opt_str(a, 2)?;
    let is_list = matches!(a[1], Value::List(_));
    let mut text = register_text(&a[1])?;
    let kind = if options.contains(['l', 'V']) {
        RegisterType::LineWise
    } else if options.contains(['b', '\x16']) {
        let width = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        RegisterType::BlockWise { width }
    } else if options.contains(['c', 'v']) || !(is_list || text.ends_with('\n')) {
        RegisterType::CharWise
    } else {
        RegisterType::LineWise
    };
    if kind != RegisterType::LineWise && is_list && text.ends_with('\n') {
        text.pop();
    }
    let target = if options.contains('a') && name.is_ascii_lowercase() {
        name.to_ascii_uppercase()
    } else {
        name
    };
    let target = if target == '"' { None } else { Some(target) };
    host.state()
        .write_register(target, Register::new(text, kind), WriteKind::Set)?;
    Ok(Value::Number(0))
}

fn map_modes(mode: &str) -> MapModes {
    match mode {
        "!" => MapModes::from_prefix("", true),
        mode => MapModes::from_prefix(mode, false),
    }
    .unwrap_or(MapModes::NORMAL)
}

fn maparg(host: &mut dyn ScriptHost, a: &[Value], check: bool) -> Result<Value> {
    let lhs = parse_keys_with_leader(&a[0].to_str()?, &leader(host));
    let modes = map_modes(&opt_str(a, 1)?);
    let local = if check {
        host.buffer_mappings().conflicting(modes, &lhs)
    } else {
        host.buffer_mappings().get(modes, &lhs)
    };
    let mapping = match local {
        Some(mapping) => Some(mapping),
        None if check => host.state().mappings.conflicting(modes, &lhs),
        None => host.state().mappings.get(modes, &lhs),
    };
    if check || !opt_bool(a, 3)? {
        return Ok(Value::String(mapping.map(|m| m.rhs_text.clone()).unwrap_or_default()));
    }
    let Some(mapping) = mapping else {
        return Ok(Value::dict(IndexMap::new()));
    };
    let mut dict = IndexMap::new();
    dict.insert("lhs".to_string(), Value::String(keys_to_notation(&mapping.lhs)));
    dict.insert("rhs".to_string(), Value::String(mapping.rhs_text.clone()));
    dict.insert("silent".to_string(), Value::from(mapping.silent));
    dict.insert("noremap".to_string(), Value::from(!mapping.remap));
    dict.insert(
        "expr".to_string(),
        Value::from(matches!(mapping.rhs, crate::mapping::MapRhs::Expr(_))),
    );
    dict.insert("nowait".to_string(), Value::from(mapping.nowait));
    dict.insert("sid".to_string(), Value::Number(i64::from(mapping.sid)));
    dict.insert("buffer".to_string(), Value::from(mapping.buffer));
    dict.insert(
        "mode".to_string(),
        Value::String(mapping.modes.display_char().to_string()),
    );
    Ok(Value::dict(dict))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn printf_formats() {
        let args = [Value::Number(42), Value::from("x"), Value::Float(1.5)];
        assert_eq!(printf("%05d|%-3s|%.2f", &args).unwrap(), "00042|x  |1.50");
        assert_eq!(printf("%x %X %o", &[Value::Number(255), Value::Number(255), Value::Number(8)]).unwrap(), "ff FF 10");
        assert_eq!(printf("%e", &[Value::Float(150.0)]).unwrap(), "1.500000e+02");
        assert_eq!(printf("%g", &[Value::Float(0.5)]).unwrap(), "0.5");
        assert_eq!(printf("100%%", &[]).unwrap(), "100%");
        assert!(printf("%d %d", &[Value::Number(1)]).is_err());
        assert!(printf("%d", &[Value::Number(1), Value::Number(2)]).is_err());
    }

    #[test]
    fn split_on_patterns() {
        let parts = |v: Vec<Value>| v.iter().map(Value::display).collect::<Vec<_>>();
        assert_eq!(parts(split("  a b  c ", None, false).unwrap()), vec!["a", "b", "c"]);
        assert_eq!(parts(split("a,b,,c", Some(","), false).unwrap()), vec!["a", "b", "c"]);
        assert_eq!(parts(split("a,b,,c", Some(","), true).unwrap()), vec!["a", "b", "", "c"]);
        assert_eq!(parts(split("abc", Some("\\zs"), false).unwrap()), vec!["a", "b", "c"]);
    }

    #[test]
    fn number_parsing() {
        assert_eq!(str2nr("0x1F", 16).unwrap(), 31);
        assert_eq!(str2nr("-12abc", 10).unwrap(), -12);
        assert_eq!(str2nr("101", 2).unwrap(), 5);
        assert!(str2nr("1", 7).is_err());
        assert_eq!(str2float("1.5e2xyz"), 150.0);
        assert_eq!(str2float("nope"), 0.0);
    }

    #[test]
    fn tr_maps_characters() {
        assert_eq!(tr("hello", "el", "ip").unwrap(), "hippo");
        assert!(tr("x", "ab", "c").is_err());
    }

    #[test]
    fn ranges() {
        let numbers = |v: Value| match v {
            Value::List(list) => list.items().iter().map(|x| x.to_number().unwrap()).collect::<Vec<_>>(),
            other => panic!("expected a list, got {other:?}"),
        };
        assert_eq!(numbers(range(&[Value::Number(3)]).unwrap()), vec![0, 1, 2]);
        assert_eq!(numbers(range(&[Value::Number(2), Value::Number(4)]).unwrap()), vec![2, 3, 4]);
        assert_eq!(
            numbers(range(&[Value::Number(5), Value::Number(1), Value::Number(-2)]).unwrap()),
            vec![5, 3, 1]
        );
    }
}
