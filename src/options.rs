//! The option table read by `:set`, `&option` and the engine itself.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("E518: Unknown option: {0}")]
    Unknown(String),

    #[error("E521: Number required after =: {0}")]
    NumberRequired(String),

    #[error("E474: Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Number(i64),
    String(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", i64::from(*b)),
            OptionValue::Number(n) => write!(f, "{n}"),
            OptionValue::String(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Default {
    Bool(bool),
    Number(i64),
    String(&'static str),
}

#[derive(Debug)]
struct OptionDef {
    name: &'static str,
    short: &'static str,
    default: Default,
    /// Allowed comma-separated items for string options; empty means free-form.
    allowed: &'static [&'static str],
    list: bool,
}

const fn bool_opt(name: &'static str, short: &'static str, default: bool) -> OptionDef {
    OptionDef {
        name,
        short,
        default: Default::Bool(default),
        allowed: &[],
        list: false,
    }
}

const fn num_opt(name: &'static str, short: &'static str, default: i64) -> OptionDef {
    OptionDef {
        name,
        short,
        default: Default::Number(default),
        allowed: &[],
        list: false,
    }
}

const DEFS: &[OptionDef] = &[
    bool_opt("ignorecase", "ic", false),
    bool_opt("smartcase", "scs", false),
    bool_opt("wrapscan", "ws", true),
    bool_opt("hlsearch", "hls", false),
    bool_opt("timeout", "to", true),
    num_opt("timeoutlen", "tm", 1000),
    num_opt("maxmapdepth", "mmd", 1000),
    num_opt("maxfuncdepth", "mfd", 100),
    num_opt("shiftwidth", "sw", 8),
    num_opt("tabstop", "ts", 8),
    bool_opt("expandtab", "et", false),
    bool_opt("tildeop", "top", false),
    bool_opt("joinspaces", "js", false),
    OptionDef {
        name: "selection",
        short: "sel",
        default: Default::String("inclusive"),
        allowed: &["inclusive", "exclusive", "old"],
        list: false,
    },
    OptionDef {
        name: "clipboard",
        short: "cb",
        default: Default::String(""),
        allowed: &["unnamed", "unnamedplus"],
        list: true,
    },
    OptionDef {
        name: "whichwrap",
        short: "ww",
        default: Default::String("b,s"),
        allowed: &["b", "s", "h", "l", "<", ">", "[", "]", "~"],
        list: true,
    },
];

fn default_value(def: &OptionDef) -> OptionValue {
    match def.default {
        Default::Bool(b) => OptionValue::Bool(b),
        Default::Number(n) => OptionValue::Number(n),
        Default::String(s) => OptionValue::String(s.to_string()),
    }
}

/// Current values of every known option.
#[derive(Debug, Clone)]
pub struct Options {
    values: Vec<OptionValue>,
}

impl std::default::Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Options {
    pub fn new() -> Self {
        Self {
            values: DEFS.iter().map(default_value).collect(),
        }
    }

    fn index(name: &str) -> Option<usize> {
        DEFS.iter()
            .position(|d| d.name == name || d.short == name)
    }

    pub fn exists(name: &str) -> bool {
        Self::index(name).is_some()
    }

    /// Long names of all options.
    pub fn names() -> impl Iterator<Item = &'static str> {
        DEFS.iter().map(|d| d.name)
    }

    pub fn get(&self, name: &str) -> Result<&OptionValue, OptionError> {
        Self::index(name)
            .map(|i| &self.values[i])
            .ok_or_else(|| OptionError::Unknown(name.to_string()))
    }

    /// Sets an option, coercing numbers and booleans the way `:let &opt` does.
    pub fn set(&mut self, name: &str, value: OptionValue) -> Result<(), OptionError> {
        let i = Self::index(name).ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        let def = &DEFS[i];
        let value = match (&self.values[i], value) {
            (OptionValue::Bool(_), OptionValue::Bool(b)) => OptionValue::Bool(b),
            (OptionValue::Bool(_), OptionValue::Number(n)) => OptionValue::Bool(n != 0),
            (OptionValue::Number(_), OptionValue::Number(n)) => OptionValue::Number(n),
            (OptionValue::Number(_), OptionValue::Bool(b)) => OptionValue::Number(i64::from(b)),
            (OptionValue::Number(_), OptionValue::String(s)) => OptionValue::Number(
                s.trim()
                    .parse()
                    .map_err(|_| OptionError::NumberRequired(format!("{name}={s}")))?,
            ),
            (OptionValue::String(_), OptionValue::String(s)) => {
                validate(def, &s)?;
                OptionValue::String(s)
            }
            (OptionValue::String(_), OptionValue::Number(n)) => OptionValue::String(n.to_string()),
            (_, other) => {
                return Err(OptionError::InvalidArgument(format!("{name}={other}")));
            }
        };
        if let OptionValue::Number(n) = value
            && n < 0
        {
            return Err(OptionError::InvalidArgument(format!("{name}={n}")));
        }
        self.values[i] = value;
        Ok(())
    }

    pub fn reset(&mut self, name: &str) -> Result<(), OptionError> {
        let i = Self::index(name).ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        self.values[i] = default_value(&DEFS[i]);
        Ok(())
    }

    fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Ok(OptionValue::Bool(true)))
    }

    fn number(&self, name: &str) -> i64 {
        match self.get(name) {
            Ok(OptionValue::Number(n)) => *n,
            _ => 0,
        }
    }

    fn string(&self, name: &str) -> &str {
        match self.get(name) {
            Ok(OptionValue::String(s)) => s,
            _ => "",
        }
    }

    pub fn ignorecase(&self) -> bool {
        self.flag("ignorecase")
    }

    pub fn smartcase(&self) -> bool {
        self.flag("smartcase")
    }

    pub fn wrapscan(&self) -> bool {
        self.flag("wrapscan")
    }

    pub fn hlsearch(&self) -> bool {
        self.flag("hlsearch")
    }

    pub fn expandtab(&self) -> bool {
        self.flag("expandtab")
    }

    pub fn tildeop(&self) -> bool {
        self.flag("tildeop")
    }

    pub fn joinspaces(&self) -> bool {
        self.flag("joinspaces")
    }

    /// How long an ambiguous mapping waits, or `None` when `notimeout` is set.
    pub fn timeoutlen(&self) -> Option<Duration> {
        self.flag("timeout")
            .then(|| Duration::from_millis(self.number("timeoutlen") as u64))
    }

    pub fn maxmapdepth(&self) -> usize {
        self.number("maxmapdepth").max(1) as usize
    }

    pub fn maxfuncdepth(&self) -> usize {
        self.number("maxfuncdepth").max(1) as usize
    }

    pub fn shiftwidth(&self) -> usize {
        match self.number("shiftwidth") {
            0 => self.tabstop(),
            n => n as usize,
        }
    }

    pub fn tabstop(&self) -> usize {
        self.number("tabstop").max(1) as usize
    }

    /// The one-column difference between visual and select caret conventions.
    pub fn selection_adjustment(&self) -> usize {
        if self.string("selection") == "exclusive" { 0 } else { 1 }
    }

    /// The register the unnamed register is redirected to by `clipboard`.
    pub fn clipboard_register(&self) -> Option<char> {
        let items: Vec<&str> = self.string("clipboard").split(',').collect();
        if items.contains(&"unnamedplus") {
            Some('+')
        } else if items.contains(&"unnamed") {
            Some('*')
        } else {
            None
        }
    }

    pub fn whichwrap(&self, item: char) -> bool {
        self.string("whichwrap")
            .split(',')
            .any(|s| s.len() == item.len_utf8() && s.starts_with(item))
    }

    /// Applies one `:set` argument. Returns the text to display for queries.
    pub fn apply_set_arg(&mut self, arg: &str) -> Result<Option<String>, OptionError> {
        if let Some(name) = arg.strip_suffix('?') {
            return self.show(name).map(Some);
        }
        if let Some(name) = arg.strip_suffix('&') {
            self.reset(name)?;
            return Ok(None);
        }
        if let Some(name) = arg.strip_suffix('!') {
            return self.invert(name).map(|_| None);
        }
        if let Some(pos) = arg.find(['=', ':']) {
            let (lhs, value) = (&arg[..pos], unescape_value(&arg[pos + 1..]));
            let (name, op) = match lhs.as_bytes().last() {
                Some(b'+') => (&lhs[..lhs.len() - 1], '+'),
                Some(b'-') => (&lhs[..lhs.len() - 1], '-'),
                Some(b'^') => (&lhs[..lhs.len() - 1], '^'),
                _ => (lhs, '='),
            };
            return self.assign(name, op, &value).map(|_| None);
        }
        if let Some(i) = Self::index(arg) {
            return match self.values[i] {
                OptionValue::Bool(_) => {
                    self.values[i] = OptionValue::Bool(true);
                    Ok(None)
                }
                _ => self.show(arg).map(Some),
            };
        }
        if let Some(name) = arg.strip_prefix("no")
            && let Some(i) = Self::index(name)
            && matches!(self.values[i], OptionValue::Bool(_))
        {
            self.values[i] = OptionValue::Bool(false);
            return Ok(None);
        }
        if let Some(name) = arg.strip_prefix("inv") {
            return self.invert(name).map(|_| None);
        }
        Err(OptionError::Unknown(arg.to_string()))
    }

    fn invert(&mut self, name: &str) -> Result<(), OptionError> {
        let i = Self::index(name).ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        match self.values[i] {
            OptionValue::Bool(b) => {
                self.values[i] = OptionValue::Bool(!b);
                Ok(())
            }
            _ => Err(OptionError::InvalidArgument(format!("{name}!"))),
        }
    }

    fn assign(&mut self, name: &str, op: char, value: &str) -> Result<(), OptionError> {
        let i = Self::index(name).ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        let def = &DEFS[i];
        let new = match &self.values[i] {
            OptionValue::Bool(_) => {
                return Err(OptionError::InvalidArgument(format!("{name}={value}")));
            }
            OptionValue::Number(current) => {
                let n: i64 = value
                    .parse()
                    .map_err(|_| OptionError::NumberRequired(format!("{name}={value}")))?;
                OptionValue::Number(match op {
                    '+' => current + n,
                    '-' => current - n,
                    '^' => current * n,
                    _ => n,
                })
            }
            OptionValue::String(current) => OptionValue::String(combine(def, current, op, value)),
        };
        self.set(name, new)
    }

    fn show(&self, name: &str) -> Result<String, OptionError> {
        let i = Self::index(name).ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        let def = &DEFS[i];
        Ok(match &self.values[i] {
            OptionValue::Bool(true) => format!("  {}", def.name),
            OptionValue::Bool(false) => format!("no{}", def.name),
            other => format!("  {}={other}", def.name),
        })
    }
}

fn validate(def: &OptionDef, value: &str) -> Result<(), OptionError> {
    if def.allowed.is_empty() {
        return Ok(());
    }
    let ok = if def.list {
        value
            .split(',')
            .filter(|s| !s.is_empty())
            .all(|item| def.allowed.contains(&item))
    } else {
        def.allowed.contains(&value)
    };
    if ok {
        Ok(())
    } else {
        Err(OptionError::InvalidArgument(format!("{}={value}", def.name)))
    }
}

fn combine(def: &OptionDef, current: &str, op: char, value: &str) -> String {
    if !def.list {
        return match op {
            '+' => format!("{current}{value}"),
            '^' => format!("{value}{current}"),
            '-' => current.replacen(value, "", 1),
            _ => value.to_string(),
        };
    }
    let mut items: Vec<&str> = current.split(',').filter(|s| !s.is_empty()).collect();
    match op {
        '+' if !items.contains(&value) => items.push(value),
        '^' if !items.contains(&value) => items.insert(0, value),
        '-' => items.retain(|item| *item != value),
        '=' => return value.to_string(),
        _ => {}
    }
    items.join(",")
}

fn unescape_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(next) = chars.next()
        {
            out.push(next);
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = Options::new();
        assert!(opts.wrapscan());
        assert!(!opts.ignorecase());
        assert_eq!(opts.shiftwidth(), 8);
        assert_eq!(opts.selection_adjustment(), 1);
        assert_eq!(opts.timeoutlen(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn set_syntax_variants() {
        let mut opts = Options::new();
        opts.apply_set_arg("ic").unwrap();
        assert!(opts.ignorecase());
        opts.apply_set_arg("noic").unwrap();
        assert!(!opts.ignorecase());
        opts.apply_set_arg("ic!").unwrap();
        assert!(opts.ignorecase());
        opts.apply_set_arg("invignorecase").unwrap();
        assert!(!opts.ignorecase());

        opts.apply_set_arg("sw=4").unwrap();
        assert_eq!(opts.shiftwidth(), 4);
        opts.apply_set_arg("sw+=2").unwrap();
        assert_eq!(opts.shiftwidth(), 6);
        opts.apply_set_arg("sw&").unwrap();
        assert_eq!(opts.shiftwidth(), 8);

        assert_eq!(opts.apply_set_arg("ts?").unwrap().as_deref(), Some("  tabstop=8"));
        assert_eq!(opts.apply_set_arg("ws?").unwrap().as_deref(), Some("  wrapscan"));
    }

    #[test]
    fn list_options() {
        let mut opts = Options::new();
        opts.apply_set_arg("clipboard+=unnamed").unwrap();
        assert_eq!(opts.clipboard_register(), Some('*'));
        opts.apply_set_arg("clipboard-=unnamed").unwrap();
        assert_eq!(opts.clipboard_register(), None);
        assert!(opts.whichwrap('s'));
        assert!(!opts.whichwrap('h'));
    }

    #[test]
    fn rejects_bad_values() {
        let mut opts = Options::new();
        assert!(matches!(opts.apply_set_arg("bogus"), Err(OptionError::Unknown(_))));
        assert!(matches!(
            opts.apply_set_arg("sw=abc"),
            Err(OptionError::NumberRequired(_))
        ));
        assert!(matches!(
            opts.apply_set_arg("selection=wide"),
            Err(OptionError::InvalidArgument(_))
        ));
        opts.apply_set_arg("selection=exclusive").unwrap();
        assert_eq!(opts.selection_adjustment(), 0);
    }
}
