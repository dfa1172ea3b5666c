//! Ex commands that reach into the engine: mappings, options, `:normal`,
//! `:substitute` and the line-range editing commands.

use tracing::{debug, trace};

use super::ScriptHost;
use super::ast::{Address, AddressBase, ExCommand, ExKind, Expr, LineRange};
use super::error::{Result, ScriptErrorKind};
use super::expr::parse_expression;
use super::interp::{Interpreter, concat_text};
use super::value::Value;
use crate::edit;
use crate::error::EngineError;
use crate::key::{keys_to_notation, parse_keys_with_leader, text_to_keys};
use crate::mapping::{MapModes, MapRhs, Mapping};
use crate::operator::{self, OpRange};
use crate::register::{Register, RegisterType, WriteKind};
use crate::search::{Pattern, expand_replacement, resolve_tilde};
use crate::types::Range;

pub(super) fn execute(interp: &mut Interpreter, host: &mut dyn ScriptHost, cmd: &ExCommand) -> Result<()> {
    trace!(kind = ?cmd.kind, arg = cmd.arg, bang = cmd.bang, "ex command");
    match cmd.kind {
        ExKind::Map { prefix, noremap } => map(interp, host, cmd, prefix, noremap),
        ExKind::Unmap { prefix } => unmap(host, cmd, prefix),
        ExKind::MapClear { prefix } => {
            let modes = map_modes(prefix, cmd.bang)?;
            if parse_map_args(&cmd.arg).buffer {
                host.buffer_mappings().clear(modes);
            } else {
                host.state().mappings.clear(modes);
            }
            Ok(())
        }
        ExKind::Set => set(interp, host, &cmd.arg),
        ExKind::Normal => normal(host, cmd),
        ExKind::Substitute => substitute(interp, host, cmd),
        ExKind::Delete | ExKind::Yank => delete_or_yank(host, cmd),
        ExKind::Put => put(host, cmd),
        ExKind::Join => join(host, cmd),
        ExKind::Shift { left, amount } => shift(host, cmd, left, amount),
        ExKind::Goto => goto(host, cmd),
        ExKind::StartInsert => {
            host.start_insert(cmd.bang);
            Ok(())
        }
        ExKind::StopInsert => {
            host.stop_insert();
            Ok(())
        }
        ExKind::NoHlSearch => {
            host.state().search.highlight = false;
            Ok(())
        }
        ExKind::Registers => registers(interp, host, &cmd.arg),
        ExKind::Undo | ExKind::Redo => {
            let editor = host.editor();
            let changed = if cmd.kind == ExKind::Undo {
                editor.undo()
            } else {
                editor.redo()
            };
            let caret = editor.clamp(editor.caret());
            editor.set_caret(caret);
            if !changed {
                let text = if cmd.kind == ExKind::Undo {
                    "Already at oldest change"
                } else {
                    "Already at newest change"
                };
                host.message(text.to_string());
            }
            Ok(())
        }
    }
}

/// `g:mapleader`, or the engine's configured leader.
pub(super) fn leader(host: &mut dyn ScriptHost) -> String {
    let global = host
        .state()
        .script
        .global("mapleader")
        .and_then(|value| value.to_str().ok());
    global.unwrap_or_else(|| host.leader())
}

/// 1-based line of one address. Out-of-range values are returned as is and
/// checked by the caller.
fn address_line(host: &mut dyn ScriptHost, address: &Address) -> Result<i64> {
    let visual = host.visual_lines();
    let editor = host.editor();
    let base = match address.base {
        AddressBase::Number(n) => n as i64,
        AddressBase::Current => editor.line_of_offset(editor.caret()) as i64 + 1,
        AddressBase::Last => editor.line_count() as i64,
        AddressBase::Mark('<') => match visual {
            Some((first, _)) => first as i64 + 1,
            None => return Err(EngineError::InvalidRange.into()),
        },
        AddressBase::Mark('>') => match visual {
            Some((_, last)) => last as i64 + 1,
            None => return Err(EngineError::InvalidRange.into()),
        },
        AddressBase::Mark(_) => return Err(EngineError::InvalidRange.into()),
    };
    Ok(base + address.offset)
}

/// The command's range as 1-based `(first, last)`, defaulting to the
/// caret line. Line 0 is accepted only when `allow_zero`.
fn line_range(host: &mut dyn ScriptHost, range: Option<LineRange>, allow_zero: bool) -> Result<(usize, usize)> {
    let (first, last) = match range {
        None => {
            let line = address_line(
                host,
                &Address {
                    base: AddressBase::Current,
                    offset: 0,
                },
            )?;
            (line, line)
        }
        Some(LineRange::Whole) => (1, host.editor().line_count() as i64),
        Some(LineRange::One(address)) => {
            let line = address_line(host, &address)?;
            (line, line)
        }
        Some(LineRange::Span(a, b)) => {
            let (a, b) = (address_line(host, &a)?, address_line(host, &b)?);
            (a.min(b), a.max(b))
        }
    };
    let count = host.editor().line_count() as i64;
    let min = if allow_zero { 0 } else { 1 };
    if first < min || last > count {
        debug!(first, last, count, "invalid range");
        return Err(EngineError::InvalidRange.into());
    }
    Ok((first as usize, last as usize))
}

/// Parses `[x] [count]` after `:delete`, `:yank` and friends.
fn register_and_count(arg: &str, with_register: bool) -> Result<(Option<char>, Option<usize>)> {
    let mut rest = arg.trim();
    let mut register = None;
    if with_register
        && let Some(c) = rest.chars().next()
        && !c.is_ascii_digit()
    {
        register = Some(c);
        rest = rest[c.len_utf8()..].trim_start();
    }
    if rest.is_empty() {
        return Ok((register, None));
    }
    match rest.parse::<usize>() {
        Ok(0) => Err(ScriptErrorKind::InvalidArgument("0".to_string()).into()),
        Ok(n) => Ok((register, Some(n))),
        Err(_) => Err(ScriptErrorKind::TrailingCharacters(rest.to_string()).into()),
    }
}

/// Applies a trailing count: the range becomes `count` lines starting at
/// its last line.
fn with_count(host: &mut dyn ScriptHost, (first, last): (usize, usize), count: Option<usize>) -> (usize, usize) {
    match count {
        Some(n) => {
            let lines = host.editor().line_count();
            (last, (last + n - 1).min(lines))
        }
        None => (first, last),
    }
}

fn map_modes(prefix: &str, bang: bool) -> Result<MapModes> {
    MapModes::from_prefix(prefix, bang).ok_or_else(|| ScriptErrorKind::NotACommand(format!("{prefix}map!")).into())
}

#[derive(Debug, Default)]
struct MapArgs<'a> {
    silent: bool,
    nowait: bool,
    expr: bool,
    unique: bool,
    buffer: bool,
    lhs: &'a str,
    rhs: &'a str,
}

fn strip_modifier<'a>(text: &'a str, modifier: &str) -> Option<&'a str> {
    let head = text.get(..modifier.len())?;
    head.eq_ignore_ascii_case(modifier)
        .then(|| text[modifier.len()..].trim_start())
}

fn parse_map_args(arg: &str) -> MapArgs<'_> {
    let mut args = MapArgs::default();
    let mut rest = arg.trim_start();
    'modifiers: loop {
        for modifier in [
            "<silent>",
            "<nowait>",
            "<expr>",
            "<unique>",
            "<buffer>",
            "<script>",
            "<special>",
        ] {
            if let Some(after) = strip_modifier(rest, modifier) {
                match modifier {
                    "<silent>" => args.silent = true,
                    "<nowait>" => args.nowait = true,
                    "<expr>" => args.expr = true,
                    "<unique>" => args.unique = true,
                    "<buffer>" => args.buffer = true,
                    _ => {}
                }
                rest = after;
                continue 'modifiers;
            }
        }
        break;
    }
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    args.lhs = &rest[..end];
    args.rhs = rest[end..].trim_start();
    args
}

fn expand_sid(text: &str, sid: u32) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.to_ascii_lowercase().find("<sid>") {
        out.push_str(&rest[..pos]);
        out.push_str(&format!("<SNR>{sid}_"));
        rest = &rest[pos + "<sid>".len()..];
    }
    out.push_str(rest);
    out
}

fn list_mappings(interp: &mut Interpreter, host: &mut dyn ScriptHost, modes: MapModes, lhs: &str) {
    let prefix = parse_keys_with_leader(lhs, &leader(host));
    let mut found = host.buffer_mappings().list(modes, &prefix);
    found.extend(host.state().mappings.list(modes, &prefix));
    if found.is_empty() {
        interp.output(host, "No mapping found".to_string());
        return;
    }
    for mapping in found {
        interp.output(host, mapping.describe());
    }
}

fn map(interp: &mut Interpreter, host: &mut dyn ScriptHost, cmd: &ExCommand, prefix: &str, noremap: bool) -> Result<()> {
    let modes = map_modes(prefix, cmd.bang)?;
    let args = parse_map_args(&cmd.arg);
    if args.rhs.is_empty() {
        list_mappings(interp, host, modes, args.lhs);
        return Ok(());
    }
    let sid = interp.current_sid();
    let leader = leader(host);
    let lhs = parse_keys_with_leader(&expand_sid(args.lhs, sid), &leader);
    if lhs.is_empty() {
        return Err(ScriptErrorKind::ArgumentRequired.into());
    }
    let rhs_text = expand_sid(args.rhs, sid);
    let rhs = if args.expr {
        MapRhs::Expr(rhs_text.clone())
    } else {
        MapRhs::Keys(parse_keys_with_leader(&rhs_text, &leader))
    };
    let mappings = if args.buffer {
        host.buffer_mappings()
    } else {
        &mut host.state().mappings
    };
    if args.unique && mappings.contains(modes, &lhs) {
        return Err(ScriptErrorKind::MappingExists(args.lhs.to_string()).into());
    }
    debug!(lhs = %keys_to_notation(&lhs), rhs = rhs_text, ?modes, noremap, buffer = args.buffer, "map");
    mappings.insert(Mapping {
        lhs,
        rhs,
        rhs_text,
        modes,
        remap: !noremap,
        silent: args.silent,
        nowait: args.nowait,
        buffer: args.buffer,
        sid,
    });
    Ok(())
}

fn unmap(host: &mut dyn ScriptHost, cmd: &ExCommand, prefix: &str) -> Result<()> {
    let modes = map_modes(prefix, cmd.bang)?;
    let args = parse_map_args(&cmd.arg);
    let lhs_text = args.lhs;
    if lhs_text.is_empty() {
        return Err(ScriptErrorKind::ArgumentRequired.into());
    }
    let leader = leader(host);
    let lhs = parse_keys_with_leader(lhs_text, &leader);
    let mappings = if args.buffer {
        host.buffer_mappings()
    } else {
        &mut host.state().mappings
    };
    if !mappings.remove(modes, &lhs) {
        return Err(ScriptErrorKind::NoSuchMapping.into());
    }
    Ok(())
}

/// Splits `:set` arguments on whitespace. `\ ` stays escaped for the
/// option parser.
fn split_set_args(arg: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut chars = arg.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

fn set(interp: &mut Interpreter, host: &mut dyn ScriptHost, arg: &str) -> Result<()> {
    let args = split_set_args(arg);
    if args.is_empty() || args == ["all"] {
        let options = host.state().options.clone();
        for name in crate::options::Options::names() {
            if let Ok(value) = options.get(name) {
                let line = match value {
                    crate::options::OptionValue::Bool(true) => format!("  {name}"),
                    crate::options::OptionValue::Bool(false) => format!("no{name}"),
                    other => format!("  {name}={other}"),
                };
                interp.output(host, line);
            }
        }
        return Ok(());
    }
    for arg in &args {
        debug!(arg, "set");
        if let Some(shown) = host.state().options.apply_set_arg(arg)? {
            interp.output(host, shown);
        }
    }
    Ok(())
}

fn normal(host: &mut dyn ScriptHost, cmd: &ExCommand) -> Result<()> {
    if cmd.arg.is_empty() {
        return Err(ScriptErrorKind::ArgumentRequired.into());
    }
    let keys = text_to_keys(&cmd.arg);
    if cmd.range.is_none() {
        host.normal(keys, !cmd.bang)?;
        return Ok(());
    }
    let (first, last) = line_range(host, cmd.range, false)?;
    for line in first - 1..last {
        let editor = host.editor();
        if line >= editor.line_count() {
            break;
        }
        let start = editor.line_start(line);
        editor.set_caret(start);
        host.normal(keys.clone(), !cmd.bang)?;
    }
    Ok(())
}

/// A `:s` replacement: a template with `&` and `\1`, or `\=` followed by
/// an expression.
pub(super) enum Replacement {
    Template(String),
    Expr(Expr),
}

impl Replacement {
    pub(super) fn parse(text: &str) -> Result<Self> {
        match text.strip_prefix("\\=") {
            Some(expr) => Ok(Replacement::Expr(parse_expression(expr)?)),
            None => Ok(Replacement::Template(text.to_string())),
        }
    }
}

/// Replaces the first match in `text`, or every match with `global`.
/// Returns the new text and the number of replacements.
pub(super) fn replace_matches(
    interp: &mut Interpreter,
    host: &mut dyn ScriptHost,
    text: &str,
    pattern: &Pattern,
    replacement: &Replacement,
    global: bool,
) -> Result<(String, usize)> {
    let mut out = String::with_capacity(text.len());
    let (mut copied, mut scan, mut count) = (0, 0, 0);
    while scan <= text.len() {
        let Some(subs) = pattern.captures_at(text, scan) else {
            break;
        };
        let (start, end) = subs.range;
        out.push_str(&text[copied..start]);
        let replaced = match replacement {
            Replacement::Template(template) => expand_replacement(template, &subs),
            Replacement::Expr(expr) => {
                let saved = interp.submatch.replace(subs.clone());
                let value = interp.eval(host, expr);
                interp.submatch = saved;
                match value? {
                    Value::List(list) => list.items().iter().map(Value::display).collect::<Vec<_>>().join("\n"),
                    other => concat_text(&other)?,
                }
            }
        };
        out.push_str(&replaced);
        copied = end;
        count += 1;
        if !global {
            break;
        }
        scan = if end > start {
            end
        } else {
            match text[end..].chars().next() {
                Some(c) => end + c.len_utf8(),
                None => break,
            }
        };
    }
    out.push_str(&text[copied..]);
    Ok((out, count))
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SubFlags {
    global: bool,
    ignore_case: Option<bool>,
    report_only: bool,
    no_error: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct SubArgs {
    /// `None` repeats the last substitute.
    pattern: Option<String>,
    replacement: Option<String>,
    flags: SubFlags,
    count: Option<usize>,
}

/// Reads up to an unescaped `delim`. `\delim` becomes `delim`; other
/// escapes are kept for the pattern translator.
fn delimited<'a>(text: &'a str, delim: char) -> (String, &'a str, bool) {
    let mut out = String::new();
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == delim {
            return (out, &text[i + c.len_utf8()..], true);
        }
        if c == '\\' {
            match chars.next() {
                Some((_, next)) if next == delim => out.push(next),
                Some((_, next)) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    (out, "", false)
}

fn parse_sub_flags(text: &str) -> Result<(SubFlags, Option<usize>)> {
    let mut flags = SubFlags::default();
    let mut rest = text;
    for (i, c) in text.char_indices() {
        match c {
            '&' if i == 0 => {}
            'g' => flags.global = !flags.global,
            'i' => flags.ignore_case = Some(true),
            'I' => flags.ignore_case = Some(false),
            'n' => flags.report_only = true,
            'e' => flags.no_error = true,
            _ => {
                rest = &text[i..];
                break;
            }
        }
        rest = &text[i + c.len_utf8()..];
    }
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok((flags, None));
    }
    match rest.parse::<usize>() {
        Ok(n) if n > 0 => Ok((flags, Some(n))),
        _ => Err(ScriptErrorKind::TrailingCharacters(rest.to_string()).into()),
    }
}

fn parse_substitute(arg: &str) -> Result<SubArgs> {
    let delim = arg.chars().next().filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && !"\\\"|&".contains(*c));
    let Some(delim) = delim else {
        let (flags, count) = parse_sub_flags(arg.trim_start())?;
        return Ok(SubArgs {
            pattern: None,
            replacement: None,
            flags,
            count,
        });
    };
    let (pattern, rest, closed) = delimited(&arg[delim.len_utf8()..], delim);
    let (replacement, rest) = if closed {
        let (replacement, rest, _) = delimited(rest, delim);
        (replacement, rest)
    } else {
        (String::new(), rest)
    };
    let (flags, count) = parse_sub_flags(rest)?;
    Ok(SubArgs {
        pattern: Some(pattern),
        replacement: Some(replacement),
        flags,
        count,
    })
}

fn substitute(interp: &mut Interpreter, host: &mut dyn ScriptHost, cmd: &ExCommand) -> Result<()> {
    let args = parse_substitute(&cmd.arg)?;
    let state = host.state();
    let source = match args.pattern.filter(|p| !p.is_empty()) {
        Some(pattern) => pattern,
        None => state.search.last_pattern.clone().ok_or(EngineError::NoPreviousPattern)?,
    };
    let template = match args.replacement {
        Some(text) if text.starts_with("\\=") => text,
        Some(text) => resolve_tilde(&text, state.search.last_replacement.as_deref()),
        None => state.search.last_replacement.clone().unwrap_or_default(),
    };
    let flags = args.flags;
    let ignore_case = flags.ignore_case.unwrap_or_else(|| state.options.ignorecase());
    let smartcase = flags.ignore_case.is_none() && state.options.smartcase();
    let pattern = Pattern::new(&source, ignore_case, smartcase, None)?;
    let forward = state.search.last_forward;
    state.search.set_pattern(&source, forward);
    state.search.last_replacement = Some(template.clone());
    let replacement = Replacement::parse(&template)?;

    let range = line_range(host, cmd.range, false)?;
    let (first, last) = with_count(host, range, args.count);
    let (mut line, mut end) = (first - 1, last - 1);
    let (mut total, mut lines) = (0, 0);
    let mut last_changed = None;
    while line <= end && line < host.editor().line_count() {
        let text = host.editor().line_text(line);
        let (new, n) = replace_matches(interp, host, &text, &pattern, &replacement, flags.global)?;
        if n == 0 {
            line += 1;
            continue;
        }
        total += n;
        lines += 1;
        if flags.report_only {
            line += 1;
            continue;
        }
        let editor = host.editor();
        let span = Range::new(editor.line_start(line), editor.line_end(line));
        editor.replace(span, &new);
        let added = new.matches('\n').count();
        last_changed = Some(line + added);
        end += added;
        line += added + 1;
    }
    debug!(pattern = source, total, lines, "substitute");
    if total == 0 {
        if flags.no_error {
            return Ok(());
        }
        return Err(EngineError::PatternNotFound(source).into());
    }
    if flags.report_only {
        let matches = if total == 1 { "match" } else { "matches" };
        let on = if lines == 1 { "line" } else { "lines" };
        interp.output(host, format!("{total} {matches} on {lines} {on}"));
    } else if let Some(line) = last_changed {
        let editor = host.editor();
        let caret = editor.first_non_blank(line);
        editor.set_caret(caret);
    }
    Ok(())
}

fn delete_or_yank(host: &mut dyn ScriptHost, cmd: &ExCommand) -> Result<()> {
    let (register, count) = register_and_count(&cmd.arg, true)?;
    let range = line_range(host, cmd.range, false)?;
    let (first, last) = with_count(host, range, count);
    let range = OpRange::Lines {
        first: first - 1,
        last: last - 1,
    };
    let editor = host.editor();
    let text = Register::linewise(operator::extract(editor, &range));
    let kind = if cmd.kind == ExKind::Delete {
        let caret = operator::delete(editor, &range);
        editor.set_caret(caret);
        WriteKind::Delete { small: false }
    } else {
        WriteKind::Yank
    };
    host.state().write_register(register, text, kind)?;
    Ok(())
}

fn put(host: &mut dyn ScriptHost, cmd: &ExCommand) -> Result<()> {
    let (register, _) = register_and_count(&cmd.arg, true)?;
    let name = register.unwrap_or('"');
    let reg = host
        .state()
        .read_register(name)?
        .filter(|reg| !reg.text.is_empty())
        .ok_or(EngineError::EmptyRegister(name))?;
    let text = match reg.kind {
        RegisterType::LineWise => reg.text,
        _ => format!("{}\n", reg.text),
    };
    let reg = Register::new(text, RegisterType::LineWise);
    let added = reg.text.matches('\n').count();
    let (_, line) = line_range(host, cmd.range, true)?;
    let editor = host.editor();
    let (target, before) = if line == 0 { (0, true) } else { (line - 1, cmd.bang) };
    let start = editor.line_start(target);
    editor.set_caret(start);
    let caret = edit::put(editor, &reg, 1, before);
    let last = editor.line_of_offset(caret) + added - 1;
    let caret = editor.first_non_blank(last.min(editor.last_line()));
    editor.set_caret(caret);
    Ok(())
}

fn join(host: &mut dyn ScriptHost, cmd: &ExCommand) -> Result<()> {
    let (_, count) = register_and_count(&cmd.arg, false)?;
    let (first, last) = line_range(host, cmd.range, false)?;
    let (start, lines) = match count {
        Some(n) => (last - 1, n),
        None => (first - 1, (last - first + 1).max(2)),
    };
    let joinspaces = host.state().options.joinspaces();
    let editor = host.editor();
    let lines = lines.min(editor.line_count() - start);
    if lines < 2 {
        return Ok(());
    }
    if let Some(caret) = edit::join_lines(editor, start, lines, !cmd.bang, joinspaces) {
        editor.set_caret(caret);
    }
    Ok(())
}

fn shift(host: &mut dyn ScriptHost, cmd: &ExCommand, left: bool, amount: usize) -> Result<()> {
    let (_, count) = register_and_count(&cmd.arg, false)?;
    let range = line_range(host, cmd.range, false)?;
    let (first, last) = with_count(host, range, count);
    let options = host.state().options.clone();
    let editor = host.editor();
    let caret = operator::shift(editor, first - 1, last - 1, amount, left, &options);
    let caret = editor.first_non_blank(editor.line_of_offset(caret).max(last - 1));
    editor.set_caret(caret);
    Ok(())
}

/// A bare range moves to its last line, clamped to the buffer.
fn goto(host: &mut dyn ScriptHost, cmd: &ExCommand) -> Result<()> {
    let target = match cmd.range {
        Some(LineRange::One(address) | LineRange::Span(_, address)) => address_line(host, &address)?,
        Some(LineRange::Whole) => host.editor().line_count() as i64,
        None => return Ok(()),
    };
    let editor = host.editor();
    let line = (target.max(1) as usize - 1).min(editor.last_line());
    let caret = editor.first_non_blank(line);
    editor.set_caret(caret);
    Ok(())
}

/// `:registers`: one line per register, newlines shown as `^J`.
fn registers(interp: &mut Interpreter, host: &mut dyn ScriptHost, arg: &str) -> Result<()> {
    let wanted: Vec<char> = arg.chars().filter(|c| !c.is_whitespace()).collect();
    let mut entries = host.state().registers.list();
    if let Some(pattern) = host.state().search.last_pattern.clone() {
        entries.push(('/', Register::charwise(pattern)));
    }
    interp.output(host, "Type Name Content".to_string());
    for (name, reg) in entries {
        if !wanted.is_empty() && !wanted.contains(&name) {
            continue;
        }
        let kind = match reg.kind {
            RegisterType::CharWise => 'c',
            RegisterType::LineWise => 'l',
            RegisterType::BlockWise { .. } => 'b',
        };
        let content = reg.text.replace('\n', "^J");
        interp.output(host, format!("  {kind}  \"{name}   {content}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn map_modifiers_are_stripped() {
        let args = parse_map_args("<silent> <Expr>  <leader>x  :call F()<CR>");
        assert!(args.silent);
        assert!(args.expr);
        assert!(!args.unique);
        assert_eq!(args.lhs, "<leader>x");
        assert_eq!(args.rhs, ":call F()<CR>");
    }

    #[test]
    fn sid_expands_in_any_case() {
        assert_eq!(expand_sid("<SID>Go <sid>x", 3), "<SNR>3_Go <SNR>3_x");
    }

    #[test]
    fn substitute_arguments() {
        let args = parse_substitute("/a\\/b/c/gi 3").unwrap();
        assert_eq!(args.pattern.as_deref(), Some("a/b"));
        assert_eq!(args.replacement.as_deref(), Some("c"));
        assert!(args.flags.global);
        assert_eq!(args.flags.ignore_case, Some(true));
        assert_eq!(args.count, Some(3));

        let args = parse_substitute("#x#").unwrap();
        assert_eq!(args.pattern.as_deref(), Some("x"));
        assert_eq!(args.replacement.as_deref(), Some(""));

        let repeat = parse_substitute("").unwrap();
        assert_eq!(repeat.pattern, None);
        assert!(parse_substitute("/a/b/z").is_err());
    }

    #[test]
    fn set_arguments_keep_escaped_spaces() {
        assert_eq!(
            split_set_args("ts=4  sw=2 fillchars=a\\ b"),
            vec!["ts=4", "sw=2", "fillchars=a\\ b"]
        );
    }

    #[test]
    fn register_and_count_arguments() {
        assert_eq!(register_and_count("a 3", true).unwrap(), (Some('a'), Some(3)));
        assert_eq!(register_and_count("5", true).unwrap(), (None, Some(5)));
        assert_eq!(register_and_count("", false).unwrap(), (None, None));
        assert!(register_and_count("x", false).is_err());
    }
}
