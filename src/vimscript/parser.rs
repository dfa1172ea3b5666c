//! Script source to [`Program`]: line joining, command splitting and block
//! structure. Nothing here executes.

use std::sync::Arc;

use super::ast::{
    Address, AddressBase, AssignOp, Catch, EchoKind, ExCommand, ExKind, Expr, FunctionDef, LetTarget, LineRange,
    Program, Stmt, StmtKind,
};
use super::error::{Location, Result, ScriptError, ScriptErrorKind};
use super::expr::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmd {
    Let,
    Unlet,
    If,
    ElseIf,
    Else,
    EndIf,
    While,
    EndWhile,
    For,
    EndFor,
    Break,
    Continue,
    Function,
    EndFunction,
    Return,
    DelFunction,
    Call,
    Echo(EchoKind),
    Execute,
    Try,
    Catch,
    Finally,
    EndTry,
    Throw,
    Ex(ExKind),
}

/// Command names with the length of their shortest accepted abbreviation.
/// Earlier entries win when an abbreviation fits several names.
const COMMANDS: &[(&str, usize, Cmd)] = &[
    ("let", 3, Cmd::Let),
    ("unlet", 3, Cmd::Unlet),
    ("if", 2, Cmd::If),
    ("else", 2, Cmd::Else),
    ("elseif", 5, Cmd::ElseIf),
    ("endif", 2, Cmd::EndIf),
    ("while", 2, Cmd::While),
    ("endwhile", 4, Cmd::EndWhile),
    ("for", 3, Cmd::For),
    ("endfor", 5, Cmd::EndFor),
    ("break", 4, Cmd::Break),
    ("continue", 3, Cmd::Continue),
    ("function", 2, Cmd::Function),
    ("endfunction", 4, Cmd::EndFunction),
    ("return", 3, Cmd::Return),
    ("delfunction", 4, Cmd::DelFunction),
    ("call", 3, Cmd::Call),
    ("echo", 2, Cmd::Echo(EchoKind::Echo)),
    ("echon", 5, Cmd::Echo(EchoKind::Echon)),
    ("echomsg", 5, Cmd::Echo(EchoKind::Echomsg)),
    ("echoerr", 5, Cmd::Echo(EchoKind::Echoerr)),
    ("execute", 3, Cmd::Execute),
    ("try", 3, Cmd::Try),
    ("catch", 3, Cmd::Catch),
    ("finally", 4, Cmd::Finally),
    ("endtry", 4, Cmd::EndTry),
    ("throw", 2, Cmd::Throw),
    ("map", 3, Cmd::Ex(ExKind::Map { prefix: "", noremap: false })),
    ("noremap", 2, Cmd::Ex(ExKind::Map { prefix: "", noremap: true })),
    ("nmap", 2, Cmd::Ex(ExKind::Map { prefix: "n", noremap: false })),
    ("nnoremap", 2, Cmd::Ex(ExKind::Map { prefix: "n", noremap: true })),
    ("vmap", 2, Cmd::Ex(ExKind::Map { prefix: "v", noremap: false })),
    ("vnoremap", 2, Cmd::Ex(ExKind::Map { prefix: "v", noremap: true })),
    ("xmap", 2, Cmd::Ex(ExKind::Map { prefix: "x", noremap: false })),
    ("xnoremap", 2, Cmd::Ex(ExKind::Map { prefix: "x", noremap: true })),
    ("smap", 4, Cmd::Ex(ExKind::Map { prefix: "s", noremap: false })),
    ("snoremap", 4, Cmd::Ex(ExKind::Map { prefix: "s", noremap: true })),
    ("omap", 2, Cmd::Ex(ExKind::Map { prefix: "o", noremap: false })),
    ("onoremap", 3, Cmd::Ex(ExKind::Map { prefix: "o", noremap: true })),
    ("imap", 2, Cmd::Ex(ExKind::Map { prefix: "i", noremap: false })),
    ("inoremap", 3, Cmd::Ex(ExKind::Map { prefix: "i", noremap: true })),
    ("cmap", 2, Cmd::Ex(ExKind::Map { prefix: "c", noremap: false })),
    ("cnoremap", 3, Cmd::Ex(ExKind::Map { prefix: "c", noremap: true })),
    ("lmap", 2, Cmd::Ex(ExKind::Map { prefix: "l", noremap: false })),
    ("lnoremap", 2, Cmd::Ex(ExKind::Map { prefix: "l", noremap: true })),
    ("unmap", 3, Cmd::Ex(ExKind::Unmap { prefix: "" })),
    ("nunmap", 3, Cmd::Ex(ExKind::Unmap { prefix: "n" })),
    ("vunmap", 2, Cmd::Ex(ExKind::Unmap { prefix: "v" })),
    ("xunmap", 2, Cmd::Ex(ExKind::Unmap { prefix: "x" })),
    ("sunmap", 4, Cmd::Ex(ExKind::Unmap { prefix: "s" })),
    ("ounmap", 2, Cmd::Ex(ExKind::Unmap { prefix: "o" })),
    ("iunmap", 2, Cmd::Ex(ExKind::Unmap { prefix: "i" })),
    ("cunmap", 2, Cmd::Ex(ExKind::Unmap { prefix: "c" })),
    ("mapclear", 4, Cmd::Ex(ExKind::MapClear { prefix: "" })),
    ("nmapclear", 5, Cmd::Ex(ExKind::MapClear { prefix: "n" })),
    ("vmapclear", 5, Cmd::Ex(ExKind::MapClear { prefix: "v" })),
    ("xmapclear", 5, Cmd::Ex(ExKind::MapClear { prefix: "x" })),
    ("smapclear", 5, Cmd::Ex(ExKind::MapClear { prefix: "s" })),
    ("omapclear", 5, Cmd::Ex(ExKind::MapClear { prefix: "o" })),
    ("imapclear", 5, Cmd::Ex(ExKind::MapClear { prefix: "i" })),
    ("cmapclear", 5, Cmd::Ex(ExKind::MapClear { prefix: "c" })),
    ("set", 2, Cmd::Ex(ExKind::Set)),
    ("setlocal", 4, Cmd::Ex(ExKind::Set)),
    ("setglobal", 4, Cmd::Ex(ExKind::Set)),
    ("normal", 4, Cmd::Ex(ExKind::Normal)),
    ("substitute", 1, Cmd::Ex(ExKind::Substitute)),
    ("delete", 1, Cmd::Ex(ExKind::Delete)),
    ("yank", 1, Cmd::Ex(ExKind::Yank)),
    ("put", 2, Cmd::Ex(ExKind::Put)),
    ("join", 1, Cmd::Ex(ExKind::Join)),
    ("startinsert", 4, Cmd::Ex(ExKind::StartInsert)),
    ("stopinsert", 5, Cmd::Ex(ExKind::StopInsert)),
    ("nohlsearch", 3, Cmd::Ex(ExKind::NoHlSearch)),
    ("registers", 3, Cmd::Ex(ExKind::Registers)),
    ("display", 2, Cmd::Ex(ExKind::Registers)),
    ("undo", 1, Cmd::Ex(ExKind::Undo)),
    ("redo", 3, Cmd::Ex(ExKind::Redo)),
];

fn lookup_command(word: &str) -> Option<Cmd> {
    COMMANDS
        .iter()
        .find(|(name, min, _)| word.len() >= *min && name.starts_with(word))
        .map(|(_, _, cmd)| *cmd)
}

/// For `exists(":cmd")`.
pub(super) fn is_command(word: &str) -> bool {
    lookup_command(word).is_some()
}

/// One command of a line, before block structure is built.
#[derive(Debug)]
enum Piece {
    Stmt(StmtKind),
    If(Expr),
    ElseIf(Expr),
    Else,
    EndIf,
    While(Expr),
    EndWhile,
    For(LetTarget, Expr),
    EndFor,
    Break,
    Continue,
    Function(FunctionHeader),
    EndFunction,
    Return(Option<Expr>),
    Try,
    Catch(Option<String>),
    Finally,
    EndTry,
}

#[derive(Debug)]
struct FunctionHeader {
    name: String,
    params: Vec<String>,
    varargs: bool,
    bang: bool,
}

/// Parses a whole script. Any syntax error fails the parse.
pub fn parse(src: &str) -> Result<Program> {
    let mut pieces = Vec::new();
    for (line, text) in logical_lines(src) {
        parse_line(&text, line, &mut pieces)?;
    }
    let mut builder = Builder {
        pieces: pieces.into_iter().peekable(),
        loops: 0,
        functions: 0,
    };
    let (body, end) = builder.block()?;
    if let Some((piece, location)) = end {
        return Err(misplaced(&piece).at(location));
    }
    Ok(Program { body })
}

/// Joins `\` continuation lines. Yields 1-based line numbers.
fn logical_lines(src: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (i, raw) in src.lines().enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let trimmed = raw.trim_start();
        if trimmed.starts_with("\"\\ ") {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('\\')
            && let Some((_, last)) = lines.last_mut()
        {
            last.push_str(rest);
            continue;
        }
        lines.push((i + 1, raw.to_string()));
    }
    lines
}

fn parse_line(text: &str, line: usize, out: &mut Vec<(Piece, Location)>) -> Result<()> {
    let mut cursor = Cursor::new(text);
    loop {
        while matches!(cursor.peek(), Some(' ' | '\t' | ':' | '|')) {
            cursor.bump();
        }
        if cursor.at_end() || cursor.peek() == Some('"') {
            return Ok(());
        }
        let location = Location::new(line, cursor.pos() + 1);
        let piece = parse_command(&mut cursor).map_err(|err| {
            // Expression errors point at where parsing stopped.
            let at = match err.kind {
                ScriptErrorKind::InvalidExpression(_) | ScriptErrorKind::MissingParen | ScriptErrorKind::MissingQuote(_) => {
                    Location::new(line, text[..cursor.pos()].chars().count() + 1)
                }
                _ => location,
            };
            err.at(at)
        })?;
        out.push((piece, location));
    }
}

fn parse_command(cursor: &mut Cursor<'_>) -> Result<Piece> {
    let range = parse_range(cursor)?;
    let start = cursor.pos();
    let word = match cursor.peek() {
        Some('>') => cursor.take_while(|c| c == '>'),
        Some('<') => cursor.take_while(|c| c == '<'),
        _ => cursor.take_while(|c| c.is_ascii_alphabetic()),
    };
    if word.is_empty() {
        if range.is_some() && cursor.at_command_end() {
            cursor.bump();
            return Ok(Piece::Stmt(StmtKind::Ex(ExCommand {
                range,
                kind: ExKind::Goto,
                bang: false,
                arg: String::new(),
            })));
        }
        return Err(ScriptErrorKind::NotACommand(cursor.rest().to_string()).into());
    }
    let cmd = if word.starts_with(['<', '>']) {
        Cmd::Ex(ExKind::Shift {
            left: word.starts_with('<'),
            amount: word.len(),
        })
    } else {
        lookup_command(word).ok_or_else(|| {
            cursor.set_pos(start);
            ScriptError::from(ScriptErrorKind::NotACommand(cursor.rest().trim_end().to_string()))
        })?
    };
    let bang = cursor.peek() == Some('!') && {
        cursor.bump();
        true
    };
    if range.is_some() && !matches!(cmd, Cmd::Ex(_) | Cmd::Call) {
        return Err(ScriptErrorKind::InvalidArgument("No range allowed".to_string()).into());
    }
    match cmd {
        Cmd::Let => parse_let(cursor),
        Cmd::Unlet => {
            let mut targets = Vec::new();
            loop {
                cursor.skip_ws();
                if cursor.at_command_end() {
                    break;
                }
                targets.push(parse_lvalue(cursor)?);
            }
            if targets.is_empty() {
                return Err(ScriptErrorKind::ArgumentRequired.into());
            }
            end_command(cursor)?;
            Ok(Piece::Stmt(StmtKind::Unlet { targets, bang }))
        }
        Cmd::If => single_expr(cursor).map(Piece::If),
        Cmd::ElseIf => single_expr(cursor).map(Piece::ElseIf),
        Cmd::While => single_expr(cursor).map(Piece::While),
        Cmd::For => parse_for(cursor),
        Cmd::Else => no_args(cursor, Piece::Else),
        Cmd::EndIf => no_args(cursor, Piece::EndIf),
        Cmd::EndWhile => no_args(cursor, Piece::EndWhile),
        Cmd::EndFor => no_args(cursor, Piece::EndFor),
        Cmd::Break => no_args(cursor, Piece::Break),
        Cmd::Continue => no_args(cursor, Piece::Continue),
        Cmd::EndFunction => no_args(cursor, Piece::EndFunction),
        Cmd::Try => no_args(cursor, Piece::Try),
        Cmd::Finally => no_args(cursor, Piece::Finally),
        Cmd::EndTry => no_args(cursor, Piece::EndTry),
        Cmd::Function => parse_function_header(cursor, bang),
        Cmd::Return => {
            cursor.skip_ws();
            if cursor.at_command_end() || cursor.peek() == Some('"') {
                end_command(cursor)?;
                return Ok(Piece::Return(None));
            }
            single_expr(cursor).map(|e| Piece::Return(Some(e)))
        }
        Cmd::DelFunction => {
            cursor.skip_ws();
            let name = cursor.scan_name();
            let name = if cursor.peek() == Some('.') {
                cursor.bump();
                format!("{name}.{}", cursor.scan_name())
            } else {
                name
            };
            if name.is_empty() {
                return Err(ScriptErrorKind::ArgumentRequired.into());
            }
            end_command(cursor)?;
            Ok(Piece::Stmt(StmtKind::DelFunction { name, bang }))
        }
        Cmd::Call => {
            let expr = single_expr(cursor)?;
            if !matches!(expr, Expr::Call(..) | Expr::Method { .. }) {
                return Err(ScriptErrorKind::FunctionNameRequired.into());
            }
            Ok(Piece::Stmt(StmtKind::Call(expr)))
        }
        Cmd::Echo(kind) => {
            let args = expr_list(cursor)?;
            Ok(Piece::Stmt(StmtKind::Echo { kind, args }))
        }
        Cmd::Execute => {
            let args = expr_list(cursor)?;
            Ok(Piece::Stmt(StmtKind::Execute(args)))
        }
        Cmd::Throw => single_expr(cursor).map(|e| Piece::Stmt(StmtKind::Throw(e))),
        Cmd::Catch => parse_catch(cursor),
        Cmd::Ex(kind) => {
            let arg = match kind {
                ExKind::Normal => {
                    cursor.skip_ws();
                    let rest = cursor.rest().to_string();
                    cursor.set_pos(cursor.pos() + rest.len());
                    rest
                }
                ExKind::Map { .. } | ExKind::Unmap { .. } => bar_argument(cursor, true),
                _ => bar_argument(cursor, false),
            };
            Ok(Piece::Stmt(StmtKind::Ex(ExCommand { range, kind, bang, arg })))
        }
    }
}

/// Consumes the end of a command: nothing, `|`, or a `"` comment.
fn end_command(cursor: &mut Cursor<'_>) -> Result<()> {
    cursor.skip_ws();
    match cursor.peek() {
        None => Ok(()),
        Some('|') => {
            cursor.bump();
            Ok(())
        }
        Some('"') => {
            let len = cursor.rest().len();
            cursor.set_pos(cursor.pos() + len);
            Ok(())
        }
        Some(_) => Err(ScriptErrorKind::TrailingCharacters(cursor.rest().to_string()).into()),
    }
}

fn no_args(cursor: &mut Cursor<'_>, piece: Piece) -> Result<Piece> {
    end_command(cursor)?;
    Ok(piece)
}

fn single_expr(cursor: &mut Cursor<'_>) -> Result<Expr> {
    cursor.skip_ws();
    if cursor.at_command_end() {
        return Err(ScriptErrorKind::ArgumentRequired.into());
    }
    let expr = cursor.parse_expr()?;
    end_command(cursor)?;
    Ok(expr)
}

/// Whitespace separated expressions up to the end of the command. A `"`
/// here starts a string, not a comment.
fn expr_list(cursor: &mut Cursor<'_>) -> Result<Vec<Expr>> {
    let mut args = Vec::new();
    loop {
        cursor.skip_ws();
        if cursor.at_command_end() {
            cursor.bump();
            return Ok(args);
        }
        args.push(cursor.parse_expr()?);
    }
}

/// The raw argument up to an unescaped `|`. With `unescape`, `\|` becomes
/// a literal bar.
fn bar_argument(cursor: &mut Cursor<'_>, unescape: bool) -> String {
    cursor.skip_ws();
    let mut out = String::new();
    while let Some(c) = cursor.bump() {
        match c {
            '\\' if cursor.peek() == Some('|') => {
                cursor.bump();
                if !unescape {
                    out.push('\\');
                }
                out.push('|');
            }
            '|' => break,
            c => out.push(c),
        }
    }
    out
}

fn parse_address(cursor: &mut Cursor<'_>) -> Result<Option<Address>> {
    let base = match cursor.peek() {
        Some(c) if c.is_ascii_digit() => {
            let digits = cursor.take_while(|c| c.is_ascii_digit());
            let n = digits.parse::<usize>().map_err(|_| ScriptError::from(ScriptErrorKind::InvalidArgument(digits.to_string())))?;
            AddressBase::Number(n)
        }
        Some('.') => {
            cursor.bump();
            AddressBase::Current
        }
        Some('$') => {
            cursor.bump();
            AddressBase::Last
        }
        Some('\'') => {
            cursor.bump();
            let mark = cursor.bump().ok_or(ScriptErrorKind::ArgumentRequired)?;
            AddressBase::Mark(mark)
        }
        Some('+' | '-') => AddressBase::Current,
        _ => return Ok(None),
    };
    let mut offset = 0i64;
    while let Some(sign @ ('+' | '-')) = cursor.peek() {
        cursor.bump();
        let digits = cursor.take_while(|c| c.is_ascii_digit());
        let n = if digits.is_empty() { 1 } else { digits.parse::<i64>().unwrap_or(0) };
        offset += if sign == '+' { n } else { -n };
    }
    Ok(Some(Address { base, offset }))
}

fn parse_range(cursor: &mut Cursor<'_>) -> Result<Option<LineRange>> {
    if cursor.peek() == Some('%') {
        cursor.bump();
        return Ok(Some(LineRange::Whole));
    }
    let Some(first) = parse_address(cursor)? else {
        return Ok(None);
    };
    if matches!(cursor.peek(), Some(',' | ';')) {
        cursor.bump();
        let second = parse_address(cursor)?.unwrap_or(Address {
            base: AddressBase::Current,
            offset: 0,
        });
        return Ok(Some(LineRange::Span(first, second)));
    }
    Ok(Some(LineRange::One(first)))
}

/// A variable, option, register, index or member that can be assigned.
fn parse_lvalue(cursor: &mut Cursor<'_>) -> Result<Expr> {
    cursor.skip_ws();
    let start = cursor.pos();
    let expr = cursor.parse_postfix()?;
    if is_assignable(&expr) {
        Ok(expr)
    } else {
        cursor.set_pos(start);
        Err(ScriptErrorKind::IllegalVariableName(cursor.rest().trim_end().to_string()).into())
    }
}

fn is_assignable(expr: &Expr) -> bool {
    match expr {
        Expr::Name(_) | Expr::Option(_) | Expr::Register(_) => true,
        Expr::Index(base, _) | Expr::Slice(base, ..) | Expr::Dot(base, _) => is_assignable(base),
        _ => false,
    }
}

fn parse_target(cursor: &mut Cursor<'_>) -> Result<LetTarget> {
    cursor.skip_ws();
    if cursor.peek() != Some('[') {
        return parse_lvalue(cursor).map(LetTarget::Single);
    }
    cursor.bump();
    let mut names = Vec::new();
    let mut rest = None;
    loop {
        cursor.skip_ws();
        match cursor.peek() {
            Some(']') => {
                cursor.bump();
                break;
            }
            Some(',') => {
                cursor.bump();
            }
            Some(';') => {
                cursor.bump();
                rest = Some(parse_lvalue(cursor)?);
            }
            Some(_) => names.push(parse_lvalue(cursor)?),
            None => return Err(cursor.invalid()),
        }
    }
    Ok(LetTarget::Unpack { names, rest })
}

fn parse_let(cursor: &mut Cursor<'_>) -> Result<Piece> {
    cursor.skip_ws();
    if cursor.at_command_end() {
        end_command(cursor)?;
        return Ok(Piece::Stmt(StmtKind::ShowVar(Vec::new())));
    }
    let target = parse_target(cursor)?;
    cursor.skip_ws();
    const OPS: [(&str, AssignOp); 8] = [
        ("..=", AssignOp::Concat),
        (".=", AssignOp::Concat),
        ("+=", AssignOp::Add),
        ("-=", AssignOp::Sub),
        ("*=", AssignOp::Mul),
        ("/=", AssignOp::Div),
        ("%=", AssignOp::Mod),
        ("=", AssignOp::Set),
    ];
    let op = OPS.iter().find(|(text, _)| cursor.rest().starts_with(text) && !cursor.rest().starts_with("=="));
    let Some((text, op)) = op else {
        if let LetTarget::Single(expr) = target {
            let mut names = vec![expr];
            loop {
                cursor.skip_ws();
                if cursor.at_command_end() || cursor.peek() == Some('"') {
                    break;
                }
                names.push(parse_lvalue(cursor)?);
            }
            end_command(cursor)?;
            return Ok(Piece::Stmt(StmtKind::ShowVar(names)));
        }
        return Err(cursor.invalid());
    };
    cursor.set_pos(cursor.pos() + text.len());
    let value = single_expr(cursor)?;
    Ok(Piece::Stmt(StmtKind::Let { target, op: *op, value }))
}

fn parse_for(cursor: &mut Cursor<'_>) -> Result<Piece> {
    let target = parse_target(cursor)?;
    cursor.skip_ws();
    if !cursor.eat_word("in") {
        return Err(ScriptErrorKind::InvalidArgument(format!("Missing \"in\" after :for {}", cursor.rest())).into());
    }
    let iter = single_expr(cursor)?;
    Ok(Piece::For(target, iter))
}

fn parse_function_header(cursor: &mut Cursor<'_>, bang: bool) -> Result<Piece> {
    cursor.skip_ws();
    if cursor.at_command_end() {
        end_command(cursor)?;
        return Ok(Piece::Stmt(StmtKind::ListFunctions));
    }
    let mut name = cursor.scan_name();
    while cursor.peek() == Some('.') {
        cursor.bump();
        name.push('.');
        name.push_str(&cursor.scan_name());
    }
    if name.is_empty() || cursor.peek() != Some('(') {
        return Err(ScriptErrorKind::InvalidArgument(cursor.rest().to_string()).into());
    }
    cursor.bump();
    let mut params = Vec::new();
    let mut varargs = false;
    loop {
        cursor.skip_ws();
        if cursor.eat("...") {
            varargs = true;
            cursor.skip_ws();
        }
        match cursor.peek() {
            Some(')') => {
                cursor.bump();
                break;
            }
            Some(',') if !varargs => {
                cursor.bump();
            }
            Some(c) if !varargs && (c.is_ascii_alphabetic() || c == '_') => {
                let param = cursor.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                if params.iter().any(|p| p == param) {
                    return Err(ScriptErrorKind::InvalidArgument(format!("E853: Duplicate argument name: {param}")).into());
                }
                params.push(param.to_string());
            }
            _ => return Err(ScriptErrorKind::MissingParen.into()),
        }
    }
    loop {
        cursor.skip_ws();
        if cursor.at_command_end() || cursor.peek() == Some('"') {
            break;
        }
        let attr = cursor.take_while(|c| c.is_ascii_alphabetic());
        if !matches!(attr, "abort" | "range" | "dict" | "closure") {
            return Err(ScriptErrorKind::TrailingCharacters(cursor.rest().to_string()).into());
        }
    }
    end_command(cursor)?;
    Ok(Piece::Function(FunctionHeader {
        name,
        params,
        varargs,
        bang,
    }))
}

/// `catch`, `catch /pattern/`.
fn parse_catch(cursor: &mut Cursor<'_>) -> Result<Piece> {
    cursor.skip_ws();
    if cursor.at_command_end() || cursor.peek() == Some('"') {
        end_command(cursor)?;
        return Ok(Piece::Catch(None));
    }
    let Some(delim) = cursor.bump() else {
        return Ok(Piece::Catch(None));
    };
    let mut pattern = String::new();
    loop {
        match cursor.bump() {
            Some('\\') => {
                let next = cursor.bump().unwrap_or('\\');
                if next != delim {
                    pattern.push('\\');
                }
                pattern.push(next);
            }
            Some(c) if c == delim => break,
            Some(c) => pattern.push(c),
            None => break,
        }
    }
    end_command(cursor)?;
    Ok(Piece::Catch(Some(pattern)))
}

fn misplaced(piece: &Piece) -> ScriptError {
    let (code, message) = match piece {
        Piece::ElseIf(_) => (582, ":elseif without :if"),
        Piece::Else => (581, ":else without :if"),
        Piece::EndIf => (580, ":endif without :if"),
        Piece::EndWhile => (588, ":endwhile without :while"),
        Piece::EndFor => (588, ":endfor without :for"),
        Piece::EndFunction => (193, ":endfunction not inside a function"),
        Piece::Catch(_) => (603, ":catch without :try"),
        Piece::Finally => (606, ":finally without :try"),
        Piece::EndTry => (602, ":endtry without :try"),
        _ => (488, "Trailing characters"),
    };
    ScriptErrorKind::Misplaced { code, message }.into()
}

type Terminator = Option<(Piece, Location)>;

struct Builder {
    pieces: std::iter::Peekable<std::vec::IntoIter<(Piece, Location)>>,
    loops: usize,
    functions: usize,
}

impl Builder {
    /// Statements up to the next block keyword that closes or continues an
    /// enclosing block. That keyword is returned.
    fn block(&mut self) -> Result<(Vec<Stmt>, Terminator)> {
        let mut body = Vec::new();
        while let Some((piece, location)) = self.pieces.next() {
            let kind = match piece {
                Piece::Stmt(kind) => kind,
                Piece::If(cond) => self.if_block(cond, location)?,
                Piece::While(cond) => {
                    let body = self.loop_body(location, "endwhile", |p| matches!(p, Piece::EndWhile))?;
                    StmtKind::While { cond, body }
                }
                Piece::For(target, iter) => {
                    let body = self.loop_body(location, "endfor", |p| matches!(p, Piece::EndFor))?;
                    StmtKind::For { target, iter, body }
                }
                Piece::Break | Piece::Continue if self.loops == 0 => {
                    let (code, message) = if matches!(piece, Piece::Break) {
                        (587, ":break without :while or :for")
                    } else {
                        (586, ":continue without :while or :for")
                    };
                    return Err(ScriptError::from(ScriptErrorKind::Misplaced { code, message }).at(location));
                }
                Piece::Break => StmtKind::Break,
                Piece::Continue => StmtKind::Continue,
                Piece::Return(_) if self.functions == 0 => {
                    return Err(ScriptError::from(ScriptErrorKind::ReturnOutsideFunction).at(location));
                }
                Piece::Return(value) => StmtKind::Return(value),
                Piece::Function(header) => self.function(header, location)?,
                Piece::Try => self.try_block(location)?,
                other => return Ok((body, Some((other, location)))),
            };
            body.push(Stmt { kind, location });
        }
        Ok((body, None))
    }

    fn if_block(&mut self, cond: Expr, location: Location) -> Result<StmtKind> {
        let mut branches = Vec::new();
        let mut cond = cond;
        loop {
            let (body, end) = self.block()?;
            branches.push((cond, body));
            match end {
                Some((Piece::ElseIf(next), _)) => cond = next,
                Some((Piece::Else, _)) => {
                    let (otherwise, end) = self.block()?;
                    return match end {
                        Some((Piece::EndIf, _)) => Ok(StmtKind::If {
                            branches,
                            otherwise: Some(otherwise),
                        }),
                        Some((piece, at)) => Err(misplaced(&piece).at(at)),
                        None => Err(missing(171, "endif", location)),
                    };
                }
                Some((Piece::EndIf, _)) => return Ok(StmtKind::If { branches, otherwise: None }),
                Some((piece, at)) => return Err(misplaced(&piece).at(at)),
                None => return Err(missing(171, "endif", location)),
            }
        }
    }

    fn loop_body(
        &mut self,
        location: Location,
        keyword: &'static str,
        is_end: impl Fn(&Piece) -> bool,
    ) -> Result<Vec<Stmt>> {
        self.loops += 1;
        let result = self.block();
        self.loops -= 1;
        match result? {
            (body, Some((piece, _))) if is_end(&piece) => Ok(body),
            (_, Some((piece, at))) => Err(misplaced(&piece).at(at)),
            (_, None) => Err(missing(170, keyword, location)),
        }
    }

    fn function(&mut self, header: FunctionHeader, location: Location) -> Result<StmtKind> {
        let loops = std::mem::replace(&mut self.loops, 0);
        self.functions += 1;
        let result = self.block();
        self.functions -= 1;
        self.loops = loops;
        let body = match result? {
            (body, Some((Piece::EndFunction, _))) => body,
            (_, Some((piece, at))) => return Err(misplaced(&piece).at(at)),
            (_, None) => return Err(missing(126, "endfunction", location)),
        };
        Ok(StmtKind::Function(Arc::new(FunctionDef {
            name: header.name,
            params: header.params,
            varargs: header.varargs,
            bang: header.bang,
            body: Arc::new(body),
        })))
    }

    fn try_block(&mut self, location: Location) -> Result<StmtKind> {
        let (body, mut end) = self.block()?;
        let mut catches = Vec::new();
        let mut finally = None;
        loop {
            match end {
                Some((Piece::Catch(pattern), _)) if finally.is_none() => {
                    let (catch_body, next) = self.block()?;
                    catches.push(Catch {
                        pattern,
                        body: catch_body,
                    });
                    end = next;
                }
                Some((Piece::Finally, _)) if finally.is_none() => {
                    let (finally_body, next) = self.block()?;
                    finally = Some(finally_body);
                    end = next;
                }
                Some((Piece::EndTry, _)) => {
                    return Ok(StmtKind::Try { body, catches, finally });
                }
                Some((piece, at)) => return Err(misplaced(&piece).at(at)),
                None => return Err(missing(600, "endtry", location)),
            }
        }
    }
}

fn missing(code: u16, keyword: &'static str, location: Location) -> ScriptError {
    ScriptError::from(ScriptErrorKind::MissingEnd { code, keyword }).at(location)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::vimscript::ast::{BinaryOp, CompareOp};

    fn kinds(src: &str) -> Vec<StmtKind> {
        parse(src).unwrap().body.into_iter().map(|s| s.kind).collect()
    }

    #[test]
    fn let_with_compound_assignment() {
        assert_eq!(
            kinds("let g:x += 2"),
            vec![StmtKind::Let {
                target: LetTarget::Single(Expr::Name("g:x".into())),
                op: AssignOp::Add,
                value: Expr::Number(2),
            }]
        );
    }

    #[test]
    fn bar_separates_commands() {
        let body = kinds("let a = 1 | let b = 'x|y' | echo a");
        assert_eq!(body.len(), 3);
        assert_eq!(
            body[1],
            StmtKind::Let {
                target: LetTarget::Single(Expr::Name("b".into())),
                op: AssignOp::Set,
                value: Expr::String("x|y".into()),
            }
        );
    }

    #[test]
    fn normal_takes_the_rest_of_the_line() {
        assert_eq!(
            kinds("norm! dd|x"),
            vec![StmtKind::Ex(ExCommand {
                range: None,
                kind: ExKind::Normal,
                bang: true,
                arg: "dd|x".into(),
            })]
        );
    }

    #[test]
    fn map_arguments_stop_at_bar() {
        let body = kinds("nnoremap <silent> x dd\\|y | echo 1");
        assert_eq!(
            body[0],
            StmtKind::Ex(ExCommand {
                range: None,
                kind: ExKind::Map { prefix: "n", noremap: true },
                bang: false,
                arg: "<silent> x dd|y ".into(),
            })
        );
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn abbreviations() {
        assert!(matches!(kinds("exe 'x'")[0], StmtKind::Execute(_)));
        assert!(matches!(
            kinds("ino jk <Esc>")[0],
            StmtKind::Ex(ExCommand { kind: ExKind::Map { prefix: "i", noremap: true }, .. })
        ));
        assert!(matches!(
            kinds("se ts=4")[0],
            StmtKind::Ex(ExCommand { kind: ExKind::Set, .. })
        ));
        assert!(matches!(
            kinds("fu! F()\nendf")[0],
            StmtKind::Function(_)
        ));
    }

    #[test]
    fn ranges() {
        let body = kinds("'<,'>s/a/b/g");
        let StmtKind::Ex(cmd) = &body[0] else { panic!("not an ex command") };
        assert_eq!(
            cmd.range,
            Some(LineRange::Span(
                Address { base: AddressBase::Mark('<'), offset: 0 },
                Address { base: AddressBase::Mark('>'), offset: 0 },
            ))
        );
        assert_eq!(cmd.kind, ExKind::Substitute);
        assert_eq!(cmd.arg, "/a/b/g");
        let body = kinds(".,.+2d");
        let StmtKind::Ex(cmd) = &body[0] else { panic!("not an ex command") };
        assert_eq!(
            cmd.range,
            Some(LineRange::Span(
                Address { base: AddressBase::Current, offset: 0 },
                Address { base: AddressBase::Current, offset: 2 },
            ))
        );
        assert!(matches!(kinds("5")[0], StmtKind::Ex(ExCommand { kind: ExKind::Goto, .. })));
        assert!(matches!(
            kinds(">>")[0],
            StmtKind::Ex(ExCommand { kind: ExKind::Shift { left: false, amount: 2 }, .. })
        ));
    }

    #[test]
    fn blocks_nest() {
        let src = "\
function! Fact(n) abort
  if a:n <= 1
    return 1
  endif
  return a:n * Fact(a:n - 1)
endfunction
";
        let body = kinds(src);
        let StmtKind::Function(def) = &body[0] else { panic!("not a function") };
        assert_eq!(def.name, "Fact");
        assert_eq!(def.params, vec!["n".to_string()]);
        assert_eq!(def.body.len(), 2);
        let StmtKind::If { branches, otherwise } = &def.body[0].kind else { panic!("not an if") };
        assert_eq!(branches.len(), 1);
        assert!(otherwise.is_none());
        assert!(matches!(
            branches[0].0,
            Expr::Compare { op: CompareOp::Le, .. }
        ));
    }

    #[test]
    fn continuation_lines_join() {
        let body = kinds("let x = 1\n      \\ + 2\n\"\\ comment\n");
        assert_eq!(
            body,
            vec![StmtKind::Let {
                target: LetTarget::Single(Expr::Name("x".into())),
                op: AssignOp::Set,
                value: Expr::Binary(BinaryOp::Add, Box::new(Expr::Number(1)), Box::new(Expr::Number(2))),
            }]
        );
    }

    #[test]
    fn try_catch_finally() {
        let body = kinds("try\n throw 'x'\ncatch /^x/\n echo 1\nfinally\n echo 2\nendtry");
        let StmtKind::Try { body, catches, finally } = &body[0] else { panic!("not a try") };
        assert_eq!(body.len(), 1);
        assert_eq!(catches[0].pattern.as_deref(), Some("^x"));
        assert!(finally.is_some());
    }

    #[test]
    fn syntax_errors_carry_locations() {
        let err = parse("let a = 1\nif 1\necho 2").unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::MissingEnd { code: 171, keyword: "endif" });
        assert_eq!(err.location, Some(Location::new(2, 1)));

        let err = parse("echo 1\n  endwhile").unwrap_err();
        assert!(matches!(err.kind, ScriptErrorKind::Misplaced { code: 588, .. }));
        assert_eq!(err.location, Some(Location::new(2, 3)));

        let err = parse("frobnicate").unwrap_err();
        assert!(matches!(err.kind, ScriptErrorKind::NotACommand(_)));

        let err = parse("return 1").unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::ReturnOutsideFunction);
    }

    #[test]
    fn expression_errors_point_at_the_bad_token() {
        let err = parse("let x = (1 +").unwrap_err();
        assert!(matches!(err.kind, ScriptErrorKind::InvalidExpression(_)));
        assert_eq!(err.location, Some(Location::new(1, 13)));

        let err = parse("echo 1\n  echo (2").unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::MissingParen);
        assert_eq!(err.location, Some(Location::new(2, 10)));

        let err = parse("echo 1 + ]").unwrap_err();
        assert!(matches!(err.kind, ScriptErrorKind::InvalidExpression(_)));
        assert_eq!(err.location, Some(Location::new(1, 10)));
    }

    #[test]
    fn comments() {
        assert!(kinds("\" just a comment").is_empty());
        assert_eq!(kinds("let x = 1 \" trailing").len(), 1);
    }
}
