//! Syntax tree produced by the parser.

use std::sync::Arc;

use super::error::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `.` and `..`
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Match,
    NoMatch,
    Is,
    IsNot,
}

/// Case handling requested by a `#` or `?` suffix; `None` follows
/// `ignorecase`.
pub type CaseSuffix = Option<bool>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(i64),
    Float(f64),
    String(String),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    /// A variable or function name with its scope prefix, e.g. `g:x`, `a:0`.
    Name(String),
    /// `&opt`, `&l:opt`, `&g:opt`.
    Option(String),
    /// `@r`.
    Register(char),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        ignore_case: CaseSuffix,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
    /// `a.b`: a Dictionary member when `a` is a Dictionary, otherwise
    /// concatenation with the variable `b`.
    Dot(Box<Expr>, String),
    Call(Box<Expr>, Vec<Expr>),
    /// `base->name(args)`.
    Method {
        base: Box<Expr>,
        name: Box<Expr>,
        args: Vec<Expr>,
    },
    Lambda(Vec<String>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LetTarget {
    Single(Expr),
    /// `[a, b; rest]`
    Unpack { names: Vec<Expr>, rest: Option<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoKind {
    Echo,
    Echon,
    Echomsg,
    Echoerr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// As written: `Name`, `s:Name`, `<SID>Name`, `dict.name`.
    pub name: String,
    pub params: Vec<String>,
    pub varargs: bool,
    pub bang: bool,
    pub body: Arc<Vec<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    /// `None` catches everything.
    pub pattern: Option<String>,
    pub body: Vec<Stmt>,
}

/// A line address in an ex range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressBase {
    /// 1-based.
    Number(usize),
    Current,
    Last,
    Mark(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub base: AddressBase,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRange {
    /// `%`
    Whole,
    One(Address),
    Span(Address, Address),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExKind {
    /// `map` family. `prefix` is the mode letter, empty for `:map`.
    Map { prefix: &'static str, noremap: bool },
    Unmap { prefix: &'static str },
    MapClear { prefix: &'static str },
    Set,
    Normal,
    Substitute,
    Delete,
    Yank,
    Put,
    Join,
    Shift { left: bool, amount: usize },
    /// A bare range: jump to its last line.
    Goto,
    StartInsert,
    StopInsert,
    NoHlSearch,
    Registers,
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExCommand {
    pub range: Option<LineRange>,
    pub kind: ExKind,
    pub bang: bool,
    pub arg: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Let {
        target: LetTarget,
        op: AssignOp,
        value: Expr,
    },
    /// `:let x` without a value lists the variable.
    ShowVar(Vec<Expr>),
    Unlet {
        targets: Vec<Expr>,
        bang: bool,
    },
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        target: LetTarget,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    Function(Arc<FunctionDef>),
    /// `:function` alone lists the user functions.
    ListFunctions,
    Return(Option<Expr>),
    DelFunction {
        name: String,
        bang: bool,
    },
    Call(Expr),
    Echo {
        kind: EchoKind,
        args: Vec<Expr>,
    },
    Execute(Vec<Expr>),
    Try {
        body: Vec<Stmt>,
        catches: Vec<Catch>,
        finally: Option<Vec<Stmt>>,
    },
    Throw(Expr),
    Ex(ExCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: Location,
}

/// A parsed script.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}
