//! Script errors. Every message carries the Vim error number users know.

use std::fmt;

use thiserror::Error;

use crate::error::{EngineError, PatternError};
use crate::options::OptionError;

/// Where in the script source a statement starts. Both fields are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptErrorKind {
    #[error("E15: Invalid expression: \"{0}\"")]
    InvalidExpression(String),

    #[error("E488: Trailing characters: {0}")]
    TrailingCharacters(String),

    #[error("E492: Not an editor command: {0}")]
    NotACommand(String),

    #[error("E471: Argument required")]
    ArgumentRequired,

    #[error("E475: Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("E114: Missing quote: {0}")]
    MissingQuote(String),

    #[error("E110: Missing ')'")]
    MissingParen,

    /// An unterminated block, e.g. `E171: Missing :endif`.
    #[error("E{code}: Missing :{keyword}")]
    MissingEnd { code: u16, keyword: &'static str },

    /// A block keyword without its opener, e.g. `E580: :endif without :if`.
    #[error("E{code}: {message}")]
    Misplaced { code: u16, message: &'static str },

    #[error("E121: Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("E461: Illegal variable name: {0}")]
    IllegalVariableName(String),

    #[error("E46: Cannot change read-only variable \"{0}\"")]
    ReadOnly(String),

    #[error("E108: No such variable: \"{0}\"")]
    NoSuchVariable(String),

    #[error("E117: Unknown function: {0}")]
    UnknownFunction(String),

    #[error("E130: Unknown function: {0}")]
    DeleteUnknownFunction(String),

    #[error("E118: Too many arguments for function: {0}")]
    TooManyArguments(String),

    #[error("E119: Not enough arguments for function: {0}")]
    NotEnoughArguments(String),

    #[error("E122: Function {0} already exists, add ! to replace it")]
    FunctionExists(String),

    #[error("E128: Function name must start with a capital or \"s:\": {0}")]
    FunctionName(String),

    #[error("E129: Function name required")]
    FunctionNameRequired,

    #[error("E132: Function call depth is higher than 'maxfuncdepth'")]
    FunctionDepth,

    #[error("E745: Using a List as a Number")]
    ListAsNumber,

    #[error("E728: Using a Dictionary as a Number")]
    DictAsNumber,

    #[error("E703: Using a Funcref as a Number")]
    FuncrefAsNumber,

    #[error("E805: Using a Float as a Number")]
    FloatAsNumber,

    #[error("E730: Using a List as a String")]
    ListAsString,

    #[error("E731: Using a Dictionary as a String")]
    DictAsString,

    #[error("E729: Using a Funcref as a String")]
    FuncrefAsString,

    #[error("E806: Using a Float as a String")]
    FloatAsString,

    #[error("E691: Can only compare List with List")]
    CompareList,

    #[error("E735: Can only compare Dictionary with Dictionary")]
    CompareDict,

    #[error("E694: Invalid operation for Funcrefs")]
    FuncrefOperation,

    #[error("E692: Invalid operation for List")]
    ListOperation,

    #[error("E736: Invalid operation for Dictionary")]
    DictOperation,

    #[error("E684: list index out of range: {0}")]
    IndexOutOfRange(i64),

    #[error("E716: Key not present in Dictionary: \"{0}\"")]
    KeyNotFound(String),

    #[error("E689: Can only index a List, Dictionary or String")]
    NotIndexable,

    #[error("E714: List required")]
    ListRequired,

    #[error("E715: Dictionary required")]
    DictRequired,

    #[error("E712: Argument of {0} must be a List or Dictionary")]
    ListOrDictRequired(String),

    #[error("E734: Wrong variable type for {0}=")]
    WrongVariableType(String),

    #[error("E687: Less targets than List items")]
    TooFewTargets,

    #[error("E688: More targets than List items")]
    TooManyTargets,

    #[error("E700: Unknown function: {0}")]
    NoSuchFunction(String),

    #[error("E31: No such mapping")]
    NoSuchMapping,

    #[error("E227: mapping already exists for {0}")]
    MappingExists(String),

    #[error("E133: :return not inside a function")]
    ReturnOutsideFunction,

    /// `:throw` of a value nobody caught.
    #[error("E605: Exception not caught: {0}")]
    Exception(String),

    /// `:echoerr`.
    #[error("{0}")]
    EchoErr(String),

    #[error(transparent)]
    Engine(Box<EngineError>),
}

/// A script failure with the location of the statement that raised it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}{}", format_location(.location))]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub location: Option<Location>,
}

fn format_location(location: &Option<Location>) -> String {
    location.map(|l| format!(" ({l})")).unwrap_or_default()
}

impl ScriptError {
    pub fn new(kind: ScriptErrorKind) -> Self {
        Self { kind, location: None }
    }

    /// Attaches `location` unless a nested statement already did.
    pub fn at(mut self, location: Location) -> Self {
        self.location.get_or_insert(location);
        self
    }

    /// The text `:catch` matches against and `v:exception` holds.
    pub fn exception_text(&self) -> String {
        match &self.kind {
            ScriptErrorKind::Exception(value) => value.clone(),
            kind => kind.to_string(),
        }
    }

    /// Recursion limits hit inside a script unwind as the engine error
    /// itself, so callers further out see the same error a key would raise.
    pub fn into_engine(self) -> EngineError {
        match self.kind {
            ScriptErrorKind::Engine(err)
                if matches!(
                    *err,
                    EngineError::NormalTooDeep | EngineError::MacroTooDeep | EngineError::RecursiveMapping
                ) =>
            {
                *err
            }
            _ => EngineError::Script(self),
        }
    }
}

impl From<ScriptErrorKind> for ScriptError {
    fn from(kind: ScriptErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<EngineError> for ScriptError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Script(inner) => inner,
            other => Self::new(ScriptErrorKind::Engine(Box::new(other))),
        }
    }
}

impl From<PatternError> for ScriptError {
    fn from(err: PatternError) -> Self {
        EngineError::Pattern(err).into()
    }
}

impl From<OptionError> for ScriptError {
    fn from(err: OptionError) -> Self {
        EngineError::Option(err).into()
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_is_appended_once() {
        let err = ScriptError::new(ScriptErrorKind::UndefinedVariable("x".into()))
            .at(Location::new(3, 5))
            .at(Location::new(1, 1));
        assert_eq!(err.to_string(), "E121: Undefined variable: x (line 3, col 5)");
    }

    #[test]
    fn thrown_values_are_caught_by_their_text() {
        let err = ScriptError::new(ScriptErrorKind::Exception("oops".into()));
        assert_eq!(err.exception_text(), "oops");
        let err = ScriptError::new(ScriptErrorKind::FunctionDepth);
        assert!(err.exception_text().starts_with("E132"));
    }

    #[test]
    fn recursion_errors_unwrap() {
        let err: ScriptError = EngineError::MacroTooDeep.into();
        assert_eq!(err.into_engine(), EngineError::MacroTooDeep);
        let err: ScriptError = EngineError::MotionFailed.into();
        assert!(matches!(err.into_engine(), EngineError::Script(_)));
    }
}
