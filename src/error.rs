//! Error types for key resolution, motions, registers and patterns.

use thiserror::Error;

use crate::options::OptionError;
use crate::vimscript::ScriptError;

/// Errors surfaced by the engine. None of them is fatal: by the time one is
/// returned the session has already been restored to a consistent state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// No built-in command or mapping matches the typed sequence.
    #[error("no command for key sequence {keys}")]
    UnknownKeys { keys: String },

    /// The motion found no target; any pending operator was abandoned.
    #[error("motion failed")]
    MotionFailed,

    #[error("E223: recursive mapping")]
    RecursiveMapping,

    #[error("E169: Command too recursive")]
    MacroTooDeep,

    #[error("E192: Recursive use of :normal too deep")]
    NormalTooDeep,

    #[error("E354: Invalid register name: '{0}'")]
    InvalidRegister(char),

    #[error("E353: Nothing in register {0}")]
    EmptyRegister(char),

    #[error("E486: Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("E35: No previous regular expression")]
    NoPreviousPattern,

    #[error("E16: Invalid range")]
    InvalidRange,

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Option(#[from] OptionError),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Errors translating or compiling a Vim pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("E54: Unmatched \\(")]
    UnmatchedGroup,

    #[error("E867: unsupported pattern item: {0}")]
    Unsupported(String),

    #[error("E383: Invalid search string: {0}")]
    Compile(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
