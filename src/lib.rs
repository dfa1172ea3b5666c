//! An editor-agnostic Vim engine.
//!
//! The host editor implements [`EditorOps`] over its own buffer and feeds
//! key events to an [`Engine`]. The engine owns modes, counts, operators,
//! registers, mappings, macros and a Vimscript interpreter; registers,
//! mappings, options and script globals live in a [`SharedState`] that
//! several engines may share.

#[cfg(feature = "clipboard")]
pub mod clipboard;
mod cmdline;
pub mod command;
mod edit;
pub mod engine;
pub mod error;
mod insert;
pub mod key;
mod keymap;
pub mod mapping;
mod mode;
mod motion;
mod normal;
pub mod operator;
pub mod options;
pub mod register;
mod resolver;
pub mod search;
pub mod shared;
pub mod traits;
pub mod types;
pub mod vimscript;

#[cfg(feature = "clipboard")]
pub use crate::clipboard::SystemClipboard;
pub use crate::command::{Action, Command, InsertCommand, Motion, TextObject};
pub use crate::engine::{Engine, EngineBuilder, EngineSnapshot, MAX_NORMAL_DEPTH};
pub use crate::error::{EngineError, PatternError, Result};
pub use crate::key::{InputEvent, KeyCode, KeyEvent, Modifiers, keys_to_notation, parse_keys};
pub use crate::mapping::{MapModes, MapRhs, Mapping};
pub use crate::operator::Operator;
pub use crate::options::{OptionError, OptionValue, Options};
pub use crate::register::{Register, RegisterType};
pub use crate::shared::{SharedHandle, SharedState};
pub use crate::traits::{Clipboard, EditorOps};
pub use crate::types::{CmdLineKind, Mode, MotionType, Offset, Position, Range, Selection, VisualKind};
pub use crate::vimscript::{ScriptError, ScriptErrorKind, Value};
