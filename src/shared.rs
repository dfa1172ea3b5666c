//! State shared by every editing session: registers, mappings, options,
//! the last search and Vimscript globals.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::mapping::MappingTable;
use crate::options::Options;
use crate::register::{Register, RegisterType, Registers, WriteKind, is_valid_name};
use crate::search::SearchState;
use crate::traits::Clipboard;
use crate::vimscript::ScriptState;

/// Handle to process-wide state. Engines built from the same handle share
/// registers, mappings, options, search history and script globals.
pub type SharedHandle = Arc<Mutex<SharedState>>;

#[derive(Default)]
pub struct SharedState {
    pub registers: Registers,
    pub mappings: MappingTable,
    pub options: Options,
    pub search: SearchState,
    pub script: ScriptState,
    clipboard: Option<Box<dyn Clipboard>>,
}

impl fmt::Debug for SharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedState")
            .field("registers", &self.registers)
            .field("mappings", &self.mappings)
            .field("options", &self.options)
            .field("search", &self.search)
            .field("clipboard", &self.clipboard.is_some())
            .finish_non_exhaustive()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            search: SearchState::new(),
            ..Self::default()
        }
    }

    /// A fresh state behind the shared handle.
    pub fn handle() -> SharedHandle {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn set_clipboard(&mut self, clipboard: Box<dyn Clipboard>) {
        self.clipboard = Some(clipboard);
    }

    fn clipboard_get(&mut self) -> Option<Register> {
        let text = self.clipboard.as_mut()?.get()?;
        let kind = if text.ends_with('\n') {
            RegisterType::LineWise
        } else {
            RegisterType::CharWise
        };
        Some(Register::new(text, kind))
    }

    /// Reads a register, including the clipboard and `/`. `Ok(None)` means
    /// the register is empty.
    pub fn read_register(&mut self, name: char) -> Result<Option<Register>> {
        if !is_valid_name(name) {
            return Err(EngineError::InvalidRegister(name));
        }
        match name {
            '"' => match self.options.clipboard_register() {
                Some(_) if self.clipboard.is_some() => Ok(self.clipboard_get()),
                _ => Ok(self.registers.get('"')),
            },
            '+' | '*' => Ok(self.clipboard_get()),
            '/' => Ok(self.search.last_pattern.clone().map(Register::charwise)),
            '_' => Ok(None),
            _ => Ok(self.registers.get(name)),
        }
    }

    /// Writes a register. `None` is the unnamed register, redirected to the
    /// clipboard when the `clipboard` option asks for it.
    pub fn write_register(&mut self, name: Option<char>, reg: Register, kind: WriteKind) -> Result<()> {
        debug!(register = ?name, ?kind, len = reg.text.len(), "register write");
        let target = match name {
            None | Some('"') => self.options.clipboard_register(),
            Some(c @ ('+' | '*')) => Some(c),
            Some('/') => {
                let forward = self.search.last_forward;
                self.search.set_pattern(&reg.text, forward);
                return Ok(());
            }
            Some(c) if !is_valid_name(c) || matches!(c, '.' | ':') => {
                return Err(EngineError::InvalidRegister(c));
            }
            Some(_) => None,
        };
        if let Some(_clip) = target {
            if let Some(clipboard) = self.clipboard.as_mut() {
                clipboard.set(reg.text.clone());
            }
            let kind = if name.is_none() || name == Some('"') {
                kind
            } else {
                WriteKind::Set
            };
            return self.registers.store(None, reg, kind);
        }
        self.registers.store(name, reg, kind)
    }
}
