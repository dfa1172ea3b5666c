//! Register storage: the unnamed register, yank and delete history, named
//! registers and the read-only registers.

use crate::error::{EngineError, Result};

/// How register content is put back into the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterType {
    CharWise,
    /// Text always ends with a newline.
    LineWise,
    /// Lines of the rectangle joined with newlines.
    BlockWise { width: usize },
}

impl RegisterType {
    /// The value returned by Vimscript's `getregtype()`.
    pub fn code(&self) -> String {
        match self {
            RegisterType::CharWise => "v".to_string(),
            RegisterType::LineWise => "V".to_string(),
            RegisterType::BlockWise { width } => format!("\x16{width}"),
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        match chars.next() {
            Some('v' | 'c') => Some(RegisterType::CharWise),
            Some('V' | 'l') => Some(RegisterType::LineWise),
            Some('\x16' | 'b') => Some(RegisterType::BlockWise {
                width: chars.as_str().parse().unwrap_or(0),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub text: String,
    pub kind: RegisterType,
    /// Filled by `q` recording rather than by a yank or delete.
    pub recorded: bool,
}

impl Register {
    pub fn new(text: impl Into<String>, kind: RegisterType) -> Self {
        let mut text = text.into();
        if kind == RegisterType::LineWise && !text.ends_with('\n') {
            text.push('\n');
        }
        Self {
            text,
            kind,
            recorded: false,
        }
    }

    pub fn charwise(text: impl Into<String>) -> Self {
        Self::new(text, RegisterType::CharWise)
    }

    pub fn linewise(text: impl Into<String>) -> Self {
        Self::new(text, RegisterType::LineWise)
    }

    fn append(&mut self, other: Register) {
        match (self.kind, other.kind) {
            (RegisterType::LineWise, RegisterType::LineWise) => self.text.push_str(&other.text),
            (RegisterType::LineWise, _) => {
                self.text.push_str(&other.text);
                self.text.push('\n');
            }
            (_, RegisterType::LineWise) => {
                self.text.push('\n');
                self.text.push_str(&other.text);
                self.kind = RegisterType::LineWise;
            }
            _ => self.text.push_str(&other.text),
        }
        self.recorded = other.recorded;
    }
}

/// What produced a register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Yank,
    /// A delete or change. `small` marks text within a single line.
    Delete { small: bool },
    /// `:let @r =`, `setreg()` and recording.
    Set,
}

pub fn is_valid_name(name: char) -> bool {
    name.is_ascii_alphanumeric() || "\"-_+*.:/".contains(name)
}

pub fn is_writable(name: char) -> bool {
    name.is_ascii_alphanumeric() || "\"-_+*/".contains(name)
}

#[derive(Debug, Clone, Default)]
pub struct Registers {
    unnamed: Option<Register>,
    /// `0` through `9`.
    numbered: [Option<Register>; 10],
    named: [Option<Register>; 26],
    small_delete: Option<Register>,
    last_inserted: Option<String>,
    last_command: Option<String>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores text. `None` and `"` both mean the unnamed register. Only
    /// unnamed deletes rotate the numbered registers.
    pub fn store(&mut self, name: Option<char>, reg: Register, kind: WriteKind) -> Result<()> {
        let name = match name {
            None | Some('"') => None,
            Some(c) => Some(c),
        };
        match name {
            None => {
                match kind {
                    WriteKind::Yank => self.numbered[0] = Some(reg.clone()),
                    WriteKind::Delete { small } => {
                        self.rotate(reg.clone());
                        if small {
                            self.small_delete = Some(reg.clone());
                        }
                    }
                    WriteKind::Set => {}
                }
                self.unnamed = Some(reg);
            }
            Some('_') => {}
            Some(c @ 'a'..='z') => {
                self.named[c as usize - 'a' as usize] = Some(reg.clone());
                self.unnamed = Some(reg);
            }
            Some(c @ 'A'..='Z') => {
                let slot = &mut self.named[c.to_ascii_lowercase() as usize - 'a' as usize];
                match slot {
                    Some(existing) => existing.append(reg),
                    None => *slot = Some(reg),
                }
                self.unnamed = slot.clone();
            }
            Some(c @ '0'..='9') => {
                self.numbered[c as usize - '0' as usize] = Some(reg.clone());
                self.unnamed = Some(reg);
            }
            Some('-') => {
                self.small_delete = Some(reg.clone());
                self.unnamed = Some(reg);
            }
            Some(c) => return Err(EngineError::InvalidRegister(c)),
        }
        Ok(())
    }

    fn rotate(&mut self, reg: Register) {
        for i in (2..=9).rev() {
            self.numbered[i] = self.numbered[i - 1].take();
        }
        self.numbered[1] = Some(reg);
    }

    pub fn get(&self, name: char) -> Option<Register> {
        match name {
            '"' => self.unnamed.clone(),
            'a'..='z' | 'A'..='Z' => {
                self.named[name.to_ascii_lowercase() as usize - 'a' as usize].clone()
            }
            '0'..='9' => self.numbered[name as usize - '0' as usize].clone(),
            '-' => self.small_delete.clone(),
            '.' => self.last_inserted.clone().map(Register::charwise),
            ':' => self.last_command.clone().map(Register::charwise),
            _ => None,
        }
    }

    pub fn set_last_inserted(&mut self, text: String) {
        self.last_inserted = Some(text);
    }

    pub fn set_last_command(&mut self, text: String) {
        self.last_command = Some(text);
    }

    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    /// Every stored register in `:registers` order.
    pub fn list(&self) -> Vec<(char, Register)> {
        let names = std::iter::once('"')
            .chain('0'..='9')
            .chain('a'..='z')
            .chain(['-', '.', ':']);
        names
            .filter_map(|name| self.get(name).map(|reg| (name, reg)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_delete_rotates_numbered() {
        let mut regs = Registers::new();
        for text in ["one\n", "two\n", "three\n"] {
            regs.store(None, Register::linewise(text), WriteKind::Delete { small: false })
                .unwrap();
        }
        assert_eq!(regs.get('1').unwrap().text, "three\n");
        assert_eq!(regs.get('2').unwrap().text, "two\n");
        assert_eq!(regs.get('3').unwrap().text, "one\n");
        assert_eq!(regs.get('"').unwrap().text, "three\n");
    }

    #[test]
    fn yank_sets_zero_only() {
        let mut regs = Registers::new();
        regs.store(None, Register::charwise("abc"), WriteKind::Yank).unwrap();
        assert_eq!(regs.get('0').unwrap().text, "abc");
        assert!(regs.get('1').is_none());
    }

    #[test]
    fn named_delete_does_not_rotate() {
        let mut regs = Registers::new();
        regs.store(Some('a'), Register::charwise("x"), WriteKind::Delete { small: true })
            .unwrap();
        assert!(regs.get('1').is_none());
        assert!(regs.get('-').is_none());
        assert_eq!(regs.get('a').unwrap().text, "x");
        assert_eq!(regs.get('"').unwrap().text, "x");
    }

    #[test]
    fn uppercase_appends() {
        let mut regs = Registers::new();
        regs.store(Some('a'), Register::charwise("foo"), WriteKind::Yank).unwrap();
        regs.store(Some('A'), Register::charwise("bar"), WriteKind::Yank).unwrap();
        assert_eq!(regs.get('a').unwrap().text, "foobar");

        regs.store(Some('A'), Register::linewise("baz"), WriteKind::Yank).unwrap();
        let reg = regs.get('a').unwrap();
        assert_eq!(reg.kind, RegisterType::LineWise);
        assert_eq!(reg.text, "foobar\nbaz\n");
    }

    #[test]
    fn black_hole_and_invalid() {
        let mut regs = Registers::new();
        regs.store(Some('_'), Register::charwise("gone"), WriteKind::Delete { small: true })
            .unwrap();
        assert!(regs.get('"').is_none());
        assert_eq!(
            regs.store(Some('!'), Register::charwise("x"), WriteKind::Yank),
            Err(EngineError::InvalidRegister('!'))
        );
    }

    #[test]
    fn register_type_codes() {
        assert_eq!(RegisterType::BlockWise { width: 3 }.code(), "\x163");
        assert_eq!(RegisterType::from_code("V"), Some(RegisterType::LineWise));
    }
}
