use std::fmt;

/// Key codes representing individual keys on the keyboard.
///
/// This enum provides a platform-agnostic representation of keys.
/// Hosts should map their platform-specific key events to these codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyCode {
    /// A character key. Uppercase letters are sent as uppercase chars;
    /// [`KeyEvent::normalized`] folds a redundant SHIFT into the char.
    Char(char),
    /// The Escape key, used to exit modes and cancel operations.
    Esc,
    /// The Enter/Return key.
    Enter,
    /// The Backspace key.
    Backspace,
    Tab,
    Delete,
    Insert,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function key `F1`..`F12`.
    F(u8),
}

bitflags::bitflags! {
    /// Keyboard modifier flags.
    ///
    /// These can be combined to represent multiple modifiers held simultaneously.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const META  = 0b1000;
    }
}

/// A key press event with optional modifiers.
///
/// This represents a single key press, including any modifier keys held down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyEvent {
    /// The key that was pressed.
    pub code: KeyCode,
    /// Modifier keys held during the key press.
    pub mods: Modifiers,
}

/// Input events that can be processed by the vim engine.
///
/// This enum distinguishes between key presses (resolved through mappings
/// and commands) and composed text input (inserted directly in insert and
/// command-line modes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A key press event, typically used for commands and navigation.
    Key(KeyEvent),
    /// A character received in text input mode (insert or command line).
    /// This allows hosts to handle composed characters and IME input.
    ReceivedChar(char),
}

impl From<KeyEvent> for InputEvent {
    fn from(key: KeyEvent) -> Self {
        InputEvent::Key(key)
    }
}

/// Special keys in the order used by the private-use text encoding.
const SPECIAL_CODES: [KeyCode; 14] = [
    KeyCode::Esc,
    KeyCode::Enter,
    KeyCode::Backspace,
    KeyCode::Tab,
    KeyCode::Delete,
    KeyCode::Insert,
    KeyCode::Left,
    KeyCode::Right,
    KeyCode::Up,
    KeyCode::Down,
    KeyCode::Home,
    KeyCode::End,
    KeyCode::PageUp,
    KeyCode::PageDown,
];

const SPECIAL_BASE: u32 = 0xE000;
const MODIFIED_CHAR_BASE: u32 = 0xF0000;

impl KeyEvent {
    pub const fn new(code: KeyCode, mods: Modifiers) -> Self {
        Self { code, mods }
    }

    /// A key without modifiers.
    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::empty())
    }

    pub const fn char(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }

    /// `<C-{c}>`.
    pub fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c.to_ascii_lowercase()), Modifiers::CTRL)
    }

    pub const fn esc() -> Self {
        Self::plain(KeyCode::Esc)
    }

    pub const fn enter() -> Self {
        Self::plain(KeyCode::Enter)
    }

    /// Canonical form used for mapping lookups: a SHIFT on a character key is
    /// folded into the character, and control characters are case-insensitive.
    pub fn normalized(self) -> Self {
        match self.code {
            KeyCode::Char(c) if self.mods.contains(Modifiers::CTRL) => Self::new(
                KeyCode::Char(c.to_ascii_lowercase()),
                self.mods - Modifiers::SHIFT,
            ),
            KeyCode::Char(c) if self.mods.contains(Modifiers::SHIFT) => {
                let upper = if c.is_lowercase() {
                    c.to_uppercase().next().unwrap_or(c)
                } else {
                    c
                };
                Self::new(KeyCode::Char(upper), self.mods - Modifiers::SHIFT)
            }
            _ => self,
        }
    }

    /// The character this key types, if it is a plain character key.
    pub fn printable(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c)
                if !self
                    .mods
                    .intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::META) =>
            {
                Some(c)
            }
            _ => None,
        }
    }

    pub fn is_esc(&self) -> bool {
        self.code == KeyCode::Esc || *self == Self::ctrl('[') || *self == Self::ctrl('c')
    }

    pub fn is_ctrl(&self, c: char) -> bool {
        *self == Self::ctrl(c)
    }

    /// The decimal digit typed by this key.
    pub fn digit(&self) -> Option<u32> {
        self.printable().and_then(|c| c.to_digit(10))
    }

    /// Encodes this key as a single character, the representation used for
    /// register contents and Vimscript strings such as `"\<Esc>"`.
    pub fn to_text_char(&self) -> char {
        let mods = self.mods - Modifiers::SHIFT;
        match self.code {
            KeyCode::Char(c) if mods.is_empty() => c,
            KeyCode::Char(c) if mods == Modifiers::CTRL => match c {
                'a'..='z' => char::from(c as u8 - b'a' + 1),
                '@' => '\0',
                '[' | '\\' | ']' | '^' | '_' => char::from(c as u8 - 0x40),
                _ => encode_modified_char(c, mods),
            },
            KeyCode::Char(c) => encode_modified_char(c, mods),
            KeyCode::Esc if mods.is_empty() => '\x1b',
            KeyCode::Enter if mods.is_empty() => '\r',
            KeyCode::Tab if mods.is_empty() => '\t',
            KeyCode::Backspace if mods.is_empty() => '\x08',
            code => {
                let index = match code {
                    KeyCode::F(n) => SPECIAL_CODES.len() as u32 + u32::from(n),
                    other => SPECIAL_CODES
                        .iter()
                        .position(|c| *c == other)
                        .map(|i| i as u32)
                        .unwrap_or(0),
                };
                char::from_u32(SPECIAL_BASE + (index << 4) + u32::from(self.mods.bits()))
                    .unwrap_or('\u{fffd}')
            }
        }
    }

    /// Decodes a character produced by [`KeyEvent::to_text_char`] (or typed
    /// literally into a register) back into a key event.
    pub fn from_text_char(c: char) -> Self {
        let code = c as u32;
        match c {
            '\x1b' => Self::esc(),
            '\r' | '\n' => Self::enter(),
            '\t' => Self::plain(KeyCode::Tab),
            '\x08' => Self::plain(KeyCode::Backspace),
            '\x7f' => Self::plain(KeyCode::Delete),
            '\0' => Self::new(KeyCode::Char('@'), Modifiers::CTRL),
            '\x01'..='\x1a' => Self::ctrl(char::from(code as u8 - 1 + b'a')),
            '\x1c'..='\x1f' => Self::new(KeyCode::Char(char::from(code as u8 + 0x40)), Modifiers::CTRL),
            _ if (SPECIAL_BASE..SPECIAL_BASE + 0x200).contains(&code) => {
                let offset = code - SPECIAL_BASE;
                let index = (offset >> 4) as usize;
                let mods = Modifiers::from_bits_truncate((offset & 0xf) as u8);
                let key = if index < SPECIAL_CODES.len() {
                    SPECIAL_CODES[index]
                } else {
                    KeyCode::F((index - SPECIAL_CODES.len()) as u8)
                };
                Self::new(key, mods)
            }
            _ if (MODIFIED_CHAR_BASE..MODIFIED_CHAR_BASE + 0x800).contains(&code) => {
                let offset = code - MODIFIED_CHAR_BASE;
                let mods = Modifiers::from_bits_truncate((offset >> 7) as u8);
                Self::new(KeyCode::Char(char::from((offset & 0x7f) as u8)), mods)
            }
            _ => Self::char(c),
        }
    }
}

fn encode_modified_char(c: char, mods: Modifiers) -> char {
    if c.is_ascii() {
        char::from_u32(MODIFIED_CHAR_BASE + (u32::from(mods.bits()) << 7) + c as u32).unwrap_or(c)
    } else {
        c
    }
}

/// Encodes keys as register/string text.
pub fn keys_to_text(keys: &[KeyEvent]) -> String {
    keys.iter().map(KeyEvent::to_text_char).collect()
}

/// Decodes register/string text into keys.
pub fn text_to_keys(text: &str) -> Vec<KeyEvent> {
    text.chars().map(KeyEvent::from_text_char).collect()
}

fn named_key(name: &str) -> Option<KeyCode> {
    let lower = name.to_ascii_lowercase();
    let code = match lower.as_str() {
        "esc" => KeyCode::Esc,
        "cr" | "enter" | "return" => KeyCode::Enter,
        "bs" | "backspace" => KeyCode::Backspace,
        "tab" => KeyCode::Tab,
        "del" | "delete" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "space" => KeyCode::Char(' '),
        "lt" => KeyCode::Char('<'),
        "bar" => KeyCode::Char('|'),
        "bslash" => KeyCode::Char('\\'),
        _ => {
            let n = lower.strip_prefix('f')?.parse::<u8>().ok()?;
            if (1..=12).contains(&n) {
                KeyCode::F(n)
            } else {
                return None;
            }
        }
    };
    Some(code)
}

/// Parses the inside of a `<...>` key name. `Ok(None)` means `<Nop>`.
fn parse_bracketed(inner: &str) -> Result<Option<KeyEvent>, ()> {
    if inner.eq_ignore_ascii_case("nop") {
        return Ok(None);
    }
    if inner.eq_ignore_ascii_case("nl") {
        return Ok(Some(KeyEvent::ctrl('j')));
    }
    if inner.eq_ignore_ascii_case("nul") {
        return Ok(Some(KeyEvent::new(KeyCode::Char('@'), Modifiers::CTRL)));
    }
    let mut mods = Modifiers::empty();
    let mut rest = inner;
    while rest.len() > 2 && rest.as_bytes()[1] == b'-' {
        let m = match rest.as_bytes()[0].to_ascii_lowercase() {
            b'c' => Modifiers::CTRL,
            b's' => Modifiers::SHIFT,
            b'a' => Modifiers::ALT,
            b'm' | b'd' => Modifiers::META,
            _ => break,
        };
        mods |= m;
        rest = &rest[2..];
    }
    let mut chars = rest.chars();
    let code = match (chars.next(), chars.next()) {
        (Some(c), None) if !mods.is_empty() => KeyCode::Char(c),
        _ => named_key(rest).ok_or(())?,
    };
    Ok(Some(KeyEvent::new(code, mods).normalized()))
}

/// Parses Vim key notation (`ihello<Esc>`, `<C-w>j`, `<lt>`), expanding
/// `<Leader>` to `leader`. Unknown `<...>` sequences are taken literally.
pub fn parse_keys_with_leader(notation: &str, leader: &str) -> Vec<KeyEvent> {
    let mut keys = Vec::new();
    let mut rest = notation;
    while let Some(c) = rest.chars().next() {
        if c == '<'
            && let Some(close) = rest[1..].find('>')
        {
            let inner = &rest[1..=close];
            if !inner.is_empty() && !inner.contains('<') {
                if inner.eq_ignore_ascii_case("leader") {
                    keys.extend(leader.chars().map(KeyEvent::char));
                    rest = &rest[close + 2..];
                    continue;
                }
                if let Ok(key) = parse_bracketed(inner) {
                    keys.extend(key);
                    rest = &rest[close + 2..];
                    continue;
                }
            }
        }
        keys.push(KeyEvent::from_text_char(c));
        rest = &rest[c.len_utf8()..];
    }
    keys
}

/// Parses Vim key notation with the default `\` leader.
pub fn parse_keys(notation: &str) -> Vec<KeyEvent> {
    parse_keys_with_leader(notation, "\\")
}

/// Renders keys in Vim notation, the inverse of [`parse_keys`].
pub fn keys_to_notation(keys: &[KeyEvent]) -> String {
    keys.iter().map(ToString::to_string).collect()
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.code {
            KeyCode::Char('<') => "lt".to_string(),
            KeyCode::Char(' ') => "Space".to_string(),
            KeyCode::Char('|') => "Bar".to_string(),
            KeyCode::Char(c) if self.mods.is_empty() => return write!(f, "{c}"),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Esc => "Esc".to_string(),
            KeyCode::Enter => "CR".to_string(),
            KeyCode::Backspace => "BS".to_string(),
            KeyCode::Tab => "Tab".to_string(),
            KeyCode::Delete => "Del".to_string(),
            KeyCode::Insert => "Insert".to_string(),
            KeyCode::Left => "Left".to_string(),
            KeyCode::Right => "Right".to_string(),
            KeyCode::Up => "Up".to_string(),
            KeyCode::Down => "Down".to_string(),
            KeyCode::Home => "Home".to_string(),
            KeyCode::End => "End".to_string(),
            KeyCode::PageUp => "PageUp".to_string(),
            KeyCode::PageDown => "PageDown".to_string(),
            KeyCode::F(n) => format!("F{n}"),
        };
        f.write_str("<")?;
        for (flag, prefix) in [
            (Modifiers::CTRL, "C-"),
            (Modifiers::SHIFT, "S-"),
            (Modifiers::ALT, "A-"),
            (Modifiers::META, "M-"),
        ] {
            if self.mods.contains(flag) {
                f.write_str(prefix)?;
            }
        }
        write!(f, "{name}>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_special_keys() {
        let keys = parse_keys("ihello<Esc>");
        assert_eq!(keys.len(), 7);
        assert_eq!(keys[0], KeyEvent::char('i'));
        assert_eq!(keys[6], KeyEvent::esc());
    }

    #[test]
    fn parses_modifiers_case_insensitively() {
        assert_eq!(parse_keys("<C-W>"), vec![KeyEvent::ctrl('w')]);
        assert_eq!(parse_keys("<c-w>"), vec![KeyEvent::ctrl('w')]);
        assert_eq!(
            parse_keys("<S-Left>"),
            vec![KeyEvent::new(KeyCode::Left, Modifiers::SHIFT)]
        );
    }

    #[test]
    fn unknown_brackets_are_literal() {
        let keys = parse_keys("<foo>");
        assert_eq!(keys.len(), 5);
        assert_eq!(keys[0], KeyEvent::char('<'));
        assert_eq!(parse_keys("<lt>"), vec![KeyEvent::char('<')]);
        assert!(parse_keys("<Nop>").is_empty());
    }

    #[test]
    fn leader_expands() {
        assert_eq!(
            parse_keys_with_leader("<Leader>w", ","),
            vec![KeyEvent::char(','), KeyEvent::char('w')]
        );
    }

    #[test]
    fn text_encoding_round_trips_special_keys() {
        let keys = vec![
            KeyEvent::char('x'),
            KeyEvent::esc(),
            KeyEvent::ctrl('r'),
            KeyEvent::plain(KeyCode::Left),
            KeyEvent::new(KeyCode::Right, Modifiers::SHIFT),
            KeyEvent::plain(KeyCode::F(5)),
            KeyEvent::new(KeyCode::Char('x'), Modifiers::ALT),
        ];
        assert_eq!(text_to_keys(&keys_to_text(&keys)), keys);
        assert_eq!(keys_to_text(&[KeyEvent::esc()]), "\x1b");
    }

    #[test]
    fn notation_round_trips() {
        let src = "d<lt>w<C-r><Esc><Space>";
        assert_eq!(keys_to_notation(&parse_keys(src)), "d<lt>w<C-r><Esc><Space>");
    }

    #[test]
    fn normalization_folds_shift() {
        let k = KeyEvent::new(KeyCode::Char('a'), Modifiers::SHIFT).normalized();
        assert_eq!(k, KeyEvent::char('A'));
        let k = KeyEvent::new(KeyCode::Char('W'), Modifiers::CTRL | Modifiers::SHIFT).normalized();
        assert_eq!(k, KeyEvent::ctrl('w'));
    }
}
