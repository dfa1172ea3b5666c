//! Vim patterns compiled onto the `regex` crate, plus buffer searching and
//! substitute replacement expansion.

use regex::{Regex, RegexBuilder};
use tracing::trace;

use crate::error::PatternError;
use crate::options::Options;
use crate::traits::EditorOps;
use crate::types::Offset;

const MATCH_GROUP: &str = "vimmatch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Magic {
    Very,
    On,
    Off,
    VeryOff,
}

/// A pattern translated to regex syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    pub regex: String,
    /// Set by `\c` (true) or `\C` (false).
    pub ignore_case: Option<bool>,
    /// The pattern uses `\zs` or `\ze`, so the reported match is a group.
    pub has_match_group: bool,
}

struct Translator<'a> {
    units: Vec<(bool, char)>,
    pos: usize,
    magic: Magic,
    out: String,
    depth: usize,
    has_atom: bool,
    ignore_case: Option<bool>,
    zs: Option<usize>,
    ze: Option<usize>,
    top_level_alternation: bool,
    last_substitute: Option<&'a str>,
}

/// Translates Vim pattern syntax (magic by default) to `regex` syntax.
pub fn translate(src: &str, last_substitute: Option<&str>) -> Result<Translated, PatternError> {
    let mut units = Vec::new();
    let mut chars = src.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => units.push((true, next)),
                None => units.push((false, '\\')),
            }
        } else {
            units.push((false, c));
        }
    }
    let mut t = Translator {
        units,
        pos: 0,
        magic: Magic::On,
        out: String::new(),
        depth: 0,
        has_atom: false,
        ignore_case: None,
        zs: None,
        ze: None,
        top_level_alternation: false,
        last_substitute,
    };
    t.run()?;
    if t.depth != 0 {
        return Err(PatternError::UnmatchedGroup);
    }
    let has_match_group = t.zs.is_some() || t.ze.is_some();
    if has_match_group && t.top_level_alternation {
        return Err(PatternError::Unsupported("\\zs with \\|".into()));
    }
    let regex = if has_match_group {
        let start = t.zs.unwrap_or(0);
        let end = t.ze.unwrap_or(t.out.len()).max(start);
        format!(
            "{}(?P<{MATCH_GROUP}>{}){}",
            &t.out[..start],
            &t.out[start..end],
            &t.out[end..]
        )
    } else {
        t.out
    };
    Ok(Translated {
        regex,
        ignore_case: t.ignore_case,
        has_match_group,
    })
}

const OPERATORS: &str = "^$.*[~()|+?={@<>%";

impl Translator<'_> {
    fn is_special(&self, backslashed: bool, c: char) -> bool {
        if !OPERATORS.contains(c) {
            return false;
        }
        match self.magic {
            Magic::Very => !backslashed,
            Magic::On if "^$.*[~".contains(c) => !backslashed,
            Magic::Off if "^$".contains(c) => !backslashed,
            _ => backslashed,
        }
    }

    fn peek_special(&self, offset: usize, c: char) -> bool {
        self.units
            .get(self.pos + offset)
            .is_some_and(|&(b, u)| u == c && self.is_special(b, u))
    }

    fn run(&mut self) -> Result<(), PatternError> {
        while self.pos < self.units.len() {
            let (backslashed, c) = self.units[self.pos];
            self.pos += 1;
            if self.is_special(backslashed, c) {
                self.operator(c)?;
            } else if backslashed {
                self.escape(c)?;
            } else {
                self.literal(c);
            }
        }
        Ok(())
    }

    fn literal(&mut self, c: char) {
        self.out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
        self.has_atom = true;
    }

    fn atom(&mut self, s: &str) {
        self.out.push_str(s);
        self.has_atom = true;
    }

    fn operator(&mut self, c: char) -> Result<(), PatternError> {
        match c {
            '^' => {
                if self.has_atom {
                    self.literal('^');
                } else {
                    self.out.push('^');
                }
            }
            '$' => {
                let at_end = self.pos >= self.units.len()
                    || self.peek_special(0, '|')
                    || self.peek_special(0, ')')
                    || self.units.get(self.pos) == Some(&(true, 'n'));
                if at_end {
                    self.out.push('$');
                } else {
                    self.literal('$');
                }
            }
            '.' => self.atom("."),
            '*' | '+' | '?' | '=' if !self.has_atom => self.literal(c),
            '*' => self.out.push('*'),
            '+' => self.out.push('+'),
            '?' | '=' => self.out.push('?'),
            '{' if !self.has_atom => self.literal('{'),
            '{' => self.brace()?,
            '[' => self.collection(false)?,
            '~' => {
                let text = regex::escape(self.last_substitute.unwrap_or(""));
                self.atom(&format!("(?:{text})"));
            }
            '(' => {
                self.depth += 1;
                self.out.push('(');
                self.has_atom = false;
            }
            ')' => {
                if self.depth == 0 {
                    return Err(PatternError::UnmatchedGroup);
                }
                self.depth -= 1;
                self.atom(")");
            }
            '|' => {
                if self.depth == 0 {
                    self.top_level_alternation = true;
                }
                self.out.push('|');
                self.has_atom = false;
            }
            '<' => self.out.push_str(r"\b{start}"),
            '>' => self.out.push_str(r"\b{end}"),
            '%' => self.percent()?,
            '@' => return Err(PatternError::Unsupported("\\@".into())),
            _ => self.literal(c),
        }
        Ok(())
    }

    fn brace(&mut self) -> Result<(), PatternError> {
        let mut body = String::new();
        loop {
            match self.units.get(self.pos) {
                Some(&(_, '}')) => {
                    self.pos += 1;
                    break;
                }
                Some(&(_, c)) => {
                    body.push(c);
                    self.pos += 1;
                }
                None => return Err(PatternError::Unsupported("missing }".into())),
            }
        }
        let (lazy, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body.as_str()),
        };
        let quant = match body.split_once(',') {
            None if body.is_empty() => "*".to_string(),
            None => format!("{{{body}}}"),
            Some(("", "")) => "*".to_string(),
            Some(("", max)) => format!("{{0,{max}}}"),
            Some((min, max)) => format!("{{{min},{max}}}"),
        };
        if !body.chars().all(|c| c.is_ascii_digit() || c == ',') {
            return Err(PatternError::Unsupported(format!("\\{{{body}}}")));
        }
        self.out.push_str(&quant);
        if lazy {
            self.out.push('?');
        }
        Ok(())
    }

    fn percent(&mut self) -> Result<(), PatternError> {
        let Some(&(_, c)) = self.units.get(self.pos) else {
            return Err(PatternError::Unsupported("\\%".into()));
        };
        self.pos += 1;
        match c {
            '(' => {
                self.depth += 1;
                self.out.push_str("(?:");
                self.has_atom = false;
            }
            '^' => self.out.push_str(r"\A"),
            '$' => self.out.push_str(r"\z"),
            'd' | 'x' | 'u' | 'U' | 'o' => {
                let radix = match c {
                    'd' => 10,
                    'o' => 8,
                    _ => 16,
                };
                let mut digits = String::new();
                while let Some(&(false, d)) = self.units.get(self.pos)
                    && d.is_digit(radix)
                {
                    digits.push(d);
                    self.pos += 1;
                }
                let ch = u32::from_str_radix(&digits, radix)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| PatternError::Unsupported(format!("\\%{c}{digits}")))?;
                self.literal(ch);
            }
            other => return Err(PatternError::Unsupported(format!("\\%{other}"))),
        }
        Ok(())
    }

    fn escape(&mut self, c: char) -> Result<(), PatternError> {
        let class = match c {
            's' => r"[ \t]",
            'S' => r"[^ \t\n]",
            'd' => "[0-9]",
            'D' => r"[^0-9\n]",
            'w' => "[0-9A-Za-z_]",
            'W' => r"[^0-9A-Za-z_\n]",
            'a' => "[A-Za-z]",
            'A' => r"[^A-Za-z\n]",
            'l' => "[a-z]",
            'L' => r"[^a-z\n]",
            'u' => "[A-Z]",
            'U' => r"[^A-Z\n]",
            'x' => "[0-9A-Fa-f]",
            'X' => r"[^0-9A-Fa-f\n]",
            'o' => "[0-7]",
            'O' => r"[^0-7\n]",
            'h' => "[A-Za-z_]",
            'H' => r"[^A-Za-z_\n]",
            'k' | 'i' => r"\w",
            'K' | 'I' => r"[\w&&[^0-9]]",
            'f' => r"[0-9A-Za-z_./\-~]",
            'F' => r"[A-Za-z_./\-~]",
            'p' => "[[:print:]]",
            'P' => "[[:print:]&&[^0-9]]",
            'n' => r"\n",
            't' => r"\t",
            'e' => r"\x1b",
            'r' => r"\r",
            'b' => r"\x08",
            _ => "",
        };
        if !class.is_empty() {
            self.atom(class);
            return Ok(());
        }
        match c {
            'c' => self.ignore_case = Some(true),
            'C' => self.ignore_case = Some(false),
            'v' => self.magic = Magic::Very,
            'm' => self.magic = Magic::On,
            'M' => self.magic = Magic::Off,
            'V' => self.magic = Magic::VeryOff,
            'z' => {
                let next = self.units.get(self.pos).map(|u| u.1);
                self.pos += 1;
                if self.depth != 0 {
                    return Err(PatternError::Unsupported("\\z inside a group".into()));
                }
                match next {
                    Some('s') => self.zs = Some(self.out.len()),
                    Some('e') => self.ze = Some(self.out.len()),
                    other => {
                        return Err(PatternError::Unsupported(format!(
                            "\\z{}",
                            other.unwrap_or(' ')
                        )));
                    }
                }
            }
            '_' => {
                let Some(&(b, next)) = self.units.get(self.pos) else {
                    return Err(PatternError::Unsupported("\\_".into()));
                };
                self.pos += 1;
                match next {
                    '.' => self.atom("(?s:.)"),
                    '^' => self.out.push('^'),
                    '$' => self.out.push('$'),
                    '[' => self.collection(true)?,
                    _ if b => {
                        return Err(PatternError::Unsupported(format!("\\_\\{next}")));
                    }
                    _ => {
                        let start = self.out.len();
                        self.escape(next)?;
                        let class = self.out.split_off(start);
                        self.atom(&format!(r"(?:{class}|\n)"));
                    }
                }
            }
            '1'..='9' => return Err(PatternError::Unsupported(format!("\\{c}"))),
            _ => self.literal(c),
        }
        Ok(())
    }

    /// Translates `[...]`; an unterminated collection is a literal `[`.
    fn collection(&mut self, with_newline: bool) -> Result<(), PatternError> {
        let start = self.pos;
        let mut i = start;
        let mut negated = false;
        if self.units.get(i) == Some(&(false, '^')) {
            negated = true;
            i += 1;
        }
        let mut items = String::new();
        let mut first = true;
        loop {
            let Some(&(backslashed, c)) = self.units.get(i) else {
                self.pos = start;
                self.literal('[');
                return Ok(());
            };
            i += 1;
            if c == ']' && !backslashed && !first {
                break;
            }
            first = false;
            if c == '[' && !backslashed && self.units.get(i) == Some(&(false, ':')) {
                let rest: String = self.units[i..].iter().map(|u| u.1).collect();
                if let Some(end) = rest.find(":]") {
                    items.push_str(&format!("[{}]", &rest[..end + 1]));
                    i += rest[..end + 2].chars().count();
                    continue;
                }
            }
            let lit = if backslashed {
                match c {
                    'e' => '\x1b',
                    't' => '\t',
                    'r' => '\r',
                    'n' => '\n',
                    'b' => '\x08',
                    other => other,
                }
            } else {
                c
            };
            push_class_char(&mut items, lit);
            if self.units.get(i) == Some(&(false, '-'))
                && let Some(&(hb, hi)) = self.units.get(i + 1)
                && !(hi == ']' && !hb)
            {
                items.push('-');
                push_class_char(&mut items, hi);
                i += 2;
            }
        }
        self.pos = i;
        let newline = match (negated, with_newline) {
            (true, false) => r"\n",
            (false, true) => r"\n",
            _ => "",
        };
        let caret = if negated { "^" } else { "" };
        self.atom(&format!("[{caret}{items}{newline}]"));
        Ok(())
    }
}

fn push_class_char(out: &mut String, c: char) {
    if "[]\\&~-^".contains(c) {
        out.push('\\');
    }
    out.push(c);
}

/// A compiled search pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    has_match_group: bool,
}

impl Pattern {
    /// Compiles `src`. `ignorecase` applies unless the pattern says `\c`/`\C`;
    /// with `smartcase`, an uppercase letter makes the search case sensitive.
    pub fn new(
        src: &str,
        ignorecase: bool,
        smartcase: bool,
        last_substitute: Option<&str>,
    ) -> Result<Self, PatternError> {
        let translated = translate(src, last_substitute)?;
        let ignore = translated
            .ignore_case
            .unwrap_or_else(|| ignorecase && !(smartcase && has_uppercase(src)));
        let regex = RegexBuilder::new(&translated.regex)
            .case_insensitive(ignore)
            .multi_line(true)
            .build()
            .map_err(|err| PatternError::Compile(err.to_string()))?;
        Ok(Self {
            source: src.to_string(),
            regex,
            has_match_group: translated.has_match_group,
        })
    }

    /// Compiles with the case options taken from `options`.
    pub fn with_options(src: &str, options: &Options, smart: bool) -> Result<Self, PatternError> {
        Self::new(src, options.ignorecase(), smart && options.smartcase(), None)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Byte range of the first match at or after `start`, honouring `\zs`/`\ze`.
    pub fn find_at(&self, text: &str, start: usize) -> Option<(usize, usize)> {
        if self.has_match_group {
            let caps = self.regex.captures_at(text, start)?;
            let m = caps.name(MATCH_GROUP)?;
            Some((m.start(), m.end()))
        } else {
            self.regex.find_at(text, start).map(|m| (m.start(), m.end()))
        }
    }

    /// Capture groups `\0`..`\9` of the first match at or after `start`.
    pub fn captures_at(&self, text: &str, start: usize) -> Option<Submatches> {
        let caps = self.regex.captures_at(text, start)?;
        let whole = if self.has_match_group {
            caps.name(MATCH_GROUP)?
        } else {
            caps.get(0)?
        };
        let skip = self
            .regex
            .capture_names()
            .position(|name| name == Some(MATCH_GROUP));
        let mut groups = vec![Some(whole.as_str().to_string())];
        groups.extend(
            caps.iter()
                .enumerate()
                .skip(1)
                .filter(|(i, _)| Some(*i) != skip)
                .take(9)
                .map(|(_, g)| g.map(|m| m.as_str().to_string())),
        );
        Some(Submatches {
            range: (whole.start(), whole.end()),
            groups,
        })
    }

    /// Start offsets (in characters) of every match in `text`, overlapping
    /// matches included.
    pub fn match_starts(&self, text: &str) -> Vec<Offset> {
        let mut starts = Vec::new();
        let mut byte = 0;
        let mut char_index = 0;
        let mut scan = 0;
        while scan <= text.len() {
            let Some((start, _)) = self.find_at(text, scan) else {
                break;
            };
            let step = text[start..].chars().next().map_or(1, char::len_utf8);
            scan = start + step;
            if start < byte {
                continue;
            }
            char_index += text[byte..start].chars().count();
            byte = start;
            if starts.last() != Some(&char_index) {
                starts.push(char_index);
            }
        }
        starts
    }
}

/// One substitute match and its groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submatches {
    pub range: (usize, usize),
    pub groups: Vec<Option<String>>,
}

impl Submatches {
    pub fn group(&self, n: usize) -> &str {
        self.groups.get(n).and_then(|g| g.as_deref()).unwrap_or("")
    }
}

fn has_uppercase(src: &str) -> bool {
    let mut chars = src.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c.is_uppercase() {
            return true;
        }
    }
    false
}

/// The process-wide "last search" slot and related state.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub last_pattern: Option<String>,
    /// Direction of the last `/` or `?`.
    pub last_forward: bool,
    pub last_replacement: Option<String>,
    /// `:nohlsearch` clears this until the next search.
    pub highlight: bool,
}

impl SearchState {
    pub fn new() -> Self {
        Self {
            last_forward: true,
            ..Self::default()
        }
    }

    pub fn set_pattern(&mut self, pattern: &str, forward: bool) {
        self.last_pattern = Some(pattern.to_string());
        self.last_forward = forward;
        self.highlight = true;
    }
}

/// Result of a buffer search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub offset: Offset,
    pub wrapped: bool,
}

/// Finds the `count`-th match after (or before) `from`.
pub fn search_buffer(
    editor: &dyn EditorOps,
    pattern: &Pattern,
    from: Offset,
    forward: bool,
    count: usize,
    wrapscan: bool,
) -> Option<SearchHit> {
    let text = editor.text();
    let starts = pattern.match_starts(&text);
    trace!(pattern = pattern.source(), matches = starts.len(), "search");
    if starts.is_empty() {
        return None;
    }
    let mut pos = from;
    let mut wrapped = false;
    for _ in 0..count.max(1) {
        let next = if forward {
            starts.iter().copied().find(|&s| s > pos)
        } else {
            starts.iter().rev().copied().find(|&s| s < pos)
        };
        pos = match next {
            Some(s) => s,
            None if wrapscan => {
                wrapped = true;
                if forward { starts[0] } else { starts[starts.len() - 1] }
            }
            None => return None,
        };
    }
    Some(SearchHit {
        offset: pos,
        wrapped,
    })
}

/// Escapes text so it matches literally in a magic pattern.
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\/.*$^~[".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseMode {
    None,
    Upper,
    Lower,
}

/// Expands a `:s` replacement template against one match. `~` must already
/// have been resolved by [`resolve_tilde`].
pub fn expand_replacement(template: &str, subs: &Submatches) -> String {
    let mut out = String::new();
    let mut one_shot = CaseMode::None;
    let mut sticky = CaseMode::None;
    let push = |out: &mut String, text: &str, one_shot: &mut CaseMode, sticky: CaseMode| {
        for c in text.chars() {
            let c = match (*one_shot, sticky) {
                (CaseMode::Upper, _) => {
                    *one_shot = CaseMode::None;
                    c.to_uppercase().next().unwrap_or(c)
                }
                (CaseMode::Lower, _) => {
                    *one_shot = CaseMode::None;
                    c.to_lowercase().next().unwrap_or(c)
                }
                (_, CaseMode::Upper) => c.to_uppercase().next().unwrap_or(c),
                (_, CaseMode::Lower) => c.to_lowercase().next().unwrap_or(c),
                _ => c,
            };
            out.push(c);
        }
    };
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        match c {
            '&' => push(&mut out, subs.group(0), &mut one_shot, sticky),
            '\\' => match chars.next() {
                Some(d @ '0'..='9') => {
                    let n = d as usize - '0' as usize;
                    push(&mut out, subs.group(n), &mut one_shot, sticky);
                }
                Some('r' | 'n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('u') => one_shot = CaseMode::Upper,
                Some('l') => one_shot = CaseMode::Lower,
                Some('U') => sticky = CaseMode::Upper,
                Some('L') => sticky = CaseMode::Lower,
                Some('e' | 'E') => {
                    sticky = CaseMode::None;
                    one_shot = CaseMode::None;
                }
                Some(other) => push(&mut out, &other.to_string(), &mut one_shot, sticky),
                None => out.push('\\'),
            },
            '\r' => out.push('\n'),
            other => push(&mut out, &other.to_string(), &mut one_shot, sticky),
        }
    }
    out
}

/// Replaces unescaped `~` with the previous replacement string.
pub fn resolve_tilde(template: &str, previous: Option<&str>) -> String {
    let mut out = String::new();
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '~' => out.push_str(previous.unwrap_or("")),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn re(src: &str) -> String {
        translate(src, None).unwrap().regex
    }

    #[test]
    fn magic_translation() {
        assert_eq!(re(r"foo\+"), "foo+");
        assert_eq!(re(r"a\|b"), "a|b");
        assert_eq!(re(r"\(ab\)*"), "(ab)*");
        assert_eq!(re("a+b"), r"a\+b");
        assert_eq!(re(r"\<word\>"), r"\b{start}word\b{end}");
        assert_eq!(re(r"x\{2,3}"), "x{2,3}");
        assert_eq!(re(r"x\{-}"), "x*?");
        assert_eq!(re("^a$"), "^a$");
        assert_eq!(re("a^b$c"), r"a\^b\$c");
        assert_eq!(re("*a"), r"\*a");
    }

    #[test]
    fn very_magic_and_nomagic() {
        assert_eq!(re(r"\v(a|b)+"), "(a|b)+");
        assert_eq!(re(r"\Va.b"), r"a\.b");
        assert_eq!(re(r"\Ma*"), r"a\*");
    }

    #[test]
    fn collections() {
        assert_eq!(re("[abc]"), "[abc]");
        assert_eq!(re("[a-z]x"), "[a-z]x");
        assert_eq!(re("[^ ]"), r"[^ \n]");
        assert_eq!(re("[[:alpha:]]"), "[[:alpha:]]");
        assert_eq!(re("[abc"), r"\[abc");
    }

    #[test]
    fn zs_and_ze() {
        let p = Pattern::new(r"foo\zsbar", false, false, None).unwrap();
        assert_eq!(p.find_at("foobar", 0), Some((3, 6)));
        let p = Pattern::new(r"foo\zebar", false, false, None).unwrap();
        assert_eq!(p.find_at("foobar foo", 0), Some((0, 3)));
    }

    #[test]
    fn unsupported_items() {
        assert!(matches!(
            translate(r"\(a\)\1", None),
            Err(PatternError::Unsupported(_))
        ));
        assert_eq!(translate(r"\(a", None), Err(PatternError::UnmatchedGroup));
    }

    #[test]
    fn smartcase() {
        let p = Pattern::new("foo", true, true, None).unwrap();
        assert!(p.is_match("FOO"));
        let p = Pattern::new("Foo", true, true, None).unwrap();
        assert!(!p.is_match("FOO"));
        let p = Pattern::new(r"foo\C", true, false, None).unwrap();
        assert!(!p.is_match("FOO"));
    }

    #[test]
    fn overlapping_match_starts() {
        let p = Pattern::new("aa", false, false, None).unwrap();
        assert_eq!(p.match_starts("aaa"), vec![0, 1]);
        let p = Pattern::new("é", false, false, None).unwrap();
        assert_eq!(p.match_starts("aé bé"), vec![1, 4]);
    }

    #[test]
    fn replacement_expansion() {
        let p = Pattern::new(r"\(\w\+\) \(\w\+\)", false, false, None).unwrap();
        let subs = p.captures_at("hello world", 0).unwrap();
        assert_eq!(expand_replacement(r"\2 \1", &subs), "world hello");
        assert_eq!(expand_replacement(r"\u&", &subs), "Hello world");
        assert_eq!(expand_replacement(r"\U\1\E!", &subs), "HELLO!");
        assert_eq!(expand_replacement(r"a\rb", &subs), "a\nb");
        assert_eq!(resolve_tilde(r"x~\~", Some("prev")), r"xprev\~");
    }
}
