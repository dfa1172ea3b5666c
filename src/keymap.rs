//! Built-in key bindings for normal, visual and operator-pending contexts.

use crate::command::{Action, InsertCommand, Motion, TextObject};
use crate::operator::Operator;
use crate::types::{CmdLineKind, VisualKind};

/// Which table a key sequence is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Normal,
    Visual,
    OpPending,
}

/// Commands that take the next key as their argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Await {
    Register,
    Find { forward: bool, till: bool },
    Replace,
    Record,
    Execute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Motion(Motion),
    TextObject(TextObject),
    Operator(Operator),
    /// `x`, `D`, `Y` and friends: an operator with a fixed motion.
    Sugar(Operator, Motion),
    Await(Await),
    Action(Action),
}

/// Multi-key sequences, for prefix detection.
const SEQUENCES: &[&str] = &[
    "gg", "ge", "gE", "g_", "gJ", "gI", "gh", "gH", "g<C-h>", "gu", "gU", "g~", "g?", "g*", "g#",
    "[(", "[{", "])", "]}",
];

const OBJECT_KEYS: &str = "wWbB()[]{}<>\"'`p";

pub fn lookup(ctx: Context, keys: &str, tildeop: bool) -> Option<Binding> {
    if let Some(motion) = motion(keys) {
        return Some(Binding::Motion(motion));
    }
    if ctx != Context::Normal
        && let Some(object) = text_object(keys)
    {
        return Some(Binding::TextObject(object));
    }
    match ctx {
        Context::Normal => normal(keys, tildeop),
        Context::Visual => visual(keys),
        Context::OpPending => pending(keys),
    }
}

/// True when `keys` starts a longer built-in sequence.
pub fn is_prefix(ctx: Context, keys: &str) -> bool {
    if SEQUENCES.iter().any(|s| s.len() > keys.len() && s.starts_with(keys)) {
        return true;
    }
    ctx != Context::Normal && (keys == "i" || keys == "a")
}

fn motion(keys: &str) -> Option<Motion> {
    Some(match keys {
        "h" | "<Left>" | "<C-h>" => Motion::Left,
        "l" | "<Right>" => Motion::Right,
        "<BS>" => Motion::WrapLeft,
        "<Space>" => Motion::WrapRight,
        "j" | "<Down>" | "<C-n>" | "<C-j>" => Motion::Down,
        "k" | "<Up>" | "<C-p>" => Motion::Up,
        "0" | "<Home>" => Motion::LineStart,
        "^" => Motion::FirstNonBlank,
        "$" | "<End>" => Motion::LineEnd,
        "g_" => Motion::LastNonBlank,
        "|" | "<Bar>" => Motion::Column,
        "+" | "<CR>" | "<C-m>" => Motion::NextLine,
        "-" => Motion::PrevLine,
        "_" => Motion::CurrentLine,
        "gg" => Motion::FirstLine,
        "G" => Motion::LastLine,
        "%" => Motion::Percent,
        "w" => Motion::WordForward { big: false },
        "W" => Motion::WordForward { big: true },
        "b" => Motion::WordBackward { big: false },
        "B" => Motion::WordBackward { big: true },
        "e" => Motion::WordEnd { big: false },
        "E" => Motion::WordEnd { big: true },
        "ge" => Motion::WordEndBackward { big: false },
        "gE" => Motion::WordEndBackward { big: true },
        ";" => Motion::RepeatFind { reverse: false },
        "," => Motion::RepeatFind { reverse: true },
        "[(" => Motion::Unmatched { bracket: '(' },
        "[{" => Motion::Unmatched { bracket: '{' },
        "])" => Motion::Unmatched { bracket: ')' },
        "]}" => Motion::Unmatched { bracket: '}' },
        "}" => Motion::ParagraphForward,
        "{" => Motion::ParagraphBackward,
        "n" => Motion::SearchNext { reverse: false },
        "N" => Motion::SearchNext { reverse: true },
        "*" => Motion::SearchWord { forward: true, whole: true },
        "#" => Motion::SearchWord { forward: false, whole: true },
        "g*" => Motion::SearchWord { forward: true, whole: false },
        "g#" => Motion::SearchWord { forward: false, whole: false },
        _ => return None,
    })
}

fn text_object(keys: &str) -> Option<TextObject> {
    let mut chars = keys.chars();
    let inner = match chars.next()? {
        'i' => true,
        'a' => false,
        _ => return None,
    };
    let rest = chars.as_str();
    let key = match rest {
        "<lt>" => '<',
        _ => {
            let mut rest = rest.chars();
            let c = rest.next()?;
            if rest.next().is_some() || !OBJECT_KEYS.contains(c) {
                return None;
            }
            c
        }
    };
    Some(match key {
        'w' => TextObject::Word { inner, big: false },
        'W' => TextObject::Word { inner, big: true },
        '(' | ')' | 'b' => TextObject::Block { inner, open: '(', close: ')' },
        '{' | '}' | 'B' => TextObject::Block { inner, open: '{', close: '}' },
        '[' | ']' => TextObject::Block { inner, open: '[', close: ']' },
        '<' | '>' => TextObject::Block { inner, open: '<', close: '>' },
        'p' => TextObject::Paragraph { inner },
        quote => TextObject::Quote { inner, quote },
    })
}

fn operator(keys: &str, tildeop: bool) -> Option<Operator> {
    Some(match keys {
        "d" => Operator::Delete,
        "y" => Operator::Yank,
        "c" => Operator::Change,
        "<lt>" => Operator::ShiftLeft,
        ">" => Operator::ShiftRight,
        "gu" => Operator::LowerCase,
        "gU" => Operator::UpperCase,
        "g~" => Operator::ToggleCase,
        "g?" => Operator::Rot13,
        "~" if tildeop => Operator::ToggleCase,
        _ => return None,
    })
}

fn common(keys: &str) -> Option<Binding> {
    Some(match keys {
        "f" => Binding::Await(Await::Find { forward: true, till: false }),
        "F" => Binding::Await(Await::Find { forward: false, till: false }),
        "t" => Binding::Await(Await::Find { forward: true, till: true }),
        "T" => Binding::Await(Await::Find { forward: false, till: true }),
        "r" => Binding::Await(Await::Replace),
        ":" => Binding::Action(Action::CmdLine(CmdLineKind::Command)),
        "/" => Binding::Action(Action::CmdLine(CmdLineKind::SearchForward)),
        "?" => Binding::Action(Action::CmdLine(CmdLineKind::SearchBackward)),
        "J" => Binding::Action(Action::Join { spaces: true }),
        "gJ" => Binding::Action(Action::Join { spaces: false }),
        "p" => Binding::Action(Action::Put { before: false }),
        "P" => Binding::Action(Action::Put { before: true }),
        _ => return None,
    })
}

/// Keys that complete an operator besides plain motions.
fn pending(keys: &str) -> Option<Binding> {
    match keys {
        "f" | "F" | "t" | "T" | "/" | "?" => common(keys),
        _ => None,
    }
}

fn normal(keys: &str, tildeop: bool) -> Option<Binding> {
    if let Some(op) = operator(keys, tildeop) {
        return Some(Binding::Operator(op));
    }
    if let Some(binding) = common(keys) {
        return Some(binding);
    }
    let action = |a| Some(Binding::Action(a));
    let insert = |i| Some(Binding::Action(Action::Insert(i)));
    match keys {
        "x" | "<Del>" => Some(Binding::Sugar(Operator::Delete, Motion::Right)),
        "X" => Some(Binding::Sugar(Operator::Delete, Motion::Left)),
        "D" => Some(Binding::Sugar(Operator::Delete, Motion::LineEnd)),
        "C" => Some(Binding::Sugar(Operator::Change, Motion::LineEnd)),
        "s" => Some(Binding::Sugar(Operator::Change, Motion::Right)),
        "S" => Some(Binding::Sugar(Operator::Change, Motion::CurrentLine)),
        "Y" => Some(Binding::Sugar(Operator::Yank, Motion::CurrentLine)),
        "i" | "<Insert>" => insert(InsertCommand::Before),
        "a" => insert(InsertCommand::After),
        "I" => insert(InsertCommand::FirstNonBlank),
        "gI" => insert(InsertCommand::LineStart),
        "A" => insert(InsertCommand::LineEnd),
        "o" => insert(InsertCommand::OpenBelow),
        "O" => insert(InsertCommand::OpenAbove),
        "R" => action(Action::ReplaceMode),
        "v" => action(Action::Visual(VisualKind::CharWise)),
        "V" => action(Action::Visual(VisualKind::LineWise)),
        "<C-v>" | "<C-q>" => action(Action::Visual(VisualKind::BlockWise)),
        "gh" => action(Action::Select(VisualKind::CharWise)),
        "gH" => action(Action::Select(VisualKind::LineWise)),
        "g<C-h>" => action(Action::Select(VisualKind::BlockWise)),
        "~" => action(Action::ToggleCase),
        "<C-a>" => action(Action::Increment { negative: false }),
        "<C-x>" => action(Action::Increment { negative: true }),
        "u" => action(Action::Undo),
        "<C-r>" => action(Action::Redo),
        "." => action(Action::Repeat),
        "q" => Some(Binding::Await(Await::Record)),
        "@" => Some(Binding::Await(Await::Execute)),
        _ => None,
    }
}

fn visual(keys: &str) -> Option<Binding> {
    if let Some(op) = operator(keys, true) {
        return Some(Binding::Operator(op));
    }
    if let Some(binding) = common(keys) {
        return Some(binding);
    }
    let action = |a| Some(Binding::Action(a));
    match keys {
        "x" | "<Del>" => Some(Binding::Operator(Operator::Delete)),
        "s" => Some(Binding::Operator(Operator::Change)),
        "u" => Some(Binding::Operator(Operator::LowerCase)),
        "U" => Some(Binding::Operator(Operator::UpperCase)),
        "X" | "D" => action(Action::LinewiseSelection(Operator::Delete)),
        "Y" => action(Action::LinewiseSelection(Operator::Yank)),
        "C" | "S" | "R" => action(Action::LinewiseSelection(Operator::Change)),
        "o" | "O" => action(Action::SwapVisualEnds),
        "v" => action(Action::Visual(VisualKind::CharWise)),
        "V" => action(Action::Visual(VisualKind::LineWise)),
        "<C-v>" | "<C-q>" => action(Action::Visual(VisualKind::BlockWise)),
        "<C-g>" => action(Action::ToggleSelect),
        "I" => action(Action::BlockInsert { append: false }),
        "A" => action(Action::BlockInsert { append: true }),
        "<C-a>" => action(Action::Increment { negative: false }),
        "<C-x>" => action(Action::Increment { negative: true }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_and_motions() {
        assert_eq!(lookup(Context::Normal, "d", false), Some(Binding::Operator(Operator::Delete)));
        assert_eq!(lookup(Context::Normal, "w", false), Some(Binding::Motion(Motion::WordForward { big: false })));
        assert_eq!(lookup(Context::Normal, "iw", false), None);
        assert_eq!(
            lookup(Context::OpPending, "i(", false),
            Some(Binding::TextObject(TextObject::Block { inner: true, open: '(', close: ')' }))
        );
        assert_eq!(
            lookup(Context::Visual, "a<lt>", false),
            Some(Binding::TextObject(TextObject::Block { inner: false, open: '<', close: '>' }))
        );
    }

    #[test]
    fn tilde_depends_on_tildeop() {
        assert_eq!(lookup(Context::Normal, "~", false), Some(Binding::Action(Action::ToggleCase)));
        assert_eq!(lookup(Context::Normal, "~", true), Some(Binding::Operator(Operator::ToggleCase)));
    }

    #[test]
    fn prefixes() {
        assert!(is_prefix(Context::Normal, "g"));
        assert!(is_prefix(Context::Normal, "["));
        assert!(!is_prefix(Context::Normal, "i"));
        assert!(is_prefix(Context::OpPending, "a"));
        assert!(!is_prefix(Context::Normal, "gg"));
    }
}
