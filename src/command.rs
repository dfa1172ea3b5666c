use crate::key::{KeyEvent, keys_to_notation};
use crate::operator::Operator;
use crate::types::{CmdLineKind, VisualKind};

/// A cursor motion or text object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    /// `<BS>`: left, wrapping to the previous line per `whichwrap`.
    WrapLeft,
    /// `<Space>`: right, wrapping to the next line per `whichwrap`.
    WrapRight,
    Up,
    Down,
    LineStart,
    FirstNonBlank,
    LineEnd,
    LastNonBlank,
    /// `|`
    Column,
    /// `+` and `<CR>`
    NextLine,
    /// `-`
    PrevLine,
    /// `_`, also used by doubled operators such as `dd`.
    CurrentLine,
    /// `gg`
    FirstLine,
    /// `G`
    LastLine,
    /// `%`: bracket match, or percentage of the file with a count.
    Percent,
    WordForward { big: bool },
    WordBackward { big: bool },
    WordEnd { big: bool },
    WordEndBackward { big: bool },
    Find { ch: char, forward: bool, till: bool },
    /// `;` and `,`
    RepeatFind { reverse: bool },
    /// `[(` `[{` `])` `]}`
    Unmatched { bracket: char },
    ParagraphForward,
    ParagraphBackward,
    Search { pattern: String, forward: bool },
    /// `n` and `N`
    SearchNext { reverse: bool },
    /// `*` `#` `g*` `g#`
    SearchWord { forward: bool, whole: bool },
    TextObject(TextObject),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObject {
    Word { inner: bool, big: bool },
    Block { inner: bool, open: char, close: char },
    Quote { inner: bool, quote: char },
    Paragraph { inner: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertCommand {
    /// `i`
    Before,
    /// `a`
    After,
    /// `I`
    FirstNonBlank,
    /// `gI`
    LineStart,
    /// `A`
    LineEnd,
    /// `o`
    OpenBelow,
    /// `O`
    OpenAbove,
}

/// Commands that are neither motions nor operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Insert(InsertCommand),
    ReplaceMode,
    Visual(VisualKind),
    Select(VisualKind),
    /// `<C-g>` between VISUAL and SELECT.
    ToggleSelect,
    /// `o` in VISUAL.
    SwapVisualEnds,
    ExitVisual,
    CmdLine(CmdLineKind),
    ReplaceChar(char),
    ToggleCase,
    Join { spaces: bool },
    Put { before: bool },
    Increment { negative: bool },
    Undo,
    Redo,
    Repeat,
    StartRecording(char),
    StopRecording,
    ExecuteRegister(char),
    /// `I` and `A` in VISUAL BLOCK.
    BlockInsert { append: bool },
    /// VISUAL `X` `D` `Y` `C` `S` `R`: the operator on whole selected lines.
    LinewiseSelection(Operator),
}

/// A fully resolved command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    pub count: Option<u32>,
    pub register: Option<char>,
    pub operator: Option<Operator>,
    pub motion: Option<Motion>,
    pub action: Option<Action>,
    /// The character argument of `f{c}`, `r{c}`, `q{r}`, `@{r}`.
    pub argument: Option<char>,
    /// Keys consumed to build the command, counts and register included.
    pub keys: Vec<KeyEvent>,
}

impl Command {
    pub fn count1(&self) -> usize {
        self.count.unwrap_or(1).max(1) as usize
    }

    /// True for commands `.` can repeat.
    pub fn is_repeatable(&self) -> bool {
        match (&self.operator, &self.action) {
            (Some(op), _) | (None, Some(Action::LinewiseSelection(op))) => *op != Operator::Yank,
            (None, Some(action)) => matches!(
                action,
                Action::Insert(_)
                    | Action::ReplaceMode
                    | Action::ReplaceChar(_)
                    | Action::ToggleCase
                    | Action::Join { .. }
                    | Action::Put { .. }
                    | Action::Increment { .. }
                    | Action::BlockInsert { .. }
            ),
            _ => false,
        }
    }

    pub fn notation(&self) -> String {
        keys_to_notation(&self.keys)
    }
}
