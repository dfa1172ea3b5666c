use crate::operator::Operator;

/// A character offset into the host buffer.
pub type Offset = usize;

/// A position within a text buffer.
///
/// Positions are zero-indexed; columns are counted in characters from the
/// start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Zero-based line number.
    pub line: usize,
    /// Zero-based column.
    pub col: usize,
}

impl Position {
    /// The origin position (0, 0).
    pub const ZERO: Position = Position { line: 0, col: 0 };

    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// A range of text defined by start and end offsets.
///
/// Ranges are half-open intervals [start, end), meaning the start offset
/// is included but the end offset is excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    /// The start offset (inclusive).
    pub start: Offset,
    /// The end offset (exclusive).
    pub end: Offset,
}

impl Range {
    /// Builds a range from two offsets in either order.
    pub fn new(a: Offset, b: Offset) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub const fn empty(at: Offset) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, offset: Offset) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// The shape of a visual or select mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    /// Character-wise selection (v).
    CharWise,
    /// Line-wise selection (V).
    LineWise,
    /// Rectangular selection (CTRL-V).
    BlockWise,
}

impl VisualKind {
    pub fn motion_type(self) -> MotionType {
        match self {
            VisualKind::CharWise => MotionType::Inclusive,
            VisualKind::LineWise => MotionType::LineWise,
            VisualKind::BlockWise => MotionType::BlockWise,
        }
    }
}

/// Which prompt the command line is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmdLineKind {
    /// `:` ex command.
    Command,
    /// `/` forward search.
    SearchForward,
    /// `?` backward search.
    SearchBackward,
}

impl CmdLineKind {
    pub fn prompt(self) -> char {
        match self {
            CmdLineKind::Command => ':',
            CmdLineKind::SearchForward => '/',
            CmdLineKind::SearchBackward => '?',
        }
    }
}

/// The current mode of the vim engine.
///
/// Vim is a modal editor where the same keys perform different
/// actions depending on the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Normal mode - for navigation and operators.
    Normal,
    /// Insert mode - for typing text.
    Insert,
    /// Replace mode - typed text overwrites.
    Replace,
    /// Visual mode - for selecting text.
    Visual(VisualKind),
    /// Select mode - selection replaced by typed text.
    Select(VisualKind),
    /// An operator was typed and is waiting for its motion.
    OperatorPending { operator: Operator, count: u32 },
    /// Command-line or search prompt.
    CmdLine(CmdLineKind),
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::Replace => "REPLACE",
            Mode::Visual(VisualKind::CharWise) => "VISUAL",
            Mode::Visual(VisualKind::LineWise) => "VISUAL LINE",
            Mode::Visual(VisualKind::BlockWise) => "VISUAL BLOCK",
            Mode::Select(VisualKind::CharWise) => "SELECT",
            Mode::Select(VisualKind::LineWise) => "SELECT LINE",
            Mode::Select(VisualKind::BlockWise) => "SELECT BLOCK",
            Mode::OperatorPending { .. } => "OP PENDING",
            Mode::CmdLine(_) => "COMMAND",
        }
    }

    /// The short code returned by Vimscript's `mode()`.
    pub fn code(&self) -> &'static str {
        match self {
            Mode::Normal => "n",
            Mode::Insert => "i",
            Mode::Replace => "R",
            Mode::Visual(VisualKind::CharWise) => "v",
            Mode::Visual(VisualKind::LineWise) => "V",
            Mode::Visual(VisualKind::BlockWise) => "\x16",
            Mode::Select(VisualKind::CharWise) => "s",
            Mode::Select(VisualKind::LineWise) => "S",
            Mode::Select(VisualKind::BlockWise) => "\x13",
            Mode::OperatorPending { .. } => "no",
            Mode::CmdLine(_) => "c",
        }
    }

    pub fn visual_kind(&self) -> Option<VisualKind> {
        match self {
            Mode::Visual(kind) | Mode::Select(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_visual(&self) -> bool {
        matches!(self, Mode::Visual(_))
    }

    pub fn is_select(&self) -> bool {
        matches!(self, Mode::Select(_))
    }

    pub fn is_insert_like(&self) -> bool {
        matches!(self, Mode::Insert | Mode::Replace)
    }
}

/// How the end of a motion range is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionType {
    /// The character at the end offset is part of the range.
    Inclusive,
    /// The range stops before the end offset.
    Exclusive,
    /// The range covers whole lines.
    LineWise,
    /// The range is a rectangle of columns across lines.
    BlockWise,
}

/// A selection as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub range: Range,
    pub kind: VisualKind,
}
