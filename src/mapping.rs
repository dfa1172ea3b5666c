//! The user mapping table and longest/shortest-prefix resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::key::{KeyEvent, keys_to_notation};
use crate::types::Mode;

bitflags::bitflags! {
    /// The modes a mapping applies in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapModes: u8 {
        const NORMAL     = 0b00_0001;
        const VISUAL     = 0b00_0010;
        const SELECT     = 0b00_0100;
        const OP_PENDING = 0b00_1000;
        const INSERT     = 0b01_0000;
        const CMDLINE    = 0b10_0000;
    }
}

const SINGLE_MODES: [MapModes; 6] = [
    MapModes::NORMAL,
    MapModes::VISUAL,
    MapModes::SELECT,
    MapModes::OP_PENDING,
    MapModes::INSERT,
    MapModes::CMDLINE,
];

impl MapModes {
    /// Modes covered by a `:{prefix}map` command, e.g. `n` for `:nmap`.
    /// `bang` selects `:map!` (insert and command line).
    pub fn from_prefix(prefix: &str, bang: bool) -> Option<Self> {
        Some(match (prefix, bang) {
            ("", false) => Self::NORMAL | Self::VISUAL | Self::SELECT | Self::OP_PENDING,
            ("", true) => Self::INSERT | Self::CMDLINE,
            ("n", false) => Self::NORMAL,
            ("v", false) => Self::VISUAL | Self::SELECT,
            ("x", false) => Self::VISUAL,
            ("s", false) => Self::SELECT,
            ("o", false) => Self::OP_PENDING,
            ("i", false) => Self::INSERT,
            ("c", false) => Self::CMDLINE,
            ("l", false) => Self::INSERT | Self::CMDLINE,
            _ => return None,
        })
    }

    /// The mapping mode consulted while the engine is in `mode`.
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Normal => Self::NORMAL,
            Mode::Visual(_) => Self::VISUAL,
            Mode::Select(_) => Self::SELECT,
            Mode::OperatorPending { .. } => Self::OP_PENDING,
            Mode::Insert | Mode::Replace => Self::INSERT,
            Mode::CmdLine(_) => Self::CMDLINE,
        }
    }

    fn index(self) -> usize {
        self.bits().trailing_zeros() as usize
    }

    /// The one-letter mode column shown by `:map`.
    pub fn display_char(self) -> &'static str {
        if self == Self::NORMAL | Self::VISUAL | Self::SELECT | Self::OP_PENDING {
            " "
        } else if self == Self::INSERT | Self::CMDLINE {
            "!"
        } else if self == Self::VISUAL | Self::SELECT {
            "v"
        } else if self == Self::NORMAL {
            "n"
        } else if self == Self::VISUAL {
            "x"
        } else if self == Self::SELECT {
            "s"
        } else if self == Self::OP_PENDING {
            "o"
        } else if self == Self::INSERT {
            "i"
        } else if self == Self::CMDLINE {
            "c"
        } else {
            "?"
        }
    }
}

/// What a mapping expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapRhs {
    Keys(Vec<KeyEvent>),
    /// A Vimscript expression evaluated when the mapping fires (`<expr>`).
    Expr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub lhs: Vec<KeyEvent>,
    pub rhs: MapRhs,
    /// The rhs as written, for `maparg()` and listings.
    pub rhs_text: String,
    pub modes: MapModes,
    pub remap: bool,
    pub silent: bool,
    pub nowait: bool,
    /// Defined with `<buffer>`: lives in one session's table.
    pub buffer: bool,
    /// Script that defined the mapping, for `<SID>` and `s:` in `<expr>`.
    pub sid: u32,
}

impl Mapping {
    pub fn describe(&self) -> String {
        let flag = if self.remap { " " } else { "*" };
        let local = if self.buffer { "@" } else { "" };
        format!(
            "{}  {:<12}{flag}{local}{}",
            self.modes.display_char(),
            keys_to_notation(&self.lhs),
            self.rhs_text
        )
    }
}

/// Result of looking up one key sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapLookup {
    None,
    /// Longer mappings start with the keys.
    Prefix,
    Exact(Arc<Mapping>),
    /// A mapping matches exactly and longer ones also start with the keys.
    ExactAndPrefix(Arc<Mapping>),
}

/// How the mapping layer should treat the front of the typeahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the first `len` keys with the mapping's expansion.
    Expand { len: usize, mapping: Arc<Mapping> },
    /// Ambiguous; wait for more keys or the timeout.
    Wait,
    /// The first key is not mapped.
    PassThrough,
}

#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    modes: [BTreeMap<Vec<KeyEvent>, Arc<Mapping>>; 6],
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a mapping in every mode it names.
    pub fn insert(&mut self, mapping: Mapping) {
        let mapping = Arc::new(mapping);
        for mode in SINGLE_MODES {
            if mapping.modes.contains(mode) {
                self.modes[mode.index()].insert(mapping.lhs.clone(), Arc::clone(&mapping));
            }
        }
    }

    pub fn contains(&self, modes: MapModes, lhs: &[KeyEvent]) -> bool {
        SINGLE_MODES
            .iter()
            .any(|m| modes.contains(*m) && self.modes[m.index()].contains_key(lhs))
    }

    /// Removes `lhs` from `modes`. Returns false when nothing was mapped.
    pub fn remove(&mut self, modes: MapModes, lhs: &[KeyEvent]) -> bool {
        let mut removed = false;
        for mode in SINGLE_MODES {
            if modes.contains(mode) {
                removed |= self.modes[mode.index()].remove(lhs).is_some();
            }
        }
        removed
    }

    pub fn clear(&mut self, modes: MapModes) {
        for mode in SINGLE_MODES {
            if modes.contains(mode) {
                self.modes[mode.index()].clear();
            }
        }
    }

    pub fn get(&self, mode: MapModes, lhs: &[KeyEvent]) -> Option<Arc<Mapping>> {
        SINGLE_MODES
            .iter()
            .filter(|m| mode.contains(**m))
            .find_map(|m| self.modes[m.index()].get(lhs).cloned())
    }

    /// Mappings in `modes` whose lhs starts with `prefix`, for `:map {lhs}`.
    pub fn list(&self, modes: MapModes, prefix: &[KeyEvent]) -> Vec<Arc<Mapping>> {
        let mut out: Vec<Arc<Mapping>> = Vec::new();
        for mode in SINGLE_MODES {
            if !modes.contains(mode) {
                continue;
            }
            for mapping in self.modes[mode.index()].values() {
                if mapping.lhs.starts_with(prefix) && !out.iter().any(|m| Arc::ptr_eq(m, mapping)) {
                    out.push(Arc::clone(mapping));
                }
            }
        }
        out
    }

    /// A mapping that conflicts with `lhs` in either direction (`mapcheck()`).
    pub fn conflicting(&self, mode: MapModes, lhs: &[KeyEvent]) -> Option<Arc<Mapping>> {
        SINGLE_MODES
            .iter()
            .filter(|m| mode.contains(**m))
            .flat_map(|m| self.modes[m.index()].values())
            .find(|mapping| mapping.lhs.starts_with(lhs) || lhs.starts_with(&mapping.lhs))
            .cloned()
    }

    /// Looks up `keys` in a single mode.
    pub fn lookup(&self, mode: MapModes, keys: &[KeyEvent]) -> MapLookup {
        Self::lookup_layered(&[self], mode, keys)
    }

    /// The mapping for exactly `keys`, and whether longer ones start with them.
    fn match_keys(&self, mode: MapModes, keys: &[KeyEvent]) -> (Option<Arc<Mapping>>, bool) {
        let Some(table) = self.modes.get(mode.index()) else {
            return (None, false);
        };
        let mut candidates = table
            .range(keys.to_vec()..)
            .take_while(|(lhs, _)| lhs.starts_with(keys));
        match candidates.next() {
            None => (None, false),
            Some((lhs, mapping)) if lhs.len() == keys.len() => {
                (Some(Arc::clone(mapping)), candidates.next().is_some())
            }
            Some(_) => (None, true),
        }
    }

    /// Looks up `keys` across `tables`. An exact match in an earlier table
    /// shadows the later ones; a longer mapping in any table makes the keys
    /// a prefix.
    pub fn lookup_layered(tables: &[&MappingTable], mode: MapModes, keys: &[KeyEvent]) -> MapLookup {
        let mut exact = None;
        let mut longer = false;
        for table in tables {
            let (found, more) = table.match_keys(mode, keys);
            if exact.is_none() {
                exact = found;
            }
            longer |= more;
        }
        match (exact, longer) {
            (None, false) => MapLookup::None,
            (None, true) => MapLookup::Prefix,
            (Some(mapping), false) => MapLookup::Exact(mapping),
            (Some(mapping), true) => MapLookup::ExactAndPrefix(mapping),
        }
    }

    /// Decides what to do with `keys`, the remappable run at the front of
    /// the typeahead. `open` means more typed keys could still extend the
    /// run. On timeout the shortest complete mapping wins; when the keys
    /// diverge from every mapping the longest complete one does.
    pub fn resolve(&self, mode: MapModes, keys: &[KeyEvent], open: bool, timed_out: bool) -> Resolution {
        Self::resolve_layered(&[self], mode, keys, open, timed_out)
    }

    /// [`MappingTable::resolve`] over several tables, earliest first.
    pub fn resolve_layered(
        tables: &[&MappingTable],
        mode: MapModes,
        keys: &[KeyEvent],
        open: bool,
        timed_out: bool,
    ) -> Resolution {
        let mut exact: Vec<(usize, Arc<Mapping>)> = Vec::new();
        let mut waiting = false;
        for len in 1..=keys.len() {
            match Self::lookup_layered(tables, mode, &keys[..len]) {
                MapLookup::None => {
                    waiting = false;
                    break;
                }
                MapLookup::Prefix => waiting = true,
                MapLookup::Exact(mapping) => {
                    exact.push((len, mapping));
                    waiting = false;
                    break;
                }
                MapLookup::ExactAndPrefix(mapping) => {
                    if mapping.nowait {
                        return Resolution::Expand { len, mapping };
                    }
                    exact.push((len, mapping));
                    waiting = true;
                }
            }
        }
        if waiting && open && !timed_out {
            return Resolution::Wait;
        }
        let chosen = if waiting && open {
            exact.into_iter().next()
        } else {
            exact.into_iter().last()
        };
        match chosen {
            Some((len, mapping)) => Resolution::Expand { len, mapping },
            None => Resolution::PassThrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::parse_keys;

    fn mapping(lhs: &str, rhs: &str, modes: MapModes) -> Mapping {
        Mapping {
            lhs: parse_keys(lhs),
            rhs: MapRhs::Keys(parse_keys(rhs)),
            rhs_text: rhs.to_string(),
            modes,
            remap: true,
            silent: false,
            nowait: false,
            buffer: false,
            sid: 0,
        }
    }

    #[test]
    fn lookup_classifies_prefixes() {
        let mut table = MappingTable::new();
        table.insert(mapping("jk", "<Esc>", MapModes::INSERT));
        table.insert(mapping("j", "x", MapModes::NORMAL));
        table.insert(mapping("jj", "y", MapModes::NORMAL));

        assert_eq!(table.lookup(MapModes::INSERT, &parse_keys("j")), MapLookup::Prefix);
        assert!(matches!(
            table.lookup(MapModes::INSERT, &parse_keys("jk")),
            MapLookup::Exact(_)
        ));
        assert!(matches!(
            table.lookup(MapModes::NORMAL, &parse_keys("j")),
            MapLookup::ExactAndPrefix(_)
        ));
        assert_eq!(table.lookup(MapModes::NORMAL, &parse_keys("k")), MapLookup::None);
    }

    #[test]
    fn resolve_waits_then_picks_shortest_on_timeout() {
        let mut table = MappingTable::new();
        table.insert(mapping("a", "1", MapModes::NORMAL));
        table.insert(mapping("abc", "2", MapModes::NORMAL));

        let keys = parse_keys("ab");
        assert_eq!(table.resolve(MapModes::NORMAL, &keys, true, false), Resolution::Wait);
        match table.resolve(MapModes::NORMAL, &keys, true, true) {
            Resolution::Expand { len, .. } => assert_eq!(len, 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn resolve_divergence_uses_longest_complete_prefix() {
        let mut table = MappingTable::new();
        table.insert(mapping("a", "1", MapModes::NORMAL));
        table.insert(mapping("ab", "2", MapModes::NORMAL));
        table.insert(mapping("abcd", "3", MapModes::NORMAL));

        match table.resolve(MapModes::NORMAL, &parse_keys("abcx"), true, false) {
            Resolution::Expand { len, .. } => assert_eq!(len, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            table.resolve(MapModes::NORMAL, &parse_keys("zz"), true, false),
            Resolution::PassThrough
        );
    }

    #[test]
    fn nowait_fires_immediately() {
        let mut table = MappingTable::new();
        let mut short = mapping("g", "x", MapModes::NORMAL);
        short.nowait = true;
        table.insert(short);
        table.insert(mapping("gg", "y", MapModes::NORMAL));
        assert!(matches!(
            table.resolve(MapModes::NORMAL, &parse_keys("g"), true, false),
            Resolution::Expand { len: 1, .. }
        ));
    }

    #[test]
    fn unmap_and_modes() {
        let mut table = MappingTable::new();
        table.insert(mapping("x", "y", MapModes::from_prefix("", false).unwrap()));
        assert!(table.contains(MapModes::VISUAL, &parse_keys("x")));
        assert!(table.remove(MapModes::NORMAL, &parse_keys("x")));
        assert!(!table.contains(MapModes::NORMAL, &parse_keys("x")));
        assert!(table.contains(MapModes::OP_PENDING, &parse_keys("x")));
        assert!(!table.remove(MapModes::INSERT, &parse_keys("x")));
    }

    #[test]
    fn earlier_table_shadows_later_one() {
        let mut local = MappingTable::new();
        let mut global = MappingTable::new();
        local.insert(mapping("x", "dd", MapModes::NORMAL));
        global.insert(mapping("x", "yy", MapModes::NORMAL));
        global.insert(mapping("xz", "p", MapModes::NORMAL));

        match MappingTable::lookup_layered(&[&local, &global], MapModes::NORMAL, &parse_keys("x")) {
            MapLookup::ExactAndPrefix(found) => assert_eq!(found.rhs_text, "dd"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            MappingTable::lookup_layered(&[&local], MapModes::NORMAL, &parse_keys("xz")),
            MapLookup::None
        );
    }
}
