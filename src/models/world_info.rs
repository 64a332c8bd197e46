use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::transcript::MessageRole;

pub const DEFAULT_INSERTION_ORDER: i32 = 100;
pub const DEFAULT_PROBABILITY: i32 = 100;
pub const DEFAULT_ENTRY_DEPTH: i32 = 4;

/// Placement code in `extensions.position` that selects depth-relative
/// insertion instead of the coarse before/after buckets.
pub const AT_DEPTH_POSITION_CODE: i32 = 4;

fn default_true() -> bool {
    true
}

fn default_insertion_order() -> i32 {
    DEFAULT_INSERTION_ORDER
}

fn default_probability() -> i32 {
    DEFAULT_PROBABILITY
}

fn default_entry_depth() -> i32 {
    DEFAULT_ENTRY_DEPTH
}

/// Coarse placement field carried at the top level of an entry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryPosition {
    #[default]
    BeforeChar,
    AfterChar,
}

/// Combinator between the primary-key match and the secondary-key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectiveLogic {
    AndAny,
    NotAll,
    NotAny,
    AndAll,
}

impl SelectiveLogic {
    /// Decodes the numeric `selectiveLogic` wire code. Codes outside the
    /// known set return `None` and neutralize the carrying entry.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::AndAny),
            1 => Some(Self::NotAll),
            2 => Some(Self::NotAny),
            3 => Some(Self::AndAll),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::AndAny => 0,
            Self::NotAll => 1,
            Self::NotAny => 2,
            Self::AndAll => 3,
        }
    }
}

/// Resolved placement bucket for one activated entry, as handed to the
/// injection assembler.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    BeforeChar,
    AfterChar,
    AtDepth { depth: i32, role: MessageRole },
}

impl Placement {
    pub(crate) fn bucket_rank(self) -> u8 {
        match self {
            Self::BeforeChar => 0,
            Self::AfterChar => 1,
            Self::AtDepth { .. } => 2,
        }
    }
}

/// Tuning record of a world-info entry. Known fields get their documented
/// defaults when absent; unknown keys are kept in `extra` so they survive a
/// round-trip untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EntryExtensions {
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub exclude_recursion: bool,
    #[serde(default)]
    pub display_index: Option<i32>,
    #[serde(default = "default_probability")]
    pub probability: i32,
    #[serde(default = "default_true", rename = "useProbability")]
    pub use_probability: bool,
    #[serde(default = "default_entry_depth")]
    pub depth: i32,
    #[serde(default, rename = "selectiveLogic")]
    pub selective_logic: i32,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub group_override: bool,
    #[serde(default)]
    pub prevent_recursion: bool,
    #[serde(default)]
    pub scan_depth: Option<i32>,
    #[serde(default)]
    pub match_whole_words: Option<bool>,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    #[serde(default)]
    pub automation_id: String,
    #[serde(default)]
    pub role: i32,
    #[serde(default)]
    pub vectorized: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for EntryExtensions {
    fn default() -> Self {
        Self {
            position: 0,
            exclude_recursion: false,
            display_index: None,
            probability: DEFAULT_PROBABILITY,
            use_probability: true,
            depth: DEFAULT_ENTRY_DEPTH,
            selective_logic: 0,
            group: String::new(),
            group_override: false,
            prevent_recursion: false,
            scan_depth: None,
            match_whole_words: None,
            case_sensitive: None,
            automation_id: String::new(),
            role: 0,
            vectorized: false,
            extra: Map::new(),
        }
    }
}

/// One lorebook rule: trigger keys, injected content, placement, and tuning.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorldInfoEntry {
    pub id: i32,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub secondary_keys: Vec<String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub constant: bool,
    #[serde(default)]
    pub selective: bool,
    #[serde(default = "default_insertion_order")]
    pub insertion_order: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub position: EntryPosition,
    #[serde(default)]
    pub extensions: EntryExtensions,
}

impl WorldInfoEntry {
    /// Minimal entry with everything else at its documented default.
    #[must_use]
    pub fn new(id: i32, keys: Vec<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            keys,
            secondary_keys: Vec::new(),
            comment: String::new(),
            content: content.into(),
            constant: false,
            selective: false,
            insertion_order: DEFAULT_INSERTION_ORDER,
            enabled: true,
            position: EntryPosition::default(),
            extensions: EntryExtensions::default(),
        }
    }

    /// Decoded selective-logic combinator; `None` when the wire code is
    /// outside the known set.
    #[must_use]
    pub fn selective_logic(&self) -> Option<SelectiveLogic> {
        SelectiveLogic::from_code(self.extensions.selective_logic)
    }

    /// Resolved placement bucket. The numeric extension code wins when it
    /// selects the depth-relative bucket; otherwise the coarse position
    /// field applies.
    #[must_use]
    pub fn placement(&self) -> Placement {
        if self.extensions.position == AT_DEPTH_POSITION_CODE {
            Placement::AtDepth {
                depth: self.extensions.depth,
                role: MessageRole::from_entry_code(self.extensions.role).unwrap_or_default(),
            }
        } else {
            match self.position {
                EntryPosition::BeforeChar => Placement::BeforeChar,
                EntryPosition::AfterChar => Placement::AfterChar,
            }
        }
    }

    /// Whether the entry has at least one non-blank primary key. Entries
    /// without usable keys can never be triggered by scanning.
    #[must_use]
    pub fn has_usable_keys(&self) -> bool {
        self.keys.iter().any(|k| !k.trim().is_empty())
    }
}

/// A named, ordered collection of world-info entries. Books are independent
/// namespaces: entry ids must be unique within one book but may repeat
/// across books.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct WorldInfoBook {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entries: Vec<WorldInfoEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorldInfoBook {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn entry(&self, id: i32) -> Option<&WorldInfoEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entry ids that appear more than once, in first-seen order.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<i32> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for entry in &self.entries {
            if !seen.insert(entry.id) && !dupes.contains(&entry.id) {
                dupes.push(entry.id);
            }
        }
        dupes
    }
}
