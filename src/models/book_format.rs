use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::world_info::{
    AT_DEPTH_POSITION_CODE, DEFAULT_ENTRY_DEPTH, DEFAULT_INSERTION_ORDER, DEFAULT_PROBABILITY,
    EntryExtensions, EntryPosition, Placement, WorldInfoBook, WorldInfoEntry,
};

fn default_true() -> bool {
    true
}

fn default_order() -> i32 {
    DEFAULT_INSERTION_ORDER
}

fn default_probability() -> i32 {
    DEFAULT_PROBABILITY
}

fn default_depth() -> i32 {
    DEFAULT_ENTRY_DEPTH
}

/// Standalone lorebook exchange document: a map of entries keyed by uid,
/// with the tuning fields spelled top-level in camelCase rather than nested
/// under `extensions` as the card-embedded shape does.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BookFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub entries: HashMap<String, BookFileEntry>,
}

/// One entry of the exchange format. `disable` is the inverse of the
/// canonical `enabled` flag; `position` is a numeric placement code.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BookFileEntry {
    #[serde(default)]
    pub uid: Option<i32>,
    #[serde(default)]
    pub key: Vec<String>,
    #[serde(default)]
    pub keysecondary: Vec<String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub disable: bool,
    #[serde(default)]
    pub constant: bool,
    #[serde(default)]
    pub selective: bool,
    #[serde(default = "default_order")]
    pub order: i32,
    #[serde(default)]
    pub position: i32,
    #[serde(default, rename = "selectiveLogic")]
    pub selective_logic: i32,
    #[serde(default = "default_probability")]
    pub probability: i32,
    #[serde(default = "default_true", rename = "useProbability")]
    pub use_probability: bool,
    #[serde(default = "default_depth")]
    pub depth: i32,
    #[serde(default)]
    pub group: String,
    #[serde(default, rename = "groupOverride")]
    pub group_override: bool,
    #[serde(default, rename = "excludeRecursion")]
    pub exclude_recursion: bool,
    #[serde(default, rename = "preventRecursion")]
    pub prevent_recursion: bool,
    #[serde(default, rename = "scanDepth")]
    pub scan_depth: Option<i32>,
    #[serde(default, rename = "caseSensitive")]
    pub case_sensitive: Option<bool>,
    #[serde(default, rename = "matchWholeWords")]
    pub match_whole_words: Option<bool>,
    #[serde(default, rename = "automationId")]
    pub automation_id: String,
    #[serde(default)]
    pub role: Option<i32>,
    #[serde(default)]
    pub vectorized: bool,
    #[serde(default, rename = "displayIndex")]
    pub display_index: Option<i32>,
    #[serde(default, rename = "addMemo")]
    pub add_memo: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BookFile {
    /// Converts the keyed exchange document into a canonical book, resolving
    /// uids from the entry, its map key, or a fresh id past the maximum, and
    /// ordering entries by uid for determinism.
    #[must_use]
    pub fn into_book(self, fallback_name: &str) -> WorldInfoBook {
        let mut resolved: Vec<(Option<i32>, BookFileEntry)> = self
            .entries
            .into_iter()
            .map(|(map_key, entry)| {
                let uid = entry.uid.or_else(|| map_key.parse().ok());
                (uid, entry)
            })
            .collect();

        let mut next_id = resolved
            .iter()
            .filter_map(|(uid, _)| *uid)
            .max()
            .map_or(0, |max| max + 1);
        let mut keyed: Vec<(i32, BookFileEntry)> = resolved
            .drain(..)
            .map(|(uid, entry)| {
                let uid = uid.unwrap_or_else(|| {
                    let assigned = next_id;
                    next_id += 1;
                    assigned
                });
                (uid, entry)
            })
            .collect();
        keyed.sort_by_key(|(uid, _)| *uid);

        WorldInfoBook {
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| fallback_name.to_string()),
            entries: keyed
                .into_iter()
                .map(|(uid, entry)| entry.into_entry(uid))
                .collect(),
            extra: Map::new(),
        }
    }

    /// Export projection of a canonical book.
    #[must_use]
    pub fn from_book(book: &WorldInfoBook) -> Self {
        let entries = book
            .entries
            .iter()
            .map(|entry| (entry.id.to_string(), BookFileEntry::from_entry(entry)))
            .collect();
        Self {
            name: Some(book.name.clone()).filter(|n| !n.is_empty()),
            description: None,
            entries,
        }
    }
}

impl BookFileEntry {
    fn into_entry(self, uid: i32) -> WorldInfoEntry {
        WorldInfoEntry {
            id: uid,
            keys: self.key,
            secondary_keys: self.keysecondary,
            comment: self.comment,
            content: self.content,
            constant: self.constant,
            selective: self.selective,
            insertion_order: self.order,
            enabled: !self.disable,
            position: if self.position == 1 {
                EntryPosition::AfterChar
            } else {
                EntryPosition::BeforeChar
            },
            extensions: EntryExtensions {
                position: self.position,
                exclude_recursion: self.exclude_recursion,
                display_index: self.display_index,
                probability: self.probability,
                use_probability: self.use_probability,
                depth: self.depth,
                selective_logic: self.selective_logic,
                group: self.group,
                group_override: self.group_override,
                prevent_recursion: self.prevent_recursion,
                scan_depth: self.scan_depth,
                match_whole_words: self.match_whole_words,
                case_sensitive: self.case_sensitive,
                automation_id: self.automation_id,
                role: self.role.unwrap_or(0),
                vectorized: self.vectorized,
                extra: self.extra,
            },
        }
    }

    fn from_entry(entry: &WorldInfoEntry) -> Self {
        let position = match entry.placement() {
            Placement::BeforeChar => 0,
            Placement::AfterChar => 1,
            Placement::AtDepth { .. } => AT_DEPTH_POSITION_CODE,
        };
        Self {
            uid: Some(entry.id),
            key: entry.keys.clone(),
            keysecondary: entry.secondary_keys.clone(),
            comment: entry.comment.clone(),
            content: entry.content.clone(),
            disable: !entry.enabled,
            constant: entry.constant,
            selective: entry.selective,
            order: entry.insertion_order,
            position,
            selective_logic: entry.extensions.selective_logic,
            probability: entry.extensions.probability,
            use_probability: entry.extensions.use_probability,
            depth: entry.extensions.depth,
            group: entry.extensions.group.clone(),
            group_override: entry.extensions.group_override,
            exclude_recursion: entry.extensions.exclude_recursion,
            prevent_recursion: entry.extensions.prevent_recursion,
            scan_depth: entry.extensions.scan_depth,
            case_sensitive: entry.extensions.case_sensitive,
            match_whole_words: entry.extensions.match_whole_words,
            automation_id: entry.extensions.automation_id.clone(),
            role: Some(entry.extensions.role),
            vectorized: entry.extensions.vectorized,
            display_index: entry.extensions.display_index,
            add_memo: true,
            extra: entry.extensions.extra.clone(),
        }
    }
}
