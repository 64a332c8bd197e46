//! The activation engine: given the transcript and the books in scan order,
//! computes which entries inject this turn, resolves recursive triggering,
//! applies probability and group rules, and emits a priority-ordered,
//! budget-trimmed injection plan.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::rng::RandomSource;
use super::scan_window::ScanWindowBuilder;
use crate::config::Config;
use crate::models::transcript::TranscriptMessage;
use crate::models::world_info::{Placement, SelectiveLogic, WorldInfoBook, WorldInfoEntry};

/// Per-call knobs for the activation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationSettings {
    /// Size cap on total injected content, in characters.
    pub budget: usize,
    /// Number of most-recent transcript messages scanned by default.
    pub scan_depth: usize,
    /// Maximum recursive scanning rounds after the primary pass.
    pub recursion_limit: u32,
    /// Global default for case-sensitive key matching.
    pub case_sensitive: bool,
    /// Global default for whole-word key matching.
    pub match_whole_words: bool,
}

impl From<&Config> for ActivationSettings {
    fn from(config: &Config) -> Self {
        Self {
            budget: config.activation_budget,
            scan_depth: config.scan_depth,
            recursion_limit: config.recursion_limit,
            case_sensitive: config.case_sensitive,
            match_whole_words: config.match_whole_words,
        }
    }
}

impl Default for ActivationSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Why an entry was neutralized for this call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum InvalidEntry {
    #[error("non-constant entry has no usable primary keys")]
    EmptyKeys,
    #[error("selective entry carries unknown selectiveLogic code {0}")]
    UnknownSelectiveLogic(i32),
}

/// Warning recorded when a single entry is dropped from consideration.
/// One bad entry never blocks the rest of the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryWarning {
    pub book: String,
    pub entry_id: i32,
    pub reason: InvalidEntry,
}

/// One entry the assembler should splice into the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedInjection {
    pub book: String,
    pub entry_id: i32,
    pub placement: Placement,
    pub content: String,
}

/// Ordered, budget-trimmed result of one activation call.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ActivationPlan {
    pub injections: Vec<PlannedInjection>,
    /// Scanning stopped at the recursion cap rather than because the
    /// activation set converged. Informational, not an error.
    pub recursion_limit_reached: bool,
    pub warnings: Vec<EntryWarning>,
    /// Entries that activated but did not fit the budget.
    pub trimmed: usize,
}

struct Candidate<'a> {
    book_index: usize,
    book_name: &'a str,
    entry: &'a WorldInfoEntry,
}

/// Computes the activation plan for one conversation turn. Never fails:
/// entries with unmatchable rules are neutralized and reported as warnings
/// while the rest of the pass proceeds.
pub fn activate(
    transcript: &[TranscriptMessage],
    books: &[WorldInfoBook],
    settings: &ActivationSettings,
    rng: &mut dyn RandomSource,
) -> ActivationPlan {
    let mut plan = ActivationPlan::default();
    let windows = ScanWindowBuilder::new(transcript, settings.scan_depth);

    // Flatten the snapshot. The flat index is the stable identity for this
    // call; entries the engine never considers are left out entirely.
    let mut candidates: Vec<Candidate> = Vec::new();
    for (book_index, book) in books.iter().enumerate() {
        for entry in &book.entries {
            if !entry.enabled || entry.extensions.vectorized {
                continue;
            }
            candidates.push(Candidate {
                book_index,
                book_name: &book.name,
                entry,
            });
        }
    }

    let mut neutralized = vec![false; candidates.len()];
    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.entry.constant {
            continue;
        }
        if !candidate.entry.has_usable_keys() {
            neutralized[index] = true;
            warn!(
                book = candidate.book_name,
                entry_id = candidate.entry.id,
                "non-constant entry has no usable primary keys, neutralized"
            );
            plan.warnings.push(EntryWarning {
                book: candidate.book_name.to_string(),
                entry_id: candidate.entry.id,
                reason: InvalidEntry::EmptyKeys,
            });
            continue;
        }
        if candidate.entry.selective && candidate.entry.selective_logic().is_none() {
            let code = candidate.entry.extensions.selective_logic;
            neutralized[index] = true;
            warn!(
                book = candidate.book_name,
                entry_id = candidate.entry.id,
                code,
                "selective entry carries unknown logic code, neutralized"
            );
            plan.warnings.push(EntryWarning {
                book: candidate.book_name.to_string(),
                entry_id: candidate.entry.id,
                reason: InvalidEntry::UnknownSelectiveLogic(code),
            });
        }
    }

    let mut activated = vec![false; candidates.len()];
    let mut activation_order: Vec<usize> = Vec::new();

    // Unconditional pass: constants skip scanning outright.
    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.entry.constant {
            activated[index] = true;
            activation_order.push(index);
        }
    }

    // Scanning passes. Round 1 is the primary scan; further rounds rescan
    // against the transcript window plus the content activated so far,
    // bounded by the recursion cap.
    let mut window_cache: HashMap<usize, String> = HashMap::new();
    let mut recursion_buffer = String::new();
    let mut round: u32 = 0;
    loop {
        round += 1;
        let pending = candidates.iter().enumerate().any(|(index, candidate)| {
            !activated[index]
                && !neutralized[index]
                && !candidate.entry.constant
                && !(round > 1 && candidate.entry.extensions.prevent_recursion)
        });
        if !pending {
            break;
        }
        if round > 1 && round - 1 > settings.recursion_limit {
            plan.recursion_limit_reached = true;
            debug!(
                rounds = round - 1,
                "recursion cap reached with recursable content pending"
            );
            break;
        }

        let mut newly: Vec<usize> = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            if activated[index] || neutralized[index] || candidate.entry.constant {
                continue;
            }
            if round > 1 && candidate.entry.extensions.prevent_recursion {
                continue;
            }

            let depth_override = candidate
                .entry
                .extensions
                .scan_depth
                .map(|depth| depth.max(0) as usize);
            let depth = windows.effective_depth(depth_override);
            let window = window_cache
                .entry(depth)
                .or_insert_with(|| windows.window(depth_override));

            let matched = if round == 1 {
                entry_matches(candidate.entry, window, settings)
            } else {
                let mut haystack =
                    String::with_capacity(window.len() + recursion_buffer.len() + 1);
                haystack.push_str(window);
                if !haystack.is_empty() && !recursion_buffer.is_empty() {
                    haystack.push('\n');
                }
                haystack.push_str(&recursion_buffer);
                entry_matches(candidate.entry, &haystack, settings)
            };
            if matched {
                newly.push(index);
            }
        }

        if newly.is_empty() {
            break;
        }

        let mut buffer_grew = false;
        for index in newly {
            activated[index] = true;
            activation_order.push(index);
            let candidate = &candidates[index];
            debug!(
                book = candidate.book_name,
                entry_id = candidate.entry.id,
                round,
                "entry activated"
            );
            if !candidate.entry.extensions.exclude_recursion
                && !candidate.entry.content.is_empty()
            {
                if !recursion_buffer.is_empty() {
                    recursion_buffer.push('\n');
                }
                recursion_buffer.push_str(&candidate.entry.content);
                buffer_grew = true;
            }
        }

        // Without new recursable content the next round would scan the same
        // haystack and find nothing.
        if !buffer_grew {
            break;
        }
    }

    // Probability gate. One independent draw per activated entry, in
    // activation order so a fixed source reproduces plans exactly.
    let mut deactivated = vec![false; candidates.len()];
    for &index in &activation_order {
        let entry = candidates[index].entry;
        if entry.constant || !entry.extensions.use_probability {
            continue;
        }
        let roll = rng.roll_percent();
        if roll >= entry.extensions.probability as f32 {
            deactivated[index] = true;
            debug!(
                book = candidates[index].book_name,
                entry_id = entry.id,
                roll,
                probability = entry.extensions.probability,
                "probability gate dropped entry"
            );
        }
    }

    // Group conflict resolution: at most one member per non-empty group
    // survives, unless override members force their way through.
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for &index in &activation_order {
        if deactivated[index] {
            continue;
        }
        let group = candidates[index].entry.extensions.group.trim();
        if !group.is_empty() {
            groups.entry(group).or_default().push(index);
        }
    }
    for (group, members) in &groups {
        if members.len() < 2 {
            continue;
        }
        let overrides: Vec<usize> = members
            .iter()
            .copied()
            .filter(|&index| candidates[index].entry.extensions.group_override)
            .collect();
        let keep: Vec<usize> = if overrides.is_empty() {
            members
                .iter()
                .copied()
                .min_by_key(|&index| {
                    let candidate = &candidates[index];
                    (
                        candidate.entry.insertion_order,
                        candidate.entry.id,
                        candidate.book_index,
                    )
                })
                .into_iter()
                .collect()
        } else {
            overrides
        };
        for &index in members.iter() {
            if !keep.contains(&index) {
                deactivated[index] = true;
                debug!(
                    group = %group,
                    book = candidates[index].book_name,
                    entry_id = candidates[index].entry.id,
                    "lost group conflict"
                );
            }
        }
    }

    // Ordering: position bucket, then insertion order, with id and book
    // order breaking ties deterministically.
    let mut surviving: Vec<usize> = activation_order
        .iter()
        .copied()
        .filter(|&index| !deactivated[index])
        .collect();
    surviving.sort_by_key(|&index| {
        let candidate = &candidates[index];
        (
            candidate.entry.placement().bucket_rank(),
            candidate.entry.insertion_order,
            candidate.entry.id,
            candidate.book_index,
        )
    });

    // Budget trim: first-fit in priority order. Entries already included
    // are never evicted for a later one.
    let mut used = 0usize;
    for (position, &index) in surviving.iter().enumerate() {
        let candidate = &candidates[index];
        let cost = candidate.entry.content.chars().count();
        if used + cost > settings.budget {
            plan.trimmed = surviving.len() - position;
            debug!(
                included = position,
                trimmed = plan.trimmed,
                budget = settings.budget,
                "activation budget exhausted"
            );
            break;
        }
        used += cost;
        plan.injections.push(PlannedInjection {
            book: candidate.book_name.to_string(),
            entry_id: candidate.entry.id,
            placement: candidate.entry.placement(),
            content: candidate.entry.content.clone(),
        });
    }

    plan
}

/// Primary-key match plus the selective filter, against one haystack.
fn entry_matches(entry: &WorldInfoEntry, haystack: &str, settings: &ActivationSettings) -> bool {
    let case_sensitive = entry
        .extensions
        .case_sensitive
        .unwrap_or(settings.case_sensitive);
    let whole_words = entry
        .extensions
        .match_whole_words
        .unwrap_or(settings.match_whole_words);

    let primary = entry
        .keys
        .iter()
        .any(|key| text_contains_key(haystack, key, case_sensitive, whole_words));
    if !primary {
        return false;
    }
    if !entry.selective {
        return true;
    }

    let Some(logic) = entry.selective_logic() else {
        return false;
    };
    let secondary: Vec<&String> = entry
        .secondary_keys
        .iter()
        .filter(|key| !key.trim().is_empty())
        .collect();
    // A selective entry without secondary keys has nothing to test against.
    if secondary.is_empty() {
        return true;
    }

    let present =
        |key: &&String| text_contains_key(haystack, key, case_sensitive, whole_words);
    match logic {
        SelectiveLogic::AndAny => secondary.iter().any(present),
        SelectiveLogic::AndAll => secondary.iter().all(present),
        SelectiveLogic::NotAny => !secondary.iter().any(present),
        SelectiveLogic::NotAll => !secondary.iter().all(present),
    }
}

fn text_contains_key(haystack: &str, key: &str, case_sensitive: bool, whole_words: bool) -> bool {
    let key = key.trim();
    if key.is_empty() {
        return false;
    }
    if case_sensitive {
        contains_match(haystack, key, whole_words)
    } else {
        contains_match(&haystack.to_lowercase(), &key.to_lowercase(), whole_words)
    }
}

/// Substring search; in whole-word mode an occurrence only counts when
/// bounded by non-word characters or string edges.
fn contains_match(haystack: &str, needle: &str, whole_words: bool) -> bool {
    if !whole_words {
        return haystack.contains(needle);
    }
    let mut from = 0;
    while let Some(found) = haystack[from..].find(needle) {
        let start = from + found;
        let end = start + needle.len();
        let bounded_before = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_word_char(c));
        let bounded_after = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !is_word_char(c));
        if bounded_before && bounded_after {
            return true;
        }
        from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
