//! End-to-end checks of the activation engine's contract, driven through
//! the public API only.

use loreweave::models::world_info::{EntryPosition, WorldInfoBook, WorldInfoEntry};
use loreweave::services::activation::{ActivationPlan, ActivationSettings, activate};
use loreweave::services::rng::{FixedRolls, RandomSource, ThreadRandom};
use loreweave::TranscriptMessage;

fn entry(id: i32, keys: &[&str], content: &str) -> WorldInfoEntry {
    WorldInfoEntry::new(id, keys.iter().map(|k| (*k).to_string()).collect(), content)
}

fn single_book(entries: Vec<WorldInfoEntry>) -> Vec<WorldInfoBook> {
    let mut book = WorldInfoBook::new("campaign");
    book.entries = entries;
    vec![book]
}

fn transcript(lines: &[&str]) -> Vec<TranscriptMessage> {
    lines
        .iter()
        .map(|line| TranscriptMessage::user(*line))
        .collect()
}

fn settings() -> ActivationSettings {
    ActivationSettings {
        budget: 10_000,
        scan_depth: 4,
        recursion_limit: 4,
        case_sensitive: false,
        match_whole_words: true,
    }
}

fn activated_ids(plan: &ActivationPlan) -> Vec<i32> {
    plan.injections.iter().map(|i| i.entry_id).collect()
}

#[test]
fn constant_entries_ignore_the_scan_window() {
    let mut constant = entry(1, &["never-mentioned"], "constant lore");
    constant.constant = true;
    let books = single_book(vec![constant]);
    let mut rng = FixedRolls::default();

    for lines in [
        &["completely unrelated chatter"][..],
        &[][..],
        &["never-mentioned appears here"][..],
    ] {
        let plan = activate(&transcript(lines), &books, &settings(), &mut rng);
        assert_eq!(activated_ids(&plan), vec![1], "window: {lines:?}");
    }
}

#[test]
fn non_selective_entries_ignore_secondary_machinery() {
    let base = {
        let mut e = entry(1, &["sword"], "sword lore");
        e.selective = false;
        e
    };

    let variants = [
        (Vec::new(), 0),
        (vec!["absent".to_string()], 0),
        (vec!["absent".to_string()], 2),
        (vec!["sword".to_string()], 3),
        (Vec::new(), 99), // even a malformed code is ignored
    ];

    let mut outcomes = Vec::new();
    for (secondary, logic) in variants {
        let mut e = base.clone();
        e.secondary_keys = secondary;
        e.extensions.selective_logic = logic;
        let books = single_book(vec![e]);
        let mut rng = FixedRolls::default();
        let plan = activate(&transcript(&["a sword"]), &books, &settings(), &mut rng);
        outcomes.push(activated_ids(&plan));
    }
    assert!(
        outcomes.iter().all(|ids| ids == &vec![1]),
        "outcomes diverged: {outcomes:?}"
    );
}

#[test]
fn identical_inputs_and_random_source_give_identical_plans() {
    let mut gated_a = entry(1, &["sword"], "a lore");
    gated_a.extensions.probability = 60;
    let mut gated_b = entry(2, &["sword"], "b lore");
    gated_b.extensions.probability = 40;
    let plain = entry(3, &["sword"], "c lore");
    let books = single_book(vec![gated_a, gated_b, plain]);
    let lines = transcript(&["I draw my sword."]);

    let mut first_rng = FixedRolls::new(vec![55.0, 35.0, 10.0]);
    let first = activate(&lines, &books, &settings(), &mut first_rng);
    let mut second_rng = FixedRolls::new(vec![55.0, 35.0, 10.0]);
    let second = activate(&lines, &books, &settings(), &mut second_rng);
    assert_eq!(first, second);
}

#[test]
fn at_most_one_entry_per_group_without_overrides() {
    let mut entries = Vec::new();
    for id in 0..6 {
        let mut e = entry(id, &["sword"], "lore");
        e.extensions.group = if id % 2 == 0 { "even" } else { "odd" }.to_string();
        e.insertion_order = 100 - id;
        entries.push(e);
    }
    let books = single_book(entries);
    let mut rng = FixedRolls::default();
    let plan = activate(&transcript(&["sword"]), &books, &settings(), &mut rng);

    let ids = activated_ids(&plan);
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&4), "lowest insertion order in 'even'");
    assert!(ids.contains(&5), "lowest insertion order in 'odd'");
}

#[test]
fn grouped_conflict_scenario_orders_survivors_by_insertion_order() {
    let mut grouped_late = entry(10, &["sword"], "grouped late");
    grouped_late.insertion_order = 5;
    grouped_late.extensions.group = "weapon".to_string();
    let mut grouped_early = entry(11, &["sword"], "grouped early");
    grouped_early.insertion_order = 2;
    grouped_early.extensions.group = "weapon".to_string();
    let mut ungrouped = entry(12, &["sword"], "ungrouped");
    ungrouped.insertion_order = 5;

    let books = single_book(vec![grouped_late, grouped_early, ungrouped]);
    let mut rng = FixedRolls::default();
    let plan = activate(&transcript(&["a sword"]), &books, &settings(), &mut rng);

    // The insertion-order-2 grouped entry wins its group; the ungrouped
    // entry passes through untouched; final order follows insertion order.
    assert_eq!(activated_ids(&plan), vec![11, 12]);
    assert_eq!(plan.injections[0].content, "grouped early");
    assert_eq!(plan.injections[1].content, "ungrouped");
}

#[test]
fn budget_never_exceeded_and_trimmed_plan_is_ordered_prefix() {
    let mut entries = Vec::new();
    for id in 0..8 {
        let mut e = entry(id, &["sword"], &"x".repeat(10 + id as usize));
        e.insertion_order = id * 3;
        if id % 3 == 0 {
            e.position = EntryPosition::AfterChar;
        }
        entries.push(e);
    }
    let books = single_book(entries);
    let lines = transcript(&["sword"]);

    let mut unlimited = settings();
    unlimited.budget = usize::MAX;
    let mut rng = FixedRolls::default();
    let full = activate(&lines, &books, &unlimited, &mut rng);

    let mut capped = settings();
    capped.budget = 40;
    let mut rng = FixedRolls::default();
    let trimmed = activate(&lines, &books, &capped, &mut rng);

    let total: usize = trimmed
        .injections
        .iter()
        .map(|i| i.content.chars().count())
        .sum();
    assert!(total <= 40, "budget exceeded: {total}");
    assert!(trimmed.injections.len() < full.injections.len());
    // First-fit in priority order makes the trimmed plan a prefix of the
    // unlimited one in the same relative order.
    assert_eq!(
        full.injections[..trimmed.injections.len()],
        trimmed.injections[..]
    );
}

#[test]
fn probability_zero_never_activates_and_hundred_always_does() {
    let mut never = entry(1, &["sword"], "never lore");
    never.extensions.probability = 0;
    let mut always = entry(2, &["sword"], "always lore");
    always.extensions.probability = 100;
    let books = single_book(vec![never, always]);
    let lines = transcript(&["a sword"]);

    let mut rng = ThreadRandom;
    for _ in 0..1000 {
        let plan = activate(&lines, &books, &settings(), &mut rng);
        assert_eq!(activated_ids(&plan), vec![2]);
    }
}

#[test]
fn recursive_trigger_activates_only_through_second_pass() {
    let trigger = entry(1, &["dungeon"], "the warden carries a skeleton key");
    let chained = entry(2, &["skeleton key"], "the key opens the vault");
    let books = single_book(vec![trigger, chained]);
    let lines = transcript(&["we enter the dungeon"]);

    // With recursion disabled the chained entry never fires.
    let mut no_recursion = settings();
    no_recursion.recursion_limit = 0;
    let mut rng = FixedRolls::default();
    let plan = activate(&lines, &books, &no_recursion, &mut rng);
    assert_eq!(activated_ids(&plan), vec![1]);
    assert!(plan.recursion_limit_reached);

    let mut rng = FixedRolls::default();
    let plan = activate(&lines, &books, &settings(), &mut rng);
    let mut ids = activated_ids(&plan);
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
    assert!(!plan.recursion_limit_reached);
}

#[test]
fn custom_random_source_implementations_plug_in() {
    struct AlwaysHigh;
    impl RandomSource for AlwaysHigh {
        fn roll_percent(&mut self) -> f32 {
            99.9
        }
    }

    let mut gated = entry(1, &["sword"], "gated lore");
    gated.extensions.probability = 99;
    let books = single_book(vec![gated]);
    let mut rng = AlwaysHigh;
    let plan = activate(&transcript(&["sword"]), &books, &settings(), &mut rng);
    assert!(plan.injections.is_empty());
}
