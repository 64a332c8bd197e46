//! Round-trip checks for the card normalizer across every schema it
//! understands, plus the store-to-engine path a normalized card feeds.

use serde_json::json;

use loreweave::models::card::CardSchema;
use loreweave::services::activation::{ActivationSettings, activate};
use loreweave::services::card_normalizer::{NormalizerError, denormalize, normalize};
use loreweave::services::entry_store::{BookScope, EntryStore};
use loreweave::services::rng::FixedRolls;
use loreweave::{TranscriptMessage, WorldInfoBook, WorldInfoEntry};

fn flat_doc() -> serde_json::Value {
    json!({
        "name": "Rook",
        "description": "A retired lighthouse keeper.",
        "personality": "gruff",
        "scenario": "stormy coast",
        "first_mes": "What do you want?",
        "mes_example": "<START>example<END>",
        "creatorcomment": "Needs a better greeting.",
        "tags": ["coast", "grump"],
        "talkativeness": "0.3",
        "fav": false,
        "create_date": "2022-11-2 @18h 40m 0s 102ms"
    })
}

fn nested_doc() -> serde_json::Value {
    json!({
        "spec": "chara_card_v2",
        "spec_version": "2.0",
        "data": {
            "name": "Rook",
            "description": "A retired lighthouse keeper.",
            "personality": "gruff",
            "scenario": "stormy coast",
            "first_mes": "What do you want?",
            "mes_example": "<START>example<END>",
            "creator_notes": "Needs a better greeting.",
            "system_prompt": "Speak plainly.",
            "post_history_instructions": "",
            "alternate_greetings": ["Back again?"],
            "tags": ["coast"],
            "creator": "someone",
            "character_version": "2.1",
            "extensions": {
                "talkativeness": 0.3,
                "fav": false,
                "world": "",
                "depth_prompt": {"prompt": "the lamp is failing", "depth": 2, "role": "system"}
            },
            "character_book": {
                "name": "Lighthouse",
                "entries": [
                    {
                        "id": 0,
                        "keys": ["lamp"],
                        "secondary_keys": ["oil"],
                        "comment": "lamp maintenance",
                        "content": "The lamp burns whale oil.",
                        "constant": false,
                        "selective": true,
                        "insertion_order": 10,
                        "enabled": true,
                        "position": "after_char",
                        "extensions": {
                            "position": 1,
                            "exclude_recursion": false,
                            "display_index": 0,
                            "probability": 100,
                            "useProbability": true,
                            "depth": 4,
                            "selectiveLogic": 0,
                            "group": "",
                            "group_override": false,
                            "prevent_recursion": false,
                            "scan_depth": null,
                            "match_whole_words": null,
                            "case_sensitive": null,
                            "automation_id": "",
                            "role": 0,
                            "vectorized": false
                        }
                    }
                ]
            }
        }
    })
}

#[test]
fn flat_document_round_trips_bit_for_bit() {
    let doc = flat_doc();
    let card = normalize(&doc, None).expect("flat doc should normalize");
    let back = denormalize(&card, CardSchema::LegacyFlat).expect("projection should succeed");
    assert_eq!(back, doc);
}

#[test]
fn nested_document_round_trips_bit_for_bit() {
    let doc = nested_doc();
    let card = normalize(&doc, None).expect("nested doc should normalize");
    let back = denormalize(&card, CardSchema::LegacyNested).expect("projection should succeed");
    assert_eq!(back, doc);
}

#[test]
fn every_canonical_card_projects_to_both_legacy_shapes() {
    for doc in [flat_doc(), nested_doc()] {
        let card = normalize(&doc, None).expect("doc should normalize");
        denormalize(&card, CardSchema::LegacyFlat).expect("flat projection");
        denormalize(&card, CardSchema::LegacyNested).expect("nested projection");
        denormalize(&card, CardSchema::Current).expect("current projection");
    }
}

#[test]
fn normalization_rejects_unknown_documents() {
    let doc = json!({"spec": "persona_v1", "data": {"name": "not a card"}});
    match normalize(&doc, None) {
        Err(NormalizerError::UnrecognizedSchema(_)) => {}
        other => panic!("Expected UnrecognizedSchema, got {:?}", other),
    }
}

#[test]
fn normalized_card_drives_activation_through_the_store() {
    let card = normalize(&nested_doc(), None).expect("nested doc should normalize");

    let store = EntryStore::new();
    let mut global = WorldInfoBook::new("Coastline");
    global
        .entries
        .push(WorldInfoEntry::new(7, vec!["storm".to_string()], "Storms batter the coast."));
    store
        .insert_book(global, BookScope::Global)
        .expect("global book should register");

    let books = store.resolve_active_books(Some(&card), &["Coastline".to_string()], false);
    assert_eq!(books.len(), 2);
    assert_eq!(books[0].name, "Coastline");
    assert_eq!(books[1].name, "Lighthouse");

    let transcript = vec![
        TranscriptMessage::user("A storm rattles the windows."),
        TranscriptMessage::assistant("The lamp needs oil before dark."),
    ];
    let settings = ActivationSettings {
        budget: 10_000,
        scan_depth: 4,
        recursion_limit: 2,
        case_sensitive: false,
        match_whole_words: true,
    };
    let mut rng = FixedRolls::default();
    let plan = activate(&transcript, &books, &settings, &mut rng);

    let mut activated: Vec<(&str, i32)> = plan
        .injections
        .iter()
        .map(|i| (i.book.as_str(), i.entry_id))
        .collect();
    activated.sort_unstable();
    assert_eq!(activated, vec![("Coastline", 7), ("Lighthouse", 0)]);
}
