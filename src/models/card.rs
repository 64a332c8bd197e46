use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::transcript::MessageRole;
use crate::models::world_info::WorldInfoBook;

/// `spec` tag carried by the nested legacy schema.
pub const NESTED_SPEC: &str = "chara_card_v2";
pub const NESTED_SPEC_VERSION: &str = "2.0";

/// `spec` tag carried by the current schema.
pub const CURRENT_SPEC: &str = "chara_card_v3";
pub const CURRENT_SPEC_VERSION: &str = "3.0";

pub const DEFAULT_TALKATIVENESS: f32 = 0.5;

/// The closed set of card document shapes the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSchema {
    /// Everything at the top level, no envelope, no embedded book.
    LegacyFlat,
    /// `{spec, spec_version, data}` envelope around the nested payload.
    LegacyNested,
    /// Same envelope, canonical superset payload.
    Current,
}

/// Depth-prompt override tucked into a card's extensions: extra text the
/// assembler inserts a fixed number of turns from the end of the transcript.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DepthPrompt {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub depth: i32,
    #[serde(default)]
    pub role: MessageRole,
}

/// Engine-relevant tuning carried by a card. Unknown keys pass through in
/// `extra` so creator-added metadata survives a re-export.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CardExtensions {
    /// Number or numeric string depending on the document's age; resolved
    /// by [`CardExtensions::talkativeness`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub talkativeness: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav: Option<bool>,
    /// Name of a store-registered book attached to this character.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_prompt: Option<DepthPrompt>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CardExtensions {
    /// Effective talkativeness, tolerating both encodings legacy documents
    /// use (`0.8` and `"0.8"`).
    #[must_use]
    pub fn talkativeness(&self) -> f32 {
        match &self.talkativeness {
            Some(Value::Number(n)) => n.as_f64().map_or(DEFAULT_TALKATIVENESS, |v| v as f32),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(DEFAULT_TALKATIVENESS),
            _ => DEFAULT_TALKATIVENESS,
        }
    }

    #[must_use]
    pub fn is_favorite(&self) -> bool {
        self.fav.unwrap_or(false)
    }
}

/// Canonical in-memory card: the superset of every schema the normalizer
/// accepts. Also serves as the `data` payload of the current wire schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CanonicalCard {
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub scenario: String,
    #[serde(default)]
    pub first_mes: String,
    #[serde(default)]
    pub mes_example: String,
    #[serde(default)]
    pub creator_notes: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub post_history_instructions: String,
    #[serde(default)]
    pub alternate_greetings: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub character_version: String,
    /// Only the flat legacy schema writes this; carried so a flat document
    /// survives the canonical round-trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<String>,
    #[serde(default)]
    pub extensions: CardExtensions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_book: Option<WorldInfoBook>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Envelope shared by the nested legacy and current schemas. The nested
/// payload is a strict subset of the canonical one, so both parse into
/// [`CanonicalCard`] directly.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TaggedCard {
    #[serde(default)]
    pub spec: String,
    #[serde(default)]
    pub spec_version: String,
    #[serde(default)]
    pub data: CanonicalCard,
}

/// Legacy flat document: identity fields at the top level, creator notes
/// under `creatorcomment`, talkativeness and favorite flag not yet folded
/// into an extensions record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FlatCard {
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub scenario: String,
    #[serde(default)]
    pub first_mes: String,
    #[serde(default)]
    pub mes_example: String,
    #[serde(default)]
    pub creatorcomment: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub talkativeness: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<FlatCard> for CanonicalCard {
    fn from(flat: FlatCard) -> Self {
        let extensions = CardExtensions {
            talkativeness: flat.talkativeness,
            fav: flat.fav,
            ..CardExtensions::default()
        };
        Self {
            name: flat.name,
            description: flat.description,
            personality: flat.personality,
            scenario: flat.scenario,
            first_mes: flat.first_mes,
            mes_example: flat.mes_example,
            creator_notes: flat.creatorcomment,
            tags: flat.tags,
            create_date: flat.create_date,
            extensions,
            extra: flat.extra,
            ..Self::default()
        }
    }
}

impl CanonicalCard {
    /// Projection back to the flat legacy shape. Fields the flat schema
    /// cannot represent (system prompt, greetings, embedded book) drop out.
    #[must_use]
    pub fn to_flat(&self) -> FlatCard {
        FlatCard {
            name: self.name.clone(),
            description: self.description.clone(),
            personality: self.personality.clone(),
            scenario: self.scenario.clone(),
            first_mes: self.first_mes.clone(),
            mes_example: self.mes_example.clone(),
            creatorcomment: self.creator_notes.clone(),
            tags: self.tags.clone(),
            talkativeness: self.extensions.talkativeness.clone(),
            fav: self.extensions.fav,
            create_date: self.create_date.clone(),
            extra: self.extra.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_card_lifts_tuning_into_extensions() {
        let flat: FlatCard = serde_json::from_str(
            r#"{
                "name": "Mira",
                "description": "A wandering cartographer.",
                "creatorcomment": "First draft.",
                "talkativeness": "0.8",
                "fav": true,
                "create_date": "2023-4-12 @10h 3m 2s 17ms"
            }"#,
        )
        .unwrap();
        let card = CanonicalCard::from(flat);
        assert_eq!(card.name.as_deref(), Some("Mira"));
        assert_eq!(card.creator_notes, "First draft.");
        assert!((card.extensions.talkativeness() - 0.8).abs() < f32::EPSILON);
        assert!(card.extensions.is_favorite());
        assert!(card.create_date.is_some());
        assert!(card.character_book.is_none());
    }

    #[test]
    fn test_talkativeness_accepts_both_encodings() {
        let mut extensions = CardExtensions::default();
        assert!((extensions.talkativeness() - DEFAULT_TALKATIVENESS).abs() < f32::EPSILON);

        extensions.talkativeness = Some(serde_json::json!(0.25));
        assert!((extensions.talkativeness() - 0.25).abs() < f32::EPSILON);

        extensions.talkativeness = Some(serde_json::json!("0.75"));
        assert!((extensions.talkativeness() - 0.75).abs() < f32::EPSILON);

        extensions.talkativeness = Some(serde_json::json!("gibberish"));
        assert!((extensions.talkativeness() - DEFAULT_TALKATIVENESS).abs() < f32::EPSILON);
    }

    #[test]
    fn test_flat_projection_preserves_passthrough_fields() {
        let flat: FlatCard = serde_json::from_str(
            r#"{"name": "Mira", "custom_badge": "gold", "chub_id": 991}"#,
        )
        .unwrap();
        assert_eq!(flat.extra.get("custom_badge"), Some(&serde_json::json!("gold")));

        let card = CanonicalCard::from(flat);
        let back = card.to_flat();
        assert_eq!(back.extra.get("custom_badge"), Some(&serde_json::json!("gold")));
        assert_eq!(back.extra.get("chub_id"), Some(&serde_json::json!(991)));
    }

    #[test]
    fn test_tagged_envelope_parses_nested_payload() {
        let tagged: TaggedCard = serde_json::from_str(
            r#"{
                "spec": "chara_card_v2",
                "spec_version": "2.0",
                "data": {
                    "name": "Mira",
                    "system_prompt": "Stay in character.",
                    "extensions": {"talkativeness": 0.4, "fav": false, "world": "Atlas"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(tagged.spec, NESTED_SPEC);
        assert_eq!(tagged.data.system_prompt, "Stay in character.");
        assert_eq!(tagged.data.extensions.world.as_deref(), Some("Atlas"));
    }
}
