use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::card::{
    CURRENT_SPEC, CURRENT_SPEC_VERSION, CanonicalCard, CardSchema, FlatCard, NESTED_SPEC,
    NESTED_SPEC_VERSION, TaggedCard,
};

#[derive(Debug, Error)]
pub enum NormalizerError {
    #[error("document matches no known card schema: {0}")]
    UnrecognizedSchema(String),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classifies a raw card document. Detection order: explicit `spec` tag if
/// present, else structural sniffing (a nested `data` payload implies the
/// newer envelope shape), else a flat document, which must at least carry a
/// name.
pub fn detect_schema(doc: &Value) -> Result<CardSchema, NormalizerError> {
    let obj = doc
        .as_object()
        .ok_or_else(|| NormalizerError::UnrecognizedSchema("not a JSON object".to_string()))?;

    if let Some(spec) = obj.get("spec").and_then(Value::as_str) {
        return match spec {
            NESTED_SPEC => Ok(CardSchema::LegacyNested),
            CURRENT_SPEC => Ok(CardSchema::Current),
            other => Err(NormalizerError::UnrecognizedSchema(format!(
                "unknown spec tag '{other}'"
            ))),
        };
    }
    if obj.get("data").is_some_and(Value::is_object) {
        return Ok(CardSchema::LegacyNested);
    }
    if obj.contains_key("name") {
        return Ok(CardSchema::LegacyFlat);
    }
    Err(NormalizerError::UnrecognizedSchema(
        "no spec tag, data payload, or name field".to_string(),
    ))
}

/// Converts a raw card document into the canonical representation, applying
/// the documented field defaults of whichever schema it matches. Unknown
/// fields survive in the canonical passthrough bags.
pub fn normalize(
    doc: &Value,
    declared: Option<CardSchema>,
) -> Result<CanonicalCard, NormalizerError> {
    let schema = match declared {
        Some(schema) => schema,
        None => detect_schema(doc)?,
    };

    let card = match schema {
        CardSchema::LegacyFlat => {
            let flat: FlatCard = serde_json::from_value(doc.clone())?;
            CanonicalCard::from(flat)
        }
        CardSchema::LegacyNested | CardSchema::Current => {
            let tagged: TaggedCard = serde_json::from_value(doc.clone())?;
            tagged.data
        }
    };

    debug!(
        schema = ?schema,
        has_book = card.character_book.is_some(),
        "normalized character card"
    );
    Ok(card)
}

/// Projects a canonical card back onto one of the known document shapes.
/// Fields the target schema cannot represent are dropped; fields that were
/// filled with defaults during normalization serialize as those defaults.
pub fn denormalize(card: &CanonicalCard, target: CardSchema) -> Result<Value, NormalizerError> {
    let value = match target {
        CardSchema::LegacyFlat => serde_json::to_value(card.to_flat())?,
        CardSchema::LegacyNested => serde_json::to_value(TaggedCard {
            spec: NESTED_SPEC.to_string(),
            spec_version: NESTED_SPEC_VERSION.to_string(),
            data: card.clone(),
        })?,
        CardSchema::Current => serde_json::to_value(TaggedCard {
            spec: CURRENT_SPEC.to_string(),
            spec_version: CURRENT_SPEC_VERSION.to_string(),
            data: card.clone(),
        })?,
    };
    Ok(value)
}
