use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD as base64_standard};
use png::Decoder;
use thiserror::Error;
use tracing::warn;

use super::card_normalizer::{self, NormalizerError};
use crate::models::card::{CanonicalCard, CardSchema};

/// PNG `tEXt` chunk keyword carrying a legacy card payload.
const LEGACY_CHUNK_KEYWORD: &str = "chara";
/// PNG `tEXt` chunk keyword carrying a current-schema payload.
const CURRENT_CHUNK_KEYWORD: &str = "ccv3";

#[derive(Debug, Error)]
pub enum CardReadError {
    #[error("I/O error reading PNG data: {0}")]
    Io(#[from] std::io::Error),
    #[error("PNG decoding error: {0}")]
    Png(#[from] png::DecodingError),
    #[error("card data chunk ('chara' or 'ccv3') not found in PNG")]
    ChunkNotFound,
    #[error("base64 decoding error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Normalizer(#[from] NormalizerError),
}

/// Reads a bare JSON card document and normalizes it, auto-detecting which
/// of the known schemas it carries.
pub fn read_card_json(json_data: &[u8]) -> Result<CanonicalCard, CardReadError> {
    let doc: serde_json::Value = serde_json::from_slice(json_data)?;
    Ok(card_normalizer::normalize(&doc, None)?)
}

/// Extracts and normalizes the card embedded in a PNG's `tEXt` chunks.
/// The `ccv3` chunk is preferred; the legacy `chara` chunk is the fallback
/// when `ccv3` is absent or unusable.
pub fn read_card_png(png_data: &[u8]) -> Result<CanonicalCard, CardReadError> {
    let decoder = Decoder::new(Cursor::new(png_data));
    // Only the info chunks are needed; IDAT never carries card data.
    let reader = decoder.read_info()?;
    let info = reader.info();

    let mut current_payload: Option<String> = None;
    let mut legacy_payload: Option<String> = None;
    for chunk in &info.uncompressed_latin1_text {
        if chunk.keyword == CURRENT_CHUNK_KEYWORD {
            current_payload = Some(chunk.text.clone());
        } else if chunk.keyword == LEGACY_CHUNK_KEYWORD {
            legacy_payload = Some(chunk.text.clone());
        }
    }

    if let Some(encoded) = current_payload {
        match decode_chunk(&encoded, Some(CardSchema::Current)) {
            Ok(card) => return Ok(card),
            Err(e) => {
                if legacy_payload.is_none() {
                    return Err(e);
                }
                warn!(
                    error = %e,
                    "current-schema chunk unusable, falling back to legacy chunk"
                );
            }
        }
    }

    // The legacy chunk may hold either legacy shape, so let detection run.
    if let Some(encoded) = legacy_payload {
        return decode_chunk(&encoded, None);
    }

    Err(CardReadError::ChunkNotFound)
}

fn decode_chunk(
    encoded: &str,
    declared: Option<CardSchema>,
) -> Result<CanonicalCard, CardReadError> {
    let bytes = base64_standard.decode(encoded)?;
    let doc: serde_json::Value = serde_json::from_slice(&bytes)?;
    Ok(card_normalizer::normalize(&doc, declared)?)
}
