use thiserror::Error;

use crate::services::card_normalizer::NormalizerError;
use crate::services::card_reader::CardReadError;
use crate::services::entry_store::StoreError;

/// Crate-level error aggregating the component errors. Activation itself
/// never fails: a bad entry is neutralized and reported as a plan warning,
/// so only import/normalization/store paths surface here.
#[derive(Debug, Error)]
pub enum LoreError {
    #[error("card normalization error: {0}")]
    Normalizer(#[from] NormalizerError),

    #[error("card read error: {0}")]
    CardRead(#[from] CardReadError),

    #[error("world-info store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_errors_convert_and_display() {
        let err: LoreError = NormalizerError::UnrecognizedSchema("not a card".to_string()).into();
        match &err {
            LoreError::Normalizer(NormalizerError::UnrecognizedSchema(reason)) => {
                assert_eq!(reason, "not a card");
            }
            other => panic!("Expected Normalizer variant, got {:?}", other),
        }
        assert!(err.to_string().contains("card normalization error"));

        let err: LoreError = StoreError::DuplicateEntryIds {
            book: "Atlas".to_string(),
            ids: vec![3],
        }
        .into();
        assert!(err.to_string().contains("Atlas"));

        let err: LoreError = CardReadError::ChunkNotFound.into();
        match err {
            LoreError::CardRead(CardReadError::ChunkNotFound) => {}
            other => panic!("Expected CardRead variant, got {:?}", other),
        }
    }
}
