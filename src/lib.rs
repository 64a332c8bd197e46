#![recursion_limit = "256"]

pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod services;

pub use config::Config;
pub use errors::LoreError;

// Re-export the types most callers need without digging through modules.
pub use models::card::{CanonicalCard, CardSchema};
pub use models::transcript::{MessageRole, TranscriptMessage};
pub use models::world_info::{Placement, WorldInfoBook, WorldInfoEntry};
pub use services::activation::{
    ActivationPlan, ActivationSettings, PlannedInjection, activate,
};
pub use services::card_normalizer::{denormalize, normalize};
pub use services::entry_store::{BookScope, EntryStore};
pub use services::rng::{FixedRolls, RandomSource, ThreadRandom};
