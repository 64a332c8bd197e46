pub mod activation;
pub mod card_normalizer;
pub mod card_reader;
pub mod entry_store;
pub mod rng;
pub mod scan_window;

pub use activation::{
    ActivationPlan, ActivationSettings, EntryWarning, InvalidEntry, PlannedInjection, activate,
};
pub use card_normalizer::{NormalizerError, denormalize, detect_schema, normalize};
pub use card_reader::{CardReadError, read_card_json, read_card_png};
pub use entry_store::{BookScope, EntryStore, StoreError, StoredBook};
pub use rng::{FixedRolls, RandomSource, ThreadRandom};
pub use scan_window::ScanWindowBuilder;
