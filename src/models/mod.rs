pub mod book_format;
pub mod card;
pub mod transcript;
pub mod world_info;

pub use book_format::*;
pub use card::*;
pub use transcript::*;
pub use world_info::*;
