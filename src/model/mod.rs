pub mod types;
pub mod transcript;
pub mod gene;

pub use types::{Feature, GeneId, TranscriptId};
