//! Audio input: decoding, validation and tag metadata

pub mod decoder;
pub mod loader;
pub mod metadata;

pub use decoder::{decode, TARGET_SAMPLE_RATE};
pub use loader::{load, validate, AudioSource};
pub use metadata::extract_title;
