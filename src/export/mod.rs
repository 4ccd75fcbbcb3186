//! Export of analysis results

pub mod json;

pub use json::{read_json, write_json, SongSorterJson};
