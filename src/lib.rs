//! songsorter - Music emotion analysis from raw audio
//!
//! Predicts a time series of (arousal, valence) points, one per 0.5 s
//! segment of a song, using a small LSTM over log-mel spectrogram features.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `discovery`: File scanning
//! - `audio`: Decoding (symphonia), resampling and input validation
//! - `features`: Segmentation, log-mel extraction and batching
//! - `inference`: Device selection and emotion model backends
//! - `song` / `playlist`: Per-song prediction cache and mood ordering
//! - `pipeline`: Parallel batch orchestration
//! - `export`: JSON output
//!
//! # Example
//!
//! ```no_run
//! use songsorter::Song;
//!
//! let mut song = Song::from_path("track.mp3").expect("load failed");
//! for point in song.get_emotions().expect("prediction failed") {
//!     println!("{}", point);
//! }
//! ```

pub mod audio;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod features;
pub mod inference;
pub mod pipeline;
pub mod playlist;
pub mod song;
pub mod types;

// Re-export key types at crate root
pub use audio::AudioSource;
pub use error::{Result, SongSorterError};
pub use features::FeatureExtractor;
pub use inference::{Device, DeviceSelector, EmotionModel, ModelRunner};
pub use playlist::Playlist;
pub use song::{Song, SongState};
pub use types::{AnalyzedSong, AudioBuffer, EmotionPoint, Mood, SegmentEmotion};
