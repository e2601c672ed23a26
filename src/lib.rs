//! `Song2Quiz` - lyric and annotation preprocessing for language-learning quizzes.
//!
//! Attaches Genius annotations to the timed lyric lines they explain, so
//! exercise generation can work per line. The core is [`alignment`]; the
//! other modules clean provider payloads and persist results.


// Re-export public modules for use in integration tests and as a library
pub mod alignment;
pub mod config;
pub mod constants;
pub mod error;
pub mod genius;
pub mod lyrics;
pub mod storage;
pub mod text;
pub mod types;

pub use alignment::{align_song, align_songs, AlignedSong};
pub use config::{AlignmentConfig, Config};
pub use error::{Error, Result};
