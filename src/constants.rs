//! Crate constants.
//!
//! Centralizes thresholds and limits so they can be tuned in one place.

/// Alignment defaults.
pub mod alignment {
    /// Default minimum similarity for an annotation to attach to a span.
    pub const DEFAULT_MIN_SCORE: f64 = 0.6;

    /// Default upper bound on the number of lines one annotation may span.
    pub const DEFAULT_MAX_SPAN_LINES: usize = 8;

    /// Hard cap on configurable span length.
    pub const MAX_SPAN_LINES_LIMIT: usize = 64;
}

/// Annotation cleaning limits.
pub mod cleaning {
    /// Annotation bodies shorter than this are discarded.
    pub const MIN_BODY_CHARS: usize = 5;

    /// Fragments shorter than this are discarded.
    pub const MIN_FRAGMENT_CHARS: usize = 3;
}

/// Lyric line identity.
pub mod lyrics {
    /// Number of hex characters kept from the SHA-256 line digest.
    pub const LINE_ID_LEN: usize = 8;
}

/// On-disk layout of ingested songs.
pub mod storage {
    /// Default data directory, relative to the working directory.
    pub const DEFAULT_DATA_DIR: &str = "data";

    /// Directory under the data dir holding one folder per song.
    pub const SONGS_DIR: &str = "songs";

    /// Raw LRCLib payload.
    pub const LYRICS_FILE: &str = "lyrics.json";

    /// Raw Genius referents payload.
    pub const ANNOTATIONS_FILE: &str = "genius_annotations.json";

    /// Aligned output.
    pub const ALIGNED_FILE: &str = "lyrics_with_annotations.json";

    /// Song catalog under the data dir, a JSON array of song objects.
    pub const CATALOG_FILE: &str = "songs.json";
}
