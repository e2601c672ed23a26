//! Lyric sources and line identity.
//!
//! Converts timed-lyrics payloads into [`RawLyricLine`](crate::types::RawLyricLine)s
//! ready for alignment.

pub mod lrc;
pub mod lrclib;

pub use lrc::{parse_lrc, parse_lrc_line, TimedText};
pub use lrclib::LrclibLyrics;

use sha2::{Digest, Sha256};

use crate::constants::lyrics::LINE_ID_LEN;

/// Deterministic id for a line of text: the leading hex digits of its SHA-256.
pub fn line_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(LINE_ID_LEN);
    hex
}

/// Whether a lyric line carries singable text (not blank, not just dots).
pub(crate) fn has_lyric_content(text: &str) -> bool {
    text.chars().any(|c| !c.is_whitespace() && c != '.')
}
