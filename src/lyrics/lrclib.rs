//! LRCLib lyrics payload.

use serde::{Deserialize, Serialize};

use crate::types::{RawLyricLine, Timestamp};

use super::lrc::{parse_lrc, TimedText};
use super::has_lyric_content;

fn default_source() -> String {
    "lrclib".to_string()
}

/// Lyrics as returned by the LRCLib `get` endpoint.
///
/// Unknown fields (track name, album, duration) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LrclibLyrics {
    /// Provider name recorded in outputs.
    #[serde(default = "default_source")]
    pub source: String,
    /// LRC document with `[mm:ss.xx]` timestamps.
    #[serde(default)]
    pub synced_lyrics: Option<String>,
    /// Plain text lyrics, one line per lyric line.
    #[serde(default)]
    pub plain_lyrics: Option<String>,
}

impl Default for LrclibLyrics {
    fn default() -> Self {
        Self {
            source: default_source(),
            synced_lyrics: None,
            plain_lyrics: None,
        }
    }
}

impl LrclibLyrics {
    /// Whether synced lyrics are available.
    pub fn has_timestamps(&self) -> bool {
        self.synced_lyrics.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Timed lines from the synced lyrics, ordered by time.
    pub fn timed_lines(&self) -> Vec<TimedText> {
        self.synced_lyrics.as_deref().map(parse_lrc).unwrap_or_default()
    }

    /// Plain text lines, falling back to the synced text without timestamps.
    pub fn lines(&self) -> Vec<String> {
        match self.plain_lyrics.as_deref() {
            Some(plain) if !plain.trim().is_empty() => plain
                .lines()
                .map(str::trim)
                .filter(|l| has_lyric_content(l))
                .map(String::from)
                .collect(),
            _ => self.timed_lines().into_iter().map(|l| l.text).collect(),
        }
    }

    /// Lines ready for alignment.
    ///
    /// With synced lyrics each line ends where the next begins and the last
    /// line has no end. Without them, plain lines come back untimed.
    pub fn raw_lines(&self) -> Vec<RawLyricLine> {
        let timed = self.timed_lines();
        if timed.is_empty() {
            return self.lines().into_iter().map(RawLyricLine::new).collect();
        }

        let ends = timed.iter().skip(1).map(|next| Some(next.timestamp)).chain(std::iter::once(None));

        timed
            .iter()
            .zip(ends)
            .map(|(line, end)| RawLyricLine {
                text: line.text.clone(),
                start_time: Some(line.timestamp),
                end_time: end,
            })
            .collect()
    }

    /// The line on screen at `time`, if any.
    pub fn line_at(&self, time: Timestamp) -> Option<String> {
        self.timed_lines()
            .into_iter()
            .take_while(|line| line.timestamp <= time)
            .last()
            .map(|line| line.text)
    }
}
