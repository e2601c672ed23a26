//! LRC synced-lyrics parsing (`[mm:ss.xx]text`).

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Timestamp;

use super::has_lyric_content;

/// Regex matching one LRC line: minutes, seconds, 2-3 fraction digits, text.
#[allow(clippy::expect_used)]
static RE_LRC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d{2,}):(\d{2})\.(\d{2,3})\](.*)$").expect("valid regex: RE_LRC_LINE")
});

/// A lyric line with its start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedText {
    /// When the line starts.
    pub timestamp: Timestamp,
    /// Trimmed line text.
    pub text: String,
}

/// Parse a single LRC line. Returns `None` for lines without a timestamp.
pub fn parse_lrc_line(line: &str) -> Option<TimedText> {
    let caps = RE_LRC_LINE.captures(line.trim_end_matches(['\r', '\n']))?;
    let stamp = format!("{}:{}.{}", caps.get(1)?.as_str(), caps.get(2)?.as_str(), caps.get(3)?.as_str());
    let timestamp = stamp.parse().ok()?;
    let text = caps.get(4)?.as_str().trim().to_string();
    Some(TimedText { timestamp, text })
}

/// Parse a whole LRC document into lyric lines ordered by time.
///
/// Lines without timestamps (metadata, blank) and lines without lyric
/// content (empty, `...`) are skipped. Lines sharing a timestamp keep
/// their document order.
pub fn parse_lrc(document: &str) -> Vec<TimedText> {
    let mut lines: Vec<TimedText> = document
        .lines()
        .filter_map(parse_lrc_line)
        .filter(|l| has_lyric_content(&l.text))
        .collect();
    lines.sort_by_key(|l| l.timestamp);
    lines
}
