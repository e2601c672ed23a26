//! Core type definitions shared across the alignment pipeline.
//!
//! Identifiers are newtypes so annotation ids and song ids cannot be mixed
//! up at compile time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Genius annotation (referent) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl AnnotationId {
    /// Create a new `AnnotationId`.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AnnotationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Genius song identifier, also the name of the song's data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub u64);

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SongId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for SongId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Offset into a song with millisecond precision.
///
/// Serialized in LRC style as `mm:ss.xx`, or `mm:ss.xxx` when the
/// milliseconds are not a whole number of centiseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Create a timestamp from whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1000)
    }

    /// Milliseconds since the start of the song.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Convert to a `Duration`.
    pub const fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.0 / 60_000;
        let seconds = (self.0 / 1000) % 60;
        let millis = self.0 % 1000;
        if millis % 10 == 0 {
            write!(f, "{minutes:02}:{seconds:02}.{:02}", millis / 10)
        } else {
            write!(f, "{minutes:02}:{seconds:02}.{millis:03}")
        }
    }
}

impl FromStr for Timestamp {
    type Err = String;

    /// Parse `mm:ss.xx` (centiseconds) or `mm:ss.xxx` (milliseconds).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid timestamp '{s}', expected mm:ss.xx");
        let (minutes, rest) = s.trim().split_once(':').ok_or_else(invalid)?;
        let (seconds, fraction) = rest.split_once('.').unwrap_or((rest, "0"));

        let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
        let seconds: u64 = seconds.parse().map_err(|_| invalid())?;
        if seconds >= 60 || fraction.is_empty() || fraction.len() > 3 {
            return Err(invalid());
        }
        let digits: u64 = fraction.parse().map_err(|_| invalid())?;
        let millis = match fraction.len() {
            1 => digits * 100,
            2 => digits * 10,
            _ => digits,
        };

        Ok(Self(minutes * 60_000 + seconds * 1000 + millis))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A lyric line as delivered by the timed-lyrics provider, before alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLyricLine {
    /// Line text as published.
    pub text: String,
    /// When the line starts, if the provider supplied timing.
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    /// When the line ends, if known.
    #[serde(default)]
    pub end_time: Option<Timestamp>,
}

impl RawLyricLine {
    /// Create an untimed line.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), start_time: None, end_time: None }
    }

    /// Create a line with a start time and no known end.
    pub fn timed(text: impl Into<String>, start: Timestamp) -> Self {
        Self { text: text.into(), start_time: Some(start), end_time: None }
    }
}

/// A normalized, indexed lyric line inside an aligned song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Ordinal position within the song, unique and stable.
    pub index: usize,
    /// Deterministic id derived from `raw_text`.
    pub id: String,
    /// Normalized text used for matching.
    pub text: String,
    /// Cleaned display text.
    pub raw_text: String,
    /// Start time; absent when the source had no timing.
    pub start_time: Option<Timestamp>,
    /// End time; absent when unknown.
    pub end_time: Option<Timestamp>,
}

/// An external annotation explaining an excerpt of the lyrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// External identifier.
    pub id: AnnotationId,
    /// The lyric text the annotation claims to explain; may span lines.
    pub excerpt: String,
    /// Explanatory text.
    pub body: String,
}

impl Annotation {
    /// Create a new annotation.
    pub fn new(id: impl Into<AnnotationId>, excerpt: impl Into<String>, body: impl Into<String>) -> Self {
        Self { id: id.into(), excerpt: excerpt.into(), body: body.into() }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn timestamp_parses_centiseconds_and_millis() {
        assert_eq!("00:01.23".parse::<Timestamp>().unwrap(), Timestamp::from_millis(1230));
        assert_eq!("01:02.345".parse::<Timestamp>().unwrap(), Timestamp::from_millis(62_345));
        assert_eq!("02:00".parse::<Timestamp>().unwrap(), Timestamp::from_secs(120));
    }

    #[test]
    fn timestamp_rejects_garbage() {
        assert!("abc".parse::<Timestamp>().is_err());
        assert!("00:75.00".parse::<Timestamp>().is_err());
        assert!("00:01.2345".parse::<Timestamp>().is_err());
    }

    #[test]
    fn timestamp_displays_lrc_style() {
        assert_eq!(Timestamp::from_millis(62_340).to_string(), "01:02.34");
        assert_eq!(Timestamp::from_millis(62_345).to_string(), "01:02.345");
        assert_eq!("01:02.345".parse::<Timestamp>().unwrap().to_string(), "01:02.345");
        assert_eq!(Timestamp::default().to_string(), "00:00.00");
    }

    #[test]
    fn timestamp_serializes_as_string() {
        let json = serde_json::to_string(&Some(Timestamp::from_millis(5000))).unwrap();
        assert_eq!(json, "\"00:05.00\"");
        let back: Option<Timestamp> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Some(Timestamp::from_secs(5)));
    }

    #[test]
    fn raw_line_timestamps_default_to_absent() {
        let line: RawLyricLine = serde_json::from_str(r#"{"text":"hello"}"#).unwrap();
        assert_eq!(line.start_time, None);
        assert_eq!(line.end_time, None);
    }
}
