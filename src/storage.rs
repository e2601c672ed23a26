//! Song data directory layout and JSON persistence.
//!
//! ```text
//! <data_dir>/songs/<song_id>/lyrics.json                    LRCLib payload
//! <data_dir>/songs/<song_id>/genius_annotations.json        Genius referents
//! <data_dir>/songs/<song_id>/lyrics_with_annotations.json   output
//! <data_dir>/songs.json                                      catalog
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::alignment::{AlignedSong, AnnotatedLine, MatchStats, SongInput, Unmatched};
use crate::config::Config;
use crate::constants::storage::{ALIGNED_FILE, ANNOTATIONS_FILE, CATALOG_FILE, LYRICS_FILE, SONGS_DIR};
use crate::error::{Error, Result};
use crate::genius::annotations_from_referents;
use crate::lyrics::LrclibLyrics;
use crate::types::{Annotation, SongId};

/// Read and deserialize a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs_err::read_to_string(path).map_err(|e| Error::io(e, path.to_path_buf()))?;
    serde_json::from_str(&contents).map_err(|e| Error::parse(e.to_string(), path.to_path_buf()))
}

/// Serialize to pretty JSON, creating parent directories as needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent).map_err(|e| Error::io(e, parent.to_path_buf()))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Msg(format!("Failed to serialize {}: {e}", path.display())))?;
    fs_err::write(path, json).map_err(|e| Error::io(e, path.to_path_buf()))
}

/// The aligned output written for each song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSong {
    /// Song the output belongs to.
    pub song_id: SongId,
    /// Lyrics provider the lines came from.
    pub lyrics_source: String,
    /// When alignment ran.
    pub processed_at: DateTime<Utc>,
    /// Whether lines carry timing.
    pub has_timestamps: bool,
    /// Match counts.
    pub stats: MatchStats,
    /// Per-line records.
    pub lines: Vec<AnnotatedLine>,
    /// Annotations that could not be attached.
    pub unmatched: Vec<Unmatched>,
    /// The full aligned structure.
    pub aligned: AlignedSong,
}

impl ProcessedSong {
    /// Package an aligned song for writing, stamped with the current time.
    pub fn new(song_id: SongId, lyrics_source: impl Into<String>, aligned: AlignedSong) -> Self {
        Self {
            song_id,
            lyrics_source: lyrics_source.into(),
            processed_at: Utc::now(),
            has_timestamps: aligned.has_timestamps,
            stats: aligned.stats.clone(),
            lines: aligned.annotated_lines(),
            unmatched: aligned.unmatched.clone(),
            aligned,
        }
    }
}

/// A song's inputs as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSong {
    /// Lines and annotations ready for alignment.
    pub input: SongInput,
    /// Lyrics provider named in the payload.
    pub lyrics_source: String,
}

/// Access to song directories under a data root.
#[derive(Debug, Clone)]
pub struct SongStore {
    data_dir: PathBuf,
}

impl SongStore {
    /// Store rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    /// Store rooted at the configured data directory.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.data_dir.clone())
    }

    /// Root data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding one song's files.
    pub fn song_dir(&self, song_id: SongId) -> PathBuf {
        self.data_dir.join(SONGS_DIR).join(song_id.to_string())
    }

    /// Load the LRCLib payload for a song.
    pub fn load_lyrics(&self, song_id: SongId) -> Result<LrclibLyrics> {
        load_json(&self.song_dir(song_id).join(LYRICS_FILE))
    }

    /// Load and clean a song's Genius annotations.
    pub fn load_annotations(&self, song_id: SongId) -> Result<Vec<Annotation>> {
        let path = self.song_dir(song_id).join(ANNOTATIONS_FILE);
        let payload: serde_json::Value = load_json(&path)?;
        annotations_from_referents(&payload).map_err(|e| match e {
            Error::Parse { message, .. } => Error::parse(message, path),
            other => other,
        })
    }

    /// Load lyrics and annotations for one song.
    pub fn load_song(&self, song_id: SongId) -> Result<LoadedSong> {
        let lyrics = self.load_lyrics(song_id)?;
        let annotations = self.load_annotations(song_id)?;
        Ok(LoadedSong {
            input: SongInput { song_id, lines: lyrics.raw_lines(), annotations },
            lyrics_source: lyrics.source,
        })
    }

    /// Load several songs. A song whose files are missing or corrupt is
    /// logged and returned in the failure list; the rest still load.
    pub fn load_songs(&self, song_ids: &[SongId]) -> (Vec<LoadedSong>, Vec<(SongId, Error)>) {
        let mut loaded = Vec::with_capacity(song_ids.len());
        let mut failed = Vec::new();
        for &song_id in song_ids {
            match self.load_song(song_id) {
                Ok(song) => loaded.push(song),
                Err(e) => {
                    tracing::error!("Skipping song {song_id}: {e}");
                    failed.push((song_id, e));
                }
            }
        }
        (loaded, failed)
    }

    /// Path of the song catalog.
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }

    /// Record processing metadata for a song in the catalog.
    ///
    /// Merges `lyrics` and `annotations` entries into the song's
    /// `processing` object, keeping any other keys. Returns `false` when
    /// there is no catalog or the song is not listed in it.
    pub fn update_catalog(&self, processed: &ProcessedSong) -> Result<bool> {
        let path = self.catalog_path();
        if !path.exists() {
            tracing::warn!("No song catalog at {}; processing metadata not recorded", path.display());
            return Ok(false);
        }

        let mut songs: Vec<serde_json::Value> = load_json(&path)?;
        let Some(entry) = songs
            .iter_mut()
            .find(|song| song["id"].as_u64() == Some(processed.song_id.0))
        else {
            tracing::warn!("Song {} is not in the catalog", processed.song_id);
            return Ok(false);
        };

        let processed_at = processed.processed_at.to_rfc3339();
        let update = serde_json::json!({
            "lyrics": {
                "source": processed.lyrics_source,
                "has_timestamps": processed.has_timestamps,
                "total_lines": processed.lines.len(),
                "processed_at": processed_at,
            },
            "annotations": {
                "source": "genius",
                "total_annotations": processed.stats.total_annotations,
                "matches": processed.stats.matched,
                "processed_at": processed_at,
            },
        });

        let Some(song) = entry.as_object_mut() else {
            return Err(Error::parse(format!("catalog entry for song {} is not an object", processed.song_id), path));
        };
        let processing = song
            .entry("processing")
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if !processing.is_object() {
            *processing = serde_json::Value::Object(serde_json::Map::new());
        }
        if let (Some(existing), serde_json::Value::Object(fields)) = (processing.as_object_mut(), update) {
            existing.extend(fields);
        }

        write_json(&path, &songs)?;
        Ok(true)
    }

    /// Write a song's aligned output, returning the path written.
    pub fn save_processed(&self, processed: &ProcessedSong) -> Result<PathBuf> {
        let path = self.song_dir(processed.song_id).join(ALIGNED_FILE);
        write_json(&path, processed)?;
        tracing::info!("Wrote {}", path.display());
        Ok(path)
    }

    /// Read a song's aligned output.
    pub fn load_processed(&self, song_id: SongId) -> Result<ProcessedSong> {
        load_json(&self.song_dir(song_id).join(ALIGNED_FILE))
    }

    /// Song ids with a directory under the data root, ascending.
    ///
    /// Entries whose names are not numeric ids are ignored. A missing
    /// songs directory yields an empty list.
    pub fn list_songs(&self) -> Result<Vec<SongId>> {
        let root = self.data_dir.join(SONGS_DIR);
        if !root.exists() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<SongId> = fs_err::read_dir(&root)
            .map_err(|e| Error::io(e, root.clone()))?
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().and_then(|n| n.parse().ok()))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn song_dir_layout() {
        let store = SongStore::new("/tmp/data");
        assert_eq!(store.song_dir(SongId(42)), PathBuf::from("/tmp/data/songs/42"));
    }

    #[test]
    fn load_json_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load_json::<serde_json::Value>(&missing).unwrap_err();
        assert!(matches!(err, Error::Io { path: Some(ref p), .. } if p == &missing));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        let err = load_json::<serde_json::Value>(&bad).unwrap_err();
        assert!(matches!(err, Error::Parse { file: Some(ref p), .. } if p == &bad));
    }

    fn write_song(dir: &Path, song_id: u64, lyrics: Option<&str>, referents: Option<&str>) {
        let song_dir = dir.join("songs").join(song_id.to_string());
        std::fs::create_dir_all(&song_dir).unwrap();
        if let Some(lyrics) = lyrics {
            std::fs::write(song_dir.join("lyrics.json"), lyrics).unwrap();
        }
        if let Some(referents) = referents {
            std::fs::write(song_dir.join("genius_annotations.json"), referents).unwrap();
        }
    }

    #[test]
    fn one_broken_song_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let lyrics = r#"{"plainLyrics": "Hello there"}"#;
        let referents = r#"[{"id": 1, "fragment": "Hello there", "annotations": [{"body": {"dom": "A greeting"}}]}]"#;
        write_song(dir.path(), 1, Some(lyrics), Some(referents));
        write_song(dir.path(), 2, Some(lyrics), None);
        write_song(dir.path(), 3, Some("{broken"), Some(referents));
        write_song(dir.path(), 4, Some(lyrics), Some(referents));

        let store = SongStore::new(dir.path());
        let ids = store.list_songs().unwrap();
        let (loaded, failed) = store.load_songs(&ids);

        let loaded_ids: Vec<_> = loaded.iter().map(|s| s.input.song_id).collect();
        assert_eq!(loaded_ids, vec![SongId(1), SongId(4)]);
        assert_eq!(loaded[0].lyrics_source, "lrclib");
        assert_eq!(loaded[0].input.annotations.len(), 1);

        let failed_ids: Vec<_> = failed.iter().map(|(id, _)| *id).collect();
        assert_eq!(failed_ids, vec![SongId(2), SongId(3)]);
        assert!(matches!(failed[0].1, Error::Io { .. }));
        assert!(matches!(failed[1].1, Error::Parse { .. }));
    }

    #[test]
    fn catalog_update_merges_processing_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = SongStore::new(dir.path());
        let song = crate::alignment::align_song(
            &[crate::types::RawLyricLine::new("Hello there")],
            &[crate::types::Annotation::new(1, "Hello there", "A greeting")],
            &crate::config::AlignmentConfig::default(),
        )
        .unwrap();
        let processed = ProcessedSong::new(SongId(5), "lrclib", song);

        assert!(!store.update_catalog(&processed).unwrap());

        let catalog = serde_json::json!([
            {"id": 4, "title": "Other"},
            {"id": 5, "title": "Target", "processing": {"vocabulary": {"done": true}}},
        ]);
        std::fs::write(store.catalog_path(), catalog.to_string()).unwrap();
        assert!(store.update_catalog(&processed).unwrap());

        let written: serde_json::Value = load_json(&store.catalog_path()).unwrap();
        let processing = &written[1]["processing"];
        assert_eq!(processing["vocabulary"]["done"], true);
        assert_eq!(processing["lyrics"]["source"], "lrclib");
        assert_eq!(processing["lyrics"]["total_lines"], 1);
        assert_eq!(processing["lyrics"]["has_timestamps"], false);
        assert_eq!(processing["annotations"]["total_annotations"], 1);
        assert_eq!(processing["annotations"]["matches"], 1);
        assert_eq!(written[1]["title"], "Target");
        assert!(written[0].get("processing").is_none());

        let missing = ProcessedSong { song_id: SongId(99), ..processed };
        assert!(!store.update_catalog(&missing).unwrap());
    }

    #[test]
    fn lists_numeric_song_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = SongStore::new(dir.path());
        assert!(store.list_songs().unwrap().is_empty());

        for name in ["12", "3", "notes"] {
            std::fs::create_dir_all(dir.path().join("songs").join(name)).unwrap();
        }
        std::fs::write(dir.path().join("songs").join("7"), "file, not dir").unwrap();
        assert_eq!(store.list_songs().unwrap(), vec![SongId(3), SongId(12)]);
    }
}
