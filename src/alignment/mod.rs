//! Lyric-to-annotation alignment.
//!
//! The pipeline for one song is:
//! 1. [`prepare_lines`] cleans and normalizes the provider's lines
//! 2. [`LineMatcher`] scores each annotation excerpt against line spans
//! 3. [`resolve`] picks a conflict-free placement
//! 4. [`build`] merges placements, timing and stats into an [`AlignedSong`]
//!
//! Songs are independent, so [`align_songs`] runs them in parallel.

pub mod aligner;
pub mod builder;
pub mod matcher;

pub use aligner::{resolve, Alignment, Assignment, UnmatchReason, Unmatched};
pub use builder::{
    build, prepare_lines, AlignedSong, AnnotatedLine, Attachment, LineAnnotation, MatchKind, MatchStats,
};
pub use matcher::{candidates, score, AlignmentCandidate, AnnotationMatches, LineMatcher};

use std::collections::HashSet;

use rayon::prelude::*;

use crate::config::AlignmentConfig;
use crate::error::Result;
use crate::types::{Annotation, RawLyricLine, SongId};

/// Align one song's annotations to its lyric lines.
///
/// Annotations that cannot be placed are reported in
/// [`AlignedSong::unmatched`], never dropped. Repeated annotation ids keep
/// their first occurrence.
pub fn align_song(
    raw_lines: &[RawLyricLine],
    annotations: &[Annotation],
    config: &AlignmentConfig,
) -> Result<AlignedSong> {
    config.validate()?;

    let annotations = dedup_annotations(annotations);
    let lines = prepare_lines(raw_lines);
    let matcher = LineMatcher::new(lines.iter().map(|l| l.text.clone()).collect(), *config);

    let matches: Vec<AnnotationMatches> = annotations.iter().map(|a| matcher.match_annotation(a)).collect();
    let alignment = resolve(&annotations, &matches, lines.len(), config)?;
    let song = build(lines, annotations, alignment)?;

    tracing::info!(
        "Aligned {}/{} annotations across {} lines ({} unmatched)",
        song.stats.matched,
        song.stats.total_annotations,
        song.lines.len(),
        song.stats.unmatched
    );
    Ok(song)
}

fn dedup_annotations(annotations: &[Annotation]) -> Vec<Annotation> {
    let mut seen = HashSet::with_capacity(annotations.len());
    annotations
        .iter()
        .filter(|a| {
            let first = seen.insert(a.id);
            if !first {
                tracing::warn!("Duplicate annotation id {}; keeping the first occurrence", a.id);
            }
            first
        })
        .cloned()
        .collect()
}

/// One song's inputs for batch alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongInput {
    /// Song being aligned.
    pub song_id: SongId,
    /// Lines from the lyrics provider.
    pub lines: Vec<RawLyricLine>,
    /// Annotations from the annotation provider.
    pub annotations: Vec<Annotation>,
}

/// Align many songs in parallel.
///
/// Results come back in input order. One song failing does not affect the
/// others.
pub fn align_songs(songs: &[SongInput], config: &AlignmentConfig) -> Vec<(SongId, Result<AlignedSong>)> {
    songs
        .par_iter()
        .map(|song| {
            let result = align_song(&song.lines, &song.annotations, config);
            if let Err(e) = &result {
                tracing::error!("Song {} failed to align: {e}", song.song_id);
            }
            (song.song_id, result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::types::AnnotationId;

    fn lines(texts: &[&str]) -> Vec<RawLyricLine> {
        texts.iter().map(|t| RawLyricLine::new(*t)).collect()
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let anns = vec![
            Annotation::new(1, "hello world", "first"),
            Annotation::new(1, "goodbye", "second"),
        ];
        let song = align_song(&lines(&["hello world"]), &anns, &AlignmentConfig::default()).unwrap();
        assert_eq!(song.annotations.len(), 1);
        assert_eq!(song.annotations[0].body, "first");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AlignmentConfig { min_score: 1.5, ..AlignmentConfig::default() };
        assert!(align_song(&lines(&["x"]), &[], &config).is_err());
    }

    #[test]
    fn batch_preserves_order() {
        let songs: Vec<SongInput> = (0..8)
            .map(|i| SongInput {
                song_id: SongId(i),
                lines: lines(&["line a", "line b"]),
                annotations: vec![Annotation::new(i, "line b", "body")],
            })
            .collect();
        let results = align_songs(&songs, &AlignmentConfig::default());
        let ids: Vec<u64> = results.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, (0..8).collect::<Vec<_>>());
        for (id, result) in results {
            let song = result.unwrap();
            assert_eq!(song.annotations_by_line[&1].iter().next(), Some(&AnnotationId::new(id.0)));
        }
    }
}
