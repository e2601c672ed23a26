//! Edit-distance similarity and candidate generation.
//!
//! Every annotation excerpt is compared against every contiguous run of up
//! to `max_span_lines` lyric lines. Multi-line spans are pruned by a
//! length-ratio bound before the edit distance is computed:
//! `lev(a, b) >= |len(a) - len(b)|`, so `score <= min(len) / max(len)`. A
//! span is skipped only when its bound can neither reach the threshold nor
//! beat the best score seen so far, so the reported best score is exact.

use serde::{Deserialize, Serialize};

use crate::config::AlignmentConfig;
use crate::text::normalize;
use crate::types::{Annotation, AnnotationId, LyricLine};

/// Similarity of two raw strings in `[0, 1]`, compared after normalization.
///
/// `1.0` means identical once normalized. Two empty strings score `1.0`;
/// an empty string against a non-empty one scores `0.0`. Symmetric.
pub fn score(a: &str, b: &str) -> f64 {
    score_normalized(&normalize(a), &normalize(b))
}

/// Levenshtein ratio over Unicode scalar values of already-normalized text.
pub fn score_normalized(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Upper bound on the score two strings of these lengths can reach.
fn length_bound(a_chars: usize, b_chars: usize) -> f64 {
    let longest = a_chars.max(b_chars);
    if longest == 0 {
        return 1.0;
    }
    a_chars.min(b_chars) as f64 / longest as f64
}

/// Candidate spans for one annotation over prepared lines, best first.
///
/// Convenience over [`LineMatcher`] for one-off lookups; build a matcher
/// once when scoring many annotations against the same song.
pub fn candidates(annotation: &Annotation, lines: &[LyricLine], config: &AlignmentConfig) -> Vec<AlignmentCandidate> {
    LineMatcher::new(lines.iter().map(|l| l.text.clone()).collect(), *config)
        .match_annotation(annotation)
        .candidates
}

/// A possible placement of an annotation on the lyrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentCandidate {
    /// Annotation being placed.
    pub annotation_id: AnnotationId,
    /// First line of the span.
    pub line_index: usize,
    /// Number of consecutive lines covered, at least 1.
    pub span_len: usize,
    /// Similarity between the excerpt and the joined span.
    pub score: f64,
}

impl AlignmentCandidate {
    /// Line indices covered by this candidate.
    pub const fn lines(&self) -> std::ops::Range<usize> {
        self.line_index..self.line_index + self.span_len
    }
}

/// Every acceptable placement for one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationMatches {
    /// Annotation the candidates belong to.
    pub annotation_id: AnnotationId,
    /// Candidates at or above `min_score`, best first.
    pub candidates: Vec<AlignmentCandidate>,
    /// Best score against any span, even below threshold.
    pub best_observed_score: f64,
}

/// Scores annotations against one song's normalized lines.
#[derive(Debug, Clone)]
pub struct LineMatcher {
    lines: Vec<String>,
    line_chars: Vec<usize>,
    config: AlignmentConfig,
}

impl LineMatcher {
    /// Create a matcher over lines that are already normalized.
    pub fn new(normalized_lines: Vec<String>, config: AlignmentConfig) -> Self {
        let line_chars = normalized_lines.iter().map(|l| l.chars().count()).collect();
        Self { lines: normalized_lines, line_chars, config }
    }

    /// Number of lines being matched against.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Normalized text of the span `start..start + len`, empty lines skipped.
    pub fn span_text(&self, start: usize, len: usize) -> String {
        self.lines
            .iter()
            .skip(start)
            .take(len)
            .filter(|l| !l.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Find the best span for each start line where the excerpt scores at
    /// least `min_score`.
    ///
    /// Starts on lines that normalize to nothing (tags, blanks) are skipped.
    /// Output is ordered by score descending, then start line ascending.
    pub fn match_annotation(&self, annotation: &Annotation) -> AnnotationMatches {
        let excerpt = normalize(&annotation.excerpt);
        let excerpt_chars = excerpt.chars().count();
        let min_score = self.config.min_score;
        let max_span = self.config.max_span_lines.max(1);

        let mut candidates = Vec::new();
        let mut best_observed: f64 = 0.0;

        for start in 0..self.lines.len() {
            if self.lines[start].is_empty() {
                continue;
            }

            let mut best: Option<AlignmentCandidate> = None;
            let mut span = String::new();
            let mut span_chars = 0usize;

            for len in 1..=max_span.min(self.lines.len() - start) {
                let idx = start + len - 1;
                let line = &self.lines[idx];
                if !line.is_empty() {
                    if !span.is_empty() {
                        span.push(' ');
                        span_chars += 1;
                    }
                    span.push_str(line);
                    span_chars += self.line_chars[idx];
                }

                let bound = length_bound(excerpt_chars, span_chars);
                if len > 1 && bound < min_score && bound <= best_observed {
                    if span_chars > excerpt_chars {
                        break;
                    }
                    continue;
                }

                let s = score_normalized(&excerpt, &span);
                best_observed = best_observed.max(s);
                if s >= min_score && best.is_none_or(|b| s > b.score) {
                    best = Some(AlignmentCandidate {
                        annotation_id: annotation.id,
                        line_index: start,
                        span_len: len,
                        score: s,
                    });
                }
            }

            if let Some(candidate) = best {
                candidates.push(candidate);
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.line_index.cmp(&b.line_index))
                .then(a.span_len.cmp(&b.span_len))
        });

        tracing::debug!(
            "Annotation {} has {} candidate spans (best score {:.3})",
            annotation.id,
            candidates.len(),
            best_observed
        );

        AnnotationMatches {
            annotation_id: annotation.id,
            candidates,
            best_observed_score: best_observed,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    fn matcher(lines: &[&str], config: AlignmentConfig) -> LineMatcher {
        LineMatcher::new(lines.iter().map(|l| normalize(l)).collect(), config)
    }

    #[test]
    fn score_boundaries() {
        assert!((score("", "") - 1.0).abs() < f64::EPSILON);
        assert!(score("abc", "").abs() < f64::EPSILON);
        assert!(score("", "abc").abs() < f64::EPSILON);
        assert!((score("Hello there", "Hello there") - 1.0).abs() < f64::EPSILON);
        assert!((score("Hello, THERE!", "hello there") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn score_is_symmetric() {
        let pairs = [
            ("I came to win", "i came 2 win"),
            ("verse one", "verse two"),
            ("", "something"),
            ("kitten", "sitting"),
            ("東京の夜", "東京"),
        ];
        for (a, b) in pairs {
            assert_eq!(score(a, b).to_bits(), score(b, a).to_bits(), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn score_of_leetspeak_variant() {
        let s = score("I came to win", "i came 2 win");
        assert!((s - (1.0 - 2.0 / 13.0)).abs() < 1e-9);
        assert!(s > 0.84 && s < 0.86);
    }

    #[test]
    fn length_bound_caps_score() {
        assert!((length_bound(0, 0) - 1.0).abs() < f64::EPSILON);
        assert!((length_bound(5, 10) - 0.5).abs() < f64::EPSILON);
        assert!(score_normalized("abcde", "abcdefghij") <= length_bound(5, 10));
    }

    #[test]
    fn finds_single_line_candidates_above_threshold() {
        let config = AlignmentConfig::default().with_min_score(0.65);
        let m = matcher(&["intro", "verse one", "verse two"], config);
        let found = m.match_annotation(&Annotation::new(1, "verse one", "body"));
        assert_eq!(found.candidates[0].line_index, 1);
        assert_eq!(found.candidates[0].span_len, 1);
        assert!((found.candidates[0].score - 1.0).abs() < f64::EPSILON);
        // "verse two" is 2/3 similar and also clears 0.65
        assert_eq!(found.candidates.len(), 2);
        assert_eq!(found.candidates[1].line_index, 2);
    }

    #[test]
    fn multi_line_excerpt_spans_contiguous_lines() {
        let m = matcher(
            &["[Chorus]", "I came to win", "to fight", "to conquer", "to thrive"],
            AlignmentConfig::default(),
        );
        let found = m.match_annotation(&Annotation::new(5, "I came to win\nTo fight\nto conquer", "body"));
        let best = found.candidates[0];
        assert_eq!(best.line_index, 1);
        assert_eq!(best.span_len, 3);
        assert!((best.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn skips_starts_on_tag_lines() {
        let m = matcher(&["[Hook]", "hello"], AlignmentConfig::default());
        let found = m.match_annotation(&Annotation::new(1, "hello", "body"));
        assert!(found.candidates.iter().all(|c| c.line_index == 1));
    }

    #[test]
    fn below_threshold_reports_best_observed() {
        let m = matcher(&["intro", "verse one"], AlignmentConfig::default());
        let found = m.match_annotation(&Annotation::new(2, "totally unrelated gibberish xyz", "body"));
        assert!(found.candidates.is_empty());
        assert!(found.best_observed_score < 0.6);
        assert!(found.best_observed_score > 0.0);
    }

    #[test]
    fn best_observed_covers_multi_line_spans() {
        let config = AlignmentConfig::default().with_min_score(0.97);
        let m = matcher(&["we will we will", "rock you"], config);
        let found = m.match_annotation(&Annotation::new(1, "we will we will rock yu", "b"));
        assert!(found.candidates.is_empty());
        // "we will we will rock you" is one edit away over 24 chars
        assert!((found.best_observed_score - (1.0 - 1.0 / 24.0)).abs() < 1e-9);
    }

    #[test]
    fn respects_max_span_lines() {
        let config = AlignmentConfig::default().with_max_span_lines(1);
        let m = matcher(&["one two", "three four"], config);
        let found = m.match_annotation(&Annotation::new(1, "one two three four", "body"));
        assert!(found.candidates.iter().all(|c| c.span_len == 1));
    }

    #[test]
    fn candidates_over_prepared_lines() {
        let lines = crate::alignment::prepare_lines(&[
            crate::types::RawLyricLine::new("intro"),
            crate::types::RawLyricLine::new("I came to win"),
        ]);
        let found = candidates(&Annotation::new(1, "i came 2 win", "b"), &lines, &AlignmentConfig::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line_index, 1);
    }

    #[test]
    fn threshold_is_inclusive() {
        let config = AlignmentConfig::default().with_min_score(0.75);
        let m = matcher(&["abce"], config);
        let found = m.match_annotation(&Annotation::new(1, "abcd", "b"));
        assert_eq!(found.candidates.len(), 1);
        assert!((found.candidates[0].score - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn span_text_joins_non_empty_lines() {
        let m = matcher(&["a", "[x]", "b"], AlignmentConfig::default());
        assert_eq!(m.span_text(0, 3), "a b");
        assert_eq!(m.span_text(1, 1), "");
    }
}
