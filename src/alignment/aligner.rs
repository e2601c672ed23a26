//! Conflict resolution between annotation candidates.
//!
//! Resolution is a global greedy pass: every candidate from every
//! annotation is ranked by score, and each is accepted only if its
//! annotation is still unplaced and none of its lines are claimed. An
//! annotation that loses its best span therefore falls back to its next
//! best non-overlapping span automatically.
//!
//! Ties are broken by annotation input order, then start line, then span
//! length, so the same inputs always produce the same placement.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::AlignmentConfig;
use crate::error::{Error, Result};
use crate::types::{Annotation, AnnotationId};

use super::matcher::{AlignmentCandidate, AnnotationMatches};

/// An annotation placed on a span of lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Placed annotation.
    pub annotation_id: AnnotationId,
    /// First line of the span.
    pub line_index: usize,
    /// Number of consecutive lines covered.
    pub span_len: usize,
    /// Similarity that won the placement.
    pub score: f64,
}

impl Assignment {
    /// Line indices covered by this assignment.
    pub const fn lines(&self) -> std::ops::Range<usize> {
        self.line_index..self.line_index + self.span_len
    }
}

impl From<&AlignmentCandidate> for Assignment {
    fn from(c: &AlignmentCandidate) -> Self {
        Self {
            annotation_id: c.annotation_id,
            line_index: c.line_index,
            span_len: c.span_len,
            score: c.score,
        }
    }
}

/// Why an annotation was left unattached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnmatchReason {
    /// No span reached `min_score`.
    BelowThreshold,
    /// Every acceptable span overlapped lines won by other annotations.
    Contested {
        /// Annotation holding the lines of this annotation's best span.
        claimed_by: AnnotationId,
    },
}

/// An annotation that could not be attached, reported rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unmatched {
    /// The annotation left out.
    pub annotation_id: AnnotationId,
    /// Highest score it reached against any span.
    pub best_score: f64,
    /// What kept it out.
    pub reason: UnmatchReason,
}

/// Result of resolving one song's candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    /// Accepted placements, in annotation input order.
    pub assignments: Vec<Assignment>,
    /// Annotations left out, in annotation input order.
    pub unmatched: Vec<Unmatched>,
}

impl Alignment {
    /// Placement for an annotation, if it was attached.
    pub fn assignment(&self, id: AnnotationId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.annotation_id == id)
    }
}

/// Resolve candidates into a conflict-free assignment.
///
/// `matches` may come in any order and need not cover every annotation;
/// annotations without matches are reported as below threshold. Candidates
/// under `config.min_score` are ignored. A candidate that points outside
/// `0..line_count` or at an annotation not in `annotations` is a contract
/// violation and fails with [`Error::InvalidReference`].
///
/// When `annotations` repeats an id, only its first occurrence counts.
pub fn resolve(
    annotations: &[Annotation],
    matches: &[AnnotationMatches],
    line_count: usize,
    config: &AlignmentConfig,
) -> Result<Alignment> {
    let mut order: HashMap<AnnotationId, usize> = HashMap::with_capacity(annotations.len());
    for (position, annotation) in annotations.iter().enumerate() {
        order.entry(annotation.id).or_insert(position);
    }

    let mut pool: Vec<(usize, &AlignmentCandidate)> = Vec::new();
    for m in matches {
        for candidate in &m.candidates {
            let position = check_reference(candidate, m.annotation_id, &order, line_count)?;
            if candidate.score >= config.min_score {
                pool.push((position, candidate));
            }
        }
    }

    pool.sort_by(|(pa, a), (pb, b)| {
        b.score
            .total_cmp(&a.score)
            .then(pa.cmp(pb))
            .then(a.line_index.cmp(&b.line_index))
            .then(a.span_len.cmp(&b.span_len))
    });

    let mut owner: Vec<Option<AnnotationId>> = vec![None; line_count];
    let mut placed: HashMap<AnnotationId, Assignment> = HashMap::new();

    for (_, candidate) in pool {
        if placed.contains_key(&candidate.annotation_id) {
            continue;
        }
        if owner[candidate.lines()].iter().any(Option::is_some) {
            continue;
        }
        for slot in &mut owner[candidate.lines()] {
            *slot = Some(candidate.annotation_id);
        }
        placed.insert(candidate.annotation_id, Assignment::from(candidate));
    }

    let by_id: HashMap<AnnotationId, &AnnotationMatches> =
        matches.iter().map(|m| (m.annotation_id, m)).collect();

    let mut alignment = Alignment::default();
    for (position, annotation) in annotations.iter().enumerate() {
        if order.get(&annotation.id) != Some(&position) {
            continue;
        }
        if let Some(assignment) = placed.remove(&annotation.id) {
            alignment.assignments.push(assignment);
            continue;
        }

        let found = by_id.get(&annotation.id);
        let best_score = found.map_or(0.0, |m| {
            m.candidates.iter().map(|c| c.score).fold(m.best_observed_score, f64::max)
        });
        let contested_by = found.and_then(|m| {
            m.candidates
                .iter()
                .filter(|c| c.score >= config.min_score)
                .find_map(|c| owner[c.lines()].iter().flatten().next().copied())
        });

        let reason = match contested_by {
            Some(claimed_by) => UnmatchReason::Contested { claimed_by },
            None => UnmatchReason::BelowThreshold,
        };
        tracing::debug!("Annotation {} unmatched: {:?} (best {:.3})", annotation.id, reason, best_score);
        alignment.unmatched.push(Unmatched { annotation_id: annotation.id, best_score, reason });
    }

    Ok(alignment)
}

fn check_reference(
    candidate: &AlignmentCandidate,
    owner_id: AnnotationId,
    order: &HashMap<AnnotationId, usize>,
    line_count: usize,
) -> Result<usize> {
    let invalid = || Error::InvalidReference {
        annotation_id: candidate.annotation_id,
        line_index: candidate.line_index,
        span_len: candidate.span_len,
        line_count,
    };

    let in_bounds = candidate.span_len > 0
        && candidate
            .line_index
            .checked_add(candidate.span_len)
            .is_some_and(|end| end <= line_count);
    if !in_bounds || candidate.annotation_id != owner_id {
        return Err(invalid());
    }
    order.get(&candidate.annotation_id).copied().ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    fn candidate(id: u64, line_index: usize, span_len: usize, score: f64) -> AlignmentCandidate {
        AlignmentCandidate { annotation_id: AnnotationId::new(id), line_index, span_len, score }
    }

    fn matches(id: u64, candidates: Vec<AlignmentCandidate>) -> AnnotationMatches {
        let best = candidates.iter().map(|c| c.score).fold(0.0, f64::max);
        AnnotationMatches { annotation_id: AnnotationId::new(id), candidates, best_observed_score: best }
    }

    fn annotations(ids: &[u64]) -> Vec<Annotation> {
        ids.iter().map(|&id| Annotation::new(id, format!("excerpt {id}"), "body")).collect()
    }

    #[test]
    fn higher_score_wins_contested_line() {
        let anns = annotations(&[1, 2]);
        let found = vec![
            matches(1, vec![candidate(1, 0, 1, 0.7)]),
            matches(2, vec![candidate(2, 0, 1, 0.9)]),
        ];
        let alignment = resolve(&anns, &found, 3, &AlignmentConfig::default()).unwrap();
        assert_eq!(alignment.assignments.len(), 1);
        assert_eq!(alignment.assignments[0].annotation_id, AnnotationId::new(2));
        assert_eq!(
            alignment.unmatched[0],
            Unmatched {
                annotation_id: AnnotationId::new(1),
                best_score: 0.7,
                reason: UnmatchReason::Contested { claimed_by: AnnotationId::new(2) },
            }
        );
    }

    #[test]
    fn loser_falls_back_to_next_best_span() {
        let anns = annotations(&[1, 2]);
        let found = vec![
            matches(1, vec![candidate(1, 0, 1, 0.8), candidate(1, 2, 1, 0.7)]),
            matches(2, vec![candidate(2, 0, 1, 0.95)]),
        ];
        let alignment = resolve(&anns, &found, 3, &AlignmentConfig::default()).unwrap();
        assert_eq!(alignment.assignment(AnnotationId::new(1)).unwrap().line_index, 2);
        assert_eq!(alignment.assignment(AnnotationId::new(2)).unwrap().line_index, 0);
        assert!(alignment.unmatched.is_empty());
    }

    #[test]
    fn ties_go_to_earlier_annotation() {
        let anns = annotations(&[7, 3]);
        let found = vec![
            matches(3, vec![candidate(3, 1, 1, 0.8)]),
            matches(7, vec![candidate(7, 1, 1, 0.8)]),
        ];
        let alignment = resolve(&anns, &found, 2, &AlignmentConfig::default()).unwrap();
        assert_eq!(alignment.assignments[0].annotation_id, AnnotationId::new(7));
        assert_eq!(alignment.unmatched[0].annotation_id, AnnotationId::new(3));
    }

    #[test]
    fn overlapping_spans_never_share_lines() {
        let anns = annotations(&[1, 2]);
        let found = vec![
            matches(1, vec![candidate(1, 0, 3, 0.9)]),
            matches(2, vec![candidate(2, 2, 2, 0.85)]),
        ];
        let alignment = resolve(&anns, &found, 4, &AlignmentConfig::default()).unwrap();
        assert_eq!(alignment.assignments.len(), 1);
        assert!(matches!(alignment.unmatched[0].reason, UnmatchReason::Contested { .. }));
    }

    #[test]
    fn candidates_below_threshold_are_ignored() {
        let anns = annotations(&[1]);
        let found = vec![matches(1, vec![candidate(1, 0, 1, 0.5)])];
        let alignment = resolve(&anns, &found, 1, &AlignmentConfig::default()).unwrap();
        assert!(alignment.assignments.is_empty());
        assert_eq!(alignment.unmatched[0].reason, UnmatchReason::BelowThreshold);
        assert!((alignment.unmatched[0].best_score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn annotations_without_matches_are_reported() {
        let anns = annotations(&[1, 2]);
        let found = vec![matches(1, vec![candidate(1, 0, 1, 1.0)])];
        let alignment = resolve(&anns, &found, 1, &AlignmentConfig::default()).unwrap();
        assert_eq!(alignment.unmatched.len(), 1);
        assert_eq!(alignment.unmatched[0].annotation_id, AnnotationId::new(2));
        assert_eq!(alignment.unmatched[0].reason, UnmatchReason::BelowThreshold);
    }

    #[test]
    fn out_of_range_candidate_is_contract_violation() {
        let anns = annotations(&[1]);
        let found = vec![matches(1, vec![candidate(1, 2, 2, 0.9)])];
        let err = resolve(&anns, &found, 3, &AlignmentConfig::default()).unwrap_err();
        assert!(err.is_contract_violation());
        assert!(matches!(err, Error::InvalidReference { line_index: 2, span_len: 2, line_count: 3, .. }));
    }

    #[test]
    fn unknown_annotation_is_contract_violation() {
        let anns = annotations(&[1]);
        let found = vec![matches(99, vec![candidate(99, 0, 1, 0.9)])];
        let err = resolve(&anns, &found, 3, &AlignmentConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidReference { .. }));
    }

    #[test]
    fn zero_length_span_is_contract_violation() {
        let anns = annotations(&[1]);
        let found = vec![matches(1, vec![candidate(1, 0, 0, 0.9)])];
        assert!(resolve(&anns, &found, 3, &AlignmentConfig::default()).is_err());
    }

    #[test]
    fn duplicate_ids_use_first_occurrence() {
        let mut anns = annotations(&[1, 2]);
        anns.push(Annotation::new(1, "again", "body"));
        let found = vec![
            matches(1, vec![candidate(1, 0, 1, 0.9)]),
            matches(2, vec![candidate(2, 1, 1, 0.9)]),
        ];
        let alignment = resolve(&anns, &found, 2, &AlignmentConfig::default()).unwrap();
        let ids: Vec<_> = alignment.assignments.iter().map(|a| a.annotation_id.get()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(alignment.unmatched.is_empty());
    }

    #[test]
    fn empty_inputs() {
        let alignment = resolve(&[], &[], 0, &AlignmentConfig::default()).unwrap();
        assert_eq!(alignment, Alignment::default());
    }
}
