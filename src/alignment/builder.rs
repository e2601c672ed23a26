//! Assembly of the aligned song handed to exercise generation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lyrics::line_id;
use crate::text::{extract_parentheticals, fix_text, normalize, Parenthetical};
use crate::types::{Annotation, AnnotationId, LyricLine, RawLyricLine, Timestamp};

use super::aligner::{Alignment, Assignment, Unmatched};

/// Shortest normalized text for a containment match to count as one.
const MIN_CONTAINMENT_CHARS: usize = 4;

/// How an attached excerpt relates to the lines it landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Identical after normalization.
    Exact,
    /// The excerpt is a part of the span.
    ExcerptInLine,
    /// The span is a part of the excerpt.
    LineInExcerpt,
    /// Similar but neither contains the other.
    Fuzzy,
}

impl MatchKind {
    /// Classify a match between a normalized excerpt and normalized span text.
    pub fn classify(excerpt: &str, span: &str) -> Self {
        if excerpt == span {
            Self::Exact
        } else if excerpt.chars().count() >= MIN_CONTAINMENT_CHARS && span.contains(excerpt) {
            Self::ExcerptInLine
        } else if span.chars().count() >= MIN_CONTAINMENT_CHARS && excerpt.contains(span) {
            Self::LineInExcerpt
        } else {
            Self::Fuzzy
        }
    }
}

/// An accepted placement together with its match kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Where the annotation landed.
    #[serde(flatten)]
    pub assignment: Assignment,
    /// How the excerpt related to the span.
    pub kind: MatchKind,
}

/// Counts reported alongside an aligned song.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    /// Annotations considered.
    pub total_annotations: usize,
    /// Annotations attached to lines.
    pub matched: usize,
    /// Annotations left out.
    pub unmatched: usize,
    /// Lines carrying an annotation.
    pub annotated_lines: usize,
    /// Attachments per match kind.
    pub by_kind: BTreeMap<MatchKind, usize>,
}

impl MatchStats {
    /// Fraction of annotations attached, `0.0` when there were none.
    pub fn match_rate(&self) -> f64 {
        if self.total_annotations == 0 {
            return 0.0;
        }
        self.matched as f64 / self.total_annotations as f64
    }
}

/// A lyric line's annotation as seen from the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAnnotation {
    /// Annotation id.
    pub id: AnnotationId,
    /// Lyric text the annotation explains.
    pub excerpt: String,
    /// Explanation.
    pub body: String,
}

/// Flattened per-line record for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedLine {
    /// Deterministic line id.
    pub id: String,
    /// Line position.
    pub index: usize,
    /// Start time, if known.
    pub start_time: Option<Timestamp>,
    /// End time, if known.
    pub end_time: Option<Timestamp>,
    /// Display text.
    pub text: String,
    /// Display text with parenthesized asides removed.
    pub text_without_parentheticals: String,
    /// Asides removed from the line, in order.
    pub parentheticals: Vec<Parenthetical>,
    /// Annotations attached to this line.
    pub annotations: Vec<LineAnnotation>,
}

/// A song's lines with annotations attached.
///
/// Invariants, checked by [`AlignedSong::validate`]:
/// - every key of `annotations_by_line` is a line index in range
/// - every referenced annotation id exists in `annotations`
/// - each annotation is attached to at most one contiguous span
/// - each line carries at most one annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSong {
    /// Lines in song order.
    pub lines: Vec<LyricLine>,
    /// Every annotation considered, in input order.
    pub annotations: Vec<Annotation>,
    /// Line index to attached annotation ids.
    pub annotations_by_line: BTreeMap<usize, BTreeSet<AnnotationId>>,
    /// Accepted placements ordered by first line.
    pub attachments: Vec<Attachment>,
    /// Annotations that could not be attached.
    pub unmatched: Vec<Unmatched>,
    /// Summary counts.
    pub stats: MatchStats,
    /// Whether the lyric source carried timing.
    pub has_timestamps: bool,
}

/// Turn provider lines into indexed lines with display and match text.
///
/// Timing is carried over unchanged; nothing is invented for untimed lines.
pub fn prepare_lines(raw_lines: &[RawLyricLine]) -> Vec<LyricLine> {
    raw_lines
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let display = fix_text(raw.text.trim());
            LyricLine {
                index,
                id: line_id(&display),
                text: normalize(&display),
                raw_text: display,
                start_time: raw.start_time,
                end_time: raw.end_time,
            }
        })
        .collect()
}

fn span_text(lines: &[LyricLine], assignment: &Assignment) -> String {
    lines[assignment.lines()]
        .iter()
        .map(|l| l.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Merge prepared lines with a resolved alignment.
///
/// Fails with [`Error::InvalidReference`] if an assignment does not fit
/// the lines or names an unknown annotation.
pub fn build(lines: Vec<LyricLine>, annotations: Vec<Annotation>, alignment: Alignment) -> Result<AlignedSong> {
    let by_id: HashMap<AnnotationId, &Annotation> = annotations.iter().map(|a| (a.id, a)).collect();

    let mut annotations_by_line: BTreeMap<usize, BTreeSet<AnnotationId>> = BTreeMap::new();
    let mut attachments = Vec::with_capacity(alignment.assignments.len());
    let mut by_kind: BTreeMap<MatchKind, usize> = BTreeMap::new();

    for assignment in alignment.assignments {
        let fits = assignment.span_len > 0
            && assignment
                .line_index
                .checked_add(assignment.span_len)
                .is_some_and(|end| end <= lines.len());
        let Some(annotation) = by_id.get(&assignment.annotation_id).filter(|_| fits) else {
            return Err(Error::InvalidReference {
                annotation_id: assignment.annotation_id,
                line_index: assignment.line_index,
                span_len: assignment.span_len,
                line_count: lines.len(),
            });
        };

        let kind = MatchKind::classify(&normalize(&annotation.excerpt), &span_text(&lines, &assignment));
        *by_kind.entry(kind).or_default() += 1;

        for index in assignment.lines() {
            annotations_by_line.entry(index).or_default().insert(assignment.annotation_id);
        }
        attachments.push(Attachment { assignment, kind });
    }
    attachments.sort_by_key(|a| a.assignment.line_index);

    let stats = MatchStats {
        total_annotations: annotations.len(),
        matched: attachments.len(),
        unmatched: alignment.unmatched.len(),
        annotated_lines: annotations_by_line.len(),
        by_kind,
    };
    let has_timestamps = lines.iter().any(|l| l.start_time.is_some());

    Ok(AlignedSong {
        lines,
        annotations,
        annotations_by_line,
        attachments,
        unmatched: alignment.unmatched,
        stats,
        has_timestamps,
    })
}

impl AlignedSong {
    /// Look up an annotation by id.
    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// Annotations attached to a line, by id order.
    pub fn annotations_for_line(&self, index: usize) -> impl Iterator<Item = &Annotation> + '_ {
        self.annotations_by_line
            .get(&index)
            .into_iter()
            .flatten()
            .filter_map(|id| self.annotation(*id))
    }

    /// Whether an annotation was attached.
    pub fn is_attached(&self, id: AnnotationId) -> bool {
        self.attachments.iter().any(|a| a.assignment.annotation_id == id)
    }

    /// Per-line records with parentheticals split out.
    pub fn annotated_lines(&self) -> Vec<AnnotatedLine> {
        self.lines
            .iter()
            .map(|line| {
                let (text_without_parentheticals, parentheticals) = extract_parentheticals(&line.raw_text);
                AnnotatedLine {
                    id: line.id.clone(),
                    index: line.index,
                    start_time: line.start_time,
                    end_time: line.end_time,
                    text: line.raw_text.clone(),
                    text_without_parentheticals,
                    parentheticals,
                    annotations: self
                        .annotations_for_line(line.index)
                        .map(|a| LineAnnotation { id: a.id, excerpt: a.excerpt.clone(), body: a.body.clone() })
                        .collect(),
                }
            })
            .collect()
    }

    /// Check the structural invariants.
    pub fn validate(&self) -> Result<()> {
        let line_count = self.lines.len();
        let known: BTreeSet<AnnotationId> = self.annotations.iter().map(|a| a.id).collect();
        let mut spans: BTreeMap<AnnotationId, Vec<usize>> = BTreeMap::new();

        for (&index, ids) in &self.annotations_by_line {
            for &id in ids {
                if index >= line_count || !known.contains(&id) {
                    return Err(Error::InvalidReference {
                        annotation_id: id,
                        line_index: index,
                        span_len: 1,
                        line_count,
                    });
                }
                spans.entry(id).or_default().push(index);
            }
            if ids.len() > 1 {
                return Err(Error::Msg(format!("line {index} carries {} annotations", ids.len())));
            }
        }

        for (id, indices) in spans {
            let contiguous = indices.windows(2).all(|w| w[1] == w[0] + 1);
            if !contiguous {
                return Err(Error::Msg(format!("annotation {id} is attached to a non-contiguous span")));
            }
        }

        for (index, line) in self.lines.iter().enumerate() {
            if line.index != index {
                return Err(Error::Msg(format!("line at position {index} has index {}", line.index)));
            }
        }
        Ok(())
    }
}
