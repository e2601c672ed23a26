//! Parenthetical content in lyric lines.
//!
//! Lyrics carry ad-libs, backing vocals and performance notes in
//! parentheses, e.g. `Hello (yeah) and (good (morning) everyone)`. This
//! module pulls them out so exercises can work on the sung line alone.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[allow(clippy::expect_used)]
static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").expect("valid regex: RE_WHITESPACE")
});

#[allow(clippy::expect_used)]
static RE_COMMA_SPACING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*,\s*").expect("valid regex: RE_COMMA_SPACING")
});

const ADLIBS: &[&str] = &["yeah", "uh", "oh", "ay", "woo", "hey"];
const BACKGROUND_TERMS: &[&str] = &["backing", "background", "vocals", "harmonies", "chorus"];
const SOUND_TERMS: &[&str] = &["sound", "noise", "sfx", "effect", "beat"];
const ACTION_TERMS: &[&str] = &["repeat", "fade", "stops", "starts", "plays"];
const REPETITION_TERMS: &[&str] = &["x2", "x3", "x4", "times"];
const TRANSLATION_TERMS: &[&str] = &[":", "means", "translation"];
const CLARIFICATION_TERMS: &[&str] = &["referring", "i.e.", "aka", "meaning"];

/// What a parenthetical group most likely is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParentheticalKind {
    /// Vocal ad-lib such as `(yeah)`.
    Adlib,
    /// Backing or background vocals.
    Background,
    /// Described sound or beat.
    SoundEffect,
    /// Repetition marker such as `(x2)`.
    Repetition,
    /// Alternate lyric.
    Alternate,
    /// Inline translation.
    Translation,
    /// Clarifying note.
    Clarification,
    /// Anything else, including performance directions.
    Other,
}

/// A parenthetical group removed from a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parenthetical {
    /// Text between the outermost parentheses, inner groups kept verbatim.
    pub content: String,
    /// Classification of the content.
    #[serde(rename = "type")]
    pub kind: ParentheticalKind,
}

/// Classify the text found inside a pair of parentheses.
pub fn classify_parenthetical(content: &str) -> ParentheticalKind {
    let content = content.trim().to_lowercase();
    let contains_any = |terms: &[&str]| terms.iter().any(|t| content.contains(t));

    if is_adlib(&content) {
        ParentheticalKind::Adlib
    } else if contains_any(BACKGROUND_TERMS) {
        ParentheticalKind::Background
    } else if contains_any(SOUND_TERMS) {
        ParentheticalKind::SoundEffect
    } else if contains_any(ACTION_TERMS) {
        ParentheticalKind::Other
    } else if contains_any(REPETITION_TERMS) {
        ParentheticalKind::Repetition
    } else if content.contains(" or ") || content.split_whitespace().any(|w| w == "alt" || w == "alt.") {
        ParentheticalKind::Alternate
    } else if contains_any(TRANSLATION_TERMS) {
        ParentheticalKind::Translation
    } else if contains_any(CLARIFICATION_TERMS) {
        ParentheticalKind::Clarification
    } else {
        ParentheticalKind::Other
    }
}

/// Ad-libs are matched per word with stretched letters folded, so
/// `ohhh` and `heyyy` count but `john` and `away` do not.
fn is_adlib(content: &str) -> bool {
    content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|word| {
            let folded = fold_repeats(word);
            ADLIBS.iter().any(|adlib| fold_repeats(adlib) == folded)
        })
}

fn fold_repeats(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut last = None;
    for c in word.chars() {
        if last != Some(c) {
            out.push(c);
        }
        last = Some(c);
    }
    out
}

/// Remove outermost parenthetical groups from `text`.
///
/// Returns the remaining text (whitespace collapsed, commas spaced as
/// `", "`) and the removed groups in order of appearance. Processing stops
/// at the first unbalanced `(`; that remainder is kept as-is.
pub fn extract_parentheticals(text: &str) -> (String, Vec<Parenthetical>) {
    if text.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut remaining = text.to_string();
    let mut found = Vec::new();

    while remaining.contains('(') {
        let Some((start, end)) = outermost_group(&remaining) else {
            tracing::warn!("Unmatched parentheses in lyric line: {remaining}");
            break;
        };

        let content = remaining[start + 1..end].to_string();
        let kind = classify_parenthetical(&content);
        found.push(Parenthetical { content, kind });
        remaining.replace_range(start..=end, "");
    }

    let collapsed = RE_WHITESPACE.replace_all(remaining.trim(), " ");
    let spaced = RE_COMMA_SPACING.replace_all(&collapsed, ", ");
    (spaced.trim().to_string(), found)
}

/// Byte offsets of the first complete outermost `(`…`)` pair.
fn outermost_group(text: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in text.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, i));
                }
            }
            _ => {}
        }
    }
    None
}
