//! Canonical text form used for fuzzy comparison.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::cleaning::{repair_mojibake, uncurl_quotes};

/// Innermost bracketed tag; applied repeatedly to peel nested tags.
#[allow(clippy::expect_used)]
static RE_INNER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\[\]]*\]").expect("valid regex: RE_INNER_TAG")
});

#[allow(clippy::expect_used)]
static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").expect("valid regex: RE_WHITESPACE")
});

/// Upper bound on normalization passes when searching for a fixed point.
const MAX_PASSES: usize = 4;

/// Normalize lyric or excerpt text for matching.
///
/// Repairs encoding damage, uncurls quotes, lowercases, composes to NFC,
/// strips `[Verse 1]` style tags, collapses whitespace and trims
/// punctuation from both ends. The result is a fixed point:
/// `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let mut current = normalize_pass(text);
    for _ in 1..MAX_PASSES {
        let next = normalize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn normalize_pass(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let repaired = repair_mojibake(text);
    let lowered = uncurl_quotes(&repaired).to_lowercase();
    let composed: String = lowered.nfc().collect();
    let untagged = strip_tags(&composed);
    let collapsed = RE_WHITESPACE.replace_all(&untagged, " ");

    collapsed.trim_matches(is_edge_noise).to_string()
}

fn strip_tags(text: &str) -> String {
    let mut out = text.to_string();
    while RE_INNER_TAG.is_match(&out) {
        out = RE_INNER_TAG.replace_all(&out, " ").into_owned();
    }
    out
}

fn is_edge_noise(c: char) -> bool {
    c.is_whitespace()
        || c.is_ascii_punctuation()
        || matches!(c, '…' | '—' | '–' | '¡' | '¿' | '«' | '»' | '‹' | '›' | '•' | '·')
}
