//! Display-preserving cleanup of Genius fragments and annotation bodies.
//!
//! Unlike [`super::normalize`], these functions keep case, punctuation and
//! line structure: their output is what a learner eventually reads.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Regex matching `[Chorus]` style tags (single line).
#[allow(clippy::expect_used)]
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[.*?\]").expect("valid regex: RE_TAG")
});

/// Regex matching every newline variant Genius emits.
#[allow(clippy::expect_used)]
static RE_NEWLINES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\n\r\u{2028}\u{2029}]+").expect("valid regex: RE_NEWLINES")
});

/// Regex matching HTML line breaks.
#[allow(clippy::expect_used)]
static RE_BR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>").expect("valid regex: RE_BR")
});

/// Regex matching whitespace before punctuation (`word ,next`).
#[allow(clippy::expect_used)]
static RE_PUNCT_SPACING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+([.,!?:;])\s*").expect("valid regex: RE_PUNCT_SPACING")
});

/// Regex matching `don 't`.
#[allow(clippy::expect_used)]
static RE_LOOSE_APOSTROPHE_LEFT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w)\s+'(\w)").expect("valid regex: RE_LOOSE_APOSTROPHE_LEFT")
});

/// Regex matching `don' t`.
#[allow(clippy::expect_used)]
static RE_LOOSE_APOSTROPHE_RIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w)'\s+(\w)").expect("valid regex: RE_LOOSE_APOSTROPHE_RIGHT")
});

/// Replace typographic quotes with their ASCII forms.
pub fn uncurl_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => '"',
            other => other,
        })
        .collect()
}

/// Undo UTF-8 text that was decoded as Windows-1252 / Latin-1.
///
/// The text is re-encoded one byte per character and kept only if those
/// bytes form valid UTF-8 different from the input. Correct text is
/// returned untouched.
pub fn repair_mojibake(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }

    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        match single_byte(c) {
            Some(b) => bytes.push(b),
            None => return Cow::Borrowed(text),
        }
    }

    match String::from_utf8(bytes) {
        Ok(fixed) if fixed != text => Cow::Owned(fixed),
        _ => Cow::Borrowed(text),
    }
}

/// Map a character back to the Windows-1252 byte that would decode to it.
fn single_byte(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        // Latin-1 maps code points 0x00..=0xFF to the same byte, which also
        // covers the five positions Windows-1252 leaves undefined.
        other => return u8::try_from(u32::from(other)).ok(),
    };
    Some(byte)
}

/// Repair encoding damage and uncurl quotes.
pub fn fix_text(text: &str) -> String {
    uncurl_quotes(&repair_mojibake(text))
}

/// Clean an annotation fragment while preserving its line breaks.
///
/// Tags such as `[Chorus]` are dropped, whitespace inside each line is
/// collapsed and empty lines are removed.
pub fn clean_fragment(fragment: &str) -> String {
    let fixed = fix_text(fragment);
    let untagged = RE_TAG.replace_all(&fixed, "");

    RE_NEWLINES
        .split(&untagged)
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Clean annotation body text, tightening punctuation and contractions.
pub fn clean_annotation_text(text: &str) -> String {
    let with_breaks = RE_BR.replace_all(text, "\n");
    let uncurled = uncurl_quotes(&with_breaks);

    RE_NEWLINES
        .split(&uncurled)
        .map(|line| {
            let line = fix_text(line);
            let line = RE_PUNCT_SPACING.replace_all(&line, "${1} ");
            let line = RE_LOOSE_APOSTROPHE_LEFT.replace_all(&line, "${1}'${2}");
            let line = RE_LOOSE_APOSTROPHE_RIGHT.replace_all(&line, "${1}'${2}");
            collapse_whitespace(&line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flatten a Genius annotation DOM into plain text.
///
/// Block elements (`p`, `div`, `br`) become line breaks.
pub fn extract_text_from_dom(dom: &Value) -> String {
    let mut parts: Vec<String> = Vec::new();
    collect_dom_text(dom, &mut parts);
    parts.concat().trim().to_string()
}

fn collect_dom_text(node: &Value, parts: &mut Vec<String>) {
    match node {
        Value::String(s) => parts.push(s.clone()),
        Value::Array(children) => {
            for child in children {
                collect_dom_text(child, parts);
            }
        }
        Value::Object(map) => {
            let tag = map.get("tag").and_then(Value::as_str);
            if matches!(tag, Some("p" | "div" | "br")) {
                push_break(parts);
            }
            if let Some(children) = map.get("children") {
                collect_dom_text(children, parts);
            }
            if matches!(tag, Some("p" | "div")) {
                push_break(parts);
            }
        }
        _ => {}
    }
}

fn push_break(parts: &mut Vec<String>) {
    if parts.last().is_some_and(|last| !last.ends_with('\n')) {
        parts.push("\n".to_string());
    }
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}
