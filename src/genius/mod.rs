//! Genius referent payloads.
//!
//! A referent ties a lyric `fragment` to one or more annotations whose
//! bodies arrive as a DOM tree. Only the first annotation of each referent
//! is used, matching what the Genius song page displays.

use serde_json::Value;

use crate::constants::cleaning::{MIN_BODY_CHARS, MIN_FRAGMENT_CHARS};
use crate::error::{Error, Result};
use crate::text::cleaning::{clean_annotation_text, clean_fragment, extract_text_from_dom};
use crate::types::{Annotation, AnnotationId};

/// Convert a Genius referents payload into cleaned annotations.
///
/// Accepts either a bare array of referents or an API envelope
/// (`{"response": {"referents": [...]}}`). Referents with missing fields,
/// or whose cleaned body or fragment is too short to be useful, are
/// skipped with a log line rather than failing the whole song.
pub fn annotations_from_referents(payload: &Value) -> Result<Vec<Annotation>> {
    let referents = payload
        .as_array()
        .or_else(|| payload["response"]["referents"].as_array())
        .or_else(|| payload["referents"].as_array())
        .ok_or_else(|| Error::parse("Missing referents array in Genius payload", None))?;

    let annotations: Vec<Annotation> = referents.iter().filter_map(parse_referent).collect();

    tracing::info!(
        "Cleaned {} of {} Genius referents",
        annotations.len(),
        referents.len()
    );
    Ok(annotations)
}

fn parse_referent(referent: &Value) -> Option<Annotation> {
    let Some(id) = referent["id"].as_u64() else {
        tracing::warn!("Skipping referent without numeric id");
        return None;
    };

    let (Some(fragment), Some(dom)) = (
        referent["fragment"].as_str(),
        referent["annotations"].get(0).and_then(|a| a.get("body")).and_then(|b| b.get("dom")),
    ) else {
        tracing::warn!("Skipping referent {id}: missing fragment or annotation body");
        return None;
    };

    let body = clean_annotation_text(&extract_text_from_dom(dom));
    let excerpt = clean_fragment(fragment);

    if body.chars().count() < MIN_BODY_CHARS || excerpt.chars().count() < MIN_FRAGMENT_CHARS {
        let preview: String = excerpt.chars().take(20).collect();
        tracing::debug!("Skipping short annotation {id}: {preview}...");
        return None;
    }

    Some(Annotation {
        id: AnnotationId::new(id),
        excerpt,
        body,
    })
}
