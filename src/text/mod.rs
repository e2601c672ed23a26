//! Text processing for lyrics and annotations.
//!
//! - [`normalize`]: canonical form used only for comparison
//! - [`cleaning`]: display-preserving cleanup of Genius payloads
//! - [`parentheticals`]: ad-libs and notes embedded in lyric lines

pub mod cleaning;
pub mod normalize;
pub mod parentheticals;

pub use cleaning::{clean_annotation_text, clean_fragment, extract_text_from_dom, fix_text};
pub use normalize::normalize;
pub use parentheticals::{extract_parentheticals, Parenthetical, ParentheticalKind};
