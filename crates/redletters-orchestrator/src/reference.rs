//! Passage reference parsing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use redletters_utils::VerseId;

#[derive(Debug, thiserror::Error)]
#[error("unparseable passage reference: {0:?}")]
pub struct BadReference(pub String);

/// A parsed passage reference: the resolved book name, the inclusive
/// chapter/verse span, the expanded list of verse ids, and a canonical
/// `Book.Chapter.Verse[-Verse2]` rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    pub book: String,
    pub start_chapter: u32,
    pub start_verse: u32,
    pub end_chapter: u32,
    pub end_verse: u32,
    pub verse_ids: Vec<VerseId>,
    pub normalized_ref: String,
}

static BOOK_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("jn", "John"),
        ("john", "John"),
        ("mt", "Matthew"),
        ("matt", "Matthew"),
        ("matthew", "Matthew"),
        ("mk", "Mark"),
        ("mark", "Mark"),
        ("lk", "Luke"),
        ("luke", "Luke"),
        ("ro", "Romans"),
        ("rom", "Romans"),
        ("romans", "Romans"),
        ("ga", "Galatians"),
        ("gal", "Galatians"),
        ("galatians", "Galatians"),
    ])
});

// `Book C:V` or `Book C:V-V2`, hyphen or en-dash.
static LOOSE_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([1-3]?\s?[A-Za-z]+)\s+(\d+):(\d+)(?:\s*[-\u{2013}]\s*(\d+))?\s*$").unwrap());

// Canonical `Book.Chapter.Verse`.
static CANONICAL_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([1-3]?[A-Za-z]+)\.(\d+)\.(\d+)\s*$").unwrap());

fn resolve_book(raw: &str) -> Option<String> {
    let key = raw.to_lowercase().replace([' ', '.'], "");
    BOOK_ALIASES.get(key.as_str()).map(|b| (*b).to_string())
}

/// Parse a passage reference string. Accepts `Book C:V`, `Book C:V-V2`
/// (hyphen or en-dash), and canonical `Book.Chapter.Verse`.
pub fn parse_reference(reference: &str) -> Result<ParsedReference, BadReference> {
    if let Some(caps) = LOOSE_FORM.captures(reference) {
        let book = resolve_book(&caps[1]).ok_or_else(|| BadReference(reference.to_string()))?;
        let chapter: u32 = caps[2].parse().map_err(|_| BadReference(reference.to_string()))?;
        let start_verse: u32 = caps[3].parse().map_err(|_| BadReference(reference.to_string()))?;
        let end_verse: u32 = match caps.get(4) {
            Some(m) => m.as_str().parse().map_err(|_| BadReference(reference.to_string()))?,
            None => start_verse,
        };
        if end_verse < start_verse {
            return Err(BadReference(reference.to_string()));
        }
        return Ok(build_parsed(book, chapter, start_verse, chapter, end_verse));
    }

    if let Some(caps) = CANONICAL_FORM.captures(reference) {
        let book = resolve_book(&caps[1]).unwrap_or_else(|| caps[1].to_string());
        let chapter: u32 = caps[2].parse().map_err(|_| BadReference(reference.to_string()))?;
        let verse: u32 = caps[3].parse().map_err(|_| BadReference(reference.to_string()))?;
        return Ok(build_parsed(book, chapter, verse, chapter, verse));
    }

    Err(BadReference(reference.to_string()))
}

fn build_parsed(book: String, start_chapter: u32, start_verse: u32, end_chapter: u32, end_verse: u32) -> ParsedReference {
    let verse_ids = (start_verse..=end_verse).map(|v| VerseId::new(book.clone(), start_chapter, v)).collect();
    let normalized_ref = if start_verse == end_verse {
        format!("{book}.{start_chapter}.{start_verse}")
    } else {
        format!("{book}.{start_chapter}.{start_verse}-{end_verse}")
    };
    ParsedReference { book, start_chapter, start_verse, end_chapter, end_verse, verse_ids, normalized_ref }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loose_single_verse() {
        let parsed = parse_reference("John 1:18").unwrap();
        assert_eq!(parsed.book, "John");
        assert_eq!(parsed.verse_ids, vec![VerseId::new("John", 1, 18)]);
        assert_eq!(parsed.normalized_ref, "John.1.18");
    }

    #[test]
    fn parses_hyphen_range() {
        let parsed = parse_reference("John 1:18-19").unwrap();
        assert_eq!(parsed.verse_ids, vec![VerseId::new("John", 1, 18), VerseId::new("John", 1, 19)]);
    }

    #[test]
    fn parses_en_dash_range() {
        let parsed = parse_reference("John 1:18\u{2013}19").unwrap();
        assert_eq!(parsed.verse_ids.len(), 2);
    }

    #[test]
    fn resolves_book_aliases_case_insensitively() {
        let parsed = parse_reference("Jn 1:18").unwrap();
        assert_eq!(parsed.book, "John");
        let parsed = parse_reference("MATT 1:1").unwrap();
        assert_eq!(parsed.book, "Matthew");
    }

    #[test]
    fn accepts_canonical_form() {
        let parsed = parse_reference("John.1.18").unwrap();
        assert_eq!(parsed.normalized_ref, "John.1.18");
    }

    #[test]
    fn rejects_malformed_reference() {
        assert!(parse_reference("not a reference").is_err());
        assert!(parse_reference("John 1:19-18").is_err());
    }
}
