//! Domain types shared across every component crate.
//!
//! Kept deliberately small: only the identifiers referenced by more than one
//! component live here, to avoid a dependency-cycle-shaped grab bag. Most
//! component-local types (e.g. `SourcePack`, `Job`) live in their owning
//! crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A canonical `Book.Chapter.Verse` identifier, e.g. `John.1.18`.
///
/// This is the cross-component reference type: the spine, the variant
/// store, the gate ledger, and every exporter key off of it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VerseId {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
}

/// Error parsing a [`VerseId`] from its canonical string form.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid verse id {0:?}: expected Book.Chapter.Verse")]
pub struct VerseIdParseError(pub String);

impl VerseId {
    #[must_use]
    pub fn new(book: impl Into<String>, chapter: u32, verse: u32) -> Self {
        Self {
            book: book.into(),
            chapter,
            verse,
        }
    }
}

impl FromStr for VerseId {
    type Err = VerseIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, '.');
        let verse = parts.next().ok_or_else(|| VerseIdParseError(s.to_string()))?;
        let chapter = parts.next().ok_or_else(|| VerseIdParseError(s.to_string()))?;
        let book = parts.next().ok_or_else(|| VerseIdParseError(s.to_string()))?;
        if parts.next().is_some() {
            return Err(VerseIdParseError(s.to_string()));
        }
        let chapter: u32 = chapter.parse().map_err(|_| VerseIdParseError(s.to_string()))?;
        let verse: u32 = verse.parse().map_err(|_| VerseIdParseError(s.to_string()))?;
        if book.is_empty() {
            return Err(VerseIdParseError(s.to_string()));
        }
        Ok(VerseId {
            book: book.to_string(),
            chapter,
            verse,
        })
    }
}

impl fmt::Display for VerseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.book, self.chapter, self.verse)
    }
}

impl TryFrom<String> for VerseId {
    type Error = VerseIdParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VerseId> for String {
    fn from(value: VerseId) -> Self {
        value.to_string()
    }
}

/// A lowercase slug identifying an installed data pack, e.g. `sblgnt`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackId(pub String);

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PackId {
    fn from(value: &str) -> Self {
        PackId(value.to_string())
    }
}

impl From<String> for PackId {
    fn from(value: String) -> Self {
        PackId(value)
    }
}

/// Role a source pack plays in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackRole {
    Spine,
    Comparative,
    SensePack,
}

impl fmt::Display for PackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackRole::Spine => "spine",
            PackRole::Comparative => "comparative",
            PackRole::SensePack => "sense_pack",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verse_id_parses_canonical_form() {
        let v: VerseId = "John.1.18".parse().unwrap();
        assert_eq!(v, VerseId::new("John", 1, 18));
    }

    #[test]
    fn verse_id_round_trips_display() {
        let v = VerseId::new("John", 1, 18);
        assert_eq!(v.to_string(), "John.1.18");
        assert_eq!(v.to_string().parse::<VerseId>().unwrap(), v);
    }

    #[test]
    fn verse_id_rejects_malformed_input() {
        assert!("John.1".parse::<VerseId>().is_err());
        assert!("John.one.18".parse::<VerseId>().is_err());
        assert!(".1.18".parse::<VerseId>().is_err());
    }

    #[test]
    fn verse_id_orders_lexicographically_within_book() {
        let a = VerseId::new("John", 1, 18);
        let b = VerseId::new("John", 1, 19);
        assert!(a < b);
    }
}
