//! Spine provider abstraction.
//!
//! The spine is the canonical base text against which variants are defined.
//! This crate declares only the read-only lookup seam — `get_verse_text`,
//! `get_verse_tokens`, `has_verse`, `source_key` — plus two concrete
//! implementations: an in-memory fixture (tests, demos) and one backed by
//! an installed pack's on-disk files.
//!
//! Token structure is intentionally opaque beyond
//! `{ position, surface_text, lemma?, morph?, pos? }`: morphological
//! tagging, lexicon lookups, and the like are external collaborators.

use std::collections::HashMap;
use std::path::Path;

use redletters_utils::error::{ErrorCategory, UserFriendlyError};
use redletters_utils::VerseId;
use serde::{Deserialize, Serialize};

/// A single token within a verse. Fields beyond `position`/`surface_text`
/// are optional: the core treats everything past that as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub position: u32,
    pub surface_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morph: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
}

impl Token {
    #[must_use]
    pub fn new(position: u32, surface_text: impl Into<String>) -> Self {
        Self {
            position,
            surface_text: surface_text.into(),
            lemma: None,
            morph: None,
            pos: None,
        }
    }
}

/// The text of one verse plus its tokens, as returned by a
/// [`SpineProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseText {
    pub verse_id: VerseId,
    pub text: String,
    pub tokens: Vec<Token>,
    pub source_key: String,
}

impl VerseText {
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.tokens.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpineError {
    #[error(
        "spine data not installed: {pack_id}\n\nTo install the required spine data, run:\n\n  redletters source install {pack_id}\n\nFor EULA-licensed sources, add --accept-eula:\n\n  redletters source install {pack_id} --accept-eula\n"
    )]
    NotInstalled { pack_id: String },
    #[error("failed to read spine file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse spine data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid verse id in spine record: {0}")]
    InvalidVerseId(String),
}

impl UserFriendlyError for SpineError {
    fn category(&self) -> ErrorCategory {
        match self {
            SpineError::NotInstalled { .. } => ErrorCategory::DataAvailability,
            SpineError::Io { .. } | SpineError::Parse(_) | SpineError::InvalidVerseId(_) => {
                ErrorCategory::Internal
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            SpineError::NotInstalled { pack_id } => {
                vec![format!("run `redletters source install {pack_id}`")]
            }
            _ => Vec::new(),
        }
    }
}

/// Read-only verse-text lookup, keyed by `Book.Chapter.Verse`.
///
/// This is the trait-at-the-seam for the one piece of spine behavior the
/// core actually depends on; concrete third-party ingest formats
/// (MorphGNT, TSV lexicons) are out of scope and live behind
/// whichever implementation a deployment chooses.
pub trait SpineProvider: Send + Sync {
    fn get_verse_text(&self, verse_id: &VerseId) -> Result<Option<VerseText>, SpineError>;
    fn get_verse_tokens(&self, verse_id: &VerseId) -> Result<Vec<Token>, SpineError>;
    fn has_verse(&self, verse_id: &VerseId) -> bool;
    fn source_key(&self) -> &str;
}

/// An in-memory spine fixture, for tests and demos. Verses are seeded via
/// [`FixtureSpineProvider::with_verse`].
#[derive(Debug, Clone, Default)]
pub struct FixtureSpineProvider {
    source_key: String,
    verses: HashMap<VerseId, VerseText>,
}

impl FixtureSpineProvider {
    #[must_use]
    pub fn new(source_key: impl Into<String>) -> Self {
        Self {
            source_key: source_key.into(),
            verses: HashMap::new(),
        }
    }

    /// Seed a verse from whitespace-separated Greek text; tokens are
    /// derived positionally (surface text only — no morphology).
    #[must_use]
    pub fn with_verse(mut self, verse_id: VerseId, text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = text
            .split_whitespace()
            .enumerate()
            .map(|(i, w)| Token::new(i as u32, w))
            .collect();
        let source_key = self.source_key.clone();
        self.verses.insert(
            verse_id.clone(),
            VerseText {
                verse_id,
                text,
                tokens,
                source_key,
            },
        );
        self
    }
}

impl SpineProvider for FixtureSpineProvider {
    fn get_verse_text(&self, verse_id: &VerseId) -> Result<Option<VerseText>, SpineError> {
        Ok(self.verses.get(verse_id).cloned())
    }

    fn get_verse_tokens(&self, verse_id: &VerseId) -> Result<Vec<Token>, SpineError> {
        Ok(self
            .verses
            .get(verse_id)
            .map(|v| v.tokens.clone())
            .unwrap_or_default())
    }

    fn has_verse(&self, verse_id: &VerseId) -> bool {
        self.verses.contains_key(verse_id)
    }

    fn source_key(&self) -> &str {
        &self.source_key
    }
}

/// On-disk record format for an installed-pack spine file: one JSON object
/// per line, `{"verse_id": "...", "text": "...", "tokens": [...]}`.
#[derive(Debug, Clone, Deserialize)]
struct SpineRecord {
    verse_id: String,
    text: String,
    #[serde(default)]
    tokens: Vec<Token>,
}

/// A spine backed by an installed pack's JSONL verse file, loaded fully
/// into memory at construction.
pub struct InstalledSpineProvider {
    pack_id: String,
    verses: HashMap<VerseId, VerseText>,
}

impl InstalledSpineProvider {
    /// Load from a JSONL file at `path` under the installed pack
    /// `pack_id`. Returns [`SpineError::NotInstalled`] if `path` doesn't
    /// exist, matching the `NoSpine` contract.
    pub fn load(pack_id: impl Into<String>, path: &Path) -> Result<Self, SpineError> {
        let pack_id = pack_id.into();
        if !path.exists() {
            return Err(SpineError::NotInstalled {
                pack_id: pack_id.clone(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| SpineError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut verses = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: SpineRecord = serde_json::from_str(line)?;
            let verse_id: VerseId = record
                .verse_id
                .parse()
                .map_err(|_| SpineError::InvalidVerseId(record.verse_id.clone()))?;
            verses.insert(
                verse_id.clone(),
                VerseText {
                    verse_id,
                    text: record.text,
                    tokens: record.tokens,
                    source_key: pack_id.clone(),
                },
            );
        }

        Ok(Self { pack_id, verses })
    }
}

impl SpineProvider for InstalledSpineProvider {
    fn get_verse_text(&self, verse_id: &VerseId) -> Result<Option<VerseText>, SpineError> {
        Ok(self.verses.get(verse_id).cloned())
    }

    fn get_verse_tokens(&self, verse_id: &VerseId) -> Result<Vec<Token>, SpineError> {
        Ok(self
            .verses
            .get(verse_id)
            .map(|v| v.tokens.clone())
            .unwrap_or_default())
    }

    fn has_verse(&self, verse_id: &VerseId) -> bool {
        self.verses.contains_key(verse_id)
    }

    fn source_key(&self) -> &str {
        &self.pack_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn john_1_18() -> VerseId {
        "John.1.18".parse().unwrap()
    }

    #[test]
    fn fixture_provider_round_trips_verse_text() {
        let spine = FixtureSpineProvider::new("sblgnt").with_verse(john_1_18(), "θεὸν οὐδεὶς ἑώρακεν πώποτε");
        let verse = spine.get_verse_text(&john_1_18()).unwrap().unwrap();
        assert_eq!(verse.word_count(), 4);
        assert!(spine.has_verse(&john_1_18()));
        assert_eq!(spine.source_key(), "sblgnt");
    }

    #[test]
    fn fixture_provider_missing_verse_returns_none() {
        let spine = FixtureSpineProvider::new("sblgnt");
        assert!(spine.get_verse_text(&john_1_18()).unwrap().is_none());
        assert!(!spine.has_verse(&john_1_18()));
    }

    #[test]
    fn installed_provider_missing_file_is_not_installed_error() {
        let err = InstalledSpineProvider::load("sblgnt", Path::new("/nonexistent/spine.jsonl")).unwrap_err();
        assert!(matches!(err, SpineError::NotInstalled { .. }));
    }

    #[test]
    fn installed_provider_loads_jsonl_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spine.jsonl");
        std::fs::write(
            &path,
            r#"{"verse_id":"John.1.18","text":"θεὸν οὐδεὶς ἑώρακεν πώποτε","tokens":[{"position":0,"surface_text":"θεὸν"}]}
"#,
        )
        .unwrap();

        let spine = InstalledSpineProvider::load("sblgnt", &path).unwrap();
        let verse = spine.get_verse_text(&john_1_18()).unwrap().unwrap();
        assert_eq!(verse.tokens.len(), 1);
        assert_eq!(verse.source_key, "sblgnt");
    }
}
