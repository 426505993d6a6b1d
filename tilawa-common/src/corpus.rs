//! Corpus Store
//!
//! Loads the canonical verse collection once at startup. Each entry caches
//! its normalized text and word tokens so requests never re-normalize the
//! corpus. There is no mutation API: after construction the corpus is shared
//! read-only (typically behind an `Arc`) by every request.
//!
//! Accepted JSON source shapes:
//! - object keyed by reference: `{ "1:1": "...", "1:2": "..." }`
//! - array of records: `[{ "chapter": 1, "verse": 1, "text": "..." }]`

use crate::normalize::normalize;
use crate::verse::VerseRef;
use crate::{Error, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// One canonical verse with its cached comparison form
#[derive(Debug, Clone)]
pub struct VerseEntry {
    reference: VerseRef,
    canonical_text: String,
    normalized_text: String,
    tokens: Vec<String>,
}

impl VerseEntry {
    fn new(reference: VerseRef, canonical_text: String) -> Self {
        let normalized_text = normalize(&canonical_text);
        let tokens = normalized_text.split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect();
        Self {
            reference,
            canonical_text,
            normalized_text,
            tokens,
        }
    }

    pub fn reference(&self) -> VerseRef {
        self.reference
    }

    /// Authoritative wording, as stored in the source
    pub fn canonical_text(&self) -> &str {
        &self.canonical_text
    }

    pub fn normalized_text(&self) -> &str {
        &self.normalized_text
    }

    /// Word tokens of the normalized text
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Record shape for array-style corpus documents
#[derive(Debug, Deserialize)]
struct VerseRecord {
    chapter: u32,
    verse: u32,
    text: String,
}

/// Object-style document kept as raw pairs, so a repeated key reaches the
/// duplicate check instead of overwriting the earlier verse
#[derive(Debug)]
struct KeyedPairs(Vec<(String, String)>);

impl<'de> Deserialize<'de> for KeyedPairs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PairsVisitor;

        impl<'de> Visitor<'de> for PairsVisitor {
            type Value = KeyedPairs;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping \"chapter:verse\" to verse text")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> std::result::Result<Self::Value, M::Error> {
                let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(pair) = map.next_entry::<String, String>()? {
                    pairs.push(pair);
                }
                Ok(KeyedPairs(pairs))
            }
        }

        deserializer.deserialize_map(PairsVisitor)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorpusDocument {
    Keyed(KeyedPairs),
    Records(Vec<VerseRecord>),
}

/// Immutable, ordered verse collection
#[derive(Debug)]
pub struct Corpus {
    entries: Vec<VerseEntry>,
    index: HashMap<VerseRef, usize>,
}

impl Corpus {
    /// Load corpus from a JSON file
    ///
    /// # Errors
    /// Returns `Error::Config` if the file is missing, malformed, empty, or
    /// contains duplicate references or verses that normalize to nothing.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading corpus");

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read corpus source {}: {}", path.display(), e))
        })?;

        let corpus = Self::from_json_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => Error::Config(format!("Malformed corpus source {}: {}", path.display(), other)),
        })?;

        info!(path = %path.display(), verses = corpus.len(), "Corpus loaded");
        Ok(corpus)
    }

    /// Build corpus from a JSON document (keyed object or record array)
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: CorpusDocument = serde_json::from_str(json)?;

        let pairs: Vec<(VerseRef, String)> = match document {
            CorpusDocument::Keyed(KeyedPairs(raw)) => {
                let mut pairs = raw
                    .into_iter()
                    .map(|(key, text)| -> Result<(VerseRef, String)> { Ok((key.parse()?, text)) })
                    .collect::<Result<Vec<_>>>()?;
                // Object key order is not meaningful; use recitation order.
                // The sort is stable, so duplicates stay visible to from_pairs.
                pairs.sort_by_key(|(reference, _)| *reference);
                pairs
            }
            CorpusDocument::Records(records) => records
                .into_iter()
                .map(|r| {
                    if r.chapter == 0 || r.verse == 0 {
                        return Err(Error::InvalidInput(format!(
                            "Verse reference {}:{} must be positive",
                            r.chapter, r.verse
                        )));
                    }
                    Ok((VerseRef::new(r.chapter, r.verse), r.text))
                })
                .collect::<Result<Vec<_>>>()?,
        };

        Self::from_pairs(pairs)
    }

    /// Build corpus from in-memory pairs, preserving their order
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (VerseRef, S)>,
        S: Into<String>,
    {
        let mut entries = Vec::new();
        let mut index = HashMap::new();

        for (reference, text) in pairs {
            let entry = VerseEntry::new(reference, text.into());
            if entry.tokens.is_empty() {
                return Err(Error::Config(format!(
                    "Verse {} has no comparable text after normalization",
                    reference
                )));
            }
            if index.insert(reference, entries.len()).is_some() {
                return Err(Error::Config(format!("Duplicate verse reference {}", reference)));
            }
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(Error::Config("Corpus contains no verses".to_string()));
        }

        Ok(Self { entries, index })
    }

    /// All entries in canonical order
    pub fn entries(&self) -> &[VerseEntry] {
        &self.entries
    }

    /// Find the entry for `reference`
    ///
    /// # Errors
    /// Returns `Error::NotFound` if the reference is absent.
    pub fn lookup(&self, reference: VerseRef) -> Result<&VerseEntry> {
        self.index
            .get(&reference)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::NotFound(format!("Verse {}", reference)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed corpus
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
