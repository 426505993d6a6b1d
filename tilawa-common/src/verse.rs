//! Verse identifiers

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Unique verse identifier: (chapter, verse)
///
/// Ordering is numeric by chapter, then verse. Displays and serializes as
/// `"<chapter>:<verse>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VerseRef {
    pub chapter: u32,
    pub verse: u32,
}

impl VerseRef {
    pub fn new(chapter: u32, verse: u32) -> Self {
        Self { chapter, verse }
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}

impl FromStr for VerseRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (chapter, verse) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("Verse reference '{}' is not chapter:verse", s)))?;

        let parse = |part: &str, what: &str| -> Result<u32> {
            match part.trim().parse::<u32>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(Error::InvalidInput(format!(
                    "Invalid {} number '{}' in verse reference '{}'",
                    what, part, s
                ))),
            }
        };

        Ok(Self::new(parse(chapter, "chapter")?, parse(verse, "verse")?))
    }
}

impl Serialize for VerseRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VerseRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
