//! Feedback Composer
//!
//! Turns a [`MatchResult`] into the structured [`Summary`] handed to the
//! report writer. The reported score is the similarity of the same word
//! alignment the weak points are read from, so the two always agree.
//!
//! Positions are zero-based canonical token indices. An insertion's position
//! is the number of canonical tokens preceding the extra word, so a word
//! appended after a four-word verse sits at position 4.

use crate::align::{align, EditOp};
use crate::corpus::Corpus;
use crate::matcher::MatchResult;
use crate::normalize::tokenize;
use crate::verse::VerseRef;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Discrepancy kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeakPointKind {
    /// Canonical word recited as a different word
    Substitution,
    /// Canonical word missed
    Deletion,
    /// Extra word not in the verse
    Insertion,
}

/// Token-level discrepancy between recitation and verse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakPoint {
    pub position: usize,
    pub canonical_word: Option<String>,
    pub recognized_word: Option<String>,
    pub kind: WeakPointKind,
}

/// Whether a verse was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Matched,
    NoRecognizableVerse,
}

/// Structured recitation feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub status: SummaryStatus,
    pub matched_reference: Option<VerseRef>,
    pub score: f64,
    pub weak_points: Vec<WeakPoint>,
}

impl Summary {
    /// Summary for a recitation that matched nothing
    pub fn no_recognizable_verse(score: f64) -> Self {
        Self {
            status: SummaryStatus::NoRecognizableVerse,
            matched_reference: None,
            score,
            weak_points: Vec::new(),
        }
    }

    pub fn is_perfect(&self) -> bool {
        self.status == SummaryStatus::Matched && self.weak_points.is_empty()
    }
}

/// Build the summary for `query_text` given the matcher's verdict
///
/// # Errors
/// Returns `Error::NotFound` if the result names a verse absent from `corpus`.
pub fn compose(query_text: &str, result: &MatchResult, corpus: &Corpus) -> Result<Summary> {
    let Some(reference) = result.reference else {
        return Ok(Summary::no_recognizable_verse(result.score));
    };

    let entry = corpus.lookup(reference)?;
    let canonical = entry.tokens();
    let query = tokenize(query_text);

    let alignment = align(canonical, &query);

    let mut weak_points: Vec<WeakPoint> = alignment
        .ops()
        .iter()
        .filter(|op| op.is_edit())
        .filter_map(|op| match *op {
            EditOp::Match { .. } => None,
            EditOp::Substitution { canonical: c, query: q } => Some(WeakPoint {
                position: c,
                canonical_word: Some(canonical[c].clone()),
                recognized_word: Some(query[q].clone()),
                kind: WeakPointKind::Substitution,
            }),
            EditOp::Deletion { canonical: c } => Some(WeakPoint {
                position: c,
                canonical_word: Some(canonical[c].clone()),
                recognized_word: None,
                kind: WeakPointKind::Deletion,
            }),
            EditOp::Insertion { query: q, at } => Some(WeakPoint {
                position: at,
                canonical_word: None,
                recognized_word: Some(query[q].clone()),
                kind: WeakPointKind::Insertion,
            }),
        })
        .collect();

    // Stable: alignment order is kept within a position
    weak_points.sort_by_key(|wp| wp.position);

    tracing::debug!(
        reference = %reference,
        weak_points = weak_points.len(),
        "Summary composed"
    );

    Ok(Summary {
        status: SummaryStatus::Matched,
        matched_reference: Some(reference),
        score: alignment.similarity(),
        weak_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::best_match;
    use serde_json::json;

    fn corpus() -> Corpus {
        Corpus::from_pairs([
            (VerseRef::new(112, 1), "قُلْ هُوَ ٱللَّهُ أَحَدٌ"),
            (VerseRef::new(112, 2), "ٱللَّهُ ٱلصَّمَدُ"),
            (VerseRef::new(112, 3), "لَمْ يَلِدْ وَلَمْ يُولَدْ"),
        ])
        .unwrap()
    }

    fn summarize(query: &str) -> Summary {
        let corpus = corpus();
        compose(query, &best_match(query, &corpus), &corpus).unwrap()
    }

    #[test]
    fn test_perfect_recitation_has_no_weak_points() {
        let summary = summarize("قل هو الله احد");
        assert_eq!(summary.matched_reference, Some(VerseRef::new(112, 1)));
        assert!(summary.is_perfect());
    }

    #[test]
    fn test_substitution_at_position() {
        let summary = summarize("قل هو الرب احد");
        assert_eq!(
            summary.weak_points,
            vec![WeakPoint {
                position: 2,
                canonical_word: Some("الله".to_string()),
                recognized_word: Some("الرب".to_string()),
                kind: WeakPointKind::Substitution,
            }]
        );
    }

    #[test]
    fn test_deletion_and_insertion_are_tagged() {
        let summary = summarize("لم يلد ولم يولد ابدا");
        assert_eq!(summary.weak_points.len(), 1);
        assert_eq!(summary.weak_points[0].kind, WeakPointKind::Insertion);
        assert_eq!(summary.weak_points[0].position, 4);
        assert_eq!(summary.weak_points[0].canonical_word, None);

        let summary = summarize("قل الله احد");
        assert_eq!(summary.weak_points.len(), 1);
        assert_eq!(summary.weak_points[0].kind, WeakPointKind::Deletion);
        assert_eq!(summary.weak_points[0].position, 1);
        assert_eq!(summary.weak_points[0].recognized_word, None);
    }

    #[test]
    fn test_weak_points_ordered_by_canonical_position() {
        let summary = summarize("قل هي الله احد الصمد");
        let positions: Vec<usize> = summary.weak_points.iter().map(|wp| wp.position).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
        assert_eq!(summary.weak_points.len(), 2);
    }

    #[test]
    fn test_edit_count_matches_score() {
        let query = "قل هو الرب احد الصمد";
        let corpus = corpus();
        let result = best_match(query, &corpus);
        let summary = compose(query, &result, &corpus).unwrap();

        let expected = 1.0 - summary.weak_points.len() as f64 / 5.0;
        assert!((summary.score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_char_ranked_summary_score_matches_weak_points() {
        use crate::matcher::{Matcher, MatcherConfig, SimilarityMetric};

        let corpus = corpus();
        let matcher = Matcher::new(MatcherConfig {
            metric: SimilarityMetric::Char,
            ..Default::default()
        });
        let query = "قل هوه الله احد";
        let summary = compose(query, &matcher.best_match(query, &corpus), &corpus).unwrap();

        assert_eq!(summary.matched_reference, Some(VerseRef::new(112, 1)));
        assert_eq!(summary.weak_points.len(), 1);
        assert!((summary.score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_no_match_summary() {
        let summary = summarize("مرحبا بالعالم");
        assert_eq!(summary.status, SummaryStatus::NoRecognizableVerse);
        assert!(summary.matched_reference.is_none());
        assert!(summary.weak_points.is_empty());
    }

    #[test]
    fn test_unknown_reference_is_not_found() {
        let result = MatchResult {
            reference: Some(VerseRef::new(2, 255)),
            score: 1.0,
        };
        assert!(compose("اي شيء", &result, &corpus()).is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let summary = summarize("قل هو الرب احد");
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "matched",
                "matched_reference": "112:1",
                "score": 0.75,
                "weak_points": [{
                    "position": 2,
                    "canonical_word": "الله",
                    "recognized_word": "الرب",
                    "kind": "substitution"
                }]
            })
        );

        let none = serde_json::to_value(Summary::no_recognizable_verse(0.0)).unwrap();
        assert_eq!(none["matched_reference"], serde_json::Value::Null);
        assert_eq!(none["status"], "no_recognizable_verse");
    }
}
