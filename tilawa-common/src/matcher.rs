//! Verse Matcher
//!
//! Scores a recognized utterance against every verse of the corpus and
//! selects the best candidate.
//!
//! **Algorithm:**
//! 1. Normalize the query; an empty query is an immediate no-match (score 0)
//! 2. Score each verse against its cached normalized form
//! 3. Keep the highest score; exact ties go to the lower (chapter, verse)
//! 4. Below `min_score` the reference is withheld but the score is reported
//!
//! With [`SimilarityMetric::Char`] the character ratio only ranks verses; the
//! winner is then re-scored on words, so acceptance and the reported score
//! always agree with the weak points composed from the word alignment.
//!
//! Selection is a reduction with [`Candidate::better`], which is associative
//! and commutative, so the sequential and parallel paths agree.

use crate::align::{distance, similarity_from_distance};
use crate::corpus::{Corpus, VerseEntry};
use crate::normalize::tokenize;
use crate::verse::VerseRef;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Default acceptance threshold (inclusive)
pub const DEFAULT_MIN_SCORE: f64 = 0.5;

/// Default corpus size at which scoring fans out across threads
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 2048;

/// Similarity measure used for scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// `1 - word_edit_distance / max(word_count)`
    #[default]
    Word,
    /// Character-level normalized Levenshtein, used for ranking only.
    /// Tolerates misspelled words when picking the verse, but the accepted
    /// score is still the word ratio of the chosen verse.
    Char,
}

/// Matcher tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Minimum score for a confident match
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    #[serde(default)]
    pub metric: SimilarityMetric,

    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

fn default_min_score() -> f64 {
    DEFAULT_MIN_SCORE
}

fn default_parallel_threshold() -> usize {
    DEFAULT_PARALLEL_THRESHOLD
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            metric: SimilarityMetric::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

/// Outcome of a match request
///
/// `reference` is `None` when nothing reached the acceptance threshold;
/// `score` is still the best score seen (0 for an empty query).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub reference: Option<VerseRef>,
    pub score: f64,
}

impl MatchResult {
    pub fn no_match(score: f64) -> Self {
        Self { reference: None, score }
    }

    /// True when a verse was accepted
    pub fn is_confident(&self) -> bool {
        self.reference.is_some()
    }
}

/// A scored verse
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub reference: VerseRef,
    pub score: f64,
}

impl Candidate {
    /// Ranking: higher score first, then lower reference
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.reference.cmp(&other.reference))
    }

    /// Pick the preferred of two candidates
    pub fn better(a: Self, b: Self) -> Self {
        match a.rank(&b) {
            Ordering::Greater => b,
            _ => a,
        }
    }
}

/// Verse matcher
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Find the best verse for `query_text`
    pub fn best_match(&self, query_text: &str, corpus: &Corpus) -> MatchResult {
        let query = tokenize(query_text);
        if query.is_empty() {
            debug!("Query empty after normalization");
            return MatchResult::no_match(0.0);
        }

        let best = if corpus.len() >= self.config.parallel_threshold {
            corpus
                .entries()
                .par_iter()
                .map(|entry| self.candidate(&query, entry))
                .reduce_with(Candidate::better)
        } else {
            corpus
                .entries()
                .iter()
                .map(|entry| self.candidate(&query, entry))
                .reduce(Candidate::better)
        };

        // Corpus is never empty, so there is always a best candidate
        let Some(best) = best else {
            return MatchResult::no_match(0.0);
        };

        let best = match self.config.metric {
            SimilarityMetric::Word => best,
            SimilarityMetric::Char => Candidate {
                reference: best.reference,
                score: corpus
                    .lookup(best.reference)
                    .map_or(0.0, |entry| word_similarity(&query, entry)),
            },
        };

        let result = if best.score >= self.config.min_score {
            MatchResult {
                reference: Some(best.reference),
                score: best.score,
            }
        } else {
            MatchResult::no_match(best.score)
        };

        debug!(
            reference = ?result.reference.map(|r| r.to_string()),
            score = result.score,
            confident = result.is_confident(),
            "Match computed"
        );

        result
    }

    /// The `n` best verses, best first
    pub fn top_candidates(&self, query_text: &str, corpus: &Corpus, n: usize) -> Vec<Candidate> {
        let query = tokenize(query_text);
        if query.is_empty() || n == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<Candidate> = if corpus.len() >= self.config.parallel_threshold {
            corpus.entries().par_iter().map(|e| self.candidate(&query, e)).collect()
        } else {
            corpus.entries().iter().map(|e| self.candidate(&query, e)).collect()
        };

        candidates.sort_by(|a, b| a.rank(b));
        candidates.truncate(n);
        candidates
    }

    /// Ranking similarity of pre-tokenized query against one verse, in [0, 1]
    pub fn score(&self, query: &[String], entry: &VerseEntry) -> f64 {
        match self.config.metric {
            SimilarityMetric::Word => word_similarity(query, entry),
            SimilarityMetric::Char => strsim::normalized_levenshtein(entry.normalized_text(), &query.join(" ")),
        }
    }

    fn candidate(&self, query: &[String], entry: &VerseEntry) -> Candidate {
        Candidate {
            reference: entry.reference(),
            score: self.score(query, entry),
        }
    }
}

fn word_similarity(query: &[String], entry: &VerseEntry) -> f64 {
    let d = distance(entry.tokens(), query);
    similarity_from_distance(d, entry.tokens().len(), query.len())
}

/// Match with default configuration
pub fn best_match(query_text: &str, corpus: &Corpus) -> MatchResult {
    Matcher::default().best_match(query_text, corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(pairs: &[(&str, &str)]) -> Corpus {
        Corpus::from_pairs(pairs.iter().map(|(r, t)| (r.parse::<VerseRef>().unwrap(), *t))).unwrap()
    }

    fn fatiha() -> Corpus {
        corpus(&[
            ("1:1", "بِسْمِ ٱللَّهِ ٱلرَّحْمَٰنِ ٱلرَّحِيمِ"),
            ("1:2", "ٱلْحَمْدُ لِلَّهِ رَبِّ ٱلْعَالَمِينَ"),
            ("1:3", "ٱلرَّحْمَٰنِ ٱلرَّحِيمِ"),
            ("1:4", "مَالِكِ يَوْمِ ٱلدِّينِ"),
            ("1:5", "إِيَّاكَ نَعْبُدُ وَإِيَّاكَ نَسْتَعِينُ"),
        ])
    }

    #[test]
    fn test_exact_match_scores_maximum() {
        let result = best_match("الحمد لله رب العالمين", &fatiha());
        assert_eq!(result.reference, Some(VerseRef::new(1, 2)));
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_noisy_match_is_still_confident() {
        let result = best_match("اياك نعبد واياك نستعين يا رب", &fatiha());
        assert_eq!(result.reference, Some(VerseRef::new(1, 5)));
        assert!(result.score < 1.0 && result.score >= DEFAULT_MIN_SCORE);
    }

    #[test]
    fn test_empty_query_is_no_match() {
        for query in ["", "   ", "،؟!"] {
            let result = best_match(query, &fatiha());
            assert_eq!(result, MatchResult::no_match(0.0));
        }
    }

    #[test]
    fn test_unrelated_query_is_no_match() {
        let result = best_match("مرحبا بالعالم", &fatiha());
        assert!(result.reference.is_none());
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_tie_goes_to_lower_reference() {
        let corpus = corpus(&[
            ("2:5", "الله الصمد"),
            ("1:9", "ٱللَّهُ ٱلصَّمَدُ"),
            ("1:10", "الله الصمد"),
        ]);
        let result = best_match("الله الصمد", &corpus);
        assert_eq!(result.reference, Some(VerseRef::new(1, 9)));
    }

    #[test]
    fn test_below_threshold_keeps_score() {
        let matcher = Matcher::new(MatcherConfig {
            min_score: 0.9,
            ..Default::default()
        });
        let result = matcher.best_match("الحمد لله رب", &fatiha());
        assert!(result.reference.is_none());
        assert!((result.score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let matcher = Matcher::new(MatcherConfig {
            min_score: 0.75,
            ..Default::default()
        });
        let result = matcher.best_match("الحمد لله رب", &fatiha());
        assert_eq!(result.reference, Some(VerseRef::new(1, 2)));
    }

    #[test]
    fn test_single_entry_corpus_applies_threshold() {
        let corpus = corpus(&[("1:1", "بسم الله الرحمن الرحيم")]);
        assert!(best_match("بسم", &corpus).reference.is_none());
        assert!(best_match("بسم الله الرحمن", &corpus).reference.is_some());
    }

    #[test]
    fn test_parallel_path_agrees_with_sequential() {
        let corpus = fatiha();
        let sequential = Matcher::default();
        let parallel = Matcher::new(MatcherConfig {
            parallel_threshold: 1,
            ..Default::default()
        });

        for query in ["الرحمن الرحيم", "مالك يوم الدين", "بسم الله", "شيء اخر"] {
            assert_eq!(sequential.best_match(query, &corpus), parallel.best_match(query, &corpus));
            assert_eq!(
                sequential.top_candidates(query, &corpus, 3),
                parallel.top_candidates(query, &corpus, 3)
            );
        }
    }

    #[test]
    fn test_deterministic_across_calls() {
        let corpus = fatiha();
        let first = best_match("الرحمن", &corpus);
        for _ in 0..10 {
            assert_eq!(best_match("الرحمن", &corpus), first);
        }
    }

    #[test]
    fn test_top_candidates_ordering() {
        let candidates = Matcher::default().top_candidates("الرحمن الرحيم", &fatiha(), 2);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].reference, VerseRef::new(1, 3));
        assert_eq!(candidates[0].score, 1.0);
        assert_eq!(candidates[1].reference, VerseRef::new(1, 1));
        assert_eq!(candidates[1].score, 0.5);
    }

    #[test]
    fn test_char_metric_fallback() {
        let matcher = Matcher::new(MatcherConfig {
            metric: SimilarityMetric::Char,
            ..Default::default()
        });
        let result = matcher.best_match("مالك يوم الدين", &fatiha());
        assert_eq!(result.reference, Some(VerseRef::new(1, 4)));
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_char_metric_accepts_on_word_score() {
        let corpus = corpus(&[("1:1", "بسم الله الرحمن الرحيم")]);
        let matcher = Matcher::new(MatcherConfig {
            metric: SimilarityMetric::Char,
            ..Default::default()
        });

        // Close spelling, but no word in common
        let query = tokenize("باسم اللهم الرحمان الرحيمي");
        assert!(matcher.score(&query, &corpus.entries()[0]) > DEFAULT_MIN_SCORE);

        let result = matcher.best_match("باسم اللهم الرحمان الرحيمي", &corpus);
        assert_eq!(result, MatchResult::no_match(0.0));

        // One misspelled word still ranks and is scored on words
        let result = matcher.best_match("بسم الله الرحمان الرحيم", &corpus);
        assert_eq!(result.reference, Some(VerseRef::new(1, 1)));
        assert!((result.score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_candidate_better_is_order_independent() {
        let a = Candidate { reference: VerseRef::new(1, 2), score: 0.5 };
        let b = Candidate { reference: VerseRef::new(1, 1), score: 0.5 };
        let c = Candidate { reference: VerseRef::new(3, 1), score: 0.9 };

        assert_eq!(Candidate::better(a, b), b);
        assert_eq!(Candidate::better(b, a), b);
        assert_eq!(
            Candidate::better(Candidate::better(a, b), c),
            Candidate::better(a, Candidate::better(b, c))
        );
    }
}
