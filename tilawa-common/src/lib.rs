//! # Tilawa Common Library
//!
//! Recitation matching engine shared by the Tilawa services:
//! - Text normalization for transcribed and canonical text
//! - Corpus loading and lookup
//! - Verse matching with a deterministic tie-break
//! - Weak-point feedback summaries
//! - Bootstrap configuration and error types

pub mod align;
pub mod config;
pub mod corpus;
pub mod error;
pub mod feedback;
pub mod matcher;
pub mod normalize;
pub mod verse;

pub use corpus::{Corpus, VerseEntry};
pub use error::{Error, Result};
pub use feedback::{compose, Summary, SummaryStatus, WeakPoint, WeakPointKind};
pub use matcher::{best_match, Candidate, MatchResult, Matcher, MatcherConfig, SimilarityMetric};
pub use normalize::normalize;
pub use verse::VerseRef;
