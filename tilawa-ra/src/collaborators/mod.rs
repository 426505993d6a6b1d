//! External collaborators
//!
//! The matching engine only sees plain text in and a [`Summary`] out. Speech
//! recognition and report phrasing are remote services behind the traits
//! below; each implementation converts and validates its wire format once,
//! at this boundary.

pub mod report_client;
pub mod transcription_client;

pub use report_client::HfReportWriter;
pub use transcription_client::HfTranscriber;

use async_trait::async_trait;
use thiserror::Error;
use tilawa_common::{Corpus, Summary};

/// Collaborator errors
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// No inference token configured
    #[error("Inference API token not configured")]
    MissingToken,

    #[error("Network error: {0}")]
    NetworkError(String),

    /// Remote model still loading after all attempts
    #[error("Model {0} still loading after {1} attempts")]
    ModelLoading(String, u32),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Recognized utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcription {
    pub text: String,
}

/// Speech-to-text collaborator
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one uploaded audio file
    async fn transcribe(&self, audio: Vec<u8>, content_type: &str) -> Result<Transcription, CollaboratorError>;
}

/// Report-writing collaborator
#[async_trait]
pub trait ReportWriter: Send + Sync {
    /// Phrase a human-readable report for `summary`
    ///
    /// `corpus` supplies the canonical wording of the matched verse.
    async fn write_report(&self, summary: &Summary, corpus: &Corpus) -> Result<String, CollaboratorError>;
}
