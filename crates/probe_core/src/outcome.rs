use std::fmt;

use serde::Serialize;

use crate::attempt::{ExtractionAttempt, RetrievalAttempt};

/// Why a run ended without a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidIdentifier,
    RetrievalExhausted,
    ExtractionNotFound,
    BackendMisconfigured,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidIdentifier => write!(f, "invalid identifier"),
            ErrorKind::RetrievalExhausted => write!(f, "retrieval exhausted"),
            ErrorKind::ExtractionNotFound => write!(f, "extraction found no count"),
            ErrorKind::BackendMisconfigured => write!(f, "backend misconfigured"),
        }
    }
}

/// Result of one pipeline run.
///
/// Fields are private so `found` and `comments_count` cannot disagree:
/// a count exists exactly when the outcome was built by [`PipelineOutcome::found`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    target_identifier: String,
    comments_count: Option<u32>,
    found: bool,
    method: Option<String>,
    retrieval_trail: Vec<RetrievalAttempt>,
    extraction_trail: Vec<ExtractionAttempt>,
    error_kind: Option<ErrorKind>,
}

/// The two-field record a minimal consumer needs, plus the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimalOutcome<'a> {
    pub target_identifier: &'a str,
    pub comments_count: Option<u32>,
    pub found: bool,
}

impl PipelineOutcome {
    pub fn found(
        target_identifier: impl Into<String>,
        comments_count: u32,
        backend_name: &str,
        strategy_name: &str,
        retrieval_trail: Vec<RetrievalAttempt>,
        extraction_trail: Vec<ExtractionAttempt>,
    ) -> Self {
        Self {
            target_identifier: target_identifier.into(),
            comments_count: Some(comments_count),
            found: true,
            method: Some(format!("{backend_name}:{strategy_name}")),
            retrieval_trail,
            extraction_trail,
            error_kind: None,
        }
    }

    pub fn not_found(
        target_identifier: impl Into<String>,
        error_kind: ErrorKind,
        retrieval_trail: Vec<RetrievalAttempt>,
        extraction_trail: Vec<ExtractionAttempt>,
    ) -> Self {
        Self {
            target_identifier: target_identifier.into(),
            comments_count: None,
            found: false,
            method: None,
            retrieval_trail,
            extraction_trail,
            error_kind: Some(error_kind),
        }
    }

    pub fn target_identifier(&self) -> &str {
        &self.target_identifier
    }

    pub fn comments_count(&self) -> Option<u32> {
        self.comments_count
    }

    pub fn is_found(&self) -> bool {
        self.found
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn retrieval_trail(&self) -> &[RetrievalAttempt] {
        &self.retrieval_trail
    }

    pub fn extraction_trail(&self) -> &[ExtractionAttempt] {
        &self.extraction_trail
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    pub fn minimal(&self) -> MinimalOutcome<'_> {
        MinimalOutcome {
            target_identifier: &self.target_identifier,
            comments_count: self.comments_count,
            found: self.found,
        }
    }
}
