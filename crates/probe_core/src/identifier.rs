use std::fmt;

use thiserror::Error;
use url::Url;

pub const MAX_IDENTIFIER_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier contains control characters")]
    ControlCharacter,
    #[error("identifier is longer than {max} bytes ({actual})")]
    TooLong { max: usize, actual: usize },
    #[error("identifier {0:?} is a relative path segment")]
    DotSegment(String),
}

/// Page URL prefix that identifiers are appended to.
///
/// Always hierarchical (it can carry a path) and free of query and fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetBase(Url);

impl TargetBase {
    /// Returns `None` for URLs that cannot carry a path, e.g. `mailto:`.
    pub fn new(mut url: Url) -> Option<Self> {
        if url.cannot_be_a_base() {
            return None;
        }
        url.set_query(None);
        url.set_fragment(None);
        Some(Self(url))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for TargetBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque slug naming one remote document.
///
/// Always trimmed and non-empty. It is never interpolated into a URL as raw
/// text; [`TargetIdentifier::target_url`] pushes it as an escaped path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetIdentifier(String);

impl TargetIdentifier {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }
        if trimmed.len() > MAX_IDENTIFIER_LEN {
            return Err(IdentifierError::TooLong {
                max: MAX_IDENTIFIER_LEN,
                actual: trimmed.len(),
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(IdentifierError::ControlCharacter);
        }
        // `url` drops these when pushed as path segments.
        if matches!(trimmed, "." | "..") {
            return Err(IdentifierError::DotSegment(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends the identifier to `base` as a single escaped path segment.
    pub fn target_url(&self, base: &TargetBase) -> Url {
        let mut url = base.0.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&self.0);
        }
        url
    }
}

impl fmt::Display for TargetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
