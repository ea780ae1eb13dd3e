//! Probe core: pure data model for one retrieval-and-extraction run.
mod attempt;
mod identifier;
mod outcome;
mod validate;

pub use attempt::{ExtractionAttempt, RetrievalAttempt};
pub use identifier::{IdentifierError, TargetBase, TargetIdentifier, MAX_IDENTIFIER_LEN};
pub use outcome::{ErrorKind, MinimalOutcome, PipelineOutcome};
pub use validate::{ContentValidator, ValidationSettings, ValidationVerdict, VerdictSummary};
