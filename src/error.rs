/*!
Error taxonomy of the engine. Only `EvalError` ever leaves a function as an `Err`; recoverable
conditions (unaligned or duplicated annotations, empty denominators) are counted instead.
*/
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The annotation text does not match the document text at its offsets. Every offset computed
    /// afterward would be meaningless, so loading stops here.
    #[error(
        "Corpus integrity error in document {doc_id} at [{start}, {end}): annotation text {expected:?} does not match document text {found:?}"
    )]
    CorpusIntegrity {
        doc_id: String,
        start: usize,
        end: usize,
        expected: String,
        found: String,
    },
    /// An annotation with `end <= start`, or one reaching past the end of the document.
    #[error("Invalid span [{start}, {end}) in document {doc_id}")]
    InvalidSpan {
        doc_id: String,
        start: usize,
        end: usize,
    },
    #[error(
        "Inconsistent length between two lists. `candidates` is length {candidates}, `predictions` is length {predictions}"
    )]
    InconsistentLength {
        candidates: usize,
        predictions: usize,
    },
    #[error("Invalid sentence {sentence_id} in document {doc_id}: {reason}")]
    InvalidSentence {
        doc_id: String,
        sentence_id: usize,
        reason: String,
    },
    #[error("Invalid candidate in document {doc_id}, sentence {sentence_id}: {reason}")]
    InvalidCandidate {
        doc_id: String,
        sentence_id: usize,
        reason: String,
    },
    /// The sentence-parsing collaborator failed.
    #[error("Sentence parser failed on document {doc_id}: {message}")]
    Parser { doc_id: String, message: String },
}
