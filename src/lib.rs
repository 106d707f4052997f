/*!
This library aligns character-offset gold annotations of a corpus to the tokens produced by a
tokenizer, matches candidate mentions against them and scores predictions. It is built for
biomedical named-entity corpora (PubTator-style title and abstract documents) where the tokenizer
and the annotators rarely agree on boundaries.

# Pipeline
* Annotations are normalized into `GoldAnnotation`s (document character offsets) through
    `RawAnnotation`, checked against the document text and aligned to a token span of the
    sentence containing their start.
* Each aligned annotation becomes a `CanonicalKey`: document, sentence, token indices, character
    span and whitespace-free text. The keys of a corpus form its `GroundTruthIndex`.
* Candidates (token index sets proposed by an external generator) get a key the same way.
    Scoring compares keys for exact equality only.
* Overlaps are used twice: by the `LongestMatchResolver`, which keeps one accepted candidate per
    gold label, and by the `ErrorClassifier`, which explains every false negative and false
    positive.

# Terminology
* A gold annotation is a human-labeled mention with character offsets in the source document.
* A candidate is a system-proposed mention, expressed as token indices within one sentence.
* An exact match shares the gold token span; a partial match shares at least one token with it.
* Offsets are always counted in characters, never in bytes.

The `Corpus` struct is the entry point; the lower-level components are exposed for callers that
manage their own documents.
*/

mod align;
mod cache;
mod config;
mod conll;
mod corpus;
mod datastructure;
mod document;
mod error;
mod error_analysis;
mod index;
mod matcher;
mod mention;
mod metrics;
mod reporter;
mod resolver;

// The public api starts here
pub use corpus::{Corpus, CorpusDocument, LoadStats, RawDocument, SentenceParser};

pub use config::{EvalConfig, EvalConfigBuilder, Threshold};

pub use error::{EvalError, Result};

pub use document::{
    Document, DocumentLayout, GoldAnnotation, RawAnnotation, Section, Sentence, Token,
};

pub use align::{align, AlignedMention, AlignmentFailure, AlignmentFailureReason, SpanAligner};

pub use mention::{Candidate, CanonicalKey, Span};

pub use index::{BuildStats, CandidateIndex, GoldMention, GroundTruthIndex};

pub use matcher::{Match, MatchKind, Matcher};

pub use metrics::{ClassificationErrors, ScoreEngine, ScoreReport, NEGATIVE, POSITIVE};

pub use resolver::{LongestMatchResolver, ResolutionSummary, DEFAULT_THRESHOLD};

pub use error_analysis::{ErrorClassifier, ErrorReport, FnCategory, FpCategory, Vocabulary};

pub use cache::{MemoryParseCache, NoCache, ParseCache, ParsedDocument};
