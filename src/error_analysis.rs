/*!
Categorization of scoring errors. This is a read-only aggregation over the false negative and
false positive key sets of one evaluation; no prediction is modified.
*/
use crate::index::GroundTruthIndex;
use crate::matcher::{MatchKind, Matcher};
use crate::mention::{sorted_intersect, strip_whitespace, Candidate, CanonicalKey};
use crate::metrics::ClassificationErrors;
use ahash::{HashSet as AHashSet, HashSetExt};
use enum_iterator::{all, Sequence};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use tracing::debug;

/// Why a gold mention was missed. Categories are exclusive and tested in declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize,
)]
pub enum FnCategory {
    /// The aligned tokens do not spell the annotation: the tokenizer split a word inside the
    /// mention boundary.
    TokenizationMismatch,
    /// No candidate of the run has the mention text.
    OutOfVocabulary,
    /// Some candidate has the mention text, but none was predicted on the gold span.
    InVocabularyUnmatched,
}

impl Display for FnCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::TokenizationMismatch => "Tokenization_Mismatch",
            Self::OutOfVocabulary => "Out_Of_Vocabulary",
            Self::InVocabularyUnmatched => "In_Vocabulary_Unmatched",
        };
        write!(f, "{}", name)
    }
}

/// Why a predicted mention is wrong.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize,
)]
pub enum FpCategory {
    /// The prediction shares no token with any gold mention of its sentence.
    Complete,
    /// The prediction overlaps a gold mention with different boundaries.
    Partial,
}

impl Display for FpCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Complete => "Complete",
            Self::Partial => "Partial",
        };
        write!(f, "{}", name)
    }
}

/// Lower-cased, whitespace-free texts of every candidate of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary(AHashSet<String>);

impl Vocabulary {
    pub fn from_candidates(candidates: &[Candidate], unescape: bool) -> Self {
        let mut texts = AHashSet::with_capacity(candidates.len());
        texts.extend(candidates.iter().map(|c| c.text(unescape).to_lowercase()));
        Vocabulary(texts)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.0.contains(&strip_whitespace(text).to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Keys of every error, grouped by category. Every category is present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub false_negatives: BTreeMap<FnCategory, BTreeSet<CanonicalKey>>,
    pub false_positives: BTreeMap<FpCategory, BTreeSet<CanonicalKey>>,
    /// False negatives with at least one overlapping candidate, whatever their category.
    pub partially_matched: BTreeSet<CanonicalKey>,
}

impl Default for ErrorReport {
    fn default() -> Self {
        Self {
            false_negatives: all::<FnCategory>().map(|c| (c, BTreeSet::new())).collect(),
            false_positives: all::<FpCategory>().map(|c| (c, BTreeSet::new())).collect(),
            partially_matched: BTreeSet::new(),
        }
    }
}

impl ErrorReport {
    pub fn fn_count(&self, category: FnCategory) -> usize {
        self.false_negatives.get(&category).map_or(0, BTreeSet::len)
    }

    pub fn fp_count(&self, category: FpCategory) -> usize {
        self.false_positives.get(&category).map_or(0, BTreeSet::len)
    }

    pub fn total_fn(&self) -> usize {
        self.false_negatives.values().map(BTreeSet::len).sum()
    }

    pub fn total_fp(&self) -> usize {
        self.false_positives.values().map(BTreeSet::len).sum()
    }
}

pub struct ErrorClassifier<'g, 'i, 'a, 'v> {
    gold: &'g GroundTruthIndex,
    matcher: Matcher<'i, 'a>,
    vocabulary: &'v Vocabulary,
}

impl<'g, 'i, 'a, 'v> ErrorClassifier<'g, 'i, 'a, 'v> {
    pub fn new(
        gold: &'g GroundTruthIndex,
        matcher: Matcher<'i, 'a>,
        vocabulary: &'v Vocabulary,
    ) -> Self {
        Self {
            gold,
            matcher,
            vocabulary,
        }
    }

    pub fn classify_fn(&self, key: &CanonicalKey) -> FnCategory {
        let mismatch = self
            .gold
            .get(key)
            .is_some_and(|mention| mention.is_tokenization_mismatch());
        if mismatch {
            FnCategory::TokenizationMismatch
        } else if !self.vocabulary.contains(&key.text) {
            FnCategory::OutOfVocabulary
        } else {
            FnCategory::InVocabularyUnmatched
        }
    }

    pub fn classify_fp(&self, key: &CanonicalKey) -> FpCategory {
        let overlaps_gold = self
            .gold
            .sentence_spans(&key.doc_id, key.sentence_id)
            .iter()
            .any(|gold_idxs| sorted_intersect(gold_idxs, &key.token_idxs));
        if overlaps_gold {
            FpCategory::Partial
        } else {
            FpCategory::Complete
        }
    }

    fn is_partially_matched(&self, key: &CanonicalKey) -> bool {
        self.matcher
            .matches(key, true)
            .any(|m| m.kind == MatchKind::Partial)
    }

    pub fn classify(&self, errors: &ClassificationErrors) -> ErrorReport {
        let mut report = ErrorReport::default();
        for key in errors.fn_.iter() {
            if self.is_partially_matched(key) {
                report.partially_matched.insert(key.clone());
            }
            report
                .false_negatives
                .entry(self.classify_fn(key))
                .or_default()
                .insert(key.clone());
        }
        for key in errors.fp.iter() {
            report
                .false_positives
                .entry(self.classify_fp(key))
                .or_default()
                .insert(key.clone());
        }
        debug!(
            "Error analysis: {} false negatives ({} partially matched), {} false positives",
            report.total_fn(),
            report.partially_matched.len(),
            report.total_fp()
        );
        report
    }
}
