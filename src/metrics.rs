/**
This module computes the metrics (precision, recall, f-score) of a set of predicted candidates
against the gold keys of a document collection. Only exact canonical-key equality counts as a
true positive; overlaps are the business of `error_analysis`.
*/
use crate::error::{EvalError, Result};
use crate::index::GroundTruthIndex;
use crate::mention::{Candidate, CanonicalKey};
use ahash::{HashSet as AHashSet, HashSetExt};
use ndarray::{Array1, ArrayBase, Data, Ix1};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Value of a prediction marking a candidate as a positive mention.
pub const POSITIVE: f32 = 1.0;
/// Value of a prediction marking a candidate as rejected.
pub const NEGATIVE: f32 = -1.0;

/// Precision, recall, f1 and the true positive, false positive and false negative counts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreReport {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

/// Divides `numerator` by `denominator`, returning `0` when the denominator is `0`. Empty gold
/// sets and empty predictions are legitimate inputs and must not abort an evaluation.
#[inline]
fn prf_divide(numerator: f32, denominator: f32) -> f32 {
    if denominator == 0. {
        0.
    } else {
        numerator / denominator
    }
}

impl ScoreReport {
    /// Computes the metrics from raw counts. `gold` is the number of gold keys.
    pub fn from_counts(tp: usize, fp: usize, gold: usize) -> Self {
        let precision = prf_divide(tp as f32, (tp + fp) as f32);
        let recall = prf_divide(tp as f32, gold as f32);
        let f1 = prf_divide(2. * precision * recall, precision + recall);
        Self {
            precision,
            recall,
            f1,
            tp,
            fp,
            fn_: gold.saturating_sub(tp),
        }
    }
}

/// The true positive, false positive and false negative key sets of one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationErrors {
    pub tp: BTreeSet<CanonicalKey>,
    pub fp: BTreeSet<CanonicalKey>,
    pub fn_: BTreeSet<CanonicalKey>,
}

impl ClassificationErrors {
    /// Derives the set differences from the predicted keys and the gold keys.
    pub fn new(predicted: BTreeSet<CanonicalKey>, gold: BTreeSet<CanonicalKey>) -> Self {
        let tp: BTreeSet<CanonicalKey> = predicted.intersection(&gold).cloned().collect();
        let fp = predicted.difference(&tp).cloned().collect();
        let fn_ = gold.difference(&tp).cloned().collect();
        Self { tp, fp, fn_ }
    }

    pub fn report(&self) -> ScoreReport {
        let gold = self.tp.len() + self.fn_.len();
        ScoreReport::from_counts(self.tp.len(), self.fp.len(), gold)
    }
}

/// Document set of an evaluation: the given ids, or every document the candidates come from.
pub(crate) fn resolve_doc_ids<'c>(
    candidates: &'c [Candidate],
    doc_ids: Option<&[&'c str]>,
) -> AHashSet<&'c str> {
    match doc_ids {
        Some(ids) => ids.iter().copied().collect(),
        None => {
            let mut ids = AHashSet::with_capacity(candidates.len());
            ids.extend(candidates.iter().map(|c| c.doc_id.as_str()));
            ids
        }
    }
}

pub(crate) fn check_consistent_length(candidates: usize, predictions: usize) -> Result<()> {
    if candidates != predictions {
        return Err(EvalError::InconsistentLength {
            candidates,
            predictions,
        });
    }
    Ok(())
}

/// Scores predictions against a `GroundTruthIndex`. Scoring is pure: the same inputs always give
/// the same report.
#[derive(Debug, Clone, Copy)]
pub struct ScoreEngine<'g> {
    gold: &'g GroundTruthIndex,
    unescape: bool,
}

impl<'g> ScoreEngine<'g> {
    pub fn new(gold: &'g GroundTruthIndex, unescape: bool) -> Self {
        Self { gold, unescape }
    }

    /// Keys of the candidates predicted positive (`prediction == 1`) in the given documents.
    fn predicted_keys<S>(
        &self,
        candidates: &[Candidate],
        predictions: &ArrayBase<S, Ix1>,
        doc_ids: &AHashSet<&str>,
    ) -> BTreeSet<CanonicalKey>
    where
        S: Data<Elem = f32>,
    {
        candidates
            .iter()
            .zip(predictions.iter())
            .filter(|(c, p)| **p == POSITIVE && doc_ids.contains(c.doc_id.as_str()))
            .map(|(c, _)| c.canonical_key(self.unescape))
            .collect()
    }

    /// Splits the predicted and gold keys into true positives, false positives and false
    /// negatives.
    ///
    /// * `candidates`: Candidate mentions
    /// * `predictions`: One value per candidate; `1` marks a positive prediction.
    /// * `doc_ids`: Documents to evaluate. Defaults to the documents of the candidates.
    pub fn classification_errors<S>(
        &self,
        candidates: &[Candidate],
        predictions: &ArrayBase<S, Ix1>,
        doc_ids: Option<&[&str]>,
    ) -> Result<ClassificationErrors>
    where
        S: Data<Elem = f32>,
    {
        check_consistent_length(candidates.len(), predictions.len())?;
        let doc_ids = resolve_doc_ids(candidates, doc_ids);
        let predicted = self.predicted_keys(candidates, predictions, &doc_ids);
        let gold: BTreeSet<CanonicalKey> = self.gold.keys_in(&doc_ids).cloned().collect();
        debug!(
            "Scoring {} candidates, {} predicted mentions, {} gold mentions over {} documents",
            candidates.len(),
            predicted.len(),
            gold.len(),
            doc_ids.len()
        );
        Ok(ClassificationErrors::new(predicted, gold))
    }

    /// Precision, recall and f1 of the positive predictions. Division by zero yields zero:
    /// `recall = 0` without gold mentions, `precision = 0` without positive predictions and
    /// `f1 = 0` when both are zero.
    pub fn score<S>(
        &self,
        candidates: &[Candidate],
        predictions: &ArrayBase<S, Ix1>,
        doc_ids: Option<&[&str]>,
    ) -> Result<ScoreReport>
    where
        S: Data<Elem = f32>,
    {
        let errors = self.classification_errors(candidates, predictions, doc_ids)?;
        let report = errors.report();
        debug!(
            "TP:{} FP:{} FN:{} True_N:{}",
            report.tp,
            report.fp,
            report.fn_,
            report.tp + report.fn_
        );
        Ok(report)
    }

    /// `1` for every candidate whose key is a gold key, `-1` otherwise.
    pub fn gold_labels(&self, candidates: &[Candidate]) -> Array1<i8> {
        candidates
            .iter()
            .map(|c| {
                if self.gold.contains(&c.canonical_key(self.unescape)) {
                    1
                } else {
                    -1
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::GoldAnnotation;
    use crate::mention::test::build_sentence;
    use ndarray::array;
    use quickcheck::TestResult;
    use rstest::rstest;

    fn build_gold() -> GroundTruthIndex {
        let sentences = vec![build_sentence()];
        let annotations = vec![GoldAnnotation::new(14, 27, "breast cancer", "Disease")];
        GroundTruthIndex::build(
            vec![("doc1", sentences.as_slice(), annotations.as_slice())],
            true,
        )
    }

    fn candidate(idxs: Vec<usize>) -> Candidate {
        Candidate::from_sentence("doc1", &build_sentence(), idxs).unwrap()
    }

    #[test]
    fn test_exact_scoring() {
        let gold = build_gold();
        let engine = ScoreEngine::new(&gold, true);
        let candidates = vec![candidate(vec![2, 3])];
        let report = engine.score(&candidates, &array![1.], None).unwrap();
        assert_eq!(
            report,
            ScoreReport {
                precision: 1.,
                recall: 1.,
                f1: 1.,
                tp: 1,
                fp: 0,
                fn_: 0
            }
        );
    }

    #[test]
    fn test_boundary_miss() {
        let gold = build_gold();
        let engine = ScoreEngine::new(&gold, true);
        let candidates = vec![candidate(vec![2])];
        let report = engine.score(&candidates, &array![1.], None).unwrap();
        assert_eq!((report.tp, report.fp, report.fn_), (0, 1, 1));
        assert_eq!((report.precision, report.recall, report.f1), (0., 0., 0.));
    }

    #[test]
    fn test_empty_gold() {
        let gold = GroundTruthIndex::default();
        let engine = ScoreEngine::new(&gold, true);
        let predictions: Array1<f32> = array![];
        let report = engine.score(&[], &predictions, None).unwrap();
        assert_eq!(report, ScoreReport::default());
    }

    #[rstest]
    #[case(0.)]
    #[case(-1.)]
    #[case(0.99)]
    fn test_non_positive_predictions_ignored(#[case] prediction: f32) {
        let gold = build_gold();
        let engine = ScoreEngine::new(&gold, true);
        let candidates = vec![candidate(vec![2, 3])];
        let report = engine
            .score(&candidates, &array![prediction], None)
            .unwrap();
        assert_eq!((report.tp, report.fp, report.fn_), (0, 0, 1));
    }

    #[test]
    fn test_doc_ids_restrict_scoring() {
        let gold = build_gold();
        let engine = ScoreEngine::new(&gold, true);
        let candidates = vec![candidate(vec![2, 3])];
        let report = engine
            .score(&candidates, &array![1.], Some(&["doc2"][..]))
            .unwrap();
        assert_eq!(report, ScoreReport::default());
    }

    #[test]
    fn test_inconsistent_length() {
        let gold = build_gold();
        let engine = ScoreEngine::new(&gold, true);
        let candidates = vec![candidate(vec![2, 3])];
        let res = engine.score(&candidates, &array![1., 1.], None);
        assert_eq!(
            res,
            Err(EvalError::InconsistentLength {
                candidates: 1,
                predictions: 2
            })
        );
    }

    #[test]
    fn test_duplicate_predictions_counted_once() {
        let gold = build_gold();
        let engine = ScoreEngine::new(&gold, true);
        let candidates = vec![candidate(vec![2, 3]), candidate(vec![2, 3])];
        let report = engine.score(&candidates, &array![1., 1.], None).unwrap();
        assert_eq!((report.tp, report.fp), (1, 0));
    }

    #[test]
    fn test_gold_labels() {
        let gold = build_gold();
        let engine = ScoreEngine::new(&gold, true);
        let candidates = vec![candidate(vec![2, 3]), candidate(vec![2]), candidate(vec![3])];
        let expected: Array1<i8> = array![1, -1, -1];
        assert_eq!(engine.gold_labels(&candidates), expected);
    }

    #[test]
    fn test_propertie_score_identities() {
        fn propertie_score_identities(tp: u8, fp: u8, fn_: u8) -> TestResult {
            let (tp, fp, fn_) = (usize::from(tp), usize::from(fp), usize::from(fn_));
            let report = ScoreReport::from_counts(tp, fp, tp + fn_);
            let (p, r, f1) = (report.precision, report.recall, report.f1);
            let in_bounds = (0. ..=1.).contains(&p) && (0. ..=1.).contains(&r);
            let f1_ok = if p + r > 0. {
                (f1 - 2. * p * r / (p + r)).abs() < f32::EPSILON
            } else {
                f1 == 0.
            };
            let counts_ok = report.tp + report.fn_ == tp + fn_ && report.tp + report.fp == tp + fp;
            TestResult::from_bool(in_bounds && f1_ok && counts_ok)
        }
        let mut qc = quickcheck::QuickCheck::new().tests(2000);
        qc.quickcheck(propertie_score_identities as fn(u8, u8, u8) -> TestResult)
    }
}
