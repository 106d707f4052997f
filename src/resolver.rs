/*!
Longest-match refinement of candidate probabilities. For each gold label, the competing candidates
(the exact-span one and every overlapping one) are ranked by probability, then by length, and only
the best one survives when it is confident enough.
*/
use crate::error::Result;
use crate::index::GroundTruthIndex;
use crate::matcher::{Match, Matcher};
use crate::metrics::{check_consistent_length, NEGATIVE, POSITIVE};
use ahash::HashSet as AHashSet;
use ndarray::{ArrayBase, Data, DataMut, Ix1};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Probability a candidate must exceed to be accepted.
pub const DEFAULT_THRESHOLD: f32 = 0.499;

/// What a resolution pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolutionSummary {
    /// Gold labels with at least one matching candidate.
    pub contested: usize,
    /// Candidates set to `1`.
    pub accepted: usize,
    /// Candidates forced to `-1`.
    pub rejected: usize,
}

pub struct LongestMatchResolver<'g, 'i, 'a> {
    gold: &'g GroundTruthIndex,
    matcher: Matcher<'i, 'a>,
    threshold: f32,
}

impl<'g, 'i, 'a> LongestMatchResolver<'g, 'i, 'a> {
    pub fn new(gold: &'g GroundTruthIndex, matcher: Matcher<'i, 'a>, threshold: f32) -> Self {
        Self {
            gold,
            matcher,
            threshold,
        }
    }

    /// Ranks the matches of one gold label: probability descending, then token length
    /// descending, then candidate position ascending.
    fn rank<S>(&self, matches: &mut [Match], probabilities: &ArrayBase<S, Ix1>)
    where
        S: Data<Elem = f32>,
    {
        let index = self.matcher.index();
        matches.sort_by(|a, b| {
            probabilities[b.position]
                .total_cmp(&probabilities[a.position])
                .then_with(|| {
                    index
                        .candidate(b.position)
                        .len()
                        .cmp(&index.candidate(a.position).len())
                })
                .then_with(|| a.position.cmp(&b.position))
        });
    }

    /// Rewrites `probabilities` in place so that every gold label of `doc_ids` keeps at most one
    /// accepted candidate. Labels are visited in key order. When the best ranked candidate of a
    /// label has a probability above the threshold it is set to `1` and every other candidate of
    /// the label to `-1`; otherwise the label leaves the probabilities untouched.
    ///
    /// Fails with `InconsistentLength` when `probabilities` does not hold one value per indexed
    /// candidate.
    pub fn resolve<S>(
        &self,
        probabilities: &mut ArrayBase<S, Ix1>,
        doc_ids: &AHashSet<&str>,
    ) -> Result<ResolutionSummary>
    where
        S: DataMut<Elem = f32>,
    {
        check_consistent_length(
            self.matcher.index().candidates().len(),
            probabilities.len(),
        )?;
        let mut summary = ResolutionSummary::default();
        for key in self.gold.keys_in(doc_ids) {
            let mut matches = self.matcher.match_gold(key, true);
            if matches.is_empty() {
                continue;
            }
            summary.contested += 1;
            self.rank(&mut matches, probabilities);
            let (top, rest) = match matches.split_first() {
                Some(split) => split,
                None => continue,
            };
            let best = probabilities[top.position];
            if best.partial_cmp(&self.threshold) != Some(Ordering::Greater) {
                debug!("No candidate of {} above {}", key, self.threshold);
                continue;
            }
            debug!(
                "Accepting {} ({}) for {}, rejecting {} competitors",
                self.matcher.index().candidate(top.position),
                best,
                key,
                rest.len()
            );
            probabilities[top.position] = POSITIVE;
            summary.accepted += 1;
            for competitor in rest {
                probabilities[competitor.position] = NEGATIVE;
                summary.rejected += 1;
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::GoldAnnotation;
    use crate::error::EvalError;
    use crate::index::CandidateIndex;
    use crate::mention::test::build_sentence;
    use crate::mention::Candidate;
    use ndarray::{array, Array1};
    use quickcheck::TestResult;
    use rstest::rstest;

    fn build_gold() -> GroundTruthIndex {
        let sentences = vec![build_sentence()];
        let annotations = vec![
            GoldAnnotation::new(14, 27, "breast cancer", "Disease"),
            GoldAnnotation::new(33, 40, "treated", "Procedure"),
        ];
        GroundTruthIndex::build(
            vec![("doc1", sentences.as_slice(), annotations.as_slice())],
            true,
        )
    }

    fn build_candidates() -> Vec<Candidate> {
        let sentence = build_sentence();
        vec![
            Candidate::from_sentence("doc1", &sentence, vec![2]).unwrap(),
            Candidate::from_sentence("doc1", &sentence, vec![2, 3]).unwrap(),
            Candidate::from_sentence("doc1", &sentence, vec![3]).unwrap(),
            Candidate::from_sentence("doc1", &sentence, vec![0]).unwrap(),
        ]
    }

    fn doc_ids() -> AHashSet<&'static str> {
        ["doc1"].into_iter().collect()
    }

    #[rstest]
    // Same probability, the longest candidate wins.
    #[case(array![0.9, 0.9, 0.9, 0.2], array![-1., 1., -1., 0.2])]
    // The most probable candidate wins regardless of length.
    #[case(array![0.95, 0.9, 0.1, 0.7], array![1., -1., -1., 0.7])]
    // Nothing above the threshold: untouched.
    #[case(array![0.3, 0.499, 0.1, 0.7], array![0.3, 0.499, 0.1, 0.7])]
    // Barely above the threshold.
    #[case(array![0.3, 0.5, 0.1, 0.7], array![-1., 1., -1., 0.7])]
    fn test_resolve(#[case] probabilities: Array1<f32>, #[case] expected: Array1<f32>) {
        let mut probabilities = probabilities;
        let gold = build_gold();
        let candidates = build_candidates();
        let index = CandidateIndex::new(&candidates, true);
        let resolver =
            LongestMatchResolver::new(&gold, Matcher::new(&index), DEFAULT_THRESHOLD);
        resolver.resolve(&mut probabilities, &doc_ids()).unwrap();
        assert_eq!(probabilities, expected)
    }

    #[test]
    fn test_same_length_tie_goes_to_first_position() {
        let gold = build_gold();
        let candidates = build_candidates();
        let index = CandidateIndex::new(&candidates, true);
        let resolver =
            LongestMatchResolver::new(&gold, Matcher::new(&index), DEFAULT_THRESHOLD);
        let mut probabilities = array![0.8, 0.1, 0.8, 0.];
        let summary = resolver.resolve(&mut probabilities, &doc_ids()).unwrap();
        let expected: Array1<f32> = array![1., -1., -1., 0.];
        assert_eq!(probabilities, expected);
        // "treated" has no candidate.
        assert_eq!(
            summary,
            ResolutionSummary {
                contested: 1,
                accepted: 1,
                rejected: 2
            }
        );
    }

    #[test]
    fn test_other_documents_untouched() {
        let gold = build_gold();
        let candidates = build_candidates();
        let index = CandidateIndex::new(&candidates, true);
        let resolver =
            LongestMatchResolver::new(&gold, Matcher::new(&index), DEFAULT_THRESHOLD);
        let mut probabilities = array![0.9, 0.9, 0.9, 0.2];
        let doc_ids: AHashSet<&str> = ["doc2"].into_iter().collect();
        resolver.resolve(&mut probabilities, &doc_ids).unwrap();
        let expected: Array1<f32> = array![0.9, 0.9, 0.9, 0.2];
        assert_eq!(probabilities, expected);
    }

    #[test]
    fn test_inconsistent_length() {
        let gold = build_gold();
        let candidates = build_candidates();
        let index = CandidateIndex::new(&candidates, true);
        let resolver =
            LongestMatchResolver::new(&gold, Matcher::new(&index), DEFAULT_THRESHOLD);
        let mut probabilities = array![0.9];
        let res = resolver.resolve(&mut probabilities, &doc_ids());
        assert_eq!(
            res,
            Err(EvalError::InconsistentLength {
                candidates: 4,
                predictions: 1
            })
        );
        let expected: Array1<f32> = array![0.9];
        assert_eq!(probabilities, expected);
    }

    #[test]
    fn test_propertie_at_most_one_accepted() {
        fn propertie_at_most_one_accepted(probabilities: Vec<u8>) -> TestResult {
            if probabilities.len() < 4 {
                return TestResult::discard();
            }
            let gold = build_gold();
            let candidates = build_candidates();
            let index = CandidateIndex::new(&candidates, true);
            let matcher = Matcher::new(&index);
            let resolver = LongestMatchResolver::new(&gold, Matcher::new(&index), DEFAULT_THRESHOLD);
            let mut probabilities: Array1<f32> = probabilities
                .into_iter()
                .take(4)
                .map(|p| f32::from(p) / 255.)
                .collect();
            resolver.resolve(&mut probabilities, &doc_ids()).unwrap();
            let ok = gold.keys().all(|key| {
                matcher
                    .matches(key, true)
                    .filter(|m| probabilities[m.position] == POSITIVE)
                    .count()
                    <= 1
            });
            TestResult::from_bool(ok)
        }
        let mut qc = quickcheck::QuickCheck::new().tests(2000);
        qc.quickcheck(propertie_at_most_one_accepted as fn(Vec<u8>) -> TestResult)
    }
}
