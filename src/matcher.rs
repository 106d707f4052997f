/*!
Exact and overlap comparison of a gold key against indexed candidates.
*/
use crate::index::CandidateIndex;
use crate::mention::CanonicalKey;
use either::Either as LeftOrRight;
use serde::{Deserialize, Serialize};
use std::iter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    /// The candidate has the gold token span.
    Exact,
    /// The candidate shares at least one token with the gold mention, with a different span.
    Partial,
}

/// A candidate matching a gold key, identified by its position in the candidate slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    pub position: usize,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Copy)]
pub struct Matcher<'i, 'a> {
    index: &'i CandidateIndex<'a>,
}

impl<'i, 'a> Matcher<'i, 'a> {
    pub fn new(index: &'i CandidateIndex<'a>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &'i CandidateIndex<'a> {
        self.index
    }

    /// Candidates matching `gold`: the exact-span candidate first (if any), then, when
    /// `allow_partial` is set, every other candidate of the sentence whose token-index set
    /// intersects the gold one, in insertion order.
    ///
    /// Intersection is tested on the index sets rather than the spans so that discontinuous
    /// candidates are only matched through the tokens they actually contain.
    pub fn matches<'g>(
        &self,
        gold: &'g CanonicalKey,
        allow_partial: bool,
    ) -> impl Iterator<Item = Match> + 'g
    where
        'i: 'g,
        'a: 'g,
    {
        let index: &'g CandidateIndex<'g> = self.index;
        let exact_span = gold.token_span();
        let exact = index
            .get(&gold.doc_id, gold.sentence_id, exact_span)
            .map(|position| Match {
                position,
                kind: MatchKind::Exact,
            });
        let partial = if allow_partial {
            LeftOrRight::Left(
                index
                    .sentence(&gold.doc_id, gold.sentence_id)
                    .iter()
                    .filter(move |(span, position)| {
                        *span != exact_span
                            && gold.intersects(index.candidate(*position).token_idxs())
                    })
                    .map(|(_, position)| Match {
                        position: *position,
                        kind: MatchKind::Partial,
                    }),
            )
        } else {
            LeftOrRight::Right(iter::empty())
        };
        exact.into_iter().chain(partial)
    }

    /// Collects `matches` into a vector.
    pub fn match_gold(&self, gold: &CanonicalKey, allow_partial: bool) -> Vec<Match> {
        self.matches(gold, allow_partial).collect()
    }
}
