use crate::mention::{Candidate, CanonicalKey, Span};
use ahash::{HashMap as AHashMap, HashMapExt};

/// Candidates of one sentence: a hash map for exact span lookups and the insertion-ordered
/// entries for overlap scans.
#[derive(Debug, Clone, Default)]
struct SentenceCandidates {
    by_span: AHashMap<Span, usize>,
    ordered: Vec<(Span, usize)>,
}

impl SentenceCandidates {
    /// Inserts the candidate at `position`. A candidate with an already indexed span replaces
    /// the previous one but keeps its place in the scan order.
    fn insert(&mut self, span: Span, position: usize) {
        match self.by_span.insert(span, position) {
            Some(previous) => {
                if let Some(entry) = self.ordered.iter_mut().find(|(_, p)| *p == previous) {
                    entry.1 = position;
                }
            }
            None => self.ordered.push((span, position)),
        }
    }
}

/// Index of a candidate set by `(doc_id, sentence_id, token span)`. Lookups return positions
/// into the candidate slice the index was built from.
#[derive(Debug, Clone)]
pub struct CandidateIndex<'a> {
    candidates: &'a [Candidate],
    documents: AHashMap<&'a str, AHashMap<usize, SentenceCandidates>>,
    unescape: bool,
}

impl<'a> CandidateIndex<'a> {
    pub fn new(candidates: &'a [Candidate], unescape: bool) -> Self {
        let mut documents: AHashMap<&'a str, AHashMap<usize, SentenceCandidates>> =
            AHashMap::new();
        for (position, candidate) in candidates.iter().enumerate() {
            documents
                .entry(candidate.doc_id.as_str())
                .or_default()
                .entry(candidate.sentence_id)
                .or_default()
                .insert(candidate.span(), position);
        }
        Self {
            candidates,
            documents,
            unescape,
        }
    }

    pub fn candidates(&self) -> &'a [Candidate] {
        self.candidates
    }

    pub fn candidate(&self, position: usize) -> &'a Candidate {
        &self.candidates[position]
    }

    /// Position of the candidate with exactly `span`.
    pub fn get(&self, doc_id: &str, sentence_id: usize, span: Span) -> Option<usize> {
        self.documents
            .get(doc_id)?
            .get(&sentence_id)?
            .by_span
            .get(&span)
            .copied()
    }

    /// Every indexed `(span, position)` of one sentence, in insertion order.
    pub fn sentence(&self, doc_id: &str, sentence_id: usize) -> &[(Span, usize)] {
        self.documents
            .get(doc_id)
            .and_then(|sentences| sentences.get(&sentence_id))
            .map(|s| s.ordered.as_slice())
            .unwrap_or(&[])
    }

    pub fn canonical_key(&self, candidate: &Candidate) -> CanonicalKey {
        candidate.canonical_key(self.unescape)
    }

    pub fn unescape(&self) -> bool {
        self.unescape
    }
}
