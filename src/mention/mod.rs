/*!
Mentions and their identities. Gold mentions and candidates are compared through a
`CanonicalKey`, whose text is stripped of every whitespace character: tokenization routinely
inserts or removes spaces that the annotated text does not have.
*/
use crate::document::{Sentence, Token};
use crate::error::{EvalError, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod ptb;

pub(crate) use ptb::unescape_penn_treebank;

/// Half-open range `[start, end)` of token indices or of characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Span `(min, max + 1)` of a set of indices, `None` for an empty set.
    pub fn covering(idxs: &[usize]) -> Option<Self> {
        let (min, max) = idxs.iter().minmax().into_option()?;
        Some(Span::new(*min, *max + 1))
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl From<(usize, usize)> for Span {
    fn from(value: (usize, usize)) -> Self {
        Span::new(value.0, value.1)
    }
}

/// Removes every whitespace character.
pub(crate) fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Joins token texts into the whitespace-free form used in keys.
pub(crate) fn join_tokens<'a, I>(words: I, unescape: bool) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    if unescape {
        unescape_penn_treebank(words)
            .iter()
            .map(|w| strip_whitespace(w))
            .collect()
    } else {
        words.into_iter().map(strip_whitespace).collect()
    }
}

/// True when two sorted index lists share at least one index.
pub(crate) fn sorted_intersect(a: &[usize], b: &[usize]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => return true,
        }
    }
    false
}

/// Identity of a mention used for exact-match comparisons between gold and predicted mentions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalKey {
    pub doc_id: String,
    pub sentence_id: usize,
    /// Ordered token indices inside the sentence.
    pub token_idxs: Vec<usize>,
    /// Document character span of the tokens.
    pub char_span: Span,
    /// Whitespace-free mention text.
    pub text: String,
}

impl CanonicalKey {
    /// Token span `(min, max + 1)` of the key.
    pub fn token_span(&self) -> Span {
        Span::covering(&self.token_idxs).unwrap_or(Span::new(0, 0))
    }

    pub fn intersects(&self, token_idxs: &[usize]) -> bool {
        sorted_intersect(&self.token_idxs, token_idxs)
    }
}

impl Display for CanonicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.doc_id,
            self.sentence_id,
            self.token_span(),
            self.char_span,
            self.text
        )
    }
}

/// A mention proposed by an external generator. The tokens at `token_idxs` travel with the
/// candidate, so its key does not need the sentence it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub doc_id: String,
    pub sentence_id: usize,
    token_idxs: Vec<usize>,
    tokens: Vec<Token>,
}

impl Candidate {
    /// Builds a candidate from explicit indices and the tokens at those indices. Indices must be
    /// strictly increasing.
    pub fn new<S: Into<String>>(
        doc_id: S,
        sentence_id: usize,
        token_idxs: Vec<usize>,
        tokens: Vec<Token>,
    ) -> Result<Self> {
        let doc_id = doc_id.into();
        let reason = if token_idxs.is_empty() {
            Some(String::from("no token indices"))
        } else if token_idxs.len() != tokens.len() {
            Some(format!(
                "{} token indices but {} tokens",
                token_idxs.len(),
                tokens.len()
            ))
        } else if token_idxs.windows(2).any(|w| w[0] >= w[1]) {
            Some(String::from("token indices are not strictly increasing"))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(EvalError::InvalidCandidate {
                doc_id,
                sentence_id,
                reason,
            }),
            None => Ok(Self {
                doc_id,
                sentence_id,
                token_idxs,
                tokens,
            }),
        }
    }

    /// Builds a candidate from a set of token indices of `sentence`. Indices are sorted and
    /// deduplicated.
    pub fn from_sentence<S, I>(doc_id: S, sentence: &Sentence, idxs: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = usize>,
    {
        let doc_id = doc_id.into();
        let token_idxs: Vec<usize> = idxs.into_iter().sorted_unstable().dedup().collect();
        if let Some(out_of_range) = token_idxs.iter().find(|i| **i >= sentence.len()) {
            return Err(EvalError::InvalidCandidate {
                doc_id,
                sentence_id: sentence.sentence_id,
                reason: format!(
                    "token index {} out of range for a sentence of {} tokens",
                    out_of_range,
                    sentence.len()
                ),
            });
        }
        let tokens = token_idxs
            .iter()
            .map(|i| sentence.tokens[*i].clone())
            .collect();
        Self::new(doc_id, sentence.sentence_id, token_idxs, tokens)
    }

    pub fn token_idxs(&self) -> &[usize] {
        &self.token_idxs
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of tokens in the mention.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token span `(min, max + 1)`.
    pub fn span(&self) -> Span {
        Span::covering(&self.token_idxs).unwrap_or(Span::new(0, 0))
    }

    /// Token texts of the mention.
    pub fn mention(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens.iter().map(|t| t.text.as_str())
    }

    /// Document character span from the first character of the first token to the end of the
    /// last one.
    pub fn char_span(&self) -> Span {
        match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => Span::new(first.char_start, last.char_end()),
            _ => Span::new(0, 0),
        }
    }

    /// Whitespace-free text of the mention.
    pub fn text(&self, unescape: bool) -> String {
        join_tokens(self.mention(), unescape)
    }

    pub fn canonical_key(&self, unescape: bool) -> CanonicalKey {
        CanonicalKey {
            doc_id: self.doc_id.clone(),
            sentence_id: self.sentence_id,
            token_idxs: self.token_idxs.clone(),
            char_span: self.char_span(),
            text: self.text(unescape),
        }
    }
}

impl Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.doc_id,
            self.sentence_id,
            self.span(),
            self.mention().join(" ")
        )
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use quickcheck::TestResult;
    use rstest::rstest;

    pub(crate) fn build_sentence() -> Sentence {
        Sentence::from_words(
            "doc1",
            0,
            vec!["Patients", "with", "breast", "cancer", "were", "treated", "."],
            vec![0, 9, 14, 21, 28, 33, 41],
        )
        .unwrap()
    }

    #[test]
    fn test_candidate_key() {
        let sentence = build_sentence();
        let candidate = Candidate::from_sentence("doc1", &sentence, vec![3, 2]).unwrap();
        let key = candidate.canonical_key(true);
        assert_eq!(key.token_idxs, vec![2, 3]);
        assert_eq!(key.token_span(), Span::new(2, 4));
        assert_eq!(key.char_span, Span::new(14, 27));
        assert_eq!(key.text, "breastcancer");
        assert_eq!(candidate.to_string(), "(doc1, 0, [2, 4), breast cancer)");
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![7])]
    #[case(vec![1, 12])]
    fn test_invalid_candidates(#[case] idxs: Vec<usize>) {
        let sentence = build_sentence();
        let res = Candidate::from_sentence("doc1", &sentence, idxs);
        assert!(matches!(res, Err(EvalError::InvalidCandidate { .. })))
    }

    #[test]
    fn test_candidate_new_not_increasing() {
        let tokens = vec![Token::new("b", 2), Token::new("a", 0)];
        let res = Candidate::new("doc1", 0, vec![1, 0], tokens);
        assert!(res.is_err())
    }

    #[rstest]
    #[case((0, 2), (1, 3), true)]
    #[case((0, 2), (2, 3), false)]
    #[case((4, 5), (0, 9), true)]
    #[case((3, 3), (0, 9), false)]
    fn test_span_overlaps(
        #[case] a: (usize, usize),
        #[case] b: (usize, usize),
        #[case] expected: bool,
    ) {
        let a = Span::from(a);
        let b = Span::from(b);
        assert_eq!(a.overlaps(&b), expected);
        assert_eq!(b.overlaps(&a), expected);
    }

    #[test]
    fn test_strip_whitespace() {
        assert_eq!(strip_whitespace(" breast\tcancer \n"), "breastcancer")
    }

    #[test]
    fn test_propertie_sorted_intersect() {
        fn propertie_sorted_intersect_matches_naive(a: Vec<u8>, b: Vec<u8>) -> TestResult {
            let a: Vec<usize> = a.into_iter().map(usize::from).sorted().dedup().collect();
            let b: Vec<usize> = b.into_iter().map(usize::from).sorted().dedup().collect();
            let naive = a.iter().any(|x| b.contains(x));
            TestResult::from_bool(sorted_intersect(&a, &b) == naive)
        }
        let mut qc = quickcheck::QuickCheck::new().tests(2000);
        qc.quickcheck(propertie_sorted_intersect_matches_naive as fn(Vec<u8>, Vec<u8>) -> TestResult)
    }
}
