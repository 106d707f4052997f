/*!
Conversion of character-offset gold annotations into token spans.

The repair is best-effort: the tokenizer may split a word inside an annotation boundary, in which
case the returned token span covers more (or other) text than the annotation. Nothing here checks
that the tokens spell the annotation text; `error_analysis` reports those cases as tokenization
mismatches.

Annotations crossing a sentence boundary are assigned to the sentence containing their start and
are truncated at the end of that sentence.
*/
use crate::datastructure::TokenIndex;
use crate::document::{GoldAnnotation, Sentence};
use crate::mention::Span;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A gold annotation expressed as a token span of one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlignedMention {
    pub doc_id: String,
    pub sentence_id: usize,
    /// Position of the sentence in the document's sentence list.
    pub(crate) sentence_position: usize,
    /// Half-open token span, `0 <= start < end <= sentence length`.
    pub token_span: Span,
    /// Character span covered by the aligned tokens. It differs from the annotation span when
    /// the tokenization does not follow the annotation boundaries.
    pub char_span: Span,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlignmentFailureReason {
    /// No sentence covers the start offset of the annotation.
    NoContainingSentence,
}

/// Recoverable alignment error. The annotation is left out of the ground truth and counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlignmentFailure {
    pub doc_id: String,
    pub annotation: GoldAnnotation,
    pub reason: AlignmentFailureReason,
}

impl Display for AlignmentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            AlignmentFailureReason::NoContainingSentence => write!(
                f,
                "No sentence of document {} contains the start of annotation {}",
                self.doc_id, self.annotation
            ),
        }
    }
}

/// Aligns the annotations of one document against its sentences.
#[derive(Debug, Clone)]
pub struct SpanAligner<'a> {
    doc_id: &'a str,
    sentences: &'a [Sentence],
    index: TokenIndex,
}

impl<'a> SpanAligner<'a> {
    pub fn new(doc_id: &'a str, sentences: &'a [Sentence]) -> Self {
        Self {
            doc_id,
            sentences,
            index: TokenIndex::new(sentences),
        }
    }

    /// Token span of `annotation` inside the sentence containing its start offset.
    ///
    /// The start token is the `j` with `offsets[j] <= start < offsets[j + 1]`, or the last token
    /// of the sentence when there is none. The span then grows forward while the annotation end
    /// lies past the start of the next token.
    pub fn align(&self, annotation: &GoldAnnotation) -> Result<AlignedMention, AlignmentFailure> {
        let position = self
            .index
            .sentence_containing(annotation.start)
            .ok_or_else(|| AlignmentFailure {
                doc_id: self.doc_id.to_string(),
                annotation: annotation.clone(),
                reason: AlignmentFailureReason::NoContainingSentence,
            })?;
        let offsets = self.index.offsets(position);
        let ends = self.index.ends(position);
        // A sentence containing a position has at least one token.
        let last = offsets.len() - 1;

        let start_idx = offsets
            .windows(2)
            .position(|w| w[0] <= annotation.start && annotation.start < w[1])
            .unwrap_or(last);

        let mut end_idx = start_idx + 1;
        for (j, offset) in offsets.iter().enumerate().skip(start_idx) {
            if annotation.end > *offset {
                end_idx = j + 1;
            } else {
                break;
            }
        }

        Ok(AlignedMention {
            doc_id: self.doc_id.to_string(),
            sentence_id: self.sentences[position].sentence_id,
            sentence_position: position,
            token_span: Span::new(start_idx, end_idx),
            char_span: Span::new(offsets[start_idx], ends[end_idx - 1]),
            category: annotation.category.clone(),
        })
    }

    /// Sentence an aligned mention points into.
    pub(crate) fn sentence(&self, mention: &AlignedMention) -> &'a Sentence {
        &self.sentences[mention.sentence_position]
    }
}

/// Aligns a single annotation. Prefer `SpanAligner` when aligning several annotations of the
/// same document, since the offset table is built once.
pub fn align(
    doc_id: &str,
    annotation: &GoldAnnotation,
    sentences: &[Sentence],
) -> Result<AlignedMention, AlignmentFailure> {
    SpanAligner::new(doc_id, sentences).align(annotation)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::Token;
    use quickcheck::TestResult;
    use rstest::rstest;

    fn build_sentences() -> Vec<Sentence> {
        vec![
            Sentence::from_words(
                "doc1",
                0,
                vec!["Patients", "with", "breast", "cancer", "were", "treated", "."],
                vec![0, 9, 14, 21, 28, 33, 41],
            )
            .unwrap(),
            Sentence::from_words(
                "doc1",
                1,
                vec!["BRCA1", "-", "mutations", "matter", "."],
                vec![43, 48, 49, 59, 65],
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_align_breast_cancer() {
        let sentences = build_sentences();
        let annotation = GoldAnnotation::new(14, 27, "breast cancer", "Disease");
        let aligned = align("doc1", &annotation, &sentences).unwrap();
        assert_eq!(aligned.token_span, Span::new(2, 4));
        assert_eq!(aligned.char_span, Span::new(14, 27));
        assert_eq!(aligned.sentence_id, 0);
        assert_eq!(aligned.category, "Disease");
    }

    #[rstest]
    // Single token
    #[case(0, 8, 0, (0, 1))]
    // Last token of the first sentence
    #[case(41, 42, 0, (6, 7))]
    // Annotation starting in the middle of a token
    #[case(16, 20, 0, (2, 3))]
    // Annotation ending in the middle of a token
    #[case(9, 16, 0, (1, 3))]
    // Hyphenated mention split by the tokenizer
    #[case(43, 58, 1, (0, 3))]
    // Annotation running past the end of the sentence
    #[case(59, 80, 1, (3, 5))]
    fn test_align_cases(
        #[case] start: usize,
        #[case] end: usize,
        #[case] sentence_id: usize,
        #[case] span: (usize, usize),
    ) {
        let sentences = build_sentences();
        let annotation = GoldAnnotation::new(start, end, "unused", "Disease");
        let aligned = align("doc1", &annotation, &sentences).unwrap();
        assert_eq!(aligned.sentence_id, sentence_id);
        assert_eq!(aligned.token_span, Span::from(span));
    }

    #[test]
    fn test_escaped_bracket_does_not_swallow_next_sentence() {
        let sentences = vec![
            Sentence::from_words(
                "doc1",
                0,
                vec!["Seen", "in", "rats", "-LRB-", "CRC", "-RRB-"],
                vec![0, 5, 8, 13, 14, 17],
            )
            .unwrap(),
            Sentence::from_words("doc1", 1, vec!["Aspirin", "helps", "."], vec![19, 27, 33])
                .unwrap(),
        ];
        let annotation = GoldAnnotation::new(19, 26, "Aspirin", "Chemical");
        let aligned = align("doc1", &annotation, &sentences).unwrap();
        assert_eq!(aligned.sentence_id, 1);
        assert_eq!(aligned.token_span, Span::new(0, 1));
        let bracket = GoldAnnotation::new(14, 17, "CRC", "Disease");
        let aligned = align("doc1", &bracket, &sentences).unwrap();
        assert_eq!(aligned.sentence_id, 0);
        assert_eq!(aligned.token_span, Span::new(4, 5));
    }

    #[rstest]
    #[case(42)]
    #[case(66)]
    #[case(1000)]
    fn test_no_containing_sentence(#[case] start: usize) {
        let sentences = build_sentences();
        let annotation = GoldAnnotation::new(start, start + 1, "x", "Disease");
        let failure = align("doc1", &annotation, &sentences).unwrap_err();
        assert_eq!(failure.reason, AlignmentFailureReason::NoContainingSentence);
        assert_eq!(failure.doc_id, "doc1");
    }

    #[test]
    fn test_propertie_aligned_span_in_bounds() {
        fn propertie_aligned_span_in_bounds(
            lengths: Vec<u8>,
            start: u16,
            width: u8,
        ) -> TestResult {
            let lengths: Vec<usize> = lengths.into_iter().map(|l| usize::from(l % 9) + 1).collect();
            if lengths.is_empty() {
                return TestResult::discard();
            }
            let mut tokens = Vec::with_capacity(lengths.len());
            let mut offset = 0;
            for l in lengths {
                tokens.push(Token::new("x".repeat(l), offset));
                offset += l + 1;
            }
            let sentences = vec![Sentence::new(0, tokens)];
            let start = usize::from(start) % offset;
            let annotation =
                GoldAnnotation::new(start, start + usize::from(width) + 1, "x", "Disease");
            match align("doc", &annotation, &sentences) {
                Ok(aligned) => {
                    let span = aligned.token_span;
                    TestResult::from_bool(
                        span.start < span.end && span.end <= sentences[0].len(),
                    )
                }
                // Falling on the trailing space of the sentence is a legitimate miss.
                Err(_) => TestResult::from_bool(start + 1 >= offset),
            }
        }
        let mut qc = quickcheck::QuickCheck::new().tests(2000);
        qc.quickcheck(propertie_aligned_span_in_bounds as fn(Vec<u8>, u16, u8) -> TestResult)
    }
}
