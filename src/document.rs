/*!
Data handed to the engine by its collaborators: documents, the sentences produced by the external
tokenizer, and gold annotations. Corpus-specific annotation records are normalized into
`GoldAnnotation` through `RawAnnotation` before anything else sees them.

All offsets are character positions (Unicode scalar values), never byte positions.
*/
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Returns the substring between the character positions `start` and `end`, or `None` if the
/// range is reversed or goes past the end of `text`.
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if end < start {
        return None;
    }
    let mut boundaries = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));
    let byte_start = boundaries.nth(start)?;
    let byte_end = if end == start {
        byte_start
    } else {
        boundaries.nth(end - start - 1)?
    };
    Some(&text[byte_start..byte_end])
}

/// Length of `text` in characters.
#[inline]
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub raw_text: String,
}

impl Document {
    pub fn new<I: Into<String>, T: Into<String>>(doc_id: I, raw_text: T) -> Self {
        Self {
            doc_id: doc_id.into(),
            raw_text: raw_text.into(),
        }
    }

    /// Builds a PubTator-style document: the title and the abstract joined by a single space. The
    /// returned layout is needed to normalize section-relative annotations.
    pub fn from_title_abstract<I: Into<String>>(
        doc_id: I,
        title: &str,
        abstract_text: &str,
    ) -> (Self, DocumentLayout) {
        let layout = DocumentLayout {
            title_len: char_len(title),
        };
        (Self::new(doc_id, format!("{} {}", title, abstract_text)), layout)
    }

    /// Text between two character offsets.
    pub fn substring(&self, start: usize, end: usize) -> Option<&str> {
        char_slice(&self.raw_text, start, end)
    }
}

/// A token and the character position of its first character in the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub char_start: usize,
}

impl Token {
    pub fn new<S: Into<String>>(text: S, char_start: usize) -> Self {
        Self {
            text: text.into(),
            char_start,
        }
    }

    /// Position one past the last character of the token.
    pub fn char_end(&self) -> usize {
        self.char_start + char_len(&self.text)
    }
}

/// A sentence as produced by the external sentence-parsing service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sentence {
    pub sentence_id: usize,
    pub tokens: Vec<Token>,
}

impl Sentence {
    pub fn new(sentence_id: usize, tokens: Vec<Token>) -> Self {
        Self {
            sentence_id,
            tokens,
        }
    }

    /// Builds a sentence from the parallel `words`/`char_offsets` lists the parser emits.
    pub fn from_words<S: Into<String>>(
        doc_id: &str,
        sentence_id: usize,
        words: Vec<S>,
        char_offsets: Vec<usize>,
    ) -> Result<Self> {
        if words.len() != char_offsets.len() {
            return Err(EvalError::InvalidSentence {
                doc_id: doc_id.to_string(),
                sentence_id,
                reason: format!(
                    "{} words but {} character offsets",
                    words.len(),
                    char_offsets.len()
                ),
            });
        }
        let tokens = words
            .into_iter()
            .zip(char_offsets)
            .map(|(w, o)| Token::new(w, o))
            .collect();
        let sentence = Self::new(sentence_id, tokens);
        sentence.validate(doc_id)?;
        Ok(sentence)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn char_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.tokens.iter().map(|t| t.char_start)
    }

    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens.iter().map(|t| t.text.as_str())
    }

    /// Character range `[first offset, end of last token)` covered by the sentence.
    pub fn char_range(&self) -> Option<(usize, usize)> {
        let first = self.tokens.first()?;
        let last = self.tokens.last()?;
        Some((first.char_start, last.char_end()))
    }

    /// Checks that the offsets never decrease.
    pub fn validate(&self, doc_id: &str) -> Result<()> {
        let decreasing = self
            .tokens
            .windows(2)
            .position(|w| w[1].char_start < w[0].char_start);
        match decreasing {
            Some(i) => Err(EvalError::InvalidSentence {
                doc_id: doc_id.to_string(),
                sentence_id: self.sentence_id,
                reason: format!(
                    "character offset of token {} ({}) is smaller than the previous one ({})",
                    i + 1,
                    self.tokens[i + 1].char_start,
                    self.tokens[i].char_start
                ),
            }),
            None => Ok(()),
        }
    }
}

/// A human-labeled mention, `[start, end)` in document character offsets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GoldAnnotation {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub ids: Vec<String>,
}

impl GoldAnnotation {
    pub fn new<T: Into<String>, C: Into<String>>(
        start: usize,
        end: usize,
        text: T,
        category: C,
    ) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            category: category.into(),
            ids: vec![],
        }
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = ids;
        self
    }

    /// Verifies that the annotation text is exactly the document text at its offsets.
    pub fn check_integrity(&self, document: &Document) -> Result<()> {
        if self.end <= self.start {
            return Err(EvalError::InvalidSpan {
                doc_id: document.doc_id.clone(),
                start: self.start,
                end: self.end,
            });
        }
        match document.substring(self.start, self.end) {
            None => Err(EvalError::InvalidSpan {
                doc_id: document.doc_id.clone(),
                start: self.start,
                end: self.end,
            }),
            Some(found) if found != self.text => Err(EvalError::CorpusIntegrity {
                doc_id: document.doc_id.clone(),
                start: self.start,
                end: self.end,
                expected: self.text.clone(),
                found: found.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }
}

impl Display for GoldAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.category, self.start, self.end, self.text
        )
    }
}

/// Part of a multi-part document an annotation offset is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Title,
    Abstract,
}

/// Shape of a document built from several parts. Only PubTator-style title/abstract documents
/// are described so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentLayout {
    /// Length of the title in characters. The abstract starts one character after it.
    pub title_len: usize,
}

impl DocumentLayout {
    fn shift(&self, section: Section) -> usize {
        match section {
            Section::Title => 0,
            Section::Abstract => self.title_len + 1,
        }
    }
}

/// Annotation records as the different corpus loaders produce them. They all normalize into a
/// `GoldAnnotation` in document coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum RawAnnotation {
    /// Already in document coordinates.
    Document(GoldAnnotation),
    /// PubTator entity record. Offsets are document-level; `identifiers` is the `|`-separated
    /// concept id field.
    PubTator {
        start: usize,
        end: usize,
        text: String,
        mention_type: String,
        identifiers: String,
    },
    /// Offsets relative to the start of `section`.
    Sectioned {
        section: Section,
        start: usize,
        end: usize,
        text: String,
        category: String,
        #[serde(default)]
        ids: Vec<String>,
    },
}

impl RawAnnotation {
    pub fn normalize(&self, layout: &DocumentLayout) -> GoldAnnotation {
        match self {
            Self::Document(annotation) => annotation.clone(),
            Self::PubTator {
                start,
                end,
                text,
                mention_type,
                identifiers,
            } => {
                let ids = identifiers
                    .split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty() && *s != "-1")
                    .map(String::from)
                    .collect();
                GoldAnnotation::new(*start, *end, text.as_str(), mention_type.as_str())
                    .with_ids(ids)
            }
            Self::Sectioned {
                section,
                start,
                end,
                text,
                category,
                ids,
            } => {
                let shift = layout.shift(*section);
                GoldAnnotation::new(start + shift, end + shift, text.as_str(), category.as_str())
                    .with_ids(ids.clone())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("breast cancer", 0, 6, Some("breast"))]
    #[case("breast cancer", 7, 13, Some("cancer"))]
    #[case("breast cancer", 7, 14, None)]
    #[case("naïve T-cells", 2, 5, Some("ïve"))]
    #[case("abc", 3, 3, Some(""))]
    #[case("abc", 2, 1, None)]
    fn test_char_slice(
        #[case] text: &str,
        #[case] start: usize,
        #[case] end: usize,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(char_slice(text, start, end), expected)
    }

    #[test]
    fn test_integrity_ok() {
        let doc = Document::new("1", "Patients with breast cancer were treated.");
        let annotation = GoldAnnotation::new(14, 27, "breast cancer", "Disease");
        assert!(annotation.check_integrity(&doc).is_ok())
    }

    #[test]
    fn test_integrity_mismatch() {
        let doc = Document::new("1", "Patients with breast cancer were treated.");
        let annotation = GoldAnnotation::new(14, 27, "breast tumor!", "Disease");
        let err = annotation.check_integrity(&doc).unwrap_err();
        assert_eq!(
            err,
            EvalError::CorpusIntegrity {
                doc_id: String::from("1"),
                start: 14,
                end: 27,
                expected: String::from("breast tumor!"),
                found: String::from("breast cancer"),
            }
        )
    }

    #[rstest]
    #[case(5, 5)]
    #[case(6, 2)]
    #[case(30, 90)]
    fn test_integrity_invalid_span(#[case] start: usize, #[case] end: usize) {
        let doc = Document::new("1", "Patients with breast cancer.");
        let annotation = GoldAnnotation::new(start, end, "x", "Disease");
        assert!(matches!(
            annotation.check_integrity(&doc),
            Err(EvalError::InvalidSpan { .. })
        ))
    }

    #[test]
    fn test_sentence_from_words_length_mismatch() {
        let res = Sentence::from_words("1", 0, vec!["a", "b"], vec![0]);
        assert!(matches!(res, Err(EvalError::InvalidSentence { .. })))
    }

    #[test]
    fn test_sentence_decreasing_offsets() {
        let res = Sentence::from_words("1", 0, vec!["a", "b"], vec![4, 2]);
        assert!(matches!(res, Err(EvalError::InvalidSentence { .. })))
    }

    #[test]
    fn test_sentence_char_range() {
        let sentence = Sentence::from_words("1", 0, vec!["Breast", "cancer", "."], vec![3, 10, 16])
            .unwrap();
        assert_eq!(sentence.char_range(), Some((3, 17)));
        assert_eq!(Sentence::new(1, vec![]).char_range(), None);
    }

    #[test]
    fn test_sectioned_annotation_shifted() {
        let (doc, layout) =
            Document::from_title_abstract("99", "Aspirin toxicity", "Aspirin causes harm.");
        let raw = RawAnnotation::Sectioned {
            section: Section::Abstract,
            start: 0,
            end: 7,
            text: String::from("Aspirin"),
            category: String::from("Chemical"),
            ids: vec![],
        };
        let annotation = raw.normalize(&layout);
        assert_eq!((annotation.start, annotation.end), (17, 24));
        assert!(annotation.check_integrity(&doc).is_ok());
    }

    #[test]
    fn test_pubtator_identifiers_split() {
        let raw = RawAnnotation::PubTator {
            start: 0,
            end: 7,
            text: String::from("Aspirin"),
            mention_type: String::from("Chemical"),
            identifiers: String::from("D001241|D000082"),
        };
        let annotation = raw.normalize(&DocumentLayout::default());
        assert_eq!(annotation.ids, vec!["D001241", "D000082"]);
        assert_eq!(annotation.category, "Chemical");
    }
}
