use crate::align::{AlignmentFailure, SpanAligner};
use crate::document::{GoldAnnotation, Sentence};
use crate::mention::{join_tokens, strip_whitespace, CanonicalKey, Span};
use ahash::{HashMap as AHashMap, HashSet as AHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};
use std::ops::AddAssign;
use tracing::{debug, warn};

/// Metadata kept for each gold key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoldMention {
    pub category: String,
    /// The annotation text as found in the corpus.
    pub annotation_text: String,
    /// Whitespace-free text of the tokens the annotation was aligned to.
    pub token_text: String,
}

impl GoldMention {
    /// The tokenizer split a word inside the mention boundary (or swallowed extra characters),
    /// so no candidate made of whole tokens can reproduce the annotation text.
    pub fn is_tokenization_mismatch(&self) -> bool {
        strip_whitespace(&self.annotation_text) != self.token_text
    }
}

/// Counters collected while building the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildStats {
    /// Annotations aligned to a token span.
    pub aligned: usize,
    /// Annotations whose start offset lies outside every sentence.
    pub unaligned: usize,
    /// Annotations whose key was already present.
    pub duplicates: usize,
}

impl AddAssign for BuildStats {
    fn add_assign(&mut self, rhs: Self) {
        self.aligned += rhs.aligned;
        self.unaligned += rhs.unaligned;
        self.duplicates += rhs.duplicates;
    }
}

/// Set of canonical gold keys for a document collection.
#[derive(Debug, Clone, Default)]
pub struct GroundTruthIndex {
    mentions: BTreeMap<CanonicalKey, GoldMention>,
    /// doc_id -> sentence_id -> token index sets of the gold mentions in that sentence.
    sentence_spans: AHashMap<String, AHashMap<usize, Vec<Vec<usize>>>>,
    failures: Vec<AlignmentFailure>,
    stats: BuildStats,
    unescape: bool,
}

impl GroundTruthIndex {
    pub fn new(unescape: bool) -> Self {
        Self {
            unescape,
            ..Default::default()
        }
    }

    /// Builds the index of several documents, each given as its id, its sentences and its
    /// annotations.
    pub fn build<'a, I>(documents: I, unescape: bool) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [Sentence], &'a [GoldAnnotation])>,
    {
        let mut index = Self::new(unescape);
        for (doc_id, sentences, annotations) in documents {
            index.add_document(doc_id, sentences, annotations);
        }
        index
    }

    /// Aligns and inserts every annotation of one document.
    pub fn add_document(
        &mut self,
        doc_id: &str,
        sentences: &[Sentence],
        annotations: &[GoldAnnotation],
    ) {
        let aligner = SpanAligner::new(doc_id, sentences);
        for annotation in annotations {
            let aligned = match aligner.align(annotation) {
                Ok(aligned) => aligned,
                Err(failure) => {
                    warn!("{}", failure);
                    self.stats.unaligned += 1;
                    self.failures.push(failure);
                    continue;
                }
            };
            let sentence = aligner.sentence(&aligned);
            let Span { start, end } = aligned.token_span;
            let token_text = join_tokens(
                sentence.tokens[start..end].iter().map(|t| t.text.as_str()),
                self.unescape,
            );
            let key = CanonicalKey {
                doc_id: doc_id.to_string(),
                sentence_id: aligned.sentence_id,
                token_idxs: (start..end).collect(),
                char_span: aligned.char_span,
                text: strip_whitespace(&annotation.text),
            };
            let mention = GoldMention {
                category: annotation.category.clone(),
                annotation_text: annotation.text.clone(),
                token_text,
            };
            self.insert(key, mention);
        }
    }

    fn insert(&mut self, key: CanonicalKey, mention: GoldMention) {
        match self.mentions.entry(key) {
            Entry::Occupied(occupied) => {
                warn!(
                    "Duplicate gold annotation {} ({}), counted once",
                    occupied.key(),
                    mention.category
                );
                self.stats.duplicates += 1;
            }
            Entry::Vacant(vacant) => {
                self.sentence_spans
                    .entry(vacant.key().doc_id.clone())
                    .or_default()
                    .entry(vacant.key().sentence_id)
                    .or_default()
                    .push(vacant.key().token_idxs.clone());
                vacant.insert(mention);
                self.stats.aligned += 1;
            }
        }
    }

    /// Union of two indices. Keys present in both are counted as duplicates.
    pub fn merge(mut self, other: Self) -> Self {
        self.stats.unaligned += other.stats.unaligned;
        self.stats.duplicates += other.stats.duplicates;
        self.failures.extend(other.failures);
        for (key, mention) in other.mentions {
            self.insert(key, mention);
        }
        debug!(
            "Merged gold index now holds {} keys",
            self.mentions.len()
        );
        self
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.mentions.contains_key(key)
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<&GoldMention> {
        self.mentions.get(key)
    }

    /// Every gold key, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &CanonicalKey> + '_ {
        self.mentions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalKey, &GoldMention)> + '_ {
        self.mentions.iter()
    }

    /// Gold keys of the given documents, in key order.
    pub fn keys_in<'s, 'd>(
        &'s self,
        doc_ids: &'d AHashSet<&'d str>,
    ) -> impl Iterator<Item = &'s CanonicalKey> + 'd
    where
        's: 'd,
    {
        self.mentions
            .keys()
            .filter(move |k| doc_ids.contains(k.doc_id.as_str()))
    }

    /// Token index sets of the gold mentions of one sentence.
    pub fn sentence_spans(&self, doc_id: &str, sentence_id: usize) -> &[Vec<usize>] {
        self.sentence_spans
            .get(doc_id)
            .and_then(|sentences| sentences.get(&sentence_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn failures(&self) -> &[AlignmentFailure] {
        &self.failures
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}
