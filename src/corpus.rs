/*!
Entry point of the crate. A `Corpus` holds the parsed documents of a collection and their ground
truth, and evaluates candidate predictions against it.

```rust
use aligneval::{Candidate, Corpus, Document, EvalConfig, GoldAnnotation, Sentence};
use ndarray::array;

let document = Document::new("doc1", "Patients with breast cancer were treated .");
let sentence = Sentence::from_words(
    "doc1",
    0,
    vec!["Patients", "with", "breast", "cancer", "were", "treated", "."],
    vec![0, 9, 14, 21, 28, 33, 41],
)
.unwrap();
let annotation = GoldAnnotation::new(14, 27, "breast cancer", "Disease");
let corpus = Corpus::from_parsed(
    EvalConfig::default(),
    vec![(document, vec![sentence.clone()], vec![annotation])],
)
.unwrap();

let candidates = vec![Candidate::from_sentence("doc1", &sentence, vec![2, 3]).unwrap()];
let report = corpus.score(&candidates, &array![1.], None).unwrap();
assert_eq!(report.to_string(), "Precision, Recall, F1, TP, FP, FN\n1, 1, 1, 1, 0, 0\n");
```
*/
use crate::cache::{ParseCache, ParsedDocument};
use crate::config::EvalConfig;
use crate::conll::{document_tags, render, TaggedSpan};
use crate::document::{Document, DocumentLayout, GoldAnnotation, RawAnnotation, Sentence};
use crate::error::Result;
use crate::error_analysis::{ErrorClassifier, ErrorReport, Vocabulary};
use crate::index::{CandidateIndex, GroundTruthIndex};
use crate::matcher::Matcher;
use crate::mention::{Candidate, CanonicalKey};
use crate::metrics::{resolve_doc_ids, ClassificationErrors, ScoreEngine, ScoreReport};
use crate::resolver::{LongestMatchResolver, ResolutionSummary};
use ahash::{HashMap as AHashMap, HashSet as AHashSet};
use ndarray::{Array1, ArrayBase, Data, DataMut, Ix1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Stands in for the external sentence splitter and tokenizer.
pub trait SentenceParser: Sync {
    fn parse(&self, document: &Document) -> Result<Vec<Sentence>>;
}

impl<F> SentenceParser for F
where
    F: Fn(&Document) -> Result<Vec<Sentence>> + Sync,
{
    fn parse(&self, document: &Document) -> Result<Vec<Sentence>> {
        self(document)
    }
}

/// A document as a corpus loader yields it, before sentence parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    pub document: Document,
    #[serde(default)]
    pub layout: DocumentLayout,
    pub annotations: Vec<RawAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusDocument {
    pub document: Document,
    pub sentences: Vec<Sentence>,
    /// Annotations kept after the category filter.
    pub annotations: Vec<GoldAnnotation>,
}

/// Counters collected while loading a corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadStats {
    pub documents: usize,
    /// Annotations read, before the category filter.
    pub annotations: usize,
    /// Annotations dropped by the category filter.
    pub filtered: usize,
    pub aligned: usize,
    pub unaligned: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone)]
pub struct Corpus {
    config: EvalConfig,
    documents: BTreeMap<String, CorpusDocument>,
    gold: GroundTruthIndex,
    stats: LoadStats,
}

impl Corpus {
    /// Loads already parsed documents, each given with its sentences and its gold annotations.
    ///
    /// Fails on the first annotation whose text differs from the document text at its offsets,
    /// and on sentences whose offsets decrease. Annotations outside every sentence and duplicated
    /// annotations are only counted.
    pub fn from_parsed<I>(config: EvalConfig, documents: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Document, Vec<Sentence>, Vec<GoldAnnotation>)>,
    {
        let mut stats = LoadStats::default();
        let mut corpus_documents = BTreeMap::new();
        let mut loaded_annotations: BTreeMap<String, usize> = BTreeMap::new();
        for (document, sentences, annotations) in documents {
            for sentence in sentences.iter() {
                sentence.validate(&document.doc_id)?;
            }
            for annotation in annotations.iter() {
                annotation.check_integrity(&document)?;
            }
            let loaded = annotations.len();
            let annotations: Vec<GoldAnnotation> = match config.category() {
                Some(category) => annotations
                    .into_iter()
                    .filter(|a| a.category == category)
                    .collect(),
                None => annotations,
            };
            let doc_id = document.doc_id.clone();
            let previous = corpus_documents.insert(
                doc_id.clone(),
                CorpusDocument {
                    document,
                    sentences,
                    annotations,
                },
            );
            if previous.is_some() {
                warn!("Document {} loaded twice, keeping the last one", doc_id);
            }
            loaded_annotations.insert(doc_id, loaded);
        }
        stats.documents = corpus_documents.len();
        stats.annotations = loaded_annotations.values().sum();
        let kept: usize = corpus_documents.values().map(|d| d.annotations.len()).sum();
        stats.filtered = stats.annotations.saturating_sub(kept);

        let gold = build_ground_truth(&config, &corpus_documents);
        let build = gold.stats();
        stats.aligned = build.aligned;
        stats.unaligned = build.unaligned;
        stats.duplicates = build.duplicates;
        debug!(
            "Loaded {} documents: {} annotations, {} filtered, {} aligned, {} unaligned, {} duplicates",
            stats.documents,
            stats.annotations,
            stats.filtered,
            stats.aligned,
            stats.unaligned,
            stats.duplicates
        );
        Ok(Self {
            config,
            documents: corpus_documents,
            gold,
            stats,
        })
    }

    /// Parses raw documents through `parser`, going through `cache` first, normalizes their
    /// annotations and loads them like `from_parsed`.
    pub fn from_parser<I, P, C>(
        config: EvalConfig,
        documents: I,
        parser: &P,
        cache: &C,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = RawDocument>,
        P: SentenceParser,
        C: ParseCache,
    {
        let raw: Vec<RawDocument> = documents.into_iter().collect();
        let parse_one =
            |raw: RawDocument| -> Result<(Document, Vec<Sentence>, Vec<GoldAnnotation>)> {
                let parsed = cache.get_or_parse(&raw.document.doc_id, || {
                    parser
                        .parse(&raw.document)
                        .map(|sentences| ParsedDocument {
                            doc_id: raw.document.doc_id.clone(),
                            sentences,
                        })
                })?;
                let annotations = raw
                    .annotations
                    .iter()
                    .map(|a| a.normalize(&raw.layout))
                    .collect();
                Ok((raw.document, parsed.sentences, annotations))
            };
        let parsed: Vec<(Document, Vec<Sentence>, Vec<GoldAnnotation>)> = if config.parallel {
            raw.into_par_iter().map(parse_one).collect::<Result<_>>()?
        } else {
            raw.into_iter().map(parse_one).collect::<Result<_>>()?
        };
        Self::from_parsed(config, parsed)
    }

    fn engine(&self) -> ScoreEngine<'_> {
        ScoreEngine::new(&self.gold, self.config.unescape_ptb)
    }

    /// Precision, recall and f1 of `predictions` against the ground truth of `doc_ids` (the
    /// documents of the candidates by default). See `ScoreEngine::score`.
    pub fn score<S>(
        &self,
        candidates: &[Candidate],
        predictions: &ArrayBase<S, Ix1>,
        doc_ids: Option<&[&str]>,
    ) -> Result<ScoreReport>
    where
        S: Data<Elem = f32>,
    {
        self.engine().score(candidates, predictions, doc_ids)
    }

    pub fn classification_errors<S>(
        &self,
        candidates: &[Candidate],
        predictions: &ArrayBase<S, Ix1>,
        doc_ids: Option<&[&str]>,
    ) -> Result<ClassificationErrors>
    where
        S: Data<Elem = f32>,
    {
        self.engine()
            .classification_errors(candidates, predictions, doc_ids)
    }

    /// `1` for each candidate whose key is a gold key, `-1` otherwise.
    pub fn gold_labels(&self, candidates: &[Candidate]) -> Array1<i8> {
        self.engine().gold_labels(candidates)
    }

    /// Categorizes the false negatives and false positives of `predictions`. The vocabulary is
    /// made of the texts of every candidate given, whatever its prediction.
    pub fn error_analysis<S>(
        &self,
        candidates: &[Candidate],
        predictions: &ArrayBase<S, Ix1>,
        doc_ids: Option<&[&str]>,
    ) -> Result<ErrorReport>
    where
        S: Data<Elem = f32>,
    {
        let errors = self.classification_errors(candidates, predictions, doc_ids)?;
        let unescape = self.config.unescape_ptb;
        let index = CandidateIndex::new(candidates, unescape);
        let vocabulary = Vocabulary::from_candidates(candidates, unescape);
        let classifier = ErrorClassifier::new(&self.gold, Matcher::new(&index), &vocabulary);
        Ok(classifier.classify(&errors))
    }

    /// Rewrites `probabilities` in place so that each gold label keeps at most one accepted
    /// candidate. See `LongestMatchResolver::resolve`.
    pub fn force_longest_match<S>(
        &self,
        candidates: &[Candidate],
        probabilities: &mut ArrayBase<S, Ix1>,
        doc_ids: Option<&[&str]>,
    ) -> Result<ResolutionSummary>
    where
        S: DataMut<Elem = f32>,
    {
        let doc_ids = resolve_doc_ids(candidates, doc_ids);
        let index = CandidateIndex::new(candidates, self.config.unescape_ptb);
        let resolver =
            LongestMatchResolver::new(&self.gold, Matcher::new(&index), self.config.threshold);
        resolver.resolve(probabilities, &doc_ids)
    }

    /// Gold keys of `doc_ids`, or of every document.
    pub fn ground_truth(&self, doc_ids: Option<&[&str]>) -> BTreeSet<&CanonicalKey> {
        match doc_ids {
            Some(ids) => {
                let ids: AHashSet<&str> = ids.iter().copied().collect();
                self.gold.keys_in(&ids).collect()
            }
            None => self.gold.keys().collect(),
        }
    }

    /// CoNLL rendering of the gold mentions of `doc_ids`, or of every document, in document id
    /// order.
    pub fn conll(&self, doc_ids: Option<&[&str]>) -> String {
        let mut spans: AHashMap<&str, Vec<TaggedSpan<'_>>> = AHashMap::default();
        for (key, mention) in self.gold.iter() {
            spans.entry(key.doc_id.as_str()).or_default().push((
                key.sentence_id,
                key.token_idxs.as_slice(),
                mention.category.as_str(),
            ));
        }
        let wanted: Option<AHashSet<&str>> = doc_ids.map(|ids| ids.iter().copied().collect());
        let mut out = String::new();
        for (doc_id, document) in self.documents.iter() {
            if wanted
                .as_ref()
                .is_some_and(|ids| !ids.contains(doc_id.as_str()))
            {
                continue;
            }
            let doc_spans = spans.remove(doc_id.as_str()).unwrap_or_default();
            let tags = document_tags(&document.sentences, doc_spans);
            render(&mut out, &document.sentences, &tags);
        }
        out
    }

    pub fn gold_index(&self) -> &GroundTruthIndex {
        &self.gold
    }

    pub fn document(&self, doc_id: &str) -> Option<&CorpusDocument> {
        self.documents.get(doc_id)
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.documents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn load_stats(&self) -> LoadStats {
        self.stats
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }
}

/// Aligns every document and merges the per-document indices. Documents are independent, so
/// they can be aligned on the rayon thread pool.
fn build_ground_truth(
    config: &EvalConfig,
    documents: &BTreeMap<String, CorpusDocument>,
) -> GroundTruthIndex {
    let unescape = config.unescape_ptb;
    if config.parallel {
        documents
            .par_iter()
            .map(|(doc_id, document)| {
                let mut index = GroundTruthIndex::new(unescape);
                index.add_document(doc_id, &document.sentences, &document.annotations);
                index
            })
            .reduce(|| GroundTruthIndex::new(unescape), GroundTruthIndex::merge)
    } else {
        GroundTruthIndex::build(
            documents.iter().map(|(doc_id, document)| {
                (
                    doc_id.as_str(),
                    document.sentences.as_slice(),
                    document.annotations.as_slice(),
                )
            }),
            unescape,
        )
    }
}
