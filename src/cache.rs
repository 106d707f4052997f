/*!
Per-document parse cache. Sentence parsing is the expensive step of loading a corpus, so parsed
documents are kept behind the `ParseCache` capability. The engine only talks to the trait; where
and how entries are stored belongs to the implementation.
*/
use crate::document::Sentence;
use crate::error::Result;
use ahash::HashMap as AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Sentences of one document, as produced by a sentence parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub doc_id: String,
    pub sentences: Vec<Sentence>,
}

pub trait ParseCache: Send + Sync {
    fn get(&self, doc_id: &str) -> Option<ParsedDocument>;

    fn put(&self, doc_id: &str, parsed: ParsedDocument);

    /// Returns the cached document, or parses and stores it. The default implementation does the
    /// lookup and the insertion separately, so two concurrent callers may both parse the same
    /// document; implementations able to hold a lock across both steps should override it.
    fn get_or_parse<F>(&self, doc_id: &str, parse: F) -> Result<ParsedDocument>
    where
        F: FnOnce() -> Result<ParsedDocument>,
        Self: Sized,
    {
        if let Some(parsed) = self.get(doc_id) {
            return Ok(parsed);
        }
        let parsed = parse()?;
        self.put(doc_id, parsed.clone());
        Ok(parsed)
    }
}

/// A cache that never stores anything: every document is parsed on each load.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl ParseCache for NoCache {
    fn get(&self, _doc_id: &str) -> Option<ParsedDocument> {
        None
    }

    fn put(&self, _doc_id: &str, _parsed: ParsedDocument) {}
}

/// In-memory cache. `get_or_parse` holds the write lock while parsing, so a document id is
/// parsed at most once even when several workers load it at the same time.
#[derive(Debug, Default)]
pub struct MemoryParseCache {
    entries: RwLock<AHashMap<String, ParsedDocument>>,
}

impl MemoryParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ParseCache for MemoryParseCache {
    fn get(&self, doc_id: &str) -> Option<ParsedDocument> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(doc_id)
            .cloned()
    }

    fn put(&self, doc_id: &str, parsed: ParsedDocument) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(doc_id.to_string(), parsed);
    }

    fn get_or_parse<F>(&self, doc_id: &str, parse: F) -> Result<ParsedDocument>
    where
        F: FnOnce() -> Result<ParsedDocument>,
    {
        if let Some(parsed) = self.get(doc_id) {
            return Ok(parsed);
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another worker may have parsed the document while we waited for the lock.
        if let Some(parsed) = entries.get(doc_id) {
            return Ok(parsed.clone());
        }
        debug!("Parsing document {}", doc_id);
        let parsed = parse()?;
        entries.insert(doc_id.to_string(), parsed.clone());
        Ok(parsed)
    }
}
