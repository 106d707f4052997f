/*
 * This modules contains the `EvalConfig` struct, which implements the default trait, and the
 * builder used to customize it. The config is given to `Corpus` when loading documents and is
 * reused by every evaluation made on that corpus.
*/
use crate::resolver::DEFAULT_THRESHOLD;
use either::Either as LeftOrRight;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Probability a candidate must exceed to be accepted by the longest-match resolver. The default
/// is `0.499` rather than `0.5`; the exact intent of that value is unverified, so it is kept as
/// is.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Threshold(pub f32);

impl Default for Threshold {
    fn default() -> Self {
        Threshold(DEFAULT_THRESHOLD)
    }
}

impl From<f32> for Threshold {
    fn from(value: f32) -> Self {
        Threshold(value)
    }
}

impl From<Threshold> for f32 {
    fn from(value: Threshold) -> Self {
        value.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// Config struct used to simplify the inputs of the `Corpus`. It implements the default trait.
pub struct EvalConfig {
    /// Threshold of the longest-match resolver.
    pub(crate) threshold: f32,
    /// Can we align the documents on multiple cores? Only corpus loading is parallelized;
    /// scoring always runs on the calling thread.
    pub(crate) parallel: bool,
    /// Should Penn Treebank escapes (`-LRB-`, ``` `` ```, ...) be undone before comparing token
    /// texts to annotation texts?
    pub(crate) unescape_ptb: bool,
    /// If set, only the annotations of this category enter the ground truth.
    pub(crate) category: Option<String>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            parallel: false,
            unescape_ptb: true,
            category: None,
        }
    }
}

impl EvalConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
    pub fn parallel(&self) -> bool {
        self.parallel
    }
    pub fn unescape_ptb(&self) -> bool {
        self.unescape_ptb
    }
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

impl Display for EvalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = format!("Longest match threshold: {}\n Using parallel alignment: {}\n Undoing Penn Treebank escapes: {}\n Category filter: {:?}", self.threshold, self.parallel, self.unescape_ptb, self.category);
        write!(f, "{}", string)
    }
}

impl<T> From<EvalConfigBuilder<T>> for EvalConfig
where
    T: Into<Threshold>,
{
    fn from(value: EvalConfigBuilder<T>) -> Self {
        let threshold: Threshold = value.threshold.either_into();
        Self {
            threshold: threshold.into(),
            parallel: value.parallel,
            unescape_ptb: value.unescape_ptb,
            category: value.category,
        }
    }
}

/// This builder can be used to build and customize an `EvalConfig` structure.
pub struct EvalConfigBuilder<T>
where
    T: Into<Threshold>,
{
    threshold: LeftOrRight<T, Threshold>,
    parallel: bool,
    unescape_ptb: bool,
    category: Option<String>,
}

impl Default for EvalConfigBuilder<Threshold> {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalConfigBuilder<Threshold> {
    pub fn new() -> Self {
        Self {
            threshold: LeftOrRight::Right(Threshold::default()),
            parallel: false,
            unescape_ptb: true,
            category: None,
        }
    }
}

impl<T> EvalConfigBuilder<T>
where
    T: Into<Threshold>,
{
    pub fn threshold<U: Into<Threshold>>(self, threshold: U) -> EvalConfigBuilder<U> {
        EvalConfigBuilder {
            threshold: LeftOrRight::Left(threshold),
            parallel: self.parallel,
            unescape_ptb: self.unescape_ptb,
            category: self.category,
        }
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
    pub fn unescape_ptb(mut self, unescape_ptb: bool) -> Self {
        self.unescape_ptb = unescape_ptb;
        self
    }
    pub fn category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }
    pub fn build(self) -> EvalConfig {
        EvalConfig::from(self)
    }
}
