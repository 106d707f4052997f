use crate::document::Sentence;

/// Character range of one sentence, and the position of that sentence in the document.
#[derive(Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Clone, Copy)]
struct SentenceRange {
    start: usize,
    end: usize,
    position: usize,
}

/// Per-document table of token character offsets. The offsets of every sentence are flattened
/// into a single boxed slice to reduce cache misses; `indices[i]..indices[i + 1]` delimits the
/// tokens of the i-th sentence.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Default)]
pub(crate) struct TokenIndex {
    pub(crate) offsets: Box<[usize]>,
    /// One past the last character of each token.
    pub(crate) ends: Box<[usize]>,
    pub(crate) indices: Box<[usize]>,
    /// Non-empty sentences sorted by start offset.
    ranges: Box<[SentenceRange]>,
}

impl TokenIndex {
    pub(crate) fn new(sentences: &[Sentence]) -> Self {
        Self::from(sentences)
    }

    /// Number of sentences, empty ones included.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.indices.len().saturating_sub(1)
    }

    /// Offsets of the sentence at `position`.
    pub(crate) fn offsets(&self, position: usize) -> &[usize] {
        let start = self.indices[position];
        let end = self.indices[position + 1];
        &self.offsets[start..end]
    }

    /// Token end positions of the sentence at `position`.
    pub(crate) fn ends(&self, position: usize) -> &[usize] {
        let start = self.indices[position];
        let end = self.indices[position + 1];
        &self.ends[start..end]
    }

    /// Position of the sentence whose character range contains `char_pos`. Escaped tokens such as
    /// `-RRB-` can stretch a range over the start of the next sentence; the latest starting range
    /// wins.
    pub(crate) fn sentence_containing(&self, char_pos: usize) -> Option<usize> {
        let upper = self.ranges.partition_point(|r| r.start <= char_pos);
        self.ranges[..upper]
            .iter()
            .rev()
            .find(|r| char_pos < r.end)
            .map(|r| r.position)
    }
}

impl From<&[Sentence]> for TokenIndex {
    #[inline(always)]
    fn from(value: &[Sentence]) -> Self {
        let length: usize = value.iter().map(|s| s.len()).sum();
        let mut offsets = Vec::with_capacity(length);
        let mut ends = Vec::with_capacity(length);
        let mut indices = Vec::with_capacity(value.len() + 1);
        let mut ranges = Vec::with_capacity(value.len());
        indices.push(0);
        for (position, sentence) in value.iter().enumerate() {
            for token in sentence.tokens.iter() {
                offsets.push(token.char_start);
                ends.push(token.char_end());
            }
            indices.push(offsets.len());
            if let Some((start, end)) = sentence.char_range() {
                ranges.push(SentenceRange {
                    start,
                    end,
                    position,
                });
            }
        }
        ranges.sort();
        Self {
            offsets: offsets.into_boxed_slice(),
            ends: ends.into_boxed_slice(),
            indices: indices.into_boxed_slice(),
            ranges: ranges.into_boxed_slice(),
        }
    }
}
