/*!
CoNLL rendering of the aligned gold mentions: one `word TAG` line per token, `B-`/`I-` tags for
the tokens of a mention and `O` elsewhere, a blank line after every sentence.
*/
use crate::document::Sentence;
use ahash::{HashMap as AHashMap, HashMapExt};
use std::fmt::Write;

pub(crate) const OUTSIDE: &str = "O";

/// A mention to tag: its sentence id, its ordered token indices and its category.
pub(crate) type TaggedSpan<'a> = (usize, &'a [usize], &'a str);

/// Tags of every token of `sentences`. Spans are applied in order; a later span overwrites the
/// tags of an earlier one on the tokens they share. Spans referring to unknown sentences or
/// tokens are ignored.
pub(crate) fn document_tags<'a, I>(sentences: &[Sentence], spans: I) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = TaggedSpan<'a>>,
{
    let mut positions = AHashMap::with_capacity(sentences.len());
    for (position, sentence) in sentences.iter().enumerate() {
        positions.insert(sentence.sentence_id, position);
    }
    let mut tags: Vec<Vec<String>> = sentences
        .iter()
        .map(|s| vec![String::from(OUTSIDE); s.len()])
        .collect();
    for (sentence_id, token_idxs, category) in spans {
        let Some(sentence_tags) = positions.get(&sentence_id).map(|p| &mut tags[*p]) else {
            continue;
        };
        for (i, token) in token_idxs.iter().enumerate() {
            if let Some(tag) = sentence_tags.get_mut(*token) {
                let prefix = if i == 0 { "B" } else { "I" };
                *tag = format!("{}-{}", prefix, category);
            }
        }
    }
    tags
}

/// Writes the sentences of one document with their tags.
pub(crate) fn render(out: &mut String, sentences: &[Sentence], tags: &[Vec<String>]) {
    for (sentence, sentence_tags) in sentences.iter().zip(tags) {
        for (word, tag) in sentence.words().zip(sentence_tags) {
            // Writing to a `String` cannot fail.
            let _ = writeln!(out, "{} {}", word, tag);
        }
        out.push('\n');
    }
}
