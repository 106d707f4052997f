use std::borrow::Cow;

/// Bracket escapes and quote substitutions emitted by Penn-Treebank-style tokenizers.
const PTB_ESCAPES: [(&str, &str); 7] = [
    ("-LRB-", "("),
    ("-RRB-", ")"),
    ("-LCB-", "{"),
    ("-RCB-", "}"),
    ("-LSB-", "["),
    ("-RSB-", "]"),
    ("`", "'"),
];

/// Restores the characters a Penn-Treebank tokenizer rewrote. An opening ``` `` ``` becomes `"`,
/// and so does the next `''` that closes it.
pub(crate) fn unescape_penn_treebank<'a, I>(words: I) -> Vec<Cow<'a, str>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut open_quote = false;
    words
        .into_iter()
        .map(|w| {
            if w == "``" {
                open_quote = true;
                return Cow::Borrowed("\"");
            }
            if open_quote && w == "''" {
                open_quote = false;
                return Cow::Borrowed("\"");
            }
            match PTB_ESCAPES.iter().find(|(escaped, _)| *escaped == w) {
                Some((_, plain)) => Cow::Borrowed(*plain),
                None => Cow::Borrowed(w),
            }
        })
        .collect()
}
