//! Sentence-window chunking.

use super::ChunkingConfig;
use regex::Regex;
use std::sync::LazyLock;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[.!?]+["')\]]*\s+"#).expect("Invalid regex"));

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split text into sentences on terminal punctuation followed by whitespace.
///
/// Whitespace inside a sentence is collapsed to single spaces.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        push_sentence(&mut sentences, &text[start..m.end()]);
        start = m.end();
    }
    push_sentence(&mut sentences, &text[start..]);

    sentences
}

fn push_sentence(out: &mut Vec<String>, raw: &str) {
    let sentence = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !sentence.is_empty() {
        out.push(sentence);
    }
}

/// Break a sentence longer than `max` characters into word-packed pieces.
fn split_long(sentence: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for word in sentence.split(' ') {
        let words: Vec<String> = if char_len(word) > max {
            word.chars()
                .collect::<Vec<_>>()
                .chunks(max)
                .map(|c| c.iter().collect())
                .collect()
        } else {
            vec![word.to_string()]
        };

        for w in words {
            let extra = if current.is_empty() { 0 } else { 1 };
            if !current.is_empty() && char_len(&current) + extra + char_len(&w) > max {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&w);
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Split text into windows of whole sentences, each at most `chunk_size`
/// characters, repeating up to `chunk_overlap` characters of trailing
/// sentences at the start of the next window.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let max = config.chunk_size.max(1);
    let sentences: Vec<String> = split_sentences(text)
        .into_iter()
        .flat_map(|s| {
            if char_len(&s) > max {
                split_long(&s, max)
            } else {
                vec![s]
            }
        })
        .collect();

    let mut chunks = Vec::new();
    let mut i = 0;

    while i < sentences.len() {
        let mut size = 0;
        let mut end = i;
        while end < sentences.len() {
            let extra = char_len(&sentences[end]) + usize::from(end > i);
            if end > i && size + extra > max {
                break;
            }
            size += extra;
            end += 1;
        }

        chunks.push(sentences[i..end].join(" "));
        if end >= sentences.len() {
            break;
        }

        let mut overlap_size = 0;
        let mut overlap_count = 0;
        for sentence in sentences[i..end].iter().rev() {
            let len = char_len(sentence) + 1;
            if overlap_size + len > config.chunk_overlap {
                break;
            }
            overlap_size += len;
            overlap_count += 1;
        }

        let taken = end - i;
        i += taken.saturating_sub(overlap_count).max(1);
    }

    chunks
}
