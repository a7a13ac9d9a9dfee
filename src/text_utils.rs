//! Text splitting helpers for word-synchronized playback.
//!
//! The tokenizer is lossless: concatenating the produced tokens reproduces
//! the input byte-for-byte, which is what lets the display layer rebuild the
//! text around the highlighted word.

use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Space(String),
}

impl Token {
    pub fn value(&self) -> &str {
        match self {
            Token::Word(value) | Token::Space(value) => value,
        }
    }
}

/// Split text into alternating word and whitespace tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut space = String::new();

    for ch in text.chars() {
        if ch.is_whitespace() {
            if !word.is_empty() {
                tokens.push(Token::Word(std::mem::take(&mut word)));
            }
            space.push(ch);
        } else {
            if !space.is_empty() {
                tokens.push(Token::Space(std::mem::take(&mut space)));
            }
            word.push(ch);
        }
    }

    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    if !space.is_empty() {
        tokens.push(Token::Space(space));
    }

    tokens
}

/// A word token with its byte-offset span in the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSpan {
    pub word: String,
    pub start: usize,
    pub end: usize,
}

/// Byte-offset spans for every word token, in reading order.
pub fn word_spans(text: &str) -> Vec<WordSpan> {
    let mut spans = Vec::new();
    let mut offset = 0usize;
    for token in tokenize(text) {
        let len = token.value().len();
        if let Token::Word(word) = token {
            spans.push(WordSpan {
                word,
                start: offset,
                end: offset + len,
            });
        }
        offset += len;
    }
    spans
}

/// Resolve a boundary offset to the first span containing it. Offsets that
/// fall into inter-word whitespace resolve to nothing.
pub fn span_at(spans: &[WordSpan], offset: usize) -> Option<usize> {
    spans
        .iter()
        .position(|span| span.start <= offset && offset < span.end)
}

/// Playback progress as a fraction of the text length.
pub fn progress(offset: usize, text_len: usize) -> f32 {
    if text_len == 0 {
        0.0
    } else {
        (offset as f32 / text_len as f32).clamp(0.0, 1.0)
    }
}

/// Canonical dictionary-key form of a word: NFC, lowercased, trimmed.
pub fn normalize_word(word: &str) -> String {
    word.nfc()
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}
