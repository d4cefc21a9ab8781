//! Text Normalizer: cleans raw text and tokenizes it. Every later stage reads its output.
//!
//! Produces two views of the same text:
//! - `text`: NFKC, control/zero-width characters removed, typographic quotes and dashes folded
//!   to ASCII, trailing whitespace trimmed, blank-line runs collapsed. Case is preserved so the
//!   segmenter can see all-caps headings.
//! - `folded`: `text` lowercased. Tokens and all matching work on this view.
//!
//! Normalizing already-normalized text is a no-op.

use unicode_normalization::UnicodeNormalization;

use crate::analysis::AnalysisError;
use crate::models::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Number,
    Punct,
}

/// A lowercase token with its byte span in `NormalizedText::folded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// Index of the sentence (or line) the token belongs to.
    pub sentence: usize,
}

impl Token {
    pub fn is_wordlike(&self) -> bool {
        self.kind != TokenKind::Punct
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    pub folded: String,
    pub tokens: Vec<Token>,
}

impl NormalizedText {
    /// Words and numbers, punctuation excluded.
    pub fn word_count(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_wordlike()).count()
    }

    /// True when there is not a single alphabetic word to analyze.
    pub fn is_blank(&self) -> bool {
        !self.tokens.iter().any(|t| t.kind == TokenKind::Word)
    }
}

/// Normalizes a document, enforcing the byte ceiling first.
pub fn normalize_document(
    document: &Document,
    max_bytes: usize,
) -> Result<NormalizedText, AnalysisError> {
    let size = document.raw().len();
    if size > max_bytes {
        return Err(AnalysisError::InputTooLarge {
            field: document.kind().field_name(),
            size,
            limit: max_bytes,
        });
    }
    Ok(normalize(document.raw()))
}

pub fn normalize(raw: &str) -> NormalizedText {
    let text = clean(raw);
    let folded = text.to_lowercase();
    let tokens = tokenize(&folded);
    NormalizedText {
        text,
        folded,
        tokens,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cleaning
// ────────────────────────────────────────────────────────────────────────────

fn clean(raw: &str) -> String {
    // Controls go before NFKC so removing them cannot leave an uncomposed sequence behind.
    let filtered: String = raw.replace("\r\n", "\n").chars().filter_map(fold_char).collect();
    let composed: String = filtered.nfkc().filter_map(fold_char).collect();

    let mut out = String::with_capacity(composed.len());
    let mut pending_blank = false;
    for line in composed.split('\n') {
        let line = line.trim_end();
        if line.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        pending_blank = false;
        out.push_str(line);
    }
    out
}

fn fold_char(c: char) -> Option<char> {
    match c {
        '\n' | '\t' => Some(c),
        '\r' | '\u{2028}' | '\u{2029}' => Some('\n'),
        '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}' => None,
        c if c.is_control() => None,
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => Some('\''),
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => Some('"'),
        '\u{2010}'..='\u{2015}' | '\u{2212}' => Some('-'),
        '\u{00A0}' => Some(' '),
        _ => Some(c),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tokenizing
// ────────────────────────────────────────────────────────────────────────────

/// Joiners kept inside a word when followed by an alphanumeric: node.js, ci/cd, front-end.
const CONNECTORS: &[char] = &['.', '-', '/', '\'', '_'];

fn tokenize(folded: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = folded.char_indices().collect();
    let mut tokens = Vec::new();
    let mut sentence = 0usize;
    let mut sentence_open = false;
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, n)| n);

        if c.is_whitespace() {
            if c == '\n' && sentence_open {
                sentence += 1;
                sentence_open = false;
            }
            i += 1;
            continue;
        }

        let prev = i.checked_sub(1).map(|p| chars[p].1);
        let leading_dot = c == '.'
            && next.is_some_and(char::is_alphabetic)
            && prev.map_or(true, char::is_whitespace);

        if c.is_alphanumeric() || leading_dot {
            let mut j = i + 1;
            while j < chars.len() {
                let cj = chars[j].1;
                if cj.is_alphanumeric() {
                    j += 1;
                } else if CONNECTORS.contains(&cj)
                    && chars.get(j + 1).is_some_and(|&(_, n)| n.is_alphanumeric())
                {
                    j += 2;
                } else {
                    break;
                }
            }
            // c++, c#, f#
            while j < chars.len() && matches!(chars[j].1, '+' | '#') {
                j += 1;
            }

            let end = chars.get(j).map_or(folded.len(), |&(b, _)| b);
            let text = &folded[start..end];
            let kind = if text.chars().all(|ch| {
                ch.is_ascii_digit() || matches!(ch, '.' | ',' | '-' | '/' | '+')
            }) {
                TokenKind::Number
            } else {
                TokenKind::Word
            };
            tokens.push(Token {
                text: text.to_string(),
                kind,
                start,
                end,
                sentence,
            });
            sentence_open = true;
            i = j;
            continue;
        }

        tokens.push(Token {
            text: c.to_string(),
            kind: TokenKind::Punct,
            start,
            end: start + c.len_utf8(),
            sentence,
        });
        sentence_open = true;
        if matches!(c, '.' | '!' | '?') && next.map_or(true, char::is_whitespace) {
            sentence += 1;
            sentence_open = false;
        }
        i += 1;
    }

    tokens
}
