//! Coverage Matcher: finds each keyword in the resume, exactly or fuzzily.
//!
//! A keyword is tried in its own form first, then in each variant. A window of resume tokens
//! matches a form when every token pairs with the form's word by equality, equal stems, a plural
//! suffix, or a small typo (long words only). Windows never cross punctuation or sentence breaks.
//!
//! Typos are insertions, deletions and adjacent swaps. A substituted letter is only accepted in
//! long words: "swift" and "shift" are one substitution apart but unrelated.

use strsim::levenshtein;

use crate::analysis::keywords::stem;
use crate::analysis::normalizer::{normalize, NormalizedText};
use crate::analysis::to_score;
use crate::models::report::{CoverageRecord, Keyword};

/// Edit distance is only allowed between words at least this long.
const FUZZY_MIN_CHARS: usize = 5;
/// Substituted letters are only tolerated from this length on.
const SUBSTITUTION_MIN_CHARS: usize = 8;
/// Shortest base a plural suffix may be attached to ("vm" → "vms").
const PLURAL_MIN_BASE: usize = 2;
/// Most keywords listed as missing from a single section.
pub const SECTION_MISSING_LIMIT: usize = 8;
/// Characters of context kept on each side of a match.
const SNIPPET_RADIUS: usize = 60;

#[derive(Debug, Clone)]
pub struct CoverageOutcome {
    /// One per keyword, in keyword order.
    pub records: Vec<CoverageRecord>,
    pub keyword_score: f64,
    /// Unmatched terms, weight descending, ties in keyword order.
    pub missing_keywords: Vec<String>,
}

/// One searchable spelling of a keyword, with per-word stems precomputed.
struct Form {
    words: Vec<String>,
    stems: Vec<String>,
}

impl Form {
    fn new(text: &str) -> Self {
        let words: Vec<String> = text.split(' ').map(str::to_string).collect();
        let stems = words.iter().map(|w| stem(w)).collect();
        Self { words, stems }
    }
}

pub fn match_coverage(
    keywords: &[Keyword],
    resume: &NormalizedText,
    max_edit_distance: usize,
    snippet_limit: usize,
) -> CoverageOutcome {
    let token_stems: Vec<String> = resume.tokens.iter().map(|t| stem(&t.text)).collect();

    let records: Vec<CoverageRecord> = keywords
        .iter()
        .map(|keyword| {
            match_keyword(keyword, resume, &token_stems, max_edit_distance, snippet_limit)
        })
        .collect();

    let total: f64 = records.iter().map(|r| r.keyword.weight).sum();
    let matched: f64 = records
        .iter()
        .filter(|r| r.in_resume)
        .map(|r| r.keyword.weight)
        .sum();
    let keyword_score = if total > 0.0 {
        to_score(matched / total * 100.0)
    } else {
        0.0
    };

    let mut missing: Vec<&CoverageRecord> = records.iter().filter(|r| !r.in_resume).collect();
    missing.sort_by(|a, b| b.keyword.weight.total_cmp(&a.keyword.weight));
    let missing_keywords = missing.iter().map(|r| r.keyword.term.clone()).collect();

    CoverageOutcome {
        records,
        keyword_score,
        missing_keywords,
    }
}

fn match_keyword(
    keyword: &Keyword,
    resume: &NormalizedText,
    token_stems: &[String],
    max_edit_distance: usize,
    snippet_limit: usize,
) -> CoverageRecord {
    let forms: Vec<Form> = std::iter::once(keyword.term.as_str())
        .chain(keyword.variants.iter().map(String::as_str))
        .map(Form::new)
        .collect();

    let tokens = &resume.tokens;
    // byte spans of matched windows; a window counts once however many forms hit it
    let mut spans: Vec<(usize, usize)> = Vec::new();

    for start in 0..tokens.len() {
        for form in &forms {
            let end = start + form.words.len();
            if end > tokens.len() {
                continue;
            }
            let window = &tokens[start..end];
            let sentence = window[0].sentence;
            if !window.iter().all(|t| t.is_wordlike() && t.sentence == sentence) {
                continue;
            }
            let hit = window.iter().enumerate().all(|(offset, token)| {
                words_match(
                    &token.text,
                    &token_stems[start + offset],
                    &form.words[offset],
                    &form.stems[offset],
                    max_edit_distance,
                )
            });
            if hit {
                spans.push((window[0].start, window[window.len() - 1].end));
                break;
            }
        }
    }

    let matched_variant = spans
        .first()
        .map(|&(s, e)| resume.folded[s..e].to_string())
        .filter(|surface| *surface != keyword.term);

    let context_snippets = spans
        .iter()
        .take(snippet_limit)
        .map(|&(s, e)| snippet(&resume.folded, s, e))
        .collect();

    CoverageRecord {
        keyword: keyword.clone(),
        in_resume: !spans.is_empty(),
        frequency: spans.len() as u32,
        matched_variant,
        context_snippets,
    }
}

/// Keywords with no occurrence in one section's text, weight descending, capped.
pub fn section_missing_terms(
    keywords: &[Keyword],
    section_text: &str,
    max_edit_distance: usize,
) -> Vec<String> {
    let mut missing =
        match_coverage(keywords, &normalize(section_text), max_edit_distance, 0).missing_keywords;
    missing.truncate(SECTION_MISSING_LIMIT);
    missing
}

fn words_match(
    token: &str,
    token_stem: &str,
    word: &str,
    word_stem: &str,
    max_edit_distance: usize,
) -> bool {
    if token == word || token_stem == word_stem {
        return true;
    }
    if is_plural_of(token, word) || is_plural_of(word, token) {
        return true;
    }
    if max_edit_distance == 0 {
        return false;
    }

    let (token_len, word_len) = (token.chars().count(), word.chars().count());
    if token_len < FUZZY_MIN_CHARS
        || word_len < FUZZY_MIN_CHARS
        || token_len.abs_diff(word_len) > max_edit_distance
        || token.chars().next() != word.chars().next()
    {
        return false;
    }

    if token_len == word_len && token_len < SUBSTITUTION_MIN_CHARS {
        return is_adjacent_swap(token, word);
    }
    levenshtein(token, word) <= max_edit_distance
}

/// `plural` is `base` + "s", or + "es" after a sibilant ("gpus", "vms", "boxes").
fn is_plural_of(plural: &str, base: &str) -> bool {
    if base.chars().count() < PLURAL_MIN_BASE || !base.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    match plural.strip_prefix(base) {
        Some("s") => true,
        Some("es") => ["s", "x", "z", "ch", "sh"].iter().any(|end| base.ends_with(end)),
        _ => false,
    }
}

/// Same letters with exactly one pair of neighbours swapped ("pyhton" / "python").
fn is_adjacent_swap(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len() != b.len() {
        return false;
    }
    let diffs: Vec<usize> = (0..a.len()).filter(|&i| a[i] != b[i]).collect();
    matches!(diffs.as_slice(), [i, j] if *j == i + 1 && a[*i] == b[*j] && a[*j] == b[*i])
}

/// ±`SNIPPET_RADIUS` characters around a match, whitespace collapsed.
fn snippet(text: &str, start: usize, end: usize) -> String {
    let mut from = start.saturating_sub(SNIPPET_RADIUS);
    while !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + SNIPPET_RADIUS).min(text.len());
    while !text.is_char_boundary(to) {
        to += 1;
    }
    text[from..to].split_whitespace().collect::<Vec<_>>().join(" ")
}
