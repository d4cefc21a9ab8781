//! Keyword Extractor: ranks job-description terms by TF × IDF against a background corpus.
//!
//! Candidates are unigrams and bigrams of adjacent word tokens in one sentence. Stopwords,
//! numbers and one-character tokens never become candidates, so they also break bigrams.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::analysis::normalizer::{normalize, NormalizedText, Token, TokenKind};
use crate::models::report::Keyword;

// ────────────────────────────────────────────────────────────────────────────
// Stopwords
// ────────────────────────────────────────────────────────────────────────────

const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "again", "against", "all", "also", "am", "an",
    "and", "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down",
    "during", "each", "either", "etc", "every", "few", "for", "from", "further", "had", "has",
    "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in", "into",
    "is", "it", "its", "itself", "just", "may", "me", "might", "more", "most", "must", "my",
    "no", "nor", "not", "now", "of", "off", "on", "once", "one", "only", "or", "other", "our",
    "ours", "out", "over", "own", "per", "same", "shall", "she", "should", "so", "some", "such",
    "than", "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "upon", "us", "very", "via", "was", "we",
    "well", "were", "what", "when", "where", "whether", "which", "while", "who", "whom", "why",
    "will", "with", "within", "without", "would", "you", "your", "yours",
];

/// Words every job ad uses. They say nothing about the role itself.
const JOB_AD_STOPWORDS: &[&str] = &[
    "ability", "able", "applicant", "applicants", "apply", "candidate", "candidates", "company",
    "environment", "excellent", "experience", "experienced", "familiarity", "good", "great",
    "ideal", "ideally", "including", "join", "knowledge", "looking", "nice", "opportunity",
    "plus", "position", "preferred", "proficiency", "proficient", "required", "requirements",
    "responsibilities", "responsible", "role", "seeking", "skills", "strong", "team", "understanding",
    "work", "working", "year", "years",
];

#[derive(Debug, Clone, Default)]
pub struct StopWords(HashSet<String>);

impl StopWords {
    /// Built-in English list plus job-posting boilerplate.
    pub fn english() -> Self {
        Self(
            ENGLISH_STOPWORDS
                .iter()
                .chain(JOB_AD_STOPWORDS)
                .map(|w| w.to_string())
                .collect(),
        )
    }

    /// One word per line; blank lines and `#` comments are skipped.
    pub fn from_lines(text: &str) -> Self {
        Self(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_lowercase)
                .collect(),
        )
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reference corpus
// ────────────────────────────────────────────────────────────────────────────

/// Generic job-posting language. Terms common here get a low IDF.
const BACKGROUND_DOCUMENTS: &[&str] = &[
    "We are looking for a motivated software engineer to join our growing team.",
    "Excellent communication skills and the ability to work in a fast-paced environment.",
    "Collaborate with cross-functional teams to design, develop and deliver high quality products.",
    "Bachelor's degree in computer science or a related field is required.",
    "Strong problem solving skills and attention to detail.",
    "You will work closely with product managers, designers and other engineers.",
    "Competitive salary, health benefits, flexible hours and remote work options.",
    "Write clean, maintainable code and participate in code reviews.",
    "Mentor junior developers and contribute to technical decisions.",
    "Experience working in an agile development process with regular sprints.",
    "Own features end to end, from design through deployment and support.",
    "We value diversity and are an equal opportunity employer.",
    "Manage multiple priorities and communicate progress to stakeholders.",
    "Self-starter with a passion for learning new technologies.",
    "Develop and maintain internal tools and customer facing applications.",
    "Full-time position based in our office with hybrid work available.",
];

/// Document frequencies of candidate terms over a fixed set of background documents.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCorpus {
    doc_count: usize,
    doc_freq: HashMap<String, usize>,
}

impl ReferenceCorpus {
    pub fn builtin(stopwords: &StopWords) -> Self {
        Self::from_documents(BACKGROUND_DOCUMENTS.iter().copied(), stopwords)
    }

    /// One document per non-blank line.
    pub fn from_lines(text: &str, stopwords: &StopWords) -> Self {
        Self::from_documents(text.lines().filter(|l| !l.trim().is_empty()), stopwords)
    }

    pub fn from_documents<'a>(
        documents: impl IntoIterator<Item = &'a str>,
        stopwords: &StopWords,
    ) -> Self {
        let mut doc_count = 0;
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            doc_count += 1;
            let normalized = normalize(doc);
            let candidates = Candidates::collect(&normalized, stopwords);
            let unique: HashSet<&String> = candidates.order.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }

        Self {
            doc_count,
            doc_freq,
        }
    }

    /// Smoothed IDF: ln((1 + N) / (1 + df)) + 1. Finite for unseen terms, 1 for an empty corpus.
    pub fn idf(&self, term: &str) -> f64 {
        let n = self.doc_count as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        ((1.0 + n) / (1.0 + df)).ln() + 1.0
    }

    /// Number of background documents.
    pub fn len(&self) -> usize {
        self.doc_count
    }

    pub fn is_empty(&self) -> bool {
        self.doc_count == 0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────────────────────────────────────

/// Candidate terms with counts, in first-occurrence order.
struct Candidates {
    order: Vec<String>,
    counts: HashMap<String, usize>,
    unigram_total: usize,
}

impl Candidates {
    fn collect(text: &NormalizedText, stopwords: &StopWords) -> Self {
        let mut candidates = Self {
            order: Vec::new(),
            counts: HashMap::new(),
            unigram_total: 0,
        };

        let tokens = &text.tokens;
        for (idx, token) in tokens.iter().enumerate() {
            if !is_candidate(token, stopwords) {
                continue;
            }
            candidates.add(token.text.clone());
            candidates.unigram_total += 1;

            if let Some(next) = tokens.get(idx + 1) {
                if next.sentence == token.sentence && is_candidate(next, stopwords) {
                    candidates.add(format!("{} {}", token.text, next.text));
                }
            }
        }
        candidates
    }

    fn add(&mut self, term: String) {
        match self.counts.get_mut(&term) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(term.clone(), 1);
                self.order.push(term);
            }
        }
    }
}

fn is_candidate(token: &Token, stopwords: &StopWords) -> bool {
    token.kind == TokenKind::Word
        && token.text.chars().count() >= 2
        && token.text.chars().any(char::is_alphabetic)
        && !stopwords.contains(&token.text)
}

/// Top `limit` keywords of a job description, weight descending, ties in first-occurrence order.
pub fn extract_keywords(
    job_description: &NormalizedText,
    stopwords: &StopWords,
    corpus: &ReferenceCorpus,
    limit: usize,
) -> Vec<Keyword> {
    let candidates = Candidates::collect(job_description, stopwords);
    if candidates.unigram_total == 0 {
        return Vec::new();
    }
    let total = candidates.unigram_total as f64;

    let mut keywords: Vec<Keyword> = candidates
        .order
        .into_iter()
        .map(|term| {
            let tf = candidates.counts[&term] as f64 / total;
            let weight = tf * corpus.idf(&term);
            Keyword {
                variants: variants_for(&term),
                term,
                weight,
            }
        })
        .collect();

    // stable: equal weights keep first-occurrence order
    keywords.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    keywords.truncate(limit);
    keywords
}

// ────────────────────────────────────────────────────────────────────────────
// Variants
// ────────────────────────────────────────────────────────────────────────────

/// Short form and long form, both already in token form.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ts", "typescript"),
    ("k8s", "kubernetes"),
    ("ml", "machine learning"),
    ("ai", "artificial intelligence"),
    ("nlp", "natural language processing"),
    ("cv", "computer vision"),
    ("aws", "amazon web services"),
    ("gcp", "google cloud platform"),
    ("db", "database"),
    ("postgres", "postgresql"),
    ("golang", "go"),
    ("reactjs", "react"),
    ("react.js", "react"),
    ("nodejs", "node.js"),
    ("node", "node.js"),
    ("vuejs", "vue"),
    ("vue.js", "vue"),
    ("ci/cd", "continuous integration"),
    ("ui", "user interface"),
    ("ux", "user experience"),
    ("qa", "quality assurance"),
    ("oop", "object oriented programming"),
    ("sql", "structured query language"),
    ("api", "application programming interface"),
    ("devops", "development operations"),
];

/// Stemmed form and abbreviation expansions of a term. Never contains the term itself.
pub fn variants_for(term: &str) -> BTreeSet<String> {
    let mut variants = BTreeSet::new();

    let stemmed = term.split(' ').map(stem).collect::<Vec<_>>().join(" ");
    if stemmed != term {
        variants.insert(stemmed);
    }

    for &(short, long) in ABBREVIATIONS {
        if term == short {
            variants.insert(long.to_string());
        } else if term == long {
            variants.insert(short.to_string());
        }
    }

    variants.remove(term);
    variants
}

/// Light suffix stripper: plurals, -ing, -ed and a trailing e.
/// Only touches plain ASCII words longer than three letters.
pub fn stem(word: &str) -> String {
    if word.len() <= 3 || !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return word.to_string();
    }

    let mut w = word.to_string();
    if w.ends_with("ies") && w.len() > 4 {
        w.truncate(w.len() - 3);
        w.push('y');
    } else if w.ends_with("sses") {
        w.truncate(w.len() - 2);
    } else if w.ends_with('s') && !(w.ends_with("ss") || w.ends_with("us") || w.ends_with("is")) {
        w.pop();
    }

    if w.ends_with("ing") && w.len() - 3 >= 4 {
        w.truncate(w.len() - 3);
    } else if w.ends_with("ed") && w.len() - 2 >= 3 {
        w.truncate(w.len() - 2);
    }

    if w.len() > 4 && w.ends_with('e') {
        w.pop();
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(keywords: &[Keyword]) -> Vec<&str> {
        keywords.iter().map(|k| k.term.as_str()).collect()
    }

    fn extract(jd: &str, corpus: &ReferenceCorpus, limit: usize) -> Vec<Keyword> {
        extract_keywords(&normalize(jd), &StopWords::english(), corpus, limit)
    }

    #[test]
    fn test_stopwords_and_boilerplate_excluded() {
        let keywords = extract(
            "We are seeking a Python developer with Kubernetes and Docker experience.",
            &ReferenceCorpus::default(),
            30,
        );
        let terms = terms(&keywords);
        for term in ["python", "developer", "kubernetes", "docker"] {
            assert!(terms.contains(&term), "missing {term} in {terms:?}");
        }
        for term in ["we", "are", "seeking", "a", "with", "and", "experience"] {
            assert!(!terms.contains(&term), "stopword {term} extracted");
        }
    }

    #[test]
    fn test_frequency_drives_rank_with_empty_corpus() {
        let keywords = extract("rust. python. python. python.", &ReferenceCorpus::default(), 30);
        assert_eq!(terms(&keywords), vec!["python", "rust"]);
        assert!((keywords[0].weight - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_idf_downweights_background_terms() {
        let corpus = ReferenceCorpus::from_documents(
            ["strong communication matters", "communication with clients"],
            &StopWords::english(),
        );
        let keywords = extract("communication.\nkubernetes.", &corpus, 30);
        assert_eq!(terms(&keywords), vec!["kubernetes", "communication"]);
    }

    #[test]
    fn test_ties_keep_first_occurrence() {
        let keywords = extract("terraform.\nansible.\nhelm.", &ReferenceCorpus::default(), 30);
        assert_eq!(terms(&keywords), vec!["terraform", "ansible", "helm"]);
    }

    #[test]
    fn test_bigrams_only_within_sentence_without_punctuation() {
        let keywords = extract(
            "Background in machine learning. Python, kubernetes\ndocker",
            &ReferenceCorpus::default(),
            30,
        );
        let terms = terms(&keywords);
        assert!(terms.contains(&"machine learning"));
        assert!(!terms.contains(&"python kubernetes"));
        assert!(!terms.contains(&"kubernetes docker"));
        assert!(!terms.contains(&"learning python"));
    }

    #[test]
    fn test_numbers_and_single_chars_filtered() {
        let keywords = extract("5+ years of 2019 r and c", &ReferenceCorpus::default(), 30);
        assert!(keywords.is_empty());
    }

    #[test]
    fn test_limit_truncates() {
        let keywords = extract(
            "rust go python java kotlin swift scala elixir",
            &ReferenceCorpus::default(),
            3,
        );
        assert_eq!(keywords.len(), 3);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let corpus = ReferenceCorpus::builtin(&StopWords::english());
        let jd = "Senior Rust engineer. Build distributed systems on Kubernetes and AWS.";
        assert_eq!(extract(jd, &corpus, 30), extract(jd, &corpus, 30));
    }

    #[test]
    fn test_idf_is_finite_for_unseen_terms() {
        let corpus = ReferenceCorpus::builtin(&StopWords::english());
        let idf = corpus.idf("zig");
        assert!(idf.is_finite());
        assert!((idf - ((1.0 + corpus.len() as f64).ln() + 1.0)).abs() < 1e-9);
        assert_eq!(ReferenceCorpus::default().idf("zig"), 1.0);
    }

    #[test]
    fn test_stopwords_from_lines() {
        let stopwords = StopWords::from_lines("# comment\nFoo\n\n bar \n");
        assert_eq!(stopwords.len(), 2);
        assert!(stopwords.contains("foo"));
        assert!(stopwords.contains("bar"));
    }

    #[test]
    fn test_stem_strips_common_suffixes() {
        assert_eq!(stem("engineers"), "engineer");
        assert_eq!(stem("engineering"), "engineer");
        assert_eq!(stem("engineered"), "engineer");
        assert_eq!(stem("libraries"), "library");
        assert_eq!(stem("processes"), "process");
        assert_eq!(stem("services"), stem("service"));
        assert_eq!(stem("analysis"), "analysis");
        assert_eq!(stem("aws"), "aws");
        assert_eq!(stem("c++"), "c++");
    }

    #[test]
    fn test_variants_include_stem_and_abbreviation() {
        let variants = variants_for("kubernetes");
        assert!(variants.contains("k8s"));
        assert!(variants.contains("kubernet"));

        let variants = variants_for("js");
        assert_eq!(variants, BTreeSet::from(["javascript".to_string()]));

        let variants = variants_for("machine learning");
        assert!(variants.contains("ml"));
        assert!(variants.contains("machin learn"));
    }

    #[test]
    fn test_variants_never_contain_term() {
        for term in ["rust", "go", "golang", "databases"] {
            assert!(!variants_for(term).contains(term));
        }
    }
}
