//! Records produced by the analysis pipeline. `ScoreReport` is the terminal output;
//! everything else hangs off it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How many missing keywords presentation layers should show. The report keeps all of them.
pub const MISSING_DISPLAY_LIMIT: usize = 20;

// ────────────────────────────────────────────────────────────────────────────
// Keywords & coverage
// ────────────────────────────────────────────────────────────────────────────

/// A weighted term extracted from the job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub term: String,
    pub weight: f64,
    /// Stemmed form and abbreviation expansions, used for fuzzy matching.
    pub variants: BTreeSet<String>,
}

/// How one keyword fared against the resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRecord {
    pub keyword: Keyword,
    pub in_resume: bool,
    pub frequency: u32,
    /// Resume text at the first match, when it differs from the keyword or was found fuzzily.
    pub matched_variant: Option<String>,
    pub context_snippets: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Semantic alignment
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionAlignment {
    pub section_label: String,
    pub similarity: f64, // 0 – 100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Job keywords absent from this section, weight descending.
    #[serde(default)]
    pub missing_terms: Vec<String>,
}

impl SectionAlignment {
    /// False when the section had nothing to embed and similarity is a placeholder 0.
    pub fn is_usable(&self) -> bool {
        self.detail.is_none()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ATS checks
// ────────────────────────────────────────────────────────────────────────────

/// The fixed rule set, in evaluation and reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtsCheck {
    HasSections,
    HasContactInfo,
    ReasonableLength,
    BulletUsage,
    NoTables,
    NoGraphics,
    SingleColumn,
    StandardCharacters,
}

impl AtsCheck {
    pub const ALL: [AtsCheck; 8] = [
        AtsCheck::HasSections,
        AtsCheck::HasContactInfo,
        AtsCheck::ReasonableLength,
        AtsCheck::BulletUsage,
        AtsCheck::NoTables,
        AtsCheck::NoGraphics,
        AtsCheck::SingleColumn,
        AtsCheck::StandardCharacters,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_name: AtsCheck,
    pub passed: bool,
    pub detail: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Report
// ────────────────────────────────────────────────────────────────────────────

/// Non-fatal conditions met while analyzing. Recorded, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisNote {
    /// No headings were recognized; the resume was scored as a single body section.
    SegmentationDegenerate,
    /// The embedding deadline passed; this many sections have no alignment entry.
    EmbeddingTimeout { omitted_sections: usize },
    /// The embedding backend failed; alignment stopped and this many sections have no entry.
    EmbeddingUnavailable {
        omitted_sections: usize,
        reason: String,
    },
    /// The job description yielded no keywords, so keyword coverage is 0.
    NoKeywords,
}

/// Full analysis output. Built once by the aggregator and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub overall_score: f64,  // 0 – 100
    pub keyword_score: f64,  // 0 – 100
    pub ats_score: f64,      // 0 – 100
    pub semantic_score: f64, // 0 – 100, mean of usable section alignments
    /// Whole resume vs whole job description, when the embedder finished in time.
    pub document_similarity: Option<f64>,
    pub checks: Vec<CheckResult>,
    pub section_alignment: Vec<SectionAlignment>,
    pub coverage: Vec<CoverageRecord>,
    /// Descending keyword weight; ties keep extraction order.
    pub missing_keywords: Vec<String>,
    pub suggestions: Vec<String>,
    pub summary: String,
    pub notes: Vec<AnalysisNote>,
}

impl ScoreReport {
    pub fn missing_keywords_for_display(&self) -> &[String] {
        let end = self.missing_keywords.len().min(MISSING_DISPLAY_LIMIT);
        &self.missing_keywords[..end]
    }
}
