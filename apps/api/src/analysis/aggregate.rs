//! Score Aggregator: folds the stage outputs into the final `ScoreReport`.

use crate::analysis::alignment::AlignmentOutcome;
use crate::analysis::coverage::CoverageOutcome;
use crate::analysis::settings::{AnalysisConfig, ScoreWeights};
use crate::analysis::{to_score, AnalysisError};
use crate::models::report::{AnalysisNote, AtsCheck, CheckResult, ScoreReport, SectionAlignment};

/// Everything the earlier stages produced for one analysis.
#[derive(Debug, Clone)]
pub struct ReportParts {
    pub coverage: CoverageOutcome,
    pub checks: Vec<CheckResult>,
    pub ats_score: f64,
    pub alignment: AlignmentOutcome,
    pub notes: Vec<AnalysisNote>,
}

pub fn aggregate(parts: ReportParts, config: &AnalysisConfig) -> Result<ScoreReport, AnalysisError> {
    let ReportParts {
        coverage,
        checks,
        ats_score,
        alignment,
        notes,
    } = parts;

    let keyword_score = coverage.keyword_score;
    let semantic = semantic_score(&alignment.sections);
    let overall_score = overall_score(keyword_score, ats_score, semantic, &config.weights);

    let summary = build_summary(
        overall_score,
        keyword_score,
        ats_score,
        semantic,
        coverage.missing_keywords.len(),
        coverage.records.len(),
    );
    let suggestions = build_suggestions(
        &checks,
        keyword_score,
        ats_score,
        semantic,
        &alignment.sections,
        &coverage.missing_keywords,
        config,
    );

    let report = ScoreReport {
        overall_score,
        keyword_score,
        ats_score,
        semantic_score: semantic.unwrap_or(0.0),
        document_similarity: alignment.document_similarity,
        checks,
        section_alignment: alignment.sections,
        coverage: coverage.records,
        missing_keywords: coverage.missing_keywords,
        suggestions,
        summary,
        notes,
    };
    ensure_finite(&report)?;
    Ok(report)
}

/// Mean similarity over sections that had text to embed. `None` when there are none.
pub fn semantic_score(alignments: &[SectionAlignment]) -> Option<f64> {
    let usable: Vec<f64> = alignments
        .iter()
        .filter(|a| a.is_usable())
        .map(|a| a.similarity)
        .collect();
    if usable.is_empty() {
        return None;
    }
    Some(to_score(usable.iter().sum::<f64>() / usable.len() as f64))
}

/// Weighted mean of the sub-scores. Without a semantic score its weight is dropped and the
/// remaining weights renormalized.
pub fn overall_score(
    keyword_score: f64,
    ats_score: f64,
    semantic_score: Option<f64>,
    weights: &ScoreWeights,
) -> f64 {
    let mut total = weights.keyword * keyword_score + weights.ats * ats_score;
    let mut weight_sum = weights.keyword + weights.ats;
    if let Some(semantic) = semantic_score {
        total += weights.semantic * semantic;
        weight_sum += weights.semantic;
    }
    if weight_sum <= 0.0 {
        return 0.0;
    }
    to_score(total / weight_sum)
}

fn build_summary(
    overall: f64,
    keyword: f64,
    ats: f64,
    semantic: Option<f64>,
    missing: usize,
    total_keywords: usize,
) -> String {
    let semantic_part = match semantic {
        Some(s) => format!("semantic alignment {s:.1}"),
        None => "semantic alignment 0.0 (not available)".to_string(),
    };
    format!(
        "Overall match {overall:.1}/100: keyword coverage {keyword:.1}, ATS formatting {ats:.1}, {semantic_part}. {missing} of {total_keywords} job keywords missing."
    )
}

const ALL_GOOD: &str = "Strong match. Keep tailoring your resume to each role you apply for.";

/// Fixed priority: contact details, keywords, structure, formatting, then content alignment.
fn build_suggestions(
    checks: &[CheckResult],
    keyword_score: f64,
    ats_score: f64,
    semantic: Option<f64>,
    alignments: &[SectionAlignment],
    missing: &[String],
    config: &AnalysisConfig,
) -> Vec<String> {
    let failed = |check: AtsCheck| checks.iter().any(|c| c.check_name == check && !c.passed);
    let thresholds = &config.thresholds;
    let mut suggestions = Vec::new();

    if failed(AtsCheck::HasContactInfo) {
        suggestions.push("Add an email address or phone number at the top of your resume.".to_string());
    }
    if keyword_score < thresholds.keyword && !missing.is_empty() {
        let top: Vec<&str> = missing.iter().take(3).map(String::as_str).collect();
        suggestions.push(format!(
            "Work the missing job keywords into your resume where they are accurate: {}.",
            top.join(", ")
        ));
    }
    if failed(AtsCheck::HasSections) {
        suggestions.push(
            "Use standard section headings such as Experience, Education and Skills.".to_string(),
        );
    }
    if failed(AtsCheck::BulletUsage) {
        suggestions.push(
            "Describe your experience in bullet points, one accomplishment per bullet.".to_string(),
        );
    }
    if failed(AtsCheck::ReasonableLength) {
        suggestions.push(format!(
            "Keep the resume between {} and {} words.",
            config.length.min_words, config.length.max_words
        ));
    }
    if failed(AtsCheck::NoTables) {
        suggestions.push("Replace tables with plain text; many ATS parsers skip table cells.".to_string());
    }
    if failed(AtsCheck::SingleColumn) {
        suggestions.push("Use a single-column layout so the text is read in order.".to_string());
    }
    if failed(AtsCheck::NoGraphics) {
        suggestions.push("Remove images and graphics; ATS parsers cannot read them.".to_string());
    }
    if failed(AtsCheck::StandardCharacters) {
        suggestions.push(
            "Replace decorative symbols with plain text or standard bullet characters.".to_string(),
        );
    }
    if let Some(semantic) = semantic {
        if semantic < thresholds.semantic {
            suggestions.push(
                "Tailor your summary and experience to the language of the job description."
                    .to_string(),
            );
        }
        let weakest = alignments
            .iter()
            .filter(|a| a.is_usable())
            .min_by(|a, b| a.similarity.total_cmp(&b.similarity));
        if let Some(weakest) = weakest {
            if weakest.similarity < thresholds.semantic {
                suggestions.push(format!(
                    "Strengthen your {} section; it aligns least with the job description ({:.1}/100).",
                    weakest.section_label, weakest.similarity
                ));
            }
        }
    }
    if ats_score < thresholds.ats {
        suggestions.push(format!(
            "Resolve the formatting issues above to raise ATS compatibility ({ats_score:.1}/100)."
        ));
    }

    if suggestions.is_empty() {
        suggestions.push(ALL_GOOD.to_string());
    }
    suggestions.truncate(config.max_suggestions.max(1));
    suggestions
}

fn ensure_finite(report: &ScoreReport) -> Result<(), AnalysisError> {
    let scores = [
        ("overall_score", report.overall_score),
        ("keyword_score", report.keyword_score),
        ("ats_score", report.ats_score),
        ("semantic_score", report.semantic_score),
        (
            "document_similarity",
            report.document_similarity.unwrap_or(0.0),
        ),
    ];
    for (name, value) in scores {
        if !value.is_finite() {
            return Err(AnalysisError::NonFiniteScore(name));
        }
    }
    if report
        .section_alignment
        .iter()
        .any(|a| !a.similarity.is_finite())
    {
        return Err(AnalysisError::NonFiniteScore("section similarity"));
    }
    if report.coverage.iter().any(|r| !r.keyword.weight.is_finite()) {
        return Err(AnalysisError::NonFiniteScore("keyword weight"));
    }
    Ok(())
}
