//! ATS Compliance Checker: formatting rules an applicant tracking system is likely to trip on.
//!
//! Every rule always runs and is reported in `AtsCheck::ALL` order, pass or fail.

use std::sync::LazyLock;

use regex::Regex;

use crate::analysis::normalizer::NormalizedText;
use crate::analysis::segmenter::{starts_with_bullet, Segmentation, BULLET_MARKERS};
use crate::analysis::settings::AnalysisConfig;
use crate::analysis::to_score;
use crate::models::report::{AtsCheck, CheckResult};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("valid email regex")
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[\s.-]?)?(?:\(\d{3}\)|\b\d{3})[\s.-]?\d{3}[\s.-]?\d{4}\b")
        .expect("valid phone regex")
});

static PIPE_CELLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|[^|\n]+\|").expect("valid table regex"));

static TAB_CELLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S\t+\S").expect("valid tab regex"));

static IMAGES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(png|jpe?g|gif|svg|bmp|webp)\b|\[(image|photo|logo|picture|graphic)\]")
        .expect("valid image regex")
});

static COLUMN_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S {4,}\S").expect("valid column regex"));

/// Lines with a wide internal gap before the layout counts as multi-column.
const COLUMN_LINE_LIMIT: usize = 3;
/// Decorative symbols tolerated before the text counts as non-standard.
const DECORATIVE_CHAR_LIMIT: usize = 5;

pub fn run_checks(
    resume: &NormalizedText,
    segmentation: &Segmentation,
    config: &AnalysisConfig,
) -> Vec<CheckResult> {
    AtsCheck::ALL
        .iter()
        .map(|&check| {
            let (passed, detail) = match check {
                AtsCheck::HasSections => has_sections(segmentation),
                AtsCheck::HasContactInfo => {
                    has_contact_info(resume, segmentation, config.contact_scan_chars)
                }
                AtsCheck::ReasonableLength => reasonable_length(resume, config),
                AtsCheck::BulletUsage => bullet_usage(resume, segmentation),
                AtsCheck::NoTables => no_tables(&resume.text),
                AtsCheck::NoGraphics => no_graphics(&resume.text),
                AtsCheck::SingleColumn => single_column(&resume.text),
                AtsCheck::StandardCharacters => standard_characters(&resume.text),
            };
            CheckResult {
                check_name: check,
                passed,
                detail,
            }
        })
        .collect()
}

/// Passed share of all checks, 0 – 100.
pub fn ats_score(checks: &[CheckResult]) -> f64 {
    if checks.is_empty() {
        return 0.0;
    }
    let passed = checks.iter().filter(|c| c.passed).count();
    to_score(passed as f64 / checks.len() as f64 * 100.0)
}

// ────────────────────────────────────────────────────────────────────────────
// Rules
// ────────────────────────────────────────────────────────────────────────────

fn has_sections(segmentation: &Segmentation) -> (bool, String) {
    let labels = segmentation.distinct_labels();
    if labels.len() >= 2 {
        let names: Vec<&str> = labels.iter().map(|l| l.as_str()).collect();
        (true, format!("Found sections: {}", names.join(", ")))
    } else {
        (
            false,
            format!(
                "Found {} recognizable section heading(s); use clear headings like Experience, Education and Skills",
                labels.len()
            ),
        )
    }
}

fn has_contact_info(
    resume: &NormalizedText,
    segmentation: &Segmentation,
    scan_chars: usize,
) -> (bool, String) {
    let mut haystack: String = resume.text.chars().take(scan_chars).collect();
    for section in segmentation
        .sections
        .iter()
        .filter(|s| s.label.is_structural())
    {
        haystack.push('\n');
        haystack.push_str(&section.text);
    }

    let email = EMAIL.is_match(&haystack);
    let phone = PHONE.is_match(&haystack);
    let detail = match (email, phone) {
        (true, true) => "Email and phone number found".to_string(),
        (true, false) => "Email found".to_string(),
        (false, true) => "Phone number found".to_string(),
        (false, false) => "No email or phone number near the top of the resume".to_string(),
    };
    (email || phone, detail)
}

fn reasonable_length(resume: &NormalizedText, config: &AnalysisConfig) -> (bool, String) {
    let words = resume.word_count();
    let band = &config.length;
    let passed = (band.min_words..=band.max_words).contains(&words);
    (
        passed,
        format!(
            "{} words (expected {} – {})",
            words, band.min_words, band.max_words
        ),
    )
}

fn bullet_usage(resume: &NormalizedText, segmentation: &Segmentation) -> (bool, String) {
    let experience: Vec<&str> = segmentation
        .sections
        .iter()
        .filter(|s| s.label.is_experience_like())
        .map(|s| s.text.as_str())
        .collect();
    let (texts, scope) = if experience.is_empty() {
        (vec![resume.text.as_str()], "the resume")
    } else {
        (experience, "experience sections")
    };

    let bullets = texts
        .iter()
        .flat_map(|t| t.lines())
        .filter(|line| starts_with_bullet(line.trim_start()))
        .count();
    if bullets > 0 {
        (true, format!("{bullets} bullet point(s) in {scope}"))
    } else {
        (false, format!("No bullet points in {scope}"))
    }
}

fn no_tables(text: &str) -> (bool, String) {
    if PIPE_CELLS.is_match(text) {
        return (false, "Pipe-delimited table cells found".to_string());
    }
    if text.chars().any(is_box_drawing) {
        return (false, "Box-drawing characters found".to_string());
    }
    if TAB_CELLS.is_match(text) {
        return (false, "Tab-separated columns found".to_string());
    }
    (true, "No tables detected".to_string())
}

fn no_graphics(text: &str) -> (bool, String) {
    match IMAGES.find(text) {
        Some(m) => (false, format!("Image reference found: {}", m.as_str())),
        None => (true, "No images or graphics referenced".to_string()),
    }
}

fn single_column(text: &str) -> (bool, String) {
    let gapped = text.lines().filter(|l| COLUMN_GAP.is_match(l)).count();
    if gapped >= COLUMN_LINE_LIMIT {
        (
            false,
            format!("{gapped} lines with wide internal gaps suggest a multi-column layout"),
        )
    } else {
        (true, "Single-column layout".to_string())
    }
}

fn standard_characters(text: &str) -> (bool, String) {
    let decorative = text.chars().filter(|&c| is_decorative(c)).count();
    if decorative > DECORATIVE_CHAR_LIMIT {
        (
            false,
            format!("{decorative} decorative symbols may not parse correctly"),
        )
    } else {
        (true, "Only standard characters used".to_string())
    }
}

fn is_box_drawing(c: char) -> bool {
    ('\u{2500}'..='\u{257F}').contains(&c)
}

fn is_decorative(c: char) -> bool {
    !c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace() && !BULLET_MARKERS.contains(&c)
}
