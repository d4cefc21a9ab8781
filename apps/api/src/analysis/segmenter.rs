//! Section Segmenter: splits a normalized resume into labeled sections.
//!
//! A line is a heading when, stripped of decoration, it:
//! 1. equals a vocabulary entry ("Work Experience", "SKILLS:", "## Education"), or
//! 2. ends with a colon, is short, and contains a vocabulary entry ("Technical Skills & Tools:"), or
//! 3. is a short all-caps line. Contained vocabulary decides the label, longest entry wins.
//!    An all-caps line with no vocabulary only opens an `Other` section once a recognized
//!    heading has been seen (so a capitalized name or title at the top stays in the header),
//!    and only when it is plain words.
//!
//! Text before the first heading becomes the `Header` section (dropped if blank). Heading lines
//! belong to no section. Zero headings yields a single `Body` section over the whole text.

use crate::analysis::normalizer::NormalizedText;
use crate::models::document::{Section, SectionLabel};

const MAX_HEADING_CHARS: usize = 40;
const MAX_HEADING_WORDS: usize = 5;
pub(crate) const BULLET_MARKERS: &[char] = &['•', '●', '▪', '◦', '‣', '✓', '○', '■', '►', '-', '*'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Standard {
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
}

impl From<Standard> for SectionLabel {
    fn from(value: Standard) -> Self {
        match value {
            Standard::Summary => SectionLabel::Summary,
            Standard::Experience => SectionLabel::Experience,
            Standard::Education => SectionLabel::Education,
            Standard::Skills => SectionLabel::Skills,
            Standard::Projects => SectionLabel::Projects,
            Standard::Certifications => SectionLabel::Certifications,
        }
    }
}

/// Heading vocabulary, already in candidate form (lowercase, `&` spelled "and").
const VOCABULARY: &[(&str, Standard)] = &[
    ("summary", Standard::Summary),
    ("professional summary", Standard::Summary),
    ("career summary", Standard::Summary),
    ("profile", Standard::Summary),
    ("professional profile", Standard::Summary),
    ("objective", Standard::Summary),
    ("career objective", Standard::Summary),
    ("about me", Standard::Summary),
    ("experience", Standard::Experience),
    ("work experience", Standard::Experience),
    ("professional experience", Standard::Experience),
    ("relevant experience", Standard::Experience),
    ("employment", Standard::Experience),
    ("employment history", Standard::Experience),
    ("work history", Standard::Experience),
    ("education", Standard::Education),
    ("academic background", Standard::Education),
    ("education and training", Standard::Education),
    ("skills", Standard::Skills),
    ("technical skills", Standard::Skills),
    ("core competencies", Standard::Skills),
    ("competencies", Standard::Skills),
    ("technologies", Standard::Skills),
    ("expertise", Standard::Skills),
    ("projects", Standard::Projects),
    ("personal projects", Standard::Projects),
    ("notable projects", Standard::Projects),
    ("portfolio", Standard::Projects),
    ("certifications", Standard::Certifications),
    ("certification", Standard::Certifications),
    ("licenses", Standard::Certifications),
    ("licenses and certifications", Standard::Certifications),
    ("certifications and licenses", Standard::Certifications),
    ("credentials", Standard::Certifications),
];

#[derive(Debug, Clone)]
pub struct Segmentation {
    pub sections: Vec<Section>,
    /// No heading was recognized; `sections` is the single body fallback.
    pub degenerate: bool,
}

impl Segmentation {
    /// Distinct author-written labels (header/body excluded), in first-seen order.
    pub fn distinct_labels(&self) -> Vec<&SectionLabel> {
        let mut labels: Vec<&SectionLabel> = Vec::new();
        for section in &self.sections {
            if !section.label.is_structural() && !labels.contains(&&section.label) {
                labels.push(&section.label);
            }
        }
        labels
    }
}

struct Heading {
    label: SectionLabel,
    raw: String,
    line_start: usize,
    line_end: usize,
}

pub fn segment(resume: &NormalizedText) -> Segmentation {
    let text = resume.text.as_str();
    let headings = find_headings(text);

    if headings.is_empty() {
        return Segmentation {
            sections: vec![Section {
                label: SectionLabel::Body,
                heading: None,
                text: text.to_string(),
                start: 0,
                end: text.len(),
            }],
            degenerate: true,
        };
    }

    let mut sections = Vec::with_capacity(headings.len() + 1);

    let (start, end) = trimmed_span(text, 0, headings[0].line_start);
    if start < end {
        sections.push(Section {
            label: SectionLabel::Header,
            heading: None,
            text: text[start..end].to_string(),
            start,
            end,
        });
    }

    for (idx, heading) in headings.iter().enumerate() {
        let content_start = (heading.line_end + 1).min(text.len());
        let content_end = headings
            .get(idx + 1)
            .map_or(text.len(), |next| next.line_start);
        let (start, end) = trimmed_span(text, content_start, content_end.max(content_start));
        sections.push(Section {
            label: heading.label.clone(),
            heading: Some(heading.raw.clone()),
            text: text[start..end].to_string(),
            start,
            end,
        });
    }

    Segmentation {
        sections,
        degenerate: false,
    }
}

fn find_headings(text: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut seen_recognized = false;
    let mut offset = 0;

    for line in text.split('\n') {
        let line_start = offset;
        let line_end = line_start + line.len();
        offset = line_end + 1;

        if let Some((label, recognized)) = classify_heading(line, seen_recognized) {
            seen_recognized |= recognized;
            headings.push(Heading {
                label,
                raw: line.trim().to_string(),
                line_start,
                line_end,
            });
        }
    }

    headings
}

/// Returns the heading label and whether it came from the vocabulary.
fn classify_heading(line: &str, seen_recognized: bool) -> Option<(SectionLabel, bool)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_HEADING_CHARS {
        return None;
    }
    if starts_with_bullet(trimmed) {
        return None;
    }

    let candidate = heading_candidate(trimmed);
    if candidate.is_empty() || candidate.split(' ').count() > MAX_HEADING_WORDS {
        return None;
    }

    if let Some(&(_, standard)) = VOCABULARY.iter().find(|(phrase, _)| *phrase == candidate) {
        return Some((standard.into(), true));
    }

    let contained = longest_contained(&candidate);
    if trimmed.ends_with(':') {
        if let Some(standard) = contained {
            return Some((standard.into(), true));
        }
    }

    if is_all_caps(trimmed) {
        if let Some(standard) = contained {
            return Some((standard.into(), true));
        }
        if seen_recognized && is_plain_heading(trimmed) {
            return Some((SectionLabel::Other(candidate), false));
        }
    }

    None
}

pub(crate) fn starts_with_bullet(line: &str) -> bool {
    let mut chars = line.chars();
    match chars.next() {
        Some('-') | Some('*') => chars.next().is_some_and(char::is_whitespace),
        Some(c) => BULLET_MARKERS.contains(&c),
        None => false,
    }
}

/// Lowercase, decoration stripped, `&` spelled out, single-spaced.
fn heading_candidate(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        if c == '&' {
            out.push_str(" and ");
        } else if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Longest vocabulary phrase appearing as whole words; earlier entries win equal lengths.
fn longest_contained(candidate: &str) -> Option<Standard> {
    let padded = format!(" {candidate} ");
    let mut best: Option<(&str, Standard)> = None;
    for &(phrase, standard) in VOCABULARY {
        if padded.contains(&format!(" {phrase} "))
            && best.map_or(true, |(current, _)| phrase.len() > current.len())
        {
            best = Some((phrase, standard));
        }
    }
    best.map(|(_, standard)| standard)
}

fn is_all_caps(line: &str) -> bool {
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}

/// Letters, spaces and decoration only, with enough letters to be a word.
/// Keeps lines like "AWS, GCP" or "MIT 2018" from opening sections.
fn is_plain_heading(line: &str) -> bool {
    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    letters >= 4
        && line
            .chars()
            .all(|c| c.is_alphabetic() || c.is_whitespace() || "&/:#=-*_".contains(c))
}

fn trimmed_span(text: &str, start: usize, end: usize) -> (usize, usize) {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let body = slice.trim();
    (start + lead, start + lead + body.len())
}
