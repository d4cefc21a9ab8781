use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of an analysis a text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Resume,
    JobDescription,
}

impl SourceKind {
    /// Request field the text arrives in. Used in error messages.
    pub fn field_name(self) -> &'static str {
        match self {
            SourceKind::Resume => "resume_text",
            SourceKind::JobDescription => "job_description_text",
        }
    }
}

/// Raw input text tagged with its source. Immutable once built.
#[derive(Debug, Clone)]
pub struct Document {
    kind: SourceKind,
    raw: String,
}

impl Document {
    pub fn new(kind: SourceKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Label of a resume section.
///
/// `Header` holds whatever precedes the first heading (usually contact details).
/// `Body` is only produced when no heading was found at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SectionLabel {
    Header,
    Body,
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
    Other(String),
}

impl SectionLabel {
    pub fn as_str(&self) -> &str {
        match self {
            SectionLabel::Header => "header",
            SectionLabel::Body => "body",
            SectionLabel::Summary => "summary",
            SectionLabel::Experience => "experience",
            SectionLabel::Education => "education",
            SectionLabel::Skills => "skills",
            SectionLabel::Projects => "projects",
            SectionLabel::Certifications => "certifications",
            SectionLabel::Other(name) => name,
        }
    }

    /// Header and body are positional buckets, not headings the author wrote.
    pub fn is_structural(&self) -> bool {
        matches!(self, SectionLabel::Header | SectionLabel::Body)
    }

    /// Sections where accomplishments are expected to be bulleted.
    pub fn is_experience_like(&self) -> bool {
        matches!(self, SectionLabel::Experience | SectionLabel::Projects)
    }
}

impl fmt::Display for SectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labeled span of the normalized resume text.
///
/// `start..end` are byte offsets into `NormalizedText::text`; `text` is that slice.
/// The heading line itself is not part of the span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub label: SectionLabel,
    pub heading: Option<String>,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Section {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
