//! Semantic Aligner: embeds each resume section and compares it with the job description.
//!
//! The whole stage shares one deadline. Whatever is not embedded when it passes is omitted
//! rather than waited for; dropping the pending future cancels the in-flight call.
//! A failing backend stops the stage the same way. Only a vector that breaks the embedder
//! contract (wrong length, NaN) fails the analysis.

use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::analysis::{to_score, AnalysisError};
use crate::embedding::{cosine_similarity, validate_vector, Embedder, EmbeddingError};
use crate::models::document::Section;
use crate::models::report::SectionAlignment;

pub const INSUFFICIENT_TEXT: &str = "insufficient text";

#[derive(Debug, Clone, Default)]
pub struct AlignmentOutcome {
    /// In section order, up to the first section that could not be embedded.
    pub sections: Vec<SectionAlignment>,
    /// Whole resume vs whole job description.
    pub document_similarity: Option<f64>,
    pub timed_out: bool,
    /// Set when the backend failed and the stage stopped early.
    pub backend_error: Option<String>,
    /// Sections with no alignment entry because the stage stopped.
    pub omitted: usize,
}

/// Why an embedding call produced no vector.
enum Stop {
    Deadline,
    Backend(EmbeddingError),
}

impl AlignmentOutcome {
    fn stop(&mut self, cause: Stop, omitted: usize, at: &str) {
        self.omitted = omitted;
        match cause {
            Stop::Deadline => {
                warn!("Embedding deadline passed at {at} ({omitted} sections omitted)");
                self.timed_out = true;
            }
            Stop::Backend(err) => {
                warn!("Embedding backend failed at {at} ({omitted} sections omitted): {err}");
                self.backend_error = Some(err.to_string());
            }
        }
    }
}

pub async fn align_sections(
    embedder: &dyn Embedder,
    job_description: &str,
    resume: &str,
    sections: &[Section],
    timeout: Duration,
) -> Result<AlignmentOutcome, AnalysisError> {
    let deadline = Instant::now() + timeout;
    let mut outcome = AlignmentOutcome::default();

    let jd_vector = match embed_before(embedder, job_description, deadline).await? {
        Ok(vector) => vector,
        Err(stop) => {
            outcome.stop(stop, sections.len(), "the job description");
            return Ok(outcome);
        }
    };

    for (idx, section) in sections.iter().enumerate() {
        let label = section.label.to_string();
        if section.is_blank() {
            outcome.sections.push(insufficient(label));
            continue;
        }

        let vector = match embed_before(embedder, &section.text, deadline).await? {
            Ok(vector) => vector,
            Err(stop) => {
                outcome.stop(stop, sections.len() - idx, &format!("section '{label}'"));
                return Ok(outcome);
            }
        };

        let alignment = match cosine_similarity(&jd_vector, &vector) {
            Some(cos) => SectionAlignment {
                section_label: label,
                similarity: similarity_score(cos),
                detail: None,
                missing_terms: Vec::new(),
            },
            None => insufficient(label),
        };
        debug!(
            "Section '{}' similarity {:.1}",
            alignment.section_label, alignment.similarity
        );
        outcome.sections.push(alignment);
    }

    match embed_before(embedder, resume, deadline).await? {
        Ok(vector) => {
            outcome.document_similarity = cosine_similarity(&jd_vector, &vector).map(similarity_score);
        }
        Err(stop) => outcome.stop(stop, 0, "whole-document similarity"),
    }

    Ok(outcome)
}

/// Maps cosine [-1, 1] onto [0, 100].
fn similarity_score(cos: f64) -> f64 {
    to_score((cos + 1.0) / 2.0 * 100.0)
}

fn insufficient(section_label: String) -> SectionAlignment {
    SectionAlignment {
        section_label,
        similarity: 0.0,
        detail: Some(INSUFFICIENT_TEXT.to_string()),
        missing_terms: Vec::new(),
    }
}

/// Inner `Err` when the deadline passes first or the backend fails.
/// Contract violations are the only outer errors.
async fn embed_before(
    embedder: &dyn Embedder,
    text: &str,
    deadline: Instant,
) -> Result<Result<Vec<f32>, Stop>, AnalysisError> {
    let vector = match timeout_at(deadline, embedder.embed(text)).await {
        Err(_) => return Ok(Err(Stop::Deadline)),
        Ok(Err(err)) if err.is_contract_violation() => return Err(err.into()),
        Ok(Err(err)) => return Ok(Err(Stop::Backend(err))),
        Ok(Ok(vector)) => vector,
    };
    validate_vector(&vector, embedder.dimensions())?;
    Ok(Ok(vector))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::embedding::HashedEmbedder;
    use crate::models::document::SectionLabel;

    fn section(label: SectionLabel, text: &str) -> Section {
        Section {
            label,
            heading: None,
            text: text.to_string(),
            start: 0,
            end: text.len(),
        }
    }

    /// Hashed vectors, but every call takes `delay`.
    struct SlowEmbedder {
        inner: HashedEmbedder,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl SlowEmbedder {
        fn new(delay_ms: u64) -> Self {
            Self {
                inner: HashedEmbedder::default(),
                delay: Duration::from_millis(delay_ms),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.inner.embed(text).await
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        fn backend(&self) -> &'static str {
            "slow"
        }
    }

    /// Returns a fixed vector regardless of input.
    struct FixedEmbedder(Vec<f32>, usize);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(self.0.clone())
        }

        fn dimensions(&self) -> usize {
            self.1
        }

        fn backend(&self) -> &'static str {
            "fixed"
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_identical_text_aligns_fully() {
        let embedder = HashedEmbedder::default();
        let sections = [section(SectionLabel::Skills, "rust kubernetes docker")];
        let outcome = align_sections(&embedder, "rust kubernetes docker", "rust", &sections, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(outcome.sections.len(), 1);
        assert_eq!(outcome.sections[0].section_label, "skills");
        assert_eq!(outcome.sections[0].similarity, 100.0);
        assert!(!outcome.timed_out);
        assert!(outcome.document_similarity.is_some());
    }

    #[tokio::test]
    async fn test_blank_section_reports_insufficient_text() {
        let embedder = SlowEmbedder::new(0);
        let sections = [
            section(SectionLabel::Summary, "   "),
            section(SectionLabel::Skills, "rust"),
        ];
        let outcome = align_sections(&embedder, "rust", "rust", &sections, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(outcome.sections[0].similarity, 0.0);
        assert_eq!(outcome.sections[0].detail.as_deref(), Some(INSUFFICIENT_TEXT));
        assert!(outcome.sections[1].is_usable());
        // jd, skills, whole resume; the blank section is never sent
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_vector_reports_insufficient_text() {
        let embedder = FixedEmbedder(vec![0.0; 4], 4);
        let sections = [section(SectionLabel::Experience, "did things")];
        let outcome = align_sections(&embedder, "jd", "resume", &sections, TIMEOUT)
            .await
            .unwrap();
        assert!(!outcome.sections[0].is_usable());
        assert_eq!(outcome.document_similarity, None);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let embedder = FixedEmbedder(vec![1.0; 3], 4);
        let err = align_sections(&embedder, "jd", "resume", &[], TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Embedding(EmbeddingError::Dimension {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_non_finite_vector_is_fatal() {
        let embedder = FixedEmbedder(vec![1.0, f32::NAN], 2);
        let err = align_sections(&embedder, "jd", "resume", &[], TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Embedding(EmbeddingError::NonFinite)
        ));
    }

    #[tokio::test]
    async fn test_opposite_vectors_score_zero() {
        struct Flip;

        #[async_trait]
        impl Embedder for Flip {
            async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
                Ok(if text == "jd" { vec![1.0, 0.0] } else { vec![-1.0, 0.0] })
            }

            fn dimensions(&self) -> usize {
                2
            }

            fn backend(&self) -> &'static str {
                "flip"
            }
        }

        let sections = [section(SectionLabel::Skills, "other")];
        let outcome = align_sections(&Flip, "jd", "resume", &sections, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(outcome.sections[0].similarity, 0.0);
        assert!(outcome.sections[0].is_usable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_omits_remaining_sections() {
        let embedder = SlowEmbedder::new(100);
        let sections = [
            section(SectionLabel::Summary, "rust"),
            section(SectionLabel::Experience, "go"),
            section(SectionLabel::Skills, "python"),
        ];
        // jd done at 100ms, summary at 200ms, experience would finish at 300ms
        let outcome = align_sections(
            &embedder,
            "rust",
            "rust go python",
            &sections,
            Duration::from_millis(250),
        )
        .await
        .unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.sections.len(), 1);
        assert_eq!(outcome.omitted, 2);
        assert_eq!(outcome.document_similarity, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_before_job_description_omits_everything() {
        let embedder = SlowEmbedder::new(1_000);
        let sections = [section(SectionLabel::Skills, "rust")];
        let outcome = align_sections(&embedder, "rust", "rust", &sections, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(outcome.timed_out);
        assert!(outcome.sections.is_empty());
        assert_eq!(outcome.omitted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_document_similarity_cut_off() {
        let embedder = SlowEmbedder::new(100);
        let sections = [section(SectionLabel::Skills, "rust")];
        let outcome = align_sections(&embedder, "rust", "rust", &sections, Duration::from_millis(250))
            .await
            .unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.omitted, 0);
        assert_eq!(outcome.sections.len(), 1);
        assert_eq!(outcome.document_similarity, None);
    }

    /// Hashed vectors, except for one text that the backend rejects.
    struct RejectingEmbedder {
        inner: HashedEmbedder,
        reject: &'static str,
    }

    #[async_trait]
    impl Embedder for RejectingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text == self.reject {
                return Err(EmbeddingError::Api {
                    status: 400,
                    message: "maximum context length exceeded".to_string(),
                });
            }
            self.inner.embed(text).await
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        fn backend(&self) -> &'static str {
            "rejecting"
        }
    }

    #[tokio::test]
    async fn test_backend_failure_stops_alignment_without_failing() {
        let embedder = RejectingEmbedder {
            inner: HashedEmbedder::default(),
            reject: "huge experience section",
        };
        let sections = [
            section(SectionLabel::Skills, "rust"),
            section(SectionLabel::Experience, "huge experience section"),
            section(SectionLabel::Education, "cs degree"),
        ];
        let outcome = align_sections(&embedder, "rust", "rust", &sections, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(outcome.sections.len(), 1);
        assert_eq!(outcome.omitted, 2);
        assert!(!outcome.timed_out);
        assert!(outcome
            .backend_error
            .as_deref()
            .unwrap()
            .contains("maximum context length"));
        assert_eq!(outcome.document_similarity, None);
    }

    #[tokio::test]
    async fn test_backend_failure_on_job_description_omits_everything() {
        let embedder = RejectingEmbedder {
            inner: HashedEmbedder::default(),
            reject: "jd",
        };
        let sections = [section(SectionLabel::Skills, "rust")];
        let outcome = align_sections(&embedder, "jd", "rust", &sections, TIMEOUT)
            .await
            .unwrap();
        assert!(outcome.sections.is_empty());
        assert_eq!(outcome.omitted, 1);
        assert!(outcome.backend_error.is_some());
    }
}
