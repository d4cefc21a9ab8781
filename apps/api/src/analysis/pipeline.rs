//! Pipeline: runs every stage for one resume / job description pair.
//!
//! Built once at startup and cloned into each request. Resources are read-only behind `Arc`,
//! so concurrent analyses share nothing mutable.

use std::sync::Arc;

use tracing::{debug, info};

use crate::analysis::aggregate::{aggregate, ReportParts};
use crate::analysis::alignment::align_sections;
use crate::analysis::ats::{ats_score, run_checks};
use crate::analysis::coverage::{match_coverage, section_missing_terms};
use crate::analysis::keywords::{extract_keywords, ReferenceCorpus, StopWords};
use crate::analysis::normalizer::normalize_document;
use crate::analysis::segmenter::segment;
use crate::analysis::settings::AnalysisConfig;
use crate::analysis::AnalysisError;
use crate::embedding::Embedder;
use crate::models::document::{Document, SourceKind};
use crate::models::report::{AnalysisNote, ScoreReport};

/// Process-wide, read-only inputs shared by every analysis.
pub struct PipelineResources {
    pub stopwords: StopWords,
    pub corpus: ReferenceCorpus,
    pub embedder: Arc<dyn Embedder>,
}

impl PipelineResources {
    pub fn new(stopwords: StopWords, corpus: ReferenceCorpus, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            stopwords,
            corpus,
            embedder,
        }
    }

    /// Built-in English stopwords and background corpus.
    pub fn with_defaults(embedder: Arc<dyn Embedder>) -> Self {
        let stopwords = StopWords::english();
        let corpus = ReferenceCorpus::builtin(&stopwords);
        Self::new(stopwords, corpus, embedder)
    }
}

#[derive(Clone)]
pub struct Pipeline {
    config: Arc<AnalysisConfig>,
    resources: Arc<PipelineResources>,
}

impl Pipeline {
    /// Fails with `InvalidConfig` if the settings are inconsistent.
    pub fn new(config: AnalysisConfig, resources: PipelineResources) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            resources: Arc::new(resources),
        })
    }

    pub fn embedder_backend(&self) -> &'static str {
        self.resources.embedder.backend()
    }

    pub async fn analyze(
        &self,
        resume_text: &str,
        job_description_text: &str,
    ) -> Result<ScoreReport, AnalysisError> {
        let config = &*self.config;
        let resources = &*self.resources;

        let resume_doc = Document::new(SourceKind::Resume, resume_text);
        let jd_doc = Document::new(SourceKind::JobDescription, job_description_text);
        for doc in [&resume_doc, &jd_doc] {
            if doc.raw().trim().is_empty() {
                return Err(AnalysisError::InsufficientInput {
                    field: doc.kind().field_name(),
                });
            }
        }

        let resume = normalize_document(&resume_doc, config.max_input_bytes)?;
        let jd = normalize_document(&jd_doc, config.max_input_bytes)?;
        for (doc, normalized) in [(&resume_doc, &resume), (&jd_doc, &jd)] {
            if normalized.is_blank() {
                return Err(AnalysisError::InsufficientInput {
                    field: doc.kind().field_name(),
                });
            }
        }

        let segmentation = segment(&resume);
        debug!(
            "Segmented resume into {} sections (degenerate={}, headings={:?})",
            segmentation.sections.len(),
            segmentation.degenerate,
            segmentation
                .sections
                .iter()
                .filter_map(|s| s.heading.as_deref())
                .collect::<Vec<_>>()
        );

        let keywords = extract_keywords(
            &jd,
            &resources.stopwords,
            &resources.corpus,
            config.keyword_limit,
        );
        debug!("Extracted {} keywords from job description", keywords.len());

        let coverage = match_coverage(
            &keywords,
            &resume,
            config.max_edit_distance,
            config.snippet_limit,
        );
        let checks = run_checks(&resume, &segmentation, config);
        let ats = ats_score(&checks);

        let mut alignment = align_sections(
            resources.embedder.as_ref(),
            &jd.text,
            &resume.text,
            &segmentation.sections,
            config.embedding_timeout,
        )
        .await?;
        // entries follow section order; a stopped stage only drops the tail
        for (entry, section) in alignment.sections.iter_mut().zip(&segmentation.sections) {
            entry.missing_terms =
                section_missing_terms(&keywords, &section.text, config.max_edit_distance);
        }

        let mut notes = Vec::new();
        if segmentation.degenerate {
            notes.push(AnalysisNote::SegmentationDegenerate);
        }
        if keywords.is_empty() {
            notes.push(AnalysisNote::NoKeywords);
        }
        if alignment.timed_out {
            notes.push(AnalysisNote::EmbeddingTimeout {
                omitted_sections: alignment.omitted,
            });
        }
        if let Some(reason) = alignment.backend_error.take() {
            notes.push(AnalysisNote::EmbeddingUnavailable {
                omitted_sections: alignment.omitted,
                reason,
            });
        }

        let report = aggregate(
            ReportParts {
                coverage,
                checks,
                ats_score: ats,
                alignment,
                notes,
            },
            config,
        )?;

        info!(
            "Analysis complete: overall={:.1} keyword={:.1} ats={:.1} semantic={:.1} missing={} backend={}",
            report.overall_score,
            report.keyword_score,
            report.ats_score,
            report.semantic_score,
            report.missing_keywords.len(),
            resources.embedder.backend()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::analysis::coverage::SECTION_MISSING_LIMIT;
    use crate::analysis::settings::ScoreWeights;
    use crate::embedding::{EmbeddingError, HashedEmbedder};
    use crate::models::report::AtsCheck;

    const RESUME: &str = "Software Engineer with Python and React experience.";
    const JD: &str = "Seeking Python developer with Kubernetes and Docker experience.";

    const FULL_RESUME: &str = "\
Jane Doe
jane@example.com | (555) 123-4567

Summary
Backend engineer building distributed systems in Rust and Python.

Experience
- Built payment APIs in Rust on Kubernetes
- Migrated services from VMs to Docker containers
- Cut p99 latency by 40%

Education
B.S. Computer Science

Skills
Rust, Python, PostgreSQL, Kubernetes";

    const FULL_JD: &str = "\
Senior Backend Engineer
We are looking for a backend engineer with strong Rust experience.
You will build distributed systems on Kubernetes and AWS.
Experience with PostgreSQL, Kafka and Terraform is a plus.";

    fn passed(report: &ScoreReport, check: AtsCheck) -> bool {
        report
            .checks
            .iter()
            .any(|c| c.check_name == check && c.passed)
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(
            AnalysisConfig::default(),
            PipelineResources::with_defaults(Arc::new(HashedEmbedder::default())),
        )
        .unwrap()
    }

    struct SlowEmbedder(HashedEmbedder);

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.0.embed(text).await
        }

        fn dimensions(&self) -> usize {
            self.0.dimensions()
        }

        fn backend(&self) -> &'static str {
            "slow"
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            })
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn backend(&self) -> &'static str {
            "down"
        }
    }

    #[tokio::test]
    async fn test_missing_keywords_scenario() {
        let report = pipeline().analyze(RESUME, JD).await.unwrap();
        assert!(report.missing_keywords.contains(&"kubernetes".to_string()));
        assert!(report.missing_keywords.contains(&"docker".to_string()));
        assert!(!report.missing_keywords.contains(&"python".to_string()));
        let python = report
            .coverage
            .iter()
            .find(|r| r.keyword.term == "python")
            .unwrap();
        assert!(python.in_resume);
    }

    #[tokio::test]
    async fn test_empty_resume_is_insufficient_input() {
        let err = pipeline().analyze("", JD).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientInput {
                field: "resume_text"
            }
        ));
    }

    #[tokio::test]
    async fn test_whitespace_job_description_is_insufficient_input() {
        let err = pipeline().analyze(RESUME, " \n\t ").await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientInput {
                field: "job_description_text"
            }
        ));
    }

    #[tokio::test]
    async fn test_text_without_words_is_insufficient_input() {
        let err = pipeline().analyze("--- ... 2024", JD).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientInput { .. }));
    }

    #[tokio::test]
    async fn test_oversized_input_rejected() {
        let config = AnalysisConfig {
            max_input_bytes: 100,
            ..AnalysisConfig::default()
        };
        let pipeline = Pipeline::new(
            config,
            PipelineResources::with_defaults(Arc::new(HashedEmbedder::default())),
        )
        .unwrap();
        let err = pipeline
            .analyze(RESUME, &"rust ".repeat(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InputTooLarge {
                field: "job_description_text",
                size: 250,
                limit: 100
            }
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_construction() {
        let config = AnalysisConfig {
            weights: ScoreWeights {
                keyword: 0.9,
                ats: 0.9,
                semantic: 0.9,
            },
            ..AnalysisConfig::default()
        };
        let result = Pipeline::new(
            config,
            PipelineResources::with_defaults(Arc::new(HashedEmbedder::default())),
        );
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_email_near_top_passes_contact_check() {
        let resume = format!("John Smith\njohn@example.com\n\n{RESUME}");
        let report = pipeline().analyze(&resume, JD).await.unwrap();
        assert!(passed(&report, AtsCheck::HasContactInfo));
    }

    #[tokio::test]
    async fn test_report_is_deterministic() {
        let pipeline = pipeline();
        let first = pipeline.analyze(FULL_RESUME, FULL_JD).await.unwrap();
        let second = pipeline.analyze(FULL_RESUME, FULL_JD).await.unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_scores_within_bounds() {
        let pipeline = pipeline();
        for (resume, jd) in [(RESUME, JD), (FULL_RESUME, FULL_JD), (FULL_RESUME, JD)] {
            let report = pipeline.analyze(resume, jd).await.unwrap();
            let mut values = vec![
                report.overall_score,
                report.keyword_score,
                report.ats_score,
                report.semantic_score,
            ];
            values.extend(report.document_similarity);
            values.extend(report.section_alignment.iter().map(|a| a.similarity));
            for v in values {
                assert!((0.0..=100.0).contains(&v), "{v} out of range");
            }
        }
    }

    fn frequency(report: &ScoreReport, term: &str) -> u32 {
        report
            .coverage
            .iter()
            .find(|r| r.keyword.term == term)
            .map(|r| r.frequency)
            .unwrap()
    }

    #[tokio::test]
    async fn test_appending_missing_keyword_raises_its_frequency() {
        let pipeline = pipeline();
        let before = pipeline.analyze(FULL_RESUME, FULL_JD).await.unwrap();
        let missing = before.missing_keywords[0].clone();
        assert_eq!(frequency(&before, &missing), 0);

        let after = pipeline
            .analyze(&format!("{FULL_RESUME}\n{missing}"), FULL_JD)
            .await
            .unwrap();
        assert!(frequency(&after, &missing) > 0);
        assert!(after.keyword_score >= before.keyword_score);
        assert!(!after.missing_keywords.contains(&missing));
    }

    #[tokio::test]
    async fn test_appending_present_keyword_raises_its_frequency() {
        let pipeline = pipeline();
        let before = pipeline.analyze(FULL_RESUME, FULL_JD).await.unwrap();
        let present = before
            .coverage
            .iter()
            .find(|r| r.in_resume)
            .map(|r| r.keyword.term.clone())
            .unwrap();
        let count = frequency(&before, &present);

        let after = pipeline
            .analyze(&format!("{FULL_RESUME}\n{present}"), FULL_JD)
            .await
            .unwrap();
        assert!(frequency(&after, &present) > count);
        assert!(after.keyword_score >= before.keyword_score);
    }

    #[tokio::test]
    async fn test_degenerate_resume_still_produces_full_report() {
        let report = pipeline().analyze(RESUME, JD).await.unwrap();
        assert!(report.notes.contains(&AnalysisNote::SegmentationDegenerate));
        assert_eq!(report.section_alignment.len(), 1);
        assert_eq!(report.section_alignment[0].section_label, "body");
        assert_eq!(report.checks.len(), AtsCheck::ALL.len());
        assert!(!report.summary.is_empty());
        assert!(!report.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_missing_keywords_ordered_by_weight() {
        let report = pipeline().analyze(RESUME, FULL_JD).await.unwrap();
        let weight = |term: &String| {
            report
                .coverage
                .iter()
                .find(|r| &r.keyword.term == term)
                .map(|r| r.keyword.weight)
                .unwrap()
        };
        let weights: Vec<f64> = report.missing_keywords.iter().map(weight).collect();
        assert!(weights.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_boilerplate_job_description_yields_no_keywords_note() {
        let report = pipeline()
            .analyze(FULL_RESUME, "We are seeking experience.")
            .await
            .unwrap();
        assert!(report.notes.contains(&AnalysisNote::NoKeywords));
        assert_eq!(report.keyword_score, 0.0);
        assert!(report.coverage.is_empty());
    }

    #[tokio::test]
    async fn test_structured_resume_scores_well() {
        let report = pipeline().analyze(FULL_RESUME, FULL_JD).await.unwrap();
        assert!(passed(&report, AtsCheck::HasSections));
        assert!(passed(&report, AtsCheck::BulletUsage));
        assert!(report.notes.is_empty());
        let labels: Vec<&str> = report
            .section_alignment
            .iter()
            .map(|a| a.section_label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["header", "summary", "experience", "education", "skills"]
        );
    }

    #[tokio::test]
    async fn test_sections_list_their_missing_terms() {
        let report = pipeline().analyze(FULL_RESUME, FULL_JD).await.unwrap();
        let section = |label: &str| {
            report
                .section_alignment
                .iter()
                .find(|a| a.section_label == label)
                .unwrap()
        };

        // education mentions none of the job keywords: the heaviest ones are listed
        let heaviest: Vec<String> = report
            .coverage
            .iter()
            .take(SECTION_MISSING_LIMIT)
            .map(|r| r.keyword.term.clone())
            .collect();
        assert_eq!(section("education").missing_terms, heaviest);

        let skills = &section("skills").missing_terms;
        assert_eq!(skills.len(), SECTION_MISSING_LIMIT);
        for present in ["rust", "kubernetes", "postgresql"] {
            assert!(!skills.contains(&present.to_string()), "{present} listed");
        }
    }

    #[tokio::test]
    async fn test_embedding_backend_failure_is_a_note_not_an_error() {
        let pipeline = Pipeline::new(
            AnalysisConfig::default(),
            PipelineResources::with_defaults(Arc::new(DownEmbedder)),
        )
        .unwrap();

        let report = pipeline.analyze(FULL_RESUME, FULL_JD).await.unwrap();
        assert!(report.notes.iter().any(|n| matches!(
            n,
            AnalysisNote::EmbeddingUnavailable {
                omitted_sections: 5,
                ..
            }
        )));
        assert!(report.section_alignment.is_empty());
        assert_eq!(report.document_similarity, None);
        let expected = (0.4 * report.keyword_score + 0.3 * report.ats_score) / 0.7;
        assert!((report.overall_score - expected).abs() <= 0.1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_embedding_timeout_is_a_note_not_an_error() {
        let config = AnalysisConfig {
            embedding_timeout: Duration::from_millis(50),
            ..AnalysisConfig::default()
        };
        let pipeline = Pipeline::new(
            config,
            PipelineResources::with_defaults(Arc::new(SlowEmbedder(HashedEmbedder::default()))),
        )
        .unwrap();

        let report = pipeline.analyze(FULL_RESUME, FULL_JD).await.unwrap();
        assert!(report.notes.contains(&AnalysisNote::EmbeddingTimeout {
            omitted_sections: 5
        }));
        assert!(report.section_alignment.is_empty());
        assert_eq!(report.semantic_score, 0.0);
        let expected = (0.4 * report.keyword_score + 0.3 * report.ats_score) / 0.7;
        assert!((report.overall_score - expected).abs() <= 0.1);
    }
}
