use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AnalysisError;

/// Relative weight of each sub-score in `overall_score`. Must sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub keyword: f64,
    pub ats: f64,
    pub semantic: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            keyword: 0.4,
            ats: 0.3,
            semantic: 0.3,
        }
    }
}

/// Scores below these (0 – 100) trigger the matching suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionThresholds {
    pub keyword: f64,
    pub ats: f64,
    pub semantic: f64,
}

impl Default for SuggestionThresholds {
    fn default() -> Self {
        Self {
            keyword: 70.0,
            ats: 80.0,
            semantic: 60.0,
        }
    }
}

/// Accepted resume length in words. Defaults cover one to two pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LengthBand {
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for LengthBand {
    fn default() -> Self {
        Self {
            min_words: 150,
            max_words: 1200,
        }
    }
}

/// Every tunable of the pipeline. Validated once by `Pipeline::new`.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub max_input_bytes: usize,
    pub keyword_limit: usize,
    pub max_edit_distance: usize,
    pub snippet_limit: usize,
    pub contact_scan_chars: usize,
    pub length: LengthBand,
    pub weights: ScoreWeights,
    pub thresholds: SuggestionThresholds,
    pub max_suggestions: usize,
    pub embedding_timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 200_000,
            keyword_limit: 30,
            max_edit_distance: 1,
            snippet_limit: 3,
            contact_scan_chars: 200,
            length: LengthBand::default(),
            weights: ScoreWeights::default(),
            thresholds: SuggestionThresholds::default(),
            max_suggestions: 8,
            embedding_timeout: Duration::from_secs(5),
        }
    }
}

const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |msg: String| Err(AnalysisError::InvalidConfig(msg));

        let w = &self.weights;
        for (name, value) in [("keyword", w.keyword), ("ats", w.ats), ("semantic", w.semantic)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} weight must be within [0, 1], got {value}"));
            }
        }
        let sum = w.keyword + w.ats + w.semantic;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return invalid(format!("weights must sum to 1.0, got {sum:.3}"));
        }

        let t = &self.thresholds;
        for (name, value) in [("keyword", t.keyword), ("ats", t.ats), ("semantic", t.semantic)] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return invalid(format!(
                    "{name} threshold must be within [0, 100], got {value}"
                ));
            }
        }

        if self.max_input_bytes == 0 {
            return invalid("max_input_bytes must be positive".to_string());
        }
        if self.keyword_limit == 0 {
            return invalid("keyword_limit must be at least 1".to_string());
        }
        if self.length.min_words > self.length.max_words {
            return invalid(format!(
                "length band is empty: min_words {} > max_words {}",
                self.length.min_words, self.length.max_words
            ));
        }
        if self.embedding_timeout.is_zero() {
            return invalid("embedding_timeout must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        AnalysisConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ScoreWeights::default();
        assert!((w.keyword + w.ats + w.semantic - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weights_not_summing_to_one_rejected() {
        let config = AnalysisConfig {
            weights: ScoreWeights {
                keyword: 0.5,
                ats: 0.5,
                semantic: 0.5,
            },
            ..AnalysisConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)));
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let config = AnalysisConfig {
            weights: ScoreWeights {
                keyword: -0.2,
                ats: 0.6,
                semantic: 0.6,
            },
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let config = AnalysisConfig {
            thresholds: SuggestionThresholds {
                keyword: 120.0,
                ..SuggestionThresholds::default()
            },
            ..AnalysisConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("keyword threshold"));
    }

    #[test]
    fn test_nan_weight_rejected() {
        let config = AnalysisConfig {
            weights: ScoreWeights {
                keyword: f64::NAN,
                ats: 0.5,
                semantic: 0.5,
            },
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_length_band_rejected() {
        let config = AnalysisConfig {
            length: LengthBand {
                min_words: 900,
                max_words: 100,
            },
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = AnalysisConfig {
            embedding_timeout: Duration::ZERO,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
