//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::history::AnalysisRecord;
use crate::models::report::ScoreReport;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Missing text fields deserialize as empty so the pipeline reports which one is absent.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub job_description_text: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

/// One stored analysis, as returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    /// Highest-weight missing keywords, capped for display. The full list is in `report`.
    pub top_missing_keywords: Vec<String>,
    pub report: ScoreReport,
}

impl From<AnalysisRecord> for AnalysisResponse {
    fn from(record: AnalysisRecord) -> Self {
        Self {
            analysis_id: record.id,
            analyzed_at: record.analyzed_at,
            top_missing_keywords: record.report.missing_keywords_for_display().to_vec(),
            report: record.report,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: Uuid,
    pub analyses: Vec<AnalysisResponse>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyze
///
/// Scores a resume against a job description and stores the result in history.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let report = state
        .pipeline
        .analyze(&request.resume_text, &request.job_description_text)
        .await?;

    let record = AnalysisRecord::new(request.user_id, report);
    state.history.save(record.clone()).await?;
    info!(
        "Stored analysis {} (user: {:?}, overall: {:.1})",
        record.id, record.user_id, record.report.overall_score
    );

    Ok(Json(record.into()))
}

/// GET /api/v1/analyses/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let record = state
        .history
        .get(analysis_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {analysis_id} not found")))?;
    Ok(Json(record.into()))
}

/// GET /api/v1/analyses?user_id=
///
/// A user's past analyses, newest first.
pub async fn handle_list_analyses(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let records = state.history.list_for_user(query.user_id).await?;
    Ok(Json(HistoryResponse {
        user_id: query.user_id,
        analyses: records.into_iter().map(AnalysisResponse::from).collect(),
    }))
}
