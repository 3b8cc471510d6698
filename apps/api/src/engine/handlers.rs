//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::AnalysisRun;
use crate::errors::AppError;
use crate::matching::{ComparisonResult, SkillSet};
use crate::state::AppState;
use crate::store::{AnalysisEntry, AnalysisKind, CvPointer, CvType, FileRefs, VersionMeta};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RunAnalysisRequest {
    pub user_id: Uuid,
    pub company: String,
    pub cv_text: String,
    pub jd_text: String,
    #[serde(default)]
    pub source_file_id: Option<String>,
    #[serde(default)]
    pub output_file_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub cv_skills: SkillSet,
    pub jd_skills: SkillSet,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Uuid,
    pub kind: AnalysisKind,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SetPointerRequest {
    pub user_id: Uuid,
    pub file_id: String,
}

#[derive(Debug, Serialize)]
pub struct VersionsResponse {
    pub company: String,
    pub kind: AnalysisKind,
    pub versions: Vec<VersionMeta>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub company: String,
    pub removed: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyses
///
/// Full pipeline: extract → compare → component analysis → aggregate → persist.
pub async fn handle_run_analysis(
    State(state): State<AppState>,
    Json(request): Json<RunAnalysisRequest>,
) -> Result<(StatusCode, Json<AnalysisRun>), AppError> {
    if request.cv_text.trim().is_empty() || request.jd_text.trim().is_empty() {
        return Err(AppError::Validation(
            "cv_text and jd_text cannot be empty".to_string(),
        ));
    }

    let refs = FileRefs {
        source_file_id: request.source_file_id,
        output_file_id: request.output_file_id,
    };
    let run = state
        .engine
        .run_full_analysis(
            request.user_id,
            &request.company,
            &request.cv_text,
            &request.jd_text,
            refs,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(run)))
}

/// POST /api/v1/skills/compare
///
/// Compares two already-normalized skill sets. Nothing is persisted.
pub async fn handle_compare(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<ComparisonResult>, AppError> {
    let comparison = state
        .engine
        .compare(&request.cv_skills, &request.jd_skills)?;
    Ok(Json(comparison))
}

/// GET /api/v1/analyses/:company/latest?user_id&kind
pub async fn handle_get_latest(
    State(state): State<AppState>,
    Path(company): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<AnalysisEntry>, AppError> {
    let entry = state
        .engine
        .get_latest(query.user_id, &company, query.kind)
        .await?;
    Ok(Json(entry))
}

/// GET /api/v1/analyses/:company/versions?user_id&kind
///
/// Newest first; the first element is what `latest` returns.
pub async fn handle_list_versions(
    State(state): State<AppState>,
    Path(company): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<VersionsResponse>, AppError> {
    let versions = state
        .engine
        .list_versions(query.user_id, &company, query.kind)
        .await?;
    Ok(Json(VersionsResponse {
        company,
        kind: query.kind,
        versions,
    }))
}

/// DELETE /api/v1/analyses/:company?user_id
///
/// User-initiated removal of the whole history for one company.
pub async fn handle_cleanup(
    State(state): State<AppState>,
    Path(company): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CleanupResponse>, AppError> {
    let removed = state.engine.cleanup(query.user_id, &company).await?;
    Ok(Json(CleanupResponse { company, removed }))
}

/// PUT /api/v1/analyses/:company/pointers/:cv_type
pub async fn handle_set_pointer(
    State(state): State<AppState>,
    Path((company, cv_type)): Path<(String, CvType)>,
    Json(request): Json<SetPointerRequest>,
) -> Result<Json<CvPointer>, AppError> {
    let pointer = state
        .engine
        .set_cv_pointer(request.user_id, &company, cv_type, &request.file_id)
        .await?;
    Ok(Json(pointer))
}

/// GET /api/v1/analyses/:company/pointers/:cv_type?user_id
pub async fn handle_get_pointer(
    State(state): State<AppState>,
    Path((company, cv_type)): Path<(String, CvType)>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CvPointer>, AppError> {
    let pointer = state
        .engine
        .cv_pointer(query.user_id, &company, cv_type)
        .await?;
    Ok(Json(pointer))
}
