use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::candidates::{Candidate, CandidateId, CandidateStats};
use crate::errors::AppError;
use crate::service::ImportSummary;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    pub source: Option<String>,
}

/// GET /api/candidates
pub async fn handle_list(State(state): State<AppState>) -> Result<Json<Vec<Candidate>>, AppError> {
    Ok(Json(state.service.list().await?))
}

/// GET /api/candidates/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<CandidateId>,
) -> Result<Json<Candidate>, AppError> {
    Ok(Json(state.service.get(id).await?))
}

/// POST /api/candidates
/// 201 when a new candidate was added, 200 when the email already existed.
pub async fn handle_create(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Candidate>), AppError> {
    let outcome = state.service.create(body).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.candidate)))
}

/// PUT /api/candidates/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<CandidateId>,
    Json(body): Json<Value>,
) -> Result<Json<Candidate>, AppError> {
    Ok(Json(state.service.update(id, body).await?))
}

/// DELETE /api/candidates/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<CandidateId>,
) -> Result<StatusCode, AppError> {
    state.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/stats
pub async fn handle_stats(State(state): State<AppState>) -> Result<Json<CandidateStats>, AppError> {
    Ok(Json(state.service.stats().await?))
}

/// POST /api/import/csv
/// Body is the raw CSV text.
pub async fn handle_import_csv(
    State(state): State<AppState>,
    Query(params): Query<ImportQuery>,
    body: String,
) -> Result<Json<ImportSummary>, AppError> {
    let source = params.source.as_deref().or(Some("CSV"));
    Ok(Json(state.service.import_csv(&body, source).await?))
}

/// POST /api/import/json
/// Body is a JSON array of candidate documents.
pub async fn handle_import_json(
    State(state): State<AppState>,
    Query(params): Query<ImportQuery>,
    Json(body): Json<Value>,
) -> Result<Json<ImportSummary>, AppError> {
    let Value::Array(records) = body else {
        return Err(AppError::Validation(
            "expected a JSON array of candidates".to_string(),
        ));
    };
    let summary = state
        .service
        .import_json(records, params.source.as_deref())
        .await?;
    Ok(Json(summary))
}
