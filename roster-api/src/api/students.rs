//! Student CRUD handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use roster_common::models::Student;
use roster_common::row::ImportRow;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthenticatedSchool;
use crate::error::{ApiError, ApiResult};
use crate::roster::StudentUpdate;
use crate::AppState;

/// GET /api/students
pub async fn list_students(
    State(state): State<AppState>,
    Extension(AuthenticatedSchool(school)): Extension<AuthenticatedSchool>,
) -> ApiResult<Json<Vec<Student>>> {
    Ok(Json(state.roster.list_students(&school).await?))
}

/// POST /api/students
///
/// The body is an untyped object keyed by the spreadsheet column names, so
/// it goes through the same normalization as an imported row.
pub async fn add_student(
    State(state): State<AppState>,
    Extension(AuthenticatedSchool(school)): Extension<AuthenticatedSchool>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Student>)> {
    let row = ImportRow::from_json(&body)
        .ok_or_else(|| ApiError::BadRequest("expected a JSON object".to_string()))?;
    let student = state.roster.add_student(&school, row).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// PUT /api/students/:id
pub async fn update_student(
    State(state): State<AppState>,
    Extension(AuthenticatedSchool(school)): Extension<AuthenticatedSchool>,
    Path(id): Path<Uuid>,
    Json(update): Json<StudentUpdate>,
) -> ApiResult<Json<Student>> {
    Ok(Json(state.roster.update_student(&school, id, update).await?))
}

/// DELETE /api/students/:id
pub async fn delete_student(
    State(state): State<AppState>,
    Extension(AuthenticatedSchool(school)): Extension<AuthenticatedSchool>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.roster.delete_student(&school, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
