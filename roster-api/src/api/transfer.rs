//! Spreadsheet import, export and import template
//!
//! An uploaded spreadsheet is streamed to a temporary file in the staging
//! directory before it is parsed. The file is removed exactly once: by
//! [`StagedUpload::release`] when the import finishes, or by drop if the
//! request fails part-way or the handler unwinds.

use axum::{
    extract::{multipart::Field, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use roster_common::models::School;
use std::path::Path;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use crate::auth::AuthenticatedSchool;
use crate::error::{ApiError, ApiResult};
use crate::roster::ImportSummary;
use crate::spreadsheet::{self, XLSX_CONTENT_TYPE};
use crate::AppState;

/// Multipart field carrying the spreadsheet
pub const UPLOAD_FIELD: &str = "file";

/// Upload spooled to disk for the duration of one import
#[derive(Debug)]
pub struct StagedUpload {
    path: TempPath,
    bytes: u64,
}

impl StagedUpload {
    /// Stream a multipart field into a new file under `staging_dir`
    pub async fn receive(staging_dir: &Path, mut field: Field<'_>) -> ApiResult<Self> {
        let dir = staging_dir.to_path_buf();
        let file = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix("import-")
                .suffix(".upload")
                .tempfile_in(dir)
        })
        .await??;
        let (file, path) = file.into_parts();

        // From here on the file is owned by `upload` and removed on drop
        let mut upload = Self { path, bytes: 0 };
        let mut file = tokio::fs::File::from_std(file);
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(format!("upload interrupted: {}", e.body_text())))?
        {
            file.write_all(&chunk).await?;
            upload.bytes += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(path = %upload.path.display(), bytes = upload.bytes, "Upload staged");
        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Remove the staged file
    pub async fn release(self) {
        let path = self.path;
        let shown = path.display().to_string();
        match tokio::task::spawn_blocking(move || path.close()).await {
            Ok(Ok(())) => tracing::debug!(path = %shown, "Upload released"),
            Ok(Err(e)) => tracing::warn!(path = %shown, error = %e, "Failed to remove staged upload"),
            Err(e) => tracing::warn!(path = %shown, error = %e, "Upload release task failed"),
        }
    }
}

/// POST /api/students/import
pub async fn import_students(
    State(state): State<AppState>,
    Extension(AuthenticatedSchool(school)): Extension<AuthenticatedSchool>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImportSummary>> {
    let upload = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("malformed upload: {}", e.body_text())))?
            .ok_or_else(|| {
                ApiError::BadRequest(format!("missing multipart field '{}'", UPLOAD_FIELD))
            })?;
        if field.name() == Some(UPLOAD_FIELD) {
            break StagedUpload::receive(&state.staging_dir, field).await?;
        }
    };

    let result = import_staged(&state, &school, &upload).await;
    upload.release().await;

    let summary = result?;
    Ok(Json(summary))
}

async fn import_staged(
    state: &AppState,
    school: &School,
    upload: &StagedUpload,
) -> ApiResult<ImportSummary> {
    let bytes = upload.read().await?;
    let rows = tokio::task::spawn_blocking(move || spreadsheet::parse_rows(bytes))
        .await?
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(school = %school.id, rows = rows.len(), "Parsed import spreadsheet");
    state.roster.import_students(school, rows).await
}

/// GET /api/students/export
pub async fn export_students(
    State(state): State<AppState>,
    Extension(AuthenticatedSchool(school)): Extension<AuthenticatedSchool>,
) -> ApiResult<Response> {
    let students = state.roster.list_students(&school).await?;
    let bytes = tokio::task::spawn_blocking(move || spreadsheet::render_students(&students))
        .await?
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(xlsx_attachment("students.xlsx", bytes))
}

/// GET /api/students/import-template
pub async fn import_template() -> ApiResult<Response> {
    let bytes = tokio::task::spawn_blocking(spreadsheet::render_template)
        .await?
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(xlsx_attachment("student-import-template.xlsx", bytes))
}

fn xlsx_attachment(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}
