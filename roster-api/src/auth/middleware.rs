//! Bearer-token guard for school-scoped routes

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use roster_common::models::School;

use crate::db::schools;
use crate::error::ApiError;
use crate::AppState;

/// The school a request is acting for, resolved from its token
#[derive(Debug, Clone)]
pub struct AuthenticatedSchool(pub School);

/// Require `Authorization: Bearer <token>` naming an existing school
///
/// The loaded school is stored in request extensions for the handlers.
pub async fn require_school(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let school_id = state.tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        ApiError::Unauthorized("invalid or expired token".to_string())
    })?;

    let school = schools::find_by_id(&state.db, school_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid or expired token".to_string()))?;

    request.extensions_mut().insert(AuthenticatedSchool(school));
    Ok(next.run(request).await)
}
