//! Signup, login and the school profile

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use roster_common::models::School;
use roster_common::time;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, AuthenticatedSchool, IssuedToken};
use crate::db::schools;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub plan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// What a school sees about its own account
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub plan: Option<String>,
    pub students_allowed: i64,
    pub subscription_expiry: Option<DateTime<Utc>>,
    pub student_count: i64,
    pub remaining: i64,
}

impl SchoolProfile {
    fn new(school: &School, student_count: i64) -> Self {
        Self {
            id: school.id,
            name: school.name.clone(),
            email: school.email.clone(),
            plan: school.plan_name().map(str::to_string),
            students_allowed: school.students_allowed,
            subscription_expiry: school.subscription_expiry,
            student_count,
            remaining: (school.students_allowed - student_count).max(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub school: SchoolProfile,
    pub token: IssuedToken,
}

/// POST /api/auth/signup
///
/// Plan terms are fixed from the plan table at this moment; an absent plan
/// creates a school with no subscription.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_ascii_lowercase();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if !is_plausible_email(&email) {
        return Err(ApiError::BadRequest("a valid email is required".to_string()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let created_at = time::now();
    let subscription = match req.plan.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(plan) => Some(state.plans.subscribe(plan, created_at).ok_or_else(|| {
            let known: Vec<&str> = state.plans.names().collect();
            ApiError::BadRequest(format!(
                "unknown plan '{}'; available plans: {}",
                plan,
                known.join(", ")
            ))
        })?),
        None => None,
    };

    let school = School {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash: hash_password(req.password).await?,
        plan: subscription.as_ref().map(|s| s.plan.clone()),
        students_allowed: subscription.as_ref().map_or(0, |s| s.students_allowed),
        subscription_expiry: subscription.as_ref().map(|s| s.expires_at),
        created_at,
    };

    if !schools::insert_school(&state.db, &school).await? {
        return Err(ApiError::Conflict("email is already registered".to_string()));
    }

    tracing::info!(
        school = %school.id,
        plan = school.plan_name().unwrap_or("none"),
        "School signed up"
    );

    let token = state.tokens.issue(school.id)?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            school: SchoolProfile::new(&school, 0),
            token,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let invalid = || ApiError::Unauthorized("invalid email or password".to_string());

    let email = req.email.trim().to_ascii_lowercase();
    let school = schools::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(req.password, school.password_hash.clone()).await? {
        tracing::info!(school = %school.id, "Login rejected");
        return Err(invalid());
    }

    let count = state.roster.student_count(&school).await?;
    let token = state.tokens.issue(school.id)?;
    Ok(Json(SessionResponse {
        school: SchoolProfile::new(&school, count),
        token,
    }))
}

/// GET /api/schools/me
pub async fn profile(
    State(state): State<AppState>,
    Extension(AuthenticatedSchool(school)): Extension<AuthenticatedSchool>,
) -> ApiResult<Json<SchoolProfile>> {
    let count = state.roster.student_count(&school).await?;
    Ok(Json(SchoolProfile::new(&school, count)))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_plausibility() {
        assert!(is_plausible_email("office@school.example"));
        assert!(!is_plausible_email("office"));
        assert!(!is_plausible_email("@school.example"));
        assert!(!is_plausible_email("office@localhost"));
        assert!(!is_plausible_email("of fice@school.example"));
    }

    #[test]
    fn test_profile_remaining_never_negative() {
        let school = School {
            id: Uuid::new_v4(),
            name: "Over".to_string(),
            email: "over@example.com".to_string(),
            password_hash: String::new(),
            plan: None,
            students_allowed: 0,
            subscription_expiry: None,
            created_at: time::now(),
        };
        let profile = SchoolProfile::new(&school, 3);
        assert_eq!(profile.remaining, 0);
        assert_eq!(profile.plan, None);
    }
}
