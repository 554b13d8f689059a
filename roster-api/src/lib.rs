//! roster-api library - multi-tenant school roster service
//!
//! Schools sign up on a subscription plan and manage a student roster whose
//! size the plan caps. Students are added one at a time or imported in bulk
//! from a spreadsheet; imports are all-or-nothing.

use axum::{extract::DefaultBodyLimit, Router};
use roster_common::PlanTable;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub mod api;
pub mod assets;
pub mod auth;
pub mod db;
pub mod error;
pub mod roster;
pub mod spreadsheet;

use assets::{AssetStore, DiskAssetStore};
use auth::TokenService;
use db::SqliteRosterStore;
use roster::Roster;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub roster: Roster,
    /// Student image storage, also served at `/uploads`
    pub assets: Arc<dyn AssetStore>,
    pub tokens: TokenService,
    pub plans: Arc<PlanTable>,
    pub uploads_dir: PathBuf,
    /// Where uploaded spreadsheets are spooled during an import
    pub staging_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        tokens: TokenService,
        plans: PlanTable,
        uploads_dir: PathBuf,
        staging_dir: PathBuf,
        max_upload_bytes: usize,
    ) -> Self {
        let assets: Arc<dyn AssetStore> = Arc::new(DiskAssetStore::new(uploads_dir.clone()));
        let store = Arc::new(SqliteRosterStore::new(db.clone()));
        Self {
            roster: Roster::new(store, assets.clone()),
            db,
            assets,
            tokens,
            plans: Arc::new(plans),
            uploads_dir,
            staging_dir,
            max_upload_bytes,
        }
    }
}

/// Build application router
///
/// Health, signup and login are public; everything under `/api/schools`
/// and `/api/students` requires a school bearer token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/api/schools/me", get(api::profile))
        .route(
            "/api/students",
            get(api::list_students).post(api::add_student),
        )
        .route("/api/students/import", post(api::import_students))
        .route("/api/students/export", get(api::export_students))
        .route("/api/students/import-template", get(api::import_template))
        .route(
            "/api/students/:id",
            put(api::update_student).delete(api::delete_student),
        )
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_school,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/auth/signup", post(api::signup))
        .route("/api/auth/login", post(api::login))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .nest_service("/uploads", ServeDir::new(&state.uploads_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
