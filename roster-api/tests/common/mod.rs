//! Shared helpers for roster-api integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use roster_api::assets::DiskAssetStore;
use roster_api::auth::TokenService;
use roster_api::db::{schools, InsertOutcome, RosterStore, SqliteRosterStore};
use roster_api::{build_router, AppState};
use roster_common::db::init_in_memory;
use roster_common::models::{NewStudent, School, StudentFields, DEFAULT_STUDENT_IMAGE};
use roster_common::PlanTable;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR4nGMAAQAABQABDQottAAAAABJRU5ErkJggg==";

const BOUNDARY: &str = "roster-test-boundary";

/// Router plus the state and folders behind it
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    root: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let root = tempfile::tempdir().expect("temp root");
        let uploads = root.path().join("uploads");
        let staging = root.path().join("staging");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::create_dir_all(&staging).unwrap();

        DiskAssetStore::new(&uploads)
            .ensure_default_image()
            .await
            .unwrap();

        let db = init_in_memory().await.expect("in-memory database");
        let state = AppState::new(
            db,
            TokenService::new("integration-test-secret", 3600),
            PlanTable::default(),
            uploads,
            staging,
            10 * 1024 * 1024,
        );
        Self {
            router: build_router(state.clone()),
            state,
            root,
        }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.path().join("uploads")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.path().join("staging")
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sign up through the API; returns the school id and bearer token
    pub async fn signup(&self, email: &str, plan: Option<&str>) -> (Uuid, String) {
        let mut body = serde_json::json!({
            "name": "Test School",
            "email": email,
            "password": "correct horse battery",
        });
        if let Some(plan) = plan {
            body["plan"] = Value::String(plan.to_string());
        }

        let response = self.send(json_request("POST", "/api/auth/signup", None, &body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = read_json(response).await;

        let id = Uuid::parse_str(json["school"]["id"].as_str().unwrap()).unwrap();
        let token = json["token"]["accessToken"].as_str().unwrap().to_string();
        (id, token)
    }

    /// Insert a school directly with arbitrary subscription terms
    pub async fn insert_school(
        &self,
        plan: Option<&str>,
        students_allowed: i64,
        subscription_expiry: Option<DateTime<Utc>>,
    ) -> (School, String) {
        let school = School {
            id: Uuid::new_v4(),
            name: "Direct School".to_string(),
            email: format!("{}@direct.example", Uuid::new_v4()),
            password_hash: String::new(),
            plan: plan.map(str::to_string),
            students_allowed,
            subscription_expiry,
            created_at: Utc::now(),
        };
        assert!(schools::insert_school(&self.state.db, &school).await.unwrap());
        let token = self.state.tokens.issue(school.id).unwrap().access_token;
        (school, token)
    }

    /// Seed `count` valid students for a school, bypassing the API
    pub async fn seed_students(&self, school: Uuid, count: usize) {
        let store = SqliteRosterStore::new(self.state.db.clone());
        let batch: Vec<NewStudent> = (0..count)
            .map(|i| NewStudent {
                fields: student_fields(&format!("Seeded {}", i)),
                image: DEFAULT_STUDENT_IMAGE.to_string(),
            })
            .collect();
        let outcome = store.insert_many(school, &batch, i64::MAX).await.unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted { .. }));
    }

    pub async fn student_count(&self, school: Uuid) -> i64 {
        SqliteRosterStore::new(self.state.db.clone())
            .count_by_owner(school)
            .await
            .unwrap()
    }
}

pub fn student_fields(name: &str) -> StudentFields {
    StudentFields {
        name: name.to_string(),
        grade: "5".to_string(),
        dob: "2015-04-02".to_string(),
        blood_group: "O+".to_string(),
        guardian_contact: "555-0100".to_string(),
        address: "1 Main St".to_string(),
    }
}

/// JSON body for POST /api/students
pub fn student_json(name: &str) -> Value {
    serde_json::json!({
        "name": name,
        "grade": "5",
        "dob": "2015-04-02",
        "bloodGroup": "O+",
        "guardianContact": "555-0100",
        "address": "1 Main St",
    })
}

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Multipart upload of `bytes` under the given field name
pub fn upload_request(token: &str, field: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"students.xlsx\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            b = BOUNDARY,
            f = field
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/students/import")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Workbook with the template columns and the given rows
pub fn workbook(rows: Vec<Vec<&str>>) -> Vec<u8> {
    let columns = roster_common::models::template_columns();
    roster_api::spreadsheet::render_rows(&columns, rows).unwrap()
}

pub async fn read_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = read_bytes(response).await;
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
