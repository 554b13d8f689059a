//! School (tenant) persistence

use roster_common::models::School;
use roster_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{decode_timestamp, decode_uuid, encode_timestamp};

const SCHOOL_COLUMNS: &str =
    "id, name, email, password_hash, plan, students_allowed, subscription_expiry, created_at";

fn school_from_row(row: &SqliteRow) -> Result<School> {
    let id: String = row.try_get("id")?;
    let expiry: Option<String> = row.try_get("subscription_expiry")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(School {
        id: decode_uuid(&id)?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        plan: row.try_get("plan")?,
        students_allowed: row.try_get("students_allowed")?,
        subscription_expiry: expiry.as_deref().map(decode_timestamp).transpose()?,
        created_at: decode_timestamp(&created_at)?,
    })
}

/// Insert a new school; returns false if the email is already registered
pub async fn insert_school(db: &SqlitePool, school: &School) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO schools (id, name, email, password_hash, plan, students_allowed,
                             subscription_expiry, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(email) DO NOTHING
        "#,
    )
    .bind(school.id.to_string())
    .bind(&school.name)
    .bind(&school.email)
    .bind(&school.password_hash)
    .bind(&school.plan)
    .bind(school.students_allowed)
    .bind(school.subscription_expiry.map(encode_timestamp))
    .bind(encode_timestamp(school.created_at))
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Load a school by id
pub async fn find_by_id(db: &SqlitePool, id: Uuid) -> Result<Option<School>> {
    let row = sqlx::query(&format!("SELECT {} FROM schools WHERE id = ?", SCHOOL_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    row.as_ref().map(school_from_row).transpose()
}

/// Load a school by login email (case-insensitive)
pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<School>> {
    let row = sqlx::query(&format!("SELECT {} FROM schools WHERE email = ?", SCHOOL_COLUMNS))
        .bind(email)
        .fetch_optional(db)
        .await?;

    row.as_ref().map(school_from_row).transpose()
}
