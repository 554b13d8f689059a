//! Student roster persistence
//!
//! Every query is scoped by owning school. A lookup for another school's
//! record is indistinguishable from a lookup for a record that does not
//! exist.

use async_trait::async_trait;
use roster_common::models::{NewStudent, Student, StudentFields};
use roster_common::time::now;
use roster_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{decode_timestamp, decode_uuid, encode_timestamp};

const STUDENT_COLUMNS: &str = "id, school_id, name, grade, dob, blood_group, guardian_contact, \
                               address, image, created_at, updated_at";

/// Result of a capped batch insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Every record was written; `total` is the owner's count afterwards
    Inserted { students: Vec<Student>, total: i64 },
    /// Writing the batch would exceed the limit; nothing was written
    LimitReached { current: i64 },
}

/// A record after an update, with the image reference it replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedStudent {
    pub student: Student,
    pub previous_image: String,
}

/// Tenant-scoped student storage
#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn count_by_owner(&self, owner: Uuid) -> Result<i64>;

    /// Insert all records atomically, or none if the owner would end up
    /// with more than `limit` students
    async fn insert_many(
        &self,
        owner: Uuid,
        records: &[NewStudent],
        limit: i64,
    ) -> Result<InsertOutcome>;

    async fn find_by_owner_and_id(&self, owner: Uuid, id: Uuid) -> Result<Option<Student>>;

    /// All of the owner's students in insertion order
    async fn find_by_owner(&self, owner: Uuid) -> Result<Vec<Student>>;

    /// Replace fields, and the image when one is given; `None` if no such
    /// record belongs to `owner`
    async fn update_by_id(
        &self,
        owner: Uuid,
        id: Uuid,
        fields: &StudentFields,
        image: Option<&str>,
    ) -> Result<Option<UpdatedStudent>>;

    /// Delete and return the removed record
    async fn delete_by_id(&self, owner: Uuid, id: Uuid) -> Result<Option<Student>>;
}

/// SQLite-backed roster store
#[derive(Debug, Clone)]
pub struct SqliteRosterStore {
    pool: SqlitePool,
}

impl SqliteRosterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn student_from_row(row: &SqliteRow) -> Result<Student> {
    let id: String = row.try_get("id")?;
    let school_id: String = row.try_get("school_id")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Student {
        id: decode_uuid(&id)?,
        school_id: decode_uuid(&school_id)?,
        fields: StudentFields {
            name: row.try_get("name")?,
            grade: row.try_get("grade")?,
            dob: row.try_get("dob")?,
            blood_group: row.try_get("blood_group")?,
            guardian_contact: row.try_get("guardian_contact")?,
            address: row.try_get("address")?,
        },
        image: row.try_get("image")?,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}

#[async_trait]
impl RosterStore for SqliteRosterStore {
    async fn count_by_owner(&self, owner: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE school_id = ?")
            .bind(owner.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_many(
        &self,
        owner: Uuid,
        records: &[NewStudent],
        limit: i64,
    ) -> Result<InsertOutcome> {
        let created_at = now();
        let stamp = encode_timestamp(created_at);
        let mut tx = self.pool.begin().await?;
        let mut students = Vec::with_capacity(records.len());

        // Writing first takes the database write lock, so the count below
        // cannot interleave with another school's or request's insert
        for record in records {
            let id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO students (id, school_id, name, grade, dob, blood_group,
                                      guardian_contact, address, image, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id.to_string())
            .bind(owner.to_string())
            .bind(&record.fields.name)
            .bind(&record.fields.grade)
            .bind(&record.fields.dob)
            .bind(&record.fields.blood_group)
            .bind(&record.fields.guardian_contact)
            .bind(&record.fields.address)
            .bind(&record.image)
            .bind(&stamp)
            .bind(&stamp)
            .execute(&mut *tx)
            .await?;

            students.push(Student {
                id,
                school_id: owner,
                fields: record.fields.clone(),
                image: record.image.clone(),
                created_at,
                updated_at: created_at,
            });
        }

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE school_id = ?")
            .bind(owner.to_string())
            .fetch_one(&mut *tx)
            .await?;

        if total > limit {
            tx.rollback().await?;
            let current = total - records.len() as i64;
            tracing::debug!(school = %owner, current, limit, "Capped insert rolled back");
            return Ok(InsertOutcome::LimitReached { current });
        }

        tx.commit().await?;
        Ok(InsertOutcome::Inserted { students, total })
    }

    async fn find_by_owner_and_id(&self, owner: Uuid, id: Uuid) -> Result<Option<Student>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM students WHERE id = ? AND school_id = ?",
            STUDENT_COLUMNS
        ))
        .bind(id.to_string())
        .bind(owner.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(student_from_row).transpose()
    }

    async fn find_by_owner(&self, owner: Uuid) -> Result<Vec<Student>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM students WHERE school_id = ? ORDER BY created_at, rowid",
            STUDENT_COLUMNS
        ))
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(student_from_row).collect()
    }

    async fn update_by_id(
        &self,
        owner: Uuid,
        id: Uuid,
        fields: &StudentFields,
        image: Option<&str>,
    ) -> Result<Option<UpdatedStudent>> {
        let stamp = encode_timestamp(now());
        let mut tx = self.pool.begin().await?;

        // Touch the row first to take the write lock; the image read below
        // is then the one this update replaces
        let touched = sqlx::query("UPDATE students SET updated_at = ? WHERE id = ? AND school_id = ?")
            .bind(&stamp)
            .bind(id.to_string())
            .bind(owner.to_string())
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let previous_image: String = sqlx::query_scalar("SELECT image FROM students WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE students
            SET name = ?, grade = ?, dob = ?, blood_group = ?, guardian_contact = ?,
                address = ?, image = COALESCE(?, image)
            WHERE id = ?
            RETURNING {}
            "#,
            STUDENT_COLUMNS
        ))
        .bind(&fields.name)
        .bind(&fields.grade)
        .bind(&fields.dob)
        .bind(&fields.blood_group)
        .bind(&fields.guardian_contact)
        .bind(&fields.address)
        .bind(image)
        .bind(id.to_string())
        .fetch_one(&mut *tx)
        .await?;
        let student = student_from_row(&row)?;

        tx.commit().await?;
        Ok(Some(UpdatedStudent {
            student,
            previous_image,
        }))
    }

    async fn delete_by_id(&self, owner: Uuid, id: Uuid) -> Result<Option<Student>> {
        let row = sqlx::query(&format!(
            "DELETE FROM students WHERE id = ? AND school_id = ? RETURNING {}",
            STUDENT_COLUMNS
        ))
        .bind(id.to_string())
        .bind(owner.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(student_from_row).transpose()
    }
}
