//! Bulk import reconciliation

use roster_common::models::{NewStudent, School};
use roster_common::row::ImportRow;
use roster_common::{can_add, time};
use serde::Serialize;

use super::{limit_reached, normalize_all, InvalidRow, Roster};
use crate::db::InsertOutcome;
use crate::error::{ApiError, ApiResult};

/// Outcome of a committed import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Records written by this import
    pub imported: usize,
    /// The school's student count afterwards
    pub total: i64,
    /// Remaining allowance under the current plan
    pub remaining: i64,
}

impl Roster {
    /// Import a batch of rows all-or-nothing
    ///
    /// Capacity is checked against the raw batch size before any image is
    /// written. The batch is rejected as a whole if any record is missing a
    /// field, and re-checked against the limit inside the insert.
    pub async fn import_students(
        &self,
        school: &School,
        rows: Vec<ImportRow>,
    ) -> ApiResult<ImportSummary> {
        if rows.is_empty() {
            return Err(ApiError::EmptyInput(
                "the uploaded file contains no student rows".to_string(),
            ));
        }

        let requested = rows.len() as i64;
        let current = self.store.count_by_owner(school.id).await?;
        can_add(school, current, requested, time::now()).into_result()?;

        let pending = self.pending_assets();
        let records = normalize_all(&rows, &self.images, school.id, &pending).await;

        let invalid: Vec<InvalidRow> = records.iter().filter_map(|r| r.invalid_row()).collect();
        if !invalid.is_empty() {
            tracing::info!(
                school = %school.id,
                rows = records.len(),
                invalid = invalid.len(),
                "Import rejected by validation"
            );
            pending.release().await;
            return Err(ApiError::validation(invalid));
        }

        let batch: Vec<NewStudent> = records
            .into_iter()
            .map(|r| NewStudent {
                fields: r.fields,
                image: r.image,
            })
            .collect();

        let outcome = match self
            .store
            .insert_many(school.id, &batch, school.students_allowed)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                pending.release().await;
                return Err(e.into());
            }
        };

        match outcome {
            InsertOutcome::Inserted { students, total } => {
                pending.commit();
                tracing::info!(
                    school = %school.id,
                    imported = students.len(),
                    total,
                    "Import committed"
                );
                Ok(ImportSummary {
                    imported: students.len(),
                    total,
                    remaining: (school.students_allowed - total).max(0),
                })
            }
            InsertOutcome::LimitReached { current } => {
                tracing::info!(school = %school.id, current, requested, "Import lost capacity race");
                pending.release().await;
                Err(limit_reached(school, current, requested).into())
            }
        }
    }
}

