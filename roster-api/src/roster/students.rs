//! Single-record operations: add, list, update, delete

use roster_common::models::{NewStudent, School, Student, StudentFields};
use roster_common::row::ImportRow;
use roster_common::{can_add, time};
use serde::Deserialize;
use uuid::Uuid;

use super::{limit_reached, normalize, InvalidRow, Roster};
use crate::db::{InsertOutcome, UpdatedStudent};
use crate::error::{ApiError, ApiResult};

/// Partial update of a student; absent fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub dob: Option<String>,
    pub blood_group: Option<String>,
    pub guardian_contact: Option<String>,
    pub address: Option<String>,
    /// New inline image payload; the current asset name leaves it unchanged
    pub image: Option<String>,
}

impl StudentUpdate {
    /// Apply provided fields to `fields`, returning the names of provided
    /// fields that are blank
    fn apply(&self, fields: &mut StudentFields) -> Vec<&'static str> {
        let mut blank = Vec::new();
        let changes = [
            ("name", &self.name, &mut fields.name),
            ("grade", &self.grade, &mut fields.grade),
            ("dob", &self.dob, &mut fields.dob),
            ("bloodGroup", &self.blood_group, &mut fields.blood_group),
            ("guardianContact", &self.guardian_contact, &mut fields.guardian_contact),
            ("address", &self.address, &mut fields.address),
        ];
        for (column, provided, target) in changes {
            if let Some(value) = provided {
                let value = value.trim();
                if value.is_empty() {
                    blank.push(column);
                } else {
                    *target = value.to_string();
                }
            }
        }
        blank
    }
}

impl Roster {
    /// Add one student after the same capacity and validation checks as import
    pub async fn add_student(&self, school: &School, row: ImportRow) -> ApiResult<Student> {
        let current = self.store.count_by_owner(school.id).await?;
        can_add(school, current, 1, time::now()).into_result()?;

        let pending = self.pending_assets();
        let record = normalize(&row, 0, &self.images, school.id, &pending).await;

        if let Some(invalid) = record.invalid_row() {
            pending.release().await;
            return Err(ApiError::validation(vec![invalid]));
        }

        let batch = [NewStudent {
            fields: record.fields,
            image: record.image,
        }];
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
                let student = students
                    .into_iter()
                    .next()
                    .ok_or_else(|| ApiError::Internal("insert returned no record".to_string()))?;
                tracing::info!(school = %school.id, student = %student.id, total, "Student added");
                Ok(student)
            }
            InsertOutcome::LimitReached { current } => {
                tracing::info!(school = %school.id, current, "Add lost capacity race");
                pending.release().await;
                Err(limit_reached(school, current, 1).into())
            }
        }
    }

    /// The school's students in insertion order
    pub async fn list_students(&self, school: &School) -> ApiResult<Vec<Student>> {
        Ok(self.store.find_by_owner(school.id).await?)
    }

    /// Update a student owned by `school`
    ///
    /// The image the store actually replaced is released only after the
    /// record references the new one.
    pub async fn update_student(
        &self,
        school: &School,
        id: Uuid,
        update: StudentUpdate,
    ) -> ApiResult<Student> {
        let existing = self
            .store
            .find_by_owner_and_id(school.id, id)
            .await?
            .ok_or_else(|| student_not_found(id))?;

        let mut fields = existing.fields.clone();
        let blank = update.apply(&mut fields);
        if !blank.is_empty() {
            return Err(ApiError::validation(vec![InvalidRow {
                row: 1,
                name: fields.display_name().to_string(),
                missing: blank,
            }]));
        }

        let pending = self.pending_assets();
        let new_image = match update.image.as_deref().map(str::trim) {
            Some(payload) if !payload.is_empty() && payload != existing.image => {
                let name = self.images.materialize(payload, school.id).await?;
                pending.track(&name);
                Some(name)
            }
            _ => None,
        };

        let result = self
            .store
            .update_by_id(school.id, id, &fields, new_image.as_deref())
            .await;
        let UpdatedStudent {
            student,
            previous_image,
        } = match result {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                // Deleted between the lookup and the update
                pending.release().await;
                return Err(student_not_found(id));
            }
            Err(e) => {
                pending.release().await;
                return Err(e.into());
            }
        };
        pending.commit();

        if new_image.is_some() && previous_image != student.image {
            self.release_replaced(previous_image).await;
        }

        tracing::info!(school = %school.id, student = %id, "Student updated");
        Ok(student)
    }

    /// Delete a student owned by `school` and release its image asset
    pub async fn delete_student(&self, school: &School, id: Uuid) -> ApiResult<Student> {
        let deleted = self
            .store
            .delete_by_id(school.id, id)
            .await?
            .ok_or_else(|| student_not_found(id))?;

        self.release_replaced(deleted.image.clone()).await;
        tracing::info!(school = %school.id, student = %id, "Student deleted");
        Ok(deleted)
    }
}

fn student_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("student {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_applies_trimmed_values() {
        let mut fields = StudentFields {
            name: "Ada".to_string(),
            grade: "4".to_string(),
            ..StudentFields::default()
        };
        let update = StudentUpdate {
            grade: Some(" 5 ".to_string()),
            ..StudentUpdate::default()
        };

        assert!(update.apply(&mut fields).is_empty());
        assert_eq!(fields.grade, "5");
        assert_eq!(fields.name, "Ada");
    }

    #[test]
    fn test_update_reports_blank_fields() {
        let mut fields = StudentFields {
            name: "Ada".to_string(),
            ..StudentFields::default()
        };
        let update = StudentUpdate {
            name: Some("  ".to_string()),
            address: Some(String::new()),
            ..StudentUpdate::default()
        };

        assert_eq!(update.apply(&mut fields), vec!["name", "address"]);
        assert_eq!(fields.name, "Ada");
    }

    #[test]
    fn test_update_deserializes_camel_case() {
        let update: StudentUpdate =
            serde_json::from_str(r#"{"bloodGroup": "AB+", "guardianContact": "555"}"#).unwrap();
        assert_eq!(update.blood_group.as_deref(), Some("AB+"));
        assert_eq!(update.guardian_contact.as_deref(), Some("555"));
        assert_eq!(update.name, None);
    }
}
