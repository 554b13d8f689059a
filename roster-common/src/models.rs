//! Domain models shared by the roster crates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Asset reference assigned to students without an uploaded image
pub const DEFAULT_STUDENT_IMAGE: &str = "default-student.png";

/// Display name used for rows whose name field is blank
pub const UNNAMED_STUDENT: &str = "Unnamed student";

/// Spreadsheet columns for export and import, in order
pub const STUDENT_COLUMNS: [&str; 6] = [
    "name",
    "grade",
    "dob",
    "bloodGroup",
    "guardianContact",
    "address",
];

/// Optional inline-image column, only documented in the import template
pub const IMAGE_COLUMN: &str = "image";

/// Columns of the import template: the export columns plus the image column
pub fn template_columns() -> Vec<&'static str> {
    let mut columns = STUDENT_COLUMNS.to_vec();
    columns.push(IMAGE_COLUMN);
    columns
}

/// A tenant of the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    /// Plan identifier; `None` (or blank) means no subscription
    pub plan: Option<String>,
    pub students_allowed: i64,
    pub subscription_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl School {
    /// Plan name with blank values treated as absent
    pub fn plan_name(&self) -> Option<&str> {
        self.plan.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

/// The six textual student fields, as stored and as exported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFields {
    pub name: String,
    pub grade: String,
    pub dob: String,
    pub blood_group: String,
    pub guardian_contact: String,
    pub address: String,
}

impl StudentFields {
    /// Field values in `STUDENT_COLUMNS` order
    pub fn values(&self) -> [&str; 6] {
        [
            &self.name,
            &self.grade,
            &self.dob,
            &self.blood_group,
            &self.guardian_contact,
            &self.address,
        ]
    }

    /// Column names whose value is empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        STUDENT_COLUMNS
            .iter()
            .zip(self.values())
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(column, _)| *column)
            .collect()
    }

    /// True when every textual field is non-empty
    pub fn is_complete(&self) -> bool {
        self.values().iter().all(|value| !value.trim().is_empty())
    }

    /// Name used when reporting this record back to the user
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            UNNAMED_STUDENT
        } else {
            &self.name
        }
    }
}

/// Student record ready to be written: fields plus image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub fields: StudentFields,
    pub image: String,
}

/// A stored student
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub school_id: Uuid,
    #[serde(flatten)]
    pub fields: StudentFields,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// True when `asset` refers to an uploaded asset that may be released
pub fn is_owned_asset(asset: &str) -> bool {
    !asset.trim().is_empty() && asset != DEFAULT_STUDENT_IMAGE
}
