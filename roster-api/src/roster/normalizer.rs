//! Record normalization
//!
//! Turns an untyped row into student fields plus an image reference. Never
//! fails: missing text becomes empty fields (reported by validation) and an
//! image payload that cannot be materialized falls back to the default.

use futures::future::join_all;
use roster_common::models::{StudentFields, DEFAULT_STUDENT_IMAGE};
use roster_common::row::{ImageField, ImportRow};
use uuid::Uuid;

use super::{InvalidRow, PendingAssets};
use crate::assets::ImageMaterializer;

/// One normalized row of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    /// 1-based position in the batch
    pub row: usize,
    pub fields: StudentFields,
    pub image: String,
}

impl NormalizedRecord {
    /// Validation failure for this record, if any field is missing
    pub fn invalid_row(&self) -> Option<InvalidRow> {
        let missing = self.fields.missing_fields();
        if missing.is_empty() {
            return None;
        }
        Some(InvalidRow {
            row: self.row,
            name: self.fields.display_name().to_string(),
            missing,
        })
    }
}

/// Normalize a single row; `index` is 0-based
///
/// Every image written is tracked in `pending` as soon as it exists.
pub async fn normalize(
    row: &ImportRow,
    index: usize,
    images: &ImageMaterializer,
    scope: Uuid,
    pending: &PendingAssets,
) -> NormalizedRecord {
    let fields = row.student_fields();

    let image = match row.image() {
        ImageField::Default => DEFAULT_STUDENT_IMAGE.to_string(),
        ImageField::Payload(payload) => match images.materialize(&payload, scope).await {
            Ok(name) => {
                pending.track(&name);
                name
            }
            Err(e) => {
                tracing::warn!(
                    row = index + 1,
                    error = %e,
                    "Image could not be stored; using default image"
                );
                DEFAULT_STUDENT_IMAGE.to_string()
            }
        },
    };

    NormalizedRecord {
        row: index + 1,
        fields,
        image,
    }
}

/// Normalize a batch concurrently; output order matches input order
pub async fn normalize_all(
    rows: &[ImportRow],
    images: &ImageMaterializer,
    scope: Uuid,
    pending: &PendingAssets,
) -> Vec<NormalizedRecord> {
    join_all(
        rows.iter()
            .enumerate()
            .map(|(index, row)| normalize(row, index, images, scope, pending)),
    )
    .await
}
