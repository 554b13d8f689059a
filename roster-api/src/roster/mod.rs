//! Roster operations
//!
//! Every write that adds students goes through the capacity policy before
//! any image is materialized, and again inside the store's capped insert.
//! Assets materialized for a write are held by a [`PendingAssets`] guard
//! until the write commits; any other exit releases them.

mod import;
mod normalizer;
mod pending;
mod students;

pub use import::ImportSummary;
pub use normalizer::{normalize, normalize_all, NormalizedRecord};
pub use pending::PendingAssets;
pub use students::StudentUpdate;

use roster_common::models::School;
use roster_common::CapacityRejection;
use serde::Serialize;
use std::sync::Arc;

use crate::assets::{AssetStore, ImageMaterializer};
use crate::db::RosterStore;

/// A record rejected by validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidRow {
    /// 1-based position in the submitted batch
    pub row: usize,
    /// Student name, or a placeholder when the name itself is missing
    pub name: String,
    pub missing: Vec<&'static str>,
}

/// Tenant-scoped roster service shared by the HTTP handlers
#[derive(Clone)]
pub struct Roster {
    store: Arc<dyn RosterStore>,
    assets: Arc<dyn AssetStore>,
    images: ImageMaterializer,
}

impl Roster {
    pub fn new(store: Arc<dyn RosterStore>, assets: Arc<dyn AssetStore>) -> Self {
        let images = ImageMaterializer::new(assets.clone());
        Self {
            store,
            assets,
            images,
        }
    }

    /// Number of students the school currently holds
    pub async fn student_count(&self, school: &School) -> roster_common::Result<i64> {
        self.store.count_by_owner(school.id).await
    }

    /// Guard for assets written on behalf of one write
    fn pending_assets(&self) -> PendingAssets {
        PendingAssets::new(self.assets.clone())
    }

    /// Release an asset no record references any more
    async fn release_replaced(&self, name: String) {
        pending::release_assets(self.assets.as_ref(), vec![name]).await;
    }
}

/// Capacity rejection for a batch that lost the race at insert time
fn limit_reached(school: &School, current: i64, requested: i64) -> CapacityRejection {
    CapacityRejection::LimitExceeded {
        plan: school.plan_name().unwrap_or_default().to_string(),
        limit: school.students_allowed,
        current,
        requested,
    }
}
