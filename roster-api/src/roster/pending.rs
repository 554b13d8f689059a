//! Assets written ahead of the record that references them

use roster_common::models::is_owned_asset;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::assets::AssetStore;

/// Assets materialized for a write that has not committed yet
///
/// Dropping the guard releases whatever it still tracks on a background
/// task. A cancelled or panicking request therefore leaves no unreferenced
/// files behind. Call [`PendingAssets::commit`] once the records are stored.
pub struct PendingAssets {
    assets: Arc<dyn AssetStore>,
    names: Mutex<Vec<String>>,
}

impl PendingAssets {
    pub fn new(assets: Arc<dyn AssetStore>) -> Self {
        Self {
            assets,
            names: Mutex::new(Vec::new()),
        }
    }

    /// Track an asset that was just written
    pub fn track(&self, name: &str) {
        self.lock().push(name.to_string());
    }

    /// Names currently tracked, in the order they were written
    pub fn names(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// The referencing records are stored; keep the assets
    pub fn commit(self) {
        self.take();
    }

    /// Release every tracked asset before returning
    pub async fn release(self) {
        let names = self.take();
        release_assets(self.assets.as_ref(), names).await;
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PendingAssets {
    fn drop(&mut self) {
        let names = self.take();
        if names.is_empty() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(count = names.len(), "Releasing assets of an abandoned write");
                let assets = self.assets.clone();
                handle.spawn(async move { release_assets(assets.as_ref(), names).await });
            }
            Err(_) => {
                tracing::warn!(assets = ?names, "No runtime to release assets of an abandoned write")
            }
        }
    }
}

/// Delete owned assets, logging failures instead of returning them
///
/// Used on paths that already carry a more relevant outcome for the caller;
/// a leftover file must not mask it.
pub(super) async fn release_assets(assets: &dyn AssetStore, names: Vec<String>) {
    for name in names.iter().filter(|name| is_owned_asset(name)) {
        match assets.delete(name).await {
            Ok(true) => tracing::debug!(asset = %name, "Released asset"),
            Ok(false) => tracing::warn!(asset = %name, "Asset already missing on release"),
            Err(e) => tracing::warn!(asset = %name, error = %e, "Failed to release asset"),
        }
    }
}
