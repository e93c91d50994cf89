//! Process-wide prayer-type cache
//!
//! Holds the last successfully fetched list so a remounted manager can skip
//! its initial fetch. Lives for the process; only a successful mutation
//! invalidates it.

use parking_lot::RwLock;
use prayer_admin_core::PrayerType;
use std::sync::{Arc, LazyLock};

static SHARED: LazyLock<PrayerTypeCache> = LazyLock::new(PrayerTypeCache::new);

/// Shared handle to a cached prayer-type list
#[derive(Debug, Clone, Default)]
pub struct PrayerTypeCache {
    entries: Arc<RwLock<Option<Vec<PrayerType>>>>,
}

impl PrayerTypeCache {
    /// Empty cache, independent from the shared one
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance
    pub fn shared() -> Self {
        SHARED.clone()
    }

    /// Cached list, if populated
    pub fn get(&self) -> Option<Vec<PrayerType>> {
        self.entries.read().clone()
    }

    /// Whether a list is cached
    pub fn is_populated(&self) -> bool {
        self.entries.read().is_some()
    }

    /// Replace the cached list
    pub fn store(&self, types: Vec<PrayerType>) {
        *self.entries.write() = Some(types);
    }

    /// Drop the cached list
    pub fn invalidate(&self) {
        *self.entries.write() = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<PrayerType> {
        vec![PrayerType {
            id: "1".to_string(),
            name: "Personal".to_string(),
            display_order: 0,
            is_active: true,
            created_at: Utc::now(),
        }]
    }

    #[test]
    fn test_store_get_invalidate() {
        let cache = PrayerTypeCache::new();
        assert!(cache.get().is_none());

        cache.store(sample());
        assert!(cache.is_populated());
        assert_eq!(cache.get().unwrap()[0].name, "Personal");

        cache.invalidate();
        assert!(!cache.is_populated());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = PrayerTypeCache::new();
        let other = cache.clone();
        cache.store(sample());

        assert!(other.is_populated());
    }

    #[test]
    fn test_shared_instance_is_process_wide() {
        let first = PrayerTypeCache::shared();
        let second = PrayerTypeCache::shared();
        assert!(Arc::ptr_eq(&first.entries, &second.entries));
    }
}
