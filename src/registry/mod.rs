//! The watched-resource registry.
//!
//! Owns the per-kind reconciled cache, validates mutations against the live host
//! state, and is the sole writer of the watch list store.

pub mod model;
pub mod reconcile;
pub mod store;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::errors::RegistryError;
use crate::systemd_client::LiveResourceProvider;

use model::{MonitoredEntry, ResourceKind, WatchEntry};
use store::WatchListStore;

/// Per-kind state. `watch` mirrors the persisted document once loaded; `monitored`
/// is the reconciled view, populated on first read and dropped or replaced by
/// mutations.
#[derive(Default)]
struct KindCache {
    watch: Option<Vec<WatchEntry>>,
    monitored: Option<Vec<MonitoredEntry>>,
}

pub struct Registry {
    provider: Arc<dyn LiveResourceProvider>,
    store: Arc<dyn WatchListStore>,
    services: RwLock<KindCache>,
    tasks: RwLock<KindCache>,
}

impl Registry {
    pub fn new(provider: Arc<dyn LiveResourceProvider>, store: Arc<dyn WatchListStore>) -> Self {
        Self {
            provider,
            store,
            services: RwLock::new(KindCache::default()),
            tasks: RwLock::new(KindCache::default()),
        }
    }

    /// The two kinds have independent locks, so a mutation on one never blocks
    /// reads or mutations on the other.
    fn slot(&self, kind: ResourceKind) -> &RwLock<KindCache> {
        match kind {
            ResourceKind::Service => &self.services,
            ResourceKind::Task => &self.tasks,
        }
    }

    /// Returns the reconciled view for `kind`, sorted by identity. Served from
    /// cache once populated; reloaded only after a mutation invalidated it.
    pub async fn read(&self, kind: ResourceKind) -> Result<Vec<MonitoredEntry>, RegistryError> {
        {
            let cache = self.slot(kind).read().await;
            if let Some(monitored) = cache.monitored.as_ref() {
                return Ok(monitored.clone());
            }
        }

        let mut cache = self.slot(kind).write().await;
        // Another reader may have populated the cache while we waited.
        if let Some(monitored) = cache.monitored.as_ref() {
            return Ok(monitored.clone());
        }

        if cache.watch.is_none() {
            cache.watch = Some(self.store.load(kind).await?);
        }
        let watch = cache.watch.as_deref().unwrap_or_default();

        let live = self.provider.enumerate(kind).await?;
        let mut monitored = reconcile::join(watch, live);
        sort_by_identity(&mut monitored);

        cache.monitored = Some(monitored.clone());
        Ok(monitored)
    }

    /// Watches a new resource. The identity must currently exist on the host;
    /// adding an identity that is already watched is a no-op success. The in-memory
    /// list is only committed after the document was persisted, so a failed save
    /// leaves both in their previous state.
    pub async fn add(
        &self,
        kind: ResourceKind,
        candidate: WatchEntry,
    ) -> Result<MonitoredEntry, RegistryError> {
        if candidate.identity.trim().is_empty() {
            return Err(RegistryError::validation(
                "blank_identity",
                "identity must not be empty",
            ));
        }

        let mut cache = self.slot(kind).write().await;

        let live = self.provider.enumerate(kind).await?;
        let resource = live
            .iter()
            .find(|resource| resource.identity.eq_ignore_ascii_case(&candidate.identity))
            .cloned()
            .ok_or_else(|| RegistryError::not_found(kind.as_str(), candidate.identity.clone()))?;

        if cache.watch.is_none() {
            cache.watch = Some(self.store.load(kind).await?);
        }
        let watch = cache.watch.as_deref().unwrap_or_default();

        if let Some(existing) = watch.iter().find(|entry| entry.matches(&candidate.identity)) {
            // Already watched: keep the stored metadata rather than the candidate's.
            return Ok(MonitoredEntry::merge(resource, existing));
        }

        let mut updated = watch.to_vec();
        updated.push(candidate.clone());
        self.store.save(kind, &updated).await?;

        let merged = MonitoredEntry::merge(resource, &candidate);
        let mut monitored = reconcile::join(&updated, live);
        sort_by_identity(&mut monitored);
        cache.watch = Some(updated);
        cache.monitored = Some(monitored);

        Ok(merged)
    }

    /// Removes a resource from the watch list. Deleting an identity that is not
    /// watched is a no-op success, and the live enumeration is never consulted — a
    /// resource may be un-watched even after it disappeared from the host.
    pub async fn delete(&self, kind: ResourceKind, identity: &str) -> Result<(), RegistryError> {
        if identity.trim().is_empty() {
            return Err(RegistryError::validation(
                "blank_identity",
                "identity must not be empty",
            ));
        }

        let mut cache = self.slot(kind).write().await;

        if cache.watch.is_none() {
            cache.watch = Some(self.store.load(kind).await?);
        }
        let watch = cache.watch.as_deref().unwrap_or_default();

        if !watch.iter().any(|entry| entry.matches(identity)) {
            // Nothing watched under that identity, so everything is fine.
            return Ok(());
        }

        let updated: Vec<WatchEntry> = watch
            .iter()
            .filter(|entry| !entry.matches(identity))
            .cloned()
            .collect();
        self.store.save(kind, &updated).await?;

        cache.watch = Some(updated);
        cache.monitored = None;

        Ok(())
    }
}

fn sort_by_identity(entries: &mut [MonitoredEntry]) {
    entries.sort_by(|left, right| {
        left.identity
            .to_ascii_lowercase()
            .cmp(&right.identity.to_ascii_lowercase())
    });
}
