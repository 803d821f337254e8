//! In-memory [`SettlementStore`] for tests, dry runs, and local tooling.
//!
//! Committed rows live behind one mutex. Each session stages its writes in
//! a private overlay that reads consult first; [`StoreSession::commit`]
//! folds the overlay into the committed tables in one critical section.
//! The lock is never held across an `.await`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hamlet_types::{
    Building, BuildingId, ResourceSite, ResourceSiteId, ResourceSiteType, ResourceTypeId,
    Settlement, SettlementId, SettlementResource, SiteTypeId, WorldId,
};

use crate::store::{SettlementStore, StoreError, StoreSession};

type LedgerKey = (SettlementId, ResourceTypeId);

#[derive(Debug, Clone, Default)]
struct Tables {
    settlements: BTreeMap<SettlementId, Settlement>,
    site_types: BTreeMap<SiteTypeId, ResourceSiteType>,
    sites: BTreeMap<ResourceSiteId, ResourceSite>,
    ledger: BTreeMap<LedgerKey, SettlementResource>,
    buildings: BTreeMap<BuildingId, Building>,
}

impl Tables {
    fn absorb(&mut self, staged: Self) {
        self.settlements.extend(staged.settlements);
        self.site_types.extend(staged.site_types);
        self.sites.extend(staged.sites);
        self.ledger.extend(staged.ledger);
        self.buildings.extend(staged.buildings);
    }
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    open_sessions: AtomicUsize,
    commits: AtomicU64,
    fail_commits: AtomicBool,
}

impl Shared {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared in-memory store. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// An independent store holding a copy of the committed tables.
    #[must_use]
    pub fn fork(&self) -> Self {
        let tables = self.shared.tables().clone();
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(tables),
                ..Shared::default()
            }),
        }
    }

    /// Seed a settlement.
    pub fn insert_settlement(&self, settlement: Settlement) {
        self.shared
            .tables()
            .settlements
            .insert(settlement.id, settlement);
    }

    /// Seed a site type.
    pub fn insert_site_type(&self, site_type: ResourceSiteType) {
        self.shared
            .tables()
            .site_types
            .insert(site_type.id, site_type);
    }

    /// Seed a resource site.
    pub fn insert_site(&self, site: ResourceSite) {
        self.shared.tables().sites.insert(site.id, site);
    }

    /// Seed a ledger entry.
    pub fn insert_ledger_entry(&self, entry: SettlementResource) {
        self.shared
            .tables()
            .ledger
            .insert((entry.settlement_id, entry.resource_type_id), entry);
    }

    /// Seed a building.
    pub fn insert_building(&self, building: Building) {
        self.shared.tables().buildings.insert(building.id, building);
    }

    /// Committed settlement row.
    pub fn settlement(&self, id: SettlementId) -> Option<Settlement> {
        self.shared.tables().settlements.get(&id).cloned()
    }

    /// Committed site row.
    pub fn site(&self, id: ResourceSiteId) -> Option<ResourceSite> {
        self.shared.tables().sites.get(&id).cloned()
    }

    /// Committed building row.
    pub fn building(&self, id: BuildingId) -> Option<Building> {
        self.shared.tables().buildings.get(&id).cloned()
    }

    /// Committed buildings of a settlement.
    pub fn buildings_of(&self, settlement: SettlementId) -> Vec<Building> {
        self.shared
            .tables()
            .buildings
            .values()
            .filter(|b| b.settlement_id == settlement)
            .cloned()
            .collect()
    }

    /// Committed ledger entry.
    pub fn ledger_entry(
        &self,
        settlement: SettlementId,
        resource_type: ResourceTypeId,
    ) -> Option<SettlementResource> {
        self.shared
            .tables()
            .ledger
            .get(&(settlement, resource_type))
            .cloned()
    }

    /// Committed quantities of a settlement keyed by resource type.
    pub fn ledger_quantities(&self, settlement: SettlementId) -> BTreeMap<ResourceTypeId, u64> {
        self.shared
            .tables()
            .ledger
            .iter()
            .filter(|((owner, _), _)| *owner == settlement)
            .map(|((_, resource_type), entry)| (*resource_type, entry.quantity))
            .collect()
    }

    /// Sessions currently open against this store.
    pub fn open_sessions(&self) -> usize {
        self.shared.open_sessions.load(Ordering::SeqCst)
    }

    /// Sessions committed so far.
    pub fn commit_count(&self) -> u64 {
        self.shared.commits.load(Ordering::SeqCst)
    }

    /// Make every subsequent commit fail (or succeed again).
    pub fn set_commit_failure(&self, fail: bool) {
        self.shared.fail_commits.store(fail, Ordering::SeqCst);
    }
}

impl SettlementStore for MemoryStore {
    type Session = MemorySession;

    async fn open_session(&self) -> Result<MemorySession, StoreError> {
        self.shared.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            shared: Arc::clone(&self.shared),
            staged: Tables::default(),
        })
    }
}

/// One unit of work against a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySession {
    shared: Arc<Shared>,
    staged: Tables,
}

impl MemorySession {
    fn lookup<K: Ord, V: Clone>(
        staged: &BTreeMap<K, V>,
        committed: &BTreeMap<K, V>,
        key: &K,
    ) -> Option<V> {
        staged.get(key).or_else(|| committed.get(key)).cloned()
    }

    fn merged<K: Ord + Clone, V: Clone>(
        staged: &BTreeMap<K, V>,
        committed: &BTreeMap<K, V>,
        keep: impl Fn(&V) -> bool,
    ) -> Vec<V> {
        let mut view = committed.clone();
        view.extend(staged.iter().map(|(k, v)| (k.clone(), v.clone())));
        view.into_values().filter(keep).collect()
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.shared.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StoreSession for MemorySession {
    async fn settlement(&mut self, id: SettlementId) -> Result<Option<Settlement>, StoreError> {
        let committed = self.shared.tables();
        Ok(Self::lookup(
            &self.staged.settlements,
            &committed.settlements,
            &id,
        ))
    }

    async fn settlements(&mut self, world: Option<WorldId>) -> Result<Vec<Settlement>, StoreError> {
        let committed = self.shared.tables();
        Ok(Self::merged(
            &self.staged.settlements,
            &committed.settlements,
            |s| world.is_none_or(|w| s.world_id == w),
        ))
    }

    async fn productive_sites(
        &mut self,
        settlement: SettlementId,
    ) -> Result<Vec<ResourceSite>, StoreError> {
        let committed = self.shared.tables();
        Ok(Self::merged(&self.staged.sites, &committed.sites, |site| {
            site.settlement_id == settlement && site.current_stage.is_productive()
        }))
    }

    async fn site_type(&mut self, id: SiteTypeId) -> Result<Option<ResourceSiteType>, StoreError> {
        let committed = self.shared.tables();
        Ok(Self::lookup(
            &self.staged.site_types,
            &committed.site_types,
            &id,
        ))
    }

    async fn ledger_entry(
        &mut self,
        settlement: SettlementId,
        resource_type: ResourceTypeId,
    ) -> Result<Option<SettlementResource>, StoreError> {
        let committed = self.shared.tables();
        Ok(Self::lookup(
            &self.staged.ledger,
            &committed.ledger,
            &(settlement, resource_type),
        ))
    }

    async fn save_ledger_entry(&mut self, entry: &SettlementResource) -> Result<(), StoreError> {
        self.staged
            .ledger
            .insert((entry.settlement_id, entry.resource_type_id), entry.clone());
        Ok(())
    }

    async fn save_site(&mut self, site: &ResourceSite) -> Result<(), StoreError> {
        let exists = self.staged.sites.contains_key(&site.id)
            || self.shared.tables().sites.contains_key(&site.id);
        if !exists {
            return Err(StoreError::NotFound {
                entity: "resource site",
                id: site.id.to_string(),
            });
        }
        self.staged.sites.insert(site.id, site.clone());
        Ok(())
    }

    async fn save_settlement(&mut self, settlement: &Settlement) -> Result<(), StoreError> {
        self.staged
            .settlements
            .insert(settlement.id, settlement.clone());
        Ok(())
    }

    async fn buildings(&mut self, settlement: SettlementId) -> Result<Vec<Building>, StoreError> {
        let committed = self.shared.tables();
        Ok(Self::merged(
            &self.staged.buildings,
            &committed.buildings,
            |b| b.settlement_id == settlement,
        ))
    }

    async fn building(&mut self, id: BuildingId) -> Result<Option<Building>, StoreError> {
        let committed = self.shared.tables();
        Ok(Self::lookup(
            &self.staged.buildings,
            &committed.buildings,
            &id,
        ))
    }

    async fn save_building(&mut self, building: &Building) -> Result<(), StoreError> {
        self.staged.buildings.insert(building.id, building.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if self.shared.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::backend("commit rejected by memory store"));
        }
        let staged = std::mem::take(&mut self.staged);
        self.shared.tables().absorb(staged);
        self.shared.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use hamlet_types::{LedgerEntryId, LocationId};

    use super::*;

    fn settlement(world: WorldId) -> Settlement {
        Settlement {
            id: SettlementId::new(),
            name: "Oakford".to_owned(),
            world_id: world,
            location_id: Some(LocationId::new()),
            population: 10,
            created_at: Utc::now(),
            last_updated: None,
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let store = MemoryStore::new();
        let s = settlement(WorldId::new());
        let entry = SettlementResource {
            id: LedgerEntryId::new(),
            settlement_id: s.id,
            resource_type_id: ResourceTypeId::new(),
            quantity: 7,
            last_updated: Utc::now(),
        };

        {
            let mut session = store.open_session().await.ok();
            assert_eq!(store.open_sessions(), 1);
            if let Some(session) = session.as_mut() {
                assert!(session.save_ledger_entry(&entry).await.is_ok());
                let seen = session
                    .ledger_entry(s.id, entry.resource_type_id)
                    .await
                    .ok()
                    .flatten();
                assert_eq!(seen.map(|e| e.quantity), Some(7));
            }
        }

        assert_eq!(store.open_sessions(), 0);
        assert!(store.ledger_entry(s.id, entry.resource_type_id).is_none());
    }

    #[tokio::test]
    async fn commit_publishes_writes() {
        let store = MemoryStore::new();
        let s = settlement(WorldId::new());
        let Ok(mut session) = store.open_session().await else {
            return;
        };
        assert!(session.save_settlement(&s).await.is_ok());
        assert!(session.commit().await.is_ok());

        assert_eq!(store.settlement(s.id).map(|x| x.name), Some("Oakford".to_owned()));
        assert_eq!(store.commit_count(), 1);
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn failed_commit_leaves_tables_untouched() {
        let store = MemoryStore::new();
        store.set_commit_failure(true);
        let s = settlement(WorldId::new());
        let Ok(mut session) = store.open_session().await else {
            return;
        };
        assert!(session.save_settlement(&s).await.is_ok());
        assert!(session.commit().await.is_err());
        assert!(store.settlement(s.id).is_none());
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn settlements_filter_by_world() {
        let store = MemoryStore::new();
        let north = WorldId::new();
        store.insert_settlement(settlement(north));
        store.insert_settlement(settlement(north));
        store.insert_settlement(settlement(WorldId::new()));

        let Ok(mut session) = store.open_session().await else {
            return;
        };
        let scoped = session.settlements(Some(north)).await.unwrap_or_default();
        let all = session.settlements(None).await.unwrap_or_default();
        assert_eq!(scoped.len(), 2);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn fork_is_independent() {
        let store = MemoryStore::new();
        let s = settlement(WorldId::new());
        store.insert_settlement(s.clone());
        let copy = store.fork();
        copy.insert_settlement(settlement(s.world_id));

        assert!(copy.settlement(s.id).is_some());
        assert_eq!(store.shared.tables().settlements.len(), 1);
        assert_eq!(copy.shared.tables().settlements.len(), 2);
    }
}
