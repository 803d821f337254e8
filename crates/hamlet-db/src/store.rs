//! [`SettlementStore`] over `PostgreSQL` transactions.
//!
//! Each [`PgSession`] owns one transaction. Dropping it without commit rolls
//! the transaction back when the connection returns to the pool. Loading a
//! single settlement takes a row lock (`FOR UPDATE`), so two cycles for the
//! same settlement serialize instead of racing on its ledger.

use hamlet_core::{SettlementStore, StoreError, StoreSession};
use hamlet_types::{
    Building, BuildingId, LocationId, ResourceSite, ResourceSiteType, ResourceTypeId,
    Settlement, SettlementId, SettlementResource, SiteTypeId, WorldId,
};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::error::DbError;
use crate::rows::{
    BuildingRow, LedgerRow, SettlementRow, SiteRow, SiteTypeRow, population_to_db,
    quantity_to_db,
};

const SETTLEMENT_COLUMNS: &str =
    "id, name, world_id, location_id, population, created_at, last_updated";
const SITE_COLUMNS: &str = "id, settlement_id, site_type_id, current_stage, production_multiplier, development_level, depletion_level, last_updated";
const BUILDING_COLUMNS: &str = "id, settlement_id, building_type, status, construction_progress, health, is_operational, constructed_at, last_updated";

/// Settlement storage backed by a connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SettlementStore for PgStore {
    type Session = PgSession;

    async fn open_session(&self) -> Result<PgSession, StoreError> {
        let tx = self.pool.begin().await.map_err(DbError::from)?;
        Ok(PgSession { tx })
    }
}

/// One transaction against the settlement tables.
#[derive(Debug)]
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

impl StoreSession for PgSession {
    async fn settlement(&mut self, id: SettlementId) -> Result<Option<Settlement>, StoreError> {
        let row = sqlx::query_as::<_, SettlementRow>(&format!(
            "SELECT {SETTLEMENT_COLUMNS} FROM settlements WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.into_inner())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DbError::from)?;

        Ok(row.map(SettlementRow::into_domain).transpose()?)
    }

    async fn settlements(&mut self, world: Option<WorldId>) -> Result<Vec<Settlement>, StoreError> {
        let rows = sqlx::query_as::<_, SettlementRow>(&format!(
            "SELECT {SETTLEMENT_COLUMNS} FROM settlements
             WHERE $1::UUID IS NULL OR world_id = $1
             ORDER BY id"
        ))
        .bind(world.map(WorldId::into_inner))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(DbError::from)?;

        let settlements = rows
            .into_iter()
            .map(SettlementRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(settlements)
    }

    async fn productive_sites(
        &mut self,
        settlement: SettlementId,
    ) -> Result<Vec<ResourceSite>, StoreError> {
        let rows = sqlx::query_as::<_, SiteRow>(&format!(
            "SELECT {SITE_COLUMNS} FROM resource_sites
             WHERE settlement_id = $1
               AND current_stage NOT IN ('undiscovered', 'depleted')
             ORDER BY id"
        ))
        .bind(settlement.into_inner())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(DbError::from)?;

        debug!(settlement_id = %settlement, sites = rows.len(), "Loaded productive sites");
        Ok(rows.into_iter().map(SiteRow::into_domain).collect())
    }

    async fn site_type(&mut self, id: SiteTypeId) -> Result<Option<ResourceSiteType>, StoreError> {
        let row = sqlx::query_as::<_, SiteTypeRow>(
            "SELECT id, code, name, category FROM resource_site_types WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DbError::from)?;

        Ok(row.map(SiteTypeRow::into_domain))
    }

    async fn ledger_entry(
        &mut self,
        settlement: SettlementId,
        resource_type: ResourceTypeId,
    ) -> Result<Option<SettlementResource>, StoreError> {
        let row = sqlx::query_as::<_, LedgerRow>(
            "SELECT id, settlement_id, resource_type_id, quantity, last_updated
             FROM settlement_resources
             WHERE settlement_id = $1 AND resource_type_id = $2",
        )
        .bind(settlement.into_inner())
        .bind(resource_type.into_inner())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DbError::from)?;

        Ok(row.map(LedgerRow::into_domain).transpose()?)
    }

    async fn save_ledger_entry(&mut self, entry: &SettlementResource) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO settlement_resources (id, settlement_id, resource_type_id, quantity, last_updated)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (settlement_id, resource_type_id)
             DO UPDATE SET quantity = EXCLUDED.quantity, last_updated = EXCLUDED.last_updated",
        )
        .bind(entry.id.into_inner())
        .bind(entry.settlement_id.into_inner())
        .bind(entry.resource_type_id.into_inner())
        .bind(quantity_to_db(entry.quantity))
        .bind(entry.last_updated)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn save_site(&mut self, site: &ResourceSite) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE resource_sites
             SET current_stage = $2, depletion_level = $3, last_updated = $4
             WHERE id = $1",
        )
        .bind(site.id.into_inner())
        .bind(site.current_stage.as_str())
        .bind(site.depletion_level)
        .bind(site.last_updated)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "resource site",
                id: site.id.to_string(),
            });
        }
        Ok(())
    }

    async fn save_settlement(&mut self, settlement: &Settlement) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO settlements (id, name, world_id, location_id, population, created_at, last_updated)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                 name = EXCLUDED.name,
                 location_id = EXCLUDED.location_id,
                 population = EXCLUDED.population,
                 last_updated = EXCLUDED.last_updated",
        )
        .bind(settlement.id.into_inner())
        .bind(settlement.name.as_str())
        .bind(settlement.world_id.into_inner())
        .bind(settlement.location_id.map(LocationId::into_inner))
        .bind(population_to_db(settlement.population))
        .bind(settlement.created_at)
        .bind(settlement.last_updated)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn buildings(&mut self, settlement: SettlementId) -> Result<Vec<Building>, StoreError> {
        let rows = sqlx::query_as::<_, BuildingRow>(&format!(
            "SELECT {BUILDING_COLUMNS} FROM settlement_buildings
             WHERE settlement_id = $1
             ORDER BY id"
        ))
        .bind(settlement.into_inner())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(DbError::from)?;

        let buildings = rows
            .into_iter()
            .map(BuildingRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(buildings)
    }

    async fn building(&mut self, id: BuildingId) -> Result<Option<Building>, StoreError> {
        let row = sqlx::query_as::<_, BuildingRow>(&format!(
            "SELECT {BUILDING_COLUMNS} FROM settlement_buildings WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.into_inner())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DbError::from)?;

        Ok(row.map(BuildingRow::into_domain).transpose()?)
    }

    async fn save_building(&mut self, building: &Building) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO settlement_buildings (id, settlement_id, building_type, status, construction_progress, health, is_operational, constructed_at, last_updated)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (id) DO UPDATE SET
                 status = EXCLUDED.status,
                 construction_progress = EXCLUDED.construction_progress,
                 health = EXCLUDED.health,
                 is_operational = EXCLUDED.is_operational,
                 constructed_at = EXCLUDED.constructed_at,
                 last_updated = EXCLUDED.last_updated",
        )
        .bind(building.id.into_inner())
        .bind(building.settlement_id.into_inner())
        .bind(building.building_type.as_str())
        .bind(building.status.as_str())
        .bind(i16::from(building.construction_progress))
        .bind(i16::from(building.health))
        .bind(building.is_operational)
        .bind(building.constructed_at)
        .bind(building.last_updated)
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }
}
