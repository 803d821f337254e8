//! Settlement production: run every productive site of one settlement
//! through the calculator and merge the yields into its ledger.
//!
//! [`produce_settlement`] does the work inside a caller-owned session so the
//! growth pipeline can add population and building steps to the same unit
//! of work. [`LegacyPipeline`] wraps it in a session of its own and is the
//! fallback path of the dual-path orchestrator.
//!
//! A site whose `last_updated` is at or after the cycle timestamp has
//! already been credited for this cycle and is skipped, so re-running a
//! cycle never double-credits.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hamlet_production::{ResourceCredit, ResourceTypeMap, evaluate_site};
use hamlet_types::{
    CycleSummary, LedgerEntryId, ResourceSite, ResourceSiteType, SeasonalModifierSet, Settlement,
    SettlementId, SettlementResource, SiteTypeId,
};
use tracing::{debug, info, warn};

use crate::modifiers::{ModifierResolver, resolve_or_neutral};
use crate::pipeline::{PipelineFault, PipelineReport, SettlementPipeline};
use crate::store::{SettlementStore, StoreError, StoreSession};

/// Run one production cycle for a settlement inside `session`, under the
/// modifiers the caller resolved for the settlement's world.
///
/// Per-site problems (missing site type, stage without rates, already
/// credited) skip that site only. Storage faults abort and leave the
/// session uncommitted.
pub async fn produce_settlement<S: StoreSession>(
    session: &mut S,
    modifiers: &SeasonalModifierSet,
    resource_map: &ResourceTypeMap,
    settlement: &Settlement,
    cycle_at: DateTime<Utc>,
) -> Result<CycleSummary, PipelineFault> {
    let mut summary = CycleSummary {
        season: modifiers.season.clone(),
        ..CycleSummary::default()
    };

    let sites = session.productive_sites(settlement.id).await?;
    if sites.is_empty() {
        info!(settlement_id = %settlement.id, "No productive resource sites");
        return Ok(summary);
    }

    let mut site_types: BTreeMap<SiteTypeId, Option<ResourceSiteType>> = BTreeMap::new();

    for mut site in sites {
        if already_credited(&site, cycle_at) {
            debug!(site_id = %site.id, "Resource site already credited this cycle");
            summary.sites_skipped = summary.sites_skipped.saturating_add(1);
            continue;
        }

        if !site_types.contains_key(&site.site_type_id) {
            let loaded = session.site_type(site.site_type_id).await?;
            site_types.insert(site.site_type_id, loaded);
        }
        let Some(Some(site_type)) = site_types.get(&site.site_type_id) else {
            warn!(
                site_id = %site.id,
                site_type_id = %site.site_type_id,
                "Site type not found, skipping resource site"
            );
            summary.sites_skipped = summary.sites_skipped.saturating_add(1);
            continue;
        };

        let site_yield = match evaluate_site(&mut site, site_type, modifiers, resource_map, cycle_at)
        {
            Ok(site_yield) => site_yield,
            Err(e) => {
                warn!(site_id = %site.id, error = %e, "Skipping resource site");
                summary.sites_skipped = summary.sites_skipped.saturating_add(1);
                continue;
            }
        };

        for credit in &site_yield.credits {
            credit_ledger(session, settlement.id, credit, cycle_at).await?;
            let total = summary.produced.entry(credit.code).or_insert(0);
            *total = total.saturating_add(credit.amount);
        }

        session.save_site(&site).await?;
        summary.sites_processed = summary.sites_processed.saturating_add(1);
        if site_yield.depleted {
            summary.sites_depleted = summary.sites_depleted.saturating_add(1);
        }
    }

    info!(
        settlement_id = %settlement.id,
        season = summary.season.as_str(),
        sites_processed = summary.sites_processed,
        sites_skipped = summary.sites_skipped,
        total_produced = summary.total_produced(),
        "Settlement production complete"
    );
    Ok(summary)
}

fn already_credited(site: &ResourceSite, cycle_at: DateTime<Utc>) -> bool {
    site.last_updated.is_some_and(|stamped| stamped >= cycle_at)
}

/// Merge one credit into the ledger: add to the existing entry or create it.
pub async fn credit_ledger<S: StoreSession>(
    session: &mut S,
    settlement_id: SettlementId,
    credit: &ResourceCredit,
    cycle_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let entry = match session
        .ledger_entry(settlement_id, credit.resource_type_id)
        .await?
    {
        Some(mut existing) => {
            existing.quantity = existing.quantity.saturating_add(credit.amount);
            existing.last_updated = cycle_at;
            existing
        }
        None => SettlementResource {
            id: LedgerEntryId::new(),
            settlement_id,
            resource_type_id: credit.resource_type_id,
            quantity: credit.amount,
            last_updated: cycle_at,
        },
    };
    session.save_ledger_entry(&entry).await?;

    info!(
        settlement_id = %settlement_id,
        resource = %credit.code,
        amount = credit.amount,
        quantity = entry.quantity,
        "Resource credited"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Legacy pipeline
// ---------------------------------------------------------------------------

/// Production only, one session per run. A missing settlement is a fault.
#[derive(Debug, Clone)]
pub struct LegacyPipeline<S, M> {
    store: S,
    resolver: M,
    resource_map: ResourceTypeMap,
}

impl<S, M> LegacyPipeline<S, M> {
    /// Build the pipeline.
    pub const fn new(store: S, resolver: M, resource_map: ResourceTypeMap) -> Self {
        Self {
            store,
            resolver,
            resource_map,
        }
    }
}

impl<S, M> SettlementPipeline for LegacyPipeline<S, M>
where
    S: SettlementStore,
    M: ModifierResolver,
{
    fn name(&self) -> &'static str {
        "legacy"
    }

    async fn run(
        &self,
        settlement_id: SettlementId,
        cycle_at: DateTime<Utc>,
    ) -> Result<PipelineReport, PipelineFault> {
        let mut session = self.store.open_session().await?;
        let settlement = session
            .settlement(settlement_id)
            .await?
            .ok_or(PipelineFault::SettlementNotFound(settlement_id))?;

        let modifiers = resolve_or_neutral(&self.resolver, settlement.world_id).await?;
        let summary = produce_settlement(
            &mut session,
            &modifiers,
            &self.resource_map,
            &settlement,
            cycle_at,
        )
        .await?;

        session.commit().await?;
        Ok(PipelineReport::Completed(summary))
    }
}
