//! The Site Production Calculator.
//!
//! Turns one resource site into credited amounts per resource and advances
//! the site's own state for the cycle:
//!
//! 1. Look up base yields for the site's stage. No entry means the site is
//!    skipped with no mutation at all.
//! 2. `bonus = 1.0 + development_level * 0.5` (at most +50%).
//! 3. Per resource: `floor(base * multiplier * bonus * seasonal)`.
//! 4. Translate each code to a resource-type id; unmapped codes are dropped
//!    without affecting the other resources of the site.
//! 5. Mining sites gain 0.01 depletion; reaching 1.0 pins the level and moves
//!    the site to the terminal `depleted` stage.
//! 6. Stamp `last_updated` with the cycle timestamp.

use chrono::{DateTime, Utc};
use hamlet_types::{
    ResourceCode, ResourceSite, ResourceSiteType, ResourceTypeId, SeasonalModifierSet, SiteStage,
};
use tracing::{debug, info, warn};

use crate::error::ProductionError;
use crate::rates::{self, BaseYield};
use crate::resource_map::ResourceTypeMap;

/// Depletion added to a mining site every cycle.
pub const DEPLETION_PER_CYCLE: f64 = 0.01;

/// Yield bonus per unit of development level.
pub const DEVELOPMENT_BONUS_PER_LEVEL: f64 = 0.5;

/// Depletion values are snapped to this many steps per unit so repeated
/// increments land exactly on 1.0.
const DEPLETION_RESOLUTION: f64 = 1_000_000_000.0;

/// One resource credited from a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCredit {
    /// Short code from the rate table.
    pub code: ResourceCode,
    /// Canonical ledger key.
    pub resource_type_id: ResourceTypeId,
    /// Amount to add to the ledger. May be zero.
    pub amount: u64,
}

/// Everything one site contributed in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteYield {
    /// Resources to credit to the settlement ledger.
    pub credits: Vec<ResourceCredit>,
    /// Codes dropped for lack of a resource-type mapping.
    pub unmapped: Vec<ResourceCode>,
    /// Whether the site reached the depleted stage this cycle.
    pub depleted: bool,
}

/// Development bonus for a level; `None` means level 0.0.
pub fn development_bonus(development_level: Option<f64>) -> f64 {
    let level = development_level.unwrap_or(0.0).clamp(0.0, 1.0);
    level.mul_add(DEVELOPMENT_BONUS_PER_LEVEL, 1.0)
}

/// The site's output multiplier. Unset, zero, negative, and non-finite
/// values all count as 1.0.
pub fn effective_multiplier(production_multiplier: Option<f64>) -> f64 {
    production_multiplier
        .filter(|m| m.is_finite() && *m > 0.0)
        .unwrap_or(1.0)
}

/// Final amount for one resource, floored toward zero.
///
/// Non-finite or negative products yield nothing.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn produced_amount(base: u32, multiplier: f64, bonus: f64, seasonal: f64) -> u64 {
    let raw = f64::from(base) * multiplier * bonus * seasonal;
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    // `as` saturates at u64::MAX for out-of-range floats.
    raw.floor() as u64
}

/// Compute credits for a list of base yields without touching the site.
pub fn compute_credits(
    base_yields: &[BaseYield],
    site: &ResourceSite,
    modifiers: &SeasonalModifierSet,
    resource_map: &ResourceTypeMap,
) -> SiteYield {
    let multiplier = effective_multiplier(site.production_multiplier);
    let bonus = development_bonus(site.development_level);

    let mut result = SiteYield::default();
    for &(code, base) in base_yields {
        let seasonal = modifiers.modifier_for(code);
        let amount = produced_amount(base, multiplier, bonus, seasonal);

        debug!(
            site_id = %site.id,
            resource = %code,
            base,
            multiplier,
            bonus,
            seasonal,
            produced = amount,
            "Resource yield calculated"
        );

        let Some(resource_type_id) = resource_map.resolve(code) else {
            warn!(
                site_id = %site.id,
                error = %ProductionError::UnmappedResource(code),
                "Skipping unmapped resource"
            );
            result.unmapped.push(code);
            continue;
        };

        result.credits.push(ResourceCredit {
            code,
            resource_type_id,
            amount,
        });
    }
    result
}

/// Run one cycle of the calculator against a site.
///
/// On `Ok` the site has been mutated (depletion, stage, timestamp) and the
/// returned credits are ready to merge into the ledger. On `Err` the site is
/// untouched.
pub fn evaluate_site(
    site: &mut ResourceSite,
    site_type: &ResourceSiteType,
    modifiers: &SeasonalModifierSet,
    resource_map: &ResourceTypeMap,
    cycle_at: DateTime<Utc>,
) -> Result<SiteYield, ProductionError> {
    if !site.current_stage.is_productive() {
        return Err(ProductionError::NotProductive {
            site: site.id,
            stage: site.current_stage.clone(),
        });
    }

    let Some(base_yields) = rates::base_yields(&site.current_stage) else {
        return Err(ProductionError::UnknownStage {
            site: site.id,
            stage: site.current_stage.clone(),
        });
    };

    let mut result = compute_credits(base_yields, site, modifiers, resource_map);

    if site_type.category.depletes() {
        result.depleted = advance_depletion(site);
        if result.depleted {
            info!(
                site_id = %site.id,
                site_type = site_type.name.as_str(),
                "Resource site has become depleted"
            );
        }
    }

    site.last_updated = Some(cycle_at);
    Ok(result)
}

/// Add one cycle of depletion. Returns `true` on the transition to
/// [`SiteStage::Depleted`].
pub fn advance_depletion(site: &mut ResourceSite) -> bool {
    let current = site.depletion_level.clamp(0.0, 1.0);
    let next = ((current + DEPLETION_PER_CYCLE) * DEPLETION_RESOLUTION).round() / DEPLETION_RESOLUTION;

    if next >= 1.0 {
        site.depletion_level = 1.0;
        site.current_stage = SiteStage::Depleted;
        true
    } else {
        site.depletion_level = next;
        false
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use hamlet_types::{ResourceSiteId, SettlementId, SiteCategory, SiteTypeId};

    use super::*;

    fn site(stage: SiteStage) -> ResourceSite {
        ResourceSite {
            id: ResourceSiteId::new(),
            settlement_id: SettlementId::new(),
            site_type_id: SiteTypeId::new(),
            current_stage: stage,
            production_multiplier: None,
            development_level: None,
            depletion_level: 0.0,
            last_updated: None,
        }
    }

    fn site_type(category: SiteCategory) -> ResourceSiteType {
        ResourceSiteType {
            id: SiteTypeId::new(),
            code: "iron_vein".to_owned(),
            name: "Iron Vein".to_owned(),
            category,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn worked_example_floors_to_36() {
        let bonus = development_bonus(Some(0.4));
        assert!((bonus - 1.2).abs() < 1e-12);
        assert_eq!(produced_amount(10, 2.0, bonus, 1.5), 36);
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(development_bonus(None), 1.0);
        assert_eq!(development_bonus(Some(1.0)), 1.5);
        assert_eq!(produced_amount(12, 1.0, 1.0, 1.0), 12);
    }

    #[test]
    fn stored_zero_multiplier_counts_as_unset() {
        assert_eq!(effective_multiplier(None), 1.0);
        assert_eq!(effective_multiplier(Some(0.0)), 1.0);
        assert_eq!(effective_multiplier(Some(-2.0)), 1.0);
        assert_eq!(effective_multiplier(Some(f64::NAN)), 1.0);
        assert_eq!(effective_multiplier(Some(2.5)), 2.5);

        let mut modifiers = SeasonalModifierSet::neutral("autumn");
        modifiers.modifiers.insert("stone".to_owned(), 1.1);
        let mut s = site(SiteStage::SmallQuarry);
        s.production_multiplier = Some(0.0);
        let result = evaluate_site(
            &mut s,
            &site_type(SiteCategory::Quarrying),
            &modifiers,
            &ResourceTypeMap::canonical(),
            at(1),
        )
        .unwrap_or_default();
        assert_eq!(result.credits.len(), 1);
        assert_eq!(result.credits[0].code, ResourceCode::Stone);
        // floor(10 * 1.0 * 1.0 * 1.1) = 11
        assert_eq!(result.credits[0].amount, 11);
    }

    #[test]
    fn zero_or_negative_products_yield_nothing() {
        assert_eq!(produced_amount(10, 0.0, 1.0, 1.0), 0);
        assert_eq!(produced_amount(10, 1.0, 1.0, -1.0), 0);
        assert_eq!(produced_amount(10, f64::NAN, 1.0, 1.0), 0);
    }

    #[test]
    fn seasonal_modifier_applies_per_resource() {
        let mut modifiers = SeasonalModifierSet::neutral("winter");
        modifiers.modifiers.insert("wood".to_owned(), 0.75);
        let mut s = site(SiteStage::LumberCamp);
        let result = evaluate_site(
            &mut s,
            &site_type(SiteCategory::Forestry),
            &modifiers,
            &ResourceTypeMap::canonical(),
            at(1),
        );
        let result = result.unwrap_or_default();
        assert_eq!(result.credits.len(), 2);
        assert_eq!(result.credits[0].code, ResourceCode::Wood);
        assert_eq!(result.credits[0].amount, 15);
        assert_eq!(result.credits[1].code, ResourceCode::Herbs);
        assert_eq!(result.credits[1].amount, 3);
    }

    #[test]
    fn unknown_stage_skips_without_mutation() {
        let mut s = site(SiteStage::parse("large_mine"));
        let before = s.clone();
        let result = evaluate_site(
            &mut s,
            &site_type(SiteCategory::Mining),
            &SeasonalModifierSet::neutral("spring"),
            &ResourceTypeMap::canonical(),
            at(1),
        );
        assert!(matches!(result, Err(ProductionError::UnknownStage { .. })));
        assert_eq!(s, before);
    }

    #[test]
    fn depleted_site_is_never_evaluated() {
        let mut s = site(SiteStage::Depleted);
        s.depletion_level = 1.0;
        let before = s.clone();
        let result = evaluate_site(
            &mut s,
            &site_type(SiteCategory::Mining),
            &SeasonalModifierSet::neutral("spring"),
            &ResourceTypeMap::canonical(),
            at(1),
        );
        assert!(matches!(result, Err(ProductionError::NotProductive { .. })));
        assert_eq!(s, before);
    }

    #[test]
    fn unmapped_code_drops_only_that_resource() {
        let map = ResourceTypeMap::canonical().without(ResourceCode::Stone);
        let mut s = site(SiteStage::SmallMine);
        let result = evaluate_site(
            &mut s,
            &site_type(SiteCategory::Mining),
            &SeasonalModifierSet::neutral("spring"),
            &map,
            at(1),
        )
        .unwrap_or_default();
        assert_eq!(result.unmapped, vec![ResourceCode::Stone]);
        assert_eq!(result.credits.len(), 1);
        assert_eq!(result.credits[0].code, ResourceCode::Iron);
        assert_eq!(result.credits[0].amount, 5);
    }

    #[test]
    fn mining_depletes_by_one_percent_per_cycle_until_terminal() {
        let kind = site_type(SiteCategory::Mining);
        let modifiers = SeasonalModifierSet::neutral("summer");
        let map = ResourceTypeMap::canonical();
        let mut s = site(SiteStage::SmallMine);

        let mut previous = s.depletion_level;
        for cycle in 1..=100_u32 {
            let result = evaluate_site(&mut s, &kind, &modifiers, &map, at(cycle % 24));
            assert!(result.is_ok(), "cycle {cycle} should produce");
            assert!(s.depletion_level > previous);
            assert!((s.depletion_level - previous - DEPLETION_PER_CYCLE).abs() < 1e-9);
            previous = s.depletion_level;
            let depleted = result.map(|r| r.depleted).unwrap_or(false);
            assert_eq!(depleted, cycle == 100);
        }

        assert_eq!(s.depletion_level, 1.0);
        assert_eq!(s.current_stage, SiteStage::Depleted);

        // Terminal: further cycles are no-ops.
        let snapshot = s.clone();
        let again = evaluate_site(&mut s, &kind, &modifiers, &map, at(5));
        assert!(again.is_err());
        assert_eq!(s, snapshot);
    }

    #[test]
    fn non_mining_sites_never_deplete() {
        let mut s = site(SiteStage::Quarry);
        let result = evaluate_site(
            &mut s,
            &site_type(SiteCategory::Quarrying),
            &SeasonalModifierSet::neutral("spring"),
            &ResourceTypeMap::canonical(),
            at(3),
        );
        assert!(result.is_ok());
        assert_eq!(s.depletion_level, 0.0);
        assert_eq!(s.last_updated, Some(at(3)));
    }

    #[test]
    fn depletion_near_one_clamps() {
        let mut s = site(SiteStage::GoldMine);
        s.depletion_level = 0.995;
        assert!(advance_depletion(&mut s));
        assert_eq!(s.depletion_level, 1.0);
        assert_eq!(s.current_stage, SiteStage::Depleted);
    }
}
