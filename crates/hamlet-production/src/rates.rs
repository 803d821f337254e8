//! The Production Rate Table: base yield per resource for each site stage.
//!
//! Rates are resolved at compile time from the [`SiteStage`] variant. Stages
//! outside the table (including every [`SiteStage::Other`] code) have no
//! entry and are skipped by the calculator.
//!
//! | Stage              | Yield                        |
//! |--------------------|------------------------------|
//! | `gold_mine`        | gold 3, stone 2              |
//! | `small_mine`       | iron 5, stone 2              |
//! | `established_mine` | iron 12, stone 3             |
//! | `small_quarry`     | stone 10                     |
//! | `quarry`           | stone 25                     |
//! | `small_lumber_camp`| wood 10, herbs 2             |
//! | `lumber_camp`      | wood 20, herbs 3             |
//! | `herb_garden`      | herbs 12, food 4             |
//! | `small_farm`       | food 12                      |
//! | `established_farm` | food 20                      |
//! | `discovered`       | food 3, wood 3, herbs 2      |

use hamlet_types::{ResourceCode, SiteStage};

/// One `(resource, base amount per cycle)` pair.
pub type BaseYield = (ResourceCode, u32);

/// Yield for a found-but-undeveloped site of any type.
pub const DISCOVERED_YIELDS: &[BaseYield] = &[
    (ResourceCode::Food, 3),
    (ResourceCode::Wood, 3),
    (ResourceCode::Herbs, 2),
];

const GOLD_MINE: &[BaseYield] = &[(ResourceCode::Gold, 3), (ResourceCode::Stone, 2)];
const SMALL_MINE: &[BaseYield] = &[(ResourceCode::Iron, 5), (ResourceCode::Stone, 2)];
const ESTABLISHED_MINE: &[BaseYield] = &[(ResourceCode::Iron, 12), (ResourceCode::Stone, 3)];
const SMALL_QUARRY: &[BaseYield] = &[(ResourceCode::Stone, 10)];
const QUARRY: &[BaseYield] = &[(ResourceCode::Stone, 25)];
const SMALL_LUMBER_CAMP: &[BaseYield] = &[(ResourceCode::Wood, 10), (ResourceCode::Herbs, 2)];
const LUMBER_CAMP: &[BaseYield] = &[(ResourceCode::Wood, 20), (ResourceCode::Herbs, 3)];
const HERB_GARDEN: &[BaseYield] = &[(ResourceCode::Herbs, 12), (ResourceCode::Food, 4)];
const SMALL_FARM: &[BaseYield] = &[(ResourceCode::Food, 12)];
const ESTABLISHED_FARM: &[BaseYield] = &[(ResourceCode::Food, 20)];

/// Look up the base yields for a stage.
///
/// Returns `None` for stages without a table entry: `undiscovered`,
/// `depleted`, and any unrecognised stage code.
pub const fn base_yields(stage: &SiteStage) -> Option<&'static [BaseYield]> {
    match stage {
        SiteStage::Discovered => Some(DISCOVERED_YIELDS),
        SiteStage::GoldMine => Some(GOLD_MINE),
        SiteStage::SmallMine => Some(SMALL_MINE),
        SiteStage::EstablishedMine => Some(ESTABLISHED_MINE),
        SiteStage::SmallQuarry => Some(SMALL_QUARRY),
        SiteStage::Quarry => Some(QUARRY),
        SiteStage::SmallLumberCamp => Some(SMALL_LUMBER_CAMP),
        SiteStage::LumberCamp => Some(LUMBER_CAMP),
        SiteStage::HerbGarden => Some(HERB_GARDEN),
        SiteStage::SmallFarm => Some(SMALL_FARM),
        SiteStage::EstablishedFarm => Some(ESTABLISHED_FARM),
        SiteStage::Undiscovered | SiteStage::Depleted | SiteStage::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn established_mine_yields_iron_and_stone() {
        let yields = base_yields(&SiteStage::EstablishedMine);
        assert_eq!(
            yields,
            Some(&[(ResourceCode::Iron, 12), (ResourceCode::Stone, 3)][..])
        );
    }

    #[test]
    fn discovered_uses_default_set() {
        assert_eq!(base_yields(&SiteStage::Discovered), Some(DISCOVERED_YIELDS));
    }

    #[test]
    fn unproductive_and_unknown_stages_have_no_entry() {
        assert!(base_yields(&SiteStage::Undiscovered).is_none());
        assert!(base_yields(&SiteStage::Depleted).is_none());
        assert!(base_yields(&SiteStage::parse("large_mine")).is_none());
    }
}
