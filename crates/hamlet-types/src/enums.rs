//! Enumeration types shared across the workspace.
//!
//! Stage and category codes live in storage as free-form strings. The
//! closed set the engine understands is modelled as variants; anything else
//! is kept verbatim in an `Other` variant so it round-trips to storage
//! unchanged and can be reported by name when the engine skips it.

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Site stage
// ---------------------------------------------------------------------------

/// Development phase of a resource site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SiteStage {
    /// Not yet found by the settlement; never produces.
    Undiscovered,
    /// Found but undeveloped; produces the generic discovered yield.
    Discovered,
    /// Developed gold vein.
    GoldMine,
    /// First iron mining stage.
    SmallMine,
    /// Second iron mining stage.
    EstablishedMine,
    /// First quarrying stage.
    SmallQuarry,
    /// Full quarry.
    Quarry,
    /// First forestry stage.
    SmallLumberCamp,
    /// Full lumber camp.
    LumberCamp,
    /// Cultivated herb grove.
    HerbGarden,
    /// First farming stage.
    SmallFarm,
    /// Full farm.
    EstablishedFarm,
    /// Exhausted. Terminal: never produces again.
    Depleted,
    /// A stage code outside the set above, kept verbatim.
    Other(String),
}

impl SiteStage {
    /// Return the storage code for this stage.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Undiscovered => "undiscovered",
            Self::Discovered => "discovered",
            Self::GoldMine => "gold_mine",
            Self::SmallMine => "small_mine",
            Self::EstablishedMine => "established_mine",
            Self::SmallQuarry => "small_quarry",
            Self::Quarry => "quarry",
            Self::SmallLumberCamp => "small_lumber_camp",
            Self::LumberCamp => "lumber_camp",
            Self::HerbGarden => "herb_garden",
            Self::SmallFarm => "small_farm",
            Self::EstablishedFarm => "established_farm",
            Self::Depleted => "depleted",
            Self::Other(code) => code.as_str(),
        }
    }

    /// Parse a storage code. Unknown codes become [`SiteStage::Other`].
    pub fn parse(code: &str) -> Self {
        match code {
            "undiscovered" => Self::Undiscovered,
            "discovered" => Self::Discovered,
            "gold_mine" => Self::GoldMine,
            "small_mine" => Self::SmallMine,
            "established_mine" => Self::EstablishedMine,
            "small_quarry" => Self::SmallQuarry,
            "quarry" => Self::Quarry,
            "small_lumber_camp" => Self::SmallLumberCamp,
            "lumber_camp" => Self::LumberCamp,
            "herb_garden" => Self::HerbGarden,
            "small_farm" => Self::SmallFarm,
            "established_farm" => Self::EstablishedFarm,
            "depleted" => Self::Depleted,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Whether a site at this stage takes part in a production cycle.
    ///
    /// `undiscovered` and `depleted` sites are excluded before the
    /// calculator ever sees them.
    pub const fn is_productive(&self) -> bool {
        !matches!(self, Self::Undiscovered | Self::Depleted)
    }
}

impl fmt::Display for SiteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for SiteStage {
    fn from(code: String) -> Self {
        Self::parse(&code)
    }
}

impl From<SiteStage> for String {
    fn from(stage: SiteStage) -> Self {
        stage.as_str().to_owned()
    }
}

// ---------------------------------------------------------------------------
// Site category
// ---------------------------------------------------------------------------

/// Category of a resource site type. Only [`SiteCategory::Mining`] depletes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SiteCategory {
    /// Non-renewable ore and gold veins.
    Mining,
    /// Stone quarries.
    Quarrying,
    /// Timber.
    Forestry,
    /// Wild herbs and foraging.
    Gathering,
    /// Crop land.
    Farming,
    /// Crop land under its older reference-data code.
    Agriculture,
    /// Fishing grounds.
    Fishing,
    /// A category code outside the set above, kept verbatim.
    Other(String),
}

impl SiteCategory {
    /// Return the storage code for this category.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mining => "mining",
            Self::Quarrying => "quarrying",
            Self::Forestry => "forestry",
            Self::Gathering => "gathering",
            Self::Farming => "farming",
            Self::Agriculture => "agriculture",
            Self::Fishing => "fishing",
            Self::Other(code) => code.as_str(),
        }
    }

    /// Parse a storage code. Unknown codes become [`SiteCategory::Other`].
    pub fn parse(code: &str) -> Self {
        match code {
            "mining" => Self::Mining,
            "quarrying" => Self::Quarrying,
            "forestry" => Self::Forestry,
            "gathering" => Self::Gathering,
            "farming" => Self::Farming,
            "agriculture" => Self::Agriculture,
            "fishing" => Self::Fishing,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Whether sites of this category exhaust over time.
    pub const fn depletes(&self) -> bool {
        matches!(self, Self::Mining)
    }
}

impl fmt::Display for SiteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for SiteCategory {
    fn from(code: String) -> Self {
        Self::parse(&code)
    }
}

impl From<SiteCategory> for String {
    fn from(category: SiteCategory) -> Self {
        category.as_str().to_owned()
    }
}

// ---------------------------------------------------------------------------
// Resource code
// ---------------------------------------------------------------------------

/// Short resource code used by the production rate table and the seasonal
/// modifier mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ResourceCode {
    /// Iron ore.
    Iron,
    /// Gold.
    Gold,
    /// Stone.
    Stone,
    /// Logs.
    Wood,
    /// Herbs.
    Herbs,
    /// Fish.
    Fish,
    /// Food (meat and crops).
    Food,
    /// Fresh water.
    Water,
}

impl ResourceCode {
    /// Every resource code, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Iron,
        Self::Gold,
        Self::Stone,
        Self::Wood,
        Self::Herbs,
        Self::Fish,
        Self::Food,
        Self::Water,
    ];

    /// Return the code as it appears in modifier maps and configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Iron => "iron",
            Self::Gold => "gold",
            Self::Stone => "stone",
            Self::Wood => "wood",
            Self::Herbs => "herbs",
            Self::Fish => "fish",
            Self::Food => "food",
            Self::Water => "water",
        }
    }

    /// Parse a code, returning `None` for anything unrecognised.
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }
}

impl fmt::Display for ResourceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Buildings
// ---------------------------------------------------------------------------

/// Construction state of a settlement building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BuildingStatus {
    /// Being built; progresses each cycle.
    InProgress,
    /// Finished and standing.
    Completed,
    /// Finished but damaged; eligible for repair.
    Damaged,
    /// Repair started; regains health each cycle.
    UnderRepair,
}

impl BuildingStatus {
    /// Return the storage code for this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Damaged => "damaged",
            Self::UnderRepair => "under_repair",
        }
    }

    /// Parse a storage code.
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "damaged" => Some(Self::Damaged),
            "under_repair" => Some(Self::UnderRepair),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Task status
// ---------------------------------------------------------------------------

/// Status half of a [`TaskOutcome`](crate::TaskOutcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TaskStatus {
    /// The task did its work.
    Success,
    /// The task failed; the outcome carries an error message.
    Error,
}
