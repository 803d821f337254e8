//! Seasonal modifier resolution.
//!
//! A [`ModifierResolver`] answers "which season is this world in, and what
//! does that season do to each resource?" The production orchestrator asks
//! once per settlement per cycle, before it touches any site.
//!
//! [`StaticModifierResolver`] keeps the season per world in memory and uses
//! [`season_table`] for the multipliers. The database resolver in
//! `hamlet-db` reads both from the `worlds` and `seasons` tables.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use hamlet_types::{SeasonalModifierSet, WorldId};
use tracing::warn;

/// Errors raised while resolving seasonal modifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModifierError {
    /// The world is unknown to the resolver.
    #[error("world {0} not found")]
    WorldNotFound(WorldId),

    /// The backing source failed.
    #[error("modifier source error: {message}")]
    Backend {
        /// Backend-specific description.
        message: String,
    },
}

/// Source of seasonal modifier sets.
pub trait ModifierResolver: Send + Sync {
    /// Modifiers for the world's current season.
    fn seasonal_modifiers(
        &self,
        world: WorldId,
    ) -> impl Future<Output = Result<SeasonalModifierSet, ModifierError>> + Send;
}

/// Resolve modifiers, degrading an unknown world to the neutral set.
///
/// Backend failures still propagate.
pub async fn resolve_or_neutral<M: ModifierResolver>(
    resolver: &M,
    world: WorldId,
) -> Result<SeasonalModifierSet, ModifierError> {
    match resolver.seasonal_modifiers(world).await {
        Err(ModifierError::WorldNotFound(missing)) => {
            warn!(world_id = %missing, "World not found, using neutral modifiers");
            Ok(SeasonalModifierSet::neutral(
                SeasonalModifierSet::DEFAULT_SEASON,
            ))
        }
        other => other,
    }
}

/// Built-in multipliers for the four seasons, `None` for anything else.
///
/// | Season | wood | food | stone | ore | herbs |
/// |--------|------|------|-------|-----|-------|
/// | spring | 1.0  | 1.2  | 0.9   | 0.9 | 1.3   |
/// | summer | 1.1  | 1.1  | 1.2   | 1.2 | 1.0   |
/// | autumn | 1.2  | 1.0  | 1.1   | 1.0 | 0.8   |
/// | winter | 0.7  | 0.6  | 0.7   | 0.8 | 0.5   |
pub fn season_table(season: &str) -> Option<BTreeMap<String, f64>> {
    let row: [f64; 5] = match season.to_ascii_lowercase().as_str() {
        "spring" => [1.0, 1.2, 0.9, 0.9, 1.3],
        "summer" => [1.1, 1.1, 1.2, 1.2, 1.0],
        "autumn" => [1.2, 1.0, 1.1, 1.0, 0.8],
        "winter" => [0.7, 0.6, 0.7, 0.8, 0.5],
        _ => return None,
    };
    let codes = ["wood", "food", "stone", "ore", "herbs"];
    Some(
        codes
            .iter()
            .zip(row)
            .map(|(code, value)| ((*code).to_owned(), value))
            .collect(),
    )
}

/// In-memory resolver: a season per world plus [`season_table`].
///
/// Clones share the same world table, so a test can change a world's season
/// after handing the resolver to a pipeline.
#[derive(Debug, Clone, Default)]
pub struct StaticModifierResolver {
    worlds: Arc<RwLock<BTreeMap<WorldId, String>>>,
    fallback_season: Option<String>,
}

impl StaticModifierResolver {
    /// A resolver that knows no worlds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver that answers every world with the given season.
    pub fn with_fallback_season(season: impl Into<String>) -> Self {
        Self {
            worlds: Arc::default(),
            fallback_season: Some(season.into()),
        }
    }

    /// Register (or move) a world to a season.
    pub fn set_season(&self, world: WorldId, season: impl Into<String>) {
        self.worlds
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(world, season.into());
    }

    fn season_of(&self, world: WorldId) -> Option<String> {
        self.worlds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&world)
            .cloned()
            .or_else(|| self.fallback_season.clone())
    }
}

impl ModifierResolver for StaticModifierResolver {
    async fn seasonal_modifiers(&self, world: WorldId) -> Result<SeasonalModifierSet, ModifierError> {
        let season = self
            .season_of(world)
            .ok_or(ModifierError::WorldNotFound(world))?;
        let modifiers = season_table(&season).unwrap_or_default();
        Ok(SeasonalModifierSet { season, modifiers })
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use hamlet_types::ResourceCode;

    use super::*;

    #[test]
    fn winter_table_dampens_food() {
        let table = season_table("Winter").unwrap_or_default();
        assert_eq!(table.get("food").copied(), Some(0.6));
        assert_eq!(table.len(), 5);
        assert!(season_table("monsoon").is_none());
    }

    #[tokio::test]
    async fn registered_world_gets_its_season() {
        let resolver = StaticModifierResolver::new();
        let world = WorldId::new();
        resolver.set_season(world, "summer");

        let set = resolver.seasonal_modifiers(world).await.ok();
        assert_eq!(set.as_ref().map(|s| s.season.as_str()), Some("summer"));
        assert_eq!(set.map(|s| s.modifier_for(ResourceCode::Stone)), Some(1.2));
    }

    #[tokio::test]
    async fn unknown_world_falls_back_to_neutral() {
        let resolver = StaticModifierResolver::new();
        let world = WorldId::new();
        assert_eq!(
            resolver.seasonal_modifiers(world).await,
            Err(ModifierError::WorldNotFound(world))
        );

        let set = resolve_or_neutral(&resolver, world).await.ok();
        assert_eq!(set.as_ref().map(|s| s.season.as_str()), Some("spring"));
        assert_eq!(set.map(|s| s.modifiers.is_empty()), Some(true));
    }

    #[tokio::test]
    async fn unknown_season_name_is_neutral() {
        let resolver = StaticModifierResolver::with_fallback_season("monsoon");
        let set = resolver.seasonal_modifiers(WorldId::new()).await.ok();
        assert_eq!(set.map(|s| s.modifier_for(ResourceCode::Wood)), Some(1.0));
    }
}
