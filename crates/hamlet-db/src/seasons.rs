//! Seasonal modifiers read from the `worlds` and `seasons` tables.

use std::collections::BTreeMap;

use hamlet_core::modifiers::season_table;
use hamlet_core::{ModifierError, ModifierResolver};
use hamlet_types::{SeasonalModifierSet, WorldId};
use sqlx::PgPool;
use sqlx::types::Json;

#[derive(Debug, sqlx::FromRow)]
struct SeasonRow {
    season: String,
    resource_modifiers: Option<Json<BTreeMap<String, f64>>>,
}

/// [`ModifierResolver`] backed by `PostgreSQL`.
///
/// A world with no `current_season` is in spring. A season with no row in
/// `seasons` falls back to the built-in table, and a name unknown to both
/// yields an empty (all 1.0) modifier set.
#[derive(Debug, Clone)]
pub struct PgModifierResolver {
    pool: PgPool,
}

impl PgModifierResolver {
    /// Wrap a pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ModifierResolver for PgModifierResolver {
    async fn seasonal_modifiers(&self, world: WorldId) -> Result<SeasonalModifierSet, ModifierError> {
        let row = sqlx::query_as::<_, SeasonRow>(
            "SELECT COALESCE(w.current_season, $2) AS season, s.resource_modifiers
             FROM worlds w
             LEFT JOIN seasons s ON s.name = COALESCE(w.current_season, $2)
             WHERE w.id = $1",
        )
        .bind(world.into_inner())
        .bind(SeasonalModifierSet::DEFAULT_SEASON)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ModifierError::Backend {
            message: e.to_string(),
        })?;

        let Some(row) = row else {
            return Err(ModifierError::WorldNotFound(world));
        };

        let modifiers = match row.resource_modifiers {
            Some(Json(modifiers)) => modifiers,
            None => season_table(&row.season).unwrap_or_default(),
        };
        tracing::debug!(world_id = %world, season = %row.season, "Resolved seasonal modifiers");
        Ok(SeasonalModifierSet {
            season: row.season,
            modifiers,
        })
    }
}
