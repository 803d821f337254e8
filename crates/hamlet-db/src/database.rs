//! Connection pool for the settlement tables.
//!
//! [`HamletDb`] is built from the `infrastructure` section of the worker
//! configuration, applies the schema under `migrations/`, and hands out the
//! two seams the task runner is wired with: a [`PgStore`] for settlement
//! rows and a [`PgModifierResolver`] for seasons. Both share the one pool.

use std::time::Duration;

use hamlet_core::config::InfrastructureConfig;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::info;

use crate::error::DbError;
use crate::seasons::PgModifierResolver;
use crate::store::PgStore;

/// Idle connections are dropped after this long.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Pooled access to the settlement database.
#[derive(Debug, Clone)]
pub struct HamletDb {
    pool: PgPool,
}

impl HamletDb {
    /// Open the pool described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if `postgres_url` cannot be parsed, or
    /// [`DbError::Postgres`] if no connection can be established.
    pub async fn connect(config: &InfrastructureConfig) -> Result<Self, DbError> {
        let options = connect_options(&config.postgres_url)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(IDLE_TIMEOUT)
            .connect_with(options)
            .await?;

        info!(
            max_connections = config.max_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            "Connected to settlement database"
        );
        Ok(Self { pool })
    }

    /// Bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if any migration fails.
    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Settlement schema is up to date");
        Ok(())
    }

    /// Transactional settlement store over this pool.
    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }

    /// Season resolver over this pool.
    pub fn modifier_resolver(&self) -> PgModifierResolver {
        PgModifierResolver::new(self.pool.clone())
    }

    /// The underlying pool, for ad hoc queries.
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Wait for in-flight sessions, then close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Settlement database closed");
    }
}

fn connect_options(url: &str) -> Result<PgConnectOptions, DbError> {
    url.parse()
        .map_err(|e: sqlx::Error| DbError::Config(format!("invalid postgres_url: {e}")))
}
