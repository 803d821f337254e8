//! Error types for the worker binary.

/// Top-level error for the worker.
///
/// Only startup can fail: once the cycle loop runs, per-settlement failures
/// are reported inside each batch and never stop the worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hamlet_core::ConfigError,
    },

    /// Database connection or migration failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying data layer error.
        #[from]
        source: hamlet_db::DbError,
    },

    /// The logging subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
