//! Error types for the `hamlet-production` crate.
//!
//! None of these abort a production cycle. The orchestrator records them on
//! the site (or resource) they concern, logs them, and moves on.

use hamlet_types::{ResourceCode, ResourceSiteId, SiteStage};

/// Per-site or per-resource reasons a yield was not credited.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductionError {
    /// The site's stage has no production-rate entry.
    #[error("no production data for stage {stage} of site {site}")]
    UnknownStage {
        /// The skipped site.
        site: ResourceSiteId,
        /// Its stage.
        stage: SiteStage,
    },

    /// The site is `undiscovered` or `depleted` and never produces.
    #[error("site {site} at stage {stage} does not produce")]
    NotProductive {
        /// The skipped site.
        site: ResourceSiteId,
        /// Its stage.
        stage: SiteStage,
    },

    /// A resource code has no canonical resource-type mapping.
    #[error("resource code {0} has no resource type mapping")]
    UnmappedResource(ResourceCode),
}
