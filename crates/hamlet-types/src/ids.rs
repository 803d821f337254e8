//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Settlements, sites, and ledger rows all carry UUID keys in storage.
//! Wrapping each in its own newtype keeps a site id from being passed where
//! a settlement id is expected. App-side generation uses UUID v7 so rows
//! created by the engine index in creation order.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a persistent game world.
    WorldId
}

define_id! {
    /// Unique identifier for a settlement.
    SettlementId
}

define_id! {
    /// Unique identifier for a map location (area) a settlement sits on.
    LocationId
}

define_id! {
    /// Unique identifier for an exploitable resource site.
    ResourceSiteId
}

define_id! {
    /// Unique identifier for a resource site type (reference data).
    SiteTypeId
}

define_id! {
    /// Canonical identifier of a resource type in the reference table.
    ResourceTypeId
}

define_id! {
    /// Unique identifier for a building inside a settlement.
    BuildingId
}

define_id! {
    /// Unique identifier for a settlement resource ledger row.
    LedgerEntryId
}
