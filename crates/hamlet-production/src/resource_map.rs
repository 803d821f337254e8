//! Translation from short resource codes to canonical resource-type ids.
//!
//! The rate table speaks in [`ResourceCode`]s; the ledger is keyed by the
//! resource-type ids of the reference table. The default mapping carries the
//! ids seeded into that table. Deployments can override or drop entries
//! through configuration; a dropped code is then skipped at credit time.

use std::collections::BTreeMap;

use hamlet_types::{ResourceCode, ResourceTypeId};
use uuid::Uuid;

/// Seeded resource-type ids, one per resource code.
const CANONICAL_IDS: [(ResourceCode, u128); 8] = [
    (ResourceCode::Iron, 0x6e7e_41a9_c3f6_4723_b510_50bd_9f53_7b8a),
    (ResourceCode::Gold, 0xaa09_429d_4df0_4834_a503_b265_3e5a_52bd),
    (ResourceCode::Stone, 0xba00_9e21_4bbd_4998_ad15_e7cb_32a1_9636),
    (ResourceCode::Wood, 0xc4aa_2349_409f_4107_ac8a_7133_1e5f_9e92),
    (ResourceCode::Herbs, 0x51c2_1030_d6f4_42c4_b63f_343d_11a8_18f5),
    (ResourceCode::Fish, 0xad4b_90c1_2e0d_4c1e_9beb_84cf_c18f_8f5b),
    (ResourceCode::Food, 0x7bf0_d22e_cdef_4ecc_aff6_33ae_9c47_f21e),
    (ResourceCode::Water, 0xfc5a_66f8_4faa_43ad_a20f_9e38_6afa_b6b1),
];

/// Resource code to canonical resource-type id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeMap {
    ids: BTreeMap<ResourceCode, ResourceTypeId>,
}

impl ResourceTypeMap {
    /// The seeded mapping covering every [`ResourceCode`].
    pub fn canonical() -> Self {
        let ids = CANONICAL_IDS
            .iter()
            .map(|&(code, raw)| (code, ResourceTypeId(Uuid::from_u128(raw))))
            .collect();
        Self { ids }
    }

    /// Map (or remap) a code to an id.
    #[must_use]
    pub fn with(mut self, code: ResourceCode, id: ResourceTypeId) -> Self {
        self.ids.insert(code, id);
        self
    }

    /// Remove a code from the mapping.
    #[must_use]
    pub fn without(mut self, code: ResourceCode) -> Self {
        self.ids.remove(&code);
        self
    }

    /// Resolve a code to its resource-type id.
    pub fn resolve(&self, code: ResourceCode) -> Option<ResourceTypeId> {
        self.ids.get(&code).copied()
    }

    /// Reverse lookup: which code maps to this id.
    pub fn code_for(&self, id: ResourceTypeId) -> Option<ResourceCode> {
        self.ids
            .iter()
            .find_map(|(code, mapped)| (*mapped == id).then_some(*code))
    }
}

impl Default for ResourceTypeMap {
    fn default() -> Self {
        Self::canonical()
    }
}
