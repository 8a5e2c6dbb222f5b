//! Persisted elimination records.
//!
//! The on-disk document is a JSON object keyed by space id. Each space maps
//! decimal participant ids to an [EliminationRecord], plus one reserved sibling
//! key ([CHECKPOINTS_KEY]) holding the decay checkpoints already announced:
//!
//! ```json
//! {
//!   "1400583337176862732": {
//!     "17": { "display_name": "alice", "eliminated_by": "bob", "eliminated_at": 1722470400, "reason": "..." },
//!     "_logged_checkpoints": [10, 20]
//!   }
//! }
//! ```
//!
//! Keys with the reserved `_` prefix never count as participants.

use serde::{de::Error as _, Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{btree_map, BTreeMap, BTreeSet};

use crate::{MemberId, SpaceId};

/// Sibling key listing logged decay checkpoints.
pub const CHECKPOINTS_KEY: &str = "_logged_checkpoints";

const RESERVED_PREFIX: char = '_';

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliminationRecord {
    pub display_name: String,
    pub eliminated_by: String,
    /// Unix seconds.
    pub eliminated_at: u64,
    pub reason: String,
}

/// Records and checkpoints for one space.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, Value>"
)]
pub struct SpaceDocument {
    records: BTreeMap<MemberId, EliminationRecord>,
    logged_checkpoints: BTreeSet<u8>,
}

impl SpaceDocument {
    /// True when neither records nor checkpoints are present.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.logged_checkpoints.is_empty()
    }

    /// Number of eliminated participants (the checkpoint key is not counted).
    pub fn eliminated_count(&self) -> usize {
        self.records.len()
    }

    pub fn contains(&self, member: MemberId) -> bool {
        self.records.contains_key(&member)
    }

    pub fn get(&self, member: MemberId) -> Option<&EliminationRecord> {
        self.records.get(&member)
    }

    pub fn insert(&mut self, member: MemberId, record: EliminationRecord) -> Option<EliminationRecord> {
        self.records.insert(member, record)
    }

    pub fn remove(&mut self, member: MemberId) -> Option<EliminationRecord> {
        self.records.remove(&member)
    }

    pub fn records(&self) -> btree_map::Iter<'_, MemberId, EliminationRecord> {
        self.records.iter()
    }

    pub fn checkpoints(&self) -> &BTreeSet<u8> {
        &self.logged_checkpoints
    }

    /// Returns false if the checkpoint was already logged.
    pub fn add_checkpoint(&mut self, pct: u8) -> bool {
        self.logged_checkpoints.insert(pct)
    }
}

impl TryFrom<BTreeMap<String, Value>> for SpaceDocument {
    type Error = serde_json::Error;

    fn try_from(raw: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        let mut doc = SpaceDocument::default();
        for (key, value) in raw {
            if key == CHECKPOINTS_KEY {
                doc.logged_checkpoints = serde_json::from_value(value)?;
                continue;
            }
            if key.starts_with(RESERVED_PREFIX) {
                continue;
            }
            let member = key.parse::<MemberId>().map_err(|err| {
                serde_json::Error::custom(format!("invalid participant key {key:?}: {err}"))
            })?;
            doc.records.insert(member, serde_json::from_value(value)?);
        }
        Ok(doc)
    }
}

impl From<SpaceDocument> for BTreeMap<String, Value> {
    fn from(doc: SpaceDocument) -> Self {
        let mut raw = BTreeMap::new();
        for (member, record) in doc.records {
            raw.insert(
                member.to_string(),
                json!({
                    "display_name": record.display_name,
                    "eliminated_by": record.eliminated_by,
                    "eliminated_at": record.eliminated_at,
                    "reason": record.reason,
                }),
            );
        }
        if !doc.logged_checkpoints.is_empty() {
            let checkpoints: Vec<u8> = doc.logged_checkpoints.into_iter().collect();
            raw.insert(CHECKPOINTS_KEY.to_string(), json!(checkpoints));
        }
        raw
    }
}

/// The whole persisted document, one entry per space.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreDocument {
    spaces: BTreeMap<SpaceId, SpaceDocument>,
}

impl StoreDocument {
    pub fn space(&self, space: SpaceId) -> Option<&SpaceDocument> {
        self.spaces.get(&space)
    }

    pub fn space_mut(&mut self, space: SpaceId) -> &mut SpaceDocument {
        self.spaces.entry(space).or_default()
    }

    pub fn remove_space(&mut self, space: SpaceId) -> Option<SpaceDocument> {
        self.spaces.remove(&space)
    }

    /// Drop the space entry if nothing is left in it.
    pub fn prune(&mut self, space: SpaceId) {
        if self.spaces.get(&space).is_some_and(SpaceDocument::is_empty) {
            self.spaces.remove(&space);
        }
    }

    pub fn spaces(&self) -> btree_map::Iter<'_, SpaceId, SpaceDocument> {
        self.spaces.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }
}
