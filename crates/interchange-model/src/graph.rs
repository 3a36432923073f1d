//! The mob graph: an arena of mobs indexed by stable identifier.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::mob::{Mob, MobId, MobUsage};

/// All mobs of one container, in insertion order.
///
/// Cross-references between mobs are by [`MobId`] only; resolution happens
/// through explicit lookups with caller-side visited tracking, never
/// through back-pointers, so a cyclic graph stays representable and
/// diagnosable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Mob>", into = "Vec<Mob>")]
pub struct MobGraph {
    mobs: Vec<Mob>,
    index: HashMap<MobId, usize>,
}

impl MobGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mob, returning its id. A mob with a duplicate id replaces the
    /// previous entry's index but both stay in insertion order.
    pub fn add(&mut self, mob: Mob) -> MobId {
        let id = mob.id;
        self.index.insert(id, self.mobs.len());
        self.mobs.push(mob);
        id
    }

    pub fn get(&self, id: MobId) -> Option<&Mob> {
        self.index.get(&id).map(|&i| &self.mobs[i])
    }

    pub fn get_mut(&mut self, id: MobId) -> Option<&mut Mob> {
        self.index.get(&id).map(|&i| &mut self.mobs[i])
    }

    pub fn mobs(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.iter()
    }

    pub fn len(&self) -> usize {
        self.mobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mobs.is_empty()
    }

    pub fn composition_mobs(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.iter().filter(|m| m.is_composition())
    }

    pub fn master_mobs(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.iter().filter(|m| m.is_master())
    }

    /// Composition mobs declared as top-level.
    pub fn top_level(&self) -> impl Iterator<Item = &Mob> {
        self.composition_mobs()
            .filter(|m| m.usage == MobUsage::TopLevel)
    }

    /// The mobs a transcription run should start from.
    ///
    /// Preference order: declared top-level mobs, then any composition
    /// mobs, then master mobs. An empty result means the container holds
    /// nothing transcribable and yields an empty timeline.
    pub fn mobs_for_transcription(&self) -> Vec<&Mob> {
        let top: Vec<&Mob> = self.top_level().collect();
        if !top.is_empty() {
            return top;
        }

        let compositions: Vec<&Mob> = self.composition_mobs().collect();
        if !compositions.is_empty() {
            return compositions;
        }

        self.master_mobs().collect()
    }
}

impl From<Vec<Mob>> for MobGraph {
    fn from(mobs: Vec<Mob>) -> Self {
        let index = mobs.iter().enumerate().map(|(i, m)| (m.id, i)).collect();
        Self { mobs, index }
    }
}

impl From<MobGraph> for Vec<Mob> {
    fn from(graph: MobGraph) -> Vec<Mob> {
        graph.mobs
    }
}
