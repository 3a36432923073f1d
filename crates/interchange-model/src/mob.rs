//! Mobs: the nodes of the interchange graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use conform_timeline_model::time::Fraction;

use crate::segment::{MediaKind, Segment, Slot};

/// Stable unique mob identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MobId(Uuid);

impl MobId {
    /// Generate a fresh identifier.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for MobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Role of a mob in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MobKind {
    /// An edited sequence.
    Composition,

    /// Renders a source through an effect chain.
    Master,

    /// References raw essence, or another mob one level down.
    Source {
        /// Description of the underlying media, when this mob is the end
        /// of a reference chain.
        essence: Option<EssenceDescriptor>,
    },
}

/// Declared usage of a mob within the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MobUsage {
    TopLevel,
    LowerLevel,
    SubClip,
    #[default]
    Unspecified,
}

/// Description of raw essence referenced by a source mob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EssenceDescriptor {
    /// Locator URL for the media file, when known.
    pub locator: Option<String>,

    /// Native sample rate of the essence.
    pub sample_rate: Fraction,

    /// Essence length in sample-rate units.
    pub length: i64,
}

/// A node in the interchange graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mob {
    pub id: MobId,
    pub name: Option<String>,
    pub kind: MobKind,
    #[serde(default)]
    pub usage: MobUsage,
    pub created_at: DateTime<Utc>,
    pub slots: Vec<Slot>,
}

impl Mob {
    /// Create a mob with a fresh identifier and no slots.
    pub fn new(kind: MobKind, name: Option<String>) -> Self {
        Self {
            id: MobId::fresh(),
            name,
            kind,
            usage: MobUsage::Unspecified,
            created_at: Utc::now(),
            slots: Vec::new(),
        }
    }

    /// Name for display and diagnostics, falling back to the id.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    pub fn is_composition(&self) -> bool {
        matches!(self.kind, MobKind::Composition)
    }

    pub fn is_master(&self) -> bool {
        matches!(self.kind, MobKind::Master)
    }

    pub fn is_source(&self) -> bool {
        matches!(self.kind, MobKind::Source { .. })
    }

    pub fn slot(&self, slot_id: u32) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }

    /// Timeline slots in presentation order: picture before sound,
    /// preserving relative order within each kind.
    pub fn ordered_media_slots(&self) -> Vec<&Slot> {
        let mut ordered: Vec<&Slot> = Vec::with_capacity(self.slots.len());
        ordered.extend(
            self.slots
                .iter()
                .filter(|s| s.media_kind == MediaKind::Picture),
        );
        ordered.extend(
            self.slots
                .iter()
                .filter(|s| s.media_kind == MediaKind::Sound),
        );
        ordered
    }

    /// Start timecode from the primary timecode channel, if present.
    ///
    /// The primary channel is the slot with physical track number 1 whose
    /// components include a timecode segment.
    pub fn start_timecode(&self) -> Option<TimecodeSpan> {
        for slot in &self.slots {
            if slot.physical_track != Some(1) {
                continue;
            }
            let timecode = slot.find_component(|s| matches!(s, Segment::Timecode { .. }));
            if let Some(Segment::Timecode { start, length }) = timecode {
                return Some(TimecodeSpan {
                    start: *start,
                    length: *length,
                    edit_rate: slot.edit_rate,
                });
            }
        }
        None
    }
}

/// Start timecode of a mob, in its declaring slot's edit rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimecodeSpan {
    pub start: i64,
    pub length: i64,
    pub edit_rate: Fraction,
}
