//! Items placed on a track: clips, gaps, transitions, and nested stacks.

use serde::{Deserialize, Serialize};

use crate::marker::Marker;
use crate::time::{Fraction, RationalTime, TimeRange};
use crate::timeline::Track;

/// What a clip ultimately plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRef {
    /// Resolved essence with an optional locator URL.
    Media {
        name: String,
        url: Option<String>,
        available_range: Option<TimeRange>,
    },

    /// A source that resolved but carries no essence locator.
    Missing { name: String },

    /// An opaque stand-in for a dangling or cyclic reference.
    Placeholder { mob_id: String },
}

impl SourceRef {
    pub fn name(&self) -> &str {
        match self {
            SourceRef::Media { name, .. } | SourceRef::Missing { name } => name,
            SourceRef::Placeholder { mob_id } => mob_id,
        }
    }
}

/// A trimmed region of source media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,

    pub source: SourceRef,

    /// The trimmed range of the source that plays.
    pub source_range: TimeRange,

    /// Constant playback speed: source duration over played duration.
    /// `None` means 1.0. `Some(0)` is a freeze frame.
    pub time_scale: Option<Fraction>,

    /// Baked per-output-frame source frame indices for non-linear warps.
    /// Present only when baking was requested on read; never re-encoded
    /// on write.
    pub time_warp: Option<Vec<i64>>,

    pub markers: Vec<Marker>,
}

impl Clip {
    pub fn new(name: impl Into<String>, source: SourceRef, source_range: TimeRange) -> Self {
        Self {
            name: name.into(),
            source,
            source_range,
            time_scale: None,
            time_warp: None,
            markers: Vec::new(),
        }
    }

    pub fn duration(&self) -> RationalTime {
        self.source_range.duration
    }
}

/// Empty space of a fixed duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub duration: RationalTime,
    pub markers: Vec<Marker>,
}

impl Gap {
    pub fn new(duration: RationalTime) -> Self {
        Self {
            duration,
            markers: Vec::new(),
        }
    }
}

/// A cross-dissolve style overlap between two adjacent items.
///
/// The overlap is carved out of the neighbors: `in_offset` was removed
/// from the head of the following item, `out_offset` from the tail of the
/// preceding one, so a transition occupies `in_offset + out_offset` of
/// track time that its neighbors no longer claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub name: String,
    pub in_offset: RationalTime,
    pub out_offset: RationalTime,
}

impl Transition {
    pub fn duration(&self) -> RationalTime {
        RationalTime::new(
            self.in_offset.value + self.out_offset.rescaled_to_floor(self.in_offset.rate).value,
            self.in_offset.rate,
        )
    }
}

/// A nested set of parallel tracks, used for nested compositions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,

    /// Trimmed view into the nested content, when the referencing clip
    /// plays only part of it.
    pub source_range: Option<TimeRange>,

    pub tracks: Vec<Track>,
    pub markers: Vec<Marker>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_range: None,
            tracks: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Played duration: the trimmed range when set, else the longest track.
    pub fn duration(&self) -> Option<RationalTime> {
        if let Some(range) = &self.source_range {
            return Some(range.duration);
        }
        self.tracks
            .iter()
            .map(|t| t.duration())
            .max_by(|a, b| a.cmp(b))
    }
}

/// One element of a track, exhaustively matched at every transcription step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    Clip(Clip),
    Gap(Gap),
    Transition(Transition),
    Stack(Stack),
}

impl Item {
    /// Track time this item occupies. Transitions occupy the overlap they
    /// carved from their neighbors.
    pub fn duration(&self) -> RationalTime {
        match self {
            Item::Clip(clip) => clip.duration(),
            Item::Gap(gap) => gap.duration,
            Item::Transition(transition) => transition.duration(),
            Item::Stack(stack) => stack
                .duration()
                .unwrap_or_else(|| RationalTime::zero(Fraction::from_int(1))),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Item::Clip(clip) => &clip.name,
            Item::Gap(_) => "",
            Item::Transition(transition) => &transition.name,
            Item::Stack(stack) => &stack.name,
        }
    }

    /// Mutable marker list, for items that can carry markers.
    pub fn markers_mut(&mut self) -> Option<&mut Vec<Marker>> {
        match self {
            Item::Clip(clip) => Some(&mut clip.markers),
            Item::Gap(gap) => Some(&mut gap.markers),
            Item::Stack(stack) => Some(&mut stack.markers),
            Item::Transition(_) => None,
        }
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, Item::Transition(_))
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Item::Gap(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fr(num: i64, den: i64) -> Fraction {
        Fraction::new(num, den).unwrap()
    }

    #[test]
    fn test_clip_duration_is_trimmed_range() {
        let rate = fr(24, 1);
        let clip = Clip::new(
            "shot_010",
            SourceRef::Missing {
                name: "shot_010".into(),
            },
            TimeRange::from_frames(10, 48, rate),
        );
        assert_eq!(clip.duration().value, 48);
    }

    #[test]
    fn test_transition_duration_sums_offsets() {
        let rate = fr(24, 1);
        let t = Transition {
            name: "dissolve".into(),
            in_offset: RationalTime::new(6, rate),
            out_offset: RationalTime::new(6, rate),
        };
        assert_eq!(t.duration().value, 12);
    }

    #[test]
    fn test_item_serde_is_tagged() {
        let gap = Item::Gap(Gap::new(RationalTime::new(12, fr(24, 1))));
        let json = serde_json::to_string(&gap).unwrap();
        assert!(json.contains("\"type\":\"gap\""));
        let parsed: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, gap);
    }
}
