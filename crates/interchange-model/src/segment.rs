//! Slots, segments, and effect parameter curves.

use serde::{Deserialize, Serialize};

use conform_timeline_model::time::Fraction;

use crate::mob::MobId;

/// Well-known parameter name for the speed offset map of a time warp.
pub const PARAM_SPEED_OFFSET_MAP: &str = "SpeedOffsetMap";

/// Well-known parameter name for a declared constant speed ratio.
pub const PARAM_SPEED_RATIO: &str = "SpeedRatio";

/// Media kind of a slot or segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Picture,
    Sound,
    /// Timecode, edgecode, descriptive data, and anything else carried
    /// through without interpretation.
    Other(String),
}

/// One track-like channel within a mob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Slot identifier, unique within the owning mob.
    pub id: u32,

    pub name: Option<String>,

    pub media_kind: MediaKind,

    /// Frames-per-second denominator for all integer lengths below.
    pub edit_rate: Fraction,

    /// Physical channel number; 1 marks the primary timecode channel.
    pub physical_track: Option<u32>,

    pub segment: Segment,

    pub markers: Vec<SlotMarker>,
}

impl Slot {
    /// The slot's components: sequence children, or the segment itself.
    pub fn components(&self) -> &[Segment] {
        match &self.segment {
            Segment::Sequence { children } => children,
            other => std::slice::from_ref(other),
        }
    }

    /// First component of the given shape, looking through a sequence.
    pub fn find_component<'a>(
        &'a self,
        mut predicate: impl FnMut(&Segment) -> bool,
    ) -> Option<&'a Segment> {
        self.components().iter().find(|s| predicate(s))
    }
}

/// One unit of timeline content within a slot.
///
/// Every transcription step matches this exhaustively; adding a variant is
/// a compile error everywhere a kind decision is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Ordered list of sub-segments.
    Sequence { children: Vec<Segment> },

    /// Reference into another mob's slot, trimmed to `[start, start+length)`.
    SourceClip {
        mob: MobId,
        slot: u32,
        start: i64,
        length: i64,
    },

    /// Empty space.
    Filler { length: i64 },

    /// Overlap between the two neighboring segments in a sequence.
    /// `cut_point` splits the overlap into the part before and after the
    /// editorial cut.
    Transition { length: i64, cut_point: i64 },

    /// An effect wrapping one or more input segments.
    OperationGroup {
        operation: Operation,
        length: i64,
        inputs: Vec<Segment>,
        parameters: Vec<Parameter>,
    },

    /// An editorial choice between alternatives.
    Selector {
        selected: Box<Segment>,
        alternates: Vec<Segment>,
        length: i64,
    },

    /// A timecode channel value.
    Timecode { start: i64, length: i64 },
}

impl Segment {
    /// Declared length in edit-rate units.
    ///
    /// A sequence's length is the sum of its non-transition children: a
    /// transition describes the overlap carved out of its neighbors, not
    /// time of its own.
    pub fn length(&self) -> i64 {
        match self {
            Segment::Sequence { children } => children
                .iter()
                .map(|child| match child {
                    Segment::Transition { .. } => 0,
                    other => other.length(),
                })
                .sum(),
            Segment::SourceClip { length, .. }
            | Segment::Filler { length }
            | Segment::Transition { length, .. }
            | Segment::OperationGroup { length, .. }
            | Segment::Selector { length, .. }
            | Segment::Timecode { length, .. } => *length,
        }
    }

    /// Variant name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Segment::Sequence { .. } => "Sequence",
            Segment::SourceClip { .. } => "SourceClip",
            Segment::Filler { .. } => "Filler",
            Segment::Transition { .. } => "Transition",
            Segment::OperationGroup { .. } => "OperationGroup",
            Segment::Selector { .. } => "Selector",
            Segment::Timecode { .. } => "Timecode",
        }
    }
}

/// Effect identity attached to an operation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,

    /// True for speed/time-warp effects.
    pub is_time_warp: bool,
}

/// A named effect parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

/// Static or keyframed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterValue {
    Constant { value: Fraction },
    Varying {
        interpolation: Interpolation,
        points: Vec<ControlPoint>,
    },
}

impl ParameterValue {
    pub fn as_constant(&self) -> Option<Fraction> {
        match self {
            ParameterValue::Constant { value } => Some(*value),
            ParameterValue::Varying { .. } => None,
        }
    }

    pub fn points(&self) -> &[ControlPoint] {
        match self {
            ParameterValue::Constant { .. } => &[],
            ParameterValue::Varying { points, .. } => points,
        }
    }

    /// Sample the curve at `time`. Only constant and linear interpolation
    /// are sampleable; higher-order curves return `None`, as do queries
    /// outside the control-point span.
    pub fn value_at(&self, time: Fraction) -> Option<Fraction> {
        match self {
            ParameterValue::Constant { value } => Some(*value),
            ParameterValue::Varying {
                interpolation,
                points,
            } => {
                if points.is_empty() {
                    return None;
                }
                match interpolation {
                    Interpolation::Constant => {
                        // step function: last point at or before `time`
                        let mut current = None;
                        for p in points {
                            if p.time <= time {
                                current = Some(p.value);
                            }
                        }
                        current.or(Some(points[0].value))
                    }
                    Interpolation::Linear => {
                        if time < points[0].time || time > points[points.len() - 1].time {
                            return None;
                        }
                        for pair in points.windows(2) {
                            let (a, b) = (&pair[0], &pair[1]);
                            if time >= a.time && time <= b.time {
                                let span = b.time.checked_sub(a.time)?;
                                if span.is_zero() {
                                    return Some(a.value);
                                }
                                let t = time.checked_sub(a.time)?.checked_div(span)?;
                                let delta = b.value.checked_sub(a.value)?;
                                return a.value.checked_add(delta.checked_mul(t)?);
                            }
                        }
                        Some(points[points.len() - 1].value)
                    }
                    Interpolation::Bezier | Interpolation::Cubic => None,
                }
            }
        }
    }
}

/// One keyframe on a varying parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub time: Fraction,
    pub value: Fraction,
}

/// Interpolation shape between control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Constant,
    Linear,
    Bezier,
    Cubic,
}

/// A marker declared on a slot.
///
/// Markers may describe content on a different slot than the one they are
/// declared on; `attached_slot`/`attached_track` carry that association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotMarker {
    /// Position in the slot's edit-rate units.
    pub position: i64,

    /// Marked length; zero-length markers span one unit.
    pub length: i64,

    pub comment: String,

    /// Color by name, when the authoring tool recorded one.
    pub color_name: Option<String>,

    /// 16-bit RGB color, when recorded numerically.
    pub color_rgb: Option<(u16, u16, u16)>,

    /// Slot id of the content this marker describes.
    pub attached_slot: Option<u32>,

    /// Physical track number of the content this marker describes.
    pub attached_track: Option<u32>,
}
