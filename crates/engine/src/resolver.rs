//! Reference-chain resolution through the mob graph.
//!
//! A source clip on a composition slot references a master mob, which
//! references one or more source mobs, which end in raw essence. Each hop
//! carries its own trim. Resolution walks the chain with an explicit
//! visited set (cycles become a dangling result, not a hang), composes
//! offsets by accumulation and extents by interval intersection, and
//! memoizes per referenced slot because one master mob is commonly shared
//! by many composition clips.

use std::collections::{HashMap, HashSet};

use conform_interchange_model::graph::MobGraph;
use conform_interchange_model::mob::{MobId, MobKind};
use conform_interchange_model::segment::Segment;
use conform_timeline_model::time::{Fraction, RationalTime, TimeRange};

/// Why a reference failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DanglingReason {
    MissingMob,
    MissingSlot,
    Cycle,
}

impl std::fmt::Display for DanglingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DanglingReason::MissingMob => write!(f, "referenced mob does not exist"),
            DanglingReason::MissingSlot => write!(f, "referenced slot does not exist"),
            DanglingReason::Cycle => write!(f, "reference chain forms a cycle"),
        }
    }
}

/// A fully resolved reference chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    /// Display name of the resolved master (or terminal) mob.
    pub name: String,

    /// Essence locator, when the terminal source mob describes one.
    pub locator: Option<String>,

    /// Availability of the essence as seen from the referenced slot,
    /// composed through every hop's trim and start timecode. Expressed at
    /// the referenced slot's edit rate.
    pub available: TimeRange,
}

/// Outcome of resolving one reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Source(ResolvedSource),
    Dangling { mob: MobId, reason: DanglingReason },
}

/// One hop of the chain walk.
struct Hop {
    start: i64,
    length: i64,
    rate: Fraction,
    /// Start timecode of the hop's mob, for source mobs only.
    timecode: Option<(i64, i64, Fraction)>,
}

/// Walks and memoizes reference chains for one graph.
///
/// The cache lives for one transcription run; concurrent runs each build
/// their own resolver.
pub struct MobResolver<'g> {
    graph: &'g MobGraph,
    memo: HashMap<(MobId, u32), Resolution>,
}

impl<'g> MobResolver<'g> {
    pub fn new(graph: &'g MobGraph) -> Self {
        Self {
            graph,
            memo: HashMap::new(),
        }
    }

    /// Resolve the chain starting at `(mob, slot)`.
    ///
    /// The returned availability does not include the referencing clip's
    /// own trim; callers compose that on top.
    pub fn resolve(&mut self, mob: MobId, slot: u32) -> Resolution {
        if let Some(cached) = self.memo.get(&(mob, slot)) {
            return cached.clone();
        }
        let resolution = self.walk(mob, slot);
        self.memo.insert((mob, slot), resolution.clone());
        resolution
    }

    fn walk(&self, start_mob: MobId, start_slot: u32) -> Resolution {
        let mut visited: HashSet<MobId> = HashSet::new();
        let mut hops: Vec<Hop> = Vec::new();
        let mut current = (start_mob, start_slot);
        let mut name: Option<String> = None;
        let mut locator: Option<String> = None;

        loop {
            let (mob_id, slot_id) = current;
            let Some(mob) = self.graph.get(mob_id) else {
                return Resolution::Dangling {
                    mob: mob_id,
                    reason: DanglingReason::MissingMob,
                };
            };
            if !visited.insert(mob_id) {
                return Resolution::Dangling {
                    mob: mob_id,
                    reason: DanglingReason::Cycle,
                };
            }
            // The chain is named after its first (master) mob.
            if name.is_none() {
                name = Some(mob.display_name());
            }
            if let MobKind::Source {
                essence: Some(essence),
            } = &mob.kind
            {
                if locator.is_none() {
                    locator = essence.locator.clone();
                }
            }

            let Some(slot) = mob.slot(slot_id) else {
                return Resolution::Dangling {
                    mob: mob_id,
                    reason: DanglingReason::MissingSlot,
                };
            };

            match find_source_clip(slot.components()) {
                Some((next_mob, next_slot, start, length)) => {
                    let timecode = if mob.is_source() {
                        mob.start_timecode()
                            .map(|tc| (tc.start, tc.length, tc.edit_rate))
                    } else {
                        None
                    };
                    hops.push(Hop {
                        start,
                        length,
                        rate: slot.edit_rate,
                        timecode,
                    });
                    current = (next_mob, next_slot);
                }
                None => {
                    // End of the chain: this mob holds the essence extent.
                    let timecode = if mob.is_source() {
                        mob.start_timecode()
                            .map(|tc| (tc.start, tc.length, tc.edit_rate))
                    } else {
                        None
                    };
                    hops.push(Hop {
                        start: 0,
                        length: slot.segment.length(),
                        rate: slot.edit_rate,
                        timecode,
                    });
                    break;
                }
            }
        }

        let available = compose_hops(&hops);
        Resolution::Source(ResolvedSource {
            name: name.unwrap_or_default(),
            locator,
            available,
        })
    }
}

/// Compose hop trims, deepest first: offsets accumulate downward, extents
/// intersect, and a source mob's start timecode shifts and widens its hop.
fn compose_hops(hops: &[Hop]) -> TimeRange {
    let mut inner: Option<TimeRange> = None;

    for hop in hops.iter().rev() {
        let rate = hop.rate;
        let mut start = hop.start;
        let mut length = hop.length;

        if let Some((tc_start, tc_length, tc_rate)) = hop.timecode {
            let tc_start = RationalTime::new(tc_start, tc_rate)
                .rescaled_to_floor(rate)
                .value;
            let tc_length = RationalTime::new(tc_length, tc_rate)
                .rescaled_to_floor(rate)
                .value;
            start += tc_start;
            length = length.max(tc_length);
        }

        let mut range = TimeRange::from_frames(start, length, rate);
        if let Some(inner_range) = inner {
            let inner_start = inner_range.start.rescaled_to_floor(rate);
            range.start = RationalTime::new(range.start.value + inner_start.value, rate);
            range = range.intersect(&inner_range).unwrap_or(TimeRange {
                start: range.start,
                duration: RationalTime::zero(rate),
            });
        }
        inner = Some(range);
    }

    inner.unwrap_or_else(|| TimeRange::from_frames(0, 0, Fraction::from_int(24)))
}

/// First source clip among these components, looking through effect
/// groups and selectors. Returns its (mob, slot, start, length).
fn find_source_clip(components: &[Segment]) -> Option<(MobId, u32, i64, i64)> {
    for component in components {
        match component {
            Segment::SourceClip {
                mob,
                slot,
                start,
                length,
            } => return Some((*mob, *slot, *start, *length)),
            Segment::OperationGroup { inputs, .. } => {
                if let Some(found) = find_source_clip(inputs) {
                    return Some(found);
                }
            }
            Segment::Selector { selected, .. } => {
                if let Some(found) = find_source_clip(std::slice::from_ref(selected)) {
                    return Some(found);
                }
            }
            Segment::Sequence { children } => {
                if let Some(found) = find_source_clip(children) {
                    return Some(found);
                }
            }
            Segment::Filler { .. } | Segment::Transition { .. } | Segment::Timecode { .. } => {}
        }
    }
    None
}
