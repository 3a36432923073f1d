//! The write path: timeline tree to mob graph.
//!
//! The inverse of the read path. Each timeline becomes one composition mob
//! with a slot per track plus a primary timecode slot; each clip becomes a
//! source clip referencing a master/source mob chain (memoized per source
//! identity, so media shared by many clips yields one chain); transitions
//! splice their carved overlap back into the neighboring segments; nested
//! stacks become nested composition mobs. Every emitted mob gets a fresh
//! identifier, and each slot's declared length equals the sum of its
//! segment lengths exactly.

use std::collections::HashMap;

use conform_common::diag::{Diagnostic, DiagnosticLog};
use conform_interchange_model::graph::MobGraph;
use conform_interchange_model::mob::{EssenceDescriptor, Mob, MobId, MobKind, MobUsage};
use conform_interchange_model::segment::{
    ControlPoint, Interpolation, MediaKind, Operation, Parameter, ParameterValue, Segment, Slot,
    SlotMarker, PARAM_SPEED_OFFSET_MAP, PARAM_SPEED_RATIO,
};
use conform_timeline_model::item::{Clip, Item, SourceRef, Stack};
use conform_timeline_model::marker::Marker;
use conform_timeline_model::time::{Fraction, RationalTime};
use conform_timeline_model::timeline::{Timeline, Track, TrackKind};

use crate::timemap;

/// Transcribe a timeline into a fresh mob graph.
pub fn transcribe_timeline(timeline: &Timeline) -> (MobGraph, Vec<Diagnostic>) {
    let mut transcriber = TreeTranscriber {
        graph: MobGraph::new(),
        diags: DiagnosticLog::new(),
        sources: HashMap::new(),
    };
    transcriber.composition_mob(
        &timeline.name,
        timeline.global_start,
        &timeline.tracks,
        &timeline.markers,
        MobUsage::TopLevel,
    );
    (transcriber.graph, transcriber.diags.into_entries())
}

struct TreeTranscriber {
    graph: MobGraph,
    diags: DiagnosticLog,
    /// Source identity (locator, else name) to its master mob.
    sources: HashMap<String, MobId>,
}

impl TreeTranscriber {
    fn composition_mob(
        &mut self,
        name: &str,
        global_start: Option<RationalTime>,
        tracks: &[Track],
        markers: &[Marker],
        usage: MobUsage,
    ) -> MobId {
        let mut comp = Mob::new(MobKind::Composition, Some(name.to_string()));
        comp.usage = usage;

        let mut slot_id = 1u32;
        for track in tracks {
            let slot = self.slot_from_track(slot_id, track);
            comp.slots.push(slot);
            slot_id += 1;
        }

        // Timeline-scope markers land on the first content slot.
        if !markers.is_empty() {
            match comp.slots.first_mut() {
                Some(slot) => {
                    let rate = slot.edit_rate;
                    slot.markers
                        .extend(markers.iter().map(|m| slot_marker(m, rate, 0)));
                }
                None => {
                    self.diags.record(Diagnostic::structural(format!(
                        "timeline '{name}' has markers but no tracks to carry them; skipped"
                    )));
                }
            }
        }

        // Primary timecode slot, required by common editorial hosts. Its
        // rate must carry every track's frame boundaries, so mixed-rate
        // tracks get the least common multiple of their rates.
        let tc_rate = match global_start.map(|t| t.rate) {
            Some(rate) => rate,
            None => {
                let combined = tracks.iter().try_fold(None::<Fraction>, |acc, track| {
                    Some(Some(match acc {
                        None => track.rate,
                        Some(rate) => timemap::common_rate(rate, track.rate)?,
                    }))
                });
                match combined {
                    Some(rate) => rate.unwrap_or(Fraction::from_int(24)),
                    None => {
                        let fallback =
                            tracks.first().map(|t| t.rate).unwrap_or(Fraction::from_int(24));
                        self.diags.record(Diagnostic::rate_precision(format!(
                            "track rates cannot be reconciled exactly; timecode slot uses \
                             {fallback}"
                        )));
                        fallback
                    }
                }
            }
        };
        let tc_length = tracks
            .iter()
            .map(|t| t.duration().rescaled_to_floor(tc_rate).value)
            .max()
            .unwrap_or(0);
        comp.slots.push(Slot {
            id: slot_id,
            name: Some("TC".to_string()),
            media_kind: MediaKind::Other("timecode".to_string()),
            edit_rate: tc_rate,
            physical_track: Some(1),
            segment: Segment::Timecode {
                start: global_start.map(|t| t.value).unwrap_or(0),
                length: tc_length,
            },
            markers: Vec::new(),
        });

        self.graph.add(comp)
    }

    fn slot_from_track(&mut self, slot_id: u32, track: &Track) -> Slot {
        let media_kind = match &track.kind {
            TrackKind::Video => MediaKind::Picture,
            TrackKind::Audio => MediaKind::Sound,
            TrackKind::Other(other) => MediaKind::Other(other.clone()),
        };
        let rate = track.rate;

        let mut markers: Vec<SlotMarker> = track
            .markers
            .iter()
            .map(|m| slot_marker(m, rate, 0))
            .collect();

        let starts = track.item_starts();
        let mut children: Vec<Segment> = Vec::new();
        // Frames a just-emitted transition carved from the next item's head.
        let mut head_restore = 0i64;

        for (index, item) in track.items.iter().enumerate() {
            let item_start = starts[index].rescaled_to_floor(rate).value;
            match item {
                Item::Transition(transition) => {
                    let in_frames = transition.in_offset.rescaled_to_floor(rate).value;
                    let out_frames = transition.out_offset.rescaled_to_floor(rate).value;
                    let restored = match children.last_mut() {
                        Some(previous) => extend_tail(previous, out_frames),
                        None => false,
                    };
                    if restored {
                        children.push(Segment::Transition {
                            length: in_frames + out_frames,
                            cut_point: in_frames,
                        });
                        head_restore = in_frames;
                    } else {
                        self.diags.record(Diagnostic::structural(
                            "transition without a preceding segment; emitting filler",
                        ));
                        children.push(Segment::Filler {
                            length: in_frames + out_frames,
                        });
                    }
                }
                Item::Clip(clip) => {
                    for marker in &clip.markers {
                        markers.push(slot_marker(marker, rate, item_start));
                    }
                    children.push(self.clip_segment(clip, &media_kind, rate, head_restore));
                    head_restore = 0;
                }
                Item::Gap(gap) => {
                    for marker in &gap.markers {
                        markers.push(slot_marker(marker, rate, item_start));
                    }
                    let length = gap.duration.rescaled_to_floor(rate).value + head_restore;
                    children.push(Segment::Filler { length });
                    head_restore = 0;
                }
                Item::Stack(stack) => {
                    children.push(self.stack_segment(stack, rate, head_restore));
                    head_restore = 0;
                }
            }
        }

        if head_restore != 0 {
            self.diags.record(Diagnostic::structural(
                "trailing transition had no following item; overlap padded with filler",
            ));
            children.push(Segment::Filler {
                length: head_restore,
            });
        }

        Slot {
            id: slot_id,
            name: if track.name.is_empty() {
                None
            } else {
                Some(track.name.clone())
            },
            media_kind,
            edit_rate: rate,
            physical_track: None,
            segment: Segment::Sequence { children },
            markers,
        }
    }

    fn clip_segment(
        &mut self,
        clip: &Clip,
        media_kind: &MediaKind,
        rate: Fraction,
        head_restore: i64,
    ) -> Segment {
        let (master, master_slot, available_start) =
            self.ensure_source_chain(clip, media_kind, rate);

        let source_start = clip.source_range.start.rescaled_to_floor(rate).value;
        let length = clip.source_range.duration.rescaled_to_floor(rate).value + head_restore;
        let start = source_start - available_start - head_restore;

        let source = Segment::SourceClip {
            mob: master,
            slot: master_slot,
            start,
            length,
        };

        if clip.time_warp.is_some() {
            // Baked maps are a read-side artifact; there is no curve to
            // reconstruct, so the clip goes out at unity speed.
            self.diags.record(Diagnostic::structural(format!(
                "clip '{}' carries a baked time warp which is not re-encoded; \
                 written at unity speed",
                clip.name
            )));
        }

        match clip.time_scale {
            Some(scale) if scale != Fraction::ONE => {
                let end_value = Fraction::from_int(length)
                    .checked_mul(scale)
                    .unwrap_or(Fraction::ZERO);
                let ratio = scale.recip().unwrap_or(Fraction::from_int(length));
                Segment::OperationGroup {
                    operation: Operation {
                        name: "Motion Control".to_string(),
                        is_time_warp: true,
                    },
                    length,
                    inputs: vec![source],
                    parameters: vec![
                        Parameter {
                            name: PARAM_SPEED_OFFSET_MAP.to_string(),
                            value: ParameterValue::Varying {
                                interpolation: Interpolation::Linear,
                                points: vec![
                                    ControlPoint {
                                        time: Fraction::ZERO,
                                        value: Fraction::ZERO,
                                    },
                                    ControlPoint {
                                        time: Fraction::from_int(length),
                                        value: end_value,
                                    },
                                ],
                            },
                        },
                        Parameter {
                            name: PARAM_SPEED_RATIO.to_string(),
                            value: ParameterValue::Constant { value: ratio },
                        },
                    ],
                }
            }
            _ => source,
        }
    }

    fn stack_segment(&mut self, stack: &Stack, rate: Fraction, head_restore: i64) -> Segment {
        let nested = self.composition_mob(
            &stack.name,
            None,
            &stack.tracks,
            &stack.markers,
            MobUsage::LowerLevel,
        );

        let (range_start, range_frames) = match &stack.source_range {
            Some(range) => (
                range.start.rescaled_to_floor(rate).value,
                range.duration.rescaled_to_floor(rate).value,
            ),
            None => (
                0,
                stack
                    .duration()
                    .map(|d| d.rescaled_to_floor(rate).value)
                    .unwrap_or(0),
            ),
        };

        Segment::SourceClip {
            mob: nested,
            slot: 1,
            start: range_start - head_restore,
            length: range_frames + head_restore,
        }
    }

    /// Master/source mob chain for a clip's media, created once per source
    /// identity. Returns the master mob, the slot to reference, and the
    /// availability start used to rebase clip in-points.
    fn ensure_source_chain(
        &mut self,
        clip: &Clip,
        media_kind: &MediaKind,
        rate: Fraction,
    ) -> (MobId, u32, i64) {
        let key = match &clip.source {
            SourceRef::Media {
                url: Some(url), ..
            } => url.clone(),
            SourceRef::Media { name, .. } | SourceRef::Missing { name } => name.clone(),
            SourceRef::Placeholder { mob_id } => mob_id.clone(),
        };

        let (available_start, available_frames) = match &clip.source {
            SourceRef::Media {
                available_range: Some(range),
                ..
            } => (
                range.start.rescaled_to_floor(rate).value,
                range.duration.rescaled_to_floor(rate).value,
            ),
            _ => (
                0,
                clip.source_range.start.rescaled_to_floor(rate).value
                    + clip.source_range.duration.rescaled_to_floor(rate).value,
            ),
        };

        let master_slot = match media_kind {
            MediaKind::Sound => 2,
            _ => 1,
        };

        if let Some(&master) = self.sources.get(&key) {
            self.ensure_master_slot(master, master_slot, media_kind, rate);
            return (master, master_slot, available_start);
        }

        let locator = match &clip.source {
            SourceRef::Media { url, .. } => url.clone(),
            SourceRef::Missing { .. } | SourceRef::Placeholder { .. } => None,
        };

        // Terminal source mob: essence extent plus start timecode.
        let mut source = Mob::new(
            MobKind::Source {
                essence: Some(EssenceDescriptor {
                    locator,
                    sample_rate: rate,
                    length: available_frames,
                }),
            },
            Some(clip.source.name().to_string()),
        );
        source.slots.push(Slot {
            id: 1,
            name: None,
            media_kind: media_kind.clone(),
            edit_rate: rate,
            physical_track: None,
            segment: Segment::Filler {
                length: available_frames,
            },
            markers: Vec::new(),
        });
        if available_start != 0 {
            source.slots.push(Slot {
                id: 2,
                name: Some("TC".to_string()),
                media_kind: MediaKind::Other("timecode".to_string()),
                edit_rate: rate,
                physical_track: Some(1),
                segment: Segment::Timecode {
                    start: available_start,
                    length: available_frames,
                },
                markers: Vec::new(),
            });
        }
        let source_id = self.graph.add(source);

        let mut master = Mob::new(MobKind::Master, Some(clip.source.name().to_string()));
        master.slots.push(Slot {
            id: master_slot,
            name: None,
            media_kind: media_kind.clone(),
            edit_rate: rate,
            physical_track: None,
            segment: Segment::SourceClip {
                mob: source_id,
                slot: 1,
                start: 0,
                length: available_frames,
            },
            markers: Vec::new(),
        });
        let master_id = self.graph.add(master);
        self.sources.insert(key, master_id);
        (master_id, master_slot, available_start)
    }

    /// A master mob referenced from both picture and sound tracks needs a
    /// slot per media kind.
    fn ensure_master_slot(
        &mut self,
        master: MobId,
        slot_id: u32,
        media_kind: &MediaKind,
        rate: Fraction,
    ) {
        let Some(mob) = self.graph.get_mut(master) else {
            return;
        };
        if mob.slot(slot_id).is_some() {
            return;
        }
        let existing = mob.slots.first().and_then(|first| {
            if let Segment::SourceClip {
                mob: source_mob,
                slot: source_slot,
                length,
                ..
            } = first.segment
            {
                Some((source_mob, source_slot, length))
            } else {
                None
            }
        });
        if let Some((source_mob, source_slot, length)) = existing {
            mob.slots.push(Slot {
                id: slot_id,
                name: None,
                media_kind: media_kind.clone(),
                edit_rate: rate,
                physical_track: None,
                segment: Segment::SourceClip {
                    mob: source_mob,
                    slot: source_slot,
                    start: 0,
                    length,
                },
                markers: Vec::new(),
            });
        }
    }
}

/// Extend the last-emitted segment's tail by the overlap a following
/// transition carved out of it. Returns false when the segment cannot
/// absorb the restore.
fn extend_tail(segment: &mut Segment, frames: i64) -> bool {
    match segment {
        Segment::SourceClip { length, .. }
        | Segment::Filler { length }
        | Segment::Selector { length, .. } => {
            *length += frames;
            true
        }
        Segment::OperationGroup { length, inputs, .. } => {
            *length += frames;
            if let Some(first) = inputs.first_mut() {
                extend_tail(first, frames);
            }
            true
        }
        Segment::Transition { .. } | Segment::Timecode { .. } | Segment::Sequence { .. } => false,
    }
}

fn slot_marker(marker: &Marker, rate: Fraction, offset: i64) -> SlotMarker {
    SlotMarker {
        position: marker.position.rescaled_to_floor(rate).value + offset,
        length: marker.duration.rescaled_to_floor(rate).value.max(1),
        comment: marker.name.clone(),
        color_name: Some(marker.color.name().to_string()),
        color_rgb: None,
        attached_slot: None,
        attached_track: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_timeline_model::item::{Gap, Transition};
    use conform_timeline_model::time::TimeRange;

    fn fr(num: i64, den: i64) -> Fraction {
        Fraction::new(num, den).unwrap()
    }

    fn media_clip(name: &str, start: i64, frames: i64, rate: Fraction) -> Clip {
        Clip::new(
            name,
            SourceRef::Media {
                name: name.to_string(),
                url: Some(format!("file:///media/{name}.mov")),
                available_range: Some(TimeRange::from_frames(0, 240, rate)),
            },
            TimeRange::from_frames(start, frames, rate),
        )
    }

    fn video_track(items: Vec<Item>, rate: Fraction) -> Track {
        let mut track = Track::new("V1", TrackKind::Video, rate);
        track.items = items;
        track
    }

    #[test]
    fn test_slot_length_matches_track_duration() {
        let rate = fr(24, 1);
        let mut timeline = Timeline::new("cut");
        timeline.tracks.push(video_track(
            vec![
                Item::Clip(media_clip("a", 0, 24, rate)),
                Item::Gap(Gap::new(RationalTime::new(12, rate))),
                Item::Clip(media_clip("b", 0, 48, rate)),
            ],
            rate,
        ));

        let (graph, diags) = transcribe_timeline(&timeline);
        assert!(diags.is_empty());

        let comp = graph.top_level().next().expect("top-level composition");
        // one track slot plus the timecode slot
        assert_eq!(comp.slots.len(), 2);
        assert_eq!(comp.slots[0].segment.length(), 84);
    }

    #[test]
    fn test_every_mob_is_fresh_and_masters_are_shared() {
        let rate = fr(24, 1);
        let mut timeline = Timeline::new("cut");
        timeline.tracks.push(video_track(
            vec![
                Item::Clip(media_clip("a", 0, 24, rate)),
                Item::Clip(media_clip("a", 24, 24, rate)),
                Item::Clip(media_clip("b", 0, 24, rate)),
            ],
            rate,
        ));

        let (graph, _) = transcribe_timeline(&timeline);
        // composition + 2 masters + 2 sources
        assert_eq!(graph.len(), 5);
        assert_eq!(graph.master_mobs().count(), 2);

        let mut ids: Vec<MobId> = graph.mobs().map(|m| m.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_transition_splices_overlap_back() {
        let rate = fr(24, 1);
        let mut timeline = Timeline::new("cut");
        timeline.tracks.push(video_track(
            vec![
                Item::Clip(media_clip("a", 0, 18, rate)),
                Item::Transition(Transition {
                    name: String::new(),
                    in_offset: RationalTime::new(6, rate),
                    out_offset: RationalTime::new(6, rate),
                }),
                Item::Clip(media_clip("b", 30, 18, rate)),
            ],
            rate,
        ));

        let (graph, diags) = transcribe_timeline(&timeline);
        assert!(diags.is_empty());

        let comp = graph.top_level().next().expect("top-level composition");
        let Segment::Sequence { children } = &comp.slots[0].segment else {
            panic!("expected sequence slot");
        };
        assert_eq!(children.len(), 3);

        let Segment::SourceClip { length: first, .. } = &children[0] else {
            panic!("expected leading source clip");
        };
        let Segment::Transition { length, cut_point } = &children[1] else {
            panic!("expected transition");
        };
        let Segment::SourceClip {
            start: second_start,
            length: second,
            ..
        } = &children[2]
        else {
            panic!("expected trailing source clip");
        };

        assert_eq!(*first, 24);
        assert_eq!(*length, 12);
        assert_eq!(*cut_point, 6);
        assert_eq!(*second_start, 24);
        assert_eq!(*second, 24);
        // slot length equals the original combined clip lengths
        assert_eq!(comp.slots[0].segment.length(), 48);
    }

    #[test]
    fn test_stack_becomes_nested_composition() {
        let rate = fr(24, 1);
        let mut inner = Stack::new("insert");
        inner
            .tracks
            .push(video_track(vec![Item::Clip(media_clip("a", 0, 48, rate))], rate));

        let mut timeline = Timeline::new("cut");
        timeline
            .tracks
            .push(video_track(vec![Item::Stack(inner)], rate));

        let (graph, _) = transcribe_timeline(&timeline);
        assert_eq!(graph.composition_mobs().count(), 2);
        assert_eq!(graph.top_level().count(), 1);

        let top = graph.top_level().next().expect("top-level composition");
        let Segment::Sequence { children } = &top.slots[0].segment else {
            panic!("expected sequence slot");
        };
        let Segment::SourceClip { mob, .. } = &children[0] else {
            panic!("expected nested reference");
        };
        let nested = graph.get(*mob).expect("nested composition exists");
        assert!(nested.is_composition());
        assert_eq!(nested.usage, MobUsage::LowerLevel);
    }

    #[test]
    fn test_linear_speed_written_as_two_point_curve() {
        let rate = fr(24, 1);
        let mut clip = media_clip("a", 0, 24, rate);
        clip.time_scale = Some(fr(2, 1));

        let mut timeline = Timeline::new("cut");
        timeline
            .tracks
            .push(video_track(vec![Item::Clip(clip)], rate));

        let (graph, diags) = transcribe_timeline(&timeline);
        assert!(diags.is_empty());

        let comp = graph.top_level().next().expect("top-level composition");
        let Segment::Sequence { children } = &comp.slots[0].segment else {
            panic!("expected sequence slot");
        };
        let Segment::OperationGroup {
            operation,
            length,
            parameters,
            ..
        } = &children[0]
        else {
            panic!("expected warp group");
        };
        assert!(operation.is_time_warp);
        assert_eq!(*length, 24);

        let map = parameters
            .iter()
            .find(|p| p.name == PARAM_SPEED_OFFSET_MAP)
            .expect("offset map present");
        let points = map.value.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].time, Fraction::from_int(24));
        assert_eq!(points[1].value, Fraction::from_int(48));
    }

    #[test]
    fn test_baked_warp_dropped_with_diagnostic() {
        let rate = fr(24, 1);
        let mut clip = media_clip("a", 0, 24, rate);
        clip.time_warp = Some(vec![0; 24]);

        let mut timeline = Timeline::new("cut");
        timeline
            .tracks
            .push(video_track(vec![Item::Clip(clip)], rate));

        let (graph, diags) = transcribe_timeline(&timeline);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, conform_common::diag::DiagnosticKind::Structural);

        let comp = graph.top_level().next().expect("top-level composition");
        let Segment::Sequence { children } = &comp.slots[0].segment else {
            panic!("expected sequence slot");
        };
        assert!(matches!(children[0], Segment::SourceClip { .. }));
    }

    #[test]
    fn test_mixed_rate_tracks_get_lcm_timecode_rate() {
        let mut timeline = Timeline::new("cut");
        timeline.tracks.push(video_track(
            vec![Item::Clip(media_clip("a", 0, 24, fr(24, 1)))],
            fr(24, 1),
        ));
        let mut audio = Track::new("A1", TrackKind::Audio, fr(30, 1));
        audio
            .items
            .push(Item::Clip(media_clip("a", 0, 30, fr(30, 1))));
        timeline.tracks.push(audio);

        let (graph, diags) = transcribe_timeline(&timeline);
        assert!(diags.is_empty());

        let comp = graph.top_level().next().expect("top-level composition");
        let tc = comp
            .slots
            .iter()
            .find(|s| s.physical_track == Some(1))
            .expect("timecode slot");
        assert_eq!(tc.edit_rate, fr(120, 1));
        // both one-second tracks land on 120 frames exactly
        assert!(matches!(tc.segment, Segment::Timecode { length: 120, .. }));
    }

    #[test]
    fn test_timecode_slot_carries_global_start() {
        let rate = fr(24, 1);
        let mut timeline = Timeline::new("cut");
        timeline.global_start = Some(RationalTime::new(86400, rate));
        timeline.tracks.push(video_track(
            vec![Item::Clip(media_clip("a", 0, 48, rate))],
            rate,
        ));

        let (graph, _) = transcribe_timeline(&timeline);
        let comp = graph.top_level().next().expect("top-level composition");
        let tc = comp
            .slots
            .iter()
            .find(|s| s.physical_track == Some(1))
            .expect("timecode slot");
        assert!(matches!(
            tc.segment,
            Segment::Timecode {
                start: 86400,
                length: 48
            }
        ));
    }
}
