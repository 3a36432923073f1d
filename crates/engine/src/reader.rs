//! The read path: mob graph to timeline tree.
//!
//! One composition mob becomes one timeline. Each timeline slot becomes a
//! track (picture before sound, relative order preserved); each slot's
//! segments become clips, gaps, transitions, or nested stacks. Per-item
//! failures substitute an equal-length gap and a diagnostic so a single
//! malformed segment never aborts the mob.

use std::collections::HashMap;

use conform_common::diag::{Diagnostic, DiagnosticLog};
use conform_interchange_model::graph::MobGraph;
use conform_interchange_model::mob::{Mob, MobId};
use conform_interchange_model::segment::{MediaKind, Segment, Slot, SlotMarker};
use conform_timeline_model::item::{Clip, Gap, Item, SourceRef, Stack, Transition};
use conform_timeline_model::marker::{Marker, MarkerColor};
use conform_timeline_model::time::{Fraction, RationalTime, TimeRange};
use conform_timeline_model::timeline::{Timeline, Track, TrackKind};

use crate::options::{ReadOptions, Transcription};
use crate::resolver::{MobResolver, Resolution};
use crate::simplify;
use crate::speed::{self, SpeedRamp};
use crate::timemap;

/// Transcribe a mob graph into a timeline.
pub fn transcribe_graph(graph: &MobGraph, options: &ReadOptions) -> Transcription {
    let mut transcriber = GraphTranscriber {
        graph,
        options,
        resolver: MobResolver::new(graph),
        diags: DiagnosticLog::new(),
        visiting: Vec::new(),
        current_kind: TrackKind::Video,
    };

    let mobs = graph.mobs_for_transcription();
    let mut timeline = match mobs.split_first() {
        None => Timeline::new(""),
        Some((first, rest)) => {
            if !rest.is_empty() {
                transcriber.diags.record(Diagnostic::structural(format!(
                    "container holds {} additional top-level mobs; transcribing '{}' only",
                    rest.len(),
                    first.display_name()
                )));
            }
            transcriber.composition_timeline(first)
        }
    };

    if options.simplify {
        simplify::simplify_timeline(&mut timeline);
    }

    Transcription {
        timeline,
        diagnostics: transcriber.diags.into_entries(),
    }
}

struct GraphTranscriber<'g> {
    graph: &'g MobGraph,
    options: &'g ReadOptions,
    resolver: MobResolver<'g>,
    diags: DiagnosticLog,
    /// Composition mobs on the current recursion path, for cycle detection
    /// of nested composition references.
    visiting: Vec<MobId>,
    /// Media kind of the slot currently being transcribed.
    current_kind: TrackKind,
}

impl<'g> GraphTranscriber<'g> {
    fn trace(&self, message: impl FnOnce() -> String) {
        if self.options.transcribe_log {
            tracing::debug!(target: "conform::transcribe", "{}", message());
        }
    }

    /// One composition mob becomes one timeline.
    fn composition_timeline(&mut self, mob: &Mob) -> Timeline {
        self.trace(|| format!("timeline from composition '{}'", mob.display_name()));

        let mut timeline = Timeline::new(mob.display_name());
        timeline.global_start = mob
            .start_timecode()
            .map(|tc| RationalTime::new(tc.start, tc.edit_rate));

        let mut slot_to_track: HashMap<u32, usize> = HashMap::new();
        let mut physical_to_track: HashMap<u32, usize> = HashMap::new();
        let mut pending_markers: Vec<(usize, Fraction, SlotMarker)> = Vec::new();

        for slot in mob.ordered_media_slots() {
            let track_index = timeline.tracks.len();
            let track = self.track_from_slot(slot);
            slot_to_track.insert(slot.id, track_index);
            if let Some(physical) = slot.physical_track {
                physical_to_track.entry(physical).or_insert(track_index);
            }
            for marker in &slot.markers {
                pending_markers.push((track_index, slot.edit_rate, marker.clone()));
            }
            timeline.tracks.push(track);
        }

        self.place_markers(
            &mut timeline,
            &slot_to_track,
            &physical_to_track,
            pending_markers,
        );
        timeline
    }

    fn track_from_slot(&mut self, slot: &Slot) -> Track {
        let kind = match &slot.media_kind {
            MediaKind::Picture => TrackKind::Video,
            MediaKind::Sound => TrackKind::Audio,
            MediaKind::Other(other) => TrackKind::Other(other.clone()),
        };
        let rate = slot.edit_rate;
        self.current_kind = kind.clone();
        let mut track = Track::new(slot.name.clone().unwrap_or_default(), kind, rate);

        // A slot-level effect group that is not a time warp wraps the whole
        // sequence (e.g. a channel-level gain); descend to its content.
        let mut segment = &slot.segment;
        while let Segment::OperationGroup {
            operation,
            inputs,
            ..
        } = segment
        {
            if operation.is_time_warp || inputs.len() != 1 {
                break;
            }
            self.diags.record(Diagnostic::structural(format!(
                "slot {} effect '{}' has no counterpart; transcribing its input",
                slot.id, operation.name
            )));
            segment = &inputs[0];
        }

        let components = match segment {
            Segment::Sequence { children } => children.as_slice(),
            other => std::slice::from_ref(other),
        };
        track.items = self.items_from_components(components, rate);
        carve_transitions(&mut track.items, rate, &mut self.diags);
        track
    }

    fn items_from_components(&mut self, components: &[Segment], rate: Fraction) -> Vec<Item> {
        let mut items = Vec::with_capacity(components.len());
        for component in components {
            match component {
                // A sequence nested directly in a sequence is a grouping
                // artifact; inline its children.
                Segment::Sequence { children } => {
                    items.extend(self.items_from_components(children, rate));
                }
                other => {
                    if let Some(item) = self.item_from_segment(other, rate) {
                        items.push(item);
                    }
                }
            }
        }
        items
    }

    fn item_from_segment(&mut self, segment: &Segment, rate: Fraction) -> Option<Item> {
        match segment {
            Segment::Timecode { .. } => None,

            Segment::Filler { length } => {
                self.trace(|| format!("gap of {length}"));
                Some(Item::Gap(Gap::new(RationalTime::new(*length, rate))))
            }

            Segment::SourceClip {
                mob,
                slot,
                start,
                length,
            } => Some(self.clip_or_stack(*mob, *slot, *start, *length, rate)),

            Segment::Transition { length, cut_point } => {
                if *cut_point < 0 || *cut_point > *length || *length < 0 {
                    self.diags.record(Diagnostic::structural(format!(
                        "transition cut point {cut_point} outside its length {length}; substituting gap"
                    )));
                    return Some(Item::Gap(Gap::new(RationalTime::new(
                        (*length).max(0),
                        rate,
                    ))));
                }
                self.trace(|| format!("transition of {length} cut at {cut_point}"));
                Some(Item::Transition(Transition {
                    name: String::new(),
                    in_offset: RationalTime::new(*cut_point, rate),
                    out_offset: RationalTime::new(length - cut_point, rate),
                }))
            }

            Segment::OperationGroup {
                operation,
                length,
                inputs,
                parameters,
            } => {
                let Some(input) = inputs.first() else {
                    self.diags.record(Diagnostic::structural(format!(
                        "effect '{}' wraps no input; substituting gap of {length}",
                        operation.name
                    )));
                    return Some(Item::Gap(Gap::new(RationalTime::new(*length, rate))));
                };

                let Some(inner) = self.item_from_segment(input, rate) else {
                    self.diags.record(Diagnostic::structural(format!(
                        "effect '{}' wraps untranscribable content; substituting gap of {length}",
                        operation.name
                    )));
                    return Some(Item::Gap(Gap::new(RationalTime::new(*length, rate))));
                };

                if !operation.is_time_warp {
                    self.diags.record(Diagnostic::structural(format!(
                        "effect '{}' has no counterpart; transcribing its input",
                        operation.name
                    )));
                    return Some(inner);
                }

                let Item::Clip(mut clip) = inner else {
                    self.diags.record(Diagnostic::structural(format!(
                        "time warp '{}' wraps a {}; effect dropped",
                        operation.name,
                        input.kind_name()
                    )));
                    return Some(inner);
                };

                match speed::classify(parameters, *length, self.options.bake_keyframed_properties)
                {
                    SpeedRamp::Unity => {}
                    SpeedRamp::Linear(scale) => {
                        if scale != Fraction::ONE {
                            clip.time_scale = Some(scale);
                        }
                    }
                    SpeedRamp::Baked(map) => clip.time_warp = Some(map),
                    SpeedRamp::Unsupported { reason } => {
                        self.diags.record(Diagnostic::structural(format!(
                            "time warp '{}' dropped, clip kept at unity speed: {reason}",
                            operation.name
                        )));
                    }
                }

                // The group's declared length is the played duration.
                clip.source_range.duration = RationalTime::new(*length, rate);
                Some(Item::Clip(clip))
            }

            Segment::Selector {
                selected,
                alternates,
                length,
            } => {
                // A filler in the selected branch marks a muted clip; the
                // single alternate carries the content.
                if matches!(**selected, Segment::Filler { .. }) {
                    if alternates.len() != 1 {
                        self.diags.record(Diagnostic::structural(format!(
                            "muted selector has {} alternates instead of one; substituting gap",
                            alternates.len()
                        )));
                        return Some(Item::Gap(Gap::new(RationalTime::new(*length, rate))));
                    }
                    self.diags.record(Diagnostic::structural(
                        "selector is muted; transcribing its alternate as enabled content",
                    ));
                    return self.item_from_segment(&alternates[0], rate);
                }
                self.item_from_segment(selected, rate)
            }

            Segment::Sequence { children } => {
                // A sequence in item position (e.g. inside an effect)
                // becomes a nested single-track stack.
                let mut inner = Track::new("", self.current_kind.clone(), rate);
                inner.items = self.items_from_components(children, rate);
                carve_transitions(&mut inner.items, rate, &mut self.diags);
                let mut stack = Stack::new("");
                stack.tracks.push(inner);
                Some(Item::Stack(stack))
            }
        }
    }

    fn clip_or_stack(
        &mut self,
        mob_id: MobId,
        slot_id: u32,
        start: i64,
        length: i64,
        rate: Fraction,
    ) -> Item {
        let Some(target) = self.graph.get(mob_id) else {
            self.diags.record(Diagnostic::reference(format!(
                "source clip references missing mob {mob_id}; substituting placeholder"
            )));
            return placeholder_clip(mob_id, start, length, rate);
        };

        if target.is_composition() {
            if self.visiting.contains(&mob_id) {
                self.diags.record(Diagnostic::reference(format!(
                    "composition '{}' references itself through its own nesting; \
                     substituting placeholder",
                    target.display_name()
                )));
                return placeholder_clip(mob_id, start, length, rate);
            }
            self.trace(|| format!("stack from nested composition '{}'", target.display_name()));
            self.visiting.push(mob_id);
            let nested = self.composition_timeline(target);
            self.visiting.pop();

            let mut stack = Stack::new(nested.name);
            stack.source_range = Some(TimeRange::from_frames(start, length, rate));
            stack.tracks = nested.tracks;
            stack.markers = nested.markers;
            return Item::Stack(stack);
        }

        match self.resolver.resolve(mob_id, slot_id) {
            Resolution::Source(resolved) => {
                self.trace(|| format!("clip '{}' ({length} at {rate})", resolved.name));
                let available_start = match timemap::time_to_frames(resolved.available.start, rate)
                {
                    Ok(frames) => frames,
                    Err(_) => {
                        self.diags.record(Diagnostic::rate_precision(format!(
                            "source availability at rate {} does not align with slot rate \
                             {rate}; rounding down",
                            resolved.available.start.rate
                        )));
                        timemap::time_to_frames_floor(resolved.available.start, rate)
                    }
                };
                let source_range = TimeRange::from_frames(available_start + start, length, rate);
                let source = match &resolved.locator {
                    Some(url) => SourceRef::Media {
                        name: resolved.name.clone(),
                        url: Some(url.clone()),
                        available_range: Some(resolved.available),
                    },
                    None => SourceRef::Missing {
                        name: resolved.name.clone(),
                    },
                };
                Item::Clip(Clip {
                    name: resolved.name,
                    source,
                    source_range,
                    time_scale: None,
                    time_warp: None,
                    markers: Vec::new(),
                })
            }
            Resolution::Dangling { mob, reason } => {
                self.diags.record(Diagnostic::reference(format!(
                    "reference chain through {mob} is dangling ({reason}); \
                     substituting placeholder"
                )));
                placeholder_clip(mob_id, start, length, rate)
            }
        }
    }

    /// Move slot-declared markers to their destination tracks, then (when
    /// requested) onto the nearest item containing their position.
    ///
    /// A marker may describe content on another slot, named by slot id or
    /// by physical track number.
    fn place_markers(
        &mut self,
        timeline: &mut Timeline,
        slot_to_track: &HashMap<u32, usize>,
        physical_to_track: &HashMap<u32, usize>,
        pending: Vec<(usize, Fraction, SlotMarker)>,
    ) {
        for (declared_on, declared_rate, slot_marker) in pending {
            let target = match (slot_marker.attached_slot, slot_marker.attached_track) {
                (Some(slot_id), _) => slot_to_track.get(&slot_id).copied(),
                (None, Some(physical)) => physical_to_track.get(&physical).copied(),
                (None, None) => Some(declared_on),
            };

            let Some(track_index) = target else {
                self.diags.record(Diagnostic::structural(format!(
                    "marker '{}' describes a slot that produced no track; \
                     keeping it at timeline scope",
                    slot_marker.comment
                )));
                timeline
                    .markers
                    .push(marker_from_slot(&slot_marker, declared_rate));
                continue;
            };

            let track = &mut timeline.tracks[track_index];
            let mut marker = marker_from_slot(&slot_marker, declared_rate);
            if declared_rate != track.rate {
                // Cross-slot markers are re-based onto the target track's
                // rate at the slot boundary.
                marker.position = match marker.position.rescaled_to(track.rate) {
                    Ok(position) => position,
                    Err(_) => {
                        self.diags.record(Diagnostic::rate_precision(format!(
                            "marker '{}' at rate {declared_rate} does not align with track \
                             rate {}; rounding down",
                            marker.name, track.rate
                        )));
                        marker.position.rescaled_to_floor(track.rate)
                    }
                };
                marker.duration = marker.duration.rescaled_to_floor(track.rate);
            }
            if self.options.attach_markers {
                attach_to_nearest(track, marker);
            } else {
                track.markers.push(marker);
            }
        }
    }
}

fn placeholder_clip(mob_id: MobId, start: i64, length: i64, rate: Fraction) -> Item {
    Item::Clip(Clip {
        name: mob_id.to_string(),
        source: SourceRef::Placeholder {
            mob_id: mob_id.to_string(),
        },
        source_range: TimeRange::from_frames(start, length, rate),
        time_scale: None,
        time_warp: None,
        markers: Vec::new(),
    })
}

fn marker_from_slot(slot_marker: &SlotMarker, rate: Fraction) -> Marker {
    let color = slot_marker
        .color_name
        .as_deref()
        .and_then(MarkerColor::from_name)
        .or_else(|| {
            slot_marker
                .color_rgb
                .map(|(r, g, b)| MarkerColor::from_rgb16(r, g, b))
        })
        .unwrap_or(MarkerColor::Red);
    Marker {
        name: slot_marker.comment.clone(),
        color,
        position: RationalTime::new(slot_marker.position, rate),
        duration: RationalTime::new(slot_marker.length.max(1), rate),
    }
}

/// Attach a track-scope marker to the item containing its position, or the
/// nearest marker-capable item. Positions become item-local.
fn attach_to_nearest(track: &mut Track, marker: Marker) {
    let starts = track.item_starts();
    let position = timemap::time_to_frames_floor(marker.position, track.rate);

    let mut containing: Option<usize> = None;
    let mut nearest: Option<(usize, i64)> = None;

    for (index, item) in track.items.iter().enumerate() {
        if item.is_transition() {
            // transitions cannot carry markers
            continue;
        }
        let start = starts[index].value;
        let end = start + item_frames(item, track.rate);
        if position >= start && position < end {
            containing = Some(index);
            break;
        }
        let distance = (position - start).abs().min((position - end).abs());
        if nearest.map(|(_, best)| distance < best).unwrap_or(true) {
            nearest = Some((index, distance));
        }
    }

    let target = containing.or(nearest.map(|(index, _)| index));
    match target {
        Some(index) => {
            let local = position - starts[index].value;
            let mut marker = marker;
            marker.position = RationalTime::new(local, track.rate);
            match track.items[index].markers_mut() {
                Some(markers) => markers.push(marker),
                None => track.markers.push(marker),
            }
        }
        None => track.markers.push(marker),
    }
}

/// Carve transition overlap out of the neighboring items so no time is
/// double-counted: the preceding item loses the out-offset from its tail,
/// the following item loses the in-offset from its head, and the
/// transition item occupies exactly that carved span.
fn carve_transitions(items: &mut [Item], rate: Fraction, diags: &mut DiagnosticLog) {
    for index in 0..items.len() {
        let Item::Transition(transition) = &items[index] else {
            continue;
        };
        let in_frames = transition.in_offset.rescaled_to_floor(rate).value;
        let out_frames = transition.out_offset.rescaled_to_floor(rate).value;

        let prev_ok = index > 0
            && !items[index - 1].is_transition()
            && item_frames(&items[index - 1], rate) >= out_frames;
        let next_ok = index + 1 < items.len()
            && !items[index + 1].is_transition()
            && item_frames(&items[index + 1], rate) >= in_frames;

        if !prev_ok || !next_ok {
            diags.record(Diagnostic::structural(
                "transition without room in its neighbors; substituting gap",
            ));
            items[index] = Item::Gap(Gap::new(RationalTime::new(in_frames + out_frames, rate)));
            continue;
        }

        if out_frames > 0 {
            trim_tail(&mut items[index - 1], out_frames, rate);
        }
        if in_frames > 0 {
            trim_head(&mut items[index + 1], in_frames, rate);
        }
    }
}

fn item_frames(item: &Item, rate: Fraction) -> i64 {
    timemap::time_to_frames_floor(item.duration(), rate)
}

fn trim_tail(item: &mut Item, frames: i64, rate: Fraction) {
    match item {
        Item::Clip(clip) => {
            let duration = clip.source_range.duration.rescaled_to_floor(rate).value;
            clip.source_range.duration = RationalTime::new(duration - frames, rate);
        }
        Item::Gap(gap) => {
            let duration = gap.duration.rescaled_to_floor(rate).value;
            gap.duration = RationalTime::new(duration - frames, rate);
        }
        Item::Stack(stack) => {
            let range = stack_range(stack, rate);
            stack.source_range = Some(TimeRange::from_frames(
                range.0,
                range.1 - frames,
                rate,
            ));
        }
        Item::Transition(_) => {}
    }
}

fn trim_head(item: &mut Item, frames: i64, rate: Fraction) {
    match item {
        Item::Clip(clip) => {
            let start = clip.source_range.start.rescaled_to_floor(rate).value;
            let duration = clip.source_range.duration.rescaled_to_floor(rate).value;
            clip.source_range = TimeRange::from_frames(start + frames, duration - frames, rate);
        }
        Item::Gap(gap) => {
            let duration = gap.duration.rescaled_to_floor(rate).value;
            gap.duration = RationalTime::new(duration - frames, rate);
        }
        Item::Stack(stack) => {
            let range = stack_range(stack, rate);
            stack.source_range = Some(TimeRange::from_frames(
                range.0 + frames,
                range.1 - frames,
                rate,
            ));
        }
        Item::Transition(_) => {}
    }
}

fn stack_range(stack: &Stack, rate: Fraction) -> (i64, i64) {
    match &stack.source_range {
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
    }
}
