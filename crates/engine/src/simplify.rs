//! Post-pass structural simplification.
//!
//! The graph form nests aggressively: every nested reference becomes a
//! stack holding one track holding one item. The tree form does not need
//! that. This pass collapses single-child nesting and drops tracks with
//! nothing visible, without ever changing visible timing, and is
//! idempotent: a second run is a no-op.

use conform_timeline_model::item::{Item, Stack};
use conform_timeline_model::time::{Fraction, RationalTime, TimeRange};
use conform_timeline_model::timeline::{Timeline, Track};

/// Simplify a timeline in place.
pub fn simplify_timeline(timeline: &mut Timeline) {
    for track in &mut timeline.tracks {
        simplify_track(track);
    }
    remove_invisible_tracks(&mut timeline.tracks);
}

fn simplify_track(track: &mut Track) {
    for item in &mut track.items {
        if let Item::Stack(stack) = item {
            simplify_stack(stack);
            if let Some(replacement) = collapse_stack(stack) {
                *item = replacement;
            }
        }
    }
}

fn simplify_stack(stack: &mut Stack) {
    for track in &mut stack.tracks {
        simplify_track(track);
    }
    remove_invisible_tracks(&mut stack.tracks);
}

/// A stack holding exactly one track holding exactly one item is synthetic
/// nesting; replace it with the item, honoring the stack's trimmed view.
fn collapse_stack(stack: &Stack) -> Option<Item> {
    if !stack.markers.is_empty() || stack.tracks.len() != 1 {
        return None;
    }
    let track = &stack.tracks[0];
    if !track.markers.is_empty() || track.items.len() != 1 {
        return None;
    }
    let inner = &track.items[0];

    match &stack.source_range {
        None => Some(inner.clone()),
        Some(range) => apply_trim(inner, range, track.rate),
    }
}

/// Re-express a stack-level trim directly on the inner item. `None` when
/// the item cannot absorb the trim without a structural change.
fn apply_trim(item: &Item, range: &TimeRange, rate: Fraction) -> Option<Item> {
    let trim_start = range.start.rescaled_to_floor(rate).value;
    let trim_frames = range.duration.rescaled_to_floor(rate).value;

    match item {
        Item::Clip(clip) => {
            let mut clip = clip.clone();
            let start = clip.source_range.start.rescaled_to_floor(rate).value;
            clip.source_range = TimeRange::from_frames(start + trim_start, trim_frames, rate);
            Some(Item::Clip(clip))
        }
        Item::Gap(gap) => {
            let mut gap = gap.clone();
            gap.duration = RationalTime::new(trim_frames, rate);
            Some(Item::Gap(gap))
        }
        Item::Stack(_) | Item::Transition(_) => None,
    }
}

/// Drop tracks holding nothing visible, as long as removal cannot change
/// the enclosing duration: some remaining track must be at least as long.
fn remove_invisible_tracks(tracks: &mut Vec<Track>) {
    if tracks.len() <= 1 {
        return;
    }

    let durations: Vec<Fraction> = tracks.iter().map(|t| t.duration().seconds()).collect();
    let mut keep = vec![true; tracks.len()];

    for index in 0..tracks.len() {
        if !tracks[index].is_empty_of_content() {
            continue;
        }
        let longest_other = durations
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index && keep[*other])
            .map(|(_, d)| *d)
            .max();
        if longest_other.map(|d| d >= durations[index]).unwrap_or(false) {
            keep[index] = false;
        }
    }

    let mut index = 0;
    tracks.retain(|_| {
        let kept = keep[index];
        index += 1;
        kept
    });
}

/// Convenience for tests and callers that keep the original.
pub fn simplified(timeline: &Timeline) -> Timeline {
    let mut copy = timeline.clone();
    simplify_timeline(&mut copy);
    copy
}
