//! End-to-end properties of the write/read pair.

use proptest::prelude::*;

use conform_engine::{read_graph, write_graph, ReadOptions};
use conform_timeline_model::item::{Clip, Gap, Item, SourceRef, Stack, Transition};
use conform_timeline_model::time::{Fraction, RationalTime, TimeRange};
use conform_timeline_model::timeline::{Timeline, Track, TrackKind};

fn rate24() -> Fraction {
    Fraction::new(24, 1).unwrap()
}

fn media_clip(name: &str, start: i64, frames: i64, rate: Fraction) -> Item {
    Item::Clip(Clip::new(
        name,
        SourceRef::Media {
            name: name.to_string(),
            url: Some(format!("file:///media/{name}.mov")),
            available_range: Some(TimeRange::from_frames(0, 10_000, rate)),
        },
        TimeRange::from_frames(start, frames, rate),
    ))
}

fn unsimplified() -> ReadOptions {
    ReadOptions {
        simplify: false,
        ..ReadOptions::default()
    }
}

#[test]
fn roundtrip_preserves_per_track_duration() {
    let rate = rate24();
    let mut timeline = Timeline::new("cut_01");

    let mut video = Track::new("V1", TrackKind::Video, rate);
    video.items.push(media_clip("a", 0, 18, rate));
    video.items.push(Item::Transition(Transition {
        name: String::new(),
        in_offset: RationalTime::new(6, rate),
        out_offset: RationalTime::new(6, rate),
    }));
    video.items.push(media_clip("b", 30, 18, rate));
    video
        .items
        .push(Item::Gap(Gap::new(RationalTime::new(12, rate))));
    timeline.tracks.push(video);

    let mut audio = Track::new("A1", TrackKind::Audio, rate);
    audio.items.push(media_clip("a", 0, 60, rate));
    timeline.tracks.push(audio);

    let (graph, diagnostics) = write_graph(&timeline);
    assert!(diagnostics.is_empty());

    let result = read_graph(&graph, &unsimplified());
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.timeline.tracks.len(), 2);
    for (original, reread) in timeline.tracks.iter().zip(&result.timeline.tracks) {
        assert_eq!(
            original.duration().seconds(),
            reread.duration().seconds(),
            "track '{}' changed duration",
            original.name
        );
        assert_eq!(original.kind, reread.kind);
    }
}

#[test]
fn roundtrip_preserves_linear_speed_exactly() {
    let rate = rate24();
    let mut timeline = Timeline::new("cut");
    let mut track = Track::new("V1", TrackKind::Video, rate);
    let Item::Clip(mut clip) = media_clip("a", 0, 24, rate) else {
        unreachable!();
    };
    clip.time_scale = Some(Fraction::new(2, 1).unwrap());
    track.items.push(Item::Clip(clip));
    timeline.tracks.push(track);

    let (graph, _) = write_graph(&timeline);
    let result = read_graph(&graph, &unsimplified());

    let Item::Clip(reread) = &result.timeline.tracks[0].items[0] else {
        panic!("expected clip back");
    };
    // exact rational equality, not a float comparison
    assert_eq!(reread.time_scale, Some(Fraction::new(2, 1).unwrap()));
    assert_eq!(reread.duration().value, 24);
}

#[test]
fn roundtrip_preserves_freeze_frame() {
    let rate = rate24();
    let mut timeline = Timeline::new("cut");
    let mut track = Track::new("V1", TrackKind::Video, rate);
    let Item::Clip(mut clip) = media_clip("a", 48, 24, rate) else {
        unreachable!();
    };
    clip.time_scale = Some(Fraction::ZERO);
    track.items.push(Item::Clip(clip));
    timeline.tracks.push(track);

    let (graph, _) = write_graph(&timeline);
    let result = read_graph(&graph, &unsimplified());

    let Item::Clip(reread) = &result.timeline.tracks[0].items[0] else {
        panic!("expected clip back");
    };
    assert_eq!(reread.time_scale, Some(Fraction::ZERO));
}

#[test]
fn roundtrip_nested_stack_survives() {
    let rate = rate24();
    let mut inner = Track::new("V1", TrackKind::Video, rate);
    inner.items.push(media_clip("a", 0, 48, rate));
    let mut stack = Stack::new("insert");
    stack.tracks.push(inner);
    stack.source_range = Some(TimeRange::from_frames(0, 48, rate));

    let mut timeline = Timeline::new("cut");
    let mut track = Track::new("V1", TrackKind::Video, rate);
    track.items.push(Item::Stack(stack));
    timeline.tracks.push(track);

    let (graph, _) = write_graph(&timeline);
    let result = read_graph(&graph, &unsimplified());

    let Item::Stack(reread) = &result.timeline.tracks[0].items[0] else {
        panic!("expected stack back, got {:?}", result.timeline.tracks[0].items[0]);
    };
    assert_eq!(reread.name, "insert");
    assert_eq!(reread.duration().unwrap().value, 48);
    assert_eq!(reread.tracks.len(), 1);
}

#[test]
fn roundtrip_through_container_file() {
    let dir = std::env::temp_dir().join("conform_test_roundtrip");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("cut.json");

    let rate = rate24();
    let mut timeline = Timeline::new("cut_01");
    timeline.global_start = Some(RationalTime::new(86400, rate));
    let mut track = Track::new("V1", TrackKind::Video, rate);
    track.items.push(media_clip("a", 0, 24, rate));
    timeline.tracks.push(track);

    let diagnostics = conform_engine::write(&timeline, &path).unwrap();
    assert!(diagnostics.is_empty());

    let result = conform_engine::read(&path, &ReadOptions::default()).unwrap();
    assert_eq!(result.timeline.name, "cut_01");
    assert_eq!(
        result.timeline.global_start,
        Some(RationalTime::new(86400, rate))
    );
    assert_eq!(
        result.timeline.duration().seconds(),
        Fraction::new(1, 1).unwrap()
    );

    std::fs::remove_dir_all(&dir).ok();
}

prop_compose! {
    fn arb_track(name: &'static str, kind: TrackKind)(
        specs in prop::collection::vec((0u8..2, 1i64..96, 0i64..200), 1..6),
        transitions in prop::collection::vec(prop::option::of((0i64..8, 0i64..8)), 6),
    ) -> Track {
        let rate = Fraction::new(24, 1).unwrap();
        let mut track = Track::new(name, kind.clone(), rate);
        for (index, (selector, frames, start)) in specs.iter().enumerate() {
            if index > 0 {
                if let Some(Some((in_frames, out_frames))) = transitions.get(index - 1) {
                    track.items.push(Item::Transition(Transition {
                        name: String::new(),
                        in_offset: RationalTime::new(*in_frames, rate),
                        out_offset: RationalTime::new(*out_frames, rate),
                    }));
                }
            }
            let item = match selector {
                0 => media_clip("shared", *start, *frames, rate),
                _ => Item::Gap(Gap::new(RationalTime::new(*frames, rate))),
            };
            track.items.push(item);
        }
        track
    }
}

prop_compose! {
    fn arb_timeline()(
        video in arb_track("V1", TrackKind::Video),
        audio in prop::option::of(arb_track("A1", TrackKind::Audio)),
    ) -> Timeline {
        let mut timeline = Timeline::new("generated");
        timeline.tracks.push(video);
        if let Some(audio) = audio {
            timeline.tracks.push(audio);
        }
        timeline
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip_duration_invariance(timeline in arb_timeline()) {
        let (graph, _) = write_graph(&timeline);
        let result = read_graph(&graph, &unsimplified());

        prop_assert_eq!(timeline.tracks.len(), result.timeline.tracks.len());
        for (original, reread) in timeline.tracks.iter().zip(&result.timeline.tracks) {
            prop_assert_eq!(
                original.duration().seconds(),
                reread.duration().seconds()
            );
        }
    }

    #[test]
    fn prop_simplify_is_idempotent(timeline in arb_timeline()) {
        let (graph, _) = write_graph(&timeline);
        let mut once = read_graph(&graph, &unsimplified()).timeline;
        conform_engine::simplify::simplify_timeline(&mut once);
        let mut twice = once.clone();
        conform_engine::simplify::simplify_timeline(&mut twice);
        prop_assert_eq!(once, twice);
    }
}
