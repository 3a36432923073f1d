//! The timeline root and its tracks.

use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::marker::Marker;
use crate::time::{Fraction, RationalTime};

/// Track media kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
    /// Timecode, data, and other auxiliary channels carried through as-is.
    Other(String),
}

/// An ordered sequence of items sharing one rational rate.
///
/// Items are contiguous and non-overlapping; a transition's duration is
/// carved out of its neighbors, never added on top of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub kind: TrackKind,

    /// The single rational rate all item durations on this track use.
    pub rate: Fraction,

    pub items: Vec<Item>,
    pub markers: Vec<Marker>,
}

impl Track {
    pub fn new(name: impl Into<String>, kind: TrackKind, rate: Fraction) -> Self {
        Self {
            name: name.into(),
            kind,
            rate,
            items: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Total track duration at the track rate. Transitions count the
    /// overlap they carved out, so the sum restores the pre-carve length.
    pub fn duration(&self) -> RationalTime {
        let mut value = 0i64;
        for item in &self.items {
            value += item.duration().rescaled_to_floor(self.rate).value;
        }
        RationalTime::new(value, self.rate)
    }

    /// Start time of each item within the track, in track-rate units.
    /// A transition starts where the carved overlap begins: its `in_offset`
    /// before the cut point shared with the preceding item.
    pub fn item_starts(&self) -> Vec<RationalTime> {
        let mut starts = Vec::with_capacity(self.items.len());
        let mut cursor = 0i64;
        for item in &self.items {
            starts.push(RationalTime::new(cursor, self.rate));
            cursor += item.duration().rescaled_to_floor(self.rate).value;
        }
        starts
    }

    /// True when the track holds nothing visible.
    pub fn is_empty_of_content(&self) -> bool {
        self.items.iter().all(Item::is_gap) && self.markers.is_empty()
    }
}

/// The root of the host model: an ordered set of tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub name: String,

    /// Global start offset (from a primary timecode channel), when known.
    pub global_start: Option<RationalTime>,

    pub tracks: Vec<Track>,
    pub markers: Vec<Marker>,
}

impl Timeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            global_start: None,
            tracks: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Longest track duration, or zero at 24 when the timeline is empty.
    pub fn duration(&self) -> RationalTime {
        self.tracks
            .iter()
            .map(|t| t.duration())
            .max_by(|a, b| a.cmp(b))
            .unwrap_or_else(|| RationalTime::zero(Fraction::from_int(24)))
    }

    /// Load a timeline from a JSON file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }

    /// Save a timeline to a JSON file.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Clip, Gap, SourceRef, Transition};
    use crate::time::TimeRange;

    fn fr(num: i64, den: i64) -> Fraction {
        Fraction::new(num, den).unwrap()
    }

    fn clip(frames: i64, rate: Fraction) -> Item {
        Item::Clip(Clip::new(
            "c",
            SourceRef::Missing { name: "c".into() },
            TimeRange::from_frames(0, frames, rate),
        ))
    }

    #[test]
    fn test_track_duration_and_starts() {
        let rate = fr(24, 1);
        let mut track = Track::new("V1", TrackKind::Video, rate);
        track.items.push(clip(24, rate));
        track.items.push(Item::Gap(Gap::new(RationalTime::new(12, rate))));
        track.items.push(clip(48, rate));

        assert_eq!(track.duration().value, 84);
        let starts = track.item_starts();
        assert_eq!(
            starts.iter().map(|s| s.value).collect::<Vec<_>>(),
            vec![0, 24, 36]
        );
    }

    #[test]
    fn test_track_duration_counts_transition_overlap() {
        let rate = fr(24, 1);
        let mut track = Track::new("V1", TrackKind::Video, rate);
        track.items.push(clip(18, rate));
        track.items.push(Item::Transition(Transition {
            name: "dissolve".into(),
            in_offset: RationalTime::new(6, rate),
            out_offset: RationalTime::new(6, rate),
        }));
        track.items.push(clip(18, rate));

        // 18 + 12 + 18 restores the two original 24-frame clips.
        assert_eq!(track.duration().value, 48);
    }

    #[test]
    fn test_empty_of_content() {
        let rate = fr(24, 1);
        let mut track = Track::new("V1", TrackKind::Video, rate);
        track.items.push(Item::Gap(Gap::new(RationalTime::new(10, rate))));
        assert!(track.is_empty_of_content());

        track.items.push(clip(1, rate));
        assert!(!track.is_empty_of_content());
    }

    #[test]
    fn test_timeline_serde_roundtrip() {
        let rate = fr(24, 1);
        let mut timeline = Timeline::new("cut_01");
        let mut track = Track::new("V1", TrackKind::Video, rate);
        track.items.push(clip(24, rate));
        timeline.tracks.push(track);

        let json = serde_json::to_string_pretty(&timeline).unwrap();
        let parsed: Timeline = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, timeline);
    }
}
