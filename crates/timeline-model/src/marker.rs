//! Markers and marker colors.

use serde::{Deserialize, Serialize};

use crate::time::{RationalTime, TimeRange};

/// The conventional editorial marker palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerColor {
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Magenta,
    Pink,
    White,
    Black,
}

impl MarkerColor {
    /// Canonical lowercase name of the color.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Cyan => "cyan",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Magenta => "magenta",
            Self::Pink => "pink",
            Self::White => "white",
            Self::Black => "black",
        }
    }

    /// Parse a color name, case-insensitive.
    pub fn from_name(name: &str) -> Option<MarkerColor> {
        match name.to_ascii_lowercase().as_str() {
            "red" => Some(Self::Red),
            "orange" => Some(Self::Orange),
            "yellow" => Some(Self::Yellow),
            "green" => Some(Self::Green),
            "cyan" => Some(Self::Cyan),
            "blue" => Some(Self::Blue),
            "purple" => Some(Self::Purple),
            "magenta" => Some(Self::Magenta),
            "pink" => Some(Self::Pink),
            "white" => Some(Self::White),
            "black" => Some(Self::Black),
            _ => None,
        }
    }

    /// Estimate the nearest palette color for a 16-bit RGB triple.
    ///
    /// Exact primaries map directly; everything else is bucketed by hue,
    /// with low-saturation and extreme-lightness values collapsing to
    /// white/black and light reds reading as pink.
    pub fn from_rgb16(red: u16, green: u16, blue: u16) -> MarkerColor {
        let r = red as f64 / 65535.0;
        let g = green as f64 / 65535.0;
        let b = blue as f64 / 65535.0;

        match (red, green, blue) {
            (65535, 0, 0) => return Self::Red,
            (0, 65535, 0) => return Self::Green,
            (0, 0, 65535) => return Self::Blue,
            (0, 0, 0) => return Self::Black,
            (65535, 65535, 65535) => return Self::White,
            _ => {}
        }

        let (hue, lightness, saturation) = rgb_to_hls(r, g, b);

        if saturation < 0.2 {
            return if lightness > 0.65 {
                Self::White
            } else {
                Self::Black
            };
        }
        if lightness < 0.13 {
            return Self::Black;
        }
        if lightness > 0.9 {
            return Self::White;
        }

        let mut nearest = Self::from_hue(hue);
        if nearest == Self::Red && lightness > 0.53 {
            nearest = Self::Pink;
        }
        if nearest == Self::Magenta && hue < 0.89 && lightness < 0.42 {
            // darker magentas look more like purple
            nearest = Self::Purple;
        }
        nearest
    }

    /// Bucket a hue in `[0.0, 1.0]` into the palette.
    fn from_hue(hue: f64) -> MarkerColor {
        if hue <= 0.04 || hue > 0.93 {
            Self::Red
        } else if hue <= 0.13 {
            Self::Orange
        } else if hue <= 0.2 {
            Self::Yellow
        } else if hue <= 0.43 {
            Self::Green
        } else if hue <= 0.52 {
            Self::Cyan
        } else if hue <= 0.74 {
            Self::Blue
        } else if hue <= 0.82 {
            Self::Purple
        } else {
            Self::Magenta
        }
    }
}

/// RGB to (hue, lightness, saturation), all in `[0.0, 1.0]`.
fn rgb_to_hls(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return (0.0, l, 0.0);
    }

    let delta = max - min;
    let s = if l <= 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };

    let rc = (max - r) / delta;
    let gc = (max - g) / delta;
    let bc = (max - b) / delta;
    let h = if (r - max).abs() < f64::EPSILON {
        bc - gc
    } else if (g - max).abs() < f64::EPSILON {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    ((h / 6.0).rem_euclid(1.0), l, s)
}

/// A named point (or short range) of interest on a track or item.
///
/// `position` is local to whatever the marker is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub color: MarkerColor,
    pub position: RationalTime,
    pub duration: RationalTime,
}

impl Marker {
    pub fn new(name: impl Into<String>, color: MarkerColor, position: RationalTime) -> Self {
        let duration = RationalTime::new(1, position.rate);
        Self {
            name: name.into(),
            color,
            position,
            duration,
        }
    }

    pub fn marked_range(&self) -> TimeRange {
        TimeRange::new(self.position, self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Fraction;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(MarkerColor::from_name("Yellow"), Some(MarkerColor::Yellow));
        assert_eq!(MarkerColor::from_name("CYAN"), Some(MarkerColor::Cyan));
        assert_eq!(MarkerColor::from_name("chartreuse"), None);
    }

    #[test]
    fn test_exact_primaries() {
        assert_eq!(MarkerColor::from_rgb16(65535, 0, 0), MarkerColor::Red);
        assert_eq!(MarkerColor::from_rgb16(0, 65535, 0), MarkerColor::Green);
        assert_eq!(MarkerColor::from_rgb16(0, 0, 65535), MarkerColor::Blue);
        assert_eq!(MarkerColor::from_rgb16(0, 0, 0), MarkerColor::Black);
        assert_eq!(
            MarkerColor::from_rgb16(65535, 65535, 65535),
            MarkerColor::White
        );
    }

    #[test]
    fn test_hue_buckets() {
        // mid orange
        assert_eq!(
            MarkerColor::from_rgb16(65535, 32768, 0),
            MarkerColor::Orange
        );
        // desaturated grey reads as black or white by lightness
        assert_eq!(
            MarkerColor::from_rgb16(30000, 30000, 31000),
            MarkerColor::Black
        );
        assert_eq!(
            MarkerColor::from_rgb16(60000, 60000, 61000),
            MarkerColor::White
        );
    }

    #[test]
    fn test_light_red_reads_as_pink() {
        assert_eq!(
            MarkerColor::from_rgb16(65535, 40000, 40000),
            MarkerColor::Pink
        );
    }

    #[test]
    fn test_marker_default_duration_is_one_unit() {
        let rate = Fraction::new(24, 1).unwrap();
        let m = Marker::new("note", MarkerColor::Red, RationalTime::new(12, rate));
        assert_eq!(m.duration.value, 1);
        assert!(m.marked_range().contains(RationalTime::new(12, rate)));
    }
}
