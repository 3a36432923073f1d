//! Speed ramp classification and baking.
//!
//! A time-warp operation group carries a speed offset map: a curve from
//! output time to source offset. A constant-slope curve is a linear speed
//! change and collapses to one scalar; anything fancier is only
//! representable as a baked per-output-frame map, and only when the caller
//! asked for that explicitly.

use conform_interchange_model::segment::{
    Interpolation, Parameter, ParameterValue, PARAM_SPEED_OFFSET_MAP, PARAM_SPEED_RATIO,
};
use conform_timeline_model::time::Fraction;

/// Classified speed behavior of one time-warp group.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeedRamp {
    /// No detectable speed change.
    Unity,

    /// Constant speed: source duration over played duration.
    /// Zero is a freeze frame.
    Linear(Fraction),

    /// Source frame index for every output frame.
    Baked(Vec<i64>),

    /// Could not be represented; the caller substitutes unity speed and
    /// records the reason.
    Unsupported { reason: String },
}

/// Inspect a time-warp group's parameters.
///
/// `length` is the group's declared output length; `bake` enables the
/// per-frame fallback for curves beyond a constant slope.
pub fn classify(parameters: &[Parameter], length: i64, bake: bool) -> SpeedRamp {
    let offset_map = find_parameter(parameters, PARAM_SPEED_OFFSET_MAP);

    match offset_map {
        Some(ParameterValue::Varying {
            interpolation: Interpolation::Linear,
            points,
        }) => {
            if points.len() > 2 {
                return fancy(offset_map, length, bake);
            }
            if points.len() == 2 {
                // Two linear points have one slope, and the slope is the
                // scale. The declared ratio only matters when the span is
                // degenerate.
                let span = points[1].time.checked_sub(points[0].time);
                let rise = points[1].value.checked_sub(points[0].value);
                if let (Some(span), Some(rise)) = (span, rise) {
                    if !span.is_zero() {
                        if let Some(slope) = rise.checked_div(span) {
                            return SpeedRamp::Linear(slope);
                        }
                    }
                }
            }
            declared_ratio(parameters, length)
        }
        Some(value @ ParameterValue::Varying { .. }) => fancy(Some(value), length, bake),
        Some(ParameterValue::Constant { .. }) | None => declared_ratio(parameters, length),
    }
}

/// Fall back to the declared constant speed ratio.
fn declared_ratio(parameters: &[Parameter], length: i64) -> SpeedRamp {
    let Some(value) = find_parameter(parameters, PARAM_SPEED_RATIO) else {
        return SpeedRamp::Unsupported {
            reason: "time warp carries neither a usable offset map nor a speed ratio".into(),
        };
    };
    let Some(ratio) = value.as_constant() else {
        return SpeedRamp::Unsupported {
            reason: "declared speed ratio is keyframed".into(),
        };
    };
    if ratio == Fraction::from_int(length) {
        // A ratio equal to the group length marks a freeze frame.
        return SpeedRamp::Linear(Fraction::ZERO);
    }
    match ratio.recip() {
        Some(scale) => SpeedRamp::Linear(scale),
        None => SpeedRamp::Linear(Fraction::ZERO),
    }
}

/// A curve beyond a constant slope: bake it or report it unsupported.
fn fancy(offset_map: Option<&ParameterValue>, length: i64, bake: bool) -> SpeedRamp {
    if !bake {
        return SpeedRamp::Unsupported {
            reason: "keyframed speed curve requires baking, which was not requested".into(),
        };
    }
    let Some(curve) = offset_map else {
        return SpeedRamp::Unsupported {
            reason: "keyframed speed curve has no offset map to sample".into(),
        };
    };
    if length <= 0 {
        return SpeedRamp::Unsupported {
            reason: format!("cannot bake a curve over a length of {length}"),
        };
    }

    let mut map = Vec::with_capacity(length as usize);
    for frame in 0..length {
        match curve.value_at(Fraction::from_int(frame)) {
            Some(value) => {
                // floor to the source frame containing the sampled offset
                let floored = value.num().div_euclid(value.den());
                map.push(floored);
            }
            None => {
                return SpeedRamp::Unsupported {
                    reason: format!("speed curve is not sampleable at frame {frame}"),
                };
            }
        }
    }
    SpeedRamp::Baked(map)
}

fn find_parameter<'a>(parameters: &'a [Parameter], name: &str) -> Option<&'a ParameterValue> {
    parameters.iter().find(|p| p.name == name).map(|p| &p.value)
}
