//! Conversion options and results.

use serde::{Deserialize, Serialize};

use conform_common::diag::Diagnostic;
use conform_timeline_model::timeline::Timeline;

/// Options for the read path (graph to tree).
///
/// The optional passes are explicit opt-ins so the core transcription
/// stays deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Run the structural simplifier after transcription.
    pub simplify: bool,

    /// Emit a per-segment decision trace at debug level. No behavioral
    /// effect on the output.
    pub transcribe_log: bool,

    /// Re-attach markers to the nearest item containing their position.
    /// When false, markers stay at the scope of the track they were
    /// declared on.
    pub attach_markers: bool,

    /// Materialize per-output-frame time-warp maps for keyframed speed
    /// curves that are not linear. One map entry per output frame.
    pub bake_keyframed_properties: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            simplify: true,
            transcribe_log: false,
            attach_markers: false,
            bake_keyframed_properties: false,
        }
    }
}

/// The outcome of a read: the timeline plus every compromise made along
/// the way, in the order they were made.
#[derive(Debug)]
pub struct Transcription {
    pub timeline: Timeline,
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ReadOptions::default();
        assert!(options.simplify);
        assert!(!options.transcribe_log);
        assert!(!options.attach_markers);
        assert!(!options.bake_keyframed_properties);
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let options: ReadOptions = serde_json::from_str(r#"{"attach_markers":true}"#).unwrap();
        assert!(options.simplify);
        assert!(options.attach_markers);
    }
}
