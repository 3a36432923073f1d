//! Conform Engine
//!
//! Bidirectional transcription between the interchange mob graph and the
//! neutral timeline model:
//! - **Read:** container → mob graph → tracks/clips/gaps/transitions/stacks,
//!   with reference resolution, speed-ramp handling, transition carving,
//!   marker placement, and an optional structural simplifier
//! - **Write:** timeline → fresh composition/master/source mobs → container
//!
//! The engine is single-threaded and synchronous. All state (resolver
//! memoization, diagnostics) is local to one conversion; concurrent
//! conversions use independent calls. Recoverable compromises are recorded
//! as diagnostics and returned with the result; only container-level I/O
//! failures are hard errors.

pub mod options;
pub mod reader;
pub mod resolver;
pub mod simplify;
pub mod speed;
pub mod timemap;
pub mod writer;

use std::path::Path;

use conform_common::diag::Diagnostic;
use conform_common::error::ConformResult;
use conform_interchange_model::codec::{ContainerCodec, JsonContainer};
use conform_interchange_model::graph::MobGraph;
use conform_timeline_model::timeline::Timeline;

pub use options::{ReadOptions, Transcription};

/// Read a container file into a timeline.
pub fn read(path: impl AsRef<Path>, options: &ReadOptions) -> ConformResult<Transcription> {
    let graph = JsonContainer.read(path.as_ref())?;
    Ok(read_graph(&graph, options))
}

/// Transcribe an already-loaded mob graph. Hosts with their own codec
/// enter here and never touch the file layer.
pub fn read_graph(graph: &MobGraph, options: &ReadOptions) -> Transcription {
    reader::transcribe_graph(graph, options)
}

/// Write a timeline to a container file. Returns the diagnostics recorded
/// while building the graph; container-level failures abort with nothing
/// partially written.
pub fn write(timeline: &Timeline, path: impl AsRef<Path>) -> ConformResult<Vec<Diagnostic>> {
    let (graph, diagnostics) = write_graph(timeline);
    JsonContainer.write(&graph, path.as_ref())?;
    Ok(diagnostics)
}

/// Build the mob graph for a timeline without touching the file layer.
pub fn write_graph(timeline: &Timeline) -> (MobGraph, Vec<Diagnostic>) {
    writer::transcribe_timeline(timeline)
}
