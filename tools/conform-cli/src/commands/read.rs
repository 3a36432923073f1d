//! Transcribe a container into a timeline file.

use std::path::PathBuf;

use conform_engine::ReadOptions;

pub fn run(
    path: PathBuf,
    output: Option<PathBuf>,
    simplify: bool,
    attach_markers: bool,
    bake_keyframed_properties: bool,
    transcribe_log: bool,
) -> anyhow::Result<()> {
    let options = ReadOptions {
        simplify,
        transcribe_log,
        attach_markers,
        bake_keyframed_properties,
    };

    let result = conform_engine::read(&path, &options)?;

    let output = output.unwrap_or_else(|| path.with_extension("timeline.json"));
    result.timeline.save(&output)?;

    println!(
        "Wrote '{}' ({} tracks, {:.3}s)",
        output.display(),
        result.timeline.tracks.len(),
        result.timeline.duration().to_seconds()
    );

    if !result.diagnostics.is_empty() {
        println!("{} compromise(s) recorded:", result.diagnostics.len());
        for diagnostic in &result.diagnostics {
            println!("  [{:?}] {}", diagnostic.kind, diagnostic.message);
        }
    }

    Ok(())
}
