//! Transcribe a timeline file into a container.

use std::path::PathBuf;

use conform_timeline_model::timeline::Timeline;

pub fn run(timeline_path: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let timeline = Timeline::load(&timeline_path)?;

    let diagnostics = conform_engine::write(&timeline, &output)?;

    println!(
        "Wrote '{}' ({} tracks, {:.3}s)",
        output.display(),
        timeline.tracks.len(),
        timeline.duration().to_seconds()
    );

    if !diagnostics.is_empty() {
        println!("{} compromise(s) recorded:", diagnostics.len());
        for diagnostic in &diagnostics {
            println!("  [{:?}] {}", diagnostic.kind, diagnostic.message);
        }
    }

    Ok(())
}
