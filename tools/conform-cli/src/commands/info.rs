//! Show a container's mob structure.

use std::path::PathBuf;

use conform_interchange_model::codec::{ContainerCodec, JsonContainer};
use conform_interchange_model::mob::MobKind;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let graph = JsonContainer.read(&path)?;

    println!("Container: {}", path.display());
    println!("{}", "=".repeat(50));
    println!("Mobs: {}", graph.len());

    for mob in graph.mobs() {
        let kind = match &mob.kind {
            MobKind::Composition => "Composition",
            MobKind::Master => "Master",
            MobKind::Source { .. } => "Source",
        };
        println!(
            "  {} '{}' ({:?}, {} slots)",
            kind,
            mob.display_name(),
            mob.usage,
            mob.slots.len()
        );
        for slot in &mob.slots {
            println!(
                "     slot {} {:?} @ {} — {} ({} units)",
                slot.id,
                slot.media_kind,
                slot.edit_rate,
                slot.segment.kind_name(),
                slot.segment.length()
            );
        }
    }

    let starting = graph.mobs_for_transcription();
    match starting.first() {
        Some(mob) => println!("Transcription would start from '{}'", mob.display_name()),
        None => println!("Nothing transcribable in this container"),
    }

    Ok(())
}
