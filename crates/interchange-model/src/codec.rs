//! The container codec boundary.
//!
//! The engine never depends on a container's binary layout. It hands a
//! [`MobGraph`] to a codec and gets one back; anything the codec cannot do
//! is a fatal error that aborts the whole operation with nothing partially
//! written.

use std::path::Path;

use conform_common::error::{ConformError, ConformResult};

use crate::graph::MobGraph;

/// Reads and writes mob graphs from/to a container file.
pub trait ContainerCodec {
    fn read(&self, path: &Path) -> ConformResult<MobGraph>;

    fn write(&self, graph: &MobGraph, path: &Path) -> ConformResult<()>;
}

/// Default codec: the object model serialized as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContainer;

impl ContainerCodec for JsonContainer {
    fn read(&self, path: &Path) -> ConformResult<MobGraph> {
        if !path.exists() {
            return Err(ConformError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConformError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| ConformError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn write(&self, graph: &MobGraph, path: &Path) -> ConformResult<()> {
        // Serialize fully before touching the destination.
        let json = serde_json::to_string_pretty(graph).map_err(|e| ConformError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ConformError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
