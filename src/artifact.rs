use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// A local archive to be imported into the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Load every regular file in `dir`, sorted by file name.
///
/// A missing directory yields no artifacts rather than an error; the import
/// step is then simply skipped.
pub fn load_dir(dir: &Path) -> Result<Vec<Artifact>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "import folder not found");
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let bytes =
            std::fs::read(&path).with_context(|| format!("reading artifact {}", path.display()))?;
        artifacts.push(Artifact {
            name: entry.file_name().to_string_lossy().into_owned(),
            bytes,
        });
    }
    artifacts.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(count = artifacts.len(), dir = %dir.display(), "scanned import folder");
    Ok(artifacts)
}
