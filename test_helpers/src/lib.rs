//! Test helpers for the tracksim workspace
//!
//! Artifact directories under `test_output/` for exported histograms and
//! plots, and edge-free sampling used by the digitization tests.

use std::io;
use std::path::{Path, PathBuf};

/// Name of the artifact directory at the workspace root
pub const OUTPUT_DIR_NAME: &str = "test_output";

#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Cannot create artifact directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Workspace root: this crate sits one level below it.
pub fn workspace_root() -> &'static Path {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.parent().unwrap_or(manifest)
}

/// `test_output/<group>` under the workspace root, created if missing.
///
/// Each test file writes into its own group so parallel test binaries never
/// share a directory.
pub fn artifact_dir(group: &str) -> Result<PathBuf, TestHelperError> {
    let dir = workspace_root().join(OUTPUT_DIR_NAME).join(group);
    std::fs::create_dir_all(&dir).map_err(|source| TestHelperError::CreateDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// `file` inside the artifact directory of `group`
pub fn artifact_path<P: AsRef<Path>>(group: &str, file: P) -> Result<PathBuf, TestHelperError> {
    Ok(artifact_dir(group)?.join(file))
}

/// `steps` evenly spaced values strictly inside `(low, high)`.
///
/// Sample `k` sits at `low + (k + 0.5) * (high - low) / steps`, so neither
/// edge is ever produced. Digitization tests use this to sweep a pixel
/// footprint without landing on a rounding boundary.
pub fn interior_sweep(low: f64, high: f64, steps: usize) -> Vec<f64> {
    let step = (high - low) / steps as f64;
    (0..steps)
        .map(|k| low + (k as f64 + 0.5) * step)
        .collect()
}
