use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Prefix of the scratch files created next to the artifacts.
const SCRATCH_PREFIX: &str = ".harvester-";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path} unusable: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Create `dir` (and parents) if needed and check that artifacts can be
/// created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |reason: String| PersistError::OutputDir {
        path: dir.to_path_buf(),
        reason,
    };
    fs::create_dir_all(dir).map_err(|err| unusable(err.to_string()))?;
    if !dir.is_dir() {
        return Err(unusable("not a directory".to_string()));
    }
    tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .suffix(".probe")
        .tempfile_in(dir)
        .map_err(|err| unusable(format!("not writable: {err}")))?;
    Ok(())
}

/// Publishes final artifacts. Content goes to a scratch file in the target
/// directory, is synced, then renamed over the artifact name, so a reader
/// sees either the previous artifact or the complete new one.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let mut scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        scratch.write_all(content)?;
        scratch.as_file().sync_all()?;

        let target = self.dir.join(filename);
        scratch
            .persist(&target)
            .map_err(|err| PersistError::Io(err.error))?;
        Ok(target)
    }
}
