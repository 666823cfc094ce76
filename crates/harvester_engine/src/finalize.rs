use std::fs;
use std::path::{Path, PathBuf};

use harvester_core::{sort_rows, RunSummary, StagingRow, OUTPUT_HEADER};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("cannot read staging artifact {path}: {source}")]
    ReadStaging { path: PathBuf, source: csv::Error },
    #[error("cannot encode final artifact: {0}")]
    Encode(#[from] csv::Error),
    #[error("final artifact path has no file name: {0}")]
    BadTarget(PathBuf),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("cannot remove staging artifact: {0}")]
    RemoveStaging(std::io::Error),
}

/// Read every staging row back.
pub fn read_staging_rows(path: &Path) -> Result<Vec<StagingRow>, FinalizeError> {
    let read_err = |source| FinalizeError::ReadStaging {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(read_err)?;
    reader
        .deserialize::<StagingRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)
}

/// Sort the staging rows by identifier, write the final artifact in one pass
/// (header first), remove the staging artifact and summarize.
pub fn finalize(staging: &Path, final_path: &Path) -> Result<RunSummary, FinalizeError> {
    let rows = sort_rows(read_staging_rows(staging)?);

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(OUTPUT_HEADER)?;
    for row in &rows {
        writer.write_record(row.fields())?;
    }
    let content = writer
        .into_inner()
        .map_err(|err| FinalizeError::Encode(csv::Error::from(err.into_error())))?;

    let dir = final_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let filename = final_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| FinalizeError::BadTarget(final_path.to_path_buf()))?;
    AtomicFileWriter::new(dir).write(filename, &content)?;

    fs::remove_file(staging).map_err(FinalizeError::RemoveStaging)?;
    Ok(RunSummary::from_rows(&rows))
}
