use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use harvest_logging::{harvest_debug, harvest_error};
use harvester_core::{StagingRow, OUTPUT_HEADER};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot create staging artifact {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("staging write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("staging io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("staging writer thread panicked")]
    WriterPanicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SinkReport {
    pub rows_written: usize,
    pub failed_writes: usize,
}

/// Append-only staging artifact owned by a single writer thread.
///
/// Tasks hand rows over a channel; the writer appends each row, flushes it and
/// syncs the file before taking the next one, so an interrupted run leaves
/// only whole rows behind.
pub struct StagingSink {
    tx: mpsc::Sender<StagingRow>,
    worker: JoinHandle<SinkReport>,
    path: PathBuf,
}

/// Cloneable sender side of a [`StagingSink`].
#[derive(Clone)]
pub struct SinkHandle {
    tx: mpsc::Sender<StagingRow>,
}

impl SinkHandle {
    /// Queue one row. Returns false if the writer has already shut down.
    pub fn append(&self, row: StagingRow) -> bool {
        match self.tx.send(row) {
            Ok(()) => true,
            Err(mpsc::SendError(row)) => {
                harvest_error!("staging writer is gone, row {} lost", row.identifier);
                false
            }
        }
    }
}

impl StagingSink {
    /// Create (truncate) the staging artifact and write its header.
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path).map_err(|source| SinkError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(OUTPUT_HEADER)?;
        persist_now(&mut writer)?;

        let (tx, rx) = mpsc::channel::<StagingRow>();
        let display = path.display().to_string();
        let worker = thread::spawn(move || {
            let mut report = SinkReport::default();
            while let Ok(row) = rx.recv() {
                let written = writer
                    .write_record(row.fields())
                    .map_err(SinkError::from)
                    .and_then(|()| persist_now(&mut writer));
                match written {
                    Ok(()) => report.rows_written += 1,
                    Err(err) => {
                        report.failed_writes += 1;
                        harvest_error!("{}: row {} not persisted: {}", display, row.identifier, err);
                    }
                }
            }
            harvest_debug!("{}: writer closed after {} rows", display, report.rows_written);
            report
        });

        Ok(Self {
            tx,
            worker,
            path: path.to_path_buf(),
        })
    }

    pub fn handle(&self) -> SinkHandle {
        SinkHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the channel and wait for queued rows to be persisted. Every
    /// [`SinkHandle`] must have been dropped, or this blocks.
    pub fn finish(self) -> Result<SinkReport, SinkError> {
        drop(self.tx);
        self.worker.join().map_err(|_| SinkError::WriterPanicked)
    }
}

fn persist_now(writer: &mut csv::Writer<File>) -> Result<(), SinkError> {
    writer.flush()?;
    writer.get_ref().sync_data()?;
    Ok(())
}
