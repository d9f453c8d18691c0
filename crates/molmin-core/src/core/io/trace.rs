use serde::Serialize;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// One row of a minimization trace: the energy observed after a completed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub step: usize,
    pub energy: f64,
    pub state: String,
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Writes trace records as CSV with a `step,energy,state` header.
pub fn write_trace<W: Write>(records: &[TraceRecord], writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_trace_to_path(records: &[TraceRecord], path: &Path) -> Result<(), TraceError> {
    let file = std::fs::File::create(path).map_err(|e| TraceError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    write_trace(records, file).map_err(|e| TraceError::Csv {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}
