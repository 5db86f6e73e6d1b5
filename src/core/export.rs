//! Purpose: Stream a row/column selection of one node to a CSV file in
//! bounded chunks.
//! Exports: `export`, `ExportRequest`, `ExportOutcome`, `DEFAULT_CHUNK_ROWS`.
//! Role: Drives the pure chunk plan through the bounded reader and the
//! `csv` writer, reporting progress and honoring cancellation.
//! Invariants: The output file is opened once; the header is written with
//! the first chunk only, so output size grows monotonically.
//! Invariants: Cancellation is polled between chunks, never mid-chunk;
//! partial output files are left in place.
//! Invariants: Reported progress is monotone and reaches 100 only on
//! success.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::handle::H5Handle;
use crate::core::plan::{plan_chunks, ReadWindow, RowSelection};
use crate::core::progress::{CancelToken, CHUNK_BAND};
use crate::core::reader;
use crate::core::schema;

pub const DEFAULT_CHUNK_ROWS: usize = 50_000;

#[derive(Clone, Debug)]
pub struct ExportRequest {
    pub node: String,
    /// Requested column names; empty means every inferred column.
    pub columns: Vec<String>,
    pub rows: RowSelection,
    pub output: PathBuf,
    pub chunk_rows: usize,
}

impl ExportRequest {
    pub fn new(node: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            node: node.into(),
            columns: Vec::new(),
            rows: RowSelection::All,
            output: output.into(),
            chunk_rows: DEFAULT_CHUNK_ROWS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Complete {
        rows_written: usize,
        chunks: usize,
        columns: Vec<String>,
        /// Requested columns absent from the sample read, dropped with a
        /// warning.
        dropped_columns: Vec<String>,
    },
    /// Cooperative stop between chunks. The partial output file stays.
    Cancelled {
        chunks_written: usize,
        rows_written: usize,
    },
}

/// Runs an export job to completion, cancellation, or failure.
///
/// Progress milestones: 0 initializing, 5 validating, 10 planned, chunk
/// work inside `CHUNK_BAND`, 90 finalizing, 100 complete.
pub fn export(
    handle: &H5Handle,
    request: &ExportRequest,
    mut progress: impl FnMut(f64, &str),
    cancel: &CancelToken,
) -> Result<ExportOutcome, Error> {
    progress(0.0, "initializing export");
    let chunk_rows = if request.chunk_rows == 0 {
        DEFAULT_CHUNK_ROWS
    } else {
        request.chunk_rows
    };

    let descriptor = schema::describe(handle, &request.node)?;
    if !descriptor.is_exportable() {
        return Err(Error::new(ErrorKind::Unsupported)
            .with_message("no columns identified; node is not exportable")
            .with_path(handle.path())
            .with_node(&request.node)
            .with_phase("validate"));
    }
    let total_rows = descriptor.row_count.ok_or_else(|| {
        Error::new(ErrorKind::Format)
            .with_message("row count unavailable")
            .with_path(handle.path())
            .with_node(&request.node)
            .with_phase("validate")
    })?;

    progress(5.0, "validating columns");
    let sample = reader::read(handle, &request.node, Some((0, 1)))
        .map_err(|err| err.with_phase("validate"))?;
    let requested: &[String] = if request.columns.is_empty() {
        descriptor.columns.as_slice()
    } else {
        request.columns.as_slice()
    };
    let mut columns = Vec::new();
    let mut dropped = Vec::new();
    for name in requested {
        if sample.column_index(name).is_some() {
            columns.push(name.clone());
        } else {
            warn!(column = %name, node = %request.node, "requested column not found; skipping");
            dropped.push(name.clone());
        }
    }
    if columns.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("none of the requested columns exist")
            .with_path(handle.path())
            .with_node(&request.node)
            .with_phase("validate"));
    }

    let plan = plan_chunks(&request.rows, total_rows, chunk_rows)
        .map_err(|err| err.with_node(&request.node).with_phase("plan"))?;
    let n_chunks = plan.n_chunks();
    progress(
        10.0,
        &format!("planned {n_chunks} chunks covering {} rows", plan.total_selected),
    );

    // Open once; the first chunk carries the header, later chunks append
    // through the same writer.
    let mut writer = csv::Writer::from_path(&request.output).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("cannot open output: {err}"))
            .with_path(request.output.clone())
            .with_phase("write")
    })?;
    writer
        .write_record(&columns)
        .map_err(|err| write_error(err, &request.output))?;

    let mut rows_written = 0usize;
    let mut chunks_written = 0usize;
    for step in &plan.steps {
        if cancel.is_cancelled() {
            writer
                .flush()
                .map_err(|err| Error::from(err).with_phase("write"))?;
            progress(CHUNK_BAND.at(chunks_written, n_chunks), "cancelled");
            debug!(chunks_written, rows_written, "export cancelled between chunks");
            return Ok(ExportOutcome::Cancelled {
                chunks_written,
                rows_written,
            });
        }

        let (start, end) = step.window.bounds();
        let chunk = reader::read(handle, &request.node, Some((start, end)))
            .map_err(|err| err.with_phase("write"))?;
        let chunk = chunk.project(&columns).map_err(|err| {
            err.with_node(&request.node).with_phase("write")
        })?;

        match &step.window {
            ReadWindow::Slice { .. } => {
                for row in chunk.rows() {
                    writer
                        .write_record(row.iter().map(|cell| cell.render()))
                        .map_err(|err| write_error(err, &request.output))?;
                    rows_written += 1;
                }
            }
            ReadWindow::Covering { keep, .. } => {
                for &offset in keep {
                    let Some(row) = chunk.rows().get(offset) else {
                        continue;
                    };
                    writer
                        .write_record(row.iter().map(|cell| cell.render()))
                        .map_err(|err| write_error(err, &request.output))?;
                    rows_written += 1;
                }
            }
        }
        chunks_written += 1;
        debug!(chunk = chunks_written, total = n_chunks, rows_written, "chunk written");
        progress(
            CHUNK_BAND.at(chunks_written, n_chunks),
            &format!("chunk {chunks_written}/{n_chunks}"),
        );
    }

    progress(90.0, "finalizing");
    writer
        .flush()
        .map_err(|err| Error::from(err).with_phase("finalize"))?;
    drop(writer);

    // Guards against silent zero-row exports: the file must exist and
    // hold bytes even when no write reported an error.
    let metadata = std::fs::metadata(&request.output).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("output file missing after export")
            .with_path(request.output.clone())
            .with_phase("finalize")
            .with_source(err)
    })?;
    if metadata.len() == 0 {
        return Err(Error::new(ErrorKind::Internal)
            .with_message("export produced an empty file")
            .with_path(request.output.clone())
            .with_phase("finalize"));
    }

    progress(100.0, "complete");
    Ok(ExportOutcome::Complete {
        rows_written,
        chunks: chunks_written,
        columns,
        dropped_columns: dropped,
    })
}

fn write_error(err: csv::Error, output: &std::path::Path) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(format!("csv write failed: {err}"))
        .with_path(output.to_path_buf())
        .with_phase("write")
}
