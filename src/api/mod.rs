//! Purpose: Define the stable public API boundary for h5scope.
//! Exports: The `Inspector` client plus the core types the CLI and tests
//! consume.
//! Role: Public, additive-only surface; callers do not reach into `core`
//! module internals.
//! Invariants: Every `Inspector` operation opens its own scoped read-only
//! handle; no file handle survives across operations.

use std::path::PathBuf;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::export::{ExportOutcome, ExportRequest, DEFAULT_CHUNK_ROWS};
pub use crate::core::format::{format_descriptor, format_sample, format_table};
pub use crate::core::handle::{H5Handle, NodeEntry, NodeKind};
pub use crate::core::plan::RowSelection;
pub use crate::core::progress::CancelToken;
pub use crate::core::reader::{SampleData, SampleRead, DEFAULT_MAX_ELEMENTS};
pub use crate::core::schema::Descriptor;
pub use crate::core::search::{ChunkPolicy, SearchOutcome, SearchRequest};
pub use crate::core::select::parse_row_selection;
pub use crate::core::table::{CellValue, Table};

use crate::core::{export, reader, schema, search};

/// Client over one HDF5 file path. Each operation opens the file
/// read-only, does its bounded work, and closes it again, so two
/// inspectors over different files never share state.
#[derive(Clone, Debug)]
pub struct Inspector {
    path: PathBuf,
}

impl Inspector {
    /// Validates that the file exists and is a readable HDF5 container.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        H5Handle::open(&path)?;
        Ok(Self { path })
    }

    /// Sorted leaf datasets and stored-table groups in the container.
    pub fn list(&self) -> Result<Vec<NodeEntry>, Error> {
        let handle = H5Handle::open(&self.path)?;
        handle.list_nodes()
    }

    pub fn describe(&self, node: &str) -> Result<Descriptor, Error> {
        let handle = H5Handle::open(&self.path)?;
        schema::describe(&handle, node)
    }

    /// Bounded row-range read of a leaf dataset or stored table.
    pub fn read(&self, node: &str, range: Option<(usize, usize)>) -> Result<Table, Error> {
        let handle = H5Handle::open(&self.path)?;
        reader::read(&handle, node, range)
    }

    /// Element-budgeted display sample of a leaf dataset.
    pub fn sample(&self, node: &str, max_elements: usize) -> Result<SampleRead, Error> {
        let handle = H5Handle::open(&self.path)?;
        reader::read_sample(&handle, node, max_elements)
    }

    /// Chunked CSV export; long-running, preemptible between chunks.
    pub fn export(
        &self,
        request: &ExportRequest,
        progress: impl FnMut(f64, &str),
        cancel: &CancelToken,
    ) -> Result<ExportOutcome, Error> {
        let handle = H5Handle::open(&self.path)?;
        export::export(&handle, request, progress, cancel)
    }

    /// Exact-value scan; long-running, preemptible between chunks.
    pub fn search(
        &self,
        request: &SearchRequest,
        progress: impl FnMut(f64, &str),
        cancel: &CancelToken,
    ) -> Result<SearchOutcome, Error> {
        let handle = H5Handle::open(&self.path)?;
        search::search(&handle, request, progress, cancel)
    }
}
