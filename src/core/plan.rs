//! Purpose: Plan chunked reads for export without performing any I/O.
//! Exports: `plan_chunks`, `ExportPlan`, `ChunkStep`, `ReadWindow`,
//! `RowSelection`.
//! Role: Pure planning layer used by `export` (and tests) to turn a row
//! selection into an ordered list of bounded reads.
//! Invariants: No side effects; output depends only on the selection, the
//! dataset extent, and the chunk size.
//! Invariants: Windows ascend and never exceed the extent; sparse windows
//! carry the in-window offsets to keep.

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowSelection {
    All,
    /// Deduplicated, ascending indices (as produced by `parse_row_selection`).
    Indices(Vec<usize>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadWindow {
    /// Contiguous run: read `[start, end)` and keep every row.
    Slice { start: usize, end: usize },
    /// Sparse run: read the covering range `[start, end)`, then keep only
    /// the rows at these offsets within the window.
    Covering {
        start: usize,
        end: usize,
        keep: Vec<usize>,
    },
}

impl ReadWindow {
    pub fn bounds(&self) -> (usize, usize) {
        match self {
            ReadWindow::Slice { start, end } => (*start, *end),
            ReadWindow::Covering { start, end, .. } => (*start, *end),
        }
    }

    /// Number of selected rows this window contributes.
    pub fn selected_rows(&self) -> usize {
        match self {
            ReadWindow::Slice { start, end } => end - start,
            ReadWindow::Covering { keep, .. } => keep.len(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkStep {
    pub index: usize,
    pub window: ReadWindow,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportPlan {
    pub steps: Vec<ChunkStep>,
    pub total_selected: usize,
}

impl ExportPlan {
    pub fn n_chunks(&self) -> usize {
        self.steps.len()
    }
}

/// Builds the chunk plan for a selection against a dataset with
/// `total_rows` rows.
///
/// `All` and contiguous ascending index runs become plain slice windows.
/// Sparse selections are chunked by selected-row count; each chunk reads
/// its covering range and discards unselected rows in memory. Indices at
/// or past the extent are clamped away; a selection left empty by that is
/// a usage error raised before any file exists.
pub fn plan_chunks(
    selection: &RowSelection,
    total_rows: usize,
    chunk_rows: usize,
) -> Result<ExportPlan, Error> {
    if chunk_rows == 0 {
        return Err(Error::new(ErrorKind::Usage).with_message("chunk size must be positive"));
    }
    match selection {
        RowSelection::All => {
            if total_rows == 0 {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("dataset has no rows to export"));
            }
            Ok(slice_plan(0, total_rows, chunk_rows))
        }
        RowSelection::Indices(indices) => {
            let clamped: Vec<usize> = indices.iter().copied().filter(|&i| i < total_rows).collect();
            if clamped.is_empty() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("no selected rows within the dataset extent"));
            }
            if is_contiguous(&clamped) {
                let start = clamped[0];
                let end = clamped[clamped.len() - 1] + 1;
                Ok(slice_plan(start, end, chunk_rows))
            } else {
                Ok(covering_plan(&clamped, chunk_rows))
            }
        }
    }
}

fn is_contiguous(indices: &[usize]) -> bool {
    indices.windows(2).all(|pair| pair[0] + 1 == pair[1])
}

fn slice_plan(start: usize, end: usize, chunk_rows: usize) -> ExportPlan {
    let mut steps = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let chunk_end = (cursor + chunk_rows).min(end);
        steps.push(ChunkStep {
            index: steps.len(),
            window: ReadWindow::Slice {
                start: cursor,
                end: chunk_end,
            },
        });
        cursor = chunk_end;
    }
    ExportPlan {
        total_selected: end - start,
        steps,
    }
}

fn covering_plan(indices: &[usize], chunk_rows: usize) -> ExportPlan {
    let mut steps = Vec::new();
    for group in indices.chunks(chunk_rows) {
        let start = group[0];
        let end = group[group.len() - 1] + 1;
        let keep = group.iter().map(|&i| i - start).collect();
        steps.push(ChunkStep {
            index: steps.len(),
            window: ReadWindow::Covering { start, end, keep },
        });
    }
    ExportPlan {
        total_selected: indices.len(),
        steps,
    }
}
