//! Purpose: Bounded reads of leaf datasets and stored-table groups.
//! Exports: `read`, `read_sample`, `SampleRead`, `SampleData`, `ValueClass`,
//! `DEFAULT_MAX_ELEMENTS`.
//! Role: The only module that moves dataset values into memory; everything
//! above it works on `Table` slices.
//! Invariants: Row ranges are clamped to the first-dimension extent before
//! any dataset access.
//! Invariants: Scalar values are widened on read (i64/u64/f64/string) via
//! the HDF5 type-conversion machinery; no per-width code paths.

use hdf5::types::{TypeDescriptor, VarLenUnicode};
use ndarray::s;

use crate::core::error::{Error, ErrorKind};
use crate::core::handle::{block_number, H5Handle, NodeKind};
use crate::core::schema::{infer_group_columns, infer_group_row_count};
use crate::core::table::{CellValue, Table};

pub const DEFAULT_MAX_ELEMENTS: usize = 10_000;

/// Broad value class of a dataset's element type, used by the display
/// formatter to pick a layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueClass {
    Text,
    Numeric,
    Other,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SampleData {
    Empty,
    OneD(Vec<CellValue>),
    TwoD(Vec<Vec<CellValue>>),
    /// N-D (N>2) data flattened for display; shape is dropped on purpose.
    Flat(Vec<CellValue>),
}

#[derive(Clone, Debug)]
pub struct SampleRead {
    pub data: SampleData,
    pub truncated: bool,
    pub shape: Vec<usize>,
    pub dtype: String,
    pub class: ValueClass,
}

/// Clamps a half-open row range to `[0, extent)`. `None` means the whole
/// extent.
pub(crate) fn clamp_range(extent: usize, range: Option<(usize, usize)>) -> (usize, usize) {
    match range {
        None => (0, extent),
        Some((start, end)) => {
            let end = end.min(extent);
            (start.min(end), end)
        }
    }
}

/// Reads a row-bounded slice of a node as a table.
///
/// Leaf datasets: 1-D slices become a single `value` column; 2-D scalar
/// slices get positional `c<j>` headers (read/display naming only, the
/// descriptor still reports such nodes as non-tabular). Stored-table
/// groups are reconstructed from their block datasets.
pub fn read(handle: &H5Handle, node: &str, range: Option<(usize, usize)>) -> Result<Table, Error> {
    match handle.node_kind(node)? {
        NodeKind::Dataset => read_leaf(handle, node, range),
        NodeKind::Table => read_stored_table(handle, node, range),
        NodeKind::Group => Err(Error::new(ErrorKind::Unsupported)
            .with_message("group has no recognized tabular layout")
            .with_path(handle.path())
            .with_node(node)
            .with_phase("read")),
    }
}

fn read_leaf(handle: &H5Handle, node: &str, range: Option<(usize, usize)>) -> Result<Table, Error> {
    let ds = handle.dataset(node)?;
    let td = descriptor_of(&ds, handle, node)?;
    if matches!(td, TypeDescriptor::Compound(_)) {
        return Err(Error::new(ErrorKind::Unsupported)
            .with_message("compound element reads are not supported")
            .with_path(handle.path())
            .with_node(node)
            .with_phase("read")
            .with_hint("Compound fields appear as columns in `info`; export is available for stored-table groups."));
    }
    let shape = ds.shape();
    match shape.len() {
        1 => {
            let (start, end) = clamp_range(shape[0], range);
            let cells = read_cells_1d(&ds, &td, start, end)
                .map_err(|err| err.with_node(node).with_phase("read"))?;
            let mut table = Table::new(vec!["value".to_string()]);
            for cell in cells {
                table.push_row(vec![cell])?;
            }
            Ok(table)
        }
        2 => {
            let (start, end) = clamp_range(shape[0], range);
            let rows = read_cells_2d(&ds, &td, start, end)
                .map_err(|err| err.with_node(node).with_phase("read"))?;
            let columns = (0..shape[1]).map(|j| format!("c{j}")).collect();
            let mut table = Table::new(columns);
            for row in rows {
                table.push_row(row)?;
            }
            Ok(table)
        }
        _ => Err(Error::new(ErrorKind::Unsupported)
            .with_message(format!("{}-dimensional data has no row-wise read", shape.len()))
            .with_path(handle.path())
            .with_node(node)
            .with_phase("read")
            .with_hint("Use a display sample; higher-rank data is flattened for preview only.")),
    }
}

/// Reconstructs a stored table from `block<N>_items`/`block<N>_values`
/// siblings, with columns ordered per the inferred column list. A layout
/// that does not match the convention fails the read; there is no deeper
/// fallback.
fn read_stored_table(
    handle: &H5Handle,
    node: &str,
    range: Option<(usize, usize)>,
) -> Result<Table, Error> {
    let group = handle.group(node)?;
    let columns = infer_group_columns(&group);
    if columns.is_empty() {
        return Err(Error::new(ErrorKind::Format)
            .with_message("no columns identified for stored table")
            .with_path(handle.path())
            .with_node(node)
            .with_phase("read"));
    }
    let total = infer_group_row_count(&group).unwrap_or(0);
    let (start, end) = clamp_range(total, range);

    let names = group.member_names().map_err(Error::from)?;
    let mut block_ids: Vec<u32> = names
        .iter()
        .filter_map(|name| block_number(name, "_items"))
        .collect();
    block_ids.sort_unstable();
    if block_ids.is_empty() {
        return Err(Error::new(ErrorKind::Format)
            .with_message("stored table has no block datasets")
            .with_path(handle.path())
            .with_node(node)
            .with_phase("read"));
    }

    // Per block: its item labels and its row slice as a cell matrix.
    let mut block_items: Vec<Vec<String>> = Vec::with_capacity(block_ids.len());
    let mut block_rows: Vec<Vec<Vec<CellValue>>> = Vec::with_capacity(block_ids.len());
    for id in &block_ids {
        let items_ds = group.dataset(&format!("block{id}_items")).map_err(|_| {
            stored_table_error(handle, node, format!("missing block{id}_items"))
        })?;
        let values_ds = group.dataset(&format!("block{id}_values")).map_err(|_| {
            stored_table_error(handle, node, format!("missing block{id}_values"))
        })?;
        let items = string_labels(&items_ds)
            .ok_or_else(|| stored_table_error(handle, node, format!("unreadable block{id}_items")))?;
        let td = descriptor_of(&values_ds, handle, node)?;
        let shape = values_ds.shape();
        let rows = match shape.len() {
            1 => {
                let (s0, e0) = clamp_range(shape[0], Some((start, end)));
                read_cells_1d(&values_ds, &td, s0, e0)?
                    .into_iter()
                    .map(|cell| vec![cell])
                    .collect()
            }
            2 => {
                let (s0, e0) = clamp_range(shape[0], Some((start, end)));
                read_cells_2d(&values_ds, &td, s0, e0)?
            }
            _ => {
                return Err(stored_table_error(
                    handle,
                    node,
                    format!("block{id}_values has rank {}", shape.len()),
                ))
            }
        };
        let width = rows.first().map(|r| r.len()).unwrap_or(items.len());
        if width != items.len() {
            return Err(stored_table_error(
                handle,
                node,
                format!(
                    "block{id} width {width} does not match {} item labels",
                    items.len()
                ),
            ));
        }
        block_items.push(items);
        block_rows.push(rows);
    }

    // Column -> (block, column-within-block), first block wins.
    let mut sources = Vec::with_capacity(columns.len());
    for column in &columns {
        let mut found = None;
        for (b, items) in block_items.iter().enumerate() {
            if let Some(j) = items.iter().position(|item| item == column) {
                found = Some((b, j));
                break;
            }
        }
        let source = found.ok_or_else(|| {
            stored_table_error(handle, node, format!("column `{column}` not present in any block"))
        })?;
        sources.push(source);
    }

    let n_rows = end.saturating_sub(start);
    let mut table = Table::new(columns);
    for r in 0..n_rows {
        let mut row = Vec::with_capacity(sources.len());
        for &(b, j) in &sources {
            let cell = block_rows[b]
                .get(r)
                .and_then(|cells| cells.get(j))
                .cloned()
                .unwrap_or(CellValue::Null);
            row.push(cell);
        }
        table.push_row(row)?;
    }
    Ok(table)
}

fn stored_table_error(handle: &H5Handle, node: &str, message: String) -> Error {
    Error::new(ErrorKind::Format)
        .with_message(format!("stored table layout not recognized: {message}"))
        .with_path(handle.path())
        .with_node(node)
        .with_phase("read")
}

/// Element-budgeted display sample of a leaf dataset.
///
/// Whole object when it fits; otherwise 1-D takes the first
/// `max_elements`, 2-D takes as many whole rows as fit (minimum one row,
/// or the first column alone for pathologically wide rows), and N-D data
/// is flattened to the first `max_elements`.
pub fn read_sample(handle: &H5Handle, node: &str, max_elements: usize) -> Result<SampleRead, Error> {
    let ds = handle.dataset(node)?;
    let td = descriptor_of(&ds, handle, node)?;
    if matches!(td, TypeDescriptor::Compound(_)) {
        return Err(Error::new(ErrorKind::Unsupported)
            .with_message("compound element reads are not supported")
            .with_path(handle.path())
            .with_node(node)
            .with_phase("sample"));
    }
    let shape = ds.shape();
    let size = ds.size();
    let class = value_class(&td);
    let dtype = crate::core::schema::dtype_label(&td);
    let max_elements = max_elements.max(1);

    let (data, truncated) = if size == 0 {
        (SampleData::Empty, false)
    } else if shape.len() == 1 {
        let truncated = size > max_elements;
        let end = shape[0].min(max_elements);
        (SampleData::OneD(read_cells_1d(&ds, &td, 0, end)?), truncated)
    } else if shape.len() == 2 {
        if size <= max_elements {
            (SampleData::TwoD(read_cells_2d(&ds, &td, 0, shape[0])?), false)
        } else {
            let n_cols = shape[1].max(1);
            let rows_to_take = (max_elements / n_cols).min(shape[0]);
            if rows_to_take > 0 {
                (
                    SampleData::TwoD(read_cells_2d(&ds, &td, 0, rows_to_take)?),
                    true,
                )
            } else {
                // One row alone exceeds the budget: fall back to the
                // first column so the caller still sees data.
                let column = read_first_column(&ds, &td, shape[0])?;
                (
                    SampleData::TwoD(column.into_iter().map(|cell| vec![cell]).collect()),
                    true,
                )
            }
        }
    } else {
        let truncated = size > max_elements;
        let mut cells = read_cells_flat(&ds, &td)?;
        cells.truncate(max_elements);
        (SampleData::Flat(cells), truncated)
    };

    Ok(SampleRead {
        data,
        truncated,
        shape,
        dtype,
        class,
    })
}

pub(crate) fn value_class(td: &TypeDescriptor) -> ValueClass {
    match td {
        TypeDescriptor::Integer(_)
        | TypeDescriptor::Unsigned(_)
        | TypeDescriptor::Float(_) => ValueClass::Numeric,
        TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => ValueClass::Text,
        _ => ValueClass::Other,
    }
}

fn descriptor_of(
    ds: &hdf5::Dataset,
    handle: &H5Handle,
    node: &str,
) -> Result<TypeDescriptor, Error> {
    ds.dtype().and_then(|dt| dt.to_descriptor()).map_err(|err| {
        Error::new(ErrorKind::Format)
            .with_message(format!("unreadable element type: {err}"))
            .with_path(handle.path())
            .with_node(node)
    })
}

fn read_cells_1d(
    ds: &hdf5::Dataset,
    td: &TypeDescriptor,
    start: usize,
    end: usize,
) -> Result<Vec<CellValue>, Error> {
    if end <= start {
        return Ok(Vec::new());
    }
    let cells = match td {
        TypeDescriptor::Integer(_) | TypeDescriptor::Enum(_) => ds
            .read_slice_1d::<i64, _>(s![start..end])
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::Int)
            .collect(),
        TypeDescriptor::Unsigned(_) => ds
            .read_slice_1d::<u64, _>(s![start..end])
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::UInt)
            .collect(),
        TypeDescriptor::Float(_) => ds
            .read_slice_1d::<f64, _>(s![start..end])
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::Float)
            .collect(),
        TypeDescriptor::Boolean => ds
            .read_slice_1d::<bool, _>(s![start..end])
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::Bool)
            .collect(),
        TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => ds
            .read_slice_1d::<VarLenUnicode, _>(s![start..end])
            .map_err(Error::from)?
            .into_iter()
            .map(|s| CellValue::Text(s.to_string()))
            .collect(),
        other => {
            return Err(Error::new(ErrorKind::Unsupported)
                .with_message(format!("unsupported element type: {}", crate::core::schema::dtype_label(other))))
        }
    };
    Ok(cells)
}

fn read_cells_2d(
    ds: &hdf5::Dataset,
    td: &TypeDescriptor,
    start: usize,
    end: usize,
) -> Result<Vec<Vec<CellValue>>, Error> {
    if end <= start {
        return Ok(Vec::new());
    }
    fn rows_of<T, F>(arr: ndarray::Array2<T>, map: F) -> Vec<Vec<CellValue>>
    where
        F: Fn(T) -> CellValue,
        T: Clone,
    {
        arr.outer_iter()
            .map(|row| row.iter().cloned().map(&map).collect())
            .collect()
    }
    let rows = match td {
        TypeDescriptor::Integer(_) | TypeDescriptor::Enum(_) => rows_of(
            ds.read_slice_2d::<i64, _>(s![start..end, ..])
                .map_err(Error::from)?,
            CellValue::Int,
        ),
        TypeDescriptor::Unsigned(_) => rows_of(
            ds.read_slice_2d::<u64, _>(s![start..end, ..])
                .map_err(Error::from)?,
            CellValue::UInt,
        ),
        TypeDescriptor::Float(_) => rows_of(
            ds.read_slice_2d::<f64, _>(s![start..end, ..])
                .map_err(Error::from)?,
            CellValue::Float,
        ),
        TypeDescriptor::Boolean => rows_of(
            ds.read_slice_2d::<bool, _>(s![start..end, ..])
                .map_err(Error::from)?,
            CellValue::Bool,
        ),
        TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => rows_of(
            ds.read_slice_2d::<VarLenUnicode, _>(s![start..end, ..])
                .map_err(Error::from)?,
            |s| CellValue::Text(s.to_string()),
        ),
        other => {
            return Err(Error::new(ErrorKind::Unsupported)
                .with_message(format!("unsupported element type: {}", crate::core::schema::dtype_label(other))))
        }
    };
    Ok(rows)
}

fn read_first_column(
    ds: &hdf5::Dataset,
    td: &TypeDescriptor,
    n_rows: usize,
) -> Result<Vec<CellValue>, Error> {
    let rows = match td {
        TypeDescriptor::Integer(_) | TypeDescriptor::Enum(_) => ds
            .read_slice_1d::<i64, _>(s![0..n_rows, 0])
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::Int)
            .collect(),
        TypeDescriptor::Unsigned(_) => ds
            .read_slice_1d::<u64, _>(s![0..n_rows, 0])
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::UInt)
            .collect(),
        TypeDescriptor::Float(_) => ds
            .read_slice_1d::<f64, _>(s![0..n_rows, 0])
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::Float)
            .collect(),
        TypeDescriptor::Boolean => ds
            .read_slice_1d::<bool, _>(s![0..n_rows, 0])
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::Bool)
            .collect(),
        TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => ds
            .read_slice_1d::<VarLenUnicode, _>(s![0..n_rows, 0])
            .map_err(Error::from)?
            .into_iter()
            .map(|s| CellValue::Text(s.to_string()))
            .collect(),
        other => {
            return Err(Error::new(ErrorKind::Unsupported)
                .with_message(format!("unsupported element type: {}", crate::core::schema::dtype_label(other))))
        }
    };
    Ok(rows)
}

/// Whole-dataset flat read for the N-D display path. Row-major element
/// order, truncated by the caller.
fn read_cells_flat(ds: &hdf5::Dataset, td: &TypeDescriptor) -> Result<Vec<CellValue>, Error> {
    let cells = match td {
        TypeDescriptor::Integer(_) | TypeDescriptor::Enum(_) => ds
            .read_raw::<i64>()
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::Int)
            .collect(),
        TypeDescriptor::Unsigned(_) => ds
            .read_raw::<u64>()
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::UInt)
            .collect(),
        TypeDescriptor::Float(_) => ds
            .read_raw::<f64>()
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::Float)
            .collect(),
        TypeDescriptor::Boolean => ds
            .read_raw::<bool>()
            .map_err(Error::from)?
            .into_iter()
            .map(CellValue::Bool)
            .collect(),
        TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => ds
            .read_raw::<VarLenUnicode>()
            .map_err(Error::from)?
            .into_iter()
            .map(|s| CellValue::Text(s.to_string()))
            .collect(),
        other => {
            return Err(Error::new(ErrorKind::Unsupported)
                .with_message(format!("unsupported element type: {}", crate::core::schema::dtype_label(other))))
        }
    };
    Ok(cells)
}

/// Labels of a 1-D string or integer dataset, or `None` when unreadable.
fn string_labels(ds: &hdf5::Dataset) -> Option<Vec<String>> {
    let td = ds.dtype().and_then(|dt| dt.to_descriptor()).ok()?;
    match td {
        TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => ds
            .read_1d::<VarLenUnicode>()
            .ok()
            .map(|arr| arr.iter().map(|s| s.to_string()).collect()),
        TypeDescriptor::Integer(_) => ds
            .read_1d::<i64>()
            .ok()
            .map(|arr| arr.iter().map(|v| v.to_string()).collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::clamp_range;

    #[test]
    fn clamp_range_bounds_end_and_start() {
        assert_eq!(clamp_range(10, None), (0, 10));
        assert_eq!(clamp_range(10, Some((2, 7))), (2, 7));
        assert_eq!(clamp_range(10, Some((2, 50))), (2, 10));
        assert_eq!(clamp_range(10, Some((50, 60))), (10, 10));
        assert_eq!(clamp_range(0, Some((0, 5))), (0, 0));
    }
}
