//! Purpose: Infer a tabular schema for any node in the container.
//! Exports: `Descriptor`, `describe`, `dtype_label`.
//! Role: Reconciles the raw dataset/group model with the tabular model via
//! an ordered chain of independent column-inference strategies.
//! Invariants: Inference never fails; read errors degrade to "no columns".
//! Invariants: An empty column list means non-exportable, never an error.

use std::collections::BTreeMap;

use hdf5::types::TypeDescriptor;
use serde::Serialize;

use crate::core::error::Error;
use crate::core::handle::{block_number, H5Handle, NodeKind};

#[derive(Clone, Debug, Serialize)]
pub struct Descriptor {
    pub path: String,
    pub kind: NodeKind,
    /// Dimension sizes; empty for stored tables (shape is inferred, not
    /// read from a single dataset header).
    pub shape: Vec<usize>,
    pub dtype: String,
    pub size: usize,
    pub ndim: usize,
    /// Inferred column names; empty means the node is not tabular.
    pub columns: Vec<String>,
    pub row_count: Option<usize>,
    /// Chunk shape for chunked leaf datasets; `None` for contiguous
    /// storage and for groups.
    pub chunk: Option<Vec<usize>>,
    /// Applied filter pipeline (compression and friends), rendered as
    /// text; `None` when the pipeline is empty.
    pub compression: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl Descriptor {
    pub fn is_exportable(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Builds the descriptor for a node. Columns, once inferred, are stable
/// for the lifetime of the handle (the file is opened read-only).
pub fn describe(handle: &H5Handle, node: &str) -> Result<Descriptor, Error> {
    match handle.node_kind(node)? {
        NodeKind::Dataset => describe_dataset(handle, node),
        NodeKind::Table => describe_table(handle, node),
        NodeKind::Group => {
            let group = handle.group(node)?;
            Ok(Descriptor {
                path: node.to_string(),
                kind: NodeKind::Group,
                shape: Vec::new(),
                dtype: "group".to_string(),
                size: 0,
                ndim: 0,
                columns: Vec::new(),
                row_count: None,
                chunk: None,
                compression: None,
                attributes: read_attributes(&group),
            })
        }
    }
}

fn describe_dataset(handle: &H5Handle, node: &str) -> Result<Descriptor, Error> {
    let ds = handle.dataset(node)?;
    let shape = ds.shape();
    let td = ds.dtype().and_then(|dt| dt.to_descriptor()).ok();
    let columns = td.as_ref().map(compound_field_names).unwrap_or_default();
    let dtype = td
        .as_ref()
        .map(dtype_label)
        .unwrap_or_else(|| "unknown".to_string());
    let row_count = shape.first().copied();
    let filters = ds.filters();
    let compression = if filters.is_empty() {
        None
    } else {
        Some(
            filters
                .iter()
                .map(|f| format!("{f:?}"))
                .collect::<Vec<_>>()
                .join(", "),
        )
    };
    Ok(Descriptor {
        path: node.to_string(),
        kind: NodeKind::Dataset,
        size: ds.size(),
        ndim: shape.len(),
        shape,
        dtype,
        columns,
        row_count,
        chunk: ds.chunk(),
        compression,
        attributes: read_attributes(&ds),
    })
}

fn describe_table(handle: &H5Handle, node: &str) -> Result<Descriptor, Error> {
    let group = handle.group(node)?;
    let columns = infer_group_columns(&group);
    let row_count = infer_group_row_count(&group);
    let size = row_count.unwrap_or(0) * columns.len();
    Ok(Descriptor {
        path: node.to_string(),
        kind: NodeKind::Table,
        shape: Vec::new(),
        dtype: "table".to_string(),
        size,
        ndim: 2,
        columns,
        row_count,
        chunk: None,
        compression: None,
        attributes: read_attributes(&group),
    })
}

/// Ordered fallback chain for group column inference. Strategies are
/// independent; the first non-empty result wins. Appending a new storage
/// convention means appending a strategy here.
const GROUP_COLUMN_STRATEGIES: &[fn(&hdf5::Group) -> Vec<String>] =
    &[columns_from_axis0, columns_from_block_items];

pub(crate) fn infer_group_columns(group: &hdf5::Group) -> Vec<String> {
    for strategy in GROUP_COLUMN_STRATEGIES {
        let columns = strategy(group);
        if !columns.is_empty() {
            return columns;
        }
    }
    Vec::new()
}

/// Strategy 1: an `axis0` child holds the full column-label sequence.
fn columns_from_axis0(group: &hdf5::Group) -> Vec<String> {
    match group.dataset("axis0") {
        Ok(ds) => read_labels(&ds),
        Err(_) => Vec::new(),
    }
}

/// Strategy 2: concatenate `block<N>_items` labels in ascending `<N>`.
fn columns_from_block_items(group: &hdf5::Group) -> Vec<String> {
    let Ok(names) = group.member_names() else {
        return Vec::new();
    };
    let mut blocks: Vec<(u32, String)> = names
        .into_iter()
        .filter_map(|name| block_number(&name, "_items").map(|n| (n, name)))
        .collect();
    blocks.sort_by_key(|(n, _)| *n);

    let mut columns = Vec::new();
    for (_, name) in blocks {
        if let Ok(ds) = group.dataset(&name) {
            columns.extend(read_labels(&ds));
        }
    }
    columns
}

/// Row count: max first-dimension extent among `block<N>_values` siblings.
pub(crate) fn infer_group_row_count(group: &hdf5::Group) -> Option<usize> {
    let names = group.member_names().ok()?;
    names
        .iter()
        .filter(|name| block_number(name, "_values").is_some())
        .filter_map(|name| group.dataset(name).ok())
        .filter_map(|ds| ds.shape().first().copied())
        .max()
}

/// Reads a 1-D label dataset as strings. Byte strings are decoded as UTF-8
/// by the HDF5 string conversion; numeric labels render through their
/// canonical text form. Any failure degrades to no labels.
fn read_labels(ds: &hdf5::Dataset) -> Vec<String> {
    let Ok(td) = ds.dtype().and_then(|dt| dt.to_descriptor()) else {
        return Vec::new();
    };
    match td {
        TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => ds
            .read_1d::<hdf5::types::VarLenUnicode>()
            .map(|arr| arr.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default(),
        TypeDescriptor::Integer(_) => ds
            .read_1d::<i64>()
            .map(|arr| arr.iter().map(|v| v.to_string()).collect())
            .unwrap_or_default(),
        TypeDescriptor::Unsigned(_) => ds
            .read_1d::<u64>()
            .map(|arr| arr.iter().map(|v| v.to_string()).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Compound field names in declaration order; empty for scalar types.
pub(crate) fn compound_field_names(td: &TypeDescriptor) -> Vec<String> {
    match td {
        TypeDescriptor::Compound(compound) => {
            compound.fields.iter().map(|f| f.name.clone()).collect()
        }
        _ => Vec::new(),
    }
}

pub fn dtype_label(td: &TypeDescriptor) -> String {
    match td {
        TypeDescriptor::Integer(size) => format!("int{}", 8 * *size as usize),
        TypeDescriptor::Unsigned(size) => format!("uint{}", 8 * *size as usize),
        TypeDescriptor::Float(size) => format!("float{}", 8 * *size as usize),
        TypeDescriptor::Boolean => "bool".to_string(),
        TypeDescriptor::Enum(_) => "enum".to_string(),
        TypeDescriptor::Compound(compound) => format!("compound[{}]", compound.fields.len()),
        TypeDescriptor::FixedAscii(n) | TypeDescriptor::FixedUnicode(n) => {
            format!("string[{n}]")
        }
        TypeDescriptor::VarLenAscii | TypeDescriptor::VarLenUnicode => "string".to_string(),
        TypeDescriptor::FixedArray(inner, n) => format!("array[{}; {n}]", dtype_label(inner)),
        TypeDescriptor::VarLenArray(inner) => format!("vlen[{}]", dtype_label(inner)),
    }
}

/// Renders scalar attributes as text; array attributes and unreadable
/// values are skipped rather than failing the describe call.
fn read_attributes(obj: &hdf5::Location) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let Ok(names) = obj.attr_names() else {
        return out;
    };
    for name in names {
        let Ok(attr) = obj.attr(&name) else { continue };
        if attr.size() != 1 {
            continue;
        }
        let Ok(td) = attr.dtype().and_then(|dt| dt.to_descriptor()) else {
            continue;
        };
        let rendered = match td {
            TypeDescriptor::Integer(_) => attr.read_scalar::<i64>().map(|v| v.to_string()).ok(),
            TypeDescriptor::Unsigned(_) => attr.read_scalar::<u64>().map(|v| v.to_string()).ok(),
            TypeDescriptor::Float(_) => attr.read_scalar::<f64>().map(|v| v.to_string()).ok(),
            TypeDescriptor::Boolean => attr.read_scalar::<bool>().map(|v| v.to_string()).ok(),
            TypeDescriptor::FixedAscii(_)
            | TypeDescriptor::FixedUnicode(_)
            | TypeDescriptor::VarLenAscii
            | TypeDescriptor::VarLenUnicode => attr
                .read_scalar::<hdf5::types::VarLenUnicode>()
                .map(|v| v.to_string())
                .ok(),
            _ => None,
        };
        if let Some(value) = rendered {
            out.insert(name, value);
        }
    }
    out
}
