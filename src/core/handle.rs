//! Purpose: Scoped read-only access to one HDF5 container.
//! Exports: `H5Handle`, `NodeEntry`, `NodeKind`.
//! Role: The only module that opens files; every bounded operation gets its
//! own handle and the file closes when the handle drops.
//! Invariants: Files are opened read-only; no handle outlives its operation.
//! Invariants: Node lookup errors carry file and node context.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A leaf dataset (typed multi-dimensional array).
    Dataset,
    /// A group following the `axis0`/`block<N>_*` stored-table convention.
    Table,
    /// A plain group with no recognized tabular layout.
    Group,
}

#[derive(Clone, Debug, Serialize)]
pub struct NodeEntry {
    pub path: String,
    pub kind: NodeKind,
}

pub struct H5Handle {
    path: PathBuf,
    file: hdf5::File,
}

impl H5Handle {
    /// Opens the container read-only. Open failures distinguish a missing
    /// file from one that is not a valid HDF5 container.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message("file not found")
                .with_path(path));
        }
        let file = hdf5::File::open(&path).map_err(|err| {
            Error::new(ErrorKind::Format)
                .with_message(format!("not a readable HDF5 file: {err}"))
                .with_path(path.clone())
        })?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dataset(&self, node: &str) -> Result<hdf5::Dataset, Error> {
        self.file.dataset(node).map_err(|_| {
            Error::new(ErrorKind::NotFound)
                .with_message("dataset not found")
                .with_path(self.path.clone())
                .with_node(node)
        })
    }

    pub fn group(&self, node: &str) -> Result<hdf5::Group, Error> {
        self.file.group(node).map_err(|_| {
            Error::new(ErrorKind::NotFound)
                .with_message("group not found")
                .with_path(self.path.clone())
                .with_node(node)
        })
    }

    /// Classifies an addressable node. Anything that is neither a dataset
    /// nor a group is reported as not found.
    pub fn node_kind(&self, node: &str) -> Result<NodeKind, Error> {
        if self.file.dataset(node).is_ok() {
            return Ok(NodeKind::Dataset);
        }
        match self.file.group(node) {
            Ok(group) => {
                if group_is_stored_table(&group) {
                    Ok(NodeKind::Table)
                } else {
                    Ok(NodeKind::Group)
                }
            }
            Err(_) => Err(Error::new(ErrorKind::NotFound)
                .with_message("no dataset or group at path")
                .with_path(self.path.clone())
                .with_node(node)),
        }
    }

    /// Recursively lists leaf datasets and stored-table groups, sorted by
    /// path. Stored-table groups are reported as a single entry; their
    /// encoding datasets are not listed separately.
    pub fn list_nodes(&self) -> Result<Vec<NodeEntry>, Error> {
        let root = self.file.group("/").map_err(Error::from)?;
        let mut entries = Vec::new();
        walk_group(&root, "", &mut entries)?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

fn walk_group(group: &hdf5::Group, prefix: &str, out: &mut Vec<NodeEntry>) -> Result<(), Error> {
    let names = group.member_names().map_err(Error::from)?;
    for name in names {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        if let Ok(child) = group.group(&name) {
            if group_is_stored_table(&child) {
                out.push(NodeEntry {
                    path,
                    kind: NodeKind::Table,
                });
            } else {
                walk_group(&child, &path, out)?;
            }
        } else if group.dataset(&name).is_ok() {
            out.push(NodeEntry {
                path,
                kind: NodeKind::Dataset,
            });
        }
    }
    Ok(())
}

/// A group encodes a table when it carries the pandas fixed-format
/// convention nodes: an `axis0` label dataset or any `block<N>_items` /
/// `block<N>_values` pair.
pub(crate) fn group_is_stored_table(group: &hdf5::Group) -> bool {
    let Ok(names) = group.member_names() else {
        return false;
    };
    names.iter().any(|name| {
        name == "axis0" || block_number(name, "_items").is_some() || block_number(name, "_values").is_some()
    })
}

/// Parses `block<N><suffix>` names, returning `N`. Used to order and match
/// the stored-table sibling datasets.
pub(crate) fn block_number(name: &str, suffix: &str) -> Option<u32> {
    let middle = name.strip_prefix("block")?.strip_suffix(suffix)?;
    if middle.is_empty() {
        return None;
    }
    middle.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::block_number;

    #[test]
    fn block_number_parses_convention_names() {
        assert_eq!(block_number("block0_items", "_items"), Some(0));
        assert_eq!(block_number("block12_values", "_values"), Some(12));
        assert_eq!(block_number("block_items", "_items"), None);
        assert_eq!(block_number("blockx_items", "_items"), None);
        assert_eq!(block_number("axis0", "_items"), None);
        assert_eq!(block_number("block1_values", "_items"), None);
    }
}
