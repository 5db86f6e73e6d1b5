//! Purpose: Exact-value scan over one column, in row-order chunks.
//! Exports: `search`, `SearchRequest`, `SearchOutcome`, `ChunkPolicy`.
//! Role: The "specific instance" filter: accumulates matching rows
//! incrementally so a caller can show running match counts.
//! Invariants: Chunks are processed strictly in ascending row order.
//! Invariants: Numeric comparison is attempted first for numeric cells;
//! a target that fails numeric parsing falls back to literal text
//! comparison instead of erroring.

use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::handle::H5Handle;
use crate::core::progress::CancelToken;
use crate::core::reader;
use crate::core::schema;
use crate::core::table::{CellValue, Table};

/// Row-count-adaptive chunk sizing: ordered `(min_rows, chunk_rows)`
/// breakpoints, largest first. Datasets below every breakpoint scan as a
/// single chunk. Tuning policy, not a contract.
#[derive(Clone, Debug)]
pub struct ChunkPolicy {
    breakpoints: Vec<(usize, usize)>,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            breakpoints: vec![
                (10_000_000, 500_000),
                (1_000_000, 100_000),
                (100_000, 50_000),
            ],
        }
    }
}

impl ChunkPolicy {
    pub fn new(mut breakpoints: Vec<(usize, usize)>) -> Self {
        breakpoints.sort_by(|a, b| b.0.cmp(&a.0));
        Self { breakpoints }
    }

    pub fn chunk_rows(&self, total_rows: usize) -> usize {
        for &(min_rows, chunk_rows) in &self.breakpoints {
            if total_rows > min_rows {
                return chunk_rows;
            }
        }
        total_rows.max(1)
    }
}

#[derive(Clone, Debug)]
pub struct SearchRequest {
    pub node: String,
    pub column: String,
    /// Exact target value, as typed by the caller.
    pub target: String,
    pub policy: ChunkPolicy,
}

impl SearchRequest {
    pub fn new(
        node: impl Into<String>,
        column: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            column: column.into(),
            target: target.into(),
            policy: ChunkPolicy::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub matches: Table,
    pub chunks_scanned: usize,
    pub total_chunks: usize,
    pub cancelled: bool,
}

/// Scans the node for rows whose `column` cell exactly matches the
/// target. Progress is reported once per chunk with the running match
/// count; cancellation is polled between chunks and yields the matches
/// accumulated so far.
pub fn search(
    handle: &H5Handle,
    request: &SearchRequest,
    mut progress: impl FnMut(f64, &str),
    cancel: &CancelToken,
) -> Result<SearchOutcome, Error> {
    progress(0.0, "initializing search");
    let descriptor = schema::describe(handle, &request.node)?;
    if !descriptor.is_exportable() {
        return Err(Error::new(ErrorKind::Unsupported)
            .with_message("no columns identified; node is not searchable")
            .with_path(handle.path())
            .with_node(&request.node)
            .with_phase("validate"));
    }
    if !descriptor.columns.iter().any(|c| c == &request.column) {
        return Err(Error::new(ErrorKind::NotFound)
            .with_message("column not present in node")
            .with_path(handle.path())
            .with_node(&request.node)
            .with_column(&request.column)
            .with_phase("validate"));
    }
    let total_rows = descriptor.row_count.ok_or_else(|| {
        Error::new(ErrorKind::Format)
            .with_message("row count unavailable")
            .with_path(handle.path())
            .with_node(&request.node)
            .with_phase("validate")
    })?;

    let chunk_rows = request.policy.chunk_rows(total_rows);
    let total_chunks = total_rows.div_ceil(chunk_rows).max(1);
    let target = Target::parse(&request.target);
    debug!(total_rows, chunk_rows, total_chunks, "scan plan");

    let mut matches: Option<Table> = None;
    let mut match_count = 0usize;
    let mut chunks_scanned = 0usize;
    let mut start = 0usize;
    while start < total_rows {
        if cancel.is_cancelled() {
            return Ok(SearchOutcome {
                matches: matches.unwrap_or_default(),
                chunks_scanned,
                total_chunks,
                cancelled: true,
            });
        }
        let end = (start + chunk_rows).min(total_rows);
        let chunk = reader::read(handle, &request.node, Some((start, end)))
            .map_err(|err| err.with_phase("scan"))?;
        let column_idx = chunk.column_index(&request.column).ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message("column missing from chunk")
                .with_node(&request.node)
                .with_column(&request.column)
                .with_phase("scan")
        })?;

        let accumulated = matches.get_or_insert_with(|| Table::new(chunk.columns().to_vec()));
        for row in chunk.rows() {
            if cell_matches(&row[column_idx], &target) {
                accumulated.push_row(row.clone())?;
                match_count += 1;
            }
        }

        chunks_scanned += 1;
        progress(
            100.0 * chunks_scanned as f64 / total_chunks as f64,
            &format!("chunk {chunks_scanned}/{total_chunks} - {match_count} matches so far"),
        );
        start = end;
    }

    Ok(SearchOutcome {
        matches: matches.unwrap_or_default(),
        chunks_scanned,
        total_chunks,
        cancelled: false,
    })
}

/// Pre-parsed target value. Numeric parses are attempted once up front;
/// the literal text is always retained for the string fallback.
#[derive(Clone, Debug)]
struct Target {
    int: Option<i64>,
    float: Option<f64>,
    text: String,
}

impl Target {
    fn parse(text: &str) -> Self {
        Self {
            int: text.trim().parse().ok(),
            float: text.trim().parse().ok(),
            text: text.to_string(),
        }
    }
}

/// Exact-match rule: numeric cells compare numerically when the target
/// parsed as a number, otherwise every comparison is the cell's rendered
/// text against the literal target.
fn cell_matches(cell: &CellValue, target: &Target) -> bool {
    match cell {
        CellValue::Int(v) => match (target.int, target.float) {
            (Some(i), _) => *v == i,
            (None, Some(f)) => (*v as f64) == f,
            (None, None) => cell.render() == target.text,
        },
        CellValue::UInt(v) => match (target.int, target.float) {
            (Some(i), _) => i >= 0 && *v == i as u64,
            (None, Some(f)) => (*v as f64) == f,
            (None, None) => cell.render() == target.text,
        },
        CellValue::Float(v) => match target.float {
            Some(f) => *v == f,
            None => cell.render() == target.text,
        },
        _ => cell.render() == target.text,
    }
}

#[cfg(test)]
mod tests {
    use super::{cell_matches, ChunkPolicy, Target};
    use crate::core::table::CellValue;

    #[test]
    fn numeric_targets_compare_numerically() {
        let target = Target::parse("42");
        assert!(cell_matches(&CellValue::Int(42), &target));
        assert!(cell_matches(&CellValue::UInt(42), &target));
        assert!(!cell_matches(&CellValue::Int(41), &target));

        let target = Target::parse("2.5");
        assert!(cell_matches(&CellValue::Float(2.5), &target));
        assert!(cell_matches(&CellValue::Int(2), &Target::parse("2.0")));
    }

    #[test]
    fn unparseable_target_falls_back_to_text_compare() {
        let target = Target::parse("abc");
        assert!(!cell_matches(&CellValue::Int(7), &target));
        assert!(!cell_matches(&CellValue::Float(7.5), &target));
        assert!(cell_matches(&CellValue::Text("abc".into()), &target));
    }

    #[test]
    fn text_cells_always_compare_literally() {
        let target = Target::parse("42");
        assert!(cell_matches(&CellValue::Text("42".into()), &target));
        assert!(!cell_matches(&CellValue::Text(" 42".into()), &target));
    }

    #[test]
    fn negative_target_never_matches_unsigned() {
        let target = Target::parse("-1");
        assert!(!cell_matches(&CellValue::UInt(u64::MAX), &target));
        assert!(cell_matches(&CellValue::Int(-1), &target));
    }

    #[test]
    fn chunk_policy_breakpoints_are_ordered() {
        let policy = ChunkPolicy::default();
        assert_eq!(policy.chunk_rows(20_000_000), 500_000);
        assert_eq!(policy.chunk_rows(2_000_000), 100_000);
        assert_eq!(policy.chunk_rows(200_000), 50_000);
        assert_eq!(policy.chunk_rows(5_000), 5_000);
        assert_eq!(policy.chunk_rows(0), 1);

        let custom = ChunkPolicy::new(vec![(10, 2), (100, 50)]);
        assert_eq!(custom.chunk_rows(500), 50);
        assert_eq!(custom.chunk_rows(50), 2);
    }
}
