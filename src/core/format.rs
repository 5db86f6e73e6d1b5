//! Purpose: Render samples, tables, and descriptors as display text.
//! Exports: `format_sample`, `format_table`, `format_descriptor`.
//! Role: Display-only; nothing here is reused by export or search.
//! Invariants: Output is plain text with stable layout; truncation is
//! always called out so a viewer never mistakes a sample for the whole.

use std::fmt::Write as _;

use crate::core::reader::{SampleData, SampleRead, ValueClass};
use crate::core::schema::Descriptor;
use crate::core::table::{CellValue, Table};

const RULE: &str = "--------------------------------------------------";
const MAX_CELL_WIDTH: usize = 20;
const MAX_FLAT_STATS_VALUES: usize = 100;

pub fn format_sample(sample: &SampleRead) -> String {
    let total: usize = sample.shape.iter().product();
    match &sample.data {
        SampleData::Empty => "Empty dataset".to_string(),
        SampleData::OneD(cells) => {
            let title = match sample.class {
                ValueClass::Text => "String Values",
                ValueClass::Numeric => "Numeric Values",
                ValueClass::Other => "Dataset Values",
            };
            let mut out = format!("{title}:\n{RULE}\n");
            for (i, cell) in cells.iter().enumerate() {
                let _ = writeln!(out, "[{i:4}]  {}", clip(&cell.render()));
            }
            if sample.truncated {
                let _ = write!(
                    out,
                    "\n... (showing first {} of {} total elements)",
                    cells.len(),
                    total
                );
            }
            out
        }
        SampleData::TwoD(rows) => format_matrix(rows, sample),
        SampleData::Flat(cells) => match sample.class {
            ValueClass::Numeric => format_flat_numeric(cells, sample),
            _ => format_flat_generic(cells, sample),
        },
    }
}

fn format_matrix(rows: &[Vec<CellValue>], sample: &SampleRead) -> String {
    let title = match sample.class {
        ValueClass::Text => "String Array (2D)",
        ValueClass::Numeric => "Numeric Array (2D)",
        ValueClass::Other => "Dataset Array (2D)",
    };
    let mut out = format!("{title}:\n{RULE}\n");
    let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);

    // Right-justified columns sized to their widest rendered cell.
    let mut widths = vec![0usize; n_cols];
    for row in rows {
        for (j, cell) in row.iter().enumerate() {
            widths[j] = widths[j].max(clip(&cell.render()).len()).min(MAX_CELL_WIDTH);
        }
    }
    for (i, row) in rows.iter().enumerate() {
        let line = row
            .iter()
            .enumerate()
            .map(|(j, cell)| format!("{:>width$}", clip(&cell.render()), width = widths[j]))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "[{i:4}]  {line}");
    }
    if sample.truncated {
        let total_rows = sample.shape.first().copied().unwrap_or(0);
        let _ = write!(
            out,
            "\n... (showing first {} rows of {} total rows)",
            rows.len(),
            total_rows
        );
    }
    out
}

fn format_flat_numeric(cells: &[CellValue], sample: &SampleRead) -> String {
    let values: Vec<f64> = cells.iter().filter_map(|c| c.as_f64()).collect();
    let mut out = format!("Numeric Array ({}D):\n{RULE}\n", sample.shape.len());
    let _ = writeln!(out, "Shape: {:?}", sample.shape);
    if !values.is_empty() {
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance =
            values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
        let _ = writeln!(out, "Min: {min}");
        let _ = writeln!(out, "Max: {max}");
        let _ = writeln!(out, "Mean: {mean}");
        let _ = writeln!(out, "Std: {}", variance.sqrt());
    }
    let _ = writeln!(out, "\nSample values (flattened):");
    for (i, cell) in cells.iter().take(MAX_FLAT_STATS_VALUES).enumerate() {
        let _ = writeln!(out, "[{i:4}]  {}", cell.render());
    }
    if cells.len() > MAX_FLAT_STATS_VALUES || sample.truncated {
        let total: usize = sample.shape.iter().product();
        let shown = cells.len().min(MAX_FLAT_STATS_VALUES);
        let _ = write!(out, "... (showing first {shown} of {total} total elements)");
    }
    out
}

fn format_flat_generic(cells: &[CellValue], sample: &SampleRead) -> String {
    let mut out = format!(
        "Dataset Array ({}D, flattened view):\n{RULE}\n",
        sample.shape.len()
    );
    let _ = writeln!(out, "Shape: {:?}", sample.shape);
    let _ = writeln!(out, "Data type: {}\n", sample.dtype);
    for (i, cell) in cells.iter().enumerate() {
        let _ = writeln!(out, "[{i:4}]  {}", clip(&cell.render()));
    }
    if sample.truncated {
        let total: usize = sample.shape.iter().product();
        let _ = write!(
            out,
            "... (showing first {} of {total} total elements)",
            cells.len()
        );
    }
    out
}

/// Aligned preview of a table slice. `total_rows` adds a truncation note
/// when the slice is shorter than the node.
pub fn format_table(table: &Table, total_rows: Option<usize>) -> String {
    let mut widths: Vec<usize> = table
        .columns()
        .iter()
        .map(|name| clip(name).len())
        .collect();
    for row in table.rows() {
        for (j, cell) in row.iter().enumerate() {
            widths[j] = widths[j].max(clip(&cell.render()).len()).min(MAX_CELL_WIDTH);
        }
    }

    let header = table
        .columns()
        .iter()
        .enumerate()
        .map(|(j, name)| format!("{:>width$}", clip(name), width = widths[j]))
        .collect::<Vec<_>>()
        .join("  ");
    let mut out = format!("        {header}\n{RULE}\n");
    for (i, row) in table.rows().iter().enumerate() {
        let line = row
            .iter()
            .enumerate()
            .map(|(j, cell)| format!("{:>width$}", clip(&cell.render()), width = widths[j]))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "[{i:4}]  {line}");
    }
    if let Some(total) = total_rows {
        if table.n_rows() < total {
            let _ = write!(
                out,
                "\n... (showing first {} rows of {total} total rows)",
                table.n_rows()
            );
        }
    }
    out
}

pub fn format_descriptor(descriptor: &Descriptor) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Path: {}", descriptor.path));
    if descriptor.shape.is_empty() {
        lines.push("Shape: (inferred)".to_string());
    } else {
        lines.push(format!("Shape: {:?}", descriptor.shape));
    }
    lines.push(format!("Data Type: {}", descriptor.dtype));
    lines.push(format!("Total Elements: {}", descriptor.size));
    lines.push(format!("Dimensions: {}", descriptor.ndim));
    match descriptor.row_count {
        Some(rows) => lines.push(format!("Rows: {rows}")),
        None => lines.push("Rows: unavailable".to_string()),
    }
    if let Some(chunk) = &descriptor.chunk {
        lines.push(format!("Chunk Shape: {chunk:?}"));
    }
    if let Some(compression) = &descriptor.compression {
        lines.push(format!("Compression: {compression}"));
    }
    if descriptor.columns.is_empty() {
        lines.push("Columns: none identified (not exportable)".to_string());
    } else {
        lines.push(format!("Columns: {}", descriptor.columns.len()));
        let preview: Vec<&str> = descriptor
            .columns
            .iter()
            .take(10)
            .map(String::as_str)
            .collect();
        let suffix = if descriptor.columns.len() > 10 { ", ..." } else { "" };
        lines.push(format!("  [{}{}]", preview.join(", "), suffix));
    }
    if !descriptor.attributes.is_empty() {
        lines.push(String::new());
        lines.push("Attributes:".to_string());
        for (key, value) in &descriptor.attributes {
            lines.push(format!("  {key}: {value}"));
        }
    }
    lines.join("\n")
}

fn clip(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
        clipped.push_str("...");
        clipped
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{format_descriptor, format_sample, format_table};
    use crate::core::handle::NodeKind;
    use crate::core::reader::{SampleData, SampleRead, ValueClass};
    use crate::core::schema::Descriptor;
    use crate::core::table::{CellValue, Table};

    #[test]
    fn one_d_sample_lists_indexed_values() {
        let sample = SampleRead {
            data: SampleData::OneD(vec![CellValue::Int(10), CellValue::Int(20)]),
            truncated: true,
            shape: vec![5],
            dtype: "int64".to_string(),
            class: ValueClass::Numeric,
        };
        let text = format_sample(&sample);
        assert!(text.starts_with("Numeric Values:"));
        assert!(text.contains("[   0]  10"));
        assert!(text.contains("[   1]  20"));
        assert!(text.contains("showing first 2 of 5 total elements"));
    }

    #[test]
    fn flat_sample_reports_stats() {
        let sample = SampleRead {
            data: SampleData::Flat(vec![
                CellValue::Float(1.0),
                CellValue::Float(2.0),
                CellValue::Float(3.0),
            ]),
            truncated: false,
            shape: vec![1, 1, 3],
            dtype: "float64".to_string(),
            class: ValueClass::Numeric,
        };
        let text = format_sample(&sample);
        assert!(text.contains("Min: 1"));
        assert!(text.contains("Max: 3"));
        assert!(text.contains("Mean: 2"));
    }

    #[test]
    fn table_preview_notes_truncation() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        table
            .push_row(vec![CellValue::Int(1), CellValue::Text("x".into())])
            .unwrap();
        let text = format_table(&table, Some(10));
        assert!(text.contains('a'));
        assert!(text.contains("[   0]"));
        assert!(text.contains("showing first 1 rows of 10 total rows"));
    }

    #[test]
    fn descriptor_marks_non_exportable_nodes() {
        let descriptor = Descriptor {
            path: "plain".to_string(),
            kind: NodeKind::Group,
            shape: Vec::new(),
            dtype: "group".to_string(),
            size: 0,
            ndim: 0,
            columns: Vec::new(),
            row_count: None,
            chunk: None,
            compression: None,
            attributes: BTreeMap::new(),
        };
        let text = format_descriptor(&descriptor);
        assert!(text.contains("not exportable"));
        assert!(text.contains("Rows: unavailable"));
        assert!(!text.contains("Chunk Shape"));
    }

    #[test]
    fn descriptor_reports_storage_layout_when_present() {
        let descriptor = Descriptor {
            path: "readings".to_string(),
            kind: NodeKind::Dataset,
            shape: vec![1000],
            dtype: "float64".to_string(),
            size: 1000,
            ndim: 1,
            columns: Vec::new(),
            row_count: Some(1000),
            chunk: Some(vec![128]),
            compression: Some("Deflate(4)".to_string()),
            attributes: BTreeMap::new(),
        };
        let text = format_descriptor(&descriptor);
        assert!(text.contains("Chunk Shape: [128]"));
        assert!(text.contains("Compression: Deflate(4)"));
    }
}
