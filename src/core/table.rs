// In-memory tabular slice produced by bounded reads and consumed by
// export, search, and display. Rows are row-major; cells are widened
// scalars (all integer widths land in i64/u64, floats in f64).
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::UInt(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Canonical text rendering, used for CSV cells and string matching.
    pub fn render(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(v) => v.to_string(),
            CellValue::Int(v) => v.to_string(),
            CellValue::UInt(v) => v.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Text(v) => v.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), Error> {
        if row.len() != self.columns.len() {
            return Err(Error::new(ErrorKind::Internal).with_message(format!(
                "row width {} does not match {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// New table keeping only the named columns, in the given order.
    pub fn project(&self, keep: &[String]) -> Result<Table, Error> {
        let mut indices = Vec::with_capacity(keep.len());
        for name in keep {
            let idx = self.column_index(name).ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message("column not present in slice")
                    .with_column(name.clone())
            })?;
            indices.push(idx);
        }
        let mut out = Table::new(keep.to_vec());
        for row in &self.rows {
            let projected = indices.iter().map(|&i| row[i].clone()).collect();
            out.push_row(projected)?;
        }
        Ok(out)
    }

    /// First `n` rows, cloned. Used for previews.
    pub fn head(&self, n: usize) -> Table {
        let mut out = Table::new(self.columns.clone());
        out.rows = self.rows.iter().take(n).cloned().collect();
        out
    }
}
