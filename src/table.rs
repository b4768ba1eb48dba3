use serde::{Deserialize, Serialize};

/// A single cell value as handed over by the spreadsheet-reading
/// collaborator. The engine never reads workbooks itself; it consumes an
/// already-extracted (header-row, row-label, cell-value) structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

/// One labelled data row: the row label names a financial line item, the
/// cells line up with the table's column headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub label: String,
    pub cells: Vec<CellValue>,
}

/// A wide P&L table in memory: one header row of column captions (dates
/// and/or category labels) and one row per financial field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub column_headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Builds a table from a header row and labelled rows. Headers and
    /// labels are trimmed; ragged rows are padded with `Empty` (or
    /// truncated) to the header width, since exported sheets are rarely
    /// rectangular.
    pub fn new(column_headers: Vec<String>, rows: Vec<(String, Vec<CellValue>)>) -> Self {
        let column_headers: Vec<String> =
            column_headers.into_iter().map(|h| h.trim().to_string()).collect();
        let width = column_headers.len();

        let rows = rows
            .into_iter()
            .map(|(label, mut cells)| {
                cells.resize(width, CellValue::Empty);
                RawRow {
                    label: label.trim().to_string(),
                    cells,
                }
            })
            .collect();

        Self {
            column_headers,
            rows,
        }
    }

    pub fn width(&self) -> usize {
        self.column_headers.len()
    }

    /// Cell at (row, column); `Empty` for anything out of range.
    pub fn value_at(&self, row: usize, column: usize) -> CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.cells.get(column))
            .cloned()
            .unwrap_or(CellValue::Empty)
    }
}
