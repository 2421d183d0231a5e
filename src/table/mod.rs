pub mod loader;
pub mod writer;

use crate::error::TableError;
use std::fmt;

pub const ID_COLUMN: &str = "Id";
pub const NAME_COLUMN: &str = "Name";
pub const DESCRIPTION_COLUMN: &str = "Description";

/// Columns every input file must carry, in the order they are reported.
pub const REQUIRED_COLUMNS: [&str; 3] = [NAME_COLUMN, ID_COLUMN, DESCRIPTION_COLUMN];

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Blank,
}

impl CellValue {
    /// The text content, if this is a non-blank string cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Blank => Ok(()),
        }
    }
}

static BLANK: CellValue = CellValue::Blank;

/// One record. Cells are aligned with the owning table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    pub fn get(&self, index: usize) -> &CellValue {
        self.cells.get(index).unwrap_or(&BLANK)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Look up a column that must exist.
    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name).ok_or_else(|| TableError::Schema {
            missing: vec![name.to_string()],
        })
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r.get(col))
    }

    /// Fail with a schema error naming every required column that is absent.
    pub fn validate_schema(&self) -> Result<(), TableError> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| self.column_index(c).is_none())
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TableError::Schema { missing })
        }
    }

    /// The rewriting instruction carried by row zero's name cell.
    pub fn instruction(&self) -> Result<String, TableError> {
        let invalid = || {
            TableError::Instruction(
                "The first cell in the 'Name' column must contain a valid SEO prompt.".to_string(),
            )
        };
        let name_col = self.require_column(NAME_COLUMN)?;
        let first = self.rows.first().ok_or_else(invalid)?;
        first
            .get(name_col)
            .as_text()
            .map(|s| s.trim().to_string())
            .ok_or_else(invalid)
    }

    /// Number of rows after the instruction row.
    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}
