//! Core table definitions shared by decoding, normalization and encoding.
//!
//! Tables are column-oriented: every transform in this pipeline works on a
//! whole column (rename, encode, numeric projection), never on a single row.

use std::fmt;

use serde::{Serialize, Serializer};

/// Scalar value of one uploaded cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Build a cell from free text, recognising blanks and plain numbers.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Text rendering used when a numeric cell must be read as a code.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => Some(format!("{}", *v as i64)),
            Cell::Number(v) => Some(v.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("<empty>"),
        }
    }
}

/// A named column of cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// A column is numeric when every non-empty cell holds a number.
    pub fn is_numeric(&self) -> bool {
        self.cells.iter().all(|c| !matches!(c, Cell::Text(_)))
    }
}

/// Tabular upload, one `Column` per header cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Build a table, padding short columns with `Empty` up to the longest one.
    pub fn new(mut columns: Vec<Column>) -> Self {
        let rows = columns.iter().map(|c| c.cells.len()).max().unwrap_or(0);
        for column in columns.iter_mut() {
            column.cells.resize(rows, Cell::Empty);
        }
        Self { columns, rows }
    }

    /// Build from a header and row-major cells, padding short rows with `Empty`.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let n_rows = rows.len();
        let mut columns: Vec<Column> = header
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(n_rows)))
            .collect();
        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.cells.push(cells.next().unwrap_or(Cell::Empty));
            }
        }
        Self {
            columns,
            rows: n_rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn columns_mut(&mut self) -> impl Iterator<Item = &mut Column> {
        self.columns.iter_mut()
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

/// Numeric-only projection of a table: `None` marks an empty cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NumericFrame {
    pub names: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
    pub rows: usize,
}

impl NumericFrame {
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx].as_slice())
    }
}

/// Per-row identifier taken from the upload, or its 1-based position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmbryoId {
    Text(String),
    Number(i64),
    Position(usize),
}

/// Serializes as the bare string or number.
impl Serialize for EmbryoId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EmbryoId::Text(text) => serializer.serialize_str(text),
            EmbryoId::Number(n) => serializer.serialize_i64(*n),
            EmbryoId::Position(p) => serializer.serialize_u64(*p as u64),
        }
    }
}
