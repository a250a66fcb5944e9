//! In-memory matrix model exchanged with external scripts.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod format;

/// Role of a column inside a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Main numeric values (expression columns).
    Main,
    /// Numeric row annotation.
    Numeric,
    /// Categorical row annotation; multiple categories are `;`-separated.
    Categorical,
    /// Free text row annotation.
    Text,
}

impl ColumnKind {
    /// Code used in the `#!{Type}` annotation row.
    pub fn type_code(self) -> &'static str {
        match self {
            Self::Main => "E",
            Self::Numeric => "N",
            Self::Categorical => "C",
            Self::Text => "T",
        }
    }

    pub fn from_type_code(code: &str) -> Option<Self> {
        match code.trim() {
            "E" => Some(Self::Main),
            "N" => Some(Self::Numeric),
            "C" => Some(Self::Categorical),
            "T" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Main | Self::Numeric)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, kind: ColumnKind, values: Vec<f64>) -> Self {
        Self { name: name.into(), kind, data: ColumnData::Numeric(values) }
    }

    pub fn text(name: impl Into<String>, kind: ColumnKind, values: Vec<String>) -> Self {
        Self { name: name.into(), kind, data: ColumnData::Text(values) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Textual rendering of one cell, exactly as it is written to disk.
    pub fn cell(&self, row: usize) -> Option<String> {
        match &self.data {
            ColumnData::Numeric(v) => v.get(row).map(|x| x.to_string()),
            ColumnData::Text(v) => v.get(row).cloned(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MatrixError {
    #[error("column '{name}' has {actual} rows but the matrix has {expected}")]
    RowCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("column '{name}' of kind {kind:?} cannot hold {data} values")]
    KindMismatch {
        name: String,
        kind: ColumnKind,
        data: &'static str,
    },
}

/// An ordered set of equally long, named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix {
    columns: Vec<Column>,
}

impl Matrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self, MatrixError> {
        let mut m = Self::new();
        for c in columns {
            m.add_column(c)?;
        }
        Ok(m)
    }

    pub fn add_column(&mut self, column: Column) -> Result<(), MatrixError> {
        let data = match column.data {
            ColumnData::Numeric(_) => "numeric",
            ColumnData::Text(_) => "text",
        };
        if column.kind.is_numeric() != matches!(column.data, ColumnData::Numeric(_)) {
            return Err(MatrixError::KindMismatch {
                name: column.name,
                kind: column.kind,
                data,
            });
        }
        if let Some(first) = self.columns.first() {
            let actual = column.len();
            if first.len() != actual {
                return Err(MatrixError::RowCountMismatch {
                    name: column.name,
                    expected: first.len(),
                    actual,
                });
            }
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<String> {
        self.columns.get(col).and_then(|c| c.cell(row))
    }

    /// Drops all columns and rows.
    pub fn clear(&mut self) {
        self.columns.clear();
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} columns x {} rows", self.column_count(), self.row_count())
    }
}
