//! Tab-delimited text representation of a [`Matrix`].
//!
//! Layout: one header row naming the columns, an optional `#!{Type}` row
//! carrying one type code per column, then one line per record. Tabs or
//! newlines inside text cells are written as-is and are not escaped, so such
//! values do not survive a round trip.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;

use super::{Column, ColumnData, ColumnKind, Matrix, MatrixError};

/// Delimiter used by the script exchange protocol.
pub const DELIMITER: char = '\t';

const ANNOTATION_PREFIX: &str = "#!{";
const TYPE_ROW_PREFIX: &str = "#!{Type}";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("no header row")]
    Empty,
    #[error("line {line}: expected {expected} fields as in the header, found {actual}")]
    FieldCount {
        line: usize,
        expected: usize,
        actual: usize,
    },
    #[error("type row has {actual} entries for {expected} columns")]
    TypeRowLength { expected: usize, actual: usize },
    #[error("unknown type code '{code}' for column '{column}'")]
    UnknownTypeCode { code: String, column: String },
    #[error("line {line}: value '{value}' in numeric column '{column}' is not a number")]
    NotNumeric {
        line: usize,
        column: String,
        value: String,
    },
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("cannot open matrix file '{}': {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("cannot write matrix file '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("malformed matrix file '{}': {source}", path.display())]
    Format { path: PathBuf, source: FormatError },
}

/// Writes `matrix` to `path`, replacing any existing content.
pub fn write(matrix: &Matrix, path: &Path, include_annotation_rows: bool) -> Result<(), MarshalError> {
    let to_err = |source| MarshalError::Write { path: path.to_path_buf(), source };
    let file = File::create(path).map_err(to_err)?;
    let mut w = BufWriter::new(file);
    write_to(matrix, &mut w, include_annotation_rows).map_err(to_err)?;
    w.flush().map_err(to_err)
}

/// Clears `matrix` and fills it from `path`.
///
/// `matrix` is only touched once the whole file has been parsed.
pub fn read(matrix: &mut Matrix, path: &Path, delimiter: char) -> Result<(), MarshalError> {
    let file = File::open(path).map_err(|source| MarshalError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = read_from(BufReader::new(file), delimiter).map_err(|source| MarshalError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), shape = %parsed, "read matrix");
    *matrix = parsed;
    Ok(())
}

pub fn write_to<W: Write>(matrix: &Matrix, w: &mut W, include_annotation_rows: bool) -> io::Result<()> {
    let sep = DELIMITER.to_string();
    writeln!(w, "{}", matrix.column_names().join(&sep))?;
    if include_annotation_rows {
        let codes: Vec<&str> = matrix.columns().iter().map(|c| c.kind.type_code()).collect();
        writeln!(w, "{}{}", TYPE_ROW_PREFIX, codes.join(&sep))?;
    }
    for row in 0..matrix.row_count() {
        let cells: Vec<String> = matrix
            .columns()
            .iter()
            .map(|c| c.cell(row).unwrap_or_default())
            .collect();
        writeln!(w, "{}", cells.join(&sep))?;
    }
    Ok(())
}

pub fn read_from<R: BufRead>(reader: R, delimiter: char) -> Result<Matrix, FormatError> {
    let mut lines = reader.lines().enumerate();

    let header = match lines.next() {
        Some((_, line)) => strip_cr(line?),
        None => return Err(FormatError::Empty),
    };
    // A blank header line is a matrix without columns.
    let names: Vec<String> = if header.is_empty() {
        Vec::new()
    } else {
        header.split(delimiter).map(str::to_string).collect()
    };

    let mut kinds: Option<Vec<ColumnKind>> = None;
    let mut rows: Vec<(usize, Vec<String>)> = Vec::new();
    for (idx, line) in lines {
        let line_no = idx + 1;
        let line = strip_cr(line?);
        if let Some(codes) = line.strip_prefix(TYPE_ROW_PREFIX) {
            kinds = Some(parse_type_row(codes, delimiter, &names)?);
            continue;
        }
        if line.starts_with(ANNOTATION_PREFIX) {
            debug!(line = line_no, "skipping unsupported annotation row");
            continue;
        }
        let fields: Vec<String> = line.split(delimiter).map(str::to_string).collect();
        if fields.len() != names.len() {
            return Err(FormatError::FieldCount {
                line: line_no,
                expected: names.len(),
                actual: fields.len(),
            });
        }
        rows.push((line_no, fields));
    }

    let mut matrix = Matrix::new();
    for (j, name) in names.into_iter().enumerate() {
        let kind = match &kinds {
            Some(k) => k[j],
            None => infer_kind(rows.iter().map(|(_, r)| r[j].as_str())),
        };
        let column = if kind.is_numeric() {
            let mut values = Vec::with_capacity(rows.len());
            for (line, r) in &rows {
                values.push(parse_number(&r[j]).ok_or_else(|| FormatError::NotNumeric {
                    line: *line,
                    column: name.clone(),
                    value: r[j].clone(),
                })?);
            }
            Column { name, kind, data: ColumnData::Numeric(values) }
        } else {
            let values = rows.iter().map(|(_, r)| r[j].clone()).collect();
            Column { name, kind, data: ColumnData::Text(values) }
        };
        matrix.add_column(column)?;
    }
    Ok(matrix)
}

fn parse_type_row(codes: &str, delimiter: char, names: &[String]) -> Result<Vec<ColumnKind>, FormatError> {
    let codes: Vec<&str> = codes.split(delimiter).collect();
    if codes.len() != names.len() {
        return Err(FormatError::TypeRowLength {
            expected: names.len(),
            actual: codes.len(),
        });
    }
    codes
        .iter()
        .zip(names)
        .map(|(code, name)| {
            ColumnKind::from_type_code(code).ok_or_else(|| FormatError::UnknownTypeCode {
                code: code.to_string(),
                column: name.clone(),
            })
        })
        .collect()
}

// Without a type row a column is numeric only when it has rows and every cell
// is the exact rendering of its own value, so writing it back reproduces the
// text. `007`, `1.0` or an empty cell keep the column as text.
fn infer_kind<'a>(mut cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut any_value = false;
    let numeric = cells.all(|c| {
        any_value = true;
        is_canonical_number(c)
    });
    if numeric && any_value {
        ColumnKind::Main
    } else {
        ColumnKind::Text
    }
}

fn is_canonical_number(cell: &str) -> bool {
    match cell.parse::<f64>() {
        Ok(v) => v.to_string() == cell,
        Err(_) => false,
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}

fn strip_cr(mut line: String) -> String {
    if line.ends_with('\r') {
        line.pop();
    }
    line
}
