use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Map, Number, Value};

use super::error::NormalizeError;
use super::selector::extension_of;

/// Column delimiter for delimited text files.
///
/// The two character escape `\t` typed in a text box and a real tab are the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separator(u8);

impl Default for Separator {
    fn default() -> Self {
        Self::COMMA
    }
}

impl Separator {
    pub const COMMA: Separator = Separator(b',');
    pub const TAB: Separator = Separator(b'\t');

    /// Interpret a separator as entered by the user. Empty means comma.
    pub fn parse(raw: &str) -> Result<Self, NormalizeError> {
        if raw == "\\t" || raw == "\t" {
            return Ok(Self::TAB);
        }
        if raw.is_empty() {
            return Ok(Self::COMMA);
        }
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Ok(Self(c as u8)),
            _ => Err(NormalizeError::BadSeparator(raw.to_string())),
        }
    }

    pub fn as_byte(&self) -> u8 {
        self.0
    }
}

/// Supported table file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Delimited,
    Spreadsheet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match extension_of(path).as_str() {
            "csv" => Some(Self::Delimited),
            "xlsx" | "xlsm" => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

/// A table read from a delimited file or a spreadsheet.
///
/// When the source had no header the column identifiers are the zero-based column
/// indices written as strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from raw rows, taking the first row as the header if asked to.
    fn from_rows(mut rows: Vec<Vec<Value>>, header: bool) -> Self {
        let columns = if header && !rows.is_empty() {
            rows.remove(0)
                .into_iter()
                .enumerate()
                .map(|(idx, cell)| match cell {
                    Value::Null => format!("Unnamed: {idx}"),
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect()
        } else {
            let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
            (0..width).map(|idx| idx.to_string()).collect()
        };
        Self { columns, rows }
    }

    /// Find a column.
    ///
    /// With a header the key is the literal header text. Without one the key is the
    /// column index written as an integer.
    pub fn column_index(&self, key: &str, header: bool) -> Option<usize> {
        if header {
            self.columns.iter().position(|c| c == key)
        } else {
            key.trim()
                .parse::<usize>()
                .ok()
                .filter(|idx| *idx < self.columns.len())
        }
    }

    /// All values of a column, padding short rows with null
    pub fn column_values(&self, idx: usize) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(idx).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Look up a column by key and return its values
    pub fn column(&self, key: &str, header: bool) -> Option<Vec<Value>> {
        self.column_index(key, header)
            .map(|idx| self.column_values(idx))
    }

    /// One object per row keyed by column identifier
    pub fn records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(idx, col)| (col.clone(), row.get(idx).cloned().unwrap_or(Value::Null)))
                    .collect();
                Value::Object(record)
            })
            .collect()
    }
}

/// Read a CSV or XLSX/XLSM table.
///
/// `sheet` picks a worksheet by name, falling back to the first one. `separator` only
/// applies to delimited files.
pub fn read_table(
    path: &Path,
    sheet: Option<&str>,
    separator: Separator,
    header: bool,
) -> Result<Table, NormalizeError> {
    if !path.exists() {
        return Err(NormalizeError::MissingFile(path.to_path_buf()));
    }
    let rows = match TableFormat::from_path(path) {
        Some(TableFormat::Delimited) => read_delimited_rows(path, separator)?,
        Some(TableFormat::Spreadsheet) => read_spreadsheet_rows(path, sheet)?,
        None => {
            return Err(NormalizeError::BadShape(format!(
                "{} is not a table file",
                path.display()
            )))
        }
    };
    Ok(Table::from_rows(rows, header))
}

fn read_delimited_rows(path: &Path, separator: Separator) -> Result<Vec<Vec<Value>>, NormalizeError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator.as_byte())
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(infer_scalar).collect());
    }
    Ok(rows)
}

fn read_spreadsheet_rows(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<Value>>, NormalizeError> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names();
    let name = match sheet.filter(|s| names.iter().any(|n| n == s)) {
        Some(s) => s.to_string(),
        None => names
            .first()
            .cloned()
            .ok_or_else(|| NormalizeError::BadShape(format!("{} has no sheets", path.display())))?,
    };
    let range = workbook.worksheet_range(&name)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect())
}

const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::from(*i),
        // Workbooks store every number as a float
        Data::Float(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT => Value::from(*f as i64),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) | Data::DurationIso(_) => {
            Value::String(cell.to_string())
        }
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

/// Turn a text cell into the JSON scalar it most likely represents
pub fn infer_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match trimmed {
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
