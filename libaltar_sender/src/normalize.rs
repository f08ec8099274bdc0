//! Turn the files picked for each selector into in-memory records.
//!
//! Every function takes the experiment folder and the selector settings and returns a
//! JSON value. An unselected input gives an empty object.
use std::path::Path;

use serde_json::{Map, Value};

use super::config::{ConfigSelector, MetricsSelector, ResultsSelector};
use super::error::NormalizeError;
use super::selector::{extension_of, selected_path, Selector};
use super::tabular::{read_table, Separator, TableFormat};

/// Separator used when joining nested keys
pub const FLATTEN_SEPARATOR: &str = "_";

const X_AXIS_KEY: &str = "x_axis";
const COLUMNS_KEY: &str = "columns";

/// Flatten nested objects into a single level, joining keys with `_`.
///
/// Lists are leaves and stay as they are. Anything that is not an object is returned
/// unchanged.
pub fn flatten(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut flat = Map::new();
            flatten_into(map, "", &mut flat);
            Value::Object(flat)
        }
        other => other,
    }
}

fn flatten_into(map: Map<String, Value>, parent: &str, flat: &mut Map<String, Value>) {
    for (key, value) in map {
        let full_key = if parent.is_empty() {
            key
        } else {
            format!("{parent}{FLATTEN_SEPARATOR}{key}")
        };
        match value {
            Value::Object(child) => flatten_into(child, &full_key, flat),
            leaf => {
                flat.insert(full_key, leaf);
            }
        }
    }
}

/// Read a JSON or YAML document
pub fn read_structured(path: &Path) -> Result<Value, NormalizeError> {
    if !path.exists() {
        return Err(NormalizeError::MissingFile(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    match extension_of(path).as_str() {
        "yaml" | "yml" => Ok(serde_yaml::from_str::<Value>(&text)?),
        _ => Ok(serde_json::from_str::<Value>(&text)?),
    }
}

fn unsupported(selector: Selector, path: &Path) -> NormalizeError {
    NormalizeError::UnsupportedFormat {
        selector,
        extension: extension_of(path),
    }
}

fn non_empty(sheet: &str) -> Option<&str> {
    let sheet = sheet.trim();
    if sheet.is_empty() {
        None
    } else {
        Some(sheet)
    }
}

/// Normalize the configuration file.
///
/// JSON and YAML give the document itself. When flattening, a top-level list gives its
/// first document flattened, or an empty object when the list is empty. Tables give one
/// record per row keyed by header.
pub fn normalize_config(folder: &Path, settings: &ConfigSelector) -> Result<Value, NormalizeError> {
    let Some(path) = settings.file_path(folder) else {
        return Ok(Value::Object(Map::new()));
    };
    if !Selector::Config.accepts(&path) {
        return Err(unsupported(Selector::Config, &path));
    }

    if TableFormat::from_path(&path).is_some() {
        let separator = Separator::parse(&settings.sep)?;
        let table = read_table(&path, non_empty(&settings.sheet), separator, true)?;
        return Ok(Value::Array(table.records()));
    }

    match read_structured(&path)? {
        // A flattened list of documents keeps only its first one
        Value::Array(items) if settings.flatten => Ok(items
            .into_iter()
            .next()
            .map(flatten)
            .unwrap_or_else(|| Value::Object(Map::new()))),
        data if settings.flatten => Ok(flatten(data)),
        data => Ok(data),
    }
}

/// Normalize the metrics table into `{"x_axis": [...], "columns": {name: [...]}}`.
///
/// `x_axis` is only present when a time column is enabled and found. Selected columns
/// that are not in the table are skipped.
pub fn normalize_metrics(folder: &Path, settings: &MetricsSelector) -> Result<Value, NormalizeError> {
    let mut metrics = Map::new();
    let Some(path) = selected_path(folder, &settings.name) else {
        return Ok(Value::Object(metrics));
    };
    if !Selector::Metrics.accepts(&path) {
        return Err(unsupported(Selector::Metrics, &path));
    }

    let separator = Separator::parse(&settings.sep)?;
    let table = read_table(&path, non_empty(&settings.sheet), separator, settings.header)?;

    if settings.has_time && !settings.time_col.is_empty() {
        match table.column(&settings.time_col, settings.header) {
            Some(values) => {
                metrics.insert(X_AXIS_KEY.to_string(), Value::Array(values));
            }
            None => spdlog::warn!(
                "Time column {:?} not found in {}",
                settings.time_col,
                path.display()
            ),
        }
    }

    let mut columns = Map::new();
    for col in settings.selected_cols.iter() {
        match table.column(col, settings.header) {
            Some(values) => {
                columns.insert(col.clone(), Value::Array(values));
            }
            None => spdlog::warn!("Metrics column {:?} not found in {}", col, path.display()),
        }
    }
    metrics.insert(COLUMNS_KEY.to_string(), Value::Object(columns));

    Ok(Value::Object(metrics))
}

/// Normalize the results file into a flat key/value object.
///
/// Tables are read without a header: column 0 is the key and column 1 the value. Rows
/// with an empty key are dropped. JSON must already be an object.
pub fn normalize_results(folder: &Path, settings: &ResultsSelector) -> Result<Value, NormalizeError> {
    let Some(path) = selected_path(folder, &settings.name) else {
        return Ok(Value::Object(Map::new()));
    };
    if !Selector::Results.accepts(&path) {
        return Err(unsupported(Selector::Results, &path));
    }

    if TableFormat::from_path(&path).is_some() {
        let separator = Separator::parse(&settings.sep)?;
        let table = read_table(&path, non_empty(&settings.sheet), separator, false)?;
        let mut results = Map::new();
        for row in table.rows.iter() {
            let key = match row.first() {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            results.insert(key, row.get(1).cloned().unwrap_or(Value::Null));
        }
        return Ok(Value::Object(results));
    }

    match read_structured(&path)? {
        Value::Object(map) => Ok(Value::Object(map)),
        _ => Err(NormalizeError::BadShape(format!(
            "results in {} must be a JSON object",
            path.display()
        ))),
    }
}
