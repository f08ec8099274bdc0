use std::path::PathBuf;
use thiserror::Error;

use super::selector::Selector;
use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Folder pattern contains no $variable$ placeholders")]
    NoPlaceholders,
    #[error("Folder pattern uses the placeholder name {0:?} more than once")]
    DuplicateName(String),
    #[error("Folder pattern placeholder {0:?} has a length that is too large")]
    InvalidWidth(String),
    #[error("Folder pattern could not be compiled to a matcher: {0}")]
    InvalidExpression(String),
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Unsupported {selector} file type {extension:?}; expected one of {expected}", expected=.selector.accepted_extensions().join(", "))]
    UnsupportedFormat {
        selector: Selector,
        extension: String,
    },
    #[error("Could not read {0:?} because the file does not exist")]
    MissingFile(PathBuf),
    #[error("Invalid column separator {0:?}; expected a single character or \\t")]
    BadSeparator(String),
    #[error("Normalizer failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Normalizer failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Normalizer failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Normalizer failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Normalizer failed to read spreadsheet: {0}")]
    SpreadsheetError(#[from] calamine::Error),
    #[error("Normalizer found data with an unexpected shape: {0}")]
    BadShape(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Experiment folder {0:?} has no parent directory to list for batch mode")]
    NoParentFolder(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Database connection uses a URI but the URI is empty")]
    EmptyUri,
    #[error("Object storage endpoint is empty")]
    EmptyEndpoint,
    #[error("Object storage bucket is empty")]
    EmptyBucket,
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Payload failed due to Normalizer error: {0}")]
    NormalizeError(#[from] NormalizeError),
    #[error("Raw data file or folder not found: {0:?}")]
    MissingRawData(PathBuf),
    #[error("Experiment folder {0:?} has no usable name")]
    BadFolder(PathBuf),
    #[error("Payload failed to format a timestamp: {0}")]
    TimestampError(#[from] time::error::Format),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Payload error: {0}")]
    PayloadError(#[from] PayloadError),
    #[error("Processor failed due to Connection error: {0}")]
    ConnectionError(#[from] ConnectionError),
    #[error("Processor failed to serialize a record: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
