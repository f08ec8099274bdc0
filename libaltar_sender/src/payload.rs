use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use super::config::Config;
use super::error::PayloadError;
use super::normalize::{normalize_config, normalize_metrics, normalize_results};
use super::pattern::{extract, ExtractedFields};
use super::selector::is_selected;

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";
/// Bytes of the digest kept for a uid; 10 bytes is exactly 16 base32 characters
const UID_BYTES: usize = 10;

/// A file scheduled for upload to the object store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadItem {
    pub source_path: PathBuf,
    /// Name of the stored object, unique per experiment
    pub object_name: String,
    /// Prefix grouping uploads of the same file across experiments
    pub object_folder: String,
}

/// Everything archived for one experiment folder
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentRecord {
    pub name: String,
    pub folder: PathBuf,
    pub created_at: String,
    pub config: Value,
    pub parsed_folder_values: ExtractedFields,
    pub metrics: Value,
    pub results: Value,
    pub raw_data: Vec<UploadItem>,
    pub artifacts: Vec<UploadItem>,
}

/// Short stable identifier derived from an experiment name.
///
/// Lowercase unpadded base32 of the leading bytes of its SHA-256 digest.
pub fn compact_uid(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    let mut encoded = String::new();
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;
    for byte in digest.iter().take(UID_BYTES) {
        buffer = (buffer << 8) | *byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            encoded.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    encoded
}

/// The name of an experiment is the base name of its folder
pub fn experiment_name(folder: &Path) -> Result<String, PayloadError> {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| PayloadError::BadFolder(folder.to_path_buf()))
}

fn upload_item(source_path: PathBuf, file_name: &str, uid: &str) -> UploadItem {
    UploadItem {
        source_path,
        object_name: format!("{uid}-{file_name}"),
        object_folder: file_name.split('.').next().unwrap_or_default().to_string(),
    }
}

/// Plan the uploads for a raw data or artifacts selection.
///
/// A selected file is uploaded as is. A selected directory uploads the chosen `files`
/// inside it. Nothing selected plans nothing.
pub fn plan_uploads(
    folder: &Path,
    name: &str,
    files: &[String],
) -> Result<Vec<UploadItem>, PayloadError> {
    if !is_selected(name) {
        return Ok(vec![]);
    }
    let name = name.trim();
    let uid = compact_uid(&experiment_name(folder)?);
    let path = folder.join(name);
    if path.is_file() {
        Ok(vec![upload_item(path, name, &uid)])
    } else if path.is_dir() {
        Ok(files
            .iter()
            .map(|f| upload_item(path.join(f), f, &uid))
            .collect())
    } else {
        Err(PayloadError::MissingRawData(path))
    }
}

/// Fold values parsed from the folder name into the configuration.
///
/// Keys already present in the configuration win. A configuration that is not an object
/// is left alone.
fn merge_folder_values(config: &mut Value, fields: &ExtractedFields) {
    if let Value::Object(map) = config {
        for (key, value) in fields.iter() {
            if !map.contains_key(key) {
                map.insert(key.to_string(), Value::String(value.to_string()));
            }
        }
    }
}

/// Build the record for one experiment folder
pub fn build_record(config: &Config, folder: &Path) -> Result<ExperimentRecord, PayloadError> {
    let name = experiment_name(folder)?;

    let mut exp_config = normalize_config(folder, &config.config)?;
    let parsed_folder_values = if config.config.parse_from_folder {
        let fields = extract(&config.config.folder_pattern, &name);
        if fields.is_empty() {
            spdlog::warn!(
                "Folder name {name:?} does not match pattern {:?}",
                config.config.folder_pattern
            );
        }
        merge_folder_values(&mut exp_config, &fields);
        fields
    } else {
        ExtractedFields::default()
    };

    let metrics = normalize_metrics(folder, &config.metrics)?;
    let results = normalize_results(folder, &config.results)?;
    let raw_data = plan_uploads(folder, &config.raw_data.name, &config.raw_data.files)?;
    let artifacts = plan_uploads(folder, &config.artifacts.name, &config.artifacts.files)?;

    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)?;

    Ok(ExperimentRecord {
        name,
        folder: folder.to_path_buf(),
        created_at,
        config: exp_config,
        parsed_folder_values,
        metrics,
        results,
        raw_data,
        artifacts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact_uid() {
        let uid = compact_uid("MyExp_20260121_v2");
        assert_eq!(uid.len(), 16);
        assert!(uid
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c)));
        assert_eq!(uid, compact_uid("MyExp_20260121_v2"));
        assert_ne!(uid, compact_uid("MyExp_20260121_v3"));
    }

    #[test]
    fn test_compact_uid_known_value() {
        // sha256("") starts with e3 b0 c4 42 98
        assert!(compact_uid("").starts_with("4oymiquy"));
    }

    #[test]
    fn test_plan_uploads() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("exp1");
        std::fs::create_dir_all(folder.join("raw")).unwrap();
        std::fs::write(folder.join("trace.tar.gz"), "x").unwrap();
        std::fs::write(folder.join("raw").join("a.csv"), "x").unwrap();

        let uid = compact_uid("exp1");
        let single = plan_uploads(&folder, "trace.tar.gz", &[]).unwrap();
        assert_eq!(
            single,
            vec![UploadItem {
                source_path: folder.join("trace.tar.gz"),
                object_name: format!("{uid}-trace.tar.gz"),
                object_folder: String::from("trace"),
            }]
        );

        let many = plan_uploads(&folder, "raw", &[String::from("a.csv")]).unwrap();
        assert_eq!(many[0].source_path, folder.join("raw").join("a.csv"));
        assert_eq!(many[0].object_folder, "a");

        assert!(plan_uploads(&folder, "None", &[]).unwrap().is_empty());
        assert!(matches!(
            plan_uploads(&folder, "gone.bin", &[]),
            Err(PayloadError::MissingRawData(_))
        ));
    }

    #[test]
    fn test_build_record_merges_folder_values() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("MyExp_20260121_v2");
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(folder.join("params.json"), r#"{"ver": "manual", "lr": 0.1}"#).unwrap();
        std::fs::write(folder.join("results.csv"), "acc,0.9\n").unwrap();

        let mut config = Config::default();
        config.config.name = String::from("params.json");
        config.config.parse_from_folder = true;
        config.config.folder_pattern = String::from("$name$_$date%8$_v$ver$");
        config.results.name = String::from("results.csv");

        let record = build_record(&config, &folder).unwrap();
        assert_eq!(record.name, "MyExp_20260121_v2");
        assert_eq!(
            record.config,
            json!({"ver": "manual", "lr": 0.1, "name": "MyExp", "date": "20260121"})
        );
        assert_eq!(record.parsed_folder_values.get("ver"), Some("2"));
        assert_eq!(record.results, json!({"acc": 0.9}));
        assert_eq!(record.metrics, json!({}));
        assert!(record.raw_data.is_empty());
    }

    #[test]
    fn test_build_record_without_config_file() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("S1-7");
        std::fs::create_dir(&folder).unwrap();

        let mut config = Config::default();
        config.config.parse_from_folder = true;
        config.config.folder_pattern = String::from("$sample$-$run$");
        let record = build_record(&config, &folder).unwrap();
        assert_eq!(record.config, json!({"sample": "S1", "run": "7"}));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["parsed_folder_values"], json!({"sample": "S1", "run": "7"}));
    }
}
