use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::connection::{MinioSettings, MongoSettings};
use super::error::ConfigError;
use super::selector::{selected_path, UNSELECTED};

const DEFAULT_SEPARATOR: &str = ",";

fn default_separator() -> String {
    String::from(DEFAULT_SEPARATOR)
}

/// Settings for the configuration file of an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSelector {
    pub name: String,
    pub sheet: String,
    pub sep: String,
    pub flatten: bool,
    /// Read the configuration from `custom_path` instead of the experiment folder
    pub use_custom_path: bool,
    pub custom_path: Option<PathBuf>,
    /// Pull extra configuration values out of the folder name using `folder_pattern`
    pub parse_from_folder: bool,
    pub folder_pattern: String,
}

impl Default for ConfigSelector {
    fn default() -> Self {
        Self {
            name: String::from(UNSELECTED),
            sheet: String::new(),
            sep: default_separator(),
            flatten: false,
            use_custom_path: false,
            custom_path: None,
            parse_from_folder: false,
            folder_pattern: String::new(),
        }
    }
}

impl ConfigSelector {
    /// Where the configuration file lives for a given experiment folder, if one is chosen
    pub fn file_path(&self, folder: &Path) -> Option<PathBuf> {
        if self.use_custom_path {
            self.custom_path.clone()
        } else {
            selected_path(folder, &self.name)
        }
    }
}

/// Settings for the metrics table of an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSelector {
    pub name: String,
    pub sheet: String,
    pub sep: String,
    pub header: bool,
    pub has_time: bool,
    pub time_col: String,
    pub selected_cols: Vec<String>,
}

impl Default for MetricsSelector {
    fn default() -> Self {
        Self {
            name: String::from(UNSELECTED),
            sheet: String::new(),
            sep: default_separator(),
            header: true,
            has_time: false,
            time_col: String::new(),
            selected_cols: vec![],
        }
    }
}

/// Settings for the key/value results file of an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsSelector {
    pub name: String,
    pub sheet: String,
    pub sep: String,
}

impl Default for ResultsSelector {
    fn default() -> Self {
        Self {
            name: String::from(UNSELECTED),
            sheet: String::new(),
            sep: default_separator(),
        }
    }
}

/// Settings for raw data, a single file or a folder of chosen files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDataSelector {
    pub name: String,
    pub files: Vec<String>,
    pub send_minio: bool,
    pub save_locally: bool,
    pub local_path: Option<PathBuf>,
}

impl Default for RawDataSelector {
    fn default() -> Self {
        Self {
            name: String::from(UNSELECTED),
            files: vec![],
            send_minio: true,
            save_locally: false,
            local_path: None,
        }
    }
}

/// Settings for artifacts, a single file or a folder of chosen files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsSelector {
    pub name: String,
    pub files: Vec<String>,
}

impl Default for ArtifactsSelector {
    fn default() -> Self {
        Self {
            name: String::from(UNSELECTED),
            files: vec![],
        }
    }
}

/// Structure representing the application configuration. Contains the experiment folder,
/// per-selector settings and the connection descriptors.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml.
/// Passwords and secrets are never written out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub experiment_folder: PathBuf,
    /// Process every sibling folder of `experiment_folder` (or those in `batch_folders`)
    pub batch: bool,
    pub batch_folders: Vec<String>,
    /// Directory records are archived to
    pub output_path: PathBuf,
    pub n_threads: i32,
    pub config: ConfigSelector,
    pub metrics: MetricsSelector,
    pub results: ResultsSelector,
    pub raw_data: RawDataSelector,
    pub artifacts: ArtifactsSelector,
    pub mongo: MongoSettings,
    pub minio: MinioSettings,
}

impl Default for Config {
    /// Generate a new Config object. All paths will be empty/invalid
    fn default() -> Self {
        Self {
            experiment_folder: PathBuf::from("None"),
            batch: false,
            batch_folders: vec![],
            output_path: PathBuf::from("None"),
            n_threads: 1,
            config: ConfigSelector::default(),
            metrics: MetricsSelector::default(),
            results: ResultsSelector::default(),
            raw_data: RawDataSelector::default(),
            artifacts: ArtifactsSelector::default(),
            mongo: MongoSettings::default(),
            minio: MinioSettings::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// The experiment folders to process.
    ///
    /// In batch mode these are the non-hidden sibling directories of the experiment folder,
    /// narrowed to `batch_folders` when that list is not empty. Otherwise it is just the
    /// experiment folder.
    pub fn experiment_folders(&self) -> Result<Vec<PathBuf>, ConfigError> {
        if !self.experiment_folder.exists() {
            return Err(ConfigError::BadFilePath(self.experiment_folder.clone()));
        }
        if !self.batch {
            return Ok(vec![self.experiment_folder.clone()]);
        }

        let parent = self
            .experiment_folder
            .parent()
            .filter(|p| p.exists())
            .ok_or_else(|| ConfigError::NoParentFolder(self.experiment_folder.clone()))?;

        let mut folders: Vec<PathBuf> = Vec::new();
        if self.batch_folders.is_empty() {
            for item in parent.read_dir()? {
                let path = item?.path();
                let hidden = path
                    .file_name()
                    .map(|n| n.to_string_lossy().starts_with('.'))
                    .unwrap_or(true);
                if path.is_dir() && !hidden {
                    folders.push(path);
                }
            }
        } else {
            for name in self.batch_folders.iter() {
                let path = parent.join(name);
                if path.is_dir() {
                    folders.push(path);
                } else {
                    spdlog::warn!("Batch folder {} does not exist, skipping...", path.display());
                }
            }
        }
        folders.sort();
        Ok(folders)
    }

    /// Get the path of the archived record for an experiment
    pub fn get_record_file_name(&self, experiment_name: &str) -> Result<PathBuf, ConfigError> {
        if self.output_path.exists() {
            Ok(self.output_path.join(format!("{experiment_name}.json")))
        } else {
            Err(ConfigError::BadFilePath(self.output_path.clone()))
        }
    }

    /// Get the directory raw data is copied to, if local saving is enabled
    pub fn get_local_copy_directory(&self, experiment_name: &str) -> Option<PathBuf> {
        if !self.raw_data.save_locally {
            return None;
        }
        self.raw_data
            .local_path
            .as_ref()
            .map(|p| p.join(experiment_name))
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_round_trip_skips_secrets() {
        let mut config = Config::default();
        config.config.folder_pattern = String::from("$name$_$date%8$");
        config.mongo.password = String::from("hunter2");
        config.minio.secret_key = String::from("s3cr3t");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sender.yaml");
        config.write_config_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("s3cr3t"));

        let loaded = Config::read_config_file(&path).unwrap();
        assert_eq!(loaded.config.folder_pattern, "$name$_$date%8$");
        assert!(loaded.mongo.password.is_empty());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("experiment_folder: /data/exp\n").unwrap();
        assert_eq!(config.metrics.sep, ",");
        assert!(config.metrics.header);
        assert!(config.raw_data.send_minio);
        assert_eq!(config.n_threads, 1);
    }

    #[test]
    fn test_missing_config_file() {
        let res = Config::read_config_file(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(res, Err(ConfigError::BadFilePath(_))));
    }

    #[test]
    fn test_batch_folders() {
        let root = tempfile::tempdir().unwrap();
        for name in ["exp_b", "exp_a", ".cache"] {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }
        std::fs::write(root.path().join("notes.txt"), "").unwrap();

        let mut config = Config {
            experiment_folder: root.path().join("exp_a"),
            ..Default::default()
        };
        assert_eq!(config.experiment_folders().unwrap(), vec![root.path().join("exp_a")]);

        config.batch = true;
        assert_eq!(
            config.experiment_folders().unwrap(),
            vec![root.path().join("exp_a"), root.path().join("exp_b")]
        );

        config.batch_folders = vec![String::from("exp_b"), String::from("missing")];
        assert_eq!(config.experiment_folders().unwrap(), vec![root.path().join("exp_b")]);
    }

    #[test]
    fn test_custom_config_path() {
        let mut selector = ConfigSelector::default();
        let folder = Path::new("/data/exp");
        assert_eq!(selector.file_path(folder), None);
        selector.name = String::from("params.json");
        assert_eq!(selector.file_path(folder), Some(folder.join("params.json")));
        selector.use_custom_path = true;
        selector.custom_path = Some(PathBuf::from("/shared/params.yaml"));
        assert_eq!(selector.file_path(folder), Some(PathBuf::from("/shared/params.yaml")));
    }
}
