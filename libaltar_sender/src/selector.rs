use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};

const CONFIG_EXTENSIONS: [&str; 6] = ["json", "yaml", "yml", "csv", "xlsx", "xlsm"];
const METRICS_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xlsm"];
const RESULTS_EXTENSIONS: [&str; 4] = ["csv", "xlsx", "xlsm", "json"];

/// Name shown for a selector with nothing chosen
pub const UNSELECTED: &str = "None";

/// One category of experiment input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    Config,
    Metrics,
    Results,
    RawData,
    Artifacts,
}

impl Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Metrics => write!(f, "metrics"),
            Self::Results => write!(f, "results"),
            Self::RawData => write!(f, "raw_data"),
            Self::Artifacts => write!(f, "artifacts"),
        }
    }
}

impl Selector {
    pub const ALL: [Selector; 5] = [
        Selector::Config,
        Selector::Metrics,
        Selector::Results,
        Selector::RawData,
        Selector::Artifacts,
    ];

    /// File extensions this selector can read. Empty means any file or folder.
    pub fn accepted_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Config => &CONFIG_EXTENSIONS,
            Self::Metrics => &METRICS_EXTENSIONS,
            Self::Results => &RESULTS_EXTENSIONS,
            Self::RawData | Self::Artifacts => &[],
        }
    }

    /// Can this selector take the given path
    pub fn accepts(&self, path: &Path) -> bool {
        let accepted = self.accepted_extensions();
        if accepted.is_empty() {
            return true;
        }
        accepted.contains(&extension_of(path).as_str())
    }

    /// List the entries of an experiment folder this selector can use, sorted by name.
    /// Hidden entries are skipped.
    pub fn list_candidates(&self, folder: &Path) -> std::io::Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for item in folder.read_dir()? {
            let path = item?.path();
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let usable = match self {
                Self::RawData | Self::Artifacts => true,
                _ => path.is_file() && self.accepts(&path),
            };
            if usable {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Lowercase extension of a path, empty if it has none
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// A selector name counts as chosen unless it is empty or the "None" placeholder
pub fn is_selected(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name != UNSELECTED
}

/// Resolve a selected entry inside the experiment folder
pub fn selected_path(folder: &Path, name: &str) -> Option<PathBuf> {
    if is_selected(name) {
        Some(folder.join(name.trim()))
    } else {
        None
    }
}
