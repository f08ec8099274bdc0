use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use super::config::Config;
use super::error::ProcessorError;
use super::payload::{build_record, UploadItem};
use super::worker_status::{BarColor, WorkerStatus};

/// Copy raw data uploads into the local copy directory, reporting progress per file
fn copy_locally(
    items: &[UploadItem],
    copy_dir: &Path,
    experiment: &str,
    tx: &Sender<WorkerStatus>,
    worker_id: &usize,
) -> Result<(), ProcessorError> {
    let mut sizes: Vec<u64> = Vec::with_capacity(items.len());
    for item in items.iter() {
        sizes.push(item.source_path.metadata()?.len());
    }
    let total_copy_size: u64 = sizes.iter().sum();
    spdlog::info!(
        "Copying raw data with total size: {}",
        human_bytes::human_bytes(total_copy_size as f64)
    );

    tx.send(WorkerStatus::new(0.0, experiment, *worker_id, BarColor::GREEN))?;
    std::fs::create_dir_all(copy_dir)?;
    let mut copy_count: u64 = 0;
    for (item, size) in items.iter().zip(sizes.iter()) {
        let dst = copy_dir.join(&item.object_name);
        std::fs::copy(&item.source_path, &dst)?;
        copy_count += size;
        let progress = if total_copy_size == 0 {
            1.0
        } else {
            copy_count as f32 / total_copy_size as f32
        };
        tx.send(WorkerStatus::new(progress, experiment, *worker_id, BarColor::GREEN))?;
        spdlog::info!(
            "Copied {} in {}",
            item.source_path.display(),
            human_bytes::human_bytes(*size as f64),
        );
    }
    spdlog::info!("Done with copying files.");
    Ok(())
}

/// Log the object keys an experiment will be stored under
fn log_planned_uploads(config: &Config, items: &[&UploadItem]) -> Result<(), ProcessorError> {
    let endpoint = config.minio.endpoint_url()?;
    for item in items.iter() {
        spdlog::info!(
            "Planned upload {} -> {}/{}/{}",
            item.source_path.display(),
            endpoint,
            config.minio.bucket.trim(),
            config.minio.object_key(item)
        );
    }
    Ok(())
}

/// Archive a single experiment folder.
///
/// Builds the record, writes it as pretty JSON into the output directory and copies the
/// raw data locally when asked to. Object storage settings are checked before anything
/// is written whenever the record has uploads.
pub fn process_folder(
    config: &Config,
    folder: &Path,
    tx: &Sender<WorkerStatus>,
    worker_id: &usize,
) -> Result<(), ProcessorError> {
    let record = build_record(config, folder)?;
    let experiment = record.name.as_str();

    let mut uploads: Vec<&UploadItem> = Vec::new();
    if config.raw_data.send_minio {
        uploads.extend(record.raw_data.iter());
    }
    uploads.extend(record.artifacts.iter());
    if !uploads.is_empty() {
        config.minio.validate()?;
    }

    tx.send(WorkerStatus::new(0.0, experiment, *worker_id, BarColor::CYAN))?;

    let record_path = config.get_record_file_name(experiment)?;
    let writer = BufWriter::new(File::create(&record_path)?);
    serde_json::to_writer_pretty(writer, &record)?;
    spdlog::info!("Wrote record {}", record_path.display());
    tx.send(WorkerStatus::new(0.5, experiment, *worker_id, BarColor::CYAN))?;

    if let Some(copy_dir) = config.get_local_copy_directory(experiment) {
        copy_locally(&record.raw_data, &copy_dir, experiment, tx, worker_id)?;
    }
    if !uploads.is_empty() {
        log_planned_uploads(config, &uploads)?;
    }

    tx.send(WorkerStatus::new(1.0, experiment, *worker_id, BarColor::CYAN))?;
    Ok(())
}

/// The function to be called by a separate thread (typically the UI).
/// Archives every experiment folder named by the config
pub fn process(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
) -> Result<(), ProcessorError> {
    let folders = config.experiment_folders()?;
    process_subset(config, tx, worker_id, folders)
}

/// Process a subset of experiment folders
pub fn process_subset(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<PathBuf>,
) -> Result<(), ProcessorError> {
    for folder in subset {
        if folder.is_dir() {
            spdlog::info!("Processing experiment {}...", folder.display());
            process_folder(&config, &folder, &tx, &worker_id)?;
            spdlog::info!("Finished processing experiment {}.", folder.display());
        } else {
            spdlog::info!("Experiment {} does not exist, skipping...", folder.display());
        }
    }
    Ok(())
}

/// Divide the experiment folders into a set of subsets (per thread/worker)
pub fn create_subsets(config: &Config, folders: Vec<PathBuf>) -> Vec<Vec<PathBuf>> {
    let mut subsets: Vec<Vec<PathBuf>> = vec![Vec::new(); config.n_threads.max(1) as usize];
    let n_subsets = subsets.len();

    for (idx, folder) in folders.into_iter().enumerate() {
        subsets[idx % n_subsets].push(folder)
    }

    subsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;
    use std::sync::mpsc;

    #[test]
    fn test_create_subsets() {
        let config = Config {
            n_threads: 2,
            ..Default::default()
        };
        let folders: Vec<PathBuf> = ["a", "b", "c"].iter().map(PathBuf::from).collect();
        let subsets = create_subsets(&config, folders);
        assert_eq!(subsets.len(), 2);
        assert_eq!(subsets[0], vec![PathBuf::from("a"), PathBuf::from("c")]);
        assert_eq!(subsets[1], vec![PathBuf::from("b")]);
    }

    #[test]
    fn test_process_writes_record_and_copies() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("exp_01");
        let output = root.path().join("out");
        let local = root.path().join("local");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(folder.join("trace.bin"), "0123456789").unwrap();

        let mut config = Config {
            experiment_folder: folder.clone(),
            output_path: output.clone(),
            ..Default::default()
        };
        config.raw_data.name = String::from("trace.bin");
        config.raw_data.save_locally = true;
        config.raw_data.local_path = Some(local.clone());
        config.minio.endpoint = String::from("minio.lab:9000");
        config.minio.bucket = String::from("raw");

        let (tx, rx) = mpsc::channel::<WorkerStatus>();
        process(config, tx, 0).unwrap();

        let written = std::fs::read_to_string(output.join("exp_01.json")).unwrap();
        let record: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(record["name"], "exp_01");
        let object_name = record["raw_data"][0]["object_name"].as_str().unwrap();
        assert!(local.join("exp_01").join(object_name).is_file());

        let statuses: Vec<WorkerStatus> = rx.try_iter().collect();
        assert!(statuses.iter().any(|s| s.color == BarColor::GREEN));
        assert_eq!(statuses.last().map(|s| s.progress), Some(1.0));
    }

    fn raw_data_config(root: &Path) -> Config {
        let folder = root.join("exp_01");
        let output = root.join("out");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(folder.join("trace.bin"), "0123456789").unwrap();
        let mut config = Config {
            experiment_folder: folder,
            output_path: output,
            ..Default::default()
        };
        config.raw_data.name = String::from("trace.bin");
        config
    }

    #[test]
    fn test_upload_needs_object_storage() {
        let root = tempfile::tempdir().unwrap();
        let config = raw_data_config(root.path());
        assert!(config.raw_data.send_minio);

        let (tx, rx) = mpsc::channel::<WorkerStatus>();
        assert!(matches!(
            process(config, tx, 0),
            Err(ProcessorError::ConnectionError(ConnectionError::EmptyEndpoint))
        ));
        // Nothing is written when the upload cannot happen
        assert!(!root.path().join("out").join("exp_01.json").exists());
        assert_eq!(rx.try_iter().count(), 0);

        let mut config = raw_data_config(root.path());
        config.minio.endpoint = String::from("minio.lab:9000");
        let (tx, _rx) = mpsc::channel::<WorkerStatus>();
        assert!(matches!(
            process(config, tx, 0),
            Err(ProcessorError::ConnectionError(ConnectionError::EmptyBucket))
        ));
    }

    #[test]
    fn test_no_upload_skips_object_storage() {
        let root = tempfile::tempdir().unwrap();
        let mut config = raw_data_config(root.path());
        config.raw_data.send_minio = false;

        let (tx, rx) = mpsc::channel::<WorkerStatus>();
        process(config, tx, 0).unwrap();
        assert!(root.path().join("out").join("exp_01.json").is_file());
        assert_eq!(rx.try_iter().last().map(|s| s.progress), Some(1.0));
    }

    #[test]
    fn test_missing_output_directory() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("exp_01");
        std::fs::create_dir_all(&folder).unwrap();
        let config = Config {
            experiment_folder: folder,
            output_path: root.path().join("missing"),
            ..Default::default()
        };
        let (tx, _rx) = mpsc::channel::<WorkerStatus>();
        assert!(matches!(
            process(config, tx, 0),
            Err(ProcessorError::ConfigError(_))
        ));
    }
}
