use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use libaltar_sender::config::Config;
use libaltar_sender::pattern::FolderPattern;
use libaltar_sender::payload::build_record;
use libaltar_sender::process::process;
use libaltar_sender::worker_status::WorkerStatus;

fn make_template_config(path: &Path) {
    match Config::default().write_config_file(path) {
        Ok(()) => log::info!("Done."),
        Err(e) => log::error!("Could not write template config: {e}"),
    }
}

/// Print the values a pattern extracts from a name
fn parse_name(pattern: &str, name: &str) {
    let compiled = match FolderPattern::compile(pattern) {
        Ok(p) => p,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    let fields = compiled.extract(name);
    if fields.is_empty() {
        log::warn!("{name:?} does not match pattern {pattern:?}");
        return;
    }
    for (key, value) in fields.iter() {
        println!("{key} = {value}");
    }
}

/// Build the records for the configured folders and print them without archiving
fn print_records(config: &Config) {
    let folders = match config.experiment_folders() {
        Ok(f) => f,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    for folder in folders {
        match build_record(config, &folder)
            .map_err(|e| e.to_string())
            .and_then(|r| serde_json::to_string_pretty(&r).map_err(|e| e.to_string()))
        {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("Could not build record for {}: {e}", folder.display()),
        }
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("altar_sender_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("parse")
                .about("Show the values a folder pattern extracts from a name")
                .arg(
                    Arg::new("pattern")
                        .long("pattern")
                        .required(true)
                        .help("Folder pattern, e.g. $name$_$date%8$"),
                )
                .arg(
                    Arg::new("name")
                        .long("name")
                        .required(true)
                        .help("Folder name to match"),
                ),
        )
        .subcommand(Command::new("show").about("Print the records without archiving them"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }

    if let Some(("parse", sub)) = matches.subcommand() {
        let pattern = sub.get_one::<String>("pattern").cloned().unwrap_or_default();
        let name = sub.get_one::<String>("name").cloned().unwrap_or_default();
        parse_name(&pattern, &name);
        return;
    }

    // Parse the cli
    let Some(config_path) = matches.get_one::<String>("path").map(PathBuf::from) else {
        log::error!("A config path is required, use --path");
        return;
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        make_template_config(&config_path);
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!(
        "Experiment folder: {}",
        config.experiment_folder.to_string_lossy()
    );
    log::info!("Output path: {}", config.output_path.to_string_lossy());
    log::info!("Batch: {}", config.batch);
    if config.config.parse_from_folder {
        log::info!("Folder pattern: {}", config.config.folder_pattern);
    }

    if let Some(("show", _)) = matches.subcommand() {
        print_records(&config);
        return;
    }

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    // Spawn the task!
    let handle = std::thread::spawn(move || process(config, tx, 0));

    loop {
        // No UI to drive updates, so poll about once a second
        std::thread::sleep(std::time::Duration::from_secs(1));
        for status in rx.try_iter() {
            pb.set_message(status.experiment.clone());
            pb.set_position((status.progress * 100.0) as u64);
        }

        if handle.is_finished() {
            match handle.join() {
                Ok(result) => match result {
                    Ok(_) => log::info!("Successfully archived experiments!"),
                    Err(e) => log::error!("Archiving failed with error: {e}"),
                },
                Err(_) => log::error!("Failed to join archiving task!"),
            }
            break;
        }
    }

    pb.finish();

    log::info!("Done.");
}
