//! # altar_sender
//!
//! Part of the altar_sender crate family.
//!
//! This is the application to archive experiment folders with a GUI using [egui](https://github.com/emilk/egui).
//!
//! ## Install
//!
//! Use `cargo install --path ./altar_sender`
//!
//! ## Use
//!
//! To launch the application simply invoke it after it is installed
//!
//! ```bash
//! altar_sender
//! ```
//!
//! Pick an experiment folder, choose the file for each selector, and click the run button
//! to archive the experiment.
//!
//! ## Configuration
//!
//! - Experiment folder: the folder holding the experiment files. Its name is the experiment name.
//! - Batch: archive every sibling folder of the experiment folder instead.
//! - Output directory: where the JSON records are written.
//! - Config / Metrics / Results / Raw data / Artifacts: the file (or folder) used for each selector,
//! with its options (separator, header, flatten, time column, selected columns, files).
//! - Parse folder name: pull values out of the folder name with a pattern such as
//! `$name$_$date%8$_v$ver$`. The Define pattern button opens a live preview.
//!
//! Configurations can be saved using File->Save and loaded using File->Open

mod app;
use app::SenderApp;
use std::path::PathBuf;
use std::sync::Arc;

/// The program entry point
fn main() {
    // Setup logging to a file
    let file_sink = match spdlog::sink::FileSink::builder()
        .path(PathBuf::from("./altar_sender.log"))
        .formatter(Box::new(spdlog::formatter::PatternFormatter::new(
            spdlog::formatter::pattern!(
                "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
            ),
        )))
        .truncate(true)
        .build()
    {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            eprintln!("Could not open altar_sender.log: {e}");
            return;
        }
    };
    match spdlog::Logger::builder()
        .flush_level_filter(spdlog::LevelFilter::All)
        .sink(file_sink)
        .build()
    {
        Ok(logger) => spdlog::set_default_logger(Arc::new(logger)),
        Err(e) => eprintln!("Could not create logger: {e}"),
    }
    spdlog::info!("Starting AltarSender UI");

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("AltarSender")
            .with_inner_size(eframe::epaint::vec2(900.0, 700.0))
            .with_min_inner_size(eframe::epaint::vec2(700.0, 500.0)),
        ..Default::default()
    };
    match eframe::run_native(
        "altar_sender",
        native_options,
        Box::new(|cc| Ok(Box::new(SenderApp::new(cc)))),
    ) {
        Ok(()) => (),
        Err(e) => spdlog::error!("Eframe error: {}", e),
    }
}
