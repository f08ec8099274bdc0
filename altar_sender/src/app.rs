use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;

use eframe::egui::{Color32, DragValue, ProgressBar, RichText};
use rfd::FileDialog;

use libaltar_sender::config::Config;
use libaltar_sender::error::ProcessorError;
use libaltar_sender::pattern::PatternCache;
use libaltar_sender::process::{create_subsets, process_subset};
use libaltar_sender::selector::{Selector, UNSELECTED};
use libaltar_sender::worker_status::{BarColor, WorkerStatus};

const PATTERN_HELP: &str = "Use variables between $ signs to extract values from the folder name:\n\n  \
$variable$      matches any text (flexible length)\n  \
$variable%N$    matches exactly N characters\n\n\
Example:\n  Pattern:   $name$_$date%8$_v$ver$\n  Folder:    MyExp_20260121_v2\n  \
Result:    name=MyExp, date=20260121, ver=2";

fn render_error_dialog(show: &mut bool, ctx: &eframe::egui::Context) {
    eframe::egui::Window::new("Error")
        .open(show)
        .show(ctx, |ui| {
            ui.label(
                "There was an error! Check the log file altar_sender.log for more information.",
            )
        });
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_default()
}

/// Split a comma separated list typed by the user
fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Combo box listing the candidates of a selector plus the "None" entry
fn selector_combo(ui: &mut eframe::egui::Ui, id: &str, value: &mut String, candidates: &[String]) {
    eframe::egui::ComboBox::from_id_source(id)
        .selected_text(value.as_str())
        .show_ui(ui, |ui| {
            ui.selectable_value(value, String::from(UNSELECTED), UNSELECTED);
            for name in candidates.iter() {
                ui.selectable_value(value, name.clone(), name.as_str());
            }
        });
}

/// The UI app which inherits the eframe::App trait.
///
/// The parent for all processing.
#[derive(Debug)]
pub struct SenderApp {
    config: Config,
    candidates: Vec<(Selector, Vec<String>)>,
    pattern_cache: PatternCache,
    show_pattern_window: bool,
    selected_cols_text: String,
    raw_files_text: String,
    artifact_files_text: String,
    workers: Vec<JoinHandle<Result<(), ProcessorError>>>,
    worker_statuses: Vec<WorkerStatus>,
    show_error_window: bool,
    worker_rx: mpsc::Receiver<WorkerStatus>,
    worker_tx: mpsc::Sender<WorkerStatus>,
}

impl SenderApp {
    /// Create the application
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut visuals = eframe::egui::Visuals::dark();
        visuals.override_text_color = Some(Color32::LIGHT_GRAY);
        cc.egui_ctx.set_visuals(visuals);
        cc.egui_ctx.set_theme(eframe::egui::Theme::Dark);
        let (tx, rx) = mpsc::channel::<WorkerStatus>();
        SenderApp {
            config: Config::default(),
            candidates: vec![],
            pattern_cache: PatternCache::new(),
            show_pattern_window: false,
            selected_cols_text: String::new(),
            raw_files_text: String::new(),
            artifact_files_text: String::new(),
            workers: vec![],
            worker_statuses: vec![],
            show_error_window: false,
            worker_rx: rx,
            worker_tx: tx,
        }
    }

    /// Re-list the experiment folder for every selector
    fn refresh_candidates(&mut self) {
        self.candidates.clear();
        for selector in Selector::ALL {
            match selector.list_candidates(&self.config.experiment_folder) {
                Ok(names) => self.candidates.push((selector, names)),
                Err(e) => {
                    spdlog::warn!(
                        "Could not list {} for {selector}: {e}",
                        self.config.experiment_folder.display()
                    );
                    self.candidates.push((selector, vec![]));
                }
            }
        }
    }

    fn candidates_for(&self, selector: Selector) -> &[String] {
        self.candidates
            .iter()
            .find(|(s, _)| *s == selector)
            .map(|(_, names)| names.as_slice())
            .unwrap_or(&[])
    }

    /// Copy the free text list fields back into the config
    fn sync_text_fields(&mut self) {
        self.config.metrics.selected_cols = split_list(&self.selected_cols_text);
        self.config.raw_data.files = split_list(&self.raw_files_text);
        self.config.artifacts.files = split_list(&self.artifact_files_text);
    }

    fn load_text_fields(&mut self) {
        self.selected_cols_text = self.config.metrics.selected_cols.join(", ");
        self.raw_files_text = self.config.raw_data.files.join(", ");
        self.artifact_files_text = self.config.artifacts.files.join(", ");
    }

    /// Start some workers
    fn start_workers(&mut self) {
        // Safety first
        if !self.workers.is_empty() {
            return;
        }
        self.sync_text_fields();
        self.worker_statuses.clear();
        let folders = match self.config.experiment_folders() {
            Ok(f) => f,
            Err(e) => {
                self.show_error_window = true;
                spdlog::error!("Could not collect experiment folders: {e}");
                return;
            }
        };
        let subsets = create_subsets(&self.config, folders);
        for (idx, subset) in subsets.into_iter().enumerate() {
            // Dont make empty workers
            if subset.is_empty() {
                continue;
            }
            // Spawn it
            let conf = self.config.clone();
            let tx = self.worker_tx.clone();
            let worker_id = self.worker_statuses.len();
            self.worker_statuses.push(WorkerStatus::new(
                0.0,
                "",
                worker_id,
                BarColor::CYAN,
            ));
            spdlog::info!("Worker {worker_id} (batch {idx}) takes {} folder(s)", subset.len());
            self.workers.push(std::thread::spawn(move || {
                process_subset(conf, tx, worker_id, subset)
            }))
        }
    }

    /// Stop the workers
    fn stop_workers(&mut self) {
        let n_workers = self.workers.len();
        for _ in 0..n_workers {
            if let Some(worker) = self.workers.pop() {
                match worker.join() {
                    Ok(res) => match res {
                        Ok(_) => spdlog::info!("Worker complete"),
                        Err(e) => {
                            self.show_error_window = true;
                            spdlog::error!("Processor error: {e}")
                        }
                    },
                    Err(_) => {
                        self.show_error_window = true;
                        spdlog::error!("An error occured joining one of the workers!")
                    }
                }
            }
        }
    }

    /// Check if there are any workers still doing stuff
    fn are_any_workers_alive(&self) -> bool {
        self.workers.iter().any(|worker| !worker.is_finished())
    }

    fn poll_messages(&mut self) {
        // Check messages
        loop {
            match self.worker_rx.try_recv() {
                Ok(status) => {
                    let id = status.worker_id;
                    if let Some(slot) = self.worker_statuses.get_mut(id) {
                        *slot = status;
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    spdlog::error!("Channels became disconnected!");
                    self.show_error_window = true;
                    break;
                }
            }
        }
    }

    /// Write the current Config to a file
    fn write_config(&mut self, path: &Path) {
        self.sync_text_fields();
        if let Err(e) = self.config.write_config_file(path) {
            self.show_error_window = true;
            spdlog::error!("Could not write config to {}: {e}", path.display());
        }
    }

    /// Read the Config from a file
    fn read_config(&mut self, path: &Path) {
        match Config::read_config_file(path) {
            Ok(conf) => {
                self.config = conf;
                self.load_text_fields();
                self.refresh_candidates();
            }
            Err(e) => spdlog::error!("{}", e),
        }
    }

    fn folder_name(&self) -> String {
        self.config
            .experiment_folder
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// The live preview window for the folder pattern
    fn render_pattern_window(&mut self, ctx: &eframe::egui::Context) {
        let folder_name = self.folder_name();
        let mut open = self.show_pattern_window;
        eframe::egui::Window::new("Define Folder Pattern")
            .open(&mut open)
            .show(ctx, |ui| {
                ui.label(PATTERN_HELP);
                ui.separator();
                ui.label(format!("Folder name: {folder_name}"));
                ui.label("Your pattern:");
                ui.text_edit_singleline(&mut self.config.config.folder_pattern);
                ui.separator();

                let pattern = self.config.config.folder_pattern.clone();
                let fields = self.pattern_cache.extract(&pattern, &folder_name);
                if pattern.is_empty() {
                    ui.label("(enter a pattern above)");
                } else if fields.is_empty() {
                    let reason = match self.pattern_cache.get(&pattern) {
                        Err(e) => e.to_string(),
                        Ok(_) => String::from("no match - check your pattern"),
                    };
                    ui.label(RichText::new(format!("({reason})")).color(Color32::LIGHT_RED));
                } else {
                    for (name, value) in fields.iter() {
                        ui.label(format!("{name} = {value}"));
                    }
                }
            });
        self.show_pattern_window = open;
    }
}

impl eframe::App for SenderApp {
    fn update(&mut self, ctx: &eframe::egui::Context, _frame: &mut eframe::Frame) {
        self.poll_messages();
        render_error_dialog(&mut self.show_error_window, ctx);
        if self.show_pattern_window {
            self.render_pattern_window(ctx);
        }
        eframe::egui::CentralPanel::default().show(ctx, |ui| {
            //Menus
            ui.menu_button("File", |ui| {
                if ui.button("Open...").clicked() {
                    if let Some(path) = FileDialog::new()
                        .set_directory(current_dir())
                        .add_filter("YAML file", &["yaml", "yml"])
                        .pick_file()
                    {
                        self.read_config(&path);
                    }
                }
                if ui.button("Save...").clicked() {
                    if let Some(path) = FileDialog::new()
                        .set_directory(current_dir())
                        .add_filter("YAML file", &["yaml", "yml"])
                        .save_file()
                    {
                        self.write_config(&path);
                    }
                }
            });

            //Experiment
            ui.separator();
            ui.label(
                RichText::new("Experiment")
                    .color(Color32::LIGHT_BLUE)
                    .size(18.0),
            );
            eframe::egui::Grid::new("ExperimentGrid").show(ui, |ui| {
                ui.label(format!(
                    "Experiment folder: {}",
                    self.config.experiment_folder.display()
                ));
                if ui.button("Open...").clicked() {
                    if let Some(path) = FileDialog::new().set_directory(current_dir()).pick_folder() {
                        self.config.experiment_folder = path;
                        self.refresh_candidates();
                    }
                }
                if ui.button("Refresh").clicked() {
                    self.refresh_candidates();
                }
                ui.end_row();

                ui.checkbox(&mut self.config.batch, "Batch: process sibling folders");
                ui.end_row();

                ui.label(format!("Output directory: {}", self.config.output_path.display()));
                if ui.button("Open...").clicked() {
                    if let Some(path) = FileDialog::new().set_directory(current_dir()).pick_folder() {
                        self.config.output_path = path;
                    }
                }
                ui.end_row();

                ui.label("Number of Workers");
                ui.add(
                    DragValue::new(&mut self.config.n_threads)
                        .speed(1)
                        .range(std::ops::RangeInclusive::new(1, 10)),
                );
                ui.end_row();
            });

            //Selectors
            ui.separator();
            ui.label(
                RichText::new("Selectors")
                    .color(Color32::LIGHT_BLUE)
                    .size(18.0),
            );
            let config_candidates = self.candidates_for(Selector::Config).to_vec();
            let metrics_candidates = self.candidates_for(Selector::Metrics).to_vec();
            let results_candidates = self.candidates_for(Selector::Results).to_vec();
            let raw_candidates = self.candidates_for(Selector::RawData).to_vec();
            let artifact_candidates = self.candidates_for(Selector::Artifacts).to_vec();
            eframe::egui::Grid::new("SelectorGrid").show(ui, |ui| {
                //Config
                ui.label("Config");
                selector_combo(ui, "config", &mut self.config.config.name, &config_candidates);
                ui.checkbox(&mut self.config.config.flatten, "Flatten");
                ui.label("Sep");
                ui.text_edit_singleline(&mut self.config.config.sep);
                ui.end_row();

                ui.label("");
                ui.checkbox(&mut self.config.config.parse_from_folder, "Parse folder name");
                if ui
                    .add_enabled(
                        self.config.config.parse_from_folder,
                        eframe::egui::Button::new("Define pattern..."),
                    )
                    .clicked()
                {
                    self.show_pattern_window = true;
                }
                ui.end_row();

                //Metrics
                ui.label("Metrics");
                selector_combo(ui, "metrics", &mut self.config.metrics.name, &metrics_candidates);
                ui.checkbox(&mut self.config.metrics.header, "Header");
                ui.label("Sep");
                ui.text_edit_singleline(&mut self.config.metrics.sep);
                ui.end_row();

                ui.label("");
                ui.checkbox(&mut self.config.metrics.has_time, "Time column");
                ui.text_edit_singleline(&mut self.config.metrics.time_col);
                ui.label("Columns");
                ui.text_edit_singleline(&mut self.selected_cols_text);
                ui.end_row();

                //Results
                ui.label("Results");
                selector_combo(ui, "results", &mut self.config.results.name, &results_candidates);
                ui.label("");
                ui.label("Sep");
                ui.text_edit_singleline(&mut self.config.results.sep);
                ui.end_row();

                //Raw data
                ui.label("Raw data");
                selector_combo(ui, "raw_data", &mut self.config.raw_data.name, &raw_candidates);
                ui.checkbox(&mut self.config.raw_data.send_minio, "Upload");
                ui.label("Files");
                ui.text_edit_singleline(&mut self.raw_files_text);
                ui.end_row();

                ui.label("");
                ui.checkbox(&mut self.config.raw_data.save_locally, "Save locally");
                let local_text = self
                    .config
                    .raw_data
                    .local_path
                    .clone()
                    .unwrap_or(PathBuf::from("None"));
                ui.label(format!("{}", local_text.display()));
                if ui.button("Open...").clicked() {
                    self.config.raw_data.local_path =
                        FileDialog::new().set_directory(current_dir()).pick_folder();
                }
                ui.end_row();

                //Artifacts
                ui.label("Artifacts");
                selector_combo(ui, "artifacts", &mut self.config.artifacts.name, &artifact_candidates);
                ui.label("");
                ui.label("Files");
                ui.text_edit_singleline(&mut self.artifact_files_text);
                ui.end_row();
            });

            //Connections
            ui.separator();
            ui.collapsing("Database / Object storage", |ui| {
                eframe::egui::Grid::new("ConnectionGrid").show(ui, |ui| {
                    ui.checkbox(&mut self.config.mongo.use_uri, "Use URI");
                    ui.text_edit_singleline(&mut self.config.mongo.uri);
                    ui.end_row();
                    ui.label("Host / Port");
                    ui.text_edit_singleline(&mut self.config.mongo.host);
                    ui.text_edit_singleline(&mut self.config.mongo.port);
                    ui.end_row();
                    ui.label("User / DB");
                    ui.text_edit_singleline(&mut self.config.mongo.user);
                    ui.text_edit_singleline(&mut self.config.mongo.db);
                    ui.end_row();
                    ui.label("Password");
                    ui.add(
                        eframe::egui::TextEdit::singleline(&mut self.config.mongo.password)
                            .password(true),
                    );
                    ui.checkbox(&mut self.config.mongo.tls, "TLS");
                    ui.end_row();
                    match self.config.mongo.masked_url() {
                        Ok(url) => ui.label(url),
                        Err(e) => ui.label(RichText::new(e.to_string()).color(Color32::LIGHT_RED)),
                    };
                    ui.end_row();

                    ui.label("MinIO endpoint / bucket");
                    ui.text_edit_singleline(&mut self.config.minio.endpoint);
                    ui.text_edit_singleline(&mut self.config.minio.bucket);
                    ui.end_row();
                    ui.label("Access key / secret");
                    ui.text_edit_singleline(&mut self.config.minio.access_key);
                    ui.add(
                        eframe::egui::TextEdit::singleline(&mut self.config.minio.secret_key)
                            .password(true),
                    );
                    ui.checkbox(&mut self.config.minio.tls, "TLS");
                    ui.end_row();
                });
            });

            //Controls
            // You can only click run if there isn't already someone working
            if ui
                .add_enabled(self.workers.is_empty(), eframe::egui::Button::new("Run"))
                .clicked()
            {
                spdlog::info!("Starting processor...");
                self.start_workers();
            } else if !self.are_any_workers_alive() {
                self.stop_workers();
            }

            //Progress Bars
            ui.separator();
            ui.label(
                RichText::new("Progress Per Worker")
                    .color(Color32::LIGHT_BLUE)
                    .size(18.0),
            );
            for status in self.worker_statuses.iter() {
                let (msg, color) = match status.color {
                    BarColor::GREEN => ("Copying", Color32::DARK_GREEN),
                    BarColor::CYAN => ("Archiving", Color32::BLUE),
                };
                ui.add(
                    ProgressBar::new(status.progress)
                        .text(format!(
                            "Worker {} : {} {} - {}%",
                            status.worker_id,
                            msg,
                            status.experiment,
                            (status.progress * 100.0) as i32
                        ))
                        .fill(color),
                );
            }

            ctx.request_repaint_after(std::time::Duration::from_secs(1));
        });
    }
}
