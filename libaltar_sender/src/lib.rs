//! # altar_sender
//!
//! altar_sender assembles experiment records from folders on disk. An experiment folder
//! holds a configuration file, a metrics table, a results file, raw data and artifacts;
//! altar_sender reads the ones you point it at, normalizes them into a single JSON record
//! and archives it, planning the raw data and artifact uploads for object storage.
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! To build and install the GUI use `cargo install --path ./altar_sender` from the top
//! level repository. To build and install the CLI use
//! `cargo install --path ./altar_sender_cli`.
//!
//! ## Folder patterns
//!
//! Experiment folders are often named after their parameters. A folder pattern pulls
//! those values back out of the name and adds them to the configuration:
//!
//! - `$variable$` matches one or more characters (as few as possible)
//! - `$variable%N$` matches exactly N characters
//!
//! ```
//! use libaltar_sender::pattern::extract;
//!
//! let fields = extract("$name$_$date%8$_v$ver$", "MyExp_20260121_v2");
//! assert_eq!(fields.get("date"), Some("20260121"));
//! ```
//!
//! A name that does not fit the pattern gives no values rather than an error.
//!
//! ## Selectors
//!
//! | selector | formats | notes |
//! |---|---|---|
//! | config | json, yaml, yml, csv, xlsx, xlsm | structured files can be flattened (`a.b` becomes `a_b`) |
//! | metrics | csv, xlsx, xlsm | chosen columns plus an optional time column as x axis |
//! | results | csv, xlsx, xlsm, json | two-column key/value tables |
//! | raw_data | any file or folder | uploaded, optionally copied locally |
//! | artifacts | any file or folder | uploaded |
//!
//! CSV separators accept `\t` typed literally as a tab.
//!
//! ## Configuration
//!
//! Configurations are YAML and shared between the GUI and the CLI. Passwords and
//! secrets are never written to the file. A minimal configuration:
//!
//! ```yml
//! experiment_folder: /data/experiments/MyExp_20260121_v2
//! output_path: /data/records
//! batch: false
//! n_threads: 1
//! config:
//!   name: params.json
//!   flatten: true
//!   parse_from_folder: true
//!   folder_pattern: $name$_$date%8$_v$ver$
//! metrics:
//!   name: metrics.csv
//!   sep: \t
//!   selected_cols: [loss, accuracy]
//! ```
//!
//! ## Output
//!
//! Each experiment produces `<output_path>/<experiment>.json`. Logs go to the terminal
//! for the CLI and to `altar_sender.log` for the GUI.
pub mod config;
pub mod connection;
pub mod error;
pub mod normalize;
pub mod pattern;
pub mod payload;
pub mod process;
pub mod selector;
pub mod tabular;
pub mod worker_status;
