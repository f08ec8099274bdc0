#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BarColor {
    #[default]
    CYAN,
    GREEN,
}

/// Progress message sent from a worker to whoever is watching (UI or CLI)
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    pub experiment: String,
    pub worker_id: usize,
    pub color: BarColor,
}

impl WorkerStatus {
    pub fn new(progress: f32, experiment: &str, worker_id: usize, color: BarColor) -> Self {
        Self {
            progress,
            experiment: experiment.to_string(),
            worker_id,
            color,
        }
    }
}
