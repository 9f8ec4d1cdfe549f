use crate::config::Config;
use crate::error::{Result, SourceError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one sampling run.
///
/// Missing JSON fields fall back to the global [`Config`] defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Histories sampled by this process
    pub histories: u64,
    /// History number of the first history on this process
    pub start_history: u64,
    pub threads: usize,
    pub seed: u64,
    pub max_rejection_trials: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let config = Config::global();
        Settings {
            histories: 1000,
            start_history: 0,
            threads: config.resolved_threads(),
            seed: config.default_seed,
            max_rejection_trials: config.default_max_rejection_trials,
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(SourceError::Settings(
                "at least one thread is required".to_string(),
            ));
        }
        if self.max_rejection_trials == 0 {
            return Err(SourceError::Settings(
                "max_rejection_trials must be positive".to_string(),
            ));
        }
        if self.start_history.checked_add(self.histories).is_none() {
            return Err(SourceError::Settings(format!(
                "history range starting at {} with {} histories overflows",
                self.start_history, self.histories
            )));
        }
        Ok(())
    }

    /// Settings for rank `rank` of `size` processes sharing `total_histories`.
    /// Ranges are contiguous and differ in length by at most one.
    pub fn for_process(&self, total_histories: u64, rank: usize, size: usize) -> Settings {
        let size = size.max(1) as u64;
        let rank = rank as u64;
        let base = total_histories / size;
        let remainder = total_histories % size;
        let start = rank * base + rank.min(remainder);
        let histories = base + u64::from(rank < remainder);
        Settings {
            histories,
            start_history: self.start_history + start,
            ..self.clone()
        }
    }
}
