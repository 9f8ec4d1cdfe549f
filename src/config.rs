// Process-wide defaults for source runs
use once_cell::sync::Lazy;
use std::sync::Mutex;

pub static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::new()));

/// Default seed used when settings do not name one (OpenMC's default)
pub const DEFAULT_SEED: u64 = 1;

/// Global configuration container.
///
/// Holds the defaults that [`crate::settings::Settings::default`] starts
/// from. A single instance is exposed through the `CONFIG` static; most code
/// should obtain a guard with [`Config::global`] rather than locking the
/// mutex directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Worker threads per process. None means one per available core.
    pub default_threads: Option<usize>,
    pub default_seed: u64,
    /// Geometric rejections allowed for a single particle state
    pub default_max_rejection_trials: u64,
}

impl Config {
    pub fn new() -> Self {
        Config {
            default_threads: None,
            default_seed: DEFAULT_SEED,
            default_max_rejection_trials: 1_000_000,
        }
    }

    /// Number of worker threads to use when none is configured explicitly
    pub fn resolved_threads(&self) -> usize {
        self.default_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn set_default_threads(&mut self, threads: usize) {
        self.default_threads = Some(threads.max(1));
    }

    pub fn set_default_seed(&mut self, seed: u64) {
        self.default_seed = seed;
    }

    pub fn clear(&mut self) {
        *self = Config::new();
    }

    /// Get the global configuration instance
    pub fn global() -> std::sync::MutexGuard<'static, Self> {
        CONFIG
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
