//! Error types for the particle source crate.
//!
//! Configuration errors (orphaned or unreachable dependent distributions,
//! invalid forced values) are fatal for a run. Geometric rejection is never
//! an error; it only shows up in the trial and sample counters.

use crate::dimension::PhaseSpaceDimension;
use thiserror::Error;

/// Result type alias for source operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// Main error type for the particle source
#[derive(Error, Debug)]
pub enum SourceError {
    /// A dependent distribution has no registered parent distribution
    #[error(
        "Invalid particle distribution! The dependent distribution defined for the {dimension} \
         was not adopted by the required parent dimension distribution"
    )]
    OrphanedDimension { dimension: PhaseSpaceDimension },

    /// A dependent distribution has parents, but none of them are reachable
    /// from an independent distribution (e.g. a dependency cycle)
    #[error(
        "Invalid particle distribution! The dependent distribution defined for the {dimension} \
         cannot be reached from any independent dimension distribution"
    )]
    UnreachableDimension { dimension: PhaseSpaceDimension },

    /// A forced dimension value or an importance sample produced an unusable weight
    #[error("An invalid weight ({weight}) has been calculated for the {dimension} at value {value}")]
    InvalidDimensionWeight {
        dimension: PhaseSpaceDimension,
        value: f64,
        weight: f64,
    },

    /// Raw distribution parameters are invalid
    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),

    /// A history state id outside the range the component produces
    #[error("History {history} has no particle state with id {state}")]
    InvalidHistoryState { history: u64, state: u64 },

    /// Too many geometric rejections for a single particle state
    #[error("Unable to sample a valid particle state for history {history} after {trials} trials")]
    RejectionLimitExceeded { history: u64, trials: u64 },

    /// The geometry model is inconsistent (duplicate or unknown cells)
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Collective operation errors
    #[error("Communication error: {0}")]
    Communication(String),

    /// Settings could not be loaded or are inconsistent
    #[error("Settings error: {0}")]
    Settings(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
