use serde::{Deserialize, Serialize};

/// A sampled initial particle state handed to the transport loop.
///
/// `probe` marks states generated at a pinned critical line energy; they
/// carry a weight of their own and are not regular source particles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleState {
    pub history_number: u64,
    pub position: [f64; 3],
    pub direction: [f64; 3],
    pub energy: f64,
    pub time: f64,
    pub weight: f64,
    pub source_id: u32,
    pub source_cell: Option<u32>,
    pub probe: bool,
}

impl ParticleState {
    pub fn new(history_number: u64) -> Self {
        Self {
            history_number,
            position: [0.0, 0.0, 0.0],
            direction: [0.0, 0.0, 1.0],
            energy: 1.0,
            time: 0.0,
            weight: 1.0,
            source_id: 0,
            source_cell: None,
            probe: false,
        }
    }

    pub fn new_probe(history_number: u64) -> Self {
        Self {
            probe: true,
            ..Self::new(history_number)
        }
    }
}
