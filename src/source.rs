use crate::bank::ParticleBank;
use crate::communicator::{gather_values, Communicator};
use crate::dimension::{DimensionCounters, PhaseSpaceDimension};
use crate::error::{Result, SourceError};
use crate::geometry::{CellId, GeometryModel};
use crate::particle::ParticleState;
use crate::particle_distribution::ParticleDistribution;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::ops::AddAssign;
use std::sync::Arc;
use tracing::{debug, info};

/// Sampling statistics of a source component.
///
/// Each worker fills its own instance and hands it back when its range of
/// histories is done; instances are only ever combined by addition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceCounters {
    pub trials: u64,
    pub samples: u64,
    pub dimension_trials: DimensionCounters,
    pub dimension_samples: DimensionCounters,
    pub starting_cells: BTreeSet<CellId>,
}

impl SourceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.trials == 0 && self.samples == 0 && self.starting_cells.is_empty()
    }
}

impl AddAssign<&SourceCounters> for SourceCounters {
    fn add_assign(&mut self, other: &SourceCounters) {
        self.trials += other.trials;
        self.samples += other.samples;
        self.dimension_trials += &other.dimension_trials;
        self.dimension_samples += &other.dimension_samples;
        self.starting_cells.extend(other.starting_cells.iter().copied());
    }
}

impl AddAssign for SourceCounters {
    fn add_assign(&mut self, other: SourceCounters) {
        *self += &other;
    }
}

impl std::iter::Sum for SourceCounters {
    fn sum<I: Iterator<Item = SourceCounters>>(iter: I) -> Self {
        iter.fold(SourceCounters::new(), |mut acc, counters| {
            acc += counters;
            acc
        })
    }
}

fn efficiency(samples: u64, trials: u64) -> f64 {
    if trials > 0 {
        samples as f64 / trials as f64
    } else {
        1.0
    }
}

/// A particle source component: one particle distribution placed in a
/// geometry.
///
/// Every history produces one regular particle state plus one probe state
/// per critical line energy. A sampled state is only accepted if it lies
/// inside the geometry and, when rejection cells are set, inside one of
/// them; rejected attempts are retried and show up in the trial counters.
#[derive(Debug)]
pub struct StandardParticleSourceComponent {
    id: u32,
    selection_weight: f64,
    distribution: ParticleDistribution,
    geometry: Arc<dyn GeometryModel>,
    rejection_cells: BTreeSet<CellId>,
    critical_line_energies: Vec<f64>,
    max_rejection_trials: u64,
    counters: SourceCounters,
}

impl StandardParticleSourceComponent {
    pub fn new(
        id: u32,
        selection_weight: f64,
        geometry: Arc<dyn GeometryModel>,
        distribution: ParticleDistribution,
    ) -> Result<Self> {
        Self::with_rejection_cells(id, selection_weight, BTreeSet::new(), geometry, distribution)
    }

    pub fn with_rejection_cells(
        id: u32,
        selection_weight: f64,
        rejection_cells: BTreeSet<CellId>,
        geometry: Arc<dyn GeometryModel>,
        distribution: ParticleDistribution,
    ) -> Result<Self> {
        if !(selection_weight > 0.0) || !selection_weight.is_finite() {
            return Err(SourceError::Settings(format!(
                "source component {} has an invalid selection weight {}",
                id, selection_weight
            )));
        }
        if let Some(cell) = rejection_cells
            .iter()
            .find(|cell| !geometry.does_cell_exist(**cell))
        {
            return Err(SourceError::Geometry(format!(
                "rejection cell {} of source component {} does not exist",
                cell, id
            )));
        }

        Ok(Self {
            id,
            selection_weight,
            distribution,
            geometry,
            rejection_cells,
            critical_line_energies: Vec::new(),
            max_rejection_trials: crate::config::Config::global().default_max_rejection_trials,
            counters: SourceCounters::new(),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn selection_weight(&self) -> f64 {
        self.selection_weight
    }

    pub fn distribution(&self) -> &ParticleDistribution {
        &self.distribution
    }

    pub fn rejection_cells(&self) -> &BTreeSet<CellId> {
        &self.rejection_cells
    }

    pub fn set_critical_line_energies(&mut self, energies: &[f64]) {
        self.critical_line_energies = energies.to_vec();
    }

    pub fn critical_line_energies(&self) -> &[f64] {
        &self.critical_line_energies
    }

    pub fn set_max_rejection_trials(&mut self, trials: u64) {
        self.max_rejection_trials = trials.max(1);
    }

    /// One regular state plus one probe per critical line energy
    pub fn number_of_particle_state_samples(&self, _history: u64) -> u64 {
        self.critical_line_energies.len() as u64 + 1
    }

    /// Blank state for a history: state 0 is the regular particle, the rest
    /// are probes.
    pub fn initialize_particle_state(&self, history: u64, history_state_id: u64) -> Result<ParticleState> {
        if history_state_id >= self.number_of_particle_state_samples(history) {
            return Err(SourceError::InvalidHistoryState {
                history,
                state: history_state_id,
            });
        }
        let mut particle = if history_state_id == 0 {
            ParticleState::new(history)
        } else {
            ParticleState::new_probe(history)
        };
        particle.source_id = self.id;
        Ok(particle)
    }

    fn accepted_cell(&self, particle: &ParticleState) -> Option<CellId> {
        let cell = self.geometry.find_cell(particle.position)?;
        if self.rejection_cells.is_empty() || self.rejection_cells.contains(&cell) {
            Some(cell)
        } else {
            None
        }
    }

    /// Sample every particle state of one history into `bank`.
    ///
    /// Only `counters` is written to, so many workers can share the
    /// component; merge the counters afterwards with [`Self::merge_counters`].
    pub fn sample_particle_states(
        &self,
        bank: &mut ParticleBank,
        history: u64,
        counters: &mut SourceCounters,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        for state_id in 0..self.number_of_particle_state_samples(history) {
            let particle = self.sample_particle_state(history, state_id, counters, rng)?;
            bank.push(particle);
        }
        Ok(())
    }

    pub fn sample_particle_state(
        &self,
        history: u64,
        history_state_id: u64,
        counters: &mut SourceCounters,
        rng: &mut dyn RngCore,
    ) -> Result<ParticleState> {
        let mut particle = self.initialize_particle_state(history, history_state_id)?;
        let probe_energy = match history_state_id {
            0 => None,
            id => Some(self.critical_line_energies[(id - 1) as usize]),
        };

        let mut attempts = 0;
        let cell = loop {
            counters.trials += 1;
            attempts += 1;

            match probe_energy {
                None => self.distribution.sample_and_record_trials(
                    &mut particle,
                    &mut counters.dimension_trials,
                    rng,
                )?,
                Some(energy) => self.distribution.sample_with_dimension_value_and_record_trials(
                    &mut particle,
                    &mut counters.dimension_trials,
                    PhaseSpaceDimension::Energy,
                    energy,
                    rng,
                )?,
            }

            if let Some(cell) = self.accepted_cell(&particle) {
                break cell;
            }
            if attempts >= self.max_rejection_trials {
                return Err(SourceError::RejectionLimitExceeded {
                    history,
                    trials: attempts,
                });
            }
        };

        counters.samples += 1;
        counters
            .dimension_samples
            .increment_all(probe_energy.is_some());
        counters.starting_cells.insert(cell);
        particle.source_cell = Some(cell);
        Ok(particle)
    }

    /// Add a worker's counters to this process's totals
    pub fn merge_counters(&mut self, counters: &SourceCounters) {
        self.counters += counters;
    }

    pub fn counters(&self) -> &SourceCounters {
        &self.counters
    }

    pub fn number_of_trials(&self) -> u64 {
        self.counters.trials
    }

    pub fn number_of_samples(&self) -> u64 {
        self.counters.samples
    }

    /// Samples per trial, 1.0 before any trial
    pub fn sampling_efficiency(&self) -> f64 {
        efficiency(self.counters.samples, self.counters.trials)
    }

    pub fn number_of_dimension_trials(&self, dimension: PhaseSpaceDimension) -> u64 {
        self.counters.dimension_trials[dimension]
    }

    pub fn number_of_dimension_samples(&self, dimension: PhaseSpaceDimension) -> u64 {
        self.counters.dimension_samples[dimension]
    }

    pub fn dimension_sampling_efficiency(&self, dimension: PhaseSpaceDimension) -> f64 {
        efficiency(
            self.counters.dimension_samples[dimension],
            self.counters.dimension_trials[dimension],
        )
    }

    /// Cells that held at least one accepted particle state
    pub fn starting_cells(&self) -> &BTreeSet<CellId> {
        &self.counters.starting_cells
    }

    pub fn reset_data(&mut self) {
        self.counters = SourceCounters::new();
    }

    /// Combine the statistics of every process on `root`.
    ///
    /// Collective: every process in the group must call it. Afterwards the
    /// root holds the totals of the whole group and every other process
    /// holds zeroed statistics.
    pub fn reduce_data(&mut self, comm: &dyn Communicator, root: usize) -> Result<()> {
        if comm.size() <= 1 {
            return Ok(());
        }

        match gather_values(comm, &self.counters, root)? {
            Some(all) => {
                self.counters = all.into_iter().sum();
                info!(
                    component = self.id,
                    processes = comm.size(),
                    trials = self.counters.trials,
                    samples = self.counters.samples,
                    "reduced source statistics"
                );
            }
            None => {
                debug!(component = self.id, rank = comm.rank(), "sent source statistics to root");
                self.reset_data();
            }
        }
        Ok(())
    }

    pub fn print_summary<W: std::io::Write>(&self, os: &mut W) -> Result<()> {
        os.write_all(self.summary().as_bytes())?;
        Ok(())
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = writeln!(out, "Standard Source Component {}", self.id);
        let _ = writeln!(out, "  Number of (position) trials: {}", self.number_of_trials());
        let _ = writeln!(out, "  Number of samples: {}", self.number_of_samples());
        let _ = writeln!(out, "  Sampling efficiency: {}", self.sampling_efficiency());

        let cells: Vec<String> = self.starting_cells().iter().map(|c| c.to_string()).collect();
        let _ = writeln!(out, "  Starting cells: {}", cells.join(" "));

        for dimension in PhaseSpaceDimension::ALL {
            let type_name = self
                .distribution
                .dimension_distribution_type_name(dimension)
                .unwrap_or_else(|| "None".to_string());
            let _ = writeln!(out, "  {} ({}):", dimension, type_name);
            let _ = writeln!(
                out,
                "    Number of trials: {}",
                self.number_of_dimension_trials(dimension)
            );
            let _ = writeln!(
                out,
                "    Number of samples: {}",
                self.number_of_dimension_samples(dimension)
            );
            let _ = writeln!(
                out,
                "    Sampling efficiency: {}",
                self.dimension_sampling_efficiency(dimension)
            );
        }
        out
    }
}
