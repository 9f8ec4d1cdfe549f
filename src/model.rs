use crate::bank::ParticleBank;
use crate::communicator::Communicator;
use crate::error::{Result, SourceError};
use crate::fast_rng::{FastRng, PRN_STRIDE};
use crate::particle::ParticleState;
use crate::settings::Settings;
use crate::source::{SourceCounters, StandardParticleSourceComponent};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::ops::Range;
use tracing::{debug, info, warn};

/// Drives one source component over a range of histories on a fixed pool
/// of worker threads.
#[derive(Debug)]
pub struct Model {
    pub settings: Settings,
    pub source: StandardParticleSourceComponent,
}

/// Cut `range` into at most `parts` contiguous pieces whose lengths differ
/// by at most one
pub fn partition_histories(range: Range<u64>, parts: usize) -> Vec<Range<u64>> {
    let total = range.end.saturating_sub(range.start);
    let parts = (parts.max(1) as u64).min(total.max(1));
    let base = total / parts;
    let remainder = total % parts;

    let mut start = range.start;
    (0..parts)
        .map(|i| {
            let len = base + u64::from(i < remainder);
            let piece = start..start + len;
            start += len;
            piece
        })
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn sample_histories(
    source: &StandardParticleSourceComponent,
    histories: Range<u64>,
    seed: u64,
) -> Result<(ParticleBank, SourceCounters)> {
    let states_per_history = source.number_of_particle_state_samples(histories.start) as usize;
    let mut bank = ParticleBank::with_capacity(histories.clone().count() * states_per_history);
    let mut counters = SourceCounters::new();

    for history in histories {
        let mut rng = FastRng::for_history(seed, history);
        source.sample_particle_states(&mut bank, history, &mut counters, &mut rng)?;
        if rng.exceeds_history_stride() {
            warn!(
                history,
                draws = rng.draws(),
                stride = PRN_STRIDE,
                "history overran its random number stride and shares numbers with the next history"
            );
        }
    }
    Ok((bank, counters))
}

impl Model {
    pub fn new(settings: Settings, source: StandardParticleSourceComponent) -> Result<Self> {
        settings.validate()?;
        let mut source = source;
        source.set_max_rejection_trials(settings.max_rejection_trials);
        Ok(Model { settings, source })
    }

    /// Sample every history of this process, ordered by history number
    pub fn run(&mut self) -> Result<ParticleBank> {
        self.run_with_comparator(|a, b| a.history_number.cmp(&b.history_number))
    }

    /// Sample every history of this process.
    ///
    /// Each worker owns its bank and counters for its range of histories
    /// and hands them back when done. The banks are merged with `compare`
    /// and the counters are added to the source component.
    pub fn run_with_comparator<F>(&mut self, compare: F) -> Result<ParticleBank>
    where
        F: FnMut(&ParticleState, &ParticleState) -> Ordering,
    {
        let histories = self.settings.start_history..self.settings.start_history + self.settings.histories;
        let ranges = partition_histories(histories.clone(), self.settings.threads);
        info!(
            histories = self.settings.histories,
            threads = self.settings.threads,
            start = histories.start,
            "sampling source histories"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.threads)
            .build()
            .map_err(|err| SourceError::Settings(format!("unable to start worker threads: {}", err)))?;

        let source = &self.source;
        let seed = self.settings.seed;
        let results: Vec<(ParticleBank, SourceCounters)> = pool.install(|| {
            ranges
                .into_par_iter()
                .map(|range| sample_histories(source, range, seed))
                .collect::<Result<Vec<_>>>()
        })?;

        let mut banks = Vec::with_capacity(results.len());
        for (bank, counters) in results {
            self.source.merge_counters(&counters);
            banks.push(bank);
        }

        let bank = ParticleBank::merge_all(banks, compare);
        debug!(
            particles = bank.len(),
            trials = self.source.number_of_trials(),
            samples = self.source.number_of_samples(),
            "finished sampling"
        );
        Ok(bank)
    }

    /// Collective: combine source statistics on `root`
    pub fn reduce(&mut self, comm: &dyn Communicator, root: usize) -> Result<()> {
        self.source.reduce_data(comm, root)
    }
}
