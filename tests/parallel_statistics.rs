// Integration tests for threaded sampling and the collective reduction of
// source statistics across processes

use mc_source::bounding_box::BoundingBox;
use mc_source::geometry::{BoxCellModel, GeometryModel, InfiniteMediumModel};
use mc_source::{
    Communicator, InMemoryCommunicator, IndependentDimensionDistribution, Model,
    ParticleDistribution, PhaseSpaceDimension, Settings, SourceCounters,
    StandardParticleSourceComponent, UnivariateDistribution,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

const HISTORIES_PER_THREAD: u64 = 1000;

fn uniform_cube_distribution() -> ParticleDistribution {
    let mut distribution = ParticleDistribution::new(0, "uniform cube").into_unbuilt();
    for dimension in PhaseSpaceDimension::SPATIAL {
        distribution.set_dimension_distribution(IndependentDimensionDistribution::new(
            dimension,
            UnivariateDistribution::new_uniform(-1.0, 1.0).unwrap(),
        ));
    }
    distribution.set_dimension_distribution(IndependentDimensionDistribution::new(
        PhaseSpaceDimension::Energy,
        UnivariateDistribution::new_uniform(0.1, 14.1).unwrap(),
    ));
    distribution.build().unwrap()
}

/// Run `processes` ranks on their own threads, each sampling with
/// `threads` workers, then reduce onto rank 0. Returns each rank's
/// counters before and after the reduction.
fn run_group<G>(
    processes: usize,
    threads: usize,
    geometry: G,
    rejection_cells: BTreeSet<u32>,
) -> Vec<(SourceCounters, StandardParticleSourceComponent)>
where
    G: Fn() -> Arc<dyn GeometryModel> + Sync,
{
    let histories = HISTORIES_PER_THREAD * threads as u64;
    let base = Settings {
        histories,
        start_history: 0,
        threads,
        seed: 42,
        max_rejection_trials: 10_000,
    };

    thread::scope(|scope| {
        let handles: Vec<_> = InMemoryCommunicator::group(processes)
            .into_iter()
            .map(|comm| {
                let settings = base.for_process(histories * processes as u64, comm.rank(), processes);
                let geometry = geometry();
                let cells = rejection_cells.clone();
                scope.spawn(move || {
                    let source = StandardParticleSourceComponent::with_rejection_cells(
                        0,
                        1.0,
                        cells,
                        geometry,
                        uniform_cube_distribution(),
                    )
                    .unwrap();
                    let mut model = Model::new(settings, source).unwrap();
                    let bank = model.run().unwrap();
                    assert_eq!(bank.len() as u64, histories);

                    let local = model.source.counters().clone();
                    model.reduce(&comm, 0).unwrap();
                    (local, model.source)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    })
}

#[test]
fn test_reduced_samples_across_threads_and_processes() {
    let processes = 3;
    let threads = 4;
    let results = run_group(
        processes,
        threads,
        || -> Arc<dyn GeometryModel> { Arc::new(InfiniteMediumModel::default()) },
        BTreeSet::new(),
    );

    let expected = HISTORIES_PER_THREAD * (threads * processes) as u64;
    let (_, root) = &results[0];
    assert_eq!(root.number_of_samples(), expected);
    assert_eq!(root.number_of_trials(), expected);
    assert_eq!(root.sampling_efficiency(), 1.0);
    for dimension in PhaseSpaceDimension::ALL {
        assert_eq!(root.number_of_dimension_samples(dimension), expected);
        assert_eq!(root.number_of_dimension_trials(dimension), expected);
        assert_eq!(root.dimension_sampling_efficiency(dimension), 1.0);
    }
    assert_eq!(root.starting_cells(), &BTreeSet::from([1]));

    for (_, other) in &results[1..] {
        assert_eq!(other.number_of_samples(), 0);
        assert_eq!(other.number_of_trials(), 0);
        assert_eq!(other.sampling_efficiency(), 1.0);
        assert!(other.starting_cells().is_empty());
    }
}

#[test]
fn test_reduced_rejection_statistics_sum_local_counts() {
    let geometry = || -> Arc<dyn GeometryModel> {
        Arc::new(
            BoxCellModel::new(vec![
                (
                    1,
                    BoundingBox {
                        lower_left: [0.0, 0.0, 0.0],
                        upper_right: [1.0, 1.0, 1.0],
                    },
                ),
                (
                    2,
                    BoundingBox {
                        lower_left: [-1.0, -1.0, -1.0],
                        upper_right: [1.0, 1.0, 1.0],
                    },
                ),
            ])
            .unwrap(),
        )
    };

    let results = run_group(2, 2, geometry, BTreeSet::from([1]));

    let local_trials: u64 = results.iter().map(|(local, _)| local.trials).sum();
    let local_samples: u64 = results.iter().map(|(local, _)| local.samples).sum();
    let (_, root) = &results[0];

    assert_eq!(local_samples, 4 * HISTORIES_PER_THREAD);
    assert_eq!(root.number_of_samples(), local_samples);
    assert_eq!(root.number_of_trials(), local_trials);
    assert!(root.number_of_trials() > root.number_of_samples());

    // An eighth of the cube lies in the rejection cell
    let efficiency = root.sampling_efficiency();
    assert!((efficiency - 0.125).abs() < 0.02, "efficiency {}", efficiency);

    // Every accepted state starts in the rejection cell
    assert_eq!(root.starting_cells(), &BTreeSet::from([1]));

    let (_, other) = &results[1];
    assert_eq!(other.number_of_samples(), 0);
    assert_eq!(other.number_of_trials(), 0);
}

#[test]
fn test_single_process_reduction_keeps_totals() {
    let results = run_group(
        1,
        2,
        || -> Arc<dyn GeometryModel> { Arc::new(InfiniteMediumModel::default()) },
        BTreeSet::new(),
    );
    let (local, source) = &results[0];
    assert_eq!(source.counters(), local);
    assert_eq!(source.number_of_samples(), 2 * HISTORIES_PER_THREAD);
}
