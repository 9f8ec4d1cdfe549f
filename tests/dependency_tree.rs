// Integration tests for dependency tree construction and cascade sampling

use mc_source::coordinates::BasicCartesianCoordinateConversionPolicy;
use mc_source::stats::DistributionForm;
use mc_source::{
    DependencyTree, DependentDimensionDistribution, DimensionCounters, DimensionDistributionMap,
    DimensionSet, HistogramBivariateDistribution, IndependentDimensionDistribution,
    ParticleDistribution, ParticleState, PhaseSpaceDimension, PhaseSpaceDimensionDistribution,
    PhaseSpacePoint, SourceError, UnivariateDistribution,
};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use PhaseSpaceDimension::*;

/// Time distribution that checks energy has already been sampled, then
/// sets the time to ten times the energy.
#[derive(Debug)]
struct EnergyCheckingTime;

impl PhaseSpaceDimensionDistribution for EnergyCheckingTime {
    fn dimension(&self) -> PhaseSpaceDimension {
        Time
    }

    fn parent_dimensions(&self) -> DimensionSet {
        DimensionSet::from_dimensions(&[Energy])
    }

    fn is_continuous(&self) -> bool {
        true
    }

    fn is_tabular(&self) -> bool {
        false
    }

    fn is_uniform(&self) -> bool {
        false
    }

    fn has_form(&self, _form: DistributionForm) -> bool {
        false
    }

    fn type_name(&self) -> String {
        "Energy Checking Time".to_string()
    }

    fn evaluate_without_cascade(&self, point: &PhaseSpacePoint<'_>) -> f64 {
        if point.coordinate(Time) == 10.0 * point.coordinate(Energy) {
            1.0
        } else {
            0.0
        }
    }

    fn sample_without_cascade(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        _rng: &mut dyn RngCore,
    ) -> mc_source::Result<()> {
        let energy = point.coordinate(Energy);
        assert!(
            (1.0..=2.0).contains(&energy),
            "energy {} was not sampled before time",
            energy
        );
        point.set_coordinate(Time, 10.0 * energy);
        point.set_coordinate_weight(Time, 1.0);
        Ok(())
    }

    fn sample_and_record_trials_without_cascade(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        rng: &mut dyn RngCore,
        trials: &mut u64,
    ) -> mc_source::Result<()> {
        *trials += 1;
        self.sample_without_cascade(point, rng)
    }

    fn set_dimension_value_and_apply_weight(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        value: f64,
    ) -> mc_source::Result<()> {
        point.set_coordinate(Time, value);
        point.set_coordinate_weight(Time, 1.0);
        Ok(())
    }
}

fn uniform_energy() -> IndependentDimensionDistribution {
    IndependentDimensionDistribution::new(
        Energy,
        UnivariateDistribution::new_uniform(1.0, 2.0).unwrap(),
    )
}

fn delta_histogram(parent_grid: Vec<f64>, value: f64) -> HistogramBivariateDistribution {
    let secondaries = parent_grid
        .iter()
        .map(|_| UnivariateDistribution::new_delta(value))
        .collect();
    HistogramBivariateDistribution::new(parent_grid, secondaries).unwrap()
}

#[test]
fn test_all_independent_distributions_are_roots() {
    let mut map = DimensionDistributionMap::new();
    for (i, dimension) in PhaseSpaceDimension::ALL.iter().enumerate() {
        if i % 2 == 0 {
            map.insert(Box::new(IndependentDimensionDistribution::new_delta(*dimension, 1.0)));
        } else {
            map.insert(Box::new(IndependentDimensionDistribution::new(
                *dimension,
                UnivariateDistribution::new_uniform(0.0, 1.0).unwrap(),
            )));
        }
    }

    let tree = DependencyTree::build(&map).unwrap();
    assert_eq!(tree.independent_dimensions(), DimensionSet::all());
}

#[test]
fn test_absent_parent_fails_construction() {
    let mut map = DimensionDistributionMap::new();
    map.insert(Box::new(IndependentDimensionDistribution::new_delta(PrimarySpatial, 0.0)));
    map.insert(Box::new(
        DependentDimensionDistribution::new(Weight, Energy, delta_histogram(vec![0.0, 1.0], 1.0))
            .unwrap(),
    ));

    let err = DependencyTree::build(&map).unwrap_err();
    assert!(matches!(err, SourceError::OrphanedDimension { dimension: Weight }));
    assert!(err.to_string().contains("weight dimension"));
}

#[test]
fn test_failed_build_returns_unbuilt_distribution() {
    let mut distribution = ParticleDistribution::new(0, "cycle").into_unbuilt();
    distribution.set_dimension_distribution(
        DependentDimensionDistribution::new(Energy, Time, delta_histogram(vec![0.0, 1.0], 1.0))
            .unwrap(),
    );
    distribution.set_dimension_distribution(
        DependentDimensionDistribution::new(Time, Energy, delta_histogram(vec![0.0, 2.0], 0.5))
            .unwrap(),
    );

    let failure = distribution.build().unwrap_err();
    assert!(matches!(
        failure.error(),
        SourceError::UnreachableDimension { .. }
    ));

    // Breaking the cycle makes the distribution buildable again
    let mut distribution = failure.into_distribution();
    distribution.set_energy(1.5);
    let distribution = distribution.build().unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let mut particle = ParticleState::new(0);
    distribution.sample(&mut particle, &mut rng).unwrap();
    assert_eq!(particle.energy, 1.5);
    assert_eq!(particle.time, 0.5);
}

#[test]
fn test_rebuild_without_changes_is_idempotent() {
    let mut distribution = ParticleDistribution::new(0, "idempotent").into_unbuilt();
    distribution.set_dimension_distribution(uniform_energy());
    distribution.set_dimension_distribution(EnergyCheckingTime);

    let first = distribution.build().unwrap();
    let first_tree = first.dependency_tree().clone();
    let second = first.into_unbuilt().build().unwrap();

    assert_eq!(&first_tree, second.dependency_tree());
    assert_eq!(
        second.dependency_tree().dependent_dimensions(Energy),
        DimensionSet::from_dimensions(&[Time])
    );
    assert!(!second.dependency_tree().independent_dimensions().contains(Time));
}

#[test]
fn test_dependent_dimension_sampled_after_parent() {
    let mut distribution = ParticleDistribution::new(0, "cascade").into_unbuilt();
    distribution.set_dimension_distribution(uniform_energy());
    distribution.set_dimension_distribution(EnergyCheckingTime);
    let distribution = distribution.build().unwrap();

    let mut rng = StdRng::seed_from_u64(2);
    let mut particle = ParticleState::new(0);
    for _ in 0..1000 {
        distribution.sample(&mut particle, &mut rng).unwrap();
        assert_eq!(particle.time, 10.0 * particle.energy);
    }

    // Pinning the parent still runs the dependent dimension after it
    distribution
        .sample_with_dimension_value(&mut particle, Energy, 1.25, &mut rng)
        .unwrap();
    assert_eq!(particle.energy, 1.25);
    assert_eq!(particle.time, 12.5);
    assert_eq!(distribution.evaluate_with_cascade(&particle, Energy), 1.0);
}

#[test]
fn test_histogram_dependent_distribution_follows_parent_bin() {
    let bivariate = HistogramBivariateDistribution::new(
        vec![1.0, 1.5, 2.0],
        vec![
            UnivariateDistribution::new_uniform(0.0, 1.0).unwrap(),
            UnivariateDistribution::new_uniform(5.0, 6.0).unwrap(),
            UnivariateDistribution::new_uniform(5.0, 6.0).unwrap(),
        ],
    )
    .unwrap();

    let mut distribution = ParticleDistribution::new(0, "histogram").into_unbuilt();
    distribution.set_dimension_distribution(uniform_energy());
    distribution.set_dimension_distribution(
        DependentDimensionDistribution::new(Time, Energy, bivariate).unwrap(),
    );
    let distribution = distribution.build().unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    let mut particle = ParticleState::new(0);
    for _ in 0..1000 {
        distribution.sample(&mut particle, &mut rng).unwrap();
        if particle.energy < 1.5 {
            assert!(particle.time <= 1.0);
        } else {
            assert!(particle.time >= 5.0);
        }
    }
}

#[test]
fn test_parent_value_outside_grid_fails_sampling() {
    let mut distribution = ParticleDistribution::new(0, "beyond grid").into_unbuilt();
    distribution.set_energy(5.0);
    distribution.set_dimension_distribution(
        DependentDimensionDistribution::new(
            Time,
            Energy,
            HistogramBivariateDistribution::new(
                vec![0.0, 1.0, 2.0],
                vec![
                    UnivariateDistribution::new_uniform(0.0, 1.0).unwrap(),
                    UnivariateDistribution::new_uniform(10.0, 11.0).unwrap(),
                    UnivariateDistribution::new_uniform(10.0, 11.0).unwrap(),
                ],
            )
            .unwrap(),
        )
        .unwrap(),
    );
    let distribution = distribution.build().unwrap();

    let mut rng = StdRng::seed_from_u64(6);
    let mut particle = ParticleState::new(0);
    let err = distribution.sample(&mut particle, &mut rng).unwrap_err();
    assert!(matches!(err, SourceError::InvalidDistribution(_)));
    assert!(err.to_string().contains("[0, 2]"));

    let mut trials = DimensionCounters::new();
    assert!(distribution
        .sample_and_record_trials(&mut particle, &mut trials, &mut rng)
        .is_err());
}

#[test]
fn test_evaluate_ignores_weight_dimension() {
    let build = |weight: IndependentDimensionDistribution| {
        let mut distribution = ParticleDistribution::new(0, "evaluate").into_unbuilt();
        distribution.set_dimension_distribution(IndependentDimensionDistribution::new(
            Energy,
            UnivariateDistribution::new_exponential(1.0, 0.0, f64::INFINITY).unwrap(),
        ));
        distribution.set_dimension_distribution(weight);
        distribution.build().unwrap()
    };

    let unit_weight = build(IndependentDimensionDistribution::new_delta(Weight, 1.0));
    let wide_weight = build(IndependentDimensionDistribution::new(
        Weight,
        UnivariateDistribution::new_uniform_with_multiplier(0.0, 10.0, 7.0).unwrap(),
    ));

    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..100 {
        let mut particle = ParticleState::new(0);
        particle.energy = rng.gen_range(0.0..5.0);
        particle.direction = [0.0, 0.0, 1.0];
        particle.weight = rng.gen_range(0.1..3.0);

        let a = unit_weight.evaluate(&particle);
        let b = wide_weight.evaluate(&particle);
        assert!(a > 0.0);
        assert_eq!(a, b);
    }
}

#[test]
fn test_point_round_trip_keeps_parent_value() {
    let cartesian = BasicCartesianCoordinateConversionPolicy;
    let mut point = PhaseSpacePoint::new(&cartesian, &cartesian);
    point.set_coordinate(Energy, 1.75);

    let mut rng = StdRng::seed_from_u64(5);
    EnergyCheckingTime
        .sample_without_cascade(&mut point, &mut rng)
        .unwrap();
    assert_eq!(point.coordinate(Time), 17.5);
    assert_eq!(EnergyCheckingTime.evaluate_without_cascade(&point), 1.0);
}
