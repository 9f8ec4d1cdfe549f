//! The joint particle distribution over all nine phase space dimensions.
//!
//! A `ParticleDistribution` is either `Built` (its dependency tree matches
//! its dimension distributions and it can be sampled) or `NotBuilt` (it can
//! be modified). Modifying a built distribution means converting it back
//! with [`ParticleDistribution::into_unbuilt`], and sampling again means
//! calling [`ParticleDistribution::build`]:
//!
//! ```
//! use mc_source::{ParticleDistribution, ParticleState};
//! use rand::SeedableRng;
//!
//! let mut distribution = ParticleDistribution::new(0, "point source").into_unbuilt();
//! distribution.set_energy(14.1);
//! distribution.set_position([1.0, 2.0, 3.0]);
//! let distribution = distribution.build().unwrap();
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let mut particle = ParticleState::new(0);
//! distribution.sample(&mut particle, &mut rng).unwrap();
//! assert_eq!(particle.energy, 14.1);
//! ```
//!
//! Sampling a distribution that has not been built does not compile:
//!
//! ```compile_fail
//! use mc_source::{ParticleDistribution, ParticleState};
//!
//! let mut distribution = ParticleDistribution::new(0, "point source").into_unbuilt();
//! distribution.set_energy(2.0);
//! let mut particle = ParticleState::new(0);
//! distribution.sample(&mut particle, &mut rand::thread_rng()).unwrap();
//! ```

use crate::coordinates::{
    normalize_vector, BasicCartesianCoordinateConversionPolicy,
    BasicSphericalCoordinateConversionPolicy, DirectionalCoordinateConversionPolicy,
    DirectionalCoordinateSystemType, SpatialCoordinateConversionPolicy,
    SpatialCoordinateSystemType,
};
use crate::dependency_tree::DependencyTree;
use crate::dimension::{DimensionCounters, DimensionSet, PhaseSpaceDimension};
use crate::dimension_distribution::{
    DimensionDistributionMap, IndependentDimensionDistribution, PhaseSpaceDimensionDistribution,
};
use crate::error::{Result, SourceError};
use crate::particle::ParticleState;
use crate::phase_space_point::PhaseSpacePoint;
use crate::stats::{DistributionForm, UnivariateDistribution};
use rand::RngCore;
use std::f64::consts::PI;
use thiserror::Error;
use tracing::debug;

/// Dimension distributions may be changed; sampling is unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct NotBuilt;

/// The dependency tree matches the dimension distributions
#[derive(Debug, Clone)]
pub struct Built {
    tree: DependencyTree,
}

#[derive(Debug)]
pub struct ParticleDistribution<S = Built> {
    id: u32,
    name: String,
    spatial_policy: Box<dyn SpatialCoordinateConversionPolicy>,
    directional_policy: Box<dyn DirectionalCoordinateConversionPolicy>,
    distributions: DimensionDistributionMap,
    state: S,
}

/// A failed tree construction. The distribution is handed back unbuilt.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct TreeConstructionError {
    error: SourceError,
    distribution: ParticleDistribution<NotBuilt>,
}

impl TreeConstructionError {
    pub fn error(&self) -> &SourceError {
        &self.error
    }

    pub fn into_error(self) -> SourceError {
        self.error
    }

    pub fn into_distribution(self) -> ParticleDistribution<NotBuilt> {
        self.distribution
    }
}

impl From<TreeConstructionError> for SourceError {
    fn from(err: TreeConstructionError) -> Self {
        err.error
    }
}

impl ParticleDistribution<Built> {
    /// Point source at the origin with an isotropic direction, energy 1,
    /// time 0 and weight 1, defined in Cartesian space and spherical
    /// direction coordinates.
    pub fn new(id: u32, name: &str) -> Self {
        Self::with_policies(
            id,
            name,
            Box::new(BasicCartesianCoordinateConversionPolicy),
            Box::new(BasicSphericalCoordinateConversionPolicy),
        )
    }

    pub fn with_policies(
        id: u32,
        name: &str,
        spatial_policy: Box<dyn SpatialCoordinateConversionPolicy>,
        directional_policy: Box<dyn DirectionalCoordinateConversionPolicy>,
    ) -> Self {
        let mut distribution = ParticleDistribution {
            id,
            name: name.to_string(),
            spatial_policy,
            directional_policy,
            distributions: DimensionDistributionMap::new(),
            state: NotBuilt,
        };
        distribution.reset();

        // Default distributions are all independent
        ParticleDistribution {
            id: distribution.id,
            name: distribution.name,
            spatial_policy: distribution.spatial_policy,
            directional_policy: distribution.directional_policy,
            distributions: distribution.distributions,
            state: Built {
                tree: DependencyTree::roots_only(DimensionSet::all()),
            },
        }
    }

    pub fn into_unbuilt(self) -> ParticleDistribution<NotBuilt> {
        ParticleDistribution {
            id: self.id,
            name: self.name,
            spatial_policy: self.spatial_policy,
            directional_policy: self.directional_policy,
            distributions: self.distributions,
            state: NotBuilt,
        }
    }

    pub fn dependency_tree(&self) -> &DependencyTree {
        &self.state.tree
    }

    fn point_from_particle(&self, particle: &ParticleState) -> PhaseSpacePoint<'_> {
        PhaseSpacePoint::from_particle_state(
            particle,
            self.spatial_policy.as_ref(),
            self.directional_policy.as_ref(),
        )
    }

    /// Product of every dimension density at the particle state, except
    /// the weight dimension.
    pub fn evaluate(&self, particle: &ParticleState) -> f64 {
        let point = self.point_from_particle(particle);
        self.distributions
            .iter()
            .filter(|distribution| distribution.dimension() != PhaseSpaceDimension::Weight)
            .map(|distribution| distribution.evaluate_without_cascade(&point))
            .product()
    }

    /// Product of the densities of `dimension` and every dimension below it
    pub fn evaluate_with_cascade(&self, particle: &ParticleState, dimension: PhaseSpaceDimension) -> f64 {
        let point = self.point_from_particle(particle);
        self.state
            .tree
            .subtree(dimension)
            .iter()
            .filter_map(|d| self.distributions.get(d))
            .map(|distribution| distribution.evaluate_without_cascade(&point))
            .product()
    }

    fn sample_cascade<F>(&self, particle: &mut ParticleState, mut sample_dimension: F) -> Result<()>
    where
        F: FnMut(&dyn PhaseSpaceDimensionDistribution, &mut PhaseSpacePoint<'_>) -> Result<()>,
    {
        let mut point =
            PhaseSpacePoint::new(self.spatial_policy.as_ref(), self.directional_policy.as_ref());

        self.state.tree.cascade(|dimension| {
            let Some(distribution) = self.distributions.get(dimension) else {
                return Ok(());
            };
            sample_dimension(distribution, &mut point)
        })?;

        point.set_particle_state(particle);
        Ok(())
    }

    pub fn sample(&self, particle: &mut ParticleState, rng: &mut dyn RngCore) -> Result<()> {
        self.sample_cascade(particle, |distribution, point| {
            distribution.sample_without_cascade(point, rng)
        })
    }

    /// Sample and add the attempts made for each dimension to `trials`
    pub fn sample_and_record_trials(
        &self,
        particle: &mut ParticleState,
        trials: &mut DimensionCounters,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        self.sample_cascade(particle, |distribution, point| {
            distribution.sample_and_record_trials_without_cascade(
                point,
                rng,
                &mut trials[distribution.dimension()],
            )
        })
    }

    /// Sample with `dimension` pinned to `value`. Every other dimension is
    /// sampled as usual, conditioned on the pinned value where it depends
    /// on it.
    pub fn sample_with_dimension_value(
        &self,
        particle: &mut ParticleState,
        dimension: PhaseSpaceDimension,
        value: f64,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        self.sample_cascade(particle, |distribution, point| {
            if distribution.dimension() == dimension {
                distribution.set_dimension_value_and_apply_weight(point, value)
            } else {
                distribution.sample_without_cascade(point, rng)
            }
        })
    }

    /// As [`Self::sample_with_dimension_value`]; the pinned dimension
    /// records no trial.
    pub fn sample_with_dimension_value_and_record_trials(
        &self,
        particle: &mut ParticleState,
        trials: &mut DimensionCounters,
        dimension: PhaseSpaceDimension,
        value: f64,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        self.sample_cascade(particle, |distribution, point| {
            if distribution.dimension() == dimension {
                distribution.set_dimension_value_and_apply_weight(point, value)
            } else {
                distribution.sample_and_record_trials_without_cascade(
                    point,
                    rng,
                    &mut trials[distribution.dimension()],
                )
            }
        })
    }
}

impl ParticleDistribution<NotBuilt> {
    /// Construct the dimension dependency tree.
    ///
    /// On failure the unbuilt distribution is returned inside the error.
    pub fn build(self) -> std::result::Result<ParticleDistribution<Built>, TreeConstructionError> {
        match DependencyTree::build(&self.distributions) {
            Ok(tree) => {
                debug!(id = self.id, name = %self.name, "particle distribution built");
                Ok(ParticleDistribution {
                    id: self.id,
                    name: self.name,
                    spatial_policy: self.spatial_policy,
                    directional_policy: self.directional_policy,
                    distributions: self.distributions,
                    state: Built { tree },
                })
            }
            Err(error) => Err(TreeConstructionError {
                error,
                distribution: self,
            }),
        }
    }

    /// Replace the distribution of the dimension it is defined for
    pub fn set_dimension_distribution<D>(&mut self, distribution: D)
    where
        D: PhaseSpaceDimensionDistribution + 'static,
    {
        self.set_boxed_dimension_distribution(Box::new(distribution));
    }

    pub fn set_boxed_dimension_distribution(
        &mut self,
        distribution: Box<dyn PhaseSpaceDimensionDistribution>,
    ) {
        let dimension = distribution.dimension();
        let type_name = distribution.type_name();
        if self.distributions.insert(distribution).is_some() {
            debug!(%dimension, %type_name, "replaced dimension distribution");
        }
    }

    pub fn set_energy(&mut self, energy: f64) {
        self.set_dimension_distribution(IndependentDimensionDistribution::new_delta(
            PhaseSpaceDimension::Energy,
            energy,
        ));
    }

    pub fn set_time(&mut self, time: f64) {
        self.set_dimension_distribution(IndependentDimensionDistribution::new_delta(
            PhaseSpaceDimension::Time,
            time,
        ));
    }

    /// Fix the position, given in global Cartesian coordinates
    pub fn set_position(&mut self, position: [f64; 3]) {
        let local = self
            .spatial_policy
            .convert_from_cartesian_spatial_coordinates(position);
        for (dimension, value) in PhaseSpaceDimension::SPATIAL.iter().zip(local) {
            self.set_dimension_distribution(IndependentDimensionDistribution::new_delta(
                *dimension, value,
            ));
        }
    }

    /// Fix the direction, given in global Cartesian coordinates. The
    /// direction does not need to be normalized.
    pub fn set_direction(&mut self, direction: [f64; 3]) -> Result<()> {
        let norm = direction.iter().map(|c| c * c).sum::<f64>().sqrt();
        if !(norm > 0.0) || !norm.is_finite() {
            return Err(SourceError::InvalidDistribution(format!(
                "Cannot set a source direction from {:?}",
                direction
            )));
        }
        let local = self
            .directional_policy
            .convert_from_cartesian_directional_coordinates(normalize_vector(direction));
        for (dimension, value) in PhaseSpaceDimension::DIRECTIONAL.iter().zip(local) {
            self.set_dimension_distribution(IndependentDimensionDistribution::new_delta(
                *dimension, value,
            ));
        }
        Ok(())
    }

    /// Restore every dimension to its default distribution
    pub fn reset(&mut self) {
        self.reset_spatial_distributions();
        self.reset_directional_distributions();
        self.set_energy(1.0);
        self.set_time(0.0);
        self.set_dimension_distribution(IndependentDimensionDistribution::new_delta(
            PhaseSpaceDimension::Weight,
            1.0,
        ));
    }

    /// Point at the origin
    pub fn reset_spatial_distributions(&mut self) {
        let origin = self
            .spatial_policy
            .convert_from_cartesian_spatial_coordinates([0.0, 0.0, 0.0]);
        for (dimension, value) in PhaseSpaceDimension::SPATIAL.iter().zip(origin) {
            self.set_dimension_distribution(IndependentDimensionDistribution::new_delta(
                *dimension, value,
            ));
        }
    }

    /// Isotropic direction
    pub fn reset_directional_distributions(&mut self) {
        use PhaseSpaceDimension::*;

        match self.directional_policy.local_directional_coordinate_system_type() {
            DirectionalCoordinateSystemType::Spherical => {
                self.set_dimension_distribution(IndependentDimensionDistribution::new_delta(
                    PrimaryDirectional,
                    1.0,
                ));
                self.set_dimension_distribution(IndependentDimensionDistribution::new(
                    SecondaryDirectional,
                    uniform(0.0, 2.0 * PI),
                ));
                self.set_dimension_distribution(IndependentDimensionDistribution::new(
                    TertiaryDirectional,
                    uniform(-1.0, 1.0),
                ));
            }
            DirectionalCoordinateSystemType::Cartesian => {
                for dimension in PhaseSpaceDimension::DIRECTIONAL {
                    self.set_dimension_distribution(IndependentDimensionDistribution::new(
                        dimension,
                        uniform(-1.0, 1.0),
                    ));
                }
            }
        }
    }
}

impl<S> ParticleDistribution<S> {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spatial_coordinate_system_type(&self) -> SpatialCoordinateSystemType {
        self.spatial_policy.local_spatial_coordinate_system_type()
    }

    pub fn directional_coordinate_system_type(&self) -> DirectionalCoordinateSystemType {
        self.directional_policy.local_directional_coordinate_system_type()
    }

    pub fn dimension_distribution(
        &self,
        dimension: PhaseSpaceDimension,
    ) -> Option<&dyn PhaseSpaceDimensionDistribution> {
        self.distributions.get(dimension)
    }

    pub fn dimension_distribution_type_name(&self, dimension: PhaseSpaceDimension) -> Option<String> {
        self.distributions
            .get(dimension)
            .map(|distribution| distribution.type_name())
    }

    /// Zeroed counters for every dimension
    pub fn initialize_dimension_counters(&self) -> DimensionCounters {
        DimensionCounters::new()
    }

    fn dimension_matches<F>(&self, dimension: PhaseSpaceDimension, check: F) -> bool
    where
        F: Fn(&dyn PhaseSpaceDimensionDistribution) -> bool,
    {
        self.distributions.get(dimension).map_or(false, check)
    }

    /// Positions are sampled uniformly over the volume of the local
    /// coordinate system: uniform in x, y and z for Cartesian space; a power
    /// law in r with uniform remaining coordinates otherwise.
    pub fn is_spatially_uniform(&self) -> bool {
        use PhaseSpaceDimension::*;

        let primary = match self.spatial_coordinate_system_type() {
            SpatialCoordinateSystemType::Cartesian => {
                self.dimension_matches(PrimarySpatial, |d| d.is_uniform())
            }
            SpatialCoordinateSystemType::Cylindrical | SpatialCoordinateSystemType::Spherical => {
                self.dimension_matches(PrimarySpatial, |d| d.has_form(DistributionForm::Power))
            }
        };
        primary
            && self.dimension_matches(SecondarySpatial, |d| d.is_uniform())
            && self.dimension_matches(TertiarySpatial, |d| d.is_uniform())
    }

    /// Only a spherical directional system with uniform azimuth and polar
    /// cosine counts as isotropic.
    pub fn is_directionally_uniform(&self) -> bool {
        use PhaseSpaceDimension::*;

        match self.directional_coordinate_system_type() {
            DirectionalCoordinateSystemType::Spherical => {
                self.dimension_matches(SecondaryDirectional, |d| d.is_uniform())
                    && self.dimension_matches(TertiaryDirectional, |d| d.is_uniform())
            }
            DirectionalCoordinateSystemType::Cartesian => false,
        }
    }
}

fn uniform(lower: f64, upper: f64) -> UnivariateDistribution {
    UnivariateDistribution::Uniform {
        lower,
        upper,
        multiplier: 1.0,
    }
}
