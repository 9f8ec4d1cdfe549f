use crate::coordinates::{
    normalize_vector, DirectionalCoordinateConversionPolicy, SpatialCoordinateConversionPolicy,
};
use crate::dimension::PhaseSpaceDimension;
use crate::particle::ParticleState;

/// One value and one importance weight per phase space dimension.
///
/// Spatial and directional values are expressed in the local coordinate
/// systems of the two conversion policies the point was created with.
#[derive(Debug, Clone)]
pub struct PhaseSpacePoint<'a> {
    values: [f64; PhaseSpaceDimension::COUNT],
    weights: [f64; PhaseSpaceDimension::COUNT],
    spatial_policy: &'a dyn SpatialCoordinateConversionPolicy,
    directional_policy: &'a dyn DirectionalCoordinateConversionPolicy,
}

impl<'a> PhaseSpacePoint<'a> {
    /// A point with every value at zero (weight at one) and unit weights
    pub fn new(
        spatial_policy: &'a dyn SpatialCoordinateConversionPolicy,
        directional_policy: &'a dyn DirectionalCoordinateConversionPolicy,
    ) -> Self {
        let mut values = [0.0; PhaseSpaceDimension::COUNT];
        values[PhaseSpaceDimension::Weight.index()] = 1.0;
        Self {
            values,
            weights: [1.0; PhaseSpaceDimension::COUNT],
            spatial_policy,
            directional_policy,
        }
    }

    /// Convert a particle state into local coordinates
    pub fn from_particle_state(
        particle: &ParticleState,
        spatial_policy: &'a dyn SpatialCoordinateConversionPolicy,
        directional_policy: &'a dyn DirectionalCoordinateConversionPolicy,
    ) -> Self {
        let mut point = Self::new(spatial_policy, directional_policy);

        let spatial = spatial_policy.convert_from_cartesian_spatial_coordinates(particle.position);
        for (dimension, value) in PhaseSpaceDimension::SPATIAL.iter().zip(spatial) {
            point.set_coordinate(*dimension, value);
        }

        let directional =
            directional_policy.convert_from_cartesian_directional_coordinates(particle.direction);
        for (dimension, value) in PhaseSpaceDimension::DIRECTIONAL.iter().zip(directional) {
            point.set_coordinate(*dimension, value);
        }

        point.set_coordinate(PhaseSpaceDimension::Energy, particle.energy);
        point.set_coordinate(PhaseSpaceDimension::Time, particle.time);
        point.set_coordinate(PhaseSpaceDimension::Weight, particle.weight);
        point
    }

    #[inline]
    pub fn coordinate(&self, dimension: PhaseSpaceDimension) -> f64 {
        self.values[dimension.index()]
    }

    #[inline]
    pub fn set_coordinate(&mut self, dimension: PhaseSpaceDimension, value: f64) {
        self.values[dimension.index()] = value;
    }

    #[inline]
    pub fn coordinate_weight(&self, dimension: PhaseSpaceDimension) -> f64 {
        self.weights[dimension.index()]
    }

    #[inline]
    pub fn set_coordinate_weight(&mut self, dimension: PhaseSpaceDimension, weight: f64) {
        self.weights[dimension.index()] = weight;
    }

    /// Product of every coordinate weight
    pub fn weight_of_coordinates(&self) -> f64 {
        self.weights.iter().product()
    }

    pub fn spatial_coordinates(&self) -> [f64; 3] {
        PhaseSpaceDimension::SPATIAL.map(|dimension| self.coordinate(dimension))
    }

    pub fn directional_coordinates(&self) -> [f64; 3] {
        PhaseSpaceDimension::DIRECTIONAL.map(|dimension| self.coordinate(dimension))
    }

    pub fn spatial_policy(&self) -> &'a dyn SpatialCoordinateConversionPolicy {
        self.spatial_policy
    }

    pub fn directional_policy(&self) -> &'a dyn DirectionalCoordinateConversionPolicy {
        self.directional_policy
    }

    /// Write the point into a particle state in global Cartesian coordinates.
    ///
    /// The direction is normalized and the particle weight becomes the
    /// weight coordinate times the product of all coordinate weights.
    pub fn set_particle_state(&self, particle: &mut ParticleState) {
        particle.position = self
            .spatial_policy
            .convert_to_cartesian_spatial_coordinates(self.spatial_coordinates());

        let direction = self
            .directional_policy
            .convert_to_cartesian_directional_coordinates(self.directional_coordinates());
        particle.direction = normalize_vector(direction);

        particle.energy = self.coordinate(PhaseSpaceDimension::Energy);
        particle.time = self.coordinate(PhaseSpaceDimension::Time);
        particle.weight = self.coordinate(PhaseSpaceDimension::Weight) * self.weight_of_coordinates();
    }
}
