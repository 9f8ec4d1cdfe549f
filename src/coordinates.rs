//! Coordinate conversion policies.
//!
//! A policy maps global Cartesian coordinates onto the local coordinate
//! system that the dimension distributions of a particle distribution are
//! defined in, and back again. The basic policies here are centred at the
//! origin and aligned with the global axes.

use std::f64::consts::PI;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialCoordinateSystemType {
    Cartesian,
    Cylindrical,
    Spherical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionalCoordinateSystemType {
    Cartesian,
    Spherical,
}

pub trait SpatialCoordinateConversionPolicy: Debug + Send + Sync {
    fn local_spatial_coordinate_system_type(&self) -> SpatialCoordinateSystemType;

    /// (x, y, z) -> (primary, secondary, tertiary)
    fn convert_from_cartesian_spatial_coordinates(&self, position: [f64; 3]) -> [f64; 3];

    /// (primary, secondary, tertiary) -> (x, y, z)
    fn convert_to_cartesian_spatial_coordinates(&self, coordinates: [f64; 3]) -> [f64; 3];
}

pub trait DirectionalCoordinateConversionPolicy: Debug + Send + Sync {
    fn local_directional_coordinate_system_type(&self) -> DirectionalCoordinateSystemType;

    /// (u, v, w) -> (primary, secondary, tertiary)
    fn convert_from_cartesian_directional_coordinates(&self, direction: [f64; 3]) -> [f64; 3];

    /// (primary, secondary, tertiary) -> (u, v, w), not necessarily normalized
    fn convert_to_cartesian_directional_coordinates(&self, coordinates: [f64; 3]) -> [f64; 3];
}

/// Identity conversion for both space and direction
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCartesianCoordinateConversionPolicy;

impl SpatialCoordinateConversionPolicy for BasicCartesianCoordinateConversionPolicy {
    fn local_spatial_coordinate_system_type(&self) -> SpatialCoordinateSystemType {
        SpatialCoordinateSystemType::Cartesian
    }

    fn convert_from_cartesian_spatial_coordinates(&self, position: [f64; 3]) -> [f64; 3] {
        position
    }

    fn convert_to_cartesian_spatial_coordinates(&self, coordinates: [f64; 3]) -> [f64; 3] {
        coordinates
    }
}

impl DirectionalCoordinateConversionPolicy for BasicCartesianCoordinateConversionPolicy {
    fn local_directional_coordinate_system_type(&self) -> DirectionalCoordinateSystemType {
        DirectionalCoordinateSystemType::Cartesian
    }

    fn convert_from_cartesian_directional_coordinates(&self, direction: [f64; 3]) -> [f64; 3] {
        direction
    }

    fn convert_to_cartesian_directional_coordinates(&self, coordinates: [f64; 3]) -> [f64; 3] {
        coordinates
    }
}

/// Cylindrical space: (r, theta, z) with theta in [0, 2pi)
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCylindricalSpatialCoordinateConversionPolicy;

impl SpatialCoordinateConversionPolicy for BasicCylindricalSpatialCoordinateConversionPolicy {
    fn local_spatial_coordinate_system_type(&self) -> SpatialCoordinateSystemType {
        SpatialCoordinateSystemType::Cylindrical
    }

    fn convert_from_cartesian_spatial_coordinates(&self, position: [f64; 3]) -> [f64; 3] {
        let [x, y, z] = position;
        [(x * x + y * y).sqrt(), azimuthal_angle(x, y), z]
    }

    fn convert_to_cartesian_spatial_coordinates(&self, coordinates: [f64; 3]) -> [f64; 3] {
        let [r, theta, z] = coordinates;
        [r * theta.cos(), r * theta.sin(), z]
    }
}

/// Spherical coordinates: (r, azimuthal angle, polar angle cosine).
///
/// Usable for space and direction. For directions the primary coordinate is
/// the vector magnitude, which is 1 for any normalized direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicSphericalCoordinateConversionPolicy;

impl BasicSphericalCoordinateConversionPolicy {
    fn from_cartesian(vector: [f64; 3]) -> [f64; 3] {
        let [x, y, z] = vector;
        let r = (x * x + y * y + z * z).sqrt();
        let mu = if r > 0.0 { (z / r).clamp(-1.0, 1.0) } else { 1.0 };
        [r, azimuthal_angle(x, y), mu]
    }

    fn to_cartesian(coordinates: [f64; 3]) -> [f64; 3] {
        let [r, theta, mu] = coordinates;
        let sin_polar = (1.0 - mu * mu).max(0.0).sqrt();
        [
            r * sin_polar * theta.cos(),
            r * sin_polar * theta.sin(),
            r * mu,
        ]
    }
}

impl SpatialCoordinateConversionPolicy for BasicSphericalCoordinateConversionPolicy {
    fn local_spatial_coordinate_system_type(&self) -> SpatialCoordinateSystemType {
        SpatialCoordinateSystemType::Spherical
    }

    fn convert_from_cartesian_spatial_coordinates(&self, position: [f64; 3]) -> [f64; 3] {
        Self::from_cartesian(position)
    }

    fn convert_to_cartesian_spatial_coordinates(&self, coordinates: [f64; 3]) -> [f64; 3] {
        Self::to_cartesian(coordinates)
    }
}

impl DirectionalCoordinateConversionPolicy for BasicSphericalCoordinateConversionPolicy {
    fn local_directional_coordinate_system_type(&self) -> DirectionalCoordinateSystemType {
        DirectionalCoordinateSystemType::Spherical
    }

    fn convert_from_cartesian_directional_coordinates(&self, direction: [f64; 3]) -> [f64; 3] {
        Self::from_cartesian(direction)
    }

    fn convert_to_cartesian_directional_coordinates(&self, coordinates: [f64; 3]) -> [f64; 3] {
        Self::to_cartesian(coordinates)
    }
}

/// Angle of (x, y) in [0, 2pi)
fn azimuthal_angle(x: f64, y: f64) -> f64 {
    let theta = y.atan2(x);
    if theta < 0.0 {
        theta + 2.0 * PI
    } else {
        theta
    }
}

/// Normalize a vector, leaving a zero vector untouched
pub fn normalize_vector(vector: [f64; 3]) -> [f64; 3] {
    let mag = (vector[0] * vector[0] + vector[1] * vector[1] + vector[2] * vector[2]).sqrt();
    if mag == 0.0 {
        return vector;
    }
    [vector[0] / mag, vector[1] / mag, vector[2] / mag]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: [f64; 3], b: [f64; 3]) {
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() < 1e-12, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_cartesian_is_identity() {
        let policy = BasicCartesianCoordinateConversionPolicy;
        let p = [1.0, -2.0, 3.5];
        assert_eq!(policy.convert_from_cartesian_spatial_coordinates(p), p);
        assert_eq!(policy.convert_to_cartesian_directional_coordinates(p), p);
    }

    #[test]
    fn test_cylindrical_conversion() {
        let policy = BasicCylindricalSpatialCoordinateConversionPolicy;
        let local = policy.convert_from_cartesian_spatial_coordinates([0.0, -2.0, 1.0]);
        assert_close(local, [2.0, 3.0 * PI / 2.0, 1.0]);
        assert_close(policy.convert_to_cartesian_spatial_coordinates(local), [0.0, -2.0, 1.0]);
    }

    #[test]
    fn test_spherical_direction_conversion() {
        let policy = BasicSphericalCoordinateConversionPolicy;
        let local = policy.convert_from_cartesian_directional_coordinates([0.0, 0.0, 1.0]);
        assert_close(local, [1.0, 0.0, 1.0]);

        let local = policy.convert_from_cartesian_directional_coordinates([0.0, 1.0, 0.0]);
        assert_close(local, [1.0, PI / 2.0, 0.0]);
        assert_close(
            policy.convert_to_cartesian_directional_coordinates(local),
            [0.0, 1.0, 0.0],
        );
    }

    #[test]
    fn test_normalize_vector() {
        let n = normalize_vector([1.0, 1.0, 1.0]);
        let expected = 1.0 / 3.0_f64.sqrt();
        assert_close(n, [expected, expected, expected]);
        assert_eq!(normalize_vector([0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
    }
}
