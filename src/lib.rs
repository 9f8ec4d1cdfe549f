// Phase space particle source distributions for Monte Carlo transport
pub mod bank;
pub mod bounding_box;
pub mod communicator;
pub mod config;
pub mod coordinates;
pub mod dependency_tree;
pub mod dimension;
pub mod dimension_distribution;
pub mod error;
pub mod fast_rng;
pub mod geometry;
pub mod model;
pub mod particle;
pub mod particle_distribution;
pub mod phase_space_point;
pub mod settings;
pub mod source;
pub mod stats;

pub use bank::ParticleBank;
pub use communicator::{Communicator, InMemoryCommunicator, SerialCommunicator};
pub use config::Config;
pub use dependency_tree::DependencyTree;
pub use dimension::{DimensionCounters, DimensionSet, PhaseSpaceDimension};
pub use dimension_distribution::{
    DependentDimensionDistribution, DimensionDistributionMap, IndependentDimensionDistribution,
    PhaseSpaceDimensionDistribution,
};
pub use error::{Result, SourceError};
pub use fast_rng::FastRng;
pub use model::Model;
pub use particle::ParticleState;
pub use particle_distribution::{Built, NotBuilt, ParticleDistribution, TreeConstructionError};
pub use phase_space_point::PhaseSpacePoint;
pub use settings::Settings;
pub use source::{SourceCounters, StandardParticleSourceComponent};
pub use stats::{DistributionForm, HistogramBivariateDistribution, UnivariateDistribution};
