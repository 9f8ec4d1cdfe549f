//! Per-dimension distributions.
//!
//! Every distribution is bound to exactly one phase space dimension. An
//! independent distribution samples its dimension on its own; a dependent
//! distribution needs the values of its parent dimensions to already be in
//! the phase space point. Neither variant knows about its children; the
//! dependency tree keeps those edges.

use crate::dimension::{DimensionSet, PhaseSpaceDimension};
use crate::error::{Result, SourceError};
use crate::phase_space_point::PhaseSpacePoint;
use crate::stats::{DistributionForm, HistogramBivariateDistribution, UnivariateDistribution};
use rand::RngCore;
use std::fmt::Debug;
use tracing::warn;

/// Capability set shared by all per-dimension distributions
pub trait PhaseSpaceDimensionDistribution: Debug + Send + Sync {
    fn dimension(&self) -> PhaseSpaceDimension;

    /// Dimensions whose values must be sampled before this one
    fn parent_dimensions(&self) -> DimensionSet;

    fn is_independent(&self) -> bool {
        self.parent_dimensions().is_empty()
    }

    fn is_dependent_on_dimension(&self, dimension: PhaseSpaceDimension) -> bool {
        self.parent_dimensions().contains(dimension)
    }

    fn is_continuous(&self) -> bool;

    fn is_tabular(&self) -> bool;

    fn is_uniform(&self) -> bool;

    fn has_form(&self, form: DistributionForm) -> bool;

    fn type_name(&self) -> String;

    /// Density contribution of this dimension alone. Only reads this
    /// dimension (and, for dependent distributions, its parents).
    fn evaluate_without_cascade(&self, point: &PhaseSpacePoint<'_>) -> f64;

    fn sample_without_cascade(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<()>;

    fn sample_and_record_trials_without_cascade(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        rng: &mut dyn RngCore,
        trials: &mut u64,
    ) -> Result<()>;

    /// Pin this dimension to `value` and set its coordinate weight to the
    /// dimension density at that value.
    fn set_dimension_value_and_apply_weight(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        value: f64,
    ) -> Result<()>;
}

/// Distribution over one dimension that needs no other dimension's value
#[derive(Debug, Clone)]
pub struct IndependentDimensionDistribution {
    dimension: PhaseSpaceDimension,
    distribution: UnivariateDistribution,
    importance: Option<UnivariateDistribution>,
}

impl IndependentDimensionDistribution {
    pub fn new(dimension: PhaseSpaceDimension, distribution: UnivariateDistribution) -> Self {
        Self {
            dimension,
            distribution,
            importance: None,
        }
    }

    /// Sample from `importance` and weight each sample by the ratio of the
    /// true density to the importance density.
    pub fn new_importance_sampled(
        dimension: PhaseSpaceDimension,
        distribution: UnivariateDistribution,
        importance: UnivariateDistribution,
    ) -> Self {
        Self {
            dimension,
            distribution,
            importance: Some(importance),
        }
    }

    pub fn new_delta(dimension: PhaseSpaceDimension, value: f64) -> Self {
        Self::new(dimension, UnivariateDistribution::new_delta(value))
    }

    pub fn distribution(&self) -> &UnivariateDistribution {
        &self.distribution
    }

    fn finish_sample(&self, point: &mut PhaseSpacePoint<'_>, value: f64) -> Result<()> {
        let weight = match &self.importance {
            None => 1.0,
            Some(importance) => importance_weight(
                self.dimension,
                value,
                self.distribution.evaluate_pdf(value),
                importance.evaluate_pdf(value),
            )?,
        };
        point.set_coordinate(self.dimension, value);
        point.set_coordinate_weight(self.dimension, weight);
        Ok(())
    }

    fn sampling_distribution(&self) -> &UnivariateDistribution {
        self.importance.as_ref().unwrap_or(&self.distribution)
    }
}

impl PhaseSpaceDimensionDistribution for IndependentDimensionDistribution {
    fn dimension(&self) -> PhaseSpaceDimension {
        self.dimension
    }

    fn parent_dimensions(&self) -> DimensionSet {
        DimensionSet::new()
    }

    fn is_continuous(&self) -> bool {
        self.distribution.is_continuous()
    }

    fn is_tabular(&self) -> bool {
        self.distribution.is_tabular()
    }

    fn is_uniform(&self) -> bool {
        self.distribution.is_uniform()
    }

    fn has_form(&self, form: DistributionForm) -> bool {
        self.distribution.has_form(form)
    }

    fn type_name(&self) -> String {
        match &self.importance {
            None => format!("Independent {}", self.distribution.type_name()),
            Some(importance) => format!(
                "Importance Sampled Independent {} (importance: {})",
                self.distribution.type_name(),
                importance.type_name()
            ),
        }
    }

    fn evaluate_without_cascade(&self, point: &PhaseSpacePoint<'_>) -> f64 {
        self.distribution.evaluate(point.coordinate(self.dimension))
    }

    fn sample_without_cascade(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let value = self.sampling_distribution().sample(rng);
        self.finish_sample(point, value)
    }

    fn sample_and_record_trials_without_cascade(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        rng: &mut dyn RngCore,
        trials: &mut u64,
    ) -> Result<()> {
        let value = self
            .sampling_distribution()
            .sample_and_record_trials(rng, trials);
        self.finish_sample(point, value)
    }

    fn set_dimension_value_and_apply_weight(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        value: f64,
    ) -> Result<()> {
        let weight = self.distribution.evaluate_pdf(value);
        check_forced_weight(self.dimension, value, weight)?;
        point.set_coordinate(self.dimension, value);
        point.set_coordinate_weight(self.dimension, weight);
        Ok(())
    }
}

/// Distribution over one dimension conditioned on a single parent dimension
#[derive(Debug, Clone)]
pub struct DependentDimensionDistribution {
    dimension: PhaseSpaceDimension,
    parent: PhaseSpaceDimension,
    distribution: HistogramBivariateDistribution,
    importance: Option<HistogramBivariateDistribution>,
}

impl DependentDimensionDistribution {
    pub fn new(
        dimension: PhaseSpaceDimension,
        parent: PhaseSpaceDimension,
        distribution: HistogramBivariateDistribution,
    ) -> Result<Self> {
        if dimension == parent {
            return Err(SourceError::InvalidDistribution(format!(
                "The {} cannot depend on itself",
                dimension
            )));
        }
        Ok(Self {
            dimension,
            parent,
            distribution,
            importance: None,
        })
    }

    pub fn new_importance_sampled(
        dimension: PhaseSpaceDimension,
        parent: PhaseSpaceDimension,
        distribution: HistogramBivariateDistribution,
        importance: HistogramBivariateDistribution,
    ) -> Result<Self> {
        if !distribution.has_same_primary_bounds(&importance) {
            return Err(SourceError::InvalidDistribution(format!(
                "The importance distribution for the {} must cover the same {} range",
                dimension, parent
            )));
        }
        let mut dependent = Self::new(dimension, parent, distribution)?;
        dependent.importance = Some(importance);
        Ok(dependent)
    }

    pub fn parent_dimension(&self) -> PhaseSpaceDimension {
        self.parent
    }

    fn finish_sample(&self, point: &mut PhaseSpacePoint<'_>, parent_value: f64, value: f64) -> Result<()> {
        let weight = match &self.importance {
            None => 1.0,
            Some(importance) => importance_weight(
                self.dimension,
                value,
                self.distribution
                    .evaluate_secondary_conditional_pdf(parent_value, value),
                importance.evaluate_secondary_conditional_pdf(parent_value, value),
            )?,
        };
        point.set_coordinate(self.dimension, value);
        point.set_coordinate_weight(self.dimension, weight);
        Ok(())
    }

    fn sampling_distribution(&self) -> &HistogramBivariateDistribution {
        self.importance.as_ref().unwrap_or(&self.distribution)
    }
}

impl PhaseSpaceDimensionDistribution for DependentDimensionDistribution {
    fn dimension(&self) -> PhaseSpaceDimension {
        self.dimension
    }

    fn parent_dimensions(&self) -> DimensionSet {
        DimensionSet::from_dimensions(&[self.parent])
    }

    fn is_continuous(&self) -> bool {
        self.distribution.is_primary_dimension_continuous()
    }

    fn is_tabular(&self) -> bool {
        self.distribution.is_primary_dimension_tabular()
    }

    // A conditional distribution is never treated as uniform
    fn is_uniform(&self) -> bool {
        false
    }

    fn has_form(&self, _form: DistributionForm) -> bool {
        false
    }

    fn type_name(&self) -> String {
        let prefix = if self.importance.is_some() {
            "Importance Sampled Dependent"
        } else {
            "Dependent"
        };
        format!("{} {} (on {})", prefix, self.distribution.type_name(), self.parent)
    }

    fn evaluate_without_cascade(&self, point: &PhaseSpacePoint<'_>) -> f64 {
        self.distribution
            .evaluate(point.coordinate(self.parent), point.coordinate(self.dimension))
    }

    fn sample_without_cascade(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let parent_value = point.coordinate(self.parent);
        let value = self
            .sampling_distribution()
            .sample_secondary_conditional(rng, parent_value)?;
        self.finish_sample(point, parent_value, value)
    }

    fn sample_and_record_trials_without_cascade(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        rng: &mut dyn RngCore,
        trials: &mut u64,
    ) -> Result<()> {
        let parent_value = point.coordinate(self.parent);
        let value = self
            .sampling_distribution()
            .sample_secondary_conditional_and_record_trials(rng, parent_value, trials)?;
        self.finish_sample(point, parent_value, value)
    }

    fn set_dimension_value_and_apply_weight(
        &self,
        point: &mut PhaseSpacePoint<'_>,
        value: f64,
    ) -> Result<()> {
        let weight = self
            .distribution
            .evaluate_secondary_conditional_pdf(point.coordinate(self.parent), value);
        check_forced_weight(self.dimension, value, weight)?;
        point.set_coordinate(self.dimension, value);
        point.set_coordinate_weight(self.dimension, weight);
        Ok(())
    }
}

/// At most one distribution per dimension, keyed by the distribution's own dimension
#[derive(Debug, Default)]
pub struct DimensionDistributionMap {
    slots: [Option<Box<dyn PhaseSpaceDimensionDistribution>>; PhaseSpaceDimension::COUNT],
}

impl DimensionDistributionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a distribution, returning the one it replaces
    pub fn insert(
        &mut self,
        distribution: Box<dyn PhaseSpaceDimensionDistribution>,
    ) -> Option<Box<dyn PhaseSpaceDimensionDistribution>> {
        let index = distribution.dimension().index();
        self.slots[index].replace(distribution)
    }

    pub fn remove(
        &mut self,
        dimension: PhaseSpaceDimension,
    ) -> Option<Box<dyn PhaseSpaceDimensionDistribution>> {
        self.slots[dimension.index()].take()
    }

    pub fn get(&self, dimension: PhaseSpaceDimension) -> Option<&dyn PhaseSpaceDimensionDistribution> {
        self.slots[dimension.index()].as_deref()
    }

    pub fn contains(&self, dimension: PhaseSpaceDimension) -> bool {
        self.slots[dimension.index()].is_some()
    }

    pub fn registered_dimensions(&self) -> DimensionSet {
        self.iter().map(|distribution| distribution.dimension()).collect()
    }

    /// Registered distributions in dimension declaration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn PhaseSpaceDimensionDistribution> + '_ {
        self.slots.iter().filter_map(|slot| slot.as_deref())
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn importance_weight(
    dimension: PhaseSpaceDimension,
    value: f64,
    pdf: f64,
    importance_pdf: f64,
) -> Result<f64> {
    if importance_pdf > 0.0 {
        if pdf == 0.0 {
            warn!(%dimension, value, "importance sample has zero weight");
        }
        return Ok(pdf / importance_pdf);
    }
    if pdf > 0.0 {
        return Err(SourceError::InvalidDimensionWeight {
            dimension,
            value,
            weight: f64::INFINITY,
        });
    }
    warn!(%dimension, value, "importance sample outside both distributions, using unit weight");
    Ok(1.0)
}

fn check_forced_weight(dimension: PhaseSpaceDimension, value: f64, weight: f64) -> Result<()> {
    if weight > 0.0 && weight.is_finite() {
        Ok(())
    } else {
        Err(SourceError::InvalidDimensionWeight {
            dimension,
            value,
            weight,
        })
    }
}
