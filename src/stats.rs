use crate::error::{Result, SourceError};
use rand::Rng;
use rand_distr::StandardNormal;

/// Functional form of a raw distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionForm {
    Delta,
    Uniform,
    Power,
    Exponential,
    Discrete,
    Normal,
}

/// Smallest fraction of a normal distribution that a truncation window may
/// keep. Below this, rejection sampling would effectively never terminate.
pub const MIN_NORMAL_ACCEPTANCE: f64 = 1e-6;

/// Univariate distribution types - simplified enum approach
///
/// `evaluate` returns the (unnormalized) distribution value, which includes
/// the optional multiplier; `evaluate_pdf` returns the normalized density.
///
/// Variants can be matched but only built through the checked constructors:
///
/// ```compile_fail
/// use mc_source::UnivariateDistribution;
///
/// let inverted = UnivariateDistribution::Uniform {
///     lower: 1.0,
///     upper: -1.0,
///     multiplier: 1.0,
/// };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum UnivariateDistribution {
    #[non_exhaustive]
    Delta {
        location: f64,
    },
    #[non_exhaustive]
    Uniform {
        lower: f64,
        upper: f64,
        multiplier: f64,
    },
    /// p(x) proportional to x^exponent on [lower, upper], lower >= 0
    #[non_exhaustive]
    Power {
        exponent: f64,
        lower: f64,
        upper: f64,
        multiplier: f64,
    },
    /// p(x) proportional to exp(-rate x) on [lower, upper]; upper may be infinite
    #[non_exhaustive]
    Exponential {
        rate: f64,
        lower: f64,
        upper: f64,
        multiplier: f64,
    },
    #[non_exhaustive]
    Discrete {
        values: Vec<f64>,
        cdf: Vec<f64>,
    },
    /// Truncated normal, sampled by rejection
    #[non_exhaustive]
    Normal {
        mean: f64,
        std_dev: f64,
        lower: f64,
        upper: f64,
        multiplier: f64,
        norm_constant: f64,
    },
}

impl UnivariateDistribution {
    pub fn new_delta(location: f64) -> Self {
        Self::Delta { location }
    }

    pub fn new_uniform(lower: f64, upper: f64) -> Result<Self> {
        Self::new_uniform_with_multiplier(lower, upper, 1.0)
    }

    pub fn new_uniform_with_multiplier(lower: f64, upper: f64, multiplier: f64) -> Result<Self> {
        check_bounds(lower, upper)?;
        check_multiplier(multiplier)?;
        Ok(Self::Uniform {
            lower,
            upper,
            multiplier,
        })
    }

    pub fn new_power(exponent: f64, lower: f64, upper: f64) -> Result<Self> {
        check_bounds(lower, upper)?;
        if !upper.is_finite() {
            return Err(SourceError::InvalidDistribution(
                "Power distribution upper bound must be finite".to_string(),
            ));
        }
        if lower < 0.0 {
            return Err(SourceError::InvalidDistribution(format!(
                "Power distribution lower bound must be non-negative, got {}",
                lower
            )));
        }
        if !(exponent > -1.0) {
            return Err(SourceError::InvalidDistribution(format!(
                "Power distribution exponent must be greater than -1, got {}",
                exponent
            )));
        }
        Ok(Self::Power {
            exponent,
            lower,
            upper,
            multiplier: 1.0,
        })
    }

    pub fn new_exponential(rate: f64, lower: f64, upper: f64) -> Result<Self> {
        check_bounds(lower, upper)?;
        if !(rate > 0.0) || !lower.is_finite() {
            return Err(SourceError::InvalidDistribution(format!(
                "Exponential distribution needs a positive rate and finite lower bound (rate {}, lower {})",
                rate, lower
            )));
        }
        Ok(Self::Exponential {
            rate,
            lower,
            upper,
            multiplier: 1.0,
        })
    }

    /// Discrete distribution from (value, relative probability) pairs
    pub fn new_discrete(values: &[f64], probabilities: &[f64]) -> Result<Self> {
        if values.is_empty() || values.len() != probabilities.len() {
            return Err(SourceError::InvalidDistribution(
                "Discrete distribution needs one probability per value".to_string(),
            ));
        }
        if probabilities.iter().any(|p| !(*p >= 0.0)) {
            return Err(SourceError::InvalidDistribution(
                "Discrete probabilities must be non-negative".to_string(),
            ));
        }
        let total: f64 = probabilities.iter().sum();
        if !(total > 0.0) {
            return Err(SourceError::InvalidDistribution(
                "Discrete probabilities sum to zero".to_string(),
            ));
        }

        let mut running = 0.0;
        let cdf = probabilities
            .iter()
            .map(|p| {
                running += p / total;
                running
            })
            .collect();

        Ok(Self::Discrete {
            values: values.to_vec(),
            cdf,
        })
    }

    pub fn new_normal(mean: f64, std_dev: f64, lower: f64, upper: f64) -> Result<Self> {
        check_bounds(lower, upper)?;
        if !(std_dev > 0.0) {
            return Err(SourceError::InvalidDistribution(format!(
                "Normal distribution standard deviation must be positive, got {}",
                std_dev
            )));
        }
        let norm_constant = normal_norm_constant(mean, std_dev, lower, upper);
        if !(norm_constant > 0.0) {
            return Err(SourceError::InvalidDistribution(format!(
                "Normal distribution has no mass on [{}, {}]",
                lower, upper
            )));
        }
        // Fraction of rejection attempts that land in the window
        let acceptance = norm_constant / (std_dev * (2.0 * std::f64::consts::PI).sqrt());
        if acceptance < MIN_NORMAL_ACCEPTANCE {
            return Err(SourceError::InvalidDistribution(format!(
                "Normal distribution keeps only {:e} of its mass on [{}, {}]",
                acceptance, lower, upper
            )));
        }
        Ok(Self::Normal {
            mean,
            std_dev,
            lower,
            upper,
            multiplier: 1.0,
            norm_constant,
        })
    }

    /// Evaluate the distribution (unnormalized)
    pub fn evaluate(&self, x: f64) -> f64 {
        match self {
            Self::Delta { location } => {
                if x == *location {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Uniform {
                lower,
                upper,
                multiplier,
            } => {
                if x >= *lower && x <= *upper {
                    *multiplier
                } else {
                    0.0
                }
            }
            Self::Power {
                exponent,
                lower,
                upper,
                multiplier,
            } => {
                if x >= *lower && x <= *upper {
                    multiplier * x.powf(*exponent)
                } else {
                    0.0
                }
            }
            Self::Exponential {
                rate,
                lower,
                upper,
                multiplier,
            } => {
                if x >= *lower && x <= *upper {
                    multiplier * (-rate * x).exp()
                } else {
                    0.0
                }
            }
            Self::Discrete { .. } => self.evaluate_pdf(x),
            Self::Normal {
                mean,
                std_dev,
                lower,
                upper,
                multiplier,
                ..
            } => {
                if x >= *lower && x <= *upper {
                    let z = (x - mean) / std_dev;
                    multiplier * (-0.5 * z * z).exp()
                } else {
                    0.0
                }
            }
        }
    }

    /// Evaluate the normalized probability density
    pub fn evaluate_pdf(&self, x: f64) -> f64 {
        match self {
            Self::Delta { .. } => self.evaluate(x),
            Self::Uniform { lower, upper, .. } => {
                if x >= *lower && x <= *upper {
                    1.0 / (upper - lower)
                } else {
                    0.0
                }
            }
            Self::Power {
                exponent,
                lower,
                upper,
                ..
            } => {
                if x >= *lower && x <= *upper {
                    let n1 = exponent + 1.0;
                    n1 * x.powf(*exponent) / (upper.powf(n1) - lower.powf(n1))
                } else {
                    0.0
                }
            }
            Self::Exponential {
                rate, lower, upper, ..
            } => {
                if x >= *lower && x <= *upper {
                    let norm = (-rate * lower).exp() - (-rate * upper).exp();
                    rate * (-rate * x).exp() / norm
                } else {
                    0.0
                }
            }
            Self::Discrete { values, cdf } => {
                let mut pdf = 0.0;
                let mut previous = 0.0;
                for (value, c) in values.iter().zip(cdf.iter()) {
                    if *value == x {
                        pdf += c - previous;
                    }
                    previous = *c;
                }
                pdf
            }
            Self::Normal {
                mean,
                std_dev,
                lower,
                upper,
                norm_constant,
                ..
            } => {
                if x >= *lower && x <= *upper {
                    let z = (x - mean) / std_dev;
                    (-0.5 * z * z).exp() / norm_constant
                } else {
                    0.0
                }
            }
        }
    }

    /// Sample a value from this distribution
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let mut trials = 0;
        self.sample_and_record_trials(rng, &mut trials)
    }

    /// Sample a value and add the number of attempts it took to `trials`
    pub fn sample_and_record_trials<R: Rng + ?Sized>(&self, rng: &mut R, trials: &mut u64) -> f64 {
        match self {
            Self::Delta { location } => {
                *trials += 1;
                *location
            }
            Self::Uniform { lower, upper, .. } => {
                *trials += 1;
                let xi: f64 = rng.gen();
                lower + xi * (upper - lower)
            }
            Self::Power {
                exponent,
                lower,
                upper,
                ..
            } => {
                *trials += 1;
                let xi: f64 = rng.gen();
                let n1 = exponent + 1.0;
                let a = lower.powf(n1);
                let b = upper.powf(n1);
                (a + xi * (b - a)).powf(1.0 / n1).clamp(*lower, *upper)
            }
            Self::Exponential {
                rate, lower, upper, ..
            } => {
                *trials += 1;
                let xi: f64 = rng.gen();
                let exp_lower = (-rate * lower).exp();
                let exp_upper = (-rate * upper).exp();
                let x = -(exp_lower - xi * (exp_lower - exp_upper)).ln() / rate;
                x.clamp(*lower, *upper)
            }
            Self::Discrete { values, cdf } => {
                *trials += 1;
                let xi: f64 = rng.gen();
                let idx = cdf.partition_point(|c| *c <= xi).min(values.len() - 1);
                values[idx]
            }
            Self::Normal {
                mean,
                std_dev,
                lower,
                upper,
                ..
            } => loop {
                *trials += 1;
                let z: f64 = rng.sample(StandardNormal);
                let x = mean + std_dev * z;
                if x >= *lower && x <= *upper {
                    break x;
                }
            },
        }
    }

    pub fn lower_bound(&self) -> f64 {
        match self {
            Self::Delta { location } => *location,
            Self::Uniform { lower, .. }
            | Self::Power { lower, .. }
            | Self::Exponential { lower, .. }
            | Self::Normal { lower, .. } => *lower,
            Self::Discrete { values, .. } => values.iter().cloned().fold(f64::INFINITY, f64::min),
        }
    }

    pub fn upper_bound(&self) -> f64 {
        match self {
            Self::Delta { location } => *location,
            Self::Uniform { upper, .. }
            | Self::Power { upper, .. }
            | Self::Exponential { upper, .. }
            | Self::Normal { upper, .. } => *upper,
            Self::Discrete { values, .. } => {
                values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
            }
        }
    }

    pub fn form(&self) -> DistributionForm {
        match self {
            Self::Delta { .. } => DistributionForm::Delta,
            Self::Uniform { .. } => DistributionForm::Uniform,
            Self::Power { .. } => DistributionForm::Power,
            Self::Exponential { .. } => DistributionForm::Exponential,
            Self::Discrete { .. } => DistributionForm::Discrete,
            Self::Normal { .. } => DistributionForm::Normal,
        }
    }

    pub fn has_form(&self, form: DistributionForm) -> bool {
        self.form() == form
    }

    /// Constant everywhere it is defined
    pub fn is_uniform(&self) -> bool {
        matches!(self, Self::Uniform { .. })
    }

    pub fn is_continuous(&self) -> bool {
        !matches!(self, Self::Delta { .. } | Self::Discrete { .. })
    }

    pub fn is_tabular(&self) -> bool {
        matches!(self, Self::Discrete { .. })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Delta { .. } => "Delta Distribution",
            Self::Uniform { .. } => "Uniform Distribution",
            Self::Power { .. } => "Power Distribution",
            Self::Exponential { .. } => "Exponential Distribution",
            Self::Discrete { .. } => "Discrete Distribution",
            Self::Normal { .. } => "Normal Distribution",
        }
    }

    /// True if both distributions are defined over the same interval
    pub fn has_same_bounds(&self, other: &UnivariateDistribution) -> bool {
        self.lower_bound() == other.lower_bound() && self.upper_bound() == other.upper_bound()
    }
}

/// A bivariate distribution that is a histogram in the primary (parent)
/// dimension: each primary grid point owns the secondary distribution used
/// from that point up to the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBivariateDistribution {
    primary_grid: Vec<f64>,
    secondary_distributions: Vec<UnivariateDistribution>,
}

impl HistogramBivariateDistribution {
    pub fn new(
        primary_grid: Vec<f64>,
        secondary_distributions: Vec<UnivariateDistribution>,
    ) -> Result<Self> {
        if primary_grid.len() < 2 || primary_grid.len() != secondary_distributions.len() {
            return Err(SourceError::InvalidDistribution(format!(
                "Histogram bivariate distribution needs at least two primary grid points and one \
                 secondary distribution per point (got {} points, {} distributions)",
                primary_grid.len(),
                secondary_distributions.len()
            )));
        }
        if primary_grid.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(SourceError::InvalidDistribution(
                "Primary grid must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            primary_grid,
            secondary_distributions,
        })
    }

    pub fn primary_lower_bound(&self) -> f64 {
        self.primary_grid[0]
    }

    pub fn primary_upper_bound(&self) -> f64 {
        self.primary_grid[self.primary_grid.len() - 1]
    }

    pub fn has_same_primary_bounds(&self, other: &HistogramBivariateDistribution) -> bool {
        self.primary_lower_bound() == other.primary_lower_bound()
            && self.primary_upper_bound() == other.primary_upper_bound()
    }

    fn within_primary_bounds(&self, primary: f64) -> bool {
        primary >= self.primary_lower_bound() && primary <= self.primary_upper_bound()
    }

    fn secondary_distribution(&self, primary: f64) -> &UnivariateDistribution {
        let idx = self
            .primary_grid
            .partition_point(|x| *x <= primary)
            .saturating_sub(1)
            .min(self.secondary_distributions.len() - 1);
        &self.secondary_distributions[idx]
    }

    // The grid is never extended, so sampling outside it is an error
    fn sampling_secondary_distribution(&self, primary: f64) -> Result<&UnivariateDistribution> {
        if !self.within_primary_bounds(primary) {
            return Err(SourceError::InvalidDistribution(format!(
                "Cannot sample beyond the primary grid: {} is outside [{}, {}]",
                primary,
                self.primary_lower_bound(),
                self.primary_upper_bound()
            )));
        }
        Ok(self.secondary_distribution(primary))
    }

    pub fn evaluate(&self, primary: f64, secondary: f64) -> f64 {
        if !self.within_primary_bounds(primary) {
            return 0.0;
        }
        self.secondary_distribution(primary).evaluate(secondary)
    }

    pub fn evaluate_secondary_conditional_pdf(&self, primary: f64, secondary: f64) -> f64 {
        if !self.within_primary_bounds(primary) {
            return 0.0;
        }
        self.secondary_distribution(primary).evaluate_pdf(secondary)
    }

    pub fn sample_secondary_conditional<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        primary: f64,
    ) -> Result<f64> {
        Ok(self.sampling_secondary_distribution(primary)?.sample(rng))
    }

    pub fn sample_secondary_conditional_and_record_trials<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        primary: f64,
        trials: &mut u64,
    ) -> Result<f64> {
        Ok(self
            .sampling_secondary_distribution(primary)?
            .sample_and_record_trials(rng, trials))
    }

    pub fn is_primary_dimension_continuous(&self) -> bool {
        true
    }

    pub fn is_primary_dimension_tabular(&self) -> bool {
        true
    }

    pub fn type_name(&self) -> &'static str {
        "Histogram Bivariate Distribution"
    }
}

fn check_bounds(lower: f64, upper: f64) -> Result<()> {
    if lower.is_nan() || upper.is_nan() || !(lower < upper) || lower == f64::NEG_INFINITY {
        return Err(SourceError::InvalidDistribution(format!(
            "Invalid bounds [{}, {}]",
            lower, upper
        )));
    }
    Ok(())
}

fn check_multiplier(multiplier: f64) -> Result<()> {
    if !(multiplier > 0.0) || !multiplier.is_finite() {
        return Err(SourceError::InvalidDistribution(format!(
            "Multiplier must be positive, got {}",
            multiplier
        )));
    }
    Ok(())
}

// Composite Simpson integration of exp(-z^2/2) over the truncated range
fn normal_norm_constant(mean: f64, std_dev: f64, lower: f64, upper: f64) -> f64 {
    let a = lower.max(mean - 12.0 * std_dev);
    let b = upper.min(mean + 12.0 * std_dev);
    if !(a < b) {
        return 0.0;
    }
    let n = 4000;
    let h = (b - a) / n as f64;
    let f = |x: f64| {
        let z = (x - mean) / std_dev;
        (-0.5 * z * z).exp()
    };
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + i as f64 * h);
    }
    sum * h / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_delta_distribution() {
        let mut rng = StdRng::seed_from_u64(1);
        let delta = UnivariateDistribution::new_delta(2.0);
        assert_eq!(delta.sample(&mut rng), 2.0);
        assert_eq!(delta.evaluate(2.0), 1.0);
        assert_eq!(delta.evaluate(2.5), 0.0);
        assert!(!delta.is_continuous());
        assert!(!delta.is_uniform());
        assert!(delta.has_form(DistributionForm::Delta));
    }

    #[test]
    fn test_uniform_distribution() {
        let mut rng = StdRng::seed_from_u64(1);
        let uniform = UnivariateDistribution::new_uniform_with_multiplier(-1.0, 1.0, 2.0).unwrap();
        assert_eq!(uniform.evaluate(0.0), 2.0);
        assert_eq!(uniform.evaluate_pdf(0.0), 0.5);
        assert_eq!(uniform.evaluate(1.5), 0.0);
        assert!(uniform.is_uniform());

        for _ in 0..1000 {
            let x = uniform.sample(&mut rng);
            assert!((-1.0..=1.0).contains(&x));
        }
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        assert!(UnivariateDistribution::new_uniform(1.0, 1.0).is_err());
        assert!(UnivariateDistribution::new_uniform(2.0, 1.0).is_err());
        assert!(UnivariateDistribution::new_power(2.0, -1.0, 1.0).is_err());
        assert!(UnivariateDistribution::new_normal(0.0, 0.0, -1.0, 1.0).is_err());
        assert!(UnivariateDistribution::new_discrete(&[1.0], &[0.0]).is_err());
    }

    #[test]
    fn test_power_distribution_pdf_integrates_to_one() {
        let power = UnivariateDistribution::new_power(2.0, 0.0, 2.0).unwrap();
        let n = 10000;
        let h = 2.0 / n as f64;
        let integral: f64 = (0..n)
            .map(|i| power.evaluate_pdf((i as f64 + 0.5) * h) * h)
            .sum();
        assert!((integral - 1.0).abs() < 1e-6);
        assert!(power.has_form(DistributionForm::Power));
    }

    #[test]
    fn test_exponential_sampling_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let exp = UnivariateDistribution::new_exponential(2.0, 0.0, f64::INFINITY).unwrap();
        let mut sum = 0.0;
        for _ in 0..20000 {
            let x = exp.sample(&mut rng);
            assert!(x >= 0.0);
            sum += x;
        }
        // Mean of an untruncated exponential is 1/rate
        assert!((sum / 20000.0 - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_discrete_distribution() {
        let mut rng = StdRng::seed_from_u64(3);
        let discrete = UnivariateDistribution::new_discrete(&[1.0, 2.0, 3.0], &[1.0, 0.0, 3.0]).unwrap();
        assert!((discrete.evaluate_pdf(3.0) - 0.75).abs() < 1e-12);
        assert_eq!(discrete.evaluate_pdf(2.0), 0.0);
        for _ in 0..1000 {
            let x = discrete.sample(&mut rng);
            assert!(x == 1.0 || x == 3.0);
        }
        assert!(discrete.is_tabular());
    }

    #[test]
    fn test_normal_rejection_records_extra_trials() {
        let mut rng = StdRng::seed_from_u64(11);
        // Only a thin slice of the normal is kept so most attempts are rejected
        let normal = UnivariateDistribution::new_normal(0.0, 1.0, 0.0, 0.5).unwrap();
        let mut trials = 0;
        let samples = 500;
        for _ in 0..samples {
            let x = normal.sample_and_record_trials(&mut rng, &mut trials);
            assert!((0.0..=0.5).contains(&x));
        }
        assert!(trials > 2 * samples);
    }

    #[test]
    fn test_normal_far_tail_window_rejected() {
        // Roughly 1e-19 of the mass lies in [9, 10]
        let result = UnivariateDistribution::new_normal(0.0, 1.0, 9.0, 10.0);
        assert!(matches!(result, Err(SourceError::InvalidDistribution(_))));

        // A window three deviations out is still fine
        let normal = UnivariateDistribution::new_normal(0.0, 1.0, 3.0, 4.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let x = normal.sample(&mut rng);
        assert!((3.0..=4.0).contains(&x));
    }

    #[test]
    fn test_normal_pdf_normalized() {
        let normal = UnivariateDistribution::new_normal(0.0, 1.0, f64::MIN, f64::INFINITY).unwrap();
        let expected = 1.0 / (2.0 * std::f64::consts::PI).sqrt();
        assert!((normal.evaluate_pdf(0.0) - expected).abs() < 1e-8);
    }

    #[test]
    fn test_histogram_bivariate_bins() {
        let mut rng = StdRng::seed_from_u64(5);
        let bivariate = HistogramBivariateDistribution::new(
            vec![0.0, 0.5, 1.0],
            vec![
                UnivariateDistribution::new_delta(10.0),
                UnivariateDistribution::new_delta(20.0),
                UnivariateDistribution::new_delta(30.0),
            ],
        )
        .unwrap();

        assert_eq!(bivariate.sample_secondary_conditional(&mut rng, 0.1).unwrap(), 10.0);
        assert_eq!(bivariate.sample_secondary_conditional(&mut rng, 0.5).unwrap(), 20.0);
        assert_eq!(bivariate.sample_secondary_conditional(&mut rng, 0.9).unwrap(), 20.0);
        assert_eq!(bivariate.sample_secondary_conditional(&mut rng, 1.0).unwrap(), 30.0);

        assert_eq!(bivariate.evaluate(0.1, 10.0), 1.0);
        assert_eq!(bivariate.evaluate(0.1, 20.0), 0.0);
        assert_eq!(bivariate.evaluate(-0.1, 10.0), 0.0);
    }

    #[test]
    fn test_histogram_bivariate_sampling_outside_grid_fails() {
        let mut rng = StdRng::seed_from_u64(5);
        let bivariate = HistogramBivariateDistribution::new(
            vec![0.0, 1.0, 2.0],
            vec![
                UnivariateDistribution::new_uniform(0.0, 1.0).unwrap(),
                UnivariateDistribution::new_uniform(10.0, 11.0).unwrap(),
                UnivariateDistribution::new_uniform(20.0, 21.0).unwrap(),
            ],
        )
        .unwrap();

        for primary in [-0.5, 5.0] {
            let mut trials = 0;
            assert!(bivariate.sample_secondary_conditional(&mut rng, primary).is_err());
            assert!(bivariate
                .sample_secondary_conditional_and_record_trials(&mut rng, primary, &mut trials)
                .is_err());
            assert_eq!(trials, 0);
            assert_eq!(bivariate.evaluate(primary, 10.5), 0.0);
        }

        // The upper grid edge uses the last bin
        let x = bivariate.sample_secondary_conditional(&mut rng, 2.0).unwrap();
        assert!((20.0..=21.0).contains(&x));
    }

    #[test]
    fn test_send_sync_bounds() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<UnivariateDistribution>();
        assert_sync::<HistogramBivariateDistribution>();
    }
}
