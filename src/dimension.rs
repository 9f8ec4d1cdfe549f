use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut};

/// The nine phase space dimensions a particle source distribution is defined over.
///
/// The meaning of the spatial and directional dimensions depends on the
/// coordinate conversion policies in use (e.g. x/y/z or r/theta/z for space,
/// direction cosines or r/azimuth/polar cosine for direction). The ordering
/// is the declaration order and carries no physical meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhaseSpaceDimension {
    PrimarySpatial,
    SecondarySpatial,
    TertiarySpatial,
    PrimaryDirectional,
    SecondaryDirectional,
    TertiaryDirectional,
    Energy,
    Time,
    Weight,
}

/// Broad class of a phase space dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseSpaceDimensionClass {
    Spatial,
    Directional,
    Energy,
    Time,
    Weight,
}

impl PhaseSpaceDimension {
    pub const COUNT: usize = 9;

    /// Every dimension, in declaration order
    pub const ALL: [PhaseSpaceDimension; Self::COUNT] = [
        PhaseSpaceDimension::PrimarySpatial,
        PhaseSpaceDimension::SecondarySpatial,
        PhaseSpaceDimension::TertiarySpatial,
        PhaseSpaceDimension::PrimaryDirectional,
        PhaseSpaceDimension::SecondaryDirectional,
        PhaseSpaceDimension::TertiaryDirectional,
        PhaseSpaceDimension::Energy,
        PhaseSpaceDimension::Time,
        PhaseSpaceDimension::Weight,
    ];

    pub const SPATIAL: [PhaseSpaceDimension; 3] = [
        PhaseSpaceDimension::PrimarySpatial,
        PhaseSpaceDimension::SecondarySpatial,
        PhaseSpaceDimension::TertiarySpatial,
    ];

    pub const DIRECTIONAL: [PhaseSpaceDimension; 3] = [
        PhaseSpaceDimension::PrimaryDirectional,
        PhaseSpaceDimension::SecondaryDirectional,
        PhaseSpaceDimension::TertiaryDirectional,
    ];

    /// Position of the dimension in [`PhaseSpaceDimension::ALL`]
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn class(self) -> PhaseSpaceDimensionClass {
        use PhaseSpaceDimension::*;
        match self {
            PrimarySpatial | SecondarySpatial | TertiarySpatial => PhaseSpaceDimensionClass::Spatial,
            PrimaryDirectional | SecondaryDirectional | TertiaryDirectional => {
                PhaseSpaceDimensionClass::Directional
            }
            Energy => PhaseSpaceDimensionClass::Energy,
            Time => PhaseSpaceDimensionClass::Time,
            Weight => PhaseSpaceDimensionClass::Weight,
        }
    }

    pub fn name(self) -> &'static str {
        use PhaseSpaceDimension::*;
        match self {
            PrimarySpatial => "primary spatial dimension",
            SecondarySpatial => "secondary spatial dimension",
            TertiarySpatial => "tertiary spatial dimension",
            PrimaryDirectional => "primary directional dimension",
            SecondaryDirectional => "secondary directional dimension",
            TertiaryDirectional => "tertiary directional dimension",
            Energy => "energy dimension",
            Time => "time dimension",
            Weight => "weight dimension",
        }
    }
}

impl fmt::Display for PhaseSpaceDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of phase space dimensions stored as a bitmask.
///
/// Iteration always follows declaration order, which keeps tree traversal
/// deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DimensionSet {
    bits: u16,
}

impl DimensionSet {
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    pub fn all() -> Self {
        Self {
            bits: (1u16 << PhaseSpaceDimension::COUNT) - 1,
        }
    }

    pub fn from_dimensions(dimensions: &[PhaseSpaceDimension]) -> Self {
        let mut set = Self::new();
        for &dimension in dimensions {
            set.insert(dimension);
        }
        set
    }

    /// Returns true if the dimension was not already present
    pub fn insert(&mut self, dimension: PhaseSpaceDimension) -> bool {
        let mask = 1u16 << dimension.index();
        let added = self.bits & mask == 0;
        self.bits |= mask;
        added
    }

    pub fn remove(&mut self, dimension: PhaseSpaceDimension) -> bool {
        let mask = 1u16 << dimension.index();
        let present = self.bits & mask != 0;
        self.bits &= !mask;
        present
    }

    #[inline]
    pub fn contains(&self, dimension: PhaseSpaceDimension) -> bool {
        self.bits & (1u16 << dimension.index()) != 0
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_subset(&self, other: &DimensionSet) -> bool {
        self.bits & !other.bits == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = PhaseSpaceDimension> + '_ {
        PhaseSpaceDimension::ALL
            .iter()
            .copied()
            .filter(move |dimension| self.contains(*dimension))
    }
}

impl FromIterator<PhaseSpaceDimension> for DimensionSet {
    fn from_iter<I: IntoIterator<Item = PhaseSpaceDimension>>(iter: I) -> Self {
        let mut set = DimensionSet::new();
        for dimension in iter {
            set.insert(dimension);
        }
        set
    }
}

/// One unsigned counter per phase space dimension.
///
/// Counters only ever grow during sampling and are merged by element-wise
/// addition, across threads and across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DimensionCounters {
    counts: [u64; PhaseSpaceDimension::COUNT],
}

impl DimensionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dimension: PhaseSpaceDimension) -> u64 {
        self.counts[dimension.index()]
    }

    pub fn increment(&mut self, dimension: PhaseSpaceDimension) {
        self.counts[dimension.index()] += 1;
    }

    /// Increment every counter, optionally skipping the energy dimension
    pub fn increment_all(&mut self, skip_energy: bool) {
        for dimension in PhaseSpaceDimension::ALL {
            if skip_energy && dimension == PhaseSpaceDimension::Energy {
                continue;
            }
            self.increment(dimension);
        }
    }

    pub fn reset(&mut self) {
        self.counts = [0; PhaseSpaceDimension::COUNT];
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PhaseSpaceDimension, u64)> + '_ {
        PhaseSpaceDimension::ALL
            .iter()
            .map(move |&dimension| (dimension, self.get(dimension)))
    }
}

impl Index<PhaseSpaceDimension> for DimensionCounters {
    type Output = u64;

    fn index(&self, dimension: PhaseSpaceDimension) -> &u64 {
        &self.counts[dimension.index()]
    }
}

impl IndexMut<PhaseSpaceDimension> for DimensionCounters {
    fn index_mut(&mut self, dimension: PhaseSpaceDimension) -> &mut u64 {
        &mut self.counts[dimension.index()]
    }
}

impl AddAssign<&DimensionCounters> for DimensionCounters {
    fn add_assign(&mut self, other: &DimensionCounters) {
        for (count, other_count) in self.counts.iter_mut().zip(other.counts.iter()) {
            *count += other_count;
        }
    }
}

impl AddAssign for DimensionCounters {
    fn add_assign(&mut self, other: DimensionCounters) {
        *self += &other;
    }
}

impl Add for DimensionCounters {
    type Output = DimensionCounters;

    fn add(mut self, other: DimensionCounters) -> DimensionCounters {
        self += &other;
        self
    }
}

impl std::iter::Sum for DimensionCounters {
    fn sum<I: Iterator<Item = DimensionCounters>>(iter: I) -> Self {
        iter.fold(DimensionCounters::new(), |acc, counters| acc + counters)
    }
}
