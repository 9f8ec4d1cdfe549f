//! Sampling dependency tree over the phase space dimensions.
//!
//! Nodes live in a fixed array indexed by dimension, and parent/child edges
//! are dimension sets, so the tree never holds references to the
//! distributions themselves.

use crate::dimension::{DimensionSet, PhaseSpaceDimension};
use crate::dimension_distribution::DimensionDistributionMap;
use crate::error::{Result, SourceError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DependencyNode {
    registered: bool,
    children: DimensionSet,
    parents: DimensionSet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyTree {
    independent: DimensionSet,
    nodes: [DependencyNode; PhaseSpaceDimension::COUNT],
}

impl DependencyTree {
    /// Build and validate the tree for a set of dimension distributions
    pub fn build(distributions: &DimensionDistributionMap) -> Result<Self> {
        let mut tree = DependencyTree::default();
        tree.rebuild(distributions)?;
        Ok(tree)
    }

    /// Tree in which every given dimension is an independent root
    pub fn roots_only(dimensions: DimensionSet) -> Self {
        let mut tree = DependencyTree {
            independent: dimensions,
            ..DependencyTree::default()
        };
        for dimension in dimensions.iter() {
            tree.nodes[dimension.index()].registered = true;
        }
        tree
    }

    /// Reconstruct the tree from scratch.
    ///
    /// Every parent/child edge from a previous build is dropped first, so
    /// rebuilding an unchanged map gives an identical tree.
    pub fn rebuild(&mut self, distributions: &DimensionDistributionMap) -> Result<()> {
        self.independent.clear();
        for dimension in PhaseSpaceDimension::ALL {
            self.remove_dependent_distributions(dimension);
            self.nodes[dimension.index()].registered = false;
        }

        for distribution in distributions.iter() {
            let dimension = distribution.dimension();
            self.nodes[dimension.index()].registered = true;
            if distribution.is_independent() {
                self.independent.insert(dimension);
            }
        }

        for parent in distributions.iter() {
            for child in distributions.iter() {
                if child.is_dependent_on_dimension(parent.dimension()) {
                    self.add_dependent_distribution(parent.dimension(), child.dimension());
                }
            }
        }

        for distribution in distributions.iter().filter(|d| !d.is_independent()) {
            let dimension = distribution.dimension();
            // Every declared parent must have adopted it
            if !self.has_parent_distribution(dimension)
                || self.parent_dimensions(dimension) != distribution.parent_dimensions()
            {
                warn!(%dimension, "dependent distribution was not adopted by a parent");
                return Err(SourceError::OrphanedDimension { dimension });
            }
        }

        let reachable = self.reachable_dimensions();
        for distribution in distributions.iter() {
            let dimension = distribution.dimension();
            if !reachable.contains(dimension) {
                warn!(%dimension, "dependent distribution cannot be reached from a root");
                return Err(SourceError::UnreachableDimension { dimension });
            }
        }

        debug!(
            roots = ?self.independent.iter().collect::<Vec<_>>(),
            dimensions = distributions.len(),
            "constructed dimension dependency tree"
        );
        Ok(())
    }

    fn add_dependent_distribution(&mut self, parent: PhaseSpaceDimension, child: PhaseSpaceDimension) {
        self.nodes[parent.index()].children.insert(child);
        self.nodes[child.index()].parents.insert(parent);
        debug!(%parent, %child, "attached dependent distribution");
    }

    fn remove_dependent_distributions(&mut self, parent: PhaseSpaceDimension) {
        let children = self.nodes[parent.index()].children;
        for child in children.iter() {
            self.nodes[child.index()].parents.remove(parent);
        }
        self.nodes[parent.index()].children.clear();
    }

    /// True once at least one registered distribution adopted this dimension
    pub fn has_parent_distribution(&self, dimension: PhaseSpaceDimension) -> bool {
        !self.nodes[dimension.index()].parents.is_empty()
    }

    pub fn is_registered(&self, dimension: PhaseSpaceDimension) -> bool {
        self.nodes[dimension.index()].registered
    }

    /// Roots of the tree
    pub fn independent_dimensions(&self) -> DimensionSet {
        self.independent
    }

    pub fn dependent_dimensions(&self, parent: PhaseSpaceDimension) -> DimensionSet {
        self.nodes[parent.index()].children
    }

    pub fn parent_dimensions(&self, child: PhaseSpaceDimension) -> DimensionSet {
        self.nodes[child.index()].parents
    }

    // A dependent dimension is reachable once every one of its parents is
    fn reachable_dimensions(&self) -> DimensionSet {
        let mut reachable = self.independent;
        loop {
            let mut changed = false;
            for dimension in PhaseSpaceDimension::ALL {
                let node = &self.nodes[dimension.index()];
                if node.registered
                    && !reachable.contains(dimension)
                    && !node.parents.is_empty()
                    && node.parents.is_subset(&reachable)
                {
                    reachable.insert(dimension);
                    changed = true;
                }
            }
            if !changed {
                return reachable;
            }
        }
    }

    /// The dimension and everything below it
    pub fn subtree(&self, root: PhaseSpaceDimension) -> DimensionSet {
        let mut visited = DimensionSet::new();
        let mut stack = vec![root];
        while let Some(dimension) = stack.pop() {
            if visited.insert(dimension) {
                stack.extend(self.nodes[dimension.index()].children.iter());
            }
        }
        visited
    }

    /// Visit every registered dimension in cascade order.
    ///
    /// Roots are visited in declaration order. After a dimension is visited
    /// its children follow depth first, but a child is only visited once all
    /// of its parents have been.
    pub fn cascade<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(PhaseSpaceDimension) -> Result<()>,
    {
        let mut visited = DimensionSet::new();
        for root in self.independent.iter() {
            self.cascade_from(root, &mut visited, &mut visit)?;
        }
        Ok(())
    }

    fn cascade_from<F>(
        &self,
        dimension: PhaseSpaceDimension,
        visited: &mut DimensionSet,
        visit: &mut F,
    ) -> Result<()>
    where
        F: FnMut(PhaseSpaceDimension) -> Result<()>,
    {
        visit(dimension)?;
        visited.insert(dimension);

        for child in self.nodes[dimension.index()].children.iter() {
            if !visited.contains(child) && self.nodes[child.index()].parents.is_subset(visited) {
                self.cascade_from(child, visited, visit)?;
            }
        }
        Ok(())
    }

    /// Dimensions in the order `cascade` visits them
    pub fn sampling_order(&self) -> Vec<PhaseSpaceDimension> {
        let mut order = Vec::with_capacity(PhaseSpaceDimension::COUNT);
        // The visitor never fails
        let _ = self.cascade(|dimension| {
            order.push(dimension);
            Ok(())
        });
        order
    }
}
