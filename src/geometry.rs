use crate::bounding_box::BoundingBox;
use crate::error::{Result, SourceError};
use std::collections::HashSet;
use std::fmt::Debug;

pub type CellId = u32;

/// The part of a geometry the source needs: locating the cell that holds
/// a sampled position.
pub trait GeometryModel: Debug + Send + Sync {
    /// Cell containing the position, None if it lies outside the geometry
    fn find_cell(&self, position: [f64; 3]) -> Option<CellId>;

    fn does_cell_exist(&self, cell: CellId) -> bool;
}

/// Geometry with one cell filling all of space
#[derive(Debug, Clone)]
pub struct InfiniteMediumModel {
    cell: CellId,
}

impl InfiniteMediumModel {
    pub fn new(cell: CellId) -> Self {
        Self { cell }
    }
}

impl Default for InfiniteMediumModel {
    fn default() -> Self {
        Self::new(1)
    }
}

impl GeometryModel for InfiniteMediumModel {
    fn find_cell(&self, _position: [f64; 3]) -> Option<CellId> {
        Some(self.cell)
    }

    fn does_cell_exist(&self, cell: CellId) -> bool {
        cell == self.cell
    }
}

/// Geometry made of axis-aligned box cells. The first box containing a
/// position owns it; anything outside every box is outside the geometry.
#[derive(Debug, Clone)]
pub struct BoxCellModel {
    cells: Vec<(CellId, BoundingBox)>,
}

impl BoxCellModel {
    pub fn new(cells: Vec<(CellId, BoundingBox)>) -> Result<Self> {
        let mut used_cell_ids = HashSet::new();
        for (id, bounds) in &cells {
            if !used_cell_ids.insert(*id) {
                return Err(SourceError::Geometry(format!(
                    "Duplicate cell_id {} found. All cell IDs must be unique.",
                    id
                )));
            }
            if !bounds.is_valid() {
                return Err(SourceError::Geometry(format!(
                    "Cell {} has an empty bounding box {:?}",
                    id, bounds
                )));
            }
        }
        Ok(Self { cells })
    }

    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells.iter().map(|(id, _)| *id)
    }
}

impl GeometryModel for BoxCellModel {
    fn find_cell(&self, position: [f64; 3]) -> Option<CellId> {
        self.cells
            .iter()
            .find(|(_, bounds)| bounds.contains(position))
            .map(|(id, _)| *id)
    }

    fn does_cell_exist(&self, cell: CellId) -> bool {
        self.cells.iter().any(|(id, _)| *id == cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infinite_medium() {
        let model = InfiniteMediumModel::new(7);
        assert_eq!(model.find_cell([1e10, -1e10, 0.0]), Some(7));
        assert!(model.does_cell_exist(7));
        assert!(!model.does_cell_exist(1));
    }

    #[test]
    fn test_box_cells() {
        let model = BoxCellModel::new(vec![
            (1, BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])),
            (2, BoundingBox::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0])),
        ])
        .unwrap();

        assert_eq!(model.find_cell([0.5, 0.5, 0.5]), Some(1));
        assert_eq!(model.find_cell([1.5, 0.5, 0.5]), Some(2));
        // Shared face belongs to the first cell
        assert_eq!(model.find_cell([1.0, 0.5, 0.5]), Some(1));
        assert_eq!(model.find_cell([3.0, 0.5, 0.5]), None);
        assert_eq!(model.cell_ids().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_duplicate_cell_ids_rejected() {
        let bounds = BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let err = BoxCellModel::new(vec![(1, bounds.clone()), (1, bounds)]).unwrap_err();
        assert!(err.to_string().contains("Duplicate cell_id 1"));
    }
}
