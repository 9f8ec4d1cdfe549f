use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lower_left: [f64; 3],
    pub upper_right: [f64; 3],
}

impl BoundingBox {
    pub fn new(lower_left: [f64; 3], upper_right: [f64; 3]) -> Self {
        BoundingBox {
            lower_left,
            upper_right,
        }
    }

    pub fn center(&self) -> [f64; 3] {
        [
            0.5 * (self.lower_left[0] + self.upper_right[0]),
            0.5 * (self.lower_left[1] + self.upper_right[1]),
            0.5 * (self.lower_left[2] + self.upper_right[2]),
        ]
    }

    pub fn width(&self) -> [f64; 3] {
        [
            self.upper_right[0] - self.lower_left[0],
            self.upper_right[1] - self.lower_left[1],
            self.upper_right[2] - self.lower_left[2],
        ]
    }

    /// Inclusive on every face
    pub fn contains(&self, position: [f64; 3]) -> bool {
        (0..3).all(|i| position[i] >= self.lower_left[i] && position[i] <= self.upper_right[i])
    }

    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.lower_left[i] < self.upper_right[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_and_width() {
        let bb = BoundingBox::new([-1.0, 0.0, 2.0], [1.0, 4.0, 3.0]);
        assert_eq!(bb.center(), [0.0, 2.0, 2.5]);
        assert_eq!(bb.width(), [2.0, 4.0, 1.0]);
        assert!(bb.is_valid());
    }

    #[test]
    fn test_contains() {
        let bb = BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        assert!(bb.contains([0.5, 0.5, 0.5]));
        assert!(bb.contains([1.0, 0.0, 1.0]));
        assert!(!bb.contains([1.1, 0.5, 0.5]));
    }
}
