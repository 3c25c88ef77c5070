use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical hex-grid address. Odd rows sit half a tile to the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub column: u32,
}

impl Coordinate {
    pub const fn new(depth: u32, row: u32, column: u32) -> Self {
        Self { depth, row, column }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.depth, self.row, self.column)
    }
}

/// Rectangular region in row/column space, half-open on the max side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default)]
    pub min_row: u32,
    #[serde(default)]
    pub max_row: u32,
    #[serde(default)]
    pub min_column: u32,
    #[serde(default)]
    pub max_column: u32,
}

impl Bounds {
    pub const fn new(min_row: u32, max_row: u32, min_column: u32, max_column: u32) -> Self {
        Self {
            min_row,
            max_row,
            min_column,
            max_column,
        }
    }

    pub const fn rows(&self) -> u32 {
        self.max_row.saturating_sub(self.min_row)
    }

    pub const fn columns(&self) -> u32 {
        self.max_column.saturating_sub(self.min_column)
    }

    pub const fn is_empty(&self) -> bool {
        self.rows() == 0 || self.columns() == 0
    }

    /// Four-sided rectangle overlap. Empty bounds never intersect anything.
    pub const fn intersects(&self, other: &Bounds) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_row < other.max_row
            && other.min_row < self.max_row
            && self.min_column < other.max_column
            && other.min_column < self.max_column
    }

    pub const fn contains(&self, row: u32, column: u32) -> bool {
        row >= self.min_row && row < self.max_row && column >= self.min_column && column < self.max_column
    }

    /// Like [`Bounds::contains`] with every side pushed outward by `margin`.
    pub const fn contains_with_margin(&self, row: u32, column: u32, margin: u32) -> bool {
        let (row, column, margin) = (row as i64, column as i64, margin as i64);
        row >= self.min_row as i64 - margin
            && row < self.max_row as i64 + margin
            && column >= self.min_column as i64 - margin
            && column < self.max_column as i64 + margin
    }

    pub fn key(&self) -> String {
        format!(
            "[{},{}),[{},{})",
            self.min_row, self.max_row, self.min_column, self.max_column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_display_is_depth_row_column() {
        assert_eq!(Coordinate::new(2, 10, 7).to_string(), "2.10.7");
    }

    #[test]
    fn bounds_key_is_half_open() {
        assert_eq!(Bounds::new(0, 15, 15, 30).key(), "[0,15),[15,30)");
    }

    #[test]
    fn intersects_is_symmetric_on_all_four_sides() {
        let target = Bounds::new(10, 20, 10, 20);
        // Entirely to the right of the target: the column lower bound must reject it.
        let right = Bounds::new(12, 18, 25, 30);
        assert!(!target.intersects(&right));
        assert!(!right.intersects(&target));

        let left = Bounds::new(12, 18, 0, 10);
        assert!(!target.intersects(&left));

        let above = Bounds::new(0, 10, 12, 18);
        assert!(!target.intersects(&above));

        let below = Bounds::new(20, 30, 12, 18);
        assert!(!target.intersects(&below));

        let corner = Bounds::new(19, 25, 19, 25);
        assert!(target.intersects(&corner));
        assert!(corner.intersects(&target));
    }

    #[test]
    fn empty_bounds_never_intersect() {
        let empty = Bounds::new(5, 5, 0, 10);
        assert!(!empty.intersects(&Bounds::new(0, 10, 0, 10)));
    }

    #[test]
    fn contains_with_margin_extends_every_side() {
        let bounds = Bounds::new(2, 4, 2, 4);
        assert!(bounds.contains_with_margin(5, 2, 2));
        assert!(!bounds.contains_with_margin(6, 2, 2));
        assert!(bounds.contains_with_margin(0, 0, 2));
        assert!(bounds.contains_with_margin(2, 5, 2));
        assert!(!bounds.contains(4, 2));
        assert!(!bounds.contains_with_margin(0, 0, 1));
    }
}
