//! Pixel layout of the pointy-top, odd-row-shifted hex grid.
//!
//! Tiles, segment backgrounds and the hover hit-test all go through
//! [`TileMetrics`] so the painted layers can never drift apart.

use crate::coords::Bounds;
use crate::world::RenderingSpec;

/// Rows overlap vertically by a quarter of the tile height.
pub const ROW_HEIGHT_RATIO: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TileMetrics {
    pub tile_width: f64,
    pub tile_height: f64,
}

impl From<RenderingSpec> for TileMetrics {
    fn from(spec: RenderingSpec) -> Self {
        Self::new(spec.tile_width, spec.tile_height)
    }
}

impl TileMetrics {
    pub const fn new(tile_width: f64, tile_height: f64) -> Self {
        Self {
            tile_width,
            tile_height,
        }
    }

    /// Zero, negative or non-finite sizes: nothing can be placed or hit.
    pub fn is_degenerate(&self) -> bool {
        !(self.tile_width.is_finite()
            && self.tile_height.is_finite()
            && self.tile_width > 0.0
            && self.tile_height > 0.0)
    }

    pub fn row_height(&self) -> f64 {
        self.tile_height * ROW_HEIGHT_RATIO
    }

    fn row_shift(&self, row: i64) -> f64 {
        if row.rem_euclid(2) == 1 {
            self.tile_width / 2.0
        } else {
            0.0
        }
    }

    /// Top-left corner of the tile's bounding box in world pixels.
    pub fn world_pixel_origin(&self, row: u32, column: u32) -> (f64, f64) {
        let x = column as f64 * self.tile_width + self.row_shift(row as i64);
        let y = row as f64 * self.row_height();
        (x, y)
    }

    pub fn tile_center(&self, row: u32, column: u32) -> (f64, f64) {
        let (x, y) = self.world_pixel_origin(row, column);
        (x + self.tile_width / 2.0, y + self.tile_height / 2.0)
    }

    /// Segment backgrounds are anchored exactly like their first tile.
    pub fn segment_origin(&self, bounds: &Bounds) -> (f64, f64) {
        self.world_pixel_origin(bounds.min_row, bounds.min_column)
    }

    /// Box covering every tile of the segment, including the half-tile shift.
    pub fn segment_size(&self, bounds: &Bounds) -> (f64, f64) {
        self.block_size(bounds.rows(), bounds.columns())
    }

    /// Whole-layer size in pixels, rounded up.
    pub fn map_size(&self, total_rows: u32, total_columns: u32) -> (f64, f64) {
        if self.is_degenerate() {
            return (0.0, 0.0);
        }
        let (width, height) = self.block_size(total_rows, total_columns);
        (width.ceil(), height.ceil())
    }

    fn block_size(&self, rows: u32, columns: u32) -> (f64, f64) {
        if rows == 0 || columns == 0 {
            return (0.0, 0.0);
        }
        let width = columns as f64 * self.tile_width + self.tile_width / 2.0;
        let height = (rows - 1) as f64 * self.row_height() + self.tile_height;
        (width, height)
    }

    /// Hex outline relative to the tile origin, clockwise from the top point.
    pub fn hex_vertices(&self) -> [(f64, f64); 6] {
        let (w, h) = (self.tile_width, self.tile_height);
        let shoulder = h / 4.0;
        [
            (w / 2.0, 0.0),
            (w, shoulder),
            (w, h - shoulder),
            (w / 2.0, h),
            (0.0, h - shoulder),
            (0.0, shoulder),
        ]
    }

    /// Row and column of the hex containing world pixel `(x, y)`.
    ///
    /// Each row band is `row_height` tall; its top quarter is shared with the
    /// pointed bottoms of the row above, so points there are tested against
    /// the hex's slanted top edges.
    pub fn hex_at(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        if self.is_degenerate() || !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return None;
        }
        let w = self.tile_width;
        let quarter = self.tile_height - self.row_height();

        let row = (y / self.row_height()).floor() as i64;
        let local_y = y - row as f64 * self.row_height();
        let shifted_x = x - self.row_shift(row);
        let column = (shifted_x / w).floor() as i64;

        let in_this_row = if local_y >= quarter {
            true
        } else {
            let local_x = shifted_x - column as f64 * w;
            let edge = quarter * (local_x - w / 2.0).abs() / (w / 2.0);
            local_y >= edge
        };

        let (row, column) = if in_this_row {
            (row, column)
        } else {
            let above = row - 1;
            (above, ((x - self.row_shift(above)) / w).floor() as i64)
        };

        if row < 0 || column < 0 {
            return None;
        }
        Some((row as u32, column as u32))
    }
}
