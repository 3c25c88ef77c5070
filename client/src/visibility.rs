//! Which segments and tiles of a layer intersect the viewport.
//!
//! The resolver never walks the whole grid: it guesses the first candidate
//! row (and, inside each row, the first candidate segment) proportionally,
//! corrects the guess against the cached row bands, and stops as soon as
//! rows or segments start past the target.

use hexworld_shared::{Bounds, Grid, SegmentIndex, SegmentRow, TileIndex, TileMetrics};

use crate::config::DEFAULT_OVERSCAN;
use crate::viewport::{Offset, Size, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveOptions {
    /// Zoomed-out views only paint segment backgrounds.
    pub include_tiles: bool,
    /// Tiles within this many grid units outside the target are kept.
    pub overscan: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            include_tiles: true,
            overscan: DEFAULT_OVERSCAN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisibleSet {
    pub bounds: Bounds,
    pub segments: Vec<SegmentIndex>,
    pub tiles: Vec<TileIndex>,
}

fn clamp_index(value: f64, total: u32) -> u32 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, total as f64) as u32
}

/// Grid-unit rectangle covered by the viewport.
///
/// Rows are conservative for the quarter-height overlap with the row above;
/// columns for the half-tile shift of odd rows.
pub fn target_bounds(
    total_rows: u32,
    total_columns: u32,
    metrics: &TileMetrics,
    offset: Offset,
    zoom: f64,
    viewport: Size,
) -> Bounds {
    if metrics.is_degenerate()
        || !(zoom > 0.0)
        || !zoom.is_finite()
        || !(viewport.width > 0.0)
        || !(viewport.height > 0.0)
    {
        return Bounds::default();
    }
    let w = metrics.tile_width;
    let h = metrics.tile_height;
    let row_height = metrics.row_height();

    let left = -offset.x / zoom;
    let top = -offset.y / zoom;
    let right = left + viewport.width / zoom;
    let bottom = top + viewport.height / zoom;

    let min_row = clamp_index(((top - h) / row_height).floor() + 1.0, total_rows);
    let max_row = clamp_index((bottom / row_height).ceil(), total_rows);
    let min_column = clamp_index(((left - 1.5 * w) / w).floor() + 1.0, total_columns);
    let max_column = clamp_index((right / w).ceil(), total_columns);

    Bounds::new(min_row, max_row, min_column, max_column)
}

/// Proportional first guess, one slot early.
fn estimate_index(target: u32, total: u32, len: usize) -> usize {
    if total == 0 || len == 0 {
        return 0;
    }
    let guess = (target as f64 / total as f64 * len as f64).floor() as usize;
    guess.saturating_sub(1).min(len - 1)
}

fn first_row(rows: &[SegmentRow], target: &Bounds, total_rows: u32) -> usize {
    let mut r = estimate_index(target.min_row, total_rows, rows.len());
    while r > 0 && rows[r - 1].row_span().1 > target.min_row {
        r -= 1;
    }
    while r < rows.len() && rows[r].row_span().1 <= target.min_row {
        r += 1;
    }
    r
}

fn scan_row(row_index: usize, row: &SegmentRow, target: &Bounds, total_columns: u32, out: &mut Vec<SegmentIndex>) {
    let segments = row.segments();
    let mut c = estimate_index(target.min_column, total_columns, segments.len());
    while c > 0 && segments[c - 1].bounds.max_column > target.min_column {
        c -= 1;
    }
    while c < segments.len() && segments[c].bounds.max_column <= target.min_column {
        c += 1;
    }
    for (column, segment) in segments.iter().enumerate().skip(c) {
        if segment.bounds.min_column >= target.max_column {
            break;
        }
        if segment.bounds.intersects(target) {
            out.push(SegmentIndex {
                row: row_index,
                column,
            });
        }
    }
}

pub fn visible_segments(grid: &Grid, target: &Bounds) -> Vec<SegmentIndex> {
    let mut segments = Vec::new();
    if target.is_empty() || grid.segment_rows.is_empty() {
        return segments;
    }
    let rows = &grid.segment_rows;
    let start = first_row(rows, target, grid.total_rows);
    for (row_index, row) in rows.iter().enumerate().skip(start) {
        if row.row_span().0 >= target.max_row {
            break;
        }
        scan_row(row_index, row, target, grid.total_columns, &mut segments);
    }
    segments
}

/// Reference answer: test every segment.
#[cfg(test)]
fn visible_segments_exhaustive(grid: &Grid, target: &Bounds) -> Vec<SegmentIndex> {
    grid.segments()
        .filter(|(_, segment)| segment.bounds.intersects(target))
        .map(|(index, _)| index)
        .collect()
}

fn visible_tiles(grid: &Grid, segments: &[SegmentIndex], target: &Bounds, overscan: u32) -> Vec<TileIndex> {
    let mut tiles = Vec::new();
    for &index in segments {
        let Some(segment) = grid.segment(index) else {
            continue;
        };
        for (tile, t) in segment.tiles.iter().enumerate() {
            if target.contains_with_margin(t.coordinate.row, t.coordinate.column, overscan) {
                tiles.push(TileIndex {
                    segment: index,
                    tile,
                });
            }
        }
    }
    tiles
}

pub fn resolve_visible(
    grid: &Grid,
    metrics: &TileMetrics,
    viewport: &Viewport,
    size: Size,
    options: ResolveOptions,
) -> VisibleSet {
    let bounds = target_bounds(
        grid.total_rows,
        grid.total_columns,
        metrics,
        viewport.offset,
        viewport.zoom,
        size,
    );
    let segments = visible_segments(grid, &bounds);
    let tiles = if options.include_tiles {
        visible_tiles(grid, &segments, &bounds, options.overscan)
    } else {
        Vec::new()
    };
    VisibleSet {
        bounds,
        segments,
        tiles,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CacheKey {
    offset: Offset,
    zoom: f64,
    size: Size,
    metrics: TileMetrics,
    depth: u32,
    revision: u64,
    options: ResolveOptions,
}

/// Skips recomputation while nothing the result depends on has changed.
#[derive(Debug, Default)]
pub struct VisibilityCache {
    key: Option<CacheKey>,
    visible: VisibleSet,
    computations: u64,
}

impl VisibilityCache {
    pub fn resolve(
        &mut self,
        grid: &Grid,
        metrics: &TileMetrics,
        viewport: &Viewport,
        size: Size,
        options: ResolveOptions,
    ) -> &VisibleSet {
        let key = CacheKey {
            offset: viewport.offset,
            zoom: viewport.zoom,
            size,
            metrics: *metrics,
            depth: grid.depth,
            revision: grid.revision(),
            options,
        };
        if self.key != Some(key) {
            self.visible = resolve_visible(grid, metrics, viewport, size, options);
            self.key = Some(key);
            self.computations += 1;
        }
        &self.visible
    }

    pub fn computations(&self) -> u64 {
        self.computations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexworld_shared::{Coordinate, Segment, Tile};

    const METRICS: TileMetrics = TileMetrics::new(52.0, 60.0);

    fn segment(min_row: u32, max_row: u32, min_column: u32, max_column: u32) -> Segment {
        let mut tiles = Vec::new();
        for row in min_row..max_row {
            for column in min_column..max_column {
                tiles.push(Tile {
                    key: format!("000.{row:03}.{column:03}"),
                    coordinate: Coordinate::new(0, row, column),
                    terrain_id: "grass".into(),
                    rendering_spec: None,
                });
            }
        }
        Segment {
            bounds: Bounds::new(min_row, max_row, min_column, max_column),
            tiles,
            rendering_spec: None,
        }
    }

    /// `total_rows` x `total_columns` grid cut into blocks, streamed up to `loaded_rows`.
    fn grid(total_rows: u32, total_columns: u32, seg_rows: u32, seg_columns: u32, loaded_rows: u32) -> Grid {
        let mut grid = Grid::new(0, total_rows, total_columns);
        let mut r = 0;
        while r < loaded_rows.min(total_rows) {
            let r_end = (r + seg_rows).min(total_rows);
            let mut segments = Vec::new();
            let mut c = 0;
            while c < total_columns {
                let c_end = (c + seg_columns).min(total_columns);
                segments.push(segment(r, r_end, c, c_end));
                c = c_end;
            }
            grid.append_rows([SegmentRow::new(segments)]);
            r = r_end;
        }
        grid
    }

    fn viewport_at(x: f64, y: f64, zoom: f64) -> Viewport {
        let mut viewport = Viewport::default();
        viewport.offset = Offset { x, y };
        viewport.zoom = zoom;
        viewport
    }

    #[test]
    fn target_bounds_at_origin() {
        let bounds = target_bounds(10, 10, &METRICS, Offset::default(), 1.0, Size::new(400.0, 400.0));
        assert_eq!(bounds, Bounds::new(0, 9, 0, 8));
    }

    #[test]
    fn target_bounds_include_partially_visible_edges() {
        // Scrolled one tile right and one row down: row 0's bottom quarter and
        // the shifted half of column 0 on odd rows remain on screen.
        let bounds = target_bounds(100, 100, &METRICS, Offset { x: -52.0, y: -45.0 }, 1.0, Size::new(400.0, 400.0));
        assert_eq!(bounds.min_row, 0);
        assert_eq!(bounds.min_column, 0);

        let bounds = target_bounds(100, 100, &METRICS, Offset { x: -520.0, y: -450.0 }, 1.0, Size::new(400.0, 400.0));
        assert_eq!(bounds, Bounds::new(9, 19, 9, 18));
    }

    #[test]
    fn target_bounds_degenerate_inputs_are_empty() {
        let size = Size::new(400.0, 400.0);
        assert!(target_bounds(10, 10, &TileMetrics::default(), Offset::default(), 1.0, size).is_empty());
        assert!(target_bounds(10, 10, &METRICS, Offset::default(), 0.0, size).is_empty());
        assert!(target_bounds(10, 10, &METRICS, Offset::default(), 1.0, Size::default()).is_empty());
        assert!(target_bounds(0, 0, &METRICS, Offset::default(), 1.0, size).is_empty());
    }

    #[test]
    fn origin_viewport_sees_expected_tiles() {
        let grid = grid(10, 10, 5, 5, 10);
        let visible = resolve_visible(
            &grid,
            &METRICS,
            &Viewport::default(),
            Size::new(400.0, 400.0),
            ResolveOptions::default(),
        );
        assert_eq!(visible.bounds, Bounds::new(0, 9, 0, 8));
        assert_eq!(visible.segments.len(), 4);
        // Overscan pulls in the last row and the last two columns too.
        assert_eq!(visible.tiles.len(), 100);
        assert!(visible.segments.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn overscan_limits_tiles_to_margin() {
        let grid = grid(60, 60, 30, 30, 60);
        let options = ResolveOptions {
            include_tiles: true,
            overscan: 0,
        };
        let visible = resolve_visible(&grid, &METRICS, &Viewport::default(), Size::new(400.0, 400.0), options);
        assert_eq!(visible.tiles.len(), 9 * 8);

        let visible = resolve_visible(
            &grid,
            &METRICS,
            &Viewport::default(),
            Size::new(400.0, 400.0),
            ResolveOptions::default(),
        );
        assert_eq!(visible.tiles.len(), 11 * 10);
        for index in &visible.tiles {
            let tile = grid.tile(*index).expect("handle resolves");
            assert!(visible.bounds.contains_with_margin(tile.coordinate.row, tile.coordinate.column, 2));
        }
    }

    #[test]
    fn zoomed_out_resolution_skips_tiles() {
        let grid = grid(40, 40, 10, 10, 40);
        let options = ResolveOptions {
            include_tiles: false,
            ..ResolveOptions::default()
        };
        let visible = resolve_visible(&grid, &METRICS, &viewport_at(0.0, 0.0, 0.25), Size::new(600.0, 450.0), options);
        assert!(visible.tiles.is_empty());
        assert_eq!(visible.segments.len(), 16);
    }

    #[test]
    fn bounded_scan_matches_exhaustive_scan() {
        let layouts = [
            (64, 64, 16, 16, 64),
            (64, 64, 16, 16, 24),
            (50, 70, 7, 11, 50),
            (33, 17, 33, 17, 33),
            (100, 100, 1, 100, 100),
            (100, 100, 100, 1, 100),
            (10, 10, 3, 4, 10),
        ];
        let sizes = [Size::new(400.0, 400.0), Size::new(1280.0, 720.0), Size::new(90.0, 700.0)];
        for (rows, columns, seg_rows, seg_columns, loaded) in layouts {
            let grid = grid(rows, columns, seg_rows, seg_columns, loaded);
            for size in sizes {
                for zoom in [0.1, 0.5, 1.0, 1.7] {
                    for step in 0..12 {
                        let x = -(step as f64) * 173.0;
                        let y = -(step as f64) * 97.0;
                        let vp = viewport_at(x, y, zoom);
                        let bounds = target_bounds(rows, columns, &METRICS, vp.offset, zoom, size);
                        assert_eq!(
                            visible_segments(&grid, &bounds),
                            visible_segments_exhaustive(&grid, &bounds),
                            "grid {rows}x{columns} blocks {seg_rows}x{seg_columns} loaded {loaded} zoom {zoom} at {x},{y}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn empty_grid_resolves_to_nothing() {
        let grid = Grid::new(0, 100, 100);
        let visible = resolve_visible(
            &grid,
            &METRICS,
            &Viewport::default(),
            Size::new(400.0, 400.0),
            ResolveOptions::default(),
        );
        assert!(visible.segments.is_empty());
        assert!(visible.tiles.is_empty());
    }

    #[test]
    fn cache_reuses_result_until_inputs_change() {
        let mut grid = grid(40, 40, 10, 10, 20);
        let mut cache = VisibilityCache::default();
        let size = Size::new(1000.0, 1000.0);
        let options = ResolveOptions::default();
        let vp = Viewport::default();

        let first = cache.resolve(&grid, &METRICS, &vp, size, options).clone();
        cache.resolve(&grid, &METRICS, &vp, size, options);
        assert_eq!(cache.computations(), 1);

        cache.resolve(&grid, &METRICS, &viewport_at(-52.0, 0.0, 1.0), size, options);
        assert_eq!(cache.computations(), 2);

        cache.resolve(&grid, &METRICS, &vp, size, options);
        assert_eq!(cache.computations(), 3);

        let more = vec![segment(20, 30, 0, 10)];
        grid.append_rows([SegmentRow::new(more)]);
        let refreshed = cache.resolve(&grid, &METRICS, &vp, size, options).clone();
        assert_eq!(cache.computations(), 4);
        assert!(refreshed.segments.len() > first.segments.len());
    }
}
