use hexworld_shared::{Grid, TileIndex, TileMetrics, World};
use serde::{Deserialize, Serialize};

/// Screen-space translation of the map, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PanMode {
    /// Pixel-exact panning.
    #[default]
    Continuous,
    /// Offset snaps to whole tiles horizontally and whole rows vertically.
    Discrete,
}

/// Pixel geometry of the layer being viewed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MapGeometry {
    pub metrics: TileMetrics,
    pub map: Size,
}

impl MapGeometry {
    pub fn new(metrics: TileMetrics, total_rows: u32, total_columns: u32) -> Self {
        let (width, height) = metrics.map_size(total_rows, total_columns);
        Self {
            metrics,
            map: Size::new(width, height),
        }
    }

    pub fn for_grid(metrics: TileMetrics, grid: &Grid) -> Self {
        Self::new(metrics, grid.total_rows, grid.total_columns)
    }

    /// Geometry of one layer; an unknown layer or missing rendering spec has no extent.
    pub fn for_layer(world: &World, depth: u32) -> Self {
        let metrics = world.rendering_spec.map(TileMetrics::from).unwrap_or_default();
        match world.layer(depth) {
            Some(grid) => Self::for_grid(metrics, grid),
            None => Self {
                metrics,
                map: Size::default(),
            },
        }
    }
}

/// Clamp one axis: inside `[-(map*zoom - viewport), 0]` when the map is larger
/// than the viewport, otherwise centered.
pub fn clamp_axis(offset: f64, map_extent: f64, viewport_extent: f64, zoom: f64) -> f64 {
    let scaled = map_extent * zoom;
    if viewport_extent < scaled {
        let offset = if offset.is_finite() { offset } else { 0.0 };
        offset.clamp(-(scaled - viewport_extent), 0.0)
    } else {
        (viewport_extent - scaled) / 2.0
    }
}

/// Zoom at which the whole map fits inside the viewport.
pub fn fit_zoom(map: Size, viewport: Size) -> f64 {
    if map.width <= 0.0 || map.height <= 0.0 || viewport.width <= 0.0 || viewport.height <= 0.0 {
        return 1.0;
    }
    (viewport.width / map.width).min(viewport.height / map.height)
}

/// Advance by whole `step`s only. Returns the new offset and the carried remainder.
fn discrete_step(offset: f64, pending: f64, step: f64) -> (f64, f64) {
    if !(step > 0.0) || !step.is_finite() {
        return (offset, 0.0);
    }
    let steps = (pending / step).trunc();
    let moved = steps * step;
    (offset + moved, pending - moved)
}

/// Pan/zoom state of the map view.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset: Offset,
    pub zoom: f64,
    pub zoomed_out: bool,
    pub pan_mode: PanMode,
    pub selected_depth: u32,
    remainder: Offset,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Offset::default(),
            zoom: 1.0,
            zoomed_out: false,
            pan_mode: PanMode::default(),
            selected_depth: 0,
            remainder: Offset::default(),
        }
    }
}

impl Viewport {
    pub fn with_pan_mode(pan_mode: PanMode) -> Self {
        Self {
            pan_mode,
            ..Self::default()
        }
    }

    /// Apply an aggregated screen-space delta, then clamp.
    pub fn apply_pan(&mut self, dx: f64, dy: f64, geometry: &MapGeometry, viewport: Size) {
        match self.pan_mode {
            PanMode::Continuous => {
                self.offset.x += dx;
                self.offset.y += dy;
                self.clamp(geometry, viewport);
            }
            PanMode::Discrete => {
                let step_x = geometry.metrics.tile_width * self.zoom;
                let step_y = geometry.metrics.row_height() * self.zoom;
                let (x, rx) = discrete_step(self.offset.x, self.remainder.x + dx, step_x);
                let (y, ry) = discrete_step(self.offset.y, self.remainder.y + dy, step_y);
                self.offset = Offset { x, y };
                self.remainder = Offset { x: rx, y: ry };
                self.clamp(geometry, viewport);
                // Pushing against an edge must not bank movement for later.
                if self.offset.x != x {
                    self.remainder.x = 0.0;
                }
                if self.offset.y != y {
                    self.remainder.y = 0.0;
                }
            }
        }
    }

    pub fn clamp(&mut self, geometry: &MapGeometry, viewport: Size) {
        self.offset.x = clamp_axis(self.offset.x, geometry.map.width, viewport.width, self.zoom);
        self.offset.y = clamp_axis(self.offset.y, geometry.map.height, viewport.height, self.zoom);
    }

    /// Switch between normal zoom and the fit-everything overview.
    pub fn toggle_zoom_out(&mut self, geometry: &MapGeometry, viewport: Size) {
        self.zoomed_out = !self.zoomed_out;
        self.zoom = if self.zoomed_out {
            fit_zoom(geometry.map, viewport)
        } else {
            1.0
        };
        self.remainder = Offset::default();
        self.recenter(geometry, viewport);
    }

    /// Re-derive the fit zoom after the viewport or map changed size.
    pub fn refit(&mut self, geometry: &MapGeometry, viewport: Size) {
        if self.zoomed_out {
            self.zoom = fit_zoom(geometry.map, viewport);
        }
        self.clamp(geometry, viewport);
    }

    fn recenter(&mut self, geometry: &MapGeometry, viewport: Size) {
        self.offset = Offset {
            x: (viewport.width - geometry.map.width * self.zoom) / 2.0,
            y: (viewport.height - geometry.map.height * self.zoom) / 2.0,
        };
        self.clamp(geometry, viewport);
    }

    pub fn set_pan_mode(&mut self, pan_mode: PanMode) {
        self.pan_mode = pan_mode;
        self.remainder = Offset::default();
    }

    pub fn select_depth(&mut self, depth: u32, geometry: &MapGeometry, viewport: Size) {
        self.selected_depth = depth;
        self.refit(geometry, viewport);
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        ((sx - self.offset.x) / zoom, (sy - self.offset.y) / zoom)
    }

    /// Tile under a point in container coordinates.
    pub fn tile_at(&self, grid: &Grid, metrics: &TileMetrics, sx: f64, sy: f64) -> Option<TileIndex> {
        let (wx, wy) = self.screen_to_world(sx, sy);
        let (row, column) = metrics.hex_at(wx, wy)?;
        grid.tile_at(row, column)
    }
}
