//! What the map view puts on screen for a segment or tile, derived from the
//! shared layout so backgrounds, tiles and the selection overlay line up.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hexworld_shared::{Segment, SegmentRenderingSpec, Tile, TileMetrics};

#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Svg(String),
    /// `data:` URL of a WebP image.
    Image(String),
    None,
}

/// Pick the segment background for the current zoom and detail setting.
pub fn segment_background(spec: &SegmentRenderingSpec, zoomed_out: bool, detailed_svg: bool) -> Background {
    if detailed_svg {
        let svg = if zoomed_out {
            spec.svg_lightweight.as_ref().or(spec.svg.as_ref())
        } else {
            spec.svg.as_ref()
        };
        if let Some(svg) = svg.filter(|svg| !svg.is_empty()) {
            return Background::Svg(svg.clone());
        }
    }
    let webp = if zoomed_out && !spec.webp_lightweight.is_empty() {
        &spec.webp_lightweight
    } else {
        &spec.webp
    };
    if webp.is_empty() {
        return Background::None;
    }
    Background::Image(format!("data:image/webp;base64,{}", STANDARD.encode(webp)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPaint {
    pub key: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub background: Background,
}

pub fn segment_paint(metrics: &TileMetrics, segment: &Segment, zoomed_out: bool, detailed_svg: bool) -> SegmentPaint {
    let (left, top) = metrics.segment_origin(&segment.bounds);
    let (width, height) = metrics.segment_size(&segment.bounds);
    let background = segment
        .rendering_spec
        .as_ref()
        .map(|spec| segment_background(spec, zoomed_out, detailed_svg))
        .unwrap_or(Background::None);
    SegmentPaint {
        key: segment.key(),
        left,
        top,
        width,
        height,
        background,
    }
}

/// SVG `points` attribute for the hex at `(row, column)` in world pixels.
pub fn hex_points(metrics: &TileMetrics, row: u32, column: u32) -> String {
    let (x, y) = metrics.world_pixel_origin(row, column);
    metrics
        .hex_vertices()
        .iter()
        .map(|(vx, vy)| format!("{},{}", x + vx, y + vy))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq)]
pub struct TilePaint {
    pub key: String,
    pub points: String,
    pub class: String,
}

pub fn tile_paint(metrics: &TileMetrics, tile: &Tile) -> TilePaint {
    let css_class = tile
        .rendering_spec
        .as_ref()
        .and_then(|spec| spec.css_class.as_deref())
        .unwrap_or_default();
    let class = if css_class.is_empty() {
        format!("tile terrain-{}", tile.terrain_id)
    } else {
        format!("tile terrain-{} {css_class}", tile.terrain_id)
    };
    TilePaint {
        key: tile.display_key(),
        points: hex_points(metrics, tile.coordinate.row, tile.coordinate.column),
        class,
    }
}
