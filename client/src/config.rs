pub const DEFAULT_API_ADDRESS: &str = "http://localhost:8080";
pub const DEFAULT_LOG_DIRECTIVE: &str = "info";

pub const SAMPLE_WORLD_PATH: &str = "/api/worlds/sample/stream";
pub const WORLD_LAYERS: u32 = 5;
pub const WORLD_ROWS: u32 = 256;
pub const WORLD_COLUMNS: u32 = 256;

pub const STREAM_TIMEOUT_MS: u32 = 60_000;

/// Extra grid units kept around the viewport so tiles don't pop in while panning.
pub const DEFAULT_OVERSCAN: u32 = 2;

// Segment sizing: aim for roughly a 3x3 block of segments on screen.
const APPROX_TILE_PX: f64 = 64.0;
const SEGMENT_SCREEN_DIVISOR: f64 = 2.5;
const MIN_SEGMENT_TILES: u32 = 16;
const MAX_SEGMENT_TILES: u32 = 64;
const FALLBACK_SCREEN: (f64, f64) = (1920.0, 1080.0);

pub fn api_address() -> &'static str {
    option_env!("HEXWORLD_API_ADDRESS")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_API_ADDRESS)
}

pub fn log_directive() -> &'static str {
    option_env!("HEXWORLD_LOG")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_LOG_DIRECTIVE)
}

/// Tiles per segment side for a screen of the given CSS size.
pub fn optimal_segment_tiles(width: f64, height: f64) -> u32 {
    let width = if width > 0.0 { width } else { FALLBACK_SCREEN.0 };
    let height = if height > 0.0 { height } else { FALLBACK_SCREEN.1 };
    let segment_px = width.min(height) / SEGMENT_SCREEN_DIVISOR;
    let tiles = (segment_px / APPROX_TILE_PX).floor() as u32;
    tiles.clamp(MIN_SEGMENT_TILES, MAX_SEGMENT_TILES)
}
