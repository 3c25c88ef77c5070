use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::coords::{Bounds, Coordinate};

/// Pixel size of a single hex tile, shared by every layer of a world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderingSpec {
    #[serde(default)]
    pub tile_width: f64,
    #[serde(default)]
    pub tile_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Walking,
    Swimming,
    Flying,
    Portaling,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Terrain {
    #[serde(default)]
    pub name: String,
    /// Extra movement cost in percent.
    #[serde(default)]
    pub movement_penalty: i32,
    #[serde(default)]
    pub can_pass_with: Vec<MovementType>,
    #[serde(default)]
    pub can_stop_with: Vec<MovementType>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Spell {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Creature {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    Ne,
    E,
    Se,
    Sw,
    W,
    Nw,
}

/// Border between a tile and a neighbour with a different terrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileEdge {
    pub direction: EdgeDirection,
    pub neighbour_terrain_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TileRenderingSpec {
    /// Terrain borders, carried for the renderer; the map view does not draw them yet.
    #[serde(default)]
    pub edges: Vec<TileEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tile {
    #[serde(default)]
    pub key: String,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub terrain_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering_spec: Option<TileRenderingSpec>,
}

impl Tile {
    /// Server-assigned key, or the coordinate when the server sent none.
    pub fn display_key(&self) -> String {
        if self.key.is_empty() {
            self.coordinate.to_string()
        } else {
            self.key.clone()
        }
    }
}

/// Pre-rendered background for a whole segment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentRenderingSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_lightweight: Option<String>,
    #[serde(default, with = "base64_bytes")]
    pub webp: Vec<u8>,
    #[serde(default, with = "base64_bytes")]
    pub webp_lightweight: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub bounds: Bounds,
    #[serde(default)]
    pub tiles: Vec<Tile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering_spec: Option<SegmentRenderingSpec>,
}

impl Segment {
    pub fn key(&self) -> String {
        self.bounds.key()
    }

    /// Index of the tile at `(row, column)`. Tiles are normally stored
    /// row-major and dense, so the direct slot is tried before a scan.
    pub fn tile_position(&self, row: u32, column: u32) -> Option<usize> {
        if !self.bounds.contains(row, column) {
            return None;
        }
        let direct = (row - self.bounds.min_row) as usize * self.bounds.columns() as usize
            + (column - self.bounds.min_column) as usize;
        let matches = |tile: &Tile| tile.coordinate.row == row && tile.coordinate.column == column;
        if self.tiles.get(direct).is_some_and(matches) {
            return Some(direct);
        }
        self.tiles.iter().position(matches)
    }
}

/// Column-ascending segments sharing one row band.
///
/// The band is cached so visibility checks never have to walk the segments
/// to learn which rows the whole row covers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Segment>", into = "Vec<Segment>")]
pub struct SegmentRow {
    segments: Vec<Segment>,
    min_row: u32,
    max_row: u32,
}

impl SegmentRow {
    pub fn new(segments: Vec<Segment>) -> Self {
        let mut row = Self::default();
        row.extend(segments);
        row
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Half-open row band covered by this row's segments.
    pub fn row_span(&self) -> (u32, u32) {
        (self.min_row, self.max_row)
    }

    pub fn push(&mut self, segment: Segment) {
        if self.segments.is_empty() {
            self.min_row = segment.bounds.min_row;
            self.max_row = segment.bounds.max_row;
        } else {
            self.min_row = self.min_row.min(segment.bounds.min_row);
            self.max_row = self.max_row.max(segment.bounds.max_row);
        }
        self.segments.push(segment);
    }

    pub fn extend(&mut self, segments: impl IntoIterator<Item = Segment>) {
        for segment in segments {
            self.push(segment);
        }
    }

    /// Whether `next` continues this row: same band, starting at or after our last column.
    fn continues_with(&self, next: &SegmentRow) -> bool {
        let Some(last) = self.segments.last() else {
            return false;
        };
        let Some(first) = next.segments.first() else {
            return false;
        };
        self.row_span() == next.row_span() && first.bounds.min_column >= last.bounds.max_column
    }
}

impl From<Vec<Segment>> for SegmentRow {
    fn from(segments: Vec<Segment>) -> Self {
        Self::new(segments)
    }
}

impl From<SegmentRow> for Vec<Segment> {
    fn from(row: SegmentRow) -> Self {
        row.segments
    }
}

/// Stable handle to a segment inside a [`Grid`]. Rows and segments are only
/// ever appended, so a handle stays valid for the life of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentIndex {
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    pub segment: SegmentIndex,
    pub tile: usize,
}

/// One layer of the world.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Grid {
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub total_rows: u32,
    #[serde(default)]
    pub total_columns: u32,
    #[serde(default)]
    pub segment_rows: Vec<SegmentRow>,
    #[serde(skip)]
    revision: u64,
}

impl Grid {
    pub fn new(depth: u32, total_rows: u32, total_columns: u32) -> Self {
        Self {
            depth,
            total_rows,
            total_columns,
            ..Self::default()
        }
    }

    /// Bumped every time rows or segments are appended.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn segment_count(&self) -> usize {
        self.segment_rows.iter().map(SegmentRow::len).sum()
    }

    /// Append streamed rows. A row that continues the band of the current last
    /// row is merged into it; anything else becomes a new row.
    pub fn append_rows(&mut self, rows: impl IntoIterator<Item = SegmentRow>) {
        let mut changed = false;
        for row in rows {
            if row.is_empty() {
                continue;
            }
            changed = true;
            match self.segment_rows.last_mut() {
                Some(last) if last.continues_with(&row) => last.extend(row.segments),
                _ => self.segment_rows.push(row),
            }
        }
        if changed {
            self.revision = self.revision.wrapping_add(1);
        }
    }

    /// Totals only ever grow while the stream is running.
    pub fn grow_totals(&mut self, total_rows: u32, total_columns: u32) {
        let rows = self.total_rows.max(total_rows);
        let columns = self.total_columns.max(total_columns);
        if (rows, columns) != (self.total_rows, self.total_columns) {
            self.total_rows = rows;
            self.total_columns = columns;
            self.revision = self.revision.wrapping_add(1);
        }
    }

    pub fn segment(&self, index: SegmentIndex) -> Option<&Segment> {
        self.segment_rows
            .get(index.row)
            .and_then(|row| row.segments.get(index.column))
    }

    pub fn tile(&self, index: TileIndex) -> Option<&Tile> {
        self.segment(index.segment)
            .and_then(|segment| segment.tiles.get(index.tile))
    }

    /// Every segment in row-major order.
    pub fn segments(&self) -> impl Iterator<Item = (SegmentIndex, &Segment)> {
        self.segment_rows.iter().enumerate().flat_map(|(r, row)| {
            row.segments
                .iter()
                .enumerate()
                .map(move |(c, segment)| (SegmentIndex { row: r, column: c }, segment))
        })
    }

    /// Locate the tile at `(row, column)` without scanning the grid.
    pub fn tile_at(&self, row: u32, column: u32) -> Option<TileIndex> {
        let r = self
            .segment_rows
            .partition_point(|segment_row| segment_row.max_row <= row);
        let segment_row = self.segment_rows.get(r)?;
        if segment_row.min_row > row {
            return None;
        }
        let c = segment_row
            .segments
            .partition_point(|segment| segment.bounds.max_column <= column);
        let segment = segment_row.segments.get(c)?;
        let tile = segment.tile_position(row, column)?;
        Some(TileIndex {
            segment: SegmentIndex { row: r, column: c },
            tile,
        })
    }
}

/// Everything fetched for one viewing session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct World {
    pub layers: BTreeMap<u32, Grid>,
    pub rendering_spec: Option<RenderingSpec>,
    pub terrain_registry: HashMap<String, Terrain>,
    pub spell_registry: HashMap<String, Spell>,
    pub creature_registry: HashMap<String, Creature>,
    revision: u64,
}

/// Partial world carried by one streamed chunk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering_spec: Option<RenderingSpec>,
    #[serde(default)]
    pub terrain_registry: HashMap<String, Terrain>,
    #[serde(default)]
    pub spell_registry: HashMap<String, Spell>,
    #[serde(default)]
    pub creature_registry: HashMap<String, Creature>,
    #[serde(default)]
    pub layers: Vec<Grid>,
}

impl World {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn layer(&self, depth: u32) -> Option<&Grid> {
        self.layers.get(&depth)
    }

    pub fn depths(&self) -> impl Iterator<Item = u32> + '_ {
        self.layers.keys().copied()
    }

    /// Whether any layer has at least one segment to paint.
    pub fn has_segments(&self) -> bool {
        self.layers.values().any(|grid| !grid.segment_rows.is_empty())
    }

    pub fn terrain(&self, id: &str) -> Option<&Terrain> {
        self.terrain_registry.get(id)
    }

    /// Merge one chunk:
    /// - the rendering spec is replaced when the chunk carries one
    /// - registry entries are overwritten key by key
    /// - an unseen depth is inserted as-is, fixing its name and depth
    /// - a known depth gets its rows appended and its totals grown
    pub fn merge(&mut self, delta: WorldDelta) {
        if let Some(spec) = delta.rendering_spec {
            self.rendering_spec = Some(spec);
        }
        self.terrain_registry.extend(delta.terrain_registry);
        self.spell_registry.extend(delta.spell_registry);
        self.creature_registry.extend(delta.creature_registry);

        for mut chunk in delta.layers {
            match self.layers.get_mut(&chunk.depth) {
                Some(layer) => {
                    if layer.name.is_empty() && !chunk.name.is_empty() {
                        layer.name = std::mem::take(&mut chunk.name);
                    }
                    layer.grow_totals(chunk.total_rows, chunk.total_columns);
                    layer.append_rows(std::mem::take(&mut chunk.segment_rows));
                }
                None => {
                    let rows = std::mem::take(&mut chunk.segment_rows);
                    let mut layer = chunk;
                    layer.revision = 0;
                    layer.append_rows(rows);
                    self.layers.insert(layer.depth, layer);
                }
            }
        }
        self.revision = self.revision.wrapping_add(1);
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn segment(min_row: u32, max_row: u32, min_column: u32, max_column: u32, depth: u32) -> Segment {
        let bounds = Bounds::new(min_row, max_row, min_column, max_column);
        let mut tiles = Vec::new();
        for row in min_row..max_row {
            for column in min_column..max_column {
                tiles.push(Tile {
                    key: format!("{depth:03}.{row:03}.{column:03}"),
                    coordinate: Coordinate::new(depth, row, column),
                    terrain_id: "grass".into(),
                    rendering_spec: None,
                });
            }
        }
        Segment {
            bounds,
            tiles,
            rendering_spec: None,
        }
    }

    /// Grid fully partitioned into `seg_rows` x `seg_columns` blocks.
    pub(crate) fn grid(total_rows: u32, total_columns: u32, seg_rows: u32, seg_columns: u32) -> Grid {
        let mut grid = Grid::new(0, total_rows, total_columns);
        let mut rows = Vec::new();
        let mut r = 0;
        while r < total_rows {
            let r_end = (r + seg_rows).min(total_rows);
            let mut row = SegmentRow::default();
            let mut c = 0;
            while c < total_columns {
                let c_end = (c + seg_columns).min(total_columns);
                row.push(segment(r, r_end, c, c_end, 0));
                c = c_end;
            }
            rows.push(row);
            r = r_end;
        }
        grid.append_rows(rows);
        grid
    }

    #[test]
    fn segment_row_caches_band() {
        let row = SegmentRow::new(vec![segment(15, 30, 0, 15, 0), segment(15, 30, 15, 30, 0)]);
        assert_eq!(row.row_span(), (15, 30));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn append_rows_extends_continuing_band() {
        let mut grid = Grid::new(0, 30, 30);
        grid.append_rows([SegmentRow::new(vec![segment(0, 15, 0, 15, 0)])]);
        let before = grid.revision();
        grid.append_rows([SegmentRow::new(vec![segment(0, 15, 15, 30, 0)])]);
        grid.append_rows([SegmentRow::new(vec![segment(15, 30, 0, 30, 0)])]);

        assert_eq!(grid.segment_rows.len(), 2);
        assert_eq!(grid.segment_rows[0].len(), 2);
        assert_eq!(grid.segment_count(), 3);
        assert!(grid.revision() > before);
    }

    #[test]
    fn append_empty_rows_keeps_revision() {
        let mut grid = Grid::new(0, 10, 10);
        grid.append_rows([SegmentRow::default()]);
        assert_eq!(grid.revision(), 0);
        assert!(grid.segment_rows.is_empty());
    }

    #[test]
    fn grow_totals_never_shrinks() {
        let mut grid = Grid::new(0, 20, 20);
        grid.grow_totals(10, 40);
        assert_eq!((grid.total_rows, grid.total_columns), (20, 40));
    }

    #[test]
    fn tile_at_finds_tile_through_partition() {
        let grid = grid(40, 40, 15, 15);
        let index = grid.tile_at(17, 31).expect("tile should exist");
        assert_eq!(index.segment, SegmentIndex { row: 1, column: 2 });
        let tile = grid.tile(index).expect("tile handle should resolve");
        assert_eq!(tile.coordinate, Coordinate::new(0, 17, 31));

        assert!(grid.tile_at(40, 0).is_none());
        assert!(grid.tile_at(0, 40).is_none());
    }

    #[test]
    fn tile_position_falls_back_to_scan_for_sparse_segments() {
        let mut sparse = segment(0, 3, 0, 3, 0);
        sparse.tiles.remove(0);
        assert_eq!(sparse.tile_position(2, 2), Some(7));
        assert_eq!(sparse.tile_position(0, 0), None);
    }

    #[test]
    fn merge_overwrites_registries_and_appends_rows() {
        let mut world = World::default();
        let mut first = WorldDelta {
            rendering_spec: Some(RenderingSpec {
                tile_width: 52.0,
                tile_height: 60.0,
            }),
            ..WorldDelta::default()
        };
        first.terrain_registry.insert(
            "water".into(),
            Terrain {
                name: "Water".into(),
                ..Terrain::default()
            },
        );
        let mut layer = Grid::new(0, 30, 15);
        layer.name = "Surface".into();
        layer.segment_rows.push(SegmentRow::new(vec![segment(0, 15, 0, 15, 0)]));
        first.layers.push(layer);
        world.merge(first);

        let mut second = WorldDelta::default();
        second.terrain_registry.insert(
            "water".into(),
            Terrain {
                name: "Deep water".into(),
                movement_penalty: 50,
                ..Terrain::default()
            },
        );
        let mut more = Grid::new(0, 30, 15);
        more.name = "Renamed".into();
        more.segment_rows.push(SegmentRow::new(vec![segment(15, 30, 0, 15, 0)]));
        second.layers.push(more);
        second.layers.push(Grid::new(1, 30, 15));
        world.merge(second);

        assert_eq!(world.rendering_spec.map(|s| s.tile_width), Some(52.0));
        assert_eq!(world.terrain("water").map(|t| t.movement_penalty), Some(50));
        let surface = world.layer(0).expect("layer 0");
        assert_eq!(surface.name, "Surface");
        assert_eq!(surface.segment_rows.len(), 2);
        assert_eq!(world.depths().collect::<Vec<_>>(), vec![0, 1]);
        assert!(world.has_segments());
        assert_eq!(world.revision(), 2);
    }

    #[test]
    fn segment_rendering_spec_webp_travels_as_base64() {
        let spec = SegmentRenderingSpec {
            webp: vec![0x52, 0x49, 0x46, 0x46],
            ..SegmentRenderingSpec::default()
        };
        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["webp"], "UklGRg==");
        let back: SegmentRenderingSpec = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.webp, spec.webp);
        assert!(back.webp_lightweight.is_empty());
    }

    #[test]
    fn segment_row_deserializes_from_plain_array() {
        let json = r#"[{"bounds":{"min_row":0,"max_row":2,"min_column":4,"max_column":8}}]"#;
        let row: SegmentRow = serde_json::from_str(json).expect("row");
        assert_eq!(row.row_span(), (0, 2));
        assert_eq!(row.segments()[0].key(), "[0,2),[4,8)");
    }

    #[test]
    fn tile_keeps_edge_list_for_renderer() {
        let json = r#"{
            "coordinate": {"depth": 0, "row": 3, "column": 1},
            "terrain_id": "grass",
            "rendering_spec": {
                "edges": [{"direction": "nw", "neighbour_terrain_id": "water"}],
                "css_class": "shore"
            }
        }"#;
        let tile: Tile = serde_json::from_str(json).expect("tile");
        let spec = tile.rendering_spec.expect("rendering spec");
        assert_eq!(
            spec.edges,
            vec![TileEdge {
                direction: EdgeDirection::Nw,
                neighbour_terrain_id: "water".into(),
            }]
        );
        assert_eq!(spec.css_class.as_deref(), Some("shore"));
    }
}
