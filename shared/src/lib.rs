pub mod coords;
pub mod events;
pub mod layout;
pub mod world;

pub use coords::{Bounds, Coordinate};
pub use events::*;
pub use layout::TileMetrics;
pub use world::*;
