pub mod quadtree;

pub use crate::quadtree::Area;
pub use crate::quadtree::QuadTree;
pub use crate::quadtree::QuadTreeError;
pub use crate::quadtree::Quadrant;

/// A position or extent on either axis of the plane.
pub type Coord = i64;
