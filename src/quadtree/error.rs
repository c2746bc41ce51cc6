use thiserror::Error;

use crate::Coord;
use crate::quadtree::area::Area;
use crate::quadtree::node::NodeId;

pub type QuadTreeResult<T> = Result<T, QuadTreeError>;

/// Broken contracts of the tree. None of these are expected in correct use, and none are worth
/// retrying: they mean a point was routed to a node that cannot hold it, or the tree was seeded
/// with something it cannot subdivide.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuadTreeError {
    #[error("Point ({x}, {y}) outside search area {area}")]
    OutsideArea { x: Coord, y: Coord, area: Area },

    #[error("Could not find the quadrant of ({x}, {y}) in {area}")]
    NoQuadrant { x: Coord, y: Coord, area: Area },

    #[error("Area {0} is not a power of two square")]
    InvalidArea(Area),

    #[error("Growing the tree towards ({x}, {y}) overflows the coordinate space")]
    Overflow { x: Coord, y: Coord },

    #[error("Node {0} is not a root")]
    NotARoot(NodeId),

    #[error("Arena holds {roots} roots, a tree needs it to hold exactly one")]
    SharedArena { roots: usize },
}
