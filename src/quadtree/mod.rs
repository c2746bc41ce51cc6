use core::fmt;
use core::fmt::Debug;

use tracing::debug;
use tracing::warn;

use crate::Coord;
pub use crate::quadtree::area::Area;
pub use crate::quadtree::area::Quadrant;
pub use crate::quadtree::error::QuadTreeError;
pub use crate::quadtree::error::QuadTreeResult;
pub use crate::quadtree::node::Node;
pub use crate::quadtree::node::NodeArena;
pub use crate::quadtree::node::NodeId;

mod area;
mod error;
mod node;

/// A sparse quadtree over the whole integer plane.
///
/// The tree starts out covering some area (or nothing at all) and grows its root whenever a
/// point outside of it is written. Reads never change the covered area.
///
/// Values live in `1x1` leaves. Every lookup walks from the root towards the leaf, so the tree
/// doubles as a cache for values that are expensive to compute, see [`QuadTree::cache_search`].
#[derive(Debug)]
pub struct QuadTree<T> {
    /// The index of the root of the tree in `nodes`. `None` until something is stored.
    root: Option<NodeId>,

    nodes: NodeArena<T>,
}

impl<T> Default for QuadTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> QuadTree<T> {
    /// Create an empty tree. The first write decides where it starts.
    pub fn new() -> Self {
        QuadTree {
            root: None,
            nodes: NodeArena::new(),
        }
    }

    /// Create a tree whose root initially covers `area`.
    ///
    /// # Errors
    /// [`QuadTreeError::InvalidArea`] unless `area` is a square with a power of two side.
    pub fn with_area(area: Area) -> QuadTreeResult<Self> {
        let mut nodes = NodeArena::new();
        let root = nodes.alloc_root(area)?;

        Ok(QuadTree {
            root: Some(root),
            nodes,
        })
    }

    /// Create a tree out of an existing root node, along with everything below it.
    ///
    /// `root` must be the only root of `nodes`: the tree takes the whole arena as its own.
    ///
    /// # Errors
    /// [`QuadTreeError::NotARoot`] if `root` is not in `nodes` or has a parent.
    /// [`QuadTreeError::SharedArena`] if `nodes` holds other roots next to `root`.
    pub fn from_root(nodes: NodeArena<T>, root: NodeId) -> QuadTreeResult<Self> {
        if nodes.get(root).is_none_or(|node| node.parent().is_some()) {
            return Err(QuadTreeError::NotARoot(root));
        }

        let roots = nodes.roots().count();
        if roots > 1 {
            warn!(root, roots, "arena holds more than one tree");
            return Err(QuadTreeError::SharedArena { roots });
        }

        Ok(QuadTree {
            root: Some(root),
            nodes,
        })
    }

    /// Store `value` at `(x, y)`, growing the tree if needed. A previous value at `(x, y)` is
    /// replaced. Returns the leaf now holding `value`.
    ///
    /// # Errors
    /// Only when an invariant of the tree is broken, or when growing would leave the coordinate
    /// space. See [`QuadTreeError`].
    pub fn insert(&mut self, x: Coord, y: Coord, value: T) -> QuadTreeResult<NodeId> {
        let root = self.grow_to(x, y)?;

        self.nodes.insert(root, x, y, value)
    }

    /// Find the leaf holding the value at `(x, y)`.
    pub fn search(&self, x: Coord, y: Coord) -> Option<NodeId> {
        self.nodes.search(self.root?, x, y)
    }

    /// Find the leaf holding the value at `(x, y)`. On a miss, the value is computed with
    /// `generator(x, y)` and stored first, so `generator` runs at most once per coordinate over
    /// the life of the tree.
    ///
    /// # Errors
    /// Same as [`QuadTree::insert`].
    pub fn cache_search<F>(&mut self, x: Coord, y: Coord, generator: F) -> QuadTreeResult<NodeId>
    where
        F: FnOnce(Coord, Coord) -> T,
    {
        if self.root.is_none() {
            let root = self.grow_to(x, y)?;

            return self.nodes.insert(root, x, y, generator(x, y));
        }

        let root = self.grow_to(x, y)?;

        self.nodes.cache_search(root, x, y, generator)
    }

    pub fn get(&self, x: Coord, y: Coord) -> Option<&T> {
        let leaf = self.search(x, y)?;

        self.nodes[leaf].data()
    }

    pub fn get_mut(&mut self, x: Coord, y: Coord) -> Option<&mut T> {
        let leaf = self.search(x, y)?;

        self.nodes.get_mut(leaf)?.data_mut()
    }

    /// Like [`QuadTree::cache_search`], but hands out the value itself.
    ///
    /// # Errors
    /// Same as [`QuadTree::insert`].
    pub fn get_or_insert_with<F>(&mut self, x: Coord, y: Coord, generator: F) -> QuadTreeResult<&T>
    where
        F: FnOnce(Coord, Coord) -> T,
    {
        let root = self.grow_to(x, y)?;
        let (_, data) = self.nodes.fill(root, x, y, generator)?;

        Ok(&*data)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root_node(&self) -> Option<&Node<T>> {
        self.nodes.get(self.root?)
    }

    /// Child of the root in quadrant `q`.
    pub fn child(&self, q: Quadrant) -> Option<NodeId> {
        self.root_node()?.child(q)
    }

    /// # Panics
    /// If `id` was not handed out by this tree.
    pub fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &NodeArena<T> {
        &self.nodes
    }

    /// The area currently covered by the tree.
    pub fn bounds(&self) -> Option<Area> {
        self.root_node().map(|node| *node.area())
    }

    /// Number of coordinates holding a value.
    pub fn len(&self) -> usize {
        self.nodes.stored()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes in the tree, internal ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Grow the root until it covers `(x, y)`, creating a `1x1` root at `(x, y)` if the tree is
    /// empty. Returns the root.
    ///
    /// Each round doubles the side of the root. The new root is shifted back by one old side on
    /// both axes when the point lies before the root on either axis, otherwise it keeps the old
    /// origin. The old root then becomes the child of the new root holding its origin.
    ///
    /// All rounds are worked out before the first node is allocated, so on error the tree is left
    /// exactly as it was.
    fn grow_to(&mut self, x: Coord, y: Coord) -> QuadTreeResult<NodeId> {
        let start = match self.root {
            Some(root) => *self.nodes[root].area(),
            None => {
                let unit = Area::unit(x, y);
                if !unit.is_subdividable() {
                    warn!(x, y, "no room for a root");
                    return Err(QuadTreeError::Overflow { x, y });
                }

                unit
            }
        };

        let mut steps = vec![];
        let mut area = start;

        while !area.contains(x, y) {
            let Some(new_area) = Self::grown_area(&area, x, y) else {
                warn!(x, y, %area, "cannot grow further");
                return Err(QuadTreeError::Overflow { x, y });
            };

            let Some(q) = new_area.quadrant(area.x, area.y) else {
                warn!(x, y, %area, %new_area, "old root outside of grown area");
                return Err(QuadTreeError::NoQuadrant {
                    x: area.x,
                    y: area.y,
                    area: new_area,
                });
            };

            steps.push((new_area, q));
            area = new_area;
        }

        let mut root = match self.root {
            Some(root) => root,
            None => self.nodes.alloc_root(start)?,
        };

        for (new_area, q) in steps {
            root = self.nodes.adopt(new_area, q, root);

            debug!(%new_area, quadrant = %q, "grew root");
        }

        self.root = Some(root);

        Ok(root)
    }

    /// The area one growth step past `area` towards `(x, y)`, or `None` on overflow.
    fn grown_area(area: &Area, x: Coord, y: Coord) -> Option<Area> {
        let (mut nx, mut ny) = (area.x, area.y);
        let nw = area.w.checked_mul(2)?;
        let nh = area.h.checked_mul(2)?;

        if x < area.x || y < area.y {
            nx = nx.checked_sub(area.w)?;
            ny = ny.checked_sub(area.h)?;
        }

        let grown = Area::new(nx, ny, nw, nh);

        grown.is_subdividable().then_some(grown)
    }
}

impl<T: Debug> QuadTree<T> {
    fn fmt_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        q: Option<Quadrant>,
        depth: usize,
    ) -> fmt::Result {
        let node = &self.nodes[id];

        if depth > 0 {
            writeln!(f)?;
        }
        write!(f, "{:indent$}", "", indent = depth * 2)?;

        if let Some(q) = q {
            write!(f, "{} ", q)?;
        }
        write!(f, "{}", node.area())?;

        if let Some(data) = node.data() {
            write!(f, " = {:?}", data)?;
        }

        for (q, child) in node.children() {
            self.fmt_node(f, child, Some(q), depth + 1)?;
        }

        Ok(())
    }
}

/// Dumps the structure of the tree, one node per line, children indented below their parent.
impl<T: Debug> fmt::Display for QuadTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) => self.fmt_node(f, root, None, 0),
            None => f.write_str("<empty>"),
        }
    }
}
