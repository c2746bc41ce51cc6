use std::fmt::Debug;
use std::ops::Index;

use tracing::trace;
use tracing::warn;

use crate::Coord;
use crate::quadtree::area::Area;
use crate::quadtree::area::Quadrant;
use crate::quadtree::error::QuadTreeError;
use crate::quadtree::error::QuadTreeResult;

/// Index of a [`Node`] in its [`NodeArena`].
pub type NodeId = usize;

/// One area of responsibility in the tree.
///
/// Whether a node is a leaf is decided by its shape alone: a `1x1` node is a leaf and is the only
/// kind that ever holds data. Larger nodes only route towards their (at most four) children.
pub struct Node<T> {
    area: Area,

    /// Non-owning link back up. `None` for a root.
    parent: Option<NodeId>,

    /// Indexed by [`Quadrant::index`]
    children: [Option<NodeId>; 4],

    data: Option<T>,
}

impl<T> Node<T> {
    fn new(area: Area, parent: Option<NodeId>) -> Self {
        Node {
            area,
            parent,
            children: [None; 4],
            data: None,
        }
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn child(&self, q: Quadrant) -> Option<NodeId> {
        self.children[q.index()]
    }

    /// The child whose quadrant holds `(x, y)`. Points outside this node have no child.
    pub fn child_for(&self, x: Coord, y: Coord) -> Option<NodeId> {
        self.area.quadrant(x, y).and_then(|q| self.child(q))
    }

    /// Children in [`Quadrant::ALL`] order.
    pub fn children(&self) -> impl Iterator<Item = (Quadrant, NodeId)> + '_ {
        Quadrant::ALL
            .into_iter()
            .filter_map(|q| self.child(q).map(|id| (q, id)))
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> Option<&mut T> {
        self.data.as_mut()
    }

    pub fn is_leaf(&self) -> bool {
        self.area.is_unit()
    }
}

impl<T: Debug> Debug for Node<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let g = |q: Quadrant| -> isize { self.child(q).map_or(-1, |i| i as isize) };

        write!(
            f,
            "{} [nw: {}, sw: {}, ne: {}, se: {}]",
            self.area,
            g(Quadrant::NW),
            g(Quadrant::SW),
            g(Quadrant::NE),
            g(Quadrant::SE)
        )?;

        if let Some(data) = &self.data {
            write!(f, " = {:?}", data)?;
        }

        Ok(())
    }
}

/// Owner of every [`Node`] of a tree.
///
/// Nodes are never removed, so a [`NodeId`] handed out by an arena stays valid for as long as the
/// arena lives. Parent links are plain indices and own nothing.
#[derive(Debug)]
pub struct NodeArena<T> {
    nodes: Vec<Node<T>>,

    /// Number of leaves holding data
    stored: usize,
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        NodeArena {
            nodes: vec![],
            stored: 0,
        }
    }

    /// Allocate a node with no parent covering `area`.
    ///
    /// `area` must be subdividable down to unit cells, see [`Area::is_subdividable`].
    pub fn alloc_root(&mut self, area: Area) -> QuadTreeResult<NodeId> {
        if !area.is_subdividable() {
            warn!(%area, "refusing to allocate root");
            return Err(QuadTreeError::InvalidArea(area));
        }

        Ok(self.push(Node::new(area, None)))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.nodes.get_mut(id)
    }

    /// Number of nodes, internal ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of coordinates holding data.
    pub fn stored(&self) -> usize {
        self.stored
    }

    /// Store `value` at `(x, y)` below node `id`, replacing any previous value there. Returns the
    /// leaf holding the value.
    ///
    /// # Errors
    /// [`QuadTreeError::OutsideArea`] if `(x, y)` is not inside the area of `id`.
    ///
    /// # Panics
    /// If `id` is not a node of this arena.
    pub fn insert(&mut self, id: NodeId, x: Coord, y: Coord, value: T) -> QuadTreeResult<NodeId> {
        let leaf = self.descend(id, x, y)?;

        if self.nodes[leaf].data.replace(value).is_none() {
            self.stored += 1;
        }

        Ok(leaf)
    }

    /// Find the leaf holding data for `(x, y)` below node `id`.
    ///
    /// Stops at the first missing node on the way down. Only a leaf that holds data is a match.
    pub fn search(&self, id: NodeId, x: Coord, y: Coord) -> Option<NodeId> {
        let mut current = id;

        loop {
            let node = self.nodes.get(current)?;

            if node.area.is_unit_at(x, y) {
                return node.data.is_some().then_some(current);
            }

            current = node.child_for(x, y)?;
        }
    }

    /// Find the leaf holding data for `(x, y)` below node `id`, or create it with
    /// `generator(x, y)`.
    ///
    /// Every missing node on the way down is materialized, so a single call always ends at a
    /// leaf holding data. `generator` runs only if there was no data at `(x, y)`.
    ///
    /// # Errors
    /// [`QuadTreeError::OutsideArea`] if `(x, y)` is not inside the area of `id`.
    ///
    /// # Panics
    /// If `id` is not a node of this arena.
    pub fn cache_search<F>(
        &mut self,
        id: NodeId,
        x: Coord,
        y: Coord,
        generator: F,
    ) -> QuadTreeResult<NodeId>
    where
        F: FnOnce(Coord, Coord) -> T,
    {
        let (leaf, _) = self.fill(id, x, y, generator)?;

        Ok(leaf)
    }

    /// Walk down to the leaf at `(x, y)` below `id` and hand out its data, storing
    /// `generator(x, y)` there first if it was empty.
    pub(crate) fn fill<F>(
        &mut self,
        id: NodeId,
        x: Coord,
        y: Coord,
        generator: F,
    ) -> QuadTreeResult<(NodeId, &mut T)>
    where
        F: FnOnce(Coord, Coord) -> T,
    {
        let leaf = self.descend(id, x, y)?;
        let node = &mut self.nodes[leaf];

        if node.data.is_none() {
            trace!(x, y, "cache miss");
            self.stored += 1;
        }

        let data = node.data.get_or_insert_with(|| generator(x, y));

        Ok((leaf, data))
    }

    /// Nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Allocate a parentless node covering `area` which adopts `old` in quadrant `q`.
    pub(crate) fn adopt(&mut self, area: Area, q: Quadrant, old: NodeId) -> NodeId {
        let mut node = Node::new(area, None);
        node.children[q.index()] = Some(old);

        let id = self.push(node);
        self.nodes[old].parent = Some(id);

        id
    }

    /// Walk from `id` down to the unit cell at `(x, y)`, materializing any node missing on the
    /// way.
    fn descend(&mut self, id: NodeId, x: Coord, y: Coord) -> QuadTreeResult<NodeId> {
        let area = self.nodes[id].area;
        if !area.contains(x, y) {
            warn!(x, y, %area, "point outside search area");
            return Err(QuadTreeError::OutsideArea { x, y, area });
        }

        let mut current = id;

        loop {
            let area = self.nodes[current].area;

            if area.is_unit_at(x, y) {
                return Ok(current);
            }

            // Only reachable below an area which does not halve cleanly
            let Some(q) = area.quadrant(x, y) else {
                warn!(x, y, %area, "no quadrant for point");
                return Err(QuadTreeError::NoQuadrant { x, y, area });
            };

            current = match self.nodes[current].child(q) {
                Some(child) => child,
                None => self.alloc_child(current, q),
            };
        }
    }

    fn alloc_child(&mut self, parent: NodeId, q: Quadrant) -> NodeId {
        let area = self.nodes[parent].area.quadrant_area(q);
        let child = self.push(Node::new(area, Some(parent)));
        self.nodes[parent].children[q.index()] = Some(child);

        trace!(parent, quadrant = %q, %area, "materialized node");

        child
    }

    fn push(&mut self, node: Node<T>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);

        id
    }
}

impl<T> Index<NodeId> for NodeArena<T> {
    type Output = Node<T>;

    fn index(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id]
    }
}
