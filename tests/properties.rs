use std::cell::RefCell;
use std::collections::HashMap;

use proptest::prelude::*;
use quadcache::Area;
use quadcache::Coord;
use quadcache::QuadTree;
use quadcache::quadtree::NodeId;

fn coord() -> impl Strategy<Value = Coord> {
    -1_000 as Coord..1_000
}

fn points() -> impl Strategy<Value = Vec<(Coord, Coord, u32)>> {
    prop::collection::vec((coord(), coord(), any::<u32>()), 0..64)
}

/// A power of two square somewhere near the origin
fn seed_area() -> impl Strategy<Value = Area> {
    (-50 as Coord..50, -50 as Coord..50, 0u32..6)
        .prop_map(|(x, y, k)| Area::new(x, y, 1 << k, 1 << k))
}

/// Walk the whole tree checking parent links, tiling, and that only leaves hold data. Returns the
/// number of leaves holding data.
fn check_structure<T>(tree: &QuadTree<T>) -> Result<usize, TestCaseError> {
    let Some(root) = tree.root() else {
        return Ok(0);
    };

    prop_assert_eq!(tree.node(root).parent(), None);

    let mut stored = 0;
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        let node = tree.node(id);

        if node.data().is_some() {
            prop_assert!(node.is_leaf(), "data on inner node {}", node.area());
            stored += 1;
        }

        for (q, child) in node.children() {
            let child_node = tree.node(child);

            prop_assert_eq!(child_node.parent(), Some(id));
            prop_assert_eq!(*child_node.area(), node.area().quadrant_area(q));

            stack.push(child);
        }
    }

    Ok(stored)
}

fn is_ancestor<T>(tree: &QuadTree<T>, ancestor: NodeId, mut id: NodeId) -> bool {
    loop {
        if id == ancestor {
            return true;
        }

        match tree.node(id).parent() {
            Some(parent) => id = parent,
            None => return false,
        }
    }
}

proptest! {
    #[test]
    fn inserted_values_are_found(points in points()) {
        let mut tree = QuadTree::new();
        let mut model = HashMap::new();

        for &(x, y, v) in &points {
            tree.insert(x, y, v).unwrap();
            model.insert((x, y), v);
        }

        for (&(x, y), v) in &model {
            prop_assert_eq!(tree.get(x, y), Some(v));
        }

        prop_assert_eq!(tree.len(), model.len());
    }

    #[test]
    fn absent_values_are_not_found(
        points in points(),
        queries in prop::collection::vec((coord(), coord()), 0..64),
    ) {
        let mut tree = QuadTree::new();

        for &(x, y, v) in &points {
            tree.insert(x, y, v).unwrap();
        }

        for (x, y) in queries {
            let stored = points.iter().any(|&(px, py, _)| (px, py) == (x, y));

            prop_assert_eq!(tree.search(x, y).is_some(), stored);
        }
    }

    #[test]
    fn structure_stays_consistent(area in seed_area(), points in points()) {
        let mut tree = QuadTree::with_area(area).unwrap();

        for &(x, y, v) in &points {
            tree.insert(x, y, v).unwrap();

            let stored = check_structure(&tree)?;
            prop_assert_eq!(stored, tree.len());
        }
    }

    #[test]
    fn reinsert_adds_no_nodes(points in points(), v in any::<u32>()) {
        let mut tree = QuadTree::new();

        for &(x, y, v) in &points {
            tree.insert(x, y, v).unwrap();
        }

        let (nodes, len) = (tree.node_count(), tree.len());

        for &(x, y, _) in &points {
            tree.insert(x, y, v).unwrap();
            prop_assert_eq!(tree.get(x, y), Some(&v));
        }

        prop_assert_eq!(tree.node_count(), nodes);
        prop_assert_eq!(tree.len(), len);
    }

    #[test]
    fn growth_keeps_old_root(area in seed_area(), x in coord(), y in coord()) {
        let mut tree = QuadTree::with_area(area).unwrap();
        let old = tree.root().unwrap();

        tree.insert(x, y, ()).unwrap();

        let root = tree.root().unwrap();
        let bounds = tree.bounds().unwrap();

        prop_assert!(is_ancestor(&tree, root, old));
        prop_assert!(bounds.contains(x, y));
        prop_assert!(bounds.contains(area.x, area.y));
        prop_assert!(bounds.contains(area.x + area.w - 1, area.y + area.h - 1));

        if !area.contains(x, y) {
            prop_assert_ne!(root, old);
            prop_assert!(bounds.w > area.w);
        } else {
            prop_assert_eq!(root, old);
        }

        check_structure(&tree)?;
    }

    #[test]
    fn generator_runs_once_per_coordinate(
        queries in prop::collection::vec((-20 as Coord..20, -20 as Coord..20), 0..128),
    ) {
        let mut tree = QuadTree::new();
        let calls = RefCell::new(HashMap::<(Coord, Coord), usize>::new());

        for &(x, y) in &queries {
            let leaf = tree
                .cache_search(x, y, |x, y| {
                    *calls.borrow_mut().entry((x, y)).or_default() += 1;
                    x * 1_000 + y
                })
                .unwrap();

            prop_assert_eq!(tree.node(leaf).data(), Some(&(x * 1_000 + y)));
        }

        let calls = calls.into_inner();
        prop_assert!(calls.values().all(|&n| n == 1));
        prop_assert_eq!(calls.len(), tree.len());

        check_structure(&tree)?;
    }

    #[test]
    fn searching_never_grows(area in seed_area(), x in coord(), y in coord()) {
        let tree = QuadTree::<()>::with_area(area).unwrap();

        prop_assert_eq!(tree.search(x, y), None);
        prop_assert_eq!(tree.bounds(), Some(area));
        prop_assert_eq!(tree.node_count(), 1);
    }
}
