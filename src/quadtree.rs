use std::ptr;

use serde::Serialize;
use tracing::{debug, trace};

use crate::attribute::AttrValue;
use crate::config::{QuadtreeConfig, DEFAULT_MAX_DEPTH};
use crate::error::{QuadtreeError, QuadtreeResult};
use crate::geometry::{Point, Quadrant, Rectangle};
use crate::list::List;
use crate::QuadtreeVisitor;

/// Stable handle to a point stored in a [`Quadtree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(usize);

impl PointId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
struct Node {
    boundary: Rectangle,
    depth: u8,
    // Children are allocated together; child `q` lives at `first_child + q`.
    first_child: Option<usize>,
    points: Vec<PointId>,
}

impl Node {
    fn leaf(boundary: Rectangle, depth: u8) -> Self {
        Self {
            boundary,
            depth,
            first_child: None,
            points: Vec::new(),
        }
    }
}

/// Shape summary of a tree, gathered by a full traversal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub points: usize,
    pub nodes: usize,
    pub leaves: usize,
    pub depth: u8,
    /// Leaves at the depth limit holding more points than the capacity.
    pub overflowing_leaves: usize,
}

/// Point quadtree over a fixed rectangular boundary.
///
/// Leaves hold up to `capacity` points. The first insert that would exceed the
/// capacity splits the leaf into four quadrants and pushes its points down.
/// Leaves at `max_depth` never split; they keep accepting points past the
/// capacity, which bounds the depth for coincident or tightly clustered input.
///
/// The tree never removes points. It performs no locking, so concurrent
/// mutation needs external synchronization.
#[derive(Clone, Debug)]
pub struct Quadtree {
    boundary: Rectangle,
    capacity: usize,
    max_depth: u8,
    nodes: List<Node>,
    points: List<Point>,
}

impl Quadtree {
    const ROOT: usize = 0;

    /// Creates an empty tree. A zero `capacity` is clamped to one in every
    /// build profile. Use [`Quadtree::from_config`] to reject it instead.
    pub fn new(boundary: Rectangle, capacity: usize) -> Self {
        Self::build(boundary, capacity.max(1), DEFAULT_MAX_DEPTH)
    }

    pub fn from_config(config: &QuadtreeConfig) -> QuadtreeResult<Self> {
        config.validate()?;
        Ok(Self::build(config.boundary, config.capacity, config.max_depth))
    }

    fn build(boundary: Rectangle, capacity: usize, max_depth: u8) -> Self {
        let mut nodes = List::new();
        nodes.push(Node::leaf(boundary, 0));
        Self {
            boundary,
            capacity,
            max_depth,
            nodes,
            points: List::new(),
        }
    }

    pub fn boundary(&self) -> &Rectangle {
        &self.boundary
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.points.size()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the root has been split.
    pub fn is_subdivided(&self) -> bool {
        self.nodes.get(Self::ROOT).first_child.is_some()
    }

    pub fn get(&self, id: PointId) -> Option<&Point> {
        self.points.try_get(id.0)
    }

    /// Inserts `point`, returning `false` if it lies outside the boundary.
    pub fn insert(&mut self, point: Point) -> bool {
        self.try_insert(point).is_ok()
    }

    /// Inserts `point` and returns its handle.
    pub fn try_insert(&mut self, point: Point) -> QuadtreeResult<PointId> {
        if !self.boundary.contains(&point) {
            debug!(x = point.x, y = point.y, "rejected point outside boundary");
            return Err(QuadtreeError::OutOfBounds {
                x: point.x,
                y: point.y,
            });
        }
        let id = PointId(self.points.push(point));
        self.node_insert(Self::ROOT, id);
        Ok(id)
    }

    fn node_insert(&mut self, start_node: usize, point_id: PointId) {
        let mut idx = start_node;
        loop {
            let node = self.nodes.get(idx);
            if let Some(first_child) = node.first_child {
                let quadrant = node.boundary.quadrant_of(self.points.get(point_id.0));
                idx = first_child + quadrant.index();
                continue;
            }

            let full = node.points.len() >= self.capacity;
            if full && node.depth < self.max_depth {
                self.subdivide(idx);
                continue;
            }
            if full {
                trace!(
                    depth = node.depth,
                    residents = node.points.len() + 1,
                    "leaf at max depth exceeds capacity"
                );
            }
            self.nodes.get_mut(idx).points.push(point_id);
            return;
        }
    }

    fn subdivide(&mut self, idx: usize) {
        let node = self.nodes.get_mut(idx);
        debug_assert!(node.first_child.is_none(), "node subdivided twice");
        let residents = std::mem::take(&mut node.points);
        let boundary = node.boundary;
        let depth = node.depth + 1;

        let first_child = self.nodes.size();
        for quadrant in boundary.quadrants() {
            self.nodes.push(Node::leaf(quadrant, depth));
        }
        self.nodes.get_mut(idx).first_child = Some(first_child);
        trace!(depth, residents = residents.len(), "subdivided node");

        for point_id in residents {
            self.node_insert(idx, point_id);
        }
    }

    /// Points inside `rect`, in pre-order NW, NE, SW, SE traversal order.
    pub fn query_range(&self, rect: &Rectangle) -> Vec<&Point> {
        let mut found = Vec::new();
        self.query_range_in(Self::ROOT, rect, &mut found);
        found
    }

    fn query_range_in<'a>(&'a self, idx: usize, rect: &Rectangle, found: &mut Vec<&'a Point>) {
        let node = self.nodes.get(idx);
        if !node.boundary.intersects(rect) {
            return;
        }
        found.extend(
            node.points
                .iter()
                .map(|id| self.points.get(id.0))
                .filter(|p| rect.contains(p)),
        );
        if let Some(first_child) = node.first_child {
            for quadrant in Quadrant::ALL {
                self.query_range_in(first_child + quadrant.index(), rect, found);
            }
        }
    }

    /// Closest stored point to `query`.
    ///
    /// A `query` borrowed from this tree is skipped by identity, so asking for
    /// the neighbour of a stored point never returns the point itself. Points
    /// that merely share its coordinates are still candidates. Among exact
    /// ties any one of the equidistant points may be returned.
    pub fn nearest_neighbor(&self, query: &Point) -> Option<&Point> {
        self.nearest_neighbor_with_distance(query)
            .map(|(point, _)| point)
    }

    pub fn nearest_neighbor_with_distance(&self, query: &Point) -> Option<(&Point, f64)> {
        let mut best = None;
        self.nearest_in(Self::ROOT, query, &mut best);
        best
    }

    /// Nearest stored point other than the one behind `id`.
    pub fn nearest_to(&self, id: PointId) -> Option<(&Point, f64)> {
        let query = self.get(id)?;
        self.nearest_neighbor_with_distance(query)
    }

    fn nearest_in<'a>(&'a self, idx: usize, query: &Point, best: &mut Option<(&'a Point, f64)>) {
        let node = self.nodes.get(idx);
        if let Some((_, best_distance)) = *best {
            if node.boundary.distance_to_point(query) > best_distance {
                return;
            }
        }

        for id in &node.points {
            let candidate = self.points.get(id.0);
            if ptr::eq(candidate, query) {
                continue;
            }
            let distance = query.distance_to(candidate);
            if best.map_or(true, |(_, b)| distance < b) {
                *best = Some((candidate, distance));
            }
        }

        if let Some(first_child) = node.first_child {
            // Closest quadrant first; tightens the bound sooner.
            let mut children: [(usize, f64); 4] = std::array::from_fn(|i| {
                let child = first_child + i;
                (child, self.nodes.get(child).boundary.distance_to_point(query))
            });
            children.sort_by(|a, b| a.1.total_cmp(&b.1));
            for (child, _) in children {
                self.nearest_in(child, query, best);
            }
        }
    }

    /// Every stored point, in pre-order NW, NE, SW, SE traversal order.
    pub fn get_all_points(&self) -> Vec<&Point> {
        let mut out = Vec::with_capacity(self.len());
        self.collect_points(Self::ROOT, &mut out);
        out
    }

    fn collect_points<'a>(&'a self, idx: usize, out: &mut Vec<&'a Point>) {
        let node = self.nodes.get(idx);
        out.extend(node.points.iter().map(|id| self.points.get(id.0)));
        if let Some(first_child) = node.first_child {
            for quadrant in Quadrant::ALL {
                self.collect_points(first_child + quadrant.index(), out);
            }
        }
    }

    /// Points whose attribute `name` equals `value` (same variant and payload).
    pub fn filter_by_attribute(&self, name: &str, value: impl Into<AttrValue>) -> Vec<&Point> {
        let value = value.into();
        self.get_all_points()
            .into_iter()
            .filter(|p| p.has_attribute(name, &value))
            .collect()
    }

    pub fn count_by_attribute(&self, name: &str, value: impl Into<AttrValue>) -> usize {
        self.filter_by_attribute(name, value).len()
    }

    /// Sum of resident points over all nodes.
    pub fn count_points(&self) -> usize {
        self.nodes.iter().map(|node| node.points.len()).sum()
    }

    /// Walks the tree in pre-order, children in NW, NE, SW, SE order.
    pub fn traverse<V>(&self, visitor: &mut V)
    where
        V: QuadtreeVisitor,
    {
        let mut to_process = List::<usize>::with_capacity(4 * usize::from(self.max_depth) + 1);
        to_process.push(Self::ROOT);

        while let Some(idx) = to_process.pop() {
            let node = self.nodes.get(idx);
            match node.first_child {
                Some(first_child) => {
                    visitor.branch(node.depth, &node.boundary);
                    // Reversed so NW is popped first.
                    for quadrant in Quadrant::ALL.iter().rev() {
                        to_process.push(first_child + quadrant.index());
                    }
                }
                None => {
                    visitor.leaf(node.depth, &node.boundary, node.points.len());
                    for &id in &node.points {
                        visitor.point(id, self.points.get(id.0));
                    }
                }
            }
        }
    }

    pub fn stats(&self) -> TreeStats {
        let mut collector = StatsCollector {
            capacity: self.capacity,
            stats: TreeStats::default(),
        };
        self.traverse(&mut collector);
        collector.stats
    }

    /// Drops every point and node, keeping boundary and limits.
    pub fn clear(&mut self) {
        self.points.clear();
        self.nodes.clear();
        self.nodes.push(Node::leaf(self.boundary, 0));
    }
}

struct StatsCollector {
    capacity: usize,
    stats: TreeStats,
}

impl QuadtreeVisitor for StatsCollector {
    fn leaf(&mut self, depth: u8, _boundary: &Rectangle, len: usize) {
        self.stats.nodes += 1;
        self.stats.leaves += 1;
        self.stats.points += len;
        self.stats.depth = self.stats.depth.max(depth);
        if len > self.capacity {
            self.stats.overflowing_leaves += 1;
        }
    }

    fn branch(&mut self, depth: u8, _boundary: &Rectangle) {
        self.stats.nodes += 1;
        self.stats.depth = self.stats.depth.max(depth);
    }
}
