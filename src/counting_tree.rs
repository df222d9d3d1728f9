//! The 2^K-fanout counting tree.
//!
//! Supports weighted range counting over a fixed point set with leaf
//! activation and deactivation. Built once from a template array; afterwards
//! the only mutation is `weighted_count` bookkeeping along root-to-leaf paths.
//! Nodes live in an arena and refer to each other by index; the parent link is
//! a back-index used for upward propagation only.
//!
//! Splitting cuts every dimension once per level, so an internal node has up
//! to `2^K` children with exact bounding boxes. For the small `K` this engine
//! works with, that keeps boxes much tighter per unit depth than a binary
//! dimension-cycling tree, which shrinks the number of partially-intersecting
//! nodes a range query has to descend into.

use az::Az;

use crate::point::KdPoint;
use crate::types::Axis;

pub(crate) const NO_PARENT: u32 = u32::MAX;

/// Outcome of classifying a node's bounding box against a query box.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoxClass {
    /// No overlap on some dimension; prune.
    Disjoint,
    /// Box fully contained in the query; take the aggregate.
    Within,
    /// Partial overlap; descend into children.
    Straddles,
}

pub(crate) fn classify_box<A: Axis, const K: usize>(
    node_lower: &[A; K],
    node_upper: &[A; K],
    query_lower: &[A; K],
    query_upper: &[A; K],
) -> BoxClass {
    let mut class = BoxClass::Within;
    for i in 0..K {
        let (a, b) = (node_lower[i], node_upper[i]);
        let (c, d) = (query_lower[i], query_upper[i]);
        if a > d || b < c {
            return BoxClass::Disjoint;
        }
        if a < c || b > d {
            class = BoxClass::Straddles;
        }
    }
    class
}

/// Computes the exact bounding box of a set of working points.
pub(crate) fn bounding_box<A: Axis, const K: usize, P>(
    items: &[P],
    coords: impl Fn(&P) -> &[A; K],
) -> ([A; K], [A; K]) {
    let mut lower = *coords(&items[0]);
    let mut upper = lower;
    for item in &items[1..] {
        let point = coords(item);
        for i in 0..K {
            if point[i] < lower[i] {
                lower[i] = point[i];
            }
            if point[i] > upper[i] {
                upper[i] = point[i];
            }
        }
    }
    (lower, upper)
}

/// Partitions `work` into up to `2^K` chunks by cutting each dimension at its
/// median in turn, recording the resulting non-empty ranges.
///
/// Equivalent to the repeated `nth_element` pass over an explicit splitter
/// table: cutting dimension `dim` splits every current chunk in half, and the
/// recursion carries the halves through the remaining dimensions.
pub(crate) fn partition_ranges<A: Axis, const K: usize, P>(
    work: &mut [P],
    base: usize,
    dim: usize,
    coords: impl Fn(&P) -> &[A; K] + Copy,
    ranges: &mut Vec<(usize, usize)>,
) {
    if work.is_empty() {
        return;
    }
    if dim == K {
        ranges.push((base, base + work.len()));
        return;
    }
    let mid = work.len() / 2;
    work.select_nth_unstable_by(mid, |p1, p2| coords(p1)[dim].cmp_axis(&coords(p2)[dim]));
    let (left, right) = work.split_at_mut(mid);
    partition_ranges(left, base, dim + 1, coords, ranges);
    partition_ranges(right, base + mid, dim + 1, coords, ranges);
}

struct WorkPoint<A, const K: usize> {
    coords: [A; K],
    id: u32,
}

struct Node<A, const K: usize> {
    lower: [A; K],
    upper: [A; K],
    count: u32,
    weighted: i64,
    parent: u32,
    children: Vec<u32>,
}

/// A 2^K-ary counting tree over a fixed set of `K`-dimensional points.
///
/// All leaves start deactivated (`weighted_count` 0); `update_count` opens or
/// adjusts one leaf by its input position and propagates the delta to every
/// ancestor, `close` retires it, and `count_range` returns the total weight of
/// active leaves inside an axis-aligned box.
pub struct KdCountingTree<A: Axis, const K: usize> {
    nodes: Vec<Node<A, K>>,
    leaves: Vec<u32>,
    index2leaf: Vec<u32>,
    q1: Vec<u32>,
    q2: Vec<u32>,
    nodes_visited: u64,
}

impl<A: Axis, const K: usize> KdCountingTree<A, K> {
    /// Builds the tree over `points`, preserving each point's input position
    /// as its handle for later `update_count`/`close` calls.
    pub fn new(points: &[KdPoint<A, K>]) -> Self {
        let n = points.len();
        let mut tree = Self {
            nodes: Vec::with_capacity(2 * n),
            leaves: Vec::with_capacity(n),
            index2leaf: vec![NO_PARENT; n],
            q1: Vec::with_capacity(n.max(1)),
            q2: Vec::with_capacity(n.max(1)),
            nodes_visited: 0,
        };
        if n == 0 {
            return tree;
        }
        let mut work: Vec<WorkPoint<A, K>> = points
            .iter()
            .enumerate()
            .map(|(id, p)| WorkPoint {
                coords: p.coords,
                id: id.az::<u32>(),
            })
            .collect();
        tree.build(&mut work, NO_PARENT);
        tree
    }

    fn build(&mut self, work: &mut [WorkPoint<A, K>], parent: u32) -> u32 {
        let id = self.nodes.len().az::<u32>();
        let (lower, upper) = bounding_box(work, |w| &w.coords);
        self.nodes.push(Node {
            lower,
            upper,
            count: work.len().az::<u32>(),
            weighted: 0,
            parent,
            children: Vec::new(),
        });

        if work.len() == 1 {
            self.index2leaf[work[0].id as usize] = self.leaves.len().az::<u32>();
            self.leaves.push(id);
            return id;
        }

        let mut ranges = Vec::new();
        if K == 0 {
            // No axis to cut on: all points coincide in rank space, so any
            // balanced split keeps propagation paths logarithmic.
            let mid = work.len() / 2;
            ranges.push((0, mid));
            ranges.push((mid, work.len()));
        } else {
            partition_ranges(work, 0, 0, |w: &WorkPoint<A, K>| &w.coords, &mut ranges);
        }

        let mut children = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            children.push(self.build(&mut work[start..end], id));
        }
        self.nodes[id as usize].children = children;
        id
    }

    fn leaf_node(&self, pos: usize) -> u32 {
        self.leaves[self.index2leaf[pos] as usize]
    }

    /// Adds `delta` to the active weight of the leaf holding input position
    /// `pos`, updating every ancestor on the way to the root.
    pub fn update_count(&mut self, pos: usize, delta: i64) {
        if delta == 0 {
            return;
        }
        let mut id = self.leaf_node(pos);
        debug_assert!(self.nodes[id as usize].weighted + delta >= 0);
        while id != NO_PARENT {
            self.nodes[id as usize].weighted += delta;
            id = self.nodes[id as usize].parent;
        }
    }

    /// Deactivates the leaf holding input position `pos`. No-op if it is
    /// already inactive; a later positive `update_count` may reopen it.
    pub fn close(&mut self, pos: usize) {
        let w = self.nodes[self.leaf_node(pos) as usize].weighted;
        if w != 0 {
            self.update_count(pos, -w);
        }
    }

    /// Total active weight inside the closed box `[lower, upper]`.
    ///
    /// Iterative breadth-first traversal over two swapped frontier queues;
    /// the queues are preallocated at construction so queries never allocate.
    pub fn count_range(&mut self, lower: &[A; K], upper: &[A; K]) -> i64 {
        if self.nodes.is_empty() || self.nodes[0].weighted == 0 {
            return 0;
        }
        let mut q1 = std::mem::take(&mut self.q1);
        let mut q2 = std::mem::take(&mut self.q2);
        q1.clear();
        q1.push(0);

        let mut result = 0i64;
        while !q1.is_empty() {
            self.nodes_visited += q1.len() as u64;
            q2.clear();
            for &id in &q1 {
                let node = &self.nodes[id as usize];
                match classify_box(&node.lower, &node.upper, lower, upper) {
                    BoxClass::Within => result += node.weighted,
                    BoxClass::Straddles => {
                        for &child in &node.children {
                            if self.nodes[child as usize].weighted != 0 {
                                q2.push(child);
                            }
                        }
                    }
                    BoxClass::Disjoint => {}
                }
            }
            std::mem::swap(&mut q1, &mut q2);
        }
        self.q1 = q1;
        self.q2 = q2;
        result
    }

    /// Active weight of the whole tree.
    pub fn weighted_count(&self) -> i64 {
        self.nodes.first().map_or(0, |root| root.weighted)
    }

    /// Number of points the tree was built over.
    pub fn size(&self) -> usize {
        self.nodes.first().map_or(0, |root| root.count as usize)
    }

    /// Number of nodes allocated by construction.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes touched by range queries so far.
    pub fn nodes_visited(&self) -> u64 {
        self.nodes_visited
    }

    #[cfg(test)]
    pub(crate) fn leaf_weighted(&self, pos: usize) -> i64 {
        self.nodes[self.leaf_node(pos) as usize].weighted
    }

    #[cfg(test)]
    pub(crate) fn sum_of_leaf_weights(&self) -> i64 {
        self.leaves
            .iter()
            .map(|&id| self.nodes[id as usize].weighted)
            .sum()
    }
}
