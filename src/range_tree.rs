//! The range tree: the counting tree's outer structure over `K` rank-space
//! dimensions, plus one extra axis tracked per node by an auxiliary ordered
//! structure. A single traversal yields both match counts of a sample entropy
//! computation over their shared box prefix: B from the `K`-dimensional
//! boxes, A from the extra axis.
//!
//! Every node owns a [`LastAxisTree`] over the last-axis values of the points
//! routed through it. Each point records, at construction time, its slot in
//! the subtree of every node on its root-to-leaf path, so opening or closing a
//! point updates all the affected subtrees in O(depth).

use az::Az;

use crate::counting_tree::{bounding_box, classify_box, partition_ranges, BoxClass, NO_PARENT};
use crate::point::KdPoint;
use crate::types::Axis;

/// Below this node size a range query scans the node's leaves directly
/// instead of querying its last-axis subtree; two binary searches are not
/// worth it for a handful of values.
const SUBTREE_SCAN_THRESHOLD: u32 = 32;

/// A fixed set of values in ascending order, with a weight per value and
/// O(log n) weighted counting over a value interval.
///
/// Weights live in an implicit segment tree over the sorted positions.
pub(crate) struct LastAxisTree<A> {
    values: Vec<A>,
    sums: Vec<i64>,
}

impl<A: Axis> LastAxisTree<A> {
    fn new(values: Vec<A>) -> Self {
        debug_assert!(values.windows(2).all(|w| w[0].cmp_axis(&w[1]) != std::cmp::Ordering::Greater));
        let n = values.len();
        Self {
            values,
            sums: vec![0; 2 * n],
        }
    }

    fn update(&mut self, slot: usize, delta: i64) {
        let mut i = slot + self.values.len();
        while i > 0 {
            self.sums[i] += delta;
            i >>= 1;
        }
    }

    /// Total weight of values in the closed interval `[lower, upper]`.
    fn count_range(&self, lower: A, upper: A) -> i64 {
        let from = self
            .values
            .partition_point(|v| v.cmp_axis(&lower) == std::cmp::Ordering::Less);
        let to = self
            .values
            .partition_point(|v| v.cmp_axis(&upper) != std::cmp::Ordering::Greater);
        self.sum(from, to)
    }

    fn sum(&self, from: usize, to: usize) -> i64 {
        let n = self.values.len();
        let (mut l, mut r) = (from + n, to + n);
        let mut total = 0;
        while l < r {
            if l & 1 == 1 {
                total += self.sums[l];
                l += 1;
            }
            if r & 1 == 1 {
                r -= 1;
                total += self.sums[r];
            }
            l >>= 1;
            r >>= 1;
        }
        total
    }
}

struct RangeWork<A, const K: usize> {
    coords: [A; K],
    last: A,
    id: u32,
    rank_last: u32,
}

struct RangeNode<A, const K: usize> {
    lower: [A; K],
    upper: [A; K],
    count: u32,
    weighted: i64,
    parent: u32,
    children: Vec<u32>,
    /// Index into `leaves` of this node's leftmost descendant leaf; the
    /// node's leaves are the contiguous run `[leaf_left, leaf_left + count)`.
    leaf_left: u32,
    /// Leaf only: the point's last-axis value, for the brute-scan path.
    last_axis: A,
    subtree: LastAxisTree<A>,
}

/// The fused (A, B) range-counting tree behind the joint estimators: a
/// 2^K-ary tree over `K`-dimensional points, each carrying one extra ordered
/// coordinate.
pub struct RangeKdTree<A: Axis, const K: usize> {
    nodes: Vec<RangeNode<A, K>>,
    leaves: Vec<u32>,
    index2leaf: Vec<u32>,
    /// Per input position: (node, subtree slot) for every node on the
    /// root-to-leaf path, root first.
    slots: Vec<Vec<(u32, u32)>>,
    q1: Vec<u32>,
    q2: Vec<u32>,
    nodes_visited: u64,
    scan_threshold: u32,
}

impl<A: Axis, const K: usize> RangeKdTree<A, K> {
    /// Builds the tree over `points`, where `last[i]` is the extra-axis value
    /// of `points[i]`.
    pub fn new(points: &[KdPoint<A, K>], last: &[A]) -> Self {
        Self::with_scan_threshold(points, last, SUBTREE_SCAN_THRESHOLD)
    }

    pub(crate) fn with_scan_threshold(
        points: &[KdPoint<A, K>],
        last: &[A],
        scan_threshold: u32,
    ) -> Self {
        assert_eq!(points.len(), last.len());
        let n = points.len();
        let mut tree = Self {
            nodes: Vec::with_capacity(2 * n),
            leaves: Vec::with_capacity(n),
            index2leaf: vec![NO_PARENT; n],
            slots: vec![Vec::new(); n],
            q1: Vec::with_capacity(n.max(1)),
            q2: Vec::with_capacity(n.max(1)),
            nodes_visited: 0,
            scan_threshold,
        };
        if n == 0 {
            return tree;
        }

        // Seed each point's rank along the last axis; construction keeps the
        // ranks consistent within every node as the point set is partitioned.
        let mut by_last: Vec<u32> = (0..n as u32).collect();
        by_last.sort_by(|&i, &j| {
            last[i as usize]
                .cmp_axis(&last[j as usize])
                .then(i.cmp(&j))
        });
        let mut work: Vec<RangeWork<A, K>> = points
            .iter()
            .zip(last)
            .enumerate()
            .map(|(id, (p, &l))| RangeWork {
                coords: p.coords,
                last: l,
                id: id.az::<u32>(),
                rank_last: 0,
            })
            .collect();
        for (rank, &i) in by_last.iter().enumerate() {
            work[i as usize].rank_last = rank.az::<u32>();
        }

        tree.build(&mut work, NO_PARENT);
        tree
    }

    fn build(&mut self, work: &mut [RangeWork<A, K>], parent: u32) -> u32 {
        let n = work.len();
        let id = self.nodes.len().az::<u32>();
        let (lower, upper) = bounding_box(work, |w| &w.coords);

        let mut ranges = Vec::new();
        if n > 1 {
            if K == 0 {
                let mid = n / 2;
                ranges.push((0, mid));
                ranges.push((mid, n));
            } else {
                partition_ranges(work, 0, 0, |w: &RangeWork<A, K>| &w.coords, &mut ranges);
            }
        }

        // Ascending last-axis order of this node's points, recovered from the
        // ranks carried through the partition above.
        let mut order_last = vec![0u32; n];
        for (i, w) in work.iter().enumerate() {
            order_last[w.rank_last as usize] = i.az::<u32>();
        }
        let values: Vec<A> = order_last
            .iter()
            .map(|&i| work[i as usize].last)
            .collect();
        for (slot, &i) in order_last.iter().enumerate() {
            self.slots[work[i as usize].id as usize].push((id, slot.az::<u32>()));
        }

        self.nodes.push(RangeNode {
            lower,
            upper,
            count: n.az::<u32>(),
            weighted: 0,
            parent,
            children: Vec::new(),
            leaf_left: self.leaves.len().az::<u32>(),
            last_axis: work[0].last,
            subtree: LastAxisTree::new(values),
        });

        if n == 1 {
            self.index2leaf[work[0].id as usize] = id;
            self.leaves.push(id);
            return id;
        }

        // Hand each child its own contiguous last-axis ranks, walking the
        // parent's order once so relative order is preserved.
        let mut next_rank = vec![0u32; ranges.len()];
        for &i in &order_last {
            let child = ranges.partition_point(|&(start, _)| start <= i as usize) - 1;
            work[i as usize].rank_last = next_rank[child];
            next_rank[child] += 1;
        }

        let mut children = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            children.push(self.build(&mut work[start..end], id));
        }
        self.nodes[id as usize].children = children;
        id
    }

    /// Adds `delta` to the active weight of the leaf holding input position
    /// `pos`, updating every ancestor and every ancestor's last-axis subtree.
    pub fn update_count(&mut self, pos: usize, delta: i64) {
        if delta == 0 {
            return;
        }
        let mut id = self.index2leaf[pos];
        debug_assert!(self.nodes[id as usize].weighted + delta >= 0);
        while id != NO_PARENT {
            self.nodes[id as usize].weighted += delta;
            id = self.nodes[id as usize].parent;
        }
        // The same path, seen from the subtrees: one recorded slot per
        // ancestor.
        for k in 0..self.slots[pos].len() {
            let (node, slot) = self.slots[pos][k];
            self.nodes[node as usize].subtree.update(slot as usize, delta);
        }
    }

    /// Deactivates the leaf holding input position `pos`; no-op if inactive.
    pub fn close(&mut self, pos: usize) {
        let w = self.nodes[self.index2leaf[pos] as usize].weighted;
        if w != 0 {
            self.update_count(pos, -w);
        }
    }

    /// Counts active weight inside the `K`-dimensional box `[lower, upper]`
    /// and, simultaneously, the subset whose last-axis value also lies in
    /// `[last_lower, last_upper]`. Returns `(a, b)` in that order.
    pub fn count_range(
        &mut self,
        lower: &[A; K],
        upper: &[A; K],
        last_lower: A,
        last_upper: A,
    ) -> (i64, i64) {
        if self.nodes.is_empty() || self.nodes[0].weighted == 0 {
            return (0, 0);
        }
        let mut q1 = std::mem::take(&mut self.q1);
        let mut q2 = std::mem::take(&mut self.q2);
        q1.clear();
        q1.push(0);

        let mut a = 0i64;
        let mut b = 0i64;
        while !q1.is_empty() {
            self.nodes_visited += q1.len() as u64;
            q2.clear();
            for &id in &q1 {
                let node = &self.nodes[id as usize];
                match classify_box(&node.lower, &node.upper, lower, upper) {
                    BoxClass::Within => {
                        b += node.weighted;
                        a += if node.count <= self.scan_threshold {
                            self.scan_leaves(node, last_lower, last_upper)
                        } else {
                            node.subtree.count_range(last_lower, last_upper)
                        };
                    }
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
        (a, b)
    }

    fn scan_leaves(&self, node: &RangeNode<A, K>, last_lower: A, last_upper: A) -> i64 {
        let from = node.leaf_left as usize;
        let to = from + node.count as usize;
        let mut total = 0;
        for &leaf in &self.leaves[from..to] {
            let leaf = &self.nodes[leaf as usize];
            if leaf.weighted != 0 && last_lower <= leaf.last_axis && leaf.last_axis <= last_upper {
                total += leaf.weighted;
            }
        }
        total
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn last_axis_tree_counts_weighted_intervals() {
        let mut tree = LastAxisTree::new(vec![1u32, 3, 3, 5, 8, 13]);
        for slot in 0..6 {
            tree.update(slot, 1);
        }
        tree.update(4, 2); // weight 3 at value 8
        assert_eq!(tree.count_range(3, 8), 6);
        assert_eq!(tree.count_range(0, 100), 8);
        assert_eq!(tree.count_range(6, 7), 0);
        assert_eq!(tree.count_range(13, 13), 1);
        tree.update(1, -1);
        assert_eq!(tree.count_range(2, 4), 1);
    }

    fn random_input(
        rng: &mut ChaCha8Rng,
        n: usize,
    ) -> (Vec<KdPoint<u32, 2>>, Vec<u32>) {
        let points = (0..n)
            .map(|_| {
                KdPoint::new(
                    [rng.random_range(0..40u32), rng.random_range(0..40u32)],
                    1,
                )
            })
            .collect();
        let last = (0..n).map(|_| rng.random_range(0..40u32)).collect();
        (points, last)
    }

    fn linear_joint(
        points: &[KdPoint<u32, 2>],
        last: &[u32],
        open: &[i64],
        lo: &[u32; 2],
        hi: &[u32; 2],
        last_lo: u32,
        last_hi: u32,
    ) -> (i64, i64) {
        let mut a = 0;
        let mut b = 0;
        for i in 0..points.len() {
            let p = &points[i];
            if (0..2).all(|d| lo[d] <= p.coords[d] && p.coords[d] <= hi[d]) {
                b += open[i];
                if last_lo <= last[i] && last[i] <= last_hi {
                    a += open[i];
                }
            }
        }
        (a, b)
    }

    #[test]
    fn joint_counts_match_a_linear_scan_on_both_paths() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (points, last) = random_input(&mut rng, 250);

        // Force the subtree path and the leaf-scan path; both must agree with
        // the reference.
        for threshold in [0u32, u32::MAX] {
            let mut tree = RangeKdTree::with_scan_threshold(&points, &last, threshold);
            let mut open = vec![0i64; points.len()];
            for i in 0..points.len() {
                if rng.random_range(0..4u32) > 0 {
                    tree.update_count(i, 1);
                    open[i] = 1;
                }
            }
            for _ in 0..150 {
                let lo = [rng.random_range(0..40u32), rng.random_range(0..40u32)];
                let hi = [
                    rng.random_range(lo[0]..=40u32),
                    rng.random_range(lo[1]..=40u32),
                ];
                let last_lo = rng.random_range(0..40u32);
                let last_hi = rng.random_range(last_lo..=40u32);
                assert_eq!(
                    tree.count_range(&lo, &hi, last_lo, last_hi),
                    linear_joint(&points, &last, &open, &lo, &hi, last_lo, last_hi)
                );
            }
        }
    }

    #[test]
    fn close_and_reopen_track_the_subtrees() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let (points, last) = random_input(&mut rng, 60);
        let mut tree = RangeKdTree::new(&points, &last);
        for i in 0..points.len() {
            tree.update_count(i, 1);
        }
        assert_eq!(tree.weighted_count(), 60);

        tree.close(5);
        tree.close(5);
        let (a, b) = tree.count_range(&[0, 0], &[40, 40], 0, 40);
        assert_eq!((a, b), (59, 59));

        tree.update_count(5, 1);
        let (a, b) = tree.count_range(&[0, 0], &[40, 40], 0, 40);
        assert_eq!((a, b), (60, 60));
    }
}
