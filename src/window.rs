//! Sliding-window match counting.
//!
//! The controllers here drive the counting structures one sorted template at
//! a time. The first rank-space axis is never indexed by a tree: because
//! templates are processed in rank order, it is enforced by a window of open
//! leaves `(i, upper_bound(i)]` that only ever moves forward. Each leaf is
//! opened at most once and closed at most once per pass, so window upkeep is
//! O(N) and the range queries dominate.

use array_init::array_init;
use tracing::debug;

use crate::counting_tree::KdCountingTree;
use crate::errors::SampenError;
use crate::point::{padded_templates, KdPoint};
use crate::range_tree::RangeKdTree;
use crate::rank::{map_to_grid, rank_bounds, rank_points, RankBounds};
use crate::types::{Axis, OutputLevel};

/// The query box of a rank-space point: per coordinate, the rank window whose
/// first-axis values lie within `±r` of the coordinate's template.
fn grid_box<const G: usize>(point: &KdPoint<u32, G>, bounds: &RankBounds) -> ([u32; G], [u32; G]) {
    (
        array_init(|j| bounds.lower[point.coords[j] as usize]),
        array_init(|j| bounds.upper[point.coords[j] as usize]),
    )
}

/// Counts matched pairs of `K`-length templates of `data` under Chebyshev
/// threshold `r`, using the sliding counting tree over `G = K - 1` rank-space
/// dimensions.
///
/// Templates with repeated values are handled through per-point counts:
/// `(c - 1)*c / 2` intra-multiplicity pairs at the center plus `c x` the
/// cross count.
pub(crate) fn matched_pairs<A: Axis, const K: usize, const G: usize>(
    data: &[A],
    r: A,
    level: OutputLevel,
) -> Result<i64, SampenError> {
    debug_assert_eq!(G + 1, K);
    let points = padded_templates::<A, K>(data, K - 1)?;
    let (sorted, maps) = rank_points(&points);
    let bounds = rank_bounds(&sorted, r);
    let grid = map_to_grid::<A, K, G>(&sorted, &maps, true);

    let mut pts: Vec<KdPoint<u32, G>> = Vec::new();
    let mut idx: Vec<u32> = Vec::new();
    for (i, g) in grid.iter().enumerate() {
        if g.count() != 0 {
            pts.push(*g);
            idx.push(i as u32);
        }
    }
    let mut tree = KdCountingTree::new(&pts);

    let n_count = pts.len();
    let mut result = 0i64;
    let mut upper_prev = 0u32;
    let mut opened = 0u64;
    let mut queries = 0u64;
    for i in 0..n_count {
        tree.close(i);

        let rank1 = idx[i];
        let upper = bounds.upper[rank1 as usize];
        let c = pts[i].count() as i64;
        result += (c - 1) * c / 2;

        if i + 1 >= n_count || upper < idx[i + 1] {
            continue;
        }

        if upper_prev < rank1 {
            upper_prev = rank1;
        }
        let mut j = i + 1;
        while j < n_count && idx[j] <= upper_prev {
            j += 1;
        }
        while j < n_count && idx[j] <= upper {
            tree.update_count(j, pts[j].count() as i64);
            opened += 1;
            j += 1;
        }

        let (lo, hi) = grid_box(&pts[i], &bounds);
        result += tree.count_range(&lo, &hi) * c;
        queries += 1;
        upper_prev = upper;
    }
    debug_assert_eq!(tree.weighted_count(), 0);

    if level >= OutputLevel::Debug {
        debug!(
            template_length = K,
            n_count,
            tree_nodes = tree.num_nodes(),
            nodes_visited = tree.nodes_visited(),
            opened,
            queries,
            "sliding matched-pairs pass"
        );
    }
    Ok(result)
}

/// Shared preparation for the joint (A, B) paths: rank-space points split into
/// a `G = m - 1` dimensional box prefix plus the last axis, their sorted-rank
/// positions, the first-axis bounds, and the range tree over them.
///
/// Built once, then driven either exactly or repeatedly against sampled
/// index sets (the tree is fully closed between passes).
pub(crate) struct JointContext<const G: usize> {
    pts: Vec<KdPoint<u32, G>>,
    last: Vec<u32>,
    idx: Vec<u32>,
    bounds: RankBounds,
    tree: RangeKdTree<u32, G>,
    level: OutputLevel,
    opened: u64,
    queries: u64,
}

pub(crate) fn joint_context<A: Axis, const KP1: usize, const K: usize, const G: usize>(
    data: &[A],
    r: A,
    level: OutputLevel,
) -> Result<JointContext<G>, SampenError> {
    debug_assert_eq!(K + 1, KP1);
    debug_assert_eq!(G + 1, K);
    let points = padded_templates::<A, KP1>(data, K)?;
    let (sorted, maps) = rank_points(&points);
    let bounds = rank_bounds(&sorted, r);
    let grid = map_to_grid::<A, KP1, K>(&sorted, &maps, true);

    let mut pts: Vec<KdPoint<u32, G>> = Vec::new();
    let mut last: Vec<u32> = Vec::new();
    let mut idx: Vec<u32> = Vec::new();
    for (i, g) in grid.iter().enumerate() {
        if g.count() != 0 {
            pts.push(KdPoint::new(array_init(|j| g.coords[j]), g.count()));
            last.push(g.coords[K - 1]);
            idx.push(i as u32);
        }
    }
    let tree = RangeKdTree::new(&pts, &last);
    Ok(JointContext {
        pts,
        last,
        idx,
        bounds,
        tree,
        level,
        opened: 0,
        queries: 0,
    })
}

impl<const G: usize> JointContext<G> {
    pub(crate) fn n_count(&self) -> usize {
        self.pts.len()
    }

    fn query(&mut self, i: usize) -> (i64, i64) {
        let (lo, hi) = grid_box(&self.pts[i], &self.bounds);
        let last_lo = self.bounds.lower[self.last[i] as usize];
        let last_hi = self.bounds.upper[self.last[i] as usize];
        self.queries += 1;
        self.tree.count_range(&lo, &hi, last_lo, last_hi)
    }

    /// Opens every leaf in `(i, upper]` by sorted rank that is not already
    /// inside the window `(i, upper_prev]`, returning the advanced window end.
    fn advance_window(&mut self, i: usize, rank1: u32, upper: u32, upper_prev: u32) -> u32 {
        let skip_to = upper_prev.max(rank1);
        let n_count = self.pts.len();
        let mut j = i + 1;
        while j < n_count && self.idx[j] <= skip_to {
            j += 1;
        }
        while j < n_count && self.idx[j] <= upper {
            self.tree.update_count(j, self.pts[j].count() as i64);
            self.opened += 1;
            j += 1;
        }
        upper
    }

    /// One exact pass: every template is retired, then queried against the
    /// window of templates whose first-axis values still lie within range.
    pub(crate) fn run_exact(&mut self) -> (i64, i64) {
        let n_count = self.pts.len();
        let (mut a, mut b) = (0i64, 0i64);
        let mut upper_prev = 0u32;
        for i in 0..n_count {
            self.tree.close(i);

            let rank1 = self.idx[i];
            let upper = self.bounds.upper[rank1 as usize];
            if i + 1 >= n_count || upper < self.idx[i + 1] {
                continue;
            }

            upper_prev = self.advance_window(i, rank1, upper, upper_prev);
            let (da, db) = self.query(i);
            a += da;
            b += db;
        }
        debug_assert_eq!(self.tree.weighted_count(), 0);
        self.emit_diagnostics("joint exact pass");
        (a, b)
    }

    /// One sampled pass: only the given sorted, duplicate-free positions act
    /// as query centers; leaves swept past are closed lazily, and the whole
    /// tree is retired at the end so the context can be reused.
    pub(crate) fn run_sample(&mut self, sample: &[u32]) -> (i64, i64) {
        debug_assert!(sample.windows(2).all(|w| w[0] < w[1]));
        let n_count = self.pts.len();
        let (mut a, mut b) = (0i64, 0i64);
        let mut upper_prev = 0u32;
        let mut next_sample = 0usize;
        let mut closed_below = 0usize;
        for i in 0..n_count {
            if next_sample > 0 {
                while closed_below <= i {
                    self.tree.close(closed_below);
                    closed_below += 1;
                }
            }
            if next_sample >= sample.len() || sample[next_sample] as usize != i {
                continue;
            }
            next_sample += 1;

            let rank1 = self.idx[i];
            let upper = self.bounds.upper[rank1 as usize];
            if i + 1 >= n_count || upper < self.idx[i + 1] {
                continue;
            }

            upper_prev = self.advance_window(i, rank1, upper, upper_prev);
            let (da, db) = self.query(i);
            a += da;
            b += db;
        }
        for pos in 0..n_count {
            self.tree.close(pos);
        }
        debug_assert_eq!(self.tree.weighted_count(), 0);
        (a, b)
    }

    pub(crate) fn emit_diagnostics(&self, what: &str) {
        if self.level >= OutputLevel::Debug {
            debug!(
                n_count = self.pts.len(),
                tree_nodes = self.tree.num_nodes(),
                nodes_visited = self.tree.nodes_visited(),
                opened = self.opened,
                queries = self.queries,
                "{what}"
            );
        }
    }
}

/// Counts matched pairs of `K`-length templates for each sample group over a
/// single shared counting tree.
///
/// Group entries are positions in the sorted real-template order and may
/// repeat (with-replacement sampling); repeats fold into per-point counts, so
/// intra-multiplicity pairs are credited by the `(c - 1)*c / 2` term.
pub(crate) fn matched_pairs_grouped<A: Axis, const K: usize, const G: usize>(
    data: &[A],
    r: A,
    groups: &[Vec<u32>],
    level: OutputLevel,
) -> Result<Vec<i64>, SampenError> {
    debug_assert_eq!(G + 1, K);
    let points = padded_templates::<A, K>(data, K - 1)?;
    let (sorted, maps) = rank_points(&points);
    let bounds = rank_bounds(&sorted, r);
    // Sampling decides which slots are active, so disabled slots keep their
    // grid coordinates here.
    let grid = map_to_grid::<A, K, G>(&sorted, &maps, false);

    let mut pts: Vec<KdPoint<u32, G>> = Vec::new();
    let mut idx: Vec<u32> = Vec::new();
    for (i, g) in grid.iter().enumerate() {
        if g.count() != 0 {
            let mut p = *g;
            p.count = 0;
            pts.push(p);
            idx.push(i as u32);
        }
    }
    let mut tree = KdCountingTree::new(&pts);
    let n_count = pts.len();

    let mut results = Vec::with_capacity(groups.len());
    for group in groups {
        for &p in group {
            pts[p as usize].count += 1;
        }

        let mut result = 0i64;
        let mut upper_prev = 0u32;
        for i in 0..n_count {
            if pts[i].count() == 0 {
                continue;
            }
            tree.close(i);

            let rank1 = idx[i];
            let upper = bounds.upper[rank1 as usize];
            let c = pts[i].count() as i64;
            result += (c - 1) * c / 2;

            if i + 1 >= n_count || upper < idx[i + 1] {
                continue;
            }

            if upper_prev < rank1 {
                upper_prev = rank1;
            }
            let mut j = i + 1;
            while j < n_count && idx[j] <= upper_prev {
                j += 1;
            }
            while j < n_count && idx[j] <= upper {
                tree.update_count(j, pts[j].count() as i64);
                j += 1;
            }

            let (lo, hi) = grid_box(&pts[i], &bounds);
            result += tree.count_range(&lo, &hi) * c;
            upper_prev = upper;
        }
        results.push(result);

        for &p in group {
            pts[p as usize].count = 0;
        }
        for pos in 0..n_count {
            tree.close(pos);
        }
        debug_assert_eq!(tree.weighted_count(), 0);
    }

    if level >= OutputLevel::Debug {
        debug!(
            template_length = K,
            n_count,
            groups = groups.len(),
            tree_nodes = tree.num_nodes(),
            nodes_visited = tree.nodes_visited(),
            "grouped matched-pairs passes"
        );
    }
    Ok(results)
}

/// Counts matched pairs of `K`-length templates in value space, without the
/// rank remapping: a plain counting tree over the templates themselves and a
/// `±r` hypercube per query.
///
/// Simpler than the sliding path and used as an independent exact engine.
pub(crate) fn matched_pairs_simple<A: Axis, const K: usize>(
    data: &[A],
    r: A,
    level: OutputLevel,
) -> Result<i64, SampenError> {
    let points = crate::point::templates::<A, K>(data, 1)?;
    let mut tree = KdCountingTree::new(&points);

    let mut result = 0i64;
    for i in 1..points.len() {
        tree.update_count(i - 1, points[i - 1].count() as i64);
        let lo = array_init(|j| points[i].coords[j] - r);
        let hi = array_init(|j| points[i].coords[j] + r);
        result += tree.count_range(&lo, &hi);
    }

    if level >= OutputLevel::Debug {
        debug!(
            template_length = K,
            n_count = points.len(),
            tree_nodes = tree.num_nodes(),
            nodes_visited = tree.nodes_visited(),
            "value-space matched-pairs pass"
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Brute-force Chebyshev pair count over the first `limit` templates.
    fn direct_pairs(data: &[f64], k: usize, r: f64, limit: usize) -> i64 {
        let templates: Vec<&[f64]> = (0..limit).map(|i| &data[i..i + k]).collect();
        let mut count = 0;
        for i in 0..templates.len() {
            for j in i + 1..templates.len() {
                let dist = templates[i]
                    .iter()
                    .zip(templates[j])
                    .map(|(a, b)| (a - b).abs())
                    .fold(0.0f64, f64::max);
                if dist <= r {
                    count += 1;
                }
            }
        }
        count
    }

    const DATA: [f64; 12] = [
        3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0, 5.0, 8.0,
    ];

    #[test]
    fn sliding_count_matches_brute_force() {
        // Real templates are the first N - K + 1... minus the padded tail:
        // the caller truncates, so here every template of the slice counts.
        let b = matched_pairs::<f64, 2, 1>(&DATA, 1.0, OutputLevel::Silent).unwrap();
        assert_eq!(b, direct_pairs(&DATA, 2, 1.0, DATA.len() - 2 + 1));

        let b3 = matched_pairs::<f64, 3, 2>(&DATA, 1.0, OutputLevel::Silent).unwrap();
        assert_eq!(b3, direct_pairs(&DATA, 3, 1.0, DATA.len() - 3 + 1));
    }

    #[test]
    fn simple_count_agrees_with_sliding() {
        for r in [0.0, 0.5, 1.0, 2.0] {
            assert_eq!(
                matched_pairs::<f64, 2, 1>(&DATA, r, OutputLevel::Silent).unwrap(),
                matched_pairs_simple::<f64, 2>(&DATA, r, OutputLevel::Silent).unwrap(),
            );
            assert_eq!(
                matched_pairs::<f64, 4, 3>(&DATA, r, OutputLevel::Silent).unwrap(),
                matched_pairs_simple::<f64, 4>(&DATA, r, OutputLevel::Silent).unwrap(),
            );
        }
    }

    #[test]
    fn joint_pass_splits_a_and_b_correctly() {
        let mut ctx = joint_context::<f64, 3, 2, 1>(&DATA, 1.0, OutputLevel::Silent).unwrap();
        let (a, b) = ctx.run_exact();
        let n_templates = DATA.len() - 2;
        assert_eq!(b, direct_pairs(&DATA, 2, 1.0, n_templates));
        assert_eq!(a, direct_pairs(&DATA, 3, 1.0, n_templates));
        assert!(a <= b);
    }

    #[test]
    fn sampled_pass_with_all_indices_counts_center_pairs() {
        let mut ctx = joint_context::<f64, 3, 2, 1>(&DATA, 1.0, OutputLevel::Silent).unwrap();
        let exact = ctx.run_exact();
        let all: Vec<u32> = (0..ctx.n_count() as u32).collect();
        assert_eq!(ctx.run_sample(&all), exact);
        // Reusable: a second identical pass sees a fully closed tree.
        assert_eq!(ctx.run_sample(&all), exact);
    }

    #[test]
    fn grouped_pass_with_every_index_once_is_exact() {
        let b_exact = matched_pairs::<f64, 2, 1>(&DATA, 1.0, OutputLevel::Silent).unwrap();
        let n_count = DATA.len() - 2 + 1;
        let group: Vec<u32> = (0..n_count as u32).collect();
        let results =
            matched_pairs_grouped::<f64, 2, 1>(&DATA, 1.0, &[group.clone(), group], OutputLevel::Silent)
                .unwrap();
        assert_eq!(results, vec![b_exact, b_exact]);
    }

    #[test]
    fn grouped_pass_handles_multiplicities() {
        // Sampling the same template twice contributes one self-pair.
        let group = vec![0u32, 0u32];
        let results =
            matched_pairs_grouped::<f64, 2, 1>(&DATA, 0.0, &[group], OutputLevel::Silent).unwrap();
        assert_eq!(results, vec![1]);
    }
}
