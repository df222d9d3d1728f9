//! Rank-space remapping: lexicographic sorting of templates, the per-rank
//! first-axis bounds, and the grid mapper that turns sorted templates into
//! integer rank-space points.
//!
//! Once templates are sorted, the first coordinate of a template is determined
//! by its own rank, and every other coordinate can be replaced by the rank of
//! the template that succeeds it in the original sequence. This drops the
//! effective dimensionality by one and turns Chebyshev matching into integer
//! range counting.

use crate::point::KdPoint;
use crate::types::Axis;

/// The permutation produced by sorting, in both directions.
pub(crate) struct RankMaps {
    /// `rank2index[r]` is the original position of the template at rank `r`.
    pub(crate) rank2index: Vec<u32>,
    /// Inverse of `rank2index`.
    pub(crate) index2rank: Vec<u32>,
}

/// Sorts `points` lexicographically, returning the sorted array and the
/// rank/index permutation pair.
pub(crate) fn rank_points<A: Axis, const K: usize>(
    points: &[KdPoint<A, K>],
) -> (Vec<KdPoint<A, K>>, RankMaps) {
    let n = points.len();
    let mut rank2index: Vec<u32> = (0..n as u32).collect();
    rank2index.sort_by(|&i1, &i2| points[i1 as usize].lex_cmp(&points[i2 as usize]));

    let mut index2rank = vec![0u32; n];
    for (rank, &index) in rank2index.iter().enumerate() {
        index2rank[index as usize] = rank as u32;
    }

    let sorted = rank2index
        .iter()
        .map(|&index| points[index as usize])
        .collect();
    (
        sorted,
        RankMaps {
            rank2index,
            index2rank,
        },
    )
}

/// For every rank, the half-open window of ranks whose first-axis value lies
/// within `±r` of this rank's value.
pub(crate) struct RankBounds {
    pub(crate) lower: Vec<u32>,
    pub(crate) upper: Vec<u32>,
}

/// Computes the per-rank first-axis bounds in two linear scans over the sorted
/// first coordinates.
pub(crate) fn rank_bounds<A: Axis, const K: usize>(
    sorted: &[KdPoint<A, K>],
    r: A,
) -> RankBounds {
    let n = sorted.len();
    let first: Vec<A> = sorted.iter().map(|p| p.coords[0]).collect();
    let mut lower = vec![0u32; n];
    let mut upper = vec![0u32; n];

    let mut k = 0usize;
    for i in 0..n {
        while first[k] + r < first[i] {
            k += 1;
        }
        lower[i] = k as u32;
    }
    let mut k = n - 1;
    for i in (0..n).rev() {
        while first[k] > first[i] + r {
            k -= 1;
        }
        upper[i] = k as u32;
    }
    RankBounds { lower, upper }
}

/// Maps sorted templates into `G`-dimensional rank space (`G = K - 1`).
///
/// Coordinate `j` of the grid point at rank `i` is the rank of the
/// `(j + 1)`-th successor of that template in the original sequence; successor
/// lookup wraps modulo `n`, which is harmless because only disabled padding
/// points ever wrap. When `skip_disabled` is set, points with count 0 keep a
/// zeroed slot (they are filtered out before tree construction anyway); the
/// grouped sampling path passes `false` to retain every slot.
pub(crate) fn map_to_grid<A: Axis, const K: usize, const G: usize>(
    sorted: &[KdPoint<A, K>],
    maps: &RankMaps,
    skip_disabled: bool,
) -> Vec<KdPoint<u32, G>> {
    debug_assert_eq!(G + 1, K);
    let n = sorted.len();
    let mut rank2next = vec![0u32; n];
    for i in 0..n {
        rank2next[i] = maps.index2rank[(maps.rank2index[i] as usize + 1) % n];
    }

    let mut result = vec![KdPoint::<u32, G>::new([0; G], 0); n];
    for i in 0..n {
        if skip_disabled && sorted[i].count == 0 {
            continue;
        }
        result[i].count = sorted[i].count;
        let mut grid = i as u32;
        for j in 0..G {
            grid = rank2next[grid as usize];
            result[i].coords[j] = grid;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::templates;

    #[test]
    fn rank_maps_are_inverse_permutations() {
        let points = templates::<i32, 2>(&[3, 1, 4, 1, 5, 9, 2, 6], 1).unwrap();
        let (sorted, maps) = rank_points(&points);
        for r in 0..sorted.len() {
            assert_eq!(maps.index2rank[maps.rank2index[r] as usize], r as u32);
            assert_eq!(sorted[r], points[maps.rank2index[r] as usize]);
        }
        for w in sorted.windows(2) {
            assert_ne!(w[0].lex_cmp(&w[1]), std::cmp::Ordering::Greater);
        }
    }

    #[test]
    fn bounds_bracket_each_rank() {
        let points = templates::<f64, 2>(&[0.1, 0.9, 0.2, 0.8, 0.4, 0.6, 0.3], 1).unwrap();
        let (sorted, _) = rank_points(&points);
        let r = 0.25;
        let bounds = rank_bounds(&sorted, r);
        let first: Vec<f64> = sorted.iter().map(|p| p.coords[0]).collect();
        for i in 0..first.len() {
            let (lo, hi) = (bounds.lower[i] as usize, bounds.upper[i] as usize);
            assert!(lo <= i && i <= hi);
            assert!(first[i] - first[lo] <= r);
            assert!(first[hi] - first[i] <= r);
            if lo > 0 {
                assert!(first[i] - first[lo - 1] > r);
            }
            if hi + 1 < first.len() {
                assert!(first[hi + 1] - first[i] > r);
            }
        }
    }

    #[test]
    fn grid_coords_are_successor_ranks() {
        let points = templates::<i32, 3>(&[5, 1, 4, 2, 8, 0, 3], 1).unwrap();
        let (sorted, maps) = rank_points(&points);
        let grid = map_to_grid::<i32, 3, 2>(&sorted, &maps, true);
        let n = sorted.len();
        for i in 0..n {
            for j in 0..2 {
                let successor = (maps.rank2index[i] as usize + j + 1) % n;
                assert_eq!(grid[i].coords[j], maps.index2rank[successor]);
            }
        }
    }
}
