//! Reference implementations and signal generators shared by the test and
//! bench suites. Not part of the public API.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::types::Axis;

#[inline]
fn within<A: Axis>(x: A, y: A, r: A) -> bool {
    let diff = if x > y { x - y } else { y - x };
    diff <= r
}

/// Direct O(N²m) matched-pair counting: (A, B) as unordered distinct-pair
/// counts over the first `N - m` templates, at dimensions m + 1 and m.
pub fn direct_matched_pairs<A: Axis>(data: &[A], m: usize, r: A) -> (i64, i64) {
    let n_templates = data.len() - m;
    let mut a = 0i64;
    let mut b = 0i64;
    for i in 0..n_templates {
        for j in i + 1..n_templates {
            if (0..m).all(|d| within(data[i + d], data[j + d], r)) {
                b += 1;
                if within(data[i + m], data[j + m], r) {
                    a += 1;
                }
            }
        }
    }
    (a, b)
}

/// Direct sample entropy from [`direct_matched_pairs`].
pub fn direct_entropy<A: Axis>(data: &[A], m: usize, r: A) -> f64 {
    let (a, b) = direct_matched_pairs(data, m, r);
    crate::estimator::sampen(a, b)
}

/// Uniform white noise on `[0, 1)`, deterministic per seed.
pub fn uniform_noise(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.random()).collect()
}

/// A small-alphabet integer signal, deterministic per seed; useful for
/// exercising heavy template repetition.
pub fn coarse_noise(n: usize, levels: i32, seed: u64) -> Vec<i32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(0..levels)).collect()
}
