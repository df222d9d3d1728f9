//! The sampling front-end: index-set generation for the randomized and
//! quasi-randomized estimators, and the aggregation of per-sample tallies.
//!
//! Index sets address positions in the sorted real-template order. Every set
//! is sorted ascending before it reaches a controller; the open/close
//! amortization depends on it. Only uniform with-replacement sampling keeps
//! duplicate indices (they fold into per-point multiplicities); every other
//! scheme deduplicates, treating a repeated draw as a no-op.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::errors::SampenError;
use crate::quasirandom::{QuasiKind, QuasiSequence};

/// How the per-sample template index sets are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplingScheme {
    /// I.i.d. uniform draws, with replacement.
    Uniform,
    /// Uniform draws without replacement.
    SwrUniform,
    /// 1-D Sobol sequence, scaled to the index range.
    Sobol,
    /// 1-D Halton sequence.
    Halton,
    /// 1-D reverse Halton sequence.
    ReverseHalton,
    /// 1-D Niederreiter base-2 sequence.
    Niederreiter2,
    /// Equispaced lattice, phase-shifted per sample.
    Grid,
}

/// Seeding policy for the sampling RNG.
///
/// Deterministic by default so repeated runs are reproducible; switch to
/// [`Seed::FromEntropy`] to draw a fresh seed from the OS.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Seed {
    /// Seed the generator with this value.
    Fixed(u64),
    /// Seed the generator from operating-system entropy.
    FromEntropy,
}

impl Default for Seed {
    fn default() -> Self {
        Seed::Fixed(0x5eed_ba5e)
    }
}

/// Parameters of a sampling estimation run.
#[derive(Clone, Copy, Debug)]
pub struct SamplingParams {
    /// Number of templates per sample (N0).
    pub sample_size: usize,
    /// Number of repeated samples (N1).
    pub sample_num: usize,
    /// Draw scheme.
    pub scheme: SamplingScheme,
    /// Seeding policy.
    pub seed: Seed,
}

impl SamplingParams {
    /// Parameters with the given sizes, uniform-without-replacement draws and
    /// deterministic seeding.
    pub fn new(sample_size: usize, sample_num: usize) -> Self {
        Self {
            sample_size,
            sample_num,
            scheme: SamplingScheme::SwrUniform,
            seed: Seed::default(),
        }
    }

    /// Replaces the draw scheme.
    pub fn scheme(mut self, scheme: SamplingScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Replaces the seeding policy.
    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }
}

/// Tallies of one sample: raw match counts and the entropy estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleTally {
    /// (m+1)-dimensional match count within this sample.
    pub a: i64,
    /// m-dimensional match count within this sample.
    pub b: i64,
    /// `-ln(a/b)` for this sample.
    pub entropy: f64,
}

pub(crate) fn rng_for(seed: Seed) -> ChaCha8Rng {
    match seed {
        Seed::Fixed(s) => ChaCha8Rng::seed_from_u64(s),
        Seed::FromEntropy => ChaCha8Rng::from_os_rng(),
    }
}

/// Draws `sample_num` index sets of size `sample_size` into
/// `[0, n_templates)`, each sorted ascending.
pub(crate) fn generate_index_sets(
    params: &SamplingParams,
    n_templates: usize,
) -> Result<Vec<Vec<u32>>, SampenError> {
    if params.sample_size == 0 || params.sample_size > n_templates {
        return Err(SampenError::InvalidSampleSize {
            sample_size: params.sample_size,
            n_templates,
        });
    }
    let mut rng = rng_for(params.seed);
    let n0 = params.sample_size;
    let n = n_templates as u32;

    let mut quasi = quasi_kind(params.scheme).map(QuasiSequence::new);

    let mut sets = Vec::with_capacity(params.sample_num);
    for _ in 0..params.sample_num {
        let mut indices: Vec<u32> = match params.scheme {
            SamplingScheme::Uniform => (0..n0).map(|_| rng.random_range(0..n)).collect(),
            SamplingScheme::SwrUniform => rand::seq::index::sample(&mut rng, n_templates, n0)
                .into_iter()
                .map(|i| i as u32)
                .collect(),
            SamplingScheme::Grid => {
                let phase: f64 = rng.random();
                (0..n0)
                    .map(|i| {
                        let u = ((i as f64 + phase) * n_templates as f64 / n0 as f64) as u32;
                        u.min(n - 1)
                    })
                    .collect()
            }
            _ => {
                let seq = quasi.as_mut().expect("quasi scheme has a sequence");
                (0..n0)
                    .map(|_| {
                        let u = (seq.next_value() * n_templates as f64) as u32;
                        u.min(n - 1)
                    })
                    .collect()
            }
        };
        indices.sort_unstable();
        if params.scheme != SamplingScheme::Uniform {
            indices.dedup();
        }
        sets.push(indices);
    }
    Ok(sets)
}

fn quasi_kind(scheme: SamplingScheme) -> Option<QuasiKind> {
    match scheme {
        SamplingScheme::Sobol => Some(QuasiKind::Sobol),
        SamplingScheme::Halton => Some(QuasiKind::Halton),
        SamplingScheme::ReverseHalton => Some(QuasiKind::ReverseHalton),
        SamplingScheme::Niederreiter2 => Some(QuasiKind::Niederreiter2),
        _ => None,
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count();
    if n == 0 {
        return f64::NAN;
    }
    values.sum::<f64>() / n as f64
}

/// Unbiased (Bessel-corrected) sample variance. Zero for fewer than two
/// observations.
pub(crate) fn sample_variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count();
    if n < 2 {
        return 0.0;
    }
    let avg = mean(values.clone());
    values.map(|x| (x - avg) * (x - avg)).sum::<f64>() / (n - 1) as f64
}

pub(crate) fn mean_squared_error(
    values: impl Iterator<Item = f64> + Clone,
    reference: f64,
) -> f64 {
    mean(values.map(move |x| (x - reference) * (x - reference)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(scheme: SamplingScheme) -> SamplingParams {
        SamplingParams::new(64, 5).scheme(scheme)
    }

    #[test]
    fn index_sets_are_sorted_and_in_range() {
        for scheme in [
            SamplingScheme::Uniform,
            SamplingScheme::SwrUniform,
            SamplingScheme::Sobol,
            SamplingScheme::Halton,
            SamplingScheme::ReverseHalton,
            SamplingScheme::Niederreiter2,
            SamplingScheme::Grid,
        ] {
            let sets = generate_index_sets(&params(scheme), 500).unwrap();
            assert_eq!(sets.len(), 5);
            for set in sets {
                assert!(!set.is_empty() && set.len() <= 64);
                assert!(set.windows(2).all(|w| w[0] <= w[1]));
                assert!(set.iter().all(|&i| i < 500));
                if scheme != SamplingScheme::Uniform {
                    assert!(set.windows(2).all(|w| w[0] < w[1]));
                }
            }
        }
    }

    #[test]
    fn without_replacement_draws_are_exhaustive_at_full_size() {
        let sets =
            generate_index_sets(&SamplingParams::new(100, 2), 100).unwrap();
        for set in sets {
            assert_eq!(set, (0..100u32).collect::<Vec<_>>());
        }
    }

    #[test]
    fn fixed_seeds_reproduce_and_differ() {
        let a = generate_index_sets(&params(SamplingScheme::Uniform), 500).unwrap();
        let b = generate_index_sets(&params(SamplingScheme::Uniform), 500).unwrap();
        assert_eq!(a, b);

        let c = generate_index_sets(
            &params(SamplingScheme::Uniform).seed(Seed::Fixed(1234)),
            500,
        )
        .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn oversized_or_empty_samples_are_rejected() {
        assert!(matches!(
            generate_index_sets(&SamplingParams::new(501, 1), 500),
            Err(SampenError::InvalidSampleSize { .. })
        ));
        assert!(matches!(
            generate_index_sets(&SamplingParams::new(0, 1), 500),
            Err(SampenError::InvalidSampleSize { .. })
        ));
    }

    #[test]
    fn variance_is_bessel_corrected() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let var = sample_variance(xs.iter().copied());
        assert!((var - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(sample_variance([1.0].iter().copied()), 0.0);
    }

    #[test]
    fn mse_measures_distance_to_the_reference() {
        let xs = [1.0, 3.0];
        assert!((mean_squared_error(xs.iter().copied(), 2.0) - 1.0).abs() < 1e-12);
    }
}
