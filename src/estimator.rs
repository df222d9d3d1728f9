//! Public estimation entry points: input validation, dispatch from the
//! runtime template length to the const-generic engines, and assembly of the
//! final entropy figures.
//!
//! A and B are unordered distinct-pair counts over the first `N - m`
//! templates, at dimensions `m + 1` and `m` respectively; sample entropy is
//! `-ln(A/B)`. All exact engines produce identical (A, B) for identical
//! inputs.

use std::time::Instant;

use tracing::info;

use crate::errors::SampenError;
use crate::sampling::{
    generate_index_sets, mean, mean_squared_error, sample_variance, SampleTally, SamplingParams,
    SamplingScheme,
};
use crate::types::{Axis, OutputLevel};
use crate::window::{joint_context, matched_pairs, matched_pairs_grouped, matched_pairs_simple};

/// Which exact engine computes the match counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExactEngine {
    /// Sliding counting tree over rank space; two passes (B at dimension m,
    /// A at m + 1).
    #[default]
    SlidingKd,
    /// Range tree with last-axis subtrees; one fused pass yields (A, B).
    RangeKd,
    /// Counting tree over value space, no rank remapping; two passes.
    SimpleKd,
}

/// Result of an exact sample entropy computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outcome {
    /// `-ln(a/b)`; infinite when either count is zero.
    pub entropy: f64,
    /// Matched pairs at dimension m + 1.
    pub a: i64,
    /// Matched pairs at dimension m.
    pub b: i64,
    /// `a` over the number of possible template pairs.
    pub a_norm: f64,
    /// `b` over the number of possible template pairs.
    pub b_norm: f64,
    /// Wall-clock time of the computation.
    pub elapsed_seconds: f64,
}

impl Outcome {
    /// True when either match count is zero, making the entropy infinite.
    pub fn is_degenerate(&self) -> bool {
        self.a == 0 || self.b == 0
    }
}

/// Result of a sampling estimation run.
#[derive(Clone, Debug)]
pub struct SamplingOutcome {
    /// Per-sample match counts and entropy estimates.
    pub samples: Vec<SampleTally>,
    /// Mean of the per-sample entropy estimates.
    pub mean_entropy: f64,
    /// Unbiased variance of the per-sample entropy estimates.
    pub variance: f64,
    /// Mean squared error against the caller-supplied exact entropy.
    pub mse: Option<f64>,
    /// Wall-clock time of the run, excluding any exact reference computation.
    pub elapsed_seconds: f64,
}

/// Assembles sample entropy from raw match counts: `-ln(a/b)`, or `+∞` when
/// either count is zero (no information about the ratio).
pub fn sampen(a: i64, b: i64) -> f64 {
    debug_assert!(a >= 0 && b >= 0);
    if a <= 0 || b <= 0 {
        return f64::INFINITY;
    }
    -((a as f64 / b as f64).ln())
}

/// Bessel-corrected standard deviation of a signal, for callers who scale the
/// similarity threshold as a multiple of it.
pub fn signal_std(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let avg = data.iter().sum::<f64>() / data.len() as f64;
    let var = data.iter().map(|x| (x - avg) * (x - avg)).sum::<f64>() / (data.len() - 1) as f64;
    var.sqrt()
}

fn validate<A: Axis>(data: &[A], m: u32, r: A) -> Result<(), SampenError> {
    if !(1..=10).contains(&m) {
        return Err(SampenError::InvalidDimension { m });
    }
    if r < A::zero() {
        return Err(SampenError::InvalidThreshold);
    }
    if data.len() <= m as usize + 1 {
        return Err(SampenError::ShortInput { n: data.len(), m });
    }
    Ok(())
}

/// Expands a runtime template length into the const-generic triple
/// `(m + 1, m, m - 1)` the engines are monomorphized over, the way the
/// original instantiated one engine per template length.
macro_rules! dispatch_template_length {
    ($m:expr, $callee:ident ( $($args:expr),* $(,)? )) => {
        match $m {
            1 => $callee::<A, 2, 1, 0>($($args),*),
            2 => $callee::<A, 3, 2, 1>($($args),*),
            3 => $callee::<A, 4, 3, 2>($($args),*),
            4 => $callee::<A, 5, 4, 3>($($args),*),
            5 => $callee::<A, 6, 5, 4>($($args),*),
            6 => $callee::<A, 7, 6, 5>($($args),*),
            7 => $callee::<A, 8, 7, 6>($($args),*),
            8 => $callee::<A, 9, 8, 7>($($args),*),
            9 => $callee::<A, 10, 9, 8>($($args),*),
            10 => $callee::<A, 11, 10, 9>($($args),*),
            _ => unreachable!("template length is validated on entry"),
        }
    };
}

fn run_exact<A: Axis, const KP1: usize, const K: usize, const G: usize>(
    data: &[A],
    r: A,
    engine: ExactEngine,
    level: OutputLevel,
) -> Result<(i64, i64), SampenError> {
    match engine {
        ExactEngine::SlidingKd => {
            // B over the first N - m templates: dimension m on the input
            // shorn of its last sample.
            let b = matched_pairs::<A, K, G>(&data[..data.len() - 1], r, level)?;
            let a = matched_pairs::<A, KP1, K>(data, r, level)?;
            Ok((a, b))
        }
        ExactEngine::RangeKd => {
            let mut ctx = joint_context::<A, KP1, K, G>(data, r, level)?;
            Ok(ctx.run_exact())
        }
        ExactEngine::SimpleKd => {
            let b = matched_pairs_simple::<A, K>(&data[..data.len() - 1], r, level)?;
            let a = matched_pairs_simple::<A, KP1>(data, r, level)?;
            Ok((a, b))
        }
    }
}

fn run_sampling<A: Axis, const KP1: usize, const K: usize, const G: usize>(
    data: &[A],
    r: A,
    params: &SamplingParams,
    level: OutputLevel,
) -> Result<Vec<(i64, i64)>, SampenError> {
    let n_templates = data.len() - K;
    let sets = generate_index_sets(params, n_templates)?;
    match params.scheme {
        SamplingScheme::Uniform => {
            // With-replacement draws carry multiplicities; the grouped
            // controller folds them into per-point counts over one shared
            // tree per dimension.
            let b_counts = matched_pairs_grouped::<A, K, G>(&data[..data.len() - 1], r, &sets, level)?;
            let a_counts = matched_pairs_grouped::<A, KP1, K>(data, r, &sets, level)?;
            Ok(a_counts.into_iter().zip(b_counts).collect())
        }
        _ => {
            let mut ctx = joint_context::<A, KP1, K, G>(data, r, level)?;
            Ok(sets.iter().map(|set| ctx.run_sample(set)).collect())
        }
    }
}

/// Computes exact sample entropy with the default engine
/// ([`ExactEngine::SlidingKd`]) and no diagnostics.
///
/// `r` is used as given; scale it beforehand (e.g. by [`signal_std`]) if a
/// relative threshold is wanted.
///
/// # Examples
///
/// ```rust
/// use sampen::sample_entropy;
///
/// let signal: Vec<f64> = (0..64).map(|i| ((i * 7) % 13) as f64).collect();
/// let outcome = sample_entropy(&signal, 2, 1.0).unwrap();
///
/// assert!(outcome.a <= outcome.b);
/// assert!(outcome.entropy >= 0.0);
/// ```
pub fn sample_entropy<A: Axis>(data: &[A], m: u32, r: A) -> Result<Outcome, SampenError> {
    sample_entropy_with(data, m, r, ExactEngine::default(), OutputLevel::Silent)
}

/// Computes exact sample entropy with an explicit engine and output level.
pub fn sample_entropy_with<A: Axis>(
    data: &[A],
    m: u32,
    r: A,
    engine: ExactEngine,
    level: OutputLevel,
) -> Result<Outcome, SampenError> {
    validate(data, m, r)?;
    let started = Instant::now();
    let (a, b) = dispatch_template_length!(m, run_exact(data, r, engine, level))?;
    let elapsed = started.elapsed().as_secs_f64();

    let np = (data.len() - m as usize) as f64;
    let pairs = np * (np - 1.0) / 2.0;
    let outcome = Outcome {
        entropy: sampen(a, b),
        a,
        b,
        a_norm: a as f64 / pairs,
        b_norm: b as f64 / pairs,
        elapsed_seconds: elapsed,
    };
    if level >= OutputLevel::Info {
        info!(
            ?engine,
            m,
            n = data.len(),
            a,
            b,
            entropy = outcome.entropy,
            elapsed_seconds = elapsed,
            "sample entropy computed"
        );
    }
    Ok(outcome)
}

/// Estimates sample entropy from repeated samples of the template set,
/// reporting per-sample tallies and aggregate statistics.
///
/// `reference` is an exact entropy to measure the estimator's MSE against
/// (typically from [`sample_entropy`] on the same input); pass `None` to skip
/// the MSE report.
pub fn sample_entropy_sampled<A: Axis>(
    data: &[A],
    m: u32,
    r: A,
    params: &SamplingParams,
    reference: Option<f64>,
    level: OutputLevel,
) -> Result<SamplingOutcome, SampenError> {
    validate(data, m, r)?;
    let started = Instant::now();
    let counts = dispatch_template_length!(m, run_sampling(data, r, params, level))?;
    let elapsed = started.elapsed().as_secs_f64();

    let samples: Vec<SampleTally> = counts
        .into_iter()
        .map(|(a, b)| SampleTally {
            a,
            b,
            entropy: sampen(a, b),
        })
        .collect();
    let mean_entropy = mean(samples.iter().map(|s| s.entropy));
    let variance = sample_variance(samples.iter().map(|s| s.entropy));
    let mse = reference.map(|e| mean_squared_error(samples.iter().map(|s| s.entropy), e));
    let outcome = SamplingOutcome {
        samples,
        mean_entropy,
        variance,
        mse,
        elapsed_seconds: elapsed,
    };
    if level >= OutputLevel::Info {
        info!(
            scheme = ?params.scheme,
            sample_size = params.sample_size,
            sample_num = params.sample_num,
            mean_entropy = outcome.mean_entropy,
            variance = outcome.variance,
            mse = ?outcome.mse,
            elapsed_seconds = elapsed,
            "sampled entropy estimate"
        );
    }
    Ok(outcome)
}
