#![warn(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::private_intra_doc_links)]

//! # sampen
//!
//! Fast [Sample Entropy](https://en.wikipedia.org/wiki/Sample_entropy) (SampEn)
//! estimation for one-dimensional signals.
//!
//! Given a signal of length `N`, a template length `m` and a similarity
//! threshold `r`, sample entropy is `-ln(A/B)`, where `B` counts pairs of
//! m-length templates within Chebyshev distance `r` of each other and `A`
//! counts the same for (m+1)-length templates. The naïve computation is
//! Θ(N²m); this crate accelerates it by remapping templates into integer rank
//! space and counting matches with 2^K-fanout spatial trees driven by a
//! sliding window, and can alternatively estimate the result from randomized
//! or quasi-randomized subsets of the templates.
//!
//! Three exact engines are provided; they produce bit-for-bit identical
//! match counts and differ only in speed characteristics:
//! - [`ExactEngine::SlidingKd`]: a counting tree over rank space, one pass
//!   per template dimension;
//! - [`ExactEngine::RangeKd`]: a range tree whose nodes carry an auxiliary
//!   last-axis structure, producing both counts in a single pass;
//! - [`ExactEngine::SimpleKd`]: a counting tree over raw value space.
//!
//! ## Usage
//!
//! ```rust
//! use sampen::sample_entropy;
//!
//! let signal: Vec<f64> = (0..512).map(|i| (i as f64 * 0.7).sin()).collect();
//!
//! let outcome = sample_entropy(&signal, 2, 0.15).unwrap();
//! assert!(outcome.a <= outcome.b);
//! println!("SampEn = {:.4}", outcome.entropy);
//! ```
//!
//! For long signals, an estimate from a subset of templates is often enough:
//!
//! ```rust
//! use sampen::{sample_entropy_sampled, OutputLevel, SamplingParams, SamplingScheme};
//!
//! let signal: Vec<f64> = (0..2048).map(|i| (i as f64 * 0.7).sin()).collect();
//! let params = SamplingParams::new(256, 20).scheme(SamplingScheme::Sobol);
//!
//! let estimate =
//!     sample_entropy_sampled(&signal, 2, 0.15, &params, None, OutputLevel::Silent).unwrap();
//! assert_eq!(estimate.samples.len(), 20);
//! ```
//!
//! Thresholds are taken as given; callers wanting the conventional "0.2 times
//! the standard deviation" scale by [`signal_std`] first. Diagnostics are
//! emitted through [`tracing`] and gated by [`OutputLevel`]; they never
//! affect results.

pub mod counting_tree;
pub mod errors;
pub mod estimator;
pub mod point;
mod quasirandom;
pub mod range_tree;
mod rank;
pub mod sampling;
#[doc(hidden)]
#[cfg(feature = "test_utils")]
pub mod test_utils;
pub mod types;
mod window;

pub use counting_tree::KdCountingTree;
pub use errors::SampenError;
pub use estimator::{
    sampen, sample_entropy, sample_entropy_sampled, sample_entropy_with, signal_std, ExactEngine,
    Outcome, SamplingOutcome,
};
pub use point::KdPoint;
pub use range_tree::RangeKdTree;
pub use sampling::{SampleTally, SamplingParams, SamplingScheme, Seed};
pub use types::{Axis, OutputLevel};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
