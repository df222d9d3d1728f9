//! Definitions for the axis trait and a handful of small types shared across
//! the engine.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::ops::{Add, Sub};

use num_traits::Zero;
use ordered_float::OrderedFloat;

/// Axis trait. Represents the traits that must be implemented by the sample
/// type of an input signal: a totally ordered numeric type whose subtraction
/// stays within the type.
///
/// Implemented for `f32`, `f64`, `i32`, `i64` and `u32` (the last one is what
/// the engine itself uses once signals have been remapped into rank space).
pub trait Axis:
    Copy + Default + Debug + PartialOrd + Zero + Add<Output = Self> + Sub<Output = Self> + Send + Sync
{
    /// Total ordering over axis values. The float impls order NaN after every
    /// number, so sorting never panics on exotic inputs.
    fn cmp_axis(&self, other: &Self) -> Ordering;
}

macro_rules! impl_axis_for_float {
    ($($t:ty),*) => {
        $(impl Axis for $t {
            #[inline]
            fn cmp_axis(&self, other: &Self) -> Ordering {
                OrderedFloat(*self).cmp(&OrderedFloat(*other))
            }
        })*
    };
}

macro_rules! impl_axis_for_int {
    ($($t:ty),*) => {
        $(impl Axis for $t {
            #[inline]
            fn cmp_axis(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }
        })*
    };
}

impl_axis_for_float!(f32, f64);
impl_axis_for_int!(i32, i64, u32);

/// How much diagnostic output a run emits through [`tracing`].
///
/// Diagnostics are additive only: the level never changes any numeric result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputLevel {
    /// Only the result is produced, nothing is emitted.
    #[default]
    Silent,
    /// Per-run summaries: elapsed times, totals.
    Info,
    /// Everything that may be useful for debugging: node visit counts, open
    /// counts, per-sample tallies.
    Debug,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_ordering_is_total() {
        let mut vals = vec![3.0f64, f64::NAN, 1.0, -0.0, 0.0, 2.0];
        vals.sort_by(|a, b| a.cmp_axis(b));
        assert_eq!(vals[0], -0.0);
        assert!(vals[5].is_nan());
    }

    #[test]
    fn output_levels_are_ordered() {
        assert!(OutputLevel::Silent < OutputLevel::Info);
        assert!(OutputLevel::Info < OutputLevel::Debug);
    }
}
