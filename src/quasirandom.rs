//! One-dimensional low-discrepancy sequences for the sampling front-end.
//!
//! Only the first dimension of each classical construction is needed here, so
//! the generators collapse considerably: Halton is the base-2 radical
//! inverse, reverse Halton applies the digit permutation `sigma(d) = b - d`
//! (which is the identity in base 2), Niederreiter's base-2 generator matrix
//! is the identity in dimension one and so reduces to the radical inverse as
//! well, and Sobol differs only by emitting the same set in Gray-code order.
//! All four names are kept since callers select them independently.

/// Which low-discrepancy construction to draw from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum QuasiKind {
    Sobol,
    Halton,
    ReverseHalton,
    Niederreiter2,
}

/// A 1-D low-discrepancy sequence over `(0, 1)`. The zeroth element of each
/// construction is 0 and is skipped.
pub(crate) struct QuasiSequence {
    kind: QuasiKind,
    index: u64,
    sobol_state: u64,
}

impl QuasiSequence {
    pub(crate) fn new(kind: QuasiKind) -> Self {
        Self {
            kind,
            index: 0,
            sobol_state: 0,
        }
    }

    pub(crate) fn next_value(&mut self) -> f64 {
        self.index += 1;
        match self.kind {
            QuasiKind::Sobol => {
                self.sobol_state ^= 1u64 << (63 - self.index.trailing_zeros());
                to_unit(self.sobol_state)
            }
            QuasiKind::Halton | QuasiKind::Niederreiter2 => to_unit(self.index.reverse_bits()),
            QuasiKind::ReverseHalton => reversed_radical_inverse(2, self.index),
        }
    }
}

#[inline]
fn to_unit(bits: u64) -> f64 {
    bits as f64 / (u64::MAX as f64 + 1.0)
}

/// Radical inverse in the given base with the reverse digit permutation
/// `sigma(0) = 0`, `sigma(d) = base - d`.
fn reversed_radical_inverse(base: u64, mut n: u64) -> f64 {
    let mut inverse = 0.0;
    let mut denominator = 1.0;
    while n > 0 {
        let digit = n % base;
        let digit = if digit == 0 { 0 } else { base - digit };
        denominator *= base as f64;
        inverse += digit as f64 / denominator;
        n /= base;
    }
    inverse
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(kind: QuasiKind, n: usize) -> Vec<f64> {
        let mut seq = QuasiSequence::new(kind);
        (0..n).map(|_| seq.next_value()).collect()
    }

    #[test]
    fn sobol_emits_the_gray_code_sequence() {
        assert_eq!(
            take(QuasiKind::Sobol, 8),
            vec![0.5, 0.75, 0.25, 0.375, 0.875, 0.625, 0.125, 0.1875]
        );
    }

    #[test]
    fn halton_emits_the_base2_radical_inverse() {
        assert_eq!(
            take(QuasiKind::Halton, 7),
            vec![0.5, 0.25, 0.75, 0.125, 0.625, 0.375, 0.875]
        );
    }

    #[test]
    fn one_dimensional_constructions_coincide_where_expected() {
        assert_eq!(take(QuasiKind::Halton, 64), take(QuasiKind::ReverseHalton, 64));
        assert_eq!(take(QuasiKind::Halton, 64), take(QuasiKind::Niederreiter2, 64));
    }

    #[test]
    fn values_stay_inside_the_unit_interval() {
        for kind in [
            QuasiKind::Sobol,
            QuasiKind::Halton,
            QuasiKind::ReverseHalton,
            QuasiKind::Niederreiter2,
        ] {
            for u in take(kind, 1000) {
                assert!(u > 0.0 && u < 1.0);
            }
        }
    }

    #[test]
    fn prefixes_are_equidistributed() {
        // The first 2^k points of each construction partition [0, 1) into
        // equal dyadic cells, one point per cell.
        for kind in [QuasiKind::Sobol, QuasiKind::Halton] {
            let mut cells = vec![0u32; 16];
            for u in take(kind, 16) {
                cells[(u * 16.0) as usize] += 1;
            }
            assert!(cells.iter().all(|&c| c == 1));
        }
    }
}
