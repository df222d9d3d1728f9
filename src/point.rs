//! Template points: fixed-dimension views of a signal plus a multiplicity
//! count, and the extraction routines that produce them.

use std::cmp::Ordering;

use array_init::array_init;

use crate::errors::SampenError;
use crate::types::Axis;

/// A `K`-dimensional template drawn from a signal, carrying a multiplicity
/// count.
///
/// Count is 1 for an ordinary template. 0 marks a disabled point: auxiliary
/// padding that participates in sorting but never in counting. The grouped
/// sampling path also uses counts above 1 to fold repeated draws of the same
/// template into one leaf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KdPoint<A, const K: usize> {
    pub(crate) coords: [A; K],
    pub(crate) count: i32,
}

impl<A: Axis, const K: usize> KdPoint<A, K> {
    /// A point with the given coordinates and multiplicity.
    pub fn new(coords: [A; K], count: i32) -> Self {
        Self { coords, count }
    }

    /// Multiplicity of this template.
    #[inline]
    pub fn count(&self) -> i32 {
        self.count
    }

    /// Lexicographic comparison over the full coordinate tuple, using the
    /// axis total order.
    #[inline]
    pub(crate) fn lex_cmp(&self, other: &Self) -> Ordering {
        for j in 0..K {
            match self.coords[j].cmp_axis(&other.coords[j]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

/// Extracts the `K`-length templates of `data`: one point per window
/// `(data[i], ..., data[i + K - 1])`, each with the given count.
pub(crate) fn templates<A: Axis, const K: usize>(
    data: &[A],
    count: i32,
) -> Result<Vec<KdPoint<A, K>>, SampenError> {
    if data.len() <= K {
        return Err(SampenError::ShortInput {
            n: data.len(),
            m: K as u32,
        });
    }
    Ok((0..=data.len() - K)
        .map(|i| KdPoint::new(array_init(|j| data[i + j]), count))
        .collect())
}

/// Extracts `K`-length templates from `data` extended with `aux` copies of its
/// minimum value.
///
/// The padding makes the point array exactly `data.len() + aux - K + 1` long,
/// which simplifies downstream rank arithmetic. Every window that reads a
/// padded value (the final `aux` points) is created with count 0 and is never
/// opened by any controller.
pub(crate) fn padded_templates<A: Axis, const K: usize>(
    data: &[A],
    aux: usize,
) -> Result<Vec<KdPoint<A, K>>, SampenError> {
    if data.len() <= K {
        return Err(SampenError::ShortInput {
            n: data.len(),
            m: K as u32,
        });
    }
    let minimum = data
        .iter()
        .copied()
        .min_by(|a, b| a.cmp_axis(b))
        .unwrap_or_default();
    let mut padded = Vec::with_capacity(data.len() + aux);
    padded.extend_from_slice(data);
    padded.extend(std::iter::repeat(minimum).take(aux));

    let mut points = templates::<A, K>(&padded, 1)?;
    let n = points.len();
    for point in &mut points[n - aux..] {
        point.count = 0;
    }
    Ok(points)
}
