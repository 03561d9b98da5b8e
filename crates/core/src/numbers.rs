//! Small number-theory and randomness helpers shared by the generator.

use rand::Rng;

/// Greatest common divisor by Euclid's algorithm. Always non-negative;
/// `gcd(0, 0) == 0`.
#[must_use]
pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Uniform integer in the inclusive range `[min, max]`.
///
/// Returns `min` when the range is empty so callers never panic on a
/// degenerate configuration.
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    if max <= min {
        return min;
    }
    rng.random_range(min..=max)
}

/// Picks one element uniformly, or `None` for an empty slice.
pub fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let idx = rng.random_range(0..items.len());
    items.get(idx)
}
