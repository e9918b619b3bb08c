//! Un-normalized Gaussian kernel `exp(-0.5 * ((x - mean) / sigma)^2)`.
//!
//! The `1/(sqrt(2π) sigma)` factor is left to normalization ([`integral`]).
//! `sigma == 0` is outside the contract and propagates inf/NaN.

use pb_core::Bracket;
use statrs::function::erf::erfc;
use std::f64::consts::{PI, SQRT_2};

/// Kernel value at a single point.
#[inline(always)]
pub fn evaluate(x: f64, mean: f64, sigma: f64) -> f64 {
    let arg = x - mean;
    (-0.5 * arg * arg / (sigma * sigma)).exp()
}

/// Batch loop. `out.len()` events are computed.
pub fn compute<X: Bracket, M: Bracket, S: Bracket>(out: &mut [f64], x: X, mean: M, sigma: S) {
    for (i, o) in out.iter_mut().enumerate() {
        *o = evaluate(x.at(i), mean.at(i), sigma.at(i));
    }
}

/// Integral of the kernel over `[low, high]` in the variable whose partner is
/// `center` (the kernel is symmetric in `x` and `mean`).
///
/// All integrals are computed in the upper tail where `erfc` is most precise;
/// lower-hemisphere limits are mirrored via `erfc(-z) = 2 - erfc(z)`. A zero
/// result is replaced by `1e-300` so callers can divide by it.
pub fn integral(low: f64, high: f64, center: f64, sigma: f64) -> f64 {
    let result_scale = (2.0 * PI).sqrt() * sigma;
    let scale = SQRT_2 * sigma;
    let zmin = (low - center) / scale;
    let zmax = (high - center) / scale;

    let ecmin = erfc(zmin.abs());
    let ecmax = erfc(zmax.abs());

    let result = result_scale
        * 0.5
        * if zmin * zmax < 0.0 {
            2.0 - (ecmin + ecmax)
        } else if zmax <= 0.0 {
            ecmax - ecmin
        } else {
            ecmin - ecmax
        };

    if result != 0.0 { result } else { 1e-300 }
}
