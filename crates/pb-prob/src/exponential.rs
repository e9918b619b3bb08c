//! Exponential kernel `exp(c * x)`.

use pb_core::Bracket;

/// Kernel value at a single point.
#[inline(always)]
pub fn evaluate(x: f64, c: f64) -> f64 {
    (c * x).exp()
}

/// Batch loop. `out.len()` events are computed.
pub fn compute<X: Bracket, C: Bracket>(out: &mut [f64], x: X, c: C) {
    for (i, o) in out.iter_mut().enumerate() {
        *o = evaluate(x.at(i), c.at(i));
    }
}

/// Integral of `exp(k * t)` for `t` in `[low, high]`, with `k` held constant.
///
/// Serves both integration over `x` (k = c) and over `c` (k = x).
pub fn integral(low: f64, high: f64, k: f64) -> f64 {
    if k == 0.0 {
        return high - low;
    }
    ((k * high).exp() - (k * low).exp()) / k
}
