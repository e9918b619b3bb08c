//! Small numerically-stable math utilities used across kernels and integrators.

/// Compensated (Neumaier) running sum.
///
/// Keeps the rounding error of long sums (e.g. `2^20` integrand values in a
/// refinement step) at the level of a single addition.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeumaierSum {
    sum: f64,
    compensation: f64,
}

impl NeumaierSum {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one term.
    #[inline]
    pub fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    /// Current total.
    #[inline]
    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Compensated sum of a slice.
pub fn sum_compensated(xs: &[f64]) -> f64 {
    let mut acc = NeumaierSum::new();
    for &x in xs {
        acc.add(x);
    }
    acc.value()
}

/// Evaluate `c[0] + c[1] v + ... + c[4] v^4` by Horner's rule.
#[inline(always)]
pub(crate) fn horner5(c: &[f64; 5], v: f64) -> f64 {
    c[0] + (c[1] + (c[2] + (c[3] + c[4] * v) * v) * v) * v
}
