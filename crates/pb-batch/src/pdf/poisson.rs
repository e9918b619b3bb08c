//! Poisson PDF.

use super::{BatchPdf, Proxy, batch_inputs, values};
use crate::dispatch::{Kernel2, dispatch2};
use pb_core::{BatchInput, Bracket, Result, ValueSource};
use pb_prob::poisson;

const X: usize = 0;
const MEAN: usize = 1;

struct Kernel {
    protect_negative_mean: bool,
}

impl Kernel2 for Kernel {
    #[inline]
    fn compute<A: Bracket, B: Bracket>(&self, out: &mut [f64], x: A, mean: B) {
        poisson::compute(out, x, mean, self.protect_negative_mean);
    }
}

/// Poisson probability of `x` counts given `mean`.
///
/// By default `x` is rounded down to an integer count in both the scalar and
/// the batch path. With negative-mean protection enabled, a negative mean
/// yields a small constant instead of NaN.
#[derive(Debug, Clone)]
pub struct PoissonPdf {
    name: String,
    proxies: [Proxy; 2],
    no_rounding: bool,
    protect_negative_mean: bool,
}

impl PoissonPdf {
    /// Bind the count `x` and `mean`.
    pub fn new(name: impl Into<String>, x: impl Into<String>, mean: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            proxies: [Proxy::new("x", x), Proxy::new("mean", mean)],
            no_rounding: false,
            protect_negative_mean: false,
        }
    }

    /// Evaluate at non-integer `x` through the Gamma function instead of
    /// rounding it down.
    pub fn with_no_rounding(mut self, no_rounding: bool) -> Self {
        self.no_rounding = no_rounding;
        self
    }

    /// Return a small positive constant for negative means.
    pub fn with_protect_negative_mean(mut self, protect: bool) -> Self {
        self.protect_negative_mean = protect;
        self
    }

    fn count(&self, x: f64) -> f64 {
        if self.no_rounding { x } else { x.floor() }
    }
}

impl BatchPdf for PoissonPdf {
    fn name(&self) -> &str {
        &self.name
    }

    fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    fn evaluate(&self, src: &dyn ValueSource) -> Result<f64> {
        let [x, mean] = values(&self.proxies, src)?;
        Ok(poisson::evaluate(self.count(x), mean, self.protect_negative_mean))
    }

    fn evaluate_batch(&self, src: &dyn ValueSource, begin: usize, size: usize) -> Result<Vec<f64>> {
        let [x, mean] = batch_inputs(&self.proxies, src, begin, size)?;
        let kernel = Kernel { protect_negative_mean: self.protect_negative_mean };
        if self.no_rounding {
            return dispatch2(&kernel, [x, mean]);
        }
        match x {
            BatchInput::Batched(span) => {
                let counts: Vec<f64> = span.iter().map(|v| v.floor()).collect();
                dispatch2(&kernel, [BatchInput::Batched(&counts), mean])
            }
            BatchInput::Scalar(v) => dispatch2(&kernel, [BatchInput::Scalar(v.floor()), mean]),
        }
    }

    fn analytical_integral(
        &self,
        src: &dyn ValueSource,
        var: &str,
        range: (f64, f64),
    ) -> Result<Option<f64>> {
        let [x, mean] = values(&self.proxies, src)?;
        let (lo, hi) = range;
        if var == self.proxies[X].var() {
            if self.protect_negative_mean && mean < 0.0 {
                return Ok(Some((-2.0 * mean).exp()));
            }
            Ok(Some(poisson::integral_x(lo, hi, mean)))
        } else if var == self.proxies[MEAN].var() {
            if self.protect_negative_mean && mean < 0.0 {
                return Ok(Some((-2.0 * mean).exp()));
            }
            Ok(Some(poisson::integral_mean(self.count(x), lo, hi)))
        } else {
            Ok(None)
        }
    }
}
