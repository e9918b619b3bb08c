//! Exponential PDF.

use super::{BatchPdf, Proxy, batch_inputs, values};
use crate::dispatch::{Kernel2, dispatch2};
use pb_core::{Bracket, Result, ValueSource};
use pb_prob::exponential;

struct Kernel;

impl Kernel2 for Kernel {
    #[inline]
    fn compute<A: Bracket, B: Bracket>(&self, out: &mut [f64], x: A, c: B) {
        exponential::compute(out, x, c);
    }
}

/// `exp(c * x)`.
#[derive(Debug, Clone)]
pub struct ExponentialPdf {
    name: String,
    proxies: [Proxy; 2],
}

impl ExponentialPdf {
    /// Bind `x` and the slope `c`.
    pub fn new(name: impl Into<String>, x: impl Into<String>, c: impl Into<String>) -> Self {
        Self { name: name.into(), proxies: [Proxy::new("x", x), Proxy::new("c", c)] }
    }
}

impl BatchPdf for ExponentialPdf {
    fn name(&self) -> &str {
        &self.name
    }

    fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    fn evaluate(&self, src: &dyn ValueSource) -> Result<f64> {
        let [x, c] = values(&self.proxies, src)?;
        Ok(exponential::evaluate(x, c))
    }

    fn evaluate_batch(&self, src: &dyn ValueSource, begin: usize, size: usize) -> Result<Vec<f64>> {
        dispatch2(&Kernel, batch_inputs(&self.proxies, src, begin, size)?)
    }

    fn analytical_integral(
        &self,
        src: &dyn ValueSource,
        var: &str,
        range: (f64, f64),
    ) -> Result<Option<f64>> {
        let [x, c] = values(&self.proxies, src)?;
        let (lo, hi) = range;
        if var == self.proxies[0].var() {
            Ok(Some(exponential::integral(lo, hi, c)))
        } else if var == self.proxies[1].var() {
            Ok(Some(exponential::integral(lo, hi, x)))
        } else {
            Ok(None)
        }
    }
}
