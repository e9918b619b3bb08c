//! Gaussian PDF.

use super::{BatchPdf, Proxy, batch_inputs, values};
use crate::dispatch::{Kernel3, dispatch3};
use pb_core::{Bracket, Result, ValueSource};
use pb_prob::gaussian;

const X: usize = 0;
const MEAN: usize = 1;

struct Kernel;

impl Kernel3 for Kernel {
    #[inline]
    fn compute<A: Bracket, B: Bracket, C: Bracket>(&self, out: &mut [f64], x: A, mean: B, sigma: C) {
        gaussian::compute(out, x, mean, sigma);
    }
}

/// `exp(-0.5 * ((x - mean) / sigma)^2)`, integrable analytically in `x` and in `mean`.
#[derive(Debug, Clone)]
pub struct GaussianPdf {
    name: String,
    proxies: [Proxy; 3],
}

impl GaussianPdf {
    /// Bind the three inputs to variables of a [`ValueSource`].
    pub fn new(
        name: impl Into<String>,
        x: impl Into<String>,
        mean: impl Into<String>,
        sigma: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            proxies: [Proxy::new("x", x), Proxy::new("mean", mean), Proxy::new("sigma", sigma)],
        }
    }
}

impl BatchPdf for GaussianPdf {
    fn name(&self) -> &str {
        &self.name
    }

    fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    fn evaluate(&self, src: &dyn ValueSource) -> Result<f64> {
        let [x, mean, sigma] = values(&self.proxies, src)?;
        Ok(gaussian::evaluate(x, mean, sigma))
    }

    fn evaluate_batch(&self, src: &dyn ValueSource, begin: usize, size: usize) -> Result<Vec<f64>> {
        dispatch3(&Kernel, batch_inputs(&self.proxies, src, begin, size)?)
    }

    fn analytical_integral(
        &self,
        src: &dyn ValueSource,
        var: &str,
        range: (f64, f64),
    ) -> Result<Option<f64>> {
        let [x, mean, sigma] = values(&self.proxies, src)?;
        let (lo, hi) = range;
        if var == self.proxies[X].var() {
            Ok(Some(gaussian::integral(lo, hi, mean, sigma)))
        } else if var == self.proxies[MEAN].var() {
            Ok(Some(gaussian::integral(lo, hi, x, sigma)))
        } else {
            Ok(None)
        }
    }
}
