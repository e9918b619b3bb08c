//! Landau PDF.

use super::{BatchPdf, Proxy, batch_inputs, values};
use crate::dispatch::{Kernel3, dispatch3};
use pb_core::{Bracket, Result, ValueSource};
use pb_prob::landau;

struct Kernel;

impl Kernel3 for Kernel {
    #[inline]
    fn compute<A: Bracket, B: Bracket, C: Bracket>(&self, out: &mut [f64], x: A, mean: B, sigma: C) {
        landau::compute(out, x, mean, sigma);
    }
}

/// Landau density of `(x - mean) / sigma`; zero for `sigma <= 0`.
///
/// There is no closed-form integral, so normalization is numeric.
#[derive(Debug, Clone)]
pub struct LandauPdf {
    name: String,
    proxies: [Proxy; 3],
}

impl LandauPdf {
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

impl BatchPdf for LandauPdf {
    fn name(&self) -> &str {
        &self.name
    }

    fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    fn evaluate(&self, src: &dyn ValueSource) -> Result<f64> {
        let [x, mean, sigma] = values(&self.proxies, src)?;
        Ok(landau::evaluate(x, mean, sigma))
    }

    fn evaluate_batch(&self, src: &dyn ValueSource, begin: usize, size: usize) -> Result<Vec<f64>> {
        dispatch3(&Kernel, batch_inputs(&self.proxies, src, begin, size)?)
    }
}
