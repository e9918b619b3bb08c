//! Bin-averaged wrapper around a continuous PDF.
//!
//! [`BinSamplingPdf`] replaces the value of a PDF at `x` by the average of the
//! normalized PDF over the bin of the observable's binning containing `x`.
//! This is what a binned fit of a continuous model should compare against a
//! histogram with: bin contents, not point values at bin centers.

use crate::config::IntegratorConfig;
use crate::integrator::Integrator1D;
use crate::pdf::{BatchPdf, PdfIntegrand, Proxy, integral_over, observable_range, resolve_inputs};
use crate::run_context::EventBinding;
use pb_core::types::bin_index_in;
use pb_core::{BatchInput, Error, EvaluateInfo, Result, ValueSource};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};

/// Default relative precision of the bin integrals.
pub const DEFAULT_EPSILON: f64 = 1e-5;

#[derive(Debug)]
struct CachedBoundaries {
    generation: u64,
    boundaries: Arc<[f64]>,
}

/// A PDF whose value is the bin average of a wrapped PDF.
///
/// The result is self-normalized: summing `value * bin_width` over all bins
/// gives 1 when the binning covers the observable's range. Events outside the
/// binning evaluate to 0.
pub struct BinSamplingPdf {
    name: String,
    observable: String,
    pdf: Arc<dyn BatchPdf>,
    proxies: Vec<Proxy>,
    integrator: IntegratorConfig,
    cache: Mutex<Option<CachedBoundaries>>,
}

impl std::fmt::Debug for BinSamplingPdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinSamplingPdf")
            .field("name", &self.name)
            .field("observable", &self.observable)
            .field("pdf", &self.pdf.name())
            .field("integrator", &self.integrator)
            .finish()
    }
}

impl BinSamplingPdf {
    /// Wrap `pdf`, sampling it in bins of `observable`.
    ///
    /// `epsilon` is the relative precision of the bin integrals. Fails with
    /// [`Error::InvalidArgument`] if `pdf` does not depend on `observable`.
    pub fn new(
        name: impl Into<String>,
        observable: impl Into<String>,
        pdf: Arc<dyn BatchPdf>,
        epsilon: f64,
    ) -> Result<Self> {
        let name = name.into();
        let observable = observable.into();
        if !pdf.depends_on(&observable) {
            return Err(Error::InvalidArgument(format!(
                "BinSamplingPdf({name}): the PDF {} needs to depend on the observable {observable}",
                pdf.name()
            )));
        }
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(Error::Validation(format!(
                "BinSamplingPdf({name}): epsilon must be finite and > 0, got {epsilon}"
            )));
        }

        let mut proxies = vec![Proxy::new("observable", observable.clone())];
        proxies.extend(pdf.proxies().iter().filter(|p| p.var() != observable).cloned());

        Ok(Self {
            name,
            observable,
            pdf,
            proxies,
            integrator: IntegratorConfig { eps_rel: epsilon, ..IntegratorConfig::default() },
            cache: Mutex::new(None),
        })
    }

    /// Observable the PDF is sampled in.
    pub fn observable(&self) -> &str {
        &self.observable
    }

    /// Wrapped PDF.
    pub fn pdf(&self) -> &Arc<dyn BatchPdf> {
        &self.pdf
    }

    /// Configuration of the bin integrals.
    pub fn integrator_config(&self) -> &IntegratorConfig {
        &self.integrator
    }

    /// Mutable configuration of the bin integrals.
    pub fn integrator_config_mut(&mut self) -> &mut IntegratorConfig {
        &mut self.integrator
    }

    /// Sorted bin edges of the observable's current binning.
    ///
    /// The edges are cached and shared: as long as the binning keeps its
    /// generation, every call returns the same allocation.
    pub fn bin_boundaries(&self, src: &dyn ValueSource) -> Result<Arc<[f64]>> {
        let binning = src.binning(&self.observable).ok_or_else(|| {
            Error::Validation(format!(
                "BinSamplingPdf({}): observable {} has no binning",
                self.name, self.observable
            ))
        })?;

        let mut cache = self.cache.lock().map_err(|_| {
            Error::Computation(format!("BinSamplingPdf({}): boundary cache poisoned", self.name))
        })?;
        if let Some(cached) = cache.as_ref() {
            if cached.generation == binning.generation() {
                return Ok(Arc::clone(&cached.boundaries));
            }
        }

        let boundaries: Arc<[f64]> = Arc::from(binning.boundaries());
        debug_assert!(boundaries.windows(2).all(|w| w[0] < w[1]));
        log::debug!(
            "BinSamplingPdf({}): {} bin boundaries for {} (generation {})",
            self.name,
            boundaries.len(),
            self.observable,
            binning.generation()
        );
        *cache = Some(CachedBoundaries {
            generation: binning.generation(),
            boundaries: Arc::clone(&boundaries),
        });
        Ok(boundaries)
    }

    /// Normalization of the wrapped PDF over the observable's range.
    ///
    /// NaN passes through: it comes from parameters outside the domain.
    fn normalization(&self, src: &dyn ValueSource) -> Result<f64> {
        let range = observable_range(src, &self.observable)?;
        let norm = integral_over(self.pdf.as_ref(), src, &self.observable, range, &self.integrator)?;
        if !(norm.is_nan() || (norm > 0.0 && norm.is_finite())) {
            return Err(Error::Computation(format!(
                "BinSamplingPdf({}): normalization of {} is {norm}",
                self.name,
                self.pdf.name()
            )));
        }
        Ok(norm)
    }

    /// Average of the un-normalized wrapped PDF over `[lo, hi]`.
    fn bin_average(
        &self,
        integrator: &mut Integrator1D,
        integrand: &PdfIntegrand<'_>,
        lo: f64,
        hi: f64,
    ) -> Result<f64> {
        let r = integrator.integral_batch(|xs, ys| integrand.eval_batch(xs, ys), lo, hi)?;
        Ok(r.value / (hi - lo))
    }
}

impl BatchPdf for BinSamplingPdf {
    fn name(&self) -> &str {
        &self.name
    }

    fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    fn evaluate(&self, src: &dyn ValueSource) -> Result<f64> {
        let x = self.proxies[0].value(src)?;
        let boundaries = self.bin_boundaries(src)?;
        let Some(bin) = bin_index_in(&boundaries, x) else {
            return Ok(0.0);
        };
        let (lo, hi) = (boundaries[bin], boundaries[bin + 1]);

        let norm = self.normalization(src)?;
        let integrand = PdfIntegrand::new(self.pdf.as_ref(), src, &self.observable);
        let mut integrator = Integrator1D::new(self.integrator)?;
        let r = integrator.try_integral(|t| integrand.eval(t), lo, hi)?;
        Ok(r.value / (hi - lo) / norm)
    }

    fn evaluate_batch(&self, src: &dyn ValueSource, begin: usize, size: usize) -> Result<Vec<f64>> {
        let inputs = resolve_inputs(&self.proxies, src, begin, size)?;
        let info = EvaluateInfo::of(&inputs);
        if info.n_batched == 0 {
            return Err(Error::Logic(format!(
                "BinSamplingPdf({}): requested a batch computation, but no batch data available",
                self.name
            )));
        }

        let boundaries = self.bin_boundaries(src)?;
        let mut integrator = Integrator1D::new(self.integrator)?;
        let (x, params) = (inputs[0], &inputs[1..]);
        let mut out = Vec::with_capacity(info.size);

        if !params.iter().any(BatchInput::is_batched) {
            let norm = self.normalization(src)?;
            let integrand = PdfIntegrand::new(self.pdf.as_ref(), src, &self.observable);
            // Each bin is integrated at most once per call.
            let mut averages: Vec<Option<f64>> = vec![None; boundaries.len() - 1];
            for i in 0..info.size {
                let Some(bin) = bin_index_in(&boundaries, x.get(i)) else {
                    out.push(0.0);
                    continue;
                };
                let avg = match averages[bin] {
                    Some(v) => v,
                    None => {
                        let (lo, hi) = (boundaries[bin], boundaries[bin + 1]);
                        let v = self.bin_average(&mut integrator, &integrand, lo, hi)?;
                        averages[bin] = Some(v);
                        v
                    }
                };
                out.push(avg / norm);
            }
            return Ok(out);
        }

        // Parameters vary per event: integrals are shared between events with
        // the same bin and the same parameter values.
        let names: Vec<&str> = self.proxies[1..].iter().map(Proxy::var).collect();
        let mut values = vec![0.0; params.len()];
        let mut norms: HashMap<Vec<u64>, f64> = HashMap::new();
        let mut averages: HashMap<(usize, Vec<u64>), f64> = HashMap::new();
        for i in 0..info.size {
            let Some(bin) = bin_index_in(&boundaries, x.get(i)) else {
                out.push(0.0);
                continue;
            };
            for (v, p) in values.iter_mut().zip(params) {
                *v = p.get(i);
            }
            let key: Vec<u64> = values.iter().map(|v| v.to_bits()).collect();
            let event = EventBinding::new(src, &names, &values);

            let norm = match norms.entry(key.clone()) {
                Entry::Occupied(e) => *e.get(),
                Entry::Vacant(e) => *e.insert(self.normalization(&event)?),
            };
            let avg = match averages.entry((bin, key)) {
                Entry::Occupied(e) => *e.get(),
                Entry::Vacant(e) => {
                    let integrand = PdfIntegrand::new(self.pdf.as_ref(), &event, &self.observable);
                    let (lo, hi) = (boundaries[bin], boundaries[bin + 1]);
                    *e.insert(self.bin_average(&mut integrator, &integrand, lo, hi)?)
                }
            };
            out.push(avg / norm);
        }
        log::debug!(
            "BinSamplingPdf({}): {} events with per-event parameters, {} bin integrals",
            self.name,
            out.len(),
            averages.len()
        );
        Ok(out)
    }

    fn is_self_normalized(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{ExponentialPdf, GaussianPdf};
    use crate::run_context::{ObservableSpec, RunContext};
    use approx::assert_relative_eq;
    use pb_core::Binning;

    fn ctx() -> RunContext {
        let mut ctx = RunContext::from_observables(
            vec![ObservableSpec::uniform("x", (-4.0, 4.0), 8).unwrap()],
            vec![("x".into(), vec![-3.5, -0.1, 0.2, 0.9, 3.99])],
        )
        .unwrap();
        ctx.set_value("mu", 0.0);
        ctx.set_value("sigma", 1.0);
        ctx
    }

    fn gaussian_sampler() -> BinSamplingPdf {
        let pdf: Arc<dyn BatchPdf> = Arc::new(GaussianPdf::new("g", "x", "mu", "sigma"));
        BinSamplingPdf::new("g_binned", "x", pdf, DEFAULT_EPSILON).unwrap()
    }

    #[test]
    fn test_requires_dependency_on_observable() {
        let pdf: Arc<dyn BatchPdf> = Arc::new(GaussianPdf::new("g", "y", "mu", "sigma"));
        let err = BinSamplingPdf::new("b", "x", pdf, DEFAULT_EPSILON).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("needs to depend on the observable x"));
    }

    #[test]
    fn test_proxies_include_wrapped_inputs() {
        let b = gaussian_sampler();
        let vars: Vec<&str> = b.proxies().iter().map(Proxy::var).collect();
        assert_eq!(vars, vec!["x", "mu", "sigma"]);
        assert!(b.depends_on("sigma"));
        assert!(b.is_self_normalized());
    }

    #[test]
    fn test_boundaries_cached_per_generation() {
        let mut c = ctx();
        let b = gaussian_sampler();
        let first = b.bin_boundaries(&c).unwrap();
        let second = b.bin_boundaries(&c).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 9);
        assert_eq!(b.evaluate(&c).unwrap().to_bits(), b.evaluate(&c).unwrap().to_bits());

        c.set_binning("x", Binning::uniform(4, -4.0, 4.0).unwrap());
        let third = b.bin_boundaries(&c).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(&third[..], &[-4.0, -2.0, 0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_uniform_pdf_bin_average_is_flat() {
        let mut c = ctx();
        c.set_value("c", 0.0);
        let pdf: Arc<dyn BatchPdf> = Arc::new(ExponentialPdf::new("e", "x", "c"));
        let b = BinSamplingPdf::new("e_binned", "x", pdf, DEFAULT_EPSILON).unwrap();
        let values = b.evaluate_batch(&c, 0, 5).unwrap();
        for v in values {
            assert_relative_eq!(v, 0.125, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_bins_sum_to_one() {
        let mut c = ctx();
        let b = gaussian_sampler();
        let boundaries = b.bin_boundaries(&c).unwrap();
        let mut total = 0.0;
        for w in boundaries.windows(2) {
            c.set_value("x", 0.5 * (w[0] + w[1]));
            total += b.evaluate(&c).unwrap() * (w[1] - w[0]);
        }
        assert_relative_eq!(total, 1.0, max_relative = 1e-5);
    }

    #[test]
    fn test_outside_binning_is_zero() {
        let mut c = ctx();
        c.set_bounds("x", (-10.0, 10.0)).unwrap();
        c.set_value("x", 7.0);
        let b = gaussian_sampler();
        assert_eq!(b.evaluate(&c).unwrap(), 0.0);
        c.set_column("x", vec![-9.0, 0.5, 9.0]);
        let out = b.evaluate_batch(&c, 0, 3).unwrap();
        assert_eq!(out[0], 0.0);
        assert_eq!(out[2], 0.0);
        assert!(out[1] > 0.0);
    }

    #[test]
    fn test_batch_matches_scalar() {
        let mut c = ctx();
        let b = gaussian_sampler();
        let batch = b.evaluate_batch(&c, 0, 5).unwrap();
        // Events in the same bin share one value.
        assert_eq!(batch[2], batch[3]);
        for (i, x) in [-3.5, -0.1, 0.2, 0.9, 3.99].into_iter().enumerate() {
            c.set_value("x", x);
            assert_relative_eq!(batch[i], b.evaluate(&c).unwrap(), max_relative = 1e-6);
        }
    }

    fn scalar_at(c: &RunContext, i: usize) -> RunContext {
        let mut point = c.clone();
        for var in ["x", "mu"] {
            if let Some(col) = point.remove_column(var) {
                point.set_value(var, col[i]);
            }
        }
        point
    }

    #[test]
    fn test_per_event_parameters_match_scalar() {
        let mut c = ctx();
        c.set_column("x", vec![0.2, 0.2, 0.3]);
        c.set_column("mu", vec![-2.0, 2.0, -2.0]);
        let b = gaussian_sampler();
        let batch = b.evaluate_batch(&c, 0, 3).unwrap();
        assert_eq!(batch.len(), 3);
        for (i, v) in batch.iter().enumerate() {
            let expected = b.evaluate(&scalar_at(&c, i)).unwrap();
            assert_relative_eq!(*v, expected, max_relative = 1e-12);
        }
        assert!(batch[1] > batch[0]);
        // Same bin and same parameters share one integral.
        assert_eq!(batch[0], batch[2]);
    }

    #[test]
    fn test_parameter_only_batch() {
        let mut c = ctx();
        c.remove_column("x");
        c.set_value("x", 0.2);
        c.set_column("mu", vec![-2.0, 2.0]);
        let b = gaussian_sampler();
        let batch = b.evaluate_batch(&c, 0, 2).unwrap();
        assert_eq!(batch.len(), 2);
        for (i, v) in batch.iter().enumerate() {
            let expected = b.evaluate(&scalar_at(&c, i)).unwrap();
            assert_relative_eq!(*v, expected, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_scalar_only_batch_is_logic_error() {
        let mut c = ctx();
        c.remove_column("x");
        let b = gaussian_sampler();
        assert!(matches!(b.evaluate_batch(&c, 0, 5), Err(Error::Logic(_))));
    }

    #[test]
    fn test_missing_binning() {
        let mut c = RunContext::new();
        c.set_value("x", 0.0);
        c.set_value("mu", 0.0);
        c.set_value("sigma", 1.0);
        c.set_bounds("x", (-1.0, 1.0)).unwrap();
        let b = gaussian_sampler();
        assert!(matches!(b.evaluate(&c), Err(Error::Validation(_))));
    }

    #[test]
    fn test_integrator_config_is_adjustable() {
        let mut b = gaussian_sampler();
        assert_eq!(b.integrator_config().eps_rel, DEFAULT_EPSILON);
        b.integrator_config_mut().rule = crate::config::SummationRule::Midpoint;
        let c = ctx();
        let mid = b.evaluate(&c).unwrap();
        let expected = gaussian_sampler().evaluate(&c).unwrap();
        assert_relative_eq!(mid, expected, max_relative = 1e-5);
    }
}
