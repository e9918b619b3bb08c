//! Batch-capable PDF objects.
//!
//! A PDF names its inputs through [`Proxy`] handles and resolves them from a
//! [`ValueSource`] at evaluation time. Every PDF supports both a scalar path
//! (current values) and a batch path (per-event spans), and the two agree
//! exactly on every event.

use crate::config::IntegratorConfig;
use crate::integrator::Integrator1D;
use crate::run_context::{ColumnBinding, ScopedBinding};
use pb_core::{BatchInput, Error, Result, ValueSource};

mod exponential;
mod gaussian;
mod landau;
mod poisson;

pub use exponential::ExponentialPdf;
pub use gaussian::GaussianPdf;
pub use landau::LandauPdf;
pub use poisson::PoissonPdf;

/// Named handle to one input of a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    role: &'static str,
    var: String,
}

impl Proxy {
    /// Bind the parameter `role` of a PDF to the variable `var`.
    pub fn new(role: &'static str, var: impl Into<String>) -> Self {
        Self { role, var: var.into() }
    }

    /// Parameter role inside the PDF (e.g. `"mean"`).
    pub fn role(&self) -> &'static str {
        self.role
    }

    /// Name of the bound variable.
    pub fn var(&self) -> &str {
        &self.var
    }

    /// Current scalar value.
    pub fn value(&self, src: &dyn ValueSource) -> Result<f64> {
        src.value(&self.var).ok_or_else(|| {
            Error::Validation(format!("no value for '{}' (bound as {})", self.var, self.role))
        })
    }

    /// Span data for `[begin, begin + size)`, or the scalar value if the
    /// variable has none.
    pub fn batch<'s>(
        &self,
        src: &'s dyn ValueSource,
        begin: usize,
        size: usize,
    ) -> Result<BatchInput<'s>> {
        match src.batch(&self.var, begin, size) {
            Some(span) if !span.is_empty() => Ok(BatchInput::Batched(span)),
            _ => Ok(BatchInput::Scalar(self.value(src)?)),
        }
    }
}

/// Scalar values of all proxies.
pub(crate) fn values<const N: usize>(
    proxies: &[Proxy; N],
    src: &dyn ValueSource,
) -> Result<[f64; N]> {
    let mut out = [0.0; N];
    for (o, p) in out.iter_mut().zip(proxies) {
        *o = p.value(src)?;
    }
    Ok(out)
}

/// Cut every span to the evaluable range of the call.
///
/// A span that ends inside the requested range bounds it, even when only one
/// of its events is left. Only a length-1 column read from its start
/// broadcasts.
fn clip_to_evaluable(inputs: &mut [BatchInput<'_>], begin: usize) {
    let limit = inputs
        .iter()
        .filter_map(|input| match input {
            BatchInput::Batched(s) if s.len() > 1 || begin > 0 => Some(s.len()),
            _ => None,
        })
        .min();
    let Some(limit) = limit else {
        return;
    };
    for input in inputs.iter_mut() {
        if let BatchInput::Batched(s) = *input {
            if s.len() > limit {
                *input = BatchInput::Batched(&s[..limit]);
            }
        }
    }
}

/// Batch inputs of all proxies.
pub(crate) fn batch_inputs<'s, const N: usize>(
    proxies: &[Proxy; N],
    src: &'s dyn ValueSource,
    begin: usize,
    size: usize,
) -> Result<[BatchInput<'s>; N]> {
    let mut out = [BatchInput::Scalar(0.0); N];
    for (o, p) in out.iter_mut().zip(proxies) {
        *o = p.batch(src, begin, size)?;
    }
    clip_to_evaluable(&mut out, begin);
    Ok(out)
}

/// Batch inputs of any number of proxies.
pub(crate) fn resolve_inputs<'s>(
    proxies: &[Proxy],
    src: &'s dyn ValueSource,
    begin: usize,
    size: usize,
) -> Result<Vec<BatchInput<'s>>> {
    let mut out = proxies.iter().map(|p| p.batch(src, begin, size)).collect::<Result<Vec<_>>>()?;
    clip_to_evaluable(&mut out, begin);
    Ok(out)
}

/// A probability density that can be evaluated per point or per batch.
///
/// Values are un-normalized unless [`BatchPdf::is_self_normalized`] is true;
/// see [`normalized_value`].
pub trait BatchPdf: Send + Sync {
    /// Instance name, used in log and error messages.
    fn name(&self) -> &str;

    /// All inputs of this PDF.
    fn proxies(&self) -> &[Proxy];

    /// True if any input is bound to `var`.
    fn depends_on(&self, var: &str) -> bool {
        self.proxies().iter().any(|p| p.var() == var)
    }

    /// Value at the current scalar values of all inputs.
    fn evaluate(&self, src: &dyn ValueSource) -> Result<f64>;

    /// Values for the events `[begin, begin + size)`.
    ///
    /// Inputs with span data vary per event, all others broadcast their scalar
    /// value. The result has one entry per evaluable event (the shortest span
    /// wins). Fails with [`Error::Logic`] if no input has span data.
    fn evaluate_batch(&self, src: &dyn ValueSource, begin: usize, size: usize) -> Result<Vec<f64>>;

    /// Closed-form integral over `range` of `var`, if one is known.
    fn analytical_integral(
        &self,
        _src: &dyn ValueSource,
        _var: &str,
        _range: (f64, f64),
    ) -> Result<Option<f64>> {
        Ok(None)
    }

    /// True if [`BatchPdf::evaluate`] already returns normalized values.
    fn is_self_normalized(&self) -> bool {
        false
    }
}

/// Adapter presenting a PDF as a function of one variable.
///
/// All other inputs keep their current scalar values; the shared source is
/// never modified.
pub struct PdfIntegrand<'a> {
    pdf: &'a dyn BatchPdf,
    src: &'a dyn ValueSource,
    var: &'a str,
}

impl<'a> PdfIntegrand<'a> {
    /// View `pdf` as a function of `var`.
    pub fn new(pdf: &'a dyn BatchPdf, src: &'a dyn ValueSource, var: &'a str) -> Self {
        Self { pdf, src, var }
    }

    /// Value at `x`.
    pub fn eval(&self, x: f64) -> Result<f64> {
        self.pdf.evaluate(&ScopedBinding::new(self.src, self.var, x))
    }

    /// Values at all `xs`, through the batch path.
    pub fn eval_batch(&self, xs: &[f64], out: &mut [f64]) -> Result<()> {
        let bound = ColumnBinding::new(self.src, self.var, xs);
        let values = self.pdf.evaluate_batch(&bound, 0, xs.len())?;
        if values.len() != out.len() {
            return Err(Error::Computation(format!(
                "{}: integrand returned {} values for {} points",
                self.pdf.name(),
                values.len(),
                out.len()
            )));
        }
        out.copy_from_slice(&values);
        Ok(())
    }
}

/// Support of `var`: its bounds, else the extent of its binning.
pub fn observable_range(src: &dyn ValueSource, var: &str) -> Result<(f64, f64)> {
    if let Some(bounds) = src.bounds(var) {
        return Ok(bounds);
    }
    if let Some(binning) = src.binning(var) {
        let b = binning.boundaries();
        return Ok((b[0], b[b.len() - 1]));
    }
    Err(Error::Validation(format!("observable '{var}' has neither bounds nor binning")))
}

/// Integral of `pdf` over `range` of `var`.
///
/// Uses the closed form when the PDF has one, otherwise integrates the batch
/// path numerically with `config`.
pub fn integral_over(
    pdf: &dyn BatchPdf,
    src: &dyn ValueSource,
    var: &str,
    range: (f64, f64),
    config: &IntegratorConfig,
) -> Result<f64> {
    if let Some(v) = pdf.analytical_integral(src, var, range)? {
        return Ok(v);
    }
    let (lo, hi) = range;
    if !(lo.is_finite() && hi.is_finite()) {
        return Err(Error::Validation(format!(
            "{}: numeric integration over '{var}' needs a finite range, got ({lo}, {hi})",
            pdf.name()
        )));
    }
    let integrand = PdfIntegrand::new(pdf, src, var);
    let mut integrator = Integrator1D::new(*config)?;
    let r = integrator.integral_batch(|xs, ys| integrand.eval_batch(xs, ys), lo, hi)?;
    Ok(r.value)
}

/// Normalization integral of `pdf` over the support of `var`.
pub fn normalization_integral(
    pdf: &dyn BatchPdf,
    src: &dyn ValueSource,
    var: &str,
    config: &IntegratorConfig,
) -> Result<f64> {
    let range = observable_range(src, var)?;
    integral_over(pdf, src, var, range, config)
}

/// NaN passes through: it comes from parameters outside the domain.
fn checked_norm(pdf: &dyn BatchPdf, norm: f64) -> Result<f64> {
    if norm.is_nan() || (norm > 0.0 && norm.is_finite()) {
        Ok(norm)
    } else {
        Err(Error::Computation(format!(
            "{}: normalization integral is {norm}",
            pdf.name()
        )))
    }
}

/// Value of `pdf` normalized over `var`.
pub fn normalized_value(
    pdf: &dyn BatchPdf,
    src: &dyn ValueSource,
    var: &str,
    config: &IntegratorConfig,
) -> Result<f64> {
    let value = pdf.evaluate(src)?;
    if pdf.is_self_normalized() {
        return Ok(value);
    }
    let norm = checked_norm(pdf, normalization_integral(pdf, src, var, config)?)?;
    Ok(value / norm)
}

/// Batch values of `pdf` normalized over `var`.
///
/// The normalization is computed once, at the current scalar values.
pub fn normalized_batch(
    pdf: &dyn BatchPdf,
    src: &dyn ValueSource,
    var: &str,
    begin: usize,
    size: usize,
    config: &IntegratorConfig,
) -> Result<Vec<f64>> {
    let mut values = pdf.evaluate_batch(src, begin, size)?;
    if pdf.is_self_normalized() {
        return Ok(values);
    }
    let norm = checked_norm(pdf, normalization_integral(pdf, src, var, config)?)?;
    for v in &mut values {
        *v /= norm;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_context::{ObservableSpec, RunContext};
    use approx::assert_relative_eq;

    fn gaussian_ctx() -> RunContext {
        let mut ctx = RunContext::from_observables(
            vec![ObservableSpec::new("x", (-3.0, 5.0))],
            vec![("x".into(), vec![-1.0, 0.0, 1.5, 4.0])],
        )
        .unwrap();
        ctx.set_value("mu", 1.0);
        ctx.set_value("sigma", 1.5);
        ctx
    }

    #[test]
    fn test_proxy_falls_back_to_scalar() {
        let ctx = gaussian_ctx();
        let p = Proxy::new("mean", "mu");
        assert_eq!(p.batch(&ctx, 0, 4).unwrap(), BatchInput::Scalar(1.0));
        let x = Proxy::new("x", "x");
        assert!(x.batch(&ctx, 0, 4).unwrap().is_batched());
        // Beyond the column end the scalar value takes over.
        assert_eq!(x.batch(&ctx, 10, 4).unwrap(), BatchInput::Scalar(1.0));
        let missing = Proxy::new("sigma", "nope");
        assert!(matches!(missing.value(&ctx), Err(Error::Validation(_))));
    }

    #[test]
    fn test_integrand_scalar_and_batch_agree() {
        let ctx = gaussian_ctx();
        let pdf = GaussianPdf::new("g", "x", "mu", "sigma");
        let integrand = PdfIntegrand::new(&pdf, &ctx, "x");
        let xs = [-2.0, 0.5, 1.0, 3.25];
        let mut ys = [0.0; 4];
        integrand.eval_batch(&xs, &mut ys).unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert_eq!(*y, integrand.eval(*x).unwrap());
        }
    }

    #[test]
    fn test_numeric_matches_analytic_normalization() {
        let ctx = gaussian_ctx();
        let pdf = GaussianPdf::new("g", "x", "mu", "sigma");
        let analytic = normalization_integral(&pdf, &ctx, "x", &IntegratorConfig::default()).unwrap();

        let integrand = PdfIntegrand::new(&pdf, &ctx, "x");
        let cfg = IntegratorConfig::trapezoid(20, 1e-10);
        let numeric = Integrator1D::new(cfg)
            .unwrap()
            .integral_batch(|xs, ys| integrand.eval_batch(xs, ys), -3.0, 5.0)
            .unwrap();
        assert_relative_eq!(numeric.value, analytic, max_relative = 1e-9);
    }

    #[test]
    fn test_normalized_batch_matches_scalar() {
        let mut ctx = gaussian_ctx();
        let pdf = GaussianPdf::new("g", "x", "mu", "sigma");
        let cfg = IntegratorConfig::default();
        let batch = normalized_batch(&pdf, &ctx, "x", 0, 4, &cfg).unwrap();
        for (i, x) in [-1.0, 0.0, 1.5, 4.0].into_iter().enumerate() {
            ctx.set_value("x", x);
            let scalar = normalized_value(&pdf, &ctx, "x", &cfg).unwrap();
            assert_relative_eq!(batch[i], scalar, max_relative = 1e-15);
        }
    }

    #[test]
    fn test_truncated_span_bounds_the_batch() {
        let mut ctx = RunContext::new();
        ctx.set_column("x", (0..1001).map(|i| -5.0 + 0.01 * i as f64).collect());
        ctx.set_column("mu", (0..2000).map(|i| 0.001 * i as f64).collect());
        ctx.set_value("x", 0.0);
        ctx.set_value("mu", 0.0);
        ctx.set_value("sigma", 1.0);
        let pdf = GaussianPdf::new("g", "x", "mu", "sigma");

        let tail = pdf.evaluate_batch(&ctx, 1000, 500).unwrap();
        assert_eq!(tail.len(), 1);
        let mut point = ctx.clone();
        let x = point.remove_column("x").unwrap()[1000];
        let mu = point.remove_column("mu").unwrap()[1000];
        point.set_value("x", x);
        point.set_value("mu", mu);
        assert_eq!(tail[0], pdf.evaluate(&point).unwrap());

        let inputs = resolve_inputs(pdf.proxies(), &ctx, 990, 500).unwrap();
        assert_eq!(inputs[0].len(), 11);
        assert_eq!(inputs[1].len(), 11);
        assert_eq!(inputs[2], BatchInput::Scalar(1.0));
    }

    #[test]
    fn test_length_one_column_broadcasts_from_start() {
        let mut ctx = gaussian_ctx();
        ctx.set_column("mu", vec![0.5]);
        let pdf = GaussianPdf::new("g", "x", "mu", "sigma");
        let batch = pdf.evaluate_batch(&ctx, 0, 4).unwrap();
        assert_eq!(batch.len(), 4);
        ctx.remove_column("mu");
        ctx.set_value("mu", 0.5);
        assert_eq!(batch, pdf.evaluate_batch(&ctx, 0, 4).unwrap());
    }

    #[test]
    fn test_observable_range_fallbacks() {
        let mut ctx = RunContext::new();
        assert!(observable_range(&ctx, "m").is_err());
        ctx.set_binning("m", pb_core::Binning::uniform(4, 1.0, 3.0).unwrap());
        assert_eq!(observable_range(&ctx, "m").unwrap(), (1.0, 3.0));
        ctx.set_bounds("m", (0.0, 10.0)).unwrap();
        assert_eq!(observable_range(&ctx, "m").unwrap(), (0.0, 10.0));
    }
}
