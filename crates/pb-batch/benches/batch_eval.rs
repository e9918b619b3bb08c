use criterion::{Criterion, criterion_group, criterion_main};
use pb_batch::{
    BatchPdf, BinSamplingPdf, GaussianPdf, IntegratorConfig, Integrator1D, LandauPdf,
    ObservableSpec, RunContext, evaluate_batch_parallel,
};
use std::hint::black_box;
use std::sync::Arc;

fn context(n: usize) -> RunContext {
    let xs: Vec<f64> = (0..n).map(|i| -2.0 + 20.0 * (i as f64) / (n as f64)).collect();
    let mut ctx = RunContext::from_observables(
        vec![ObservableSpec::uniform("x", (-2.0, 18.0), 100).unwrap()],
        vec![("x".to_string(), xs)],
    )
    .unwrap();
    ctx.set_value("mu", 1.5);
    ctx.set_value("sigma", 0.9);
    ctx
}

fn bench_pdfs(c: &mut Criterion) {
    let n = 100_000;
    let ctx = context(n);
    let gauss = GaussianPdf::new("g", "x", "mu", "sigma");
    let landau = LandauPdf::new("l", "x", "mu", "sigma");

    c.bench_function("gaussian_evaluate_batch_100k", |b| {
        b.iter(|| black_box(gauss.evaluate_batch(&ctx, 0, n).unwrap()))
    });

    c.bench_function("landau_evaluate_batch_100k", |b| {
        b.iter(|| black_box(landau.evaluate_batch(&ctx, 0, n).unwrap()))
    });

    c.bench_function("landau_parallel_100k", |b| {
        b.iter(|| black_box(evaluate_batch_parallel(&landau, &ctx, 0, n, 8_192).unwrap()))
    });
}

fn bench_integration(c: &mut Criterion) {
    c.bench_function("romberg_trapezoid_gaussian", |b| {
        let mut integrator = Integrator1D::new(IntegratorConfig::trapezoid(20, 1e-10)).unwrap();
        b.iter(|| {
            black_box(integrator.integral(|x| (-0.5 * x * x).exp(), -3.0, 4.0).unwrap().value)
        })
    });

    let ctx = context(10_000);
    let landau: Arc<dyn BatchPdf> = Arc::new(LandauPdf::new("l", "x", "mu", "sigma"));
    let sampler = BinSamplingPdf::new("binned", "x", landau, 1e-5).unwrap();
    c.bench_function("bin_sampling_landau_10k", |b| {
        b.iter(|| black_box(sampler.evaluate_batch(&ctx, 0, 10_000).unwrap()))
    });
}

criterion_group!(benches, bench_pdfs, bench_integration);
criterion_main!(benches);
