#![no_main]

use libfuzzer_sys::fuzz_target;
use pb_batch::{IntegratorConfig, Integrator1D, SummationRule};

fuzz_target!(|data: &[u8]| {
    if data.len() < 18 {
        return;
    }
    let a = f64::from_le_bytes(data[0..8].try_into().unwrap_or([0; 8]));
    let b = f64::from_le_bytes(data[8..16].try_into().unwrap_or([0; 8]));
    let rule = if data[16] & 1 == 0 { SummationRule::Trapezoid } else { SummationRule::Midpoint };

    // Keep the point count small so the fuzzer stays fast.
    let max_steps = 1 + u32::from(data[17] % 10);
    let cfg = IntegratorConfig { rule, max_steps, ..IntegratorConfig::default() };
    let Ok(mut integrator) = Integrator1D::new(cfg) else {
        return;
    };

    if let Ok(r) = integrator.integral(|x| (-x * x).exp(), a, b) {
        assert!(r.steps <= max_steps);
        // Limits far enough apart overflow the step width.
        assert!(r.value.is_finite() || !r.converged);
        if (b - a).abs() < f64::MAX / 16.0 {
            assert!(r.value.is_finite());
        }
    }
});
