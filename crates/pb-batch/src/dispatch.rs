//! Shape dispatch for batch kernels.
//!
//! A kernel with `k` inputs can be called with any mix of per-event spans and
//! scalars. The two- and three-input dispatchers enumerate every combination
//! so each one runs a loop specialized for it; [`dispatch_generic`] handles any
//! arity through per-element lookups.

use pb_core::span::overlaps;
use pb_core::{BatchInput, Bracket, Broadcast, Error, EvaluateInfo, Result};

/// Kernel with two inputs.
pub trait Kernel2 {
    /// Fill `out` (one entry per event) from the two inputs.
    fn compute<A: Bracket, B: Bracket>(&self, out: &mut [f64], a: A, b: B);
}

/// Kernel with three inputs.
pub trait Kernel3 {
    /// Fill `out` (one entry per event) from the three inputs.
    fn compute<A: Bracket, B: Bracket, C: Bracket>(
        &self,
        out: &mut [f64],
        a: A,
        b: B,
        c: C,
    );
}

fn reject_empty(inputs: &[BatchInput<'_>]) -> Result<()> {
    if let Some(i) = inputs.iter().position(|x| matches!(x, BatchInput::Batched(s) if s.is_empty()))
    {
        return Err(Error::Validation(format!(
            "input {i} is an empty span without a scalar value"
        )));
    }
    Ok(())
}

fn disjoint_from(out: &[f64], inputs: &[BatchInput<'_>]) -> bool {
    inputs.iter().all(|i| match i {
        BatchInput::Batched(s) => !overlaps(s, out),
        BatchInput::Scalar(_) => true,
    })
}

/// Run a two-input kernel. Output length is the evaluable size of the inputs.
pub fn dispatch2<K: Kernel2>(kernel: &K, inputs: [BatchInput<'_>; 2]) -> Result<Vec<f64>> {
    reject_empty(&inputs)?;
    let info = EvaluateInfo::of(&inputs).require_batch()?;
    let mut out = vec![0.0; info.size];
    debug_assert!(disjoint_from(&out, &inputs));
    let [a, b] = inputs.map(BatchInput::broadcast_trivial);
    use BatchInput::{Batched, Scalar};
    match (a, b) {
        (Batched(a), Batched(b)) => kernel.compute(&mut out, a, b),
        (Batched(a), Scalar(b)) => kernel.compute(&mut out, a, Broadcast(b)),
        (Scalar(a), Batched(b)) => kernel.compute(&mut out, Broadcast(a), b),
        (Scalar(a), Scalar(b)) => kernel.compute(&mut out, Broadcast(a), Broadcast(b)),
    }
    Ok(out)
}

/// Run a three-input kernel. Output length is the evaluable size of the inputs.
pub fn dispatch3<K: Kernel3>(kernel: &K, inputs: [BatchInput<'_>; 3]) -> Result<Vec<f64>> {
    reject_empty(&inputs)?;
    let info = EvaluateInfo::of(&inputs).require_batch()?;
    let mut out = vec![0.0; info.size];
    debug_assert!(disjoint_from(&out, &inputs));
    let [a, b, c] = inputs.map(BatchInput::broadcast_trivial);
    use BatchInput::{Batched, Scalar};
    match (a, b, c) {
        (Batched(a), Batched(b), Batched(c)) => kernel.compute(&mut out, a, b, c),
        (Batched(a), Batched(b), Scalar(c)) => kernel.compute(&mut out, a, b, Broadcast(c)),
        (Batched(a), Scalar(b), Batched(c)) => kernel.compute(&mut out, a, Broadcast(b), c),
        (Batched(a), Scalar(b), Scalar(c)) => {
            kernel.compute(&mut out, a, Broadcast(b), Broadcast(c))
        }
        (Scalar(a), Batched(b), Batched(c)) => kernel.compute(&mut out, Broadcast(a), b, c),
        (Scalar(a), Batched(b), Scalar(c)) => {
            kernel.compute(&mut out, Broadcast(a), b, Broadcast(c))
        }
        (Scalar(a), Scalar(b), Batched(c)) => {
            kernel.compute(&mut out, Broadcast(a), Broadcast(b), c)
        }
        (Scalar(a), Scalar(b), Scalar(c)) => {
            kernel.compute(&mut out, Broadcast(a), Broadcast(b), Broadcast(c))
        }
    }
    Ok(out)
}

/// Run a kernel of any arity; `f` receives the argument values of one event.
pub fn dispatch_generic<F>(inputs: &[BatchInput<'_>], mut f: F) -> Result<Vec<f64>>
where
    F: FnMut(&[f64]) -> f64,
{
    reject_empty(inputs)?;
    let info = EvaluateInfo::of(inputs).require_batch()?;
    let mut args = vec![0.0; inputs.len()];
    let mut out = Vec::with_capacity(info.size);
    for i in 0..info.size {
        for (arg, input) in args.iter_mut().zip(inputs) {
            *arg = input.get(i);
        }
        out.push(f(&args));
    }
    Ok(out)
}
