//! Parallel batch evaluation over disjoint event windows.

use crate::pdf::{BatchPdf, resolve_inputs};
use pb_core::{Error, EvaluateInfo, Result, ValueSource};
use rayon::prelude::*;

/// Default number of events per window.
pub const DEFAULT_WINDOW: usize = 8_192;

/// Evaluate `pdf` over `[begin, begin + size)` in windows of `window` events.
///
/// Windows run on the rayon pool when called from outside it; inside a rayon
/// task they run sequentially to avoid nested parallelism. The range is first
/// clipped to the events the inputs can supply, so the concatenated result
/// equals a single [`BatchPdf::evaluate_batch`] call over the whole range.
pub fn evaluate_batch_parallel(
    pdf: &dyn BatchPdf,
    src: &dyn ValueSource,
    begin: usize,
    size: usize,
    window: usize,
) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(Error::Validation("window size must be > 0".into()));
    }
    let inputs = resolve_inputs(pdf.proxies(), src, begin, size)?;
    let info = EvaluateInfo::of(&inputs);
    // A length-1 column broadcasts only in a call that starts at its first event.
    let broadcasts = info.size > 1 && inputs.iter().any(|i| i.len() == 1);
    if info.n_batched == 0 || info.size <= window || broadcasts {
        return pdf.evaluate_batch(src, begin, size);
    }

    let size = info.size;
    let end = begin + size;
    let starts: Vec<usize> = (begin..end).step_by(window).collect();
    let eval = |start: usize| pdf.evaluate_batch(src, start, window.min(end - start));

    let can_par = rayon::current_thread_index().is_none() && rayon::current_num_threads() > 1;
    let parts: Vec<Vec<f64>> = if can_par {
        starts.into_par_iter().map(eval).collect::<Result<_>>()?
    } else {
        starts.into_iter().map(eval).collect::<Result<_>>()?
    };

    log::debug!(
        "{}: evaluated {} events in {} windows (parallel: {can_par})",
        pdf.name(),
        size,
        parts.len()
    );

    let mut out = Vec::with_capacity(size);
    for part in parts {
        out.extend(part);
    }
    Ok(out)
}
