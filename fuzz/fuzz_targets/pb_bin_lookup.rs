#![no_main]

use libfuzzer_sys::fuzz_target;
use pb_core::Binning;

fuzz_target!(|data: &[u8]| {
    let values: Vec<f64> = data
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect();
    let Some((probe, edges)) = values.split_last() else {
        return;
    };

    // Unsorted or non-finite edges must be rejected, never panic.
    let Ok(binning) = Binning::from_edges(edges.to_vec()) else {
        return;
    };
    if let Some(bin) = binning.bin_index(*probe) {
        assert!(bin < binning.n_bins());
        assert!(*probe >= binning.bin_low(bin) && *probe <= binning.bin_high(bin));
    }
});
