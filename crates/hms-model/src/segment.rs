//! Block segmentation shared by every band.
//!
//! The input is preceded by `block_len - hop` zeros so that block `b` ends
//! `(b + 1) * hop` samples into the signal. Block `b` covers padded samples
//! `[b * hop, b * hop + block_len)` and is stamped `t_b = b * hop / fs`.

use std::ops::Range;

use crate::config::SAMPLE_RATE;
use crate::error::{HmsError, Result};

/// Block boundaries common to all band signals of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    block_len: usize,
    hop: usize,
    num_blocks: usize,
}

impl BlockGrid {
    /// Grid covering `signal_len` input samples.
    ///
    /// The block count is `ceil(signal_len / hop)`, so the last block reaches
    /// at least to the final input sample.
    pub fn new(signal_len: usize, block_len: usize, hop: usize) -> Self {
        assert!(hop >= 1 && hop <= block_len, "hop {hop} outside 1..={block_len}");
        Self {
            block_len,
            hop,
            num_blocks: signal_len.div_ceil(hop),
        }
    }

    /// Samples per block.
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Samples between block starts.
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Zeros inserted ahead of the signal.
    pub fn lead_in(&self) -> usize {
        self.block_len - self.hop
    }

    /// Length of the padded signal the grid indexes into.
    pub fn padded_len(&self) -> usize {
        if self.num_blocks == 0 {
            return 0;
        }
        (self.num_blocks - 1) * self.hop + self.block_len
    }

    /// Sample range of block `b` in the padded signal.
    pub fn block(&self, b: usize) -> Range<usize> {
        assert!(b < self.num_blocks, "block {b} out of {}", self.num_blocks);
        let start = b * self.hop;
        start..start + self.block_len
    }

    /// Timestamp of block `b` in seconds.
    pub fn time(&self, b: usize) -> f64 {
        (b * self.hop) as f64 / SAMPLE_RATE
    }

    /// Timestamps of all blocks.
    pub fn times(&self) -> Vec<f64> {
        (0..self.num_blocks).map(|b| self.time(b)).collect()
    }

    /// Number of leading blocks stamped earlier than `time_skip` seconds.
    pub fn skipped_blocks(&self, time_skip: f64) -> usize {
        let blocks = time_skip * SAMPLE_RATE / self.hop as f64;
        (blocks - 1e-9).ceil().max(0.0) as usize
    }

    /// First block that enters long-term averages.
    ///
    /// Fails with [`HmsError::InsufficientData`] when the time skip leaves
    /// no block.
    pub fn first_retained(&self, time_skip: f64) -> Result<usize> {
        let skip = self.skipped_blocks(time_skip);
        ensure_retained(self.num_blocks, skip)?;
        Ok(skip)
    }
}

/// Fail unless at least one of `blocks` blocks lies at or after
/// `first_retained`.
pub fn ensure_retained(blocks: usize, first_retained: usize) -> Result<()> {
    if blocks <= first_retained {
        return Err(HmsError::InsufficientData {
            blocks,
            required: first_retained,
        });
    }
    Ok(())
}

/// RMS of every block of every band, indexed `[block][band]`.
///
/// Panics if a band signal is shorter than the padded length, which would
/// mean the preprocessor under-padded the input.
pub fn block_rms(bands: &[Vec<f64>], grid: &BlockGrid) -> Vec<Vec<f64>> {
    for (z, band) in bands.iter().enumerate() {
        assert!(
            band.len() >= grid.padded_len(),
            "band {z} has {} samples, grid needs {}",
            band.len(),
            grid.padded_len()
        );
    }

    (0..grid.num_blocks())
        .map(|b| {
            let range = grid.block(b);
            bands
                .iter()
                .map(|band| hms_dsp::rms(&band[range.clone()]))
                .collect()
        })
        .collect()
}
