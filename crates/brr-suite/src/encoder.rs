//! BRR encoder
//!
//! Converts 16-bit PCM into BRR blocks with an exhaustive per-block search
//! over the enabled (filter, range) pairs.

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::fmt::Display;

use crate::block::BrrBlockMut;
use crate::resampler::{ResampleError, Resampler};
use crate::sample::BrrSample;
use crate::{
    BrrFilter, BRR_HEADER_END_FLAG, BRR_HEADER_LOOP_FLAG, MAX_BLOCKS, MAX_LEADING_ZEROS, MAX_RANGE,
    NO_LOOP, SAMPLES_PER_BLOCK,
};

/// An in-place waveform filter applied between resampling and encoding.
pub type PreFilter = fn(&mut [i16]);

#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    NoSamples,
    NoInputAfterResampling,
    NoFiltersEnabled,
    InvalidResampleFactor(f64),
    LoopPointOutOfRange(usize, usize),
    TooManyBlocks(usize),
    ResampleError(ResampleError),
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::NoSamples => write!(f, "no samples"),
            EncodeError::NoInputAfterResampling => {
                write!(f, "no samples left after resampling and normalization")
            }
            EncodeError::NoFiltersEnabled => write!(f, "all BRR filters are disabled"),
            EncodeError::InvalidResampleFactor(r) => write!(f, "invalid resample factor ({r})"),
            EncodeError::LoopPointOutOfRange(lp, len) => {
                write!(f, "loop point out of range ({lp}, {len} samples)")
            }
            EncodeError::TooManyBlocks(b) => {
                write!(f, "input too long ({b} blocks, max {MAX_BLOCKS})")
            }
            EncodeError::ResampleError(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<ResampleError> for EncodeError {
    fn from(e: ResampleError) -> Self {
        Self::ResampleError(e)
    }
}

/// BRR encoder configuration.
///
/// A single [`encode`](Encoder::encode) call runs the whole pipeline:
/// truncate, resample, pre-filter, leading-zero normalization and the
/// brute-force block search.
#[derive(Clone)]
pub struct Encoder {
    /// Kernel used when `resample_factor` changes the sample count.
    pub resampler: Resampler,

    /// In-place waveform filters run after resampling.
    pub pre_filters: Vec<PreFilter>,

    /// `input_rate / target_rate`.  1.0 keeps the input rate.
    pub resample_factor: f64,

    /// Upper bound on the input sample count.  `None` uses all samples.
    pub truncate: Option<usize>,

    /// Forced minimum count of leading zero samples (capped at
    /// [`MAX_LEADING_ZEROS`]).  `None` only zero-pads to block alignment.
    pub leading_zeros: Option<u32>,

    /// Filters the search may pick for blocks after the first.
    pub enable_filter0: bool,
    pub enable_filter1: bool,
    pub enable_filter2: bool,
    pub enable_filter3: bool,

    /// Pin filter 0 at the loop block so looping never depends on the
    /// history carried across the loop seam.
    pub filter0_at_loop: bool,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            resampler: Resampler::default(),
            pre_filters: Vec::new(),
            resample_factor: 1.0,
            truncate: None,
            leading_zeros: None,
            enable_filter0: true,
            enable_filter1: true,
            enable_filter2: true,
            enable_filter3: true,
            filter0_at_loop: false,
        }
    }
}

/// Encoder state carried across blocks.
///
/// `p1`/`p2` are at 16-bit scale (the block search's internal convention),
/// matching what a decoder's history holds after the previous block.
struct SearchState {
    p1: i32,
    p2: i32,

    /// History entering the loop block, captured when it is first
    /// encountered.  The final block of a looping sample is scored against
    /// these so the loop seam decodes cleanly.
    p1_at_loop: i32,
    p2_at_loop: i32,
    filter_at_loop: BrrFilter,
}

/// One trial or write pass over a 16-sample block.
///
/// Returns the accumulated squared error and the end-of-block history.
/// In write mode the chosen residuals are emitted into `out`.
fn mash_block(
    samples: &[i16; SAMPLES_PER_BLOCK],
    filter: BrrFilter,
    range: u8,
    p1: i32,
    p2: i32,
    mut out: Option<&mut BrrBlockMut>,
) -> (f64, i32, i32) {
    let step = (1i32 << (range + 2)) + ((1i32 << range) >> 2);

    let mut l1 = p1;
    let mut l2 = p2;
    let mut block_error = 0.0;

    for (i, &s) in samples.iter().enumerate() {
        let s = i32::from(s);

        let linear = filter.prediction(l1, l2) >> 1;

        let mut e = (s >> 1) - linear;
        if e.abs() > 16384 && e.abs() < 32768 {
            // BRRtools-lineage wrap normalization, kept bit-for-bit
            e = (e >> 9) & 0x07ff_8000;
        }

        let dp = e + step;
        let c = if dp > 0 {
            ((dp << 1) >> range).clamp(0, 15) - 8
        } else {
            -8
        };

        if let Some(block) = out.as_deref_mut() {
            block.set_sample(i, c as i8);
        }

        let dp = (c << range) >> 1;

        l2 = l1;
        l1 = linear + dp;
        if l1 != i32::from(l1 as i16) {
            // 16-bit overflow wraps instead of saturating
            l1 = i32::from((0x7fff - (l1 >> 24)) as i16);
        }
        l1 <<= 1;

        let d = f64::from(s - l1);
        block_error += d * d;
    }

    (block_error, l1, l2)
}

/// Per-sample mean squared error of a trial, with the loop-closure penalty
/// folded into the final block of a looping sample.
fn block_score(trial: (f64, i32, i32), closes_loop: bool, state: &SearchState) -> f64 {
    let (error, l1, l2) = trial;

    if !closes_loop {
        return error / 16.0;
    }

    match state.filter_at_loop {
        BrrFilter::Filter0 => error / 16.0,
        BrrFilter::Filter1 => {
            let d1 = f64::from(l1 - state.p1_at_loop);
            (error + d1 * d1) / 17.0
        }
        BrrFilter::Filter2 | BrrFilter::Filter3 => {
            let d1 = f64::from(l1 - state.p1_at_loop);
            let d2 = f64::from(l2 - state.p2_at_loop);
            (error + d1 * d1 + d2 * d2) / 18.0
        }
    }
}

impl Encoder {
    fn enabled_filters(&self) -> Vec<BrrFilter> {
        [
            (self.enable_filter0, BrrFilter::Filter0),
            (self.enable_filter1, BrrFilter::Filter1),
            (self.enable_filter2, BrrFilter::Filter2),
            (self.enable_filter3, BrrFilter::Filter3),
        ]
        .into_iter()
        .filter_map(|(enabled, f)| enabled.then_some(f))
        .collect()
    }

    /// Encodes `pcm` into a BRR sample.
    ///
    /// `loop_sample` is the index of the first looped sample, `None` for a
    /// one-shot sample.  The resampling ratio is adjusted so the loop region
    /// becomes a whole number of blocks.
    pub fn encode(&self, pcm: &[i16], loop_sample: Option<usize>) -> Result<BrrSample, EncodeError> {
        if !(self.resample_factor.is_finite() && self.resample_factor > 0.0) {
            return Err(EncodeError::InvalidResampleFactor(self.resample_factor));
        }

        let enabled_filters = self.enabled_filters();
        if enabled_filters.is_empty() {
            return Err(EncodeError::NoFiltersEnabled);
        }

        // Truncate
        let mut input = pcm;
        if let Some(t) = self.truncate {
            if (1..=pcm.len()).contains(&t) {
                input = &pcm[..t];
            }
        }
        if input.is_empty() {
            return Err(EncodeError::NoSamples);
        }

        // Output size; for looping samples the ratio is adjusted so the loop
        // region resamples to a whole number of blocks
        let in_len = input.len();
        let (target_len, loop_size) = match loop_sample {
            None => {
                let target = (in_len as f64 / self.resample_factor).round() as usize;
                (target, None)
            }
            Some(ls) => {
                if ls >= in_len {
                    return Err(EncodeError::LoopPointOutOfRange(ls, in_len));
                }

                let old_loop_size = (in_len - ls) as f64 / self.resample_factor;
                let new_loop_size =
                    (old_loop_size / SAMPLES_PER_BLOCK as f64).ceil() as usize * SAMPLES_PER_BLOCK;

                let target = (in_len as f64 / self.resample_factor * new_loop_size as f64
                    / old_loop_size)
                    .round() as usize;

                (target, Some(new_loop_size))
            }
        };
        if target_len == 0 {
            return Err(EncodeError::NoInputAfterResampling);
        }

        // Resample
        let mut samples = self.resampler.resample(input, in_len, target_len)?;

        // External pre-filters, in place
        for filter in &self.pre_filters {
            filter(&mut samples);
        }

        // Leading-zero normalization
        match self.leading_zeros {
            None => {
                let pad = (SAMPLES_PER_BLOCK - samples.len() % SAMPLES_PER_BLOCK) % SAMPLES_PER_BLOCK;
                prepend_zeros(&mut samples, pad);
            }
            Some(requested) => {
                let requested = requested.min(MAX_LEADING_ZEROS) as usize;

                // Trim what is already silent, but never into the loop region
                let silent = samples
                    .iter()
                    .position(|&s| s != 0)
                    .unwrap_or(samples.len());
                let max_trim = samples.len() - loop_size.unwrap_or(0);
                samples.drain(..silent.min(max_trim));

                let align =
                    (SAMPLES_PER_BLOCK - samples.len() % SAMPLES_PER_BLOCK) % SAMPLES_PER_BLOCK;
                let pad = if align >= requested {
                    align
                } else {
                    align + (requested - align).div_ceil(SAMPLES_PER_BLOCK) * SAMPLES_PER_BLOCK
                };
                prepend_zeros(&mut samples, pad);
            }
        }

        if samples.is_empty() {
            return Err(EncodeError::NoInputAfterResampling);
        }

        let n_blocks = samples.len() / SAMPLES_PER_BLOCK;
        if n_blocks > MAX_BLOCKS {
            return Err(EncodeError::TooManyBlocks(n_blocks));
        }

        let loop_block = match loop_size {
            Some(ls) => ((samples.len() - ls) / SAMPLES_PER_BLOCK) as i32,
            None => NO_LOOP,
        };

        let brr = self.brute_force(&samples, loop_block)?;

        debug_assert_eq!(brr.block_count(), samples.len() / SAMPLES_PER_BLOCK);
        Ok(brr)
    }

    /// The per-block (filter, range) search.  `samples` is block aligned.
    fn brute_force(&self, samples: &[i16], loop_block: i32) -> Result<BrrSample, EncodeError> {
        let n_blocks = samples.len() / SAMPLES_PER_BLOCK;
        let last_block = n_blocks - 1;
        let looping = loop_block >= 0;

        let enabled_filters = self.enabled_filters();
        let forced_filter0 = [BrrFilter::Filter0];

        let mut out = BrrSample::new(n_blocks).expect("block count already validated");

        let mut state = SearchState {
            p1: 0,
            p2: 0,
            p1_at_loop: 0,
            p2_at_loop: 0,
            filter_at_loop: BrrFilter::Filter0,
        };

        for (n, chunk) in samples.chunks_exact(SAMPLES_PER_BLOCK).enumerate() {
            let block_samples: &[i16; SAMPLES_PER_BLOCK] = chunk.try_into().unwrap();

            let is_end = n == last_block;
            let is_loop_block = looping && n == loop_block as usize;
            let closes_loop = is_end && looping;

            if is_loop_block {
                state.p1_at_loop = state.p1;
                state.p2_at_loop = state.p2;
            }

            let candidates: &[BrrFilter] = if n == 0 || (is_loop_block && self.filter0_at_loop) {
                &forced_filter0
            } else {
                &enabled_filters
            };

            // Range 0 is never worth searching, but it is the baseline the
            // search has to beat; an all-zero block keeps it and encodes as
            // nine zero bytes.
            let mut best_filter = candidates[0];
            let mut best_range = 0;
            let mut best_score = block_score(
                mash_block(block_samples, best_filter, 0, state.p1, state.p2, None),
                closes_loop,
                &state,
            );

            for &filter in candidates {
                for range in 1..=MAX_RANGE {
                    let trial =
                        mash_block(block_samples, filter, range, state.p1, state.p2, None);
                    let score = block_score(trial, closes_loop, &state);

                    if score < best_score {
                        best_filter = filter;
                        best_range = range;
                        best_score = score;
                    }
                }
            }

            // Write pass with the winning pair
            let mut block = out.block_mut(n).unwrap();

            let mut header = (best_range << 4) | (best_filter.as_u8() << 2);
            if is_end {
                header |= BRR_HEADER_END_FLAG;
                if looping {
                    header |= BRR_HEADER_LOOP_FLAG;
                }
            }
            block.set_header(header);

            let (_, l1, l2) = mash_block(
                block_samples,
                best_filter,
                best_range,
                state.p1,
                state.p2,
                Some(&mut block),
            );
            state.p1 = l1;
            state.p2 = l2;

            if is_loop_block {
                state.filter_at_loop = best_filter;
            }
        }

        out.set_loop_block(loop_block);
        Ok(out)
    }
}

fn prepend_zeros(samples: &mut Vec<i16>, pad: usize) {
    if pad > 0 {
        samples.splice(0..0, std::iter::repeat(0).take(pad));
    }
}
