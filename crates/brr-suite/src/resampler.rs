//! Resampling kernels for the encoder pipeline

// SPDX-FileCopyrightText: © 2025 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::f64::consts::PI;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleError {
    EmptyInput,
    /// `in_len` is larger than the input buffer.
    InvalidLength(usize, usize),
}

impl Display for ResampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResampleError::EmptyInput => write!(f, "resampler requires nonzero input and output"),
            ResampleError::InvalidLength(in_len, len) => {
                write!(f, "in_len out of bounds ({in_len}, buffer holds {len})")
            }
        }
    }
}

impl std::error::Error for ResampleError {}

/// Interpolation kernel used when changing the sample rate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Resampler {
    Nearest,
    Linear,
    Sine,
    #[default]
    Cubic,
    BandlimitedSinc,
}

/// Normalized sinc, `sin(pi x) / (pi x)` with `sinc(0) = 1`.
pub(crate) fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

fn to_i16(v: f64) -> i16 {
    v.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

impl Resampler {
    /// Resamples the first `in_len` samples of `input` to `out_len` samples.
    ///
    /// `in_len == out_len` is a plain copy, whatever the kernel.
    pub fn resample(
        self,
        input: &[i16],
        in_len: usize,
        out_len: usize,
    ) -> Result<Vec<i16>, ResampleError> {
        if in_len == 0 || out_len == 0 {
            return Err(ResampleError::EmptyInput);
        }
        if in_len > input.len() {
            return Err(ResampleError::InvalidLength(in_len, input.len()));
        }

        if in_len == out_len {
            return Ok(input[..in_len].to_vec());
        }

        let input = &input[..in_len];
        Ok(match self {
            Resampler::Nearest => nearest(input, out_len),
            Resampler::Linear => linear(input, out_len),
            Resampler::Sine => sine(input, out_len),
            Resampler::Cubic => cubic(input, out_len),
            Resampler::BandlimitedSinc => bandlimited_sinc(input, out_len),
        })
    }
}

fn nearest(input: &[i16], out_len: usize) -> Vec<i16> {
    let in_len = input.len();

    (0..out_len).map(|i| input[i * in_len / out_len]).collect()
}

/// Source position and fractional weight for output index `i`.
fn position(i: usize, in_len: usize, out_len: usize) -> (usize, f64) {
    let t = i as f64 * in_len as f64 / out_len as f64;
    let a = t as usize;
    (a, t - a as f64)
}

fn linear(input: &[i16], out_len: usize) -> Vec<i16> {
    let in_len = input.len();

    (0..out_len)
        .map(|i| {
            let (a, w) = position(i, in_len, out_len);
            let s0 = f64::from(input[a]);
            let s1 = f64::from(input[(a + 1).min(in_len - 1)]);

            to_i16(s0 + (s1 - s0) * w)
        })
        .collect()
}

fn sine(input: &[i16], out_len: usize) -> Vec<i16> {
    let in_len = input.len();

    (0..out_len)
        .map(|i| {
            let (a, w) = position(i, in_len, out_len);
            let s0 = f64::from(input[a]);
            let s1 = f64::from(input[(a + 1).min(in_len - 1)]);

            // raised-cosine weight
            let c = (1.0 - (PI * w).cos()) / 2.0;

            to_i16(s0 + (s1 - s0) * c)
        })
        .collect()
}

fn cubic(input: &[i16], out_len: usize) -> Vec<i16> {
    let in_len = input.len();

    (0..out_len)
        .map(|i| {
            let (a, w) = position(i, in_len, out_len);

            // edge replication on both sides
            let p0 = f64::from(input[a.saturating_sub(1)]);
            let p1 = f64::from(input[a]);
            let p2 = f64::from(input[(a + 1).min(in_len - 1)]);
            let p3 = f64::from(input[(a + 2).min(in_len - 1)]);

            let v = p1 + 0.5
                * w
                * (p2 - p0
                    + w * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3 + w * (3.0 * (p1 - p2) + p3 - p0)));

            to_i16(v)
        })
        .collect()
}

const SINC_TAPS: usize = 16;

fn bandlimited_sinc(input: &[i16], out_len: usize) -> Vec<i16> {
    let in_len = input.len();
    let ratio = in_len as f64 / out_len as f64;

    let mut src: Vec<f64> = input.iter().map(|&s| f64::from(s)).collect();

    if ratio > 1.0 {
        // Anti-aliasing FIR low-pass before decimation.  Symmetric taps,
        // edges clamped to the endpoint samples.
        let fir: Vec<f64> = (0..SINC_TAPS)
            .map(|k| sinc(k as f64 / ratio) / ratio)
            .collect();

        let filtered: Vec<f64> = (0..in_len)
            .map(|i| {
                let mut acc = fir[0] * src[i];
                for (k, h) in fir.iter().enumerate().skip(1) {
                    let before = src[i.saturating_sub(k)];
                    let after = src[(i + k).min(in_len - 1)];
                    acc += h * (before + after);
                }
                acc
            })
            .collect();
        src = filtered;
    }

    (0..out_len)
        .map(|i| {
            let a = i as f64 * ratio;
            let a0 = a as isize;

            let mut acc = 0.0;
            for j in (a0 - (SINC_TAPS as isize - 1))..=(a0 + (SINC_TAPS as isize - 1)) {
                let s = src[j.clamp(0, in_len as isize - 1) as usize];
                acc += s * sinc(a - j as f64);
            }

            to_i16(acc)
        })
        .collect()
}
