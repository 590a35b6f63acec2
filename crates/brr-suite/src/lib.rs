//! A BRR sample conversion and container library

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]

mod block;
mod decoder;
mod dsp;
mod encoder;
mod gaussian;
mod resampler;
mod sample;
mod suite_file;

use std::str::FromStr;

pub use block::{BrrBlock, BrrBlockMut};
pub use decoder::decode;
pub use dsp::{apply_range, clamp, clip};
pub use encoder::{EncodeError, Encoder, PreFilter};
pub use gaussian::GAUSSIAN_TABLE;
pub use resampler::{ResampleError, Resampler};
pub use sample::{validate_brr_data, BrrSample, DataIssues, SampleError};
pub use suite_file::{
    suite_checksum, LoopBehavior, SuiteError, SuiteMetadata, SuiteParseError, SuiteSample,
};

pub const SAMPLES_PER_BLOCK: usize = 16;
pub const BYTES_PER_BRR_BLOCK: usize = 9;

/// Native sample rate of the S-DSP.
pub const DSP_FREQUENCY: u32 = 32000;

/// Unity playback rate for the DSP pitch registers.
pub const DEFAULT_VX_PITCH: u16 = 0x1000;
pub const MAX_VX_PITCH: u16 = 0x3fff;

/// Largest usable range (shift) value.  13-15 are undefined on hardware.
pub const MAX_RANGE: u8 = 12;

pub const MAX_LEADING_ZEROS: u32 = 100;

/// `loop_block` sentinel for samples that do not loop.
pub const NO_LOOP: i32 = -1;

/// Upper bound on the number of blocks in a sample.
///
/// Leaves headroom within the 64 KiB of audio-RAM the S-DSP can address.
pub const MAX_BLOCKS: usize = 7280;

pub const BRR_HEADER_END_FLAG: u8 = 0x01;
pub const BRR_HEADER_LOOP_FLAG: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BrrFilter {
    Filter0 = 0,
    Filter1 = 1,
    Filter2 = 2,
    Filter3 = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidFilterError(pub u8);

impl std::fmt::Display for InvalidFilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid BRR filter {} (expected 0-3)", self.0)
    }
}

impl std::error::Error for InvalidFilterError {}

impl TryFrom<u8> for BrrFilter {
    type Error = InvalidFilterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Filter0),
            1 => Ok(Self::Filter1),
            2 => Ok(Self::Filter2),
            3 => Ok(Self::Filter3),
            f => Err(InvalidFilterError(f)),
        }
    }
}

impl FromStr for BrrFilter {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Self::Filter0),
            "1" => Ok(Self::Filter1),
            "2" => Ok(Self::Filter2),
            "3" => Ok(Self::Filter3),
            _ => Err("Invalid BRR filter (expected 0-3)"),
        }
    }
}

impl BrrFilter {
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_from_u8() {
        assert_eq!(BrrFilter::try_from(0), Ok(BrrFilter::Filter0));
        assert_eq!(BrrFilter::try_from(3), Ok(BrrFilter::Filter3));
        assert_eq!(BrrFilter::try_from(4), Err(InvalidFilterError(4)));
        assert_eq!(BrrFilter::try_from(255), Err(InvalidFilterError(255)));
    }

    #[test]
    fn filter_from_str() {
        assert_eq!("2".parse(), Ok(BrrFilter::Filter2));
        assert!("four".parse::<BrrFilter>().is_err());
    }
}
