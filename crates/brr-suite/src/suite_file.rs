//! BRR Suite Sample files
//!
//! A `.brs` file is a 64-byte header followed by raw BRR data.  The header
//! carries instrument metadata, loop information and a checksum over the
//! sample data.

// SPDX-FileCopyrightText: © 2025 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::sample::{validate_brr_data, BrrSample, DataIssues};
use crate::{
    BYTES_PER_BRR_BLOCK, DEFAULT_VX_PITCH, DSP_FREQUENCY, MAX_VX_PITCH, NO_LOOP,
};

pub(crate) const HEADER_SIZE: usize = 64;
pub(crate) const NAME_LENGTH: usize = 24;

const FILE_SIGNATURE: [u8; 4] = *b"BRRS";
const META_SIGNATURE: [u8; 4] = *b"META";
const DATA_SIGNATURE: [u8; 4] = *b"DATA";

const CHECKSUM_OFFSET: usize = 4;
const COMPLEMENT_OFFSET: usize = 6;
const META_OFFSET: usize = 8;
const NAME_OFFSET: usize = 12;
const VX_PITCH_OFFSET: usize = 36;
const FREQUENCY_OFFSET: usize = 40;
const DATA_SIG_OFFSET: usize = 51;
const LOOP_BEHAVIOR_OFFSET: usize = 55;
const LOOP_BLOCK_OFFSET: usize = 56;
const LOOP_POINT_OFFSET: usize = 58;
const BLOCK_COUNT_OFFSET: usize = 60;
const SAMPLE_LENGTH_OFFSET: usize = 62;

/// How a sample's loop point is to be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopBehavior {
    #[default]
    NonLooping = 0,
    Looping = 1,
    /// Loops into audio-RAM outside this sample.  Advisory only.
    Extrinsic = 2,
    /// Loop point is not on a block boundary.  Advisory only.
    Misaligned = 3,
}

impl LoopBehavior {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NonLooping),
            1 => Some(Self::Looping),
            2 => Some(Self::Extrinsic),
            3 => Some(Self::Misaligned),
            _ => None,
        }
    }

    fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn loops(self) -> bool {
        self != Self::NonLooping
    }
}

/// Instrument metadata stored in the suite header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteMetadata {
    /// Up to 24 printable Latin-1 characters.
    pub instrument_name: String,

    /// DSP pitch register value for the instrument's base note.
    /// 0 means unknown.
    pub vx_pitch: u16,

    /// Sample rate the PCM source was encoded at, in Hz.
    pub encoding_frequency: i32,
}

impl Default for SuiteMetadata {
    fn default() -> Self {
        Self {
            instrument_name: String::new(),
            vx_pitch: DEFAULT_VX_PITCH,
            encoding_frequency: DSP_FREQUENCY as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteError {
    NameTooLong(usize),
    InvalidEncodingFrequency(i32),
    UnresolvableData(DataIssues),
}

impl Display for SuiteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuiteError::NameTooLong(len) => {
                write!(f, "instrument name too long ({len}, max {NAME_LENGTH})")
            }
            SuiteError::InvalidEncodingFrequency(freq) => {
                write!(f, "encoding frequency is not positive ({freq})")
            }
            SuiteError::UnresolvableData(issues) => {
                write!(f, "unresolvable BRR data issues: {issues:?}")
            }
        }
    }
}

impl std::error::Error for SuiteError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteParseError {
    FileTooShort(usize),
    BadSignature,
    BadMetaSignature,
    BadDataSignature,
    /// Stored checksum and complement do not XOR to 0xffff.
    ChecksumComplementMismatch(u16, u16),
    /// Stored and computed checksums differ.
    ChecksumMismatch(u16, u16),
    UnknownLoopBehavior(u8),
    InvalidEncodingFrequency(i32),
    /// `sample_length` does not match `block_count * 9`; holds the two
    /// stored fields.
    WrongSampleLength(u16, u16),
    /// `block_count` does not match the data after the header.
    WrongBlockCount(u16, usize),
    /// Loop block, loop point and loop behavior disagree.
    LoopMismatch,
    /// Loop behavior disagrees with the final block's loop flag.
    LoopBehaviorMismatch,
    /// End flag missing from the final block or set early.
    EndFlagPlacement,
    UnresolvableData(DataIssues),
}

impl Display for SuiteParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuiteParseError::FileTooShort(len) => {
                write!(f, "file too short ({len} bytes, header is {HEADER_SIZE})")
            }
            SuiteParseError::BadSignature => write!(f, "not a BRR Suite Sample file"),
            SuiteParseError::BadMetaSignature => write!(f, "missing META signature"),
            SuiteParseError::BadDataSignature => write!(f, "missing DATA signature"),
            SuiteParseError::ChecksumComplementMismatch(c, k) => {
                write!(f, "checksum complement mismatch ({c:#06x}, {k:#06x})")
            }
            SuiteParseError::ChecksumMismatch(stored, computed) => {
                write!(f, "bad checksum (stored {stored:#06x}, computed {computed:#06x})")
            }
            SuiteParseError::UnknownLoopBehavior(b) => write!(f, "unknown loop behavior ({b})"),
            SuiteParseError::InvalidEncodingFrequency(freq) => {
                write!(f, "encoding frequency is not positive ({freq})")
            }
            SuiteParseError::WrongSampleLength(len, blocks) => {
                write!(f, "sample length field ({len}) does not match block count ({blocks})")
            }
            SuiteParseError::WrongBlockCount(blocks, actual) => {
                write!(f, "wrong block count ({blocks}, data holds {actual})")
            }
            SuiteParseError::LoopMismatch => write!(f, "loop block and loop point disagree"),
            SuiteParseError::LoopBehaviorMismatch => {
                write!(f, "loop behavior disagrees with the final block's loop flag")
            }
            SuiteParseError::EndFlagPlacement => write!(f, "end flag placement is wrong"),
            SuiteParseError::UnresolvableData(issues) => {
                write!(f, "unresolvable BRR data issues: {issues:?}")
            }
        }
    }
}

impl std::error::Error for SuiteParseError {}

/// Checksum over whole BRR blocks, as stored in the suite header.
pub fn suite_checksum(brr_data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    for block in brr_data.chunks_exact(BYTES_PER_BRR_BLOCK) {
        let mut acc: u32 = 0;
        for (j, &b) in block.iter().enumerate().skip(1) {
            acc = acc.wrapping_add(u32::from(b) << (j - 1));
        }
        acc ^= u32::from(block[0]) << 4;
        sum = sum.wrapping_add(acc);
    }

    (sum & 0xffff) as u16
}

/// Restricts a name to printable Latin-1.
///
/// Control characters, soft hyphens and anything Latin-1 cannot encode are
/// stripped; non-breaking spaces become plain spaces.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            '\u{00a0}' => Some(' '),
            '\u{0000}'..='\u{001f}' | '\u{007f}'..='\u{009f}' | '\u{00ad}' => None,
            c if (c as u32) <= 0xff => Some(c),
            _ => None,
        })
        .collect()
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_i32(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// A BRR sample with suite metadata, loop taxonomy and checksum handling.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteSample {
    metadata: SuiteMetadata,
    loop_behavior: LoopBehavior,
    loop_point: u16,
    sample: BrrSample,
}

impl SuiteSample {
    /// Wraps a sample, deriving the loop taxonomy from its loop block.
    pub fn new(sample: BrrSample, metadata: SuiteMetadata) -> Result<Self, SuiteError> {
        let (loop_behavior, loop_point) = if sample.is_looping() {
            (
                LoopBehavior::Looping,
                (sample.loop_block() as usize * BYTES_PER_BRR_BLOCK) as u16,
            )
        } else {
            (LoopBehavior::NonLooping, 0)
        };

        let mut s = Self {
            metadata: SuiteMetadata::default(),
            loop_behavior,
            loop_point,
            sample,
        };
        s.set_instrument_name(&metadata.instrument_name)?;
        s.set_encoding_frequency(metadata.encoding_frequency)?;
        s.set_vx_pitch(metadata.vx_pitch);
        Ok(s)
    }

    pub fn sample(&self) -> &BrrSample {
        &self.sample
    }

    pub fn metadata(&self) -> &SuiteMetadata {
        &self.metadata
    }

    pub fn instrument_name(&self) -> &str {
        &self.metadata.instrument_name
    }

    pub fn vx_pitch(&self) -> u16 {
        self.metadata.vx_pitch
    }

    pub fn encoding_frequency(&self) -> i32 {
        self.metadata.encoding_frequency
    }

    pub fn loop_behavior(&self) -> LoopBehavior {
        self.loop_behavior
    }

    /// Loop point in bytes.  Only meaningful when `loop_behavior` loops.
    pub fn loop_point(&self) -> u16 {
        self.loop_point
    }

    /// Sanitizes and stores the instrument name.
    ///
    /// Fails if the sanitized name is longer than 24 characters; the
    /// serializer space-pads shorter names.
    pub fn set_instrument_name(&mut self, name: &str) -> Result<(), SuiteError> {
        let name = sanitize_name(name);

        let len = name.chars().count();
        if len > NAME_LENGTH {
            return Err(SuiteError::NameTooLong(len));
        }

        self.metadata.instrument_name = name;
        Ok(())
    }

    /// Stores the pitch register value; out-of-range values mean "unknown"
    /// and normalize to 0.
    pub fn set_vx_pitch(&mut self, vx_pitch: u16) {
        self.metadata.vx_pitch = if vx_pitch <= MAX_VX_PITCH { vx_pitch } else { 0 };
    }

    pub fn set_encoding_frequency(&mut self, frequency: i32) -> Result<(), SuiteError> {
        if frequency <= 0 {
            return Err(SuiteError::InvalidEncodingFrequency(frequency));
        }
        self.metadata.encoding_frequency = frequency;
        Ok(())
    }

    /// Sets the loop point and derives the loop behavior from it.
    ///
    /// Aligned, in-range points are `Looping` and update the sample's loop
    /// block and header flags.  Points past the sample are `Extrinsic`,
    /// unaligned points `Misaligned`; both leave the sample untouched.
    pub fn set_and_flag_loop_point(&mut self, loop_point: u16) {
        self.loop_point = loop_point;

        let lp = usize::from(loop_point);
        if lp % BYTES_PER_BRR_BLOCK != 0 {
            self.loop_behavior = LoopBehavior::Misaligned;
        } else if lp >= self.sample.data().len() {
            self.loop_behavior = LoopBehavior::Extrinsic;
        } else {
            self.loop_behavior = LoopBehavior::Looping;
            self.sample
                .set_loop_block((lp / BYTES_PER_BRR_BLOCK) as i32);
            self.sample.correct_end_flags();
        }
    }

    /// Makes the sample one-shot.
    pub fn clear_loop(&mut self) {
        self.loop_behavior = LoopBehavior::NonLooping;
        self.loop_point = 0;
        self.sample.set_loop_block(NO_LOOP);
        self.sample.correct_end_flags();
    }

    /// Serializes to `.brs` bytes.
    ///
    /// Fails if the sample data has unresolvable issues.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SuiteError> {
        let data = self.sample.data();

        let loop_point_for_validation = match self.loop_behavior {
            LoopBehavior::Looping => Some(usize::from(self.loop_point)),
            _ => None,
        };
        let issues = validate_brr_data(data, loop_point_for_validation, None);
        if issues.contains(DataIssues::UNRESOLVABLE) {
            return Err(SuiteError::UnresolvableData(issues));
        }

        let checksum = suite_checksum(data);
        let block_count = self.sample.block_count() as u16;

        let mut out = vec![0; HEADER_SIZE + data.len()];

        out[0..4].copy_from_slice(&FILE_SIGNATURE);
        out[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_le_bytes());
        out[COMPLEMENT_OFFSET..COMPLEMENT_OFFSET + 2]
            .copy_from_slice(&(checksum ^ 0xffff).to_le_bytes());
        out[META_OFFSET..META_OFFSET + 4].copy_from_slice(&META_SIGNATURE);

        // Latin-1 instrument name, space padded
        for (i, o) in out[NAME_OFFSET..NAME_OFFSET + NAME_LENGTH].iter_mut().enumerate() {
            *o = match self.metadata.instrument_name.chars().nth(i) {
                Some(c) => c as u8,
                None => b' ',
            };
        }

        out[VX_PITCH_OFFSET..VX_PITCH_OFFSET + 2]
            .copy_from_slice(&self.metadata.vx_pitch.to_le_bytes());
        out[FREQUENCY_OFFSET..FREQUENCY_OFFSET + 4]
            .copy_from_slice(&self.metadata.encoding_frequency.to_le_bytes());
        // 38-39 and 44-50 stay reserved zero

        out[DATA_SIG_OFFSET..DATA_SIG_OFFSET + 4].copy_from_slice(&DATA_SIGNATURE);
        out[LOOP_BEHAVIOR_OFFSET] = self.loop_behavior.as_u8();

        let loop_block = match self.loop_behavior {
            LoopBehavior::Looping => self.loop_point / BYTES_PER_BRR_BLOCK as u16,
            _ => 0,
        };
        out[LOOP_BLOCK_OFFSET..LOOP_BLOCK_OFFSET + 2].copy_from_slice(&loop_block.to_le_bytes());
        out[LOOP_POINT_OFFSET..LOOP_POINT_OFFSET + 2]
            .copy_from_slice(&self.loop_point.to_le_bytes());
        out[BLOCK_COUNT_OFFSET..BLOCK_COUNT_OFFSET + 2]
            .copy_from_slice(&block_count.to_le_bytes());
        out[SAMPLE_LENGTH_OFFSET..SAMPLE_LENGTH_OFFSET + 2]
            .copy_from_slice(&(block_count * BYTES_PER_BRR_BLOCK as u16).to_le_bytes());

        out[HEADER_SIZE..].copy_from_slice(data);

        Ok(out)
    }

    /// Parses and validates a `.brs` byte stream.
    pub fn from_bytes(input: &[u8]) -> Result<Self, SuiteParseError> {
        if input.len() < HEADER_SIZE + BYTES_PER_BRR_BLOCK {
            return Err(SuiteParseError::FileTooShort(input.len()));
        }

        if input[0..4] != FILE_SIGNATURE {
            return Err(SuiteParseError::BadSignature);
        }
        if input[META_OFFSET..META_OFFSET + 4] != META_SIGNATURE {
            return Err(SuiteParseError::BadMetaSignature);
        }
        if input[DATA_SIG_OFFSET..DATA_SIG_OFFSET + 4] != DATA_SIGNATURE {
            return Err(SuiteParseError::BadDataSignature);
        }

        let stored_checksum = read_u16(input, CHECKSUM_OFFSET);
        let complement = read_u16(input, COMPLEMENT_OFFSET);
        if stored_checksum ^ complement != 0xffff {
            return Err(SuiteParseError::ChecksumComplementMismatch(
                stored_checksum,
                complement,
            ));
        }

        let data = &input[HEADER_SIZE..];

        let computed = suite_checksum(data);
        if computed != stored_checksum {
            return Err(SuiteParseError::ChecksumMismatch(stored_checksum, computed));
        }

        let block_count = read_u16(input, BLOCK_COUNT_OFFSET);
        let sample_length = read_u16(input, SAMPLE_LENGTH_OFFSET);

        let expected_length = usize::from(block_count) * BYTES_PER_BRR_BLOCK;
        if usize::from(sample_length) != expected_length {
            return Err(SuiteParseError::WrongSampleLength(
                sample_length,
                block_count,
            ));
        }

        let loop_behavior = match LoopBehavior::from_u8(input[LOOP_BEHAVIOR_OFFSET]) {
            Some(b) => b,
            None => {
                return Err(SuiteParseError::UnknownLoopBehavior(
                    input[LOOP_BEHAVIOR_OFFSET],
                ))
            }
        };
        let loop_block = read_u16(input, LOOP_BLOCK_OFFSET);
        let loop_point = read_u16(input, LOOP_POINT_OFFSET);

        let loop_point_for_validation = match loop_behavior {
            LoopBehavior::Looping => Some(usize::from(loop_point)),
            _ => None,
        };
        let issues = validate_brr_data(
            data,
            loop_point_for_validation,
            Some(usize::from(block_count)),
        );
        if issues.contains(DataIssues::WRONG_BLOCK_COUNT) {
            return Err(SuiteParseError::WrongBlockCount(
                block_count,
                data.len() / BYTES_PER_BRR_BLOCK,
            ));
        }
        if issues.contains(DataIssues::UNRESOLVABLE) {
            return Err(SuiteParseError::UnresolvableData(issues));
        }
        if issues.intersects(DataIssues::MISSING_END_FLAG | DataIssues::EARLY_END_FLAGS) {
            return Err(SuiteParseError::EndFlagPlacement);
        }

        if loop_behavior == LoopBehavior::Looping
            && usize::from(loop_point) != usize::from(loop_block) * BYTES_PER_BRR_BLOCK
        {
            // An out-of-range or misaligned loop point is already caught as
            // unresolvable above
            return Err(SuiteParseError::LoopMismatch);
        }

        // The final block's loop flag must match the loop taxonomy
        let last_header = data[data.len() - BYTES_PER_BRR_BLOCK];
        if (last_header & crate::BRR_HEADER_LOOP_FLAG != 0) != loop_behavior.loops() {
            return Err(SuiteParseError::LoopBehaviorMismatch);
        }

        let frequency = read_i32(input, FREQUENCY_OFFSET);
        if frequency <= 0 {
            return Err(SuiteParseError::InvalidEncodingFrequency(frequency));
        }

        let vx_pitch = read_u16(input, VX_PITCH_OFFSET);
        let vx_pitch = if vx_pitch <= MAX_VX_PITCH { vx_pitch } else { 0 };

        // Latin-1 maps straight to codepoints.  Sanitize before trimming so
        // a trailing non-breaking space cannot survive as padding.
        let name: String = input[NAME_OFFSET..NAME_OFFSET + NAME_LENGTH]
            .iter()
            .map(|&b| char::from(b))
            .collect();
        let name = sanitize_name(&name).trim_end_matches(' ').to_string();

        let brr_loop_block = match loop_behavior {
            LoopBehavior::Looping => i32::from(loop_block),
            _ => NO_LOOP,
        };
        let sample = match BrrSample::from_bytes(data, brr_loop_block) {
            Ok(s) => s,
            // length and alignment were checked above
            Err(_) => return Err(SuiteParseError::UnresolvableData(issues)),
        };

        Ok(Self {
            metadata: SuiteMetadata {
                instrument_name: name,
                vx_pitch,
                encoding_frequency: frequency,
            },
            loop_behavior,
            loop_point,
            sample,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Encoder;

    fn test_sample() -> SuiteSample {
        let pcm: Vec<i16> = (0..64)
            .map(|i| ((i as f64 / 10.0).sin() * 20000.0) as i16)
            .collect();
        let brr = Encoder::default().encode(&pcm, Some(32)).unwrap();

        SuiteSample::new(
            brr,
            SuiteMetadata {
                instrument_name: "TEST".to_string(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn checksum_of_single_quiet_block() {
        let data = [0x01, 0, 0, 0, 0, 0, 0, 0, 0];

        assert_eq!(suite_checksum(&data), 0x0010);
        assert_eq!(suite_checksum(&data) ^ 0xffff, 0xffef);
    }

    #[test]
    fn checksum_weighs_data_bytes_by_position() {
        let mut data = [0u8; 9];
        data[8] = 1;
        assert_eq!(suite_checksum(&data), 1 << 7);

        data[8] = 0;
        data[1] = 3;
        assert_eq!(suite_checksum(&data), 3);

        // Two blocks accumulate
        let two = [
            [0x01u8, 0, 0, 0, 0, 0, 0, 0, 0],
            [0x01, 0, 0, 0, 0, 0, 0, 0, 0],
        ]
        .concat();
        assert_eq!(suite_checksum(&two), 0x0020);
    }

    #[test]
    fn checksum_is_deterministic() {
        let s = test_sample();
        assert_eq!(
            suite_checksum(s.sample().data()),
            suite_checksum(s.sample().data())
        );
    }

    #[test]
    fn serialized_header_layout() {
        let s = test_sample();
        let bytes = s.to_bytes().unwrap();

        assert_eq!(&bytes[0..4], b"BRRS");
        assert_eq!(&bytes[8..12], b"META");
        assert_eq!(&bytes[51..55], b"DATA");

        // Instrument name is space padded to exactly 24 bytes
        assert_eq!(&bytes[12..36], b"TEST                    ");

        // Checksum and complement XOR to 0xffff
        let checksum = u16::from_le_bytes([bytes[4], bytes[5]]);
        let complement = u16::from_le_bytes([bytes[6], bytes[7]]);
        assert_eq!(checksum ^ complement, 0xffff);
        assert_eq!(checksum, suite_checksum(&bytes[64..]));

        // Loop fields
        let block_count = s.sample().block_count() as u16;
        assert_eq!(bytes[55], LoopBehavior::Looping.as_u8());
        assert_eq!(
            u16::from_le_bytes([bytes[58], bytes[59]]),
            s.sample().loop_block() as u16 * 9
        );
        assert_eq!(u16::from_le_bytes([bytes[60], bytes[61]]), block_count);
        assert_eq!(
            u16::from_le_bytes([bytes[62], bytes[63]]),
            block_count * 9
        );
        assert_eq!(bytes.len(), 64 + usize::from(block_count) * 9);
    }

    #[test]
    fn round_trip() {
        let s = test_sample();
        let parsed = SuiteSample::from_bytes(&s.to_bytes().unwrap()).unwrap();

        assert_eq!(parsed, s);
    }

    #[test]
    fn parse_rejects_corruption() {
        let s = test_sample();
        let good = s.to_bytes().unwrap();

        assert!(matches!(
            SuiteSample::from_bytes(&good[..40]),
            Err(SuiteParseError::FileTooShort(40))
        ));

        let mut bad = good.clone();
        bad[0] = b'X';
        assert!(matches!(
            SuiteSample::from_bytes(&bad),
            Err(SuiteParseError::BadSignature)
        ));

        let mut bad = good.clone();
        bad[9] = b'X';
        assert!(matches!(
            SuiteSample::from_bytes(&bad),
            Err(SuiteParseError::BadMetaSignature)
        ));

        let mut bad = good.clone();
        bad[52] = b'X';
        assert!(matches!(
            SuiteSample::from_bytes(&bad),
            Err(SuiteParseError::BadDataSignature)
        ));

        // Complement must match the checksum
        let mut bad = good.clone();
        bad[6] ^= 0x01;
        assert!(matches!(
            SuiteSample::from_bytes(&bad),
            Err(SuiteParseError::ChecksumComplementMismatch(_, _))
        ));

        // Corrupt data fails the stored checksum
        let mut bad = good.clone();
        bad[70] ^= 0x10;
        assert!(matches!(
            SuiteSample::from_bytes(&bad),
            Err(SuiteParseError::ChecksumMismatch(_, _))
        ));

        // Wrong length field
        let mut bad = good.clone();
        bad[62] ^= 0x01;
        assert!(matches!(
            SuiteSample::from_bytes(&bad),
            Err(SuiteParseError::WrongSampleLength(_, _))
        ));

        // An appended all-zero block contributes nothing to the checksum,
        // so only the block count gives it away
        let mut bad = good.clone();
        bad.extend_from_slice(&[0; 9]);
        assert!(matches!(
            SuiteSample::from_bytes(&bad),
            Err(SuiteParseError::WrongBlockCount(_, 5))
        ));

        // Loop point that disagrees with the loop block
        let mut bad = good.clone();
        bad[58] = bad[58].wrapping_add(9);
        assert!(matches!(
            SuiteSample::from_bytes(&bad),
            Err(SuiteParseError::LoopMismatch)
        ));

        // Loop behavior that disagrees with the header flags
        let mut bad = good.clone();
        bad[55] = LoopBehavior::NonLooping.as_u8();
        assert!(matches!(
            SuiteSample::from_bytes(&bad),
            Err(SuiteParseError::LoopBehaviorMismatch)
        ));
    }

    #[test]
    fn name_sanitization() {
        let brr = Encoder::default().encode(&[0; 16], None).unwrap();
        let mut s = SuiteSample::new(brr, SuiteMetadata::default()).unwrap();

        s.set_instrument_name("Str\u{0007}ings\u{00ad}\u{00a0}01\u{4e00}")
            .unwrap();
        assert_eq!(s.instrument_name(), "Strings 01");

        s.set_instrument_name("Orgel\u{00e9}").unwrap();
        assert_eq!(s.instrument_name(), "Orgel\u{00e9}");

        // Control characters do not count towards the length limit
        s.set_instrument_name("\u{0001}123456789012345678901234").unwrap();
        assert_eq!(s.instrument_name().len(), 24);

        assert!(matches!(
            s.set_instrument_name("1234567890123456789012345"),
            Err(SuiteError::NameTooLong(25))
        ));
    }

    #[test]
    fn latin1_name_survives_serialization() {
        let brr = Encoder::default().encode(&[0; 16], None).unwrap();
        let mut s = SuiteSample::new(brr, SuiteMetadata::default()).unwrap();
        s.set_instrument_name("Orgel\u{00e9}").unwrap();

        let bytes = s.to_bytes().unwrap();
        assert_eq!(bytes[12 + 5], 0xe9);

        let parsed = SuiteSample::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.instrument_name(), "Orgel\u{00e9}");
    }

    #[test]
    fn vx_pitch_normalizes_out_of_range() {
        let mut s = test_sample();

        s.set_vx_pitch(0x3fff);
        assert_eq!(s.vx_pitch(), 0x3fff);

        s.set_vx_pitch(0x4000);
        assert_eq!(s.vx_pitch(), 0);
    }

    #[test]
    fn encoding_frequency_must_be_positive() {
        let mut s = test_sample();

        assert!(matches!(
            s.set_encoding_frequency(0),
            Err(SuiteError::InvalidEncodingFrequency(0))
        ));
        assert!(matches!(
            s.set_encoding_frequency(-16000),
            Err(SuiteError::InvalidEncodingFrequency(-16000))
        ));

        s.set_encoding_frequency(16000).unwrap();
        assert_eq!(s.encoding_frequency(), 16000);
    }

    #[test]
    fn loop_point_taxonomy() {
        let mut s = test_sample();
        let len = s.sample().data().len() as u16;

        s.set_and_flag_loop_point(9);
        assert_eq!(s.loop_behavior(), LoopBehavior::Looping);
        assert_eq!(s.sample().loop_block(), 1);
        assert!(s.sample().block(s.sample().block_count() - 1).unwrap().loop_flag());

        s.set_and_flag_loop_point(13);
        assert_eq!(s.loop_behavior(), LoopBehavior::Misaligned);
        assert_eq!(s.loop_point(), 13);

        s.set_and_flag_loop_point(len);
        assert_eq!(s.loop_behavior(), LoopBehavior::Extrinsic);

        s.clear_loop();
        assert_eq!(s.loop_behavior(), LoopBehavior::NonLooping);
        assert_eq!(s.loop_point(), 0);
        assert!(!s.sample().is_looping());
        assert!(!s.sample().block(s.sample().block_count() - 1).unwrap().loop_flag());
    }

    #[test]
    fn serializing_a_broken_sample_fails() {
        let mut s = test_sample();
        // Force an out-of-range loop point
        s.set_and_flag_loop_point(9);
        s.loop_point = s.sample().data().len() as u16 + 9;

        assert!(matches!(
            s.to_bytes(),
            Err(SuiteError::UnresolvableData(_))
        ));
    }
}
