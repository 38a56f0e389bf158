/*
 *  peak.rs
 *
 *  LyMonS - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	Per-channel peak extraction from decoded PCM blocks
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use arrayvec::ArrayVec;
use std::fmt;

use crate::error::PeakError;

/// Most channels a single stream can carry (host limit).
pub const MAX_CHANNELS: usize = 9;

/// One normalized peak per channel for a single audio block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakSnapshot {
    values: ArrayVec<f32, MAX_CHANNELS>,
}

impl PeakSnapshot {
    /// All channels silent
    pub fn silence(channels: usize) -> Self {
        let mut values = ArrayVec::new();
        for _ in 0..channels.min(MAX_CHANNELS) {
            values.push(0.0);
        }
        Self { values }
    }

    /// Build from raw values, clamped to [0,1] (NaN reads as 0).
    /// Channels past [`MAX_CHANNELS`] are ignored.
    pub fn from_values(values: &[f32]) -> Self {
        Self {
            values: values.iter().take(MAX_CHANNELS).map(|v| clamp_unit(*v)).collect(),
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn channels(&self) -> usize {
        self.values.len()
    }

    /// Truncate or zero-pad to `channels`
    pub fn conform(&mut self, channels: usize) {
        let channels = channels.min(MAX_CHANNELS);
        self.values.truncate(channels);
        while self.values.len() < channels {
            self.values.push(0.0);
        }
    }
}

#[inline]
fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Interleaved sample encodings delivered by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 32-bit float, little endian
    F32L,
    /// 64-bit float, little endian
    F64L,
    /// signed 32-bit, native endian
    S32N,
    /// signed 16-bit, native endian
    S16N,
    /// unsigned 8-bit, 128 is zero
    U8,
    /// anything else, by fourcc
    Other([u8; 4]),
}

impl SampleFormat {
    pub fn from_fourcc(code: &[u8; 4]) -> Self {
        match code {
            b"f32l" => SampleFormat::F32L,
            b"f64l" => SampleFormat::F64L,
            b"s32l" | b"s32n" => SampleFormat::S32N,
            b"s16l" | b"s16n" => SampleFormat::S16N,
            b"u8  " => SampleFormat::U8,
            other => SampleFormat::Other(*other),
        }
    }

    /// Bytes per sample, None when unsupported
    pub fn sample_bytes(self) -> Option<usize> {
        match self {
            SampleFormat::F32L | SampleFormat::S32N => Some(4),
            SampleFormat::F64L => Some(8),
            SampleFormat::S16N => Some(2),
            SampleFormat::U8 => Some(1),
            SampleFormat::Other(_) => None,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleFormat::F32L => write!(f, "f32l"),
            SampleFormat::F64L => write!(f, "f64l"),
            SampleFormat::S32N => write!(f, "s32n"),
            SampleFormat::S16N => write!(f, "s16n"),
            SampleFormat::U8 => write!(f, "u8"),
            SampleFormat::Other(code) => write!(f, "{}", String::from_utf8_lossy(code)),
        }
    }
}

/// Peak magnitude per channel over one interleaved block.
///
/// Integer formats are normalized by their full scale. A trailing partial
/// frame is ignored; an empty block is silence.
pub fn extract_peaks(format: SampleFormat, data: &[u8], channels: usize) -> Result<PeakSnapshot, PeakError> {
    if channels > MAX_CHANNELS {
        return Err(PeakError::TooManyChannels { requested: channels, max: MAX_CHANNELS });
    }
    let Some(size) = format.sample_bytes() else {
        return Err(PeakError::UnsupportedFormat(format.to_string()));
    };
    if channels == 0 {
        return Ok(PeakSnapshot::default());
    }

    let mut peaks = [0f32; MAX_CHANNELS];
    let frame = size * channels;
    for block in data.chunks_exact(frame) {
        for (ch, sample) in block.chunks_exact(size).enumerate() {
            let magnitude = sample_magnitude(format, sample);
            if magnitude > peaks[ch] {
                peaks[ch] = magnitude;
            }
        }
    }
    Ok(PeakSnapshot::from_values(&peaks[..channels]))
}

#[inline]
fn sample_magnitude(format: SampleFormat, s: &[u8]) -> f32 {
    match format {
        SampleFormat::F32L => f32::from_le_bytes([s[0], s[1], s[2], s[3]]).abs(),
        SampleFormat::F64L => {
            f64::from_le_bytes([s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7]]).abs() as f32
        }
        SampleFormat::S32N => {
            (i32::from_ne_bytes([s[0], s[1], s[2], s[3]]) as i64).abs() as f32 / 2_147_483_648.0
        }
        SampleFormat::S16N => (i16::from_ne_bytes([s[0], s[1]]) as i32).abs() as f32 / 32_768.0,
        SampleFormat::U8 => (s[0] as i32 - 128).abs() as f32 / 128.0,
        SampleFormat::Other(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s16_block(frames: &[[i16; 2]]) -> Vec<u8> {
        frames.iter().flat_map(|f| f.iter().flat_map(|s| s.to_ne_bytes())).collect()
    }

    #[test]
    fn test_s16_stereo_peaks() {
        let data = s16_block(&[[1000, -16384], [-8192, 200], [0, 0]]);
        let snap = extract_peaks(SampleFormat::S16N, &data, 2).unwrap();
        assert_eq!(snap.channels(), 2);
        assert!((snap.values()[0] - 0.25).abs() < 1e-6);
        assert!((snap.values()[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_s16_full_negative_scale_clamps() {
        let data = s16_block(&[[i16::MIN, i16::MAX]]);
        let snap = extract_peaks(SampleFormat::S16N, &data, 2).unwrap();
        assert_eq!(snap.values()[0], 1.0);
        assert!(snap.values()[1] < 1.0);
    }

    #[test]
    fn test_f32_and_u8() {
        let data: Vec<u8> = [0.25f32, -0.75, 0.5].iter().flat_map(|v| v.to_le_bytes()).collect();
        let snap = extract_peaks(SampleFormat::F32L, &data, 1).unwrap();
        assert_eq!(snap.values(), &[0.75]);

        let snap = extract_peaks(SampleFormat::U8, &[128, 64, 160], 1).unwrap();
        assert_eq!(snap.values(), &[0.5]);
    }

    #[test]
    fn test_f64_and_s32() {
        let data: Vec<u8> = [-0.125f64, 0.0625].iter().flat_map(|v| v.to_le_bytes()).collect();
        let snap = extract_peaks(SampleFormat::F64L, &data, 2).unwrap();
        assert_eq!(snap.values(), &[0.125, 0.0625]);

        let data: Vec<u8> = [i32::MIN / 2].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let snap = extract_peaks(SampleFormat::S32N, &data, 1).unwrap();
        assert_eq!(snap.values(), &[0.5]);
    }

    #[test]
    fn test_unsupported_format() {
        let fmt = SampleFormat::from_fourcc(b"mp4a");
        let err = extract_peaks(fmt, &[0; 16], 2).unwrap_err();
        assert_eq!(err, PeakError::UnsupportedFormat("mp4a".into()));
    }

    #[test]
    fn test_partial_frame_ignored() {
        // one full stereo frame plus a dangling left sample
        let mut data = s16_block(&[[100, 200]]);
        data.extend_from_slice(&i16::MAX.to_ne_bytes());
        let snap = extract_peaks(SampleFormat::S16N, &data, 2).unwrap();
        assert!(snap.values()[0] < 0.01);
    }

    #[test]
    fn test_snapshot_conform_and_clamp() {
        let mut snap = PeakSnapshot::from_values(&[1.5, f32::NAN, -0.2]);
        assert_eq!(snap.values(), &[1.0, 0.0, 0.0]);
        snap.conform(5);
        assert_eq!(snap.channels(), 5);
        snap.conform(1);
        assert_eq!(snap.values(), &[1.0]);
    }
}
