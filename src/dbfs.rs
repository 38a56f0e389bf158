/*
 *  dbfs.rs
 *
 *  LyMonS - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	IEC 268-18 meter scale and peak to dBFS conversion
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

/// Level reported for digital silence. Well below the -70 dB scale floor.
pub const SILENCE_DB: f32 = -100.0;

/// Bottom of the IEC scale, anything quieter sits on the floor.
pub const IEC_FLOOR_DB: f32 = -70.0;

/// Map a level in dB to a normalized [0,1] position on an IEC 268-18 meter.
///
/// Piecewise linear (meterbridge table), finer resolution near 0 dB.
/// Total over f32: NaN and -inf land on 0, anything at or above 0 dB is 1.
pub fn iec_scale(db: f32) -> f32 {
    if db.is_nan() || db < IEC_FLOOR_DB {
        return 0.0;
    }
    if db < -60.0 {
        return (db + 70.0) * 0.0025;
    }
    if db < -50.0 {
        return (db + 60.0) * 0.005 + 0.025;
    }
    if db < -40.0 {
        return (db + 50.0) * 0.0075 + 0.075;
    }
    if db < -30.0 {
        return (db + 40.0) * 0.015 + 0.15;
    }
    if db < -20.0 {
        return (db + 30.0) * 0.02 + 0.3;
    }
    if db < 0.0 {
        return (db + 20.0) * 0.025 + 0.5;
    }
    1.0
}

/// Linear peak amplitude (0..1) to dBFS.
///
/// Silence is an explicit branch: a zero, negative or NaN peak never reaches
/// `log10` and reports [`SILENCE_DB`].
#[inline]
pub fn peak_to_db(peak: f32) -> f32 {
    if peak.is_nan() || peak <= 0.0 {
        return SILENCE_DB;
    }
    (20.0 * peak.log10()).max(SILENCE_DB)
}

/// Peak amplitude straight to a scale position.
#[inline]
pub fn peak_to_scale(peak: f32) -> f32 {
    iec_scale(peak_to_db(peak))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_anchors() {
        assert_eq!(iec_scale(0.0), 1.0);
        assert_eq!(iec_scale(6.0), 1.0);
        assert_eq!(iec_scale(-70.0), 0.0);
        assert_eq!(iec_scale(-75.0), 0.0);
        assert!((iec_scale(-20.0) - 0.5).abs() < 1e-6);
        assert!((iec_scale(-8.0) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_scale_non_finite() {
        assert_eq!(iec_scale(f32::NAN), 0.0);
        assert_eq!(iec_scale(f32::NEG_INFINITY), 0.0);
        assert_eq!(iec_scale(f32::INFINITY), 1.0);
    }

    #[test]
    fn test_scale_monotonic() {
        let mut prev = iec_scale(-90.0);
        let mut db = -90.0f32;
        while db <= 5.0 {
            let v = iec_scale(db);
            assert!(v + 1e-6 >= prev, "scale dropped at {db} dB: {prev} -> {v}");
            assert!((0.0..=1.0).contains(&v));
            prev = v;
            db += 0.01;
        }
    }

    #[test]
    fn test_scale_continuous_at_breakpoints() {
        for bp in [-60.0f32, -50.0, -40.0, -30.0, -20.0] {
            let below = iec_scale(bp - 1e-3);
            let at = iec_scale(bp);
            assert!((at - below).abs() < 1e-3, "gap at {bp}: {below} vs {at}");
        }
    }

    #[test]
    fn test_zero_peak_is_silence() {
        assert_eq!(peak_to_db(0.0), SILENCE_DB);
        assert_eq!(peak_to_db(-0.5), SILENCE_DB);
        assert_eq!(peak_to_db(f32::NAN), SILENCE_DB);
        assert_eq!(peak_to_scale(0.0), 0.0);
        assert_eq!(peak_to_scale(1.0), 1.0);
        assert!((peak_to_db(0.5) + 6.0206).abs() < 1e-3);
    }
}
