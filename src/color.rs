/*
 *  color.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  RGBA pixel color for the bargraph canvas, with YUV conversion
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::pixelcolor::PixelColor;
use embedded_graphics::pixelcolor::raw::RawU32;

/// 8-bit per component color with straight (non premultiplied) alpha.
///
/// Implements `PixelColor` so the bargraph canvas can be driven with the
/// regular embedded-graphics primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl PixelColor for Rgba {
    type Raw = RawU32;
}

pub const TRANSPARENT: Rgba = Rgba::new(0x00, 0x00, 0x00, 0x00);
pub const BLACK: Rgba = Rgba::opaque(0x00, 0x00, 0x00);
pub const WHITE: Rgba = Rgba::opaque(0xFF, 0xFF, 0xFF);

// lit tiers
pub const BRIGHT_GREEN: Rgba = Rgba::opaque(0x00, 0xFF, 0x00);
pub const BRIGHT_YELLOW: Rgba = Rgba::opaque(0xFF, 0xFF, 0x00);
pub const BRIGHT_RED: Rgba = Rgba::opaque(0xFF, 0x00, 0x00);

// unlit tiers
pub const GREEN: Rgba = Rgba::opaque(0x00, 0x80, 0x00);
pub const YELLOW: Rgba = Rgba::opaque(0x80, 0x80, 0x00);
pub const RED: Rgba = Rgba::opaque(0x80, 0x00, 0x00);

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xFF)
    }

    /// Bytes in R, G, B, A memory order
    #[inline]
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// BT.601 limited range Y'CbCr, integer approximation.
    ///
    /// Black maps to (16, 128, 128), white to (235, 128, 128).
    pub fn to_yuv(self) -> (u8, u8, u8) {
        let (r, g, b) = (self.r as i32, self.g as i32, self.b as i32);
        let y = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
        let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
        let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
        (
            y.clamp(0, 255) as u8,
            u.clamp(0, 255) as u8,
            v.clamp(0, 255) as u8,
        )
    }

    /// `#rrggbb` for markup output, alpha is carried separately
    pub fn svg_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuv_reference_points() {
        assert_eq!(BLACK.to_yuv(), (16, 128, 128));
        assert_eq!(WHITE.to_yuv(), (235, 128, 128));
        assert_eq!(BRIGHT_RED.to_yuv(), (82, 90, 240));
    }

    #[test]
    fn test_svg_hex() {
        assert_eq!(BRIGHT_YELLOW.svg_hex(), "#ffff00");
        assert_eq!(GREEN.svg_hex(), "#008000");
    }

    #[test]
    fn test_byte_order() {
        assert_eq!(Rgba::new(1, 2, 3, 4).to_bytes(), [1, 2, 3, 4]);
    }
}
