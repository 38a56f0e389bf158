/*
 *  render/config.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bargraph render settings, overlay anchors and alignment flags
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

use log::warn;
use std::ops::BitOr;

pub const DEFAULT_BAR_WIDTH: u32 = 30;
pub const DEFAULT_BAR_HEIGHT: u32 = 300;
pub const MAX_BAR_WIDTH: u32 = 512;
pub const MAX_BAR_HEIGHT: u32 = 4096;

/// Subpicture alignment flags, same bit values as the position option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Align(u8);

impl Align {
    pub const CENTER: Align = Align(0);
    pub const LEFT: Align = Align(1);
    pub const RIGHT: Align = Align(2);
    pub const TOP: Align = Align(4);
    pub const BOTTOM: Align = Align(8);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Align) -> bool {
        self.0 & other.0 == other.0
    }

    /// Fill in a missing axis: no horizontal flag means left, no vertical
    /// flag means top. This is what the compositor expects on a region.
    pub fn normalized(self) -> Align {
        let mut out = self;
        if self.0 & (Align::LEFT.0 | Align::RIGHT.0) == 0 {
            out = out | Align::LEFT;
        }
        if self.0 & (Align::TOP.0 | Align::BOTTOM.0) == 0 {
            out = out | Align::TOP;
        }
        out
    }
}

impl BitOr for Align {
    type Output = Align;
    fn bitor(self, rhs: Align) -> Align {
        Align(self.0 | rhs.0)
    }
}

/// Where the bargraph sits on the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    Center,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    /// placed at the configured x/y
    #[default]
    Absolute,
}

impl Position {
    /// Decode the `0=center, 1=left, 2=right, 4=top, 8=bottom` bitmask.
    ///
    /// Negative values select absolute placement. Unknown high bits are
    /// ignored and contradictory pairs (left+right, top+bottom) cancel out.
    pub fn from_bitmask(value: i32) -> Position {
        if value < 0 {
            return Position::Absolute;
        }
        if value & !0xF != 0 {
            warn!("position {value} has unknown bits, using {}", value & 0xF);
        }
        let horizontal = match (value & 1 != 0, value & 2 != 0) {
            (true, false) => Some(Align::LEFT),
            (false, true) => Some(Align::RIGHT),
            _ => None,
        };
        let vertical = match (value & 4 != 0, value & 8 != 0) {
            (true, false) => Some(Align::TOP),
            (false, true) => Some(Align::BOTTOM),
            _ => None,
        };
        match (horizontal, vertical) {
            (None, None) => Position::Center,
            (Some(Align::LEFT), None) => Position::Left,
            (Some(_), None) => Position::Right,
            (None, Some(Align::TOP)) => Position::Top,
            (None, Some(_)) => Position::Bottom,
            (Some(Align::LEFT), Some(Align::TOP)) => Position::TopLeft,
            (Some(_), Some(Align::TOP)) => Position::TopRight,
            (Some(Align::LEFT), Some(_)) => Position::BottomLeft,
            (Some(_), Some(_)) => Position::BottomRight,
        }
    }

    /// Inverse of [`from_bitmask`](Self::from_bitmask), -1 for absolute.
    pub fn bitmask(self) -> i32 {
        self.align().map_or(-1, |a| a.bits() as i32)
    }

    /// Raw anchor flags, None for absolute placement
    pub fn align(self) -> Option<Align> {
        let a = match self {
            Position::Center => Align::CENTER,
            Position::Left => Align::LEFT,
            Position::Right => Align::RIGHT,
            Position::Top => Align::TOP,
            Position::Bottom => Align::BOTTOM,
            Position::TopLeft => Align::TOP | Align::LEFT,
            Position::TopRight => Align::TOP | Align::RIGHT,
            Position::BottomLeft => Align::BOTTOM | Align::LEFT,
            Position::BottomRight => Align::BOTTOM | Align::RIGHT,
            Position::Absolute => return None,
        };
        Some(a)
    }
}

/// Everything a render pass and the overlay need, mutated live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub bar_width: u32,
    pub bar_height: u32,
    /// 0 fully transparent .. 255 opaque
    pub alpha: u8,
    pub alarm: bool,
    pub position: Position,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bar_width: DEFAULT_BAR_WIDTH,
            bar_height: DEFAULT_BAR_HEIGHT,
            alpha: 255,
            alarm: false,
            position: Position::Absolute,
            offset_x: 0,
            offset_y: 0,
        }
    }
}

/// Bar width from an untrusted integer, clamped to 1..=MAX_BAR_WIDTH
pub fn clamp_bar_width(value: i32) -> u32 {
    clamp_logged(value, 1, MAX_BAR_WIDTH, "bar width")
}

/// Bar height from an untrusted integer, clamped to 1..=MAX_BAR_HEIGHT
pub fn clamp_bar_height(value: i32) -> u32 {
    clamp_logged(value, 1, MAX_BAR_HEIGHT, "bar height")
}

/// Transparency from an untrusted integer, clamped to 0..=255
pub fn clamp_alpha(value: i32) -> u8 {
    clamp_logged(value, 0, 255, "transparency") as u8
}

fn clamp_logged(value: i32, min: u32, max: u32, what: &str) -> u32 {
    let clamped = (value as i64).clamp(min as i64, max as i64) as u32;
    if clamped as i64 != value as i64 {
        warn!("{what} {value} out of range, using {clamped}");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_bitmask_roundtrip_for_anchors() {
        for v in [0, 1, 2, 4, 8, 5, 6, 9, 10] {
            assert_eq!(Position::from_bitmask(v).bitmask(), v);
        }
        assert_eq!(Position::from_bitmask(-1), Position::Absolute);
        assert_eq!(Position::Absolute.bitmask(), -1);
    }

    #[test]
    fn test_position_malformed_masks() {
        assert_eq!(Position::from_bitmask(3), Position::Center);
        assert_eq!(Position::from_bitmask(7), Position::Top);
        assert_eq!(Position::from_bitmask(0x16), Position::TopRight);
    }

    #[test]
    fn test_align_normalized() {
        assert_eq!(Align::CENTER.normalized(), Align::LEFT | Align::TOP);
        assert_eq!(Align::RIGHT.normalized(), Align::RIGHT | Align::TOP);
        assert_eq!(Align::BOTTOM.normalized(), Align::BOTTOM | Align::LEFT);
        let br = Align::BOTTOM | Align::RIGHT;
        assert_eq!(br.normalized(), br);
        assert!(br.contains(Align::RIGHT));
        assert!(!br.contains(Align::LEFT));
    }

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_alpha(300), 255);
        assert_eq!(clamp_alpha(-4), 0);
        assert_eq!(clamp_bar_width(0), 1);
        assert_eq!(clamp_bar_width(40), 40);
        assert_eq!(clamp_bar_height(i32::MAX), MAX_BAR_HEIGHT);
    }
}
