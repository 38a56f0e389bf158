/*
 *  render/canvas.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Drawing surface shared by the raster and SVG backends
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

use crate::color::Rgba;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// dB figure next to a scale tick
    Scale,
    /// stream name under its bars
    Stream,
}

/// A text string anchored at its top-left corner in canvas coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLabel {
    pub kind: LabelKind,
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub font_size: u32,
}

/// Drawing primitives the bargraph needs. Coordinates are canvas pixels,
/// origin top-left; anything outside the canvas is clipped.
pub trait Canvas {
    fn size(&self) -> (u32, u32);

    /// Reset every pixel to transparent and forget any text
    fn clear(&mut self);

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba);

    /// One pixel wide, both end points inclusive
    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgba);

    fn text(&mut self, label: &TextLabel);
}
