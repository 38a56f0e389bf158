/*
 *  render/raster.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Raster backend: embedded-graphics primitives into an RGBA framebuffer
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

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};

use crate::color::{self, Rgba};
use crate::error::RenderError;
use crate::render::canvas::{Canvas, TextLabel};
use crate::vframebuf::VarFrameBuf;

/// Pixel canvas. Text is not rasterized here, labels are collected and
/// handed to the compositor alongside the image.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    fb: VarFrameBuf<Rgba>,
    labels: Vec<TextLabel>,
}

impl RasterCanvas {
    pub fn try_new(width: u32, height: u32) -> Result<Self, RenderError> {
        let bytes = (width as usize).saturating_mul(height as usize).saturating_mul(4);
        let fb = VarFrameBuf::try_new(width, height, color::TRANSPARENT)
            .map_err(|source| RenderError::Allocation { bytes, source })?;
        Ok(Self { fb, labels: Vec::new() })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.fb.width() as u32, self.fb.height() as u32)
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgba> {
        self.fb.pixel(x, y)
    }

    pub fn labels(&self) -> &[TextLabel] {
        &self.labels
    }

    /// Packed RGBA, row-major, straight alpha
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.fb.as_slice().iter().flat_map(|p| p.to_bytes()).collect()
    }

    /// Planar Y, U, V then A, each plane `width * height` bytes
    pub fn to_yuva_planes(&self) -> Vec<u8> {
        let pixels = self.fb.as_slice();
        let n = pixels.len();
        let mut out = vec![0u8; n * 4];
        for (i, p) in pixels.iter().enumerate() {
            let (y, u, v) = p.to_yuv();
            out[i] = y;
            out[n + i] = u;
            out[2 * n + i] = v;
            out[3 * n + i] = p.a;
        }
        out
    }
}

impl Canvas for RasterCanvas {
    fn size(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn clear(&mut self) {
        self.fb.clear_color(color::TRANSPARENT);
        self.labels.clear();
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba) {
        if width == 0 || height == 0 {
            return;
        }
        Rectangle::new(Point::new(x, y), Size::new(width, height))
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(&mut self.fb)
            .ok();
    }

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgba) {
        Line::new(Point::new(from.0, from.1), Point::new(to.0, to.1))
            .into_styled(PrimitiveStyle::with_stroke(color, 1))
            .draw(&mut self.fb)
            .ok();
    }

    fn text(&mut self, label: &TextLabel) {
        self.labels.push(label.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::LabelKind;

    #[test]
    fn test_rect_and_line() {
        let mut c = RasterCanvas::try_new(8, 4).unwrap();
        c.fill_rect(1, 1, 2, 2, color::BRIGHT_RED);
        c.draw_line((4, 0), (6, 0), color::WHITE);
        assert_eq!(c.pixel(1, 1), Some(color::BRIGHT_RED));
        assert_eq!(c.pixel(2, 2), Some(color::BRIGHT_RED));
        assert_eq!(c.pixel(3, 1), Some(color::TRANSPARENT));
        assert_eq!(c.pixel(4, 0), Some(color::WHITE));
        assert_eq!(c.pixel(6, 0), Some(color::WHITE));
        assert_eq!(c.pixel(7, 0), Some(color::TRANSPARENT));
    }

    #[test]
    fn test_clear_resets_pixels_and_labels() {
        let mut c = RasterCanvas::try_new(2, 2).unwrap();
        c.fill_rect(0, 0, 2, 2, color::WHITE);
        c.text(&TextLabel { kind: LabelKind::Scale, text: "10".into(), x: 0, y: 0, font_size: 8 });
        c.clear();
        assert!(c.labels().is_empty());
        assert!(c.to_rgba_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_yuva_planes() {
        let mut c = RasterCanvas::try_new(2, 1).unwrap();
        c.fill_rect(1, 0, 1, 1, color::WHITE);
        let planes = c.to_yuva_planes();
        assert_eq!(planes.len(), 8);
        // Y plane
        assert_eq!(&planes[0..2], &[16, 235]);
        // A plane
        assert_eq!(&planes[6..8], &[0, 255]);
    }
}
