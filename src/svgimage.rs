/*
 *  svgimage.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Rasterize bargraph SVG markup and export frames as PNG
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

//! Uses `usvg` for parsing and `resvg` for rendering into a `tiny-skia`
//! pixmap. Output is straight alpha RGBA, the same packing the raster
//! backend produces, so the two can be compared pixel for pixel.

use resvg::render;
use usvg::{Options as UsvgOptions, Transform, Tree};
use tiny_skia::{ColorU8, IntSize, Pixmap};
use log::{debug, error};
use std::error::Error;
use std::fmt;

/// Custom error type for SVG rasterizing and PNG export.
#[derive(Debug)]
pub enum SvgImageError {
    /// Error parsing the SVG data.
    SvgParseError(String),
    /// Error creating a pixmap for rendering.
    PixmapCreationError(String),
    /// Pixel buffer does not match the stated size.
    BufferSizeMismatch { expected: usize, actual: usize },
    /// PNG encoding failed.
    EncodingError(String),
}

impl fmt::Display for SvgImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvgImageError::SvgParseError(msg) => write!(f, "SVG parse error: {}", msg),
            SvgImageError::PixmapCreationError(msg) => write!(f, "Pixmap creation error: {}", msg),
            SvgImageError::BufferSizeMismatch { expected, actual } => {
                write!(f, "pixel buffer holds {} bytes, expected {}", actual, expected)
            }
            SvgImageError::EncodingError(msg) => write!(f, "PNG encoding error: {}", msg),
        }
    }
}

impl Error for SvgImageError {}

/// Parsed SVG document ready to be drawn at its own size.
#[derive(Debug)]
pub struct SvgImageRenderer {
    tree: Tree,
    width: u32,
    height: u32,
}

impl SvgImageRenderer {
    pub fn new(svg_data: &str) -> Result<Self, SvgImageError> {
        let options = UsvgOptions::default();
        let tree = Tree::from_str(svg_data, &options)
            .map_err(|e| SvgImageError::SvgParseError(format!("Failed to parse SVG: {:?}", e)))?;
        let size = tree.size().to_int_size();
        Ok(Self { width: size.width(), height: size.height(), tree })
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    fn pixmap(&self) -> Result<Pixmap, SvgImageError> {
        let mut pixmap = Pixmap::new(self.width, self.height).ok_or_else(|| {
            SvgImageError::PixmapCreationError(format!("{}x{}", self.width, self.height))
        })?;
        // document is drawn 1:1, the viewBox matches width/height
        render(&self.tree, Transform::identity(), &mut pixmap.as_mut());
        Ok(pixmap)
    }

    /// Packed RGBA, straight alpha, row-major
    pub fn render_rgba(&self) -> Result<Vec<u8>, SvgImageError> {
        let pixmap = self.pixmap()?;
        let rgba = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        debug!("SVG rasterized at {}x{}", self.width, self.height);
        Ok(rgba)
    }

    pub fn render_png(&self) -> Result<Vec<u8>, SvgImageError> {
        self.pixmap()?
            .encode_png()
            .map_err(|e| SvgImageError::EncodingError(e.to_string()))
    }
}

/// Encode a straight alpha RGBA frame as PNG.
pub fn rgba_to_png(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, SvgImageError> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        error!("PNG export with {} bytes for {}x{}", rgba.len(), width, height);
        return Err(SvgImageError::BufferSizeMismatch { expected, actual: rgba.len() });
    }
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| SvgImageError::PixmapCreationError(format!("{}x{}", width, height)))?;

    // tiny-skia stores premultiplied pixels
    let premultiplied: Vec<u8> = rgba
        .chunks_exact(4)
        .flat_map(|p| {
            let c = ColorU8::from_rgba(p[0], p[1], p[2], p[3]).premultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    let pixmap = Pixmap::from_vec(premultiplied, size)
        .ok_or_else(|| SvgImageError::PixmapCreationError(format!("{}x{}", width, height)))?;
    pixmap.encode_png().map_err(|e| SvgImageError::EncodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="3" viewBox="0 0 4 3" shape-rendering="crispEdges">
<rect x="1" y="1" width="2" height="1" fill="#ff0000"/>
</svg>"##;

    #[test]
    fn test_rasterize_rect() {
        let r = SvgImageRenderer::new(SQUARE).unwrap();
        assert_eq!((r.width(), r.height()), (4, 3));
        let px = r.render_rgba().unwrap();
        assert_eq!(px.len(), 4 * 3 * 4);
        let at = |x: usize, y: usize| &px[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
        assert_eq!(at(1, 1), &[255, 0, 0, 255]);
        assert_eq!(at(2, 1), &[255, 0, 0, 255]);
        assert_eq!(at(0, 0)[3], 0);
    }

    #[test]
    fn test_png_signature() {
        let png = rgba_to_png(2, 1, &[255, 0, 0, 255, 0, 0, 0, 0]).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let png = SvgImageRenderer::new(SQUARE).unwrap().render_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn test_size_mismatch() {
        assert!(matches!(
            rgba_to_png(2, 2, &[0; 4]),
            Err(SvgImageError::BufferSizeMismatch { expected: 16, actual: 4 })
        ));
    }

    #[test]
    fn test_bad_markup() {
        assert!(matches!(SvgImageRenderer::new("<svg"), Err(SvgImageError::SvgParseError(_))));
    }
}
