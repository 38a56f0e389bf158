/*
 *  render/mod.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bargraph renderer: one frame from a registry snapshot, raster or SVG
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

pub mod canvas;
pub mod config;
pub mod geometry;
pub mod raster;
pub mod svg;

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::func_timer::FunctionTimer;
use crate::registry::RegistrySnapshot;

use self::canvas::TextLabel;
use self::config::RenderConfig;
use self::geometry::{BarGraphLayout, canvas_size};
use self::raster::RasterCanvas;
use self::svg::SvgCanvas;

/// Largest canvas we agree to allocate (4096 x 4096)
pub const MAX_CANVAS_PIXELS: u64 = 16_777_216;

/// Pixel packing handed to the compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    /// packed R, G, B, A
    #[default]
    Rgba,
    /// planar Y, U, V, A
    Yuva,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Raster,
    Svg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    Rgba(Vec<u8>),
    Yuva(Vec<u8>),
    Svg(String),
}

/// One rendered frame plus the text the compositor should draw over it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub data: ImageData,
    pub labels: Vec<TextLabel>,
}

impl RenderedImage {
    pub fn as_svg(&self) -> Option<&str> {
        match &self.data {
            ImageData::Svg(s) => Some(s),
            _ => None,
        }
    }

    /// Raw pixel bytes for raster output
    pub fn pixels(&self) -> Option<&[u8]> {
        match &self.data {
            ImageData::Rgba(b) | ImageData::Yuva(b) => Some(b),
            ImageData::Svg(_) => None,
        }
    }
}

/// Refuse canvases with no area or past [`MAX_CANVAS_PIXELS`]
pub fn check_canvas(width: u32, height: u32) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyCanvas { width, height });
    }
    if width as u64 * height as u64 > MAX_CANVAS_PIXELS {
        return Err(RenderError::CanvasTooLarge { width, height, max: MAX_CANVAS_PIXELS });
    }
    Ok(())
}

// rejects absurd bar sizes before any layout arithmetic runs
fn check_layout_size(snapshot: &RegistrySnapshot, config: &RenderConfig) -> Result<(), RenderError> {
    let (width, height) = canvas_size(config.bar_width, config.bar_height, snapshot.channel_counts());
    check_canvas(width, height)
}

/// Draws frames. Keeps the raster canvas between frames and only
/// reallocates it when the canvas dimensions change.
#[derive(Debug, Default)]
pub struct BarGraphRenderer {
    canvas: Option<RasterCanvas>,
    allocations: u64,
}

impl BarGraphRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the raster canvas has been (re)allocated
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    pub fn cached_size(&self) -> Option<(u32, u32)> {
        self.canvas.as_ref().map(|c| c.dimensions())
    }

    /// Drop the cached canvas
    pub fn release(&mut self) {
        if let Some((w, h)) = self.cached_size() {
            debug!("releasing bargraph canvas {w}x{h}");
        }
        self.canvas = None;
    }

    /// Render in the requested format. Failures are logged and yield None,
    /// meaning "no update this tick".
    pub fn render(
        &mut self,
        snapshot: &RegistrySnapshot,
        config: &RenderConfig,
        format: OutputFormat,
        layout: PixelLayout,
    ) -> Option<RenderedImage> {
        let result = match format {
            OutputFormat::Raster => self.try_render_raster(snapshot, config, layout),
            OutputFormat::Svg => self.try_render_svg(snapshot, config),
        };
        match result {
            Ok(image) => Some(image),
            Err(e) => {
                error!("bargraph render failed: {e}");
                None
            }
        }
    }

    pub fn render_raster(
        &mut self,
        snapshot: &RegistrySnapshot,
        config: &RenderConfig,
        layout: PixelLayout,
    ) -> Option<RenderedImage> {
        self.render(snapshot, config, OutputFormat::Raster, layout)
    }

    pub fn render_svg(&mut self, snapshot: &RegistrySnapshot, config: &RenderConfig) -> Option<RenderedImage> {
        self.render(snapshot, config, OutputFormat::Svg, PixelLayout::default())
    }

    pub fn try_render_raster(
        &mut self,
        snapshot: &RegistrySnapshot,
        config: &RenderConfig,
        pixel_layout: PixelLayout,
    ) -> Result<RenderedImage, RenderError> {
        let _timer = FunctionTimer::new("bargraph::render_raster");
        check_layout_size(snapshot, config)?;
        let layout = BarGraphLayout::new(snapshot, config.bar_width, config.bar_height);

        if self.cached_size() != Some((layout.width, layout.height)) {
            // old buffer goes before the new one is reserved
            self.release();
            self.canvas = Some(RasterCanvas::try_new(layout.width, layout.height)?);
            self.allocations += 1;
            debug!("bargraph canvas allocated {}x{}", layout.width, layout.height);
        }
        let Some(canvas) = self.canvas.as_mut() else {
            return Err(RenderError::EmptyCanvas { width: layout.width, height: layout.height });
        };

        layout.paint(canvas, config.alarm);
        let data = match pixel_layout {
            PixelLayout::Rgba => ImageData::Rgba(canvas.to_rgba_bytes()),
            PixelLayout::Yuva => ImageData::Yuva(canvas.to_yuva_planes()),
        };
        Ok(RenderedImage {
            width: layout.width,
            height: layout.height,
            data,
            labels: canvas.labels().to_vec(),
        })
    }

    pub fn try_render_svg(
        &mut self,
        snapshot: &RegistrySnapshot,
        config: &RenderConfig,
    ) -> Result<RenderedImage, RenderError> {
        let _timer = FunctionTimer::new("bargraph::render_svg");
        check_layout_size(snapshot, config)?;
        let layout = BarGraphLayout::new(snapshot, config.bar_width, config.bar_height);

        let mut canvas = SvgCanvas::new(layout.width, layout.height, config.bar_width);
        layout.paint(&mut canvas, config.alarm);
        let markup = canvas.finish()?;
        Ok(RenderedImage {
            width: layout.width,
            height: layout.height,
            data: ImageData::Svg(markup),
            labels: layout.labels(),
        })
    }
}
