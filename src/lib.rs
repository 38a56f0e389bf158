/*
 *  lib.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Multi-stream audio bargraph: peak registry, IEC scale, raster/SVG meter
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

pub mod color;
pub mod config;
pub mod dbfs;
pub mod error;
pub mod func_timer;
pub mod ingest;
pub mod notify;
pub mod overlay;
pub mod pacer;
pub mod peak;
pub mod registry;
pub mod render;
pub mod svgimage;
pub mod vframebuf;

pub use error::{PeakError, RegistryError, RenderError};
pub use ingest::{AudioBlock, AudioInput, BargraphInput, EsCategory, EsFormat};
pub use notify::{PeakEvent, PeakEvents, PeakNotifier};
pub use overlay::{BarGraphOverlay, ConfigChange, Subpicture};
pub use peak::{PeakSnapshot, SampleFormat, MAX_CHANNELS};
pub use registry::{RegistrySnapshot, StreamHandle, StreamRegistry};
pub use render::config::{Position, RenderConfig};
pub use render::{BarGraphRenderer, ImageData, OutputFormat, PixelLayout, RenderedImage};
