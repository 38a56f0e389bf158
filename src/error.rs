/*
 *  error.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the bargraph pipeline
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

use thiserror::Error;

/// Structural errors raised by the stream registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A stream with this id is already registered
    #[error("stream {0} is already registered")]
    DuplicateStream(i32),

    /// More channels than a peak snapshot can carry
    #[error("stream requests {requested} channels, at most {max} are supported")]
    TooManyChannels { requested: usize, max: usize },
}

/// Errors from the peak extractor. All of them are recoverable: the block
/// is treated as silence and the stream carries on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeakError {
    /// Sample encoding the extractor does not understand
    #[error("unsupported audio format {0}")]
    UnsupportedFormat(String),

    /// Block declares more channels than a snapshot can carry
    #[error("block has {requested} channels, at most {max} are supported")]
    TooManyChannels { requested: usize, max: usize },
}

/// Errors from a render pass. The caller treats them as "no update this tick".
#[derive(Debug, Error)]
pub enum RenderError {
    /// Canvas would be empty
    #[error("canvas has no area ({width}x{height})")]
    EmptyCanvas { width: u32, height: u32 },

    /// Canvas exceeds the pixel budget
    #[error("canvas {width}x{height} exceeds the {max} pixel limit")]
    CanvasTooLarge { width: u32, height: u32, max: u64 },

    /// Backing buffer could not be allocated
    #[error("failed to allocate {bytes} bytes for the bargraph image")]
    Allocation {
        bytes: usize,
        #[source]
        source: std::collections::TryReserveError,
    },

    /// Formatting the vector markup failed
    #[error("SVG markup error: {0}")]
    Markup(#[from] std::fmt::Error),
}
