/*
 *  source/mod.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame sources: turn bitmaps, SVGs and pixel art into frame steps
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

pub mod bitmap;
pub mod lametric;
pub mod pixel_art;
pub mod svg;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use thiserror::Error;

use crate::constants::{ALPHA_CUTOFF, MATRIX_SIZE};
use crate::error::SequencerError;
use crate::pixel::{ColorError, PixelFrame, Rgb};
use crate::sequence::{FrameStep, LoopCount, Sequence};

pub use bitmap::BitmapSource;
pub use lametric::LaMetricClient;
pub use pixel_art::PixelArt;
pub use svg::{SvgRenderError, SvgSource};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("SVG error: {0}")]
    Svg(#[from] SvgRenderError),
    #[error("download error: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("icon {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error("invalid pixel art: {0}")]
    InvalidGrid(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("source produced no frames")]
    Empty,
    #[error(transparent)]
    Sequence(#[from] SequencerError),
}

/// Clockwise rotation applied to every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn from_degrees(degrees: u16) -> Result<Self, SequencerError> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            _ => Err(SequencerError::validation(format!("rotation must be 0|90|180|270, got {degrees}"))),
        }
    }
}

/// Per-request transform parameters shared by every source.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub rotate: Rotation,
    pub flip_h: bool,
    pub flip_v: bool,
    /// Recolour every non-transparent pixel
    pub color: Option<Rgb>,
    /// Force a uniform frame rate
    pub fps: Option<u32>,
    /// Play every frame of animated sources, otherwise only the first
    pub animate: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            rotate: Rotation::None,
            flip_h: false,
            flip_v: false,
            color: None,
            fps: None,
            animate: true,
        }
    }
}

/// Anything that can be turned into an ordered list of frame steps.
pub trait FrameSource {
    fn render(&self, opts: &RenderOptions) -> Result<Vec<FrameStep>, SourceError>;

    /// Render and wrap into a playable sequence, applying any forced frame rate.
    ///
    /// A still ignores `loops` and is played exactly once.
    fn to_sequence(&self, opts: &RenderOptions, brightness: u8, loops: LoopCount) -> Result<Sequence, SourceError> {
        let steps = self.render(opts)?;
        if steps.is_empty() {
            return Err(SourceError::Empty);
        }
        let sequence = Sequence::new(steps, brightness, loops)?;
        // stills are sent once; loops and frame rate only mean something for animations
        if sequence.is_static() {
            return Ok(sequence.with_loops(LoopCount::ONCE));
        }
        Ok(match opts.fps {
            Some(fps) => sequence.with_fps(fps),
            None => sequence,
        })
    }
}

/// Reduce an RGBA image to one matrix frame.
///
/// Order: nearest-neighbour resize to 8x8, recolour, rotate, flip
/// horizontally, flip vertically, then near-transparent pixels go black.
pub fn frame_from_rgba(image: &RgbaImage, opts: &RenderOptions) -> Result<PixelFrame, SourceError> {
    let mut img = if image.dimensions() != (MATRIX_SIZE, MATRIX_SIZE) {
        imageops::resize(image, MATRIX_SIZE, MATRIX_SIZE, FilterType::Nearest)
    } else {
        image.clone()
    };

    if let Some(color) = opts.color {
        img.pixels_mut().filter(|p| p[3] > 0).for_each(|p| {
            p[0] = color.r;
            p[1] = color.g;
            p[2] = color.b;
        });
    }

    img = match opts.rotate {
        Rotation::None => img,
        Rotation::Cw90 => imageops::rotate90(&img),
        Rotation::Cw180 => imageops::rotate180(&img),
        Rotation::Cw270 => imageops::rotate270(&img),
    };
    if opts.flip_h {
        img = imageops::flip_horizontal(&img);
    }
    if opts.flip_v {
        img = imageops::flip_vertical(&img);
    }

    let pixels = img
        .pixels()
        .map(|p| if p[3] < ALPHA_CUTOFF { Rgb::BLACK } else { Rgb::new(p[0], p[1], p[2]) })
        .collect();
    Ok(PixelFrame::from_pixels(pixels)?)
}
