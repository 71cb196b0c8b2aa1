//! Module for rendering SVG icons down to the 8x8 matrix.
//!
//! This module uses `usvg` for SVG parsing and `resvg` for rendering.
//! The SVG is rasterised at 32x32, binarised on luminance while keeping
//! its alpha, then handed to the shared frame pipeline for the final
//! nearest-neighbour reduction to 8x8.

use image::{Rgba, RgbaImage};
use log::debug;
use resvg::render;
use std::error::Error;
use std::fmt;
use std::time::Duration;
use tiny_skia::{Pixmap, Transform};
use usvg::{Options as UsvgOptions, Tree as UsvgTree};

use crate::constants::{SVG_RASTER_SIZE, SVG_THRESHOLD};
use crate::sequence::FrameStep;
use crate::source::{frame_from_rgba, FrameSource, RenderOptions, SourceError};

/// Custom error type for SVG rendering operations.
#[derive(Debug)]
pub enum SvgRenderError {
    /// Error parsing the SVG data.
    SvgParseError(String),
    /// Error creating a pixmap for rendering.
    PixmapCreationError(String),
    /// The document has no usable size.
    EmptyDocument,
}

impl fmt::Display for SvgRenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvgRenderError::SvgParseError(msg) => write!(f, "SVG parse error: {}", msg),
            SvgRenderError::PixmapCreationError(msg) => write!(f, "Pixmap creation error: {}", msg),
            SvgRenderError::EmptyDocument => write!(f, "SVG document has zero size"),
        }
    }
}

impl Error for SvgRenderError {}

/// A parsed SVG icon.
#[derive(Debug)]
pub struct SvgSource {
    tree: UsvgTree,
}

impl SvgSource {
    pub fn new(svg_data: &str) -> Result<Self, SvgRenderError> {
        let tree = UsvgTree::from_str(svg_data, &UsvgOptions::default())
            .map_err(|e| SvgRenderError::SvgParseError(format!("Failed to parse SVG: {:?}", e)))?;
        let size = tree.size();
        if size.width() <= 0.0 || size.height() <= 0.0 {
            return Err(SvgRenderError::EmptyDocument);
        }
        Ok(SvgSource { tree })
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, SourceError> {
        let data = std::fs::read_to_string(path)?;
        Ok(Self::new(&data)?)
    }

    /// Rasterise to `SVG_RASTER_SIZE` square, black or white per pixel, alpha preserved.
    pub fn rasterize(&self) -> Result<RgbaImage, SvgRenderError> {
        let size = SVG_RASTER_SIZE;
        let mut pixmap = Pixmap::new(size, size)
            .ok_or_else(|| SvgRenderError::PixmapCreationError("Failed to create pixmap".to_string()))?;

        // scale the intrinsic size onto the raster
        let svg_size = self.tree.size();
        let transform = Transform::from_scale(size as f32 / svg_size.width(), size as f32 / svg_size.height());
        render(&self.tree, transform, &mut pixmap.as_mut());

        let mut out = RgbaImage::new(size, size);
        for (p, px) in pixmap.pixels().iter().zip(out.pixels_mut()) {
            let c = p.demultiply();
            let luminance = (299 * c.red() as u32 + 587 * c.green() as u32 + 114 * c.blue() as u32) / 1000;
            let level = if luminance > SVG_THRESHOLD as u32 { 255 } else { 0 };
            *px = Rgba([level, level, level, c.alpha()]);
        }
        debug!("SVG rasterised to {size}x{size}");
        Ok(out)
    }
}

impl FrameSource for SvgSource {
    fn render(&self, opts: &RenderOptions) -> Result<Vec<FrameStep>, SourceError> {
        let raster = self.rasterize()?;
        Ok(vec![FrameStep::new(frame_from_rgba(&raster, opts)?, Duration::ZERO)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Rgb;

    const SQUARE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24">
        <rect x="0" y="0" width="12" height="12" fill="white"/>
    </svg>"#;

    const DARK: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8">
        <rect width="8" height="8" fill="#202020"/>
    </svg>"##;

    #[test]
    fn test_parse_error() {
        assert!(matches!(SvgSource::new("<svg"), Err(SvgRenderError::SvgParseError(_))));
    }

    #[test]
    fn test_top_left_quadrant_lit() {
        let source = SvgSource::new(SQUARE).unwrap();
        let steps = source.render(&RenderOptions::default()).unwrap();
        assert_eq!(steps.len(), 1);
        let frame = &steps[0].frame;
        assert_eq!(frame.pixel(0, 0), Some(Rgb::new(255, 255, 255)));
        assert_eq!(frame.pixel(3, 3), Some(Rgb::new(255, 255, 255)));
        assert_eq!(frame.pixel(4, 4), Some(Rgb::BLACK));
        assert_eq!(frame.pixel(7, 7), Some(Rgb::BLACK));
    }

    #[test]
    fn test_recolor_and_rotate() {
        let source = SvgSource::new(SQUARE).unwrap();
        let opts = RenderOptions { color: Some(Rgb::new(255, 0, 0)), rotate: crate::source::Rotation::Cw90, ..Default::default() };
        let frame = &source.render(&opts).unwrap()[0].frame;
        // top-left quadrant ends up top-right
        assert_eq!(frame.pixel(7, 0), Some(Rgb::new(255, 0, 0)));
        assert_eq!(frame.pixel(0, 0), Some(Rgb::BLACK));
    }

    #[test]
    fn test_dark_fill_thresholds_to_black_but_stays_opaque() {
        let source = SvgSource::new(DARK).unwrap();
        let raster = source.rasterize().unwrap();
        let p = raster.get_pixel(16, 16);
        assert_eq!(p.0, [0, 0, 0, 255]);
        // opaque, so a recolour still paints it
        let opts = RenderOptions { color: Some(Rgb::new(0, 0, 255)), ..Default::default() };
        let frame = &source.render(&opts).unwrap()[0].frame;
        assert!(frame.is_solid());
        assert_eq!(frame.pixel(0, 0), Some(Rgb::new(0, 0, 255)));
    }
}
