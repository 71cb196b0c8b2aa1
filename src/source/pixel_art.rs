//! User-authored pixel art: 8x8 grids of hex colours, optionally animated.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{DEFAULT_FRAME_DELAY, MATRIX_SIZE};
use crate::pixel::{PixelFrame, Rgb};
use crate::sequence::FrameStep;
use crate::source::{frame_from_rgba, FrameSource, RenderOptions, SourceError};

/// 8 rows of 8 hex colours.
pub type Grid = Vec<Vec<String>>;

/// A saved icon as authored in the pixel editor.
///
/// ```json
/// { "id": "WI1731932400999999", "name": "Heart", "grid": [["#FF0000", ...], ...] }
/// ```
/// Animated icons carry `frames` (and optionally `duration_ms`) instead of `grid`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PixelArt {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub grid: Option<Grid>,
    #[serde(default)]
    pub frames: Vec<Grid>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl PixelArt {
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let art: PixelArt = serde_json::from_str(json)?;
        art.grids()?;
        Ok(art)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// A single-grid icon from a frame.
    pub fn from_frame(name: &str, frame: &PixelFrame) -> Self {
        let size = MATRIX_SIZE as usize;
        let grid = frame
            .pixels()
            .chunks(size)
            .map(|row| row.iter().map(|p| p.to_string()).collect())
            .collect();
        PixelArt { name: Some(name.to_string()), grid: Some(grid), ..Default::default() }
    }

    fn grids(&self) -> Result<Vec<&Grid>, SourceError> {
        let grids: Vec<&Grid> = if self.frames.is_empty() {
            self.grid.iter().collect()
        } else {
            self.frames.iter().collect()
        };
        if grids.is_empty() {
            return Err(SourceError::InvalidGrid("neither grid nor frames given".to_string()));
        }
        let size = MATRIX_SIZE as usize;
        for (index, grid) in grids.iter().enumerate() {
            if grid.len() != size || grid.iter().any(|row| row.len() != size) {
                return Err(SourceError::InvalidGrid(format!("frame {index} is not {size}x{size}")));
            }
        }
        Ok(grids)
    }

    fn frame_delay(&self) -> Duration {
        self.duration_ms.map(Duration::from_millis).unwrap_or(DEFAULT_FRAME_DELAY)
    }
}

/// Black cells are "off" and stay transparent, so a recolour only paints lit cells.
fn grid_to_rgba(grid: &Grid) -> Result<RgbaImage, SourceError> {
    let mut img = RgbaImage::new(MATRIX_SIZE, MATRIX_SIZE);
    for (y, row) in grid.iter().enumerate() {
        for (x, hex) in row.iter().enumerate() {
            let c = Rgb::from_hex(hex)?;
            let alpha = if c == Rgb::BLACK { 0 } else { 255 };
            img.put_pixel(x as u32, y as u32, Rgba([c.r, c.g, c.b, alpha]));
        }
    }
    Ok(img)
}

impl FrameSource for PixelArt {
    fn render(&self, opts: &RenderOptions) -> Result<Vec<FrameStep>, SourceError> {
        let grids = self.grids()?;
        let duration = if grids.len() > 1 { self.frame_delay() } else { Duration::ZERO };
        grids
            .into_iter()
            .map(|grid| -> Result<FrameStep, SourceError> {
                Ok(FrameStep::new(frame_from_rgba(&grid_to_rgba(grid)?, opts)?, duration))
            })
            .collect()
    }
}
