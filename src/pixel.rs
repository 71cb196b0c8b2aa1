/*
 *  pixel.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
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
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{MATRIX_SIZE, PIXEL_COUNT};
use crate::error::SequencerError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid hex color '{0}'")]
    InvalidHex(String),
}

/// One RGB pixel, serialised as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Parse `#RGB`, `RGB`, `#RRGGBB` or `RRGGBB`.
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let s = hex.trim().trim_start_matches('#');
        let expanded: String = match s.len() {
            3 => s.chars().flat_map(|c| [c, c]).collect(),
            6 => s.to_string(),
            _ => return Err(ColorError::InvalidHex(hex.to_string())),
        };
        let channel = |i: usize| {
            expanded
                .get(i..i + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| ColorError::InvalidHex(hex.to_string()))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rgb::from_hex(s)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.r, self.g, self.b].serialize(serializer)
    }
}

/// A full 8x8 frame in row-major order.
///
/// The length is fixed by the type; anything built from untrusted input
/// goes through [`PixelFrame::from_pixels`] or [`PixelFrame::from_hex_grid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFrame {
    pixels: [Rgb; PIXEL_COUNT],
}

impl PixelFrame {
    pub fn solid(color: Rgb) -> Self {
        PixelFrame { pixels: [color; PIXEL_COUNT] }
    }

    pub fn blank() -> Self {
        Self::solid(Rgb::BLACK)
    }

    pub fn from_pixels(pixels: Vec<Rgb>) -> Result<Self, SequencerError> {
        let len = pixels.len();
        let pixels: [Rgb; PIXEL_COUNT] = pixels.try_into().map_err(|_| {
            SequencerError::validation(format!("frame must hold {PIXEL_COUNT} pixels, got {len}"))
        })?;
        Ok(PixelFrame { pixels })
    }

    /// Build a frame from 8 rows of 8 hex colour strings.
    pub fn from_hex_grid(grid: &[Vec<String>]) -> Result<Self, SequencerError> {
        let size = MATRIX_SIZE as usize;
        if grid.len() != size || grid.iter().any(|row| row.len() != size) {
            return Err(SequencerError::validation(format!("grid must be {size}x{size}")));
        }
        let pixels = grid
            .iter()
            .flatten()
            .map(|hex| Rgb::from_hex(hex))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SequencerError::validation(e.to_string()))?;
        Self::from_pixels(pixels)
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= MATRIX_SIZE || y >= MATRIX_SIZE {
            return None;
        }
        self.pixels.get((y * MATRIX_SIZE + x) as usize).copied()
    }

    /// True when every pixel has the same colour.
    pub fn is_solid(&self) -> bool {
        self.pixels.iter().all(|p| *p == self.pixels[0])
    }
}

impl Serialize for PixelFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.pixels.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_long_and_short_forms() {
        assert_eq!(Rgb::from_hex("#FF8000").unwrap(), Rgb::new(255, 128, 0));
        assert_eq!(Rgb::from_hex("ff8000").unwrap(), Rgb::new(255, 128, 0));
        assert_eq!(Rgb::from_hex("#f80").unwrap(), Rgb::new(255, 136, 0));
        assert_eq!(" 0a0 ".parse::<Rgb>().unwrap(), Rgb::new(0, 170, 0));
    }

    #[test]
    fn test_hex_rejects_garbage() {
        assert!(Rgb::from_hex("#12345").is_err());
        assert!(Rgb::from_hex("zzzzzz").is_err());
        assert!(Rgb::from_hex("").is_err());
        assert!(Rgb::from_hex("#ééé").is_err());
    }

    #[test]
    fn test_display_round_trips_hex() {
        let c = Rgb::new(1, 171, 255);
        assert_eq!(c.to_string(), "#01ABFF");
    }

    #[test]
    fn test_from_pixels_enforces_length() {
        assert!(PixelFrame::from_pixels(vec![Rgb::BLACK; 63]).is_err());
        assert!(PixelFrame::from_pixels(vec![Rgb::BLACK; 65]).is_err());
        assert!(PixelFrame::from_pixels(vec![Rgb::BLACK; 64]).is_ok());
    }

    #[test]
    fn test_hex_grid_row_major() {
        let mut grid = vec![vec!["#000000".to_string(); 8]; 8];
        grid[1][2] = "#FF0000".to_string();
        let frame = PixelFrame::from_hex_grid(&grid).unwrap();
        assert_eq!(frame.pixel(2, 1), Some(Rgb::new(255, 0, 0)));
        assert_eq!(frame.pixels()[8 + 2], Rgb::new(255, 0, 0));
        assert_eq!(frame.pixel(8, 0), None);
    }

    #[test]
    fn test_hex_grid_wrong_shape() {
        let grid = vec![vec!["#000".to_string(); 8]; 7];
        assert!(PixelFrame::from_hex_grid(&grid).is_err());
        let mut grid = vec![vec!["#000".to_string(); 8]; 8];
        grid[3].pop();
        assert!(PixelFrame::from_hex_grid(&grid).is_err());
    }

    #[test]
    fn test_frame_serialises_as_triples() {
        let frame = PixelFrame::solid(Rgb::new(1, 2, 3));
        let v = serde_json::to_value(&frame).unwrap();
        let arr = v.as_array().unwrap();
        assert_eq!(arr.len(), 64);
        assert_eq!(arr[0], serde_json::json!([1, 2, 3]));
        assert!(frame.is_solid());
    }
}
