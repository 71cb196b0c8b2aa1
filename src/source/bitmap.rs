//! Bitmap frame source (PNG, JPEG, static and animated GIF).
//!
//! Animated GIFs are decoded up front into composited full frames with
//! their delays; everything else becomes a single still.

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat, RgbaImage};
use log::debug;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use crate::constants::DEFAULT_FRAME_DELAY;
use crate::sequence::FrameStep;
use crate::source::{frame_from_rgba, FrameSource, RenderOptions, SourceError};

#[derive(Debug, Clone)]
pub struct BitmapSource {
    frames: Vec<(RgbaImage, Duration)>,
}

impl BitmapSource {
    pub fn decode(bytes: &[u8]) -> Result<Self, SourceError> {
        let format = image::guess_format(bytes)?;
        let frames = if format == ImageFormat::Gif {
            let decoder = GifDecoder::new(Cursor::new(bytes))?;
            decoder
                .into_frames()
                .collect_frames()?
                .into_iter()
                .map(|frame| {
                    let (numer, denom) = frame.delay().numer_denom_ms();
                    let ms = if denom == 0 { 0 } else { numer / denom };
                    // browsers clamp a zero delay too; sending it as-is would spin the device
                    let delay = if ms == 0 { DEFAULT_FRAME_DELAY } else { Duration::from_millis(ms as u64) };
                    (frame.into_buffer(), delay)
                })
                .collect::<Vec<_>>()
        } else {
            vec![(image::load_from_memory_with_format(bytes, format)?.to_rgba8(), Duration::ZERO)]
        };

        if frames.is_empty() {
            return Err(SourceError::Empty);
        }
        debug!("decoded {:?} with {} frame(s)", format, frames.len());
        Ok(BitmapSource { frames })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for BitmapSource {
    fn render(&self, opts: &RenderOptions) -> Result<Vec<FrameStep>, SourceError> {
        if self.is_animated() && opts.animate {
            return self
                .frames
                .iter()
                .map(|(img, delay)| -> Result<FrameStep, SourceError> {
                    Ok(FrameStep::new(frame_from_rgba(img, opts)?, *delay))
                })
                .collect();
        }
        // stills (and animations with animate off) show the first frame once
        let (img, _) = &self.frames[0];
        Ok(vec![FrameStep::new(frame_from_rgba(img, opts)?, Duration::ZERO)])
    }
}
