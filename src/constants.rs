//! This module contains global constants used across the sequencer and frame sources.

use std::time::Duration;

/// Width and height of the LED matrix in pixels.
pub const MATRIX_SIZE: u32 = 8;
/// Number of pixels in one frame (row-major, 8x8).
pub const PIXEL_COUNT: usize = (MATRIX_SIZE * MATRIX_SIZE) as usize;

/// Upper bound for a single sleep slice inside the player.
/// Cancellation latency is bounded by this value plus one in-flight send.
pub const MAX_SLEEP_SLICE: Duration = Duration::from_millis(50);
/// How long a new play request waits for the previous session to exit.
pub const DEFAULT_STOP_WAIT: Duration = Duration::from_secs(2);

/// Per-request timeout towards the device.
pub const DEFAULT_DEVICE_TIMEOUT: Duration = Duration::from_secs(5);
/// Connect timeout towards the device.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1500);
/// Path of the WLED JSON state endpoint.
pub const WLED_STATE_PATH: &str = "/json/state";
/// Segment the frames are written to.
pub const WLED_SEGMENT_ID: u8 = 0;

/// Raw loop value meaning "repeat until cancelled".
pub const INFINITE_LOOPS: i64 = -1;
/// Full brightness.
pub const DEFAULT_BRIGHTNESS: u8 = 255;

/// Frame delay used when an animated GIF frame carries none.
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);
/// Pixels with alpha below this are sent as black.
pub const ALPHA_CUTOFF: u8 = 10;

/// SVGs are rasterised at this size before being reduced to the matrix.
pub const SVG_RASTER_SIZE: u32 = 32;
/// Luminance threshold used to binarise rasterised SVGs.
pub const SVG_THRESHOLD: u8 = 128;

/// LaMetric thumbnail endpoint, the icon id is appended.
pub const LAMETRIC_ICON_URL: &str = "https://developer.lametric.com/content/apps/icon_thumbs";
/// Download timeout for LaMetric thumbnails.
pub const LAMETRIC_TIMEOUT: Duration = Duration::from_secs(8);

/// Default hold time per icon in a bulk display.
pub const DEFAULT_HOLD_SECS: f64 = 1.0;
