/*
 *  transport/mod.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame transport abstraction
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

pub mod mock;
pub mod wled;

use std::future::Future;

use crate::error::TransportError;
use crate::pixel::PixelFrame;

pub use mock::{MockTransport, SentFrame};
pub use wled::{DeviceState, SegmentState, WledClient};

/// Writes one frame to a target device.
///
/// Implementations perform exactly one network write per call and never
/// retry; pacing and retry policy belong to the caller. Every failure,
/// including application level refusals, is reported as a [`TransportError`].
pub trait FrameTransport: Send + Sync + 'static {
    fn send(
        &self,
        target: &str,
        frame: &PixelFrame,
        brightness: u8,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
