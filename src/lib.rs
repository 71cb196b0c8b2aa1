/*
 *  lib.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
 *
 *  Drives a WLED 8x8 LED matrix with still icons and looping
 *  animations, one playback session at a time.
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

pub mod config;
pub mod constants;
pub mod error;
pub mod pixel;
pub mod player;
pub mod sequence;
pub mod source;
pub mod supervisor;
pub mod transport;

pub use error::{SequencerError, TransportError};
pub use pixel::{PixelFrame, Rgb};
pub use player::{PlaybackOutcome, SequencePlayer};
pub use sequence::{FrameStep, LoopCount, Sequence};
pub use source::{FrameSource, RenderOptions, Rotation, SourceError};
pub use supervisor::{SessionHandle, SessionState, Supervisor, SupervisorOptions};
pub use transport::{FrameTransport, MockTransport, WledClient};
