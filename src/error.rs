/*
 *  error.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for the sequencer core
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

use std::time::Duration;
use thiserror::Error;

/// Failure of a single frame write (or device control call).
///
/// Timeouts, refused connections and non-2xx replies all end up here,
/// so callers only ever deal with one error type per send.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, timeout or body error raised by the HTTP client
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The device answered with a non-success status
    #[error("WLED error: {code} {body}")]
    Status { code: u16, body: String },

    /// Application level refusal or anything else the device reported
    #[error("device error: {0}")]
    Device(String),
}

/// Errors surfaced synchronously by the sequencer.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// Malformed sequence, frame, brightness or target; nothing was started
    #[error("validation error: {0}")]
    Validation(String),

    /// The previous session did not exit within the stop bound
    #[error("session {session} did not stop within {waited:?}")]
    PreemptionTimeout { session: u64, waited: Duration },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SequencerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        SequencerError::Validation(msg.into())
    }
}
